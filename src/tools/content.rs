//! Files, modules, pages and announcements

use chrono::Duration;
use serde_json::{json, Value};

use super::{respond, CanvasTools};

/// How far back `recent_only` announcements reach
const RECENT_ANNOUNCEMENT_DAYS: i64 = 14;

impl CanvasTools {
    pub async fn get_course_files(&self, course_id: u64) -> Value {
        let result = self
            .cached_list(
                "get_course_files",
                json!([course_id]),
                format!("courses/{}/files", course_id),
                Vec::new(),
            )
            .await;
        respond(result, &format!("access files for course {}", course_id))
    }

    pub async fn get_course_modules(&self, course_id: u64) -> Value {
        let result = self
            .cached_list(
                "get_course_modules",
                json!([course_id]),
                format!("courses/{}/modules", course_id),
                Vec::new(),
            )
            .await;
        respond(result, &format!("access modules for course {}", course_id))
    }

    pub async fn get_module_items(&self, course_id: u64, module_id: u64) -> Value {
        let result = self
            .cached_list(
                "get_module_items",
                json!([course_id, module_id]),
                format!("courses/{}/modules/{}/items", course_id, module_id),
                Vec::new(),
            )
            .await;
        respond(
            result,
            &format!("access items of module {} in course {}", module_id, course_id),
        )
    }

    pub async fn get_course_pages(&self, course_id: u64) -> Value {
        let result = self
            .cached_list(
                "get_course_pages",
                json!([course_id]),
                format!("courses/{}/pages", course_id),
                Vec::new(),
            )
            .await;
        respond(result, &format!("access pages for course {}", course_id))
    }

    /// Announcements of a course
    ///
    /// With `recent_only`, only announcements posted in the last two weeks
    /// are requested. Otherwise the course's announcement topics are listed
    /// in full, since the `announcements` endpoint itself defaults to the
    /// last two weeks when no start date is given.
    pub async fn get_course_announcements(&self, course_id: u64, recent_only: bool) -> Value {
        let (endpoint, query) = if recent_only {
            let since = self.cache.now() - Duration::days(RECENT_ANNOUNCEMENT_DAYS);
            (
                "announcements".to_string(),
                vec![
                    ("context_codes[]", format!("course_{}", course_id)),
                    ("start_date", since.format("%Y-%m-%d").to_string()),
                ],
            )
        } else {
            (
                format!("courses/{}/discussion_topics", course_id),
                vec![("only_announcements", "true".to_string())],
            )
        };

        let result = self
            .cached_list(
                "get_course_announcements",
                json!([course_id, recent_only]),
                endpoint,
                query,
            )
            .await;
        respond(
            result,
            &format!("access announcements for course {}", course_id),
        )
    }
}
