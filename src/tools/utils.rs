//! Summaries and cache maintenance

use serde_json::{json, Value};
use tracing::info;

use super::{items, respond, timestamp_field, CanvasTools};
use crate::error::is_error;

impl CanvasTools {
    /// Drops every cached response
    pub fn clear_cache(&self) -> Value {
        let removed = self.cache.clear();
        info!(removed, "cache cleared");
        json!({
            "status": "success",
            "message": "Cache cleared",
            "entries_removed": removed,
        })
    }

    /// A compact overview of a course
    ///
    /// Combines the course record with its assignments and modules. Any
    /// failing part turns the whole answer into that part's classified error.
    pub async fn format_course_summary(&self, course_id: u64) -> Value {
        let course = self
            .cached_one(
                "format_course_summary",
                json!([course_id]),
                format!("courses/{}", course_id),
                vec![
                    ("include[]", "term".to_string()),
                    ("include[]", "total_students".to_string()),
                ],
            )
            .await;
        let course = respond(course, &format!("access course {}", course_id));
        if is_error(&course) {
            return course;
        }

        let (assignments, modules) = futures::join!(
            self.get_course_assignments(course_id),
            self.get_course_modules(course_id),
        );
        if is_error(&assignments) {
            return assignments;
        }
        if is_error(&modules) {
            return modules;
        }

        let now = self.cache.now();
        let assignments = items(&assignments);
        let upcoming = assignments
            .iter()
            .filter(|a| timestamp_field(a, "due_at").is_some_and(|due| due > now))
            .count();

        json!({
            "course_id": course_id,
            "name": course.get("name"),
            "course_code": course.get("course_code"),
            "term": course.pointer("/term/name"),
            "total_students": course.get("total_students"),
            "assignments": {
                "total": assignments.len(),
                "upcoming": upcoming,
            },
            "modules": items(&modules).len(),
        })
    }
}
