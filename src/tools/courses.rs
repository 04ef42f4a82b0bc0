//! Course listing and details

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use super::{items, respond, str_field, CanvasTools};
use crate::canvas::CanvasError;
use crate::error::is_error;
use crate::normalize::normalize;

/// Shown in place of the teacher list when it cannot be fetched
const TEACHERS_UNAVAILABLE: &str = "Unable to retrieve teacher information";

impl CanvasTools {
    /// Active courses of the user
    pub async fn get_courses(&self) -> Value {
        let result = self
            .cached_list(
                "get_courses",
                json!([]),
                "courses".to_string(),
                vec![("enrollment_state", "active".to_string())],
            )
            .await;
        respond(result, "retrieve your courses")
    }

    /// Courses whose name contains `course_name`, ignoring case
    ///
    /// Deprecated: assistants match names better from `get_courses`.
    pub async fn find_course_by_name(&self, course_name: &str) -> Value {
        warn!("find_course_by_name is deprecated, use get_courses");
        let courses = self.get_courses().await;
        if is_error(&courses) {
            return courses;
        }

        let needle = course_name.to_lowercase();
        let matches: Vec<Value> = items(&courses)
            .iter()
            .filter(|course| str_field(course, "name").to_lowercase().contains(&needle))
            .cloned()
            .collect();

        let message = if matches.is_empty() {
            format!("No courses found matching '{}'", course_name)
        } else {
            "This tool is deprecated. Use get_courses and pick the course from the list.".to_string()
        };
        json!({ "deprecated": true, "message": message, "matches": matches })
    }

    /// A course with its term, student count and teachers
    ///
    /// A failure to list teachers does not fail the call; the teacher list is
    /// replaced by a placeholder entry.
    pub async fn get_course_details(&self, course_id: u64) -> Value {
        let api = Arc::clone(&self.api);
        let result = self
            .cache
            .get_or_compute("get_course_details", &json!([course_id]), move || async move {
                let course = api
                    .get_one(
                        &format!("courses/{}", course_id),
                        &[
                            ("include[]", "term".to_string()),
                            ("include[]", "total_students".to_string()),
                        ],
                    )
                    .await?;

                let teachers = match api
                    .get_list(
                        &format!("courses/{}/users", course_id),
                        &[("enrollment_type[]", "teacher".to_string())],
                    )
                    .await
                {
                    Ok(raw) => {
                        let users = normalize(raw);
                        Value::Array(
                            items(&users)
                                .iter()
                                .map(|u| json!({ "id": u.get("id"), "name": u.get("name") }))
                                .collect(),
                        )
                    }
                    Err(e) => {
                        warn!(course_id, error = %e, "could not list teachers");
                        json!([{ "name": TEACHERS_UNAVAILABLE }])
                    }
                };

                Ok::<_, CanvasError>(json!({ "course": normalize(course), "teachers": teachers }))
            })
            .await;
        respond(result, &format!("access course {}", course_id))
    }
}
