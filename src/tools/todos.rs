//! To-do list, missing submissions and upcoming work

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{items, respond, str_field, CanvasTools};
use crate::canvas::CanvasError;
use crate::error::is_error;
use crate::normalize::normalize;

/// Adds `course_name` to every item whose `course_id` is a known course
fn with_course_names(list: Value, names: &HashMap<u64, String>) -> Value {
    let annotated = items(&list)
        .iter()
        .cloned()
        .map(|mut item| {
            let name = item
                .get("course_id")
                .and_then(Value::as_u64)
                .and_then(|id| names.get(&id));
            if let (Some(name), Some(fields)) = (name, item.as_object_mut()) {
                fields.insert("course_name".to_string(), Value::from(name.as_str()));
            }
            item
        })
        .collect();
    Value::Array(annotated)
}

impl CanvasTools {
    /// The user's to-do items and missing submissions
    ///
    /// Missing submissions are best effort: when they cannot be read the list
    /// is empty. Items get a `course_name` when their course is one of the
    /// active courses.
    pub async fn get_todo_items(&self) -> Value {
        let courses = self.get_courses().await;
        let names: HashMap<u64, String> = if is_error(&courses) {
            warn!("course names unavailable for to-do items");
            HashMap::new()
        } else {
            items(&courses)
                .iter()
                .filter_map(|course| {
                    let id = course.get("id")?.as_u64()?;
                    Some((id, str_field(course, "name").to_string()))
                })
                .collect()
        };

        let api = Arc::clone(&self.api);
        let result = self
            .cache
            .get_or_compute_with_ttl(
                "get_todo_items",
                &json!([]),
                self.activity_ttl(),
                move || async move {
                    let todo = normalize(api.get_list("users/self/todo", &[]).await?);

                    let missing = match api.get_list("users/self/missing_submissions", &[]).await {
                        Ok(raw) => normalize(raw),
                        Err(e) => {
                            warn!(error = %e, "could not list missing submissions");
                            json!([])
                        }
                    };

                    Ok::<_, CanvasError>(json!({
                        "todo_items": todo,
                        "missing_assignments": with_course_names(missing, &names),
                    }))
                },
            )
            .await;
        respond(result, "retrieve todo items")
    }

    /// Published assignments due in the next `days` days, with course names
    pub async fn get_upcoming_todo_items(&self, days: u32) -> Value {
        let upcoming = match self.upcoming_assignments(days).await {
            Ok(upcoming) => upcoming,
            Err(error) => return error,
        };

        let assignments: Vec<Value> = upcoming
            .into_iter()
            .map(|entry| {
                let mut assignment = entry.assignment;
                if let Some(fields) = assignment.as_object_mut() {
                    fields.insert("course_name".to_string(), Value::from(entry.course_name));
                }
                assignment
            })
            .collect();
        debug!(count = assignments.len(), days, "upcoming to-do items");
        json!({ "days": days, "upcoming_assignments": assignments })
    }
}
