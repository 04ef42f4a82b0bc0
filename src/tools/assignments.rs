//! Assignments, exams and deadlines

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{days_after, items, mentions, respond, str_field, timestamp_field, CanvasTools};
use crate::error::is_error;

/// Words that mark an assignment as an exam
const EXAM_KEYWORDS: [&str; 6] = ["exam", "test", "quiz", "midterm", "final", "assessment"];

/// An assignment inside an upcoming window, with its course
pub(super) struct Upcoming {
    pub due: DateTime<Utc>,
    pub course_name: String,
    pub course_id: u64,
    pub assignment: Value,
}

impl CanvasTools {
    pub async fn get_course_assignments(&self, course_id: u64) -> Value {
        let result = self
            .cached_list(
                "get_course_assignments",
                json!([course_id]),
                format!("courses/{}/assignments", course_id),
                Vec::new(),
            )
            .await;
        respond(
            result,
            &format!("retrieve assignments for course {}", course_id),
        )
    }

    /// Assignments whose name or description mentions an exam keyword
    pub async fn find_exams_in_course(&self, course_id: u64) -> Value {
        let assignments = self.get_course_assignments(course_id).await;
        if is_error(&assignments) {
            return assignments;
        }

        let exams: Vec<Value> = items(&assignments)
            .iter()
            .filter(|a| {
                EXAM_KEYWORDS
                    .iter()
                    .any(|keyword| mentions(a, &["name", "description"], keyword))
            })
            .cloned()
            .collect();
        Value::Array(exams)
    }

    /// Assignments due within the next `days` days across all courses
    ///
    /// # Arguments
    /// * `days` - How far ahead to look, starting now
    ///
    /// # Returns
    /// A list sorted by due date. Courses whose assignments cannot be read
    /// are skipped.
    pub async fn get_upcoming_deadlines(&self, days: u32) -> Value {
        let upcoming = match self.upcoming_assignments(days).await {
            Ok(upcoming) => upcoming,
            Err(error) => return error,
        };

        let deadlines: Vec<Value> = upcoming
            .into_iter()
            .map(|entry| {
                json!({
                    "course_name": entry.course_name,
                    "course_id": entry.course_id,
                    "assignment_name": entry.assignment.get("name"),
                    "assignment_id": entry.assignment.get("id"),
                    "due_at": entry.assignment.get("due_at"),
                    "points_possible": entry.assignment.get("points_possible"),
                })
            })
            .collect();
        debug!(count = deadlines.len(), days, "upcoming deadlines");
        Value::Array(deadlines)
    }

    /// Published assignments due between now and `days` from now, by due date
    ///
    /// Fails only when the course list itself cannot be read; the error is
    /// the classified mapping to hand back.
    pub(super) async fn upcoming_assignments(&self, days: u32) -> Result<Vec<Upcoming>, Value> {
        let courses = self.get_courses().await;
        if is_error(&courses) {
            return Err(courses);
        }

        let now = self.cache.now();
        let horizon = days_after(now, days);

        let fetches = items(&courses).iter().filter_map(|course| {
            let id = course.get("id")?.as_u64()?;
            let name = str_field(course, "name").to_string();
            Some(async move { (name, id, self.get_course_assignments(id).await) })
        });

        let mut upcoming = Vec::new();
        for (course_name, course_id, assignments) in join_all(fetches).await {
            if is_error(&assignments) {
                warn!(course_id, "skipping course with unreadable assignments");
                continue;
            }
            for assignment in items(&assignments) {
                if assignment.get("published") == Some(&Value::Bool(false)) {
                    continue;
                }
                let Some(due) = timestamp_field(assignment, "due_at") else {
                    continue;
                };
                if due < now || due > horizon {
                    continue;
                }
                upcoming.push(Upcoming {
                    due,
                    course_name: course_name.clone(),
                    course_id,
                    assignment: assignment.clone(),
                });
            }
        }

        upcoming.sort_by_key(|entry| entry.due);
        Ok(upcoming)
    }
}
