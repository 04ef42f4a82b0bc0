//! Quizzes: per course, across courses, and one quiz in detail

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{items, respond, str_field, timestamp_field, CanvasTools};
use crate::canvas::CanvasError;
use crate::error::is_error;
use crate::normalize::normalize;

/// Where a published quiz stands relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuizState {
    /// Due later
    Upcoming(DateTime<Utc>),
    /// Open now, with no usable due date
    Available,
    /// Past its due date but still open for submissions
    PastOpen,
    /// Past its due date and locked
    PastClosed,
}

/// Places a quiz, or `None` for unpublished quizzes and closed ones
/// without a usable due date
fn quiz_state(quiz: &Value, now: DateTime<Utc>) -> Option<QuizState> {
    if quiz.get("published") == Some(&Value::Bool(false)) {
        return None;
    }

    let not_yet_open = timestamp_field(quiz, "unlock_at").is_some_and(|unlock| unlock > now);
    let already_locked = timestamp_field(quiz, "lock_at").is_some_and(|lock| lock < now);
    let open = !not_yet_open && !already_locked;

    match timestamp_field(quiz, "due_at") {
        Some(due) if due > now => Some(QuizState::Upcoming(due)),
        Some(_) if open => Some(QuizState::PastOpen),
        Some(_) => Some(QuizState::PastClosed),
        None if open => Some(QuizState::Available),
        None => None,
    }
}

/// Sorts quizzes by due date, earliest first
fn by_due_date(mut upcoming: Vec<(DateTime<Utc>, Value)>) -> Vec<Value> {
    upcoming.sort_by_key(|(due, _)| *due);
    upcoming.into_iter().map(|(_, quiz)| quiz).collect()
}

impl CanvasTools {
    /// Quizzes of a course, split into upcoming, available and past
    pub async fn get_course_quizzes(&self, course_id: u64) -> Value {
        let result = self
            .cached_list_with_ttl(
                "get_course_quizzes",
                json!([course_id]),
                self.activity_ttl(),
                format!("courses/{}/quizzes", course_id),
                Vec::new(),
            )
            .await;
        let quizzes = respond(result, &format!("retrieve quizzes for course {}", course_id));
        if is_error(&quizzes) {
            return quizzes;
        }

        let now = self.cache.now();
        let mut upcoming = Vec::new();
        let mut available = Vec::new();
        let mut past = Vec::new();
        for quiz in items(&quizzes) {
            match quiz_state(quiz, now) {
                Some(QuizState::Upcoming(due)) => upcoming.push((due, quiz.clone())),
                Some(QuizState::Available) => available.push(quiz.clone()),
                Some(QuizState::PastOpen | QuizState::PastClosed) => past.push(quiz.clone()),
                None => {}
            }
        }

        json!({
            "course_id": course_id,
            "upcoming_quizzes": by_due_date(upcoming),
            "available_quizzes": available,
            "past_quizzes": past,
            "quizzes": quizzes,
        })
    }

    /// Upcoming and open quizzes of every active course
    ///
    /// Each quiz carries `course_name` and `course_id`. Quizzes past their due
    /// date that still accept submissions count as available. Courses whose
    /// quizzes cannot be read are skipped.
    pub async fn get_all_quizzes(&self) -> Value {
        let courses = self.get_courses().await;
        if is_error(&courses) {
            return courses;
        }

        let fetches = items(&courses).iter().filter_map(|course| {
            let id = course.get("id")?.as_u64()?;
            let name = str_field(course, "name").to_string();
            Some(async move { (name, id, self.get_course_quizzes(id).await) })
        });

        let now = self.cache.now();
        let mut upcoming = Vec::new();
        let mut available = Vec::new();
        for (course_name, course_id, listing) in join_all(fetches).await {
            if is_error(&listing) {
                warn!(course_id, "skipping course with unreadable quizzes");
                continue;
            }
            for quiz in items(&listing["quizzes"]) {
                let Some(state) = quiz_state(quiz, now) else {
                    continue;
                };
                let mut quiz = quiz.clone();
                if let Some(fields) = quiz.as_object_mut() {
                    fields.insert("course_name".to_string(), Value::from(course_name.as_str()));
                    fields.insert("course_id".to_string(), json!(course_id));
                }
                match state {
                    QuizState::Upcoming(due) => upcoming.push((due, quiz)),
                    QuizState::Available | QuizState::PastOpen => available.push(quiz),
                    QuizState::PastClosed => {}
                }
            }
        }

        debug!(
            upcoming = upcoming.len(),
            available = available.len(),
            "quizzes across courses"
        );
        json!({
            "upcoming_quizzes": by_due_date(upcoming),
            "available_quizzes": available,
        })
    }

    /// One quiz with its questions and the user's submissions
    ///
    /// Students usually may not list questions, so a failure there (or on
    /// submissions) leaves an empty list instead of failing the call.
    pub async fn get_quiz_details(&self, course_id: u64, quiz_id: u64) -> Value {
        let api = Arc::clone(&self.api);
        let base = format!("courses/{}/quizzes/{}", course_id, quiz_id);
        let result = self
            .cache
            .get_or_compute_with_ttl(
                "get_quiz_details",
                &json!([course_id, quiz_id]),
                self.activity_ttl(),
                move || async move {
                    let quiz = normalize(api.get_one(&base, &[]).await?);

                    let questions_endpoint = format!("{}/questions", base);
                    let questions = match api.get_list(&questions_endpoint, &[]).await {
                        Ok(raw) => normalize(raw),
                        Err(e) => {
                            warn!(quiz_id, error = %e, "could not list quiz questions");
                            json!([])
                        }
                    };

                    let submissions_endpoint = format!("{}/submissions", base);
                    let submissions = match api.get_one(&submissions_endpoint, &[]).await {
                        Ok(raw) => normalize(raw)
                            .get("quiz_submissions")
                            .cloned()
                            .unwrap_or_else(|| json!([])),
                        Err(e) => {
                            warn!(quiz_id, error = %e, "could not list quiz submissions");
                            json!([])
                        }
                    };

                    let mut fields = match quiz {
                        Value::Object(fields) => fields,
                        other => {
                            let mut fields = Map::new();
                            fields.insert("quiz".to_string(), other);
                            fields
                        }
                    };
                    fields.insert("questions".to_string(), questions);
                    fields.insert("submissions".to_string(), submissions);
                    Ok::<_, CanvasError>(json!({ "quiz": fields }))
                },
            )
            .await;
        respond(result, &format!("retrieve quiz {}", quiz_id))
    }
}
