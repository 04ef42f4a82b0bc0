//! Canvas tools exposed to the assistant
//!
//! Each tool fetches through the [`ResponseCache`], normalizes what the
//! upstream client returns, and answers with plain JSON. Failures come back
//! as classified error mappings instead of Rust errors, so callers check
//! [`is_error`](crate::error::is_error) before using a result.

mod assignments;
mod auth;
mod content;
mod courses;
mod quizzes;
mod search;
mod todos;
mod utils;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::ResponseCache;
use crate::canvas::{CanvasApi, CanvasError};
use crate::error::classify;
use crate::normalize::normalize;

/// Upper bound on how long quiz and to-do results are cached, in seconds
const ACTIVITY_TTL_SECS: u64 = 300;

/// Errors raised before a tool runs
#[derive(Debug, Error)]
pub enum ToolCallError {
    /// No tool has this name
    #[error("Unknown tool: '{0}'")]
    UnknownTool(String),

    /// The arguments do not match the tool's input schema
    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// Name, description and JSON input schema of a tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The tool set, sharing one upstream client and one cache
#[derive(Clone)]
pub struct CanvasTools {
    api: Arc<dyn CanvasApi>,
    cache: ResponseCache,
}

impl CanvasTools {
    pub fn new(api: Arc<dyn CanvasApi>, cache: ResponseCache) -> Self {
        Self { api, cache }
    }

    /// The cache backing every tool
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Runs a tool by name with JSON arguments
    ///
    /// # Returns
    /// * `Ok(Value)` - the tool's result, which may itself be a classified error
    /// * `Err(ToolCallError)` - the tool does not exist or the arguments are invalid
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolCallError> {
        info!(tool = name, "calling tool");
        let value = match name {
            "get_courses" => self.get_courses().await,
            "find_course_by_name" => {
                let args: CourseNameArgs = parse_args(name, arguments)?;
                self.find_course_by_name(&args.course_name).await
            }
            "get_course_details" => {
                let args: CourseArgs = parse_args(name, arguments)?;
                self.get_course_details(args.course_id).await
            }
            "get_course_assignments" => {
                let args: CourseArgs = parse_args(name, arguments)?;
                self.get_course_assignments(args.course_id).await
            }
            "find_exams_in_course" => {
                let args: CourseArgs = parse_args(name, arguments)?;
                self.find_exams_in_course(args.course_id).await
            }
            "get_upcoming_deadlines" => {
                let args: DeadlineArgs = parse_args(name, arguments)?;
                self.get_upcoming_deadlines(args.days).await
            }
            "get_course_files" => {
                let args: CourseArgs = parse_args(name, arguments)?;
                self.get_course_files(args.course_id).await
            }
            "get_course_modules" => {
                let args: CourseArgs = parse_args(name, arguments)?;
                self.get_course_modules(args.course_id).await
            }
            "get_module_items" => {
                let args: ModuleArgs = parse_args(name, arguments)?;
                self.get_module_items(args.course_id, args.module_id).await
            }
            "get_course_pages" => {
                let args: CourseArgs = parse_args(name, arguments)?;
                self.get_course_pages(args.course_id).await
            }
            "get_course_announcements" => {
                let args: AnnouncementArgs = parse_args(name, arguments)?;
                self.get_course_announcements(args.course_id, args.recent_only)
                    .await
            }
            "search_course" => {
                let args: SearchCourseArgs = parse_args(name, arguments)?;
                self.search_course(args.course_id, &args.search_term).await
            }
            "search_all_courses" => {
                let args: SearchArgs = parse_args(name, arguments)?;
                self.search_all_courses(&args.search_term).await
            }
            "search_all_course_content" => {
                let args: SearchArgs = parse_args(name, arguments)?;
                self.search_all_course_content(&args.search_term).await
            }
            "get_course_quizzes" => {
                let args: CourseArgs = parse_args(name, arguments)?;
                self.get_course_quizzes(args.course_id).await
            }
            "get_all_quizzes" => self.get_all_quizzes().await,
            "get_quiz_details" => {
                let args: QuizArgs = parse_args(name, arguments)?;
                self.get_quiz_details(args.course_id, args.quiz_id).await
            }
            "get_todo_items" => self.get_todo_items().await,
            "get_upcoming_todo_items" => {
                let args: DeadlineArgs = parse_args(name, arguments)?;
                self.get_upcoming_todo_items(args.days).await
            }
            "format_course_summary" => {
                let args: CourseArgs = parse_args(name, arguments)?;
                self.format_course_summary(args.course_id).await
            }
            "clear_cache" => self.clear_cache(),
            "check_auth_status" => self.check_auth_status().await,
            _ => return Err(ToolCallError::UnknownTool(name.to_string())),
        };
        Ok(value)
    }

    /// TTL for quiz and to-do results, never longer than the configured one
    fn activity_ttl(&self) -> u64 {
        self.cache.default_ttl().min(ACTIVITY_TTL_SECS)
    }

    /// Fetches a list endpoint through the cache and normalizes it
    async fn cached_list(
        &self,
        identity: &'static str,
        args: Value,
        endpoint: String,
        query: Vec<(&'static str, String)>,
    ) -> Result<Value, CanvasError> {
        let ttl_secs = self.cache.default_ttl();
        self.cached_list_with_ttl(identity, args, ttl_secs, endpoint, query)
            .await
    }

    /// Like [`cached_list`](Self::cached_list) with an explicit TTL
    async fn cached_list_with_ttl(
        &self,
        identity: &'static str,
        args: Value,
        ttl_secs: u64,
        endpoint: String,
        query: Vec<(&'static str, String)>,
    ) -> Result<Value, CanvasError> {
        let api = Arc::clone(&self.api);
        self.cache
            .get_or_compute_with_ttl(identity, &args, ttl_secs, move || async move {
                let raw = api.get_list(&endpoint, &query).await?;
                Ok::<_, CanvasError>(normalize(raw))
            })
            .await
    }

    /// Fetches a single resource through the cache and normalizes it
    async fn cached_one(
        &self,
        identity: &'static str,
        args: Value,
        endpoint: String,
        query: Vec<(&'static str, String)>,
    ) -> Result<Value, CanvasError> {
        let api = Arc::clone(&self.api);
        self.cache
            .get_or_compute(identity, &args, move || async move {
                let raw = api.get_one(&endpoint, &query).await?;
                Ok::<_, CanvasError>(normalize(raw))
            })
            .await
    }
}

/// `now` plus `days`, saturating at the latest representable instant
fn days_after(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|span| now.checked_add_signed(span))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Turns a fetch result into a tool answer
fn respond(result: Result<Value, CanvasError>, action: &str) -> Value {
    match result {
        Ok(value) => value,
        Err(e) => {
            let classified = classify(&e, action);
            warn!(action, status = %classified.status, error = %e, "tool failed");
            classified.into_value()
        }
    }
}

/// The items of a list result; empty for anything that is not a list
fn items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// A string field of an object, or "" when absent
fn str_field<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Case-insensitive substring match over several string fields
fn mentions(item: &Value, fields: &[&str], needle_lower: &str) -> bool {
    fields
        .iter()
        .any(|field| str_field(item, field).to_lowercase().contains(needle_lower))
}

/// Parses a Canvas timestamp field such as `due_at`
fn timestamp_field(item: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = item.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolCallError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolCallError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct CourseArgs {
    course_id: u64,
}

#[derive(Debug, Deserialize)]
struct CourseNameArgs {
    course_name: String,
}

#[derive(Debug, Deserialize)]
struct ModuleArgs {
    course_id: u64,
    module_id: u64,
}

#[derive(Debug, Deserialize)]
struct QuizArgs {
    course_id: u64,
    quiz_id: u64,
}

#[derive(Debug, Deserialize)]
struct AnnouncementArgs {
    course_id: u64,
    #[serde(default = "default_recent_only")]
    recent_only: bool,
}

#[derive(Debug, Deserialize)]
struct DeadlineArgs {
    #[serde(default = "default_days")]
    days: u32,
}

#[derive(Debug, Deserialize)]
struct SearchCourseArgs {
    course_id: u64,
    search_term: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    search_term: String,
}

fn default_recent_only() -> bool {
    true
}

fn default_days() -> u32 {
    7
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn days_schema() -> Value {
    object_schema(
        json!({ "days": {
            "type": "integer",
            "minimum": 0,
            "default": 7,
            "description": "How many days ahead to look"
        } }),
        &[],
    )
}

fn search_term_schema() -> Value {
    object_schema(
        json!({ "search_term": {
            "type": "string",
            "description": "Text to look for (case-insensitive)"
        } }),
        &["search_term"],
    )
}

fn course_id_schema() -> Value {
    object_schema(
        json!({ "course_id": { "type": "integer", "description": "The Canvas course ID" } }),
        &["course_id"],
    )
}

/// Every tool this server offers, in listing order
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_courses",
            description: "Retrieve all courses the user is actively enrolled in.",
            input_schema: object_schema(json!({}), &[]),
        },
        ToolDefinition {
            name: "find_course_by_name",
            description: "DEPRECATED: find courses whose name contains the given text. Prefer get_courses.",
            input_schema: object_schema(
                json!({ "course_name": {
                    "type": "string",
                    "description": "Full or partial course name"
                } }),
                &["course_name"],
            ),
        },
        ToolDefinition {
            name: "get_course_details",
            description: "Get detailed information about a course, including its term and teachers.",
            input_schema: course_id_schema(),
        },
        ToolDefinition {
            name: "get_course_assignments",
            description: "Get all assignments for a course.",
            input_schema: course_id_schema(),
        },
        ToolDefinition {
            name: "find_exams_in_course",
            description: "Find assignments in a course that look like exams, tests or quizzes.",
            input_schema: course_id_schema(),
        },
        ToolDefinition {
            name: "get_upcoming_deadlines",
            description: "List assignments due in the next N days across all courses.",
            input_schema: days_schema(),
        },
        ToolDefinition {
            name: "get_course_files",
            description: "Get all files for a course.",
            input_schema: course_id_schema(),
        },
        ToolDefinition {
            name: "get_course_modules",
            description: "Get all modules for a course.",
            input_schema: course_id_schema(),
        },
        ToolDefinition {
            name: "get_module_items",
            description: "Get all items in a module of a course.",
            input_schema: object_schema(
                json!({
                    "course_id": { "type": "integer", "description": "The Canvas course ID" },
                    "module_id": { "type": "integer", "description": "The module ID" }
                }),
                &["course_id", "module_id"],
            ),
        },
        ToolDefinition {
            name: "get_course_pages",
            description: "Get all wiki pages for a course.",
            input_schema: course_id_schema(),
        },
        ToolDefinition {
            name: "get_course_announcements",
            description: "Get announcements for a course, by default only those from the last 14 days.",
            input_schema: object_schema(
                json!({
                    "course_id": { "type": "integer", "description": "The Canvas course ID" },
                    "recent_only": {
                        "type": "boolean",
                        "default": true,
                        "description": "Only announcements from the last 14 days"
                    }
                }),
                &["course_id"],
            ),
        },
        ToolDefinition {
            name: "search_course",
            description: "Search assignments, pages, files and announcements of a course for a term.",
            input_schema: object_schema(
                json!({
                    "course_id": { "type": "integer", "description": "The Canvas course ID" },
                    "search_term": {
                        "type": "string",
                        "description": "Text to look for (case-insensitive)"
                    }
                }),
                &["course_id", "search_term"],
            ),
        },
        ToolDefinition {
            name: "search_all_courses",
            description: "Search every active course for a term.",
            input_schema: search_term_schema(),
        },
        ToolDefinition {
            name: "search_all_course_content",
            description: "Search assignment names and descriptions in every active course.",
            input_schema: search_term_schema(),
        },
        ToolDefinition {
            name: "get_course_quizzes",
            description: "Get the quizzes of a course, split into upcoming, available and past.",
            input_schema: course_id_schema(),
        },
        ToolDefinition {
            name: "get_all_quizzes",
            description: "List upcoming and currently available quizzes across all courses.",
            input_schema: object_schema(json!({}), &[]),
        },
        ToolDefinition {
            name: "get_quiz_details",
            description: "Get one quiz with its questions and your submissions.",
            input_schema: object_schema(
                json!({
                    "course_id": { "type": "integer", "description": "The Canvas course ID" },
                    "quiz_id": { "type": "integer", "description": "The quiz ID" }
                }),
                &["course_id", "quiz_id"],
            ),
        },
        ToolDefinition {
            name: "get_todo_items",
            description: "Get your Canvas to-do list and missing submissions.",
            input_schema: object_schema(json!({}), &[]),
        },
        ToolDefinition {
            name: "get_upcoming_todo_items",
            description: "List published assignments due in the next N days, with full details.",
            input_schema: days_schema(),
        },
        ToolDefinition {
            name: "format_course_summary",
            description: "Summarize a course: term, students, assignment counts and modules.",
            input_schema: course_id_schema(),
        },
        ToolDefinition {
            name: "clear_cache",
            description: "Clear the API response cache so the next calls fetch fresh data.",
            input_schema: object_schema(json!({}), &[]),
        },
        ToolDefinition {
            name: "check_auth_status",
            description: "Check whether the configured Canvas access token is valid.",
            input_schema: object_schema(json!({}), &[]),
        },
    ]
}
