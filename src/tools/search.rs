//! Keyword search over course content

use futures::future::join_all;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::{items, mentions, str_field, CanvasTools};
use crate::error::is_error;

/// Collects the items of `section` that mention `needle` in any of `fields`
///
/// Sections that failed to load are skipped with a warning.
fn matching(section: &str, list: &Value, fields: &[&str], needle: &str) -> Vec<Value> {
    if is_error(list) {
        warn!(section, "skipping section that failed to load");
        return Vec::new();
    }
    items(list)
        .iter()
        .filter(|item| mentions(item, fields, needle))
        .cloned()
        .collect()
}

impl CanvasTools {
    /// Searches the assignments, pages, files and announcements of a course
    ///
    /// Matching is a case-insensitive substring test: assignments by name and
    /// description, pages by title and body, files by display name, and
    /// announcements by title and message. Only sections with matches appear
    /// in the result.
    pub async fn search_course(&self, course_id: u64, search_term: &str) -> Value {
        let needle = search_term.to_lowercase();

        let (assignments, pages, files, announcements) = futures::join!(
            self.get_course_assignments(course_id),
            self.get_course_pages(course_id),
            self.get_course_files(course_id),
            self.get_course_announcements(course_id, false),
        );

        let sections = [
            (
                "assignments",
                matching("assignments", &assignments, &["name", "description"], &needle),
            ),
            ("pages", matching("pages", &pages, &["title", "body"], &needle)),
            ("files", matching("files", &files, &["display_name"], &needle)),
            (
                "announcements",
                matching("announcements", &announcements, &["title", "message"], &needle),
            ),
        ];

        let mut results = Map::new();
        for (name, hits) in sections {
            if !hits.is_empty() {
                results.insert(name.to_string(), Value::Array(hits));
            }
        }
        debug!(course_id, sections = results.len(), "course search done");

        json!({
            "course_id": course_id,
            "search_term": search_term,
            "results": results,
        })
    }

    /// Runs [`search_course`](Self::search_course) over every active course
    ///
    /// # Returns
    /// An object keyed by course name holding each course's non-empty results,
    /// or a classified error if the course list cannot be read.
    pub async fn search_all_courses(&self, search_term: &str) -> Value {
        let courses = self.get_courses().await;
        if is_error(&courses) {
            return courses;
        }

        let searches = items(&courses).iter().filter_map(|course| {
            let id = course.get("id")?.as_u64()?;
            let name = str_field(course, "name").to_string();
            Some(async move { (name, id, self.search_course(id, search_term).await) })
        });

        let mut by_course = Map::new();
        for (name, id, found) in join_all(searches).await {
            let results = found.get("results").cloned().unwrap_or_default();
            if results.as_object().map_or(true, Map::is_empty) {
                continue;
            }
            let key = if name.is_empty() {
                format!("course {}", id)
            } else {
                name
            };
            by_course.insert(key, json!({ "course_id": id, "results": results }));
        }

        json!({ "search_term": search_term, "courses": by_course })
    }

    /// Assignments mentioning `search_term` in every active course
    ///
    /// A lighter sibling of [`search_all_courses`](Self::search_all_courses)
    /// that only reads assignment lists. Results are keyed by course name;
    /// courses without hits or with unreadable assignments are left out.
    pub async fn search_all_course_content(&self, search_term: &str) -> Value {
        let courses = self.get_courses().await;
        if is_error(&courses) {
            return courses;
        }

        let needle = search_term.to_lowercase();
        let fetches = items(&courses).iter().filter_map(|course| {
            let id = course.get("id")?.as_u64()?;
            let name = str_field(course, "name").to_string();
            Some(async move { (name, id, self.get_course_assignments(id).await) })
        });

        let mut by_course = Map::new();
        for (name, id, assignments) in join_all(fetches).await {
            let hits = matching("assignments", &assignments, &["name", "description"], &needle);
            if hits.is_empty() {
                continue;
            }
            let key = if name.is_empty() {
                format!("course {}", id)
            } else {
                name
            };
            by_course.insert(key, json!({ "assignments": hits }));
        }
        Value::Object(by_course)
    }
}
