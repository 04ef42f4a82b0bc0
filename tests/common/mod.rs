//! In-memory Canvas stand-in shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::Value;

use canvas_mcp::cache::{ManualClock, ResponseCache};
use canvas_mcp::canvas::{wrap_json, CanvasApi, CanvasError, Query};
use canvas_mcp::normalize::Raw;
use canvas_mcp::tools::CanvasTools;

pub const BASE_URL: &str = "https://canvas.test.edu";

enum Canned {
    Json(Value),
    Status(u16, String),
}

/// Fake upstream that serves canned JSON per endpoint and counts requests
#[derive(Default)]
pub struct FakeCanvas {
    responses: Mutex<HashMap<String, Canned>>,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeCanvas {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serves `value` for `endpoint`
    pub fn respond(&self, endpoint: &str, value: Value) {
        self.lock_responses()
            .insert(endpoint.to_string(), Canned::Json(value));
    }

    /// Fails `endpoint` with an HTTP status and body
    pub fn fail(&self, endpoint: &str, status: u16, body: &str) {
        self.lock_responses()
            .insert(endpoint.to_string(), Canned::Status(status, body.to_string()));
    }

    /// How many requests hit `endpoint`
    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Query of the most recent request to `endpoint`
    pub fn last_query(&self, endpoint: &str) -> Option<Vec<(String, String)>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _)| e == endpoint)
            .map(|(_, q)| q.clone())
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, HashMap<String, Canned>> {
        self.responses.lock().unwrap()
    }

    fn serve(&self, endpoint: &str, query: &Query) -> Result<Raw, CanvasError> {
        self.calls.lock().unwrap().push((
            endpoint.to_string(),
            query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ));

        let requester: Arc<str> = Arc::from(BASE_URL);
        match self.lock_responses().get(endpoint) {
            Some(Canned::Json(value)) => Ok(wrap_json(&requester, endpoint, value.clone())),
            Some(Canned::Status(code, body)) => Err(CanvasError::from_status(
                StatusCode::from_u16(*code).unwrap(),
                body,
            )),
            None => Err(CanvasError::from_status(StatusCode::NOT_FOUND, "")),
        }
    }
}

#[async_trait]
impl CanvasApi for FakeCanvas {
    async fn get_one(&self, endpoint: &str, query: &Query) -> Result<Raw, CanvasError> {
        self.serve(endpoint, query)
    }

    async fn get_list(&self, endpoint: &str, query: &Query) -> Result<Raw, CanvasError> {
        self.serve(endpoint, query)
    }
}

/// 2024-09-01T12:00:00Z, the fixed "now" of every test
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
}

/// Tools over `fake`, with a manual clock starting at [`start_time`]
pub fn create_test_tools(fake: &Arc<FakeCanvas>) -> (CanvasTools, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = ResponseCache::with_clock(clock.clone());
    (CanvasTools::new(fake.clone(), cache), clock)
}
