//! Canvas REST API client
//!
//! Talks to `{base_url}/api/v1/...` with a bearer token and follows Canvas'
//! `Link` header pagination for list endpoints.

use async_trait::async_trait;
use reqwest::header::LINK;
use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::CanvasError;
use super::object::wrap_json;
use crate::normalize::Raw;

/// Path prefix of the REST API
const API_PREFIX: &str = "api/v1";

/// Page size requested from list endpoints
const PER_PAGE: u32 = 100;

/// Hard stop for runaway pagination
const MAX_PAGES: usize = 50;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Query parameters as name/value pairs; names may repeat (`include[]`)
pub type Query = [(&'static str, String)];

/// The upstream operations the tools need
///
/// Implemented by [`CanvasClient`] for real traffic and by in-memory fakes in
/// tests. Results come back un-normalized.
#[async_trait]
pub trait CanvasApi: Send + Sync {
    /// Fetches a single resource
    async fn get_one(&self, endpoint: &str, query: &Query) -> Result<Raw, CanvasError>;

    /// Fetches every page of a list endpoint
    async fn get_list(&self, endpoint: &str, query: &Query) -> Result<Raw, CanvasError>;
}

/// Client for the Canvas REST API
#[derive(Debug, Clone)]
pub struct CanvasClient {
    client: Client,
    base_url: Arc<str>,
    token: String,
}

impl CanvasClient {
    /// Create a new CanvasClient with the default timeout
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self::with_timeout(base_url, token, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new CanvasClient whose requests give up after `timeout`
    pub fn with_timeout(base_url: &str, token: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("canvas-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self::with_client(client, base_url, token)
    }

    /// Create a new CanvasClient with a custom HTTP client
    pub fn with_client(client: Client, base_url: &str, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: token.into(),
        }
    }

    /// Base URL of the Canvas instance
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an API endpoint such as `courses/1/assignments`
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            API_PREFIX,
            endpoint.trim_start_matches('/')
        )
    }

    /// Returns true if `url` points into this Canvas instance
    ///
    /// Pagination links are only followed when this holds, so the token is
    /// never sent to another host.
    pub fn is_own_url(&self, url: &str) -> bool {
        url.strip_prefix(&*self.base_url)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Sends a GET and turns non-success statuses into errors
    async fn send(&self, url: &str, query: &Query) -> Result<Response, CanvasError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(CanvasError::from_status(status, &body))
    }

    /// Fetches an endpoint and returns its JSON body as-is
    pub async fn request_json(&self, endpoint: &str, query: &Query) -> Result<Value, CanvasError> {
        let response = self.send(&self.endpoint_url(endpoint), query).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Fetches every page of a list endpoint and concatenates the items
    ///
    /// Pages that come back as an empty object count as empty lists; Canvas
    /// does this for some endpoints when there is nothing to return.
    pub async fn request_pages(
        &self,
        endpoint: &str,
        query: &Query,
    ) -> Result<Vec<Value>, CanvasError> {
        let mut first_query: Vec<(&'static str, String)> = query.to_vec();
        if !first_query.iter().any(|(name, _)| *name == "per_page") {
            first_query.push(("per_page", PER_PAGE.to_string()));
        }

        let mut items = Vec::new();
        let mut next = Some(self.endpoint_url(endpoint));
        let mut pages = 0;

        while let Some(url) = next.take() {
            let page_query: &Query = if pages == 0 { &first_query[..] } else { &[] };
            let response = self.send(&url, page_query).await?;
            next = response
                .headers()
                .get(LINK)
                .and_then(|h| h.to_str().ok())
                .and_then(next_link)
                .filter(|link| {
                    let own = self.is_own_url(link);
                    if !own {
                        warn!(
                            endpoint = %endpoint,
                            link = %link,
                            "ignoring pagination link to another host"
                        );
                    }
                    own
                });
            let text = response.text().await?;

            match serde_json::from_str::<Value>(&text)? {
                Value::Array(page) => items.extend(page),
                Value::Object(map) if map.is_empty() => {}
                other => {
                    return Err(CanvasError::Other(format!(
                        "expected a list from {}, got {}",
                        endpoint,
                        json_kind(&other)
                    )))
                }
            }

            pages += 1;
            if page_limit_hit(pages, next.is_some()) {
                warn!(
                    endpoint = %endpoint,
                    pages,
                    items = items.len(),
                    "pagination limit reached, returning a partial list"
                );
                break;
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl CanvasApi for CanvasClient {
    async fn get_one(&self, endpoint: &str, query: &Query) -> Result<Raw, CanvasError> {
        let value = self.request_json(endpoint, query).await?;
        Ok(wrap_json(&self.base_url, endpoint, value))
    }

    async fn get_list(&self, endpoint: &str, query: &Query) -> Result<Raw, CanvasError> {
        let items = self.request_pages(endpoint, query).await?;
        Ok(wrap_json(&self.base_url, endpoint, Value::Array(items)))
    }
}

/// Extracts the `rel="next"` URL from a `Link` header
///
/// Canvas sends e.g.
/// `<https://x/api/v1/courses?page=2>; rel="next", <https://x/api/v1/courses?page=5>; rel="last"`
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let url = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        url.strip_prefix('<')
            .and_then(|u| u.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// True once `pages` pages are read and another one is still linked
fn page_limit_hit(pages: usize, has_next: bool) -> bool {
    has_next && pages >= MAX_PAGES
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
