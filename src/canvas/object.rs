//! Typed Canvas objects as produced by the client
//!
//! Each JSON object in a response becomes a [`CanvasObject`] with one
//! attribute per key, plus a couple of private bookkeeping attributes and a
//! parsed `<key>_date` companion for every timestamp field.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::normalize::{AttributeError, Inspect, Raw};

/// Suffix of the derived timestamp attributes
const DATE_SUFFIX: &str = "_date";

/// A Canvas resource (course, assignment, user, ...) as an attribute bag
#[derive(Debug, Clone)]
pub struct CanvasObject {
    /// Base URL of the instance the object came from
    requester: Arc<str>,
    /// Endpoint that returned the object
    endpoint: String,
    /// Public attributes in response order
    attributes: Vec<(String, Raw)>,
}

impl CanvasObject {
    /// Creates an object with no public attributes
    pub fn new(requester: impl Into<Arc<str>>, endpoint: impl Into<String>) -> Self {
        Self {
            requester: requester.into(),
            endpoint: endpoint.into(),
            attributes: Vec::new(),
        }
    }

    /// Creates an object whose attributes are the keys of a JSON object
    pub fn from_map(
        requester: impl Into<Arc<str>>,
        endpoint: impl Into<String>,
        map: Map<String, Value>,
    ) -> Self {
        let mut obj = Self::new(requester, endpoint);
        obj.attributes = map.into_iter().map(|(k, v)| (k, Raw::Json(v))).collect();
        obj
    }

    /// Sets an attribute, replacing any existing value of the same name
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Raw>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Looks up a public attribute
    pub fn get(&self, name: &str) -> Option<&Raw> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn timestamp_source(&self, name: &str) -> Option<&str> {
        let base = name.strip_suffix(DATE_SUFFIX)?;
        match self.get(base) {
            Some(Raw::Json(Value::String(s))) if looks_like_timestamp(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Inspect for CanvasObject {
    fn attribute_names(&self) -> Vec<String> {
        let mut names = vec!["_requester".to_string(), "_endpoint".to_string()];
        for (name, value) in &self.attributes {
            names.push(name.clone());
            if let Raw::Json(Value::String(s)) = value {
                let derived = format!("{}{}", name, DATE_SUFFIX);
                if looks_like_timestamp(s) && self.get(&derived).is_none() {
                    names.push(derived);
                }
            }
        }
        names
    }

    fn attribute(&self, name: &str) -> Result<Raw, AttributeError> {
        match name {
            "_requester" => return Ok(Raw::Json(Value::String(self.requester.to_string()))),
            "_endpoint" => return Ok(Raw::Json(Value::String(self.endpoint.clone()))),
            _ => {}
        }

        if let Some(value) = self.get(name) {
            return Ok(value.clone());
        }

        let source = self
            .timestamp_source(name)
            .ok_or_else(|| AttributeError::new(name, "no such attribute"))?;
        let parsed = DateTime::parse_from_rfc3339(source).map_err(|e| {
            AttributeError::new(name, format!("invalid timestamp '{}': {}", source, e))
        })?;
        Ok(Raw::Json(Value::String(
            parsed
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        )))
    }
}

/// Wraps a JSON response in Canvas objects
///
/// Objects become [`CanvasObject`]s, arrays become lists of wrapped items,
/// anything else stays plain JSON.
pub fn wrap_json(requester: &Arc<str>, endpoint: &str, value: Value) -> Raw {
    match value {
        Value::Object(map) => Raw::object(CanvasObject::from_map(
            Arc::clone(requester),
            endpoint,
            map,
        )),
        Value::Array(items) => Raw::List(
            items
                .into_iter()
                .map(|item| wrap_json(requester, endpoint, item))
                .collect(),
        ),
        other => Raw::Json(other),
    }
}

/// Checks for the `YYYY-MM-DDTHH:MM:SSZ` shape Canvas uses for timestamps
fn looks_like_timestamp(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 20 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 => b == b'-',
        10 => b == b'T',
        13 | 16 => b == b':',
        19 => b == b'Z',
        _ => b.is_ascii_digit(),
    })
}
