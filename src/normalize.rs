//! Normalization of upstream results into plain JSON
//!
//! The Canvas client can hand back raw JSON (the plain HTTP path) or rich
//! objects that only expose named attributes (the SDK path). Every value
//! passes through [`normalize`] once at that boundary, so the tools only ever
//! work with `serde_json::Value`.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failure to read a single attribute of an upstream object
#[derive(Debug, Clone, Error)]
#[error("attribute '{name}' is unavailable: {reason}")]
pub struct AttributeError {
    /// Name of the attribute that failed
    pub name: String,
    /// Why it could not be read
    pub reason: String,
}

impl AttributeError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// An externally typed object that can be inspected attribute by attribute
///
/// Names starting with an underscore are private and never normalized.
pub trait Inspect: fmt::Debug + Send + Sync {
    /// Attribute names in discovery order
    fn attribute_names(&self) -> Vec<String>;

    /// Reads one attribute
    fn attribute(&self, name: &str) -> Result<Raw, AttributeError>;
}

/// A value as returned by the upstream client, before normalization
#[derive(Debug, Clone)]
pub enum Raw {
    /// Already plain JSON; `Value::Null` stands for "no value"
    Json(Value),
    /// A sequence of upstream values
    List(Vec<Raw>),
    /// An externally typed object
    Object(Arc<dyn Inspect>),
}

impl Raw {
    /// Wraps an inspectable object
    pub fn object(obj: impl Inspect + 'static) -> Self {
        Raw::Object(Arc::new(obj))
    }
}

impl From<Value> for Raw {
    fn from(value: Value) -> Self {
        Raw::Json(value)
    }
}

impl<T: Into<Raw>> From<Vec<T>> for Raw {
    fn from(items: Vec<T>) -> Self {
        Raw::List(items.into_iter().map(Into::into).collect())
    }
}

/// Converts an upstream value into plain JSON
///
/// * `Raw::Json` is returned unchanged, so normalizing twice is harmless
/// * `Raw::List` is normalized element by element, keeping order
/// * `Raw::Object` becomes a JSON object of its public attributes, recursively
///
/// An attribute whose read fails is recorded as `null` rather than failing
/// the whole object.
pub fn normalize(raw: Raw) -> Value {
    match raw {
        Raw::Json(value) => value,
        Raw::List(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Raw::Object(obj) => normalize_object(obj.as_ref()),
    }
}

fn normalize_object(obj: &dyn Inspect) -> Value {
    let mut fields = Map::new();
    for name in obj.attribute_names() {
        if name.starts_with('_') {
            continue;
        }
        let value = match obj.attribute(&name) {
            Ok(raw) => normalize(raw),
            Err(e) => {
                debug!(error = %e, "treating attribute as unavailable");
                Value::Null
            }
        };
        fields.insert(name, value);
    }
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Minimal inspectable object backed by a list of attributes
    #[derive(Debug)]
    struct Record {
        attrs: Vec<(String, Result<Raw, AttributeError>)>,
    }

    impl Record {
        fn new() -> Self {
            Self { attrs: Vec::new() }
        }

        fn with(mut self, name: &str, value: impl Into<Raw>) -> Self {
            self.attrs.push((name.to_string(), Ok(value.into())));
            self
        }

        fn with_failing(mut self, name: &str) -> Self {
            self.attrs
                .push((name.to_string(), Err(AttributeError::new(name, "boom"))));
            self
        }
    }

    impl Inspect for Record {
        fn attribute_names(&self) -> Vec<String> {
            self.attrs.iter().map(|(name, _)| name.clone()).collect()
        }

        fn attribute(&self, name: &str) -> Result<Raw, AttributeError> {
            self.attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| Err(AttributeError::new(name, "missing")))
        }
    }

    #[test]
    fn test_null_stays_null() {
        assert_eq!(normalize(Raw::Json(Value::Null)), Value::Null);
    }

    #[test]
    fn test_plain_mapping_is_unchanged() {
        let mapping = json!({ "id": 7, "_links": { "self": "x" }, "tags": ["a", "b"] });

        let once = normalize(Raw::Json(mapping.clone()));
        let twice = normalize(Raw::Json(once.clone()));

        assert_eq!(once, mapping);
        assert_eq!(twice, mapping);
    }

    #[test]
    fn test_scalars_pass_through() {
        for value in [json!(1), json!("text"), json!(true), json!(2.5)] {
            assert_eq!(normalize(Raw::Json(value.clone())), value);
        }
    }

    #[test]
    fn test_list_preserves_order() {
        let raw = Raw::from(vec![json!(3), json!(1), json!(2)]);

        assert_eq!(normalize(raw), json!([3, 1, 2]));
    }

    #[test]
    fn test_object_drops_private_attributes() {
        let raw = Raw::object(
            Record::new()
                .with("_requester", json!("https://canvas.example"))
                .with("id", json!(101))
                .with("name", json!("Linear Algebra")),
        );

        assert_eq!(normalize(raw), json!({ "id": 101, "name": "Linear Algebra" }));
    }

    #[test]
    fn test_object_keeps_attribute_order() {
        let raw = Raw::object(
            Record::new()
                .with("zeta", json!(1))
                .with("alpha", json!(2)),
        );

        let keys: Vec<String> = normalize(raw)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();

        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_nested_objects_in_lists() {
        let teacher = |id: i64, name: &str| {
            Raw::object(
                Record::new()
                    .with("_requester", json!("secret"))
                    .with("id", json!(id))
                    .with("name", json!(name)),
            )
        };
        let course = Raw::object(
            Record::new()
                .with("id", json!(5))
                .with("teachers", Raw::List(vec![teacher(1, "Ada"), teacher(2, "Grace")]))
                .with("_context", json!("hidden")),
        );

        assert_eq!(
            normalize(course),
            json!({
                "id": 5,
                "teachers": [
                    { "id": 1, "name": "Ada" },
                    { "id": 2, "name": "Grace" }
                ]
            })
        );
    }

    #[test]
    fn test_failing_attribute_becomes_null() {
        let raw = Raw::object(
            Record::new()
                .with("id", json!(9))
                .with_failing("due_at_date")
                .with("name", json!("Quiz 1")),
        );

        assert_eq!(
            normalize(raw),
            json!({ "id": 9, "due_at_date": null, "name": "Quiz 1" })
        );
    }

    #[test]
    fn test_attribute_error_message() {
        let err = AttributeError::new("due_at_date", "not a timestamp");
        assert_eq!(
            err.to_string(),
            "attribute 'due_at_date' is unavailable: not a timestamp"
        );
    }
}
