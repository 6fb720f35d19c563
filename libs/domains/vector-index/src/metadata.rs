use serde_json::Value;

use crate::error::{VectorIndexError, VectorIndexResult};
use crate::models::{Metadata, MetadataValue};

/// Turns free-form record metadata into something the store accepts.
#[cfg_attr(test, mockall::automock)]
pub trait MetadataSanitizer: Send + Sync {
    fn sanitize(&self, raw: &Value) -> VectorIndexResult<Metadata>;
}

/// Keeps strings, numbers, booleans and lists of strings as they are.
///
/// Nulls are dropped, nested objects are flattened into dotted keys
/// (`{"a": {"b": 1}}` becomes `a.b = 1`) and any other array is stored as its
/// JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMetadataSanitizer;

impl MetadataSanitizer for DefaultMetadataSanitizer {
    fn sanitize(&self, raw: &Value) -> VectorIndexResult<Metadata> {
        let Value::Object(map) = raw else {
            return Err(VectorIndexError::Metadata(format!(
                "metadata must be a JSON object, got {}",
                json_kind(raw)
            )));
        };

        let mut out = Metadata::new();
        for (key, value) in map {
            flatten_into(&mut out, key.clone(), value);
        }
        Ok(out)
    }
}

fn flatten_into(out: &mut Metadata, key: String, value: &Value) {
    match value {
        Value::Object(nested) => {
            for (child, value) in nested {
                flatten_into(out, format!("{key}.{child}"), value);
            }
        }
        other => {
            if let Some(converted) = json_to_metadata_value(other) {
                out.insert(key, converted);
            }
        }
    }
}

fn json_to_metadata_value(value: &Value) -> Option<MetadataValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(MetadataValue::Bool(*b)),
        Value::Number(n) => n.as_f64().map(MetadataValue::Number),
        Value::String(s) => Some(MetadataValue::String(s.clone())),
        Value::Array(items) => {
            let strings: Option<Vec<String>> = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect();
            match strings {
                Some(list) => Some(MetadataValue::StringList(list)),
                // Mixed or non-string arrays are kept as text
                None => Some(MetadataValue::String(value.to_string())),
            }
        }
        Value::Object(_) => Some(MetadataValue::String(value.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
