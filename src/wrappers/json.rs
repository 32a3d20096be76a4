//! JSON Wrappers
//!
//! Validation, a parsed-document session with typed accessors, and one-shot
//! accessors, using serde_json.
//!
//! Keys may be dotted paths (`a.b.c`); a segment that parses as an integer
//! indexes into an array. The empty key names the root value.

use serde::de::IgnoredAny;
use serde_json::Value;

use super::{arg_str, OwnedBuffer, WrapperCategory, WrapperError, WrapperRegistry, WrapperResult};

/// Check that `text` is well-formed JSON without building a tree
pub fn validate(text: &str) -> bool {
    serde_json::from_str::<IgnoredAny>(text).is_ok()
}

/// `"ok"` for well-formed JSON, otherwise `"error: <message>"`
pub fn parse_status(text: &str) -> String {
    match serde_json::from_str::<IgnoredAny>(text) {
        Ok(_) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    }
}

/// A parsed JSON document
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument {
    root: Value,
}

impl JsonDocument {
    pub fn parse(text: &str) -> WrapperResult<Self> {
        let root = serde_json::from_str(text).map_err(|e| WrapperError::invalid("json", e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve a top-level key literally, then as a dotted path
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.root);
        }
        if let Some(value) = self.root.as_object().and_then(|map| map.get(path)) {
            return Some(value);
        }
        path.split('.').try_fold(&self.root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(Value::as_str)
    }

    /// Integer value; fractional numbers are not converted
    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.lookup(path).and_then(Value::as_i64)
    }

    /// Numeric value; integers are widened
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.lookup(path).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.lookup(path).and_then(Value::as_bool)
    }

    /// Length of the array at `path` (the root when `path` is empty)
    pub fn count_array(&self, path: &str) -> Option<usize> {
        self.lookup(path).and_then(Value::as_array).map(Vec::len)
    }
}

// =============================================================================
// One-shot accessors with defaults
// =============================================================================

/// String at `key`, or `""`
pub fn get_string(text: &str, key: &str) -> String {
    JsonDocument::parse(text)
        .ok()
        .and_then(|doc| doc.get_str(key).map(str::to_string))
        .unwrap_or_default()
}

/// Integer at `key`, or `0`
pub fn get_int64(text: &str, key: &str) -> i64 {
    JsonDocument::parse(text)
        .ok()
        .and_then(|doc| doc.get_i64(key))
        .unwrap_or(0)
}

/// Number at `key`, or `0.0`
pub fn get_double(text: &str, key: &str) -> f64 {
    JsonDocument::parse(text)
        .ok()
        .and_then(|doc| doc.get_f64(key))
        .unwrap_or(0.0)
}

/// Boolean at `key`, or `false`
pub fn get_bool(text: &str, key: &str) -> bool {
    JsonDocument::parse(text)
        .ok()
        .and_then(|doc| doc.get_bool(key))
        .unwrap_or(false)
}

/// Array length at `key`, or `0`
pub fn count_array(text: &str, key: &str) -> usize {
    JsonDocument::parse(text)
        .ok()
        .and_then(|doc| doc.count_array(key))
        .unwrap_or(0)
}

// =============================================================================
// Registration
// =============================================================================

/// Register all JSON wrappers with the registry
pub fn register(registry: &mut WrapperRegistry) {
    registry.register_wrapper(
        "json_validate",
        "Return [1] if the input is well-formed JSON, [0] otherwise",
        WrapperCategory::Json,
        1,
        |args| Ok(OwnedBuffer::from_vec(vec![validate(arg_str(args, 0, "json")?) as u8])),
    );

    registry.register_wrapper(
        "json_parse_status",
        "Describe whether the input parses (\"ok\" or \"error: ...\")",
        WrapperCategory::Json,
        1,
        |args| Ok(OwnedBuffer::from_string(parse_status(arg_str(args, 0, "json")?))),
    );

    registry.register_wrapper(
        "json_get",
        "Serialize the value at a dotted path (args: json, path)",
        WrapperCategory::Json,
        2,
        |args| {
            let doc = JsonDocument::parse(arg_str(args, 0, "json")?)?;
            let path = arg_str(args, 1, "path")?;
            let value = doc
                .lookup(path)
                .ok_or_else(|| WrapperError::invalid("json", format!("no value at `{}`", path)))?;
            Ok(OwnedBuffer::from_string(value.to_string()))
        },
    );
}
