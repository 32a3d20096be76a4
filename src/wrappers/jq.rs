//! jq Wrappers
//!
//! jq filters compiled and run by jaq. A [`JqFilter`] is compiled once and
//! may be run against any number of inputs.
//!
//! Output convention: no results yields `null`, a single result yields that
//! value, several results yield a JSON array of them.

use jaq_interpret::{Ctx, Filter, FilterT, ParseCtx, RcIter, Val};
use serde_json::Value;

use super::{arg_str, OwnedBuffer, WrapperCategory, WrapperError, WrapperRegistry, WrapperResult};

/// Adapter version string
pub fn jq_version() -> &'static str {
    concat!("jq-adapter (jaq) ", env!("CARGO_PKG_VERSION"))
}

/// A compiled jq filter
pub struct JqFilter {
    filter: Filter,
    source: String,
}

impl std::fmt::Debug for JqFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JqFilter")
            .field("source", &self.source)
            .finish()
    }
}

impl JqFilter {
    /// Compile `source` with the jq core and standard definitions. Syntax
    /// errors and undefined names are rejected here, before any input runs.
    pub fn compile(source: &str) -> WrapperResult<Self> {
        let mut defs = ParseCtx::new(Vec::new());
        defs.insert_natives(jaq_core::core());
        defs.insert_defs(jaq_std::std());

        let (parsed, errs) = jaq_parse::parse(source, jaq_parse::main());
        if !errs.is_empty() {
            return Err(WrapperError::invalid(
                "jq",
                format!("{} syntax error(s) in filter `{}`", errs.len(), source),
            ));
        }
        let main = parsed
            .ok_or_else(|| WrapperError::invalid("jq", format!("empty filter `{}`", source)))?;

        let filter = defs.compile(main);
        if !defs.errs.is_empty() {
            return Err(WrapperError::invalid(
                "jq",
                format!(
                    "{} undefined name(s) in filter `{}`",
                    defs.errs.len(),
                    source
                ),
            ));
        }
        Ok(Self {
            filter,
            source: source.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run against already-parsed input, collecting every output
    pub fn run_value(&self, input: Value) -> WrapperResult<Vec<Value>> {
        let inputs = RcIter::new(core::iter::empty());
        let mut outputs = Vec::new();
        for item in self.filter.run((Ctx::new([], &inputs), Val::from(input))) {
            let val = item.map_err(|e| WrapperError::invalid("jq", e))?;
            outputs.push(Value::from(val));
        }
        Ok(outputs)
    }

    /// Run against JSON text and render the combined result
    pub fn run(&self, json: &str) -> WrapperResult<String> {
        let input: Value =
            serde_json::from_str(json).map_err(|e| WrapperError::invalid("jq", e))?;
        let mut outputs = self.run_value(input)?;
        let combined = match outputs.len() {
            0 => Value::Null,
            1 => outputs.remove(0),
            _ => Value::Array(outputs),
        };
        Ok(combined.to_string())
    }
}

/// Compile and run in one step
pub fn filter(filter: &str, json: &str) -> WrapperResult<String> {
    JqFilter::compile(filter)?.run(json)
}

// =============================================================================
// Registration
// =============================================================================

/// Register all jq wrappers with the registry
pub fn register(registry: &mut WrapperRegistry) {
    registry.register_wrapper(
        "jq_filter",
        "Apply a jq filter to JSON input (args: filter, json)",
        WrapperCategory::Json,
        2,
        |args| {
            let result = filter(arg_str(args, 0, "filter")?, arg_str(args, 1, "json")?)?;
            Ok(OwnedBuffer::from_string(result))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_output() {
        assert_eq!(filter(".a", r#"{"a": 1, "b": 2}"#).unwrap(), "1");
        assert_eq!(filter(".name", r#"{"name": "x"}"#).unwrap(), "\"x\"");
    }

    #[test]
    fn test_multiple_outputs_become_array() {
        assert_eq!(filter(".[]", "[1, 2, 3]").unwrap(), "[1,2,3]");
        assert_eq!(filter(".[] | . * 2", "[1, 2]").unwrap(), "[2,4]");
    }

    #[test]
    fn test_no_output_is_null() {
        assert_eq!(filter("empty", "{}").unwrap(), "null");
        assert_eq!(filter(".[]", "[]").unwrap(), "null");
    }

    #[test]
    fn test_std_definitions_available() {
        assert_eq!(filter("map(. + 1)", "[1, 2]").unwrap(), "[2,3]");
        assert_eq!(filter("length", r#""hello""#).unwrap(), "5");
        assert_eq!(
            filter("select(.x > 1) | .x", r#"{"x": 3}"#).unwrap(),
            "3"
        );
    }

    #[test]
    fn test_invalid_filter_rejected_at_compile() {
        for bad in [".[", "map(", "| |", "undefined_function_xyz"] {
            let err = JqFilter::compile(bad).unwrap_err();
            assert!(
                matches!(err, WrapperError::InvalidInput { adapter: "jq", .. }),
                "{} should not compile",
                bad
            );
        }
    }

    #[test]
    fn test_compiled_filter_is_reusable() {
        let f = JqFilter::compile(".v").unwrap();
        assert_eq!(f.source(), ".v");
        assert_eq!(f.run(r#"{"v": 1}"#).unwrap(), "1");
        assert_eq!(f.run(r#"{"v": [true]}"#).unwrap(), "[true]");
        assert!(f.run("not json").is_err());
    }

    #[test]
    fn test_runtime_error_is_reported() {
        let err = filter(".a.b", r#"{"a": 5}"#).unwrap_err();
        assert!(matches!(err, WrapperError::InvalidInput { adapter: "jq", .. }));
    }
}
