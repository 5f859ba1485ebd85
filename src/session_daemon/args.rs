//! Typed access to loosely typed command arguments.
//!
//! Every handler reads its arguments through [`required`], [`optional`] or
//! [`maybe`]. Coercion never panics: a value that cannot represent the
//! requested type yields [`ArgumentError::InvalidType`].

use super::protocol::Args;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("Missing required argument: {0}")]
    Missing(String),
    #[error("Argument '{key}' must be {expected}, got {found}")]
    InvalidType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{0}")]
    Conflict(String),
}

/// Types an argument value can be coerced into.
pub trait FromArg: Sized {
    const EXPECTED: &'static str;

    fn from_arg(value: &Value) -> Option<Self>;
}

/// Strings accept JSON strings and fall back to the text of numbers and booleans.
impl FromArg for String {
    const EXPECTED: &'static str = "a string";

    fn from_arg(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl FromArg for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_arg(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromArg for u64 {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_arg(value: &Value) -> Option<Self> {
        value.as_u64()
    }
}

impl FromArg for u32 {
    const EXPECTED: &'static str = "a 32-bit non-negative integer";

    fn from_arg(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|n| u32::try_from(n).ok())
    }
}

impl FromArg for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_arg(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(n) if n.as_i64().is_some_and(|i| i < 0) => "negative integer",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads an argument that may be absent. Explicit `null` counts as absent.
pub fn maybe<T: FromArg>(args: &Args, key: &str) -> Result<Option<T>, ArgumentError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::from_arg(value)
            .map(Some)
            .ok_or_else(|| ArgumentError::InvalidType {
                key: key.to_string(),
                expected: T::EXPECTED,
                found: kind(value),
            }),
    }
}

pub fn required<T: FromArg>(args: &Args, key: &str) -> Result<T, ArgumentError> {
    maybe(args, key)?.ok_or_else(|| ArgumentError::Missing(key.to_string()))
}

pub fn optional<T: FromArg>(args: &Args, key: &str, default: T) -> Result<T, ArgumentError> {
    Ok(maybe(args, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Args {
        match value {
            Value::Object(map) => map,
            _ => panic!("test args must be an object"),
        }
    }

    #[test]
    fn test_required_string_present() {
        let a = args(json!({"id": "e1"}));
        assert_eq!(required::<String>(&a, "id").unwrap(), "e1");
    }

    #[test]
    fn test_required_missing() {
        let a = args(json!({}));
        assert_eq!(
            required::<String>(&a, "id").unwrap_err(),
            ArgumentError::Missing("id".to_string())
        );
    }

    #[test]
    fn test_null_counts_as_missing() {
        let a = args(json!({"id": null}));
        assert!(matches!(
            required::<String>(&a, "id"),
            Err(ArgumentError::Missing(_))
        ));
        assert_eq!(optional(&a, "id", "fallback".to_string()).unwrap(), "fallback");
    }

    #[test]
    fn test_string_falls_back_to_scalar_text() {
        let a = args(json!({"n": 42, "f": 1.5, "b": false}));
        assert_eq!(required::<String>(&a, "n").unwrap(), "42");
        assert_eq!(required::<String>(&a, "f").unwrap(), "1.5");
        assert_eq!(required::<String>(&a, "b").unwrap(), "false");
    }

    #[test]
    fn test_string_rejects_containers() {
        let a = args(json!({"text": ["a"]}));
        let err = required::<String>(&a, "text").unwrap_err();
        assert_eq!(
            err,
            ArgumentError::InvalidType {
                key: "text".to_string(),
                expected: "a string",
                found: "array",
            }
        );
    }

    #[test]
    fn test_integer_rejects_strings_and_floats() {
        let a = args(json!({"pid": "1234", "depth": 2.5}));
        assert!(matches!(
            required::<u32>(&a, "pid"),
            Err(ArgumentError::InvalidType { found: "string", .. })
        ));
        assert!(matches!(
            required::<i64>(&a, "depth"),
            Err(ArgumentError::InvalidType { found: "float", .. })
        ));
    }

    #[test]
    fn test_u32_rejects_out_of_range_and_negative() {
        let a = args(json!({"big": 5_000_000_000u64, "neg": -1}));
        assert!(required::<u32>(&a, "big").is_err());
        let err = required::<u32>(&a, "neg").unwrap_err();
        assert!(err.to_string().contains("negative integer"));
    }

    #[test]
    fn test_bool_is_strict() {
        let a = args(json!({"first": "true", "ok": true}));
        assert!(required::<bool>(&a, "first").is_err());
        assert!(required::<bool>(&a, "ok").unwrap());
    }

    #[test]
    fn test_optional_default_when_absent() {
        let a = args(json!({}));
        assert_eq!(optional::<i64>(&a, "depth", 5).unwrap(), 5);
        assert!(!optional(&a, "first", false).unwrap());
    }

    #[test]
    fn test_optional_still_validates_type() {
        let a = args(json!({"timeout": "soon"}));
        assert!(optional::<u64>(&a, "timeout", 5000).is_err());
    }

    #[test]
    fn test_error_messages_are_readable() {
        let a = args(json!({"pid": true}));
        let err = required::<u32>(&a, "pid").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Argument 'pid' must be a 32-bit non-negative integer, got boolean"
        );
    }
}
