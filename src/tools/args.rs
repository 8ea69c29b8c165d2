//! Typed access to a tool call's JSON arguments.

use serde_json::{Map, Value};

/// Error describing a missing or mistyped argument
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    #[error("missing required argument: {0}")]
    Missing(&'static str),
    #[error("argument {key} must be {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },
}

pub fn required_str<'a>(args: &'a Map<String, Value>, key: &'static str) -> Result<&'a str, ArgError> {
    optional_str(args, key)?.ok_or(ArgError::Missing(key))
}

/// Absent and `null` both read as `None`
pub fn optional_str<'a>(
    args: &'a Map<String, Value>,
    key: &'static str,
) -> Result<Option<&'a str>, ArgError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ArgError::WrongType {
            key,
            expected: "a string",
        }),
    }
}

pub fn optional_bool(args: &Map<String, Value>, key: &'static str) -> Result<Option<bool>, ArgError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ArgError::WrongType {
            key,
            expected: "a boolean",
        }),
    }
}

pub fn optional_u32(args: &Map<String, Value>, key: &'static str) -> Result<Option<u32>, ArgError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or(ArgError::WrongType {
                key,
                expected: "a non-negative integer",
            }),
    }
}

pub fn optional_u32_list(
    args: &Map<String, Value>,
    key: &'static str,
) -> Result<Vec<u32>, ArgError> {
    let wrong = ArgError::WrongType {
        key,
        expected: "an array of non-negative integers",
    };
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_u64().and_then(|n| u32::try_from(n).ok()))
            .collect::<Option<Vec<_>>>()
            .ok_or(wrong),
        Some(_) => Err(wrong),
    }
}

pub fn optional_str_list(
    args: &Map<String, Value>,
    key: &'static str,
) -> Result<Vec<String>, ArgError> {
    let wrong = ArgError::WrongType {
        key,
        expected: "an array of strings",
    };
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or(wrong),
        Some(_) => Err(wrong),
    }
}
