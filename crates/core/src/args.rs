// Encoding of story args/globals into the compact `args=` URL format

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^#([0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})$").unwrap()
});
static FUNCTION_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(rgba?|hsla?)\(([0-9]{1,3}),\s?([0-9]{1,3})%?,\s?([0-9]{1,3})%?,?\s?([0-9](\.[0-9]{1,2})?)?\)$")
        .unwrap()
});
static COLOR_NOISE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s%]").unwrap());

/// A value that can be placed in a story URL.
///
/// Richer than JSON: it can express `undefined`, dates and sparse arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    /// `None` marks a hole in a sparse array
    Array(Vec<Option<ArgValue>>),
    Object(Vec<(String, ArgValue)>),
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ArgValue::Null,
            Value::Bool(b) => ArgValue::Bool(b),
            Value::Number(n) => ArgValue::Number(n.as_f64().unwrap_or_default()),
            Value::String(s) => ArgValue::String(s),
            Value::Array(items) => ArgValue::Array(items.into_iter().map(|v| Some(v.into())).collect()),
            Value::Object(map) => ArgValue::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::String(value.to_string())
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Number(value)
    }
}

impl From<DateTime<Utc>> for ArgValue {
    fn from(value: DateTime<Utc>) -> Self {
        ArgValue::Date(value)
    }
}

/// Format a number the way JavaScript prints it for integral values.
/// `f64` Display never adds a fraction or exponent to integral values.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Covers -0
        return "0".to_string();
    }
    n.to_string()
}

fn encode_string(s: &str) -> String {
    if let Some(caps) = HEX_COLOR.captures(s) {
        return format!("!hex({})", &caps[1]);
    }
    if FUNCTION_COLOR.is_match(s) {
        return format!("!{}", COLOR_NOISE.replace_all(s, ""));
    }
    s.to_string()
}

/// Flatten one value into `key:value` pairs
fn flatten(prefix: &str, value: &ArgValue, pairs: &mut Vec<(String, String)>) {
    match value {
        ArgValue::Undefined => pairs.push((prefix.to_string(), "!undefined".to_string())),
        ArgValue::Null => pairs.push((prefix.to_string(), "!null".to_string())),
        ArgValue::Bool(b) => pairs.push((prefix.to_string(), format!("!{}", b))),
        ArgValue::Number(n) => pairs.push((prefix.to_string(), format_number(*n))),
        ArgValue::String(s) => pairs.push((prefix.to_string(), encode_string(s))),
        ArgValue::Date(d) => pairs.push((
            prefix.to_string(),
            format!("!date({})", d.to_rfc3339_opts(SecondsFormat::Millis, true)),
        )),
        ArgValue::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                if let Some(item) = item {
                    flatten(&format!("{}[{}]", prefix, idx), item, pairs);
                }
            }
        }
        ArgValue::Object(fields) => {
            for (key, field) in fields {
                flatten(&format!("{}.{}", prefix, key), field, pairs);
            }
        }
    }
}

/// Encode a set of named values into the `name:value;name:value` format.
///
/// Nested objects use dot paths, arrays use `name[idx]`, and spaces become
/// `+`. An empty input encodes to the empty string.
pub fn encode_args(values: &[(String, ArgValue)]) -> String {
    let mut pairs = Vec::new();
    for (key, value) in values {
        flatten(key, value, &mut pairs);
    }

    pairs
        .into_iter()
        .map(|(key, value)| format!("{}:{}", key, value).replace(' ', "+"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Encode a JSON object of args or globals. `None` encodes to the empty string.
pub fn encode_json_args(values: Option<&Map<String, Value>>) -> String {
    let Some(values) = values else {
        return String::new();
    };
    let converted: Vec<(String, ArgValue)> = values
        .iter()
        .map(|(key, value)| (key.clone(), ArgValue::from(value.clone())))
        .collect();
    encode_args(&converted)
}
