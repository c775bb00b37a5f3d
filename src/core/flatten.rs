use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A flattened record: key path → scalar value.
///
/// `BTreeMap` keeps iteration deterministic and lexicographic, which is the
/// ordering every downstream consumer sorts columns into anyway.
pub type FlatRecord = BTreeMap<String, Value>;

/// Fixed key used when a bare scalar is flattened at document root.
pub const SCALAR_COLUMN: &str = "value";

/// Settings for the flattener and its array sampling policy.
///
/// The sampling limit is deliberately configuration rather than a hidden
/// literal: it is the knob that bounds both memory and column count when
/// documents carry huge arrays.
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    key_separator: char,
    array_sample_limit: usize,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            key_separator: '_',
            array_sample_limit: 10,
        }
    }
}

impl FlattenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the separator placed between key path components.
    pub fn key_separator(mut self, key_separator: char) -> Self {
        self.key_separator = key_separator;
        self
    }

    /// Sets the number of leading array elements flattened per array.
    pub fn array_sample_limit(mut self, array_sample_limit: usize) -> Self {
        self.array_sample_limit = array_sample_limit;
        self
    }

    fn child_key(&self, prefix: &str, segment: &str) -> String {
        if prefix.is_empty() {
            segment.to_string()
        } else {
            format!("{prefix}{}{segment}", self.key_separator)
        }
    }
}

/// Flattens one JSON value into a single-level key-path → scalar mapping.
///
/// Pure and deterministic: flattening the same value twice yields identical
/// records, which the chunked re-union step relies on.
///
/// - Objects recurse, joining path components with the configured separator.
/// - Arrays go through the sampling policy: at most `array_sample_limit`
///   leading elements are flattened under their index, and a truncated array
///   additionally records its true length under `<prefix>_count`
///   (`_total_count` when the array is the document root).
/// - A bare scalar document becomes a single entry under the `value` key.
///
/// # Examples
///
/// ```
/// use flattable::core::flatten::{flatten, FlattenConfig};
/// use serde_json::json;
///
/// let record = flatten(&json!({"a": 1, "b": {"c": 2}}), &FlattenConfig::new());
///
/// let columns: Vec<&str> = record.keys().map(String::as_str).collect();
/// assert_eq!(columns, vec!["a", "b_c"]);
/// assert_eq!(record["b_c"], json!(2));
/// ```
pub fn flatten(value: &Value, config: &FlattenConfig) -> FlatRecord {
    let mut out = FlatRecord::new();
    match value {
        Value::Object(map) => flatten_object(map, "", config, &mut out),
        Value::Array(items) => flatten_array(items, "", true, config, &mut out),
        scalar => {
            out.insert(SCALAR_COLUMN.to_string(), scalar.clone());
        }
    }
    out
}

fn flatten_object(map: &Map<String, Value>, prefix: &str, config: &FlattenConfig, out: &mut FlatRecord) {
    for (key, value) in map {
        let child = config.child_key(prefix, key);
        match value {
            Value::Object(inner) => flatten_object(inner, &child, config, out),
            Value::Array(items) => flatten_array(items, &child, false, config, out),
            scalar => {
                out.insert(child, scalar.clone());
            }
        }
    }
}

/// Array sampling policy: flatten at most `array_sample_limit` leading
/// elements, then record the true length once when anything was truncated.
/// Non-object elements (including nested arrays) are emitted verbatim.
fn flatten_array(items: &[Value], prefix: &str, at_root: bool, config: &FlattenConfig, out: &mut FlatRecord) {
    let sample = config.array_sample_limit.min(items.len());
    for (index, item) in items.iter().take(sample).enumerate() {
        let child = config.child_key(prefix, &index.to_string());
        match item {
            Value::Object(inner) => flatten_object(inner, &child, config, out),
            other => {
                out.insert(child, other.clone());
            }
        }
    }
    if items.len() > sample {
        let marker = if at_root {
            format!("{prefix}_total_count")
        } else {
            format!("{prefix}_count")
        };
        out.insert(marker, Value::from(items.len()));
    }
}

/// Renders one flattened value as cell text.
///
/// Nulls render as the empty string, the same placeholder used for missing
/// cells. Structures that survive flattening as values (non-object array
/// elements) are encoded as compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}
