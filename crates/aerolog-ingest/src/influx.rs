// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB v2 Line Protocol point model and encoder.
//!
//! Line Protocol format:
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp
//! ```
//!
//! Timestamps are microseconds since the Unix epoch; the write side must
//! submit with `precision=us`.
//!
//! See: <https://docs.influxdata.com/influxdb/v2/reference/syntax/line-protocol/>

use std::fmt;

/// A value that can be stored in an InfluxDB field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit floating point.
    Float(f64),
    /// 64-bit signed integer.
    Integer(i64),
    /// UTF-8 string.
    String(String),
    /// Boolean value.
    Boolean(bool),
}

impl FieldValue {
    /// Format this value for InfluxDB Line Protocol.
    ///
    /// - Float: written as-is (e.g., `3.14`)
    /// - Integer: suffixed with `i` (e.g., `42i`)
    /// - String: quoted with double quotes, inner quotes escaped (e.g., `"hello"`)
    /// - Boolean: `true` or `false`
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Float(v) => format!("{}", v),
            FieldValue::Integer(v) => format!("{}i", v),
            FieldValue::String(v) => {
                let escaped = v.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{}\"", escaped)
            }
            FieldValue::Boolean(v) => {
                if *v {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
        }
    }

    /// Convert a JSON value to a field value with type inference.
    ///
    /// Returns `None` for null, arrays and objects (not valid field values).
    pub fn from_json(val: &serde_json::Value) -> Option<FieldValue> {
        match val {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(FieldValue::Integer(i))
                } else {
                    n.as_f64().map(FieldValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(FieldValue::String(s.clone())),
            serde_json::Value::Bool(b) => Some(FieldValue::Boolean(*b)),
            serde_json::Value::Null => None,
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line_protocol())
    }
}

/// A single time-series point.
///
/// Tags and fields keep their insertion order; downstream consumers rely on
/// stable column ordering per measurement, so the encoder must not reorder.
///
/// Invariant: `fields` is never empty. Use [`build_point`] to construct
/// points; it enforces the invariant by refusing to build empty ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Measurement name (message-type label).
    pub measurement: String,
    /// Tag set, insertion-ordered.
    pub tags: Vec<(String, String)>,
    /// Field set, insertion-ordered.
    pub fields: Vec<(String, FieldValue)>,
    /// Microseconds since the Unix epoch.
    pub timestamp_us: u64,
}

impl Point {
    /// Encode this point as one Line Protocol line (no trailing newline).
    ///
    /// The tag section is omitted entirely when the point has no tags.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.measurement);

        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape_tag(key));
            line.push('=');
            line.push_str(&escape_tag(value));
        }

        line.push(' ');

        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&escape_tag(key));
            line.push('=');
            line.push_str(&value.to_line_protocol());
        }

        line.push(' ');
        line.push_str(&self.timestamp_us.to_string());

        line
    }

    /// Append a tag, preserving insertion order.
    pub fn push_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.push((key.into(), value.into()));
    }
}

/// Assemble a point from optional tag and field values.
///
/// Absent (`None`) tags and fields are dropped. Returns `None` when the
/// filtered field set is empty: a point with no fields is a no-op record
/// and must never reach a sink.
pub fn build_point(
    measurement: &str,
    tags: Vec<(String, Option<String>)>,
    fields: Vec<(String, Option<FieldValue>)>,
    timestamp_us: u64,
) -> Option<Point> {
    let fields: Vec<(String, FieldValue)> = fields
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect();

    if fields.is_empty() {
        return None;
    }

    let tags: Vec<(String, String)> = tags
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect();

    Some(Point {
        measurement: measurement.to_string(),
        tags,
        fields,
        timestamp_us,
    })
}

/// Escape measurement name per Line Protocol spec.
/// Spaces and commas must be escaped with backslash.
fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Escape tag keys/values and field keys per Line Protocol spec.
/// Commas, equals signs, and spaces must be escaped.
fn escape_tag(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
