//! Field formats for field-copy translators
//!
//! The part of a rule after the first colon names how the raw string is
//! interpreted. `"ID:integer"` copies `ID` as an integer, `"Name"` copies the
//! raw string unchanged.
//!
//! | Format | Aliases | Output |
//! |--------|---------|--------|
//! | (empty) | `string`, `str` | raw string |
//! | `integer` | `int` | i64 |
//! | `float` | `double`, `number` | f64 |
//! | `boolean` | `bool` | bool |
//! | `timestamp` | `date`, `datetime` | RFC 3339 string in UTC |
//! | `timestamp:<pattern>` | | RFC 3339 string, parsed with a chrono pattern |

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

/// Layouts tried, in order, for timestamps without an explicit pattern
const TIMESTAMP_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// A resolved field format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFormat {
    /// Pass the raw value through
    String,
    /// Signed 64-bit integer
    Integer,
    /// 64-bit float
    Float,
    /// Boolean
    Boolean,
    /// Timestamp, optionally with a chrono parse pattern
    Timestamp(Option<String>),
}

impl FieldFormat {
    /// Resolve a format name. Returns `None` for unknown formats.
    pub fn parse(name: &str) -> Option<Self> {
        let (kind, pattern) = match name.split_once(':') {
            Some((kind, pattern)) => (kind.trim(), Some(pattern.trim())),
            None => (name.trim(), None),
        };

        let format = match (kind.to_ascii_lowercase().as_str(), pattern) {
            ("" | "string" | "str", None) => FieldFormat::String,
            ("integer" | "int", None) => FieldFormat::Integer,
            ("float" | "double" | "number", None) => FieldFormat::Float,
            ("boolean" | "bool", None) => FieldFormat::Boolean,
            ("timestamp" | "date" | "datetime", None) => FieldFormat::Timestamp(None),
            ("timestamp" | "date" | "datetime", Some(p)) if !p.is_empty() => {
                FieldFormat::Timestamp(Some(p.to_string()))
            }
            _ => return None,
        };
        Some(format)
    }

    /// True for every format except the pass-through string
    pub fn is_typed(&self) -> bool {
        *self != FieldFormat::String
    }

    /// Convert a raw value.
    ///
    /// A blank value under a typed format is an error here. Translators
    /// decide whether to write `null` for it instead.
    pub fn convert(&self, raw: &str) -> Result<Value, String> {
        if self.is_typed() && raw.trim().is_empty() {
            return Err("empty value".to_string());
        }

        match self {
            FieldFormat::String => Ok(Value::String(raw.to_string())),
            FieldFormat::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| e.to_string()),
            FieldFormat::Float => parse_float(raw),
            FieldFormat::Boolean => parse_bool(raw).map(Value::Bool),
            FieldFormat::Timestamp(pattern) => {
                parse_timestamp(raw, pattern.as_deref()).map(|dt| Value::String(format_timestamp(&dt)))
            }
        }
    }
}

/// Parse a float, rejecting values JSON cannot carry
pub fn parse_float(raw: &str) -> Result<Value, String> {
    let n = raw.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| "not a finite number".to_string())
}

/// Parse a boolean from the usual spellings
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "on" => Ok(true),
        "false" | "f" | "no" | "n" | "0" | "off" => Ok(false),
        other => Err(format!("'{}' is not a boolean", other)),
    }
}

/// Parse a timestamp.
///
/// Without a pattern this accepts RFC 3339, the layouts in
/// [`TIMESTAMP_LAYOUTS`], a plain `%Y-%m-%d` date, or unix seconds. Values
/// without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str, pattern: Option<&str>) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();

    if let Some(pattern) = pattern {
        if let Ok(dt) = DateTime::parse_from_str(raw, pattern) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Ok(dt.and_utc());
        }
        return NaiveDate::parse_from_str(raw, pattern)
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            .map_err(|e| format!("does not match '{}': {}", pattern, e));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for layout in TIMESTAMP_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| format!("unix time {} is out of range", secs));
    }

    Err("unrecognized timestamp".to_string())
}

/// Render a timestamp the way output records carry it
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("", FieldFormat::String)]
    #[case("string", FieldFormat::String)]
    #[case("int", FieldFormat::Integer)]
    #[case("INTEGER", FieldFormat::Integer)]
    #[case("double", FieldFormat::Float)]
    #[case("bool", FieldFormat::Boolean)]
    #[case("timestamp", FieldFormat::Timestamp(None))]
    #[case("date:%d/%m/%Y", FieldFormat::Timestamp(Some("%d/%m/%Y".to_string())))]
    fn test_parse_known_formats(#[case] name: &str, #[case] expected: FieldFormat) {
        assert_eq!(FieldFormat::parse(name), Some(expected));
    }

    #[rstest]
    #[case("currency")]
    #[case("integer:%d")]
    #[case("timestamp:")]
    fn test_parse_unknown_formats(#[case] name: &str) {
        assert_eq!(FieldFormat::parse(name), None);
    }

    #[rstest]
    #[case(FieldFormat::String, " raw ", json!(" raw "))]
    #[case(FieldFormat::Integer, " 42 ", json!(42))]
    #[case(FieldFormat::Integer, "-7", json!(-7))]
    #[case(FieldFormat::Float, "2.5", json!(2.5))]
    #[case(FieldFormat::Boolean, "Yes", json!(true))]
    #[case(FieldFormat::Boolean, "0", json!(false))]
    #[case(FieldFormat::Timestamp(None), "2024-03-01T10:20:30+02:00", json!("2024-03-01T08:20:30Z"))]
    #[case(FieldFormat::Timestamp(None), "2024-03-01 10:20:30", json!("2024-03-01T10:20:30Z"))]
    #[case(FieldFormat::Timestamp(None), "2024-03-01", json!("2024-03-01T00:00:00Z"))]
    #[case(FieldFormat::Timestamp(None), "0", json!("1970-01-01T00:00:00Z"))]
    #[case(FieldFormat::Timestamp(Some("%d/%m/%Y %H:%M".to_string())), "01/03/2024 10:20", json!("2024-03-01T10:20:00Z"))]
    #[case(FieldFormat::Timestamp(Some("%d/%m/%Y".to_string())), "01/03/2024", json!("2024-03-01T00:00:00Z"))]
    fn test_convert(#[case] format: FieldFormat, #[case] raw: &str, #[case] expected: Value) {
        assert_eq!(format.convert(raw).unwrap(), expected);
    }

    #[rstest]
    #[case(FieldFormat::Integer)]
    #[case(FieldFormat::Float)]
    #[case(FieldFormat::Boolean)]
    #[case(FieldFormat::Timestamp(None))]
    fn test_blank_typed_value_is_rejected(#[case] format: FieldFormat) {
        assert!(format.is_typed());
        assert_eq!(format.convert("  ").unwrap_err(), "empty value");
    }

    #[test]
    fn test_blank_string_value_passes_through() {
        assert!(!FieldFormat::String.is_typed());
        assert_eq!(FieldFormat::String.convert("").unwrap(), json!(""));
    }

    #[rstest]
    #[case(FieldFormat::Integer, "4.2")]
    #[case(FieldFormat::Integer, "abc")]
    #[case(FieldFormat::Float, "NaN")]
    #[case(FieldFormat::Boolean, "maybe")]
    #[case(FieldFormat::Timestamp(None), "yesterday")]
    #[case(FieldFormat::Timestamp(Some("%Y".to_string())), "2024-01-01")]
    fn test_convert_errors(#[case] format: FieldFormat, #[case] raw: &str) {
        assert!(format.convert(raw).is_err());
    }
}
