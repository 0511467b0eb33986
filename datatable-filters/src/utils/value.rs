//! Interpreting raw accessor values as numbers and dates.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// A finite number, or `None`.
pub fn as_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

/// A timestamp from an RFC 3339 string, a `YYYY-MM-DD` string, or epoch
/// milliseconds. Anything else (including invalid dates) is `None`.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            }),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Flatten one level of arrays, as the accessor of a multi-value column
/// yields a list per row.
pub fn flatten_one(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out = Vec::new();
    for value in values {
        match value {
            Value::Array(items) => out.extend(items),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn as_number_accepts_only_numbers() {
        assert_eq!(as_number(&json!(3)), Some(3.0));
        assert_eq!(as_number(&json!(2.5)), Some(2.5));
        assert_eq!(as_number(&json!("3")), None);
        assert_eq!(as_number(&json!(null)), None);
    }

    #[test]
    fn parse_date_formats() {
        let dt = parse_date(&json!("2024-03-05T10:30:00+02:00")).unwrap();
        assert_eq!(dt.hour(), 8);

        let day = parse_date(&json!("2024-03-05")).unwrap();
        assert_eq!((day.year(), day.month(), day.day()), (2024, 3, 5));

        let epoch = parse_date(&json!(0)).unwrap();
        assert_eq!(epoch.year(), 1970);
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date(&json!("not a date")).is_none());
        assert!(parse_date(&json!("2024-13-40")).is_none());
        assert!(parse_date(&json!(true)).is_none());
    }

    #[test]
    fn flatten_one_only_flattens_one_level() {
        let out = flatten_one(vec![json!(["a", ["b"]]), json!("c")]);
        assert_eq!(out, vec![json!("a"), json!(["b"]), json!("c")]);
    }
}
