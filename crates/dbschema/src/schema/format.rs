//! Read-back value coercion by simple type.

use std::fmt::Write;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::config::DateTimeFormats;
use crate::core::{SimpleType, Value};

const DATETIME_INPUTS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y%m%d %H:%M:%S",
];

/// Coerce a value read from the database to the host form of `simple`.
///
/// Values that do not parse as the target type are returned unchanged.
pub fn format_value(formats: &DateTimeFormats, value: Value, simple: SimpleType) -> Value {
    if value.is_null() {
        return value;
    }
    match simple {
        SimpleType::Boolean => value.as_bool().map(Value::Bool).unwrap_or(value),
        t if t.is_integer() => value.as_i64().map(Value::Int).unwrap_or(value),
        SimpleType::Float | SimpleType::Double => {
            value.as_f64().map(Value::Float).unwrap_or(value)
        }
        SimpleType::Decimal | SimpleType::Money => match value.to_text() {
            Some(text) => parse_decimal(&text)
                .map(|d| Value::Text(d.to_string()))
                .unwrap_or(value),
            None => value,
        },
        SimpleType::String | SimpleType::Text => match value {
            Value::Text(_) | Value::Bytes(_) => value,
            other => other.to_text().map(Value::Text).unwrap_or(Value::Null),
        },
        t if t.is_temporal() => {
            let rendered = match (formats.for_type(t), value.as_str()) {
                (Some(format), Some(text)) => Some(format_date_time(format, text)),
                _ => None,
            };
            rendered.map(Value::Text).unwrap_or(value)
        }
        _ => value,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Re-render a date/time string with `out_format`.
///
/// Accepts RFC 3339, ISO-like datetimes, plain dates and plain times.
/// Input that matches none of them, or a format that cannot render the
/// parsed value, yields the input unchanged.
pub fn format_date_time(out_format: &str, value: &str) -> String {
    let value_trim = value.trim();
    let mut out = String::new();
    let written = if let Ok(dt) = DateTime::parse_from_rfc3339(value_trim) {
        write!(out, "{}", dt.naive_local().format(out_format))
    } else if let Some(dt) = DATETIME_INPUTS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value_trim, f).ok())
    {
        write!(out, "{}", dt.format(out_format))
    } else if let Ok(date) = NaiveDate::parse_from_str(value_trim, "%Y-%m-%d") {
        match date.and_hms_opt(0, 0, 0) {
            Some(dt) => write!(out, "{}", dt.format(out_format)),
            None => return value.to_string(),
        }
    } else if let Ok(time) = NaiveTime::parse_from_str(value_trim, "%H:%M:%S%.f") {
        write!(out, "{}", time.format(out_format))
    } else {
        return value.to_string();
    };
    match written {
        Ok(()) => out,
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> DateTimeFormats {
        DateTimeFormats::default()
    }

    #[test]
    fn test_scalar_coercions() {
        let f = formats();
        assert_eq!(
            format_value(&f, Value::Text("42".into()), SimpleType::Integer),
            Value::Int(42)
        );
        assert_eq!(
            format_value(&f, Value::Int(1), SimpleType::Boolean),
            Value::Bool(true)
        );
        assert_eq!(
            format_value(&f, Value::Text("2.5".into()), SimpleType::Double),
            Value::Float(2.5)
        );
        assert_eq!(
            format_value(&f, Value::Int(7), SimpleType::String),
            Value::Text("7".into())
        );
        assert_eq!(format_value(&f, Value::Null, SimpleType::Integer), Value::Null);
    }

    #[test]
    fn test_decimal_kept_exact() {
        let f = formats();
        assert_eq!(
            format_value(&f, Value::Text(" 19.9900 ".into()), SimpleType::Money),
            Value::Text("19.9900".into())
        );
        assert_eq!(
            format_value(&f, Value::Text("n/a".into()), SimpleType::Decimal),
            Value::Text("n/a".into())
        );
    }

    #[test]
    fn test_temporal_formats() {
        let mut f = formats();
        f.date = "%d/%m/%Y".into();
        assert_eq!(
            format_value(&f, Value::Text("2024-03-01".into()), SimpleType::Date),
            Value::Text("01/03/2024".into())
        );
        assert_eq!(
            format_value(
                &f,
                Value::Text("2024-03-01T10:20:30.123".into()),
                SimpleType::Timestamp
            ),
            Value::Text("2024-03-01 10:20:30".into())
        );
        assert_eq!(format_date_time("%H:%M", "10:20:30"), "10:20");
        assert_eq!(
            format_date_time("%Y-%m-%d", "2024-03-01T10:20:30+02:00"),
            "2024-03-01"
        );
    }

    #[test]
    fn test_unparseable_dates_pass_through() {
        assert_eq!(format_date_time("%Y", "0000-00-00 00:00:00"), "0000-00-00 00:00:00");
        // A time cannot render a year.
        assert_eq!(format_date_time("%Y", "10:20:30"), "10:20:30");
    }
}
