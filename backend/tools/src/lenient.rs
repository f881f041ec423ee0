//! Forgiving deserializers for model-produced arguments.
//!
//! The catalog tells the model what types to send, but compliance is not
//! guaranteed: amounts arrive as `"500"` or `"$1,200"`, optional fields as
//! empty strings, counts as floats.

use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
    cleaned.parse().ok().filter(|v: &f64| v.is_finite())
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    value_to_f64(&value).ok_or_else(|| de::Error::custom(format!("expected a number, got {value}")))
}

pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(v) => value_to_f64(&v)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a number, got {v}"))),
    }
}

pub fn opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    Ok(opt_number(d)?.filter(|v| *v >= 1.0).map(|v| v.round() as usize))
}

/// Required string; trimmed, must not be blank.
pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    value_to_string(value).ok_or_else(|| de::Error::custom("expected a non-empty string"))
}

/// Optional string; blank means absent.
pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(value_to_string))
}

/// Optional `YYYY-MM-DD` date; blank means absent, anything else unparsable is an error.
pub fn opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    match opt_text(d)? {
        None => Ok(None),
        Some(raw) => ledgerforge_store::filter::parse_date(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a YYYY-MM-DD date, got '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "number")]
        amount: f64,
        #[serde(default, deserialize_with = "opt_text")]
        note: Option<String>,
        #[serde(default, deserialize_with = "opt_date")]
        date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "opt_count")]
        limit: Option<usize>,
    }

    #[test]
    fn coerces_strings_and_blanks() {
        let p: Sample = serde_json::from_value(json!({
            "amount": "$1,200.50", "note": "   ", "date": "2026-10-19", "limit": 3.0
        }))
        .unwrap();
        assert_eq!(p.amount, 1200.5);
        assert_eq!(p.note, None);
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2026, 10, 19));
        assert_eq!(p.limit, Some(3));
    }

    #[test]
    fn missing_optionals_default() {
        let p: Sample = serde_json::from_value(json!({ "amount": 5 })).unwrap();
        assert!(p.note.is_none() && p.date.is_none() && p.limit.is_none());
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_value::<Sample>(json!({ "amount": "lots" })).is_err());
        assert!(serde_json::from_value::<Sample>(json!({ "amount": 1, "date": "tomorrow" })).is_err());
    }
}
