use chrono::NaiveDate;
use serde_json::Value;

/// Inclusive date bounds on a `YYYY-MM-DD` field.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub field: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Selection applied within one account's collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Case-insensitive substring match on the `name` field.
    pub name_contains: Option<String>,
    /// Exact field equality. String comparison ignores case.
    pub equals: Vec<(String, Value)>,
    /// Fields that must not equal the given value.
    pub not_equals: Vec<(String, Value)>,
    pub date_range: Option<DateRange>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_contains(mut self, needle: impl Into<String>) -> Self {
        self.name_contains = Some(needle.into());
        self
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    pub fn ne(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.not_equals.push((field.into(), value.into()));
        self
    }

    pub fn between(mut self, field: impl Into<String>, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_range = Some(DateRange {
            field: field.into(),
            from,
            to,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, data: &Value) -> bool {
        if let Some(needle) = &self.name_contains {
            let needle = needle.to_lowercase();
            let Some(name) = data.get("name").and_then(Value::as_str) else {
                return false;
            };
            if !name.to_lowercase().contains(&needle) {
                return false;
            }
        }

        if !self
            .equals
            .iter()
            .all(|(field, expected)| data.get(field).is_some_and(|v| values_equal(v, expected)))
        {
            return false;
        }

        if self
            .not_equals
            .iter()
            .any(|(field, rejected)| data.get(field).is_some_and(|v| values_equal(v, rejected)))
        {
            return false;
        }

        if let Some(range) = &self.date_range {
            let Some(date) = data.get(&range.field).and_then(Value::as_str).and_then(parse_date) else {
                return false;
            };
            if range.from.is_some_and(|from| date < from) || range.to.is_some_and(|to| date > to) {
                return false;
            }
        }

        true
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        (a, b) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => a == b,
        },
    }
}

/// Accepts `YYYY-MM-DD` or any RFC 3339 timestamp starting with one.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let head = s.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Numbers, or strings holding a number.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Sum `field` over `docs`. `None` when no document carries a number there.
pub fn sum_field<'a>(docs: impl Iterator<Item = &'a Value>, field: &str) -> Option<f64> {
    docs.filter_map(|d| d.get(field).and_then(as_number))
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn name_match_is_case_insensitive_partial() {
        let f = RecordFilter::new().name_contains("ACME");
        assert!(f.matches(&json!({ "name": "The Acme Corp" })));
        assert!(!f.matches(&json!({ "name": "Globex" })));
        assert!(!f.matches(&json!({ "title": "acme" })));
    }

    #[test]
    fn date_range_is_inclusive() {
        let d = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let f = RecordFilter::new().between("date", Some(d("2026-10-01")), Some(d("2026-10-31")));
        assert!(f.matches(&json!({ "date": "2026-10-01" })));
        assert!(f.matches(&json!({ "date": "2026-10-31T10:00:00Z" })));
        assert!(!f.matches(&json!({ "date": "2026-11-01" })));
        assert!(!f.matches(&json!({})));
    }

    #[test]
    fn equality_ignores_case_and_number_format() {
        let f = RecordFilter::new().eq("status", "Pending").ne("amount", 0);
        assert!(f.matches(&json!({ "status": "pending", "amount": "12" })));
        assert!(!f.matches(&json!({ "status": "pending", "amount": 0.0 })));
    }

    #[test]
    fn sum_of_nothing_is_none() {
        let docs = [json!({ "amount": null }), json!({})];
        assert_eq!(sum_field(docs.iter(), "amount"), None);
        let docs = [json!({ "amount": 5 }), json!({ "amount": "2.5" })];
        assert_eq!(sum_field(docs.iter(), "amount"), Some(7.5));
    }
}
