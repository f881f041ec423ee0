//! Informational tools: current date/time and business-period context.
//!
//! Both take no parameters, always succeed, and read nothing but the
//! invocation time.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use ledgerforge_core::{ToolResult, ToolSpec};

use crate::handler::{Handler, ToolContext};

#[derive(Debug, Default, Deserialize)]
pub struct NoArgs {}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|next| next - Duration::days(1))
        .unwrap_or(date)
}

pub fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

pub fn quarter_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first_month = (quarter_of(date) - 1) * 3 + 1;
    let start = NaiveDate::from_ymd_opt(date.year(), first_month, 1).unwrap_or(date);
    let end = month_end(NaiveDate::from_ymd_opt(date.year(), first_month + 2, 1).unwrap_or(date));
    (start, end)
}

pub struct GetCurrentDateTime;

#[async_trait]
impl Handler for GetCurrentDateTime {
    type Args = NoArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "getCurrentDateTime",
            "Get the current date, time and weekday. Use this to resolve relative dates like 'today' or 'last Friday'.",
        )
    }

    async fn handle(&self, _args: NoArgs, cx: &ToolContext<'_>) -> ToolResult {
        let now = cx.now;
        ToolResult::ok_with_message(
            format!("It is {}", now.format("%A, %B %-d, %Y %H:%M")),
            json!({
                "datetime": now.to_rfc3339(),
                "date": now.format("%Y-%m-%d").to_string(),
                "time": now.format("%H:%M").to_string(),
                "weekday": now.format("%A").to_string(),
                "utcOffset": now.format("%:z").to_string(),
            }),
        )
    }
}

pub struct GetBusinessContext;

#[async_trait]
impl Handler for GetBusinessContext {
    type Args = NoArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "getBusinessContext",
            "Get the current business periods: this month, previous month, quarter and year with their date ranges. Use it before date-bounded summaries.",
        )
    }

    async fn handle(&self, _args: NoArgs, cx: &ToolContext<'_>) -> ToolResult {
        let today = cx.today();
        let this_month = month_start(today);
        let prev_month_end = this_month - Duration::days(1);
        let (q_start, q_end) = quarter_bounds(today);
        let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
        let year_end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);

        ToolResult::ok(json!({
            "today": today.to_string(),
            "month": {
                "name": today.format("%B %Y").to_string(),
                "start": this_month.to_string(),
                "end": month_end(today).to_string(),
                "daysRemaining": (month_end(today) - today).num_days(),
            },
            "previousMonth": {
                "name": prev_month_end.format("%B %Y").to_string(),
                "start": month_start(prev_month_end).to_string(),
                "end": prev_month_end.to_string(),
            },
            "quarter": {
                "number": quarter_of(today),
                "start": q_start.to_string(),
                "end": q_end.to_string(),
            },
            "year": {
                "number": today.year(),
                "start": year_start.to_string(),
                "end": year_end.to_string(),
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ToolOptions;
    use chrono::{Local, TimeZone};
    use ledgerforge_core::AccountContext;
    use ledgerforge_store::InMemoryStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_and_quarter_bounds() {
        assert_eq!(month_end(d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(month_end(d(2026, 12, 5)), d(2026, 12, 31));
        assert_eq!(quarter_bounds(d(2026, 10, 19)), (d(2026, 10, 1), d(2026, 12, 31)));
        assert_eq!(quarter_of(d(2026, 3, 31)), 1);
    }

    #[tokio::test]
    async fn test_business_context_from_invocation_time() {
        let store = InMemoryStore::new();
        let account = AccountContext::new("a").unwrap();
        let options = ToolOptions::default();
        let cx = ToolContext {
            store: &store,
            account: &account,
            now: Local.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
            options: &options,
        };
        let result = GetBusinessContext.handle(NoArgs::default(), &cx).await;
        assert!(result.is_success());
        let data = result.data().unwrap();
        assert_eq!(data["previousMonth"]["start"], "2025-12-01");
        assert_eq!(data["quarter"]["number"], 1);
        assert_eq!(data["month"]["daysRemaining"], 16);

        let result = GetCurrentDateTime.handle(NoArgs::default(), &cx).await;
        assert_eq!(result.data().unwrap()["date"], "2026-01-15");
        assert_eq!(result.data().unwrap()["weekday"], "Thursday");
    }
}
