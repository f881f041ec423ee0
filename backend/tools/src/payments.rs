//! Payment tools: recording payments and revenue / pending aggregates.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use ledgerforge_core::{ParamField, ParamSchema, ToolResult, ToolSpec};
use ledgerforge_store::{Collection, RecordFilter};

use crate::calendar::{month_end, month_start, NoArgs};
use crate::clients::{parse_status, records_json};
use crate::handler::{compact, format_amount, round2, try_store, Handler, ToolContext};
use crate::lenient;

pub const PAYMENT_STATUSES: &[&str] = &["received", "pending"];
pub const PAYMENT_METHODS: &[&str] = &["cash", "bank_transfer", "card", "upi", "cheque", "other"];

const PENDING_LIST_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentArgs {
    #[serde(deserialize_with = "lenient::text")]
    pub project_id: String,
    #[serde(deserialize_with = "lenient::number")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub notes: Option<String>,
}

pub struct RecordPayment;

#[async_trait]
impl Handler for RecordPayment {
    type Args = RecordPaymentArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "recordPayment",
            "Record a payment against a project. Use status 'pending' for money that is expected but not yet received.",
        )
        .param(ParamField::required("projectId", ParamSchema::string(), "ID of the project being paid for"))
        .param(ParamField::required("amount", ParamSchema::Number, "Payment amount"))
        .param(ParamField::optional("date", ParamSchema::string(), "Payment date, YYYY-MM-DD (default today)"))
        .param(ParamField::optional("method", ParamSchema::one_of(PAYMENT_METHODS), "Payment method"))
        .param(ParamField::optional("status", ParamSchema::one_of(PAYMENT_STATUSES), "received (default) or pending"))
        .param(ParamField::optional("notes", ParamSchema::string(), "Free-form notes"))
    }

    async fn handle(&self, args: RecordPaymentArgs, cx: &ToolContext<'_>) -> ToolResult {
        if args.amount <= 0.0 {
            return ToolResult::failure("Payment amount must be greater than zero");
        }
        let status = match parse_status(args.status.as_deref(), PAYMENT_STATUSES) {
            Ok(status) => status.unwrap_or_else(|| "received".to_string()),
            Err(failure) => return failure,
        };
        let method = args
            .method
            .as_deref()
            .map(|m| m.trim().to_lowercase().replace([' ', '-'], "_"))
            .map(|m| if PAYMENT_METHODS.contains(&m.as_str()) { m } else { "other".to_string() });

        let project = try_store!(cx.store.get(cx.account, Collection::Projects, &args.project_id).await, "record payment");
        let Some(project) = project else {
            return ToolResult::failure(format!("Project not found: {}", args.project_id));
        };

        let date = args.date.unwrap_or_else(|| cx.today());
        let doc = compact(json!({
            "projectId": project.id,
            "projectName": project.str_field("name"),
            "clientId": project.str_field("clientId"),
            "clientName": project.str_field("clientName"),
            "amount": round2(args.amount),
            "date": date.to_string(),
            "method": method,
            "status": status,
            "notes": args.notes,
        }));
        let payment = try_store!(cx.store.insert(cx.account, Collection::Payments, doc).await, "record payment");
        ToolResult::ok_with_message(
            format!(
                "Recorded {} payment of {} for '{}' on {}",
                status,
                format_amount(args.amount),
                project.str_field("name").unwrap_or(&args.project_id),
                date
            ),
            json!({ "payment": payment.to_json() }),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeArgs {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub end_date: Option<NaiveDate>,
}

impl DateRangeArgs {
    /// Explicit bounds, falling back to the month containing `today`.
    pub fn resolve(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ToolResult> {
        let start = self.start_date.unwrap_or_else(|| month_start(today));
        let end = self.end_date.unwrap_or_else(|| month_end(today));
        if end < start {
            return Err(ToolResult::failure("End date cannot be before start date"));
        }
        Ok((start, end))
    }
}

pub struct GetRevenueSummary;

#[async_trait]
impl Handler for GetRevenueSummary {
    type Args = DateRangeArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "getRevenueSummary",
            "Total received revenue between two dates (defaults to the current month).",
        )
        .param(ParamField::optional("startDate", ParamSchema::string(), "Range start, YYYY-MM-DD"))
        .param(ParamField::optional("endDate", ParamSchema::string(), "Range end, YYYY-MM-DD"))
    }

    async fn handle(&self, args: DateRangeArgs, cx: &ToolContext<'_>) -> ToolResult {
        let (start, end) = match args.resolve(cx.today()) {
            Ok(range) => range,
            Err(failure) => return failure,
        };
        let filter = RecordFilter::new()
            .eq("status", "received")
            .between("date", Some(start), Some(end));
        let total = try_store!(
            cx.store.sum(cx.account, Collection::Payments, "amount", &filter).await,
            "calculate revenue"
        )
        .unwrap_or(0.0);
        let payments = try_store!(cx.store.find(cx.account, Collection::Payments, &filter).await, "calculate revenue");

        ToolResult::ok_with_message(
            format!("Revenue from {start} to {end}: {}", format_amount(total)),
            json!({
                "startDate": start.to_string(),
                "endDate": end.to_string(),
                "totalRevenue": round2(total),
                "paymentCount": payments.len(),
            }),
        )
    }
}

pub struct GetPendingPayments;

#[async_trait]
impl Handler for GetPendingPayments {
    type Args = NoArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new("getPendingPayments", "Total of payments still pending, with the most recent pending entries.")
    }

    async fn handle(&self, _args: NoArgs, cx: &ToolContext<'_>) -> ToolResult {
        let filter = RecordFilter::new().eq("status", "pending");
        let total = try_store!(
            cx.store.sum(cx.account, Collection::Payments, "amount", &filter).await,
            "calculate pending payments"
        )
        .unwrap_or(0.0);
        let recent = try_store!(
            cx.store
                .find(cx.account, Collection::Payments, &filter.clone().limit(PENDING_LIST_LIMIT))
                .await,
            "calculate pending payments"
        );

        ToolResult::ok_with_message(
            format!("Pending payments total {}", format_amount(total)),
            json!({
                "totalPending": round2(total),
                "count": recent.len(),
                "payments": records_json(&recent),
            }),
        )
    }
}
