//! Invoice tools.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use ledgerforge_core::{ParamField, ParamSchema, ToolResult, ToolSpec};
use ledgerforge_store::filter::parse_date;
use ledgerforge_store::{Collection, RecordFilter};

use crate::calendar::NoArgs;
use crate::handler::{compact, format_amount, round2, try_store, Handler, ToolContext};
use crate::lenient;

const DEFAULT_PAYMENT_TERMS_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct LineItem {
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub quantity: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub rate: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceArgs {
    #[serde(deserialize_with = "lenient::text")]
    pub client_id: String,
    pub items: Vec<LineItem>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub notes: Option<String>,
}

pub struct CreateInvoice;

fn invoice_number(today: NaiveDate) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!("INV-{}-{}", today.format("%Y%m%d"), suffix)
}

#[async_trait]
impl Handler for CreateInvoice {
    type Args = CreateInvoiceArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "createInvoice",
            "Create an unpaid invoice for a client from one or more line items.",
        )
        .param(ParamField::required("clientId", ParamSchema::string(), "ID of the client being billed"))
        .param(ParamField::required(
            "items",
            ParamSchema::array_of(ParamSchema::object(vec![
                ParamField::required("description", ParamSchema::string(), "What is being billed"),
                ParamField::optional("quantity", ParamSchema::Number, "Quantity (default 1)"),
                ParamField::required("rate", ParamSchema::Number, "Price per unit"),
            ])),
            "Invoice line items",
        ))
        .param(ParamField::optional("dueDate", ParamSchema::string(), "Due date, YYYY-MM-DD (default 30 days from today)"))
        .param(ParamField::optional("notes", ParamSchema::string(), "Notes printed on the invoice"))
    }

    async fn handle(&self, args: CreateInvoiceArgs, cx: &ToolContext<'_>) -> ToolResult {
        if args.items.is_empty() {
            return ToolResult::failure("An invoice needs at least one line item");
        }
        let mut lines = Vec::with_capacity(args.items.len());
        let mut total = 0.0;
        for item in &args.items {
            let quantity = item.quantity.unwrap_or(1.0);
            if quantity <= 0.0 || item.rate < 0.0 {
                return ToolResult::failure(format!(
                    "Invalid line item '{}': quantity must be positive and rate non-negative",
                    item.description
                ));
            }
            let amount = round2(quantity * item.rate);
            total += amount;
            lines.push(json!({
                "description": item.description,
                "quantity": quantity,
                "rate": round2(item.rate),
                "amount": amount,
            }));
        }

        let today = cx.today();
        let due = args
            .due_date
            .unwrap_or_else(|| today + Duration::days(DEFAULT_PAYMENT_TERMS_DAYS));
        if due < today {
            return ToolResult::failure("Due date cannot be in the past");
        }

        let client = try_store!(cx.store.get(cx.account, Collection::Clients, &args.client_id).await, "create invoice");
        let Some(client) = client else {
            return ToolResult::failure(format!("Client not found: {}", args.client_id));
        };

        let number = invoice_number(today);
        let doc = compact(json!({
            "invoiceNumber": number,
            "clientId": client.id,
            "clientName": client.str_field("name"),
            "items": lines,
            "total": round2(total),
            "issueDate": today.to_string(),
            "dueDate": due.to_string(),
            "status": "unpaid",
            "notes": args.notes,
        }));
        let invoice = try_store!(cx.store.insert(cx.account, Collection::Invoices, doc).await, "create invoice");
        ToolResult::ok_with_message(
            format!(
                "Created invoice {} for {} totalling {}, due {}",
                number,
                client.str_field("name").unwrap_or("the client"),
                format_amount(total),
                due
            ),
            json!({ "invoice": invoice.to_json() }),
        )
    }
}

pub struct GetOverdueInvoices;

#[async_trait]
impl Handler for GetOverdueInvoices {
    type Args = NoArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "getOverdueInvoices",
            "List unpaid invoices whose due date has passed, with the total amount outstanding.",
        )
    }

    async fn handle(&self, _args: NoArgs, cx: &ToolContext<'_>) -> ToolResult {
        let today = cx.today();
        let filter = RecordFilter::new()
            .ne("status", "paid")
            .ne("status", "cancelled")
            .between("dueDate", None, Some(today - Duration::days(1)));
        let total = try_store!(
            cx.store.sum(cx.account, Collection::Invoices, "total", &filter).await,
            "load overdue invoices"
        )
        .unwrap_or(0.0);
        let invoices = try_store!(
            cx.store.find(cx.account, Collection::Invoices, &filter).await,
            "load overdue invoices"
        );

        let overdue: Vec<Value> = invoices
            .iter()
            .map(|inv| {
                let days_overdue = inv
                    .str_field("dueDate")
                    .and_then(parse_date)
                    .map(|due| (today - due).num_days());
                json!({
                    "id": inv.id,
                    "invoiceNumber": inv.str_field("invoiceNumber"),
                    "clientName": inv.str_field("clientName"),
                    "total": inv.num_field("total").map(round2),
                    "dueDate": inv.str_field("dueDate"),
                    "daysOverdue": days_overdue,
                })
            })
            .collect();

        ToolResult::ok_with_message(
            format!("{} overdue invoice(s) totalling {}", overdue.len(), format_amount(total)),
            json!({
                "totalOverdue": round2(total),
                "count": overdue.len(),
                "invoices": overdue,
            }),
        )
    }
}
