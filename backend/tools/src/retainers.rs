//! Retainer summary.

use async_trait::async_trait;
use serde_json::json;

use ledgerforge_core::{ToolResult, ToolSpec};
use ledgerforge_store::{Collection, RecordFilter};

use crate::calendar::NoArgs;
use crate::clients::records_json;
use crate::handler::{format_amount, round2, try_store, Handler, ToolContext};

pub struct GetRetainerSummary;

#[async_trait]
impl Handler for GetRetainerSummary {
    type Args = NoArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "getRetainerSummary",
            "Active retainer agreements and the monthly recurring revenue they bring in.",
        )
    }

    async fn handle(&self, _args: NoArgs, cx: &ToolContext<'_>) -> ToolResult {
        let filter = RecordFilter::new().eq("status", "active");
        let monthly = try_store!(
            cx.store.sum(cx.account, Collection::Retainers, "monthlyAmount", &filter).await,
            "summarize retainers"
        )
        .unwrap_or(0.0);
        let retainers = try_store!(cx.store.find(cx.account, Collection::Retainers, &filter).await, "summarize retainers");

        ToolResult::ok_with_message(
            format!(
                "{} active retainer(s) worth {} per month",
                retainers.len(),
                format_amount(monthly)
            ),
            json!({
                "activeCount": retainers.len(),
                "monthlyTotal": round2(monthly),
                "retainers": records_json(&retainers),
            }),
        )
    }
}
