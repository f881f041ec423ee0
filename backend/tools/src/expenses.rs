//! Expense tools: quick capture with category inference, and summaries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use ledgerforge_core::{ParamField, ParamSchema, ToolResult, ToolSpec};
use ledgerforge_store::{Collection, RecordFilter};

use crate::handler::{compact, format_amount, round2, try_store, Handler, ToolContext};
use crate::lenient;
use crate::payments::DateRangeArgs;

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "MEALS",
    "TRAVEL",
    "SOFTWARE",
    "OFFICE",
    "MARKETING",
    "UTILITIES",
    "EQUIPMENT",
    "PROFESSIONAL_SERVICES",
    "OTHER",
];

/// Keyword table, checked in order; the first category with a matching word wins.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("MEALS", &["lunch", "dinner", "breakfast", "coffee", "meal", "meals", "restaurant", "food", "snacks", "tea"]),
    ("TRAVEL", &["uber", "taxi", "cab", "flight", "train", "hotel", "fuel", "petrol", "gas", "parking", "travel", "airfare"]),
    ("SOFTWARE", &["software", "subscription", "saas", "license", "hosting", "domain", "github", "figma", "adobe"]),
    ("OFFICE", &["stationery", "paper", "printer", "ink", "office", "supplies", "rent", "furniture"]),
    ("MARKETING", &["ads", "advertising", "marketing", "promotion", "campaign", "flyers", "sponsorship"]),
    ("UTILITIES", &["internet", "electricity", "phone", "mobile", "water", "utility", "utilities", "broadband"]),
    ("EQUIPMENT", &["laptop", "computer", "monitor", "camera", "equipment", "hardware", "keyboard", "headphones"]),
    ("PROFESSIONAL_SERVICES", &["lawyer", "legal", "accountant", "accounting", "consultant", "consulting", "audit", "bookkeeping"]),
];

/// Infer a category from free text, `OTHER` when nothing matches.
pub fn infer_category(description: &str) -> &'static str {
    let lowered = description.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| words.iter().any(|w| keywords.contains(w)))
        .map(|(category, _)| *category)
        .unwrap_or("OTHER")
}

fn normalize_category(raw: &str) -> Option<&'static str> {
    let upper = raw.trim().to_uppercase().replace([' ', '-'], "_");
    EXPENSE_CATEGORIES.iter().copied().find(|c| *c == upper)
}

#[derive(Debug, Deserialize)]
pub struct AddQuickExpenseArgs {
    #[serde(deserialize_with = "lenient::number")]
    pub amount: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,
}

pub struct AddQuickExpense;

#[async_trait]
impl Handler for AddQuickExpense {
    type Args = AddQuickExpenseArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "addQuickExpense",
            "Record a business expense. The category is inferred from the description when not given.",
        )
        .param(ParamField::required("amount", ParamSchema::Number, "Expense amount"))
        .param(ParamField::required("description", ParamSchema::string(), "What the money was spent on"))
        .param(ParamField::optional("category", ParamSchema::one_of(EXPENSE_CATEGORIES), "Expense category"))
        .param(ParamField::optional("date", ParamSchema::string(), "Expense date, YYYY-MM-DD (default today)"))
    }

    async fn handle(&self, args: AddQuickExpenseArgs, cx: &ToolContext<'_>) -> ToolResult {
        if args.amount <= 0.0 {
            return ToolResult::failure("Expense amount must be greater than zero");
        }
        let category = args
            .category
            .as_deref()
            .and_then(normalize_category)
            .unwrap_or_else(|| infer_category(&args.description));
        let date = args.date.unwrap_or_else(|| cx.today());

        let doc = compact(json!({
            "amount": round2(args.amount),
            "description": args.description,
            "category": category,
            "date": date.to_string(),
        }));
        let expense = try_store!(cx.store.insert(cx.account, Collection::Expenses, doc).await, "add expense");
        ToolResult::ok_with_message(
            format!(
                "Added expense of {} for {} ({}) on {}",
                format_amount(args.amount),
                args.description,
                category,
                date
            ),
            json!({ "expense": expense.to_json() }),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ExpenseSummaryArgs {
    #[serde(flatten)]
    pub range: DateRangeArgs,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub category: Option<String>,
}

pub struct GetExpenseSummary;

#[async_trait]
impl Handler for GetExpenseSummary {
    type Args = ExpenseSummaryArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "getExpenseSummary",
            "Total expenses between two dates (defaults to the current month), broken down by category.",
        )
        .param(ParamField::optional("startDate", ParamSchema::string(), "Range start, YYYY-MM-DD"))
        .param(ParamField::optional("endDate", ParamSchema::string(), "Range end, YYYY-MM-DD"))
        .param(ParamField::optional("category", ParamSchema::one_of(EXPENSE_CATEGORIES), "Only this category"))
    }

    async fn handle(&self, args: ExpenseSummaryArgs, cx: &ToolContext<'_>) -> ToolResult {
        let (start, end) = match args.range.resolve(cx.today()) {
            Ok(range) => range,
            Err(failure) => return failure,
        };
        let mut filter = RecordFilter::new().between("date", Some(start), Some(end));
        if let Some(raw) = &args.category {
            let Some(category) = normalize_category(raw) else {
                return ToolResult::failure(format!(
                    "Unknown category '{raw}'. Use one of: {}",
                    EXPENSE_CATEGORIES.join(", ")
                ));
            };
            filter = filter.eq("category", category);
        }

        let total = try_store!(
            cx.store.sum(cx.account, Collection::Expenses, "amount", &filter).await,
            "summarize expenses"
        )
        .unwrap_or(0.0);
        let expenses = try_store!(cx.store.find(cx.account, Collection::Expenses, &filter).await, "summarize expenses");

        let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
        for expense in &expenses {
            let category = expense.str_field("category").unwrap_or("OTHER").to_string();
            *by_category.entry(category).or_default() += expense.num_field("amount").unwrap_or(0.0);
        }
        let by_category: BTreeMap<String, f64> = by_category.into_iter().map(|(k, v)| (k, round2(v))).collect();

        ToolResult::ok_with_message(
            format!("Expenses from {start} to {end}: {}", format_amount(total)),
            json!({
                "startDate": start.to_string(),
                "endDate": end.to_string(),
                "totalExpenses": round2(total),
                "count": expenses.len(),
                "byCategory": by_category,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_categories_from_words() {
        assert_eq!(infer_category("lunch"), "MEALS");
        assert_eq!(infer_category("Uber to client office"), "TRAVEL");
        assert_eq!(infer_category("Figma subscription"), "SOFTWARE");
        assert_eq!(infer_category("happy hour"), "OTHER");
    }

    #[test]
    fn normalizes_category_names() {
        assert_eq!(normalize_category("meals"), Some("MEALS"));
        assert_eq!(normalize_category("professional services"), Some("PROFESSIONAL_SERVICES"));
        assert_eq!(normalize_category("snacks"), None);
    }
}
