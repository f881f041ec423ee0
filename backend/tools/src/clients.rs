//! Client and client-source tools.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use ledgerforge_core::{ParamField, ParamSchema, ToolResult, ToolSpec};
use ledgerforge_store::{Collection, Record, RecordFilter};

use crate::calendar::NoArgs;
use crate::handler::{compact, try_store, Handler, ToolContext};
use crate::lenient;

pub const CLIENT_STATUSES: &[&str] = &["active", "inactive", "lead"];

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 100;

pub(crate) fn records_json(records: &[Record]) -> Value {
    Value::Array(records.iter().map(Record::to_json).collect())
}

pub(crate) fn normalize_status(raw: &str, allowed: &[&str]) -> Option<String> {
    let status = raw.trim().to_lowercase().replace([' ', '-'], "_");
    allowed.contains(&status.as_str()).then_some(status)
}

pub(crate) fn invalid_status(raw: &str, allowed: &[&str]) -> ToolResult {
    ToolResult::failure(format!("Invalid status '{raw}'. Use one of: {}", allowed.join(", ")))
}

pub(crate) fn parse_status(raw: Option<&str>, allowed: &[&str]) -> Result<Option<String>, ToolResult> {
    match raw {
        None => Ok(None),
        Some(raw) => normalize_status(raw, allowed).map(Some).ok_or_else(|| invalid_status(raw, allowed)),
    }
}

// ---------------------------------------------------------------------------
// findClientByName
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
}

pub struct FindClientByName;

#[async_trait]
impl Handler for FindClientByName {
    type Args = NameQuery;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "findClientByName",
            "Find clients whose name contains the given text (case-insensitive). Use this to get a client ID before creating projects, invoices or updates.",
        )
        .param(ParamField::required("name", ParamSchema::string(), "Full or partial client name"))
    }

    async fn handle(&self, args: NameQuery, cx: &ToolContext<'_>) -> ToolResult {
        let filter = RecordFilter::new()
            .name_contains(&args.name)
            .limit(cx.options.lookup_limit);
        let clients = try_store!(cx.store.find(cx.account, Collection::Clients, &filter).await, "search clients");
        if clients.is_empty() {
            return ToolResult::failure(format!("No client found matching '{}'", args.name));
        }
        ToolResult::ok_with_message(
            format!("Found {} client(s) matching '{}'", clients.len(), args.name),
            json!({ "count": clients.len(), "clients": records_json(&clients) }),
        )
    }
}

// ---------------------------------------------------------------------------
// listClients
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListClientsArgs {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_count")]
    pub limit: Option<usize>,
}

pub struct ListClients;

#[async_trait]
impl Handler for ListClients {
    type Args = ListClientsArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new("listClients", "List the most recently added clients, optionally filtered by status.")
            .param(ParamField::optional("status", ParamSchema::one_of(CLIENT_STATUSES), "Only clients with this status"))
            .param(ParamField::optional("limit", ParamSchema::Integer, "Maximum number of clients (default 20)"))
    }

    async fn handle(&self, args: ListClientsArgs, cx: &ToolContext<'_>) -> ToolResult {
        let status = match parse_status(args.status.as_deref(), CLIENT_STATUSES) {
            Ok(status) => status,
            Err(failure) => return failure,
        };
        let mut filter = RecordFilter::new().limit(args.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT));
        if let Some(status) = status {
            filter = filter.eq("status", status);
        }
        let clients = try_store!(cx.store.find(cx.account, Collection::Clients, &filter).await, "list clients");
        ToolResult::ok(json!({ "count": clients.len(), "clients": records_json(&clients) }))
    }
}

// ---------------------------------------------------------------------------
// createClient
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateClientArgs {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub notes: Option<String>,
}

pub struct CreateClient;

#[async_trait]
impl Handler for CreateClient {
    type Args = CreateClientArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "createClient",
            "Create a new client. Only the name is required; ask the user for contact details only if they offered them.",
        )
        .param(ParamField::required("name", ParamSchema::string(), "Client or contact name"))
        .param(ParamField::optional("email", ParamSchema::string(), "Email address"))
        .param(ParamField::optional("phone", ParamSchema::string(), "Phone number"))
        .param(ParamField::optional("company", ParamSchema::string(), "Company name"))
        .param(ParamField::optional("source", ParamSchema::string(), "How the client found the business, e.g. 'Referral' or 'Instagram'"))
        .param(ParamField::optional("notes", ParamSchema::string(), "Free-form notes"))
    }

    async fn handle(&self, args: CreateClientArgs, cx: &ToolContext<'_>) -> ToolResult {
        // Same name again means a retried call; hand back the existing client.
        let same_name = RecordFilter::new().eq("name", args.name.as_str()).limit(1);
        let existing = try_store!(cx.store.find(cx.account, Collection::Clients, &same_name).await, "create client");
        if let Some(client) = existing.first() {
            return ToolResult::ok_with_message(
                format!("Client '{}' already exists", args.name),
                json!({ "client": client.to_json(), "created": false }),
            );
        }

        let source = match &args.source {
            Some(source) => Some(try_store!(resolve_source(cx, source).await, "create client")),
            None => None,
        };

        let doc = compact(json!({
            "name": args.name,
            "email": args.email,
            "phone": args.phone,
            "company": args.company,
            "sourceId": source.as_ref().map(|s| s.id.clone()),
            "sourceName": source.as_ref().and_then(|s| s.str_field("name").map(str::to_string)),
            "notes": args.notes,
            "status": "active",
            "createdOn": cx.today().to_string(),
        }));
        let client = try_store!(cx.store.insert(cx.account, Collection::Clients, doc).await, "create client");
        ToolResult::ok_with_message(
            format!("Created client '{}'", args.name),
            json!({ "client": client.to_json(), "created": true }),
        )
    }
}

/// Find a client source by exact name, creating it when missing.
async fn resolve_source(cx: &ToolContext<'_>, name: &str) -> Result<Record, ledgerforge_store::StoreError> {
    let filter = RecordFilter::new().eq("name", name).limit(1);
    if let Some(found) = cx.store.find(cx.account, Collection::ClientSources, &filter).await?.into_iter().next() {
        return Ok(found);
    }
    cx.store
        .insert(cx.account, Collection::ClientSources, json!({ "name": name }))
        .await
}

// ---------------------------------------------------------------------------
// updateClient
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientArgs {
    #[serde(deserialize_with = "lenient::text")]
    pub client_id: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub notes: Option<String>,
}

pub struct UpdateClient;

#[async_trait]
impl Handler for UpdateClient {
    type Args = UpdateClientArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "updateClient",
            "Update fields of an existing client. Look the client up with findClientByName first to get its ID.",
        )
        .param(ParamField::required("clientId", ParamSchema::string(), "ID of the client to update"))
        .param(ParamField::optional("name", ParamSchema::string(), "New name"))
        .param(ParamField::optional("email", ParamSchema::string(), "New email address"))
        .param(ParamField::optional("phone", ParamSchema::string(), "New phone number"))
        .param(ParamField::optional("company", ParamSchema::string(), "New company name"))
        .param(ParamField::optional("status", ParamSchema::one_of(CLIENT_STATUSES), "New status"))
        .param(ParamField::optional("notes", ParamSchema::string(), "Replacement notes"))
    }

    async fn handle(&self, args: UpdateClientArgs, cx: &ToolContext<'_>) -> ToolResult {
        let status = match parse_status(args.status.as_deref(), CLIENT_STATUSES) {
            Ok(status) => status,
            Err(failure) => return failure,
        };
        let patch = compact(json!({
            "name": args.name,
            "email": args.email,
            "phone": args.phone,
            "company": args.company,
            "status": status,
            "notes": args.notes,
        }));
        if patch.as_object().is_some_and(|m| m.is_empty()) {
            return ToolResult::failure("No fields to update were provided");
        }

        let current = try_store!(cx.store.get(cx.account, Collection::Clients, &args.client_id).await, "update client");
        if current.is_none() {
            return ToolResult::failure(format!("Client not found: {}", args.client_id));
        }
        let client = try_store!(
            cx.store.update(cx.account, Collection::Clients, &args.client_id, patch).await,
            "update client"
        );
        ToolResult::ok_with_message(
            format!("Updated client '{}'", client.str_field("name").unwrap_or(&args.client_id)),
            json!({ "client": client.to_json() }),
        )
    }
}

// ---------------------------------------------------------------------------
// listClientSources
// ---------------------------------------------------------------------------

pub struct ListClientSources;

#[async_trait]
impl Handler for ListClientSources {
    type Args = NoArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new("listClientSources", "List the known client acquisition sources (referral, website, ...).")
    }

    async fn handle(&self, _args: NoArgs, cx: &ToolContext<'_>) -> ToolResult {
        let sources = try_store!(
            cx.store.find(cx.account, Collection::ClientSources, &RecordFilter::new()).await,
            "list client sources"
        );
        ToolResult::ok(json!({ "count": sources.len(), "sources": records_json(&sources) }))
    }
}
