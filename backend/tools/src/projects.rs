//! Project tools.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use ledgerforge_core::{ParamField, ParamSchema, ToolResult, ToolSpec};
use ledgerforge_store::{Collection, RecordFilter};

use crate::clients::{invalid_status, normalize_status, parse_status, records_json, NameQuery};
use crate::handler::{compact, round2, try_store, Handler, ToolContext};
use crate::lenient;

pub const PROJECT_STATUSES: &[&str] = &["planning", "active", "on_hold", "completed", "cancelled"];

pub struct FindProjectByName;

#[async_trait]
impl Handler for FindProjectByName {
    type Args = NameQuery;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "findProjectByName",
            "Find projects whose name contains the given text (case-insensitive). Use this to get a project ID before recording payments or changing status.",
        )
        .param(ParamField::required("name", ParamSchema::string(), "Full or partial project name"))
    }

    async fn handle(&self, args: NameQuery, cx: &ToolContext<'_>) -> ToolResult {
        let filter = RecordFilter::new()
            .name_contains(&args.name)
            .limit(cx.options.lookup_limit);
        let projects = try_store!(cx.store.find(cx.account, Collection::Projects, &filter).await, "search projects");
        if projects.is_empty() {
            return ToolResult::failure(format!("No project found matching '{}'", args.name));
        }
        ToolResult::ok_with_message(
            format!("Found {} project(s) matching '{}'", projects.len(), args.name),
            json!({ "count": projects.len(), "projects": records_json(&projects) }),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectArgs {
    #[serde(deserialize_with = "lenient::text")]
    pub client_id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub budget: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub description: Option<String>,
}

pub struct CreateProject;

#[async_trait]
impl Handler for CreateProject {
    type Args = CreateProjectArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new(
            "createProject",
            "Create a project for an existing client. Resolve the client ID with findClientByName first.",
        )
        .param(ParamField::required("clientId", ParamSchema::string(), "ID of the client the project belongs to"))
        .param(ParamField::required("name", ParamSchema::string(), "Project name"))
        .param(ParamField::optional("budget", ParamSchema::Number, "Agreed budget"))
        .param(ParamField::optional("status", ParamSchema::one_of(PROJECT_STATUSES), "Initial status (default active)"))
        .param(ParamField::optional("startDate", ParamSchema::string(), "Start date, YYYY-MM-DD (default today)"))
        .param(ParamField::optional("deadline", ParamSchema::string(), "Deadline, YYYY-MM-DD"))
        .param(ParamField::optional("description", ParamSchema::string(), "Short description of the work"))
    }

    async fn handle(&self, args: CreateProjectArgs, cx: &ToolContext<'_>) -> ToolResult {
        let status = match parse_status(args.status.as_deref(), PROJECT_STATUSES) {
            Ok(status) => status.unwrap_or_else(|| "active".to_string()),
            Err(failure) => return failure,
        };
        if args.budget.is_some_and(|b| b < 0.0) {
            return ToolResult::failure("Budget cannot be negative");
        }
        let start = args.start_date.unwrap_or_else(|| cx.today());
        if args.deadline.is_some_and(|deadline| deadline < start) {
            return ToolResult::failure("Deadline cannot be before the start date");
        }

        let client = try_store!(cx.store.get(cx.account, Collection::Clients, &args.client_id).await, "create project");
        let Some(client) = client else {
            return ToolResult::failure(format!("Client not found: {}", args.client_id));
        };

        let duplicate = RecordFilter::new()
            .eq("clientId", args.client_id.as_str())
            .eq("name", args.name.as_str())
            .limit(1);
        let existing = try_store!(cx.store.find(cx.account, Collection::Projects, &duplicate).await, "create project");
        if let Some(project) = existing.first() {
            return ToolResult::ok_with_message(
                format!("Project '{}' already exists for this client", args.name),
                json!({ "project": project.to_json(), "created": false }),
            );
        }

        let doc = compact(json!({
            "name": args.name,
            "clientId": client.id,
            "clientName": client.str_field("name"),
            "budget": args.budget.map(round2),
            "status": status,
            "startDate": start.to_string(),
            "deadline": args.deadline.map(|d| d.to_string()),
            "description": args.description,
        }));
        let project = try_store!(cx.store.insert(cx.account, Collection::Projects, doc).await, "create project");
        ToolResult::ok_with_message(
            format!(
                "Created project '{}' for {}",
                args.name,
                client.str_field("name").unwrap_or("the client")
            ),
            json!({ "project": project.to_json(), "created": true }),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectStatusArgs {
    #[serde(deserialize_with = "lenient::text")]
    pub project_id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub status: String,
}

pub struct UpdateProjectStatus;

#[async_trait]
impl Handler for UpdateProjectStatus {
    type Args = UpdateProjectStatusArgs;

    fn spec() -> ToolSpec {
        ToolSpec::new("updateProjectStatus", "Change the status of a project.")
            .param(ParamField::required("projectId", ParamSchema::string(), "ID of the project"))
            .param(ParamField::required("status", ParamSchema::one_of(PROJECT_STATUSES), "New status"))
    }

    async fn handle(&self, args: UpdateProjectStatusArgs, cx: &ToolContext<'_>) -> ToolResult {
        let Some(status) = normalize_status(&args.status, PROJECT_STATUSES) else {
            return invalid_status(&args.status, PROJECT_STATUSES);
        };
        let current = try_store!(
            cx.store.get(cx.account, Collection::Projects, &args.project_id).await,
            "update project"
        );
        if current.is_none() {
            return ToolResult::failure(format!("Project not found: {}", args.project_id));
        }

        let mut patch = json!({ "status": status });
        if status == "completed" {
            patch["completedOn"] = json!(cx.today().to_string());
        }
        let project = try_store!(
            cx.store.update(cx.account, Collection::Projects, &args.project_id, patch).await,
            "update project"
        );
        ToolResult::ok_with_message(
            format!(
                "Project '{}' is now {}",
                project.str_field("name").unwrap_or(&args.project_id),
                status
            ),
            json!({ "project": project.to_json() }),
        )
    }
}
