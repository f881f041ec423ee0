//! Chat endpoint (`POST /api/chat`) and catalog listing (`GET /api/tools`).

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use ledgerforge_agent::ChatRequest;
use ledgerforge_core::{ToolInvocation, ToolResult, Transcript};

use crate::auth::RequireAccount;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub chat_history: Option<Transcript>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    pub chat_history: Transcript,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions_executed: Option<Vec<ToolInvocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_results: Option<Vec<ToolResult>>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Handler for `POST /api/chat`.
pub async fn chat(
    State(state): State<GatewayState>,
    RequireAccount(account): RequireAccount,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    if body.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Message is required");
    }

    let request = ChatRequest {
        message: body.message,
        history: body.chat_history.unwrap_or_default(),
    };

    match state.orchestrator.run(request, &account).await {
        Ok(outcome) => {
            let ran_tools = !outcome.tools_executed.is_empty();
            info!(account = %account, tools = outcome.tools_executed.len(), "Chat request served");
            Json(ChatReply {
                message: outcome.text,
                chat_history: outcome.transcript,
                functions_executed: ran_tools.then_some(outcome.tools_executed),
                function_results: ran_tools.then_some(outcome.tool_results),
            })
            .into_response()
        }
        Err(err) => {
            error!(account = %account, error = %err, "Chat request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process request")
        }
    }
}

/// Handler for `GET /api/tools`.
pub async fn list_tools(State(state): State<GatewayState>, RequireAccount(_account): RequireAccount) -> Json<Value> {
    let catalog = state.orchestrator.dispatcher().catalog();
    Json(json!({
        "count": catalog.len(),
        "tools": catalog.iter().map(|spec| spec.describe()).collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use axum::Router;
    use tower::ServiceExt;

    use ledgerforge_agent::{ChatOrchestrator, PersonaPrompt, ToolDispatcher};
    use ledgerforge_core::{ModelReply, ToolInvocation};
    use ledgerforge_planner::ScriptedGateway;
    use ledgerforge_store::InMemoryStore;
    use ledgerforge_tools::{build_registry, ToolOptions};

    use super::*;
    use crate::auth::ApiKeyAuthenticator;
    use crate::server::build_router;

    const KEY: &str = "test-key";

    fn app(gateway: Arc<ScriptedGateway>) -> Router {
        let registry = build_registry(Arc::new(InMemoryStore::new()), ToolOptions::default()).unwrap();
        let orchestrator = ChatOrchestrator::new(
            gateway,
            Arc::new(ToolDispatcher::new(Arc::new(registry))),
            PersonaPrompt::default(),
        );
        let authenticator = ApiKeyAuthenticator::new(HashMap::from([(KEY.to_string(), "acct_http".to_string())]), false);
        build_router(GatewayState::new(Arc::new(orchestrator), Arc::new(authenticator)))
    }

    fn post_chat(body: Value, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_missing_account_is_rejected_before_any_work() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ModelReply::tools(vec![ToolInvocation::new(
            "addQuickExpense",
            json!({ "amount": 5, "description": "coffee" }),
        )])]));

        let (status, body) = send(app(gateway.clone()), post_chat(json!({ "message": "hi" }), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized" }));

        let (status, _) = send(app(gateway.clone()), post_chat(json!({ "message": "hi" }), Some("wrong"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_text_only_chat() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ModelReply::text("Hello there.")]));
        let (status, body) = send(app(gateway), post_chat(json!({ "message": "hello" }), Some(KEY))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Hello there.");
        assert_eq!(body["chatHistory"].as_array().unwrap().len(), 2);
        assert_eq!(body["chatHistory"][1], json!({ "role": "model", "parts": [{ "text": "Hello there." }] }));
        assert!(body.get("functionsExecuted").is_none());
        assert!(body.get("functionResults").is_none());
    }

    #[tokio::test]
    async fn test_expense_scenario_over_http() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelReply::tools(vec![ToolInvocation::new(
                "addQuickExpense",
                json!({ "amount": 500, "description": "lunch" }),
            )]),
            ModelReply::text("Added 500 for lunch under MEALS."),
        ]));
        let request = post_chat(json!({ "message": "add an expense of 500 for lunch", "chatHistory": [] }), Some(KEY));
        let (status, body) = send(app(gateway), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Added 500 for lunch under MEALS.");
        assert_eq!(
            body["functionsExecuted"],
            json!([{ "name": "addQuickExpense", "args": { "amount": 500, "description": "lunch" } }])
        );
        let result = &body["functionResults"][0];
        assert_eq!(result["success"], true);
        assert_eq!(result["data"]["expense"]["category"], "MEALS");
        assert!(result["message"].as_str().unwrap().contains("500"));
        assert_eq!(body["chatHistory"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_history_round_trips_opaque_parts() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ModelReply::text("Still here.")]));
        let history = json!([
            { "role": "user", "parts": [{ "text": "hi" }] },
            {
                "role": "model",
                "parts": [
                    { "text": "hello", "thoughtSignature": "sig-abc" },
                    { "functionCall": { "name": "x", "args": {} } }
                ],
                "turnId": "t-1"
            }
        ]);
        let request = post_chat(json!({ "message": "you there?", "chatHistory": history.clone() }), Some(KEY));
        let (status, body) = send(app(gateway), request).await;

        assert_eq!(status, StatusCode::OK);
        let turns = body["chatHistory"].as_array().unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0], history[0]);
        assert_eq!(turns[1], history[1]);
    }

    #[tokio::test]
    async fn test_blank_message_is_bad_request() {
        let gateway = Arc::new(ScriptedGateway::default());
        let (status, body) = send(app(gateway.clone()), post_chat(json!({ "message": "   " }), Some(KEY))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required");
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_is_generic_500() {
        let gateway = Arc::new(ScriptedGateway::default().then_fail("api key sk-secret rejected"));
        let (status, body) = send(app(gateway), post_chat(json!({ "message": "hi" }), Some(KEY))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to process request" }));
    }

    #[tokio::test]
    async fn test_tools_listing_and_health() {
        let gateway = Arc::new(ScriptedGateway::default());

        let request = Request::builder()
            .uri("/api/tools")
            .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(gateway.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 18);
        assert_eq!(body["tools"][0]["name"], "getCurrentDateTime");
        assert_eq!(body["tools"][0]["parameters"]["type"], "object");

        let anonymous = Request::builder().uri("/api/tools").body(Body::empty()).unwrap();
        let (status, _) = send(app(gateway.clone()), anonymous).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let health = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(gateway), health).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["modelProvider"], "mock");
        assert_eq!(body["toolCount"], 18);
    }
}
