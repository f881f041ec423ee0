//! Two-round conversation loop.
//!
//! One user message runs through an explicit state machine: ask the model,
//! run the tools it requested (at most one batch), ask again for the final
//! answer. The transcript is a value threaded through the phases; nothing is
//! written back to the caller's copy unless the whole exchange succeeds.

use std::sync::Arc;

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use ledgerforge_core::{
    AccountContext, ConversationTurn, ModelGateway, ModelReply, Role, ToolInvocation, ToolResult, Transcript,
    TurnPart,
};
use ledgerforge_logging::{ToolEvent, ToolEventLogger};

use crate::system_prompt::PersonaPrompt;
use crate::tool_dispatcher::ToolDispatcher;

/// Commentary recorded when the model asks for tools without saying anything.
pub const EXECUTING_PLACEHOLDER: &str = "Executing requested actions...";
/// Final answer used when the model's second reply carries no text.
pub const COMPLETED_PLACEHOLDER: &str = "I've completed the requested actions.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("model gateway '{provider}' failed: {source}")]
    Gateway {
        provider: String,
        #[source]
        source: anyhow::Error,
    },
}

/// One user message plus the history the caller holds.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    pub history: Transcript,
}

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Final natural-language answer.
    pub text: String,
    /// History including this exchange.
    pub transcript: Transcript,
    pub tools_executed: Vec<ToolInvocation>,
    pub tool_results: Vec<ToolResult>,
}

/// Where one exchange stands.
#[derive(Debug)]
pub enum ChatPhase {
    AwaitingFirstReply {
        transcript: Transcript,
    },
    ToolsRequested {
        transcript: Transcript,
        reply: ModelReply,
    },
    Executing {
        transcript: Transcript,
        invocations: Vec<ToolInvocation>,
    },
    AwaitingFinalReply {
        transcript: Transcript,
        invocations: Vec<ToolInvocation>,
        results: Vec<ToolResult>,
    },
    Done(ChatOutcome),
}

/// Collaborators a phase transition may call.
pub struct PhaseContext<'a> {
    pub gateway: &'a dyn ModelGateway,
    pub dispatcher: &'a ToolDispatcher,
    pub account: &'a AccountContext,
}

impl PhaseContext<'_> {
    async fn generate(&self, transcript: &Transcript) -> Result<ModelReply, ChatError> {
        self.gateway
            .generate(transcript.turns(), self.dispatcher.catalog())
            .await
            .map_err(|source| {
                ToolEventLogger::log_event(
                    self.account.account_id(),
                    ToolEvent::GatewayError {
                        provider: self.gateway.name().to_string(),
                        error_msg: format!("{source:#}"),
                    },
                );
                ChatError::Gateway {
                    provider: self.gateway.name().to_string(),
                    source,
                }
            })
    }
}

impl ChatPhase {
    /// Entry phase: the history with the new user turn appended.
    pub fn start(request: ChatRequest, persona: &PersonaPrompt) -> Self {
        let mut parts = Vec::with_capacity(2);
        if request.history.is_empty() {
            parts.push(TurnPart::Text {
                text: persona.render(Local::now().date_naive()),
            });
        }
        parts.push(TurnPart::Text { text: request.message });

        ChatPhase::AwaitingFirstReply {
            transcript: request.history.append(ConversationTurn::new(Role::User, parts)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChatPhase::AwaitingFirstReply { .. } => "awaiting_first_reply",
            ChatPhase::ToolsRequested { .. } => "tools_requested",
            ChatPhase::Executing { .. } => "executing",
            ChatPhase::AwaitingFinalReply { .. } => "awaiting_final_reply",
            ChatPhase::Done(_) => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ChatPhase::Done(_))
    }

    /// Perform one transition. `Done` stays `Done`.
    pub async fn advance(self, cx: &PhaseContext<'_>) -> Result<ChatPhase, ChatError> {
        let next = match self {
            ChatPhase::AwaitingFirstReply { transcript } => {
                let reply = cx.generate(&transcript).await?;
                if reply.wants_tools() {
                    ChatPhase::ToolsRequested { transcript, reply }
                } else {
                    let text = reply.text.unwrap_or_default();
                    ChatPhase::Done(ChatOutcome {
                        transcript: transcript.append(ConversationTurn::model_text(text.clone())),
                        text,
                        tools_executed: Vec::new(),
                        tool_results: Vec::new(),
                    })
                }
            }
            ChatPhase::ToolsRequested { transcript, reply } => {
                let commentary = reply.non_empty_text().unwrap_or(EXECUTING_PLACEHOLDER).to_string();
                info!(
                    tools = ?reply.tool_calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                    "Model requested tools"
                );
                ChatPhase::Executing {
                    transcript: transcript.append(ConversationTurn::model_text(commentary)),
                    invocations: reply.tool_calls,
                }
            }
            ChatPhase::Executing { transcript, invocations } => {
                let results = cx.dispatcher.execute_all(&invocations, cx.account).await;
                let transcript = invocations
                    .iter()
                    .zip(&results)
                    .fold(transcript, |transcript, (invocation, result)| {
                        transcript.append(tool_result_turn(invocation, result))
                    });
                ChatPhase::AwaitingFinalReply {
                    transcript,
                    invocations,
                    results,
                }
            }
            ChatPhase::AwaitingFinalReply {
                transcript,
                invocations,
                results,
            } => {
                let reply = cx.generate(&transcript).await?;
                if reply.wants_tools() {
                    warn!(
                        dropped = reply.tool_calls.len(),
                        "Model requested tools in its final reply; only one tool round runs per message"
                    );
                }
                let text = reply.non_empty_text().unwrap_or(COMPLETED_PLACEHOLDER).to_string();
                ChatPhase::Done(ChatOutcome {
                    transcript: transcript.append(ConversationTurn::model_text(text.clone())),
                    text,
                    tools_executed: invocations,
                    tool_results: results,
                })
            }
            done @ ChatPhase::Done(_) => done,
        };
        debug!(phase = next.name(), "Chat phase advanced");
        Ok(next)
    }
}

/// Synthetic turn that shows a tool outcome to the model as ordinary history.
pub fn tool_result_turn(invocation: &ToolInvocation, result: &ToolResult) -> ConversationTurn {
    let payload = serde_json::to_string(result).unwrap_or_else(|e| format!("{{\"success\":false,\"error\":\"{e}\"}}"));
    ConversationTurn::user_text(format!("tool {} result: {}", invocation.name, payload))
}

/// Drives [`ChatPhase`] for each incoming message.
pub struct ChatOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    dispatcher: Arc<ToolDispatcher>,
    persona: PersonaPrompt,
}

impl ChatOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>, dispatcher: Arc<ToolDispatcher>, persona: PersonaPrompt) -> Self {
        Self {
            gateway,
            dispatcher,
            persona,
        }
    }

    pub fn dispatcher(&self) -> &Arc<ToolDispatcher> {
        &self.dispatcher
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    /// Handle one user message for `account`.
    ///
    /// A gateway failure at either model call aborts the exchange; the
    /// caller's history is untouched and can be resubmitted.
    #[instrument(skip_all, fields(account = %account, history = request.history.len()))]
    pub async fn run(&self, request: ChatRequest, account: &AccountContext) -> Result<ChatOutcome, ChatError> {
        let cx = PhaseContext {
            gateway: self.gateway.as_ref(),
            dispatcher: &self.dispatcher,
            account,
        };

        let mut phase = ChatPhase::start(request, &self.persona);
        loop {
            phase = match phase {
                ChatPhase::Done(outcome) => {
                    info!(tools = outcome.tools_executed.len(), "Chat exchange complete");
                    return Ok(outcome);
                }
                other => other.advance(&cx).await?,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerforge_core::ToolRegistry;
    use ledgerforge_planner::ScriptedGateway;
    use ledgerforge_store::InMemoryStore;
    use ledgerforge_tools::{build_registry, ToolOptions};
    use serde_json::json;

    fn account() -> AccountContext {
        AccountContext::new("acct_chat").unwrap()
    }

    fn orchestrator(gateway: Arc<ScriptedGateway>) -> ChatOrchestrator {
        let registry = build_registry(Arc::new(InMemoryStore::new()), ToolOptions::default()).unwrap();
        ChatOrchestrator::new(
            gateway,
            Arc::new(ToolDispatcher::new(Arc::new(registry))),
            PersonaPrompt::default(),
        )
    }

    fn history() -> Transcript {
        Transcript::default()
            .append(ConversationTurn::user_text("hi"))
            .append(ConversationTurn::model_text("Hello! How can I help?"))
    }

    fn request(message: &str, history: Transcript) -> ChatRequest {
        ChatRequest {
            message: message.into(),
            history,
        }
    }

    #[tokio::test]
    async fn test_text_only_reply_grows_transcript_by_two() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ModelReply::text("You have 3 active clients.")]));
        let chat = orchestrator(gateway.clone());

        let outcome = chat.run(request("how many clients?", history()), &account()).await.unwrap();

        assert_eq!(outcome.text, "You have 3 active clients.");
        assert_eq!(outcome.transcript.len(), 4);
        let last = &outcome.transcript.turns()[3];
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.text(), "You have 3 active clients.");
        assert!(outcome.tools_executed.is_empty());
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn test_two_tools_grow_transcript_by_five() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelReply::tools(vec![
                ToolInvocation::new("getPendingPayments", json!({})),
                ToolInvocation::new("getCurrentDateTime", json!({})),
            ]),
            ModelReply::text("Nothing is pending today."),
        ]));
        let chat = orchestrator(gateway.clone());

        let outcome = chat.run(request("anything pending?", history()), &account()).await.unwrap();

        assert_eq!(outcome.text, "Nothing is pending today.");
        assert_eq!(outcome.transcript.len(), history().len() + 5);
        let turns = outcome.transcript.turns();
        assert_eq!(turns[3].text(), EXECUTING_PLACEHOLDER);
        assert!(turns[4].text().starts_with("tool getPendingPayments result: {\"success\":true"));
        assert!(turns[5].text().starts_with("tool getCurrentDateTime result: "));
        assert_eq!(turns[6].role, Role::Model);
        assert_eq!(outcome.tools_executed.len(), 2);
        assert_eq!(outcome.tool_results.len(), 2);
        assert!(outcome.tool_results.iter().all(ToolResult::is_success));

        // The final call saw every tool result.
        assert_eq!(gateway.call_count(), 2);
        assert_eq!(gateway.transcripts()[1].len(), history().len() + 4);
    }

    #[tokio::test]
    async fn test_persona_only_on_first_message() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ModelReply::text("Hi!"), ModelReply::text("Sure.")]));
        let chat = orchestrator(gateway.clone());

        let first = chat.run(request("hello", Transcript::default()), &account()).await.unwrap();
        assert_eq!(first.transcript.len(), 2);
        let opening = &first.transcript.turns()[0];
        assert_eq!(opening.parts.len(), 2);
        assert!(opening.text().starts_with("You are LedgerForge"));
        assert!(opening.text().ends_with("hello"));

        let second = chat.run(request("thanks", first.transcript), &account()).await.unwrap();
        assert_eq!(second.transcript.len(), 4);
        assert_eq!(second.transcript.turns()[2].parts.len(), 1);
        assert_eq!(second.transcript.turns()[2].text(), "thanks");
    }

    #[tokio::test]
    async fn test_gateway_failure_surfaces_error() {
        let gateway = Arc::new(ScriptedGateway::default().then_fail("503 upstream"));
        let chat = orchestrator(gateway.clone());
        let err = chat.run(request("hi", history()), &account()).await.unwrap_err();
        assert!(matches!(err, ChatError::Gateway { ref provider, .. } if provider == "mock"));

        let after_tools = Arc::new(
            ScriptedGateway::new(vec![ModelReply::tools(vec![ToolInvocation::new("getBusinessContext", json!({}))])])
                .then_fail("timeout"),
        );
        let chat = orchestrator(after_tools.clone());
        assert!(chat.run(request("hi", history()), &account()).await.is_err());
        assert_eq!(after_tools.call_count(), 2);
    }

    #[tokio::test]
    async fn test_second_round_tool_requests_are_not_executed() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelReply::tools(vec![ToolInvocation::new("findClientByName", json!({ "name": "acme" }))]),
            ModelReply::tools(vec![ToolInvocation::new("createClient", json!({ "name": "Acme" }))])
                .with_text("I couldn't find Acme."),
        ]));
        let chat = orchestrator(gateway.clone());

        let outcome = chat.run(request("find acme", history()), &account()).await.unwrap();
        assert_eq!(outcome.text, "I couldn't find Acme.");
        assert_eq!(outcome.tools_executed.len(), 1);
        assert!(!outcome.tool_results[0].is_success());
        assert_eq!(gateway.call_count(), 2);
        assert_eq!(outcome.transcript.len(), history().len() + 4);
    }

    #[tokio::test]
    async fn test_final_reply_without_text_uses_placeholder() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelReply::tools(vec![ToolInvocation::new("getRetainerSummary", json!({}))])
                .with_text("Checking retainers."),
            ModelReply::default(),
        ]));
        let chat = orchestrator(gateway);
        let outcome = chat.run(request("retainers?", history()), &account()).await.unwrap();
        assert_eq!(outcome.text, COMPLETED_PLACEHOLDER);
        assert_eq!(outcome.transcript.turns()[3].text(), "Checking retainers.");
    }

    #[tokio::test]
    async fn test_unknown_tool_result_reaches_model() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelReply::tools(vec![ToolInvocation::new("sendFax", json!({}))]),
            ModelReply::text("I can't send faxes."),
        ]));
        let chat = orchestrator(gateway.clone());
        let outcome = chat.run(request("fax it", history()), &account()).await.unwrap();
        assert_eq!(outcome.tool_results[0].error(), Some("Unknown tool: sendFax"));
        let seen = &gateway.transcripts()[1];
        assert!(seen.last().unwrap().text().contains("Unknown tool: sendFax"));
    }

    #[tokio::test]
    async fn test_quick_expense_end_to_end() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            ModelReply::tools(vec![ToolInvocation::new(
                "addQuickExpense",
                json!({ "amount": 500, "description": "lunch" }),
            )]),
            ModelReply::text("Logged 500 for lunch under MEALS."),
        ]));
        let chat = orchestrator(gateway);

        let outcome = chat
            .run(request("add an expense of 500 for lunch", Transcript::default()), &account())
            .await
            .unwrap();

        let result = &outcome.tool_results[0];
        assert!(result.is_success());
        let message = result.message().unwrap();
        assert!(message.contains("500") && message.contains("MEALS"), "{message}");
        let expense = &result.data().unwrap()["expense"];
        assert_eq!(expense["category"], "MEALS");
        assert_eq!(expense["date"], Local::now().date_naive().to_string());
        assert_eq!(outcome.transcript.len(), 4);
    }

    #[tokio::test]
    async fn test_phase_advance_stops_at_done() {
        let gateway = ScriptedGateway::new(vec![ModelReply::text("ok")]);
        let dispatcher = ToolDispatcher::new(Arc::new(ToolRegistry::new()));
        let account = account();
        let cx = PhaseContext {
            gateway: &gateway,
            dispatcher: &dispatcher,
            account: &account,
        };

        let phase = ChatPhase::start(request("hi", history()), &PersonaPrompt::default());
        assert_eq!(phase.name(), "awaiting_first_reply");
        let phase = phase.advance(&cx).await.unwrap();
        assert!(phase.is_done());
        let phase = phase.advance(&cx).await.unwrap();
        assert!(phase.is_done());
        assert_eq!(gateway.call_count(), 1);
    }
}
