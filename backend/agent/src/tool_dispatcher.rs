//! Dispatcher for model-requested tool calls.
//!
//! Routes each invocation to the registered tool by name and runs a batch of
//! invocations concurrently on the calling task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, warn};

use ledgerforge_core::{AccountContext, ToolInvocation, ToolRegistry, ToolResult, ToolSpec};
use ledgerforge_logging::{redact_value, ToolEvent, ToolEventLogger};

pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 15_000;

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Option<Duration>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: Some(Duration::from_millis(DEFAULT_TOOL_TIMEOUT_MS)),
        }
    }

    /// Per-invocation time limit. `0` disables it.
    pub fn with_timeout_ms(mut self, millis: u64) -> Self {
        self.timeout = (millis > 0).then(|| Duration::from_millis(millis));
        self
    }

    pub fn catalog(&self) -> &[ToolSpec] {
        self.registry.catalog()
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run one invocation. Never fails: unknown names and timeouts come back
    /// as failed results.
    pub async fn dispatch(&self, invocation: &ToolInvocation, account: &AccountContext) -> ToolResult {
        let Some(tool) = self.registry.get(&invocation.name) else {
            warn!(tool = %invocation.name, "Model requested an unknown tool");
            return ToolResult::failure(format!("Unknown tool: {}", invocation.name));
        };

        ToolEventLogger::log_event(
            account.account_id(),
            ToolEvent::ToolCall {
                tool_name: invocation.name.clone(),
                arguments_json: redact_value(&invocation.args),
            },
        );

        let started = Instant::now();
        let call = tool.invoke(invocation.args.clone(), account);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => ToolResult::failure(format!(
                    "Tool {} timed out after {}ms",
                    invocation.name,
                    limit.as_millis()
                )),
            },
            None => call.await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(tool = %invocation.name, success = result.is_success(), elapsed_ms, "Tool finished");
        ToolEventLogger::log_event(
            account.account_id(),
            ToolEvent::ToolOutcome {
                tool_name: invocation.name.clone(),
                success: result.is_success(),
                error: result.error().map(str::to_string),
                elapsed_ms,
            },
        );
        result
    }

    /// Run every invocation concurrently and collect all results.
    ///
    /// The output is index-aligned with `invocations` whatever order the
    /// tools finish in, and one failure never cancels its siblings.
    pub async fn execute_all(&self, invocations: &[ToolInvocation], account: &AccountContext) -> Vec<ToolResult> {
        join_all(invocations.iter().map(|invocation| self.dispatch(invocation, account))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledgerforge_core::Tool;
    use serde_json::{json, Value};

    /// Sleeps for `delay_ms` from its arguments, then reports its own name.
    struct Sleeper {
        spec: ToolSpec,
    }

    impl Sleeper {
        fn named(name: &str) -> Arc<dyn Tool> {
            Arc::new(Self {
                spec: ToolSpec::new(name, "test tool"),
            })
        }
    }

    #[async_trait]
    impl Tool for Sleeper {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn invoke(&self, args: Value, _account: &AccountContext) -> ToolResult {
            let delay = args.get("delay_ms").and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if args.get("fail").is_some() {
                return ToolResult::failure(format!("{} failed", self.spec.name));
            }
            ToolResult::ok(json!({ "tool": self.spec.name, "tag": args.get("tag").cloned() }))
        }
    }

    fn dispatcher(names: &[&str]) -> ToolDispatcher {
        let mut registry = ToolRegistry::new();
        for name in names {
            registry.register(Sleeper::named(name)).unwrap();
        }
        ToolDispatcher::new(Arc::new(registry))
    }

    fn account() -> AccountContext {
        AccountContext::new("acct_test").unwrap()
    }

    #[tokio::test]
    async fn test_results_keep_request_order() {
        let dispatcher = dispatcher(&["slow"]);
        let delays = [120u64, 10, 80, 0, 40];
        let invocations: Vec<_> = delays
            .iter()
            .enumerate()
            .map(|(i, d)| ToolInvocation::new("slow", json!({ "delay_ms": d, "tag": i })))
            .collect();

        let started = Instant::now();
        let results = dispatcher.execute_all(&invocations, &account()).await;

        assert_eq!(results.len(), delays.len());
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.data().unwrap()["tag"], json!(i));
        }
        // Concurrent: the batch takes about as long as its slowest member.
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_each_name_routes_to_its_tool() {
        let names = ["getPendingPayments", "findClientByName", "addQuickExpense"];
        let dispatcher = dispatcher(&names);
        for name in names {
            let result = dispatcher.dispatch(&ToolInvocation::new(name, Value::Null), &account()).await;
            assert_eq!(result.data().unwrap()["tool"], name);
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_a_failed_result() {
        let dispatcher = dispatcher(&["listClients"]);
        let result = dispatcher
            .dispatch(&ToolInvocation::new("deleteEverything", json!({})), &account())
            .await;
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("Unknown tool: deleteEverything"));
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_siblings() {
        let dispatcher = dispatcher(&["a", "b"]);
        let invocations = vec![
            ToolInvocation::new("a", json!({ "delay_ms": 30 })),
            ToolInvocation::new("b", json!({ "fail": true })),
            ToolInvocation::new("nope", json!({})),
            ToolInvocation::new("a", json!({ "delay_ms": 5 })),
        ];
        let results = dispatcher.execute_all(&invocations, &account()).await;
        let outcomes: Vec<bool> = results.iter().map(ToolResult::is_success).collect();
        assert_eq!(outcomes, vec![true, false, false, true]);
    }

    #[tokio::test]
    async fn test_slow_tool_times_out_alone() {
        let dispatcher = dispatcher(&["hang", "quick"]).with_timeout_ms(50);
        let invocations = vec![
            ToolInvocation::new("hang", json!({ "delay_ms": 2_000 })),
            ToolInvocation::new("quick", json!({})),
        ];
        let results = dispatcher.execute_all(&invocations, &account()).await;
        assert_eq!(results[0].error(), Some("Tool hang timed out after 50ms"));
        assert!(results[1].is_success());
    }

    #[tokio::test]
    async fn test_zero_disables_timeout() {
        let dispatcher = dispatcher(&["slow"]).with_timeout_ms(0);
        let result = dispatcher
            .dispatch(&ToolInvocation::new("slow", json!({ "delay_ms": 20 })), &account())
            .await;
        assert!(result.is_success());
    }
}
