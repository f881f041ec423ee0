use std::collections::HashMap;
use std::sync::Arc;

use crate::error::LedgerError;
use crate::traits::Tool;
use crate::types::ToolSpec;

/// Name → tool lookup table plus the ordered catalog handed to the model.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    catalog: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            catalog: Vec::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), LedgerError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(LedgerError::DuplicateTool(name));
        }
        self.catalog.push(tool.spec().clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Catalog in registration order.
    pub fn catalog(&self) -> &[ToolSpec] {
        &self.catalog
    }

    pub fn list(&self) -> Vec<String> {
        self.catalog.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountContext, ToolResult};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Named(ToolSpec);

    #[async_trait]
    impl Tool for Named {
        fn spec(&self) -> &ToolSpec {
            &self.0
        }
        async fn invoke(&self, _args: Value, _account: &AccountContext) -> ToolResult {
            ToolResult::ok(json!(self.0.name))
        }
    }

    #[test]
    fn test_registry_keeps_order_and_rejects_duplicates() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named(ToolSpec::new("b", "")))).unwrap();
        registry.register(Arc::new(Named(ToolSpec::new("a", "")))).unwrap();
        let dup = registry.register(Arc::new(Named(ToolSpec::new("a", ""))));

        assert!(matches!(dup, Err(LedgerError::DuplicateTool(name)) if name == "a"));
        assert_eq!(registry.list(), vec!["b", "a"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("c").is_none());
    }
}
