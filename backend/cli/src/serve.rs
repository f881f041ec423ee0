//! `ledgerforge serve`: wire configuration into the running HTTP service.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use ledgerforge_agent::{ChatOrchestrator, PersonaPrompt, ToolDispatcher};
use ledgerforge_config::{redacted_summary, validate, AssistantConfig, LedgerForgeConfig, StoreBackend};
use ledgerforge_gateway::{start_server, ApiKeyAuthenticator, GatewayState};
use ledgerforge_planner::{build_gateway, GatewaySettings};
use ledgerforge_store::{DataStore, InMemoryStore, SqliteStore};
use ledgerforge_tools::{build_registry, ToolOptions};

pub async fn run(config: LedgerForgeConfig) -> Result<()> {
    ledgerforge_logging::init_logger(config.logging.dir.as_deref(), config.logging.level(), config.logging.json());
    info!(config = %redacted_summary(&config), "Starting LedgerForge");
    // Config loading ran before the subscriber existed.
    for warning in validate(&config).warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }

    let state = build_state(&config)?;
    let ip: IpAddr = config
        .server
        .bind()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind()))?;
    let addr = SocketAddr::new(ip, config.server.port());

    start_server(addr, state).await
}

pub fn open_store(config: &LedgerForgeConfig) -> Result<Arc<dyn DataStore>> {
    let store: Arc<dyn DataStore> = match config.store.backend() {
        StoreBackend::Memory => {
            info!("Using in-memory record store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
        StoreBackend::Sqlite => {
            let path = config
                .store
                .path
                .as_ref()
                .context("sqlite store selected without a path")?;
            Arc::new(SqliteStore::open(path)?)
        }
    };
    Ok(store)
}

fn gateway_settings(config: &LedgerForgeConfig) -> GatewaySettings {
    let model = &config.model;
    GatewaySettings {
        provider: model.provider().to_string(),
        model: model.model().to_string(),
        api_key: model.api_key.clone(),
        base_url: model.base_url.clone(),
        temperature: model.temperature(),
        max_tokens: model.max_tokens(),
    }
}

fn persona(assistant: &AssistantConfig) -> PersonaPrompt {
    let mut persona = match &assistant.name {
        Some(name) => PersonaPrompt::new(name.clone()),
        None => PersonaPrompt::default(),
    };
    if let Some(currency) = &assistant.currency {
        persona = persona.with_currency(currency.clone());
    }
    assistant
        .rules
        .iter()
        .fold(persona, |p, rule| p.with_rule(rule.clone()))
}

/// Build everything the router needs from a prepared config.
pub fn build_state(config: &LedgerForgeConfig) -> Result<GatewayState> {
    let store = open_store(config)?;
    let registry = build_registry(
        store,
        ToolOptions {
            lookup_limit: config.tools.lookup_limit(),
        },
    )?;
    info!(tools = registry.len(), "Tool catalog registered");

    let dispatcher = ToolDispatcher::new(Arc::new(registry)).with_timeout_ms(config.tools.timeout_ms());
    let gateway = build_gateway(&gateway_settings(config))?;
    info!(provider = gateway.name(), model = config.model.model(), "Model gateway ready");

    let orchestrator = ChatOrchestrator::new(gateway, Arc::new(dispatcher), persona(&config.assistant));
    let authenticator = ApiKeyAuthenticator::new(config.auth.api_keys.clone(), config.auth.trust_account_header());

    Ok(GatewayState::new(Arc::new(orchestrator), Arc::new(authenticator)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn mock_config() -> LedgerForgeConfig {
        let mut config = LedgerForgeConfig::default();
        config.model.provider = Some("mock".into());
        config.auth.api_keys = HashMap::from([("lf_test_key".to_string(), "acct_1".to_string())]);
        config
    }

    #[test]
    fn builds_state_with_full_catalog() {
        let state = build_state(&mock_config()).unwrap();
        assert_eq!(state.orchestrator.gateway_name(), "mock");
        assert_eq!(state.orchestrator.dispatcher().catalog().len(), 18);
        assert_eq!(state.authenticator.key_count(), 1);
    }

    #[test]
    fn sqlite_backend_opens_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = mock_config();
        config.store.backend = Some(StoreBackend::Sqlite);
        config.store.path = Some(dir.path().join("records.db"));
        assert!(open_store(&config).is_ok());
        assert!(dir.path().join("records.db").exists());
    }

    #[test]
    fn sqlite_without_path_is_an_error() {
        let mut config = mock_config();
        config.store.backend = Some(StoreBackend::Sqlite);
        assert!(open_store(&config).is_err());
    }

    #[test]
    fn persona_carries_configured_rules() {
        let assistant = AssistantConfig {
            name: Some("Ada".into()),
            currency: Some("EUR".into()),
            rules: vec!["Round to cents.".into()],
        };
        let p = persona(&assistant);
        assert_eq!(p.name, "Ada");
        assert_eq!(p.currency, "EUR");
        assert_eq!(p.extra_rules, vec!["Round to cents.".to_string()]);
    }
}
