//! Config defaults: applies sensible default values to parsed config.

use std::path::Path;

use crate::schema::{LedgerForgeConfig, StoreBackend};

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;

/// Offline provider, so a fresh checkout serves without any credentials.
pub const DEFAULT_PROVIDER: &str = "mock";
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-2.0-flash-001";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_LOOKUP_LIMIT: usize = 5;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_DB_FILE: &str = "ledgerforge.db";

pub fn default_model_for(provider: &str) -> &'static str {
    match provider {
        "openrouter" => DEFAULT_OPENROUTER_MODEL,
        "ollama" => DEFAULT_OLLAMA_MODEL,
        _ => "mock",
    }
}

/// Apply all defaults to a freshly loaded config.
///
/// `config_dir` anchors the default SQLite path.
pub fn apply_all_defaults(config: LedgerForgeConfig, config_dir: &Path) -> LedgerForgeConfig {
    let config = apply_server_defaults(config);
    let config = apply_model_defaults(config);
    let config = apply_store_defaults(config, config_dir);
    let config = apply_tool_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: LedgerForgeConfig) -> LedgerForgeConfig {
    config.server.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    config.server.port.get_or_insert(DEFAULT_PORT);
    config
}

/// A configured API key implies OpenRouter when no provider was named.
fn apply_model_defaults(mut config: LedgerForgeConfig) -> LedgerForgeConfig {
    let model = &mut config.model;
    if model.provider.is_none() {
        let provider = if model.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
            "openrouter"
        } else {
            DEFAULT_PROVIDER
        };
        model.provider = Some(provider.to_string());
    }
    if model.model.is_none() {
        model.model = Some(default_model_for(model.provider()).to_string());
    }
    model.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    model.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    config
}

/// A path without a backend means SQLite; SQLite without a path lives in the
/// config directory.
fn apply_store_defaults(mut config: LedgerForgeConfig, config_dir: &Path) -> LedgerForgeConfig {
    let store = &mut config.store;
    if store.backend.is_none() {
        store.backend = Some(if store.path.is_some() {
            StoreBackend::Sqlite
        } else {
            StoreBackend::Memory
        });
    }
    if store.backend == Some(StoreBackend::Sqlite) && store.path.is_none() {
        store.path = Some(config_dir.join(DEFAULT_DB_FILE));
    }
    config
}

fn apply_tool_defaults(mut config: LedgerForgeConfig) -> LedgerForgeConfig {
    config.tools.timeout_ms.get_or_insert(DEFAULT_TOOL_TIMEOUT_MS);
    config.tools.lookup_limit.get_or_insert(DEFAULT_LOOKUP_LIMIT);
    config
}

fn apply_logging_defaults(mut config: LedgerForgeConfig) -> LedgerForgeConfig {
    config.logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config.logging.json.get_or_insert(false);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dir() -> PathBuf {
        PathBuf::from("/srv/ledgerforge")
    }

    #[test]
    fn fills_empty_config() {
        let cfg = apply_all_defaults(LedgerForgeConfig::default(), &dir());
        assert_eq!(cfg.server.port, Some(DEFAULT_PORT));
        assert_eq!(cfg.model.provider.as_deref(), Some("mock"));
        assert_eq!(cfg.store.backend, Some(StoreBackend::Memory));
        assert!(cfg.store.path.is_none());
        assert_eq!(cfg.tools.lookup_limit, Some(DEFAULT_LOOKUP_LIMIT));
        assert_eq!(cfg.logging.level.as_deref(), Some("info"));
    }

    #[test]
    fn api_key_selects_openrouter() {
        let mut cfg = LedgerForgeConfig::default();
        cfg.model.api_key = Some("sk-or-abc".into());
        let cfg = apply_all_defaults(cfg, &dir());
        assert_eq!(cfg.model.provider.as_deref(), Some("openrouter"));
        assert_eq!(cfg.model.model.as_deref(), Some(DEFAULT_OPENROUTER_MODEL));
    }

    #[test]
    fn sqlite_path_defaults_into_config_dir() {
        let mut cfg = LedgerForgeConfig::default();
        cfg.store.backend = Some(StoreBackend::Sqlite);
        let cfg = apply_all_defaults(cfg, &dir());
        assert_eq!(cfg.store.path, Some(dir().join(DEFAULT_DB_FILE)));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = LedgerForgeConfig::default();
        cfg.server.port = Some(8080);
        cfg.model.provider = Some("ollama".into());
        cfg.model.model = Some("qwen2.5".into());
        cfg.tools.timeout_ms = Some(0);
        let cfg = apply_all_defaults(cfg, &dir());
        assert_eq!(cfg.server.port, Some(8080));
        assert_eq!(cfg.model.model.as_deref(), Some("qwen2.5"));
        assert_eq!(cfg.tools.timeout_ms, Some(0));
    }
}
