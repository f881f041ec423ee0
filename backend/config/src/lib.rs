//! `ledgerforge-config`: LedgerForge runtime configuration.
//!
//! Provides:
//! - Typed config schema (server, model, store, tools, auth, logging, assistant)
//! - YAML loading
//! - `${ENV_VAR}` substitution and well-known env overrides
//! - Default value application
//! - Validation with warnings and errors
//! - Config redaction for safe logging

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, apply_env_overrides_with, collect_referenced_vars, resolve_env_vars, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config_value};
pub use redact::{redact, redacted_summary};
pub use schema::{
    AssistantConfig, AuthConfig, LedgerForgeConfig, LoggingConfig, ModelConfig, ServerConfig, StoreBackend,
    StoreConfig, ToolsConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load, substitute env vars, apply overrides and defaults, and validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// warnings are logged; validation errors fail the load.
pub async fn load_and_prepare(path: &Path) -> Result<LedgerForgeConfig> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
    load_and_prepare_with(path, config_dir, &env).await
}

/// [`load_and_prepare`] with an explicit environment.
pub async fn load_and_prepare_with(
    path: &Path,
    config_dir: &Path,
    env: &HashMap<String, String>,
) -> Result<LedgerForgeConfig> {
    let raw = load_config_value(path).await?;

    let referenced = collect_referenced_vars(&raw);
    if !referenced.is_empty() {
        tracing::debug!(vars = ?referenced, "Config references environment variables");
    }
    let value = crate::env::resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;

    let config: LedgerForgeConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides_with(config, env);
    let config = apply_all_defaults(config, config_dir);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.into_iter().next() {
        bail!(first);
    }

    tracing::debug!(config = %redacted_summary(&config), "Config ready");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn pipeline_substitutes_overrides_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(
            &path,
            "model:\n  provider: openrouter\n  apiKey: ${OPENROUTER_API_KEY}\nauth:\n  apiKeys:\n    lf_test_key_0123456789: acct_main\nstore:\n  backend: sqlite\n",
        )
        .unwrap();

        let config = load_and_prepare_with(
            &path,
            dir.path(),
            &env(&[("OPENROUTER_API_KEY", "sk-or-live"), ("LEDGERFORGE_PORT", "4100")]),
        )
        .await
        .unwrap();

        assert_eq!(config.model.api_key.as_deref(), Some("sk-or-live"));
        assert_eq!(config.server.port(), 4100);
        assert_eq!(config.store.path, Some(dir.path().join(defaults::DEFAULT_DB_FILE)));
        assert_eq!(config.model.model(), defaults::DEFAULT_OPENROUTER_MODEL);
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_and_prepare_with(&config_file_path(dir.path()), dir.path(), &HashMap::new())
            .await
            .unwrap();
        assert_eq!(config.model.provider(), "mock");
        assert_eq!(config.store.backend(), StoreBackend::Memory);
    }

    #[tokio::test]
    async fn invalid_config_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "model:\n  provider: openrouter\n").unwrap();
        let err = load_and_prepare_with(&path, dir.path(), &HashMap::new()).await.unwrap_err();
        assert!(err.to_string().contains("model.apiKey"));
    }
}
