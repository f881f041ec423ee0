//! Config validation with user-friendly error messages.

use crate::schema::{LedgerForgeConfig, StoreBackend};
use thiserror::Error;

const PROVIDERS: &[&str] = &["openrouter", "ollama", "mock"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &LedgerForgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_model(config, &mut report);
    validate_store(config, &mut report);
    validate_tools(config, &mut report);
    validate_auth(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_server(config: &LedgerForgeConfig, report: &mut ValidationReport) {
    match config.server.port {
        Some(0) => report.error("server.port", "Port must be between 1 and 65535"),
        Some(port) if port < 1024 && port != 80 && port != 443 => report.warn(
            "server.port",
            format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
        ),
        _ => {}
    }
    if config.server.bind().parse::<std::net::IpAddr>().is_err() {
        report.error("server.bind", format!("'{}' is not an IP address", config.server.bind()));
    }
}

fn validate_model(config: &LedgerForgeConfig, report: &mut ValidationReport) {
    let model = &config.model;
    let provider = model.provider();
    if !PROVIDERS.contains(&provider) {
        report.error(
            "model.provider",
            format!("Unknown provider '{provider}'; expected one of {}", PROVIDERS.join(", ")),
        );
    }
    if provider == "openrouter" && model.api_key.as_deref().map(str::is_empty).unwrap_or(true) {
        report.error("model.apiKey", "OpenRouter requires an API key (set OPENROUTER_API_KEY)");
    }
    if provider == "mock" {
        report.warn("model.provider", "Using the offline mock provider; replies are canned");
    }
    if let Some(temperature) = model.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            report.warn("model.temperature", format!("Temperature {temperature} is outside 0.0-2.0"));
        }
    }
    if model.max_tokens == Some(0) {
        report.error("model.maxTokens", "maxTokens must be > 0");
    }
}

fn validate_store(config: &LedgerForgeConfig, report: &mut ValidationReport) {
    if config.store.backend() == StoreBackend::Sqlite && config.store.path.is_none() {
        report.error("store.path", "The sqlite backend needs a database path");
    }
    if config.store.backend() == StoreBackend::Memory {
        report.warn("store.backend", "In-memory store: all records are lost on restart");
    }
}

fn validate_tools(config: &LedgerForgeConfig, report: &mut ValidationReport) {
    match config.tools.lookup_limit {
        Some(0) => report.error("tools.lookupLimit", "lookupLimit must be > 0"),
        Some(limit) if limit > 50 => {
            report.warn("tools.lookupLimit", format!("lookupLimit {limit} floods the model with candidates"))
        }
        _ => {}
    }
    if config.tools.timeout_ms == Some(0) {
        report.warn("tools.timeoutMs", "Tool timeout disabled; a hanging tool stalls its request");
    }
}

fn validate_auth(config: &LedgerForgeConfig, report: &mut ValidationReport) {
    let auth = &config.auth;
    if auth.api_keys.is_empty() && !auth.trust_account_header() {
        report.warn("auth.apiKeys", "No API keys configured; every chat request will be rejected");
    }
    for (key, account) in &auth.api_keys {
        if key.trim().is_empty() {
            report.error("auth.apiKeys", "API key cannot be empty");
        } else if key.len() < 16 {
            report.warn("auth.apiKeys", "API keys shorter than 16 characters are easy to guess");
        }
        if account.trim().is_empty() {
            report.error("auth.apiKeys", "Account id cannot be empty");
        }
    }
}

fn validate_logging(config: &LedgerForgeConfig, report: &mut ValidationReport) {
    let level = config.logging.level().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        report.warn("logging.level", format!("Unknown log level '{level}'"));
    }
}
