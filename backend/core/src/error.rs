use thiserror::Error;

/// Errors raised while assembling the runtime (tool catalog, wiring).
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
