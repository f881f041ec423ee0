//! LedgerForge HTTP API Server
//!
//! Provides the chat endpoint, the tool catalog listing and a health check.

pub mod auth;
pub mod chat_api;
pub mod health_api;
pub mod server;

pub use auth::{ApiKeyAuthenticator, RequireAccount};
pub use server::{build_router, start_server, GatewayState};
