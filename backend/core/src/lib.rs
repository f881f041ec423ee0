//! Core types and traits for the LedgerForge chat runtime: tool catalog
//! entries, the uniform tool result envelope, conversation turns, and the
//! model gateway seam.

pub mod error;
pub mod message;
pub mod tools;
pub mod traits;
pub mod types;

pub use error::LedgerError;
pub use message::{ConversationTurn, ModelReply, Role, ToolInvocation, Transcript, TurnPart};
pub use tools::ToolRegistry;
pub use traits::{ModelGateway, Tool};
pub use types::{AccountContext, ParamField, ParamSchema, ToolResult, ToolSpec};
