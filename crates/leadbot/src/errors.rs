use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving or running a single tool call.
///
/// These travel inside tool responses, so they stay serializable and cheap to clone.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    #[error("Invalid tool schema: {0}")]
    InvalidSchema(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

pub const ORACLE_FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble reaching the assistant right now. Please try again in a moment.";

pub const LOOP_FALLBACK_REPLY: &str =
    "Sorry, I couldn't finish working on that request. Could you rephrase it or try again?";

/// Errors raised by a conversation turn as a whole
#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Tool loop exceeded the limit of {limit} oracle consultations")]
    ToolLoopExceeded { limit: usize },

    #[error("Thread {thread_id} is corrupted: {reason}")]
    ThreadCorrupted { thread_id: String, reason: String },
}

impl ConversationError {
    /// The reply to show a user when a turn could not produce one
    pub fn fallback_reply(&self) -> &'static str {
        match self {
            ConversationError::OracleUnavailable(_) => ORACLE_FALLBACK_REPLY,
            ConversationError::ToolLoopExceeded { .. } => LOOP_FALLBACK_REPLY,
            ConversationError::ThreadCorrupted { .. } => {
                "This conversation can no longer continue. Please start a new one."
            }
        }
    }
}

pub type ConversationResult<T> = Result<T, ConversationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_roundtrips_through_json() {
        let error = AgentError::InvalidArguments("missing field `email`".to_string());
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: AgentError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn test_fallback_replies() {
        let oracle = ConversationError::OracleUnavailable("timeout".to_string());
        assert_eq!(oracle.fallback_reply(), ORACLE_FALLBACK_REPLY);

        let looped = ConversationError::ToolLoopExceeded { limit: 5 };
        assert_eq!(looped.fallback_reply(), LOOP_FALLBACK_REPLY);
        assert!(looped.to_string().contains('5'));
    }
}
