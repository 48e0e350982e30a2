//! Message Loop Error Types

use crate::core::error_handling::ContextualError;
use crate::message_loop::message::Message;

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("Message loop '{loop_id}' is already running on another thread")]
    AlreadyRunning { loop_id: String },

    #[error("Message loop '{loop_id}' has already stopped")]
    AlreadyStopped { loop_id: String },

    #[error("Message loop '{loop_id}' has no running consumer")]
    NotRunning { loop_id: String },

    #[error("Operation '{operation}' would block the owner thread of loop '{loop_id}'")]
    WouldDeadlock {
        loop_id: String,
        operation: &'static str,
    },

    #[error("Drain of loop '{loop_id}' did not complete within {timeout_ms}ms")]
    DrainTimeout { loop_id: String, timeout_ms: u64 },

    #[error("Message loop '{loop_id}': {message}")]
    Poisoned { loop_id: String, message: String },
}

impl ContextualError for LoopError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, LoopError::Poisoned { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            LoopError::AlreadyRunning { .. } => Some("run() must be called from exactly one thread"),
            LoopError::AlreadyStopped { .. } => Some("the loop has terminated and cannot be reused"),
            LoopError::NotRunning { .. } => Some("start run() on the owner thread first"),
            LoopError::WouldDeadlock { .. } => {
                Some("blocking operations cannot be issued from an observer callback")
            }
            LoopError::DrainTimeout { .. } => Some("an observer is blocking the loop thread"),
            LoopError::Poisoned { .. } => None,
        }
    }
}

/// A `send` rejected because the loop has stopped
///
/// Ownership of the message returns to the caller.
#[derive(Debug, thiserror::Error)]
#[error("Message loop '{loop_id}' rejected message '{}': loop has stopped", .message.id())]
pub struct SendError {
    pub loop_id: String,
    pub message: Message,
}

impl SendError {
    pub fn into_message(self) -> Message {
        self.message
    }
}

/// Result type for loop operations
pub type LoopResult<T> = Result<T, LoopError>;
