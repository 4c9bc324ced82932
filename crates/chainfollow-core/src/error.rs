//! Error types for the chain follower.

use thiserror::Error;

use crate::follower::FollowerState;

/// Errors that can occur while following the chain.
#[derive(Debug, Error)]
pub enum FollowerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Invalid mint key '{key}': {reason}")]
    InvalidMintKey { key: String, reason: String },

    #[error("Cannot {operation} while follower is {state}")]
    InvalidState {
        operation: &'static str,
        state: FollowerState,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl FollowerError {
    /// Returns `true` if the projection store failed.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns `true` if the job queue failed.
    pub fn is_queue(&self) -> bool {
        matches!(self, Self::Queue(_))
    }

    /// Returns `true` if the chain-sync transport failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<serde_json::Error> for FollowerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
