//! Error types for the binja MCP bridge.
//!
//! Every tool failure is recovered at the dispatcher boundary and returned to
//! the client as a typed result with `is_error: true`; none of them are fatal
//! to the process.

use crate::analysis::SourceError;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy reported to the calling client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Ambiguous,
    NoCurrentContext,
    InvalidArgument,
    MutationFailed,
    /// The data source could not produce the requested representation.
    Unavailable,
    /// The call was abandoned (timeout or transport cancellation).
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Ambiguous => "ambiguous",
            Self::NoCurrentContext => "no_current_context",
            Self::InvalidArgument => "invalid_argument",
            Self::MutationFailed => "mutation_failed",
            Self::Unavailable => "unavailable",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool execution errors - returned with is_error: true in CallToolResult
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("{0}")]
    NotFound(String),

    #[error("{what} name '{name}' is ambiguous: {count} matches ({candidates}). Rename one of them or use the current-function variant.")]
    Ambiguous {
        what: &'static str,
        name: String,
        count: usize,
        candidates: String,
    },

    #[error("{0}")]
    NoCurrentContext(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Analysis database rejected the change: {0}")]
    MutationFailed(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Operation cancelled before any change was applied")]
    Cancelled,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ToolError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Ambiguous { .. } => FailureKind::Ambiguous,
            Self::NoCurrentContext(_) => FailureKind::NoCurrentContext,
            Self::InvalidArgument(_) => FailureKind::InvalidArgument,
            Self::MutationFailed(_) => FailureKind::MutationFailed,
            Self::Unavailable(_) => FailureKind::Unavailable,
            Self::Cancelled | Self::Timeout(_) => FailureKind::Cancelled,
        }
    }
}

/// Failure rendered for the client as `[kind] message`.
pub fn failure_result(kind: FailureKind, message: &str) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("[{kind}] {message}"))])
}

impl From<SourceError> for ToolError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Stale(_) => ToolError::NotFound(e.to_string()),
            SourceError::Rejected(msg) => ToolError::MutationFailed(msg),
            SourceError::Unavailable(msg) => ToolError::Unavailable(msg),
        }
    }
}

impl From<tokio::task::JoinError> for ToolError {
    fn from(e: tokio::task::JoinError) -> Self {
        ToolError::Unavailable(format!("Tool worker failed: {e}"))
    }
}
