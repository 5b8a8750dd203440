//! Error handling for mediadrop

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification attached to every failure the orchestrator surfaces.
///
/// The serving layer picks a status code from this; it is never collapsed
/// into a generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidRequest,
    FormatUnavailable,
    AuthRequired,
    NetworkError,
    EngineCrash,
    Unknown,
    NoArtifactProduced,
    Cancelled,
    Workspace,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::FormatUnavailable => "format_unavailable",
            FailureKind::AuthRequired => "auth_required",
            FailureKind::NetworkError => "network_error",
            FailureKind::EngineCrash => "engine_crash",
            FailureKind::Unknown => "unknown",
            FailureKind::NoArtifactProduced => "no_artifact_produced",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Workspace => "workspace",
        }
    }

    /// Only a missing format lets the fallback chain move on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FailureKind::FormatUnavailable)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for an acquisition
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Requested format is not available: {0}")]
    FormatUnavailable(String),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Extraction engine crashed: {0}")]
    EngineCrash(String),

    #[error("Extraction failed: {0}")]
    Unknown(String),

    #[error("No artifact produced: {0}")]
    NoArtifactProduced(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}

impl AcquireError {
    /// Build the error matching an engine-side classification.
    pub fn from_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            FailureKind::InvalidRequest => AcquireError::InvalidRequest(message),
            FailureKind::FormatUnavailable => AcquireError::FormatUnavailable(message),
            FailureKind::AuthRequired => AcquireError::AuthRequired(message),
            FailureKind::NetworkError => AcquireError::NetworkError(message),
            FailureKind::EngineCrash => AcquireError::EngineCrash(message),
            FailureKind::NoArtifactProduced => AcquireError::NoArtifactProduced(message),
            FailureKind::Cancelled => AcquireError::Cancelled,
            FailureKind::Workspace => {
                AcquireError::Workspace(std::io::Error::other(message))
            }
            FailureKind::Unknown => AcquireError::Unknown(message),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            AcquireError::InvalidRequest(_) => FailureKind::InvalidRequest,
            AcquireError::FormatUnavailable(_) => FailureKind::FormatUnavailable,
            AcquireError::AuthRequired(_) => FailureKind::AuthRequired,
            AcquireError::NetworkError(_) => FailureKind::NetworkError,
            AcquireError::EngineCrash(_) => FailureKind::EngineCrash,
            AcquireError::Unknown(_) => FailureKind::Unknown,
            AcquireError::NoArtifactProduced(_) => FailureKind::NoArtifactProduced,
            AcquireError::Cancelled => FailureKind::Cancelled,
            AcquireError::Workspace(_) => FailureKind::Workspace,
        }
    }
}
