//! Typed error hierarchy for Quickboard.
//!
//! Three top-level enums cover the three subsystems:
//! - `ClientError`: HTTP calls from the client to the board service
//! - `SyncError`: session load and sync agent failures
//! - `ServiceError`: board service credential and storage failures

use thiserror::Error;

/// Errors from a single request against the board service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// 401/403: the credential is missing, invalid or expired.
    #[error("Credential rejected by server (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode server response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the client session and its sync agent.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The server rejected the credential; the session has been cleared.
    #[error("Session expired, logged out")]
    LoggedOut,

    #[error("No credential stored, log in first")]
    NotLoggedIn,

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Sync agent is no longer running")]
    AgentStopped,
}

/// Errors from the board service's credential and storage layers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Missing fields")]
    MissingFields,

    #[error("User already exists")]
    UserExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}
