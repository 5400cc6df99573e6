//! Error types for client-core operations
//!
//! Every fallible operation in this crate returns [`ClientResult`]. The error
//! taxonomy is deliberately small and mirrors the coordinator's failure
//! surfaces: argument validation, join gating, the credential round trip,
//! the transport connect, and local track publishing.
//!
//! Errors raised *after* `join()` has returned control to the caller (a failed
//! credential fetch, a dropped transport) are not surfaced through a rejected
//! call. They are recorded in [`SessionState::last_error`] and delivered
//! through the state stream, since the original call may already have
//! completed by the time they occur.
//!
//! [`SessionState::last_error`]: crate::session::SessionState
//!
//! # Examples
//!
//! ```rust
//! use roomcast_client_core::error::ClientError;
//!
//! let error = ClientError::Credential("backend returned 500".to_string());
//! assert_eq!(error.kind(), "credential");
//! assert!(error.to_string().contains("500"));
//! ```

use thiserror::Error;

use crate::session::SessionPhase;

/// Errors that can occur during coordinator operations
///
/// All variants are cheap to clone so the most recent error can live inside
/// [`SessionState`](crate::session::SessionState) snapshots.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// A caller-supplied argument failed validation (empty identity, empty
    /// room id, malformed base URL). Returned synchronously from the
    /// offending call.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A `join()` was attempted while another session attempt is in flight
    /// or already established. The first attempt is left untouched.
    #[error("Join rejected: session is already {phase}")]
    AlreadyJoining {
        /// Phase the coordinator was in when the join was rejected
        phase: SessionPhase,
    },

    /// The credential backend was unreachable, timed out, or rejected the
    /// request.
    #[error("Credential request failed: {0}")]
    Credential(String),

    /// The real-time transport failed to establish, timed out, or dropped
    /// unexpectedly mid-session.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A local track could not be acquired or published. Partial publish
    /// failures do not end the session; see the coordinator's publish policy.
    #[error("Track publish failed: {0}")]
    Publish(String),

    /// An internal fault (the coordinator task stopped, a channel closed).
    /// Not expected in normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Stable machine-readable kind for this error
    ///
    /// Presentation layers key generic error copy and retry affordances off
    /// this rather than parsing display strings.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::InvalidArgument(_) => "invalid-argument",
            ClientError::AlreadyJoining { .. } => "already-joining",
            ClientError::Credential(_) => "credential",
            ClientError::Connection(_) => "connection",
            ClientError::Publish(_) => "publish",
            ClientError::Internal(_) => "internal",
        }
    }

    /// Whether this error ends a session attempt (as opposed to a partial,
    /// recoverable failure like a single track that would not publish)
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            ClientError::Credential(_) | ClientError::Connection(_)
        )
    }
}

/// Result type alias for client-core operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(
            ClientError::InvalidArgument("x".into()).kind(),
            "invalid-argument"
        );
        assert_eq!(
            ClientError::AlreadyJoining {
                phase: SessionPhase::Connecting
            }
            .kind(),
            "already-joining"
        );
        assert_eq!(ClientError::Credential("x".into()).kind(), "credential");
        assert_eq!(ClientError::Connection("x".into()).kind(), "connection");
        assert_eq!(ClientError::Publish("x".into()).kind(), "publish");
        assert_eq!(ClientError::Internal("x".into()).kind(), "internal");
    }

    #[test]
    fn fatality_follows_taxonomy() {
        assert!(ClientError::Connection("dropped".into()).is_fatal_to_session());
        assert!(ClientError::Credential("500".into()).is_fatal_to_session());
        assert!(!ClientError::Publish("no device".into()).is_fatal_to_session());
    }
}
