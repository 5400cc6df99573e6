//! Event notifications for presentation layers
//!
//! Every phase or participant/track mutation the coordinator applies is
//! mirrored as exactly one [`SessionEvent`]. Consumers can receive events two
//! ways, both fed from the same ordered stream:
//!
//! - a broadcast subscription ([`SessionCoordinator::subscribe_events`]),
//!   suitable for multiple independent consumers, and
//! - a registered [`SessionEventHandler`], awaited inline by the coordinator
//!   before the next event is applied.
//!
//! Handlers default every method to a no-op, so implementations only spell
//! out what they care about.
//!
//! [`SessionCoordinator::subscribe_events`]: crate::coordinator::SessionCoordinator::subscribe_events
//!
//! # Examples
//!
//! ```rust
//! use roomcast_client_core::events::SessionEventHandler;
//! use roomcast_client_core::session::TrackKind;
//! use async_trait::async_trait;
//!
//! struct TileRefresher;
//!
//! #[async_trait]
//! impl SessionEventHandler for TileRefresher {
//!     async fn on_track_subscribed(&self, identity: &str, kind: TrackKind) {
//!         println!("attach {} tile for {}", kind, identity);
//!     }
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ClientError;
use crate::session::{SessionPhase, TrackKind};

/// Notifications emitted by the coordinator, one per state mutation
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session phase changed
    PhaseChanged {
        /// Phase before the transition
        previous: SessionPhase,
        /// Phase after the transition
        phase: SessionPhase,
        /// When the transition occurred
        timestamp: DateTime<Utc>,
    },
    /// A remote participant joined (explicitly, or implicitly through a
    /// track subscription that arrived first)
    ParticipantJoined {
        /// Identity of the participant
        identity: String,
    },
    /// A remote participant left; all of their tracks were detached
    ParticipantLeft {
        /// Identity of the participant
        identity: String,
    },
    /// A remote track became available
    TrackSubscribed {
        /// Identity of the publishing participant
        identity: String,
        /// Kind of the track
        kind: TrackKind,
    },
    /// A remote track was withdrawn and its handle detached
    TrackUnsubscribed {
        /// Identity of the publishing participant
        identity: String,
        /// Kind of the track
        kind: TrackKind,
    },
    /// A local track finished publishing
    LocalTrackPublished {
        /// Kind of the track
        kind: TrackKind,
    },
    /// A local track was unpublished and its handle detached
    LocalTrackUnpublished {
        /// Kind of the track
        kind: TrackKind,
    },
    /// A local track's enabled flag was toggled
    LocalTrackToggled {
        /// Kind of the track
        kind: TrackKind,
        /// New enabled state
        enabled: bool,
    },
    /// A session-level error was recorded (also mirrored into
    /// [`SessionState::last_error`](crate::session::SessionState))
    SessionError {
        /// The recorded error
        error: ClientError,
        /// When the error was recorded
        timestamp: DateTime<Utc>,
    },
}

/// Receiver of coordinator events, registered via
/// [`SessionCoordinator::set_event_handler`](crate::coordinator::SessionCoordinator::set_event_handler)
///
/// Methods are awaited on the coordinator's event-processing task; keep them
/// short or hand work off to another task.
#[async_trait]
pub trait SessionEventHandler: Send + Sync {
    /// The session phase changed
    async fn on_phase_changed(&self, _previous: SessionPhase, _phase: SessionPhase) {}

    /// A remote participant joined
    async fn on_participant_joined(&self, _identity: &str) {}

    /// A remote participant left
    async fn on_participant_left(&self, _identity: &str) {}

    /// A remote track became available
    async fn on_track_subscribed(&self, _identity: &str, _kind: TrackKind) {}

    /// A remote track was withdrawn
    async fn on_track_unsubscribed(&self, _identity: &str, _kind: TrackKind) {}

    /// A local track finished publishing
    async fn on_local_track_published(&self, _kind: TrackKind) {}

    /// A local track was unpublished
    async fn on_local_track_unpublished(&self, _kind: TrackKind) {}

    /// A local track's enabled flag was toggled
    async fn on_local_track_toggled(&self, _kind: TrackKind, _enabled: bool) {}

    /// A session-level error was recorded
    async fn on_session_error(&self, _error: &ClientError) {}
}

/// Route one event to the matching handler method
pub(crate) async fn dispatch(handler: &dyn SessionEventHandler, event: &SessionEvent) {
    match event {
        SessionEvent::PhaseChanged {
            previous, phase, ..
        } => handler.on_phase_changed(*previous, *phase).await,
        SessionEvent::ParticipantJoined { identity } => {
            handler.on_participant_joined(identity).await
        }
        SessionEvent::ParticipantLeft { identity } => handler.on_participant_left(identity).await,
        SessionEvent::TrackSubscribed { identity, kind } => {
            handler.on_track_subscribed(identity, *kind).await
        }
        SessionEvent::TrackUnsubscribed { identity, kind } => {
            handler.on_track_unsubscribed(identity, *kind).await
        }
        SessionEvent::LocalTrackPublished { kind } => {
            handler.on_local_track_published(*kind).await
        }
        SessionEvent::LocalTrackUnpublished { kind } => {
            handler.on_local_track_unpublished(*kind).await
        }
        SessionEvent::LocalTrackToggled { kind, enabled } => {
            handler.on_local_track_toggled(*kind, *enabled).await
        }
        SessionEvent::SessionError { error, .. } => handler.on_session_error(error).await,
    }
}
