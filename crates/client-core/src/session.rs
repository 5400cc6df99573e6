//! Session state model for the coordinator
//!
//! This module contains the data structures the coordinator owns and
//! publishes: the top-level session phase, per-participant state, and the
//! track handles used to manage attach/detach lifecycle.
//!
//! # Key Components
//!
//! - **SessionPhase** - Top-level lifecycle state of the one session a
//!   coordinator manages
//! - **SessionState** - The full snapshot published to subscribers
//! - **ParticipantState** - One entry per connected remote identity
//! - **TrackHandle** - Detach-once wrapper over an SDK track
//!
//! Ownership: `SessionState` is mutated exclusively by the coordinator's
//! actor task. Everything the presentation layer sees is a cloned snapshot;
//! mutation flows back through coordinator operations only.
//!
//! # Examples
//!
//! ```rust
//! use roomcast_client_core::session::SessionPhase;
//!
//! assert!(SessionPhase::Idle.accepts_join());
//! assert!(SessionPhase::Failed.accepts_join());
//! assert!(!SessionPhase::Connected.accepts_join());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClientError;
use crate::rtc::RtcTrack;

/// Identifier the SDK assigns to an individual track
pub type TrackSid = String;

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    /// An audio track
    Audio,
    /// A video track
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Top-level lifecycle phase of a session
///
/// Transitions are monotonic within one session attempt:
/// `Idle → Connecting → Connected → Disconnecting → Idle`, with `Failed`
/// reachable from `Connecting` or `Connected` only. `Failed` is always
/// followed by a full teardown before any retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No session; a `join()` is accepted
    #[default]
    Idle,
    /// Credential fetch / transport connect in flight
    Connecting,
    /// Session established; media may flow
    Connected,
    /// Teardown in progress
    Disconnecting,
    /// The attempt or session failed; `last_error` is populated and a
    /// `join()` is accepted after teardown
    Failed,
}

impl SessionPhase {
    /// Whether a new `join()` is accepted from this phase
    ///
    /// `Idle` and `Failed` are the only phases from which a join proceeds.
    pub fn accepts_join(&self) -> bool {
        matches!(self, SessionPhase::Idle | SessionPhase::Failed)
    }

    /// Whether a session attempt is currently live (connecting or connected)
    pub fn is_active(&self) -> bool {
        matches!(self, SessionPhase::Connecting | SessionPhase::Connected)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Connecting => write!(f, "connecting"),
            SessionPhase::Connected => write!(f, "connected"),
            SessionPhase::Disconnecting => write!(f, "disconnecting"),
            SessionPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Handle to a subscribed or published media track
///
/// The coordinator exclusively owns attachment and detachment. A handle is
/// valid from its subscribe/publish event until the corresponding
/// unsubscribe/unpublish event, at which point the coordinator detaches it
/// exactly once before discarding it. Clones share the same detach flag, so
/// a handle that outlives its track (for example one held by a participant
/// tile) observes the detachment through [`TrackHandle::is_detached`].
#[derive(Clone)]
pub struct TrackHandle {
    sid: TrackSid,
    kind: TrackKind,
    participant: Option<String>,
    track: Arc<dyn RtcTrack>,
    detached: Arc<AtomicBool>,
}

impl TrackHandle {
    pub(crate) fn new(participant: Option<String>, track: Arc<dyn RtcTrack>) -> Self {
        Self {
            sid: track.sid(),
            kind: track.kind(),
            participant,
            track,
            detached: Arc::new(AtomicBool::new(false)),
        }
    }

    /// SDK-assigned identifier of the underlying track
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Kind of the underlying track
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Identity of the remote participant that published the track, or
    /// `None` for a local track
    pub fn participant(&self) -> Option<&str> {
        self.participant.as_deref()
    }

    /// Whether this handle has been detached and discarded
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Detach the underlying track from its render target
    ///
    /// Idempotent: only the first call reaches the SDK. Returns whether this
    /// call performed the detachment.
    pub(crate) fn detach(&self) -> bool {
        if self.detached.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.track.detach();
        true
    }

    /// Toggle the underlying track's enabled flag
    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.track.set_enabled(enabled);
    }
}

impl fmt::Debug for TrackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackHandle")
            .field("sid", &self.sid)
            .field("kind", &self.kind)
            .field("participant", &self.participant)
            .field("detached", &self.is_detached())
            .finish()
    }
}

/// State of one local track
#[derive(Debug, Clone)]
pub struct LocalTrackState {
    /// Kind of the track
    pub kind: TrackKind,
    /// Whether the track is currently enabled (unmuted)
    pub enabled: bool,
    /// Handle to the published track
    pub handle: TrackHandle,
}

/// State of one connected remote participant
///
/// A participant may be present with no active media: entries are retained
/// when their last track is withdrawn and removed only when the participant
/// leaves the session.
#[derive(Debug, Clone)]
pub struct ParticipantState {
    /// Identity of the participant, unique within the session
    pub identity: String,
    /// When the participant was first observed in this session
    pub joined_at: DateTime<Utc>,
    /// Whether the session granted this participant publish permission.
    /// Display-only (viewer vs participant role); no enforcement happens on
    /// the client.
    pub can_publish: bool,
    /// Active tracks, at most one per kind. Last-subscribed wins if the
    /// remote republishes.
    pub tracks: HashMap<TrackKind, TrackHandle>,
}

impl ParticipantState {
    pub(crate) fn new(identity: String, can_publish: bool) -> Self {
        Self {
            identity,
            joined_at: Utc::now(),
            can_publish,
            tracks: HashMap::new(),
        }
    }

    /// The participant's active track of the given kind, if any
    pub fn track(&self, kind: TrackKind) -> Option<&TrackHandle> {
        self.tracks.get(&kind)
    }
}

/// Snapshot of everything the coordinator knows about its session
///
/// Published through the coordinator's watch channel on every mutation.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Current lifecycle phase
    pub phase: SessionPhase,
    /// Identifier of the current session attempt, assigned when `Connecting`
    /// begins and cleared when the state returns to `Idle`
    pub session_id: Option<Uuid>,
    /// Room identifier, immutable once `Connecting` begins
    pub room_id: Option<String>,
    /// Local identity, immutable once set for an attempt
    pub local_identity: Option<String>,
    /// Published local tracks keyed by kind
    pub local_tracks: HashMap<TrackKind, LocalTrackState>,
    /// Connected remote participants keyed by identity. Never contains the
    /// local identity.
    pub remote_participants: HashMap<String, ParticipantState>,
    /// Most recent session-level error. Cleared when a join attempt reaches
    /// `Connected`; retained across the automatic teardown that follows an
    /// unexpected disconnect so the presentation layer can offer a retry.
    pub last_error: Option<ClientError>,
}

impl SessionState {
    /// Number of connected remote participants
    pub fn remote_count(&self) -> usize {
        self.remote_participants.len()
    }

    /// Whether the local track of the given kind exists and is enabled
    pub fn is_local_track_enabled(&self, kind: TrackKind) -> bool {
        self.local_tracks
            .get(&kind)
            .map(|track| track.enabled)
            .unwrap_or(false)
    }
}
