//! Real-time SDK seam
//!
//! The coordinator treats the underlying real-time media SDK as a black box
//! behind three traits: [`RtcConnector`] establishes a session from a server
//! URL and token, [`RtcSession`] publishes tracks and closes the transport,
//! and [`RtcTrack`] is the SDK's track object. The SDK's callback surface is
//! modeled as the closed [`RtcEvent`] set; the coordinator consumes those
//! events through a single ordered channel and applies exactly one state
//! mutation per event.
//!
//! Connector contract:
//!
//! - Events must be delivered in the order the SDK observed them. The
//!   coordinator neither reorders nor coalesces.
//! - For every participant already present in the room at connect time, the
//!   connector must synthesize a [`RtcEvent::ParticipantConnected`] before
//!   delivering any of that participant's track events.
//! - An unexpected transport drop is reported as [`RtcEvent::Disconnected`];
//!   a close initiated through [`RtcSession::close`] is not.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::coordinator::ConnectOptions;
use crate::error::ClientResult;
use crate::media::MediaTrack;
use crate::session::{TrackKind, TrackSid};

/// A track object owned by the SDK, either subscribed or published
pub trait RtcTrack: Send + Sync {
    /// SDK-assigned track identifier
    fn sid(&self) -> TrackSid;

    /// Kind of the track
    fn kind(&self) -> TrackKind;

    /// Toggle whether the track produces/consumes media
    fn set_enabled(&self, enabled: bool);

    /// Detach the track from any render target and release its resources
    fn detach(&self);
}

/// Lifecycle events emitted by the SDK for one session
pub enum RtcEvent {
    /// A remote participant joined the room
    ParticipantConnected {
        /// Identity of the participant
        identity: String,
        /// Whether the session granted the participant publish permission
        can_publish: bool,
    },
    /// A remote participant left the room
    ParticipantDisconnected {
        /// Identity of the participant
        identity: String,
    },
    /// A remote track was subscribed and is ready to attach
    TrackSubscribed {
        /// Identity of the publishing participant
        identity: String,
        /// The subscribed track
        track: Arc<dyn RtcTrack>,
    },
    /// A remote track was withdrawn
    TrackUnsubscribed {
        /// Identity of the publishing participant
        identity: String,
        /// Kind of the withdrawn track
        kind: TrackKind,
        /// Identifier of the withdrawn track
        sid: TrackSid,
    },
    /// A local track finished publishing
    LocalTrackPublished {
        /// Kind of the published track
        kind: TrackKind,
    },
    /// A local track was unpublished
    LocalTrackUnpublished {
        /// Kind of the unpublished track
        kind: TrackKind,
    },
    /// The transport dropped unexpectedly. Fatal to the session.
    Disconnected {
        /// SDK-provided reason, for diagnostics
        reason: String,
    },
}

impl fmt::Debug for RtcEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtcEvent::ParticipantConnected {
                identity,
                can_publish,
            } => f
                .debug_struct("ParticipantConnected")
                .field("identity", identity)
                .field("can_publish", can_publish)
                .finish(),
            RtcEvent::ParticipantDisconnected { identity } => f
                .debug_struct("ParticipantDisconnected")
                .field("identity", identity)
                .finish(),
            RtcEvent::TrackSubscribed { identity, track } => f
                .debug_struct("TrackSubscribed")
                .field("identity", identity)
                .field("sid", &track.sid())
                .field("kind", &track.kind())
                .finish(),
            RtcEvent::TrackUnsubscribed {
                identity,
                kind,
                sid,
            } => f
                .debug_struct("TrackUnsubscribed")
                .field("identity", identity)
                .field("kind", kind)
                .field("sid", sid)
                .finish(),
            RtcEvent::LocalTrackPublished { kind } => f
                .debug_struct("LocalTrackPublished")
                .field("kind", kind)
                .finish(),
            RtcEvent::LocalTrackUnpublished { kind } => f
                .debug_struct("LocalTrackUnpublished")
                .field("kind", kind)
                .finish(),
            RtcEvent::Disconnected { reason } => f
                .debug_struct("Disconnected")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// An established session plus its ordered event stream
pub struct RtcConnection {
    /// Handle for publishing tracks and closing the transport
    pub session: Arc<dyn RtcSession>,
    /// Ordered lifecycle events for this session
    pub events: mpsc::UnboundedReceiver<RtcEvent>,
}

/// Establishes real-time sessions from credential triples
#[async_trait]
pub trait RtcConnector: Send + Sync {
    /// Connect to `server_url` with `token`
    ///
    /// Errors map to [`ClientError::Connection`](crate::error::ClientError).
    async fn connect(
        &self,
        server_url: &Url,
        token: &str,
        options: &ConnectOptions,
    ) -> ClientResult<RtcConnection>;
}

/// One established real-time session
#[async_trait]
pub trait RtcSession: Send + Sync {
    /// Publish a local track into the session
    ///
    /// Returns the SDK's published track object. Errors map to
    /// [`ClientError::Publish`](crate::error::ClientError).
    async fn publish_track(&self, track: Arc<dyn MediaTrack>) -> ClientResult<Arc<dyn RtcTrack>>;

    /// Close the transport and release all session resources
    ///
    /// Must be idempotent; the coordinator may race a close against an SDK
    /// disconnect.
    async fn close(&self);
}
