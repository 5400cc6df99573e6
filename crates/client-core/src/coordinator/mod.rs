//! Session coordination
//!
//! [`SessionCoordinator`] owns the lifecycle of exactly one real-time session
//! end to end: it requests credentials, establishes the transport, publishes
//! local tracks, mirrors the SDK's participant/track lifecycle into
//! [`SessionState`], exposes mute/unmute and leave operations, and guarantees
//! cleanup on every exit path.
//!
//! # Architecture
//!
//! All state mutation happens on one event-processing task. User operations
//! and SDK events are funneled through a single ordered command channel, so
//! events are applied exactly in the order received and operations that
//! arrive while an async step is outstanding queue behind it:
//!
//! ```text
//! join/leave/toggles ──┐
//!                      ├─► command channel ─► actor task ─► SessionState
//! SDK event pump ──────┘        (ordered)        │
//!                                                ├─► watch (state stream)
//!                                                └─► broadcast + handler
//! ```
//!
//! The async suspension points (credential fetch, connect, publish) run in
//! spawned tasks tagged with the attempt generation current when they
//! started. `leave()` bumps the generation, so a resolution that arrives
//! after its attempt was cancelled is discarded instead of being applied to
//! a state that has already moved on.
//!
//! # Usage
//!
//! See [`CoordinatorBuilder`] for construction and the crate root for the
//! overall data flow.

mod builder;
mod config;
mod state;


pub use builder::CoordinatorBuilder;
pub use config::{ConnectOptions, CoordinatorConfig};

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::credentials::{CredentialClient, CredentialRequest};
use crate::error::{ClientError, ClientResult};
use crate::events::{SessionEvent, SessionEventHandler};
use crate::media::{LocalMediaRequest, MediaSourceProvider};
use crate::rtc::{RtcConnection, RtcConnector, RtcSession, RtcTrack};
use crate::session::{SessionPhase, SessionState, TrackHandle, TrackKind, TrackSid};

/// Commands processed by the coordinator's event loop
///
/// User operations and pumped SDK events share this one channel; that is
/// what serializes all state mutation.
enum Command {
    Join {
        identity: String,
        room_id: String,
        media: LocalMediaRequest,
        reply: oneshot::Sender<ClientResult<()>>,
    },
    Leave {
        done: Option<oneshot::Sender<()>>,
    },
    SetTrackEnabled {
        kind: TrackKind,
        enabled: bool,
    },
    ConnectResolved {
        attempt: u64,
        outcome: ClientResult<RtcConnection>,
    },
    PublishResolved {
        attempt: u64,
        outcome: PublishOutcome,
    },
    Rtc {
        attempt: u64,
        event: crate::rtc::RtcEvent,
    },
}

/// Result of the asynchronous local publish step
pub(crate) struct PublishOutcome {
    pub(crate) results: Vec<(TrackKind, ClientResult<Arc<dyn RtcTrack>>)>,
    pub(crate) requested_audio: bool,
    pub(crate) requested_video: bool,
}

/// Coordinates one real-time session between the credential backend, the
/// media SDK, and the presentation layer
///
/// Cheap to share as an `Arc`. Dropping the last handle triggers a
/// fire-and-forget teardown that still releases every session resource.
pub struct SessionCoordinator {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<SessionState>,
    event_tx: broadcast::Sender<SessionEvent>,
    tracks: Arc<DashMap<TrackSid, TrackHandle>>,
    handler: Arc<RwLock<Option<Arc<dyn SessionEventHandler>>>>,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator").finish_non_exhaustive()
    }
}

impl SessionCoordinator {
    /// Start building a coordinator
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    pub(crate) fn start(
        config: CoordinatorConfig,
        credentials: Arc<dyn CredentialClient>,
        media: Arc<dyn MediaSourceProvider>,
        connector: Arc<dyn RtcConnector>,
    ) -> Arc<Self> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::default());
        let (event_tx, _) = broadcast::channel(config.event_buffer.max(1));
        let tracks = Arc::new(DashMap::new());
        let handler: Arc<RwLock<Option<Arc<dyn SessionEventHandler>>>> =
            Arc::new(RwLock::new(None));

        let actor = Actor {
            config,
            credentials,
            media,
            connector,
            // The actor holds only a weak sender: the channel closes when
            // every coordinator handle is gone, which is the drop-teardown
            // signal.
            cmd_tx: cmd_tx.downgrade(),
            state_tx,
            event_tx: event_tx.clone(),
            handler: handler.clone(),
            tracks: tracks.clone(),
            state: SessionState::default(),
            attempt: 0,
            session: None,
            pending_media: None,
            connect_task: None,
            publish_task: None,
            pump_task: None,
        };
        tokio::spawn(actor.run(cmd_rx));

        Arc::new(Self {
            cmd_tx,
            state_rx,
            event_tx,
            tracks,
            handler,
        })
    }

    /// Join `room_id` as `identity`, publishing the requested local media
    ///
    /// Synchronous validation failures (`InvalidArgument`, `AlreadyJoining`)
    /// are returned directly. Once this call returns `Ok`, the attempt
    /// proceeds asynchronously: progress and failures surface through the
    /// returned state stream, with `last_error` populated on `Failed`.
    ///
    /// At most one attempt is ever in flight per coordinator; a concurrent
    /// `join()` fails fast with `AlreadyJoining` and leaves the first attempt
    /// untouched.
    pub async fn join(
        &self,
        identity: impl Into<String>,
        room_id: impl Into<String>,
        media: LocalMediaRequest,
    ) -> ClientResult<watch::Receiver<SessionState>> {
        let identity = identity.into();
        let room_id = room_id.into();
        if identity.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "identity must not be empty".to_string(),
            ));
        }
        if room_id.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "room id must not be empty".to_string(),
            ));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Join {
                identity,
                room_id,
                media,
                reply: reply_tx,
            })
            .map_err(|_| ClientError::Internal("coordinator task stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| ClientError::Internal("coordinator task stopped".to_string()))??;

        Ok(self.state_rx.clone())
    }

    /// Tear the session down, from any phase
    ///
    /// Fire-and-forget: the request is enqueued synchronously, so this is
    /// safe to call from a teardown path that cannot await. Idempotent; a
    /// leave while `Idle` is a no-op, and a leave mid-connect cancels the
    /// attempt. Use [`leave_and_wait`](Self::leave_and_wait) to await
    /// completion.
    pub fn leave(&self) {
        let _ = self.cmd_tx.send(Command::Leave { done: None });
    }

    /// Tear the session down and wait until the state is back to `Idle`
    pub async fn leave_and_wait(&self) -> ClientResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Leave {
                done: Some(done_tx),
            })
            .is_err()
        {
            // Task already stopped; everything was torn down on its way out.
            return Ok(());
        }
        let _ = done_rx.await;
        Ok(())
    }

    /// Toggle the local audio track
    ///
    /// A no-op (never an error) when no local audio track exists or the
    /// session is not connected, so UI toggles racing a teardown stay safe.
    pub fn set_local_audio_enabled(&self, enabled: bool) {
        let _ = self.cmd_tx.send(Command::SetTrackEnabled {
            kind: TrackKind::Audio,
            enabled,
        });
    }

    /// Toggle the local video track
    ///
    /// Same no-op semantics as [`set_local_audio_enabled`](Self::set_local_audio_enabled).
    pub fn set_local_video_enabled(&self, enabled: bool) {
        let _ = self.cmd_tx.send(Command::SetTrackEnabled {
            kind: TrackKind::Video,
            enabled,
        });
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state snapshots
    ///
    /// The receiver always holds the latest snapshot; intermediate snapshots
    /// may be coalesced. Use [`subscribe_events`](Self::subscribe_events)
    /// when every individual mutation matters.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Subscribe to the ordered event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Register the event handler, replacing any previous one
    pub async fn set_event_handler(&self, handler: Arc<dyn SessionEventHandler>) {
        *self.handler.write().await = Some(handler);
    }

    /// Look up a live track handle by SDK identifier
    ///
    /// Returns `None` once the track has been withdrawn and detached.
    pub fn find_track(&self, sid: &str) -> Option<TrackHandle> {
        self.tracks.get(sid).map(|entry| entry.value().clone())
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        // Best effort: the command channel also closes when cmd_tx drops,
        // which makes the actor run its final teardown.
        let _ = self.cmd_tx.send(Command::Leave { done: None });
    }
}

/// The event-processing task that owns all session state
struct Actor {
    config: CoordinatorConfig,
    credentials: Arc<dyn CredentialClient>,
    media: Arc<dyn MediaSourceProvider>,
    connector: Arc<dyn RtcConnector>,
    cmd_tx: mpsc::WeakUnboundedSender<Command>,
    state_tx: watch::Sender<SessionState>,
    event_tx: broadcast::Sender<SessionEvent>,
    handler: Arc<RwLock<Option<Arc<dyn SessionEventHandler>>>>,
    tracks: Arc<DashMap<TrackSid, TrackHandle>>,
    state: SessionState,
    /// Generation of the current session attempt. Bumped by every join and
    /// every teardown; resolutions tagged with an older generation are
    /// discarded.
    attempt: u64,
    session: Option<Arc<dyn RtcSession>>,
    pending_media: Option<LocalMediaRequest>,
    connect_task: Option<JoinHandle<()>>,
    publish_task: Option<JoinHandle<()>>,
    pump_task: Option<JoinHandle<()>>,
}

impl Actor {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = cmd_rx.recv().await {
            self.handle(command).await;
        }
        // Every coordinator handle is gone. Fire-and-forget teardown still
        // has to release all resources.
        tracing::debug!("coordinator dropped, running final teardown");
        self.shutdown().await;
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Join {
                identity,
                room_id,
                media,
                reply,
            } => {
                let result = self.begin_join(identity, room_id, media).await;
                let _ = reply.send(result);
            }
            Command::Leave { done } => {
                self.shutdown().await;
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Command::SetTrackEnabled { kind, enabled } => {
                self.apply_track_toggle(kind, enabled).await;
            }
            Command::ConnectResolved { attempt, outcome } => {
                self.apply_connect_outcome(attempt, outcome).await;
            }
            Command::PublishResolved { attempt, outcome } => {
                self.apply_publish_outcome(attempt, outcome).await;
            }
            Command::Rtc { attempt, event } => {
                if attempt != self.attempt {
                    tracing::debug!("dropping stale SDK event: {:?}", event);
                    return;
                }
                self.apply_rtc_event(event).await;
            }
        }
    }

    /// Validate the join gate and kick off the async establishment flow
    async fn begin_join(
        &mut self,
        identity: String,
        room_id: String,
        media: LocalMediaRequest,
    ) -> ClientResult<()> {
        if !self.state.phase.accepts_join() {
            return Err(ClientError::AlreadyJoining {
                phase: self.state.phase,
            });
        }

        // A failed attempt must be fully torn down before any retry.
        if self.state.phase == SessionPhase::Failed {
            self.set_phase(SessionPhase::Disconnecting).await;
            self.release_resources().await;
            self.set_phase(SessionPhase::Idle).await;
        }

        self.attempt = self.attempt.wrapping_add(1);
        let attempt = self.attempt;
        let session_id = Uuid::new_v4();

        tracing::info!(
            "joining room '{}' as '{}' (session {})",
            room_id,
            identity,
            session_id
        );

        self.state.session_id = Some(session_id);
        self.state.room_id = Some(room_id.clone());
        self.state.local_identity = Some(identity.clone());
        self.pending_media = Some(media);
        self.set_phase(SessionPhase::Connecting).await;

        let Some(cmd_tx) = self.cmd_tx.upgrade() else {
            return Ok(());
        };
        let credentials = self.credentials.clone();
        let connector = self.connector.clone();
        let options = self.config.connect_options.clone();
        let credential_timeout = self.config.credential_timeout;
        let connect_timeout = self.config.connect_timeout;
        self.connect_task = Some(tokio::spawn(async move {
            let outcome = establish(
                credentials,
                connector,
                CredentialRequest::new(identity, room_id),
                options,
                credential_timeout,
                connect_timeout,
            )
            .await;
            let _ = cmd_tx.send(Command::ConnectResolved { attempt, outcome });
        }));

        Ok(())
    }

    /// Apply the result of the credential/connect step
    async fn apply_connect_outcome(&mut self, attempt: u64, outcome: ClientResult<RtcConnection>) {
        if attempt != self.attempt {
            // The attempt was cancelled while the step was in flight. A late
            // success still holds transport resources; release them.
            if let Ok(connection) = outcome {
                tracing::debug!("closing session from cancelled connect attempt");
                tokio::spawn(async move { connection.session.close().await });
            }
            return;
        }
        self.connect_task = None;

        let connection = match outcome {
            Ok(connection) => connection,
            Err(error) => {
                tracing::warn!("session attempt failed: {}", error);
                self.fail_session(error).await;
                return;
            }
        };

        let RtcConnection { session, events } = connection;
        self.session = Some(session.clone());

        if let Some(cmd_tx) = self.cmd_tx.upgrade() {
            let mut events = events;
            self.pump_task = Some(tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    if cmd_tx.send(Command::Rtc { attempt, event }).is_err() {
                        break;
                    }
                }
            }));
        }

        self.state.last_error = None;
        self.set_phase(SessionPhase::Connected).await;

        let media_request = self.pending_media.take().unwrap_or_default();
        if media_request.wants_any() {
            if let Some(cmd_tx) = self.cmd_tx.upgrade() {
                let media = self.media.clone();
                self.publish_task = Some(tokio::spawn(async move {
                    let outcome = publish_local(media, session, media_request).await;
                    let _ = cmd_tx.send(Command::PublishResolved { attempt, outcome });
                }));
            }
        }
    }
}

/// Fetch credentials and establish the transport, each under its bound
async fn establish(
    credentials: Arc<dyn CredentialClient>,
    connector: Arc<dyn RtcConnector>,
    request: CredentialRequest,
    options: ConnectOptions,
    credential_timeout: Duration,
    connect_timeout: Duration,
) -> ClientResult<RtcConnection> {
    let issued = tokio::time::timeout(credential_timeout, credentials.issue(&request))
        .await
        .map_err(|_| {
            ClientError::Credential(format!(
                "credential request timed out after {:?}",
                credential_timeout
            ))
        })??;

    let connection = tokio::time::timeout(
        connect_timeout,
        connector.connect(&issued.server_url, &issued.token, &options),
    )
    .await
    .map_err(|_| {
        ClientError::Connection(format!("connect timed out after {:?}", connect_timeout))
    })??;

    Ok(connection)
}

/// Acquire and publish the requested local tracks
///
/// Never fails as a whole: each requested kind carries its own result and
/// the coordinator applies the partial-failure policy.
async fn publish_local(
    media: Arc<dyn MediaSourceProvider>,
    session: Arc<dyn RtcSession>,
    request: LocalMediaRequest,
) -> PublishOutcome {
    let requested_audio = request.audio;
    let requested_video = request.video;
    let mut results: Vec<(TrackKind, ClientResult<Arc<dyn RtcTrack>>)> = Vec::new();

    match media.acquire_local_tracks(&request).await {
        Err(error) => {
            let error = as_publish_error(error);
            if requested_audio {
                results.push((TrackKind::Audio, Err(error.clone())));
            }
            if requested_video {
                results.push((TrackKind::Video, Err(error)));
            }
        }
        Ok(tracks) => {
            let mut pending = Vec::new();
            if requested_audio {
                match tracks.audio {
                    Some(track) => pending.push((TrackKind::Audio, track)),
                    None => results.push((
                        TrackKind::Audio,
                        Err(ClientError::Publish(
                            "no local audio track available".to_string(),
                        )),
                    )),
                }
            }
            if requested_video {
                match tracks.video {
                    Some(track) => pending.push((TrackKind::Video, track)),
                    None => results.push((
                        TrackKind::Video,
                        Err(ClientError::Publish(
                            "no local video track available".to_string(),
                        )),
                    )),
                }
            }

            let publishes = pending.into_iter().map(|(kind, track)| {
                let session = session.clone();
                async move {
                    let result = session
                        .publish_track(track)
                        .await
                        .map_err(as_publish_error);
                    (kind, result)
                }
            });
            results.extend(futures::future::join_all(publishes).await);
        }
    }

    PublishOutcome {
        results,
        requested_audio,
        requested_video,
    }
}

fn as_publish_error(error: ClientError) -> ClientError {
    match error {
        ClientError::Publish(_) => error,
        other => ClientError::Publish(other.to_string()),
    }
}
