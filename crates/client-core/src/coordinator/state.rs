//! State mutation for the coordinator's event loop
//!
//! Each SDK event maps to exactly one mutation of the actor's working
//! [`SessionState`], mirrored to subscribers as one snapshot plus one
//! [`SessionEvent`]. Teardown lives here too so every exit path (explicit
//! leave, failure, drop) runs the same release sequence.

use std::sync::Arc;

use chrono::Utc;

use crate::error::ClientError;
use crate::events::{self, SessionEvent};
use crate::rtc::{RtcEvent, RtcTrack};
use crate::session::{LocalTrackState, ParticipantState, SessionPhase, TrackHandle, TrackKind};

use super::{Actor, PublishOutcome};

impl Actor {
    /// Apply one SDK event to the session state
    pub(super) async fn apply_rtc_event(&mut self, event: RtcEvent) {
        match event {
            RtcEvent::ParticipantConnected {
                identity,
                can_publish,
            } => self.on_participant_connected(identity, can_publish).await,
            RtcEvent::ParticipantDisconnected { identity } => {
                self.on_participant_disconnected(identity).await
            }
            RtcEvent::TrackSubscribed { identity, track } => {
                self.on_track_subscribed(identity, track).await
            }
            RtcEvent::TrackUnsubscribed {
                identity,
                kind,
                sid,
            } => self.on_track_unsubscribed(identity, kind, sid).await,
            RtcEvent::LocalTrackPublished { kind } => self.on_local_track_published(kind),
            RtcEvent::LocalTrackUnpublished { kind } => {
                self.on_local_track_unpublished(kind).await
            }
            RtcEvent::Disconnected { reason } => self.on_transport_dropped(reason).await,
        }
    }

    async fn on_participant_connected(&mut self, identity: String, can_publish: bool) {
        if self.is_local(&identity) {
            return;
        }
        if self.state.remote_participants.contains_key(&identity) {
            // Connector synthesizes joins for existing occupants; a duplicate
            // must not reset the participant's tracks.
            return;
        }
        if self.at_participant_capacity() {
            tracing::warn!(
                "ignoring participant '{}': at capacity ({})",
                identity,
                self.config.max_remote_participants
            );
            return;
        }

        tracing::info!("participant '{}' joined", identity);
        self.state.remote_participants.insert(
            identity.clone(),
            ParticipantState::new(identity.clone(), can_publish),
        );
        self.publish_state();
        self.emit(SessionEvent::ParticipantJoined { identity }).await;
    }

    async fn on_participant_disconnected(&mut self, identity: String) {
        let Some(participant) = self.state.remote_participants.remove(&identity) else {
            return;
        };

        tracing::info!("participant '{}' left", identity);
        let mut withdrawn = Vec::new();
        for (kind, handle) in participant.tracks {
            self.tracks.remove(handle.sid());
            handle.detach();
            withdrawn.push(kind);
        }

        self.publish_state();
        for kind in withdrawn {
            self.emit(SessionEvent::TrackUnsubscribed {
                identity: identity.clone(),
                kind,
            })
            .await;
        }
        self.emit(SessionEvent::ParticipantLeft { identity }).await;
    }

    async fn on_track_subscribed(&mut self, identity: String, track: Arc<dyn RtcTrack>) {
        if self.is_local(&identity) {
            return;
        }

        // Track events can outrun the participant join. Create the entry
        // implicitly so the media is never dropped on the floor.
        let mut implicit_join = false;
        if !self.state.remote_participants.contains_key(&identity) {
            if self.at_participant_capacity() {
                tracing::warn!(
                    "dropping track from '{}': at capacity ({})",
                    identity,
                    self.config.max_remote_participants
                );
                track.detach();
                return;
            }
            self.state.remote_participants.insert(
                identity.clone(),
                ParticipantState::new(identity.clone(), true),
            );
            implicit_join = true;
        }

        let handle = TrackHandle::new(Some(identity.clone()), track);
        let kind = handle.kind();
        tracing::debug!(
            "subscribed to {} track {} from '{}'",
            kind,
            handle.sid(),
            identity
        );

        let previous = self
            .state
            .remote_participants
            .get_mut(&identity)
            .and_then(|participant| participant.tracks.insert(kind, handle.clone()));
        if let Some(previous) = previous {
            // Republish of the same kind: last-subscribed wins.
            self.tracks.remove(previous.sid());
            previous.detach();
        }
        self.tracks.insert(handle.sid().to_string(), handle);

        self.publish_state();
        if implicit_join {
            self.emit(SessionEvent::ParticipantJoined {
                identity: identity.clone(),
            })
            .await;
        }
        self.emit(SessionEvent::TrackSubscribed { identity, kind })
            .await;
    }

    async fn on_track_unsubscribed(&mut self, identity: String, kind: TrackKind, sid: String) {
        let Some(participant) = self.state.remote_participants.get_mut(&identity) else {
            return;
        };
        // A stale unsubscribe for a track that was already replaced must not
        // tear down its successor.
        if !participant
            .tracks
            .get(&kind)
            .is_some_and(|handle| handle.sid() == sid)
        {
            return;
        }

        let handle = participant.tracks.remove(&kind);
        if let Some(handle) = handle {
            self.tracks.remove(handle.sid());
            handle.detach();
        }
        // The participant stays; presence does not require media.

        self.publish_state();
        self.emit(SessionEvent::TrackUnsubscribed { identity, kind })
            .await;
    }

    fn on_local_track_published(&mut self, kind: TrackKind) {
        // The publish step already records the track when it resolves; the
        // SDK echo is informational.
        if !self.state.local_tracks.contains_key(&kind) {
            tracing::debug!("local {} publish echo before publish resolution", kind);
        }
    }

    async fn on_local_track_unpublished(&mut self, kind: TrackKind) {
        let Some(local) = self.state.local_tracks.remove(&kind) else {
            return;
        };
        tracing::info!("local {} track unpublished", kind);
        self.tracks.remove(local.handle.sid());
        local.handle.detach();

        self.publish_state();
        self.emit(SessionEvent::LocalTrackUnpublished { kind }).await;
    }

    /// Unexpected transport drop: fatal, followed by automatic teardown
    async fn on_transport_dropped(&mut self, reason: String) {
        if self.state.phase != SessionPhase::Connected {
            return;
        }
        tracing::warn!("transport dropped: {}", reason);

        self.fail_session(ClientError::Connection(reason)).await;

        // Unlike a connect-phase failure, a mid-session drop leaves real
        // resources behind. Tear down to Idle, keeping last_error so the
        // presentation layer can offer a retry.
        self.set_phase(SessionPhase::Disconnecting).await;
        self.release_resources().await;
        self.set_phase(SessionPhase::Idle).await;
    }

    /// Apply the result of the asynchronous local publish step
    pub(super) async fn apply_publish_outcome(&mut self, attempt: u64, outcome: PublishOutcome) {
        if attempt != self.attempt || self.state.phase != SessionPhase::Connected {
            // The session moved on while publishing. Detach anything that
            // made it out.
            for (_, result) in outcome.results {
                if let Ok(track) = result {
                    track.detach();
                }
            }
            return;
        }
        self.publish_task = None;

        let mut published = Vec::new();
        let mut failures = Vec::new();
        for (kind, result) in outcome.results {
            match result {
                Ok(track) => {
                    let handle = TrackHandle::new(None, track);
                    self.tracks.insert(handle.sid().to_string(), handle.clone());
                    self.state.local_tracks.insert(
                        kind,
                        LocalTrackState {
                            kind,
                            enabled: true,
                            handle,
                        },
                    );
                    published.push(kind);
                }
                Err(error) => {
                    tracing::warn!("failed to publish local {} track: {}", kind, error);
                    failures.push(error);
                }
            }
        }

        if !published.is_empty() {
            self.publish_state();
        }
        for kind in published.iter().copied() {
            self.emit(SessionEvent::LocalTrackPublished { kind }).await;
        }
        for error in &failures {
            self.state.last_error = Some(error.clone());
            self.publish_state();
            self.emit(SessionEvent::SessionError {
                error: error.clone(),
                timestamp: Utc::now(),
            })
            .await;
        }

        // Partial failure keeps the session alive. Only a join that asked
        // for both kinds and obtained neither fails as a whole.
        let total_loss =
            outcome.requested_audio && outcome.requested_video && published.is_empty();
        if total_loss {
            let error = failures.into_iter().next().unwrap_or_else(|| {
                ClientError::Publish("no local track could be published".to_string())
            });
            self.fail_session(error).await;
            self.set_phase(SessionPhase::Disconnecting).await;
            self.release_resources().await;
            self.set_phase(SessionPhase::Idle).await;
        }
    }

    /// Toggle a local track's enabled flag
    ///
    /// Silently ignored when no such track exists; already-in-state toggles
    /// are absorbed without a snapshot or event.
    pub(super) async fn apply_track_toggle(&mut self, kind: TrackKind, enabled: bool) {
        if self.state.phase != SessionPhase::Connected {
            tracing::debug!("ignoring {} toggle in phase {}", kind, self.state.phase);
            return;
        }
        let Some(local) = self.state.local_tracks.get_mut(&kind) else {
            tracing::debug!("ignoring {} toggle: no local track", kind);
            return;
        };
        if local.enabled == enabled {
            return;
        }
        local.enabled = enabled;
        local.handle.set_enabled(enabled);
        tracing::info!(
            "local {} track {}",
            kind,
            if enabled { "enabled" } else { "disabled" }
        );

        self.publish_state();
        self.emit(SessionEvent::LocalTrackToggled { kind, enabled })
            .await;
    }

    /// Record a session-level failure and move to `Failed`
    pub(super) async fn fail_session(&mut self, error: ClientError) {
        self.state.last_error = Some(error.clone());
        self.set_phase(SessionPhase::Failed).await;
        self.emit(SessionEvent::SessionError {
            error,
            timestamp: Utc::now(),
        })
        .await;
    }

    /// Full teardown from any phase, ending at `Idle`
    pub(super) async fn shutdown(&mut self) {
        match self.state.phase {
            SessionPhase::Idle | SessionPhase::Disconnecting => return,
            _ => {}
        }
        self.set_phase(SessionPhase::Disconnecting).await;
        self.release_resources().await;
        self.set_phase(SessionPhase::Idle).await;
    }

    /// Release every resource of the current attempt
    ///
    /// Bumps the attempt generation first so in-flight resolutions and
    /// pumped events become stale. Retains `last_error`.
    pub(super) async fn release_resources(&mut self) {
        self.attempt = self.attempt.wrapping_add(1);
        self.pending_media = None;

        for task in [
            self.connect_task.take(),
            self.publish_task.take(),
            self.pump_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }

        for (_, participant) in self.state.remote_participants.drain() {
            for handle in participant.tracks.values() {
                handle.detach();
            }
        }
        for (_, local) in self.state.local_tracks.drain() {
            local.handle.detach();
        }
        self.tracks.clear();

        if let Some(session) = self.session.take() {
            session.close().await;
        }

        self.state.session_id = None;
        self.state.room_id = None;
        self.state.local_identity = None;
        self.publish_state();
    }

    /// Transition phases, publishing the snapshot and the change event
    pub(super) async fn set_phase(&mut self, phase: SessionPhase) {
        let previous = self.state.phase;
        if previous == phase {
            return;
        }
        tracing::info!("session phase: {} -> {}", previous, phase);
        self.state.phase = phase;
        self.publish_state();
        self.emit(SessionEvent::PhaseChanged {
            previous,
            phase,
            timestamp: Utc::now(),
        })
        .await;
    }

    /// Mirror the working state to watch subscribers
    pub(super) fn publish_state(&self) {
        let _ = self.state_tx.send(self.state.clone());
    }

    /// Fan one event out to broadcast subscribers and the handler
    pub(super) async fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event.clone());
        let handler = self.handler.read().await.clone();
        if let Some(handler) = handler {
            events::dispatch(handler.as_ref(), &event).await;
        }
    }

    fn is_local(&self, identity: &str) -> bool {
        self.state.local_identity.as_deref() == Some(identity)
    }

    fn at_participant_capacity(&self) -> bool {
        self.state.remote_participants.len() >= self.config.max_remote_participants
    }
}
