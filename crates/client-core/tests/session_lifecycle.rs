//! End-to-end session lifecycle through the public API
//!
//! Exercises the crate exactly as an embedding frontend would: build a
//! coordinator from injected collaborators, join, watch state snapshots,
//! react to remote activity, and leave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_test::assert_ok;
use tokio::sync::{mpsc, watch};
use url::Url;

use roomcast_client_core::{
    ClientError, ClientResult, ConnectOptions, CredentialClient, CredentialRequest,
    LocalMediaRequest, MediaSourceProvider, RtcConnector, RtcEvent, RtcSession, RtcTrack,
    SessionCoordinator, SessionCredentials, SessionPhase, SessionState, TrackKind, TrackSid,
};
use roomcast_client_core::media::{LocalTracks, MediaTrack};
use roomcast_client_core::rtc::RtcConnection;

struct StaticCredentials;

#[async_trait]
impl CredentialClient for StaticCredentials {
    async fn issue(&self, request: &CredentialRequest) -> ClientResult<SessionCredentials> {
        assert!(!request.identity.is_empty());
        Ok(SessionCredentials {
            server_url: Url::parse("wss://rtc.example.com").unwrap(),
            token: format!("token-{}-{}", request.identity, request.room_id),
        })
    }
}

struct FakeTrack {
    sid: TrackSid,
    kind: TrackKind,
    detached: AtomicBool,
}

impl FakeTrack {
    fn new(sid: impl Into<String>, kind: TrackKind) -> Arc<Self> {
        Arc::new(Self {
            sid: sid.into(),
            kind,
            detached: AtomicBool::new(false),
        })
    }
}

impl RtcTrack for FakeTrack {
    fn sid(&self) -> TrackSid {
        self.sid.clone()
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn set_enabled(&self, _enabled: bool) {}

    fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

struct FakeCapture {
    kind: TrackKind,
}

impl MediaTrack for FakeCapture {
    fn kind(&self) -> TrackKind {
        self.kind
    }
}

struct CaptureProvider;

#[async_trait]
impl MediaSourceProvider for CaptureProvider {
    async fn acquire_local_tracks(&self, request: &LocalMediaRequest) -> ClientResult<LocalTracks> {
        let track = |kind| Arc::new(FakeCapture { kind }) as Arc<dyn MediaTrack>;
        Ok(LocalTracks {
            audio: request.audio.then(|| track(TrackKind::Audio)),
            video: request.video.then(|| track(TrackKind::Video)),
        })
    }
}

#[derive(Default)]
struct FakeSession {
    closed: AtomicBool,
}

#[async_trait]
impl RtcSession for FakeSession {
    async fn publish_track(&self, track: Arc<dyn MediaTrack>) -> ClientResult<Arc<dyn RtcTrack>> {
        let kind = track.kind();
        Ok(FakeTrack::new(format!("local-{}", kind), kind))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeConnector {
    session: Arc<FakeSession>,
    events: Mutex<Option<mpsc::UnboundedSender<RtcEvent>>>,
}

impl FakeConnector {
    fn new(session: Arc<FakeSession>) -> Self {
        Self {
            session,
            events: Mutex::new(None),
        }
    }

    fn send(&self, event: RtcEvent) {
        self.events
            .lock()
            .unwrap()
            .as_ref()
            .expect("not connected")
            .send(event)
            .expect("event pump stopped");
    }
}

#[async_trait]
impl RtcConnector for FakeConnector {
    async fn connect(
        &self,
        server_url: &Url,
        token: &str,
        options: &ConnectOptions,
    ) -> ClientResult<RtcConnection> {
        assert_eq!(server_url.scheme(), "wss");
        assert!(token.starts_with("token-"));
        assert!(options.auto_subscribe);

        let (tx, rx) = mpsc::unbounded_channel();
        // Occupants already in the room are synthesized as joins.
        tx.send(RtcEvent::ParticipantConnected {
            identity: "host".to_string(),
            can_publish: true,
        })
        .unwrap();
        *self.events.lock().unwrap() = Some(tx);
        Ok(RtcConnection {
            session: self.session.clone(),
            events: rx,
        })
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn wait_until<F>(rx: &mut watch::Receiver<SessionState>, mut predicate: F) -> SessionState
where
    F: FnMut(&SessionState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if predicate(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .expect("timed out waiting for state")
}

#[tokio::test]
async fn full_session_lifecycle() {
    init_tracing();
    let session = Arc::new(FakeSession::default());
    let connector = Arc::new(FakeConnector::new(session.clone()));

    let coordinator = SessionCoordinator::builder()
        .credentials(Arc::new(StaticCredentials))
        .media_source(Arc::new(CaptureProvider))
        .connector(connector.clone())
        .connect_timeout(Duration::from_millis(500))
        .build()
        .await
        .unwrap();

    let mut states = coordinator
        .join("alice", "demo", LocalMediaRequest::audio_and_video())
        .await
        .unwrap();

    // Connected with both local tracks and the pre-existing occupant.
    let state = wait_until(&mut states, |s| {
        s.phase == SessionPhase::Connected && s.local_tracks.len() == 2 && s.remote_count() == 1
    })
    .await;
    assert!(state.remote_participants.contains_key("host"));
    assert!(state.is_local_track_enabled(TrackKind::Audio));

    // A second participant publishes video; muting our audio leaves their
    // media and our video untouched.
    let remote = FakeTrack::new("TR_bob_v", TrackKind::Video);
    connector.send(RtcEvent::ParticipantConnected {
        identity: "bob".to_string(),
        can_publish: true,
    });
    connector.send(RtcEvent::TrackSubscribed {
        identity: "bob".to_string(),
        track: remote.clone(),
    });
    wait_until(&mut states, |s| {
        s.remote_participants
            .get("bob")
            .is_some_and(|p| p.track(TrackKind::Video).is_some())
    })
    .await;

    coordinator.set_local_audio_enabled(false);
    let state = wait_until(&mut states, |s| !s.is_local_track_enabled(TrackKind::Audio)).await;
    assert!(state.is_local_track_enabled(TrackKind::Video));

    // Leaving returns to Idle and releases everything.
    assert_ok!(coordinator.leave_and_wait().await);
    let state = coordinator.state();
    assert_eq!(state.phase, SessionPhase::Idle);
    assert!(state.remote_participants.is_empty());
    assert!(state.local_tracks.is_empty());
    assert!(state.session_id.is_none());
    assert!(session.closed.load(Ordering::SeqCst));
    assert!(remote.detached.load(Ordering::SeqCst));
    assert!(coordinator.find_track("TR_bob_v").is_none());
}

#[tokio::test]
async fn failed_join_can_be_retried() {
    init_tracing();

    struct FlakyCredentials {
        attempts: Mutex<u32>,
    }

    #[async_trait]
    impl CredentialClient for FlakyCredentials {
        async fn issue(&self, request: &CredentialRequest) -> ClientResult<SessionCredentials> {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            if *attempts == 1 {
                return Err(ClientError::Credential("backend returned 503".to_string()));
            }
            Ok(SessionCredentials {
                server_url: Url::parse("wss://rtc.example.com").unwrap(),
                token: format!("token-{}-{}", request.identity, request.room_id),
            })
        }
    }

    let session = Arc::new(FakeSession::default());
    let coordinator = SessionCoordinator::builder()
        .credentials(Arc::new(FlakyCredentials {
            attempts: Mutex::new(0),
        }))
        .media_source(Arc::new(CaptureProvider))
        .connector(Arc::new(FakeConnector::new(session)))
        .build()
        .await
        .unwrap();

    let mut states = coordinator
        .join("alice", "demo", LocalMediaRequest::none())
        .await
        .unwrap();
    let state = wait_until(&mut states, |s| s.phase == SessionPhase::Failed).await;
    assert!(matches!(state.last_error, Some(ClientError::Credential(_))));

    let mut states = coordinator
        .join("alice", "demo", LocalMediaRequest::none())
        .await
        .unwrap();
    let state = wait_until(&mut states, |s| s.phase == SessionPhase::Connected).await;
    assert!(state.last_error.is_none());
}
