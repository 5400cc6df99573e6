//! # roomcast-client-core
//!
//! Session coordination layer for real-time conferencing frontends.
//!
//! This crate sits between a presentation layer (UI, tooling, a headless
//! recorder) and the moving parts of joining a conference: the credential
//! backend, the real-time media SDK, and local media capture. It owns one
//! session end to end and exposes a small, UI-agnostic surface:
//!
//! - **Join/leave lifecycle** with a strict phase machine
//!   (`Idle → Connecting → Connected → Disconnecting → Idle`, with `Failed`
//!   on errors) and guaranteed cleanup on every exit path
//! - **Credential exchange** against the backend's JSON API
//! - **Local media** acquisition and publication, with per-track
//!   enable/disable toggles
//! - **Remote participant and track bookkeeping**, mirrored from the SDK's
//!   event stream into consistent snapshots
//! - **State and event distribution** through watch snapshots, a broadcast
//!   stream, and an optional async handler
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │              Presentation layer            │
//! └──────────────────────┬─────────────────────┘
//!                        │ join / leave / toggles
//!                        ▼
//! ┌────────────────────────────────────────────┐
//! │             SessionCoordinator             │
//! │   (one actor task owns all session state)  │
//! └───────┬───────────────┬────────────────┬───┘
//!         │               │                │
//!         ▼               ▼                ▼
//!   CredentialClient  RtcConnector  MediaSourceProvider
//!    (HTTP backend)    (media SDK)   (capture / file)
//! ```
//!
//! All three collaborators are trait objects injected through the builder,
//! so the whole lifecycle is testable without a backend or an SDK.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use roomcast_client_core::coordinator::SessionCoordinator;
//! use roomcast_client_core::credentials::HttpCredentialClient;
//! use roomcast_client_core::media::LocalMediaRequest;
//! # use std::sync::Arc;
//! # use roomcast_client_core::media::MediaSourceProvider;
//! # use roomcast_client_core::rtc::RtcConnector;
//!
//! # async fn example(
//! #     provider: Arc<dyn MediaSourceProvider>,
//! #     connector: Arc<dyn RtcConnector>,
//! # ) -> roomcast_client_core::error::ClientResult<()> {
//! let coordinator = SessionCoordinator::builder()
//!     .credentials(Arc::new(HttpCredentialClient::new(
//!         "http://localhost:8080/api".parse().unwrap(),
//!     )))
//!     .media_source(provider)
//!     .connector(connector)
//!     .build()
//!     .await?;
//!
//! let mut states = coordinator
//!     .join("alice", "daily-standup", LocalMediaRequest::audio_and_video())
//!     .await?;
//!
//! // React to state snapshots as the session progresses.
//! while states.changed().await.is_ok() {
//!     let state = states.borrow().clone();
//!     println!("{}: {} remote participants", state.phase, state.remote_count());
//! }
//!
//! coordinator.leave_and_wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod events;
pub mod media;
pub mod rtc;
pub mod session;

pub use coordinator::{ConnectOptions, CoordinatorBuilder, CoordinatorConfig, SessionCoordinator};
pub use credentials::{CredentialClient, CredentialRequest, HttpCredentialClient, SessionCredentials};
pub use error::{ClientError, ClientResult};
pub use events::{SessionEvent, SessionEventHandler};
pub use media::{LocalMediaRequest, MediaSource, MediaSourceProvider};
pub use rtc::{RtcConnector, RtcEvent, RtcSession, RtcTrack};
pub use session::{
    ParticipantState, SessionPhase, SessionState, TrackHandle, TrackKind, TrackSid,
};
