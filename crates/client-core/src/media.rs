//! Media source abstraction
//!
//! The coordinator never talks to capture devices or decoders itself. A
//! [`MediaSourceProvider`] is injected at construction and asked for local
//! tracks when a join requests them. Providers may back tracks with a real
//! capture device or with a decoded media file (the synthetic-capture path
//! used for broadcasting a pre-recorded clip).
//!
//! Failure to acquire a requested track is not fatal to the join on its own;
//! the coordinator applies its partial-publish policy instead.
//!
//! # Examples
//!
//! ```rust
//! use roomcast_client_core::media::{LocalMediaRequest, MediaSource};
//!
//! let request = LocalMediaRequest::audio_and_video();
//! assert!(request.wants_any());
//!
//! let from_file = LocalMediaRequest::audio_and_video()
//!     .with_source(MediaSource::File("clip.mp4".into()));
//! assert_ne!(from_file.source, MediaSource::Capture);
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::session::TrackKind;

/// Where local media should come from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MediaSource {
    /// Live capture devices (microphone, camera)
    #[default]
    Capture,
    /// File-backed synthetic capture: the provider decodes the file and
    /// exposes its streams as local tracks
    File(PathBuf),
}

/// What local media a join should publish
#[derive(Debug, Clone, Default)]
pub struct LocalMediaRequest {
    /// Publish a local audio track
    pub audio: bool,
    /// Publish a local video track
    pub video: bool,
    /// Source to acquire the tracks from
    pub source: MediaSource,
}

impl LocalMediaRequest {
    /// Request no local media (viewer-only join)
    pub fn none() -> Self {
        Self::default()
    }

    /// Request both audio and video from capture devices
    pub fn audio_and_video() -> Self {
        Self {
            audio: true,
            video: true,
            source: MediaSource::Capture,
        }
    }

    /// Request audio only
    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: false,
            source: MediaSource::Capture,
        }
    }

    /// Replace the media source
    pub fn with_source(mut self, source: MediaSource) -> Self {
        self.source = source;
        self
    }

    /// Whether any track was requested at all
    pub fn wants_any(&self) -> bool {
        self.audio || self.video
    }
}

/// A local media track produced by a provider, not yet tied to a session
pub trait MediaTrack: Send + Sync {
    /// Kind of the track
    fn kind(&self) -> TrackKind;
}

/// Tracks returned from an acquisition
///
/// Either slot may be `None` when the corresponding kind was not requested
/// or could not be acquired.
#[derive(Default)]
pub struct LocalTracks {
    /// Acquired audio track, if any
    pub audio: Option<Arc<dyn MediaTrack>>,
    /// Acquired video track, if any
    pub video: Option<Arc<dyn MediaTrack>>,
}

/// Supplier of local media tracks, independent of any session
#[async_trait]
pub trait MediaSourceProvider: Send + Sync {
    /// Acquire the local tracks described by `request`
    ///
    /// Implementations should return whatever subset they managed to acquire
    /// rather than failing the whole call when one kind is unavailable; an
    /// `Err` is reserved for faults that make the source unusable outright.
    async fn acquire_local_tracks(&self, request: &LocalMediaRequest) -> ClientResult<LocalTracks>;
}
