//! Coordinator configuration
//!
//! Plain configuration structs with chainable setters and sensible defaults.
//! The credential/connect bounds vary per deployment, so they are explicit
//! knobs here rather than implementation constants.
//!
//! # Examples
//!
//! ```rust
//! use roomcast_client_core::coordinator::{ConnectOptions, CoordinatorConfig};
//! use std::time::Duration;
//!
//! let config = CoordinatorConfig::default()
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_max_remote_participants(16)
//!     .with_connect_options(ConnectOptions::default().with_adaptive_stream(false));
//!
//! assert_eq!(config.connect_timeout, Duration::from_secs(5));
//! assert_eq!(config.max_remote_participants, 16);
//! assert!(!config.connect_options.adaptive_stream);
//! ```

use std::time::Duration;

/// Options forwarded to the SDK when establishing the transport
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Subscribe to remote tracks automatically as they are published
    pub auto_subscribe: bool,
    /// Let the SDK adapt received stream quality to the render size
    pub adaptive_stream: bool,
    /// Pause publishing simulcast layers no subscriber is consuming
    pub dynacast: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            auto_subscribe: true,
            adaptive_stream: true,
            dynacast: true,
        }
    }
}

impl ConnectOptions {
    /// Set automatic subscription to remote tracks
    pub fn with_auto_subscribe(mut self, auto_subscribe: bool) -> Self {
        self.auto_subscribe = auto_subscribe;
        self
    }

    /// Set adaptive stream quality
    pub fn with_adaptive_stream(mut self, adaptive_stream: bool) -> Self {
        self.adaptive_stream = adaptive_stream;
        self
    }

    /// Set dynacast
    pub fn with_dynacast(mut self, dynacast: bool) -> Self {
        self.dynacast = dynacast;
        self
    }
}

/// Configuration for a [`SessionCoordinator`](crate::coordinator::SessionCoordinator)
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Bound on the credential round trip. Expiry fails the attempt with a
    /// credential error.
    pub credential_timeout: Duration,
    /// Bound on transport establishment. Expiry fails the attempt with a
    /// connection error.
    pub connect_timeout: Duration,
    /// Capacity of the event broadcast channel. Slow subscribers past this
    /// lag see `RecvError::Lagged` rather than stalling the coordinator.
    pub event_buffer: usize,
    /// Upper bound on tracked remote participants. Joins past the bound are
    /// dropped with a warning.
    pub max_remote_participants: usize,
    /// Options forwarded to the SDK connect call
    pub connect_options: ConnectOptions,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            credential_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(15),
            event_buffer: 256,
            max_remote_participants: 64,
            connect_options: ConnectOptions::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the credential round-trip bound
    pub fn with_credential_timeout(mut self, timeout: Duration) -> Self {
        self.credential_timeout = timeout;
        self
    }

    /// Set the transport establishment bound
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the event broadcast capacity
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Set the remote participant bound
    pub fn with_max_remote_participants(mut self, max: usize) -> Self {
        self.max_remote_participants = max;
        self
    }

    /// Set the SDK connect options
    pub fn with_connect_options(mut self, options: ConnectOptions) -> Self {
        self.connect_options = options;
        self
    }
}
