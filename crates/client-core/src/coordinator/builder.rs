//! Fluent builder for session coordinators
//!
//! A coordinator needs its three external collaborators injected explicitly:
//! a credential client, a media source provider, and an SDK connector. The
//! builder validates that all three are present and spawns the coordinator's
//! event-processing task.
//!
//! # Examples
//!
//! ```rust,no_run
//! use roomcast_client_core::coordinator::SessionCoordinator;
//! use roomcast_client_core::credentials::HttpCredentialClient;
//! use std::time::Duration;
//! # use std::sync::Arc;
//! # use roomcast_client_core::media::MediaSourceProvider;
//! # use roomcast_client_core::rtc::RtcConnector;
//!
//! # async fn example(
//! #     provider: Arc<dyn MediaSourceProvider>,
//! #     connector: Arc<dyn RtcConnector>,
//! # ) -> roomcast_client_core::error::ClientResult<()> {
//! let credentials = HttpCredentialClient::new(
//!     "http://localhost:8080/api".parse().unwrap(),
//! );
//!
//! let coordinator = SessionCoordinator::builder()
//!     .credentials(Arc::new(credentials))
//!     .media_source(provider)
//!     .connector(connector)
//!     .connect_timeout(Duration::from_secs(10))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::coordinator::config::{ConnectOptions, CoordinatorConfig};
use crate::coordinator::SessionCoordinator;
use crate::credentials::CredentialClient;
use crate::error::{ClientError, ClientResult};
use crate::media::MediaSourceProvider;
use crate::rtc::RtcConnector;

/// Builder for [`SessionCoordinator`]
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
    credentials: Option<Arc<dyn CredentialClient>>,
    media: Option<Arc<dyn MediaSourceProvider>>,
    connector: Option<Arc<dyn RtcConnector>>,
}

impl CoordinatorBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
            credentials: None,
            media: None,
            connector: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the credential round-trip bound
    pub fn credential_timeout(mut self, timeout: Duration) -> Self {
        self.config.credential_timeout = timeout;
        self
    }

    /// Set the transport establishment bound
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the remote participant bound
    pub fn max_remote_participants(mut self, max: usize) -> Self {
        self.config.max_remote_participants = max;
        self
    }

    /// Set the SDK connect options
    pub fn connect_options(mut self, options: ConnectOptions) -> Self {
        self.config.connect_options = options;
        self
    }

    /// Inject the credential client
    pub fn credentials(mut self, credentials: Arc<dyn CredentialClient>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Inject the media source provider
    pub fn media_source(mut self, media: Arc<dyn MediaSourceProvider>) -> Self {
        self.media = Some(media);
        self
    }

    /// Inject the SDK connector
    pub fn connector(mut self, connector: Arc<dyn RtcConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Build the coordinator and spawn its event-processing task
    pub async fn build(self) -> ClientResult<Arc<SessionCoordinator>> {
        let credentials = self.credentials.ok_or_else(|| {
            ClientError::InvalidArgument("a credential client is required".to_string())
        })?;
        let media = self.media.ok_or_else(|| {
            ClientError::InvalidArgument("a media source provider is required".to_string())
        })?;
        let connector = self.connector.ok_or_else(|| {
            ClientError::InvalidArgument("an RTC connector is required".to_string())
        })?;

        Ok(SessionCoordinator::start(
            self.config,
            credentials,
            media,
            connector,
        ))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
