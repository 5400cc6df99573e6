//! Session credential client
//!
//! Before connecting, the coordinator exchanges an `{identity, room_id}` pair
//! for a `{server_url, token}` credential triple with the conferencing
//! backend. The exchange sits behind the [`CredentialClient`] trait so tests
//! and alternative backends can be injected; [`HttpCredentialClient`] is the
//! production implementation speaking the backend's JSON shape:
//!
//! ```text
//! POST {base}/join_stream
//! { "identity": "...", "room_id": "..." }
//!   -> { "connection_details": { "ws_url": "...", "token": "..." } }
//! ```
//!
//! All failures map to [`ClientError::Credential`]: transport errors,
//! non-2xx statuses (with status and body preserved for diagnostics), and
//! responses whose server URL does not parse.
//!
//! # Examples
//!
//! ```rust
//! use roomcast_client_core::credentials::CredentialRequest;
//!
//! let request = CredentialRequest::new("alice", "room1");
//! let json = serde_json::to_string(&request).unwrap();
//! assert!(json.contains("\"room_id\":\"room1\""));
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Request for session credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    /// Identity the session will be joined as
    pub identity: String,
    /// Room to join
    pub room_id: String,
}

impl CredentialRequest {
    /// Create a credential request
    pub fn new(identity: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            room_id: room_id.into(),
        }
    }
}

/// Credentials issued for one session
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    /// Real-time server to connect to
    pub server_url: Url,
    /// Access token scoped to the identity and room
    pub token: String,
}

/// Wire shape of the backend's connection details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDetails {
    /// Real-time server URL (typically a `wss://` endpoint)
    pub ws_url: String,
    /// Access token
    pub token: String,
}

/// Wire shape of the backend's join response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinStreamResponse {
    /// Connection details for the issued session
    pub connection_details: ConnectionDetails,
}

/// Issues session credentials for an identity/room pair
#[async_trait]
pub trait CredentialClient: Send + Sync {
    /// Exchange `request` for session credentials
    async fn issue(&self, request: &CredentialRequest) -> ClientResult<SessionCredentials>;
}

/// HTTP credential client speaking the backend's JSON API
#[derive(Debug, Clone)]
pub struct HttpCredentialClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpCredentialClient {
    /// Create a client against `base_url` (e.g. `http://localhost:8080/api`)
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Use a preconfigured `reqwest` client (proxies, timeouts, TLS setup)
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn endpoint(&self) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidArgument(format!(
                    "credential base URL cannot be a base: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("join_stream");
        Ok(url)
    }
}

#[async_trait]
impl CredentialClient for HttpCredentialClient {
    async fn issue(&self, request: &CredentialRequest) -> ClientResult<SessionCredentials> {
        let url = self.endpoint()?;
        tracing::debug!(
            "requesting credentials for identity '{}' in room '{}'",
            request.identity,
            request.room_id
        );

        let response = self
            .http
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Credential(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Credential(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(ClientError::Credential(format!(
                "backend returned {}: {}",
                status, body
            )));
        }

        let parsed: JoinStreamResponse = serde_json::from_str(&body).map_err(|e| {
            ClientError::Credential(format!("malformed credential response: {}", e))
        })?;

        let server_url = Url::parse(&parsed.connection_details.ws_url).map_err(|e| {
            ClientError::Credential(format!(
                "backend returned invalid server URL '{}': {}",
                parsed.connection_details.ws_url, e
            ))
        })?;

        Ok(SessionCredentials {
            server_url,
            token: parsed.connection_details.token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_matches_backend_wire_shape() {
        let request = CredentialRequest::new("alice", "room1");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"identity": "alice", "room_id": "room1"})
        );
    }

    #[test]
    fn response_parses_backend_wire_shape() {
        let body = r#"{
            "connection_details": {
                "ws_url": "wss://rtc.example.com",
                "token": "eyJhbGciOi"
            }
        }"#;
        let parsed: JoinStreamResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.connection_details.ws_url, "wss://rtc.example.com");
        assert_eq!(parsed.connection_details.token, "eyJhbGciOi");
    }

    #[test]
    fn endpoint_appends_join_stream_to_base_path() {
        let client = HttpCredentialClient::new(Url::parse("http://localhost:8080/api").unwrap());
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://localhost:8080/api/join_stream"
        );

        let trailing =
            HttpCredentialClient::new(Url::parse("http://localhost:8080/api/").unwrap());
        assert_eq!(
            trailing.endpoint().unwrap().as_str(),
            "http://localhost:8080/api/join_stream"
        );
    }
}
