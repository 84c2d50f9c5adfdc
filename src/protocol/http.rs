// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport for the C.MI REST API.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Error, ProtocolError, Result, TransportError};
use crate::field::DataSource;
use crate::protocol::{ApiResponse, Protocol};

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Connection parameters for one heater.
///
/// The configuration is immutable once handed to a client. It derives serde
/// so a host application can persist it.
///
/// # Examples
///
/// ```
/// use kospel_lib::field::DataSource;
/// use kospel_lib::protocol::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new("192.168.1.50")
///     .with_port(8080)
///     .with_credentials("admin", "secret")
///     .with_source(DataSource::Registers)
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.base_url(), "http://192.168.1.50:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    credentials: Option<Credentials>,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    source: DataSource,
    #[serde(default = "default_timeout")]
    timeout: Duration,
}

const fn default_port() -> u16 {
    ConnectionConfig::DEFAULT_PORT
}

const fn default_timeout() -> Duration {
    ConnectionConfig::DEFAULT_TIMEOUT
}

impl ConnectionConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for `host` with default settings.
    ///
    /// `host` may be a bare hostname or IP address, or a full base URL such
    /// as `http://heater.local:8080`.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            credentials: None,
            debug: false,
            source: DataSource::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets HTTP basic authentication credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Logs request and response payloads at debug level.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Selects the data source used for reads and writes.
    #[must_use]
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the credentials if set.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns whether payload logging is enabled.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Returns the data source.
    #[must_use]
    pub fn source(&self) -> DataSource {
        self.source
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyHost` for an empty host,
    /// `ConfigError::InvalidPort` for port 0 and `ConfigError::ZeroDuration`
    /// for a zero timeout.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("timeout"));
        }
        Ok(())
    }

    /// Builds the base URL from this configuration.
    ///
    /// A host that already carries a scheme is used as is.
    #[must_use]
    pub fn base_url(&self) -> String {
        let host = self.host.trim();
        if host.starts_with("http://") || host.starts_with("https://") {
            return host.trim_end_matches('/').to_string();
        }
        if self.port == Self::DEFAULT_PORT {
            format!("http://{host}")
        } else {
            format!("http://{host}:{}", self.port)
        }
    }

    /// Validates the configuration and creates an [`HttpClient`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if validation fails, or `Error::Transport` if
    /// the underlying HTTP client cannot be created.
    pub fn into_client(self) -> Result<HttpClient> {
        self.validate()?;
        let base_url = self.base_url();

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(TransportError::Http)?;

        Ok(HttpClient {
            base_url,
            client,
            credentials: self.credentials,
            debug: self.debug,
            timeout: self.timeout,
        })
    }
}

/// HTTP basic authentication credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// HttpClient
// ============================================================================

/// HTTP client for a C.MI module.
///
/// Each call is an independent request. The underlying `reqwest` client
/// keeps a connection pool which is released when the client is dropped.
///
/// # Examples
///
/// ```no_run
/// use kospel_lib::protocol::{ConnectionConfig, Protocol};
///
/// # async fn example() -> kospel_lib::Result<()> {
/// let client = ConnectionConfig::new("192.168.1.50").into_client()?;
/// let response = client.get("/api/dev").await?;
/// println!("{}", response.body());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
    credentials: Option<Credentials>,
    debug: bool,
    timeout: Duration,
}

impl HttpClient {
    /// Returns the base URL of the heater.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            let millis = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
            TransportError::Timeout(millis).into()
        } else if err.is_connect() {
            TransportError::Connect(err.to_string()).into()
        } else {
            TransportError::Http(err).into()
        }
    }

    async fn execute(&self, request: RequestBuilder, url: &str) -> Result<ApiResponse> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProtocolError::Unauthorized.into());
        }
        if !status.is_success() {
            return Err(ProtocolError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            }
            .into());
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if self.debug {
            tracing::debug!(url = %url, status = status.as_u16(), body = %body, "Received HTTP response");
        } else {
            tracing::trace!(url = %url, status = status.as_u16(), body = %body, "Received HTTP response");
        }

        Ok(ApiResponse::new(status.as_u16(), body))
    }
}

impl Protocol for HttpClient {
    async fn get(&self, path: &str) -> Result<ApiResponse> {
        let url = self.url(path);
        tracing::debug!(url = %url, "Sending HTTP GET");
        self.execute(self.client.get(&url), &url).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        let url = self.url(path);
        if self.debug {
            tracing::debug!(url = %url, body = %body, "Sending HTTP POST");
        } else {
            tracing::debug!(url = %url, "Sending HTTP POST");
        }
        self.execute(self.client.post(&url).json(body), &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = ConnectionConfig::new("192.168.1.50");
        assert_eq!(config.host(), "192.168.1.50");
        assert_eq!(config.port(), 80);
        assert!(config.credentials().is_none());
        assert!(!config.debug());
        assert_eq!(config.source(), DataSource::Ekd);
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn builder_chain() {
        let config = ConnectionConfig::new("heater.local")
            .with_port(8080)
            .with_credentials("admin", "password")
            .with_debug(true)
            .with_source(DataSource::Registers)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.port(), 8080);
        assert_eq!(config.credentials().unwrap().username, "admin");
        assert!(config.debug());
        assert_eq!(config.source(), DataSource::Registers);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn validation() {
        assert_eq!(
            ConnectionConfig::new("").validate(),
            Err(ConfigError::EmptyHost)
        );
        assert_eq!(
            ConnectionConfig::new("   ").validate(),
            Err(ConfigError::EmptyHost)
        );
        assert_eq!(
            ConnectionConfig::new("10.0.0.2").with_port(0).validate(),
            Err(ConfigError::InvalidPort(0))
        );
        assert_eq!(
            ConnectionConfig::new("10.0.0.2")
                .with_timeout(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroDuration("timeout"))
        );
        assert!(ConnectionConfig::new("10.0.0.2").validate().is_ok());
    }

    #[test]
    fn into_client_rejects_invalid_config() {
        let err = ConnectionConfig::new("").into_client().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::EmptyHost)));
    }

    #[test]
    fn base_url() {
        assert_eq!(
            ConnectionConfig::new("192.168.1.50").base_url(),
            "http://192.168.1.50"
        );
        assert_eq!(
            ConnectionConfig::new("192.168.1.50")
                .with_port(8080)
                .base_url(),
            "http://192.168.1.50:8080"
        );
        assert_eq!(
            ConnectionConfig::new("http://127.0.0.1:4321/").base_url(),
            "http://127.0.0.1:4321"
        );
    }

    #[test]
    fn credentials_debug_hides_password() {
        let config = ConnectionConfig::new("h").with_credentials("admin", "hunter2");
        let debug = format!("{config:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"host": "192.168.1.50"}"#).unwrap();
        assert_eq!(config, ConnectionConfig::new("192.168.1.50"));

        let config: ConnectionConfig =
            serde_json::from_str(r#"{"host": "h", "port": 8080, "source": "registers"}"#)
                .unwrap();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.source(), DataSource::Registers);
    }

    #[test]
    fn into_client_keeps_base_url() {
        let client = ConnectionConfig::new("192.168.1.50")
            .with_credentials("user", "pass")
            .into_client()
            .unwrap();
        assert_eq!(client.base_url(), "http://192.168.1.50");
        assert!(client.credentials.is_some());
    }
}
