// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device client for the C.MI REST API.
//!
//! [`DeviceClient`] knows the heater's endpoints and turns raw payloads into
//! [`StatusSnapshot`]s. It holds no session state: the device identifier is
//! passed to every call, and caching it is left to the caller (usually the
//! [`Coordinator`](crate::Coordinator)).
//!
//! # Examples
//!
//! ```no_run
//! use kospel_lib::DeviceClient;
//! use kospel_lib::protocol::ConnectionConfig;
//!
//! # async fn example() -> kospel_lib::Result<()> {
//! let client = DeviceClient::http(&ConnectionConfig::new("192.168.1.50"))?;
//!
//! let device = client.discover_device().await?;
//! let snapshot = client.poll(&device).await?;
//! println!("room: {:?} °C", snapshot.current_temperature());
//! # Ok(())
//! # }
//! ```

use serde_json::Value;

use crate::discovery::DiscoveryResult;
use crate::error::{DiscoveryError, Error, ProtocolError, Result, ValidationError};
use crate::field::{self, DataSource, Field, FieldValue, RawPayload};
use crate::protocol::{ConnectionConfig, HttpClient, Protocol};
use crate::state::StatusSnapshot;
use crate::types::DeviceId;

/// Device discovery endpoint.
pub const DISCOVERY_PATH: &str = "/api/dev";
/// Register read and write endpoint prefix.
pub const REGISTER_PATH: &str = "/api/dev";
/// EKD read endpoint prefix.
pub const EKD_READ_PATH: &str = "/api/ekd/read";
/// EKD write endpoint prefix.
pub const EKD_WRITE_PATH: &str = "/api/ekd/write";

/// Client for one C.MI module.
///
/// Generic over the transport so tests can substitute a scripted
/// [`Protocol`].
#[derive(Debug, Clone)]
pub struct DeviceClient<P = HttpClient> {
    protocol: P,
    source: DataSource,
    debug: bool,
}

impl DeviceClient<HttpClient> {
    /// Creates an HTTP client from a connection configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn http(config: &ConnectionConfig) -> Result<Self> {
        let protocol = config.clone().into_client()?;
        Ok(Self::new(protocol, config.source()).with_debug(config.debug()))
    }
}

impl<P: Protocol> DeviceClient<P> {
    /// Creates a client over an existing transport.
    #[must_use]
    pub fn new(protocol: P, source: DataSource) -> Self {
        Self {
            protocol,
            source,
            debug: false,
        }
    }

    /// Logs decoded snapshots at debug level.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Returns the data source used for reads and writes.
    #[must_use]
    pub fn source(&self) -> DataSource {
        self.source
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Queries the discovery endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Error::Discovery` when the endpoint is unreachable, answers
    /// with an error status or an unusable body, or lists no device.
    pub async fn discover(&self) -> Result<DiscoveryResult> {
        let response = self
            .protocol
            .get(DISCOVERY_PATH)
            .await
            .map_err(into_discovery_error)?;
        let result = DiscoveryResult::parse(response.body())?;
        tracing::debug!(
            devices = result.devices().len(),
            serial = result.serial().unwrap_or("-"),
            "Discovery response parsed"
        );
        Ok(result)
    }

    /// Returns the first device identifier listed by the heater.
    ///
    /// # Errors
    ///
    /// See [`DeviceClient::discover`].
    pub async fn discover_device(&self) -> Result<DeviceId> {
        self.discover()
            .await?
            .into_devices()
            .into_iter()
            .next()
            .ok_or(Error::Discovery(DiscoveryError::NoDevices))
    }

    /// Returns every device identifier listed by the heater.
    ///
    /// # Errors
    ///
    /// See [`DeviceClient::discover`].
    pub async fn available_devices(&self) -> Result<Vec<DeviceId>> {
        Ok(self.discover().await?.into_devices())
    }

    /// Reads the raw key/value payload of `device`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on network failure or timeout and
    /// `Error::Protocol` on a non-success status or a body that is not a
    /// JSON object.
    pub async fn fetch_raw(&self, device: &DeviceId) -> Result<RawPayload> {
        let path = read_path(self.source, device);
        let response = self.protocol.get(&path).await?;
        let raw = RawPayload::from_json(response.json()?)?;
        tracing::trace!(device_id = %device, keys = raw.len(), "Fetched raw payload");
        Ok(raw)
    }

    /// Decodes a raw payload with the configured data source.
    ///
    /// Fields missing from `raw` or holding undecodable values are omitted.
    #[must_use]
    pub fn decode(&self, raw: &RawPayload) -> StatusSnapshot {
        StatusSnapshot::from_raw(raw, self.source)
    }

    /// Fetches and decodes one snapshot of `device`.
    ///
    /// # Errors
    ///
    /// See [`DeviceClient::fetch_raw`].
    pub async fn poll(&self, device: &DeviceId) -> Result<StatusSnapshot> {
        let raw = self.fetch_raw(device).await?;
        let snapshot = self.decode(&raw);
        if self.debug {
            tracing::debug!(
                device_id = %device,
                fields = snapshot.len(),
                raw_keys = raw.len(),
                "Decoded status snapshot"
            );
        }
        Ok(snapshot)
    }

    /// Encodes `value` for a write to `field` without sending it.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the field is read-only, not exposed by
    /// the configured source, or the value is out of range.
    pub fn encode(
        &self,
        field: Field,
        value: &FieldValue,
    ) -> std::result::Result<(&'static str, Value), ValidationError> {
        field::encode(field.descriptor(), self.source, value)
    }

    /// Writes `value` to `field` on `device`.
    ///
    /// The value is validated and encoded before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for rejected values, `Error::Transport` or
    /// `Error::Protocol` if the request fails, and
    /// `ProtocolError::Rejected` if the device acknowledges with a non-zero
    /// status.
    pub async fn write(&self, device: &DeviceId, field: Field, value: FieldValue) -> Result<()> {
        let (key, encoded) = self.encode(field, &value)?;
        let mut body = serde_json::Map::new();
        body.insert(key.to_string(), encoded);
        let body = Value::Object(body);
        let path = write_path(self.source, device);

        tracing::debug!(device_id = %device, field = %field, value = %value, "Writing field");

        let response = self.protocol.post_json(&path, &body).await?;
        check_ack(response.body())?;
        Ok(())
    }

    /// Releases the transport and its connection pool.
    pub fn close(self) {
        tracing::debug!(source = self.source.as_str(), "Closing device client");
        drop(self.protocol);
    }
}

fn read_path(source: DataSource, device: &DeviceId) -> String {
    match source {
        DataSource::Ekd => format!("{EKD_READ_PATH}/{}", device.url_segment()),
        DataSource::Registers => format!("{REGISTER_PATH}/{}", device.url_segment()),
    }
}

fn write_path(source: DataSource, device: &DeviceId) -> String {
    match source {
        DataSource::Ekd => format!("{EKD_WRITE_PATH}/{}", device.url_segment()),
        DataSource::Registers => format!("{REGISTER_PATH}/{}", device.url_segment()),
    }
}

fn into_discovery_error(err: Error) -> Error {
    match err {
        Error::Transport(e) => DiscoveryError::Unreachable(e).into(),
        Error::Protocol(e) => DiscoveryError::Malformed(e).into(),
        other => other,
    }
}

/// Checks an optional `{"status": "0"}` acknowledgment.
fn check_ack(body: &str) -> std::result::Result<(), ProtocolError> {
    if body.trim().is_empty() {
        return Ok(());
    }
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        tracing::debug!(body = %body, "Write acknowledged without JSON body");
        return Ok(());
    };
    match map.get("status") {
        None => Ok(()),
        Some(Value::String(s)) if s.trim() == "0" => Ok(()),
        Some(Value::Number(n)) if n.as_i64() == Some(0) => Ok(()),
        Some(Value::String(s)) => Err(ProtocolError::Rejected(s.clone())),
        Some(other) => Err(ProtocolError::Rejected(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::TransportError;
    use crate::protocol::ApiResponse;
    use crate::types::OperatingMode;

    /// Transport answering from a fixed route table and recording requests.
    #[derive(Default)]
    struct FakeTransport {
        routes: Vec<(&'static str, u16, &'static str)>,
        posts: Mutex<Vec<(String, Value)>>,
    }

    impl FakeTransport {
        fn route(mut self, path: &'static str, status: u16, body: &'static str) -> Self {
            self.routes.push((path, status, body));
            self
        }

        fn respond(&self, path: &str) -> Result<ApiResponse> {
            match self.routes.iter().find(|(p, _, _)| *p == path) {
                Some((_, 200, body)) => Ok(ApiResponse::new(200, *body)),
                Some((_, code, _)) => Err(ProtocolError::Status {
                    code: *code,
                    reason: "Error".to_string(),
                }
                .into()),
                None => Err(TransportError::Connect(format!("no route to {path}")).into()),
            }
        }
    }

    impl Protocol for FakeTransport {
        async fn get(&self, path: &str) -> Result<ApiResponse> {
            self.respond(path)
        }

        async fn post_json(&self, path: &str, body: &Value) -> Result<ApiResponse> {
            self.posts
                .lock()
                .unwrap()
                .push((path.to_string(), body.clone()));
            self.respond(path)
        }
    }

    fn client(transport: FakeTransport, source: DataSource) -> DeviceClient<FakeTransport> {
        DeviceClient::new(transport, source)
    }

    #[tokio::test]
    async fn discover_device_returns_first_id() {
        let transport = FakeTransport::default().route("/api/dev", 200, r#"{"devs":["65","66"]}"#);
        let client = client(transport, DataSource::Ekd);
        assert_eq!(client.discover_device().await.unwrap().as_str(), "65");
        assert_eq!(client.available_devices().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn discovery_errors_are_classified() {
        let unreachable = client(FakeTransport::default(), DataSource::Ekd);
        let err = unreachable.discover_device().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Discovery(DiscoveryError::Unreachable(_))
        ));
        assert!(err.is_transport());

        let failing = client(
            FakeTransport::default().route("/api/dev", 500, ""),
            DataSource::Ekd,
        );
        assert!(matches!(
            failing.discover_device().await,
            Err(Error::Discovery(DiscoveryError::Malformed(_)))
        ));

        let empty = client(
            FakeTransport::default().route("/api/dev", 200, r#"{"devs":[]}"#),
            DataSource::Ekd,
        );
        assert!(matches!(
            empty.discover_device().await,
            Err(Error::Discovery(DiscoveryError::NoDevices))
        ));
    }

    #[tokio::test]
    async fn poll_reads_register_endpoint() {
        let transport = FakeTransport::default()
            .route("/api/dev/65", 200, r#"{"0c1c":"4a01","0b30":"0100"}"#);
        let client = client(transport, DataSource::Registers);
        let snapshot = client.poll(&DeviceId::new("65")).await.unwrap();
        assert_eq!(snapshot.current_temperature(), Some(33.0));
        assert_eq!(snapshot.heater_running(), Some(false));
    }

    #[tokio::test]
    async fn poll_reads_ekd_endpoint() {
        let transport = FakeTransport::default()
            .route("/api/ekd/read/65", 200, r#"{"regs":{"TEMP_ROOM":215,"MODE":3}}"#);
        let client = client(transport, DataSource::Ekd);
        let snapshot = client.poll(&DeviceId::new("65")).await.unwrap();
        assert_eq!(snapshot.current_temperature(), Some(21.5));
        assert_eq!(snapshot.mode(), Some(OperatingMode::Eco));
    }

    #[tokio::test]
    async fn non_object_payload_is_a_protocol_error() {
        let transport = FakeTransport::default().route("/api/ekd/read/65", 200, "[1,2]");
        let client = client(transport, DataSource::Ekd);
        assert!(matches!(
            client.fetch_raw(&DeviceId::new("65")).await,
            Err(Error::Protocol(ProtocolError::InvalidBody(_)))
        ));
    }

    #[tokio::test]
    async fn write_posts_single_key_body() {
        let transport =
            FakeTransport::default().route("/api/ekd/write/65", 200, r#"{"status":"0"}"#);
        let client = client(transport, DataSource::Ekd);
        client
            .write(
                &DeviceId::new("65"),
                Field::TargetTemperature,
                FieldValue::Temperature(21.5),
            )
            .await
            .unwrap();

        let posts = client.protocol().posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "/api/ekd/write/65");
        assert_eq!(posts[0].1, serde_json::json!({"ROOM_TEMP_SETTING": 215}));
    }

    #[tokio::test]
    async fn invalid_write_sends_nothing() {
        let transport = FakeTransport::default().route("/api/ekd/write/65", 200, "");
        let client = client(transport, DataSource::Ekd);
        let err = client
            .write(
                &DeviceId::new("65"),
                Field::TargetTemperature,
                FieldValue::Temperature(40.0),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::OutOfRange { .. })
        ));
        assert!(client.protocol().posts.lock().unwrap().is_empty());
    }

    #[test]
    fn ack_handling() {
        assert!(check_ack("").is_ok());
        assert!(check_ack(r#"{"status":"0"}"#).is_ok());
        assert!(check_ack(r#"{"status":0}"#).is_ok());
        assert!(check_ack(r#"{"result":"ok"}"#).is_ok());
        assert!(check_ack("OK").is_ok());
        assert!(matches!(
            check_ack(r#"{"status":"3"}"#),
            Err(ProtocolError::Rejected(s)) if s == "3"
        ));
        assert!(matches!(
            check_ack(r#"{"status":1}"#),
            Err(ProtocolError::Rejected(s)) if s == "1"
        ));
    }

    #[test]
    fn paths_encode_device_id() {
        let device = DeviceId::new("a b");
        assert_eq!(read_path(DataSource::Ekd, &device), "/api/ekd/read/a%20b");
        assert_eq!(read_path(DataSource::Registers, &device), "/api/dev/a%20b");
        assert_eq!(write_path(DataSource::Ekd, &device), "/api/ekd/write/a%20b");
    }
}
