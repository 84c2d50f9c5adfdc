// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Kospel library.
//!
//! This module provides the error hierarchy for the library: configuration
//! checks, device discovery, transport failures, protocol violations and
//! control-write validation.
//!
//! Decoding a single field never produces an error. A raw value that cannot
//! be decoded simply leaves that field out of the snapshot.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No device identifier could be obtained from the heater.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// The network request failed or timed out.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The heater answered with an error status or an unusable body.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A control write was rejected before being sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The coordinator has been shut down.
    #[error("coordinator is shut down")]
    ShutDown,
}

impl Error {
    /// Returns `true` if this error came from the network layer
    /// (unreachable host, refused connection, timeout).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Discovery(DiscoveryError::Unreachable(_))
        )
    }
}

/// Errors related to the connection configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The host is empty or whitespace.
    #[error("host must not be empty")]
    EmptyHost,

    /// The port is outside `1..=65535`.
    #[error("port {0} is out of range [1, 65535]")]
    InvalidPort(u16),

    /// A timing parameter is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// A count parameter is zero.
    #[error("{0} must be at least 1")]
    ZeroCount(&'static str),

    /// The backoff multiplier is below 1 or not finite.
    #[error("backoff multiplier must be a finite number >= 1")]
    BackoffMultiplier,
}

/// Errors raised while discovering the heater's device identifier.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The discovery endpoint could not be reached.
    #[error("discovery endpoint unreachable: {0}")]
    Unreachable(#[source] TransportError),

    /// The discovery endpoint answered with an unusable response.
    #[error("malformed discovery response: {0}")]
    Malformed(#[source] ProtocolError),

    /// The response was well formed but listed no device.
    #[error("no device identifier in discovery response")]
    NoDevices,
}

/// Errors related to the network transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed below the protocol level.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The TCP connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
}

/// Errors related to the HTTP protocol exchange with the C.MI module.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The device answered with a non-success status code.
    #[error("HTTP {code} - {reason}")]
    Status {
        /// The numeric status code.
        code: u16,
        /// The canonical reason phrase.
        reason: String,
    },

    /// Authentication failed.
    #[error("authentication failed")]
    Unauthorized,

    /// The response body is not the JSON shape expected.
    #[error("invalid response body: {0}")]
    InvalidBody(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The device refused a write.
    #[error("device rejected the request with status {0}")]
    Rejected(String),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors raised when validating a control write.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A numeric value is outside the allowed range.
    #[error("{field} value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// The field being written.
        field: &'static str,
        /// Minimum allowed value.
        min: f32,
        /// Maximum allowed value.
        max: f32,
        /// The actual value that was provided.
        actual: f32,
    },

    /// The value is NaN or infinite.
    #[error("{0} value is not a finite number")]
    NotANumber(&'static str),

    /// The field cannot be written.
    #[error("{0} is read-only")]
    ReadOnly(&'static str),

    /// The field has no key in the configured data source.
    #[error("{field} is not exposed by the {api} API")]
    NotAvailable {
        /// The field being written.
        field: &'static str,
        /// The configured data source.
        api: &'static str,
    },

    /// The mode has no known device code.
    #[error("operating mode {0} cannot be written")]
    UnsupportedMode(String),

    /// The value kind does not match the field.
    #[error("{field} expects a {expected} value")]
    WrongKind {
        /// The field being written.
        field: &'static str,
        /// The kind the field accepts.
        expected: &'static str,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ValidationError::OutOfRange {
            field: "target_temperature",
            min: 5.0,
            max: 35.0,
            actual: 35.1,
        };
        assert_eq!(
            err.to_string(),
            "target_temperature value 35.1 is out of range [5, 35]"
        );
    }

    #[test]
    fn error_from_validation_error() {
        let err: Error = ValidationError::ReadOnly("power").into();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::ReadOnly("power"))
        ));
    }

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::InvalidPort(0).to_string(),
            "port 0 is out of range [1, 65535]"
        );
        assert_eq!(ConfigError::EmptyHost.to_string(), "host must not be empty");
    }

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::Status {
            code: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 - Not Found");
    }

    #[test]
    fn transport_classification() {
        assert!(Error::Transport(TransportError::Timeout(10_000)).is_transport());
        assert!(
            Error::Discovery(DiscoveryError::Unreachable(TransportError::Timeout(500)))
                .is_transport()
        );
        assert!(!Error::Protocol(ProtocolError::Unauthorized).is_transport());
        assert!(!Error::Discovery(DiscoveryError::NoDevices).is_transport());
    }
}
