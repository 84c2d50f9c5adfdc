// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport for communicating with the C.MI module.
//!
//! The [`Protocol`] trait is the seam between the device client and the
//! network. [`HttpClient`] implements it on top of `reqwest`; tests
//! substitute scripted implementations.

mod http;

use std::future::Future;

pub use http::{ConnectionConfig, Credentials, HttpClient};

use serde_json::Value;

use crate::error::{ProtocolError, Result};

/// Response returned by the heater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: u16,
    body: String,
}

impl ApiResponse {
    /// Creates a response from a status code and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the raw response body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns `true` if the body is empty or whitespace.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Json` if the body is not valid JSON.
    pub fn json(&self) -> std::result::Result<Value, ProtocolError> {
        self.parse()
    }

    /// Parses the body as a specific type.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Json` if the body cannot be parsed into `T`.
    pub fn parse<T: serde::de::DeserializeOwned>(
        &self,
    ) -> std::result::Result<T, ProtocolError> {
        serde_json::from_str(&self.body).map_err(Into::into)
    }
}

/// Trait for transports that can talk to a C.MI module.
///
/// Implementations return `Error::Transport` for network failures and
/// `Error::Protocol` for non-success status codes.
pub trait Protocol: Send + Sync {
    /// Sends a GET request to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the status is not 2xx.
    fn get(&self, path: &str) -> impl Future<Output = Result<ApiResponse>> + Send;

    /// Sends a POST request to `path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the status is not 2xx.
    fn post_json(
        &self,
        path: &str,
        body: &Value,
    ) -> impl Future<Output = Result<ApiResponse>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_accessors() {
        let response = ApiResponse::new(200, r#"{"status":"0"}"#);
        assert_eq!(response.status(), 200);
        assert!(!response.is_empty());
        assert_eq!(response.json().unwrap()["status"], "0");
    }

    #[test]
    fn invalid_json_is_a_protocol_error() {
        let response = ApiResponse::new(200, "<html>");
        assert!(matches!(response.json(), Err(ProtocolError::Json(_))));
    }

    #[test]
    fn whitespace_body_is_empty() {
        assert!(ApiResponse::new(200, " \n").is_empty());
    }
}
