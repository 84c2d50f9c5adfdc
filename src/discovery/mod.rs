// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing of the `/api/dev` discovery response.
//!
//! Firmware revisions answer the discovery endpoint in several shapes:
//!
//! - `{"status": "0", "time": "...", "sn": "...", "devs": ["65"]}`
//! - `["65"]`
//! - `[{"devs": ["65"]}]`
//! - `[{"id": "65", ...}]`
//!
//! Identifiers may be strings or integers. Every shape is normalized into a
//! [`DiscoveryResult`] before anything else looks at it.
//!
//! # Examples
//!
//! ```
//! use kospel_lib::discovery::DiscoveryResult;
//!
//! let result = DiscoveryResult::parse(r#"{"status":"0","devs":["65", 66]}"#).unwrap();
//! assert_eq!(result.first_device().unwrap().as_str(), "65");
//! assert_eq!(result.devices().len(), 2);
//!
//! let result = DiscoveryResult::parse(r#"[{"id": "65"}]"#).unwrap();
//! assert_eq!(result.first_device().unwrap().as_str(), "65");
//! ```

use serde::Deserialize;

use crate::error::{DiscoveryError, ProtocolError};
use crate::types::DeviceId;

/// A string or integer scalar.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(i64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DiscoveryObject {
    #[serde(default)]
    status: Option<Scalar>,
    #[serde(default)]
    time: Option<Scalar>,
    #[serde(default, alias = "serial")]
    sn: Option<Scalar>,
    #[serde(default, alias = "devices")]
    devs: Vec<Scalar>,
}

#[derive(Debug, Deserialize)]
struct DescribedDevice {
    #[serde(alias = "device_id", alias = "dev")]
    id: Scalar,
}

// Variant order matters: an object carrying `id` is a described device,
// anything else falls through to the object form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DiscoveryEntry {
    Id(Scalar),
    Described(DescribedDevice),
    Object(DiscoveryObject),
}

// List comes first: derived struct visitors also accept sequences.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DiscoveryPayload {
    List(Vec<DiscoveryEntry>),
    Object(DiscoveryObject),
}

/// Normalized discovery response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    status: Option<String>,
    time: Option<String>,
    serial: Option<String>,
    devices: Vec<DeviceId>,
}

impl DiscoveryResult {
    /// Parses a discovery response body.
    ///
    /// Duplicate and blank identifiers are dropped; the order of the
    /// remaining identifiers is preserved.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::Malformed` if the body matches none of the
    /// known shapes, or `DiscoveryError::NoDevices` if it lists no device.
    pub fn parse(body: &str) -> Result<Self, DiscoveryError> {
        let payload: DiscoveryPayload = serde_json::from_str(body)
            .map_err(|e| DiscoveryError::Malformed(ProtocolError::Json(e)))?;
        let result = Self::from_payload(payload);
        if result.devices.is_empty() {
            return Err(DiscoveryError::NoDevices);
        }
        Ok(result)
    }

    fn from_payload(payload: DiscoveryPayload) -> Self {
        let mut result = Self {
            status: None,
            time: None,
            serial: None,
            devices: Vec::new(),
        };
        match payload {
            DiscoveryPayload::Object(object) => result.absorb(object),
            DiscoveryPayload::List(entries) => {
                for entry in entries {
                    match entry {
                        DiscoveryEntry::Id(id) => result.push(id),
                        DiscoveryEntry::Described(device) => result.push(device.id),
                        DiscoveryEntry::Object(object) => result.absorb(object),
                    }
                }
            }
        }
        result
    }

    fn absorb(&mut self, object: DiscoveryObject) {
        self.status = self.status.take().or(object.status.map(Scalar::into_string));
        self.time = self.time.take().or(object.time.map(Scalar::into_string));
        self.serial = self.serial.take().or(object.sn.map(Scalar::into_string));
        for id in object.devs {
            self.push(id);
        }
    }

    fn push(&mut self, id: Scalar) {
        let id = id.into_string();
        if id.is_empty() || self.devices.iter().any(|d| d.as_str() == id) {
            return;
        }
        self.devices.push(DeviceId::new(id));
    }

    /// Returns the first listed device.
    ///
    /// Always `Some` for a result returned by [`DiscoveryResult::parse`].
    #[must_use]
    pub fn first_device(&self) -> Option<&DeviceId> {
        self.devices.first()
    }

    /// Returns every listed device in response order.
    #[must_use]
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    /// Consumes the result, returning the device list.
    #[must_use]
    pub fn into_devices(self) -> Vec<DeviceId> {
        self.devices
    }

    /// The `status` field of the object form, if present.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The module clock reported with the response, if present.
    #[must_use]
    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    /// The module serial number, if present.
    #[must_use]
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(body: &str) -> Vec<String> {
        DiscoveryResult::parse(body)
            .unwrap()
            .devices()
            .iter()
            .map(|d| d.as_str().to_string())
            .collect()
    }

    #[test]
    fn object_form() {
        let result = DiscoveryResult::parse(
            r#"{"status":"0","time":"2024-01-01 12:00","sn":"mi01_00cf","devs":["65"]}"#,
        )
        .unwrap();
        assert_eq!(result.first_device().unwrap().as_str(), "65");
        assert_eq!(result.status(), Some("0"));
        assert_eq!(result.time(), Some("2024-01-01 12:00"));
        assert_eq!(result.serial(), Some("mi01_00cf"));
    }

    #[test]
    fn list_forms() {
        assert_eq!(ids(r#"["65"]"#), vec!["65"]);
        assert_eq!(ids(r#"[{"devs":["65"]}]"#), vec!["65"]);
        assert_eq!(ids(r#"[{"id":"65","name":"EKD"}]"#), vec!["65"]);
        assert_eq!(ids(r#"[{"device_id":65}]"#), vec!["65"]);
    }

    #[test]
    fn integer_identifiers() {
        assert_eq!(ids(r#"{"devs":[65, 66]}"#), vec!["65", "66"]);
        assert_eq!(ids("[65]"), vec!["65"]);
    }

    #[test]
    fn duplicates_and_blanks_are_dropped() {
        assert_eq!(ids(r#"["65", " ", 65, "66", "65"]"#), vec!["65", "66"]);
    }

    #[test]
    fn empty_device_list() {
        assert!(matches!(
            DiscoveryResult::parse(r#"{"status":"0","devs":[]}"#),
            Err(DiscoveryError::NoDevices)
        ));
        assert!(matches!(
            DiscoveryResult::parse("[]"),
            Err(DiscoveryError::NoDevices)
        ));
        assert!(matches!(
            DiscoveryResult::parse("{}"),
            Err(DiscoveryError::NoDevices)
        ));
    }

    #[test]
    fn malformed_bodies() {
        for body in ["", "not json", "42", r#""65""#, "[true]"] {
            assert!(
                matches!(
                    DiscoveryResult::parse(body),
                    Err(DiscoveryError::Malformed(_))
                ),
                "{body}"
            );
        }
    }
}
