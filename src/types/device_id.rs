// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier reported by the C.MI module.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a heater behind a C.MI module.
///
/// The identifier is whatever the discovery endpoint lists in its `devs`
/// array. It is never interpreted, only echoed back in data and write URLs.
///
/// # Examples
///
/// ```
/// use kospel_lib::types::DeviceId;
///
/// let id = DeviceId::new("65");
/// assert_eq!(id.as_str(), "65");
/// assert_eq!(id.to_string(), "65");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device identifier from a raw string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier percent-encoded for use in a URL path.
    #[must_use]
    pub fn url_segment(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_equality() {
        assert_eq!(DeviceId::new("65"), DeviceId::from("65"));
        assert_ne!(DeviceId::new("65"), DeviceId::new("66"));
    }

    #[test]
    fn device_id_url_segment_is_encoded() {
        assert_eq!(DeviceId::new("65").url_segment(), "65");
        assert_eq!(DeviceId::new("a b/c").url_segment(), "a%20b%2Fc");
    }

    #[test]
    fn device_id_serde_is_transparent() {
        let id = DeviceId::new("65");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"65\"");
        let back: DeviceId = serde_json::from_str("\"65\"").unwrap();
        assert_eq!(back, id);
    }
}
