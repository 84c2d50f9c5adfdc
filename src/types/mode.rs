// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heater operating mode.
//!
//! The C.MI module reports the mode as a small integer. Firmware revisions
//! disagree on the codes above 3, so the mapping is a lookup table rather
//! than a closed set: codes missing from [`MODE_TABLE`] decode to
//! [`OperatingMode::Unknown`] instead of failing.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ValidationError;

/// Operating mode of the heater.
///
/// # Examples
///
/// ```
/// use kospel_lib::types::OperatingMode;
///
/// assert_eq!(OperatingMode::from_code(2), OperatingMode::Auto);
/// assert_eq!(OperatingMode::from_code(42), OperatingMode::Unknown(42));
/// assert_eq!(OperatingMode::Eco.code(), Some(3));
/// assert_eq!("heat".parse::<OperatingMode>().unwrap(), OperatingMode::Heat);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatingMode {
    /// Heater is off.
    Off,
    /// Manual heating towards the room setpoint.
    Heat,
    /// Schedule-driven operation.
    Auto,
    /// Reduced setpoint.
    Eco,
    /// Comfort setpoint.
    Comfort,
    /// Temporary boost.
    Boost,
    /// Manual override.
    Manual,
    /// A code that is not in the lookup table.
    Unknown(u8),
}

/// Code-to-mode lookup table.
///
/// Codes 4-6 only appear on some firmware revisions.
pub const MODE_TABLE: &[(u8, OperatingMode)] = &[
    (0, OperatingMode::Off),
    (1, OperatingMode::Heat),
    (2, OperatingMode::Auto),
    (3, OperatingMode::Eco),
    (4, OperatingMode::Comfort),
    (5, OperatingMode::Boost),
    (6, OperatingMode::Manual),
];

impl OperatingMode {
    /// Maps a device code to a mode.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        MODE_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map_or(Self::Unknown(code), |(_, mode)| *mode)
    }

    /// Returns the device code, or `None` for [`OperatingMode::Unknown`].
    #[must_use]
    pub fn code(&self) -> Option<u8> {
        if let Self::Unknown(_) = self {
            return None;
        }
        MODE_TABLE
            .iter()
            .find(|(_, mode)| mode == self)
            .map(|(code, _)| *code)
    }

    /// Returns the lowercase name of the mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Heat => "heat",
            Self::Auto => "auto",
            Self::Eco => "eco",
            Self::Comfort => "comfort",
            Self::Boost => "boost",
            Self::Manual => "manual",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Returns `true` if the heater is switched off.
    #[must_use]
    pub fn is_off(&self) -> bool {
        matches!(self, Self::Off)
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({code})"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for OperatingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "heat" => Ok(Self::Heat),
            "auto" => Ok(Self::Auto),
            "eco" => Ok(Self::Eco),
            "comfort" => Ok(Self::Comfort),
            "boost" => Ok(Self::Boost),
            "manual" => Ok(Self::Manual),
            _ => Err(ValidationError::UnsupportedMode(s.to_string())),
        }
    }
}

impl Serialize for OperatingMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_codes() {
        assert_eq!(OperatingMode::from_code(0), OperatingMode::Off);
        assert_eq!(OperatingMode::from_code(1), OperatingMode::Heat);
        assert_eq!(OperatingMode::from_code(2), OperatingMode::Auto);
        assert_eq!(OperatingMode::from_code(3), OperatingMode::Eco);
    }

    #[test]
    fn unknown_code_is_kept() {
        let mode = OperatingMode::from_code(200);
        assert_eq!(mode, OperatingMode::Unknown(200));
        assert_eq!(mode.code(), None);
        assert_eq!(mode.to_string(), "unknown(200)");
    }

    #[test]
    fn every_table_entry_maps_back_to_its_code() {
        for (code, mode) in MODE_TABLE {
            assert_eq!(OperatingMode::from_code(*code), *mode);
            assert_eq!(mode.code(), Some(*code));
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("ECO".parse::<OperatingMode>().unwrap(), OperatingMode::Eco);
        assert!("turbo".parse::<OperatingMode>().is_err());
    }

    #[test]
    fn serializes_as_name() {
        assert_eq!(
            serde_json::to_string(&OperatingMode::Auto).unwrap(),
            "\"auto\""
        );
    }
}
