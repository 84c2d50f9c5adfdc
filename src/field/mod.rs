// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Field descriptors and value decoding.
//!
//! Every quantity the library reads from or writes to the heater is listed
//! once in [`FIELDS`]. A [`FieldDescriptor`] names the raw key in each data
//! source together with the [`DecodeRule`] that turns the raw value into a
//! typed [`FieldValue`].
//!
//! # Data sources
//!
//! - [`DataSource::Ekd`]: `GET /api/ekd/read/{id}`, named variables such as
//!   `TEMP_ROOM` carrying signed integers in tenths of a degree.
//! - [`DataSource::Registers`]: `GET /api/dev/{id}`, lowercase hex register
//!   addresses such as `0c1c` carrying byte-swapped 16-bit words.
//!
//! # Examples
//!
//! ```
//! use kospel_lib::field::{Field, DataSource};
//!
//! let descriptor = Field::CurrentTemperature.descriptor();
//! assert_eq!(descriptor.key_for(DataSource::Registers).unwrap().key, "0c1c");
//! assert_eq!(descriptor.key_for(DataSource::Ekd).unwrap().key, "TEMP_ROOM");
//! ```

mod codec;
mod raw;
mod table;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{OperatingMode, ValueRange};

pub use codec::{DecodeRule, decode_flag, decode_le_tenths, decode_signed_tenths, encode};
pub use raw::{RawPayload, RawValue};
pub use table::FIELDS;

/// A named quantity exposed by the heater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Measured room temperature.
    CurrentTemperature,
    /// Room temperature setpoint.
    TargetTemperature,
    /// Central heating circuit setpoint.
    TargetTemperatureCo,
    /// Domestic hot water setpoint.
    TargetTemperatureCwu,
    /// Measured hot water temperature.
    WaterTemperature,
    /// Outdoor sensor temperature.
    OutsideTemperature,
    /// Heating circuit return temperature.
    ReturnTemperature,
    /// Heating element is energized.
    HeaterRunning,
    /// Circulation pump is running.
    PumpRunning,
    /// Hot water heating is active.
    WaterHeating,
    /// Operating mode.
    Mode,
    /// Instantaneous power draw in watts.
    Power,
    /// Device error code, 0 when healthy.
    ErrorCode,
}

impl Field {
    /// Returns the snake_case name of the field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentTemperature => "current_temperature",
            Self::TargetTemperature => "target_temperature",
            Self::TargetTemperatureCo => "target_temperature_co",
            Self::TargetTemperatureCwu => "target_temperature_cwu",
            Self::WaterTemperature => "water_temperature",
            Self::OutsideTemperature => "outside_temperature",
            Self::ReturnTemperature => "return_temperature",
            Self::HeaterRunning => "heater_running",
            Self::PumpRunning => "pump_running",
            Self::WaterHeating => "water_heating",
            Self::Mode => "mode",
            Self::Power => "power",
            Self::ErrorCode => "error_code",
        }
    }

    /// Returns the descriptor of this field.
    #[must_use]
    pub fn descriptor(&self) -> &'static FieldDescriptor {
        FIELDS
            .iter()
            .find(|d| d.field == *self)
            .unwrap_or_else(|| unreachable!("every field has a descriptor"))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of value a field decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Degrees Celsius.
    Temperature,
    /// On/off state.
    Flag,
    /// Operating mode.
    Mode,
    /// Raw integer.
    Integer,
}

impl FieldKind {
    /// Returns a short name for the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Flag => "flag",
            Self::Mode => "mode",
            Self::Integer => "integer",
        }
    }
}

/// Unit of measurement of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Degrees Celsius.
    Celsius,
    /// Watts.
    Watt,
}

impl Unit {
    /// Returns the unit symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Watt => "W",
        }
    }
}

/// Whether a field can be written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Access {
    /// Read-only.
    ReadOnly,
    /// Writable, optionally restricted to a range.
    ReadWrite(Option<ValueRange>),
}

impl Access {
    /// Returns `true` if the field can be written.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWrite(_))
    }
}

/// The HTTP endpoint family the data is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Named-variable endpoint (`/api/ekd/read/{id}`).
    #[default]
    Ekd,
    /// Legacy register endpoint (`/api/dev/{id}`).
    Registers,
}

impl DataSource {
    /// Returns a short name for the source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ekd => "ekd",
            Self::Registers => "registers",
        }
    }

    /// Radix used when a raw value arrives as a string.
    #[must_use]
    pub const fn string_radix(&self) -> u32 {
        match self {
            Self::Ekd => 10,
            Self::Registers => 16,
        }
    }
}

/// Raw key of a field in one data source and how to decode it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceKey {
    /// Register address or variable name.
    pub key: &'static str,
    /// Rule applied to the raw value.
    pub rule: DecodeRule,
}

impl SourceKey {
    /// Creates a source key.
    #[must_use]
    pub const fn new(key: &'static str, rule: DecodeRule) -> Self {
        Self { key, rule }
    }
}

/// Static description of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    /// The field.
    pub field: Field,
    /// Value kind produced by every decode rule of this field.
    pub kind: FieldKind,
    /// Unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Key in the register endpoint.
    pub register: Option<SourceKey>,
    /// Key in the EKD endpoint.
    pub variable: Option<SourceKey>,
    /// Write capability.
    pub access: Access,
}

impl FieldDescriptor {
    /// Returns the key of this field in `source`, if it is exposed there.
    #[must_use]
    pub fn key_for(&self, source: DataSource) -> Option<SourceKey> {
        match source {
            DataSource::Ekd => self.variable,
            DataSource::Registers => self.register,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Degrees Celsius with one decimal of precision.
    Temperature(f32),
    /// On/off state.
    Flag(bool),
    /// Operating mode.
    Mode(OperatingMode),
    /// Raw integer.
    Integer(i64),
}

impl FieldValue {
    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Temperature(_) => FieldKind::Temperature,
            Self::Flag(_) => FieldKind::Flag,
            Self::Mode(_) => FieldKind::Mode,
            Self::Integer(_) => FieldKind::Integer,
        }
    }

    /// Returns the temperature, if this is a temperature value.
    #[must_use]
    pub const fn as_temperature(&self) -> Option<f32> {
        if let Self::Temperature(t) = self {
            Some(*t)
        } else {
            None
        }
    }

    /// Returns the flag, if this is a flag value.
    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        if let Self::Flag(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Returns the mode, if this is a mode value.
    #[must_use]
    pub const fn as_mode(&self) -> Option<OperatingMode> {
        if let Self::Mode(m) = self {
            Some(*m)
        } else {
            None
        }
    }

    /// Returns the integer, if this is an integer value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        if let Self::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature(t) => write!(f, "{t:.1}"),
            Self::Flag(b) => write!(f, "{}", if *b { "on" } else { "off" }),
            Self::Mode(m) => write!(f, "{m}"),
            Self::Integer(i) => write!(f, "{i}"),
        }
    }
}
