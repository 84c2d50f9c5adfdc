// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded status snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::field::{DataSource, FIELDS, Field, FieldValue, RawPayload, RawValue};
use crate::types::OperatingMode;

/// One coherent set of decoded values from one successful poll.
///
/// A snapshot can only be built by decoding a [`RawPayload`], so it never
/// holds a field outside the descriptor table and every value matches its
/// descriptor's kind. Fields that were missing from the payload, or whose
/// raw value could not be decoded, are simply absent.
///
/// # Examples
///
/// ```
/// use kospel_lib::field::{DataSource, RawPayload};
/// use kospel_lib::state::StatusSnapshot;
/// use serde_json::json;
///
/// let raw = RawPayload::from_json(json!({"0c1c": "4a01", "0b30": "0100"})).unwrap();
/// let snapshot = StatusSnapshot::from_raw(&raw, DataSource::Registers);
///
/// assert_eq!(snapshot.current_temperature(), Some(33.0));
/// assert_eq!(snapshot.heater_running(), Some(false));
/// assert_eq!(snapshot.water_temperature(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    values: BTreeMap<Field, FieldValue>,
    source: DataSource,
    timestamp: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Decodes `raw` using the keys and rules of `source`, timestamped now.
    #[must_use]
    pub fn from_raw(raw: &RawPayload, source: DataSource) -> Self {
        Self::from_raw_at(raw, source, Utc::now())
    }

    /// Decodes `raw` with an explicit timestamp.
    #[must_use]
    pub fn from_raw_at(raw: &RawPayload, source: DataSource, timestamp: DateTime<Utc>) -> Self {
        let radix = source.string_radix();
        let mut values = BTreeMap::new();

        for descriptor in FIELDS {
            let Some(key) = descriptor.key_for(source) else {
                continue;
            };
            let Some(json) = raw.get(key.key) else {
                continue;
            };
            match RawValue::from_json(json, radix).and_then(|v| key.rule.decode(v)) {
                Some(value) => {
                    values.insert(descriptor.field, value);
                }
                None => {
                    tracing::debug!(
                        field = %descriptor.field,
                        key = key.key,
                        raw = %json,
                        "Skipping undecodable field"
                    );
                }
            }
        }

        Self {
            values,
            source,
            timestamp,
        }
    }

    /// Returns the value of `field`, if present.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<FieldValue> {
        self.values.get(&field).copied()
    }

    /// Returns `field` as a temperature.
    #[must_use]
    pub fn temperature(&self, field: Field) -> Option<f32> {
        self.get(field).and_then(|v| v.as_temperature())
    }

    /// Returns `field` as a flag.
    #[must_use]
    pub fn flag(&self, field: Field) -> Option<bool> {
        self.get(field).and_then(|v| v.as_flag())
    }

    /// Measured room temperature.
    #[must_use]
    pub fn current_temperature(&self) -> Option<f32> {
        self.temperature(Field::CurrentTemperature)
    }

    /// Room temperature setpoint.
    #[must_use]
    pub fn target_temperature(&self) -> Option<f32> {
        self.temperature(Field::TargetTemperature)
    }

    /// Measured hot water temperature.
    #[must_use]
    pub fn water_temperature(&self) -> Option<f32> {
        self.temperature(Field::WaterTemperature)
    }

    /// Hot water setpoint.
    #[must_use]
    pub fn water_setpoint(&self) -> Option<f32> {
        self.temperature(Field::TargetTemperatureCwu)
    }

    /// Whether the heating element is energized.
    #[must_use]
    pub fn heater_running(&self) -> Option<bool> {
        self.flag(Field::HeaterRunning)
    }

    /// Whether the circulation pump is running.
    #[must_use]
    pub fn pump_running(&self) -> Option<bool> {
        self.flag(Field::PumpRunning)
    }

    /// Whether hot water heating is active.
    #[must_use]
    pub fn water_heating(&self) -> Option<bool> {
        self.flag(Field::WaterHeating)
    }

    /// Current operating mode.
    #[must_use]
    pub fn mode(&self) -> Option<OperatingMode> {
        self.get(Field::Mode).and_then(|v| v.as_mode())
    }

    /// Instantaneous power draw in watts.
    #[must_use]
    pub fn power(&self) -> Option<i64> {
        self.get(Field::Power).and_then(|v| v.as_integer())
    }

    /// Device error code.
    #[must_use]
    pub fn error_code(&self) -> Option<i64> {
        self.get(Field::ErrorCode).and_then(|v| v.as_integer())
    }

    /// Returns the fields whose value differs from `previous`.
    ///
    /// A field present in only one of the two snapshots counts as changed.
    #[must_use]
    pub fn changed_fields(&self, previous: &Self) -> Vec<Field> {
        FIELDS
            .iter()
            .map(|d| d.field)
            .filter(|f| self.values.get(f) != previous.values.get(f))
            .collect()
    }

    /// Number of decoded fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no field could be decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the decoded fields in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, FieldValue)> + '_ {
        self.values.iter().map(|(f, v)| (*f, *v))
    }

    /// When the snapshot was decoded.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The data source the snapshot was read from.
    #[must_use]
    pub fn source(&self) -> DataSource {
        self.source
    }
}
