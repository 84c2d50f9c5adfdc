// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding rules for raw field values.
//!
//! Register words are 16-bit values whose bytes arrive swapped. EKD
//! variables are plain signed integers. Both carry temperatures in tenths
//! of a degree.

use serde_json::Value;

use crate::error::ValidationError;
use crate::types::OperatingMode;

use super::{Access, DataSource, FieldDescriptor, FieldKind, FieldValue, RawValue};

/// How a raw value is turned into a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeRule {
    /// Byte-swapped unsigned 16-bit word in tenths of a degree.
    LittleEndianTenths,
    /// Signed 16-bit integer in tenths of a degree.
    SignedTenths,
    /// Low byte non-zero means on.
    Boolean,
    /// Low byte looked up in the mode table.
    Mode,
    /// Integer passed through unchanged.
    Raw,
}

impl DecodeRule {
    /// Returns the kind of value this rule produces.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::LittleEndianTenths | Self::SignedTenths => FieldKind::Temperature,
            Self::Boolean => FieldKind::Flag,
            Self::Mode => FieldKind::Mode,
            Self::Raw => FieldKind::Integer,
        }
    }

    /// Decodes a raw value, returning `None` if it is out of domain.
    ///
    /// # Examples
    ///
    /// ```
    /// use kospel_lib::field::{DecodeRule, FieldValue, RawValue};
    ///
    /// let value = DecodeRule::LittleEndianTenths.decode(RawValue::Integer(0x4a01));
    /// assert_eq!(value, Some(FieldValue::Temperature(33.0)));
    ///
    /// assert_eq!(DecodeRule::LittleEndianTenths.decode(RawValue::Integer(-1)), None);
    /// ```
    #[must_use]
    pub fn decode(&self, raw: RawValue) -> Option<FieldValue> {
        match (self, raw) {
            (Self::LittleEndianTenths, RawValue::Integer(v)) => u16::try_from(v)
                .ok()
                .map(|word| FieldValue::Temperature(decode_le_tenths(word))),
            (Self::SignedTenths, RawValue::Integer(v)) => {
                decode_signed_tenths(v).map(FieldValue::Temperature)
            }
            (Self::LittleEndianTenths | Self::SignedTenths, RawValue::Scaled(v)) => {
                finite_f32(v).map(FieldValue::Temperature)
            }
            (Self::Boolean, raw) => raw.as_integer().map(|v| FieldValue::Flag(decode_flag(v))),
            (Self::Mode, raw) => raw
                .as_integer()
                .map(|v| FieldValue::Mode(OperatingMode::from_code(low_byte(v)))),
            (Self::Raw, raw) => raw.as_integer().map(FieldValue::Integer),
        }
    }
}

/// Decodes a byte-swapped register word into degrees Celsius.
///
/// `0x4a01` reads as `0x014a` = 330 tenths = 33.0 °C.
#[must_use]
pub fn decode_le_tenths(word: u16) -> f32 {
    f32::from(word.swap_bytes()) / 10.0
}

/// Decodes a signed EKD integer into degrees Celsius.
///
/// Values in `32768..=65535` are the unsigned view of a negative 16-bit
/// integer. Anything outside `-32768..=65535` is rejected.
#[must_use]
pub fn decode_signed_tenths(value: i64) -> Option<f32> {
    let signed = match value {
        -32_768..=32_767 => value,
        32_768..=65_535 => value - 65_536,
        _ => return None,
    };
    i16::try_from(signed).ok().map(|v| f32::from(v) / 10.0)
}

/// Decodes a flag: only the low byte is significant.
#[must_use]
pub fn decode_flag(value: i64) -> bool {
    value & 0xFF != 0
}

fn low_byte(value: i64) -> u8 {
    // Masked to 8 bits
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let byte = (value & 0xFF) as u8;
    byte
}

fn finite_f32(value: f64) -> Option<f32> {
    #[allow(clippy::cast_possible_truncation)]
    let v = value as f32;
    v.is_finite().then_some(v)
}

/// Encodes `value` for a write to `field` through `source`.
///
/// Returns the raw key and the JSON value the device expects: a lowercase
/// hex word for the register endpoint, a plain integer for EKD.
///
/// # Errors
///
/// Returns a `ValidationError` when the field is read-only, is not exposed
/// by `source`, the value kind does not match, or a temperature is outside
/// the accepted range.
///
/// # Examples
///
/// ```
/// use kospel_lib::field::{DataSource, Field, FieldValue, encode};
///
/// let descriptor = Field::TargetTemperatureCwu.descriptor();
/// let (key, value) = encode(descriptor, DataSource::Registers, &FieldValue::Temperature(33.0)).unwrap();
/// assert_eq!(key, "0bb9");
/// assert_eq!(value, serde_json::json!("4a01"));
/// ```
pub fn encode(
    descriptor: &FieldDescriptor,
    source: DataSource,
    value: &FieldValue,
) -> Result<(&'static str, Value), ValidationError> {
    let name = descriptor.field.as_str();
    let Access::ReadWrite(range) = descriptor.access else {
        return Err(ValidationError::ReadOnly(name));
    };
    let key = descriptor
        .key_for(source)
        .ok_or(ValidationError::NotAvailable {
            field: name,
            api: source.as_str(),
        })?;
    if value.kind() != descriptor.kind {
        return Err(ValidationError::WrongKind {
            field: name,
            expected: descriptor.kind.as_str(),
        });
    }

    let word: i64 = match *value {
        FieldValue::Temperature(celsius) => {
            let tenths = match range {
                Some(range) => range.to_tenths(name, celsius)?,
                None => unbounded_tenths(name, celsius)?,
            };
            i64::from(tenths)
        }
        FieldValue::Flag(on) => i64::from(on),
        FieldValue::Mode(mode) => mode
            .code()
            .map(i64::from)
            .ok_or_else(|| ValidationError::UnsupportedMode(mode.to_string()))?,
        FieldValue::Integer(raw) => raw,
    };

    let encoded = match source {
        DataSource::Ekd => Value::from(word),
        DataSource::Registers => {
            // Register words are 16 bits wide
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let raw = word as u16;
            let raw = if key.rule == DecodeRule::LittleEndianTenths {
                raw.swap_bytes()
            } else {
                raw
            };
            Value::from(format!("{raw:04x}"))
        }
    };
    Ok((key.key, encoded))
}

fn unbounded_tenths(field: &'static str, celsius: f32) -> Result<i16, ValidationError> {
    let range = crate::types::ValueRange::new(-3_276.8, 3_276.7);
    range.to_tenths(field, celsius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    #[test]
    fn little_endian_temperatures() {
        assert_eq!(decode_le_tenths(0x4a01), 33.0);
        assert_eq!(decode_le_tenths(0x1300), 1.9);
        assert_eq!(decode_le_tenths(0x3201), 30.6);
        assert_eq!(decode_le_tenths(0xe001), 48.0);
    }

    #[test]
    fn little_endian_rejects_out_of_domain() {
        let rule = DecodeRule::LittleEndianTenths;
        assert_eq!(rule.decode(RawValue::Integer(0x1_0000)), None);
        assert_eq!(rule.decode(RawValue::Integer(-5)), None);
    }

    #[test]
    fn signed_temperatures() {
        assert_eq!(decode_signed_tenths(215), Some(21.5));
        assert_eq!(decode_signed_tenths(-55), Some(-5.5));
        assert_eq!(decode_signed_tenths(65_481), Some(-5.5));
        assert_eq!(decode_signed_tenths(70_000), None);
        assert_eq!(decode_signed_tenths(-40_000), None);
    }

    #[test]
    fn flags_use_low_byte_only() {
        assert!(!decode_flag(0x0000));
        assert!(decode_flag(0x0001));
        assert!(!decode_flag(0x0100));
        assert!(!decode_flag(0x4600));
        assert!(decode_flag(0x00ff));
    }

    #[test]
    fn little_endian_matches_swapped_word_over_full_range() {
        let rule = DecodeRule::LittleEndianTenths;
        for word in 0..=u16::MAX {
            let expected = f32::from(word.swap_bytes()) / 10.0;
            let decoded = rule.decode(RawValue::Integer(i64::from(word)));
            assert_eq!(decoded, Some(FieldValue::Temperature(expected)), "word {word:#06x}");
            assert_eq!(decoded, rule.decode(RawValue::Integer(i64::from(word))));
        }
    }

    #[test]
    fn flag_matches_low_byte_over_full_range() {
        for word in 0..=u16::MAX {
            let expected = word & 0xFF != 0;
            assert_eq!(
                DecodeRule::Boolean.decode(RawValue::Integer(i64::from(word))),
                Some(FieldValue::Flag(expected)),
                "word {word:#06x}"
            );
        }
    }

    #[test]
    fn mode_decodes_through_table() {
        assert_eq!(
            DecodeRule::Mode.decode(RawValue::Integer(2)),
            Some(FieldValue::Mode(OperatingMode::Auto))
        );
        assert_eq!(
            DecodeRule::Mode.decode(RawValue::Integer(9)),
            Some(FieldValue::Mode(OperatingMode::Unknown(9)))
        );
    }

    #[test]
    fn scaled_values() {
        assert_eq!(
            DecodeRule::SignedTenths.decode(RawValue::Scaled(21.5)),
            Some(FieldValue::Temperature(21.5))
        );
        assert_eq!(DecodeRule::Raw.decode(RawValue::Scaled(1.5)), None);
        assert_eq!(
            DecodeRule::Raw.decode(RawValue::Scaled(1500.0)),
            Some(FieldValue::Integer(1500))
        );
    }

    #[test]
    fn encode_register_setpoint_round_trips() {
        let descriptor = Field::TargetTemperatureCwu.descriptor();
        for celsius in [20.0_f32, 33.0, 60.0] {
            let (_, encoded) =
                encode(descriptor, DataSource::Registers, &FieldValue::Temperature(celsius))
                    .unwrap();
            let raw = RawValue::from_json(&encoded, 16).unwrap();
            assert_eq!(
                DecodeRule::LittleEndianTenths.decode(raw),
                Some(FieldValue::Temperature(celsius))
            );
        }
    }

    #[test]
    fn encode_room_setpoint_boundaries() {
        let descriptor = Field::TargetTemperature.descriptor();
        let (key, value) =
            encode(descriptor, DataSource::Ekd, &FieldValue::Temperature(5.0)).unwrap();
        assert_eq!(key, "ROOM_TEMP_SETTING");
        assert_eq!(value, Value::from(50));
        assert!(encode(descriptor, DataSource::Ekd, &FieldValue::Temperature(35.0)).is_ok());
        assert!(matches!(
            encode(descriptor, DataSource::Ekd, &FieldValue::Temperature(4.9)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            encode(descriptor, DataSource::Ekd, &FieldValue::Temperature(35.1)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn encode_rejects_invalid_writes() {
        assert_eq!(
            encode(
                Field::Power.descriptor(),
                DataSource::Ekd,
                &FieldValue::Integer(1)
            ),
            Err(ValidationError::ReadOnly("power"))
        );
        assert_eq!(
            encode(
                Field::TargetTemperature.descriptor(),
                DataSource::Registers,
                &FieldValue::Temperature(21.0)
            ),
            Err(ValidationError::NotAvailable {
                field: "target_temperature",
                api: "registers"
            })
        );
        assert_eq!(
            encode(
                Field::Mode.descriptor(),
                DataSource::Ekd,
                &FieldValue::Flag(true)
            ),
            Err(ValidationError::WrongKind {
                field: "mode",
                expected: "mode"
            })
        );
        assert!(matches!(
            encode(
                Field::Mode.descriptor(),
                DataSource::Ekd,
                &FieldValue::Mode(OperatingMode::Unknown(9))
            ),
            Err(ValidationError::UnsupportedMode(_))
        ));
    }

    #[test]
    fn encode_mode() {
        let (key, value) = encode(
            Field::Mode.descriptor(),
            DataSource::Ekd,
            &FieldValue::Mode(OperatingMode::Eco),
        )
        .unwrap();
        assert_eq!(key, "MODE");
        assert_eq!(value, Value::from(3));
    }
}
