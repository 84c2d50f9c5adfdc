// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw key/value payloads returned by the heater.

use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// A raw value as found in a read payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    /// An integer, parsed from a JSON number or a string.
    Integer(i64),
    /// A non-integral number.
    Scaled(f64),
}

impl RawValue {
    /// Parses a JSON value.
    ///
    /// Strings are parsed with `radix`; a `0x` prefix always means hex.
    /// Booleans map to 0 and 1. Anything else yields `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kospel_lib::field::RawValue;
    /// use serde_json::json;
    ///
    /// assert_eq!(RawValue::from_json(&json!("4a01"), 16), Some(RawValue::Integer(0x4a01)));
    /// assert_eq!(RawValue::from_json(&json!("215"), 10), Some(RawValue::Integer(215)));
    /// assert_eq!(RawValue::from_json(&json!(null), 10), None);
    /// ```
    #[must_use]
    pub fn from_json(value: &Value, radix: u32) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Scaled)),
            Value::String(s) => Self::parse_str(s.trim(), radix),
            Value::Bool(b) => Some(Self::Integer(i64::from(*b))),
            _ => None,
        }
    }

    fn parse_str(s: &str, radix: u32) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return i64::from_str_radix(hex, 16).ok().map(Self::Integer);
        }
        if let Ok(v) = i64::from_str_radix(s, radix) {
            return Some(Self::Integer(v));
        }
        if radix == 10 {
            return s
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Scaled);
        }
        None
    }

    /// Returns the value as an integer if it has no fractional part.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Self::Integer(v) => Some(v),
            Self::Scaled(v) if v.is_finite() && v.fract() == 0.0 => {
                // Bounded by the range check
                #[allow(clippy::cast_possible_truncation)]
                let int = v as i64;
                (-9.0e15..=9.0e15).contains(&v).then_some(int)
            }
            Self::Scaled(_) => None,
        }
    }
}

const ENVELOPE_KEYS: &[&str] = &["status", "time", "sn"];

/// A read payload: raw keys mapped to JSON values.
///
/// Bodies wrapped in `{"regs": {...}}` or `{"data": {...}}` are unwrapped,
/// dropping the `status`, `time` and `sn` envelope keys beside them.
/// Lookups fall back to a case-insensitive match on the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload {
    entries: Map<String, Value>,
}

impl RawPayload {
    /// Builds a payload from a parsed JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidBody` if the body is not a JSON object.
    pub fn from_json(body: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut map) = body else {
            return Err(ProtocolError::InvalidBody(
                "expected a JSON object".to_string(),
            ));
        };
        for wrapper in ["regs", "data"] {
            let envelope = map
                .keys()
                .all(|k| k == wrapper || ENVELOPE_KEYS.contains(&k.as_str()));
            if envelope && matches!(map.get(wrapper), Some(Value::Object(_))) {
                if let Some(Value::Object(inner)) = map.remove(wrapper) {
                    map = inner;
                }
                break;
            }
        }
        Ok(Self { entries: map })
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the payload has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the raw keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for RawPayload {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}
