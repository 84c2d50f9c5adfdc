// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temperature setpoint types for control writes.
//!
//! The heater stores setpoints in tenths of a degree. These types make sure
//! a value is inside the range the heater accepts before anything is sent.

use std::fmt;

use crate::error::ValidationError;

/// Inclusive range of degrees Celsius accepted by a writable field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    /// Lowest accepted value.
    pub min: f32,
    /// Highest accepted value.
    pub max: f32,
}

impl ValueRange {
    /// Creates a new inclusive range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `value` lies inside the range.
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Validates `value` and converts it to tenths of a degree.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NotANumber` for NaN or infinite values and
    /// `ValidationError::OutOfRange` when `value` is outside the range.
    pub fn to_tenths(&self, field: &'static str, value: f32) -> Result<i16, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotANumber(field));
        }
        if !self.contains(value) {
            return Err(ValidationError::OutOfRange {
                field,
                min: self.min,
                max: self.max,
                actual: value,
            });
        }
        // Safe: range is bounded well inside i16 after scaling
        #[allow(clippy::cast_possible_truncation)]
        let tenths = (value * 10.0).round() as i16;
        Ok(tenths)
    }
}

/// Room temperature setpoint (5.0-35.0 °C).
///
/// # Examples
///
/// ```
/// use kospel_lib::types::RoomTemperature;
///
/// let t = RoomTemperature::new(21.5).unwrap();
/// assert_eq!(t.tenths(), 215);
///
/// assert!(RoomTemperature::new(4.9).is_err());
/// assert!(RoomTemperature::new(35.1).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomTemperature(i16);

impl RoomTemperature {
    /// Accepted range.
    pub const RANGE: ValueRange = ValueRange::new(5.0, 35.0);

    /// Creates a room setpoint.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `celsius` is outside 5.0-35.0.
    pub fn new(celsius: f32) -> Result<Self, ValidationError> {
        Self::RANGE
            .to_tenths("target_temperature", celsius)
            .map(Self)
    }

    /// Returns the setpoint in tenths of a degree.
    #[must_use]
    pub const fn tenths(&self) -> i16 {
        self.0
    }

    /// Returns the setpoint in degrees Celsius.
    #[must_use]
    pub fn celsius(&self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl fmt::Display for RoomTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C", self.celsius())
    }
}

/// Domestic hot water setpoint (20.0-60.0 °C).
///
/// # Examples
///
/// ```
/// use kospel_lib::types::WaterTemperature;
///
/// assert_eq!(WaterTemperature::new(55.0).unwrap().tenths(), 550);
/// assert!(WaterTemperature::new(61.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaterTemperature(i16);

impl WaterTemperature {
    /// Accepted range.
    pub const RANGE: ValueRange = ValueRange::new(20.0, 60.0);

    /// Creates a hot water setpoint.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `celsius` is outside 20.0-60.0.
    pub fn new(celsius: f32) -> Result<Self, ValidationError> {
        Self::RANGE
            .to_tenths("target_temperature_cwu", celsius)
            .map(Self)
    }

    /// Returns the setpoint in tenths of a degree.
    #[must_use]
    pub const fn tenths(&self) -> i16 {
        self.0
    }

    /// Returns the setpoint in degrees Celsius.
    #[must_use]
    pub fn celsius(&self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl fmt::Display for WaterTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C", self.celsius())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_boundaries() {
        assert_eq!(RoomTemperature::new(5.0).unwrap().tenths(), 50);
        assert_eq!(RoomTemperature::new(35.0).unwrap().tenths(), 350);
        assert!(matches!(
            RoomTemperature::new(4.9),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            RoomTemperature::new(35.1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn water_boundaries() {
        assert!(WaterTemperature::new(20.0).is_ok());
        assert!(WaterTemperature::new(60.0).is_ok());
        assert!(WaterTemperature::new(19.9).is_err());
        assert!(WaterTemperature::new(60.1).is_err());
    }

    #[test]
    fn non_finite_is_rejected() {
        assert_eq!(
            RoomTemperature::new(f32::NAN),
            Err(ValidationError::NotANumber("target_temperature"))
        );
        assert!(RoomTemperature::new(f32::INFINITY).is_err());
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(RoomTemperature::new(21.46).unwrap().tenths(), 215);
        assert!((RoomTemperature::new(21.5).unwrap().celsius() - 21.5).abs() < f32::EPSILON);
    }

    #[test]
    fn display() {
        assert_eq!(RoomTemperature::new(21.5).unwrap().to_string(), "21.5°C");
    }
}
