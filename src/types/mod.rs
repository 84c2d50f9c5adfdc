// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for Kospel heaters.
//!
//! This module provides type-safe representations of the values exchanged
//! with the heater. Setpoint types validate their range on construction.

mod device_id;
mod mode;
mod setpoint;

pub use device_id::DeviceId;
pub use mode::{MODE_TABLE, OperatingMode};
pub use setpoint::{RoomTemperature, ValueRange, WaterTemperature};
