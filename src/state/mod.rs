// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heater status and coordinator state types.
//!
//! [`StatusSnapshot`] holds the values decoded from one successful poll.
//! [`CoordinatorState`] tracks where a coordinator is in its lifecycle.
//!
//! # Examples
//!
//! ```
//! use kospel_lib::field::{DataSource, RawPayload};
//! use kospel_lib::state::StatusSnapshot;
//! use serde_json::json;
//!
//! let raw = RawPayload::from_json(json!({"TEMP_ROOM": 215, "MODE": 1})).unwrap();
//! let snapshot = StatusSnapshot::from_raw(&raw, DataSource::Ekd);
//!
//! assert_eq!(snapshot.current_temperature(), Some(21.5));
//! assert_eq!(snapshot.mode().map(|m| m.to_string()), Some("heat".to_string()));
//! ```

mod coordinator_state;
mod snapshot;

pub use coordinator_state::{CoordinatorState, DegradedCause};
pub use snapshot::StatusSnapshot;
