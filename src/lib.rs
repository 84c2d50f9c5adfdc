// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kospel Lib - A Rust library to poll and control Kospel electric heaters.
//!
//! This library talks to the C.MI module of a Kospel heater over its local
//! HTTP API. It discovers the device identifier, reads the heater's values
//! through either the EKD variable API or the raw register API, decodes them
//! into typed readings and writes setpoints back.
//!
//! # Supported Features
//!
//! - **Discovery**: Device identifier lookup through `/api/dev`
//! - **Readings**: Room, water, outside and return temperatures, pump and
//!   heater flags, operating mode, power and error code
//! - **Control**: Room and water setpoints, operating mode
//! - **Polling**: A [`Coordinator`] that polls on a timer, tracks
//!   availability and notifies subscribers
//!
//! # Quick Start
//!
//! ## One-shot read
//!
//! ```no_run
//! use kospel_lib::DeviceClient;
//! use kospel_lib::protocol::ConnectionConfig;
//!
//! #[tokio::main]
//! async fn main() -> kospel_lib::Result<()> {
//!     let client = DeviceClient::http(&ConnectionConfig::new("192.168.1.50"))?;
//!
//!     let device = client.discover_device().await?;
//!     let snapshot = client.poll(&device).await?;
//!
//!     println!("room: {:?} °C", snapshot.current_temperature());
//!     println!("mode: {:?}", snapshot.mode());
//!     Ok(())
//! }
//! ```
//!
//! ## Polling coordinator
//!
//! ```no_run
//! use std::time::Duration;
//! use kospel_lib::{Coordinator, CoordinatorConfig, Subscribable};
//! use kospel_lib::protocol::ConnectionConfig;
//! use kospel_lib::types::OperatingMode;
//!
//! #[tokio::main]
//! async fn main() -> kospel_lib::Result<()> {
//!     let connection = ConnectionConfig::new("192.168.1.50")
//!         .with_credentials("admin", "secret");
//!     let config = CoordinatorConfig::default()
//!         .with_poll_interval(Duration::from_secs(60));
//!
//!     let coordinator = Coordinator::http(&connection, config)?;
//!     coordinator.on_availability_changed(|available| {
//!         println!("heater available: {available}");
//!     });
//!
//!     let poller = coordinator.spawn();
//!     coordinator.set_mode(OperatingMode::Eco).await?;
//!
//!     tokio::time::sleep(Duration::from_secs(300)).await;
//!     poller.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Data sources
//!
//! | Source | Read | Write | Encoding |
//! |--------|------|-------|----------|
//! | [`DataSource::Ekd`] | `GET /api/ekd/read/{id}` | `POST /api/ekd/write/{id}` | Signed tenths as JSON integers |
//! | [`DataSource::Registers`] | `GET /api/dev/{id}` | `POST /api/dev/{id}` | Little-endian tenths as hex strings |

pub mod client;
pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod field;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod types;

pub use client::DeviceClient;
pub use coordinator::{Coordinator, CoordinatorConfig, PollOutcome, PollerHandle, RetryPolicy};
pub use error::{
    ConfigError, DiscoveryError, Error, ProtocolError, Result, TransportError, ValidationError,
};
pub use field::{DataSource, Field, FieldValue};
pub use protocol::{ConnectionConfig, HttpClient};
pub use state::{CoordinatorState, DegradedCause, StatusSnapshot};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use types::{DeviceId, OperatingMode, RoomTemperature, WaterTemperature};
