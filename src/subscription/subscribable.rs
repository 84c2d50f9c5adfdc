// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that publish heater updates.

use crate::field::{Field, FieldValue};
use crate::state::{CoordinatorState, StatusSnapshot};
use crate::subscription::SubscriptionId;

/// Trait for types that support update subscriptions.
///
/// # Examples
///
/// ```no_run
/// use kospel_lib::{Coordinator, CoordinatorConfig, DeviceClient};
/// use kospel_lib::protocol::ConnectionConfig;
/// use kospel_lib::subscription::Subscribable;
///
/// # fn example() -> kospel_lib::Result<()> {
/// let client = DeviceClient::http(&ConnectionConfig::new("192.168.1.50"))?;
/// let coordinator = Coordinator::new(client, CoordinatorConfig::default())?;
///
/// let sub_id = coordinator.on_snapshot(|snapshot| {
///     println!("room: {:?}", snapshot.current_temperature());
/// });
///
/// coordinator.on_availability_changed(|available| {
///     println!("available: {available}");
/// });
///
/// coordinator.unsubscribe(sub_id);
/// # Ok(())
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to snapshot replacements.
    fn on_snapshot<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StatusSnapshot) + Send + Sync + 'static;

    /// Subscribes to individual field changes.
    ///
    /// The callback receives `None` when a field is no longer reported.
    fn on_field_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Field, Option<FieldValue>) + Send + Sync + 'static;

    /// Subscribes to state transitions.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(CoordinatorState) + Send + Sync + 'static;

    /// Subscribes to availability changes.
    ///
    /// Availability is re-evaluated on every state change and on every
    /// poll tick, so a lapsed availability window is reported at the next
    /// tick at the latest.
    fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
