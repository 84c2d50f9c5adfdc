// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for coordinator subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::field::{Field, FieldValue};
use crate::state::{CoordinatorState, StatusSnapshot};

/// Unique identifier for a subscription.
///
/// Returned when registering a callback and used to unsubscribe later. IDs
/// are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type SnapshotCallback = Arc<dyn Fn(&StatusSnapshot) + Send + Sync>;
type FieldCallback = Arc<dyn Fn(Field, Option<FieldValue>) + Send + Sync>;
type StateCallback = Arc<dyn Fn(CoordinatorState) + Send + Sync>;
type AvailabilityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Registry of coordinator callbacks.
///
/// Thread-safe through `parking_lot::RwLock`. Callbacks run on the task that
/// dispatches them, outside the registry lock, and must not block.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    snapshot_callbacks: RwLock<HashMap<SubscriptionId, SnapshotCallback>>,
    field_callbacks: RwLock<HashMap<SubscriptionId, FieldCallback>>,
    state_callbacks: RwLock<HashMap<SubscriptionId, StateCallback>>,
    availability_callbacks: RwLock<HashMap<SubscriptionId, AvailabilityCallback>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            snapshot_callbacks: RwLock::new(HashMap::new()),
            field_callbacks: RwLock::new(HashMap::new()),
            state_callbacks: RwLock::new(HashMap::new()),
            availability_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a callback invoked after every snapshot replacement.
    pub fn on_snapshot<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StatusSnapshot) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.snapshot_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback invoked once per changed field.
    ///
    /// The value is `None` when the field disappeared from the snapshot.
    pub fn on_field_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Field, Option<FieldValue>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.field_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback invoked on every coordinator state transition.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(CoordinatorState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback invoked when availability flips.
    pub fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.availability_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Removes a callback.
    ///
    /// Returns `true` if the subscription was found.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.snapshot_callbacks.write().remove(&id).is_some()
            || self.field_callbacks.write().remove(&id).is_some()
            || self.state_callbacks.write().remove(&id).is_some()
            || self.availability_callbacks.write().remove(&id).is_some()
    }

    /// Removes every callback.
    pub fn clear(&self) {
        self.snapshot_callbacks.write().clear();
        self.field_callbacks.write().clear();
        self.state_callbacks.write().clear();
        self.availability_callbacks.write().clear();
    }

    /// Dispatches a new snapshot.
    ///
    /// Field callbacks receive the fields that differ from `previous`; with
    /// no previous snapshot every decoded field counts as changed.
    pub fn dispatch_snapshot(&self, snapshot: &StatusSnapshot, previous: Option<&StatusSnapshot>) {
        for callback in snapshot_of(&self.snapshot_callbacks) {
            callback(snapshot);
        }

        let field_callbacks = snapshot_of(&self.field_callbacks);
        if field_callbacks.is_empty() {
            return;
        }
        let changed: Vec<Field> = match previous {
            Some(previous) => snapshot.changed_fields(previous),
            None => snapshot.iter().map(|(field, _)| field).collect(),
        };
        for field in changed {
            let value = snapshot.get(field);
            for callback in &field_callbacks {
                callback(field, value);
            }
        }
    }

    /// Dispatches a state transition.
    pub fn dispatch_state(&self, state: CoordinatorState) {
        for callback in snapshot_of(&self.state_callbacks) {
            callback(state);
        }
    }

    /// Dispatches an availability change.
    pub fn dispatch_availability(&self, available: bool) {
        for callback in snapshot_of(&self.availability_callbacks) {
            callback(available);
        }
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.snapshot_callbacks.read().len()
            + self.field_callbacks.read().len()
            + self.state_callbacks.read().len()
            + self.availability_callbacks.read().len()
    }

    /// Returns `true` if no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

/// Clones the registered callbacks so none runs under the registry lock.
fn snapshot_of<C: ?Sized>(callbacks: &RwLock<HashMap<SubscriptionId, Arc<C>>>) -> Vec<Arc<C>> {
    callbacks.read().values().cloned().collect()
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    use serde_json::json;

    use super::*;
    use crate::field::{DataSource, RawPayload};

    fn snapshot(body: serde_json::Value) -> StatusSnapshot {
        StatusSnapshot::from_raw(&RawPayload::from_json(body).unwrap(), DataSource::Ekd)
    }

    #[test]
    fn subscription_id_display() {
        assert_eq!(SubscriptionId::new(42).to_string(), "Sub(42)");
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.callback_count(), 0);
    }

    #[test]
    fn snapshot_callback_receives_snapshot() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        registry.on_snapshot(move |s| {
            seen_clone.store(s.len(), Ordering::SeqCst);
        });

        registry.dispatch_snapshot(&snapshot(json!({"TEMP_ROOM": 215, "MODE": 1})), None);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn field_callbacks_receive_changes_only() {
        let registry = CallbackRegistry::new();
        let changes = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let changes_clone = Arc::clone(&changes);
        registry.on_field_changed(move |field, value| {
            changes_clone.lock().push((field, value));
        });

        let first = snapshot(json!({"TEMP_ROOM": 215, "PUMP_ON": 0}));
        registry.dispatch_snapshot(&first, None);
        assert_eq!(changes.lock().len(), 2);

        changes.lock().clear();
        let second = snapshot(json!({"TEMP_ROOM": 220}));
        registry.dispatch_snapshot(&second, Some(&first));
        assert_eq!(
            *changes.lock(),
            vec![
                (Field::CurrentTemperature, Some(FieldValue::Temperature(22.0))),
                (Field::PumpRunning, None),
            ]
        );
    }

    #[test]
    fn state_and_availability_callbacks() {
        let registry = CallbackRegistry::new();
        let available = Arc::new(AtomicBool::new(true));
        let available_clone = Arc::clone(&available);
        registry.on_availability_changed(move |a| available_clone.store(a, Ordering::SeqCst));

        let last_state = Arc::new(parking_lot::Mutex::new(None));
        let last_state_clone = Arc::clone(&last_state);
        registry.on_state_changed(move |s| *last_state_clone.lock() = Some(s));

        registry.dispatch_availability(false);
        registry.dispatch_state(CoordinatorState::Polling);

        assert!(!available.load(Ordering::SeqCst));
        assert_eq!(*last_state.lock(), Some(CoordinatorState::Polling));
    }

    #[test]
    fn unsubscribe_removes_callback() {
        let registry = CallbackRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let id = registry.on_availability_changed(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.dispatch_availability(true);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callback_may_subscribe_during_dispatch() {
        let registry = Arc::new(CallbackRegistry::new());
        let inner = Arc::clone(&registry);
        registry.on_state_changed(move |_| {
            inner.on_availability_changed(|_| {});
        });

        registry.dispatch_state(CoordinatorState::Polling);
        assert_eq!(registry.callback_count(), 2);
    }

    #[test]
    fn clear_and_unique_ids() {
        let registry = CallbackRegistry::new();
        let a = registry.on_snapshot(|_| {});
        let b = registry.on_state_changed(|_| {});
        assert_ne!(a, b);
        assert_eq!(registry.callback_count(), 2);
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_debug() {
        let registry = CallbackRegistry::new();
        registry.on_snapshot(|_| {});
        let debug = format!("{registry:?}");
        assert!(debug.contains("callback_count: 1"));
    }
}
