// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling coordinator.
//!
//! A [`Coordinator`] owns the device client of one heater. It caches the
//! discovered device identifier, polls on a timer, keeps the latest
//! [`StatusSnapshot`] and derives availability from consecutive failures.
//!
//! ```text
//! Uninitialized -> Discovering -> Polling <-> Degraded
//!                       any state -> ShutDown
//! ```
//!
//! # Concurrency
//!
//! - At most one poll runs at a time; a [`refresh`](Coordinator::refresh)
//!   issued while another is in flight returns [`PollOutcome::Skipped`].
//! - The snapshot lives in a `tokio::sync::watch` channel and is replaced
//!   as a whole, so readers never observe a partial update.
//! - Health bookkeeping sits behind a `parking_lot::RwLock` that is never
//!   held across an `.await`. Callbacks are dispatched after it is released.
//!
//! # Examples
//!
//! ```no_run
//! use kospel_lib::{Coordinator, CoordinatorConfig};
//! use kospel_lib::protocol::ConnectionConfig;
//!
//! # async fn example() -> kospel_lib::Result<()> {
//! let coordinator = Coordinator::http(
//!     &ConnectionConfig::new("192.168.1.50"),
//!     CoordinatorConfig::default(),
//! )?;
//!
//! coordinator.test_connection().await?;
//! let poller = coordinator.spawn();
//!
//! let mut updates = coordinator.watch_snapshot();
//! updates.changed().await.ok();
//! if let Some(snapshot) = coordinator.current_snapshot() {
//!     println!("room: {:?} °C", snapshot.current_temperature());
//! }
//!
//! coordinator.set_target_temperature(21.5).await?;
//! poller.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod poller;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub use config::{CoordinatorConfig, RetryPolicy};
pub use poller::PollerHandle;

use crate::client::DeviceClient;
use crate::error::{Error, Result};
use crate::field::{Field, FieldValue};
use crate::protocol::{ConnectionConfig, HttpClient, Protocol};
use crate::state::{CoordinatorState, DegradedCause, StatusSnapshot};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::types::{DeviceId, OperatingMode, RoomTemperature, WaterTemperature};

/// Result of one [`Coordinator::refresh`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new snapshot replaced the previous one.
    Updated,
    /// The poll failed; the previous snapshot is kept and marked stale.
    Failed,
    /// Another poll was already in flight.
    Skipped,
    /// The coordinator is shut down.
    ShutDown,
}

#[derive(Debug, Default)]
struct Health {
    state: CoordinatorState,
    consecutive_failures: u32,
    stale: bool,
    last_success: Option<Instant>,
    last_error: Option<String>,
    device: Option<DeviceId>,
    reported_available: bool,
}

impl Health {
    fn is_available(&self, window: std::time::Duration) -> bool {
        self.state.is_polling() && self.last_success.is_some_and(|t| t.elapsed() <= window)
    }
}

struct Inner<P> {
    config: CoordinatorConfig,
    client: RwLock<Option<Arc<DeviceClient<P>>>>,
    poll_gate: tokio::sync::Mutex<()>,
    discovery_gate: tokio::sync::Mutex<()>,
    health: RwLock<Health>,
    snapshot: watch::Sender<Option<Arc<StatusSnapshot>>>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    callbacks: CallbackRegistry,
}

/// Polling coordinator for one heater.
///
/// Cloning is cheap; all clones share the same state.
pub struct Coordinator<P: Protocol + 'static = HttpClient> {
    inner: Arc<Inner<P>>,
}

impl<P: Protocol + 'static> Clone for Coordinator<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Coordinator<HttpClient> {
    /// Creates an HTTP coordinator.
    ///
    /// Both configurations are validated before anything touches the
    /// network.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if either configuration is invalid.
    pub fn http(connection: &ConnectionConfig, config: CoordinatorConfig) -> Result<Self> {
        Self::new(DeviceClient::http(connection)?, config)
    }
}

impl<P: Protocol + 'static> Coordinator<P> {
    /// Creates a coordinator around `client`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` is invalid.
    pub fn new(client: DeviceClient<P>, config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        let (snapshot, _) = watch::channel(None);
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client: RwLock::new(Some(Arc::new(client))),
                poll_gate: tokio::sync::Mutex::new(()),
                discovery_gate: tokio::sync::Mutex::new(()),
                health: RwLock::new(Health::default()),
                snapshot,
                shutdown,
                task: Mutex::new(None),
                callbacks: CallbackRegistry::new(),
            }),
        })
    }

    /// Returns the coordinator configuration.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // ========== Consumer contract ==========

    /// Returns the latest snapshot, if any poll has succeeded.
    #[must_use]
    pub fn current_snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    /// Returns a receiver notified on every snapshot replacement.
    #[must_use]
    pub fn watch_snapshot(&self) -> watch::Receiver<Option<Arc<StatusSnapshot>>> {
        self.inner.snapshot.subscribe()
    }

    /// Returns `true` while polling and the last success is within the
    /// availability window.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.inner
            .health
            .read()
            .is_available(self.inner.config.availability_window())
    }

    /// Re-evaluates availability against the clock and notifies
    /// availability subscribers if it flipped.
    ///
    /// The poll task calls this on every tick, so an expired availability
    /// window is reported even when no poll changes the health record.
    /// Returns the current availability.
    pub fn check_availability(&self) -> bool {
        self.transition(|_| ());
        self.is_available()
    }

    /// Returns `true` if the last poll failed and the snapshot is outdated.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.inner.health.read().stale
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.inner.health.read().state
    }

    /// Returns the number of consecutive failed polls.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.health.read().consecutive_failures
    }

    /// Returns the message of the last failure, cleared by a success.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.health.read().last_error.clone()
    }

    /// Returns the cached device identifier.
    #[must_use]
    pub fn device_id(&self) -> Option<DeviceId> {
        self.inner.health.read().device.clone()
    }

    /// Returns `true` once [`Coordinator::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    // ========== Discovery ==========

    /// Returns the device identifier, discovering it if needed.
    ///
    /// Before the first success, discovery runs under the configured
    /// [`RetryPolicy`]; exhausting it degrades the coordinator. Later
    /// rediscoveries (after a protocol-level poll failure) make a single
    /// attempt and leave retrying to the next tick.
    ///
    /// # Errors
    ///
    /// Returns `Error::Discovery` if no identifier could be obtained and
    /// `Error::ShutDown` if the coordinator is shut down.
    pub async fn ensure_discovered(&self) -> Result<DeviceId> {
        if let Some(device) = self.cached_device()? {
            return Ok(device);
        }

        let _discovery = self.inner.discovery_gate.lock().await;
        if let Some(device) = self.cached_device()? {
            return Ok(device);
        }

        let client = self.client()?;
        let policy = &self.inner.config.retry;
        let initial = self.state().needs_discovery();
        let mut attempt: u32 = 0;

        loop {
            if initial
                && self
                    .transition(|h| h.state = CoordinatorState::Discovering { attempt })
                    .is_none()
            {
                return Err(Error::ShutDown);
            }

            match client.discover_device().await {
                Ok(device) => {
                    tracing::info!(device_id = %device, attempt, "Device discovered");
                    let cached = device.clone();
                    return self
                        .transition(move |h| {
                            h.device = Some(cached);
                            if h.state.needs_discovery() {
                                h.state = CoordinatorState::Polling;
                            }
                        })
                        .map(|()| device)
                        .ok_or(Error::ShutDown);
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "Discovery failed");
                    if !initial || !policy.should_retry(attempt) {
                        if initial {
                            let message = err.to_string();
                            self.transition(move |h| {
                                h.last_error = Some(message);
                                h.state = CoordinatorState::Degraded {
                                    cause: DegradedCause::Discovery,
                                };
                            });
                        }
                        return Err(err);
                    }
                    let delay = policy.delay_for_attempt(attempt);
                    tracing::debug!(delay_ms = delay.as_millis(), "Retrying discovery");
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = self.stopped() => return Err(Error::ShutDown),
                    }
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    /// Probes the heater once, for setup flows.
    ///
    /// Does not change the coordinator state.
    ///
    /// # Errors
    ///
    /// Returns `Error::Discovery` when the heater cannot be reached or lists
    /// no device, and `Error::ShutDown` after shutdown.
    pub async fn test_connection(&self) -> Result<DeviceId> {
        let client = self.client()?;
        let device = client.discover_device().await?;
        tracing::info!(device_id = %device, "Connection test succeeded");
        Ok(device)
    }

    // ========== Polling ==========

    /// Runs one poll now.
    ///
    /// A call made while another poll is in flight returns
    /// [`PollOutcome::Skipped`] without waiting.
    pub async fn refresh(&self) -> PollOutcome {
        if self.is_shut_down() {
            return PollOutcome::ShutDown;
        }
        let Ok(_gate) = self.inner.poll_gate.try_lock() else {
            tracing::debug!("Poll already in flight, skipping");
            return PollOutcome::Skipped;
        };

        tokio::select! {
            biased;
            () = self.stopped() => PollOutcome::ShutDown,
            outcome = self.poll_once() => outcome,
        }
    }

    async fn poll_once(&self) -> PollOutcome {
        let device = match self.ensure_discovered().await {
            Ok(device) => device,
            Err(Error::ShutDown) => return PollOutcome::ShutDown,
            Err(err) => return self.record_failure(&err),
        };
        let Ok(client) = self.client() else {
            return PollOutcome::ShutDown;
        };

        match client.poll(&device).await {
            Ok(snapshot) => self.record_success(snapshot),
            Err(err) => {
                if !err.is_transport() {
                    tracing::info!(device_id = %device, "Dropping cached device identifier");
                    self.inner.health.write().device = None;
                }
                self.record_failure(&err)
            }
        }
    }

    /// Publishes `snapshot` unless shutdown has begun.
    ///
    /// The shutdown check and the snapshot replacement both happen under the
    /// health lock, so a poll finishing during `shutdown()` cannot publish
    /// or leave the `ShutDown` state.
    fn record_success(&self, snapshot: StatusSnapshot) -> PollOutcome {
        let snapshot = Arc::new(snapshot);
        let published = self.transition(|h| {
            if *self.inner.shutdown.borrow() {
                return None;
            }
            let previous = self.inner.snapshot.send_replace(Some(Arc::clone(&snapshot)));
            h.consecutive_failures = 0;
            h.stale = false;
            h.last_success = Some(Instant::now());
            h.last_error = None;
            h.state = CoordinatorState::Polling;
            Some(previous)
        });
        let Some(Some(previous)) = published else {
            tracing::debug!("Discarding snapshot polled during shutdown");
            return PollOutcome::ShutDown;
        };

        tracing::debug!(
            fields = snapshot.len(),
            changed = previous
                .as_deref()
                .map_or(snapshot.len(), |p| snapshot.changed_fields(p).len()),
            "Snapshot updated"
        );
        self.inner
            .callbacks
            .dispatch_snapshot(&snapshot, previous.as_deref());
        PollOutcome::Updated
    }

    fn record_failure(&self, err: &Error) -> PollOutcome {
        let threshold = self.inner.config.failure_threshold;
        let message = err.to_string();
        let recorded = self.transition(move |h| {
            if *self.inner.shutdown.borrow() {
                return None;
            }
            h.consecutive_failures = h.consecutive_failures.saturating_add(1);
            h.stale = true;
            h.last_error = Some(message);
            if h.consecutive_failures >= threshold && h.state.is_polling() {
                h.state = CoordinatorState::Degraded {
                    cause: DegradedCause::ConsecutiveFailures,
                };
            }
            Some(h.consecutive_failures)
        });
        let Some(Some(failures)) = recorded else {
            return PollOutcome::ShutDown;
        };
        tracing::warn!(failures, threshold, error = %err, "Poll failed");
        PollOutcome::Failed
    }

    // ========== Control writes ==========

    /// Sets the room temperature setpoint.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `celsius` is outside 5.0-35.0, before
    /// any request is made, or the error of the write itself.
    pub async fn set_target_temperature(&self, celsius: f32) -> Result<()> {
        let setpoint = RoomTemperature::new(celsius)?;
        self.write(
            Field::TargetTemperature,
            FieldValue::Temperature(setpoint.celsius()),
        )
        .await
    }

    /// Sets the hot water setpoint.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `celsius` is outside 20.0-60.0, before
    /// any request is made, or the error of the write itself.
    pub async fn set_water_temperature(&self, celsius: f32) -> Result<()> {
        let setpoint = WaterTemperature::new(celsius)?;
        self.write(
            Field::TargetTemperatureCwu,
            FieldValue::Temperature(setpoint.celsius()),
        )
        .await
    }

    /// Sets the operating mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a mode without a device code, or the
    /// error of the write itself.
    pub async fn set_mode(&self, mode: OperatingMode) -> Result<()> {
        self.write(Field::Mode, FieldValue::Mode(mode)).await
    }

    /// Writes `value` to `field` and requests an immediate refresh.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` before any request if the value is
    /// rejected, `Error::ShutDown` after shutdown, or the discovery or write
    /// error.
    pub async fn write(&self, field: Field, value: FieldValue) -> Result<()> {
        let client = self.client()?;
        client.encode(field, &value)?;
        let device = self.ensure_discovered().await?;
        client.write(&device, field, value).await?;
        tracing::info!(device_id = %device, field = %field, value = %value, "Field written");

        let outcome = self.refresh().await;
        tracing::debug!(?outcome, "Refresh after write");
        Ok(())
    }

    // ========== Lifecycle ==========

    /// Stops polling and releases the client.
    ///
    /// Waits up to the configured shutdown timeout for the poll task and any
    /// in-flight poll, then aborts. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        if self.inner.shutdown.send_replace(true) {
            return;
        }
        tracing::info!("Shutting down coordinator");
        self.transition(|h| h.state = CoordinatorState::ShutDown);

        let timeout = self.inner.config.shutdown_timeout;
        let task = self.inner.task.lock().take();
        if let Some(mut task) = task
            && tokio::time::timeout(timeout, &mut task).await.is_err()
        {
            tracing::warn!("Poll task did not stop in time, aborting");
            task.abort();
        }

        if tokio::time::timeout(timeout, self.inner.poll_gate.lock())
            .await
            .is_err()
        {
            tracing::warn!("In-flight poll did not finish in time");
        }

        let client = self.inner.client.write().take();
        if let Some(client) = client {
            match Arc::try_unwrap(client) {
                Ok(client) => client.close(),
                Err(_) => tracing::debug!("Client still in use, released when the last call ends"),
            }
        }
        self.inner.callbacks.clear();
    }

    // ========== Internals ==========

    fn client(&self) -> Result<Arc<DeviceClient<P>>> {
        self.inner.client.read().clone().ok_or(Error::ShutDown)
    }

    fn cached_device(&self) -> Result<Option<DeviceId>> {
        let health = self.inner.health.read();
        if health.state.is_shut_down() {
            return Err(Error::ShutDown);
        }
        Ok(health.device.clone())
    }

    /// Resolves once shutdown has been requested.
    async fn stopped(&self) {
        let mut rx = self.inner.shutdown.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Applies `update` to the health record, then notifies state and
    /// availability subscribers outside the lock.
    ///
    /// Returns `None` without applying `update` once the state is
    /// `ShutDown`, which is terminal.
    fn transition<R>(&self, update: impl FnOnce(&mut Health) -> R) -> Option<R> {
        let window = self.inner.config.availability_window();
        let (result, state_change, availability_change) = {
            let mut health = self.inner.health.write();
            if health.state.is_shut_down() {
                return None;
            }
            let before = health.state;
            let result = update(&mut health);
            let state_change = (health.state != before).then_some(health.state);
            let available = health.is_available(window);
            let availability_change = (available != health.reported_available).then(|| {
                health.reported_available = available;
                available
            });
            (result, state_change, availability_change)
        };

        if let Some(state) = state_change {
            tracing::info!(%state, "Coordinator state changed");
            self.inner.callbacks.dispatch_state(state);
        }
        if let Some(available) = availability_change {
            if available {
                tracing::info!("Heater available");
            } else {
                tracing::warn!("Heater unavailable");
            }
            self.inner.callbacks.dispatch_availability(available);
        }
        Some(result)
    }
}

impl<P: Protocol + 'static> Subscribable for Coordinator<P> {
    fn on_snapshot<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StatusSnapshot) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_snapshot(callback)
    }

    fn on_field_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Field, Option<FieldValue>) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_field_changed(callback)
    }

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(CoordinatorState) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_state_changed(callback)
    }

    fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_availability_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.callbacks.unsubscribe(id)
    }
}

impl<P: Protocol + 'static> std::fmt::Debug for Coordinator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let health = self.inner.health.read();
        f.debug_struct("Coordinator")
            .field("state", &health.state)
            .field("device", &health.device)
            .field("consecutive_failures", &health.consecutive_failures)
            .field("stale", &health.stale)
            .field("callbacks", &self.inner.callbacks)
            .finish_non_exhaustive()
    }
}
