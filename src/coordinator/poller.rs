// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background poll task.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::{Coordinator, PollOutcome};
use crate::protocol::{HttpClient, Protocol};

/// Handle to a running poll task.
///
/// Dropping the handle does not stop polling; call
/// [`PollerHandle::shutdown`] or [`Coordinator::shutdown`].
pub struct PollerHandle<P: Protocol + 'static = HttpClient> {
    coordinator: Coordinator<P>,
}

impl<P: Protocol + 'static> PollerHandle<P> {
    /// Returns the coordinator driven by this task.
    #[must_use]
    pub fn coordinator(&self) -> &Coordinator<P> {
        &self.coordinator
    }

    /// Returns `true` while the poll task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.coordinator
            .inner
            .task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Shuts the coordinator down.
    pub async fn shutdown(self) {
        self.coordinator.shutdown().await;
    }
}

impl<P: Protocol + 'static> std::fmt::Debug for PollerHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl<P: Protocol + 'static> Coordinator<P> {
    /// Starts polling every `poll_interval`, beginning immediately.
    ///
    /// Calling it while a task is already running returns a handle to the
    /// same task. Must be called from within a Tokio runtime.
    #[must_use = "the handle is needed to stop the poll task"]
    pub fn spawn(&self) -> PollerHandle<P> {
        let handle = PollerHandle {
            coordinator: self.clone(),
        };
        if self.is_shut_down() {
            return handle;
        }

        let mut task = self.inner.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return handle;
        }

        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.poll_interval;
        let mut shutdown = self.inner.shutdown.subscribe();

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(interval_ms = period.as_millis(), "Poll task started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = wait_stopped(&mut shutdown) => break,
                }
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let coordinator = Coordinator { inner };
                coordinator.check_availability();
                let outcome = coordinator.refresh().await;
                tracing::trace!(?outcome, "Scheduled poll finished");
                if outcome == PollOutcome::ShutDown {
                    break;
                }
            }

            tracing::debug!("Poll task stopped");
        }));

        handle
    }
}

async fn wait_stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}
