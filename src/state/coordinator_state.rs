// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifecycle state of the polling coordinator.

use std::fmt;

use serde::Serialize;

/// Why the coordinator is degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedCause {
    /// Discovery retries were exhausted.
    Discovery,
    /// Consecutive poll failures reached the threshold.
    ConsecutiveFailures,
}

/// Lifecycle state of a coordinator.
///
/// ```text
/// Uninitialized -> Discovering -> Polling <-> Degraded
///                       any state -> ShutDown
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CoordinatorState {
    /// No device identifier yet.
    #[default]
    Uninitialized,
    /// Discovery in progress.
    Discovering {
        /// Zero-based attempt number.
        attempt: u32,
    },
    /// Polling normally.
    Polling,
    /// Unavailable; every tick retries.
    Degraded {
        /// What caused the degradation.
        cause: DegradedCause,
    },
    /// Terminal. No further polls run.
    ShutDown,
}

impl CoordinatorState {
    /// Returns `true` for [`CoordinatorState::Polling`].
    #[must_use]
    pub const fn is_polling(&self) -> bool {
        matches!(self, Self::Polling)
    }

    /// Returns `true` for [`CoordinatorState::Degraded`].
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Returns `true` for [`CoordinatorState::ShutDown`].
    #[must_use]
    pub const fn is_shut_down(&self) -> bool {
        matches!(self, Self::ShutDown)
    }

    /// Returns `true` while no device identifier has been obtained.
    #[must_use]
    pub const fn needs_discovery(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Discovering { .. })
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Discovering { attempt } => write!(f, "discovering (attempt {attempt})"),
            Self::Polling => f.write_str("polling"),
            Self::Degraded {
                cause: DegradedCause::Discovery,
            } => f.write_str("degraded (discovery failed)"),
            Self::Degraded {
                cause: DegradedCause::ConsecutiveFailures,
            } => f.write_str("degraded (consecutive failures)"),
            Self::ShutDown => f.write_str("shut down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(CoordinatorState::default().needs_discovery());
        assert!(CoordinatorState::Discovering { attempt: 2 }.needs_discovery());
        assert!(!CoordinatorState::Polling.needs_discovery());
        assert!(
            CoordinatorState::Degraded {
                cause: DegradedCause::Discovery
            }
            .is_degraded()
        );
        assert!(CoordinatorState::ShutDown.is_shut_down());
    }

    #[test]
    fn display() {
        assert_eq!(
            CoordinatorState::Discovering { attempt: 1 }.to_string(),
            "discovering (attempt 1)"
        );
        assert_eq!(
            CoordinatorState::Degraded {
                cause: DegradedCause::ConsecutiveFailures
            }
            .to_string(),
            "degraded (consecutive failures)"
        );
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_value(CoordinatorState::Degraded {
            cause: DegradedCause::Discovery,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "degraded", "cause": "discovery"})
        );
    }
}
