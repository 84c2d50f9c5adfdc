// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Polling and failure-handling settings of a [`Coordinator`](super::Coordinator).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use kospel_lib::{CoordinatorConfig, RetryPolicy};
///
/// let config = CoordinatorConfig::default()
///     .with_poll_interval(Duration::from_secs(60))
///     .with_failure_threshold(5)
///     .with_retry(RetryPolicy::new().with_max_attempts(5));
///
/// assert!(config.validate().is_ok());
/// // Without an explicit window, availability lasts threshold x interval.
/// assert_eq!(config.availability_window(), Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Time between two scheduled polls.
    pub poll_interval: Duration,
    /// Consecutive failures after which the coordinator is degraded.
    pub failure_threshold: u32,
    /// How long a successful poll keeps the heater available.
    ///
    /// `None` means `poll_interval * failure_threshold`.
    pub availability_window: Option<Duration>,
    /// How long `shutdown()` waits for the poll task before aborting it.
    pub shutdown_timeout: Duration,
    /// Retry policy for the initial discovery.
    pub retry: RetryPolicy,
}

impl CoordinatorConfig {
    /// Default poll interval.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
    /// Default failure threshold.
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
    /// Default shutdown timeout.
    pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the failure threshold.
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets an explicit availability window.
    #[must_use]
    pub fn with_availability_window(mut self, window: Duration) -> Self {
        self.availability_window = Some(window);
        self
    }

    /// Sets the shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the discovery retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the effective availability window.
    #[must_use]
    pub fn availability_window(&self) -> Duration {
        self.availability_window
            .unwrap_or_else(|| self.poll_interval.saturating_mul(self.failure_threshold))
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for a zero interval, window or timeout, a zero
    /// threshold, or an invalid retry policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("poll_interval"));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroCount("failure_threshold"));
        }
        if self.availability_window.is_some_and(|w| w.is_zero()) {
            return Err(ConfigError::ZeroDuration("availability_window"));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("shutdown_timeout"));
        }
        self.retry.validate()
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            failure_threshold: Self::DEFAULT_FAILURE_THRESHOLD,
            availability_window: None,
            shutdown_timeout: Self::DEFAULT_SHUTDOWN_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded exponential backoff for discovery.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use kospel_lib::RetryPolicy;
///
/// let policy = RetryPolicy::new()
///     .with_max_attempts(4)
///     .with_initial_delay(Duration::from_millis(500))
///     .with_max_delay(Duration::from_secs(2));
///
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
/// assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(2));
/// assert!(policy.should_retry(2));
/// assert!(!policy.should_retry(3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f32,
}

impl RetryPolicy {
    /// Creates a retry policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that makes a single attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the total number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay after the first failed attempt.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay after the failed attempt `attempt` (zero-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_delay.min(self.max_delay);
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        // Safe: delays are seconds or minutes, far from f32 precision limits
        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        if !delay_ms.is_finite() {
            return self.max_delay;
        }

        // Safe: delay_ms is positive and finite here
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }

    /// Returns `true` if another attempt may follow the failed attempt
    /// `attempt` (zero-based).
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }

    /// Checks the policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ZeroCount` for zero attempts and
    /// `ConfigError::BackoffMultiplier` for a multiplier below 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroCount("max_attempts"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::BackoffMultiplier);
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}
