// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error classification and exponential backoff for model calls

use std::{
    future::Future,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio_retry::{RetryIf, strategy::jitter};
use tracing::{debug, warn};

use crate::error::{ClassifiedError, ModelError};

const OFFLINE_MESSAGE: &str = "No internet connection. Please check your network and try again.";
const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";
const UNAUTHORIZED_MESSAGE: &str = "API key is invalid or expired. Please check your settings.";
const FORBIDDEN_MESSAGE: &str = "Access denied. Please check your API key permissions.";
const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again in a few moments.";
const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";
const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Map a raw model failure to a user-facing message and a retry decision
///
/// Rules are evaluated in order and the first match wins.
pub fn classify(error: &ModelError) -> ClassifiedError {
    let (message, retryable) = match error {
        ModelError::Offline { .. } => (OFFLINE_MESSAGE.to_string(), true),
        ModelError::Status { status: 429, .. } => (RATE_LIMITED_MESSAGE.to_string(), true),
        ModelError::Status { status: 401, .. } => (UNAUTHORIZED_MESSAGE.to_string(), false),
        ModelError::Status { status: 403, .. } => (FORBIDDEN_MESSAGE.to_string(), false),
        ModelError::Status { status, .. } if *status >= 500 => {
            (SERVER_ERROR_MESSAGE.to_string(), true)
        }
        ModelError::Timeout { .. } => (TIMEOUT_MESSAGE.to_string(), true),
        ModelError::Decode { .. } => (error.to_string(), false),
        other => {
            let text = other.to_string();
            if text.contains("timeout") {
                (TIMEOUT_MESSAGE.to_string(), true)
            } else if text.trim().is_empty() {
                (UNEXPECTED_MESSAGE.to_string(), true)
            } else {
                (text, true)
            }
        }
    };

    ClassifiedError::new(message, retryable, error.clone())
}

/// Attempt budget and backoff timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Create a policy; at least one attempt is always made
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    /// Total number of tries, including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry, doubled for every following one
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound of the random delay added to every wait
    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    /// Jitter-free waits between attempts: `base_delay * 2^n`
    pub fn scheduled_delays(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|n| self.base_delay.saturating_mul(2_u32.saturating_pow(n)))
            .collect()
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        let max_jitter = self.max_jitter;
        self.scheduled_delays()
            .into_iter()
            .map(move |delay| delay.saturating_add(jitter(max_jitter)))
    }
}

/// Runs a model call under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct Retrier {
    policy: RetryPolicy,
}

impl Retrier {
    /// Create a retrier with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `operation` until it succeeds, fails with a non-retryable error
    /// or runs out of attempts
    ///
    /// Every failure is classified. The last classified error is returned when
    /// the attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ModelError>>,
    {
        let max_attempts = self.policy.max_attempts;
        let attempts = AtomicU32::new(0);

        let result = RetryIf::start(
            self.policy.strategy(),
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                let call = operation();
                async move { call.await.map_err(|e| classify(&e)) }
            },
            |error: &ClassifiedError| {
                let attempt = attempts.load(Ordering::Relaxed);
                if error.is_retryable() && attempt < max_attempts {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %error,
                        cause = %error.cause(),
                        "Model request failed, retrying"
                    );
                }
                error.is_retryable()
            },
        )
        .await;

        if let Err(ref error) = result {
            debug!(
                attempts = attempts.load(Ordering::Relaxed),
                retryable = error.is_retryable(),
                error = %error,
                "Model request gave up"
            );
        }

        result
    }
}
