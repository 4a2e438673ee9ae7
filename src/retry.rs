//! Retry policy for model API calls.
//!
//! Every generation and verification call goes through [`run_with_retry`],
//! driven by a [`RetryPolicy`] value and an error classifier. The classifier
//! decides per error whether another attempt can help (`Disposition::Retry`)
//! or the error is permanent (`Disposition::Fatal`) — auth failures and
//! malformed requests never burn retry budget.
//!
//! Backoff is exponential: `base_delay * multiplier^(attempt-1)`. With the
//! defaults (5 attempts, 5 s base, ×2) the waits are 5 s, 10 s, 20 s, 40 s
//! before the fifth and final attempt.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::StudyError;

/// How an error should be handled by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient; wait and try again.
    Retry,
    /// Permanent; surface immediately without further attempts.
    Fatal,
}

/// Retry schedule for a model call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Must be ≥ 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Backoff multiplier applied after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given failed attempt (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        self.base_delay.mul_f64(factor)
    }
}

/// Classify a [`StudyError`] from a model call.
///
/// Rate limits, blocked/empty responses, and transport errors are transient;
/// auth failures and everything else are permanent.
pub fn classify_model_error(err: &StudyError) -> Disposition {
    match err {
        StudyError::RateLimited { .. }
        | StudyError::ResponseBlocked { .. }
        | StudyError::ApiError { .. } => Disposition::Retry,
        StudyError::AuthFailed { .. } => Disposition::Fatal,
        _ => Disposition::Fatal,
    }
}

/// Run `op` under the retry policy.
///
/// `stage` names the call for logs and the final [`StudyError::RetriesExhausted`].
/// `classify` maps each failure to a [`Disposition`]; a `Fatal` error is
/// returned as-is without consuming the remaining budget.
pub async fn run_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    stage: &'static str,
    classify: fn(&StudyError) -> Disposition,
    mut op: F,
) -> Result<T, StudyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StudyError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_detail = String::new();

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if classify(&err) == Disposition::Fatal {
                    return Err(err);
                }
                last_detail = err.to_string();
                if attempt < attempts {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        stage,
                        attempt,
                        max_attempts = attempts,
                        delay_secs = delay.as_secs_f64(),
                        error = %err,
                        "transient model error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(StudyError::RetriesExhausted {
        stage,
        attempts,
        detail: last_detail,
    })
}
