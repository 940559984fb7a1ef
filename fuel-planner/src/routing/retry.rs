//! Bounded retry with exponential backoff and jitter for upstream calls.
//!
//! Only transient failures (`UpstreamUnavailable`, `RateLimited`) are retried.
//! The budget is small and fixed so a struggling upstream turns into a fast
//! failure rather than a hung request.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use super::error::RouteError;

/// Retry budget for one logical upstream request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay (before jitter).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

/// Exponential delay sequence: base, 2×base, 4×base, ... capped at max.
#[derive(Debug, Clone)]
struct Backoff {
    current: Duration,
    max: Duration,
    jitter_ratio: f64,
}

impl Backoff {
    fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            current: base,
            max: max.max(base),
            jitter_ratio: 0.2,
        }
    }

    /// Delay to wait now; advances the sequence.
    fn next_delay(&mut self) -> Duration {
        let delay = add_jitter(self.current, self.jitter_ratio);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

fn add_jitter(delay: Duration, ratio: f64) -> Duration {
    if !(0.0..=1.0).contains(&ratio) {
        return delay;
    }

    let jitter_ms_max = ((delay.as_millis() as f64) * ratio) as u128;
    if jitter_ms_max == 0 {
        return delay;
    }

    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u128)
        .unwrap_or(0);
    let jitter_ms = now_nanos % (jitter_ms_max + 1);
    delay + Duration::from_millis(jitter_ms as u64)
}

/// Run `op` until it succeeds, fails permanently, or the budget runs out.
///
/// Returns the final result together with the number of attempts made.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> (Result<T, RouteError>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RouteError>>,
{
    let mut backoff = Backoff::new(policy.base_delay, policy.max_delay);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return (Ok(value), attempts),
            Err(e) if e.is_transient() && attempts <= policy.max_retries => {
                let delay = backoff.next_delay();
                warn!(
                    what,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient upstream failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return (Err(e), attempts),
        }
    }
}
