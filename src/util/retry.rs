//! Opt-in retry with exponential backoff and jitter.
//!
//! Nothing in the session store or the executor retries on its own. Callers
//! that want retries wrap a call:
//!
//! ```no_run
//! # use keygate::request::RequestExecutor;
//! # use keygate::util::retry::RetryPolicy;
//! # async fn run(executor: RequestExecutor) -> keygate::error::Result<()> {
//! let profile: serde_json::Value = RetryPolicy::default()
//!     .execute(|| executor.execute("/api/v1/profile", None))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// No retries at all; the operation runs once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Run `operation`, retrying errors for which
    /// [`KeygateError::is_retryable`](crate::error::KeygateError::is_retryable) holds.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= attempts {
                return Err(err);
            }

            tracing::warn!(
                attempt,
                max_attempts = attempts,
                error = %err,
                "retrying after error"
            );

            // 75%..125% of the nominal backoff
            let jitter = 0.75 + rand_factor() * 0.5;
            tokio::time::sleep(backoff.mul_f64(jitter)).await;
            backoff = next_backoff(backoff, self.multiplier, self.max_backoff);
        }
    }
}

fn next_backoff(current: Duration, multiplier: f64, ceiling: Duration) -> Duration {
    Duration::from_secs_f64((current.as_secs_f64() * multiplier).min(ceiling.as_secs_f64()))
}

/// Pseudo-random factor in [0, 1) without pulling in a rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    (hasher.finish() % 10_000) as f64 / 10_000.0
}
