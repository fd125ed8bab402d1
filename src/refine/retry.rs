use std::future::Future;
use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How many times to try, and how long to wait before each retry.
pub trait RetryPolicy: Send + Sync {
    fn max_attempts(&self) -> u32;

    /// Wait after the failed `attempt` (1-based) before the next one.
    fn delay(&self, attempt: u32) -> Duration;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl FixedDelay {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

impl RetryPolicy for FixedDelay {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Doubles the wait after every failure, capped at 30 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub max_attempts: u32,
    pub initial: Duration,
}

impl ExponentialBackoff {
    pub fn new(max_attempts: u32, initial: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial,
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

/// Which refinement failures are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryOn {
    /// Transport and format failures alike.
    #[default]
    AllFailures,
    TransportOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Runs `op` until it succeeds, `should_retry` declines an error, or the
/// policy's attempts are used up. The last error is returned on failure.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut, P>(
    policy: &dyn RetryPolicy,
    should_retry: P,
    mut op: F,
) -> Result<Retried<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts().max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    log::debug!("Succeeded on attempt {}", attempt);
                }
                return Ok(Retried {
                    value,
                    attempts: attempt,
                });
            }
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                let wait = policy.delay(attempt);
                log::warn!(
                    "Attempt {}/{} failed, retrying in {:?}: {}",
                    attempt,
                    max_attempts,
                    wait,
                    e
                );
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
