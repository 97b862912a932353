use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Store call retries
// ============================================================================
//
// Postgres may be briefly unreachable: while it is still starting when the
// binary boots, or mid-batch while the relay writes notifications. Only
// errors that report themselves as transient are repeated.
//
// ============================================================================

/// Doubling delay between attempts, capped at `max_delay`.
#[derive(Clone, Debug)]
pub struct Backoff {
    pub attempts: u32,
    pub first_delay: Duration,
    pub max_delay: Duration,
}

impl Backoff {
    /// Waiting for the database at start-up
    pub fn startup() -> Self {
        Self { attempts: 10, first_delay: Duration::from_millis(500), max_delay: Duration::from_secs(10) }
    }

    /// In-line retries inside one relay batch
    pub fn relay() -> Self {
        Self { attempts: 3, first_delay: Duration::from_millis(50), max_delay: Duration::from_millis(500) }
    }

    /// Pause after the given failed attempt (1-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.first_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Errors for which repeating the same call may succeed.
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Run `call` until it succeeds, fails permanently or runs out of attempts.
/// `call` gets the 1-based attempt number; the last error is returned.
pub async fn retry_transient<F, Fut, T, E>(backoff: &Backoff, operation: &str, mut call: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display + IsTransient,
{
    let mut attempt = 1;
    loop {
        let error = match call(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "Store call recovered");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_transient() || attempt >= backoff.attempts {
            tracing::error!(operation, attempt, error = %error, "Store call failed for good");
            return Err(error);
        }

        let delay = backoff.delay_after(attempt);
        tracing::warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Store call failed, retrying"
        );
        sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(attempts: u32) -> Backoff {
        Backoff { attempts, first_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5) }
    }

    #[tokio::test]
    async fn test_backend_outage_is_ridden_out() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&quick(5), "notification_insert", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(StoreError::Backend("connection refused".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert!(matches!(result, Ok(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unique_violation_is_not_repeated() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&quick(5), "notification_insert", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::UniqueViolation("order_no:SIP-20240309-0E5F6A7B".into())) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_the_last_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&quick(3), "postgres_connect", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Backend("timed out".into())) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_relay_delays_double_up_to_the_cap() {
        let backoff = Backoff::relay();
        assert_eq!(backoff.delay_after(1), Duration::from_millis(50));
        assert_eq!(backoff.delay_after(2), Duration::from_millis(100));
        assert_eq!(backoff.delay_after(5), Duration::from_millis(500));
        assert_eq!(Backoff::startup().delay_after(40), Duration::from_secs(10));
    }
}
