//! Fixed-delay retry policy for credential store calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{PlatformError, PlatformResult};

/// Default number of attempts: the first call plus one retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Bounded retry with a fixed pause and no jitter.
///
/// Calls are never cancelled once started; the policy only decides whether to
/// start another one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Pause before each retry.
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Default attempts with no pause in between.
    pub fn immediate() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Duration::ZERO)
    }

    /// Run `attempt` until it succeeds, attempts run out, or `should_retry`
    /// declines the failure.
    ///
    /// `attempt` receives the 1-based attempt number. `should_retry` sees every
    /// failure that still has an attempt left after it.
    pub async fn run<T, F, Fut, R>(&self, mut attempt: F, mut should_retry: R) -> PlatformResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = PlatformResult<T>>,
        R: FnMut(u32, &PlatformError) -> bool,
    {
        let mut n = 1;
        loop {
            match attempt(n).await {
                Ok(value) => return Ok(value),
                Err(err) if n < self.max_attempts && should_retry(n, &err) => {
                    self.pause().await;
                    n += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{ser, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(d.as_millis())
            .map_err(|_| ser::Error::custom("retry delay exceeds u64 milliseconds"))?;
        s.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ErrorCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failing_until(
        ok_on: u32,
        calls: &AtomicU32,
    ) -> impl FnMut(u32) -> std::future::Ready<PlatformResult<u32>> + '_ {
        move |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            if n >= ok_on {
                std::future::ready(Ok(n))
            } else {
                std::future::ready(Err(PlatformError::from_code(ErrorCode::Io)))
            }
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_time() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::immediate()
            .run(failing_until(1, &calls), |_, _| true)
            .await;
        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_one_retry_then_success() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::immediate()
            .run(failing_until(2, &calls), |_, _| true)
            .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::immediate()
            .run(failing_until(10, &calls), |_, _| true)
            .await;
        assert_eq!(result.unwrap_err().code, ErrorCode::Io);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_predicate_can_refuse() {
        let calls = AtomicU32::new(0);
        let mut seen = Vec::new();
        let result = RetryPolicy::immediate()
            .run(failing_until(2, &calls), |n, err| {
                seen.push((n, err.code));
                false
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen, vec![(1, ErrorCode::Io)]);
    }

    #[tokio::test]
    async fn test_predicate_not_consulted_on_last_attempt() {
        let calls = AtomicU32::new(0);
        let mut consulted = 0;
        let _ = RetryPolicy::immediate()
            .run(failing_until(10, &calls), |_, _| {
                consulted += 1;
                true
            })
            .await;
        assert_eq!(consulted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_fixed_delay_between_attempts() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let result = RetryPolicy::default()
            .run(failing_until(2, &calls), |_, _| true)
            .await;
        assert_eq!(result, Ok(2));
        let elapsed = start.elapsed();
        assert!(elapsed >= DEFAULT_RETRY_DELAY, "waited {:?}", elapsed);
        assert!(elapsed < DEFAULT_RETRY_DELAY * 2, "waited {:?}", elapsed);
    }

    #[test]
    fn test_serde_in_millis() {
        let json = serde_json::to_string(&RetryPolicy::default()).unwrap();
        assert_eq!(json, r#"{"max_attempts":2,"delay_ms":1000}"#);
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts":3,"delay_ms":5}"#).unwrap();
        assert_eq!(policy, RetryPolicy::new(3, Duration::from_millis(5)));
    }

    #[test]
    fn test_oversized_delay_refuses_to_serialize() {
        let policy = RetryPolicy::new(2, Duration::MAX);
        let err = serde_json::to_string(&policy).unwrap_err();
        assert!(err.to_string().contains("retry delay"));

        let largest = RetryPolicy::new(2, Duration::from_millis(u64::MAX));
        let json = serde_json::to_string(&largest).unwrap();
        assert!(json.contains(&u64::MAX.to_string()));
    }
}
