//! Timeout and bounded exponential backoff around provider calls.

use std::{future::Future, time::Duration};

use crate::provider::ProviderError;

/// How provider calls are bounded and retried.
///
/// Every attempt is wrapped in [`tokio::time::timeout`]. Transient failures
/// (see [`ProviderError::is_transient`]) are retried until `attempts` is
/// exhausted, sleeping `base_delay`, `2 × base_delay`, ... between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub attempts:   u32,
  pub base_delay: Duration,
  pub timeout:    Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempts:   3,
      base_delay: Duration::from_millis(500),
      timeout:    Duration::from_secs(30),
    }
  }
}

impl RetryPolicy {
  /// A single attempt with the given timeout.
  pub fn once(timeout: Duration) -> Self {
    Self { attempts: 1, base_delay: Duration::ZERO, timeout }
  }

  fn delay_before(&self, attempt: u32) -> Duration {
    // attempt is 1-based; no delay before the first try.
    self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(2))
  }

  /// Run `op` under this policy. `what` names the call in log output.
  pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ProviderError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
  {
    let attempts = self.attempts.max(1);
    let mut attempt = 1;
    loop {
      let result = match tokio::time::timeout(self.timeout, op()).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(self.timeout)),
      };

      match result {
        Ok(value) => return Ok(value),
        Err(e) if e.is_transient() && attempt < attempts => {
          attempt += 1;
          let delay = self.delay_before(attempt);
          tracing::warn!(call = what, attempt, ?delay, error = %e, "retrying provider call");
          tokio::time::sleep(delay).await;
        }
        Err(e) => return Err(e),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use super::*;

  fn fast(attempts: u32) -> RetryPolicy {
    RetryPolicy {
      attempts,
      base_delay: Duration::from_millis(1),
      timeout: Duration::from_millis(200),
    }
  }

  #[test]
  fn backoff_doubles() {
    let p = RetryPolicy::default();
    assert_eq!(p.delay_before(2), Duration::from_millis(500));
    assert_eq!(p.delay_before(3), Duration::from_millis(1000));
    assert_eq!(p.delay_before(4), Duration::from_millis(2000));
  }

  #[tokio::test]
  async fn transient_errors_are_retried_until_success() {
    let calls = &AtomicU32::new(0);
    let out = fast(3)
      .run("test", move || async move {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n < 3 {
          Err(ProviderError::Http { status: 503, body: "busy".into() })
        } else {
          Ok(n)
        }
      })
      .await
      .unwrap();
    assert_eq!(out, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn retries_stop_at_attempt_limit() {
    let calls = &AtomicU32::new(0);
    let err = fast(3)
      .run("test", move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(ProviderError::Transport("refused".into()))
      })
      .await
      .unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn permanent_errors_fail_immediately() {
    let calls = &AtomicU32::new(0);
    let err = fast(3)
      .run("test", move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(ProviderError::Http { status: 400, body: "bad".into() })
      })
      .await
      .unwrap_err();
    assert!(matches!(err, ProviderError::Http { status: 400, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn slow_calls_time_out() {
    let policy = RetryPolicy::once(Duration::from_millis(10));
    let err = policy
      .run("test", || async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, ProviderError>(())
      })
      .await
      .unwrap_err();
    assert!(matches!(err, ProviderError::Timeout(_)));
  }
}
