use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use backon::{ExponentialBuilder, Retryable, Sleeper};
use crate::api::ApiResponse;
use crate::errors::TransportError;

// No single wait is longer than this
const MAX_DELAY: Duration = Duration::from_secs(60 * 60);
const MAX_FACTOR: f32 = 16.0;

/// How rate limited requests are retried
///
/// The default allows 3 retries after the first attempt, waiting
/// 2s, 4s and 8s before each of them. Waits are capped at one hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
  max_retries: usize,
  min_delay: Duration,
  factor: f32,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 3,
      min_delay: Duration::from_secs(2),
      factor: 2.0,
    }
  }
}

impl RetryPolicy {
  /// Number of retries after the first attempt
  pub fn max_retries(&self) -> usize {
    self.max_retries
  }

  /// Total number of attempts, including the first
  pub fn max_attempts(&self) -> usize {
    self.max_retries.saturating_add(1)
  }

  /// Set the number of retries after the first attempt
  pub fn with_max_retries(mut self, max_retries: usize) -> Self {
    self.max_retries = max_retries;
    self
  }

  /// Set the wait before the first retry
  pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
    self.min_delay = min_delay.min(MAX_DELAY);
    self
  }

  /// Set the multiplier applied to the wait after each retry
  ///
  /// Negative or NaN factors fall back to 1 (a constant wait) and
  /// factors above 16 are clamped.
  pub fn with_factor(mut self, factor: f32) -> Self {
    self.factor = if factor.is_nan() || factor < 0.0 {
      1.0
    } else {
      factor.min(MAX_FACTOR)
    };
    self
  }

  /// Wait before the given retry (1-indexed)
  pub fn delay_for(&self, retry: usize) -> Duration {
    if retry <= 1 {
      return self.min_delay;
    }
    let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
    let secs = self.min_delay.as_secs_f64() * f64::from(self.factor).powi(exponent);
    match Duration::try_from_secs_f64(secs) {
      Ok(delay) => delay.min(MAX_DELAY),
      Err(_) => MAX_DELAY,
    }
  }

  /// The backoff schedule, without jitter
  pub fn backoff(&self) -> ExponentialBuilder {
    ExponentialBuilder::default()
      .with_min_delay(self.min_delay)
      .with_factor(self.factor)
      .with_max_delay(MAX_DELAY)
      .with_max_times(self.max_retries)
  }
}

enum Attempt {
  RateLimited(ApiResponse),
  Transport(TransportError),
}

/// Send a request until it is not rate limited or the policy runs out
///
/// A 429 response is retried after the policy's delay with the same
/// request. Any other status ends the loop and is returned as is. When
/// the retries are used up the last 429 response is returned. Transport
/// faults are never retried.
pub async fn send_with_retry<S, F, Fut>(policy: &RetryPolicy, sleeper: S, mut send: F) -> Result<ApiResponse, TransportError>
where
  S: Sleeper,
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<ApiResponse, TransportError>>,
{
  let attempts = AtomicUsize::new(0);
  let result = (|| {
    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
    log::debug!("Sending request, attempt {} of {}", attempt, policy.max_attempts());
    let response = send();
    async move {
      match response.await {
        Ok(response) if response.is_rate_limited() => Err(Attempt::RateLimited(response)),
        Ok(response) => Ok(response),
        Err(e) => Err(Attempt::Transport(e)),
      }
    }
  })
    .retry(policy.backoff())
    .sleep(sleeper)
    .when(|e| matches!(e, Attempt::RateLimited(_)))
    .notify(|_, delay: Duration| {
      log::warn!(
        "Rate limited (429). Retrying in {}ms (retry {} of {})",
        delay.as_millis(),
        attempts.load(Ordering::SeqCst),
        policy.max_retries()
      );
    })
    .await;

  match result {
    Ok(response) => Ok(response),
    Err(Attempt::RateLimited(response)) => {
      log::warn!("Still rate limited after {} attempts, giving up", attempts.load(Ordering::SeqCst));
      Ok(response)
    },
    Err(Attempt::Transport(e)) => Err(e),
  }
}
