//! Retry policy for provisioning-tool invocations.
//!
//! Failures are classified by matching the error text against a set of
//! regular expressions. Only matching failures are retried; anything else
//! surfaces after the first attempt.

use crate::error::{HarnessError, Result};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const SLEEP_SLICE_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct RetryablePattern {
    regex: Regex,
    message: String,
}

impl RetryablePattern {
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
    retryable: Vec<RetryablePattern>,
}

impl RetryPolicy {
    /// A single attempt, nothing retryable.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            retryable: Vec::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: &str, message: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            HarnessError::Config(format!("Invalid retryable pattern '{}': {}", pattern, e))
        })?;
        self.retryable.push(RetryablePattern {
            regex,
            message: message.to_string(),
        });
        Ok(self)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn patterns(&self) -> &[RetryablePattern] {
        &self.retryable
    }

    /// Returns the message of the first pattern matching `error_text`.
    pub fn classify(&self, error_text: &str) -> Option<&str> {
        self.retryable
            .iter()
            .find(|p| p.regex.is_match(error_text))
            .map(|p| p.message.as_str())
    }
}

/// Run `operation` under `policy`.
///
/// At most `max_retries + 1` attempts are made. When `interrupt` is set the
/// loop stops before the next attempt and returns [`HarnessError::Interrupted`].
pub fn with_retry<T, F>(
    description: &str,
    policy: &RetryPolicy,
    interrupt: Option<&AtomicBool>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = policy.max_retries + 1;

    for attempt in 1..=max_attempts {
        if is_interrupted(interrupt) {
            return Err(HarnessError::Interrupted);
        }

        let err = match operation() {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if matches!(err, HarnessError::Interrupted) {
            return Err(err);
        }

        let text = err.to_string();
        let Some(reason) = policy.classify(&text) else {
            tracing::debug!("{} failed with a non-retryable error", description);
            return Err(err);
        };

        if attempt == max_attempts {
            tracing::warn!("{} failed after {} attempt(s)", description, attempt);
            return Err(err);
        }

        tracing::warn!(
            "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
            description,
            attempt,
            max_attempts,
            reason,
            policy.delay
        );
        interruptible_sleep(policy.delay, interrupt);
    }

    // max_attempts is at least one, so the loop always returns.
    Err(HarnessError::Provision(format!(
        "{} made no attempts",
        description
    )))
}

fn is_interrupted(interrupt: Option<&AtomicBool>) -> bool {
    interrupt.is_some_and(|flag| flag.load(Ordering::SeqCst))
}

fn interruptible_sleep(total: Duration, interrupt: Option<&AtomicBool>) {
    let slice = Duration::from_millis(SLEEP_SLICE_MS);
    let mut remaining = total;
    while !remaining.is_zero() {
        if is_interrupted(interrupt) {
            return;
        }
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn transient_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::ZERO)
            .with_pattern("(?i)RequestLimitExceeded|timeout", "Transient AWS error")
            .unwrap()
    }

    #[test]
    fn test_non_matching_error_fails_after_one_attempt() {
        let policy = transient_policy(3);
        let calls = Cell::new(0);

        let result: Result<()> = with_retry("apply", &policy, None, || {
            calls.set(calls.get() + 1);
            Err(HarnessError::Provision("InvalidParameterValue".to_string()))
        });

        assert!(matches!(result, Err(HarnessError::Provision(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_matching_error_uses_full_budget() {
        let policy = transient_policy(3);
        let calls = Cell::new(0);

        let result: Result<()> = with_retry("apply", &policy, None, || {
            calls.set(calls.get() + 1);
            Err(HarnessError::Provision("RequestLimitExceeded".to_string()))
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("RequestLimitExceeded"));
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_recovers_after_transient_failure() {
        let policy = transient_policy(2);
        let calls = Cell::new(0);

        let result = with_retry("init", &policy, None, || {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(HarnessError::Provision("connection timeout".to_string()))
            } else {
                Ok("done")
            }
        });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_no_policy_means_single_attempt() {
        let calls = Cell::new(0);
        let result: Result<()> = with_retry("apply", &RetryPolicy::none(), None, || {
            calls.set(calls.get() + 1);
            Err(HarnessError::Provision("timeout".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_interrupt_stops_before_first_attempt() {
        let flag = AtomicBool::new(true);
        let calls = Cell::new(0);
        let result: Result<()> = with_retry("apply", &transient_policy(3), Some(&flag), || {
            calls.set(calls.get() + 1);
            Ok(())
        });
        assert!(matches!(result, Err(HarnessError::Interrupted)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = RetryPolicy::none().with_pattern("(", "bad").unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_classify_returns_first_matching_message() {
        let policy = RetryPolicy::new(1, Duration::ZERO)
            .with_pattern("throttl", "Throttled")
            .unwrap()
            .with_pattern(".*", "Anything")
            .unwrap();
        assert_eq!(policy.classify("request throttled"), Some("Throttled"));
        assert_eq!(policy.classify("boom"), Some("Anything"));
    }
}
