//! Retry logic with exponential backoff for transient errors.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay_secs` - Seconds until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64);
}

/// Callback that reports retries as warnings through `log`.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64) {
        log::warn!(
            "{} (attempt {attempt}/{max_attempts}): {error}. Retrying in {delay_secs}s",
            error.category().description()
        );
    }
}

/// Run `operation` until it succeeds, fails for good, or runs out of
/// attempts.
///
/// Only [`Error::is_retryable`] failures are tried again. A busy YunoHost
/// refused the command before changing anything, so repeating it is safe.
/// The error of the final attempt is returned unchanged.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        let error = match operation() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        attempt += 1;
        if !error.is_retryable() || attempt >= max_attempts {
            if attempt > 1 {
                log::debug!("giving up after {attempt} attempts: {error}");
            }
            return Err(error);
        }

        let delay = config.delay_for_attempt(attempt - 1);
        if let Some(cb) = callback {
            cb.on_retry(attempt, max_attempts, &error, delay.as_secs());
        }
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_with_retry_success_first_try() {
        let result = with_retry(&RetryConfig::no_retry(), None, || Ok::<_, Error>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_with_retry_non_retryable_error() {
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&fast_config(3), None, || {
            attempts.set(attempts.get() + 1);
            Err(Error::Validation {
                message: "Unknown group: admins2".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let attempts = Cell::new(0);

        let result = with_retry(&fast_config(3), None, || {
            let current = attempts.get();
            attempts.set(current + 1);
            if current < 2 {
                Err(Error::Busy {
                    message: "Another YunoHost command is running".to_string(),
                })
            } else {
                Ok("done")
            }
        });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_all_attempts_fail() {
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&fast_config(3), None, || {
            attempts.set(attempts.get() + 1);
            Err(Error::Network {
                message: "timed out".to_string(),
            })
        });

        assert!(matches!(result, Err(Error::Network { .. })));
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let attempts = Cell::new(0);
        let result = with_retry(&fast_config(0), None, || {
            attempts.set(attempts.get() + 1);
            Ok::<_, Error>("ran")
        });
        assert_eq!(result.unwrap(), "ran");
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_callback_invoked_between_attempts() {
        struct CountingCallback(Cell<u32>);
        impl RetryCallback for CountingCallback {
            fn on_retry(&self, _: u32, _: u32, _: &Error, _: u64) {
                self.0.set(self.0.get() + 1);
            }
        }

        let callback = CountingCallback(Cell::new(0));
        let _: Result<()> = with_retry(&fast_config(3), Some(&callback), || {
            Err(Error::Busy {
                message: "locked".to_string(),
            })
        });

        assert_eq!(callback.0.get(), 2);
    }
}
