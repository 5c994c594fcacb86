//! Retry loop: run a closure until success or policy says stop.

use crate::error::TransferError;

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` receives the 1-based attempt number. Before sleeping for the backoff
/// delay, `on_retry(attempt, &error, delay)` is called so callers can log.
pub fn run_with_retry<T, F, R>(policy: &RetryPolicy, mut on_retry: R, mut f: F) -> Result<T, TransferError>
where
    F: FnMut(u32) -> Result<T, TransferError>,
    R: FnMut(u32, &TransferError, std::time::Duration),
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        on_retry(attempt, &e, d);
                        std::thread::sleep(d);
                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast(max: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn succeeds_after_retryable_failures() {
        let mut retries = Vec::new();
        let out = run_with_retry(
            &fast(Some(5)),
            |attempt, _, _| retries.push(attempt),
            |attempt| {
                if attempt < 3 {
                    Err(TransferError::TruncatedOutput { expected: 2, received: 1 })
                } else {
                    Ok(attempt)
                }
            },
        );
        assert_eq!(out.unwrap(), 3);
        assert_eq!(retries, vec![1, 2]);
    }

    #[test]
    fn gives_up_at_max_attempts() {
        let mut calls = 0;
        let out: Result<(), _> = run_with_retry(&fast(Some(2)), |_, _, _| {}, |_| {
            calls += 1;
            Err(TransferError::TruncatedOutput { expected: 2, received: 1 })
        });
        assert!(matches!(out, Err(TransferError::TruncatedOutput { .. })));
        assert_eq!(calls, 2);
    }

    #[test]
    fn non_retryable_fails_immediately() {
        let mut calls = 0;
        let out: Result<(), _> = run_with_retry(&fast(None), |_, _, _| {}, |_| {
            calls += 1;
            Err(TransferError::MissingHeader("content-range"))
        });
        assert!(out.is_err());
        assert_eq!(calls, 1);
    }
}
