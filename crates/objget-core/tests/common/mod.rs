#![allow(dead_code)]

pub mod mock_transport;
pub mod range_server;

use std::time::Duration;

use objget_core::retry::RetryPolicy;

/// Deterministic test payload.
pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

/// Bounded retries with millisecond backoff.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts: Some(max_attempts),
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    }
}
