//! Retry and backoff policy.
//!
//! Error classification (integrity failures, timeouts, throttling, connection
//! failures) and backoff decisions, shared by the window loop of the
//! orchestrator.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
