//! Error type shared by the transport, strategies and the transfer orchestrator.

use crate::range::ByteRange;

/// Failure of one request, one window attempt, or a whole object transfer.
///
/// Which of these are retried is decided by [`crate::retry::classify`];
/// integrity failures and network faults are retryable, protocol faults are not.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Fewer (or more) bytes arrived than the declared/requested length.
    #[error("truncated output: expected {expected} bytes, got {received}")]
    TruncatedOutput { expected: u64, received: u64 },

    /// SHA-1 of the received bytes differs from the one the service declared.
    #[error("sha1 checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Server's Content-Range span disagrees with the requested range.
    #[error("invalid range: server declared {declared} bytes for requested range {requested}")]
    InvalidRange { declared: u64, requested: ByteRange },

    /// The service answered in a way the protocol does not allow.
    #[error("unexpected cloud behaviour: {0}")]
    UnexpectedCloudBehaviour(String),

    /// A header the protocol requires was not present.
    #[error("missing response header: {0}")]
    MissingHeader(&'static str),

    /// A header was present but could not be parsed.
    #[error("malformed response header {name}: {value:?}")]
    MalformedHeader { name: &'static str, value: String },

    /// Non-2xx HTTP status.
    #[error("HTTP {status} from {url}")]
    Http { status: u32, url: String },

    /// libcurl failed to issue or complete the request.
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),

    /// Reading the response body failed mid-stream.
    #[error("response stream: {0}")]
    Stream(#[source] std::io::Error),

    /// Writing to or reading back from the destination failed. Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),

    /// The URL factory could not produce a request target.
    #[error("url factory: {0}")]
    UrlFactory(#[source] anyhow::Error),

    /// A multi-stream worker stopped because a sibling failed first.
    #[error("transfer cancelled")]
    Cancelled,
}
