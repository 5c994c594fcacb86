//! Classify transfer errors into retry policy error kinds.

use crate::error::TransferError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a transfer error into an ErrorKind.
pub fn classify(e: &TransferError) -> ErrorKind {
    match e {
        TransferError::TruncatedOutput { .. } => ErrorKind::Truncated,
        TransferError::ChecksumMismatch { .. } => ErrorKind::Corrupted,
        TransferError::Curl(ce) => classify_curl_error(ce),
        TransferError::Http { status, .. } => classify_http_status(*status),
        TransferError::Stream(_) => ErrorKind::Connection,
        TransferError::InvalidRange { .. }
        | TransferError::UnexpectedCloudBehaviour(_)
        | TransferError::MissingHeader(_)
        | TransferError::MalformedHeader { .. }
        | TransferError::Storage(_)
        | TransferError::UrlFactory(_)
        | TransferError::Cancelled => ErrorKind::Other,
    }
}
