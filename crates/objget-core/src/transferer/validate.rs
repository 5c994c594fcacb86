//! Per-response and per-window checks.

use crate::error::TransferError;
use crate::metadata::ObjectMetadata;
use crate::range::ByteRange;
use crate::strategy::TransferOutcome;

/// A ranged response must carry a Content-Range whose span (and body length)
/// matches the request exactly.
pub(crate) fn check_range_response(
    metadata: &ObjectMetadata,
    requested: ByteRange,
) -> Result<(), TransferError> {
    let content_range = metadata.content_range.ok_or_else(|| {
        TransferError::UnexpectedCloudBehaviour(format!(
            "no Content-Range in response to ranged request {}",
            requested
        ))
    })?;
    let declared = content_range.len().ok_or_else(|| {
        TransferError::UnexpectedCloudBehaviour(format!(
            "range {} not satisfiable (object size {:?})",
            requested, content_range.total
        ))
    })?;
    if declared != requested.len() || content_range.start != Some(requested.start) {
        return Err(TransferError::InvalidRange {
            declared,
            requested,
        });
    }
    if metadata.content_length != requested.len() {
        return Err(TransferError::InvalidRange {
            declared: metadata.content_length,
            requested,
        });
    }
    Ok(())
}

/// Byte count first, then the SHA-1 when one applies to this window.
pub(crate) fn validate_window(
    range: ByteRange,
    outcome: &TransferOutcome,
    expected_sha1: Option<&str>,
) -> Result<(), TransferError> {
    if outcome.bytes_transferred != range.len() {
        return Err(TransferError::TruncatedOutput {
            expected: range.len(),
            received: outcome.bytes_transferred,
        });
    }
    if let Some(expected) = expected_sha1 {
        if !expected.eq_ignore_ascii_case(&outcome.sha1_hex) {
            return Err(TransferError::ChecksumMismatch {
                expected: expected.to_string(),
                actual: outcome.sha1_hex.clone(),
            });
        }
    }
    Ok(())
}
