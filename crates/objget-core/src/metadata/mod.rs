//! Object metadata carried by download responses.
//!
//! Every ranged GET returns the object's identity (id, name, type, declared
//! SHA-1, custom `x-bz-info-*` attributes) alongside the body. This module turns
//! those headers into an immutable [`ObjectMetadata`].

mod headers;
mod parse;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::TransferError;

pub use headers::Headers;

pub const CONTENT_LENGTH: &str = "content-length";
pub const CONTENT_TYPE: &str = "content-type";
pub const CONTENT_RANGE: &str = "content-range";
pub const FILE_ID: &str = "x-bz-file-id";
pub const FILE_NAME: &str = "x-bz-file-name";
pub const CONTENT_SHA1: &str = "x-bz-content-sha1";
pub const FILE_INFO_PREFIX: &str = "x-bz-info-";
pub const UPLOAD_TIMESTAMP: &str = "x-bz-upload-timestamp";

/// Custom-info key holding the source file's modification time, in millis.
pub const SRC_LAST_MODIFIED_MILLIS: &str = "src_last_modified_millis";

/// Value of `x-bz-content-sha1` when the service cannot vouch for the content.
pub const UNVERIFIABLE_SHA1: &str = "none";

/// Parsed `Content-Range` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
    /// Full object size, when the server knows it.
    pub total: Option<u64>,
}

impl ContentRange {
    /// Length of the declared span, `None` for the unsatisfied form `*/total`.
    pub fn len(&self) -> Option<u64> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => e.checked_sub(s)?.checked_add(1),
            _ => None,
        }
    }
}

/// Description of an object as declared by one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub file_id: String,
    pub file_name: String,
    pub content_type: String,
    /// Bytes in this response's body (the span length for ranged requests).
    pub content_length: u64,
    /// Lowercase hex SHA-1 of the whole object, or [`UNVERIFIABLE_SHA1`].
    pub content_sha1: String,
    pub file_info: BTreeMap<String, String>,
    pub content_range: Option<ContentRange>,
}

impl ObjectMetadata {
    pub fn from_headers(headers: &Headers) -> Result<Self, TransferError> {
        parse::metadata_from_headers(headers)
    }

    /// Declared whole-object SHA-1, unless the service marked it unverifiable.
    pub fn verifiable_sha1(&self) -> Option<&str> {
        match self.content_sha1.as_str() {
            "" | UNVERIFIABLE_SHA1 => None,
            sha1 => Some(sha1),
        }
    }

    /// Modification time in millis since the epoch: the `src_last_modified_millis`
    /// custom attribute if set, else the upload timestamp header.
    pub fn mod_time_millis(&self, headers: &Headers) -> Result<u64, TransferError> {
        if let Some(v) = self.file_info.get(SRC_LAST_MODIFIED_MILLIS) {
            return parse::parse_u64(SRC_LAST_MODIFIED_MILLIS, v);
        }
        let v = headers
            .get(UPLOAD_TIMESTAMP)
            .ok_or(TransferError::MissingHeader(UPLOAD_TIMESTAMP))?;
        parse::parse_u64(UPLOAD_TIMESTAMP, v)
    }

    /// Record view returned to callers of a transfer.
    pub fn as_info(&self) -> FileInfoRecord {
        FileInfoRecord {
            file_id: self.file_id.clone(),
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            content_length: self.content_length,
            content_sha1: self.content_sha1.clone(),
            file_info: self.file_info.clone(),
        }
    }
}

/// Serialisable summary of a downloaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoRecord {
    pub file_id: String,
    pub file_name: String,
    pub content_type: String,
    pub content_length: u64,
    pub content_sha1: String,
    pub file_info: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(extra: &[(&str, &str)]) -> Headers {
        let mut h: Headers = [
            ("Content-Length", "3"),
            ("Content-Type", "text/plain"),
            ("x-bz-file-id", "id1"),
            ("x-bz-file-name", "a.txt"),
            ("x-bz-content-sha1", "none"),
        ]
        .into_iter()
        .collect();
        for (k, v) in extra {
            h.insert(*k, *v);
        }
        h
    }

    #[test]
    fn unverifiable_sentinel() {
        let md = ObjectMetadata::from_headers(&headers(&[])).unwrap();
        assert_eq!(md.verifiable_sha1(), None);
    }

    #[test]
    fn mod_time_prefers_custom_info() {
        let h = headers(&[
            ("x-bz-info-src_last_modified_millis", "1500"),
            ("x-bz-upload-timestamp", "1400"),
        ]);
        let md = ObjectMetadata::from_headers(&h).unwrap();
        assert_eq!(md.mod_time_millis(&h).unwrap(), 1500);
    }

    #[test]
    fn mod_time_falls_back_to_upload_timestamp() {
        let h = headers(&[("x-bz-upload-timestamp", "1400")]);
        let md = ObjectMetadata::from_headers(&h).unwrap();
        assert_eq!(md.mod_time_millis(&h).unwrap(), 1400);
    }

    #[test]
    fn mod_time_missing_everywhere() {
        let h = headers(&[]);
        let md = ObjectMetadata::from_headers(&h).unwrap();
        assert!(matches!(
            md.mod_time_millis(&h),
            Err(TransferError::MissingHeader(UPLOAD_TIMESTAMP))
        ));
    }

    #[test]
    fn info_record_serializes_camel_case() {
        let h = headers(&[("x-bz-info-color", "blue")]);
        let md = ObjectMetadata::from_headers(&h).unwrap();
        let json = serde_json::to_value(md.as_info()).unwrap();
        assert_eq!(json["fileId"], "id1");
        assert_eq!(json["fileName"], "a.txt");
        assert_eq!(json["contentLength"], 3);
        assert_eq!(json["contentSha1"], "none");
        assert_eq!(json["fileInfo"]["color"], "blue");
    }
}
