//! Parse response headers into [`ObjectMetadata`] and [`ContentRange`].

use std::collections::BTreeMap;

use crate::error::TransferError;

use super::headers::Headers;
use super::{
    ContentRange, ObjectMetadata, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_SHA1, CONTENT_TYPE,
    FILE_ID, FILE_INFO_PREFIX, FILE_NAME,
};

fn required<'a>(headers: &'a Headers, name: &'static str) -> Result<&'a str, TransferError> {
    headers.get(name).ok_or(TransferError::MissingHeader(name))
}

pub(crate) fn parse_u64(name: &'static str, value: &str) -> Result<u64, TransferError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| TransferError::MalformedHeader {
            name,
            value: value.to_string(),
        })
}

/// Builds the object description carried by one response.
pub(crate) fn metadata_from_headers(headers: &Headers) -> Result<ObjectMetadata, TransferError> {
    let content_length = parse_u64(CONTENT_LENGTH, required(headers, CONTENT_LENGTH)?)?;
    let content_sha1 = required(headers, CONTENT_SHA1)?.trim().to_ascii_lowercase();
    let file_id = required(headers, FILE_ID)?.to_string();
    let file_name = required(headers, FILE_NAME)?.to_string();
    let content_type = required(headers, CONTENT_TYPE)?.to_string();
    let file_info: BTreeMap<String, String> = headers
        .with_prefix(FILE_INFO_PREFIX)
        .map(|(k, v)| (k, v.to_string()))
        .collect();
    let content_range = headers
        .get(CONTENT_RANGE)
        .map(parse_content_range)
        .transpose()?;

    Ok(ObjectMetadata {
        file_id,
        file_name,
        content_type,
        content_length,
        content_sha1,
        file_info,
        content_range,
    })
}

/// Parses `bytes START-END/TOTAL`, `bytes START-END/*` or `bytes */TOTAL`.
pub(crate) fn parse_content_range(value: &str) -> Result<ContentRange, TransferError> {
    let malformed = || TransferError::MalformedHeader {
        name: CONTENT_RANGE,
        value: value.to_string(),
    };
    let rest = value.trim();
    let rest = rest
        .get(..6)
        .filter(|unit| unit.eq_ignore_ascii_case("bytes "))
        .map(|_| &rest[6..])
        .ok_or_else(malformed)?;
    let (span, total) = rest.trim().split_once('/').ok_or_else(malformed)?;
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse::<u64>().map_err(|_| malformed())?),
    };
    let span = match span.trim() {
        "*" => None,
        s => {
            let (a, b) = s.split_once('-').ok_or_else(malformed)?;
            let start = a.trim().parse::<u64>().map_err(|_| malformed())?;
            let end = b.trim().parse::<u64>().map_err(|_| malformed())?;
            // The span length must fit in a u64.
            if start > end || (end - start).checked_add(1).is_none() {
                return Err(malformed());
            }
            Some((start, end))
        }
    };
    Ok(ContentRange {
        start: span.map(|(s, _)| s),
        end: span.map(|(_, e)| e),
        total,
    })
}
