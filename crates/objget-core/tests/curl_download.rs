//! End-to-end downloads through libcurl against a local range server.

mod common;

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use common::range_server::{self, RangeServerOptions};
use objget_core::dest::{temp_path, BytesDest, LocalFileDest};
use objget_core::range::ByteRange;
use objget_core::transport::{CurlTransport, DirectUrl};
use objget_core::{TransferError, TransferOptions, Transferer};

fn curl_transferer(options: TransferOptions) -> Transferer {
    Transferer::with_options(
        Arc::new(CurlTransport::default()),
        Arc::new(DirectUrl),
        options,
    )
    .retry_policy(common::fast_retry(4))
}

fn small_windows() -> TransferOptions {
    TransferOptions {
        window_size: 16 * 1024,
        chunk_size: 4096,
        max_streams: 4,
        min_part_size: u64::MAX,
        verify_whole_object: true,
    }
}

#[test]
fn whole_object_to_local_file() {
    let body = common::body(64 * 1024 + 123);
    let server = range_server::start(body.clone());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kitten.jpg");

    let md = curl_transferer(small_windows())
        .download_file_from_url(&server.url, &LocalFileDest::new(&path), None, None)
        .unwrap();

    assert_eq!(md.content_length, body.len() as u64);
    assert_eq!(md.file_name, "kitten.jpg");
    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert!(!temp_path(&path).exists());
    let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();
    assert_eq!(
        mtime,
        UNIX_EPOCH + Duration::from_millis(range_server::UPLOAD_TIMESTAMP)
    );
    // Initial request plus five windows.
    assert_eq!(server.hits(), 1 + 5);
}

#[test]
fn multi_stream_windows_over_curl() {
    let body = common::body(100 * 1024);
    let server = range_server::start(body.clone());
    let opts = TransferOptions {
        window_size: 40 * 1024,
        min_part_size: 8 * 1024,
        ..small_windows()
    };
    let dest = BytesDest::new();
    curl_transferer(opts)
        .download_file_from_url(&server.url, &dest, None, None)
        .unwrap();
    assert_eq!(dest.bytes().unwrap(), body);
}

#[test]
fn sub_range_over_curl() {
    let body = common::body(50_000);
    let server = range_server::start(body.clone());
    let dest = BytesDest::new();
    let md = curl_transferer(small_windows())
        .download_file_from_url(&server.url, &dest, None, Some(ByteRange::new(1000, 40_999)))
        .unwrap();
    assert_eq!(md.content_length, 40_000);
    assert_eq!(dest.bytes().unwrap(), &body[1000..41_000]);
}

#[test]
fn range_beyond_end_is_invalid_over_curl() {
    let server = range_server::start(common::body(500));
    let err = curl_transferer(small_windows())
        .download_file_from_url(&server.url, &BytesDest::new(), None, Some(ByteRange::new(0, 999)))
        .unwrap_err();
    assert!(matches!(err, TransferError::InvalidRange { declared: 500, .. }), "{}", err);
    assert_eq!(server.hits(), 1);
}

#[test]
fn service_unavailable_is_retried() {
    let body = common::body(10_000);
    let server = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            fail_first: 2,
            ..RangeServerOptions::default()
        },
    );
    let dest = BytesDest::new();
    curl_transferer(small_windows())
        .download_file_from_url(&server.url, &dest, None, None)
        .unwrap();
    assert_eq!(dest.bytes().unwrap(), body);
    assert_eq!(server.hits(), 2 + 1 + 1);
}

#[test]
fn custom_file_info_over_curl() {
    let server = range_server::start_with_options(
        common::body(100),
        RangeServerOptions {
            unverifiable: true,
            file_info: vec![("author".to_string(), "unknown".to_string())],
            ..RangeServerOptions::default()
        },
    );
    let md = curl_transferer(small_windows())
        .download_file_from_url(&server.url, &BytesDest::new(), None, None)
        .unwrap();
    assert_eq!(md.verifiable_sha1(), None);
    assert_eq!(md.file_info.get("author").map(String::as_str), Some("unknown"));
}
