//! Windowed object transfer.
//!
//! One initial request learns the object's metadata and sizes the
//! destination. The requested span is then fetched window by window; each
//! window is a ranged GET handed to the first suitable strategy, validated,
//! and retried as a whole when it fails with a retryable error.

mod validate;

use std::fmt;
use std::sync::Arc;

use crate::checksum::sha1_dest_range;
use crate::config::ObjgetConfig;
use crate::dest::{DestFile, DownloadDest, FileCursor, FileSpec};
use crate::error::TransferError;
use crate::metadata::ObjectMetadata;
use crate::progress::{NoProgress, ProgressFile, ProgressListener};
use crate::range::{windows, ByteRange, Window};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::strategy::{
    StrategyChain, WindowContext, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_STREAMS, DEFAULT_MIN_PART_SIZE,
};
use crate::transport::{CurlTransport, Source, Transport, UrlFactory};

pub(crate) use validate::check_range_response;
use validate::validate_window;

/// Default window: the unit of retry.
pub const DEFAULT_WINDOW_SIZE: u64 = 1024 * 1024;

/// Tunables of one [`Transferer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    pub window_size: u64,
    pub chunk_size: usize,
    pub max_streams: usize,
    pub min_part_size: u64,
    /// Re-hash the whole destination after a multi-window whole-object
    /// transfer and compare with the declared SHA-1.
    pub verify_whole_object: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_streams: DEFAULT_MAX_STREAMS,
            min_part_size: DEFAULT_MIN_PART_SIZE,
            verify_whole_object: true,
        }
    }
}

/// Where one window attempt stands, for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub index: u64,
    pub range: ByteRange,
    pub attempt: u32,
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window {} [{}] attempt {}", self.index, self.range, self.attempt)
    }
}

/// Closes the listener however the transfer ends.
struct CloseOnDrop<'a>(&'a dyn ProgressListener);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Downloads objects (or byte ranges of them) into a [`DownloadDest`].
pub struct Transferer {
    transport: Arc<dyn Transport>,
    urls: Arc<dyn UrlFactory>,
    strategies: StrategyChain,
    options: TransferOptions,
    retry: RetryPolicy,
}

impl Transferer {
    /// Default options, retry policy and strategies.
    pub fn new(transport: Arc<dyn Transport>, urls: Arc<dyn UrlFactory>) -> Self {
        Self::with_options(transport, urls, TransferOptions::default())
    }

    pub fn with_options(
        transport: Arc<dyn Transport>,
        urls: Arc<dyn UrlFactory>,
        options: TransferOptions,
    ) -> Self {
        let strategies =
            StrategyChain::standard(options.chunk_size, options.max_streams, options.min_part_size);
        Self {
            transport,
            urls,
            strategies,
            options,
            retry: RetryPolicy::default(),
        }
    }

    /// libcurl transport configured from `cfg`.
    pub fn from_config(cfg: &ObjgetConfig, urls: Arc<dyn UrlFactory>) -> Self {
        let transport = Arc::new(CurlTransport::new(cfg.curl_options()));
        Self::with_options(transport, urls, cfg.transfer_options()).retry_policy(cfg.retry_policy())
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Replaces the strategy chain built from the options.
    pub fn strategies(mut self, chain: StrategyChain) -> Self {
        self.strategies = chain;
        self
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Downloads `range` of the object at `url` (the whole object when `None`)
    /// into a file made by `dest`, and returns the metadata of the initial
    /// response.
    ///
    /// The destination file is only committed after every window succeeded;
    /// on error it is dropped, which discards it.
    pub fn download_file_from_url<D: DownloadDest>(
        &self,
        url: &str,
        dest: &D,
        progress: Option<&dyn ProgressListener>,
        range: Option<ByteRange>,
    ) -> Result<ObjectMetadata, TransferError> {
        let span = tracing::info_span!("transfer", url = %url, range = ?range);
        let _enter = span.enter();

        let progress = progress.unwrap_or(&NoProgress);
        let _close = CloseOnDrop(progress);
        let source = Source {
            transport: &*self.transport,
            urls: &*self.urls,
            url,
        };

        let (metadata, mod_time_millis) = run_with_retry(
            &self.retry,
            |attempt, err, delay| {
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "initial request failed: {}; retrying", err)
            },
            |_| probe(source, range),
        )?;
        tracing::info!(
            file_name = %metadata.file_name,
            file_id = %metadata.file_id,
            content_length = metadata.content_length,
            "starting transfer"
        );

        let file = dest
            .make_file(&FileSpec::new(&metadata, mod_time_millis, range))
            .map_err(TransferError::Storage)?;
        let file = ProgressFile::new(file, progress);
        progress.set_total_bytes(metadata.content_length);

        let span_bytes = match range {
            Some(r) => Some(r),
            None => ByteRange::with_len(0, metadata.content_length),
        };
        // The declared SHA-1 covers the whole object only.
        let object_sha1 = if range.is_none() {
            metadata.verifiable_sha1()
        } else {
            None
        };

        let mut window_count = 0u64;
        for window in windows(span_bytes, self.options.window_size) {
            let expected = object_sha1.filter(|_| window.range.len() == metadata.content_length);
            self.transfer_window(source, &file, window, expected, progress)?;
            window_count += 1;
        }

        if let (Some(whole), Some(expected)) = (span_bytes, object_sha1) {
            if window_count > 1 && self.options.verify_whole_object {
                let actual = sha1_dest_range(&file, whole).map_err(TransferError::Storage)?;
                if !expected.eq_ignore_ascii_case(&actual) {
                    return Err(TransferError::ChecksumMismatch {
                        expected: expected.to_string(),
                        actual,
                    });
                }
                tracing::debug!(sha1 = %actual, "whole object verified");
            }
        }

        // bytes_sent also counts bytes rewritten by retried windows.
        let sent = file.bytes_written();
        file.finish().map_err(TransferError::Storage)?;
        tracing::info!(
            windows = window_count,
            bytes = span_bytes.map_or(0, |r| r.len()),
            bytes_sent = sent,
            "transfer complete"
        );
        Ok(metadata)
    }

    fn transfer_window(
        &self,
        source: Source<'_>,
        file: &dyn DestFile,
        window: Window,
        expected_sha1: Option<&str>,
        progress: &dyn ProgressListener,
    ) -> Result<(), TransferError> {
        run_with_retry(
            &self.retry,
            |attempt, err, delay| {
                let state = WindowState {
                    index: window.index,
                    range: window.range,
                    attempt,
                };
                tracing::warn!(delay_ms = delay.as_millis() as u64, "{} failed: {}; retrying", state, err)
            },
            |attempt| {
                let state = WindowState {
                    index: window.index,
                    range: window.range,
                    attempt,
                };
                let response = source.open(Some(window.range))?;
                let metadata = ObjectMetadata::from_headers(response.headers())?;
                check_range_response(&metadata, window.range)?;

                let mut cursor = FileCursor::new(file);
                cursor.seek(window.range.start);
                let strategy = self.strategies.select(&metadata, progress);
                tracing::debug!(strategy = strategy.name(), "{}", state);

                let outcome = strategy.download(WindowContext {
                    source,
                    response,
                    metadata: &metadata,
                    range: window.range,
                    cursor,
                })?;
                validate_window(window.range, &outcome, expected_sha1)
            },
        )
    }
}

/// Initial request: metadata and modification time. The body is not read;
/// dropping the response releases the connection.
fn probe(
    source: Source<'_>,
    range: Option<ByteRange>,
) -> Result<(ObjectMetadata, u64), TransferError> {
    let response = source.open(range)?;
    let metadata = ObjectMetadata::from_headers(response.headers())?;
    if let Some(r) = range {
        check_range_response(&metadata, r)?;
    }
    let mod_time_millis = metadata.mod_time_millis(response.headers())?;
    Ok((metadata, mod_time_millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = TransferOptions::default();
        assert_eq!(opts.window_size, 1024 * 1024);
        assert_eq!(opts.chunk_size, 8192);
        assert_eq!(opts.max_streams, 8);
        assert_eq!(opts.min_part_size, 100 * 1024 * 1024);
        assert!(opts.verify_whole_object);
    }

    #[test]
    fn window_state_display() {
        let state = WindowState {
            index: 2,
            range: ByteRange::new(2048, 3071),
            attempt: 3,
        };
        assert_eq!(state.to_string(), "window 2 [2048-3071] attempt 3");
    }
}
