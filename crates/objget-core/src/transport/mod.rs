//! HTTP transport contract used by the orchestrator and the strategies.
//!
//! A [`Transport`] issues one GET (optionally ranged) and hands back the
//! status, headers and a streaming body. URLs go through a [`UrlFactory`]
//! before every request, since signed download URLs may expire or be single-use.

mod cancel;
mod libcurl;
mod url_factory;

use std::io::Read;

use crate::error::TransferError;
use crate::metadata::Headers;
use crate::range::ByteRange;

pub use cancel::CancelToken;
pub use libcurl::{CurlOptions, CurlTransport};
pub use url_factory::{AuthorizedUrl, DirectUrl, RequestTarget, UrlFactory};

/// A response whose headers have arrived; the body is read through [`Read`].
///
/// Dropping the response before the body is exhausted abandons the transfer
/// and releases its connection.
pub trait Response: Read + Send {
    fn status(&self) -> u32;
    fn headers(&self) -> &Headers;
}

/// Capability to issue a GET against a resolved target.
pub trait Transport: Send + Sync {
    /// Sends the request and returns once headers are available.
    /// Non-2xx statuses are reported as [`TransferError::Http`].
    ///
    /// Cancelling `cancel` must abort the request promptly, whether it is
    /// still waiting for headers or blocked in a body read.
    fn get(
        &self,
        target: &RequestTarget,
        range: Option<ByteRange>,
        cancel: &CancelToken,
    ) -> Result<Box<dyn Response>, TransferError>;
}

/// Everything needed to (re)issue requests for one object.
#[derive(Clone, Copy)]
pub struct Source<'a> {
    pub transport: &'a dyn Transport,
    pub urls: &'a dyn UrlFactory,
    pub url: &'a str,
}

impl Source<'_> {
    /// Resolves the URL afresh and issues the request.
    pub fn open(&self, range: Option<ByteRange>) -> Result<Box<dyn Response>, TransferError> {
        self.open_cancellable(range, &CancelToken::new())
    }

    /// Like [`Source::open`], but the request is torn down once `cancel` fires.
    pub fn open_cancellable(
        &self,
        range: Option<ByteRange>,
        cancel: &CancelToken,
    ) -> Result<Box<dyn Response>, TransferError> {
        let target = self
            .urls
            .resolve(self.url)
            .map_err(TransferError::UrlFactory)?;
        tracing::trace!(url = %target.url, range = ?range, "GET");
        self.transport.get(&target, range, cancel)
    }
}

pub(crate) fn check_status(status: u32, url: &str) -> Result<(), TransferError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(TransferError::Http {
            status,
            url: url.to_string(),
        })
    }
}
