//! URL resolution hook invoked before every request.

use anyhow::{Context, Result};

/// Concrete request to send: final URL plus extra headers (e.g. authorization).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl RequestTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }
}

/// Turns a logical object URL into a request target. Called fresh for every
/// request, including retries and multi-stream sub-ranges.
pub trait UrlFactory: Send + Sync {
    fn resolve(&self, url: &str) -> Result<RequestTarget>;
}

/// Uses the URL as given, after checking it parses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectUrl;

impl UrlFactory for DirectUrl {
    fn resolve(&self, url: &str) -> Result<RequestTarget> {
        let parsed = url::Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;
        Ok(RequestTarget::new(parsed.as_str()))
    }
}

/// Adds an `Authorization` header carrying a service token.
#[derive(Clone)]
pub struct AuthorizedUrl {
    token: String,
}

impl AuthorizedUrl {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for AuthorizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUrl").finish_non_exhaustive()
    }
}

impl UrlFactory for AuthorizedUrl {
    fn resolve(&self, url: &str) -> Result<RequestTarget> {
        let mut target = DirectUrl.resolve(url)?;
        target
            .headers
            .push(("Authorization".to_string(), self.token.clone()));
        Ok(target)
    }
}
