//! `objget download <url>`: fetch one object into a local file.

use anyhow::{Context, Result};
use objget_core::config::ObjgetConfig;
use objget_core::dest::LocalFileDest;
use objget_core::progress::LogProgress;
use objget_core::range::ByteRange;
use objget_core::transport::{AuthorizedUrl, DirectUrl, UrlFactory};
use objget_core::Transferer;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
pub struct DownloadArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub range: Option<ByteRange>,
    pub auth_token: Option<String>,
}

pub fn run_download(cfg: &ObjgetConfig, args: DownloadArgs) -> Result<()> {
    let output = match args.output {
        Some(p) => p,
        None => PathBuf::from(default_file_name(&args.url)),
    };
    let urls: Arc<dyn UrlFactory> = match args.auth_token {
        Some(token) => Arc::new(AuthorizedUrl::new(token)),
        None => Arc::new(DirectUrl),
    };
    let transferer = Transferer::from_config(cfg, urls);
    let progress = LogProgress::with_step(output.display().to_string(), 10);
    let dest = LocalFileDest::new(&output);

    let metadata = transferer
        .download_file_from_url(&args.url, &dest, Some(&progress), args.range)
        .with_context(|| format!("download {} to {}", args.url, output.display()))?;

    println!("{}", serde_json::to_string_pretty(&metadata.as_info())?);
    Ok(())
}

/// Last non-empty path segment of `url`, without query or fragment.
pub(crate) fn default_file_name(url: &str) -> String {
    let without_query = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
    let path = without_query
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or(""))
        .unwrap_or(without_query);
    path.rsplit('/')
        .find(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(str::to_string)
        .unwrap_or_else(|| "download.bin".to_string())
}
