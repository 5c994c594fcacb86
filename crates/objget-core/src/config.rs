use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::strategy::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_STREAMS, DEFAULT_MIN_PART_SIZE};
use crate::transferer::{TransferOptions, DEFAULT_WINDOW_SIZE};
use crate::transport::CurlOptions;

/// Retry policy parameters (`[retry]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per window including the first; 0 retries until success.
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 1.0,
            max_delay_secs: 30,
        }
    }
}

/// libcurl handle settings (`[curl]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurlConfig {
    pub connect_timeout_secs: u64,
    /// Abort a transfer slower than this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Optional receive cap in bytes per second (None = no cap).
    pub max_recv_speed: Option<u64>,
    /// Optional libcurl receive buffer size in bytes.
    pub buffer_size: Option<usize>,
}

impl Default for CurlConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            max_recv_speed: None,
            buffer_size: None,
        }
    }
}

/// Global configuration loaded from `~/.config/objget/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjgetConfig {
    /// Bytes per window; each window is fetched and retried as a unit.
    pub window_size: u64,
    /// Read buffer size for response bodies.
    pub chunk_size: usize,
    /// Concurrent connections per window for the multi-stream strategy.
    pub max_streams: usize,
    /// Smallest window the multi-stream strategy takes on.
    pub min_part_size: u64,
    /// Re-hash multi-window downloads against the declared SHA-1.
    pub verify_whole_object: bool,
    pub retry: RetryConfig,
    pub curl: CurlConfig,
}

impl Default for ObjgetConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_streams: DEFAULT_MAX_STREAMS,
            min_part_size: DEFAULT_MIN_PART_SIZE,
            verify_whole_object: true,
            retry: RetryConfig::default(),
            curl: CurlConfig::default(),
        }
    }
}

impl ObjgetConfig {
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            window_size: self.window_size.max(1),
            chunk_size: self.chunk_size.max(1),
            max_streams: self.max_streams.max(1),
            min_part_size: self.min_part_size,
            verify_whole_object: self.verify_whole_object,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base_delay = Duration::from_secs_f64(self.retry.base_delay_secs.max(0.0));
        RetryPolicy {
            max_attempts: match self.retry.max_attempts {
                0 => None,
                n => Some(n),
            },
            base_delay,
            max_delay: Duration::from_secs(self.retry.max_delay_secs).max(base_delay),
        }
    }

    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.curl.connect_timeout_secs),
            low_speed_limit: self.curl.low_speed_limit,
            low_speed_time: Duration::from_secs(self.curl.low_speed_time_secs),
            max_recv_speed: self.curl.max_recv_speed,
            buffer_size: self.curl.buffer_size,
            ..CurlOptions::default()
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("objget")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ObjgetConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ObjgetConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ObjgetConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
