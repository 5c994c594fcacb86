//! Listener that reports progress through `tracing`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use super::{ProgressListener, ProgressStats};

/// Logs at every `step_percent` of progress with rate and ETA.
pub struct LogProgress {
    label: String,
    step_percent: u64,
    total: AtomicU64,
    last_step: AtomicU64,
    started: Mutex<Option<Instant>>,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_step(label, 10)
    }

    pub fn with_step(label: impl Into<String>, step_percent: u64) -> Self {
        Self {
            label: label.into(),
            step_percent: step_percent.clamp(1, 100),
            total: AtomicU64::new(0),
            last_step: AtomicU64::new(0),
            started: Mutex::new(None),
        }
    }

    fn stats(&self, bytes: u64) -> ProgressStats {
        let elapsed_secs = self
            .started
            .lock()
            .ok()
            .and_then(|s| s.map(|t| t.elapsed().as_secs_f64()))
            .unwrap_or(0.0);
        ProgressStats {
            bytes_done: bytes,
            total_bytes: self.total.load(Ordering::Relaxed),
            elapsed_secs,
        }
    }
}

impl ProgressListener for LogProgress {
    fn set_total_bytes(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.last_step.store(0, Ordering::Relaxed);
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
    }

    fn bytes_completed(&self, bytes: u64) {
        let stats = self.stats(bytes);
        let step = (stats.fraction() * 100.0) as u64 / self.step_percent;
        // Only the thread that advances the step logs it.
        let prev = self.last_step.fetch_max(step, Ordering::Relaxed);
        if step > prev {
            tracing::info!(
                label = %self.label,
                percent = step * self.step_percent,
                bytes = stats.bytes_done,
                total = stats.total_bytes,
                rate_bps = stats.bytes_per_sec() as u64,
                eta_secs = ?stats.eta_secs().map(|s| s.round() as u64),
                "progress"
            );
        }
    }

    fn close(&self) {
        let elapsed = self.stats(0).elapsed_secs;
        tracing::info!(label = %self.label, elapsed_secs = elapsed, "transfer closed");
    }
}
