//! Progress reporting for batch transfers
//!
//! Every update is logged at INFO as `<label> x/y`; a terminal progress bar
//! is drawn as well when enabled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Tracks documents transferred against a known total
pub struct ProgressTracker {
    label: &'static str,
    total: u64,
    processed: AtomicU64,
    start_time: Instant,
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a tracker for `total` documents
    ///
    /// `label` prefixes log lines, e.g. "Downloaded" or "Inserted".
    pub fn new(label: &'static str, total: u64, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new(total);
            let template = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";
            if let Ok(style) = ProgressStyle::default_bar().template(template) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self {
            label,
            total,
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Tracker for a stream whose length is unknown up front
    pub fn unbounded(label: &'static str, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new_spinner();
            let template = "{spinner:.green} {pos} documents {msg}";
            if let Ok(style) = ProgressStyle::default_spinner().template(template) {
                bar.set_style(style);
            }
            bar
        });

        Self {
            label,
            total: 0,
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Add `count` documents and report the running total
    pub fn advance(&self, count: u64) -> u64 {
        let done = self.processed.fetch_add(count, Ordering::Relaxed) + count;

        if self.total > 0 {
            info!("{} {}/{}", self.label, done, self.total);
        } else {
            info!("{} {}", self.label, done);
        }

        if let Some(ref bar) = self.bar {
            bar.set_position(done);
            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                bar.set_message(format!("({:.0} docs/sec)", done as f64 / elapsed));
            }
        }
        done
    }

    /// Documents reported so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Milliseconds since the tracker was created
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let tracker = ProgressTracker::new("Downloaded", 1300, false);
        assert_eq!(tracker.advance(512), 512);
        assert_eq!(tracker.advance(512), 1024);
        assert_eq!(tracker.advance(276), 1300);
        assert_eq!(tracker.processed(), 1300);
        tracker.finish();
    }

    #[test]
    fn test_unbounded_tracker() {
        let tracker = ProgressTracker::unbounded("Inserted", false);
        tracker.advance(10);
        assert_eq!(tracker.processed(), 10);
    }
}
