// Import required dependencies
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path; // For file path handling
use std::time::{Duration, Instant};

// Metrics tracking structures
#[derive(Debug, Clone)]
pub struct MergeMetrics {
    start_time: Instant,
    files_seen: usize,
    files_merged: usize,
    files_rejected: usize,
    rows_written: usize,
    files_archived: usize,
}

impl MergeMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            files_seen: 0,
            files_merged: 0,
            files_rejected: 0,
            rows_written: 0,
            files_archived: 0,
        }
    }

    pub fn files_seen(&self) -> usize {
        self.files_seen
    }

    pub fn files_merged(&self) -> usize {
        self.files_merged
    }

    pub fn files_rejected(&self) -> usize {
        self.files_rejected
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn files_archived(&self) -> usize {
        self.files_archived
    }

    fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for MergeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Spinner that follows a merge run file by file, plus the counters behind it
pub struct ProgressTracker {
    bar: ProgressBar,
    metrics: MergeMetrics,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {pos} files | {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            metrics: MergeMetrics::new(),
        }
    }

    // Tracker that counts but never draws
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            metrics: MergeMetrics::new(),
        }
    }

    pub fn start_file(&mut self, path: &Path) {
        self.metrics.files_seen += 1;
        self.bar.set_position(self.metrics.files_seen as u64);
        self.bar.set_message(format!("merging {}", path.display()));
    }

    pub fn file_merged(&mut self, rows: usize) {
        self.metrics.files_merged += 1;
        self.metrics.rows_written += rows;
    }

    pub fn file_rejected(&mut self) {
        self.metrics.files_rejected += 1;
    }

    pub fn file_archived(&mut self, destination: &Path) {
        self.metrics.files_archived += 1;
        self.bar
            .set_message(format!("archived to {}", destination.display()));
    }

    pub fn finish(&self) {
        let m = &self.metrics;
        self.bar.finish_with_message(format!(
            "Completed in {:.2}s | Merged: {} | Rejected: {} | Rows: {} | Archived: {}",
            m.elapsed().as_secs_f64(),
            m.files_merged,
            m.files_rejected,
            m.rows_written,
            m.files_archived
        ));
    }

    // Leave the spinner where it stopped after a failed run
    pub fn abandon(&self) {
        self.bar.abandon_with_message(format!(
            "Stopped after {} files | Merged: {} | Archived: {}",
            self.metrics.files_seen, self.metrics.files_merged, self.metrics.files_archived
        ));
    }

    pub fn metrics(&self) -> &MergeMetrics {
        &self.metrics
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::hidden()
    }
}
