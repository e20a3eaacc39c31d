//! Progress bar and logging utilities.
//!
//! Provides helpers for creating progress bars and spinners, with support
//! for log-only mode where progress bars are hidden for tail-friendly output.
//! The matcher reports through [`ProgressSink`], which is implemented for
//! progress bars, for the log-only reporter and as a no-op for `()`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Set log-only mode globally
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

/// Check if log-only mode is enabled
pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

/// Create a progress bar with consistent styling.
/// In log-only mode, the progress bar is hidden.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Log progress periodically for tail-friendly output.
/// Only logs when in log-only mode and at specified intervals.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && (current % interval.max(1) == 0 || current == total) {
        let pct = if total == 0 { 100.0 } else { 100.0 * current as f64 / total as f64 };
        eprintln!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

/// Create a spinner for indeterminate progress.
/// In log-only mode, the spinner is hidden.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

// ============================================================================
// Progress Sinks
// ============================================================================

/// Receives periodic progress notifications from the matcher.
///
/// Called from worker threads; must never influence the match result.
pub trait ProgressSink: Sync {
    fn report(&self, processed: u64, total: u64);
}

impl ProgressSink for () {
    fn report(&self, _processed: u64, _total: u64) {}
}

impl ProgressSink for ProgressBar {
    fn report(&self, processed: u64, _total: u64) {
        self.set_position(processed);
    }
}

/// Progress bar plus `[phase] n/total` lines in log-only mode.
pub struct PhaseProgress {
    pub bar: ProgressBar,
    pub phase: &'static str,
}

impl PhaseProgress {
    pub fn new(phase: &'static str, total: u64, msg: &str) -> Self {
        Self {
            bar: create_progress_bar(total, msg),
            phase,
        }
    }
}

impl ProgressSink for PhaseProgress {
    fn report(&self, processed: u64, total: u64) {
        self.bar.set_position(processed);
        // The matcher already throttles, so log every report
        log_progress(self.phase, processed, total, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_progress_bar_sink_sets_position() {
        let pb = ProgressBar::hidden();
        pb.set_length(10);
        pb.report(4, 10);
        assert_eq!(pb.position(), 4);
    }
}
