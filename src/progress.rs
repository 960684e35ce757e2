//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements [`ProgressCallback`]
//! to display progress bars in the terminal while a scan runs.
//!
//! # Phases
//!
//! The pipeline reports these phase names:
//! - `walking`: spinner, counts image files as they are found
//! - `hashing`: bar over the images being decoded and fingerprinted
//! - `grouping`: spinner while the grouper runs
//! - `organizing`: bar over the files being copied

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for the duplicate finding pipeline.
///
/// Implement this trait to receive progress updates. Calls may arrive from
/// worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "walking", "hashing")
    /// * `total` - Total number of items to process, 0 if unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Number of items processed so far (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
///
/// Holds at most one active bar at a time; phases run sequentially.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use imgdupe::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            "walking" | "grouping" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style());
                pb
            }
        };
        pb.set_message(phase_label(phase));

        if let Some(previous) = self.active().replace(pb) {
            previous.finish_and_clear();
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.active() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 30));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.active().take() {
            pb.finish_with_message(format!("{} complete", phase_label(phase)));
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.active() {
            pb.set_message(message.to_string());
        }
    }
}

fn phase_label(phase: &str) -> String {
    match phase {
        "walking" => "Walking".to_string(),
        "hashing" => "Hashing".to_string(),
        "grouping" => "Grouping".to_string(),
        "organizing" => "Organizing".to_string(),
        other => other.to_string(),
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_path_short() {
        assert_eq!(truncate_path("a/b.png", 30), "a/b.png");
    }

    #[test]
    fn test_truncate_path_long_directory() {
        let path = "/very/long/directory/name/that/keeps/going/cat.png";
        assert_eq!(truncate_path(path, 30), ".../cat.png");
    }

    #[test]
    fn test_truncate_path_long_file_name() {
        let name = "a".repeat(40) + ".png";
        let truncated = truncate_path(&name, 30);
        assert!(truncated.starts_with("..."));
        assert_eq!(truncated.chars().count(), 30);
        assert!(truncated.ends_with(".png"));
    }

    #[test]
    fn test_quiet_progress_ignores_events() {
        let progress = Progress::new(true);
        progress.on_phase_start("hashing", 10);
        progress.on_progress(1, "a.png");
        assert!(progress.active().is_none());
        progress.on_phase_end("hashing");
    }

    #[test]
    fn test_phase_replaces_active_bar() {
        let progress = Progress::new(false);
        progress.on_phase_start("walking", 0);
        progress.on_phase_start("hashing", 3);
        progress.on_progress(2, "b.png");
        assert_eq!(progress.active().as_ref().map(ProgressBar::position), Some(2));
        progress.on_phase_end("hashing");
        assert!(progress.active().is_none());
    }
}
