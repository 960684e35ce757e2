//! Duplicate finder implementation: walk, fingerprint, group.
//!
//! # Overview
//!
//! This module orchestrates the duplicate detection pipeline:
//! 1. **Walk**: collect image files in a stable order
//!    (see [`crate::scanner::Walker`])
//! 2. **Hash**: decode and fingerprint every image in parallel; images that
//!    fail to decode are recorded as skipped and the run continues
//! 3. **Group**: partition the fingerprints with the greedy grouper
//!    (see [`crate::duplicates::groups`])
//!
//! Progress is reported through an explicit [`ProgressCallback`] after every
//! image and once grouping completes.
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::duplicates::{DuplicateFinder, FinderConfig};
//! use imgdupe::scanner::PerceptualAlgorithm;
//! use std::path::Path;
//!
//! let config = FinderConfig::default()
//!     .with_algorithm(PerceptualAlgorithm::Phash)
//!     .with_threshold(4);
//! let finder = DuplicateFinder::new(config);
//!
//! let (result, summary) = finder.find_duplicates(Path::new("/photos")).unwrap();
//! for group in result.groups() {
//!     println!("keep {}", group.representative().entry.path.display());
//! }
//! println!("{} images skipped", summary.skipped.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use super::groups::{group_duplicates_parallel, GroupError, GroupingResult};
use crate::progress::ProgressCallback;
use crate::scanner::{
    Fingerprint, HashSize, ImageEntry, PerceptualAlgorithm, PerceptualHasher, ScanError, Walker,
    WalkerConfig,
};

/// Default similarity threshold (Hamming distance).
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Upper end of the recommended threshold range.
pub const RECOMMENDED_MAX_THRESHOLD: u32 = 10;

/// An image together with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashedImage {
    /// The image file
    pub entry: ImageEntry,
    /// Its perceptual fingerprint
    pub fingerprint: Fingerprint,
}

impl AsRef<Path> for HashedImage {
    fn as_ref(&self) -> &Path {
        &self.entry.path
    }
}

/// An image that could not be fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedImage {
    /// The image file
    pub path: PathBuf,
    /// Why it was skipped
    pub reason: String,
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Hash algorithm.
    pub algorithm: PerceptualAlgorithm,
    /// Reduction size.
    pub hash_size: HashSize,
    /// Maximum Hamming distance to the group representative.
    pub threshold: u32,
    /// Number of worker threads for decoding and hashing.
    pub io_threads: usize,
    /// Walker configuration.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("algorithm", &self.algorithm)
            .field("hash_size", &self.hash_size)
            .field("threshold", &self.threshold)
            .field("io_threads", &self.io_threads)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            algorithm: PerceptualAlgorithm::default(),
            hash_size: HashSize::default(),
            threshold: DEFAULT_THRESHOLD,
            io_threads: 4,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the hash algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: PerceptualAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the reduction size.
    #[must_use]
    pub fn with_hash_size(mut self, hash_size: HashSize) -> Self {
        self.hash_size = hash_size;
        self
    }

    /// Set the similarity threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn progress(&self) -> Option<&dyn ProgressCallback> {
        self.progress_callback.as_deref()
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Hash algorithm used
    pub algorithm: PerceptualAlgorithm,
    /// Fingerprint width in bits
    pub hash_bits: u32,
    /// Similarity threshold used
    pub threshold: u32,
    /// Number of image files found by the walker
    pub total_files: usize,
    /// Total size of those files in bytes
    pub total_size: u64,
    /// Number of images fingerprinted successfully
    pub images_hashed: usize,
    /// Images that failed to decode
    pub skipped: Vec<SkippedImage>,
    /// Errors encountered while walking
    pub scan_errors: Vec<ScanError>,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Number of images that belong to a group
    pub grouped_images: usize,
    /// Number of group members that are not the representative
    pub duplicate_files: usize,
    /// Duration of the walking phase
    pub walk_duration: Duration,
    /// Duration of the hashing phase
    pub hash_duration: Duration,
    /// Duration of the grouping phase
    pub grouping_duration: Duration,
    /// Duration of the entire scan
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Whether any file was skipped or could not be read.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.skipped.is_empty() || !self.scan_errors.is_empty()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        format_size(self.total_size)
    }
}

/// Format a byte size as a human-readable string.
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The threshold exceeds the fingerprint width.
    #[error("Threshold {threshold} is out of range (0..={bits})")]
    InvalidThreshold {
        /// Requested threshold
        threshold: u32,
        /// Fingerprint width
        bits: u32,
    },

    /// Grouping rejected its input.
    #[error(transparent)]
    Group(#[from] GroupError),
}

/// Duplicate finder that runs the walk → hash → group pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: PerceptualHasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let hasher = PerceptualHasher::new(config.algorithm, config.hash_size);
        Self { config, hasher }
    }

    /// Create a duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find duplicate images under `path`.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist or is not a directory
    /// - The threshold exceeds the fingerprint width
    /// - The scan is interrupted by shutdown signal
    ///
    /// Images that fail to decode are not errors; they are listed in
    /// [`ScanSummary::skipped`].
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(GroupingResult<HashedImage>, ScanSummary), FinderError> {
        let start_time = Instant::now();

        if !path.exists() {
            return Err(FinderError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(FinderError::NotADirectory(path.to_path_buf()));
        }
        self.validate_threshold()?;

        log::info!("Starting duplicate image scan of {}", path.display());

        if let Some(callback) = self.config.progress() {
            callback.on_phase_start("walking", 0);
            callback.on_message(&format!("Walking {}", path.display()));
        }

        let mut walker = Walker::new(path, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let mut images = Vec::new();
        let mut scan_errors = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(image) => {
                    if let Some(callback) = self.config.progress() {
                        callback.on_progress(images.len() + 1, &image.path.to_string_lossy());
                    }
                    images.push(image);
                }
                Err(e) => scan_errors.push(e),
            }
        }

        if let Some(callback) = self.config.progress() {
            callback.on_phase_end("walking");
        }
        let walk_duration = start_time.elapsed();

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        log::info!("Found {} image files", images.len());

        let (result, mut summary) = self.find_duplicates_in(images)?;
        summary.scan_errors = scan_errors;
        summary.walk_duration = walk_duration;
        summary.scan_duration = start_time.elapsed();
        Ok((result, summary))
    }

    /// Fingerprint and group an already collected list of images.
    ///
    /// The input order is the grouping order.
    ///
    /// # Errors
    ///
    /// Returns `FinderError::InvalidThreshold` or `FinderError::Interrupted`.
    pub fn find_duplicates_in(
        &self,
        images: Vec<ImageEntry>,
    ) -> Result<(GroupingResult<HashedImage>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        self.validate_threshold()?;

        let mut summary = ScanSummary {
            algorithm: self.config.algorithm,
            hash_bits: self.hasher.bits(),
            threshold: self.config.threshold,
            total_files: images.len(),
            total_size: images.iter().map(|i| i.size).sum(),
            ..Default::default()
        };

        let (hashed, skipped) = self.hash_images(images);
        summary.hash_duration = start_time.elapsed();

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        summary.images_hashed = hashed.len();
        summary.skipped = skipped;
        for skip in &summary.skipped {
            log::warn!("Skipped {}: {}", skip.path.display(), skip.reason);
        }

        let group_start = Instant::now();
        if let Some(callback) = self.config.progress() {
            callback.on_phase_start("grouping", hashed.len());
        }

        let pairs: Vec<(HashedImage, Fingerprint)> = hashed
            .into_iter()
            .map(|h| {
                let fp = h.fingerprint.clone();
                (h, fp)
            })
            .collect();
        let result = self.install(|| group_duplicates_parallel(&pairs, self.config.threshold))?;

        if let Some(callback) = self.config.progress() {
            callback.on_phase_end("grouping");
        }
        summary.grouping_duration = group_start.elapsed();

        summary.duplicate_groups = result.groups().len();
        summary.grouped_images = result.grouped_count();
        summary.duplicate_files = result.duplicate_count();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Grouping complete: {} groups, {} duplicates, {} images skipped",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.skipped.len()
        );

        Ok((result, summary))
    }

    /// Decode and fingerprint every image, keeping input order.
    fn hash_images(&self, images: Vec<ImageEntry>) -> (Vec<HashedImage>, Vec<SkippedImage>) {
        if images.is_empty() {
            log::debug!("No images to hash");
            return (Vec::new(), Vec::new());
        }

        if let Some(callback) = self.config.progress() {
            callback.on_phase_start("hashing", images.len());
        }
        log::info!(
            "Computing {} fingerprints ({} bits) for {} images",
            self.config.algorithm,
            self.hasher.bits(),
            images.len()
        );

        let done = AtomicUsize::new(0);
        let results: Vec<(ImageEntry, Option<Result<Fingerprint, String>>)> = self.install(|| {
            images
                .into_par_iter()
                .map(|image| {
                    if self.config.is_shutdown_requested() {
                        return (image, None);
                    }
                    let fp = self
                        .hasher
                        .compute_hash(&image.path)
                        .map_err(|e| e.to_string());
                    let current = done.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(callback) = self.config.progress() {
                        callback.on_progress(current, &image.path.to_string_lossy());
                    }
                    (image, Some(fp))
                })
                .collect()
        });

        if let Some(callback) = self.config.progress() {
            callback.on_phase_end("hashing");
        }

        let mut hashed = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (entry, outcome) in results {
            match outcome {
                Some(Ok(fingerprint)) => {
                    log::trace!("{} {}", fingerprint, entry.path.display());
                    hashed.push(HashedImage { entry, fingerprint });
                }
                Some(Err(reason)) => skipped.push(SkippedImage {
                    path: entry.path,
                    reason,
                }),
                None => {}
            }
        }
        (hashed, skipped)
    }

    fn validate_threshold(&self) -> Result<(), FinderError> {
        let bits = self.config.hash_size.bits();
        if self.config.threshold > bits {
            return Err(FinderError::InvalidThreshold {
                threshold: self.config.threshold,
                bits,
            });
        }
        Ok(())
    }

    /// Run `op` on a pool limited to `io_threads`.
    fn install<T: Send>(&self, op: impl FnOnce() -> T + Send) -> T {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
        {
            Ok(pool) => pool.install(op),
            Err(e) => {
                log::warn!(
                    "Failed to create thread pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                op()
            }
        }
    }
}
