//! JSON output formatter for duplicate scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "representative": "/photos/a.jpg",
//!       "fingerprint": "f0e1d2c3b4a59687",
//!       "files": ["/photos/a.jpg", "/photos/copy/a.jpg"]
//!     }
//!   ],
//!   "ungrouped": [{ "path": "/photos/b.png", "fingerprint": "0011223344556677" }],
//!   "skipped": [{ "path": "/photos/broken.jpg", "reason": "..." }],
//!   "summary": {
//!     "algorithm": "dhash",
//!     "hash_bits": 64,
//!     "threshold": 5,
//!     "total_files": 4,
//!     "images_hashed": 3,
//!     "skipped_images": 1,
//!     "duplicate_groups": 1,
//!     "grouped_images": 2,
//!     "duplicate_files": 1,
//!     "scan_duration_ms": 1234,
//!     "exit_code": 3,
//!     "exit_code_name": "ID003"
//!   }
//! }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::duplicates::DuplicateFinder;
//! use imgdupe::error::ExitCode;
//! use imgdupe::output::json::JsonOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (result, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! let output = JsonOutput::new(&result, &summary, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, GroupingResult, HashedImage, ScanSummary, SkippedImage};
use crate::error::ExitCode;
use crate::scanner::PerceptualAlgorithm;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Absolute path of the representative (kept) image
    pub representative: String,
    /// Fingerprint of the representative as hex
    pub fingerprint: String,
    /// All members, representative first
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON group from a duplicate group.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup<HashedImage>) -> Self {
        let representative = group.representative();
        Self {
            representative: normalize_path(&representative.entry.path),
            fingerprint: representative.fingerprint.to_hex(),
            files: group
                .members()
                .iter()
                .map(|m| normalize_path(&m.entry.path))
                .collect(),
        }
    }
}

/// An image with no duplicates.
#[derive(Debug, Clone, Serialize)]
pub struct JsonImage {
    /// Absolute path
    pub path: String,
    /// Fingerprint as hex
    pub fingerprint: String,
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Hash algorithm used
    pub algorithm: PerceptualAlgorithm,
    /// Fingerprint width in bits
    pub hash_bits: u32,
    /// Similarity threshold
    pub threshold: u32,
    /// Image files found
    pub total_files: usize,
    /// Images fingerprinted
    pub images_hashed: usize,
    /// Images that could not be decoded
    pub skipped_images: usize,
    /// Files the walker could not read
    pub scan_errors: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Images belonging to a group
    pub grouped_images: usize,
    /// Group members other than the representative
    pub duplicate_files: usize,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Duration of the walking phase in milliseconds
    pub walk_duration_ms: u64,
    /// Duration of the hashing phase in milliseconds
    pub hash_duration_ms: u64,
    /// Duration of the grouping phase in milliseconds
    pub grouping_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "ID000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            algorithm: summary.algorithm,
            hash_bits: summary.hash_bits,
            threshold: summary.threshold,
            total_files: summary.total_files,
            images_hashed: summary.images_hashed,
            skipped_images: summary.skipped.len(),
            scan_errors: summary.scan_errors.len(),
            duplicate_groups: summary.duplicate_groups,
            grouped_images: summary.grouped_images,
            duplicate_files: summary.duplicate_files,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            walk_duration_ms: summary.walk_duration.as_millis() as u64,
            hash_duration_ms: summary.hash_duration.as_millis() as u64,
            grouping_duration_ms: summary.grouping_duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups in discovery order
    pub groups: Vec<JsonDuplicateGroup>,
    /// Images with no duplicates
    pub ungrouped: Vec<JsonImage>,
    /// Images that could not be decoded
    pub skipped: Vec<SkippedImage>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from a grouping result, summary and exit code.
    #[must_use]
    pub fn new(
        result: &GroupingResult<HashedImage>,
        summary: &ScanSummary,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            groups: result
                .groups()
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            ungrouped: result
                .ungrouped()
                .iter()
                .map(|image| JsonImage {
                    path: normalize_path(&image.entry.path),
                    fingerprint: image.fingerprint.to_hex(),
                })
                .collect(),
            skipped: summary.skipped.clone(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    ///
    /// # Example
    ///
    /// ```
    /// use imgdupe::duplicates::{GroupingResult, ScanSummary};
    /// use imgdupe::error::ExitCode;
    /// use imgdupe::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(
    ///     &GroupingResult::default(),
    ///     &ScanSummary::default(),
    ///     ExitCode::NoDuplicates,
    /// );
    /// let json = output.to_json_pretty().unwrap();
    /// assert!(json.contains('\n'));
    /// ```
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Normalize a path to an absolute path string.
///
/// Falls back to the path as given when it cannot be canonicalized.
pub(crate) fn normalize_path(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
