//! Scanner module for image discovery and fingerprinting.
//!
//! This module provides functionality for:
//! - Directory walking with image-extension filtering
//! - Perceptual fingerprinting (dHash, simplified pHash, aHash)
//! - Fingerprint hex encoding and Hamming distance
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and image discovery
//! - [`perceptual`]: Decoding, grayscale reduction and the hash algorithms
//! - [`fingerprint`]: The fingerprint bit vector and the distance metric
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::scanner::{PerceptualHasher, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let hasher = PerceptualHasher::default();
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(image) => match hasher.compute_hash(&image.path) {
//!             Ok(fp) => println!("{fp}  {}", image.path.display()),
//!             Err(e) => eprintln!("Skipping: {e}"),
//!         },
//!         Err(e) => eprintln!("Warning: {e}"),
//!     }
//! }
//! ```

pub mod fingerprint;
pub mod perceptual;
pub mod walker;

use std::path::PathBuf;

use serde::Serialize;

// Re-export main types
pub use fingerprint::{distance, Fingerprint, FingerprintError};
pub use perceptual::{HashSize, PerceptualAlgorithm, PerceptualError, PerceptualHasher};
pub use walker::Walker;

/// File extensions recognised as images (lowercase, without the dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp"];

/// A discovered image file.
///
/// Only the path and size are kept; decoded pixels are dropped as soon as the
/// fingerprint has been computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageEntry {
    /// Path to the image
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl ImageEntry {
    /// Create a new ImageEntry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }

    /// File name component, or the full path when there is none.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

impl AsRef<std::path::Path> for ImageEntry {
    fn as_ref(&self) -> &std::path::Path {
        &self.path
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Accepted extensions, lowercase without the dot.
    pub extensions: Vec<String>,

    /// Glob patterns to ignore (gitignore-style).
    pub ignore_patterns: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            skip_hidden: false,
            extensions: IMAGE_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            ignore_patterns: Vec::new(),
        }
    }
}

impl WalkerConfig {
    /// Whether `path` has one of the accepted extensions (case-insensitive).
    #[must_use]
    pub fn accepts(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::Io { path: p, .. } => p,
        }
    }
}
