//! Perceptual image hashing for similarity detection.
//!
//! This module provides the [`PerceptualHasher`] which reduces an image to a
//! fixed-width [`Fingerprint`] using one of three algorithms:
//!
//! - **dHash** compares each pixel with its right-hand neighbour on an
//!   `(n+1) x n` reduction.
//! - **pHash (simplified)** thresholds an `n x n` reduction against the mean of
//!   every cell except the top-left one. No frequency transform is applied; the
//!   raw pixel grid stands in for the DCT coefficients.
//! - **aHash** thresholds an `n x n` reduction against the mean of all cells.
//!
//! # Resampling Policy
//!
//! Images are converted to 8-bit luma first (Rec. 709 weights, as done by
//! [`DynamicImage::to_luma8`]) and then resized with
//! [`FilterType::Triangle`] (bilinear) to the exact target size, ignoring the
//! aspect ratio. An input already at the target size is used as-is. Hash values
//! depend on this policy, so it must not change between runs that are compared.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fingerprint::Fingerprint;

/// Smallest accepted reduction size.
pub const MIN_HASH_SIZE: u32 = 2;
/// Largest accepted reduction size.
pub const MAX_HASH_SIZE: u32 = 64;
/// Default reduction size (64-bit fingerprints).
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Resampling filter used for every reduction.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Supported perceptual hashing algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PerceptualAlgorithm {
    /// dHash (Difference Hash) - horizontal gradient sign.
    #[default]
    Dhash,
    /// pHash, simplified - pixel grid against the mean excluding the top-left cell.
    Phash,
    /// aHash (Average Hash) - pixel grid against the overall mean.
    Ahash,
}

impl PerceptualAlgorithm {
    /// All algorithms, in selector order.
    pub const ALL: [Self; 3] = [Self::Dhash, Self::Phash, Self::Ahash];

    /// Lowercase selector name as accepted on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Dhash => "dhash",
            Self::Phash => "phash",
            Self::Ahash => "ahash",
        }
    }
}

impl std::fmt::Display for PerceptualAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dhash => write!(f, "dHash"),
            Self::Phash => write!(f, "pHash"),
            Self::Ahash => write!(f, "aHash"),
        }
    }
}

impl FromStr for PerceptualAlgorithm {
    type Err = PerceptualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dhash" => Ok(Self::Dhash),
            "phash" => Ok(Self::Phash),
            "ahash" => Ok(Self::Ahash),
            _ => Err(PerceptualError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Reduction size `n`; fingerprints are `n * n` bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct HashSize(u32);

impl HashSize {
    /// Validate a reduction size.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::InvalidHashSize`] outside
    /// `MIN_HASH_SIZE..=MAX_HASH_SIZE`.
    pub fn new(n: u32) -> Result<Self, PerceptualError> {
        if (MIN_HASH_SIZE..=MAX_HASH_SIZE).contains(&n) {
            Ok(Self(n))
        } else {
            Err(PerceptualError::InvalidHashSize(n))
        }
    }

    /// The reduction size `n`.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Fingerprint width, `n * n`.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0 * self.0
    }
}

impl Default for HashSize {
    fn default() -> Self {
        Self(DEFAULT_HASH_SIZE)
    }
}

impl TryFrom<u32> for HashSize {
    type Error = PerceptualError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<HashSize> for u32 {
    fn from(size: HashSize) -> Self {
        size.0
    }
}

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// Failed to open or decode the image.
    #[error("failed to decode image {path}: {source}")]
    Decode {
        /// Image that could not be decoded
        path: PathBuf,
        /// Underlying decoder error
        #[source]
        source: image::ImageError,
    },

    /// The decoded image has no pixels.
    #[error("image has zero width or height")]
    EmptyImage,

    /// Reduction size outside the supported range.
    #[error("hash size {0} out of range ({MIN_HASH_SIZE}..={MAX_HASH_SIZE})")]
    InvalidHashSize(u32),

    /// Unknown algorithm selector.
    #[error("unknown hash algorithm '{0}' (expected dhash, phash or ahash)")]
    UnknownAlgorithm(String),
}

/// Computes perceptual fingerprints for images.
///
/// The hasher holds no state beyond its configuration; identical pixel input
/// always produces an identical fingerprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualHasher {
    algorithm: PerceptualAlgorithm,
    hash_size: HashSize,
}

impl PerceptualHasher {
    /// Create a new `PerceptualHasher`.
    #[must_use]
    pub fn new(algorithm: PerceptualAlgorithm, hash_size: HashSize) -> Self {
        Self {
            algorithm,
            hash_size,
        }
    }

    /// Get the algorithm used by this hasher.
    #[must_use]
    pub fn algorithm(&self) -> PerceptualAlgorithm {
        self.algorithm
    }

    /// Get the reduction size used by this hasher.
    #[must_use]
    pub fn hash_size(&self) -> HashSize {
        self.hash_size
    }

    /// Width of every fingerprint this hasher produces.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.hash_size.bits()
    }

    /// Decode the image at `path` and fingerprint it.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::Decode`] if the file cannot be read or
    /// decoded. Callers are expected to skip the image and continue.
    pub fn compute_hash<P: AsRef<Path>>(&self, path: P) -> Result<Fingerprint, PerceptualError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| PerceptualError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        self.hash_image(&img)
    }

    /// Fingerprint an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::EmptyImage`] for a zero-sized image.
    pub fn hash_image(&self, img: &DynamicImage) -> Result<Fingerprint, PerceptualError> {
        self.hash_luma(&img.to_luma8())
    }

    /// Fingerprint a grayscale buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::EmptyImage`] for a zero-sized buffer.
    pub fn hash_luma(&self, gray: &GrayImage) -> Result<Fingerprint, PerceptualError> {
        if gray.width() == 0 || gray.height() == 0 {
            return Err(PerceptualError::EmptyImage);
        }

        let n = self.hash_size.get();
        let fp = match self.algorithm {
            PerceptualAlgorithm::Dhash => difference_hash(&reduce(gray, n + 1, n), n),
            PerceptualAlgorithm::Phash => simplified_phash(&reduce(gray, n, n)),
            PerceptualAlgorithm::Ahash => average_hash(&reduce(gray, n, n)),
        };
        debug_assert_eq!(fp.bits(), self.bits());
        Ok(fp)
    }
}

/// Resize to exactly `width x height` under the fixed resampling policy.
fn reduce(gray: &GrayImage, width: u32, height: u32) -> GrayImage {
    if gray.dimensions() == (width, height) {
        return gray.clone();
    }
    imageops::resize(gray, width, height, RESIZE_FILTER)
}

/// dHash over an `(n+1) x n` buffer: bit is set when a pixel is brighter than
/// its right neighbour.
fn difference_hash(reduced: &GrayImage, n: u32) -> Fingerprint {
    let row_len = (n + 1) as usize;
    let pixels = reduced.as_raw();
    Fingerprint::from_bits(pixels.chunks_exact(row_len).flat_map(|row| {
        row.windows(2).map(|pair| pair[0] > pair[1])
    }))
}

/// pHash-simplified over an `n x n` buffer.
fn simplified_phash(reduced: &GrayImage) -> Fingerprint {
    let pixels = reduced.as_raw();
    let total: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
    let mean = (total - u64::from(pixels[0])) as f64 / (pixels.len() - 1) as f64;
    Fingerprint::from_bits(pixels.iter().map(|&p| f64::from(p) >= mean))
}

/// aHash over an `n x n` buffer.
fn average_hash(reduced: &GrayImage) -> Fingerprint {
    let pixels = reduced.as_raw();
    let total: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
    let mean = total as f64 / pixels.len() as f64;
    Fingerprint::from_bits(pixels.iter().map(|&p| f64::from(p) >= mean))
}
