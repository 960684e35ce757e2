//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//! 1. [`Config::default()`]
//! 2. A TOML file: `--config FILE`, or `config.toml` in the platform
//!    config directory
//! 3. Environment variables prefixed `IMGDUPE_` (e.g. `IMGDUPE_THRESHOLD=3`)
//! 4. Command-line flags, applied by the caller
//!
//! ```toml
//! algorithm = "phash"
//! threshold = 4
//! hash_size = 16
//! threads = 8
//! skip_hidden = true
//! extensions = ["jpg", "png"]
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::DEFAULT_THRESHOLD;
use crate::scanner::{HashSize, PerceptualAlgorithm, IMAGE_EXTENSIONS};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "IMGDUPE_";

/// Configuration errors. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or did not match the schema.
    #[error("invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    /// The threshold exceeds the fingerprint width.
    #[error("threshold {threshold} exceeds the {bits}-bit fingerprint width")]
    ThresholdTooLarge {
        /// Configured threshold
        threshold: u32,
        /// Fingerprint width
        bits: u32,
    },

    /// No worker threads configured.
    #[error("threads must be at least 1")]
    ZeroThreads,

    /// The extension list is empty.
    #[error("extensions must not be empty")]
    NoExtensions,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hash algorithm.
    pub algorithm: PerceptualAlgorithm,
    /// Similarity threshold (Hamming distance).
    pub threshold: u32,
    /// Reduction size; fingerprints are `hash_size²` bits.
    pub hash_size: HashSize,
    /// Worker threads for decoding and hashing.
    pub threads: usize,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Accepted image extensions, without the dot.
    pub extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: PerceptualAlgorithm::default(),
            threshold: DEFAULT_THRESHOLD,
            hash_size: HashSize::default(),
            threads: 4,
            follow_symlinks: false,
            skip_hidden: false,
            extensions: IMAGE_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// With `path`, that file must exist. Without it, the platform config
    /// file is used when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a layer is malformed or the result is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::MissingFile(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };
        if let Some(ref f) = file {
            log::debug!("Loading configuration from {}", f.display());
        }
        Self::figment(file.as_deref())
            .extract::<Self>()
            .map_err(Box::new)?
            .validated()
    }

    /// The layered figment, without validation.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check the constraints that do not depend on command-line overrides.
    ///
    /// The threshold is checked separately by [`check_threshold`] once the
    /// final hash size is known.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        self.extensions = self
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if self.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        Ok(self)
    }

    /// Platform-specific config file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "imgdupe", "imgdupe").map(|d| d.config_dir().join("config.toml"))
    }
}

/// Check that `threshold` fits the fingerprint width of `hash_size`.
///
/// # Errors
///
/// Returns [`ConfigError::ThresholdTooLarge`] when it does not.
pub fn check_threshold(threshold: u32, hash_size: HashSize) -> Result<(), ConfigError> {
    let bits = hash_size.bits();
    if threshold > bits {
        return Err(ConfigError::ThresholdTooLarge { threshold, bits });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.algorithm, PerceptualAlgorithm::Dhash);
        assert_eq!(config.threshold, 5);
        assert_eq!(config.hash_size.get(), 8);
        assert_eq!(config.threads, 4);
        assert_eq!(config.extensions.len(), IMAGE_EXTENSIONS.len());
    }

    #[test]
    fn test_config_from_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "algorithm = \"ahash\"\nthreshold = 12\nhash_size = 16\nextensions = [\".PNG\"]\n",
        )
        .unwrap();

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .extract()
            .unwrap();
        let config = config.validated().unwrap();

        assert_eq!(config.algorithm, PerceptualAlgorithm::Ahash);
        assert_eq!(config.threshold, 12);
        assert_eq!(config.hash_size.bits(), 256);
        assert_eq!(config.extensions, vec!["png"]);
        assert_eq!(config.threads, 4);
    }

    #[test]
    fn test_config_rejects_bad_hash_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "hash_size = 1\n").unwrap();

        let result = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .extract::<Config>();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_rejects_unknown_algorithm() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "algorithm = \"whash\"\n").unwrap();

        let result = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .extract::<Config>();
        assert!(result.is_err());
    }

    #[test]
    fn test_check_threshold() {
        let size = HashSize::default();
        assert!(check_threshold(0, size).is_ok());
        assert!(check_threshold(64, size).is_ok());
        assert!(matches!(
            check_threshold(65, size),
            Err(ConfigError::ThresholdTooLarge {
                threshold: 65,
                bits: 64
            })
        ));
        assert!(check_threshold(100, HashSize::new(16).unwrap()).is_ok());
    }

    #[test]
    fn test_validated_leaves_threshold_to_the_caller() {
        // A wide threshold may still fit a larger --hash-size given later.
        let config = Config {
            threshold: 100,
            ..Default::default()
        };
        assert_eq!(config.validated().unwrap().threshold, 100);
    }

    #[test]
    fn test_validated_zero_threads_and_empty_extensions() {
        let config = Config {
            threads: 0,
            ..Default::default()
        };
        assert!(matches!(config.validated(), Err(ConfigError::ZeroThreads)));

        let config = Config {
            extensions: vec![" ".to_string()],
            ..Default::default()
        };
        assert!(matches!(config.validated(), Err(ConfigError::NoExtensions)));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/nonexistent/imgdupe.toml")));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("imgdupe.toml");
        fs::write(&path, "algorithm = \"phash\"\nthreads = 2\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.algorithm, PerceptualAlgorithm::Phash);
        assert_eq!(config.threads, 2);
    }
}
