//! Command-line interface definitions for imgdupe.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Report duplicate images
//! imgdupe scan ~/Pictures
//!
//! # Stricter matching with pHash, as JSON
//! imgdupe scan ~/Pictures -a phash -t 3 --output json
//!
//! # Copy into ~/Pictures_unique and ~/Pictures_duplicates without asking
//! imgdupe scan ~/Pictures --organize -y
//!
//! # Fingerprint single files, compare two fingerprints
//! imgdupe hash a.jpg b.jpg
//! imgdupe compare f0e0d0c0b0a09080 f0e0d0c0b0a09081
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::scanner::PerceptualAlgorithm;

/// Perceptual duplicate image finder.
///
/// Fingerprints every image under a folder, groups visually similar images
/// and optionally copies them into "unique" and "duplicates" folders.
#[derive(Debug, Parser)]
#[command(name = "imgdupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a folder for duplicate images
    Scan(ScanArgs),
    /// Print the fingerprint of image files
    Hash(HashArgs),
    /// Print the Hamming distance between two hex fingerprints
    Compare(CompareArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Folder to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Hash algorithm [default: dhash]
    #[arg(short, long, value_enum)]
    pub algorithm: Option<PerceptualAlgorithm>,

    /// Maximum Hamming distance for two images to be duplicates [default: 5]
    ///
    /// 0-10 is the useful range for 64-bit fingerprints; lower is stricter.
    #[arg(short, long, value_name = "N")]
    pub threshold: Option<u32>,

    /// Reduction size N; fingerprints have N*N bits [default: 8]
    #[arg(long, value_name = "N")]
    pub hash_size: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Copy images into unique and duplicate folders
    #[arg(long)]
    pub organize: bool,

    /// Folder for unique images [default: <PATH>_unique]
    #[arg(long, value_name = "DIR", requires = "organize")]
    pub unique_dir: Option<PathBuf>,

    /// Folder for duplicate images [default: <PATH>_duplicates]
    #[arg(long, value_name = "DIR", requires = "organize")]
    pub duplicate_dir: Option<PathBuf>,

    /// Folder for the copy log [default: parent of the unique folder]
    #[arg(long, value_name = "DIR", requires = "organize")]
    pub log_dir: Option<PathBuf>,

    /// Show where images would be copied without copying
    #[arg(long, requires = "organize")]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Number of worker threads for decoding [default: 4]
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Follow symbolic links during scan
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Glob patterns to ignore (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,
}

/// Arguments for the hash subcommand.
#[derive(Debug, Args)]
pub struct HashArgs {
    /// Image files
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Hash algorithm [default: dhash]
    #[arg(short, long, value_enum)]
    pub algorithm: Option<PerceptualAlgorithm>,

    /// Reduction size N [default: 8]
    #[arg(long, value_name = "N")]
    pub hash_size: Option<u32>,
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// First fingerprint (hex)
    #[arg(value_name = "HEX")]
    pub first: String,

    /// Second fingerprint (hex)
    #[arg(value_name = "HEX")]
    pub second: String,

    /// Reduction size N the fingerprints were made with [default: 8]
    #[arg(long, value_name = "N")]
    pub hash_size: Option<u32>,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON for scripting
    Json,
    /// CSV, one row per grouped image
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn scan_args(args: &[&str]) -> ScanArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Scan(scan) => scan,
            other => panic!("expected scan, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_scan_basic() {
        let scan = scan_args(&["imgdupe", "scan", "/photos"]);
        assert_eq!(scan.path, PathBuf::from("/photos"));
        assert_eq!(scan.output, OutputFormat::Text);
        assert!(scan.algorithm.is_none());
        assert!(scan.threshold.is_none());
        assert!(!scan.organize);
    }

    #[test]
    fn test_cli_parse_scan_with_options() {
        let scan = scan_args(&[
            "imgdupe",
            "scan",
            "/photos",
            "-a",
            "phash",
            "-t",
            "3",
            "--hash-size",
            "16",
            "--output",
            "csv",
            "--threads",
            "2",
            "--skip-hidden",
            "-i",
            "*.tmp.jpg",
            "-i",
            "thumbs/",
        ]);
        assert_eq!(scan.algorithm, Some(PerceptualAlgorithm::Phash));
        assert_eq!(scan.threshold, Some(3));
        assert_eq!(scan.hash_size, Some(16));
        assert_eq!(scan.output, OutputFormat::Csv);
        assert_eq!(scan.threads, Some(2));
        assert!(scan.skip_hidden);
        assert_eq!(scan.ignore_patterns, vec!["*.tmp.jpg", "thumbs/"]);
    }

    #[test]
    fn test_cli_parse_organize_flags() {
        let scan = scan_args(&[
            "imgdupe",
            "scan",
            "/photos",
            "--organize",
            "--unique-dir",
            "/out/u",
            "--duplicate-dir",
            "/out/d",
            "--log-dir",
            "/out",
            "--dry-run",
            "-y",
        ]);
        assert!(scan.organize);
        assert!(scan.dry_run);
        assert!(scan.yes);
        assert_eq!(scan.unique_dir, Some(PathBuf::from("/out/u")));
        assert_eq!(scan.duplicate_dir, Some(PathBuf::from("/out/d")));
        assert_eq!(scan.log_dir, Some(PathBuf::from("/out")));
    }

    #[test]
    fn test_cli_dry_run_requires_organize() {
        assert!(Cli::try_parse_from(["imgdupe", "scan", "/p", "--dry-run"]).is_err());
        assert!(Cli::try_parse_from(["imgdupe", "scan", "/p", "--unique-dir", "/u"]).is_err());
    }

    #[test]
    fn test_cli_unknown_algorithm() {
        assert!(Cli::try_parse_from(["imgdupe", "scan", "/p", "-a", "whash"]).is_err());
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["imgdupe", "-q", "-v", "scan", "/p"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "imgdupe",
            "scan",
            "/p",
            "-vv",
            "--json-errors",
            "--config",
            "/etc/imgdupe.toml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json_errors);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/imgdupe.toml")));
    }

    #[test]
    fn test_cli_parse_hash() {
        let cli =
            Cli::try_parse_from(["imgdupe", "hash", "a.jpg", "b.png", "-a", "ahash"]).unwrap();
        match cli.command {
            Commands::Hash(args) => {
                assert_eq!(args.files.len(), 2);
                assert_eq!(args.algorithm, Some(PerceptualAlgorithm::Ahash));
            }
            other => panic!("expected hash, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["imgdupe", "hash"]).is_err());
    }

    #[test]
    fn test_cli_parse_compare() {
        let cli = Cli::try_parse_from(["imgdupe", "compare", "ff", "0f", "--hash-size", "3"])
            .unwrap();
        match cli.command {
            Commands::Compare(args) => {
                assert_eq!(args.first, "ff");
                assert_eq!(args.second, "0f");
                assert_eq!(args.hash_size, Some(3));
            }
            other => panic!("expected compare, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_missing_path() {
        assert!(Cli::try_parse_from(["imgdupe", "scan"]).is_err());
    }
}
