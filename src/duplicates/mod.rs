//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Greedy seed-relative grouping of fingerprints ([`groups`])
//! - The walk → hash → group pipeline ([`finder`])

pub mod finder;
pub mod groups;

pub use finder::{
    DuplicateFinder, FinderConfig, FinderError, HashedImage, ScanSummary, SkippedImage,
    DEFAULT_THRESHOLD, RECOMMENDED_MAX_THRESHOLD,
};
pub use groups::{
    group_duplicates, group_duplicates_parallel, DuplicateGroup, GroupError, GroupingResult,
};
