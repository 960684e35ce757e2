//! Copying images into unique and duplicate folders.
//!
//! # Overview
//!
//! Given a grouping result, [`Organizer::organize`] copies:
//! - the representative of every group into the unique folder (`KEEP`)
//! - every other group member into the duplicate folder (`DUPLICATE`)
//! - every ungrouped image into the unique folder (`UNIQUE`)
//!
//! Originals are never moved or modified. Name collisions in a destination
//! folder are resolved by [`unique_destination`]. A failed copy is recorded
//! and the run continues.
//!
//! Every decision is appended, as it happens, to a plain-text audit log
//! named `image_copy_log_<YYYYmmdd_HHMMSS>.txt`.
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::actions::organize::{OrganizeConfig, Organizer};
//! use imgdupe::duplicates::GroupingResult;
//! use std::path::{Path, PathBuf};
//!
//! let result: GroupingResult<PathBuf> = GroupingResult::default();
//! let config = OrganizeConfig::for_source(Path::new("/photos"));
//! let report = Organizer::new(config).organize(&result, &[]).unwrap();
//! println!("{}", report.summary());
//! ```

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use thiserror::Error;

use crate::duplicates::GroupingResult;
use crate::progress::ProgressCallback;

/// Width of the separator lines in the audit log.
const RULE_WIDTH: usize = 80;

/// Error type for organize operations.
///
/// Individual copy failures are not errors; they are collected in
/// [`OrganizeReport::failures`].
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// An output directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The audit log could not be written.
    #[error("failed to write log {path}: {source}")]
    Log {
        /// Log file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Where an image ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementRole {
    /// Representative of a group, copied to the unique folder
    Keep,
    /// Non-representative group member, copied to the duplicate folder
    Duplicate,
    /// Image with no duplicates, copied to the unique folder
    Unique,
}

impl PlacementRole {
    /// Label used in the audit log.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Keep => "KEEP",
            Self::Duplicate => "DUPLICATE",
            Self::Unique => "UNIQUE",
        }
    }
}

/// A planned or completed copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Original image
    pub source: PathBuf,
    /// Copy destination
    pub destination: PathBuf,
    /// Why the image goes there
    pub role: PlacementRole,
}

/// A copy that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementFailure {
    /// Original image
    pub source: PathBuf,
    /// Intended destination
    pub destination: PathBuf,
    /// Intended role
    pub role: PlacementRole,
    /// Error message
    pub reason: String,
}

/// Configuration for organize operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeConfig {
    /// Folder receiving representatives and ungrouped images.
    pub unique_dir: PathBuf,
    /// Folder receiving non-representative group members.
    pub duplicate_dir: PathBuf,
    /// Folder for the audit log; the parent of `unique_dir` when unset.
    pub log_dir: Option<PathBuf>,
    /// Plan destinations without writing anything.
    pub dry_run: bool,
}

impl OrganizeConfig {
    /// Create a config with explicit output folders.
    #[must_use]
    pub fn new(unique_dir: PathBuf, duplicate_dir: PathBuf) -> Self {
        Self {
            unique_dir,
            duplicate_dir,
            log_dir: None,
            dry_run: false,
        }
    }

    /// Derive output folders from the scanned folder:
    /// `<parent>/<name>_unique` and `<parent>/<name>_duplicates`.
    #[must_use]
    pub fn for_source(source: &Path) -> Self {
        let parent = source.parent().unwrap_or_else(|| Path::new("."));
        let name = source
            .file_name()
            .map_or_else(|| "images".to_string(), |n| n.to_string_lossy().into_owned());
        Self::new(
            parent.join(format!("{name}_unique")),
            parent.join(format!("{name}_duplicates")),
        )
    }

    /// Set the audit log folder.
    #[must_use]
    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Folder the audit log is written to.
    #[must_use]
    pub fn effective_log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            self.unique_dir
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        })
    }
}

/// Results of an organize operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizeReport {
    /// Successful (or, in dry-run mode, planned) copies in order.
    pub placements: Vec<Placement>,
    /// Failed copies.
    pub failures: Vec<PlacementFailure>,
    /// Number of duplicate groups processed.
    pub group_count: usize,
    /// Images copied to the duplicate folder.
    pub duplicates_copied: usize,
    /// Images copied to the unique folder.
    pub uniques_copied: usize,
    /// Audit log location; `None` in dry-run mode.
    pub log_path: Option<PathBuf>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl OrganizeReport {
    /// Check if all copies succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = if self.dry_run { "Would copy" } else { "Copied" };
        let mut summary = format!(
            "{} {} unique and {} duplicate image(s) from {} group(s)",
            verb, self.uniques_copied, self.duplicates_copied, self.group_count
        );
        if !self.all_succeeded() {
            summary.push_str(&format!(", {} failed", self.failures.len()));
        }
        summary
    }

    fn record(&mut self, placement: Placement) {
        match placement.role {
            PlacementRole::Duplicate => self.duplicates_copied += 1,
            PlacementRole::Keep | PlacementRole::Unique => self.uniques_copied += 1,
        }
        self.placements.push(placement);
    }
}

/// Pick a free destination for `file_name` inside `dir`.
///
/// Returns `dir/file_name` if nothing exists there, otherwise the first free
/// `dir/<stem>_<n><.ext>` for `n = 1, 2, ...`.
#[must_use]
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    next_free(dir, file_name, |p| p.exists())
}

fn next_free(dir: &Path, file_name: &str, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let candidate = dir.join(file_name);
    if !taken(&candidate) {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map_or_else(|| file_name.to_string(), |s| s.to_string_lossy().into_owned());
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter: u64 = 1;
    loop {
        let candidate = dir.join(format!("{stem}_{counter}{ext}"));
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Copies grouped images into the configured folders.
pub struct Organizer {
    config: OrganizeConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
    /// Destinations already handed out during this run.
    planned: HashSet<PathBuf>,
}

impl Organizer {
    /// Create a new organizer.
    #[must_use]
    pub fn new(config: OrganizeConfig) -> Self {
        Self {
            config,
            progress: None,
            planned: HashSet::new(),
        }
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Copy every image of `result` to its folder.
    ///
    /// `extra_uniques` are images outside the grouping result, typically
    /// the ones that could not be decoded; they are copied to the unique
    /// folder after the ungrouped images.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError` if an output folder cannot be created or the
    /// audit log cannot be written. Failed copies are reported in
    /// [`OrganizeReport::failures`] instead.
    pub fn organize<R: AsRef<Path>>(
        mut self,
        result: &GroupingResult<R>,
        extra_uniques: &[PathBuf],
    ) -> Result<OrganizeReport, OrganizeError> {
        let dry_run = self.config.dry_run;
        if !dry_run {
            for dir in [&self.config.unique_dir, &self.config.duplicate_dir] {
                fs::create_dir_all(dir).map_err(|source| OrganizeError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
            }
        }

        let started = Local::now();
        let mut log = if dry_run {
            AuditLog::disabled()
        } else {
            let log_path = self.config.effective_log_dir().join(format!(
                "image_copy_log_{}.txt",
                started.format("%Y%m%d_%H%M%S")
            ));
            AuditLog::create(log_path)?
        };
        log.line(format!(
            "Image copy log - {}",
            started.format("%Y-%m-%d %H:%M:%S")
        ))?;
        log.rule()?;
        log.blank()?;

        let mut report = OrganizeReport {
            group_count: result.groups().len(),
            log_path: log.path().map(Path::to_path_buf),
            dry_run,
            ..Default::default()
        };

        let total = result.grouped_count() + result.ungrouped().len() + extra_uniques.len();
        if let Some(cb) = &self.progress {
            cb.on_phase_start("organizing", total);
        }
        let mut done = 0;

        log.line("Duplicate groups:")?;
        for (index, group) in result.groups().iter().enumerate() {
            log.line(format!(
                "  Group #{} ({} images):",
                index + 1,
                group.len()
            ))?;
            for (position, member) in group.members().iter().enumerate() {
                let role = if position == 0 {
                    PlacementRole::Keep
                } else {
                    PlacementRole::Duplicate
                };
                self.place(member.as_ref(), role, &mut report, &mut log, "    ")?;
                done += 1;
                self.tick(done, member.as_ref());
            }
            log.blank()?;
        }

        log.blank()?;
        log.line("Images without duplicates:")?;
        let singles = result
            .ungrouped()
            .iter()
            .map(<R as AsRef<Path>>::as_ref)
            .chain(extra_uniques.iter().map(PathBuf::as_path));
        for image in singles {
            self.place(image, PlacementRole::Unique, &mut report, &mut log, "  ")?;
            done += 1;
            self.tick(done, image);
        }

        log.blank()?;
        log.rule()?;
        log.line("Summary:")?;
        log.line(format!(
            "- {} duplicate group(s), {} duplicate image(s) copied to {}",
            report.group_count,
            report.duplicates_copied,
            self.config.duplicate_dir.display()
        ))?;
        log.line(format!(
            "- {} unique image(s) copied to {}",
            report.uniques_copied,
            self.config.unique_dir.display()
        ))?;
        log.line(format!("- {} failure(s)", report.failures.len()))?;
        log.finish()?;

        if let Some(cb) = &self.progress {
            cb.on_phase_end("organizing");
        }

        if let Some(ref log_path) = report.log_path {
            log::info!("Copy log written to {}", log_path.display());
        }
        log::info!("{}", report.summary());
        Ok(report)
    }

    fn tick(&self, done: usize, path: &Path) {
        if let Some(cb) = &self.progress {
            cb.on_progress(done, &path.to_string_lossy());
        }
    }

    fn place(
        &mut self,
        source: &Path,
        role: PlacementRole,
        report: &mut OrganizeReport,
        log: &mut AuditLog,
        indent: &str,
    ) -> Result<(), OrganizeError> {
        let dir = match role {
            PlacementRole::Duplicate => &self.config.duplicate_dir,
            PlacementRole::Keep | PlacementRole::Unique => &self.config.unique_dir,
        };
        let file_name = source
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

        let planned = &self.planned;
        let destination = next_free(dir, &file_name, |p| planned.contains(p) || p.exists());
        self.planned.insert(destination.clone());

        let outcome = if self.config.dry_run {
            Ok(())
        } else {
            fs::copy(source, &destination).map(|_| ())
        };

        match outcome {
            Ok(()) => {
                log::debug!(
                    "{} {} -> {}",
                    role.label(),
                    source.display(),
                    destination.display()
                );
                log.line(format!(
                    "{indent}{}: {} -> {}",
                    role.label(),
                    source.display(),
                    destination.display()
                ))?;
                report.record(Placement {
                    source: source.to_path_buf(),
                    destination,
                    role,
                });
            }
            Err(e) => {
                log::warn!("Failed to copy {}: {}", source.display(), e);
                log.line(format!(
                    "{indent}FAILED ({}): {}: {}",
                    role.label(),
                    source.display(),
                    e
                ))?;
                report.failures.push(PlacementFailure {
                    source: source.to_path_buf(),
                    destination,
                    role,
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Audit log sink; every line is flushed to the file as it is written.
/// Writes nothing in dry-run mode.
struct AuditLog {
    path: PathBuf,
    writer: Option<LineWriter<File>>,
}

impl AuditLog {
    fn create(path: PathBuf) -> Result<Self, OrganizeError> {
        let to_err = |source: io::Error| OrganizeError::Log {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(to_err)?;
        }
        let file = File::create(&path).map_err(to_err)?;
        Ok(Self {
            path,
            writer: Some(LineWriter::new(file)),
        })
    }

    fn disabled() -> Self {
        Self {
            path: PathBuf::new(),
            writer: None,
        }
    }

    fn path(&self) -> Option<&Path> {
        self.writer.as_ref().map(|_| self.path.as_path())
    }

    fn line(&mut self, text: impl AsRef<str>) -> Result<(), OrganizeError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writeln!(writer, "{}", text.as_ref()).map_err(|source| OrganizeError::Log {
            path: self.path.clone(),
            source,
        })
    }

    fn blank(&mut self) -> Result<(), OrganizeError> {
        self.line("")
    }

    fn rule(&mut self) -> Result<(), OrganizeError> {
        self.line("=".repeat(RULE_WIDTH))
    }

    fn finish(&mut self) -> Result<(), OrganizeError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writer.flush().map_err(|source| OrganizeError::Log {
            path: self.path.clone(),
            source,
        })
    }
}
