//! CSV output formatter for duplicate scan results.
//!
//! One row is generated for each image that belongs to a duplicate group.
//!
//! # Columns
//!
//! - `group_id`: 1-based group number, in discovery order
//! - `role`: `representative` or `duplicate`
//! - `path`: Absolute path to the image
//! - `fingerprint`: Hex fingerprint of the image
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::duplicates::DuplicateFinder;
//! use imgdupe::output::csv::CsvOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (result, _) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! let output = CsvOutput::new(&result);
//! output.write_to(std::io::stdout()).unwrap();
//! ```

use std::io;

use serde::Serialize;
use thiserror::Error;

use super::json::normalize_path;
use crate::duplicates::{GroupingResult, HashedImage};

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    Representative,
    Duplicate,
}

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow {
    group_id: usize,
    role: Role,
    path: String,
    fingerprint: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    result: &'a GroupingResult<HashedImage>,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(result: &'a GroupingResult<HashedImage>) -> Self {
        Self { result }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.result.groups().iter().enumerate() {
            for (position, member) in group.members().iter().enumerate() {
                let role = if position == 0 {
                    Role::Representative
                } else {
                    Role::Duplicate
                };
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    role,
                    path: normalize_path(&member.entry.path),
                    fingerprint: member.fingerprint.to_hex(),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
