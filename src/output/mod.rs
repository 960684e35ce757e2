//! Output formatters for duplicate scan results.
//!
//! This module provides different output formats for scan results:
//! - Text for people
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
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

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;
