//! File actions module.
//!
//! Currently a single action: copying the scanned images into a unique and
//! a duplicate folder, with an audit log.
//!
//! ```no_run
//! use imgdupe::actions::{OrganizeConfig, Organizer};
//! use imgdupe::duplicates::GroupingResult;
//! use std::path::{Path, PathBuf};
//!
//! let result: GroupingResult<PathBuf> = GroupingResult::default();
//! let config = OrganizeConfig::for_source(Path::new("/photos")).with_dry_run(true);
//! let report = Organizer::new(config).organize(&result, &[]).unwrap();
//! for placement in &report.placements {
//!     println!("{:?} {}", placement.role, placement.destination.display());
//! }
//! ```

pub mod organize;

pub use organize::{
    unique_destination, OrganizeConfig, OrganizeError, OrganizeReport, Organizer, Placement,
    PlacementFailure, PlacementRole,
};
