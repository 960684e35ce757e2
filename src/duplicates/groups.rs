//! Duplicate groups and the greedy similarity grouper.
//!
//! # Overview
//!
//! [`group_duplicates`] partitions an ordered list of `(reference, fingerprint)`
//! pairs into [`DuplicateGroup`]s. The procedure is a single forward pass:
//!
//! 1. Walk the list in order, skipping references already claimed.
//! 2. Seed a group with the current reference and compare the seed's
//!    fingerprint against every other unclaimed entry.
//! 3. Every entry within `threshold` joins the group and is claimed.
//! 4. Groups with a single member are dropped and their seed stays unclaimed.
//!
//! # Membership Is Seed-Relative
//!
//! Candidates are only ever compared with the seed, never with members that
//! joined later. With a chain where A~B and B~C but A is too far from C, C does
//! not join A's group even though it is close to a member of it; it is left
//! for a later seed, and since B is already claimed by then, C usually ends up
//! ungrouped. The outcome therefore depends on input order.
//!
//! It also means a larger threshold does not only merge groups: a seed that
//! now reaches further can claim a member out of a tighter group and strand
//! the rest of it.
//!
//! # Example
//!
//! ```
//! use imgdupe::duplicates::group_duplicates;
//! use imgdupe::scanner::Fingerprint;
//!
//! let images = vec![
//!     ("a.jpg", Fingerprint::from_u64(0)),
//!     ("b.jpg", Fingerprint::from_u64(0)),
//!     ("c.jpg", Fingerprint::from_u64(u64::MAX)),
//! ];
//!
//! let result = group_duplicates(&images, 5).unwrap();
//! assert_eq!(result.groups().len(), 1);
//! assert_eq!(result.groups()[0].members(), &["a.jpg", "b.jpg"]);
//! assert_eq!(result.ungrouped(), &["c.jpg"]);
//! ```

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::scanner::fingerprint::{distance, Fingerprint, FingerprintError};

/// Errors raised before grouping starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    /// Fingerprints of different widths were mixed in one input list.
    #[error(transparent)]
    WidthMismatch(#[from] FingerprintError),

    /// The threshold exceeds the fingerprint width.
    #[error("threshold {threshold} exceeds fingerprint width of {bits} bits")]
    ThresholdOutOfRange {
        /// Requested threshold
        threshold: u32,
        /// Fingerprint width
        bits: u32,
    },
}

/// A group of visually similar images.
///
/// The first member is the representative (the seed the others were matched
/// against); the rest follow in the order they were found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup<R> {
    members: Vec<R>,
}

impl<R> DuplicateGroup<R> {
    fn new(members: Vec<R>) -> Self {
        debug_assert!(members.len() > 1, "groups always have two or more members");
        Self { members }
    }

    /// The representative image.
    #[must_use]
    pub fn representative(&self) -> &R {
        &self.members[0]
    }

    /// Every member except the representative.
    #[must_use]
    pub fn duplicates(&self) -> &[R] {
        &self.members[1..]
    }

    /// All members, representative first.
    #[must_use]
    pub fn members(&self) -> &[R] {
        &self.members
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a constructed group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Outcome of one grouping pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupingResult<R> {
    groups: Vec<DuplicateGroup<R>>,
    ungrouped: Vec<R>,
}

impl<R> Default for GroupingResult<R> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            ungrouped: Vec::new(),
        }
    }
}

impl<R> GroupingResult<R> {
    /// Groups in the order their seeds appeared in the input.
    #[must_use]
    pub fn groups(&self) -> &[DuplicateGroup<R>] {
        &self.groups
    }

    /// References claimed by no group, in input order.
    #[must_use]
    pub fn ungrouped(&self) -> &[R] {
        &self.ungrouped
    }

    /// Total references across all groups.
    #[must_use]
    pub fn grouped_count(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::len).sum()
    }

    /// References that are not a group representative.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates().len()).sum()
    }

    /// True when no group was formed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<R: PartialEq> GroupingResult<R> {
    /// Whether `reference` belongs to any group.
    #[must_use]
    pub fn is_grouped(&self, reference: &R) -> bool {
        self.groups.iter().any(|g| g.members.contains(reference))
    }
}

/// Group images whose fingerprints are within `threshold` of a seed.
///
/// See the module docs for the exact procedure. Runs in O(n²) comparisons.
///
/// # Errors
///
/// - [`GroupError::WidthMismatch`] if the fingerprints differ in width
/// - [`GroupError::ThresholdOutOfRange`] if `threshold` exceeds the width
pub fn group_duplicates<R: Clone>(
    images: &[(R, Fingerprint)],
    threshold: u32,
) -> Result<GroupingResult<R>, GroupError> {
    validate(images, threshold)?;

    let n = images.len();
    let mut claimed = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        if claimed[i] {
            continue;
        }
        let seed = &images[i].1;
        let mut members = vec![i];
        for j in 0..n {
            if j == i || claimed[j] {
                continue;
            }
            if distance(seed, &images[j].1)? <= threshold {
                members.push(j);
                claimed[j] = true;
            }
        }
        if members.len() > 1 {
            claimed[i] = true;
            groups.push(members);
        }
    }

    Ok(collect(images, groups, &claimed))
}

/// Parallel variant of [`group_duplicates`] with identical output.
///
/// Each seed's in-range candidates are found in parallel; claims are then
/// replayed sequentially in input order so the first seed still wins.
///
/// # Errors
///
/// Same as [`group_duplicates`].
pub fn group_duplicates_parallel<R: Clone + Sync>(
    images: &[(R, Fingerprint)],
    threshold: u32,
) -> Result<GroupingResult<R>, GroupError> {
    validate(images, threshold)?;

    let candidates: Vec<Vec<usize>> = (0..images.len())
        .into_par_iter()
        .map(|i| {
            let seed = &images[i].1;
            images
                .iter()
                .enumerate()
                .filter(|&(j, (_, fp))| {
                    // Widths were validated above.
                    j != i && distance(seed, fp).is_ok_and(|d| d <= threshold)
                })
                .map(|(j, _)| j)
                .collect()
        })
        .collect();

    let mut claimed = vec![false; images.len()];
    let mut groups = Vec::new();
    for (i, matches) in candidates.into_iter().enumerate() {
        if claimed[i] {
            continue;
        }
        let mut members = vec![i];
        for j in matches {
            if !claimed[j] {
                members.push(j);
                claimed[j] = true;
            }
        }
        if members.len() > 1 {
            claimed[i] = true;
            groups.push(members);
        }
    }

    Ok(collect(images, groups, &claimed))
}

fn validate<R>(images: &[(R, Fingerprint)], threshold: u32) -> Result<(), GroupError> {
    let Some((_, first)) = images.first() else {
        return Ok(());
    };
    let bits = first.bits();
    if let Some((_, other)) = images.iter().find(|(_, fp)| fp.bits() != bits) {
        return Err(FingerprintError::WidthMismatch {
            left: bits,
            right: other.bits(),
        }
        .into());
    }
    if threshold > bits {
        return Err(GroupError::ThresholdOutOfRange { threshold, bits });
    }
    Ok(())
}

fn collect<R: Clone>(
    images: &[(R, Fingerprint)],
    groups: Vec<Vec<usize>>,
    claimed: &[bool],
) -> GroupingResult<R> {
    GroupingResult {
        groups: groups
            .into_iter()
            .map(|idx| DuplicateGroup::new(idx.into_iter().map(|k| images[k].0.clone()).collect()))
            .collect(),
        ungrouped: images
            .iter()
            .zip(claimed)
            .filter(|(_, c)| !**c)
            .map(|((r, _), _)| r.clone())
            .collect(),
    }
}
