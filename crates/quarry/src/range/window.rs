use chrono::NaiveDate;

use super::{CompositeRange, IdRange, LeafRange};
use crate::{Error, Outcome, Result};

/// Declares one quota window: an ID interval, the calendar span it stands
/// for, and the minimum number of hits to collect from it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowSpec {
    /// First ID in the window (inclusive).
    pub start_id: u64,
    /// End of the window (exclusive).
    pub end_id: u64,
    /// First day the window stands for. Only used for reporting.
    pub display_start: NaiveDate,
    /// Day after the last one the window stands for. Only used for reporting.
    pub display_end: NaiveDate,
    /// Minimum number of hits to collect.
    pub min_quota: u64,
}

/// A [`CompositeRange`] of fixed-size [`LeafRange`]s with a minimum quota.
///
/// The leaves tile `[start_id, end_id)` in steps of `leaf_size`; the last leaf
/// is truncated to fit. `needed` is `max(0, min_quota - hits)`, so it only ever
/// decreases and stays at zero once the quota is met.
#[derive(Clone, Debug)]
pub struct QuotaWindow {
    leaves: CompositeRange<LeafRange>,
    min_quota: u64,
    display_start: NaiveDate,
    display_end: NaiveDate,
}

impl QuotaWindow {
    /// Builds the window described by `spec`, split into leaves of at most
    /// `leaf_size` IDs.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLeafSize`] if `leaf_size` is zero.
    /// - [`Error::EmptyRange`] if the spec's interval is empty.
    pub fn new(spec: &WindowSpec, leaf_size: u64) -> Result<Self> {
        if leaf_size == 0 {
            return Err(Error::InvalidLeafSize);
        }
        let (start, end) = (spec.start_id, spec.end_id);
        if start >= end {
            return Err(Error::EmptyRange { start, end });
        }

        let mut leaves = Vec::new();
        let mut leaf_start = start;
        while leaf_start < end {
            let leaf_end = leaf_start.saturating_add(leaf_size).min(end);
            leaves.push(LeafRange::new(leaf_start, leaf_end)?);
            leaf_start = leaf_end;
        }

        Ok(Self {
            leaves: CompositeRange::new(leaves)?,
            min_quota: spec.min_quota,
            display_start: spec.display_start,
            display_end: spec.display_end,
        })
    }

    pub const fn min_quota(&self) -> u64 {
        self.min_quota
    }

    pub const fn display_start(&self) -> NaiveDate {
        self.display_start
    }

    pub const fn display_end(&self) -> NaiveDate {
        self.display_end
    }

    pub fn leaves(&self) -> &[LeafRange] {
        self.leaves.children()
    }

    /// Finds the leaf that owns `id`.
    pub fn leaf_for(&self, id: u64) -> Option<&LeafRange> {
        self.leaves.child_for(id)
    }
}

impl IdRange for QuotaWindow {
    fn start_id(&self) -> u64 {
        self.leaves.start_id()
    }

    fn end_id(&self) -> u64 {
        self.leaves.end_id()
    }

    fn hits(&self) -> u64 {
        self.leaves.hits()
    }

    fn misses(&self) -> u64 {
        self.leaves.misses()
    }

    fn needed(&self) -> u64 {
        self.min_quota.saturating_sub(self.hits())
    }

    fn quota(&self) -> u64 {
        self.min_quota
    }

    fn draw(&mut self, n: usize) -> Vec<u64> {
        self.leaves.draw(n)
    }

    fn record_outcome(&mut self, id: u64, outcome: Outcome) -> Result<()> {
        self.leaves.record_outcome(id, outcome)
    }
}
