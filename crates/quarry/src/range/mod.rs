mod composite;
mod leaf;
mod root;
mod window;

pub use composite::*;
pub use leaf::*;
pub use root::*;
pub use window::*;

use crate::{Outcome, RangeStatus, Result};

/// The capability contract shared by every node of a range tree.
///
/// A node covers the half-open interval `[start_id, end_id)` and tracks how
/// many of its IDs were requested (`hits + misses`). [`LeafRange`] produces
/// IDs; [`CompositeRange`] and the types built on it aggregate children and
/// split a batch between them, so the tree is uniformly recursive.
///
/// Counters only move through [`IdRange::record_outcome`]. [`IdRange::draw`]
/// proposes IDs without marking them requested: an ID that is drawn but never
/// recorded is proposed again on a later draw.
pub trait IdRange {
    /// First ID in this range (inclusive).
    fn start_id(&self) -> u64;

    /// End of this range (exclusive).
    fn end_id(&self) -> u64;

    /// Number of requested IDs that were fetched.
    fn hits(&self) -> u64;

    /// Number of requested IDs that turned out to be absent.
    fn misses(&self) -> u64;

    /// Total number of IDs covered.
    fn size(&self) -> u64 {
        self.end_id() - self.start_id()
    }

    fn requested(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// IDs that have never been recorded. Unrelated to any quota.
    fn unrequested(&self) -> u64 {
        self.size() - self.requested()
    }

    /// Remaining shortfall against the minimum quota; `0` when unconstrained.
    fn needed(&self) -> u64 {
        0
    }

    /// Configured minimum number of hits; `0` when unconstrained.
    fn quota(&self) -> u64 {
        0
    }

    fn contains(&self, id: u64) -> bool {
        self.start_id() <= id && id < self.end_id()
    }

    fn status(&self) -> RangeStatus {
        if self.unrequested() == 0 {
            RangeStatus::Exhausted
        } else if self.quota() > 0 && self.needed() == 0 {
            RangeStatus::QuotaMet
        } else if self.requested() == 0 {
            RangeStatus::Unstarted
        } else {
            RangeStatus::InProgress
        }
    }

    /// Proposes up to `n` IDs that have not been recorded yet.
    ///
    /// Returns fewer than `n` only when the range has less than `n`
    /// unrequested IDs left.
    fn draw(&mut self, n: usize) -> Vec<u64>;

    /// Records that `id` was requested, and whether it was a hit.
    ///
    /// # Errors
    ///
    /// Fails if no leaf in this range owns `id`, or if the owning leaf has
    /// already recorded every one of its IDs.
    fn record_outcome(&mut self, id: u64, outcome: Outcome) -> Result<()>;
}

impl<R: IdRange + ?Sized> IdRange for Box<R> {
    fn start_id(&self) -> u64 {
        (**self).start_id()
    }

    fn end_id(&self) -> u64 {
        (**self).end_id()
    }

    fn hits(&self) -> u64 {
        (**self).hits()
    }

    fn misses(&self) -> u64 {
        (**self).misses()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn requested(&self) -> u64 {
        (**self).requested()
    }

    fn unrequested(&self) -> u64 {
        (**self).unrequested()
    }

    fn needed(&self) -> u64 {
        (**self).needed()
    }

    fn quota(&self) -> u64 {
        (**self).quota()
    }

    fn contains(&self, id: u64) -> bool {
        (**self).contains(id)
    }

    fn status(&self) -> RangeStatus {
        (**self).status()
    }

    fn draw(&mut self, n: usize) -> Vec<u64> {
        (**self).draw(n)
    }

    fn record_outcome(&mut self, id: u64, outcome: Outcome) -> Result<()> {
        (**self).record_outcome(id, outcome)
    }
}

/// Saturating conversion for comparing ID counts against batch sizes.
pub(crate) fn clamp_to_usize(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}
