#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{IdRange, clamp_to_usize};
use crate::{Error, Outcome, Permutation, Result};

/// An atomic interval of IDs that draws them in a shuffled, non-repeating
/// order.
///
/// The order is a [`Permutation`] keyed by the leaf's own bounds and is never
/// stored: the leaf keeps only its counters, and the next draw starts at
/// offset `requested` in that order. Rebuilding a leaf with the same bounds and
/// replaying the same number of outcomes therefore resumes exactly where the
/// previous instance left off.
///
/// Because the offset is a count, callers record every ID of a draw (hit or
/// miss) or none of them before drawing again.
///
/// # Example
/// ```
/// use quarry::{IdRange, LeafRange, Outcome};
///
/// let mut leaf = LeafRange::new(100, 110).unwrap();
/// let first = leaf.draw(3);
/// assert_eq!(first.len(), 3);
///
/// // Nothing is consumed until outcomes are recorded.
/// assert_eq!(leaf.draw(3), first);
///
/// for id in &first {
///     leaf.record_outcome(*id, Outcome::Hit).unwrap();
/// }
/// let next = leaf.draw(10);
/// assert_eq!(next.len(), 7);
/// assert!(next.iter().all(|id| !first.contains(id)));
/// ```
#[derive(Clone, Debug)]
pub struct LeafRange {
    start: u64,
    end: u64,
    hits: u64,
    misses: u64,
    order: Permutation,
}

impl LeafRange {
    /// Creates a leaf covering `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyRange`] if `start >= end`.
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start >= end {
            return Err(Error::EmptyRange { start, end });
        }
        Ok(Self {
            start,
            end,
            hits: 0,
            misses: 0,
            order: Permutation::new(end - start, start, end),
        })
    }

    /// The next `n` IDs this leaf would propose, without drawing them.
    ///
    /// Fewer than `n` come back once the leaf runs out.
    pub fn peek(&self, n: usize) -> Vec<u64> {
        let take = clamp_to_usize(self.unrequested()).min(n) as u64;
        let offset = self.requested();
        (offset..offset + take)
            .map(|index| self.start + self.order.apply(index))
            .collect()
    }
}

impl IdRange for LeafRange {
    fn start_id(&self) -> u64 {
        self.start
    }

    fn end_id(&self) -> u64 {
        self.end
    }

    fn hits(&self) -> u64 {
        self.hits
    }

    fn misses(&self) -> u64 {
        self.misses
    }

    fn draw(&mut self, n: usize) -> Vec<u64> {
        self.peek(n)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn record_outcome(&mut self, id: u64, outcome: Outcome) -> Result<()> {
        if !self.contains(id) {
            return Err(Error::OutOfRange {
                id,
                start: self.start,
                end: self.end,
            });
        }
        if self.unrequested() == 0 {
            return Err(Error::RangeFull {
                start: self.start,
                end: self.end,
            });
        }
        match outcome {
            Outcome::Hit => self.hits += 1,
            Outcome::Miss => self.misses += 1,
        }
        Ok(())
    }
}
