#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{IdRange, clamp_to_usize};
use crate::{Error, Outcome, Result};

/// A range built from ordered, contiguous child ranges.
///
/// Children are sorted by `start_id`, disjoint, and tile the composite's own
/// interval with no gaps; [`CompositeRange::new`] rejects anything else.
/// Counters are aggregated from the children and an outcome is routed to the
/// single child that owns the ID.
///
/// # Fair allocation
///
/// [`IdRange::draw`] splits a batch across children:
///
/// 1. Children with nothing left to request are skipped.
/// 2. If any remaining child is short of its quota, only those children take
///    part. Satisfied children never consume capacity while others are short.
/// 3. Slots are handed out one at a time, round robin, capped at each child's
///    `min(needed, unrequested)`.
/// 4. Whatever is left of the batch is handed out the same way, capped at each
///    child's `unrequested`.
/// 5. If the needy children run dry, the satisfied ones fill the rest, so a
///    draw only comes up short when the whole composite is exhausted.
///
/// The walk starts at a rotation cursor that advances by the number of slots
/// handed out, so consecutive draws do not always favor the same child.
///
/// # Example
/// ```
/// use quarry::{CompositeRange, IdRange, LeafRange};
///
/// let leaves = vec![
///     LeafRange::new(0, 10).unwrap(),
///     LeafRange::new(10, 20).unwrap(),
///     LeafRange::new(20, 30).unwrap(),
/// ];
/// let mut composite = CompositeRange::new(leaves).unwrap();
/// let ids = composite.draw(6);
///
/// // Two from each leaf.
/// for start in [0, 10, 20] {
///     let owned = ids.iter().filter(|id| (start..start + 10).contains(*id));
///     assert_eq!(owned.count(), 2);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct CompositeRange<R> {
    children: Vec<R>,
    start: u64,
    end: u64,
    hits: u64,
    misses: u64,
    cursor: usize,
}

impl<R: IdRange> CompositeRange<R> {
    /// Creates a composite over `children`.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptySpace`] if `children` is empty.
    /// - [`Error::DiscontiguousSpace`] unless every child starts exactly where
    ///   the previous one ends.
    pub fn new(children: Vec<R>) -> Result<Self> {
        let (Some(first), Some(last)) = (children.first(), children.last()) else {
            return Err(Error::EmptySpace);
        };
        let (start, end) = (first.start_id(), last.end_id());

        for (index, pair) in children.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.end_id() != next.start_id() {
                return Err(Error::DiscontiguousSpace {
                    index: index + 1,
                    prev_end: prev.end_id(),
                    next_start: next.start_id(),
                });
            }
        }

        // Children may arrive with outcomes already recorded.
        let hits = children.iter().map(IdRange::hits).sum();
        let misses = children.iter().map(IdRange::misses).sum();

        Ok(Self {
            children,
            start,
            end,
            hits,
            misses,
            cursor: 0,
        })
    }

    pub fn children(&self) -> &[R] {
        &self.children
    }

    /// Position in the child list where the next draw starts its walk.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Finds the child that owns `id`.
    pub fn child_for(&self, id: u64) -> Option<&R> {
        self.child_index(id).map(|index| &self.children[index])
    }

    fn child_index(&self, id: u64) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        // Sorted and contiguous: the owner is the last child starting at or
        // before `id`.
        let after = self.children.partition_point(|child| child.start_id() <= id);
        after.checked_sub(1)
    }

    /// Decides how many IDs each child contributes to a batch of `n`.
    ///
    /// Returns one count per child, in child order.
    fn allocate(&mut self, n: usize) -> Vec<usize> {
        let len = self.children.len();
        let slots: Vec<Slot> = (0..len)
            .map(|offset| (self.cursor + offset) % len)
            .filter_map(|index| {
                let child = &self.children[index];
                let unrequested = clamp_to_usize(child.unrequested());
                (unrequested > 0).then(|| Slot {
                    index,
                    quota_cap: clamp_to_usize(child.needed()).min(unrequested),
                    full_cap: unrequested,
                    allocated: 0,
                })
            })
            .collect();

        let (mut slots, mut spill): (Vec<Slot>, Vec<Slot>) =
            if slots.iter().any(|slot| slot.quota_cap > 0) {
                slots.into_iter().partition(|slot| slot.quota_cap > 0)
            } else {
                (slots, Vec::new())
            };

        let mut remaining = n;
        let quota_slots = round_robin(&mut slots, &mut remaining, |slot| slot.quota_cap);
        let extra_slots = round_robin(&mut slots, &mut remaining, |slot| slot.full_cap);
        // Satisfied children only see what the needy ones cannot absorb.
        let spill_slots = round_robin(&mut spill, &mut remaining, |slot| slot.full_cap);

        self.cursor = (self.cursor + quota_slots + extra_slots + spill_slots) % len;

        #[cfg(feature = "tracing")]
        tracing::trace!(
            needy = slots.len(),
            quota_slots,
            extra_slots,
            spill_slots,
            cursor = self.cursor,
            "allocated batch"
        );

        let mut counts = vec![0; len];
        for slot in slots.into_iter().chain(spill) {
            counts[slot.index] = slot.allocated;
        }
        counts
    }
}

impl<R: IdRange> IdRange for CompositeRange<R> {
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

    fn needed(&self) -> u64 {
        self.children.iter().map(IdRange::needed).sum()
    }

    fn quota(&self) -> u64 {
        self.children.iter().map(IdRange::quota).sum()
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self), fields(start = self.start, end = self.end))
    )]
    fn draw(&mut self, n: usize) -> Vec<u64> {
        if n == 0 {
            return Vec::new();
        }
        let counts = self.allocate(n);
        let mut ids = Vec::with_capacity(counts.iter().sum());
        for (child, count) in self.children.iter_mut().zip(counts) {
            if count > 0 {
                ids.extend(child.draw(count));
            }
        }
        ids
    }

    fn record_outcome(&mut self, id: u64, outcome: Outcome) -> Result<()> {
        let index = self.child_index(id).ok_or(Error::NotCovered {
            id,
            start: self.start,
            end: self.end,
        })?;
        self.children[index].record_outcome(id, outcome)?;
        match outcome {
            Outcome::Hit => self.hits += 1,
            Outcome::Miss => self.misses += 1,
        }
        Ok(())
    }
}

/// Allocation state of one candidate child during a single draw.
#[derive(Debug)]
struct Slot {
    index: usize,
    quota_cap: usize,
    full_cap: usize,
    allocated: usize,
}

/// Hands out one slot per candidate per round until `remaining` hits zero or
/// no candidate is below its cap. Returns the number of slots handed out.
fn round_robin(slots: &mut [Slot], remaining: &mut usize, cap: impl Fn(&Slot) -> usize) -> usize {
    let mut handed_out = 0;
    while *remaining > 0 {
        let before = handed_out;
        for slot in slots.iter_mut() {
            if *remaining == 0 {
                break;
            }
            if slot.allocated < cap(&*slot) {
                slot.allocated += 1;
                *remaining -= 1;
                handed_out += 1;
            }
        }
        if handed_out == before {
            break;
        }
    }
    handed_out
}
