/// A result type defaulting to the crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `quarry` can produce.
///
/// Every variant except [`Error::LockPoisoned`] signals a caller or
/// configuration bug: the engine never retries and never widens a range on its
/// own, so these are meant to fail loudly.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An outcome was recorded on a leaf that does not own the ID.
    #[error("ID {id} is outside leaf range [{start}, {end})")]
    OutOfRange {
        /// The offending ID.
        id: u64,
        /// First ID of the leaf (inclusive).
        start: u64,
        /// End of the leaf (exclusive).
        end: u64,
    },

    /// An outcome was recorded on a composite where no child owns the ID.
    ///
    /// Given correct batch generation this never happens: it means the ID did
    /// not come from this tree.
    #[error("ID {id} is not covered by any child of [{start}, {end})")]
    NotCovered {
        /// The offending ID.
        id: u64,
        /// First ID of the composite (inclusive).
        start: u64,
        /// End of the composite (exclusive).
        end: u64,
    },

    /// Adjacent children leave a gap or overlap.
    #[error("child {index} starts at {next_start} but the previous child ends at {prev_end}")]
    DiscontiguousSpace {
        /// Index of the first child that does not line up with its predecessor.
        index: usize,
        /// End of the preceding child (exclusive).
        prev_end: u64,
        /// Start of the misaligned child.
        next_start: u64,
    },

    /// A range was declared with `start >= end`.
    #[error("empty range [{start}, {end})")]
    EmptyRange {
        /// Declared start.
        start: u64,
        /// Declared end.
        end: u64,
    },

    /// A composite was built without children.
    #[error("a composite range needs at least one child")]
    EmptySpace,

    /// The configured leaf size was zero.
    #[error("leaf size must be greater than 0")]
    InvalidLeafSize,

    /// More outcomes were recorded on a leaf than it has IDs.
    #[error("every ID in [{start}, {end}) has already been recorded")]
    RangeFull {
        /// First ID of the leaf (inclusive).
        start: u64,
        /// End of the leaf (exclusive).
        end: u64,
    },

    /// An ID was offered for recording out of turn: it is not among the IDs
    /// its leaf would propose next.
    ///
    /// Recording such an ID would shift the leaf's position in its shuffled
    /// order, so recorded IDs would come up again and others never would.
    #[error("ID {id} is not next in line for leaf [{start}, {end})")]
    OutOfTurn {
        /// The offending ID.
        id: u64,
        /// First ID of the leaf (inclusive).
        start: u64,
        /// End of the leaf (exclusive).
        end: u64,
    },

    /// The lock guarding a [`crate::SharedSpace`] was poisoned.
    ///
    /// Only produced by the `std` mutex; `parking_lot` does not poison.
    #[cfg(all(feature = "lock", not(feature = "parking-lot")))]
    #[error("lock poisoned")]
    LockPoisoned,

    /// A base-36 ID failed to decode.
    #[cfg(feature = "base36")]
    #[error(transparent)]
    Base36(#[from] crate::Base36Error),
}

#[cfg(all(feature = "lock", not(feature = "parking-lot")))]
use crate::shared::{MutexGuard, PoisonError};
#[cfg(all(feature = "lock", not(feature = "parking-lot")))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
