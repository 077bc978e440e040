use std::sync::Arc;

#[cfg(not(feature = "parking-lot"))]
pub use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(feature = "parking-lot")]
pub use parking_lot::{Mutex, MutexGuard};

use crate::{IdRange, Outcome, Result, RootSpace, SpaceReport};

/// A lock-based handle to a [`RootSpace`] for callers that drive it from
/// several threads or tasks.
///
/// The rotation cursor and the aggregate counters are plain fields, so every
/// call takes the lock. Clones share the same space.
///
/// ## Recommended When
/// - A fetch loop and an operator-facing reporter run on different threads
/// - Several fetch workers share one quota schedule
#[derive(Clone, Debug)]
pub struct SharedSpace {
    inner: Arc<Mutex<RootSpace>>,
}

impl SharedSpace {
    pub fn new(space: RootSpace) -> Self {
        Self {
            inner: Arc::new(Mutex::new(space)),
        }
    }

    /// Draws the next batch of up to `n` IDs.
    ///
    /// # Errors
    ///
    /// Only fails if the lock was poisoned.
    pub fn draw(&self, n: usize) -> Result<Vec<u64>> {
        Ok(self.lock()?.draw(n))
    }

    /// Records one outcome.
    ///
    /// # Errors
    ///
    /// Any error from [`IdRange::record_outcome`], or a poisoned lock.
    pub fn record_outcome(&self, id: u64, outcome: Outcome) -> Result<()> {
        self.lock()?.record_outcome(id, outcome)
    }

    /// Records a whole batch under one lock acquisition.
    ///
    /// # Errors
    ///
    /// Stops at the first outcome that fails to record.
    pub fn record_batch(&self, outcomes: &[(u64, Outcome)]) -> Result<()> {
        let mut space = self.lock()?;
        outcomes
            .iter()
            .try_for_each(|&(id, outcome)| space.record_outcome(id, outcome))
    }

    /// # Errors
    ///
    /// Only fails if the lock was poisoned.
    pub fn report(&self) -> Result<SpaceReport> {
        Ok(self.lock()?.report())
    }

    /// Runs `f` with exclusive access to the space.
    ///
    /// # Errors
    ///
    /// Only fails if the lock was poisoned.
    pub fn with<T>(&self, f: impl FnOnce(&mut RootSpace) -> T) -> Result<T> {
        let mut space = self.lock()?;
        Ok(f(&mut *space))
    }

    #[cfg(not(feature = "parking-lot"))]
    fn lock(&self) -> Result<MutexGuard<'_, RootSpace>> {
        Ok(self.inner.lock()?)
    }

    #[cfg(feature = "parking-lot")]
    #[allow(clippy::unnecessary_wraps)]
    fn lock(&self) -> Result<MutexGuard<'_, RootSpace>> {
        Ok(self.inner.lock())
    }
}
