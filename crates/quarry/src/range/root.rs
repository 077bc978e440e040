#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{CompositeRange, IdRange, LeafRange, QuotaWindow, WindowSpec};
use crate::{Error, Outcome, Result, SpaceReport, WindowReport};
use std::collections::{BTreeMap, HashSet};

/// Default number of IDs per leaf.
pub const DEFAULT_LEAF_SIZE: u64 = 1_000_000;

/// Default batch size, matching the per-call limit of the remote API.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Everything needed to rebuild a [`RootSpace`] at process start.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpaceConfig {
    /// Maximum number of IDs spanned by one leaf.
    pub leaf_size: u64,
    /// Windows sorted by ID, each starting where the previous one ends.
    pub windows: Vec<WindowSpec>,
}

impl SpaceConfig {
    pub fn new(windows: Vec<WindowSpec>) -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
            windows,
        }
    }

    #[must_use]
    pub fn with_leaf_size(mut self, leaf_size: u64) -> Self {
        self.leaf_size = leaf_size;
        self
    }
}

/// Counts of outcomes fed back into a freshly built space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplaySummary {
    pub hits: u64,
    pub misses: u64,
}

/// The whole managed ID space: contiguous [`QuotaWindow`]s under one
/// composite.
///
/// Construction checks that the windows tile the space with no gaps or
/// overlaps, so every ID drawn from the space can later be routed back to its
/// owning leaf.
///
/// # Resuming
///
/// Only outcomes are persisted. To resume a run, rebuild the space from the
/// same configuration and [`replay`](RootSpace::replay) every stored hit and
/// miss before the first draw. The counters come out exactly as they were and
/// every leaf picks up its shuffled order where it left off. Rotation cursors
/// start over, so the next batch may be split across children differently.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use quarry::{IdRange, Outcome, RootSpace, SpaceConfig, WindowSpec};
///
/// let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
/// let config = SpaceConfig::new(vec![
///     WindowSpec {
///         start_id: 0,
///         end_id: 100,
///         display_start: day,
///         display_end: day,
///         min_quota: 5,
///     },
///     WindowSpec {
///         start_id: 100,
///         end_id: 250,
///         display_start: day,
///         display_end: day,
///         min_quota: 0,
///     },
/// ]);
/// let mut space = RootSpace::from_config(&config).unwrap();
///
/// let batch = space.draw(5);
/// assert!(batch.iter().all(|id| *id < 100));
/// for id in batch {
///     space.record_outcome(id, Outcome::Hit).unwrap();
/// }
/// assert_eq!(space.needed(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct RootSpace {
    windows: CompositeRange<QuotaWindow>,
}

impl RootSpace {
    /// Creates a space over `windows`.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::EmptySpace`] if there are no windows.
    /// - [`crate::Error::DiscontiguousSpace`] if two adjacent windows leave a
    ///   gap or overlap.
    pub fn new(windows: Vec<QuotaWindow>) -> Result<Self> {
        Ok(Self {
            windows: CompositeRange::new(windows)?,
        })
    }

    /// Builds every window in `config` and the space over them.
    ///
    /// # Errors
    ///
    /// Any error from [`QuotaWindow::new`] or [`RootSpace::new`].
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip_all,
            fields(windows = config.windows.len(), leaf_size = config.leaf_size)
        )
    )]
    pub fn from_config(config: &SpaceConfig) -> Result<Self> {
        let windows = config
            .windows
            .iter()
            .map(|spec| QuotaWindow::new(spec, config.leaf_size))
            .collect::<Result<Vec<_>>>()?;
        Self::new(windows)
    }

    pub fn windows(&self) -> &[QuotaWindow] {
        self.windows.children()
    }

    /// Finds the window that owns `id`.
    pub fn window_for(&self, id: u64) -> Option<&QuotaWindow> {
        self.windows.child_for(id)
    }

    /// Finds the leaf that owns `id`.
    pub fn leaf_for(&self, id: u64) -> Option<&LeafRange> {
        self.window_for(id)?.leaf_for(id)
    }

    /// Checks that `ids` can be recorded without breaking any leaf's order.
    ///
    /// Each leaf only remembers how many of its IDs were recorded, so the IDs
    /// recorded in a leaf must always be a prefix of its shuffled order. That
    /// holds when the IDs falling in each leaf are exactly the next ones it
    /// would propose, in any order. Whole batches from [`IdRange::draw`]
    /// always qualify.
    ///
    /// # Errors
    ///
    /// - [`Error::NotCovered`] for an ID outside the space.
    /// - [`Error::OutOfTurn`] for an ID its leaf would not propose next,
    ///   including a repeated ID.
    pub fn check_in_turn(&self, ids: &[u64]) -> Result<()> {
        let mut by_leaf: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
        for &id in ids {
            let leaf = self.leaf_for(id).ok_or(Error::NotCovered {
                id,
                start: self.start_id(),
                end: self.end_id(),
            })?;
            by_leaf.entry(leaf.start_id()).or_default().push(id);
        }

        for (start, ids) in by_leaf {
            let Some(leaf) = self.leaf_for(start) else {
                continue;
            };
            let mut next: HashSet<u64> = leaf.peek(ids.len()).into_iter().collect();
            if let Some(&id) = ids.iter().find(|id| !next.remove(id)) {
                return Err(Error::OutOfTurn {
                    id,
                    start: leaf.start_id(),
                    end: leaf.end_id(),
                });
            }
        }
        Ok(())
    }

    /// True once every window has met its quota.
    pub fn is_satisfied(&self) -> bool {
        self.needed() == 0
    }

    /// Feeds previously stored outcomes back through
    /// [`IdRange::record_outcome`].
    ///
    /// # Errors
    ///
    /// Stops at the first ID the space cannot record, which means the stored
    /// outcomes do not belong to this configuration.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn replay<H, M>(&mut self, hits: H, misses: M) -> Result<ReplaySummary>
    where
        H: IntoIterator<Item = u64>,
        M: IntoIterator<Item = u64>,
    {
        let mut summary = ReplaySummary::default();
        for id in hits {
            self.record_outcome(id, Outcome::Hit)?;
            summary.hits += 1;
        }
        for id in misses {
            self.record_outcome(id, Outcome::Miss)?;
            summary.misses += 1;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            hits = summary.hits,
            misses = summary.misses,
            needed = self.needed(),
            "replayed stored outcomes"
        );

        Ok(summary)
    }

    /// Snapshot of every window's progress for operators.
    pub fn report(&self) -> SpaceReport {
        SpaceReport {
            windows: self.windows().iter().map(WindowReport::from).collect(),
            hits: self.hits(),
            misses: self.misses(),
            size: self.size(),
            needed: self.needed(),
        }
    }
}

impl IdRange for RootSpace {
    fn start_id(&self) -> u64 {
        self.windows.start_id()
    }

    fn end_id(&self) -> u64 {
        self.windows.end_id()
    }

    fn hits(&self) -> u64 {
        self.windows.hits()
    }

    fn misses(&self) -> u64 {
        self.windows.misses()
    }

    fn needed(&self) -> u64 {
        self.windows.needed()
    }

    fn quota(&self) -> u64 {
        self.windows.quota()
    }

    fn draw(&mut self, n: usize) -> Vec<u64> {
        self.windows.draw(n)
    }

    fn record_outcome(&mut self, id: u64, outcome: Outcome) -> Result<()> {
        self.windows.record_outcome(id, outcome)
    }
}
