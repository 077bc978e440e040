use super::fetch::Fetcher;
use super::store::OutcomeLog;
use anyhow::bail;
use quarry::{IdRange, Outcome, RootSpace};
use serde::Serialize;

/// What a single call to [`Collector::run_step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A batch was fetched and recorded.
    Recorded { hits: usize, misses: usize },
    /// The fetch failed; nothing was recorded.
    Skipped,
    /// Every window has met its quota.
    Satisfied,
    /// Quotas are still open but no IDs are left to propose.
    Exhausted,
}

/// Why [`Collector::run`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Satisfied,
    Exhausted,
    BatchLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub batches: u64,
    pub hits: u64,
    pub misses: u64,
    pub skipped: u64,
    pub stop: StopReason,
}

/// Drives the draw, fetch and record loop over one space.
///
/// Every recorded batch is complete: each drawn ID ends up as a hit or a miss,
/// both in memory and in the log, before the next draw.
pub struct Collector<F> {
    space: RootSpace,
    log: OutcomeLog,
    fetcher: F,
    batch_size: usize,
}

impl<F: Fetcher> Collector<F> {
    pub fn new(space: RootSpace, log: OutcomeLog, fetcher: F, batch_size: usize) -> Self {
        Self {
            space,
            log,
            fetcher,
            batch_size,
        }
    }

    pub fn space(&self) -> &RootSpace {
        &self.space
    }

    pub fn log(&self) -> &OutcomeLog {
        &self.log
    }

    /// Draws one batch, fetches it, and records every outcome.
    ///
    /// A failed fetch records nothing. Drawing does not advance any counter,
    /// so the skipped IDs are proposed again by a later draw.
    pub fn run_step(&mut self) -> anyhow::Result<Step> {
        if self.space.is_satisfied() {
            return Ok(Step::Satisfied);
        }

        let batch = self.space.draw(self.batch_size);
        if batch.is_empty() {
            return Ok(Step::Exhausted);
        }
        tracing::debug!(size = batch.len(), "fetching batch");

        let found = match self.fetcher.fetch(&batch) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!("fetch failed, skipping batch: {err:#}");
                return Ok(Step::Skipped);
            }
        };

        let unexpected = found.iter().filter(|id| !batch.contains(id)).count();
        if unexpected > 0 {
            tracing::warn!(unexpected, "fetcher returned IDs outside the batch");
        }

        let outcomes: Vec<(u64, Outcome)> = batch
            .iter()
            .map(|&id| (id, Outcome::from(found.contains(&id))))
            .collect();
        for &(id, outcome) in &outcomes {
            self.space.record_outcome(id, outcome)?;
        }
        self.log.append(&outcomes)?;

        let hits = outcomes.iter().filter(|(_, outcome)| outcome.is_hit()).count();
        let misses = outcomes.len() - hits;
        tracing::info!(
            hits,
            misses,
            needed = self.space.needed(),
            "recorded batch"
        );
        Ok(Step::Recorded { hits, misses })
    }

    /// Repeats [`run_step`](Self::run_step) until the space is satisfied or
    /// exhausted, or `max_batches` batches have been recorded.
    ///
    /// # Errors
    ///
    /// Fails once more than `max_failures` fetches in a row have been
    /// skipped, or on any error from recording.
    pub fn run(
        &mut self,
        max_batches: Option<u64>,
        max_failures: u32,
    ) -> anyhow::Result<RunSummary> {
        let (mut batches, mut hits, mut misses, mut skipped) = (0, 0, 0, 0);
        let mut failures = 0;

        let stop = loop {
            if max_batches.is_some_and(|max| batches >= max) {
                break StopReason::BatchLimit;
            }
            match self.run_step()? {
                Step::Recorded {
                    hits: batch_hits,
                    misses: batch_misses,
                } => {
                    batches += 1;
                    hits += batch_hits as u64;
                    misses += batch_misses as u64;
                    failures = 0;
                }
                Step::Skipped => {
                    skipped += 1;
                    failures += 1;
                    if failures > max_failures {
                        bail!("{failures} consecutive fetches failed");
                    }
                }
                Step::Satisfied => break StopReason::Satisfied,
                Step::Exhausted => break StopReason::Exhausted,
            }
        };

        Ok(RunSummary {
            batches,
            hits,
            misses,
            skipped,
            stop,
        })
    }
}
