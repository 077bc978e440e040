use chrono::NaiveDate;

use crate::{IdRange, QuotaWindow, RangeStatus};

/// Progress of one quota window, for operator-facing output.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowReport {
    pub display_start: NaiveDate,
    pub display_end: NaiveDate,
    pub start_id: u64,
    pub end_id: u64,
    pub min_quota: u64,
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
    pub needed: u64,
    pub status: RangeStatus,
}

impl From<&QuotaWindow> for WindowReport {
    fn from(window: &QuotaWindow) -> Self {
        Self {
            display_start: window.display_start(),
            display_end: window.display_end(),
            start_id: window.start_id(),
            end_id: window.end_id(),
            min_quota: window.min_quota(),
            hits: window.hits(),
            misses: window.misses(),
            size: window.size(),
            needed: window.needed(),
            status: window.status(),
        }
    }
}

/// Progress of a whole [`crate::RootSpace`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpaceReport {
    pub windows: Vec<WindowReport>,
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
    pub needed: u64,
}
