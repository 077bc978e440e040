/// The result of requesting a single ID from the remote source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Outcome {
    /// The item was fetched.
    Hit,
    /// The item is confirmed absent (deleted, removed, inaccessible).
    Miss,
}

impl Outcome {
    pub const fn is_hit(self) -> bool {
        matches!(self, Self::Hit)
    }
}

impl From<bool> for Outcome {
    fn from(was_hit: bool) -> Self {
        if was_hit { Self::Hit } else { Self::Miss }
    }
}

/// Where a range is in its lifecycle, derived from its counters.
///
/// Transitions only happen through `record_outcome`; drawing never changes the
/// status of a range.
///
/// ```text
/// Unstarted -> InProgress -> QuotaMet -> Exhausted
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RangeStatus {
    /// Nothing has been recorded yet.
    Unstarted,
    /// Some IDs were recorded but the quota (if any) is still short.
    InProgress,
    /// The quota is met; unrequested IDs may remain.
    QuotaMet,
    /// Every ID in the range has been recorded.
    Exhausted,
}

impl RangeStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::InProgress => "in_progress",
            Self::QuotaMet => "quota_met",
            Self::Exhausted => "exhausted",
        }
    }
}

impl core::fmt::Display for RangeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
