use super::store::StoredOutcomes;
use quarry::{Error, IdRange, RootSpace, encode_base36};
use std::collections::HashSet;
use std::fmt;

/// A stored outcome the space cannot accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issue {
    DuplicateHit(u64),
    DuplicateMiss(u64),
    HitAndMiss(u64),
    Uncovered(u64),
    OutOfTurn(u64),
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::DuplicateHit(id) => {
                write!(f, "{} is recorded as a hit more than once", encode_base36(id))
            }
            Self::DuplicateMiss(id) => {
                write!(f, "{} is recorded as a miss more than once", encode_base36(id))
            }
            Self::HitAndMiss(id) => {
                write!(f, "{} is recorded as both a hit and a miss", encode_base36(id))
            }
            Self::Uncovered(id) => write!(f, "{} is outside every window", encode_base36(id)),
            Self::OutOfTurn(id) => write!(f, "{} was recorded out of turn", encode_base36(id)),
        }
    }
}

/// Lists every problem that would make replaying `stored` into `space` fail
/// or double count.
///
/// Each ID is reported at most once per kind of issue. `space` must not have
/// anything recorded yet. Out-of-turn IDs are only looked for once the log is
/// otherwise clean, and only the first one is reported.
pub fn find_issues(space: &RootSpace, stored: &StoredOutcomes) -> Vec<Issue> {
    let mut issues = Vec::new();

    let hits = unique(&stored.hits, Issue::DuplicateHit, &mut issues);
    let misses = unique(&stored.misses, Issue::DuplicateMiss, &mut issues);

    let mut both: Vec<u64> = hits.intersection(&misses).copied().collect();
    both.sort_unstable();
    issues.extend(both.into_iter().map(Issue::HitAndMiss));

    let mut outside: Vec<u64> = hits
        .union(&misses)
        .copied()
        .filter(|&id| !space.contains(id))
        .collect();
    outside.sort_unstable();
    issues.extend(outside.into_iter().map(Issue::Uncovered));

    if issues.is_empty() {
        let ids: Vec<u64> = stored.hits.iter().chain(&stored.misses).copied().collect();
        if let Err(Error::OutOfTurn { id, .. }) = space.check_in_turn(&ids) {
            issues.push(Issue::OutOfTurn(id));
        }
    }

    issues
}

fn unique(ids: &[u64], issue: fn(u64) -> Issue, issues: &mut Vec<Issue>) -> HashSet<u64> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut reported = HashSet::new();
    for &id in ids {
        if !seen.insert(id) && reported.insert(id) {
            issues.push(issue(id));
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use quarry::{SpaceConfig, WindowSpec};

    fn space() -> RootSpace {
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let spec = WindowSpec {
            start_id: 100,
            end_id: 200,
            display_start: day,
            display_end: day,
            min_quota: 1,
        };
        RootSpace::from_config(&SpaceConfig::new(vec![spec])).unwrap()
    }

    fn stored(hits: &[u64], misses: &[u64]) -> StoredOutcomes {
        StoredOutcomes {
            hits: hits.to_vec(),
            misses: misses.to_vec(),
        }
    }

    #[test]
    fn clean_logs_have_no_issues() {
        let mut next = space().draw(3);
        let miss = next.pop().unwrap();
        assert!(find_issues(&space(), &stored(&next, &[miss])).is_empty());
        assert!(find_issues(&space(), &StoredOutcomes::default()).is_empty());
    }

    #[test]
    fn ids_skipped_over_are_reported() {
        // The first and third IDs in line, without the second.
        let next = space().draw(3);
        let issues = find_issues(&space(), &stored(&[next[0]], &[next[2]]));
        assert_eq!(issues, vec![Issue::OutOfTurn(next[2])]);
    }

    #[test]
    fn duplicates_are_reported_once() {
        let issues = find_issues(&space(), &stored(&[101, 101, 101], &[102, 102]));
        assert_eq!(issues, vec![Issue::DuplicateHit(101), Issue::DuplicateMiss(102)]);
    }

    #[test]
    fn conflicting_outcomes_are_reported() {
        let issues = find_issues(&space(), &stored(&[120, 110], &[110, 120]));
        assert_eq!(issues, vec![Issue::HitAndMiss(110), Issue::HitAndMiss(120)]);
    }

    #[test]
    fn foreign_ids_are_reported() {
        let issues = find_issues(&space(), &stored(&[99], &[200, 150]));
        assert_eq!(issues, vec![Issue::Uncovered(99), Issue::Uncovered(200)]);
    }

    #[test]
    fn issues_print_base36() {
        assert_eq!(
            Issue::Uncovered(35).to_string(),
            "z is outside every window"
        );
        assert_eq!(
            Issue::OutOfTurn(36).to_string(),
            "10 was recorded out of turn"
        );
    }
}
