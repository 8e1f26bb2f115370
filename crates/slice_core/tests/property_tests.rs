//! Property-based tests for `slice_core`.
//!
//! These tests verify invariants of the parsers and the selection pipeline
//! that should hold for all inputs.

#![expect(clippy::unwrap_used, reason = "tests use unwrap for setup")]

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone};
use proptest::prelude::*;
use slice_core::prelude::*;
use slice_core::{evaluate, parse_delta};

/// Linear history, newest first, with commits `gap_minutes` apart.
struct LinearHistory {
    commits: Vec<Commit>,
}

impl LinearHistory {
    fn new(gaps_minutes: &[i64]) -> Self {
        let base = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .unwrap();

        let mut times: Vec<DateTime<FixedOffset>> = Vec::with_capacity(gaps_minutes.len());
        let mut current = base;
        for gap in gaps_minutes {
            current -= TimeDelta::minutes(*gap);
            times.push(current);
        }

        let commits = times
            .iter()
            .enumerate()
            .map(|(i, time)| Commit {
                id: format!("c{i:04}"),
                time: *time,
                parents: if i + 1 < times.len() {
                    vec![format!("c{:04}", i + 1)]
                } else {
                    vec![]
                },
            })
            .collect();

        Self { commits }
    }
}

impl History for LinearHistory {
    fn commits<'a>(&'a self, _query: &RevisionQuery) -> Result<CommitStream<'a>, RepositoryError> {
        Ok(Box::new(self.commits.iter().cloned().map(Ok)))
    }

    fn parents(&self, id: &str) -> Result<Vec<String>, RepositoryError> {
        self.commits
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.parents.clone())
            .ok_or_else(|| RepositoryError::UnknownRevision { revision: id.to_string() })
    }

    fn diff_stat(&self, _commit: &Commit) -> Result<DiffStat, RepositoryError> {
        Ok(DiffStat::default())
    }

    fn changed_files(&self, _commit: &Commit) -> Result<Vec<String>, RepositoryError> {
        Ok(vec![])
    }
}

fn mapping() -> AnalysisMapping {
    let spec = AnalysisSpec {
        image: "img".into(),
        command: "cmd".into(),
    };
    AnalysisMapping::new(BTreeMap::from([("Default".to_string(), spec)])).unwrap()
}

fn run(history: &LinearHistory, filters: &FilterSpec) -> Selection {
    let mapping = mapping();
    let query = RevisionQuery::build("HEAD", None, None);
    Selector::new(history, filters, &mapping).run(&query).unwrap()
}

proptest! {
    /// A between clause is inclusive on both ends.
    #[test]
    fn between_clause_is_inclusive(a in 0u64..10_000, b in 0u64..10_000, value in 0u64..10_000) {
        let (lo, hi) = (a.min(b), a.max(b));
        prop_assert_eq!(evaluate(value, &format!("{lo}-{hi}")), lo <= value && value <= hi);
    }

    /// Comparison clauses are strict.
    #[test]
    fn comparison_clauses_are_strict(bound in 0u64..10_000, value in 0u64..10_000) {
        prop_assert_eq!(evaluate(value, &format!("> {bound}")), value > bound);
        prop_assert_eq!(evaluate(value, &format!("<{bound}")), value < bound);
    }

    /// A list of clauses matches when any single clause matches.
    #[test]
    fn clause_list_is_a_disjunction(
        bound in 0u64..1_000,
        lo in 0u64..1_000,
        width in 0u64..100,
        value in 0u64..1_200,
    ) {
        let greater = format!(">{bound}");
        let between = format!("{lo}-{}", lo + width);
        let combined = format!("{greater}, {between}");

        prop_assert_eq!(
            evaluate(value, &combined),
            evaluate(value, &greater) || evaluate(value, &between)
        );
    }

    /// A blank expression places no constraint.
    #[test]
    fn blank_expression_accepts_everything(value in any::<u64>(), blank in "[ \t]*") {
        prop_assert!(evaluate(value, &blank));
    }

    /// Arbitrary text never makes evaluation panic.
    #[test]
    fn evaluation_tolerates_any_text(value in any::<u64>(), expression in "\\PC*") {
        let _ = evaluate(value, &expression);
    }

    /// Each duration component keeps its own sign.
    #[test]
    fn duration_components_are_signed_independently(
        days in -400i64..400,
        hours in -100i64..100,
        minutes in -1_000i64..1_000,
    ) {
        let parsed = parse_delta(&format!("{days}d{hours}h{minutes}m"));
        let expected = TimeDelta::days(days) + TimeDelta::hours(hours) + TimeDelta::minutes(minutes);
        prop_assert_eq!(parsed, Some(expected));
    }

    /// The number of accepted commits never exceeds the limit.
    #[test]
    fn accepted_never_exceeds_limit(
        gaps in prop::collection::vec(0i64..120, 0..60),
        limit in 0usize..20,
        skip in 0usize..4,
    ) {
        let history = LinearHistory::new(&gaps);
        let filters = FilterSpec { limit: Some(limit), skip: Some(skip), ..FilterSpec::default() };

        let selection = run(&history, &filters);
        prop_assert!(selection.tasks.len() <= limit);
        prop_assert_eq!(selection.stats.accepted, selection.tasks.len());
    }

    /// With skip N and no other filter, exactly N commits are skipped before
    /// each acceptance.
    #[test]
    fn skip_rejects_exactly_n_between_acceptances(
        count in 0usize..60,
        skip in 1usize..6,
    ) {
        let history = LinearHistory::new(&vec![1; count]);
        let filters = FilterSpec { skip: Some(skip), ..FilterSpec::default() };

        let selection = run(&history, &filters);
        let positions: Vec<usize> = selection
            .tasks
            .iter()
            .map(|t| history.commits.iter().position(|c| c.id == t.commit_id).unwrap())
            .collect();

        let expected: Vec<usize> = (0..count).filter(|i| (i + 1) % (skip + 1) == 0).collect();
        prop_assert_eq!(positions, expected);
    }

    /// Consecutive accepted commits are at least the minimum delta apart.
    #[test]
    fn accepted_commits_respect_min_delta(
        gaps in prop::collection::vec(0i64..180, 1..60),
        delta_minutes in 1i64..240,
    ) {
        let history = LinearHistory::new(&gaps);
        let filters = FilterSpec { min_delta: Some(format!("{delta_minutes}m")), ..FilterSpec::default() };

        let selection = run(&history, &filters);
        prop_assert!(!selection.tasks.is_empty());
        for pair in selection.tasks.windows(2) {
            let separation = pair[0].commit_time - pair[1].commit_time;
            prop_assert!(separation >= TimeDelta::minutes(delta_minutes));
        }
    }
}
