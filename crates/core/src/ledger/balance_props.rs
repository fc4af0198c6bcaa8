//! Property tests for the balance timeline.
//!
//! These pin the two load-bearing guarantees of the balance store:
//! reconciliation (any as-of query equals the opening balance plus the sum
//! of deltas up to that date) and rebuild equivalence (the incremental and
//! recovery paths agree for any history).

use chrono::NaiveDate;
use proptest::prelude::*;

use super::balance::BalanceTimeline;

fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(u64::from(offset))
}

/// Strategy for a transaction history: (day offset, ref_amount delta) pairs.
fn history_strategy(max_len: usize) -> impl Strategy<Value = Vec<(u32, i64)>> {
    prop::collection::vec((0u32..120, -100_000i64..100_000), 0..=max_len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Balance reconciliation: for any history and any query date,
    /// as_of(d) == ref_initial + sum of deltas dated <= d.
    #[test]
    fn prop_balance_reconciliation(
        ref_initial in -1_000_000i64..1_000_000,
        history in history_strategy(30),
        query_offset in 0u32..120,
    ) {
        let mut timeline = BalanceTimeline::new(ref_initial);
        for (offset, delta) in &history {
            timeline.apply_delta(day(*offset), *delta);
        }

        let query_date = day(query_offset);
        let expected: i64 = ref_initial
            + history
                .iter()
                .filter(|(offset, _)| day(*offset) <= query_date)
                .map(|(_, delta)| delta)
                .sum::<i64>();

        prop_assert_eq!(timeline.as_of(query_date), expected);
    }

    /// Rebuild equivalence: replaying a history through apply_delta yields
    /// exactly the series a full rebuild produces.
    #[test]
    fn prop_rebuild_equivalence(
        ref_initial in -1_000_000i64..1_000_000,
        history in history_strategy(30),
    ) {
        let mut incremental = BalanceTimeline::new(ref_initial);
        for (offset, delta) in &history {
            incremental.apply_delta(day(*offset), *delta);
        }

        let rebuilt = BalanceTimeline::rebuild(
            ref_initial,
            history.iter().map(|(offset, delta)| (day(*offset), *delta)),
        );

        prop_assert_eq!(incremental, rebuilt);
    }

    /// Partial rebuild from any cutoff agrees with a full rebuild.
    #[test]
    fn prop_partial_rebuild_matches_full(
        ref_initial in -1_000_000i64..1_000_000,
        history in history_strategy(30),
        cutoff_offset in 0u32..120,
    ) {
        let cutoff = day(cutoff_offset);
        let all = || history.iter().map(|(offset, delta)| (day(*offset), *delta));

        let mut partial = BalanceTimeline::rebuild(
            ref_initial,
            all().filter(|(date, _)| *date < cutoff),
        );
        partial.rebuild_from(cutoff, all().filter(|(date, _)| *date >= cutoff));

        prop_assert_eq!(partial, BalanceTimeline::rebuild(ref_initial, all()));
    }

    /// Applying a delta and its reversal restores the original series.
    #[test]
    fn prop_reverse_restores_timeline(
        ref_initial in -1_000_000i64..1_000_000,
        history in history_strategy(20),
        offset in 0u32..120,
        delta in -100_000i64..100_000,
    ) {
        let mut timeline = BalanceTimeline::new(ref_initial);
        for (day_offset, amount) in &history {
            timeline.apply_delta(day(*day_offset), *amount);
        }

        let before = timeline.clone();
        timeline.apply_delta(day(offset), delta);
        timeline.apply_delta(day(offset), -delta);

        // cumulative values match everywhere the original had entries, and
        // the extra zero-effect entry does not change any as_of answer
        for point in before.points() {
            prop_assert_eq!(timeline.as_of(point.date), point.cumulative);
        }
        prop_assert_eq!(timeline.as_of(day(offset)), before.as_of(day(offset)));
        prop_assert_eq!(timeline.current(), before.current());
    }

    /// History output is strictly ordered by date.
    #[test]
    fn prop_history_strictly_ordered(
        history in history_strategy(30),
    ) {
        let timeline = BalanceTimeline::rebuild(
            0,
            history.iter().map(|(offset, delta)| (day(*offset), *delta)),
        );
        let points = timeline.history(day(0), day(200));
        for window in points.windows(2) {
            prop_assert!(window[0].date < window[1].date);
        }
    }
}
