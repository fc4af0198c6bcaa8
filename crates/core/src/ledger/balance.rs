//! Per-account balance timeline in reference-currency minor units.
//!
//! The timeline is the in-memory form of the materialized `balance_entries`
//! series: one cumulative end-of-day value per date with activity, strictly
//! date-ordered. It is derived state; the authoritative balance is always
//! `ref_initial_balance + Σ ref_amount` over the account's transactions.
//! The incremental path (`apply_delta`) and the recovery path (`rebuild`)
//! must agree for any input history, which the property tests cross-check.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use chrono::NaiveDate;

use super::types::BalancePoint;

/// Time-ordered cumulative balance series for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceTimeline {
    ref_initial: i64,
    entries: BTreeMap<NaiveDate, i64>,
}

impl BalanceTimeline {
    /// Creates an empty timeline; every date reports the opening balance.
    #[must_use]
    pub const fn new(ref_initial: i64) -> Self {
        Self {
            ref_initial,
            entries: BTreeMap::new(),
        }
    }

    /// Restores a timeline from persisted `(date, cumulative)` entries.
    #[must_use]
    pub fn from_entries(
        ref_initial: i64,
        entries: impl IntoIterator<Item = (NaiveDate, i64)>,
    ) -> Self {
        Self {
            ref_initial,
            entries: entries.into_iter().collect(),
        }
    }

    /// Adds `delta` to every entry dated on or after `date`, creating the
    /// entry at `date` from the closest earlier cumulative value when missing.
    ///
    /// This is the single place balances change on the incremental path.
    pub fn apply_delta(&mut self, date: NaiveDate, delta: i64) {
        let seed = self.as_of(date);
        let entry = self.entries.entry(date).or_insert(seed);
        *entry += delta;
        for (_, cumulative) in self.entries.range_mut((Excluded(date), Unbounded)) {
            *cumulative += delta;
        }
    }

    /// Cumulative balance at end of `date`.
    #[must_use]
    pub fn as_of(&self, date: NaiveDate) -> i64 {
        self.entries
            .range(..=date)
            .next_back()
            .map_or(self.ref_initial, |(_, cumulative)| *cumulative)
    }

    /// Cumulative balance after the last entry.
    #[must_use]
    pub fn current(&self) -> i64 {
        self.entries
            .last_key_value()
            .map_or(self.ref_initial, |(_, cumulative)| *cumulative)
    }

    /// Rebuilds a full timeline from `(date, ref_amount)` transaction data.
    ///
    /// Recovery path: must produce the same series the incremental path
    /// maintains for the same transaction set.
    #[must_use]
    pub fn rebuild(
        ref_initial: i64,
        transactions: impl IntoIterator<Item = (NaiveDate, i64)>,
    ) -> Self {
        let mut timeline = Self::new(ref_initial);
        timeline.rebuild_from(NaiveDate::MIN, transactions);
        timeline
    }

    /// Discards all entries dated on or after `from` and reconstructs them
    /// from `(date, ref_amount)` transaction data dated on or after `from`.
    ///
    /// Transactions dated before `from` are ignored; the retained prefix of
    /// the timeline already accounts for them.
    pub fn rebuild_from(
        &mut self,
        from: NaiveDate,
        transactions: impl IntoIterator<Item = (NaiveDate, i64)>,
    ) {
        self.entries.split_off(&from);

        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for (date, ref_amount) in transactions {
            if date >= from {
                *per_day.entry(date).or_insert(0) += ref_amount;
            }
        }

        let mut cumulative = self.current();
        for (date, day_total) in per_day {
            cumulative += day_total;
            self.entries.insert(date, cumulative);
        }
    }

    /// All entries between `from` and `to` inclusive, date-ordered.
    #[must_use]
    pub fn history(&self, from: NaiveDate, to: NaiveDate) -> Vec<BalancePoint> {
        self.entries
            .range(from..=to)
            .map(|(date, cumulative)| BalancePoint {
                date: *date,
                cumulative: *cumulative,
            })
            .collect()
    }

    /// Iterates every entry in date order.
    pub fn points(&self) -> impl Iterator<Item = BalancePoint> + '_ {
        self.entries.iter().map(|(date, cumulative)| BalancePoint {
            date: *date,
            cumulative: *cumulative,
        })
    }

    /// Number of dated entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the timeline has no dated entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    #[test]
    fn test_empty_timeline_reports_initial_balance() {
        let timeline = BalanceTimeline::new(2500);
        assert_eq!(timeline.as_of(date(1, 1)), 2500);
        assert_eq!(timeline.as_of(date(12, 31)), 2500);
        assert_eq!(timeline.current(), 2500);
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_apply_delta_creates_entry_seeded_from_predecessor() {
        let mut timeline = BalanceTimeline::new(100);
        timeline.apply_delta(date(1, 5), 400);

        assert_eq!(timeline.as_of(date(1, 4)), 100);
        assert_eq!(timeline.as_of(date(1, 5)), 500);
        assert_eq!(timeline.as_of(date(1, 6)), 500);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_apply_delta_ripples_forward() {
        let mut timeline = BalanceTimeline::new(0);
        timeline.apply_delta(date(1, 10), 1000);
        timeline.apply_delta(date(1, 20), 500);

        // backdated delta shifts everything from Jan 5 onward
        timeline.apply_delta(date(1, 5), 200);

        assert_eq!(timeline.as_of(date(1, 4)), 0);
        assert_eq!(timeline.as_of(date(1, 5)), 200);
        assert_eq!(timeline.as_of(date(1, 10)), 1200);
        assert_eq!(timeline.as_of(date(1, 20)), 1700);
    }

    #[test]
    fn test_backdated_edit_ripple_scenario() {
        // T1 (Jan 1, +1000), T2 (Jan 5, +500)
        let mut timeline = BalanceTimeline::new(0);
        timeline.apply_delta(date(1, 1), 1000);
        timeline.apply_delta(date(1, 5), 500);
        assert_eq!(timeline.as_of(date(1, 10)), 1500);
        assert_eq!(timeline.as_of(date(1, 4)), 1000);

        // move T1 to Jan 3: reverse at the old date, apply at the new one
        timeline.apply_delta(date(1, 1), -1000);
        timeline.apply_delta(date(1, 3), 1000);

        assert_eq!(timeline.as_of(date(1, 2)), 0);
        assert_eq!(timeline.as_of(date(1, 4)), 1000);
        assert_eq!(timeline.as_of(date(1, 10)), 1500);
    }

    #[test]
    fn test_reverse_then_reapply_is_net_neutral_after_date() {
        let mut timeline = BalanceTimeline::new(0);
        timeline.apply_delta(date(3, 1), 700);
        timeline.apply_delta(date(3, 15), -200);

        let before = timeline.as_of(date(3, 31));
        timeline.apply_delta(date(3, 15), 200);
        timeline.apply_delta(date(3, 10), -200);
        assert_eq!(timeline.as_of(date(3, 31)), before);
    }

    #[test]
    fn test_from_entries_restores_persisted_series() {
        let mut original = BalanceTimeline::new(50);
        original.apply_delta(date(1, 1), 1000);
        original.apply_delta(date(1, 8), -300);

        let persisted: Vec<_> = original
            .points()
            .map(|point| (point.date, point.cumulative))
            .collect();
        let restored = BalanceTimeline::from_entries(50, persisted);

        assert_eq!(restored, original);
        assert_eq!(restored.as_of(date(1, 8)), 750);
    }

    #[test]
    fn test_rebuild_from_transactions() {
        let transactions = vec![
            (date(1, 5), 500),
            (date(1, 1), 1000),
            (date(1, 5), -200),
            (date(2, 1), 300),
        ];
        let timeline = BalanceTimeline::rebuild(100, transactions);

        assert_eq!(timeline.as_of(date(1, 1)), 1100);
        assert_eq!(timeline.as_of(date(1, 5)), 1400);
        assert_eq!(timeline.as_of(date(1, 31)), 1400);
        assert_eq!(timeline.current(), 1700);
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn test_rebuild_from_keeps_earlier_prefix() {
        let mut timeline = BalanceTimeline::rebuild(
            0,
            vec![(date(1, 1), 1000), (date(1, 10), 500), (date(1, 20), 250)],
        );

        // drop everything from Jan 10 and replay a different tail
        timeline.rebuild_from(date(1, 10), vec![(date(1, 12), 100)]);

        assert_eq!(timeline.as_of(date(1, 9)), 1000);
        assert_eq!(timeline.as_of(date(1, 12)), 1100);
        assert_eq!(timeline.current(), 1100);
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_rebuild_from_ignores_transactions_before_cutoff() {
        let mut timeline = BalanceTimeline::new(0);
        timeline.apply_delta(date(1, 1), 100);

        timeline.rebuild_from(date(2, 1), vec![(date(1, 15), 999), (date(2, 3), 50)]);

        assert_eq!(timeline.as_of(date(1, 31)), 100);
        assert_eq!(timeline.current(), 150);
    }

    #[test]
    fn test_history_range_is_inclusive_and_ordered() {
        let timeline = BalanceTimeline::rebuild(
            0,
            vec![(date(1, 1), 10), (date(1, 5), 20), (date(1, 9), 30)],
        );
        let history = timeline.history(date(1, 1), date(1, 5));
        assert_eq!(
            history,
            vec![
                BalancePoint {
                    date: date(1, 1),
                    cumulative: 10
                },
                BalancePoint {
                    date: date(1, 5),
                    cumulative: 30
                },
            ]
        );
    }

    #[test]
    fn test_same_day_deltas_share_one_entry() {
        let mut timeline = BalanceTimeline::new(0);
        timeline.apply_delta(date(4, 1), 100);
        timeline.apply_delta(date(4, 1), -40);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.as_of(date(4, 1)), 60);
    }
}
