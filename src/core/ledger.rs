//! Group ledger
//!
//! This module provides the `Ledger` struct, which owns one [`BalanceSheet`]
//! per group and applies expenses and settlements to them.
//!
//! # Design
//!
//! Sheets live in a `DashMap` keyed by group. Every mutation of a group runs
//! while holding that group's entry guard, which makes the guard the unit of
//! work: the new amounts of the touched pairs are staged first and written
//! only once everything succeeded. Concurrent readers therefore see
//! either the state before an expense or the state after it, never a mix.
//!
//! # Thread Safety
//!
//! Operations on different groups proceed in parallel. Operations on the
//! same group are serialized by the entry guard. Callers must not hold any
//! other ledger reference while a closure passed to `apply_expense_with` or
//! `reverse_expense_with` runs.

use crate::core::balance_sheet::BalanceSheet;
use crate::types::{
    postings_for, Balance, Expense, Group, GroupId, LedgerError, NetBalance, Posting, Split,
    UserId,
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

/// Pairwise balances of every group
#[derive(Debug)]
pub struct Ledger {
    /// Balance sheet per group, created on the group's first posting
    sheets: DashMap<GroupId, BalanceSheet>,

    /// Balances whose magnitude is below this are treated as settled
    epsilon: Decimal,
}

impl Ledger {
    /// Create an empty ledger
    ///
    /// # Arguments
    ///
    /// * `epsilon` - Minimum absolute balance considered outstanding
    pub fn new(epsilon: Decimal) -> Self {
        Self {
            sheets: DashMap::new(),
            epsilon,
        }
    }

    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    /// Run `f` against a group's sheet while holding its entry guard
    ///
    /// The sheet is created if the group has none yet.
    fn transact<T, F>(&self, group: &GroupId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut BalanceSheet) -> Result<T, LedgerError>,
    {
        let mut entry = self
            .sheets
            .entry(group.clone())
            .or_insert_with(|| BalanceSheet::new(group.clone()));
        f(entry.value_mut())
    }

    /// Apply the balance deltas of an expense
    ///
    /// Equivalent to [`Ledger::apply_expense_with`] with a no-op record step.
    pub fn apply_expense(
        &self,
        group: &Group,
        payer: &UserId,
        splits: &[Split],
    ) -> Result<(), LedgerError> {
        self.apply_expense_with(group, payer, splits, || Ok(()))
    }

    /// Apply the balance deltas of an expense, recording it in the same unit of work
    ///
    /// Every split user with a non-zero amount other than the payer ends up
    /// owing the payer their split amount. All deltas are staged first; then
    /// `record` runs; then the staged amounts are committed. If staging or
    /// `record` fails, no balance changes.
    ///
    /// # Arguments
    ///
    /// * `group` - Snapshot of the group, used for membership checks
    /// * `payer` - The member who paid
    /// * `splits` - One share per participant
    /// * `record` - Side effect that must happen atomically with the deltas
    ///
    /// # Errors
    ///
    /// * `MembershipViolation` - payer or a split user is not a group member
    /// * `InvalidAmount` - a split amount is negative
    /// * `ArithmeticOverflow` - a pair balance would leave the decimal range
    /// * Any error returned by `record`
    pub fn apply_expense_with<F>(
        &self,
        group: &Group,
        payer: &UserId,
        splits: &[Split],
        record: F,
    ) -> Result<(), LedgerError>
    where
        F: FnOnce() -> Result<(), LedgerError>,
    {
        ensure_member(group, payer)?;
        for split in splits {
            ensure_member(group, &split.user)?;
            if split.amount < Decimal::ZERO {
                return Err(LedgerError::invalid_amount(split.amount, "split"));
            }
        }

        let postings = postings_for(payer, splits);

        self.transact(&group.id, |sheet| {
            let staged = sheet.stage(&postings)?;
            record()?;
            sheet.commit(staged);
            Ok(())
        })?;

        debug!(
            group = %group.id,
            payer = %payer,
            postings = postings.len(),
            "applied expense"
        );
        Ok(())
    }

    /// Undo the balance deltas of a recorded expense
    ///
    /// Stages the reversed postings of `expense`, runs `record`, then commits.
    /// Over-reversal is allowed: if the pair was partly settled since, the
    /// debt flips direction.
    ///
    /// # Errors
    ///
    /// * `MembershipViolation` - a party to one of the postings has left
    ///   `group`; nothing is staged and `record` does not run
    /// * `ArithmeticOverflow` - a pair balance would leave the decimal range
    /// * Any error returned by `record`
    pub fn reverse_expense_with<F>(
        &self,
        group: &Group,
        expense: &Expense,
        record: F,
    ) -> Result<(), LedgerError>
    where
        F: FnOnce() -> Result<(), LedgerError>,
    {
        let postings: Vec<Posting> = expense
            .postings()
            .iter()
            .map(Posting::reversed)
            .collect();

        for posting in &postings {
            ensure_member(group, &posting.debtor)?;
            ensure_member(group, &posting.creditor)?;
        }

        self.transact(&group.id, |sheet| {
            let staged = sheet.stage(&postings)?;
            record()?;
            sheet.commit(staged);
            Ok(())
        })?;

        debug!(group = %group.id, expense = %expense.id, "reversed expense");
        Ok(())
    }

    /// Record that `from` paid `to` back `amount`
    ///
    /// Reduces what `from` owes `to`. Paying more than is owed is accepted and
    /// leaves `to` owing `from` the difference. If the pair ends up below
    /// epsilon it is removed.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - `amount` is zero or negative
    /// * `SelfSettlement` - `from` and `to` are the same user
    /// * `MembershipViolation` - either user is not a group member
    /// * `ArithmeticOverflow` - the pair balance would leave the decimal range
    pub fn settle(
        &self,
        group: &Group,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount, "settle"));
        }
        if from == to {
            return Err(LedgerError::self_settlement(from));
        }
        ensure_member(group, from)?;
        ensure_member(group, to)?;

        let posting = Posting::new(to.clone(), from.clone(), amount);
        let epsilon = self.epsilon;

        let pruned = self.transact(&group.id, |sheet| {
            sheet.post(&posting)?;
            Ok(sheet.prune_pair(from, to, epsilon))
        })?;

        debug!(
            group = %group.id,
            from = %from,
            to = %to,
            amount = %amount,
            pruned,
            "settled"
        );
        Ok(())
    }

    /// What `user` owes and is owed within a group
    ///
    /// Unknown groups and users report a zero position.
    pub fn net_balance(&self, group: &GroupId, user: &UserId) -> NetBalance {
        self.sheets
            .get(group)
            .map(|sheet| sheet.net_for(user, self.epsilon))
            .unwrap_or_default()
    }

    /// Outstanding debts of a group, sorted by debtor then creditor
    pub fn group_balances(&self, group: &GroupId) -> Vec<Balance> {
        self.sheets
            .get(group)
            .map(|sheet| sheet.outstanding(self.epsilon))
            .unwrap_or_default()
    }

    /// Outstanding debts of every group, ordered by group then debtor then creditor
    pub fn all_balances(&self) -> Vec<Balance> {
        let mut groups: Vec<GroupId> = self.sheets.iter().map(|sheet| sheet.key().clone()).collect();
        groups.sort();

        groups
            .iter()
            .flat_map(|group| self.group_balances(group))
            .collect()
    }

    /// Raw signed amount `debtor` owes `creditor` in a group
    pub fn balance(&self, group: &GroupId, debtor: &UserId, creditor: &UserId) -> Decimal {
        self.sheets
            .get(group)
            .map(|sheet| sheet.balance(debtor, creditor))
            .unwrap_or(Decimal::ZERO)
    }

    /// A user's position summed over every group
    pub fn user_totals(&self, user: &UserId) -> NetBalance {
        self.sheets
            .iter()
            .map(|sheet| sheet.net_for(user, self.epsilon))
            .fold(NetBalance::default(), NetBalance::combine)
    }

    pub fn has_outstanding(&self, group: &GroupId) -> bool {
        self.sheets
            .get(group)
            .map(|sheet| sheet.has_outstanding(self.epsilon))
            .unwrap_or(false)
    }

    /// Remove every pair of a group that is below epsilon
    ///
    /// # Returns
    ///
    /// The number of pairs removed.
    pub fn compact(&self, group: &GroupId) -> usize {
        let removed = self
            .sheets
            .get_mut(group)
            .map(|mut sheet| sheet.prune(self.epsilon))
            .unwrap_or(0);

        if removed > 0 {
            debug!(group = %group, removed, "compacted balance sheet");
        }
        removed
    }

    /// Drop a group's sheet, provided nothing in it is outstanding
    ///
    /// The check and the removal happen under the same shard lock.
    ///
    /// # Errors
    ///
    /// * `UnsettledBalances` - some pair is at or above epsilon
    pub fn remove_settled_group(&self, group: &GroupId) -> Result<(), LedgerError> {
        let epsilon = self.epsilon;
        let removed = self
            .sheets
            .remove_if(group, |_, sheet| !sheet.has_outstanding(epsilon));

        if removed.is_none() && self.has_outstanding(group) {
            return Err(LedgerError::unsettled_balances(group));
        }
        Ok(())
    }

    /// Number of groups with a sheet
    pub fn group_count(&self) -> usize {
        self.sheets.len()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(crate::core::config::DEFAULT_EPSILON)
    }
}

fn ensure_member(group: &Group, user: &UserId) -> Result<(), LedgerError> {
    if group.is_member(user) {
        Ok(())
    } else {
        Err(LedgerError::membership_violation(user, &group.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    #[fixture]
    fn trip() -> Group {
        Group::new("trip", "Ski trip", "alice").with_members(["bob", "carol", "dave"])
    }

    fn equal_quarters(total: Decimal) -> Vec<Split> {
        let share = total / dec!(4);
        ["alice", "bob", "carol", "dave"]
            .iter()
            .map(|id| Split::new(*id, share))
            .collect()
    }

    #[rstest]
    fn test_equal_expense_creates_debts_to_payer(trip: Group) {
        let ledger = Ledger::default();

        ledger
            .apply_expense(&trip, &user("alice"), &equal_quarters(dec!(100.00)))
            .unwrap();

        for debtor in ["bob", "carol", "dave"] {
            assert_eq!(ledger.balance(&trip.id, &user(debtor), &user("alice")), dec!(25));
            assert_eq!(ledger.balance(&trip.id, &user("alice"), &user(debtor)), dec!(-25));
        }

        let alice = ledger.net_balance(&trip.id, &user("alice"));
        assert_eq!(alice.owed_to_user, dec!(75));
        assert_eq!(alice.owed_by_user, Decimal::ZERO);
        assert_eq!(alice.net(), dec!(75));
    }

    #[rstest]
    fn test_settle_reduces_and_removes_pair(trip: Group) {
        let ledger = Ledger::default();
        ledger
            .apply_expense(&trip, &user("alice"), &equal_quarters(dec!(100)))
            .unwrap();

        ledger
            .settle(&trip, &user("bob"), &user("alice"), dec!(25))
            .unwrap();

        assert_eq!(ledger.balance(&trip.id, &user("bob"), &user("alice")), Decimal::ZERO);
        assert!(ledger
            .group_balances(&trip.id)
            .iter()
            .all(|b| b.debtor != user("bob")));
    }

    #[rstest]
    fn test_over_settlement_flips_direction(trip: Group) {
        let ledger = Ledger::default();
        ledger
            .apply_expense(&trip, &user("alice"), &equal_quarters(dec!(100)))
            .unwrap();

        ledger
            .settle(&trip, &user("bob"), &user("alice"), dec!(30))
            .unwrap();

        assert_eq!(ledger.balance(&trip.id, &user("alice"), &user("bob")), dec!(5));
    }

    #[rstest]
    fn test_settle_prunes_sub_epsilon_remainder(trip: Group) {
        let ledger = Ledger::default();
        ledger
            .apply_expense(&trip, &user("alice"), &equal_quarters(dec!(100)))
            .unwrap();

        ledger
            .settle(&trip, &user("bob"), &user("alice"), dec!(24.95))
            .unwrap();

        assert_eq!(ledger.balance(&trip.id, &user("bob"), &user("alice")), Decimal::ZERO);
    }

    #[rstest]
    #[case::zero(dec!(0), "bob", "alice")]
    #[case::negative(dec!(-5), "bob", "alice")]
    fn test_settle_rejects_non_positive_amount(
        trip: Group,
        #[case] amount: Decimal,
        #[case] from: &str,
        #[case] to: &str,
    ) {
        let ledger = Ledger::default();
        let result = ledger.settle(&trip, &user(from), &user(to), amount);
        assert!(matches!(result.unwrap_err(), LedgerError::InvalidAmount { .. }));
    }

    #[rstest]
    fn test_settle_rejects_self_and_non_members(trip: Group) {
        let ledger = Ledger::default();

        assert!(matches!(
            ledger
                .settle(&trip, &user("bob"), &user("bob"), dec!(5))
                .unwrap_err(),
            LedgerError::SelfSettlement { .. }
        ));
        assert!(matches!(
            ledger
                .settle(&trip, &user("bob"), &user("mallory"), dec!(5))
                .unwrap_err(),
            LedgerError::MembershipViolation { .. }
        ));
        assert_eq!(ledger.group_count(), 0);
    }

    #[rstest]
    fn test_non_member_split_rejects_whole_expense(trip: Group) {
        let ledger = Ledger::default();
        let splits = vec![
            Split::new("bob", dec!(10)),
            Split::new("mallory", dec!(10)),
        ];

        let result = ledger.apply_expense(&trip, &user("alice"), &splits);

        assert_eq!(
            result.unwrap_err(),
            LedgerError::membership_violation("mallory", "trip")
        );
        assert_eq!(ledger.balance(&trip.id, &user("bob"), &user("alice")), Decimal::ZERO);
    }

    #[rstest]
    fn test_failed_record_leaves_balances_untouched(trip: Group) {
        let ledger = Ledger::default();

        let result = ledger.apply_expense_with(
            &trip,
            &user("alice"),
            &equal_quarters(dec!(100)),
            || Err(LedgerError::duplicate_expense("e1")),
        );

        assert!(matches!(result.unwrap_err(), LedgerError::DuplicateExpense { .. }));
        assert!(ledger.group_balances(&trip.id).is_empty());
    }

    #[rstest]
    fn test_group_balances_excludes_sub_epsilon_and_sorts(trip: Group) {
        let ledger = Ledger::default();
        let splits = vec![
            Split::new("dave", dec!(4)),
            Split::new("bob", dec!(6)),
            Split::new("carol", dec!(0.05)),
        ];
        ledger.apply_expense(&trip, &user("alice"), &splits).unwrap();

        let debtors: Vec<_> = ledger
            .group_balances(&trip.id)
            .into_iter()
            .map(|b| (b.debtor, b.amount))
            .collect();
        assert_eq!(debtors, vec![(user("bob"), dec!(6)), (user("dave"), dec!(4))]);

        assert_eq!(ledger.compact(&trip.id), 1);
        assert_eq!(ledger.balance(&trip.id, &user("carol"), &user("alice")), Decimal::ZERO);
    }

    #[rstest]
    fn test_reverse_expense_restores_balances(trip: Group) {
        let ledger = Ledger::default();
        let expense = Expense {
            id: "e1".into(),
            description: "dinner".to_string(),
            amount: dec!(100),
            group: trip.id.clone(),
            payer: user("alice"),
            splits: equal_quarters(dec!(100)),
            created_at: chrono::Utc::now(),
        };
        ledger
            .apply_expense(&trip, &expense.payer, &expense.splits)
            .unwrap();

        ledger.reverse_expense_with(&trip, &expense, || Ok(())).unwrap();

        assert!(ledger.group_balances(&trip.id).is_empty());
        assert!(!ledger.has_outstanding(&trip.id));
    }

    #[rstest]
    fn test_reverse_expense_rejects_departed_member(trip: Group) {
        let ledger = Ledger::default();
        let expense = Expense {
            id: "e1".into(),
            description: "dinner".to_string(),
            amount: dec!(100),
            group: trip.id.clone(),
            payer: user("alice"),
            splits: equal_quarters(dec!(100)),
            created_at: chrono::Utc::now(),
        };
        ledger
            .apply_expense(&trip, &expense.payer, &expense.splits)
            .unwrap();

        let mut without_bob = trip.clone();
        without_bob.remove_member(&user("bob"));
        let mut recorded = false;

        let result = ledger.reverse_expense_with(&without_bob, &expense, || {
            recorded = true;
            Ok(())
        });

        assert_eq!(
            result.unwrap_err(),
            LedgerError::membership_violation("bob", "trip")
        );
        assert!(!recorded);
        assert_eq!(ledger.balance(&trip.id, &user("bob"), &user("alice")), dec!(25));
    }

    #[rstest]
    fn test_user_totals_span_groups(trip: Group) {
        let ledger = Ledger::default();
        let flat = Group::new("flat", "Flat", "bob").with_members(["alice"]);

        ledger
            .apply_expense(&trip, &user("alice"), &equal_quarters(dec!(100)))
            .unwrap();
        ledger
            .apply_expense(
                &flat,
                &user("bob"),
                &[Split::new("alice", dec!(10)), Split::new("bob", dec!(10))],
            )
            .unwrap();

        let totals = ledger.user_totals(&user("alice"));
        assert_eq!(totals.owed_to_user, dec!(75));
        assert_eq!(totals.owed_by_user, dec!(10));
    }

    #[rstest]
    fn test_remove_settled_group(trip: Group) {
        let ledger = Ledger::default();
        ledger
            .apply_expense(&trip, &user("alice"), &equal_quarters(dec!(100)))
            .unwrap();

        assert_eq!(
            ledger.remove_settled_group(&trip.id).unwrap_err(),
            LedgerError::unsettled_balances("trip")
        );

        for debtor in ["bob", "carol", "dave"] {
            ledger
                .settle(&trip, &user(debtor), &user("alice"), dec!(25))
                .unwrap();
        }
        ledger.remove_settled_group(&trip.id).unwrap();
        assert_eq!(ledger.group_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_expenses_match_sequential_totals() {
        let ledger = Arc::new(Ledger::default());
        let group = Arc::new(
            Group::new("trip", "Ski trip", "alice").with_members(["bob", "carol", "dave"]),
        );

        let mut handles = Vec::new();
        for task in 0..8 {
            let ledger = Arc::clone(&ledger);
            let group = Arc::clone(&group);
            handles.push(tokio::spawn(async move {
                let payer = if task % 2 == 0 { "alice" } else { "bob" };
                for _ in 0..50 {
                    ledger
                        .apply_expense(&group, &UserId::from(payer), &equal_quarters(dec!(4)))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 200 expenses each way, each charging 1.00 to the other payer
        assert_eq!(ledger.balance(&group.id, &user("bob"), &user("alice")), Decimal::ZERO);
        assert_eq!(ledger.balance(&group.id, &user("carol"), &user("alice")), dec!(200));
        assert_eq!(ledger.balance(&group.id, &user("carol"), &user("bob")), dec!(200));
        assert_eq!(ledger.balance(&group.id, &user("dave"), &user("bob")), dec!(200));
    }
}
