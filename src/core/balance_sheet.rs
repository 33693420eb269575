//! Per-group balance sheet
//!
//! This module provides the `BalanceSheet` struct which holds the pairwise
//! balances of a single group.
//!
//! Each unordered pair of users is stored exactly once, in canonical
//! direction: the key orders the two IDs and the signed amount means "low owes
//! high" when positive. Reading `balance(a, b)` negates the stored value when
//! `a` is the higher ID, so `balance(a, b) == -balance(b, a)` holds by
//! construction and cannot drift. A pair whose amount reaches exactly zero is
//! removed.
//!
//! The BalanceSheet is responsible for:
//! - Posting directed debts with checked arithmetic
//! - Staging a batch of postings so it applies completely or not at all,
//!   reading only the pairs the batch touches
//! - Pruning pairs below the epsilon threshold
//! - Read-side views (outstanding debts, per-user net position)

use crate::types::{Balance, GroupId, LedgerError, NetBalance, Posting, UserId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Canonical key of an unordered user pair: `low < high`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: UserId,
    high: UserId,
}

impl PairKey {
    /// Build the canonical key for `debtor` owing `creditor`
    ///
    /// Returns the key and the sign the directed amount takes when stored:
    /// `1` if the debtor is the low side, `-1` otherwise.
    fn directed(debtor: &UserId, creditor: &UserId) -> (PairKey, Decimal) {
        if debtor < creditor {
            (
                PairKey {
                    low: debtor.clone(),
                    high: creditor.clone(),
                },
                Decimal::ONE,
            )
        } else {
            (
                PairKey {
                    low: creditor.clone(),
                    high: debtor.clone(),
                },
                Decimal::NEGATIVE_ONE,
            )
        }
    }

    pub fn low(&self) -> &UserId {
        &self.low
    }

    pub fn high(&self) -> &UserId {
        &self.high
    }

    fn involves(&self, user: &UserId) -> bool {
        &self.low == user || &self.high == user
    }
}

/// New amounts for the pairs a batch of postings touches
///
/// Produced by [`BalanceSheet::stage`] and consumed by
/// [`BalanceSheet::commit`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StagedPostings {
    updates: HashMap<PairKey, Decimal>,
}

impl StagedPostings {
    /// Number of distinct pairs touched
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Pairwise balances of one group
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSheet {
    group: GroupId,
    /// Amount `low` owes `high`; never exactly zero
    pairs: HashMap<PairKey, Decimal>,
}

impl BalanceSheet {
    /// Create an empty sheet for a group
    pub fn new(group: GroupId) -> Self {
        BalanceSheet {
            group,
            pairs: HashMap::new(),
        }
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    /// Number of stored pairs, including ones below epsilon
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Signed amount `debtor` owes `creditor`
    ///
    /// Negative when the debt runs the other way; zero when the pair has
    /// never transacted or is fully settled.
    pub fn balance(&self, debtor: &UserId, creditor: &UserId) -> Decimal {
        if debtor == creditor {
            return Decimal::ZERO;
        }
        let (key, sign) = PairKey::directed(debtor, creditor);
        self.pairs
            .get(&key)
            .map(|amount| amount * sign)
            .unwrap_or(Decimal::ZERO)
    }

    /// Record that `posting.debtor` owes `posting.creditor` a further amount
    ///
    /// Uses checked arithmetic so an overflowing balance is rejected instead
    /// of corrupting the pair. Self-postings and zero amounts are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the pair's amount would leave the
    /// decimal range. The sheet is unchanged in that case.
    pub fn post(&mut self, posting: &Posting) -> Result<(), LedgerError> {
        let staged = self.stage(std::slice::from_ref(posting))?;
        self.commit(staged);
        Ok(())
    }

    /// Compute the new amounts of every pair the postings touch
    ///
    /// Only the touched pairs are read; `self` is left untouched. Committing
    /// the result with [`BalanceSheet::commit`] cannot fail, so callers get
    /// all-or-nothing application.
    pub fn stage(&self, postings: &[Posting]) -> Result<StagedPostings, LedgerError> {
        let mut updates: HashMap<PairKey, Decimal> = HashMap::new();

        for posting in postings {
            if posting.debtor == posting.creditor || posting.amount.is_zero() {
                continue;
            }

            let (key, sign) = PairKey::directed(&posting.debtor, &posting.creditor);
            let current = updates
                .get(&key)
                .or_else(|| self.pairs.get(&key))
                .copied()
                .unwrap_or(Decimal::ZERO);
            let updated = posting
                .amount
                .checked_mul(sign)
                .and_then(|delta| current.checked_add(delta))
                .ok_or_else(|| LedgerError::arithmetic_overflow("post", &self.group))?;

            updates.insert(key, updated);
        }

        Ok(StagedPostings { updates })
    }

    /// Write staged pair amounts, dropping pairs that reached zero
    pub fn commit(&mut self, staged: StagedPostings) {
        for (key, amount) in staged.updates {
            if amount.is_zero() {
                self.pairs.remove(&key);
            } else {
                self.pairs.insert(key, amount);
            }
        }
    }

    /// Apply every posting, or none of them
    pub fn apply(&mut self, postings: &[Posting]) -> Result<(), LedgerError> {
        let staged = self.stage(postings)?;
        self.commit(staged);
        Ok(())
    }

    /// Remove the pair between two users if it is below `epsilon`
    ///
    /// Returns `true` if a pair was removed.
    pub fn prune_pair(&mut self, a: &UserId, b: &UserId, epsilon: Decimal) -> bool {
        let (key, _) = PairKey::directed(a, b);
        match self.pairs.get(&key) {
            Some(amount) if amount.abs() < epsilon => {
                self.pairs.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Remove every pair below `epsilon`, returning how many were removed
    pub fn prune(&mut self, epsilon: Decimal) -> usize {
        let before = self.pairs.len();
        self.pairs.retain(|_, amount| amount.abs() >= epsilon);
        before - self.pairs.len()
    }

    /// Debts at or above `epsilon`, each reported once in its positive direction
    ///
    /// Sorted by debtor, then creditor.
    pub fn outstanding(&self, epsilon: Decimal) -> Vec<Balance> {
        let mut balances: Vec<Balance> = self
            .pairs
            .iter()
            .filter(|(_, amount)| amount.abs() >= epsilon)
            .map(|(key, amount)| {
                let (debtor, creditor) = if amount.is_sign_positive() {
                    (key.low.clone(), key.high.clone())
                } else {
                    (key.high.clone(), key.low.clone())
                };
                Balance {
                    group: self.group.clone(),
                    debtor,
                    creditor,
                    amount: amount.abs(),
                }
            })
            .collect();

        balances.sort_by(|a, b| {
            a.debtor
                .cmp(&b.debtor)
                .then_with(|| a.creditor.cmp(&b.creditor))
        });
        balances
    }

    /// What `user` owes and is owed across all counterparties in this group
    ///
    /// Pairs below `epsilon` count as settled.
    pub fn net_for(&self, user: &UserId, epsilon: Decimal) -> NetBalance {
        let mut net = NetBalance::default();

        for (key, amount) in &self.pairs {
            if !key.involves(user) || amount.abs() < epsilon {
                continue;
            }
            // Positive amounts mean low owes high
            let user_owes = (&key.low == user) == amount.is_sign_positive();
            if user_owes {
                net.owed_by_user += amount.abs();
            } else {
                net.owed_to_user += amount.abs();
            }
        }
        net
    }

    /// Whether any pair is at or above `epsilon`
    pub fn has_outstanding(&self, epsilon: Decimal) -> bool {
        self.pairs.values().any(|amount| amount.abs() >= epsilon)
    }
}
