//! Expense record storage
//!
//! This module provides the `ExpenseBook` struct, the immutable log of every
//! expense logged against a group.
//!
//! Records are written once, after their splits have been validated, and are
//! never edited. Each record carries enough information to reproduce the
//! balance deltas it caused (see [`Expense::postings`]).

use crate::types::{Expense, ExpenseId, GroupId, LedgerError};
use dashmap::DashMap;

/// Concurrent store of expense records keyed by ID
#[derive(Debug, Default)]
pub struct ExpenseBook {
    expenses: DashMap<ExpenseId, Expense>,
}

impl ExpenseBook {
    /// Create an empty ExpenseBook
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new expense record
    ///
    /// # Errors
    ///
    /// * `DuplicateExpense` - a record with the same ID was already stored;
    ///   the existing record is kept
    pub fn record(&self, expense: Expense) -> Result<(), LedgerError> {
        let id = expense.id.clone();
        let mut inserted = false;
        self.expenses.entry(id.clone()).or_insert_with(|| {
            inserted = true;
            expense
        });

        if inserted {
            Ok(())
        } else {
            Err(LedgerError::duplicate_expense(id))
        }
    }

    /// Get a copy of an expense record
    pub fn get(&self, id: &ExpenseId) -> Option<Expense> {
        self.expenses.get(id).map(|expense| expense.clone())
    }

    pub fn contains(&self, id: &ExpenseId) -> bool {
        self.expenses.contains_key(id)
    }

    /// Remove a record, returning it
    pub fn remove(&self, id: &ExpenseId) -> Option<Expense> {
        self.expenses.remove(id).map(|(_, expense)| expense)
    }

    /// Expenses of a group, newest first
    ///
    /// Records created at the same instant are ordered by ID so the result is
    /// stable.
    pub fn for_group(&self, group: &GroupId) -> Vec<Expense> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|expense| &expense.group == group)
            .map(|expense| expense.clone())
            .collect();

        expenses.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        expenses
    }

    /// Drop every record of a group, returning how many were removed
    pub fn remove_group(&self, group: &GroupId) -> usize {
        let before = self.expenses.len();
        self.expenses.retain(|_, expense| &expense.group != group);
        before.saturating_sub(self.expenses.len())
    }

    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Split;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn expense(id: &str, group: &str, minutes: i64) -> Expense {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Expense {
            id: ExpenseId::from(id),
            description: format!("expense {id}"),
            amount: dec!(10),
            group: GroupId::from(group),
            payer: "alice".into(),
            splits: vec![Split::new("alice", dec!(5)), Split::new("bob", dec!(5))],
            created_at: base + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_record_and_get() {
        let book = ExpenseBook::new();
        book.record(expense("e1", "trip", 0)).unwrap();

        let stored = book.get(&ExpenseId::from("e1")).unwrap();
        assert_eq!(stored.amount, dec!(10));
        assert_eq!(stored.allocated(), dec!(10));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_duplicate_record_keeps_original() {
        let book = ExpenseBook::new();
        book.record(expense("e1", "trip", 0)).unwrap();

        let mut other = expense("e1", "flat", 5);
        other.description = "replacement".to_string();
        assert_eq!(
            book.record(other).unwrap_err(),
            LedgerError::duplicate_expense("e1")
        );
        assert_eq!(book.get(&ExpenseId::from("e1")).unwrap().group, GroupId::from("trip"));
    }

    #[test]
    fn test_for_group_newest_first_with_id_tiebreak() {
        let book = ExpenseBook::new();
        book.record(expense("e1", "trip", 0)).unwrap();
        book.record(expense("e3", "trip", 10)).unwrap();
        book.record(expense("e2", "trip", 10)).unwrap();
        book.record(expense("e4", "flat", 20)).unwrap();

        let ids: Vec<String> = book
            .for_group(&GroupId::from("trip"))
            .into_iter()
            .map(|e| e.id.to_string())
            .collect();
        assert_eq!(ids, vec!["e2", "e3", "e1"]);
    }

    #[test]
    fn test_remove_group_only_touches_that_group() {
        let book = ExpenseBook::new();
        book.record(expense("e1", "trip", 0)).unwrap();
        book.record(expense("e2", "trip", 1)).unwrap();
        book.record(expense("e3", "flat", 2)).unwrap();

        assert_eq!(book.remove_group(&GroupId::from("trip")), 2);
        assert!(book.contains(&ExpenseId::from("e3")));
        assert!(book.remove(&ExpenseId::from("e3")).is_some());
        assert!(book.is_empty());
    }
}
