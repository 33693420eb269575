//! Expense-related types
//!
//! This module defines the split modes, the per-participant `Split`, and the
//! immutable `Expense` record that is written once when an expense is logged.

use super::balance::Posting;
use super::ids::{ExpenseId, GroupId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Mode-specific allocation data: an amount or a percentage per user
pub type Allocation = HashMap<UserId, Decimal>;

/// How an expense total is divided between the group's members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Every member receives the same share, payer included
    #[default]
    Equal,

    /// The allocation gives the monetary amount for each member
    Exact,

    /// The allocation gives the percentage of the total for each member
    Percentage,
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitMode::Equal => "equal",
            SplitMode::Exact => "exact",
            SplitMode::Percentage => "percentage",
        };
        f.write_str(name)
    }
}

impl FromStr for SplitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(SplitMode::Equal),
            "exact" => Ok(SplitMode::Exact),
            "percentage" | "percent" => Ok(SplitMode::Percentage),
            other => Err(format!("Invalid split mode '{}'", other)),
        }
    }
}

/// One participant's share of an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub user: UserId,
    pub amount: Decimal,
}

impl Split {
    pub fn new(user: impl Into<UserId>, amount: Decimal) -> Self {
        Split {
            user: user.into(),
            amount,
        }
    }
}

/// Immutable record of a logged expense and its computed splits
///
/// The record is the source of truth for the ledger deltas it caused:
/// [`Expense::postings`] reproduces them exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    /// Total amount (always positive)
    pub amount: Decimal,
    pub group: GroupId,
    pub payer: UserId,
    pub splits: Vec<Split>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Sum of all split amounts
    pub fn allocated(&self) -> Decimal {
        self.splits.iter().map(|split| split.amount).sum()
    }

    /// The directed debts this expense adds to its group's ledger
    pub fn postings(&self) -> Vec<Posting> {
        postings_for(&self.payer, &self.splits)
    }
}

/// Convert splits into postings owed to `payer`
///
/// The payer's own split and zero-amount splits produce no posting: a user
/// never owes themselves.
pub fn postings_for(payer: &UserId, splits: &[Split]) -> Vec<Posting> {
    splits
        .iter()
        .filter(|split| &split.user != payer && !split.amount.is_zero())
        .map(|split| Posting::new(split.user.clone(), payer.clone(), split.amount))
        .collect()
}
