//! Balance-related types
//!
//! `Posting` is the unit of change applied to a ledger. `Balance` and
//! `NetBalance` are read-side views: they only ever describe debts in their
//! positive direction and never the raw stored pair.

use super::ids::{GroupId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A directed debt delta: `debtor` owes `creditor` an additional `amount`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub debtor: UserId,
    pub creditor: UserId,
    pub amount: Decimal,
}

impl Posting {
    pub fn new(debtor: impl Into<UserId>, creditor: impl Into<UserId>, amount: Decimal) -> Self {
        Posting {
            debtor: debtor.into(),
            creditor: creditor.into(),
            amount,
        }
    }

    /// The posting that cancels this one
    pub fn reversed(&self) -> Self {
        Posting {
            debtor: self.creditor.clone(),
            creditor: self.debtor.clone(),
            amount: self.amount,
        }
    }
}

/// An outstanding debt within a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub group: GroupId,
    pub debtor: UserId,
    pub creditor: UserId,
    /// Always positive
    pub amount: Decimal,
}

/// Aggregate position of one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetBalance {
    /// Total the user owes to others
    pub owed_by_user: Decimal,
    /// Total others owe to the user
    pub owed_to_user: Decimal,
}

impl NetBalance {
    /// Owed-to minus owed-by: positive when the user is owed money
    pub fn net(&self) -> Decimal {
        self.owed_to_user - self.owed_by_user
    }

    pub fn is_settled(&self) -> bool {
        self.owed_by_user.is_zero() && self.owed_to_user.is_zero()
    }

    /// Combine two positions, e.g. across groups
    pub fn combine(self, other: NetBalance) -> NetBalance {
        NetBalance {
            owed_by_user: self.owed_by_user + other.owed_by_user,
            owed_to_user: self.owed_to_user + other.owed_to_user,
        }
    }
}

/// A user's position within one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNet {
    pub group: GroupId,
    pub group_name: String,
    pub balance: NetBalance,
}
