//! Journal records consumed by ledger replay
//!
//! A journal is an ordered log of membership joins, expenses and
//! settlements. Replaying it through the engine reconstructs the ledger.

use super::expense::{Allocation, SplitMode};
use super::ids::{GroupId, UserId};
use rust_decimal::Decimal;

/// A single journal event
#[derive(Debug, Clone, PartialEq)]
pub enum JournalRecord {
    /// `user` joins `group`; the group is created on its first join
    Join { group: GroupId, user: UserId },

    /// `payer` paid `amount` for the group, divided according to `mode`
    Expense {
        group: GroupId,
        payer: UserId,
        amount: Decimal,
        mode: SplitMode,
        allocation: Allocation,
        description: String,
    },

    /// `from` pays `to` back `amount` within the group
    Settle {
        group: GroupId,
        from: UserId,
        to: UserId,
        amount: Decimal,
    },
}

impl JournalRecord {
    /// The group this event belongs to
    pub fn group(&self) -> &GroupId {
        match self {
            JournalRecord::Join { group, .. }
            | JournalRecord::Expense { group, .. }
            | JournalRecord::Settle { group, .. } => group,
        }
    }

    /// Short name of the event type, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            JournalRecord::Join { .. } => "join",
            JournalRecord::Expense { .. } => "expense",
            JournalRecord::Settle { .. } => "settle",
        }
    }
}
