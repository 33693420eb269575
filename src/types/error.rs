//! Error types for the split ledger
//!
//! This module defines every error an operation on the ledger core can
//! return. Each operation validates its input before mutating anything, so an
//! error always means nothing was applied.
//!
//! # Error Categories
//!
//! - **Validation**: empty member set, non-positive amount, malformed allocation
//! - **Membership**: a user outside the group was referenced
//! - **Not found / Conflict**: unknown or duplicate entities, guarded deletions
//! - **Persistence**: arithmetic overflow in stored balances, storage and I/O failures

use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Membership,
    NotFound,
    Conflict,
    Persistence,
}

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Splits were requested over a group with no members
    ///
    /// An equal share is undefined when there is nobody to divide by.
    #[error("Cannot split an expense across an empty member set")]
    EmptyMemberSet,

    /// Amount is zero, negative, or otherwise unusable for the operation
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
        /// Operation that rejected it
        operation: String,
    },

    /// Allocation data could not be used for the requested split
    #[error("Invalid allocation for user {user}: {reason}")]
    InvalidAllocation {
        /// User whose entry is malformed
        user: String,
        /// Why the entry was rejected
        reason: String,
    },

    /// Computed splits do not add up to the expense total
    #[error("Splits total {allocated} does not match expense amount {expected}")]
    SplitMismatch {
        /// The expense total
        expected: Decimal,
        /// Sum of the computed splits
        allocated: Decimal,
    },

    /// A user tried to settle with themselves
    #[error("User {user} cannot settle with themselves")]
    SelfSettlement {
        /// The user on both sides
        user: String,
    },

    /// The operation references a user that is not a member of the group
    #[error("User {user} is not a member of group {group}")]
    MembershipViolation {
        /// The offending user
        user: String,
        /// The group being operated on
        group: String,
    },

    #[error("User {user} not found")]
    UnknownUser { user: String },

    #[error("Group {group} not found")]
    UnknownGroup { group: String },

    #[error("Expense {expense} not found")]
    UnknownExpense { expense: String },

    #[error("User {user} already exists")]
    DuplicateUser { user: String },

    #[error("Group {group} already exists")]
    DuplicateGroup { group: String },

    #[error("Expense {expense} already exists")]
    DuplicateExpense { expense: String },

    /// A user cannot be removed while they owe or are owed money
    #[error("User {user} has pending balances: owes {owed_by}, is owed {owed_to}")]
    PendingBalances {
        /// The user that was to be removed
        user: String,
        /// Total the user owes across all groups
        owed_by: Decimal,
        /// Total owed to the user across all groups
        owed_to: Decimal,
    },

    /// A user cannot be removed while a group they created still exists
    #[error("User {user} created group {group} and cannot be removed while it exists")]
    CreatorOfGroup { user: String, group: String },

    /// A group cannot be removed while any of its balances is outstanding
    #[error("Group {group} has unsettled balances")]
    UnsettledBalances { group: String },

    /// A balance update would overflow the decimal range
    ///
    /// The whole operation is rejected and no balance changes.
    #[error("Arithmetic overflow in {operation} for group {group}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Group whose ledger was being updated
        group: String,
    },

    /// The backing store could not complete the unit of work
    #[error("Persistence failure: {message}")]
    PersistenceFailure { message: String },

    /// I/O error while reading a journal or writing output
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// A journal row could not be parsed
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl LedgerError {
    /// Which part of the error taxonomy this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::EmptyMemberSet
            | LedgerError::InvalidAmount { .. }
            | LedgerError::InvalidAllocation { .. }
            | LedgerError::SplitMismatch { .. }
            | LedgerError::SelfSettlement { .. }
            | LedgerError::ParseError { .. } => ErrorKind::Validation,
            LedgerError::MembershipViolation { .. } => ErrorKind::Membership,
            LedgerError::UnknownUser { .. }
            | LedgerError::UnknownGroup { .. }
            | LedgerError::UnknownExpense { .. } => ErrorKind::NotFound,
            LedgerError::DuplicateUser { .. }
            | LedgerError::DuplicateGroup { .. }
            | LedgerError::DuplicateExpense { .. }
            | LedgerError::PendingBalances { .. }
            | LedgerError::CreatorOfGroup { .. }
            | LedgerError::UnsettledBalances { .. } => ErrorKind::Conflict,
            LedgerError::ArithmeticOverflow { .. }
            | LedgerError::PersistenceFailure { .. }
            | LedgerError::IoError { .. } => ErrorKind::Persistence,
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        LedgerError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    pub fn invalid_allocation(user: impl ToString, reason: &str) -> Self {
        LedgerError::InvalidAllocation {
            user: user.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn split_mismatch(expected: Decimal, allocated: Decimal) -> Self {
        LedgerError::SplitMismatch {
            expected,
            allocated,
        }
    }

    pub fn self_settlement(user: impl ToString) -> Self {
        LedgerError::SelfSettlement {
            user: user.to_string(),
        }
    }

    pub fn membership_violation(user: impl ToString, group: impl ToString) -> Self {
        LedgerError::MembershipViolation {
            user: user.to_string(),
            group: group.to_string(),
        }
    }

    pub fn unknown_user(user: impl ToString) -> Self {
        LedgerError::UnknownUser {
            user: user.to_string(),
        }
    }

    pub fn unknown_group(group: impl ToString) -> Self {
        LedgerError::UnknownGroup {
            group: group.to_string(),
        }
    }

    pub fn unknown_expense(expense: impl ToString) -> Self {
        LedgerError::UnknownExpense {
            expense: expense.to_string(),
        }
    }

    pub fn duplicate_user(user: impl ToString) -> Self {
        LedgerError::DuplicateUser {
            user: user.to_string(),
        }
    }

    pub fn duplicate_group(group: impl ToString) -> Self {
        LedgerError::DuplicateGroup {
            group: group.to_string(),
        }
    }

    pub fn duplicate_expense(expense: impl ToString) -> Self {
        LedgerError::DuplicateExpense {
            expense: expense.to_string(),
        }
    }

    pub fn pending_balances(user: impl ToString, owed_by: Decimal, owed_to: Decimal) -> Self {
        LedgerError::PendingBalances {
            user: user.to_string(),
            owed_by,
            owed_to,
        }
    }

    pub fn creator_of_group(user: impl ToString, group: impl ToString) -> Self {
        LedgerError::CreatorOfGroup {
            user: user.to_string(),
            group: group.to_string(),
        }
    }

    pub fn persistence_failure(message: impl Into<String>) -> Self {
        LedgerError::PersistenceFailure {
            message: message.into(),
        }
    }

    pub fn unsettled_balances(group: impl ToString) -> Self {
        LedgerError::UnsettledBalances {
            group: group.to_string(),
        }
    }

    pub fn arithmetic_overflow(operation: &str, group: impl ToString) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            group: group.to_string(),
        }
    }
}
