//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `ids`: Opaque user, group and expense identifiers
//! - `entity`: Users and groups
//! - `expense`: Split modes, splits and expense records
//! - `balance`: Postings and balance views
//! - `journal`: Events consumed by ledger replay
//! - `error`: Error types for the ledger

pub mod balance;
pub mod entity;
pub mod error;
pub mod expense;
pub mod ids;
pub mod journal;

pub use balance::{Balance, GroupNet, NetBalance, Posting};
pub use entity::{Group, User};
pub use error::{ErrorKind, LedgerError};
pub use expense::{postings_for, Allocation, Expense, Split, SplitMode};
pub use ids::{ExpenseId, GroupId, UserId};
pub use journal::JournalRecord;
