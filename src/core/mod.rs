//! Core business logic module
//!
//! This module contains the ledger components:
//! - `split_calculator` - Pure division of an expense total between members
//! - `balance_sheet` - One group's canonical pairwise balances
//! - `ledger` - All groups' sheets and the per-group unit of work
//! - `expense_book` - Immutable expense records
//! - `directory` - Users, groups and membership
//! - `engine` - Orchestration of the above
//! - `config` - Ledger thresholds and deletion policy
//! - `traits` - Seams for interchangeable collaborators
//! - `async` - Group-partitioned concurrent replay

pub mod r#async;
pub mod balance_sheet;
pub mod config;
pub mod directory;
pub mod engine;
pub mod expense_book;
pub mod ledger;
pub mod split_calculator;
pub mod traits;

pub use balance_sheet::BalanceSheet;
pub use config::{DeletionPolicy, LedgerConfig};
pub use directory::Directory;
pub use engine::{LedgerEngine, NewExpense};
pub use expense_book::ExpenseBook;
pub use ledger::Ledger;
pub use r#async::BatchProcessor;
pub use split_calculator::{calculate_splits, SplitStrategy};
pub use traits::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
