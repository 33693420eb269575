//! split-ledger
//!
//! # Overview
//!
//! The balance core of an expense-splitting application: users form groups,
//! log shared expenses, and the ledger tracks who owes whom. A CSV journal
//! replay tool is built on top, with a sync and an async strategy.
//!
//! # Architecture
//!
//! - [`types`] - Identifiers, entities, expenses, balances and errors
//! - [`core`] - Business logic components:
//!   - [`core::split_calculator`] - Divides an expense total between members
//!   - [`core::ledger`] - Per-group pairwise balances with atomic updates
//!   - [`core::expense_book`] - Immutable expense records
//!   - [`core::directory`] - Users, groups and membership
//!   - [`core::engine`] - Orchestration with validation up front
//! - [`io`] - Journal CSV parsing and balance output
//! - [`strategy`] - Sync and async replay pipelines
//! - [`cli`] - CLI arguments parsing
//! - [`telemetry`] - Tracing setup
//!
//! # Split Modes
//!
//! - **Equal**: the total is divided evenly, the last member by ID absorbing
//!   the sub-cent remainder
//! - **Exact**: each member's amount is given
//! - **Percentage**: each member's percentage of the total is given
//!
//! # Balances
//!
//! Each pair of users in a group has one signed balance. Reading it from
//! either side gives the same magnitude with opposite signs. Balances below
//! the epsilon threshold (0.10 by default) are treated as settled.
//!
//! ```
//! use rust_decimal::Decimal;
//! use split_ledger::{LedgerEngine, NewExpense, User, UserId};
//!
//! let engine = LedgerEngine::new();
//! engine.add_user(User::new("alice", "Alice", "alice@example.com")).unwrap();
//! engine.add_user(User::new("bob", "Bob", "bob@example.com")).unwrap();
//!
//! let group = engine
//!     .create_group("Trip", &UserId::from("alice"), &[UserId::from("bob")])
//!     .unwrap();
//! engine
//!     .add_expense(NewExpense::new(group.id.clone(), "alice", Decimal::new(50, 0)))
//!     .unwrap();
//!
//! let bob = engine.net_balance(&group.id, &UserId::from("bob"));
//! assert_eq!(bob.owed_by_user, Decimal::new(25, 0));
//! ```

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod telemetry;
pub mod types;

pub use core::{calculate_splits, LedgerConfig, LedgerEngine, NewExpense};
pub use io::write_balances_csv;
pub use types::{
    Balance, Expense, ExpenseId, Group, GroupId, LedgerError, NetBalance, Split, SplitMode, User,
    UserId,
};
