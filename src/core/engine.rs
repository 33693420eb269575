//! Ledger orchestration
//!
//! This module provides the `LedgerEngine` struct, which coordinates the
//! directory, the split calculator, the ledger and the expense book into the
//! operations an application calls.
//!
//! # Design
//!
//! Every operation validates its input in full before it mutates anything.
//! Mutations that touch more than one store go through the ledger's unit of
//! work: adding an expense writes the record inside the group's entry guard
//! after the balance deltas were staged and before they are committed, so the
//! record and the balances never disagree.
//!
//! Deleting a user or a group checks that nothing is outstanding and then
//! removes it from several stores. Those deletions hold the engine's
//! lifecycle lock exclusively; every other mutation holds it shared, so no
//! expense, settlement or membership change can land between the check and
//! the removal.
//!
//! # Architecture
//!
//! ```text
//! LedgerEngine
//!     ├── Directory       (users, groups, membership)
//!     ├── ExpenseBook     (immutable expense records)
//!     ├── Ledger          (per-group balance sheets)
//!     ├── IdGenerator     (IDs for new entities)
//!     └── LedgerConfig    (epsilon, split tolerance, deletion policy)
//! ```
//!
//! # Thread Safety
//!
//! All methods take `&self`. Share one engine between tasks with `Arc`.

use crate::core::config::{DeletionPolicy, LedgerConfig};
use crate::core::directory::Directory;
use crate::core::expense_book::ExpenseBook;
use crate::core::ledger::Ledger;
use crate::core::split_calculator::calculate_splits;
use crate::core::traits::{IdGenerator, UuidIdGenerator};
use crate::types::{
    Allocation, Balance, Expense, ExpenseId, Group, GroupId, GroupNet, JournalRecord, LedgerError,
    NetBalance, Split, SplitMode, User, UserId,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Input for [`LedgerEngine::add_expense`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// Use this ID instead of generating one
    pub id: Option<ExpenseId>,
    pub description: String,
    pub amount: Decimal,
    pub group: GroupId,
    pub payer: UserId,
    pub mode: SplitMode,
    /// Per-member amounts or percentages; ignored for `Equal`
    pub allocation: Allocation,
}

impl NewExpense {
    /// An equally split expense with no description
    pub fn new(group: impl Into<GroupId>, payer: impl Into<UserId>, amount: Decimal) -> Self {
        Self {
            id: None,
            description: String::new(),
            amount,
            group: group.into(),
            payer: payer.into(),
            mode: SplitMode::Equal,
            allocation: Allocation::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<ExpenseId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_split(mut self, mode: SplitMode, allocation: Allocation) -> Self {
        self.mode = mode;
        self.allocation = allocation;
        self
    }
}

/// Entry point of the ledger core
pub struct LedgerEngine {
    directory: Directory,
    expenses: ExpenseBook,
    ledger: Ledger,
    ids: Arc<dyn IdGenerator>,
    config: LedgerConfig,
    /// Shared by mutations, exclusive for user and group deletion
    lifecycle: RwLock<()>,
}

impl LedgerEngine {
    /// Create an engine with the default configuration and UUID v7 IDs
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            directory: Directory::new(),
            expenses: ExpenseBook::new(),
            ledger: Ledger::new(config.epsilon),
            ids: Arc::new(UuidIdGenerator),
            config,
            lifecycle: RwLock::new(()),
        }
    }

    /// Replace the ID source, e.g. with a `SequentialIdGenerator` in tests
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn expenses(&self) -> &ExpenseBook {
        &self.expenses
    }

    fn shared(&self) -> Result<RwLockReadGuard<'_, ()>, LedgerError> {
        self.lifecycle
            .read()
            .map_err(|_| LedgerError::persistence_failure("lifecycle lock poisoned"))
    }

    fn exclusive(&self) -> Result<RwLockWriteGuard<'_, ()>, LedgerError> {
        self.lifecycle
            .write()
            .map_err(|_| LedgerError::persistence_failure("lifecycle lock poisoned"))
    }

    // ----------------------------------------------------------------------
    // Users and groups
    // ----------------------------------------------------------------------

    /// Register a new user with a generated ID
    pub fn register_user(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<User, LedgerError> {
        let user = User::new(self.ids.next_id(), name, email);
        self.directory.create_user(user.clone())?;
        Ok(user)
    }

    /// Register a user whose ID is already known
    pub fn add_user(&self, user: User) -> Result<(), LedgerError> {
        self.directory.create_user(user)
    }

    /// Create a group with a generated ID
    ///
    /// The creator is always a member; duplicate entries in `members` collapse.
    ///
    /// # Errors
    ///
    /// * `UnknownUser` - the creator or a member is not registered
    pub fn create_group(
        &self,
        name: impl Into<String>,
        creator: &UserId,
        members: &[UserId],
    ) -> Result<Group, LedgerError> {
        let group = Group::new(self.ids.next_id(), name, creator.clone())
            .with_members(members.iter().cloned());
        let _lifecycle = self.shared()?;
        self.directory.create_group(group.clone())?;
        info!(group = %group.id, creator = %creator, "group created");
        Ok(group)
    }

    /// Register a group whose ID is already known
    pub fn add_group(&self, group: Group) -> Result<(), LedgerError> {
        let _lifecycle = self.shared()?;
        self.directory.create_group(group)
    }

    /// Add a user to a group; `false` if they already were a member
    pub fn add_member(&self, group: &GroupId, user: &UserId) -> Result<bool, LedgerError> {
        let _lifecycle = self.shared()?;
        self.directory.add_member(group, user)
    }

    /// Delete a user who neither owes nor is owed anything
    ///
    /// # Errors
    ///
    /// * `UnknownUser` - the user is not registered
    /// * `CreatorOfGroup` - a group the user created still exists
    /// * `PendingBalances` - the user has an outstanding balance in some group
    pub fn delete_user(&self, user: &UserId) -> Result<User, LedgerError> {
        let _lifecycle = self.exclusive()?;

        if !self.directory.contains_user(user) {
            return Err(LedgerError::unknown_user(user));
        }

        let totals = self.ledger.user_totals(user);
        if !totals.is_settled() {
            return Err(LedgerError::pending_balances(
                user,
                totals.owed_by_user,
                totals.owed_to_user,
            ));
        }

        let removed = self.directory.remove_user(user)?;
        info!(user = %user, "user deleted");
        Ok(removed)
    }

    /// Delete a fully settled group along with its expenses
    ///
    /// # Errors
    ///
    /// * `UnknownGroup` - the group does not exist
    /// * `UnsettledBalances` - some balance in the group is outstanding
    pub fn delete_group(&self, group: &GroupId) -> Result<Group, LedgerError> {
        let _lifecycle = self.exclusive()?;

        self.directory.require_group(group)?;
        self.ledger.remove_settled_group(group)?;

        let expenses = self.expenses.remove_group(group);
        let removed = self.directory.remove_group(group)?;
        info!(group = %group, expenses, "group deleted");
        Ok(removed)
    }

    // ----------------------------------------------------------------------
    // Expenses and settlements
    // ----------------------------------------------------------------------

    /// Log an expense and apply its balance deltas
    ///
    /// The splits are computed over the group's current members in ID order.
    /// The record and the deltas are committed together or not at all.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - the amount is zero or negative
    /// * `UnknownGroup` - the group does not exist
    /// * `MembershipViolation` - the payer is not a member
    /// * `InvalidAllocation` - the allocation is malformed for the split mode
    /// * `SplitMismatch` - the splits miss the total by more than the tolerance
    /// * `DuplicateExpense` - the requested ID is taken
    /// * `ArithmeticOverflow` - a balance would leave the decimal range
    pub fn add_expense(&self, new: NewExpense) -> Result<Expense, LedgerError> {
        if new.amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(new.amount, "expense"));
        }

        let _lifecycle = self.shared()?;
        let group = self.directory.require_group(&new.group)?;
        if !group.is_member(&new.payer) {
            return Err(LedgerError::membership_violation(&new.payer, &group.id));
        }

        let splits = calculate_splits(&group.member_ids(), new.amount, new.mode, &new.allocation)?;
        self.check_split_total(&group.id, new.amount, &splits)?;

        let id = match new.id {
            Some(id) => id,
            None => ExpenseId::new(self.ids.next_id()),
        };
        if self.expenses.contains(&id) {
            return Err(LedgerError::duplicate_expense(&id));
        }

        let expense = Expense {
            id,
            description: new.description,
            amount: new.amount,
            group: group.id.clone(),
            payer: new.payer,
            splits,
            created_at: Utc::now(),
        };

        self.ledger
            .apply_expense_with(&group, &expense.payer, &expense.splits, || {
                self.expenses.record(expense.clone())
            })?;

        info!(
            expense = %expense.id,
            group = %expense.group,
            payer = %expense.payer,
            amount = %expense.amount,
            "expense added"
        );
        Ok(expense)
    }

    fn check_split_total(
        &self,
        group: &GroupId,
        amount: Decimal,
        splits: &[Split],
    ) -> Result<(), LedgerError> {
        let allocated = splits
            .iter()
            .try_fold(Decimal::ZERO, |sum, split| sum.checked_add(split.amount))
            .ok_or_else(|| LedgerError::arithmetic_overflow("split total", group))?;

        let gap = allocated
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("split total", group))?;
        if gap.abs() > self.config.split_tolerance {
            return Err(LedgerError::split_mismatch(amount, allocated));
        }
        Ok(())
    }

    /// Record that `from` paid `to` back `amount` in a group
    ///
    /// # Errors
    ///
    /// * `UnknownGroup` - the group does not exist
    /// * Any error of [`Ledger::settle`]
    pub fn settle(
        &self,
        group: &GroupId,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let _lifecycle = self.shared()?;
        let group = self.directory.require_group(group)?;
        self.ledger.settle(&group, from, to, amount)?;
        info!(group = %group.id, from = %from, to = %to, amount = %amount, "settlement recorded");
        Ok(())
    }

    /// Delete an expense record
    ///
    /// Under [`DeletionPolicy::Reverse`] the expense's balance deltas are
    /// undone in the same unit of work that removes the record. Under
    /// [`DeletionPolicy::RecordOnly`] balances are left as they are.
    ///
    /// # Errors
    ///
    /// * `UnknownExpense` - no record with this ID
    /// * `MembershipViolation` - under `Reverse`, the payer or a charged
    ///   member has since left the group; the record and balances stay
    pub fn delete_expense(&self, id: &ExpenseId) -> Result<Expense, LedgerError> {
        let _lifecycle = self.shared()?;
        let expense = self
            .expenses
            .get(id)
            .ok_or_else(|| LedgerError::unknown_expense(id))?;

        match self.config.deletion {
            DeletionPolicy::Reverse => {
                let group = self.directory.require_group(&expense.group)?;
                self.ledger.reverse_expense_with(&group, &expense, || {
                    self.expenses
                        .remove(id)
                        .map(|_| ())
                        .ok_or_else(|| LedgerError::unknown_expense(id))
                })?;
            }
            DeletionPolicy::RecordOnly => {
                self.expenses
                    .remove(id)
                    .ok_or_else(|| LedgerError::unknown_expense(id))?;
            }
        }

        info!(expense = %id, policy = %self.config.deletion, "expense deleted");
        Ok(expense)
    }

    // ----------------------------------------------------------------------
    // Queries
    // ----------------------------------------------------------------------

    pub fn net_balance(&self, group: &GroupId, user: &UserId) -> NetBalance {
        self.ledger.net_balance(group, user)
    }

    pub fn group_balances(&self, group: &GroupId) -> Vec<Balance> {
        self.ledger.group_balances(group)
    }

    /// Outstanding balances of all groups
    pub fn all_balances(&self) -> Vec<Balance> {
        self.ledger.all_balances()
    }

    /// Expenses of a group, newest first
    pub fn group_expenses(&self, group: &GroupId) -> Result<Vec<Expense>, LedgerError> {
        self.directory.require_group(group)?;
        Ok(self.expenses.for_group(group))
    }

    /// Every group `user` belongs to, with their position in it
    pub fn user_summary(&self, user: &UserId) -> Result<Vec<GroupNet>, LedgerError> {
        if !self.directory.contains_user(user) {
            return Err(LedgerError::unknown_user(user));
        }

        Ok(self
            .directory
            .groups_for(user)
            .into_iter()
            .map(|group| GroupNet {
                balance: self.ledger.net_balance(&group.id, user),
                group: group.id,
                group_name: group.name,
            })
            .collect())
    }

    /// Prune every sub-epsilon balance of a group
    pub fn compact_group(&self, group: &GroupId) -> Result<usize, LedgerError> {
        self.directory.require_group(group)?;
        Ok(self.ledger.compact(group))
    }

    // ----------------------------------------------------------------------
    // Journal replay
    // ----------------------------------------------------------------------

    /// Apply one journal event
    ///
    /// A join registers unknown users on the fly and creates the group, with
    /// the joining user as creator, on its first join.
    pub fn process(&self, record: JournalRecord) -> Result<(), LedgerError> {
        debug!(kind = record.kind(), group = %record.group(), "processing journal record");

        match record {
            JournalRecord::Join { group, user } => self.join(group, user),
            JournalRecord::Expense {
                group,
                payer,
                amount,
                mode,
                allocation,
                description,
            } => self
                .add_expense(
                    NewExpense::new(group, payer, amount)
                        .with_description(description)
                        .with_split(mode, allocation),
                )
                .map(|_| ()),
            JournalRecord::Settle {
                group,
                from,
                to,
                amount,
            } => self.settle(&group, &from, &to, amount),
        }
    }

    fn join(&self, group: GroupId, user: UserId) -> Result<(), LedgerError> {
        let _lifecycle = self.shared()?;
        self.directory.ensure_user(&user);

        if self.directory.group(&group).is_none() {
            let created = Group::new(group.clone(), group.as_str(), user.clone());
            match self.directory.create_group(created) {
                Ok(()) => return Ok(()),
                // Lost a race with another join; fall through to membership
                Err(LedgerError::DuplicateGroup { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        self.directory.add_member(&group, &user).map(|_| ())
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("directory", &self.directory)
            .field("expenses", &self.expenses)
            .field("ledger", &self.ledger)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
