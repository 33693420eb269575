//! Users, groups and membership
//!
//! The directory answers one question for the rest of the core: is this user
//! a member of this group? It also owns user and group lifecycles.
//!
//! Lookups hand out cloned snapshots so no caller ever holds a directory
//! guard while touching the ledger.

use crate::types::{Group, GroupId, LedgerError, User, UserId};
use dashmap::DashMap;
use tracing::debug;

/// Registry of users and groups
#[derive(Debug, Default)]
pub struct Directory {
    users: DashMap<UserId, User>,
    groups: DashMap<GroupId, Group>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user
    ///
    /// # Errors
    ///
    /// * `DuplicateUser` - a user with the same ID exists
    pub fn create_user(&self, user: User) -> Result<(), LedgerError> {
        let id = user.id.clone();
        let mut inserted = false;
        self.users.entry(id.clone()).or_insert_with(|| {
            inserted = true;
            user
        });

        if !inserted {
            return Err(LedgerError::duplicate_user(&id));
        }
        debug!(user = %id, "registered user");
        Ok(())
    }

    /// Register a placeholder user named after its ID, unless it exists
    ///
    /// Returns `true` if the user was created.
    pub fn ensure_user(&self, id: &UserId) -> bool {
        let mut created = false;
        self.users.entry(id.clone()).or_insert_with(|| {
            created = true;
            User::new(id.clone(), id.as_str(), "")
        });
        created
    }

    pub fn user(&self, id: &UserId) -> Option<User> {
        self.users.get(id).map(|user| user.clone())
    }

    pub fn contains_user(&self, id: &UserId) -> bool {
        self.users.contains_key(id)
    }

    /// Register a group
    ///
    /// # Errors
    ///
    /// * `UnknownUser` - a member (creator included) is not registered
    /// * `DuplicateGroup` - a group with the same ID exists
    pub fn create_group(&self, group: Group) -> Result<(), LedgerError> {
        if let Some(unknown) = group.members().find(|member| !self.contains_user(member)) {
            return Err(LedgerError::unknown_user(unknown));
        }

        let id = group.id.clone();
        let members = group.member_count();
        let mut inserted = false;
        self.groups.entry(id.clone()).or_insert_with(|| {
            inserted = true;
            group
        });

        if !inserted {
            return Err(LedgerError::duplicate_group(&id));
        }
        debug!(group = %id, members, "created group");
        Ok(())
    }

    pub fn group(&self, id: &GroupId) -> Option<Group> {
        self.groups.get(id).map(|group| group.clone())
    }

    /// Snapshot of a group, or `UnknownGroup`
    pub fn require_group(&self, id: &GroupId) -> Result<Group, LedgerError> {
        self.group(id).ok_or_else(|| LedgerError::unknown_group(id))
    }

    /// Add a user to a group
    ///
    /// Idempotent: adding an existing member succeeds and returns `false`.
    ///
    /// # Errors
    ///
    /// * `UnknownUser` - the user is not registered
    /// * `UnknownGroup` - the group does not exist
    pub fn add_member(&self, group: &GroupId, user: &UserId) -> Result<bool, LedgerError> {
        if !self.contains_user(user) {
            return Err(LedgerError::unknown_user(user));
        }

        let mut entry = self
            .groups
            .get_mut(group)
            .ok_or_else(|| LedgerError::unknown_group(group))?;
        let added = entry.add_member(user.clone());

        if added {
            debug!(group = %group, user = %user, "added member");
        }
        Ok(added)
    }

    pub fn is_member(&self, user: &UserId, group: &GroupId) -> bool {
        self.groups
            .get(group)
            .map(|g| g.is_member(user))
            .unwrap_or(false)
    }

    /// Every group `user` belongs to, sorted by group ID
    pub fn groups_for(&self, user: &UserId) -> Vec<Group> {
        let mut groups: Vec<Group> = self
            .groups
            .iter()
            .filter(|group| group.is_member(user))
            .map(|group| group.clone())
            .collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        groups
    }

    /// Remove a user and strip them from every group
    ///
    /// A group's creator stays a member for as long as the group exists, so
    /// the creator of a live group cannot be removed.
    ///
    /// # Errors
    ///
    /// * `UnknownUser` - the user is not registered
    /// * `CreatorOfGroup` - the user created a group that still exists
    pub fn remove_user(&self, id: &UserId) -> Result<User, LedgerError> {
        if !self.users.contains_key(id) {
            return Err(LedgerError::unknown_user(id));
        }
        if let Some(created) = self.groups.iter().find(|group| &group.creator == id) {
            return Err(LedgerError::creator_of_group(id, created.key()));
        }

        let (_, user) = self
            .users
            .remove(id)
            .ok_or_else(|| LedgerError::unknown_user(id))?;

        for mut group in self.groups.iter_mut() {
            group.remove_member(id);
        }
        Ok(user)
    }

    pub fn remove_group(&self, id: &GroupId) -> Result<Group, LedgerError> {
        self.groups
            .remove(id)
            .map(|(_, group)| group)
            .ok_or_else(|| LedgerError::unknown_group(id))
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
