//! User and group entities
//!
//! Users are immutable once created. Groups carry a set of member IDs with
//! plain set semantics: a user is either in or out, with no ordering or
//! weight. Members are kept in a `BTreeSet` so every iteration over a group
//! (split calculation included) is deterministic.

use super::ids::{GroupId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Contact address
    pub email: String,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, email: impl Into<String>) -> Self {
        User {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A group of users that share expenses
///
/// The creator is always a member. Membership is the authorization boundary
/// of the ledger: only members may pay, be charged, or settle in the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub creator: UserId,
    pub created_at: DateTime<Utc>,
    members: BTreeSet<UserId>,
}

impl Group {
    /// Create a group whose only member is its creator
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>, creator: impl Into<UserId>) -> Self {
        let creator = creator.into();
        let mut members = BTreeSet::new();
        members.insert(creator.clone());

        Group {
            id: id.into(),
            name: name.into(),
            creator,
            created_at: Utc::now(),
            members,
        }
    }

    /// Builder-style helper that adds several members at once
    pub fn with_members<I, U>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        for member in members {
            self.members.insert(member.into());
        }
        self
    }

    /// Add a member, returning `false` if the user was already a member
    pub fn add_member(&mut self, user: UserId) -> bool {
        self.members.insert(user)
    }

    /// Remove a member, returning `false` if the user was not a member
    pub fn remove_member(&mut self, user: &UserId) -> bool {
        self.members.remove(user)
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    /// Members in ascending ID order
    pub fn members(&self) -> impl Iterator<Item = &UserId> {
        self.members.iter()
    }

    /// Members in ascending ID order, owned
    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().cloned().collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group_contains_creator() {
        let group = Group::new("trip", "Trip", "alice");
        assert!(group.is_member(&UserId::from("alice")));
        assert_eq!(group.member_count(), 1);
    }

    #[test]
    fn test_add_member_is_idempotent() {
        let mut group = Group::new("trip", "Trip", "alice");
        assert!(group.add_member(UserId::from("bob")));
        assert!(!group.add_member(UserId::from("bob")));
        assert_eq!(group.member_count(), 2);
    }

    #[test]
    fn test_members_iterate_in_id_order() {
        let group = Group::new("trip", "Trip", "carol").with_members(["bob", "alice", "carol"]);
        let ids: Vec<&str> = group.members().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "carol"]);
    }
}
