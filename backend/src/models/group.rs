//! Borrower groups and memberships.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BranchId, GroupId, MembershipId, UserId};

/// A borrower group managed by a loan officer.
///
/// Group names are unique case-insensitively (enforced by the engine on
/// creation). Only active groups count toward an officer's capacity and the
/// loan-approval gate. A group with `max_members = Some(n)` never holds more
/// than `n` active memberships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowerGroup {
    id: GroupId,
    name: String,
    /// Nulled if the branch is removed.
    branch: Option<BranchId>,
    assigned_officer: Option<UserId>,
    /// Free text such as "Monday" or "Day 15".
    payment_day: String,
    max_members: Option<u32>,
    is_active: bool,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl BorrowerGroup {
    pub fn new(
        id: GroupId,
        name: String,
        branch: BranchId,
        payment_day: String,
        max_members: Option<u32>,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            branch: Some(branch),
            assigned_officer: None,
            payment_day,
            max_members,
            is_active: true,
            created_by,
            created_at,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branch(&self) -> Option<BranchId> {
        self.branch
    }

    pub fn assigned_officer(&self) -> Option<UserId> {
        self.assigned_officer
    }

    pub fn payment_day(&self) -> &str {
        &self.payment_day
    }

    pub fn max_members(&self) -> Option<u32> {
        self.max_members
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn set_assigned_officer(&mut self, officer: Option<UserId>) {
        self.assigned_officer = officer;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn clear_branch(&mut self) {
        self.branch = None;
    }
}

/// A borrower's membership in a group.
///
/// The (borrower, group) pair is unique; a borrower holds at most one active
/// membership per group but may belong to several groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembership {
    id: MembershipId,
    borrower: UserId,
    group: GroupId,
    is_active: bool,
    joined_date: NaiveDate,
    added_by: UserId,
}

impl GroupMembership {
    pub fn new(
        id: MembershipId,
        borrower: UserId,
        group: GroupId,
        joined_date: NaiveDate,
        added_by: UserId,
    ) -> Self {
        Self {
            id,
            borrower,
            group,
            is_active: true,
            joined_date,
            added_by,
        }
    }

    pub fn id(&self) -> MembershipId {
        self.id
    }

    pub fn borrower(&self) -> UserId {
        self.borrower
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn joined_date(&self) -> NaiveDate {
        self.joined_date
    }

    pub fn added_by(&self) -> UserId {
        self.added_by
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Re-joining reuses the existing row rather than inserting a duplicate
    /// (borrower, group) pair.
    pub fn reactivate(&mut self, joined_date: NaiveDate, added_by: UserId) {
        self.is_active = true;
        self.joined_date = joined_date;
        self.added_by = added_by;
    }
}
