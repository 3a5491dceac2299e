//! Users, branches, and officer capacity profiles.
//!
//! Admins, managers, loan officers, and borrowers share one `User` record
//! with a `Role` discriminator; role-specific state lives in side records
//! (`OfficerAssignment` for officers, `Branch::manager` for managers) rather
//! than in subtypes. Cross-references are ids, never in-memory pointers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BranchId, UserId};

/// Role discriminator for a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    LoanOfficer,
    Borrower,
}

impl Role {
    /// Staff roles may confirm payments and see beyond their own records.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager | Role::LoanOfficer)
    }
}

/// A platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    full_name: String,
    role: Role,
    is_active: bool,
    is_verified: bool,
    /// Borrower-to-officer back reference; rewritten by assignment ops.
    assigned_officer: Option<UserId>,
    /// Explicit group-creation permission for users whose role alone does
    /// not grant it.
    can_create_groups: bool,
    joined_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: UserId,
        username: String,
        full_name: String,
        role: Role,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            full_name,
            role,
            is_active: true,
            is_verified: false,
            assigned_officer: None,
            can_create_groups: false,
            joined_at,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn assigned_officer(&self) -> Option<UserId> {
        self.assigned_officer
    }

    pub fn can_create_groups(&self) -> bool {
        self.can_create_groups
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    /// Role changes are audited by the engine.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn mark_verified(&mut self) {
        self.is_verified = true;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn set_assigned_officer(&mut self, officer: Option<UserId>) {
        self.assigned_officer = officer;
    }

    pub fn grant_group_creation(&mut self) {
        self.can_create_groups = true;
    }
}

/// A branch office. Removal nulls references in dependent rows, never
/// cascades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    id: BranchId,
    name: String,
    code: String,
    manager: Option<UserId>,
}

impl Branch {
    pub fn new(id: BranchId, name: String, code: String) -> Self {
        Self {
            id,
            name,
            code,
            manager: None,
        }
    }

    pub fn id(&self) -> BranchId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn manager(&self) -> Option<UserId> {
        self.manager
    }

    pub fn set_manager(&mut self, manager: Option<UserId>) {
        self.manager = manager;
    }
}

/// Capacity profile for a loan officer (1:1 with the officer user).
///
/// `max_groups` is at least 15 and `max_clients` at least 1; the engine
/// validates both on creation. The branch reference is nulled if the branch
/// is removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficerAssignment {
    officer: UserId,
    branch: Option<BranchId>,
    max_groups: u32,
    max_clients: u32,
    accepting: bool,
}

impl OfficerAssignment {
    pub fn new(officer: UserId, branch: BranchId, max_groups: u32, max_clients: u32) -> Self {
        Self {
            officer,
            branch: Some(branch),
            max_groups,
            max_clients,
            accepting: true,
        }
    }

    pub fn officer(&self) -> UserId {
        self.officer
    }

    pub fn branch(&self) -> Option<BranchId> {
        self.branch
    }

    pub fn max_groups(&self) -> u32 {
        self.max_groups
    }

    pub fn max_clients(&self) -> u32 {
        self.max_clients
    }

    pub fn accepting(&self) -> bool {
        self.accepting
    }

    pub fn set_accepting(&mut self, accepting: bool) {
        self.accepting = accepting;
    }

    pub fn clear_branch(&mut self) {
        self.branch = None;
    }
}
