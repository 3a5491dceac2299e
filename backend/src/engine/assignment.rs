//! Officer/group/client assignment, capacity limits, and approval gates.

use serde_json::json;

use crate::engine::{ActorContext, LoanEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::group::{BorrowerGroup, GroupMembership};
use crate::models::user::{OfficerAssignment, Role};
use crate::models::{BranchId, GroupId, MembershipId, UserId};

/// Result of assigning an officer to a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignmentOutcome {
    pub group: GroupId,
    pub officer: UserId,
    /// True when an admin pushed the officer past their group capacity.
    pub capacity_override: bool,
}

impl LoanEngine {
    /// Create the capacity profile for a loan officer (1:1). Group capacity
    /// must allow at least the 15 groups needed for approval authority.
    pub fn create_officer_profile(
        &mut self,
        ctx: &ActorContext,
        officer: UserId,
        branch: BranchId,
        max_groups: u32,
        max_clients: u32,
    ) -> EngineResult<()> {
        self.require_role(ctx, &[Role::Admin, Role::Manager], "creating an officer profile")?;
        let user = self.require_user(officer)?;
        if user.role() != Role::LoanOfficer {
            return Err(EngineError::validation(
                "officer",
                format!("{} is not a loan officer", user.username()),
            ));
        }
        if max_groups < 15 {
            return Err(EngineError::validation("max_groups", "must be at least 15"));
        }
        if max_clients < 1 {
            return Err(EngineError::validation("max_clients", "must be at least 1"));
        }
        if self.state.branch(branch).is_none() {
            return Err(EngineError::not_found("branch", branch));
        }
        if self.state.officer_profile(officer).is_some() {
            return Err(EngineError::Integrity(format!(
                "officer {officer} already has a profile"
            )));
        }

        self.state
            .insert_officer_profile(OfficerAssignment::new(officer, branch, max_groups, max_clients));
        let entry = self
            .entry(AuditStream::Admin, AuditAction::OfficerProfileCreated, ctx)
            .user(officer);
        self.record(entry);
        Ok(())
    }

    /// Open or close an officer's book for new client assignments.
    pub fn set_officer_accepting(
        &mut self,
        ctx: &ActorContext,
        officer: UserId,
        accepting: bool,
    ) -> EngineResult<()> {
        self.require_role(ctx, &[Role::Admin, Role::Manager], "updating an officer profile")?;
        self.state
            .officer_profile_mut(officer)
            .ok_or_else(|| EngineError::not_found("officer profile", officer))?
            .set_accepting(accepting);
        Ok(())
    }

    /// Whether `user` may approve loans: admins and managers always;
    /// loan officers only with enough active groups.
    pub fn can_approve_loans(&self, user: UserId) -> bool {
        match self.state.user(user) {
            Some(u) => match u.role() {
                Role::Admin | Role::Manager => true,
                Role::LoanOfficer => {
                    self.state.active_group_count(user)
                        >= self.config.min_groups_for_approval as usize
                }
                Role::Borrower => false,
            },
            None => false,
        }
    }

    /// The minimum-groups gate with a remedial message for refusals.
    pub(crate) fn ensure_can_approve(&self, user: UserId) -> EngineResult<()> {
        let u = self.require_user(user)?;
        match u.role() {
            Role::Admin | Role::Manager => Ok(()),
            Role::LoanOfficer => {
                let needed = self.config.min_groups_for_approval as usize;
                let managing = self.state.active_group_count(user);
                if managing >= needed {
                    Ok(())
                } else {
                    Err(EngineError::Authorization(format!(
                        "loan approval requires at least {needed} active groups; \
                         {} currently manages {managing}",
                        u.username()
                    )))
                }
            }
            Role::Borrower => Err(EngineError::Authorization(
                "borrowers cannot approve loans".into(),
            )),
        }
    }

    /// Whether `user` may create borrower groups: staff by role, or anyone
    /// holding the explicit permission.
    pub fn can_create_group(&self, user: UserId) -> bool {
        self.state
            .user(user)
            .map(|u| u.role().is_staff() || u.can_create_groups())
            .unwrap_or(false)
    }

    pub fn create_group(
        &mut self,
        ctx: &ActorContext,
        name: impl Into<String>,
        branch: BranchId,
        payment_day: impl Into<String>,
        max_members: Option<u32>,
    ) -> EngineResult<GroupId> {
        let actor = self.require_actor(ctx)?.id();
        if !self.can_create_group(actor) {
            return Err(EngineError::Authorization(
                "creating groups requires staff role or the group-creation permission".into(),
            ));
        }
        let name = name.into();
        if self.state.group_by_name_ci(&name).is_some() {
            return Err(EngineError::validation(
                "name",
                format!("a group named {name} already exists"),
            ));
        }
        if self.state.branch(branch).is_none() {
            return Err(EngineError::not_found("branch", branch));
        }
        if max_members == Some(0) {
            return Err(EngineError::validation("max_members", "must be at least 1"));
        }

        let at = self.now();
        let id = self.state.next_id();
        self.state.insert_group(BorrowerGroup::new(
            id,
            name,
            branch,
            payment_day.into(),
            max_members,
            actor,
            at,
        ));
        let entry = self
            .entry(AuditStream::Admin, AuditAction::GroupCreated, ctx)
            .group(id);
        self.record(entry);
        Ok(id)
    }

    pub fn deactivate_group(&mut self, ctx: &ActorContext, group: GroupId) -> EngineResult<()> {
        self.require_role(ctx, &[Role::Admin, Role::Manager], "deactivating a group")?;
        let g = self
            .state
            .group_mut(group)
            .ok_or_else(|| EngineError::not_found("group", group))?;
        if !g.is_active() {
            return Ok(());
        }
        g.deactivate();
        let entry = self
            .entry(AuditStream::Admin, AuditAction::GroupDeactivated, ctx)
            .group(group);
        self.record(entry);
        Ok(())
    }

    /// Add a borrower to a group, respecting the `max_members` invariant.
    /// Re-joining reactivates the existing membership row.
    pub fn add_group_member(
        &mut self,
        ctx: &ActorContext,
        group: GroupId,
        borrower: UserId,
    ) -> EngineResult<MembershipId> {
        let actor = self.require_staff(ctx, "adding a group member")?.id();
        let g = self
            .state
            .group(group)
            .ok_or_else(|| EngineError::not_found("group", group))?;
        if !g.is_active() {
            return Err(EngineError::Precondition(format!(
                "group {} is inactive",
                g.name()
            )));
        }
        let max_members = g.max_members();
        let user = self.require_user(borrower)?;
        if user.role() != Role::Borrower {
            return Err(EngineError::validation(
                "borrower",
                format!("{} is not a borrower", user.username()),
            ));
        }

        let existing = self.state.membership_for(borrower, group).map(|m| (m.id(), m.is_active()));
        if let Some((_, true)) = existing {
            return Err(EngineError::validation(
                "borrower",
                "already an active member of this group",
            ));
        }
        if let Some(cap) = max_members {
            let active = self.state.active_member_count(group);
            if active >= cap as usize {
                return Err(EngineError::validation(
                    "group",
                    format!("group is full ({active} of {cap} members)"),
                ));
            }
        }

        let today = self.clock.today();
        let membership_id = match existing {
            Some((id, false)) => {
                self.state
                    .membership_mut(id)
                    .expect("membership checked above")
                    .reactivate(today, actor);
                id
            }
            _ => {
                let id = self.state.next_id();
                self.state
                    .insert_membership(GroupMembership::new(id, borrower, group, today, actor));
                id
            }
        };
        let entry = self
            .entry(AuditStream::Admin, AuditAction::MemberAdded, ctx)
            .group(group)
            .user(borrower);
        self.record(entry);
        Ok(membership_id)
    }

    /// Put an officer in charge of a group, rewriting the group reference
    /// and every active member's officer back-reference atomically.
    ///
    /// Refused when the officer is at group capacity, unless the actor is an
    /// admin, in which case the override is allowed and flagged.
    pub fn assign_officer_to_group(
        &mut self,
        ctx: &ActorContext,
        group: GroupId,
        officer: UserId,
    ) -> EngineResult<GroupAssignmentOutcome> {
        let actor_role = self
            .require_role(ctx, &[Role::Admin, Role::Manager], "assigning an officer to a group")?
            .role();
        let g = self
            .state
            .group(group)
            .ok_or_else(|| EngineError::not_found("group", group))?;
        let old_officer = g.assigned_officer();
        let user = self.require_user(officer)?;
        if user.role() != Role::LoanOfficer {
            return Err(EngineError::validation(
                "officer",
                format!("{} is not a loan officer", user.username()),
            ));
        }
        let profile = self
            .state
            .officer_profile(officer)
            .ok_or_else(|| EngineError::Precondition(format!(
                "officer {officer} has no assignment profile"
            )))?;
        let max_groups = profile.max_groups() as usize;

        let managing = self.state.active_group_count(officer);
        let at_capacity = old_officer != Some(officer) && managing >= max_groups;
        let capacity_override = if at_capacity {
            if actor_role != Role::Admin {
                return Err(EngineError::Precondition(format!(
                    "officer is at group capacity ({managing} of {max_groups})"
                )));
            }
            tracing::warn!(
                officer,
                group,
                managing,
                max_groups,
                "admin override: assigning group beyond officer capacity"
            );
            true
        } else {
            false
        };

        // All checks passed; rewrite the graph.
        self.state
            .group_mut(group)
            .expect("group checked above")
            .set_assigned_officer(Some(officer));
        let members: Vec<UserId> = self
            .state
            .memberships()
            .filter(|m| m.group() == group && m.is_active())
            .map(|m| m.borrower())
            .collect();
        for member in &members {
            if let Some(u) = self.state.user_mut(*member) {
                u.set_assigned_officer(Some(officer));
            }
        }

        let entry = self
            .entry(AuditStream::OfficerTransfer, AuditAction::OfficerAssignedToGroup, ctx)
            .group(group)
            .user(officer)
            .before(json!({ "assigned_officer": old_officer }))
            .after(json!({ "assigned_officer": officer, "members_rewritten": members.len() }));
        self.record(entry);
        tracing::info!(group, officer, members = members.len(), "officer assigned to group");
        Ok(GroupAssignmentOutcome {
            group,
            officer,
            capacity_override,
        })
    }

    /// Assign a borrower to an officer's book. No admin override here.
    pub fn assign_client_to_officer(
        &mut self,
        ctx: &ActorContext,
        client: UserId,
        officer: UserId,
    ) -> EngineResult<()> {
        self.require_staff(ctx, "assigning a client")?;
        let user = self.require_user(client)?;
        if user.role() != Role::Borrower {
            return Err(EngineError::validation(
                "client",
                format!("{} is not a borrower", user.username()),
            ));
        }
        let old_officer = user.assigned_officer();
        if old_officer == Some(officer) {
            return Ok(());
        }
        let profile = self
            .state
            .officer_profile(officer)
            .ok_or_else(|| EngineError::Precondition(format!(
                "officer {officer} has no assignment profile"
            )))?;
        if !profile.accepting() {
            return Err(EngineError::Precondition(
                "officer is not accepting new clients".into(),
            ));
        }
        let max_clients = profile.max_clients() as usize;
        let carrying = self.state.active_client_count(officer);
        if carrying >= max_clients {
            return Err(EngineError::Precondition(format!(
                "officer is at client capacity ({carrying} of {max_clients})"
            )));
        }

        self.state
            .user_mut(client)
            .expect("client checked above")
            .set_assigned_officer(Some(officer));
        let action = if old_officer.is_some() {
            AuditAction::ClientReassigned
        } else {
            AuditAction::ClientAssigned
        };
        let entry = self
            .entry(AuditStream::ClientAssignment, action, ctx)
            .user(client)
            .before(json!({ "assigned_officer": old_officer }))
            .after(json!({ "assigned_officer": officer }));
        self.record(entry);
        Ok(())
    }

    /// Remove a borrower from their officer's book. No-op when unassigned.
    pub fn unassign_client(&mut self, ctx: &ActorContext, client: UserId) -> EngineResult<()> {
        self.require_staff(ctx, "unassigning a client")?;
        let user = self.require_user(client)?;
        let old_officer = match user.assigned_officer() {
            Some(o) => o,
            None => return Ok(()),
        };

        self.state
            .user_mut(client)
            .expect("client checked above")
            .set_assigned_officer(None);
        let entry = self
            .entry(AuditStream::ClientAssignment, AuditAction::ClientUnassigned, ctx)
            .user(client)
            .before(json!({ "assigned_officer": old_officer }))
            .after(json!({ "assigned_officer": null }));
        self.record(entry);
        Ok(())
    }
}
