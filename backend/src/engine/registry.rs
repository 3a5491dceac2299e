//! Registry operations: users, branches, loan products, KYC documents.

use rust_decimal::Decimal;
use serde_json::json;

use crate::engine::{ActorContext, LoanEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::document::{BorrowerDocument, DocumentKind};
use crate::models::loan::{LoanType, RepaymentFrequency};
use crate::models::user::{Branch, Role, User};
use crate::models::{BranchId, DocumentId, LoanTypeId, UserId};

impl LoanEngine {
    /// Provision a user. Called by the auth collaborator; usernames are
    /// unique.
    pub fn register_user(
        &mut self,
        username: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
    ) -> EngineResult<UserId> {
        let username = username.into();
        let full_name = full_name.into();
        if username.trim().is_empty() {
            return Err(EngineError::validation("username", "must not be empty"));
        }
        if self.state.user_by_username(&username).is_some() {
            return Err(EngineError::Integrity(format!(
                "username {username} is already taken"
            )));
        }

        let at = self.now();
        let id = self.state.next_id();
        self.state.insert_user(User::new(id, username, full_name, role, at));
        let entry = self
            .system_entry(AuditStream::Admin, AuditAction::UserRegistered)
            .user(id)
            .after(json!({ "role": role }));
        self.record(entry);
        Ok(id)
    }

    /// Provision a user arriving through social login: lands as an active,
    /// verified borrower.
    pub fn register_social_user(
        &mut self,
        username: impl Into<String>,
        full_name: impl Into<String>,
    ) -> EngineResult<UserId> {
        let id = self.register_user(username, full_name, Role::Borrower)?;
        self.state
            .user_mut(id)
            .expect("user inserted above")
            .mark_verified();
        Ok(id)
    }

    /// Change a user's role. Admin only; the change is audited with
    /// before/after snapshots.
    pub fn set_role(&mut self, ctx: &ActorContext, user: UserId, role: Role) -> EngineResult<()> {
        self.require_role(ctx, &[Role::Admin], "changing a role")?;
        let old_role = self.require_user(user)?.role();
        if old_role == role {
            return Ok(());
        }

        self.state
            .user_mut(user)
            .expect("user checked above")
            .set_role(role);
        let entry = self
            .entry(AuditStream::Admin, AuditAction::RoleChanged, ctx)
            .user(user)
            .before(json!({ "role": old_role }))
            .after(json!({ "role": role }));
        self.record(entry);
        tracing::info!(user, ?old_role, ?role, "role changed");
        Ok(())
    }

    /// Grant the explicit group-creation permission to a user.
    pub fn grant_group_creation(&mut self, ctx: &ActorContext, user: UserId) -> EngineResult<()> {
        self.require_role(ctx, &[Role::Admin], "granting group creation")?;
        self.require_user(user)?;
        self.state
            .user_mut(user)
            .expect("user checked above")
            .grant_group_creation();
        Ok(())
    }

    pub fn create_branch(
        &mut self,
        ctx: &ActorContext,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> EngineResult<BranchId> {
        self.require_role(ctx, &[Role::Admin, Role::Manager], "creating a branch")?;
        let name = name.into();
        if self.state.branch_by_name(&name).is_some() {
            return Err(EngineError::validation(
                "name",
                format!("branch {name} already exists"),
            ));
        }

        let id = self.state.next_id();
        self.state.insert_branch(Branch::new(id, name, code.into()));
        let entry = self.entry(AuditStream::Admin, AuditAction::BranchCreated, ctx);
        self.record(entry);
        Ok(id)
    }

    /// Put a manager in charge of a branch. One manager per branch.
    pub fn set_branch_manager(
        &mut self,
        ctx: &ActorContext,
        branch: BranchId,
        manager: UserId,
    ) -> EngineResult<()> {
        self.require_role(ctx, &[Role::Admin], "assigning a branch manager")?;
        let user = self.require_user(manager)?;
        if user.role() != Role::Manager {
            return Err(EngineError::validation(
                "manager",
                format!("{} is not a manager", user.username()),
            ));
        }
        self.state
            .branch_mut(branch)
            .ok_or_else(|| EngineError::not_found("branch", branch))?
            .set_manager(Some(manager));
        Ok(())
    }

    /// Remove a branch. References in groups and officer profiles are
    /// nulled, never cascaded.
    pub fn remove_branch(&mut self, ctx: &ActorContext, branch: BranchId) -> EngineResult<()> {
        self.require_role(ctx, &[Role::Admin], "removing a branch")?;
        if self
            .state
            .remove_branch(branch)
            .is_none()
        {
            return Err(EngineError::not_found("branch", branch));
        }
        let entry = self.entry(AuditStream::Admin, AuditAction::BranchRemoved, ctx);
        self.record(entry);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_loan_type(
        &mut self,
        ctx: &ActorContext,
        name: impl Into<String>,
        interest_rate: Decimal,
        min_amount: Decimal,
        max_amount: Decimal,
        frequency: RepaymentFrequency,
        min_term: u32,
        max_term: u32,
    ) -> EngineResult<LoanTypeId> {
        self.require_role(ctx, &[Role::Admin, Role::Manager], "creating a loan product")?;
        if interest_rate < Decimal::ZERO {
            return Err(EngineError::validation("interest_rate", "must not be negative"));
        }
        if min_amount <= Decimal::ZERO || max_amount < min_amount {
            return Err(EngineError::validation(
                "amount_bounds",
                "need 0 < min_amount <= max_amount",
            ));
        }
        if min_term == 0 || max_term < min_term {
            return Err(EngineError::validation(
                "term_bounds",
                "need 1 <= min_term <= max_term",
            ));
        }

        let id = self.state.next_id();
        self.state.insert_loan_type(LoanType::new(
            id,
            name.into(),
            interest_rate,
            min_amount,
            max_amount,
            frequency,
            min_term,
            max_term,
        ));
        let entry = self.entry(AuditStream::Admin, AuditAction::LoanTypeCreated, ctx);
        self.record(entry);
        Ok(id)
    }

    /// Record an uploaded document. The binary lives with the external file
    /// store; only the path reference is kept. Size and extension are
    /// validated against the configured limits.
    pub fn upload_document(
        &mut self,
        ctx: &ActorContext,
        owner: UserId,
        kind: DocumentKind,
        file_path: impl Into<String>,
        file_size_bytes: u64,
    ) -> EngineResult<DocumentId> {
        let actor = self.require_actor(ctx)?;
        if actor.id() != owner && !actor.role().is_staff() {
            return Err(EngineError::Authorization(
                "only the owner or staff may upload documents".into(),
            ));
        }
        let owner_user = self.require_user(owner)?;
        if owner_user.role() != Role::Borrower {
            return Err(EngineError::validation("owner", "documents belong to borrowers"));
        }
        if file_size_bytes > self.config.file_size_limit_bytes() {
            return Err(EngineError::validation(
                "file_size",
                format!("exceeds the {} MB upload limit", self.config.file_size_limit_mb),
            ));
        }
        let file_path = file_path.into();
        let extension = file_path
            .rsplit('.')
            .next()
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !kind.allowed_extensions().contains(&extension.as_str()) {
            return Err(EngineError::validation(
                "file_path",
                format!(
                    "extension .{extension} not allowed for {kind:?}; allowed: {:?}",
                    kind.allowed_extensions()
                ),
            ));
        }

        let at = self.now();
        let id = self.state.next_id();
        self.state.insert_document(BorrowerDocument::new(
            id,
            owner,
            kind,
            file_path,
            file_size_bytes,
            at,
        ));
        let entry = self
            .entry(AuditStream::Admin, AuditAction::DocumentUploaded, ctx)
            .user(owner);
        self.record(entry);
        Ok(id)
    }

    /// Mark a document verified. Idempotent.
    pub fn verify_document(&mut self, ctx: &ActorContext, document: DocumentId) -> EngineResult<()> {
        let verifier = self
            .require_role(ctx, &[Role::Admin, Role::Manager], "verifying a document")?
            .id();
        let doc = self
            .state
            .document(document)
            .ok_or_else(|| EngineError::not_found("document", document))?;
        if doc.is_verified() {
            return Ok(());
        }
        let owner = doc.owner();

        self.state
            .document_mut(document)
            .expect("document checked above")
            .verify(verifier);
        let entry = self
            .entry(AuditStream::Admin, AuditAction::DocumentVerified, ctx)
            .user(owner);
        self.record(entry);
        Ok(())
    }
}
