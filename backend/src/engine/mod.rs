//! Loan engine.
//!
//! `LoanEngine` owns the ledger state, the configuration, and the clock, and
//! exposes every domain operation as a method. Operations follow one
//! discipline throughout:
//!
//! 1. Resolve and validate everything through shared borrows first.
//! 2. Mutate state only after all checks passed.
//! 3. Append the audit row(s) and queue notifications as part of the same
//!    logical write.
//!
//! An `Err` return therefore guarantees no state changed. Exclusive `&mut
//! self` access serializes all writes, which gives each loan a total order
//! of mutations without explicit row locks. Notifications queued by an
//! operation are delivered only when the host calls
//! [`LoanEngine::dispatch_notifications`], strictly after the write.

pub mod applications;
pub mod approvals;
pub mod assignment;
pub mod collections;
pub mod defaults;
pub mod deposits;
pub mod disbursement;
pub mod multi;
pub mod payments;
pub mod registry;
pub mod schedule;

pub use assignment::GroupAssignmentOutcome;
pub use collections::{BulkApprovalOutcome, CollectionScope};
pub use defaults::DefaultScanOutcome;
pub use disbursement::DisbursementOutcome;
pub use multi::MultiPaymentOutcome;
pub use payments::PaymentReceipt;
pub use schedule::{generate_installments, InstallmentSpec};

use chrono::{DateTime, Utc};

use crate::clock::EngineClock;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::audit::{AuditAction, AuditEntry, AuditStream, AuditTrail};
use crate::models::notification::{Audience, NotificationGateway, NotificationKind};
use crate::models::{DeliveryStatus, LedgerState, Loan, LoanId, Role, User, UserId};

/// Identity and request context of the acting user, carried into audit rows.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user: UserId,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ActorContext {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            source_ip: None,
            user_agent: None,
        }
    }

    pub fn with_source(mut self, ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// The core engine: ledger state plus configuration plus clock.
pub struct LoanEngine {
    state: LedgerState,
    config: EngineConfig,
    clock: EngineClock,
}

impl LoanEngine {
    pub fn new(config: EngineConfig, clock: EngineClock) -> Self {
        Self {
            state: LedgerState::new(),
            config,
            clock,
        }
    }

    /// Default configuration and the system clock.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default(), EngineClock::system())
    }

    /// Rebuild an engine from restored state (snapshot loading).
    pub(crate) fn from_parts(state: LedgerState, config: EngineConfig, clock: EngineClock) -> Self {
        Self {
            state,
            config,
            clock,
        }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut LedgerState {
        &mut self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &EngineClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut EngineClock {
        &mut self.clock
    }

    pub fn audit(&self) -> &AuditTrail {
        self.state.audit()
    }

    // ------------------------------------------------------------------
    // Shared lookups and gates
    // ------------------------------------------------------------------

    pub(crate) fn require_user(&self, id: UserId) -> EngineResult<&User> {
        self.state
            .user(id)
            .ok_or_else(|| EngineError::not_found("user", id))
    }

    /// The acting user; must exist and be active.
    pub(crate) fn require_actor(&self, ctx: &ActorContext) -> EngineResult<&User> {
        let user = self.require_user(ctx.user)?;
        if !user.is_active() {
            return Err(EngineError::Authorization(format!(
                "user {} is deactivated",
                user.username()
            )));
        }
        Ok(user)
    }

    /// The acting user, restricted to the given roles.
    pub(crate) fn require_role(
        &self,
        ctx: &ActorContext,
        allowed: &[Role],
        operation: &str,
    ) -> EngineResult<&User> {
        let user = self.require_actor(ctx)?;
        if !allowed.contains(&user.role()) {
            return Err(EngineError::Authorization(format!(
                "{operation} requires one of {allowed:?}; {} has role {:?}",
                user.username(),
                user.role()
            )));
        }
        Ok(user)
    }

    pub(crate) fn require_staff(&self, ctx: &ActorContext, operation: &str) -> EngineResult<&User> {
        self.require_role(
            ctx,
            &[Role::Admin, Role::Manager, Role::LoanOfficer],
            operation,
        )
    }

    pub(crate) fn require_loan(&self, id: LoanId) -> EngineResult<&Loan> {
        self.state
            .loan(id)
            .ok_or_else(|| EngineError::not_found("loan", id))
    }

    // ------------------------------------------------------------------
    // Audit and notifications
    // ------------------------------------------------------------------

    /// Start an audit entry carrying the actor and request source.
    pub(crate) fn entry(
        &self,
        stream: AuditStream,
        action: AuditAction,
        ctx: &ActorContext,
    ) -> AuditEntry {
        AuditEntry::new(stream, action)
            .actor(ctx.user)
            .source(ctx.source_ip.clone(), ctx.user_agent.clone())
    }

    /// Audit entry with no acting user (batch jobs, provisioning).
    pub(crate) fn system_entry(&self, stream: AuditStream, action: AuditAction) -> AuditEntry {
        AuditEntry::new(stream, action)
    }

    /// Append an audit row at the current instant.
    pub(crate) fn record(&mut self, entry: AuditEntry) {
        let at = self.clock.now();
        self.state.audit_mut().append(entry, at);
    }

    /// Queue a notification row for post-commit dispatch.
    pub(crate) fn notify(
        &mut self,
        kind: NotificationKind,
        audience: Audience,
        loan: Option<LoanId>,
        message: String,
    ) {
        let at = self.clock.now();
        self.state.queue_notification(kind, audience, loan, message, at);
    }

    /// Deliver queued notifications through the gateway. Runs strictly after
    /// domain writes; a gateway failure flags the row and is never raised.
    /// Returns the number of rows attempted.
    pub fn dispatch_notifications(&mut self, gateway: &mut dyn NotificationGateway) -> usize {
        let now = self.clock.now();
        let mut attempted = 0;
        for notification in self.state.notifications_mut() {
            if notification.status() != DeliveryStatus::Queued {
                continue;
            }
            attempted += 1;
            match gateway.deliver(notification) {
                Ok(()) => notification.mark_sent(now),
                Err(error) => {
                    tracing::warn!(
                        notification = notification.id(),
                        %error,
                        "notification delivery failed; flagged for reconciliation"
                    );
                    notification.mark_failed(now, error);
                }
            }
        }
        attempted
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
