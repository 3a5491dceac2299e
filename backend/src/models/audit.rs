//! Append-only audit trail.
//!
//! Every state-changing engine operation appends exactly one record (bulk
//! operations append one per affected row) before it returns. The trail
//! exposes no update or delete API; immutability is additionally checkable
//! through the hash chain: each record's hash covers the previous record's
//! hash plus the record's own content, so any post-hoc edit breaks
//! `verify_chain`.
//!
//! Records carry the actor, the affected entity ids, a free-text reason,
//! optional before/after JSON snapshots, and the request's source ip and
//! user agent when the delivery layer supplied them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{GroupId, LoanId, UserId};

/// Which audit log family a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStream {
    Approval,
    Disbursement,
    Collection,
    ClientAssignment,
    OfficerTransfer,
    Admin,
}

/// Action kind recorded by an audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserRegistered,
    RoleChanged,
    BranchCreated,
    BranchRemoved,
    LoanTypeCreated,
    DocumentUploaded,
    DocumentVerified,
    GroupCreated,
    GroupDeactivated,
    MemberAdded,
    OfficerProfileCreated,
    OfficerAssignedToGroup,
    ClientAssigned,
    ClientReassigned,
    ClientUnassigned,
    LoanApplied,
    EscalationRequested,
    EscalationApproved,
    EscalationRejected,
    LoanApproved,
    LoanRejected,
    DepositRecorded,
    DepositVerified,
    DepositRejected,
    LoanDisbursed,
    ScheduleGenerated,
    PaymentSubmitted,
    PaymentConfirmed,
    PaymentRejected,
    MultiPaymentSubmitted,
    MultiPaymentApproved,
    MultiPaymentRejected,
    CollectionRecorded,
    CollectionApproved,
    LoanCompleted,
    LoanDefaulted,
}

/// Input for one audit row, assembled by the operation that emits it.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    stream: AuditStream,
    action: AuditAction,
    actor: Option<UserId>,
    loan: Option<LoanId>,
    user: Option<UserId>,
    group: Option<GroupId>,
    reason: Option<String>,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
    source_ip: Option<String>,
    user_agent: Option<String>,
}

impl AuditEntry {
    pub fn new(stream: AuditStream, action: AuditAction) -> Self {
        Self {
            stream,
            action,
            actor: None,
            loan: None,
            user: None,
            group: None,
            reason: None,
            before: None,
            after: None,
            source_ip: None,
            user_agent: None,
        }
    }

    pub fn actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn loan(mut self, loan: LoanId) -> Self {
        self.loan = Some(loan);
        self
    }

    pub fn user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    pub fn group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn before(mut self, before: serde_json::Value) -> Self {
        self.before = Some(before);
        self
    }

    pub fn after(mut self, after: serde_json::Value) -> Self {
        self.after = Some(after);
        self
    }

    pub fn source(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.source_ip = ip;
        self.user_agent = user_agent;
        self
    }
}

/// A committed audit row. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    seq: u64,
    stream: AuditStream,
    action: AuditAction,
    actor: Option<UserId>,
    loan: Option<LoanId>,
    user: Option<UserId>,
    group: Option<GroupId>,
    reason: Option<String>,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
    source_ip: Option<String>,
    user_agent: Option<String>,
    at: DateTime<Utc>,
    /// sha256 over the previous record's hash plus this record's content.
    hash: String,
}

impl AuditRecord {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn stream(&self) -> AuditStream {
        self.stream
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn actor(&self) -> Option<UserId> {
        self.actor
    }

    pub fn loan(&self) -> Option<LoanId> {
        self.loan
    }

    pub fn user(&self) -> Option<UserId> {
        self.user
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn before(&self) -> Option<&serde_json::Value> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&serde_json::Value> {
        self.after.as_ref()
    }

    pub fn source_ip(&self) -> Option<&str> {
        self.source_ip.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    fn content_json(&self) -> String {
        let mut unsealed = self.clone();
        unsealed.hash = String::new();
        serde_json::to_string(&unsealed).expect("audit record serializes")
    }
}

/// The append-only log of audit records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    records: Vec<AuditRecord>,
    head: String,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seal and append a record. Returns a reference to the committed row.
    pub fn append(&mut self, entry: AuditEntry, at: DateTime<Utc>) -> &AuditRecord {
        let mut record = AuditRecord {
            seq: self.records.len() as u64 + 1,
            stream: entry.stream,
            action: entry.action,
            actor: entry.actor,
            loan: entry.loan,
            user: entry.user,
            group: entry.group,
            reason: entry.reason,
            before: entry.before,
            after: entry.after,
            source_ip: entry.source_ip,
            user_agent: entry.user_agent,
            at,
            hash: String::new(),
        };
        record.hash = chain_hash(&self.head, &record.content_json());
        self.head = record.hash.clone();
        self.records.push(record);
        self.records.last().expect("just pushed")
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    pub fn for_loan(&self, loan: LoanId) -> Vec<&AuditRecord> {
        self.records.iter().filter(|r| r.loan == Some(loan)).collect()
    }

    pub fn for_actor(&self, actor: UserId) -> Vec<&AuditRecord> {
        self.records
            .iter()
            .filter(|r| r.actor == Some(actor))
            .collect()
    }

    pub fn with_action(&self, action: AuditAction) -> Vec<&AuditRecord> {
        self.records.iter().filter(|r| r.action == action).collect()
    }

    pub fn in_stream(&self, stream: AuditStream) -> Vec<&AuditRecord> {
        self.records.iter().filter(|r| r.stream == stream).collect()
    }

    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&AuditRecord> {
        self.records
            .iter()
            .filter(|r| r.at >= from && r.at <= to)
            .collect()
    }

    /// Recompute the whole chain and compare. False means a record was
    /// altered after it was appended.
    pub fn verify_chain(&self) -> bool {
        let mut prev = String::new();
        for record in &self.records {
            let expected = chain_hash(&prev, &record.content_json());
            if record.hash != expected {
                return false;
            }
            prev = record.hash.clone();
        }
        prev == self.head
    }
}

fn chain_hash(prev: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev.as_bytes());
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
