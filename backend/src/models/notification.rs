//! Notification outbox.
//!
//! Domain operations never talk to the mail/SMS gateway directly. They append
//! `Notification` rows in status `Queued` as part of their write, and the
//! host drains the outbox through a `NotificationGateway` strictly after the
//! domain mutation has returned. A delivery failure flags the row `Failed`
//! for out-of-band reconciliation; it never unwinds the domain change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{LoanId, NotificationId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LoanApproved,
    LoanRejected,
    EscalationRequested,
    EscalationDecided,
    DepositSubmitted,
    DepositVerified,
    DepositRejected,
    LoanDisbursed,
    PaymentSubmitted,
    PaymentConfirmed,
    PaymentRejected,
    MultiPaymentSubmitted,
    MultiPaymentDecided,
    LoanCompleted,
    LoanDefaulted,
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    User(UserId),
    /// Broadcast to staff dashboards/mailing list.
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    kind: NotificationKind,
    audience: Audience,
    loan: Option<LoanId>,
    message: String,
    status: DeliveryStatus,
    created_at: DateTime<Utc>,
    dispatched_at: Option<DateTime<Utc>>,
    failure: Option<String>,
}

impl Notification {
    pub fn new(
        id: NotificationId,
        kind: NotificationKind,
        audience: Audience,
        loan: Option<LoanId>,
        message: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            audience,
            loan,
            message,
            status: DeliveryStatus::Queued,
            created_at,
            dispatched_at: None,
            failure: None,
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn audience(&self) -> Audience {
        self.audience
    }

    pub fn loan(&self) -> Option<LoanId> {
        self.loan
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        self.status = DeliveryStatus::Sent;
        self.dispatched_at = Some(at);
        self.failure = None;
    }

    pub fn mark_failed(&mut self, at: DateTime<Utc>, error: String) {
        self.status = DeliveryStatus::Failed;
        self.dispatched_at = Some(at);
        self.failure = Some(error);
    }
}

/// External mail/SMS collaborator. At-least-once delivery; the engine only
/// records the outcome.
pub trait NotificationGateway {
    /// Deliver one rendered notification. An `Err` flags the row `Failed`.
    fn deliver(&mut self, notification: &Notification) -> Result<(), String>;
}
