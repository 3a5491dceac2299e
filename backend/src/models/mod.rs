//! Domain models for the loan engine.
//!
//! Entities are identified by opaque `u64` ids allocated by `LedgerState`.
//! Human-facing identifiers (application numbers `LV-000001`, payment numbers
//! `PAY-000001`) are formatted sequence values, distinct from the ids.

pub mod approval;
pub mod audit;
pub mod collection;
pub mod deposit;
pub mod document;
pub mod group;
pub mod loan;
pub mod notification;
pub mod payment;
pub mod schedule;
pub mod state;
pub mod user;

pub type UserId = u64;
pub type BranchId = u64;
pub type GroupId = u64;
pub type MembershipId = u64;
pub type DocumentId = u64;
pub type LoanTypeId = u64;
pub type LoanId = u64;
pub type ScheduleId = u64;
pub type PaymentId = u64;
pub type MultiPaymentId = u64;
pub type CollectionId = u64;
pub type NotificationId = u64;

// Re-exports
pub use approval::{EscalationError, EscalationRequest, EscalationStatus};
pub use audit::{AuditAction, AuditEntry, AuditRecord, AuditStream, AuditTrail};
pub use collection::{CollectionError, CollectionStatus, PaymentCollection};
pub use deposit::SecurityDeposit;
pub use document::{BorrowerDocument, DocumentKind};
pub use group::{BorrowerGroup, GroupMembership};
pub use loan::{
    Loan, LoanError, LoanStatus, LoanTerm, LoanType, RepaymentFrequency,
};
pub use notification::{
    Audience, DeliveryStatus, Notification, NotificationGateway, NotificationKind,
};
pub use payment::{
    MultiPaymentError, MultiPaymentStatus, MultiSchedulePayment, Payment, PaymentError,
    PaymentMethod, PaymentStatus, ScheduleAllocation,
};
pub use schedule::{PaymentSchedule, ScheduleError};
pub use state::LedgerState;
pub use user::{Branch, OfficerAssignment, Role, User};
