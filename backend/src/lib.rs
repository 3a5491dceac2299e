//! LendVault Core - Loan Lifecycle and Ledger Engine
//!
//! The core of a group-lending microfinance platform: loan applications,
//! role-gated approval with amount-threshold escalation, 10% security
//! deposits, installment schedule generation, payment application with a
//! parallel collection ledger, and an append-only audit trail.
//!
//! # Architecture
//!
//! - **models**: Durable domain types (User, Loan, PaymentSchedule, ...)
//!   plus the `LedgerState` that owns them
//! - **engine**: `LoanEngine`, every domain operation as a method
//! - **authz**: Role-scoped visibility filters applied to all reads
//! - **reports**: Portfolio and collection-day read models
//! - **snapshot**: Whole-state save/load with config-hash validation
//! - **clock**: Deterministic, explicitly-advanced time source
//!
//! # Critical Invariants
//!
//! 1. All money values are `Decimal` with two fractional digits, rounded
//!    half-to-even
//! 2. An `Err` from an engine operation means no state changed
//! 3. The audit trail only grows, and its hash chain proves it
//! 4. Notifications dispatch strictly after the domain write

// Module declarations
pub mod authz;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod money;
pub mod reports;
pub mod snapshot;

// Re-exports for convenience
pub use clock::EngineClock;
pub use config::EngineConfig;
pub use engine::{
    ActorContext, BulkApprovalOutcome, CollectionScope, DefaultScanOutcome, DisbursementOutcome,
    LoanEngine, MultiPaymentOutcome, PaymentReceipt,
};
pub use error::{EngineError, EngineResult};
pub use models::{
    AuditAction, AuditRecord, AuditStream, AuditTrail, Loan, LoanStatus, LoanTerm, LoanType,
    NotificationGateway, PaymentMethod, PaymentStatus, RepaymentFrequency, Role, User,
};
pub use reports::{collection_day_sheet, portfolio_summary, CollectionDaySheet, PortfolioSummary};
pub use snapshot::{compute_config_hash, load_snapshot, save_snapshot, EngineSnapshot};
