//! Security-deposit submission and verification.
//!
//! The deposit record is opened at approval. The borrower records their
//! payment against it, staff verify or reject, and disbursement stays blocked
//! until the record is verified. The deposit is collateral; it never touches
//! the repayment ledger.

use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::engine::{ActorContext, LoanEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::notification::{Audience, NotificationKind};
use crate::models::payment::PaymentMethod;
use crate::models::{LoanId, Role};

impl LoanEngine {
    /// Record the borrower's upfront payment on the loan's deposit record.
    ///
    /// Only the loan's borrower may submit. Re-submitting replaces the prior
    /// amount and clears any earlier verification. Staff are notified to
    /// verify.
    pub fn submit_deposit(
        &mut self,
        ctx: &ActorContext,
        loan: LoanId,
        amount: Decimal,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> EngineResult<String> {
        let actor = self.require_actor(ctx)?.id();
        let l = self.require_loan(loan)?;
        if l.borrower() != actor {
            return Err(EngineError::Authorization(
                "only the loan's borrower may submit its security deposit".into(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(EngineError::validation("amount", "must be positive"));
        }
        let application_number = l.application_number().to_string();
        self.state
            .deposit(loan)
            .ok_or_else(|| EngineError::Precondition(format!(
                "loan {application_number} has no deposit record; it must be approved first"
            )))?;

        let at = self.now();
        let receipt_number = format!("RCP-{}", Uuid::new_v4().simple());
        self.state
            .deposit_mut(loan)
            .expect("deposit checked above")
            .record_payment(amount, method, reference, receipt_number.clone(), at);
        self.state
            .loan_mut(loan)
            .expect("loan checked above")
            .record_deposit_payment(amount);

        let entry = self
            .entry(AuditStream::Disbursement, AuditAction::DepositRecorded, ctx)
            .loan(loan)
            .after(json!({
                "paid_amount": amount,
                "method": method,
                "receipt_number": receipt_number,
            }));
        self.record(entry);
        self.notify(
            NotificationKind::DepositSubmitted,
            Audience::Staff,
            Some(loan),
            format!("deposit of {amount} submitted for loan {application_number}; verify it"),
        );
        tracing::info!(loan, %amount, "security deposit recorded");
        Ok(receipt_number)
    }

    /// Verify the loan's deposit record. Requires the recorded amount to
    /// cover the requirement. Idempotent.
    pub fn verify_deposit(&mut self, ctx: &ActorContext, loan: LoanId) -> EngineResult<()> {
        let verifier = self
            .require_role(ctx, &[Role::Admin, Role::Manager], "verifying a deposit")?
            .id();
        let l = self.require_loan(loan)?;
        let borrower = l.borrower();
        let application_number = l.application_number().to_string();
        let deposit = self
            .state
            .deposit(loan)
            .ok_or_else(|| EngineError::not_found("security deposit", loan))?;
        if deposit.is_verified() {
            return Ok(());
        }
        if !deposit.is_fully_paid() {
            return Err(EngineError::Precondition(format!(
                "deposit of {} covers only {} of the required {}",
                application_number,
                deposit.paid_amount(),
                deposit.required_amount()
            )));
        }
        let paid = deposit.paid_amount();

        let at = self.now();
        self.state
            .deposit_mut(loan)
            .expect("deposit checked above")
            .verify(verifier, at);
        self.state
            .loan_mut(loan)
            .expect("loan checked above")
            .set_deposit_verified(true);

        let entry = self
            .entry(AuditStream::Disbursement, AuditAction::DepositVerified, ctx)
            .loan(loan)
            .after(json!({ "verified": true, "paid_amount": paid }));
        self.record(entry);
        self.notify(
            NotificationKind::DepositVerified,
            Audience::User(borrower),
            Some(loan),
            format!("security deposit for loan {application_number} verified"),
        );
        tracing::info!(loan, verifier, "security deposit verified");
        Ok(())
    }

    /// Reject the recorded deposit payment. The recorded amount is wiped and
    /// the borrower must pay again.
    pub fn reject_deposit(
        &mut self,
        ctx: &ActorContext,
        loan: LoanId,
        reason: impl Into<String>,
    ) -> EngineResult<()> {
        self.require_role(ctx, &[Role::Admin, Role::Manager], "rejecting a deposit")?;
        let reason = reason.into();
        let l = self.require_loan(loan)?;
        let borrower = l.borrower();
        let application_number = l.application_number().to_string();
        let deposit = self
            .state
            .deposit(loan)
            .ok_or_else(|| EngineError::not_found("security deposit", loan))?;
        let old_paid = deposit.paid_amount();

        self.state
            .deposit_mut(loan)
            .expect("deposit checked above")
            .reject_payment();
        self.state
            .loan_mut(loan)
            .expect("loan checked above")
            .set_deposit_verified(false);

        let entry = self
            .entry(AuditStream::Disbursement, AuditAction::DepositRejected, ctx)
            .loan(loan)
            .reason(reason.clone())
            .before(json!({ "paid_amount": old_paid }))
            .after(json!({ "paid_amount": Decimal::ZERO, "verified": false }));
        self.record(entry);
        self.notify(
            NotificationKind::DepositRejected,
            Audience::User(borrower),
            Some(loan),
            format!("deposit payment for loan {application_number} rejected: {reason}"),
        );
        tracing::info!(loan, %reason, "security deposit rejected");
        Ok(())
    }
}
