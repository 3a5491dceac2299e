//! Loan application intake.

use rust_decimal::Decimal;
use serde_json::json;

use crate::engine::{ActorContext, LoanEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::approval::EscalationRequest;
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::loan::{Loan, LoanTerm};
use crate::models::notification::{Audience, NotificationKind};
use crate::models::{LoanId, LoanTypeId, Role};

impl LoanEngine {
    /// Submit a loan application for the acting borrower.
    ///
    /// Checks, in order: the actor is an active borrower with a verified
    /// identity document set, holds no outstanding loan, the product is
    /// active, the amount is within product bounds, and the term matches the
    /// product's cadence and bounds. On success the loan is created in
    /// `pending` with all derived amounts fixed; a principal at or above the
    /// escalation threshold additionally opens a pending escalation request.
    pub fn submit_application(
        &mut self,
        ctx: &ActorContext,
        loan_type: LoanTypeId,
        principal: Decimal,
        term: LoanTerm,
    ) -> EngineResult<LoanId> {
        let borrower = self.require_role(ctx, &[Role::Borrower], "applying for a loan")?;
        let borrower_id = borrower.id();
        let assigned_officer = borrower.assigned_officer();

        if !self.state.has_verified_identity(borrower_id) {
            return Err(EngineError::validation(
                "documents",
                "verified NRC front, NRC back, and selfie are required before applying",
            ));
        }
        if let Some(open) = self.state.outstanding_loan_for(borrower_id) {
            return Err(EngineError::validation(
                "borrower",
                format!(
                    "loan {} is still {:?}; settle it before applying again",
                    open.application_number(),
                    open.status()
                ),
            ));
        }

        let product = self
            .state
            .loan_type(loan_type)
            .ok_or_else(|| EngineError::not_found("loan type", loan_type))?;
        if !product.is_active() {
            return Err(EngineError::validation("loan_type", "product is not active"));
        }
        if principal < product.min_amount() || principal > product.max_amount() {
            return Err(EngineError::validation(
                "principal",
                format!(
                    "must be between {} and {}",
                    product.min_amount(),
                    product.max_amount()
                ),
            ));
        }
        if term.frequency() != product.frequency() {
            return Err(EngineError::validation(
                "term",
                format!(
                    "term cadence {:?} does not match product cadence {:?}",
                    term.frequency(),
                    product.frequency()
                ),
            ));
        }
        if term.length() < product.min_term() || term.length() > product.max_term() {
            return Err(EngineError::validation(
                "term",
                format!(
                    "must be between {} and {} installments",
                    product.min_term(),
                    product.max_term()
                ),
            ));
        }

        let escalate = principal >= self.config.admin_approval_threshold;
        let deposit_rate = self.config.security_deposit_rate;
        let at = self.now();
        let product = product.clone();

        let loan_id = self.state.next_id();
        let application_number = self.state.next_application_number();
        let mut loan = Loan::new(
            loan_id,
            application_number.clone(),
            borrower_id,
            &product,
            principal,
            term,
            deposit_rate,
            escalate,
            at,
        );
        loan.set_loan_officer(assigned_officer);
        self.state.insert_loan(loan);

        let entry = self
            .entry(AuditStream::Approval, AuditAction::LoanApplied, ctx)
            .loan(loan_id)
            .after(json!({
                "application_number": application_number,
                "principal": principal,
                "installments": term.length(),
            }));
        self.record(entry);

        if escalate {
            self.state
                .insert_escalation(EscalationRequest::new(loan_id, borrower_id, at));
            let entry = self
                .entry(AuditStream::Approval, AuditAction::EscalationRequested, ctx)
                .loan(loan_id)
                .reason(format!(
                    "principal {principal} meets the {} escalation threshold",
                    self.config.admin_approval_threshold
                ));
            self.record(entry);
            self.notify(
                NotificationKind::EscalationRequested,
                Audience::Staff,
                Some(loan_id),
                format!("application {application_number} requires admin approval"),
            );
        }

        tracing::info!(
            loan = loan_id,
            application = %application_number,
            %principal,
            escalated = escalate,
            "loan application submitted"
        );
        Ok(loan_id)
    }
}
