//! Disbursement, schedule generation, and activation.
//!
//! Disbursement is the one transition that fans out: it stamps the
//! disbursement and maturity dates, materializes the installment schedule and
//! its mirrored collection calendar, and advances the loan straight to
//! `active`. All of it happens in one engine call, so the schedule and
//! collection ledgers can only ever be observed together.

use chrono::NaiveDate;
use serde_json::json;

use crate::engine::schedule::generate_installments;
use crate::engine::{ActorContext, LoanEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::approval::EscalationStatus;
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::collection::PaymentCollection;
use crate::models::loan::LoanStatus;
use crate::models::notification::{Audience, NotificationKind};
use crate::models::schedule::PaymentSchedule;
use crate::models::{LoanId, Role};

/// What disbursement produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisbursementOutcome {
    pub loan: LoanId,
    pub installments: usize,
    pub first_due: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
}

impl LoanEngine {
    /// Disburse an approved loan. Manager only.
    ///
    /// Refused until the security deposit is verified and, for high-value
    /// loans, the admin escalation is approved. Re-disbursing an already
    /// active loan is an idempotent no-op; a completed loan cannot be
    /// disbursed.
    pub fn disburse_loan(
        &mut self,
        ctx: &ActorContext,
        loan: LoanId,
    ) -> EngineResult<DisbursementOutcome> {
        self.require_role(ctx, &[Role::Manager], "disbursing a loan")?;
        let l = self.require_loan(loan)?;
        match l.status() {
            LoanStatus::Approved => {}
            LoanStatus::Active => {
                return Ok(DisbursementOutcome {
                    loan,
                    installments: self.state.schedules_for_loan(loan).len(),
                    first_due: self
                        .state
                        .schedules_for_loan(loan)
                        .first()
                        .map(|s| s.due_date()),
                    maturity_date: l.maturity_date(),
                });
            }
            status => {
                return Err(EngineError::Precondition(format!(
                    "loan {} is {status:?}, not approved",
                    l.application_number()
                )))
            }
        }

        let application_number = l.application_number().to_string();
        let borrower = l.borrower();
        let deposit = self
            .state
            .deposit(loan)
            .ok_or_else(|| EngineError::not_found("security deposit", loan))?;
        if !deposit.is_verified() {
            return Err(EngineError::Precondition(format!(
                "security deposit for loan {application_number} is not verified"
            )));
        }
        if l.manager_approval_required() {
            let request = self
                .state
                .escalation(loan)
                .ok_or_else(|| EngineError::not_found("escalation request", loan))?;
            if request.status() != EscalationStatus::Approved {
                return Err(EngineError::Precondition(format!(
                    "admin approval required: escalation request for loan \
                     {application_number} is {:?}",
                    request.status()
                )));
            }
        }

        let today = self.clock.today();
        let l = self.state.loan_mut(loan).expect("loan checked above");
        l.mark_disbursed(today)
            .map_err(|e| EngineError::Precondition(e.to_string()))?;
        let term = l.term();
        let payment_amount = l.payment_amount();
        let total_amount = l.total_amount();
        let maturity_date = l.maturity_date();

        // Defensive: drop any stale rows before regenerating.
        self.state.clear_schedules_for_loan(loan);
        self.state.clear_collections_for_loan(loan);

        let specs = generate_installments(today, term, payment_amount, total_amount);
        let installments = specs.len();
        let first_due = specs.first().map(|s| s.due_date);
        for spec in &specs {
            let schedule_id = self.state.next_id();
            self.state.insert_schedule(PaymentSchedule::new(
                schedule_id,
                loan,
                spec.installment_number,
                spec.due_date,
                spec.amount,
            ));
            let collection_id = self.state.next_id();
            self.state.insert_collection(PaymentCollection::new(
                collection_id,
                loan,
                spec.due_date,
                spec.amount,
            ));
        }

        self.state
            .loan_mut(loan)
            .expect("loan checked above")
            .activate()
            .map_err(|e| EngineError::Precondition(e.to_string()))?;

        let entry = self
            .entry(AuditStream::Disbursement, AuditAction::LoanDisbursed, ctx)
            .loan(loan)
            .user(borrower)
            .after(json!({
                "disbursement_date": today,
                "maturity_date": maturity_date,
            }));
        self.record(entry);
        let entry = self
            .entry(AuditStream::Disbursement, AuditAction::ScheduleGenerated, ctx)
            .loan(loan)
            .after(json!({
                "installments": installments,
                "first_due": first_due,
            }));
        self.record(entry);
        self.notify(
            NotificationKind::LoanDisbursed,
            Audience::User(borrower),
            Some(loan),
            format!(
                "loan {application_number} disbursed; {installments} installments of \
                 {payment_amount} begin {}",
                first_due.map(|d| d.to_string()).unwrap_or_default()
            ),
        );
        tracing::info!(loan, installments, "loan disbursed and activated");
        Ok(DisbursementOutcome {
            loan,
            installments,
            first_due,
            maturity_date,
        })
    }
}
