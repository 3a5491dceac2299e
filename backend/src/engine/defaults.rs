//! Default-detection batch scan.
//!
//! Run by the external batch scheduler. Walks every active loan, applies
//! completion detection first, then defaults any loan whose oldest unpaid
//! installment has been overdue for at least the configured threshold.

use serde_json::json;

use crate::engine::LoanEngine;
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::loan::LoanStatus;
use crate::models::notification::{Audience, NotificationKind};
use crate::models::LoanId;

/// Tally of one default-scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultScanOutcome {
    pub scanned: usize,
    pub completed: usize,
    pub defaulted: usize,
}

impl LoanEngine {
    /// Scan active loans for completion and default.
    ///
    /// Completion takes precedence: a loan that satisfies both conditions on
    /// the same run is completed, never defaulted.
    pub fn run_default_scan(&mut self) -> DefaultScanOutcome {
        let today = self.clock.today();
        let threshold = self.config.default_threshold_days;
        let active: Vec<LoanId> = self
            .state
            .loans()
            .filter(|l| l.status() == LoanStatus::Active)
            .map(|l| l.id())
            .collect();

        let mut outcome = DefaultScanOutcome {
            scanned: active.len(),
            ..Default::default()
        };
        for loan in active {
            if self.finalize_if_complete(loan, None) {
                outcome.completed += 1;
                continue;
            }

            let oldest_overdue = self
                .state
                .schedules_for_loan(loan)
                .iter()
                .filter(|s| s.is_overdue(today))
                .map(|s| (s.id(), s.due_date()))
                .next();
            let (schedule_id, due_date) = match oldest_overdue {
                Some(found) => found,
                None => continue,
            };
            let days_overdue = (today - due_date).num_days();
            if days_overdue < threshold {
                continue;
            }

            let at = self.now();
            let l = self.state.loan_mut(loan).expect("id from the active set");
            let borrower = l.borrower();
            let application_number = l.application_number().to_string();
            l.mark_defaulted(at).expect("loan is active");
            if let Some(collection_id) = self.state.collection_id_for(loan, due_date) {
                self.state
                    .collection_mut(collection_id)
                    .expect("row looked up above")
                    .mark_default();
            }

            let entry = self
                .system_entry(AuditStream::Collection, AuditAction::LoanDefaulted)
                .loan(loan)
                .user(borrower)
                .reason(format!(
                    "installment due {due_date} unpaid for {days_overdue} days \
                     (threshold {threshold})"
                ))
                .after(json!({ "status": LoanStatus::Defaulted, "schedule": schedule_id }));
            self.record(entry);
            self.notify(
                NotificationKind::LoanDefaulted,
                Audience::Staff,
                Some(loan),
                format!("loan {application_number} defaulted; oldest arrears {days_overdue} days"),
            );
            tracing::warn!(loan, days_overdue, "loan defaulted");
            outcome.defaulted += 1;
        }

        tracing::info!(
            scanned = outcome.scanned,
            completed = outcome.completed,
            defaulted = outcome.defaulted,
            "default scan finished"
        );
        outcome
    }
}
