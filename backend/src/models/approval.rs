//! Admin escalation requests for high-value loans.
//!
//! Created automatically when an application's principal meets the
//! escalation threshold. Disbursement stays blocked until an admin approves
//! the request, independent of officer approval. An admin rejection leaves
//! the loan itself in `approved`; the borrower may appeal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{LoanId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EscalationError {
    #[error("escalation request already decided: {status:?}")]
    AlreadyDecided { status: EscalationStatus },
}

/// A pending admin decision on a high-value loan (1:1 with the loan).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRequest {
    loan: LoanId,
    status: EscalationStatus,
    requested_by: UserId,
    requested_at: DateTime<Utc>,
    decided_by: Option<UserId>,
    decided_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl EscalationRequest {
    pub fn new(loan: LoanId, requested_by: UserId, requested_at: DateTime<Utc>) -> Self {
        Self {
            loan,
            status: EscalationStatus::Pending,
            requested_by,
            requested_at,
            decided_by: None,
            decided_at: None,
            notes: None,
        }
    }

    pub fn loan(&self) -> LoanId {
        self.loan
    }

    pub fn status(&self) -> EscalationStatus {
        self.status
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn decided_by(&self) -> Option<UserId> {
        self.decided_by
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn approve(
        &mut self,
        by: UserId,
        at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<(), EscalationError> {
        self.decide(EscalationStatus::Approved, by, at, notes)
    }

    pub fn reject(
        &mut self,
        by: UserId,
        at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<(), EscalationError> {
        self.decide(EscalationStatus::Rejected, by, at, notes)
    }

    fn decide(
        &mut self,
        status: EscalationStatus,
        by: UserId,
        at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<(), EscalationError> {
        if self.status != EscalationStatus::Pending {
            return Err(EscalationError::AlreadyDecided {
                status: self.status,
            });
        }
        self.status = status;
        self.decided_by = Some(by);
        self.decided_at = Some(at);
        self.notes = notes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decide_once() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
        let mut request = EscalationRequest::new(7, 1, at);
        request.approve(9, at, None).unwrap();
        assert_eq!(request.status(), EscalationStatus::Approved);

        let err = request.reject(9, at, None).unwrap_err();
        assert_eq!(
            err,
            EscalationError::AlreadyDecided {
                status: EscalationStatus::Approved
            }
        );
    }
}
