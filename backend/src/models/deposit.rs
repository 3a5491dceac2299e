//! Security deposits (upfront payments).
//!
//! One record per loan, created at approval with `required_amount` fixed to
//! the configured fraction of principal. The deposit is collateral: it is
//! tracked separately from the repayment ledger and never reduces
//! `balance_remaining`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::payment::PaymentMethod;
use crate::models::{LoanId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityDeposit {
    loan: LoanId,
    required_amount: Decimal,
    paid_amount: Decimal,
    payment_date: Option<DateTime<Utc>>,
    method: Option<PaymentMethod>,
    reference: Option<String>,
    verified: bool,
    verified_by: Option<UserId>,
    verification_date: Option<DateTime<Utc>>,
    receipt_number: Option<String>,
}

impl SecurityDeposit {
    pub fn new(loan: LoanId, required_amount: Decimal) -> Self {
        Self {
            loan,
            required_amount,
            paid_amount: Decimal::ZERO,
            payment_date: None,
            method: None,
            reference: None,
            verified: false,
            verified_by: None,
            verification_date: None,
            receipt_number: None,
        }
    }

    pub fn loan(&self) -> LoanId {
        self.loan
    }

    pub fn required_amount(&self) -> Decimal {
        self.required_amount
    }

    pub fn paid_amount(&self) -> Decimal {
        self.paid_amount
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        self.payment_date
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn verified_by(&self) -> Option<UserId> {
        self.verified_by
    }

    pub fn receipt_number(&self) -> Option<&str> {
        self.receipt_number.as_deref()
    }

    pub fn is_fully_paid(&self) -> bool {
        self.paid_amount >= self.required_amount
    }

    /// Record a borrower's deposit payment. Re-submitting replaces the prior
    /// amount and clears any earlier verification.
    pub fn record_payment(
        &mut self,
        amount: Decimal,
        method: PaymentMethod,
        reference: Option<String>,
        receipt_number: String,
        at: DateTime<Utc>,
    ) {
        self.paid_amount = amount;
        self.method = Some(method);
        self.reference = reference;
        self.receipt_number = Some(receipt_number);
        self.payment_date = Some(at);
        self.verified = false;
        self.verified_by = None;
        self.verification_date = None;
    }

    pub fn verify(&mut self, by: UserId, at: DateTime<Utc>) {
        self.verified = true;
        self.verified_by = Some(by);
        self.verification_date = Some(at);
    }

    /// Rejection wipes the recorded payment; the borrower must pay again.
    pub fn reject_payment(&mut self) {
        self.paid_amount = Decimal::ZERO;
        self.verified = false;
        self.verified_by = None;
        self.verification_date = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_then_reject_resets() {
        let at = Utc.with_ymd_and_hms(2026, 1, 10, 11, 0, 0).unwrap();
        let mut deposit = SecurityDeposit::new(3, dec!(500.00));
        assert!(!deposit.is_fully_paid());

        deposit.record_payment(
            dec!(500.00),
            PaymentMethod::MobileMoney,
            Some("MM-123".into()),
            "RCP-1".into(),
            at,
        );
        assert!(deposit.is_fully_paid());
        assert!(!deposit.is_verified());

        deposit.verify(9, at);
        assert!(deposit.is_verified());

        deposit.reject_payment();
        assert_eq!(deposit.paid_amount(), Decimal::ZERO);
        assert!(!deposit.is_verified());
    }
}
