//! Engine configuration.
//!
//! Process-wide and read-only after init. Defaults match the platform's
//! production settings; tests override individual knobs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Tunables for the loan engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Principal at or above this amount requires an admin escalation
    /// decision before disbursement.
    pub admin_approval_threshold: Decimal,

    /// Fraction of principal required as an upfront security deposit.
    pub security_deposit_rate: Decimal,

    /// Active-group count a loan officer needs before they may approve loans.
    pub min_groups_for_approval: u32,

    /// Days an unpaid installment must lag before the default scan marks the
    /// loan defaulted.
    pub default_threshold_days: i64,

    /// Upload cap for borrower documents, in megabytes.
    pub file_size_limit_mb: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admin_approval_threshold: dec!(6000),
            security_deposit_rate: dec!(0.10),
            min_groups_for_approval: 15,
            default_threshold_days: 90,
            file_size_limit_mb: 10,
        }
    }
}

impl EngineConfig {
    /// Document upload cap in bytes.
    pub fn file_size_limit_bytes(&self) -> u64 {
        self.file_size_limit_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.admin_approval_threshold, dec!(6000));
        assert_eq!(config.security_deposit_rate, dec!(0.10));
        assert_eq!(config.min_groups_for_approval, 15);
        assert_eq!(config.default_threshold_days, 90);
        assert_eq!(config.file_size_limit_bytes(), 10 * 1024 * 1024);
    }
}
