//! Save/load of complete engine state.
//!
//! The persistence seam for the out-of-scope storage layer: the whole
//! `LedgerState` plus the clock serializes to JSON together with a SHA-256
//! hash of the configuration. Loading refuses a snapshot whose config hash
//! differs from the config it is being restored under, so a ledger can never
//! silently resume with different thresholds than it was written with.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::clock::EngineClock;
use crate::config::EngineConfig;
use crate::engine::LoanEngine;
use crate::error::{EngineError, EngineResult};
use crate::models::LedgerState;

/// Complete engine snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: LedgerState,
    pub clock: EngineClock,
    /// SHA-256 over the canonical JSON of the config the state was written
    /// under.
    pub config_hash: String,
}

/// Deterministic SHA-256 hash of a config.
///
/// Canonical JSON with recursively sorted keys, so the hash does not depend
/// on serialization order.
pub fn compute_config_hash(config: &EngineConfig) -> EngineResult<String> {
    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let canonical = canonicalize(serde_json::to_value(config)?);
    let json = serde_json::to_string(&canonical)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Serialize the engine's full state to a JSON snapshot.
pub fn save_snapshot(engine: &LoanEngine) -> EngineResult<String> {
    let snapshot = EngineSnapshot {
        state: engine.state().clone(),
        clock: engine.clock().clone(),
        config_hash: compute_config_hash(engine.config())?,
    };
    Ok(serde_json::to_string(&snapshot)?)
}

/// Restore an engine from a JSON snapshot under `config`.
///
/// Refuses a snapshot written under a different config; the audit hash chain
/// is re-verified so a tampered snapshot is rejected too.
pub fn load_snapshot(json: &str, config: EngineConfig) -> EngineResult<LoanEngine> {
    let snapshot: EngineSnapshot = serde_json::from_str(json)?;
    let expected = compute_config_hash(&config)?;
    if snapshot.config_hash != expected {
        return Err(EngineError::Precondition(format!(
            "snapshot was written under a different config \
             (hash {}, expected {expected})",
            snapshot.config_hash
        )));
    }
    if !snapshot.state.audit().verify_chain() {
        return Err(EngineError::Integrity(
            "audit trail in snapshot fails hash-chain verification".into(),
        ));
    }
    Ok(LoanEngine::from_parts(snapshot.state, config, snapshot.clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn engine() -> LoanEngine {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        LoanEngine::new(EngineConfig::default(), EngineClock::starting_at(start))
    }

    #[test]
    fn test_config_hash_is_stable() {
        let a = compute_config_hash(&EngineConfig::default()).unwrap();
        let b = compute_config_hash(&EngineConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_config_hash_tracks_values() {
        let mut changed = EngineConfig::default();
        changed.admin_approval_threshold = dec!(9000);
        let a = compute_config_hash(&EngineConfig::default()).unwrap();
        let b = compute_config_hash(&changed).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_round_trip() {
        let mut engine = engine();
        engine.register_user("amara", "Amara Banda", crate::models::Role::Borrower).unwrap();
        let json = save_snapshot(&engine).unwrap();

        let restored = load_snapshot(&json, EngineConfig::default()).unwrap();
        assert!(restored.state().user_by_username("amara").is_some());
        assert_eq!(restored.clock().now(), engine.clock().now());
    }

    #[test]
    fn test_load_refuses_config_mismatch() {
        let engine = engine();
        let json = save_snapshot(&engine).unwrap();

        let mut other = EngineConfig::default();
        other.min_groups_for_approval = 10;
        let err = load_snapshot(&json, other).unwrap_err();
        assert!(matches!(err, EngineError::Precondition(_)));
    }
}
