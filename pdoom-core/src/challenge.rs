//! Read-only export of a session's RNG call history.
//!
//! The signature is an HMAC-SHA256 keyed by the seed over the turn count and
//! every record in order, with timestamps left out so identical runs sign
//! identically. The per-type and per-context tallies are derived from the
//! history and checked against it on verify.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use crate::rng::{RngCallRecord, RngCallType};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("challenge signature mismatch (expected {expected}, found {found})")]
    SignatureMismatch { expected: String, found: String },
    #[error("challenge reports {reported} rng calls but carries {recorded}")]
    CallCountMismatch { reported: usize, recorded: usize },
    #[error("challenge {field} do not match its history")]
    TallyMismatch { field: &'static str },
    #[error("seed cannot key the challenge signature")]
    InvalidKey,
    #[error("challenge json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct SignedCall<'a> {
    turn: u32,
    context: &'a str,
    counter: u64,
    call_type: RngCallType,
    parameters: &'a Value,
    result: &'a Value,
}

impl<'a> From<&'a RngCallRecord> for SignedCall<'a> {
    fn from(record: &'a RngCallRecord) -> Self {
        Self {
            turn: record.turn,
            context: &record.context,
            counter: record.counter,
            call_type: record.call_type,
            parameters: &record.parameters,
            result: &record.result,
        }
    }
}

/// Shareable snapshot of a session's draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeExport {
    pub seed: String,
    pub turns_played: u32,
    pub total_rng_calls: usize,
    pub calls_by_type: BTreeMap<RngCallType, usize>,
    pub calls_by_context: BTreeMap<String, u64>,
    pub signature: String,
    pub history: Vec<RngCallRecord>,
}

impl ChallengeExport {
    /// Build the export from a recorded history.
    ///
    /// # Errors
    ///
    /// Returns an error when a record cannot be serialised for signing.
    pub fn from_history(
        seed: &str,
        turns_played: u32,
        history: &[RngCallRecord],
    ) -> Result<Self, ChallengeError> {
        let (calls_by_type, calls_by_context) = tally(history);
        Ok(Self {
            seed: seed.to_string(),
            turns_played,
            total_rng_calls: history.len(),
            calls_by_type,
            calls_by_context,
            signature: sign_history(seed, turns_played, history)?,
            history: history.to_vec(),
        })
    }

    /// Recompute the signature and counts against the carried history.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::CallCountMismatch`],
    /// [`ChallengeError::TallyMismatch`] or
    /// [`ChallengeError::SignatureMismatch`] when the export was altered.
    pub fn verify(&self) -> Result<(), ChallengeError> {
        if self.total_rng_calls != self.history.len() {
            return Err(ChallengeError::CallCountMismatch {
                reported: self.total_rng_calls,
                recorded: self.history.len(),
            });
        }
        let (calls_by_type, calls_by_context) = tally(&self.history);
        if calls_by_type != self.calls_by_type {
            return Err(ChallengeError::TallyMismatch {
                field: "calls_by_type",
            });
        }
        if calls_by_context != self.calls_by_context {
            return Err(ChallengeError::TallyMismatch {
                field: "calls_by_context",
            });
        }
        let expected = sign_history(&self.seed, self.turns_played, &self.history)?;
        if expected != self.signature {
            return Err(ChallengeError::SignatureMismatch {
                expected,
                found: self.signature.clone(),
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json(&self) -> Result<String, ChallengeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not a challenge export.
    pub fn from_json(json: &str) -> Result<Self, ChallengeError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn tally(history: &[RngCallRecord]) -> (BTreeMap<RngCallType, usize>, BTreeMap<String, u64>) {
    let mut calls_by_type = BTreeMap::new();
    let mut calls_by_context: BTreeMap<String, u64> = BTreeMap::new();
    for record in history {
        *calls_by_type.entry(record.call_type).or_insert(0) += 1;
        let entry = calls_by_context.entry(record.context.clone()).or_insert(0);
        *entry = (*entry).max(record.counter);
    }
    (calls_by_type, calls_by_context)
}

/// Lowercase hex HMAC over `turns_played` and the timestamp-free canonical
/// form of `history`.
///
/// # Errors
///
/// Returns an error when a record cannot be serialised.
pub fn sign_history(
    seed: &str,
    turns_played: u32,
    history: &[RngCallRecord],
) -> Result<String, ChallengeError> {
    let mut mac =
        HmacSha256::new_from_slice(seed.as_bytes()).map_err(|_| ChallengeError::InvalidKey)?;
    mac.update(&turns_played.to_le_bytes());
    for record in history {
        let canonical = serde_json::to_vec(&SignedCall::from(record))?;
        mac.update(&u64::try_from(canonical.len()).unwrap_or(u64::MAX).to_le_bytes());
        mac.update(&canonical);
    }
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ContextRng;

    fn sample_rng(seed: &str) -> ContextRng {
        let mut rng = ContextRng::new(seed);
        rng.set_turn(10);
        let _ = rng.draw_float("game_start");
        let _ = rng.draw_int(1, 6, "dice_roll").unwrap();
        let _ = rng.choose(&["win", "lose"], "outcome").unwrap();
        rng
    }

    #[test]
    fn export_counts_calls_and_turns() {
        let rng = sample_rng("EXPORT-TEST-SEED");
        let export = rng.challenge_export(10).unwrap();
        assert_eq!(export.total_rng_calls, 3);
        assert_eq!(export.turns_played, 10);
        assert_eq!(export.calls_by_type.get(&RngCallType::Int), Some(&1));
        assert_eq!(export.calls_by_context.get("dice_roll"), Some(&1));
        assert_eq!(export.signature.len(), 64);
        export.verify().unwrap();
    }

    #[test]
    fn signature_ignores_timestamps_but_not_results() {
        let a = sample_rng("sig").challenge_export(10).unwrap();
        let b = sample_rng("sig").challenge_export(10).unwrap();
        assert_eq!(a.signature, b.signature);

        let other = sample_rng("sig-2").challenge_export(10).unwrap();
        assert_ne!(a.signature, other.signature);

        let mut tampered = a.clone();
        tampered.history[1].result = serde_json::json!(7);
        assert!(matches!(
            tampered.verify(),
            Err(ChallengeError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn json_roundtrip_keeps_signature_valid() {
        let export = sample_rng("json").challenge_export(10).unwrap();
        let restored = ChallengeExport::from_json(&export.to_json().unwrap()).unwrap();
        assert_eq!(restored.signature, export.signature);
        restored.verify().unwrap();
    }

    #[test]
    fn edited_turn_count_breaks_signature() {
        let mut export = sample_rng("turns").challenge_export(10).unwrap();
        export.turns_played = 9999;
        assert!(matches!(
            export.verify(),
            Err(ChallengeError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn edited_tallies_are_detected() {
        let export = sample_rng("EXPORT-TEST-SEED").challenge_export(10).unwrap();

        let mut by_type = export.clone();
        by_type.calls_by_type.insert(RngCallType::Shuffle, 4);
        assert!(matches!(
            by_type.verify(),
            Err(ChallengeError::TallyMismatch {
                field: "calls_by_type"
            })
        ));

        let mut by_context = export.clone();
        by_context.calls_by_context.insert("forged".to_string(), 1);
        assert!(matches!(
            by_context.verify(),
            Err(ChallengeError::TallyMismatch {
                field: "calls_by_context"
            })
        ));

        let mut bumped = export;
        bumped.calls_by_context.insert("dice_roll".to_string(), 2);
        assert!(bumped.verify().is_err());
    }

    #[test]
    fn truncated_history_is_detected() {
        let mut export = sample_rng("cut").challenge_export(10).unwrap();
        export.history.pop();
        assert!(matches!(
            export.verify(),
            Err(ChallengeError::CallCountMismatch {
                reported: 3,
                recorded: 2
            })
        ));
    }
}
