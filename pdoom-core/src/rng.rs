//! Context-keyed deterministic random draws.
//!
//! Every draw increments the counter of its context, hashes
//! `(seed, context, counter)` with SHA-256 and seeds a throwaway
//! [`ChaCha20Rng`] from the digest. The N-th draw in a context therefore only
//! depends on the seed, the context label and N; draws in other contexts never
//! shift it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::warn;
use rand::seq::{SliceRandom, index};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::challenge::{ChallengeError, ChallengeExport};
use crate::numbers::i64_to_f64;

const DERIVATION_DOMAIN: &[u8] = b"pdoom/context-rng/v1";

/// Errors raised by invalid draw requests.
#[derive(Debug, Error, PartialEq)]
pub enum RngError {
    #[error("cannot choose from an empty collection (context `{context}`)")]
    EmptyCollection { context: String },
    #[error("invalid range [{low}, {high}] (context `{context}`)")]
    InvalidRange {
        low: f64,
        high: f64,
        context: String,
    },
    #[error("cannot sample {requested} items from {available} (context `{context}`)")]
    SampleTooLarge {
        requested: usize,
        available: usize,
        context: String,
    },
}

/// Kind of draw recorded in the call history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RngCallType {
    Int,
    Float,
    Uniform,
    Choice,
    Shuffle,
    Sample,
}

impl RngCallType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Uniform => "uniform",
            Self::Choice => "choice",
            Self::Shuffle => "shuffle",
            Self::Sample => "sample",
        }
    }
}

/// Append-only audit entry for a single draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RngCallRecord {
    /// Turn marker active when the draw happened.
    pub turn: u32,
    pub context: String,
    /// Ordinal of the draw within its context, starting at 1.
    pub counter: u64,
    pub call_type: RngCallType,
    pub parameters: Value,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
}

/// Deterministic generator partitioned by caller-supplied context labels.
#[derive(Debug, Clone)]
pub struct ContextRng {
    base_seed: String,
    context_counters: HashMap<String, u64>,
    call_history: Vec<RngCallRecord>,
    turn: u32,
}

impl ContextRng {
    /// Create a generator for one game session.
    #[must_use]
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            base_seed: seed.into(),
            context_counters: HashMap::new(),
            call_history: Vec::new(),
            turn: 0,
        }
    }

    #[must_use]
    pub fn base_seed(&self) -> &str {
        &self.base_seed
    }

    /// Current turn marker stamped on new call records.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Move the turn marker; does not touch any context counter.
    pub const fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    /// Number of draws already made in `context`.
    #[must_use]
    pub fn context_count(&self, context: &str) -> u64 {
        self.context_counters.get(context).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn call_history(&self) -> &[RngCallRecord] {
        &self.call_history
    }

    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.call_history.len()
    }

    /// Integer in `[low, high]` inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`RngError::InvalidRange`] when `low > high`.
    pub fn draw_int(&mut self, low: i64, high: i64, context: &str) -> Result<i64, RngError> {
        if low > high {
            return Err(RngError::InvalidRange {
                low: i64_to_f64(low),
                high: i64_to_f64(high),
                context: context.to_string(),
            });
        }
        let (counter, mut rng) = self.next_stream(context);
        let value = rng.gen_range(low..=high);
        self.record(
            context,
            counter,
            RngCallType::Int,
            json!({ "low": low, "high": high }),
            json!(value),
        );
        Ok(value)
    }

    /// Float in `[0, 1)`.
    pub fn draw_float(&mut self, context: &str) -> f64 {
        let (counter, mut rng) = self.next_stream(context);
        let value = rng.r#gen::<f64>();
        self.record(context, counter, RngCallType::Float, Value::Null, json!(value));
        value
    }

    /// Float in `[low, high]`.
    ///
    /// # Errors
    ///
    /// Returns [`RngError::InvalidRange`] for inverted or non-finite bounds.
    pub fn draw_uniform(&mut self, low: f64, high: f64, context: &str) -> Result<f64, RngError> {
        if !low.is_finite() || !high.is_finite() || low > high || !(high - low).is_finite() {
            return Err(RngError::InvalidRange {
                low,
                high,
                context: context.to_string(),
            });
        }
        let (counter, mut rng) = self.next_stream(context);
        #[allow(clippy::float_cmp)]
        let value = if low == high {
            low
        } else {
            rng.gen_range(low..=high)
        };
        self.record(
            context,
            counter,
            RngCallType::Uniform,
            json!({ "low": low, "high": high }),
            json!(value),
        );
        Ok(value)
    }

    /// Pick one element of `items`.
    ///
    /// # Errors
    ///
    /// Returns [`RngError::EmptyCollection`] when `items` is empty.
    pub fn choose<'a, T: Serialize>(
        &mut self,
        items: &'a [T],
        context: &str,
    ) -> Result<&'a T, RngError> {
        if items.is_empty() {
            return Err(RngError::EmptyCollection {
                context: context.to_string(),
            });
        }
        let (counter, mut rng) = self.next_stream(context);
        let picked = rng.gen_range(0..items.len());
        let item = &items[picked];
        self.record(
            context,
            counter,
            RngCallType::Choice,
            json!({ "len": items.len() }),
            json!({ "index": picked, "value": recordable(item, context) }),
        );
        Ok(item)
    }

    /// Permute `items` in place.
    pub fn shuffle<T>(&mut self, items: &mut [T], context: &str) {
        let (counter, mut rng) = self.next_stream(context);
        items.shuffle(&mut rng);
        self.record(
            context,
            counter,
            RngCallType::Shuffle,
            json!({ "len": items.len() }),
            Value::Null,
        );
    }

    /// `k` elements taken from distinct positions of `items`.
    ///
    /// # Errors
    ///
    /// Returns [`RngError::SampleTooLarge`] when `k` exceeds `items.len()`.
    pub fn sample<T: Clone>(
        &mut self,
        items: &[T],
        k: usize,
        context: &str,
    ) -> Result<Vec<T>, RngError> {
        if k > items.len() {
            return Err(RngError::SampleTooLarge {
                requested: k,
                available: items.len(),
                context: context.to_string(),
            });
        }
        let (counter, mut rng) = self.next_stream(context);
        let picked = index::sample(&mut rng, items.len(), k).into_vec();
        let values = picked.iter().map(|&i| items[i].clone()).collect();
        self.record(
            context,
            counter,
            RngCallType::Sample,
            json!({ "len": items.len(), "k": k }),
            json!({ "indices": picked }),
        );
        Ok(values)
    }

    /// Snapshot the call history for sharing or verification.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be canonicalised for signing.
    pub fn challenge_export(&self, turns_played: u32) -> Result<ChallengeExport, ChallengeError> {
        ChallengeExport::from_history(&self.base_seed, turns_played, &self.call_history)
    }

    fn next_stream(&mut self, context: &str) -> (u64, ChaCha20Rng) {
        let counter = self
            .context_counters
            .entry(context.to_string())
            .or_insert(0);
        *counter = counter.saturating_add(1);
        let counter = *counter;
        let seed = derive_draw_seed(&self.base_seed, context, counter);
        (counter, ChaCha20Rng::from_seed(seed))
    }

    fn record(
        &mut self,
        context: &str,
        counter: u64,
        call_type: RngCallType,
        parameters: Value,
        result: Value,
    ) {
        self.call_history.push(RngCallRecord {
            turn: self.turn,
            context: context.to_string(),
            counter,
            call_type,
            parameters,
            result,
            timestamp: Utc::now(),
        });
    }
}

/// JSON form of a drawn item for the call history, or `null` with a warning
/// when the item has no JSON form.
fn recordable<T: Serialize>(item: &T, context: &str) -> Value {
    serde_json::to_value(item).unwrap_or_else(|err| {
        warn!("rng context `{context}`: drawn value not recordable: {err}");
        Value::Null
    })
}

/// Hash the draw coordinates into a ChaCha seed. Each part is length-prefixed
/// so `("x1", 1)` and `("x", 11)` derive different seeds.
fn derive_draw_seed(base_seed: &str, context: &str, counter: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DERIVATION_DOMAIN);
    hasher.update(u64::try_from(base_seed.len()).unwrap_or(u64::MAX).to_le_bytes());
    hasher.update(base_seed.as_bytes());
    hasher.update(u64::try_from(context.len()).unwrap_or(u64::MAX).to_le_bytes());
    hasher.update(context.as_bytes());
    hasher.update(counter.to_le_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest[..32]);
    seed
}
