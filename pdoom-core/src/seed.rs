//! Seed sources for a session: custom strings, weekly challenges, and
//! friendly codes generated from entropy.
//! Friendly format: <WORD>-<WORD><NN>, e.g., ALIGN-ORACLE42

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash = (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME);
    }
    hash
}

// Word list for friendly seeds
pub const WORD_LIST: [&str; 48] = [
    "ALIGN", "ORACLE", "TRIPWIRE", "SANDBOX", "GRADIENT", "TOKEN", "PROBE", "CIRCUIT", "AUDIT",
    "REDTEAM", "BEACON", "LATTICE", "CORRIGE", "OVERSEE", "PAPER", "GRANT", "BOARD", "CLUSTER",
    "TENSOR", "KERNEL", "VECTOR", "WEIGHTS", "SIGNAL", "CANARY", "FIREWALL", "LEDGER", "SCOUT",
    "MOLE", "LEAK", "SUMMIT", "TREATY", "PAUSE", "HORIZON", "MARGIN", "BUFFER", "ANCHOR", "QUORUM",
    "CHARTER", "COMPASS", "SENTRY", "WARDEN", "HARBOR", "RUNWAY", "SPRINT", "PIVOT", "RELAY",
    "VERIFY", "BASELINE",
];

/// Errors raised when a seed source cannot produce a seed string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("custom seed is blank")]
    Blank,
}

/// Where a session's seed comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    /// Player-entered or save-file seed, used verbatim after trimming.
    Custom(String),
    /// Shared challenge seed for the ISO week containing the date.
    Weekly(NaiveDate),
    /// Friendly code derived from an entropy value.
    Entropy(u64),
}

impl SeedSource {
    /// Resolve the source into the opaque seed string.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Blank`] for a custom seed with no visible characters.
    pub fn resolve(&self) -> Result<String, SeedError> {
        match self {
            Self::Custom(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(SeedError::Blank);
                }
                Ok(trimmed.to_string())
            }
            Self::Weekly(date) => Ok(weekly_challenge_seed(*date)),
            Self::Entropy(entropy) => Ok(friendly_seed_from_entropy(*entropy)),
        }
    }
}

/// Seed shared by every date in the same ISO week.
#[must_use]
pub fn weekly_challenge_seed(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("pdoom-weekly-{}-w{:02}", week.year(), week.week())
}

#[must_use]
pub fn friendly_seed_from_entropy(entropy: u64) -> String {
    let mixed = fnv1a64(&entropy.to_le_bytes());
    let words = WORD_LIST.len() as u64;
    let first = WORD_LIST[usize::try_from(mixed % words).unwrap_or(0)];
    let second = WORD_LIST[usize::try_from((mixed >> 16) % words).unwrap_or(0)];
    let nn = (mixed >> 40) % 100;
    format!("{first}-{second}{nn:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_seed_is_shared_within_iso_week() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let next_monday = NaiveDate::from_ymd_opt(2026, 10, 26).unwrap();
        assert_eq!(weekly_challenge_seed(monday), weekly_challenge_seed(sunday));
        assert_ne!(
            weekly_challenge_seed(monday),
            weekly_challenge_seed(next_monday)
        );
        assert_eq!(weekly_challenge_seed(monday), "pdoom-weekly-2026-w43");
    }

    #[test]
    fn weekly_seed_uses_iso_year_at_boundary() {
        let new_years_day = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(weekly_challenge_seed(new_years_day), "pdoom-weekly-2026-w53");
    }

    #[test]
    fn friendly_seed_is_stable_and_well_formed() {
        let code = friendly_seed_from_entropy(0xDEAD_BEEF);
        assert_eq!(code, friendly_seed_from_entropy(0xDEAD_BEEF));
        let (first, rest) = code.split_once('-').unwrap();
        assert!(WORD_LIST.contains(&first));
        let (word, digits) = rest.split_at(rest.len() - 2);
        assert!(WORD_LIST.contains(&word));
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn custom_seeds_are_trimmed_and_blank_rejected() {
        assert_eq!(
            SeedSource::Custom("  my-seed ".into()).resolve(),
            Ok("my-seed".to_string())
        );
        assert_eq!(
            SeedSource::Custom("   ".into()).resolve(),
            Err(SeedError::Blank)
        );
    }
}
