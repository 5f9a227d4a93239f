use anyhow::{Context, Result};
use chrono::NaiveDate;
use pdoom_core::SeedSource;
use std::collections::HashSet;

/// Seed metadata resolved from one CLI token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: String,
    pub source: SeedSource,
}

impl SeedInfo {
    /// Resolve `source` into a concrete seed string.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot produce a seed.
    pub fn from_source(source: SeedSource) -> Result<Self> {
        let seed = source
            .resolve()
            .with_context(|| format!("failed to resolve seed source {source:?}"))?;
        Ok(Self { seed, source })
    }

    #[must_use]
    pub const fn is_weekly(&self) -> bool {
        matches!(self.source, SeedSource::Weekly(_))
    }
}

/// Split a comma-separated CLI argument, trimming blanks away.
#[must_use]
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve a list of CLI seed arguments into concrete seeds.
///
/// `weekly` expands to the challenge seed for the week containing `today`,
/// bare integers become friendly entropy codes, anything else is used as a
/// custom seed verbatim. Duplicates keep their first position.
pub fn resolve_seed_inputs(tokens: &[String], today: NaiveDate) -> Result<Vec<SeedInfo>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut resolved: Vec<SeedInfo> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let source = if token.eq_ignore_ascii_case("weekly") {
            SeedSource::Weekly(today)
        } else if let Ok(value) = token.parse::<u64>() {
            SeedSource::Entropy(value)
        } else {
            SeedSource::Custom(token.clone())
        };
        let info = SeedInfo::from_source(source)?;
        if seen.insert(info.seed.clone()) {
            resolved.push(info);
        }
    }

    if resolved.is_empty() {
        resolved.push(SeedInfo::from_source(SeedSource::Entropy(1337))?);
    }

    Ok(resolved)
}
