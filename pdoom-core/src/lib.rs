//! P(Doom) Simulation Core
//!
//! Platform-agnostic deterministic core for the P(Doom) lab-management game:
//! a context-keyed RNG with an auditable call history, the economic and
//! intelligence calculators, and the turn sequencer that drives them.
//! This crate has no rendering, input or persistence dependencies.

pub mod actions;
pub mod challenge;
pub mod config;
pub mod constants;
pub mod economy;
pub mod events;
pub mod intelligence;
pub mod numbers;
pub mod opponents;
pub mod rng;
pub mod seed;
pub mod session;
pub mod state;
pub mod turn;

// Re-export commonly used types
pub use actions::{
    Action, ActionContext, ActionEffect, ActionError, ActionId, ActionRegistry, ActionReport,
    ActionStatus, SkipReason,
};
pub use challenge::{ChallengeError, ChallengeExport, sign_history};
pub use config::{ConfigError, EconomicConfig};
pub use economy::{
    DoomDelta, FundraisingOutcome, MaintenanceOutcome, action_points_for,
    fundraising_success_probability, maintenance_cost, roll_fundraising,
};
pub use events::{DeferredEvent, DeferredKind, EventKind, Milestone, TriggeredEvent};
pub use intelligence::{EspionageOutcome, ScoutOutcome, espionage, scout};
pub use opponents::{Opponent, OpponentStat, OpponentStrategy, default_roster};
pub use rng::{ContextRng, RngCallRecord, RngCallType, RngError};
pub use seed::{SeedError, SeedSource, friendly_seed_from_entropy, weekly_challenge_seed};
pub use session::{EndTurnError, GameSession};
pub use state::{
    DialogId, DialogState, Ending, GameState, PendingDialog, Researcher, SelectedAction,
    Specialization, StateError, Upgrade,
};
pub use turn::{
    NoopObserver, ProcessingState, TickStatus, TurnContext, TurnError, TurnObserver, TurnOutcome,
    TurnPhase, TurnRejection, TurnReport, TurnSequencer,
};

/// Trait for abstracting where economic configuration comes from
/// Platform-specific implementations should provide this
pub trait ConfigSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the economic configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    fn load_economy(&self) -> Result<EconomicConfig, Self::Error>;
}

/// Configuration compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticConfig;

impl ConfigSource for StaticConfig {
    type Error = ConfigError;

    fn load_economy(&self) -> Result<EconomicConfig, Self::Error> {
        EconomicConfig::load_from_static()
    }
}

/// Configuration supplied as a JSON document, e.g. read from a file.
#[derive(Debug, Clone)]
pub struct JsonConfig {
    json: String,
}

impl JsonConfig {
    #[must_use]
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl ConfigSource for JsonConfig {
    type Error = ConfigError;

    fn load_economy(&self) -> Result<EconomicConfig, Self::Error> {
        EconomicConfig::from_json(&self.json)
    }
}

/// Main game engine for creating sessions
pub struct GameEngine<C>
where
    C: ConfigSource,
{
    config_source: C,
}

impl<C> GameEngine<C>
where
    C: ConfigSource,
{
    /// Create a new game engine with the provided configuration source
    pub const fn new(config_source: C) -> Self {
        Self { config_source }
    }

    /// Load the configuration every new session will use.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub fn config(&self) -> Result<EconomicConfig, C::Error> {
        self.config_source.load_economy()
    }

    /// Construct a new session on `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub fn create_session(&self, seed: &str) -> Result<GameSession, C::Error> {
        Ok(GameSession::new(seed, self.config()?))
    }

    /// Construct a new session from any seed source.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the seed
    /// source does not resolve.
    pub fn create_session_from(&self, source: &SeedSource) -> Result<GameSession, anyhow::Error>
    where
        C::Error: Into<anyhow::Error>,
    {
        let cfg = self.config().map_err(Into::into)?;
        Ok(GameSession::from_source(source, cfg)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Clone, Default)]
    struct FixtureConfig {
        money: i64,
    }

    impl ConfigSource for FixtureConfig {
        type Error = Infallible;

        fn load_economy(&self) -> Result<EconomicConfig, Self::Error> {
            let mut cfg = EconomicConfig::default();
            cfg.start.money = self.money;
            Ok(cfg)
        }
    }

    #[test]
    fn engine_creates_sessions_from_source_config() {
        let engine = GameEngine::new(FixtureConfig { money: 42_000 });
        let session = engine.create_session("engine-seed").unwrap();
        assert_eq!(session.seed(), "engine-seed");
        assert_eq!(session.state().money, 42_000);
    }

    #[test]
    fn static_engine_resolves_seed_sources() {
        let engine = GameEngine::new(StaticConfig);
        let session = engine
            .create_session_from(&SeedSource::Entropy(7))
            .unwrap();
        assert_eq!(session.seed(), friendly_seed_from_entropy(7));
        assert!(
            engine
                .create_session_from(&SeedSource::Custom(String::new()))
                .is_err()
        );
    }

    #[test]
    fn json_source_reports_invalid_config() {
        let engine = GameEngine::new(JsonConfig::new(r#"{"max_doom": 0}"#));
        assert!(matches!(
            engine.create_session("x"),
            Err(ConfigError::MinViolation { field: "max_doom", .. })
        ));
    }
}
