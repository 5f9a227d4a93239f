//! Economic and pacing configuration for the simulation core.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const STATIC_ECONOMY_JSON: &str = include_str!("../data/economy.json");

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("maintenance tier {index} does not raise the staff ceiling")]
    TierOrder { index: usize },
    #[error("starting doom {doom} outside [0, {max_doom}]")]
    StartingDoom { doom: i32, max_doom: i32 },
    #[error("economy config parse error: {0}")]
    Parse(String),
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min: 0.0,
            max: 1.0,
            value,
        });
    }
    Ok(())
}

fn check_min(field: &'static str, min: f64, value: f64) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::MinViolation { field, min, value });
    }
    Ok(())
}

/// Resources a new lab starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingResources {
    pub money: i64,
    pub staff: i32,
    pub reputation: i32,
    pub doom: i32,
    pub compute: i32,
}

impl Default for StartingResources {
    fn default() -> Self {
        Self {
            money: 100_000,
            staff: 2,
            reputation: 50,
            doom: 25,
            compute: 0,
        }
    }
}

/// Per-turn action point formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionPointConfig {
    pub base: i32,
    /// One extra point for every this many staff.
    pub staff_per_bonus: i32,
    pub management_bonus: i32,
    pub max: i32,
}

impl Default for ActionPointConfig {
    fn default() -> Self {
        Self {
            base: 3,
            staff_per_bonus: 4,
            management_bonus: 1,
            max: 8,
        }
    }
}

/// Per-staff maintenance rate applying up to a headcount ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceTier {
    pub up_to_staff: i32,
    pub cost_per_staff: i64,
}

/// Recurring costs and the penalty for missing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Ascending by `up_to_staff`.
    pub tiers: Vec<MaintenanceTier>,
    /// Rate once headcount exceeds every tier.
    pub overflow_cost_per_staff: i64,
    pub pet_upkeep: i64,
    pub attrition_staff_loss: i32,
    pub attrition_reputation_loss: i32,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                MaintenanceTier {
                    up_to_staff: 5,
                    cost_per_staff: 600,
                },
                MaintenanceTier {
                    up_to_staff: 15,
                    cost_per_staff: 800,
                },
            ],
            overflow_cost_per_staff: 1_000,
            pet_upkeep: 50,
            attrition_staff_loss: 1,
            attrition_reputation_loss: 2,
        }
    }
}

impl MaintenanceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ceiling = 0;
        for (index, tier) in self.tiers.iter().enumerate() {
            if tier.up_to_staff <= ceiling || tier.cost_per_staff < 0 {
                return Err(ConfigError::TierOrder { index });
            }
            ceiling = tier.up_to_staff;
        }
        check_min(
            "maintenance.overflow_cost_per_staff",
            0.0,
            crate::numbers::i64_to_f64(self.overflow_cost_per_staff),
        )?;
        check_min(
            "maintenance.attrition_staff_loss",
            0.0,
            f64::from(self.attrition_staff_loss),
        )
    }
}

/// Productivity and publication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub paper_threshold: i32,
    pub paper_reputation_bonus: i32,
    /// Research points every staff member produces per turn.
    pub staff_productivity: i32,
    /// Share of a specialist's productivity that feeds the doom model.
    pub specialist_doom_weight: f64,
    pub safety_action_progress: i32,
    pub safety_action_points: f64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            paper_threshold: 100,
            paper_reputation_bonus: 5,
            staff_productivity: 2,
            specialist_doom_weight: 0.1,
            safety_action_progress: 20,
            safety_action_points: 2.0,
        }
    }
}

/// Weights for the per-turn doom change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoomConfig {
    pub base_per_turn: f64,
    pub opponent_factor: f64,
    pub safety_weight: f64,
    pub capability_weight: f64,
}

impl Default for DoomConfig {
    fn default() -> Self {
        Self {
            base_per_turn: 1.0,
            opponent_factor: 0.5,
            safety_weight: 1.0,
            capability_weight: 1.0,
        }
    }
}

/// Fundraising success model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundraisingConfig {
    pub base_success: f64,
    /// Added per reputation point above or below 50.
    pub reputation_weight: f64,
    pub min_success: f64,
    pub max_success: f64,
    pub min_amount: i64,
    pub max_amount: i64,
    pub consolation_amount: i64,
}

impl Default for FundraisingConfig {
    fn default() -> Self {
        Self {
            base_success: 0.6,
            reputation_weight: 0.005,
            min_success: 0.1,
            max_success: 0.95,
            min_amount: 20_000,
            max_amount: 60_000,
            consolation_amount: 5_000,
        }
    }
}

/// Scouting and espionage odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelligenceConfig {
    pub scout_success_chance: f64,
    pub espionage_success_chance: f64,
    pub espionage_scandal_chance: f64,
    pub espionage_progress_setback: i32,
    pub scandal_reputation_loss: i32,
    pub investigation_delay_turns: u32,
    pub investigation_fine: i64,
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            scout_success_chance: 0.8,
            espionage_success_chance: 0.6,
            espionage_scandal_chance: 0.2,
            espionage_progress_setback: 5,
            scandal_reputation_loss: 5,
            investigation_delay_turns: 2,
            investigation_fine: 10_000,
        }
    }
}

/// Rules for handing actions to subordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationConfig {
    /// Headcount required per concurrent delegated action.
    pub min_staff: i32,
    pub effectiveness: f64,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            min_staff: 4,
            effectiveness: 0.7,
        }
    }
}

/// Random and deferred event tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub random_chance: f64,
    pub windfall_amount: i64,
    pub breakthrough_progress: i32,
    pub breakthrough_capability: f64,
    pub conference_delay_turns: u32,
    pub conference_reputation: i32,
    pub compute_surge_multiplier: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            random_chance: 0.25,
            windfall_amount: 25_000,
            breakthrough_progress: 30,
            breakthrough_capability: 1.0,
            conference_delay_turns: 2,
            conference_reputation: 3,
            compute_surge_multiplier: 1.5,
        }
    }
}

/// Top-level configuration consumed by the turn pipeline and calculators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicConfig {
    #[serde(default)]
    pub start: StartingResources,
    #[serde(default = "EconomicConfig::default_max_doom")]
    pub max_doom: i32,
    #[serde(default)]
    pub action_points: ActionPointConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub doom: DoomConfig,
    #[serde(default)]
    pub fundraising: FundraisingConfig,
    #[serde(default)]
    pub intelligence: IntelligenceConfig,
    #[serde(default)]
    pub delegation: DelegationConfig,
    #[serde(default)]
    pub events: EventConfig,
    #[serde(default = "EconomicConfig::default_message_history_cap")]
    pub message_history_cap: usize,
    #[serde(default = "EconomicConfig::default_processing_timeout_ms")]
    pub processing_timeout_ms: u64,
}

impl EconomicConfig {
    #[must_use]
    pub const fn default_max_doom() -> i32 {
        100
    }

    #[must_use]
    pub const fn default_message_history_cap() -> usize {
        500
    }

    #[must_use]
    pub const fn default_processing_timeout_ms() -> u64 {
        3_000
    }

    /// Bundled configuration shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled JSON is malformed or invalid.
    pub fn load_from_static() -> Result<Self, ConfigError> {
        Self::from_json(STATIC_ECONOMY_JSON)
    }

    /// Parse and validate a JSON document; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the first
    /// invariant violation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[must_use]
    pub const fn processing_timeout(&self) -> Duration {
        Duration::from_millis(self.processing_timeout_ms)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_min("max_doom", 1.0, f64::from(self.max_doom))?;
        if !(0..=self.max_doom).contains(&self.start.doom) {
            return Err(ConfigError::StartingDoom {
                doom: self.start.doom,
                max_doom: self.max_doom,
            });
        }
        check_min("start.staff", 0.0, f64::from(self.start.staff))?;
        check_min("start.reputation", 0.0, f64::from(self.start.reputation))?;
        check_min(
            "start.money",
            0.0,
            crate::numbers::i64_to_f64(self.start.money),
        )?;
        check_min(
            "action_points.staff_per_bonus",
            1.0,
            f64::from(self.action_points.staff_per_bonus),
        )?;
        check_min(
            "action_points.max",
            f64::from(self.action_points.base),
            f64::from(self.action_points.max),
        )?;
        self.maintenance.validate()?;
        check_min(
            "research.paper_threshold",
            1.0,
            f64::from(self.research.paper_threshold),
        )?;
        let fundraising = &self.fundraising;
        check_probability("fundraising.base_success", fundraising.base_success)?;
        check_probability("fundraising.min_success", fundraising.min_success)?;
        check_probability("fundraising.max_success", fundraising.max_success)?;
        check_min(
            "fundraising.max_success",
            fundraising.min_success,
            fundraising.max_success,
        )?;
        check_min(
            "fundraising.max_amount",
            crate::numbers::i64_to_f64(fundraising.min_amount),
            crate::numbers::i64_to_f64(fundraising.max_amount),
        )?;
        let intel = &self.intelligence;
        check_probability("intelligence.scout_success_chance", intel.scout_success_chance)?;
        check_probability(
            "intelligence.espionage_success_chance",
            intel.espionage_success_chance,
        )?;
        check_probability(
            "intelligence.espionage_scandal_chance",
            intel.espionage_scandal_chance,
        )?;
        check_min(
            "delegation.min_staff",
            1.0,
            f64::from(self.delegation.min_staff),
        )?;
        check_probability("delegation.effectiveness", self.delegation.effectiveness)?;
        check_probability("events.random_chance", self.events.random_chance)?;
        check_min(
            "events.compute_surge_multiplier",
            1.0,
            self.events.compute_surge_multiplier,
        )?;
        if self.processing_timeout_ms == 0 {
            return Err(ConfigError::MinViolation {
                field: "processing_timeout_ms",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for EconomicConfig {
    fn default() -> Self {
        Self {
            start: StartingResources::default(),
            max_doom: Self::default_max_doom(),
            action_points: ActionPointConfig::default(),
            maintenance: MaintenanceConfig::default(),
            research: ResearchConfig::default(),
            doom: DoomConfig::default(),
            fundraising: FundraisingConfig::default(),
            intelligence: IntelligenceConfig::default(),
            delegation: DelegationConfig::default(),
            events: EventConfig::default(),
            message_history_cap: Self::default_message_history_cap(),
            processing_timeout_ms: Self::default_processing_timeout_ms(),
        }
    }
}
