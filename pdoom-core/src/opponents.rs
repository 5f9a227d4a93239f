//! Rival labs and their independently discoverable stats.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    OPPONENT_COMPLETION_PROGRESS, OPPONENT_COMPUTE_COST, OPPONENT_COMPUTE_PER_BONUS_PROGRESS,
    OPPONENT_COMPUTE_UNITS, OPPONENT_INVEST_CHANCE,
};
use crate::rng::{ContextRng, RngError};

/// A value the player only sees once it has been revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discoverable<T> {
    pub value: T,
    pub discovered: bool,
}

impl<T> Discoverable<T> {
    #[must_use]
    pub const fn hidden(value: T) -> Self {
        Self {
            value,
            discovered: false,
        }
    }

    /// The value if it has been revealed.
    #[must_use]
    pub const fn known(&self) -> Option<&T> {
        if self.discovered {
            Some(&self.value)
        } else {
            None
        }
    }
}

/// How aggressively a rival pushes capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentStrategy {
    Reckless,
    Balanced,
    SafetyConscious,
}

impl OpponentStrategy {
    /// Share of progress that turns into doom.
    #[must_use]
    pub const fn doom_factor(self) -> f64 {
        match self {
            Self::Reckless => 1.0,
            Self::Balanced => 0.6,
            Self::SafetyConscious => 0.3,
        }
    }

    /// Upper bound added to the base progress roll.
    #[must_use]
    pub const fn progress_bias(self) -> i64 {
        match self {
            Self::Reckless => 2,
            Self::Balanced => 1,
            Self::SafetyConscious => 0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reckless => "reckless",
            Self::Balanced => "balanced",
            Self::SafetyConscious => "safety_conscious",
        }
    }
}

impl fmt::Display for OpponentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individually revealable opponent attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentStat {
    Budget,
    Compute,
    Progress,
    Reputation,
    StaffCount,
    Strategy,
}

impl OpponentStat {
    pub const ALL: [Self; 6] = [
        Self::Budget,
        Self::Compute,
        Self::Progress,
        Self::Reputation,
        Self::StaffCount,
        Self::Strategy,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Compute => "compute",
            Self::Progress => "progress",
            Self::Reputation => "reputation",
            Self::StaffCount => "staff_count",
            Self::Strategy => "strategy",
        }
    }
}

/// Result of one opponent's own turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentTurn {
    pub opponent: String,
    pub progress_gain: i32,
    pub invested_in_compute: bool,
    pub doom_contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opponent {
    pub name: String,
    /// Whether the player knows this lab exists at all.
    pub discovered: bool,
    pub budget: Discoverable<i64>,
    pub compute: Discoverable<i32>,
    pub progress: Discoverable<i32>,
    pub reputation: Discoverable<i32>,
    pub staff_count: Discoverable<i32>,
    pub strategy: Discoverable<OpponentStrategy>,
}

impl Opponent {
    #[must_use]
    pub fn new(
        name: &str,
        strategy: OpponentStrategy,
        budget: i64,
        compute: i32,
        progress: i32,
        reputation: i32,
        staff_count: i32,
    ) -> Self {
        Self {
            name: name.to_string(),
            discovered: false,
            budget: Discoverable::hidden(budget),
            compute: Discoverable::hidden(compute),
            progress: Discoverable::hidden(progress),
            reputation: Discoverable::hidden(reputation),
            staff_count: Discoverable::hidden(staff_count),
            strategy: Discoverable::hidden(strategy),
        }
    }

    /// Name folded into RNG context labels.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    #[must_use]
    pub const fn is_discovered(&self, stat: OpponentStat) -> bool {
        match stat {
            OpponentStat::Budget => self.budget.discovered,
            OpponentStat::Compute => self.compute.discovered,
            OpponentStat::Progress => self.progress.discovered,
            OpponentStat::Reputation => self.reputation.discovered,
            OpponentStat::StaffCount => self.staff_count.discovered,
            OpponentStat::Strategy => self.strategy.discovered,
        }
    }

    #[must_use]
    pub fn undiscovered_stats(&self) -> Vec<OpponentStat> {
        OpponentStat::ALL
            .into_iter()
            .filter(|stat| !self.is_discovered(*stat))
            .collect()
    }

    /// Reveal one stat; returns false when it was already known.
    pub fn reveal(&mut self, stat: OpponentStat) -> bool {
        let flag = match stat {
            OpponentStat::Budget => &mut self.budget.discovered,
            OpponentStat::Compute => &mut self.compute.discovered,
            OpponentStat::Progress => &mut self.progress.discovered,
            OpponentStat::Reputation => &mut self.reputation.discovered,
            OpponentStat::StaffCount => &mut self.staff_count.discovered,
            OpponentStat::Strategy => &mut self.strategy.discovered,
        };
        let newly = !*flag;
        *flag = true;
        newly
    }

    pub fn reveal_all(&mut self) {
        self.discovered = true;
        for stat in OpponentStat::ALL {
            self.reveal(stat);
        }
    }

    #[must_use]
    pub const fn has_completed(&self) -> bool {
        self.progress.value >= OPPONENT_COMPLETION_PROGRESS
    }

    /// Advance this lab by one turn.
    ///
    /// # Errors
    ///
    /// Propagates RNG range errors.
    pub fn take_turn(
        &mut self,
        rng: &mut ContextRng,
        turn: u32,
        opponent_factor: f64,
    ) -> Result<OpponentTurn, RngError> {
        let slug = self.slug();
        let strategy = self.strategy.value;

        let mut invested = false;
        if self.budget.value >= OPPONENT_COMPUTE_COST
            && rng.draw_float(&format!("opponent_invest_{slug}_turn_{turn}"))
                < OPPONENT_INVEST_CHANCE
        {
            self.budget.value -= OPPONENT_COMPUTE_COST;
            self.compute.value += OPPONENT_COMPUTE_UNITS;
            invested = true;
        }

        let roll = rng.draw_int(
            1,
            2 + strategy.progress_bias(),
            &format!("opponent_progress_{slug}_turn_{turn}"),
        )?;
        let roll = i32::try_from(roll).unwrap_or(0);
        let gain = roll + self.compute.value / OPPONENT_COMPUTE_PER_BONUS_PROGRESS;
        let before = self.progress.value;
        self.progress.value = (before + gain).min(OPPONENT_COMPLETION_PROGRESS);
        let applied = self.progress.value - before;

        Ok(OpponentTurn {
            opponent: self.name.clone(),
            progress_gain: applied,
            invested_in_compute: invested,
            doom_contribution: f64::from(applied) * strategy.doom_factor() * opponent_factor,
        })
    }
}

/// Starting rivals, all unknown to the player.
#[must_use]
pub fn default_roster() -> Vec<Opponent> {
    vec![
        Opponent::new(
            "TechCorp Labs",
            OpponentStrategy::Reckless,
            500_000,
            40,
            10,
            60,
            40,
        ),
        Opponent::new(
            "Meridian AI",
            OpponentStrategy::Balanced,
            250_000,
            25,
            5,
            55,
            20,
        ),
        Opponent::new(
            "Open Frontier",
            OpponentStrategy::SafetyConscious,
            120_000,
            10,
            0,
            70,
            12,
        ),
    ]
}
