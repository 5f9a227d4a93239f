//! Phase-scoped state accessors for the turn pipeline.
//!
//! Each wrapper borrows only what its phase needs, so a phase cannot reach
//! into collaborators that belong to another step.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::actions::{ActionRegistry, ActionReport};
use crate::config::EconomicConfig;
use crate::constants::{
    COMPUTE_PER_RESEARCH_POINT, INTERPRETABILITY_SAFETY_SHARE, LOG_ATTRITION,
    LOG_ATTRITION_SUPPRESSED, LOG_DOOM_CHANGE, LOG_MAINTENANCE_SHORTFALL, LOG_OPPONENT_PROGRESS,
    LOG_PAPER_PUBLISHED,
};
use crate::economy::{
    DoomDelta, MaintenanceOutcome, action_points_for, maintenance_cost, settle_maintenance,
};
use crate::events::{self, DeferredKind, Milestone, TriggeredEvent};
use crate::opponents::OpponentTurn;
use crate::rng::{ContextRng, RngError};
use crate::state::{DialogId, Ending, GameState, Specialization, Upgrade};

use super::PhaseError;

/// Research accrued in the productivity phase.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResearchReport {
    pub gained: i32,
    pub paper_published: bool,
}

pub(super) struct EventsPhase<'a> {
    state: &'a mut GameState,
}

impl<'a> EventsPhase<'a> {
    pub(super) const fn new(state: &'a mut GameState) -> Self {
        Self { state }
    }

    pub(super) fn run(
        &mut self,
        rng: &mut ContextRng,
        cfg: &EconomicConfig,
    ) -> Result<Vec<TriggeredEvent>, RngError> {
        events::trigger_turn_events(self.state, rng, cfg)
    }
}

pub(super) struct DialogGate<'a> {
    state: &'a GameState,
}

impl<'a> DialogGate<'a> {
    pub(super) const fn new(state: &'a GameState) -> Self {
        Self { state }
    }

    /// The dialog that blocks this turn, if any.
    pub(super) fn blocking(&self) -> Option<DialogId> {
        self.state.pending_dialog.pending().map(|dialog| dialog.id)
    }
}

pub(super) struct ActionPhase<'a> {
    state: &'a mut GameState,
}

impl<'a> ActionPhase<'a> {
    pub(super) const fn new(state: &'a mut GameState) -> Self {
        Self { state }
    }

    pub(super) fn run(
        &mut self,
        registry: &ActionRegistry,
        rng: &mut ContextRng,
        cfg: &EconomicConfig,
    ) -> Result<Vec<ActionReport>, PhaseError> {
        Ok(registry.execute_selected(self.state, rng, cfg)?)
    }
}

pub(super) struct ProductivityPhase<'a> {
    state: &'a mut GameState,
}

impl<'a> ProductivityPhase<'a> {
    pub(super) const fn new(state: &'a mut GameState) -> Self {
        Self { state }
    }

    pub(super) fn run(&mut self, cfg: &EconomicConfig) -> ResearchReport {
        let research = &cfg.research;
        let mut gained = self.state.staff.max(0) * research.staff_productivity;
        gained += self.state.compute.max(0) / COMPUTE_PER_RESEARCH_POINT;
        for researcher in &self.state.researchers {
            gained += researcher.productivity;
            let weight = f64::from(researcher.productivity) * research.specialist_doom_weight;
            match researcher.specialization {
                Specialization::Safety => self.state.safety_research_this_turn += weight,
                Specialization::Capabilities => {
                    self.state.capability_research_this_turn += weight;
                }
                Specialization::Interpretability => {
                    self.state.safety_research_this_turn += weight * INTERPRETABILITY_SAFETY_SHARE;
                }
            }
        }
        self.state.research_progress += gained;

        let mut paper_published = false;
        if self.state.research_progress >= research.paper_threshold {
            self.state.research_progress -= research.paper_threshold;
            self.state.papers_published += 1;
            self.state.reputation += research.paper_reputation_bonus;
            self.state.push_message(LOG_PAPER_PUBLISHED);
            paper_published = true;
        }
        ResearchReport {
            gained,
            paper_published,
        }
    }
}

pub(super) struct MaintenancePhase<'a> {
    state: &'a mut GameState,
}

impl<'a> MaintenancePhase<'a> {
    pub(super) const fn new(state: &'a mut GameState) -> Self {
        Self { state }
    }

    pub(super) fn run(&mut self, cfg: &EconomicConfig) -> MaintenanceOutcome {
        let cost = maintenance_cost(self.state.staff, self.state.has_pet, &cfg.maintenance);
        let outcome = settle_maintenance(
            self.state.money,
            cost,
            self.state.staff,
            self.state.has_upgrade(Upgrade::RetentionProgram),
            &cfg.maintenance,
        );
        self.state.money -= outcome.paid;
        if outcome.shortfall > 0 {
            self.state.push_message(LOG_MAINTENANCE_SHORTFALL);
        }
        if outcome.attrition_suppressed {
            self.state.push_message(LOG_ATTRITION_SUPPRESSED);
        } else if outcome.staff_lost > 0 || outcome.reputation_lost > 0 {
            self.state.staff -= outcome.staff_lost;
            self.state.reputation -= outcome.reputation_lost;
            self.state.push_message(LOG_ATTRITION);
        }
        outcome
    }
}

pub(super) struct OpponentPhase<'a> {
    state: &'a mut GameState,
}

impl<'a> OpponentPhase<'a> {
    pub(super) const fn new(state: &'a mut GameState) -> Self {
        Self { state }
    }

    /// Resolve every rival, then apply one folded doom change.
    pub(super) fn run(
        &mut self,
        rng: &mut ContextRng,
        cfg: &EconomicConfig,
    ) -> Result<(Vec<OpponentTurn>, DoomDelta), RngError> {
        let turn = self.state.turn;
        let mut turns = Vec::with_capacity(self.state.opponents.len());
        for opponent in &mut self.state.opponents {
            turns.push(opponent.take_turn(rng, turn, cfg.doom.opponent_factor)?);
        }
        for resolved in &turns {
            if self
                .state
                .opponent(&resolved.opponent)
                .is_some_and(|o| o.discovered && o.progress.discovered)
            {
                self.state
                    .push_message(format!("{LOG_OPPONENT_PROGRESS}.{}", resolved.opponent));
            }
        }

        let delta = DoomDelta {
            base: cfg.doom.base_per_turn,
            opponents: turns.iter().map(|t| t.doom_contribution).sum(),
            safety_reduction: self.state.safety_research_this_turn * cfg.doom.safety_weight,
            capability_increase: self.state.capability_research_this_turn
                * cfg.doom.capability_weight,
        };
        let before = self.state.doom;
        self.state.doom = delta.apply_to(before, self.state.max_doom);
        debug!(
            "turn {turn}: doom {before} -> {} (raw delta {:.3})",
            self.state.doom,
            delta.raw()
        );
        self.state.push_message(format!(
            "{LOG_DOOM_CHANGE}.{}",
            self.state.doom - before
        ));
        Ok((turns, delta))
    }
}

pub(super) struct BookkeepingPhase<'a> {
    state: &'a mut GameState,
}

impl<'a> BookkeepingPhase<'a> {
    pub(super) const fn new(state: &'a mut GameState) -> Self {
        Self { state }
    }

    pub(super) fn milestones(&mut self) -> Vec<Milestone> {
        events::check_milestones(self.state)
    }

    pub(super) fn deferred(&mut self, cfg: &EconomicConfig) -> Vec<DeferredKind> {
        events::tick_deferred(self.state, cfg)
    }

    /// Start the next turn: counter, action points, accumulators and RNG marker.
    pub(super) fn advance(&mut self, rng: &mut ContextRng, cfg: &EconomicConfig) {
        self.state.turn += 1;
        self.state.action_points =
            action_points_for(self.state.staff, &self.state.upgrades, cfg);
        self.state.safety_research_this_turn = 0.0;
        self.state.capability_research_this_turn = 0.0;
        rng.set_turn(self.state.turn);
    }
}

pub(super) struct TerminalPhase<'a> {
    state: &'a mut GameState,
}

impl<'a> TerminalPhase<'a> {
    pub(super) const fn new(state: &'a mut GameState) -> Self {
        Self { state }
    }

    /// Evaluate endings in priority order, then clamp resource floors.
    pub(super) fn run(&mut self) -> Option<Ending> {
        let ending = if self.state.doom >= self.state.max_doom {
            Some(Ending::DoomMaxed)
        } else if let Some(winner) = self.state.opponents.iter().find(|o| o.has_completed()) {
            Some(Ending::OpponentCompleted {
                opponent: winner.name.clone(),
            })
        } else if self.state.doom <= 0 {
            Some(Ending::DoomAverted)
        } else {
            None
        };
        if ending.is_some() {
            self.state.ending.clone_from(&ending);
        }
        self.state.clamp_resource_floors();
        ending
    }
}
