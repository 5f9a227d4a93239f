use anyhow::{Context, Result};
use log::{debug, info};
use pdoom_core::{ChallengeExport, EconomicConfig, GameSession, GameState, TurnOutcome};
use serde::{Deserialize, Serialize};

use crate::logic::policy::{GameplayStrategy, PlayerPolicy};

/// Configuration for a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: String,
    pub strategy: GameplayStrategy,
    pub max_turns: u32,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(seed: impl Into<String>, strategy: GameplayStrategy) -> Self {
        Self {
            seed: seed.into(),
            strategy,
            max_turns: 100,
        }
    }

    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}

/// Snapshot of an answered dialog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub turn: u32,
    pub dialog: String,
    pub choice: String,
    pub rationale: Option<String>,
}

/// Final numbers of one automated game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: String,
    pub strategy: GameplayStrategy,
    pub turns_played: u32,
    pub ending: Option<String>,
    pub victory: bool,
    pub money: i64,
    pub staff: i32,
    pub reputation: i32,
    pub doom: i32,
    pub max_doom: i32,
    pub papers_published: u32,
    pub actions_executed: usize,
    pub actions_skipped: usize,
    pub blocked_attempts: usize,
    pub decisions: Vec<DecisionRecord>,
    pub total_rng_calls: usize,
    pub signature: String,
}

impl RunSummary {
    fn from_session(
        config: &SimulationConfig,
        state: &GameState,
        tally: &RunTally,
        export: &ChallengeExport,
    ) -> Self {
        Self {
            seed: config.seed.clone(),
            strategy: config.strategy,
            turns_played: state.turn,
            ending: state.ending.as_ref().map(ToString::to_string),
            victory: state.ending.as_ref().is_some_and(|ending| ending.is_victory()),
            money: state.money,
            staff: state.staff,
            reputation: state.reputation,
            doom: state.doom,
            max_doom: state.max_doom,
            papers_published: state.papers_published,
            actions_executed: tally.executed,
            actions_skipped: tally.skipped,
            blocked_attempts: tally.blocked,
            decisions: tally.decisions.clone(),
            total_rng_calls: export.total_rng_calls,
            signature: export.signature.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct RunTally {
    executed: usize,
    skipped: usize,
    blocked: usize,
    decisions: Vec<DecisionRecord>,
}

/// One finished game: the summary plus its shareable export.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub export: ChallengeExport,
}

/// Result of playing one seed twice with the same strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayCheck {
    pub seed: String,
    pub first_signature: String,
    pub second_signature: String,
    pub states_match: bool,
}

impl ReplayCheck {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.states_match && self.first_signature == self.second_signature
    }
}

/// Core deterministic simulation harness used by the tester.
pub struct SimulationSession {
    session: GameSession,
    config: SimulationConfig,
    tally: RunTally,
}

impl SimulationSession {
    #[must_use]
    pub fn new(config: SimulationConfig, economy: EconomicConfig) -> Self {
        Self {
            session: GameSession::new(config.seed.clone(), economy),
            config,
            tally: RunTally::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        self.session.state()
    }

    /// Answer any open dialog, queue the policy's plan and end the turn.
    ///
    /// # Errors
    ///
    /// Returns an error when the core rejects the turn or a phase fails.
    pub fn advance(&mut self, policy: &mut dyn PlayerPolicy) -> Result<TurnOutcome> {
        if let Some(pending) = self.session.state().pending_dialog.pending() {
            let dialog = pending.id;
            let decision = policy.answer_dialog(self.session.state(), dialog);
            let turn = self.session.state().turn;
            self.session
                .resolve_dialog(decision.choice_index)
                .with_context(|| format!("{} answered {} badly", policy.name(), dialog.key()))?;
            self.tally.decisions.push(DecisionRecord {
                turn,
                dialog: dialog.key().to_string(),
                choice: dialog.options()[decision.choice_index].to_string(),
                rationale: decision.rationale,
            });
        }

        self.session.clear_selection();
        let plan = policy.plan_turn(self.session.state(), self.session.actions());
        for pick in plan {
            if let Err(err) = self.session.select_action(pick) {
                debug!("{} selection {} rejected: {err}", policy.name(), pick.id);
            }
        }

        let turn = self.session.state().turn;
        let report = self
            .session
            .end_turn()
            .with_context(|| format!("seed {} failed on turn {turn}", self.config.seed))?;
        let executed = report.actions.iter().filter(|a| a.executed()).count();
        self.tally.executed += executed;
        self.tally.skipped += report.actions.len() - executed;
        if matches!(report.outcome, TurnOutcome::Blocked { .. }) {
            self.tally.blocked += 1;
        }
        Ok(report.outcome)
    }

    /// Play until the game ends or the turn limit is reached.
    ///
    /// # Errors
    ///
    /// Propagates [`SimulationSession::advance`] failures and export errors.
    pub fn run(mut self, policy: &mut dyn PlayerPolicy) -> Result<RunOutcome> {
        // A blocked attempt does not advance the turn, so bound attempts too.
        let max_attempts = self.config.max_turns.saturating_mul(2);
        let mut attempts = 0;
        while !self.session.state().is_game_over()
            && self.session.state().turn < self.config.max_turns
            && attempts < max_attempts
        {
            attempts += 1;
            self.advance(policy)?;
        }

        let export = self
            .session
            .export_challenge()
            .context("failed to export challenge")?;
        let summary =
            RunSummary::from_session(&self.config, self.session.state(), &self.tally, &export);
        info!(
            "seed {} ({}) finished after {} turns: {}",
            summary.seed,
            summary.strategy,
            summary.turns_played,
            summary.ending.as_deref().unwrap_or("turn limit")
        );
        Ok(RunOutcome { summary, export })
    }
}

/// Play one game on `config` with a fresh policy.
///
/// # Errors
///
/// Returns an error when the game cannot be played to completion.
pub fn run_game(config: SimulationConfig, economy: EconomicConfig) -> Result<RunOutcome> {
    let mut policy = config.strategy.create_policy();
    SimulationSession::new(config, economy).run(policy.as_mut())
}

/// Play `config` twice and compare the outcomes.
///
/// # Errors
///
/// Returns an error when either run fails.
pub fn replay_check(config: &SimulationConfig, economy: &EconomicConfig) -> Result<ReplayCheck> {
    let first = run_game(config.clone(), economy.clone())?;
    let second = run_game(config.clone(), economy.clone())?;
    let states_match = first.summary.turns_played == second.summary.turns_played
        && first.summary.ending == second.summary.ending
        && first.summary.money == second.summary.money
        && first.summary.doom == second.summary.doom
        && first.export.history.len() == second.export.history.len();
    Ok(ReplayCheck {
        seed: config.seed.clone(),
        first_signature: first.export.signature,
        second_signature: second.export.signature,
        states_match,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_respect_turn_limit() {
        for strategy in [
            GameplayStrategy::SafetyFirst,
            GameplayStrategy::Growth,
            GameplayStrategy::Balanced,
        ] {
            let config = SimulationConfig::new("SIM-LIMIT", strategy).with_max_turns(12);
            let outcome = run_game(config, EconomicConfig::default()).unwrap();
            assert!(outcome.summary.turns_played <= 12);
            assert_eq!(outcome.summary.turns_played, outcome.export.turns_played);
            assert!(outcome.export.verify().is_ok());
        }
    }

    #[test]
    fn replay_check_passes_for_same_seed() {
        let config = SimulationConfig::new("SIM-REPLAY", GameplayStrategy::Balanced)
            .with_max_turns(20);
        let check = replay_check(&config, &EconomicConfig::default()).unwrap();
        assert!(check.passed(), "{check:?}");
    }

    #[test]
    fn dialogs_are_answered_and_recorded() {
        let mut economy = EconomicConfig::default();
        economy.events.random_chance = 0.0;
        let config = SimulationConfig::new("SIM-DIALOG", GameplayStrategy::SafetyFirst)
            .with_max_turns(8);
        let outcome = run_game(config, economy).unwrap();
        if outcome.summary.turns_played > 5 {
            assert!(
                outcome
                    .summary
                    .decisions
                    .iter()
                    .any(|d| d.dialog == "investor_meeting" && d.choice == "decline")
            );
            assert!(outcome.summary.blocked_attempts >= 1);
        }
    }

    #[test]
    fn session_state_is_reachable_after_advancing() {
        let config = SimulationConfig::new("SIM-STATE", GameplayStrategy::Growth);
        let mut sim = SimulationSession::new(config, EconomicConfig::default());
        let mut policy = GameplayStrategy::Growth.create_policy();
        sim.advance(policy.as_mut()).unwrap();
        assert_eq!(sim.state().turn, 1);
        assert!(sim.state().money >= 0);
    }
}
