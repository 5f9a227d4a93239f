use std::time::Duration;
use thiserror::Error;

use crate::actions::{ActionError, ActionRegistry};
use crate::challenge::{ChallengeError, ChallengeExport};
use crate::config::EconomicConfig;
use crate::rng::ContextRng;
use crate::seed::{SeedError, SeedSource};
use crate::state::{DialogId, GameState, SelectedAction, StateError};
use crate::turn::{
    NoopObserver, TickStatus, TurnContext, TurnError, TurnObserver, TurnRejection, TurnReport,
    TurnSequencer,
};

/// Why `end_turn` did not produce a report.
#[derive(Debug, Error, PartialEq)]
pub enum EndTurnError {
    #[error("turn rejected: {0}")]
    Rejected(TurnRejection),
    #[error(transparent)]
    Failed(#[from] TurnError),
}

/// High-level session wrapper binding the state, its RNG, and the turn sequencer.
#[derive(Debug)]
pub struct GameSession {
    state: GameState,
    rng: ContextRng,
    sequencer: TurnSequencer,
    cfg: EconomicConfig,
    actions: ActionRegistry,
}

impl GameSession {
    /// Construct a fresh session from a seed string and configuration.
    #[must_use]
    pub fn new(seed: impl Into<String>, cfg: EconomicConfig) -> Self {
        Self {
            state: GameState::new(&cfg),
            rng: ContextRng::new(seed),
            sequencer: TurnSequencer::new(cfg.processing_timeout()),
            cfg,
            actions: ActionRegistry::standard(),
        }
    }

    /// Resolve `source` and start a session on the resulting seed.
    ///
    /// # Errors
    ///
    /// Returns an error when the seed source is blank.
    pub fn from_source(source: &SeedSource, cfg: EconomicConfig) -> Result<Self, SeedError> {
        Ok(Self::new(source.resolve()?, cfg))
    }

    /// Replace the action registry, e.g. with a restricted set.
    #[must_use]
    pub fn with_actions(mut self, actions: ActionRegistry) -> Self {
        self.actions = actions;
        self
    }

    #[must_use]
    pub fn seed(&self) -> &str {
        self.rng.base_seed()
    }

    /// Borrow the underlying immutable game state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Apply a closure to the mutable game state.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut GameState) -> R) -> R {
        f(&mut self.state)
    }

    #[must_use]
    pub const fn rng(&self) -> &ContextRng {
        &self.rng
    }

    #[must_use]
    pub const fn config(&self) -> &EconomicConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn sequencer(&self) -> &TurnSequencer {
        &self.sequencer
    }

    #[must_use]
    pub const fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Queue an action for the next turn.
    ///
    /// # Errors
    ///
    /// Rejects unknown actions, invalid delegation and selections beyond the
    /// remaining action points.
    pub fn select_action(&mut self, selected: SelectedAction) -> Result<(), ActionError> {
        self.actions.validate_selection(&self.state, &self.cfg, selected)?;
        self.state.select_action(selected);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.state.clear_selection();
    }

    /// Answer the pending dialog.
    ///
    /// # Errors
    ///
    /// Fails when no dialog is open or `choice` is out of range.
    pub fn resolve_dialog(&mut self, choice: usize) -> Result<DialogId, StateError> {
        self.state.resolve_dialog(choice)
    }

    /// Enter `Processing` without running phases yet.
    ///
    /// # Errors
    ///
    /// Returns the sequencer's rejection signal.
    pub fn begin_turn(&mut self) -> Result<(), TurnRejection> {
        self.sequencer.begin_turn(&self.state)
    }

    /// Run the phases of a turn already begun.
    ///
    /// # Errors
    ///
    /// Surfaces phase failures; see [`TurnSequencer::process_turn`].
    pub fn process_turn(
        &mut self,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnReport, TurnError> {
        let mut ctx = TurnContext {
            state: &mut self.state,
            rng: &mut self.rng,
            cfg: &self.cfg,
            actions: &self.actions,
            observer,
        };
        self.sequencer.process_turn(&mut ctx)
    }

    /// Begin and process one turn, notifying `observer` at the end.
    ///
    /// # Errors
    ///
    /// Returns the rejection or the phase failure.
    pub fn end_turn_with(
        &mut self,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnReport, EndTurnError> {
        self.begin_turn().map_err(EndTurnError::Rejected)?;
        Ok(self.process_turn(observer)?)
    }

    /// Begin and process one turn without a presentation observer.
    ///
    /// # Errors
    ///
    /// Returns the rejection or the phase failure.
    pub fn end_turn(&mut self) -> Result<TurnReport, EndTurnError> {
        self.end_turn_with(&mut NoopObserver)
    }

    /// Advance the stuck-processing timer.
    pub fn tick(&mut self, elapsed: Duration) -> TickStatus {
        self.sequencer.tick(elapsed)
    }

    /// Manual "reset stuck state" control.
    pub fn reset_stuck_state(&mut self) {
        self.sequencer.force_reset();
    }

    /// Clear the resync flag once the presentation layer has redrawn.
    pub fn acknowledge_resync(&mut self) {
        self.state.ui_resync_pending = false;
    }

    /// Snapshot the RNG call history for sharing.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be signed.
    pub fn export_challenge(&self) -> Result<ChallengeExport, ChallengeError> {
        self.rng.challenge_export(self.state.turn)
    }

    /// Consume the session, returning the underlying game state.
    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }
}
