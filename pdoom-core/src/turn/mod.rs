//! Turn sequencer: a non-reentrant state machine that drives one turn through
//! a fixed twelve-phase pipeline.
//!
//! The sequencer never rolls back. If a phase fails, the mutations applied by
//! earlier phases of that turn stay in place, the failure is logged and
//! returned, and the machine goes back to [`ProcessingState::Idle`] so the
//! caller can start a fresh attempt.

mod phase;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::actions::{ActionError, ActionRegistry, ActionReport};
use crate::config::EconomicConfig;
use crate::economy::{DoomDelta, MaintenanceOutcome};
use crate::events::{DeferredKind, Milestone, TriggeredEvent};
use crate::opponents::OpponentTurn;
use crate::rng::{ContextRng, RngError};
use crate::state::{DialogId, Ending, GameState};

pub use phase::ResearchReport;
use phase::{
    ActionPhase, BookkeepingPhase, DialogGate, EventsPhase, MaintenancePhase, OpponentPhase,
    ProductivityPhase, TerminalPhase,
};

/// Re-entrancy guard for turn processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Idle,
    Processing,
    /// Terminal; normalised to `Idle` before control returns to the caller.
    Complete,
    /// Terminal; normalised to `Idle` before control returns to the caller.
    Error,
}

/// One ordered step of the per-turn pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Events,
    DialogGate,
    MessageRollover,
    Actions,
    Productivity,
    Maintenance,
    Opponents,
    Milestones,
    DeferredEvents,
    Advance,
    TerminalCheck,
    UiSync,
}

impl TurnPhase {
    pub const ORDER: [Self; 12] = [
        Self::Events,
        Self::DialogGate,
        Self::MessageRollover,
        Self::Actions,
        Self::Productivity,
        Self::Maintenance,
        Self::Opponents,
        Self::Milestones,
        Self::DeferredEvents,
        Self::Advance,
        Self::TerminalCheck,
        Self::UiSync,
    ];

    /// Position in the pipeline, starting at 1.
    #[must_use]
    pub const fn number(self) -> usize {
        self as usize + 1
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::DialogGate => "dialog_gate",
            Self::MessageRollover => "message_rollover",
            Self::Actions => "actions",
            Self::Productivity => "productivity",
            Self::Maintenance => "maintenance",
            Self::Opponents => "opponents",
            Self::Milestones => "milestones",
            Self::DeferredEvents => "deferred_events",
            Self::Advance => "advance",
            Self::TerminalCheck => "terminal_check",
            Self::UiSync => "ui_sync",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.number(), self.key())
    }
}

/// Expected refusals to start a turn. These are signals, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRejection {
    AlreadyProcessing,
    GameOver,
}

impl fmt::Display for TurnRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyProcessing => "a turn is already being processed",
            Self::GameOver => "the game is over",
        })
    }
}

/// Result of advancing the processing timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Nothing is processing.
    Idle,
    Waiting { remaining: Duration },
    /// The timer expired and the sequencer force-reset to idle.
    TimedOut,
}

/// Presentation hook notified at the end of every completed turn.
pub trait TurnObserver {
    fn ui_resync(&mut self, state: &GameState);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TurnObserver for NoopObserver {
    fn ui_resync(&mut self, _state: &GameState) {}
}

/// Failure raised inside a single phase.
#[derive(Debug, Error, PartialEq)]
pub enum PhaseError {
    #[error(transparent)]
    Rng(#[from] RngError),
    #[error(transparent)]
    Action(#[from] ActionError),
}

#[derive(Debug, Error, PartialEq)]
pub enum TurnError {
    #[error("process_turn called without a successful begin_turn")]
    NotProcessing,
    #[error("phase {phase} failed on turn {turn}: {source}")]
    PhaseFailed {
        phase: TurnPhase,
        turn: u32,
        #[source]
        source: PhaseError,
    },
}

/// Collaborators a turn runs against.
pub struct TurnContext<'a> {
    pub state: &'a mut GameState,
    pub rng: &'a mut ContextRng,
    pub cfg: &'a EconomicConfig,
    pub actions: &'a ActionRegistry,
    pub observer: &'a mut dyn TurnObserver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TurnOutcome {
    /// The turn resolved and the counter moved on.
    Advanced,
    /// A pending dialog stopped the turn before anything but events ran.
    Blocked { dialog: DialogId },
    Ended { ending: Ending },
}

/// Everything that happened during one turn attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    /// Turn number the attempt started on.
    pub turn: u32,
    pub outcome: TurnOutcome,
    pub phases_run: Vec<TurnPhase>,
    pub events: Vec<TriggeredEvent>,
    pub messages_archived: usize,
    pub actions: Vec<ActionReport>,
    pub research: Option<ResearchReport>,
    pub maintenance: Option<MaintenanceOutcome>,
    pub opponents: Vec<OpponentTurn>,
    pub doom_delta: Option<DoomDelta>,
    pub milestones: Vec<Milestone>,
    pub deferred_resolved: Vec<DeferredKind>,
}

impl TurnReport {
    fn new(turn: u32) -> Self {
        Self {
            turn,
            outcome: TurnOutcome::Advanced,
            phases_run: Vec::with_capacity(TurnPhase::ORDER.len()),
            events: Vec::new(),
            messages_archived: 0,
            actions: Vec::new(),
            research: None,
            maintenance: None,
            opponents: Vec::new(),
            doom_delta: None,
            milestones: Vec::new(),
            deferred_resolved: Vec::new(),
        }
    }
}

enum PhaseFlow {
    Continue,
    Block(DialogId),
}

/// Drives turns through the phase pipeline one at a time.
#[derive(Debug, Clone)]
pub struct TurnSequencer {
    state: ProcessingState,
    timeout: Duration,
    remaining: Option<Duration>,
    last_terminal: Option<ProcessingState>,
}

impl Default for TurnSequencer {
    fn default() -> Self {
        Self::new(EconomicConfig::default().processing_timeout())
    }
}

impl TurnSequencer {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            state: ProcessingState::Idle,
            timeout,
            remaining: None,
            last_terminal: None,
        }
    }

    #[must_use]
    pub const fn processing_state(&self) -> ProcessingState {
        self.state
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.state == ProcessingState::Processing
    }

    /// Terminal state reached by the most recent attempt, before normalisation.
    #[must_use]
    pub const fn last_terminal(&self) -> Option<ProcessingState> {
        self.last_terminal
    }

    /// Time left before a stuck turn is force-reset.
    #[must_use]
    pub const fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    /// Move from `Idle` to `Processing`.
    ///
    /// # Errors
    ///
    /// Returns a [`TurnRejection`] without changing anything when a turn is
    /// already in flight or the game has ended.
    pub fn begin_turn(&mut self, state: &GameState) -> Result<(), TurnRejection> {
        if self.state != ProcessingState::Idle {
            warn!("turn {} rejected: already processing", state.turn);
            return Err(TurnRejection::AlreadyProcessing);
        }
        if state.is_game_over() {
            warn!("turn {} rejected: game over", state.turn);
            return Err(TurnRejection::GameOver);
        }
        self.state = ProcessingState::Processing;
        self.remaining = Some(self.timeout);
        debug!("turn {} processing started", state.turn);
        Ok(())
    }

    /// Advance the stuck-processing timer by `elapsed`.
    pub fn tick(&mut self, elapsed: Duration) -> TickStatus {
        if self.state != ProcessingState::Processing {
            return TickStatus::Idle;
        }
        let remaining = self.remaining.unwrap_or(self.timeout).saturating_sub(elapsed);
        if remaining.is_zero() {
            warn!(
                "turn processing exceeded {:?}; resetting to idle",
                self.timeout
            );
            self.force_reset();
            return TickStatus::TimedOut;
        }
        self.remaining = Some(remaining);
        TickStatus::Waiting { remaining }
    }

    /// Manual recovery for a stuck or failed turn.
    pub fn force_reset(&mut self) {
        self.state = ProcessingState::Idle;
        self.remaining = None;
    }

    fn finish(&mut self, terminal: ProcessingState) {
        self.state = terminal;
        self.last_terminal = Some(terminal);
        self.force_reset();
    }

    /// Run every phase of the current turn in order.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::NotProcessing`] without `begin_turn`, or
    /// [`TurnError::PhaseFailed`] naming the phase that failed. Earlier
    /// phases of a failed turn remain applied.
    pub fn process_turn(&mut self, ctx: &mut TurnContext<'_>) -> Result<TurnReport, TurnError> {
        if self.state != ProcessingState::Processing {
            return Err(TurnError::NotProcessing);
        }
        let turn = ctx.state.turn;
        let mut report = TurnReport::new(turn);
        match Self::run_phases(ctx, &mut report) {
            Ok(outcome) => {
                match &outcome {
                    TurnOutcome::Advanced => info!("turn {turn} complete"),
                    TurnOutcome::Blocked { dialog } => {
                        info!("turn {turn} blocked by dialog `{}`", dialog.key());
                    }
                    TurnOutcome::Ended { ending } => info!("game ended on turn {turn}: {ending}"),
                }
                report.outcome = outcome;
                self.finish(ProcessingState::Complete);
                Ok(report)
            }
            Err((phase, source)) => {
                error!("turn {turn} failed in phase {phase}: {source}");
                self.finish(ProcessingState::Error);
                Err(TurnError::PhaseFailed {
                    phase,
                    turn,
                    source,
                })
            }
        }
    }

    fn run_phases(
        ctx: &mut TurnContext<'_>,
        report: &mut TurnReport,
    ) -> Result<TurnOutcome, (TurnPhase, PhaseError)> {
        for phase in TurnPhase::ORDER {
            debug!("turn {}: phase {phase}", report.turn);
            report.phases_run.push(phase);
            match Self::run_phase(phase, ctx, report).map_err(|err| (phase, err))? {
                PhaseFlow::Continue => {}
                PhaseFlow::Block(dialog) => return Ok(TurnOutcome::Blocked { dialog }),
            }
        }
        Ok(match ctx.state.ending.clone() {
            Some(ending) => TurnOutcome::Ended { ending },
            None => TurnOutcome::Advanced,
        })
    }

    fn run_phase(
        phase: TurnPhase,
        ctx: &mut TurnContext<'_>,
        report: &mut TurnReport,
    ) -> Result<PhaseFlow, PhaseError> {
        match phase {
            TurnPhase::Events => {
                report.events = EventsPhase::new(ctx.state).run(ctx.rng, ctx.cfg)?;
            }
            TurnPhase::DialogGate => {
                if let Some(dialog) = DialogGate::new(ctx.state).blocking() {
                    return Ok(PhaseFlow::Block(dialog));
                }
            }
            TurnPhase::MessageRollover => {
                report.messages_archived = ctx.state.roll_messages(ctx.cfg.message_history_cap);
            }
            TurnPhase::Actions => {
                report.actions = ActionPhase::new(ctx.state).run(ctx.actions, ctx.rng, ctx.cfg)?;
            }
            TurnPhase::Productivity => {
                report.research = Some(ProductivityPhase::new(ctx.state).run(ctx.cfg));
            }
            TurnPhase::Maintenance => {
                report.maintenance = Some(MaintenancePhase::new(ctx.state).run(ctx.cfg));
            }
            TurnPhase::Opponents => {
                let (turns, delta) = OpponentPhase::new(ctx.state).run(ctx.rng, ctx.cfg)?;
                report.opponents = turns;
                report.doom_delta = Some(delta);
            }
            TurnPhase::Milestones => {
                report.milestones = BookkeepingPhase::new(ctx.state).milestones();
            }
            TurnPhase::DeferredEvents => {
                report.deferred_resolved = BookkeepingPhase::new(ctx.state).deferred(ctx.cfg);
            }
            TurnPhase::Advance => {
                BookkeepingPhase::new(ctx.state).advance(ctx.rng, ctx.cfg);
            }
            TurnPhase::TerminalCheck => {
                TerminalPhase::new(ctx.state).run();
            }
            TurnPhase::UiSync => {
                ctx.observer.ui_resync(ctx.state);
                ctx.state.ui_resync_pending = true;
            }
        }
        Ok(PhaseFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionId;
    use crate::state::SelectedAction;

    struct Harness {
        state: GameState,
        rng: ContextRng,
        cfg: EconomicConfig,
        actions: ActionRegistry,
        observer: CountingObserver,
    }

    #[derive(Default)]
    struct CountingObserver {
        resyncs: usize,
        last_turn: Option<u32>,
    }

    impl TurnObserver for CountingObserver {
        fn ui_resync(&mut self, state: &GameState) {
            self.resyncs += 1;
            self.last_turn = Some(state.turn);
        }
    }

    impl Harness {
        fn new(seed: &str) -> Self {
            let mut cfg = EconomicConfig::default();
            cfg.events.random_chance = 0.0;
            Self {
                state: GameState::new(&cfg),
                rng: ContextRng::new(seed),
                cfg,
                actions: ActionRegistry::standard(),
                observer: CountingObserver::default(),
            }
        }

        fn run(&mut self, sequencer: &mut TurnSequencer) -> Result<TurnReport, TurnError> {
            let mut ctx = TurnContext {
                state: &mut self.state,
                rng: &mut self.rng,
                cfg: &self.cfg,
                actions: &self.actions,
                observer: &mut self.observer,
            };
            sequencer.process_turn(&mut ctx)
        }
    }

    #[test]
    fn phase_order_is_fixed() {
        let numbers: Vec<usize> = TurnPhase::ORDER.iter().map(|p| p.number()).collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
        assert_eq!(TurnPhase::Opponents.to_string(), "7:opponents");
    }

    #[test]
    fn begin_turn_twice_is_rejected() {
        let harness = Harness::new("reentry");
        let mut sequencer = TurnSequencer::default();
        assert_eq!(sequencer.begin_turn(&harness.state), Ok(()));
        assert_eq!(
            sequencer.begin_turn(&harness.state),
            Err(TurnRejection::AlreadyProcessing)
        );
        assert_eq!(harness.state.turn, 0);
        assert!(sequencer.is_processing());
    }

    #[test]
    fn process_without_begin_is_an_error() {
        let mut harness = Harness::new("nobegin");
        let mut sequencer = TurnSequencer::default();
        assert_eq!(harness.run(&mut sequencer), Err(TurnError::NotProcessing));
        assert_eq!(harness.state.turn, 0);
    }

    #[test]
    fn completed_turn_runs_all_phases_and_returns_to_idle() {
        let mut harness = Harness::new("complete");
        let mut sequencer = TurnSequencer::default();
        harness
            .state
            .select_action(SelectedAction::direct(ActionId::SafetyResearch));
        sequencer.begin_turn(&harness.state).unwrap();
        let report = harness.run(&mut sequencer).unwrap();
        assert_eq!(report.turn, 0);
        assert_eq!(report.outcome, TurnOutcome::Advanced);
        assert_eq!(report.phases_run, TurnPhase::ORDER.to_vec());
        assert_eq!(report.actions.len(), 1);
        assert_eq!(harness.state.turn, 1);
        assert_eq!(harness.rng.turn(), 1);
        assert_eq!(sequencer.processing_state(), ProcessingState::Idle);
        assert_eq!(sequencer.last_terminal(), Some(ProcessingState::Complete));
        assert_eq!(harness.observer.resyncs, 1);
        assert_eq!(harness.observer.last_turn, Some(1));
        assert!(harness.state.ui_resync_pending);
    }

    #[test]
    fn pending_dialog_blocks_without_advancing() {
        let mut harness = Harness::new("blocked");
        harness.state.raise_dialog(DialogId::RegulatoryReview);
        harness
            .state
            .select_action(SelectedAction::direct(ActionId::HireStaff));
        let mut sequencer = TurnSequencer::default();
        sequencer.begin_turn(&harness.state).unwrap();
        let report = harness.run(&mut sequencer).unwrap();
        assert_eq!(
            report.outcome,
            TurnOutcome::Blocked {
                dialog: DialogId::RegulatoryReview
            }
        );
        assert_eq!(
            report.phases_run,
            vec![TurnPhase::Events, TurnPhase::DialogGate]
        );
        assert_eq!(harness.state.turn, 0);
        assert_eq!(harness.state.selected_actions.len(), 1);
        assert_eq!(sequencer.processing_state(), ProcessingState::Idle);
    }

    #[test]
    fn phase_failure_surfaces_and_keeps_partial_mutation() {
        let mut harness = Harness::new("failure");
        harness.actions = ActionRegistry::default();
        harness.state.push_message("carried");
        harness
            .state
            .select_action(SelectedAction::direct(ActionId::Scout));
        let mut sequencer = TurnSequencer::default();
        sequencer.begin_turn(&harness.state).unwrap();
        let err = harness.run(&mut sequencer).unwrap_err();
        assert_eq!(
            err,
            TurnError::PhaseFailed {
                phase: TurnPhase::Actions,
                turn: 0,
                source: PhaseError::Action(ActionError::UnknownAction(ActionId::Scout)),
            }
        );
        // Message rollover ran before the failing phase and is not undone.
        assert_eq!(harness.state.message_history.len(), 1);
        assert_eq!(harness.state.turn, 0);
        assert_eq!(sequencer.processing_state(), ProcessingState::Idle);
        assert_eq!(sequencer.last_terminal(), Some(ProcessingState::Error));
        assert!(sequencer.begin_turn(&harness.state).is_ok());
    }

    #[test]
    fn timeout_force_resets_processing() {
        let harness = Harness::new("timeout");
        let mut sequencer = TurnSequencer::new(Duration::from_millis(100));
        assert_eq!(sequencer.tick(Duration::from_millis(50)), TickStatus::Idle);
        sequencer.begin_turn(&harness.state).unwrap();
        assert_eq!(
            sequencer.tick(Duration::from_millis(60)),
            TickStatus::Waiting {
                remaining: Duration::from_millis(40)
            }
        );
        assert_eq!(
            sequencer.tick(Duration::from_millis(40)),
            TickStatus::TimedOut
        );
        assert_eq!(sequencer.processing_state(), ProcessingState::Idle);
        assert!(sequencer.begin_turn(&harness.state).is_ok());
    }

    #[test]
    fn game_over_rejects_new_turns() {
        let mut harness = Harness::new("over");
        harness.state.ending = Some(Ending::DoomMaxed);
        let mut sequencer = TurnSequencer::default();
        assert_eq!(
            sequencer.begin_turn(&harness.state),
            Err(TurnRejection::GameOver)
        );
        assert_eq!(sequencer.processing_state(), ProcessingState::Idle);
    }
}
