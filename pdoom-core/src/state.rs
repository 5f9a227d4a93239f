//! Game-state mutation contract shared by the turn pipeline and calculators.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use thiserror::Error;

use crate::actions::ActionId;
use crate::config::EconomicConfig;
use crate::events::{DeferredEvent, Milestone};
use crate::opponents::{Opponent, default_roster};

/// Selected actions for a turn; most turns fit inline.
pub type ActionSelection = SmallVec<[SelectedAction; 8]>;

/// One player-selected action, in selection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAction {
    pub id: ActionId,
    /// Handed to a subordinate at reduced cost and effectiveness.
    pub delegated: bool,
}

impl SelectedAction {
    #[must_use]
    pub const fn direct(id: ActionId) -> Self {
        Self {
            id,
            delegated: false,
        }
    }

    #[must_use]
    pub const fn delegated(id: ActionId) -> Self {
        Self {
            id,
            delegated: true,
        }
    }
}

/// One-time purchases that change the rules for the rest of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upgrade {
    /// Suppresses staff attrition on a turn with unpaid maintenance.
    RetentionProgram,
    /// Adds action points every turn.
    ManagementSystems,
}

impl Upgrade {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::RetentionProgram => "retention_program",
            Self::ManagementSystems => "management_systems",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Safety,
    Capabilities,
    Interpretability,
}

impl Specialization {
    pub const ALL: [Self; 3] = [Self::Safety, Self::Capabilities, Self::Interpretability];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Capabilities => "capabilities",
            Self::Interpretability => "interpretability",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Researcher {
    pub id: u32,
    pub specialization: Specialization,
    /// Research points contributed per turn.
    pub productivity: i32,
}

/// Decisions that block turn processing until the player answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogId {
    RegulatoryReview,
    InvestorMeeting,
}

impl DialogId {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::RegulatoryReview => "regulatory_review",
            Self::InvestorMeeting => "investor_meeting",
        }
    }

    /// Option keys offered to the player, in display order.
    #[must_use]
    pub const fn options(self) -> &'static [&'static str] {
        match self {
            Self::RegulatoryReview => &["cooperate", "stonewall"],
            Self::InvestorMeeting => &["accept_terms", "decline"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDialog {
    pub id: DialogId,
    /// Turn on which the dialog was raised.
    pub raised_on_turn: u32,
}

/// Whether a player-blocking dialog is open.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "dialog")]
pub enum DialogState {
    #[default]
    NoDialog,
    Dialog(PendingDialog),
}

impl DialogState {
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self, Self::Dialog(_))
    }

    #[must_use]
    pub const fn pending(&self) -> Option<&PendingDialog> {
        match self {
            Self::NoDialog => None,
            Self::Dialog(dialog) => Some(dialog),
        }
    }
}

/// How a game ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Ending {
    /// Doom reached its maximum.
    DoomMaxed,
    /// A rival lab reached completion first.
    OpponentCompleted { opponent: String },
    /// Doom was driven to zero.
    DoomAverted,
}

impl Ending {
    #[must_use]
    pub const fn is_victory(&self) -> bool {
        matches!(self, Self::DoomAverted)
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::DoomMaxed => "doom_maxed",
            Self::OpponentCompleted { .. } => "opponent_completed",
            Self::DoomAverted => "doom_averted",
        }
    }
}

impl fmt::Display for Ending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpponentCompleted { opponent } => write!(f, "opponent_completed({opponent})"),
            other => f.write_str(other.key()),
        }
    }
}

/// Errors raised by direct state mutations from the presentation layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("no dialog is pending")]
    NoPendingDialog,
    #[error("dialog `{dialog}` has no option {choice}")]
    InvalidDialogChoice { dialog: &'static str, choice: usize },
}

/// Mutable simulation state owned by a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub money: i64,
    pub staff: i32,
    pub reputation: i32,
    pub doom: i32,
    pub max_doom: i32,
    pub action_points: i32,
    pub turn: u32,
    pub compute: i32,
    /// Cost multiplier applied to compute purchases.
    pub compute_cost_multiplier: f64,
    pub research_progress: i32,
    pub papers_published: u32,
    /// Doom-reducing research accumulated this turn.
    pub safety_research_this_turn: f64,
    /// Doom-raising research accumulated this turn.
    pub capability_research_this_turn: f64,
    /// Working buffer for the current turn.
    pub messages: Vec<String>,
    pub message_history: VecDeque<String>,
    pub selected_actions: ActionSelection,
    pub opponents: Vec<Opponent>,
    pub researchers: Vec<Researcher>,
    pub upgrades: BTreeSet<Upgrade>,
    pub has_pet: bool,
    pub pending_dialog: DialogState,
    pub deferred_events: Vec<DeferredEvent>,
    pub milestones: BTreeSet<Milestone>,
    /// Turn whose events were already triggered; guards re-rolls after a blocked attempt.
    pub events_rolled_for_turn: Option<u32>,
    pub ending: Option<Ending>,
    /// Set when the last turn asked the presentation layer to resynchronise.
    pub ui_resync_pending: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(&EconomicConfig::default())
    }
}

impl GameState {
    /// Fresh lab built from configured starting resources.
    #[must_use]
    pub fn new(cfg: &EconomicConfig) -> Self {
        let start = &cfg.start;
        let upgrades = BTreeSet::new();
        Self {
            money: start.money,
            staff: start.staff,
            reputation: start.reputation,
            doom: start.doom,
            max_doom: cfg.max_doom,
            action_points: crate::economy::action_points_for(start.staff, &upgrades, cfg),
            turn: 0,
            compute: start.compute,
            compute_cost_multiplier: 1.0,
            research_progress: 0,
            papers_published: 0,
            safety_research_this_turn: 0.0,
            capability_research_this_turn: 0.0,
            messages: Vec::new(),
            message_history: VecDeque::new(),
            selected_actions: ActionSelection::new(),
            opponents: default_roster(),
            researchers: Vec::new(),
            upgrades,
            has_pet: false,
            pending_dialog: DialogState::NoDialog,
            deferred_events: Vec::new(),
            milestones: BTreeSet::new(),
            events_rolled_for_turn: None,
            ending: None,
            ui_resync_pending: false,
        }
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Move the working buffer into the history, keeping at most `cap` entries.
    pub fn roll_messages(&mut self, cap: usize) -> usize {
        let turn = self.turn;
        let moved = self.messages.len();
        self.message_history
            .extend(self.messages.drain(..).map(|msg| format!("t{turn}:{msg}")));
        while self.message_history.len() > cap {
            self.message_history.pop_front();
        }
        moved
    }

    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.ending.is_some()
    }

    #[must_use]
    pub fn has_upgrade(&self, upgrade: Upgrade) -> bool {
        self.upgrades.contains(&upgrade)
    }

    pub fn select_action(&mut self, action: SelectedAction) {
        self.selected_actions.push(action);
    }

    pub fn clear_selection(&mut self) {
        self.selected_actions.clear();
    }

    #[must_use]
    pub fn delegated_count(&self) -> usize {
        self.selected_actions.iter().filter(|a| a.delegated).count()
    }

    #[must_use]
    pub fn opponent(&self, name: &str) -> Option<&Opponent> {
        self.opponents.iter().find(|o| o.name == name)
    }

    pub fn next_researcher_id(&self) -> u32 {
        self.researchers
            .iter()
            .map(|r| r.id)
            .max()
            .map_or(1, |id| id.saturating_add(1))
    }

    /// Open a blocking dialog unless one is already pending.
    pub fn raise_dialog(&mut self, id: DialogId) -> bool {
        if self.pending_dialog.is_blocking() {
            return false;
        }
        self.pending_dialog = DialogState::Dialog(PendingDialog {
            id,
            raised_on_turn: self.turn,
        });
        true
    }

    /// Answer the pending dialog with the option at `choice`.
    ///
    /// # Errors
    ///
    /// Fails when no dialog is open or the option does not exist.
    pub fn resolve_dialog(&mut self, choice: usize) -> Result<DialogId, StateError> {
        crate::events::resolve_dialog(self, choice)
    }

    /// Enforce non-negative resources and `0 <= doom <= max_doom`.
    pub fn clamp_resource_floors(&mut self) {
        self.staff = self.staff.max(0);
        self.reputation = self.reputation.max(0);
        self.money = self.money.max(0);
        self.doom = self.doom.clamp(0, self.max_doom);
    }
}
