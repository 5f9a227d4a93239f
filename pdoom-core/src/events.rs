//! Random, scheduled and deferred events, dialog resolution and milestones.
use serde::{Deserialize, Serialize};

use crate::config::EconomicConfig;
use crate::constants::{
    COMPUTE_SURGE_TURN, INVESTOR_ACCEPT_DOOM, INVESTOR_ACCEPT_FUNDS, INVESTOR_DECLINE_REPUTATION,
    INVESTOR_MEETING_TURN, LOG_DIALOG_RESOLVED, LOG_EVENT_BREAKTHROUGH, LOG_EVENT_COMPUTE_SURGE,
    LOG_EVENT_CONFERENCE, LOG_EVENT_CONFERENCE_SCHEDULED, LOG_EVENT_INVESTIGATION,
    LOG_EVENT_INVESTOR, LOG_EVENT_POACHED, LOG_EVENT_REGULATORY, LOG_EVENT_REGULATORY_DEFERRED,
    LOG_EVENT_WINDFALL, LOG_MILESTONE, MILESTONE_REPUTATION_BONUS, MILESTONE_STAFF_FIVE,
    MILESTONE_STAFF_TEN, REGULATORY_COOPERATE_COST, REGULATORY_COOPERATE_DOOM, REGULATORY_STONEWALL_REPUTATION,
    STAFF_POACHED_LOSS,
};
use crate::rng::{ContextRng, RngError};
use crate::state::{DialogId, DialogState, GameState, StateError};

/// Events that can fire at random at the start of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FundingWindfall,
    StaffPoached,
    LabBreakthrough,
    RegulatoryReview,
    SafetyConference,
}

impl EventKind {
    pub const ALL: [Self; 5] = [
        Self::FundingWindfall,
        Self::StaffPoached,
        Self::LabBreakthrough,
        Self::RegulatoryReview,
        Self::SafetyConference,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::FundingWindfall => "funding_windfall",
            Self::StaffPoached => "staff_poached",
            Self::LabBreakthrough => "lab_breakthrough",
            Self::RegulatoryReview => "regulatory_review",
            Self::SafetyConference => "safety_conference",
        }
    }
}

/// Events pinned to a fixed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledEvent {
    InvestorMeeting,
    ComputePriceSurge,
}

impl ScheduledEvent {
    #[must_use]
    pub const fn for_turn(turn: u32) -> Option<Self> {
        match turn {
            INVESTOR_MEETING_TURN => Some(Self::InvestorMeeting),
            COMPUTE_SURGE_TURN => Some(Self::ComputePriceSurge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "event")]
pub enum TriggeredEvent {
    Random(EventKind),
    Scheduled(ScheduledEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferredKind {
    SafetyConference,
    /// Fallout from an espionage scandal.
    Investigation,
    /// A review that fired while another dialog was open.
    RegulatoryReview,
}

/// An effect queued to resolve a fixed number of turns later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredEvent {
    pub kind: DeferredKind,
    pub turns_remaining: u32,
}

/// One-time achievements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    StaffFive,
    StaffTen,
    FirstPaper,
}

impl Milestone {
    pub const ALL: [Self; 3] = [Self::StaffFive, Self::StaffTen, Self::FirstPaper];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::StaffFive => "staff_five",
            Self::StaffTen => "staff_ten",
            Self::FirstPaper => "first_paper",
        }
    }

    fn reached(self, state: &GameState) -> bool {
        match self {
            Self::StaffFive => state.staff >= MILESTONE_STAFF_FIVE,
            Self::StaffTen => state.staff >= MILESTONE_STAFF_TEN,
            Self::FirstPaper => state.papers_published >= 1,
        }
    }
}

/// Roll this turn's random event and fire any scheduled one.
///
/// Runs at most once per turn: a turn blocked by a dialog does not roll again
/// when it is retried.
///
/// # Errors
///
/// Propagates RNG errors from event selection.
pub fn trigger_turn_events(
    state: &mut GameState,
    rng: &mut ContextRng,
    cfg: &EconomicConfig,
) -> Result<Vec<TriggeredEvent>, RngError> {
    let turn = state.turn;
    if state.events_rolled_for_turn == Some(turn) {
        return Ok(Vec::new());
    }
    state.events_rolled_for_turn = Some(turn);

    let mut fired = Vec::new();
    if let Some(event) = ScheduledEvent::for_turn(turn) {
        apply_scheduled(state, event, cfg);
        fired.push(TriggeredEvent::Scheduled(event));
    }
    if rng.draw_float(&format!("random_event_turn_{turn}")) < cfg.events.random_chance {
        let kind = *rng.choose(&EventKind::ALL, &format!("random_event_kind_turn_{turn}"))?;
        apply_random(state, kind, cfg);
        fired.push(TriggeredEvent::Random(kind));
    }
    Ok(fired)
}

fn apply_scheduled(state: &mut GameState, event: ScheduledEvent, cfg: &EconomicConfig) {
    match event {
        ScheduledEvent::InvestorMeeting => {
            state.raise_dialog(DialogId::InvestorMeeting);
            state.push_message(LOG_EVENT_INVESTOR);
        }
        ScheduledEvent::ComputePriceSurge => {
            state.compute_cost_multiplier = cfg.events.compute_surge_multiplier;
            state.push_message(LOG_EVENT_COMPUTE_SURGE);
        }
    }
}

fn apply_random(state: &mut GameState, kind: EventKind, cfg: &EconomicConfig) {
    let events = &cfg.events;
    match kind {
        EventKind::FundingWindfall => {
            state.money = state.money.saturating_add(events.windfall_amount);
            state.push_message(LOG_EVENT_WINDFALL);
        }
        EventKind::StaffPoached => {
            state.staff = (state.staff - STAFF_POACHED_LOSS).max(0);
            state.push_message(LOG_EVENT_POACHED);
        }
        EventKind::LabBreakthrough => {
            state.research_progress += events.breakthrough_progress;
            state.capability_research_this_turn += events.breakthrough_capability;
            state.push_message(LOG_EVENT_BREAKTHROUGH);
        }
        EventKind::RegulatoryReview => {
            if state.raise_dialog(DialogId::RegulatoryReview) {
                state.push_message(LOG_EVENT_REGULATORY);
            } else {
                state.deferred_events.push(DeferredEvent {
                    kind: DeferredKind::RegulatoryReview,
                    turns_remaining: 1,
                });
                state.push_message(LOG_EVENT_REGULATORY_DEFERRED);
            }
        }
        EventKind::SafetyConference => {
            state.deferred_events.push(DeferredEvent {
                kind: DeferredKind::SafetyConference,
                turns_remaining: events.conference_delay_turns,
            });
            state.push_message(LOG_EVENT_CONFERENCE_SCHEDULED);
        }
    }
}

/// Count every deferred event down by one turn and apply those that are due.
///
/// A due regulatory review that still finds a dialog open stays queued for
/// the next turn.
pub fn tick_deferred(state: &mut GameState, cfg: &EconomicConfig) -> Vec<DeferredKind> {
    let mut due = Vec::new();
    state.deferred_events.retain_mut(|event| {
        event.turns_remaining = event.turns_remaining.saturating_sub(1);
        if event.turns_remaining == 0 {
            due.push(event.kind);
            false
        } else {
            true
        }
    });
    due.retain(|kind| match kind {
        DeferredKind::SafetyConference => {
            state.reputation += cfg.events.conference_reputation;
            state.push_message(LOG_EVENT_CONFERENCE);
            true
        }
        DeferredKind::Investigation => {
            state.money = (state.money - cfg.intelligence.investigation_fine).max(0);
            state.push_message(LOG_EVENT_INVESTIGATION);
            true
        }
        DeferredKind::RegulatoryReview => {
            if state.raise_dialog(DialogId::RegulatoryReview) {
                state.push_message(LOG_EVENT_REGULATORY);
                true
            } else {
                state.deferred_events.push(DeferredEvent {
                    kind: DeferredKind::RegulatoryReview,
                    turns_remaining: 1,
                });
                false
            }
        }
    });
    due
}

/// Fire milestones reached for the first time.
pub fn check_milestones(state: &mut GameState) -> Vec<Milestone> {
    let reached: Vec<Milestone> = Milestone::ALL
        .into_iter()
        .filter(|m| !state.milestones.contains(m) && m.reached(state))
        .collect();
    for milestone in &reached {
        state.milestones.insert(*milestone);
        state.reputation += MILESTONE_REPUTATION_BONUS;
        state.push_message(format!("{LOG_MILESTONE}.{}", milestone.key()));
    }
    reached
}

/// Apply the player's answer to the pending dialog and clear it.
///
/// # Errors
///
/// Fails when no dialog is open or `choice` is not one of its options.
pub fn resolve_dialog(state: &mut GameState, choice: usize) -> Result<DialogId, StateError> {
    let DialogState::Dialog(pending) = &state.pending_dialog else {
        return Err(StateError::NoPendingDialog);
    };
    let id = pending.id;
    let Some(option) = id.options().get(choice) else {
        return Err(StateError::InvalidDialogChoice {
            dialog: id.key(),
            choice,
        });
    };

    match (id, choice) {
        (DialogId::InvestorMeeting, 0) => {
            state.money = state.money.saturating_add(INVESTOR_ACCEPT_FUNDS);
            state.doom += INVESTOR_ACCEPT_DOOM;
        }
        (DialogId::InvestorMeeting, _) => {
            state.reputation += INVESTOR_DECLINE_REPUTATION;
        }
        (DialogId::RegulatoryReview, 0) => {
            state.money = (state.money - REGULATORY_COOPERATE_COST).max(0);
            state.doom -= REGULATORY_COOPERATE_DOOM;
        }
        (DialogId::RegulatoryReview, _) => {
            state.reputation -= REGULATORY_STONEWALL_REPUTATION;
        }
    }
    state.push_message(format!("{LOG_DIALOG_RESOLVED}.{}.{option}", id.key()));
    state.pending_dialog = DialogState::NoDialog;
    state.clamp_resource_floors();
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_events() -> EconomicConfig {
        let mut cfg = EconomicConfig::default();
        cfg.events.random_chance = 1.0;
        cfg
    }

    #[test]
    fn events_roll_once_per_turn() {
        let cfg = always_events();
        let mut state = GameState::new(&cfg);
        state.turn = 1;
        let mut rng = ContextRng::new("events");
        let first = trigger_turn_events(&mut state, &mut rng, &cfg).unwrap();
        assert_eq!(first.len(), 1);
        let calls = rng.total_calls();
        let again = trigger_turn_events(&mut state, &mut rng, &cfg).unwrap();
        assert!(again.is_empty());
        assert_eq!(rng.total_calls(), calls);
    }

    #[test]
    fn scheduled_investor_meeting_opens_dialog() {
        let mut cfg = EconomicConfig::default();
        cfg.events.random_chance = 0.0;
        let mut state = GameState::new(&cfg);
        state.turn = INVESTOR_MEETING_TURN;
        let mut rng = ContextRng::new("events");
        let fired = trigger_turn_events(&mut state, &mut rng, &cfg).unwrap();
        assert_eq!(
            fired,
            vec![TriggeredEvent::Scheduled(ScheduledEvent::InvestorMeeting)]
        );
        assert!(state.pending_dialog.is_blocking());
    }

    #[test]
    fn review_during_investor_meeting_waits_for_next_turn() {
        let cfg = always_events();
        let (mut state, fired) = (0..64)
            .find_map(|n| {
                let mut state = GameState::new(&cfg);
                state.turn = INVESTOR_MEETING_TURN;
                let mut rng = ContextRng::new(format!("COLLIDE-{n}"));
                let fired = trigger_turn_events(&mut state, &mut rng, &cfg).unwrap();
                fired
                    .contains(&TriggeredEvent::Random(EventKind::RegulatoryReview))
                    .then_some((state, fired))
            })
            .expect("some seed rolls a review on the meeting turn");

        assert_eq!(
            fired[0],
            TriggeredEvent::Scheduled(ScheduledEvent::InvestorMeeting)
        );
        assert_eq!(
            state.pending_dialog.pending().map(|p| p.id),
            Some(DialogId::InvestorMeeting)
        );
        assert_eq!(
            state.deferred_events,
            vec![DeferredEvent {
                kind: DeferredKind::RegulatoryReview,
                turns_remaining: 1,
            }]
        );
        assert!(
            state
                .messages
                .iter()
                .any(|m| m.as_str() == LOG_EVENT_REGULATORY_DEFERRED)
        );
        assert!(!state.messages.iter().any(|m| m.as_str() == LOG_EVENT_REGULATORY));

        resolve_dialog(&mut state, 1).unwrap();
        assert_eq!(
            tick_deferred(&mut state, &cfg),
            vec![DeferredKind::RegulatoryReview]
        );
        assert_eq!(
            state.pending_dialog.pending().map(|p| p.id),
            Some(DialogId::RegulatoryReview)
        );
        assert!(state.deferred_events.is_empty());
    }

    #[test]
    fn deferred_review_stays_queued_while_dialog_open() {
        let cfg = EconomicConfig::default();
        let mut state = GameState::new(&cfg);
        state.raise_dialog(DialogId::InvestorMeeting);
        state.deferred_events.push(DeferredEvent {
            kind: DeferredKind::RegulatoryReview,
            turns_remaining: 1,
        });
        assert!(tick_deferred(&mut state, &cfg).is_empty());
        assert_eq!(state.deferred_events.len(), 1);
        assert_eq!(
            state.pending_dialog.pending().map(|p| p.id),
            Some(DialogId::InvestorMeeting)
        );
    }

    #[test]
    fn compute_surge_raises_multiplier() {
        let mut cfg = EconomicConfig::default();
        cfg.events.random_chance = 0.0;
        let mut state = GameState::new(&cfg);
        state.turn = COMPUTE_SURGE_TURN;
        let mut rng = ContextRng::new("events");
        trigger_turn_events(&mut state, &mut rng, &cfg).unwrap();
        assert!((state.compute_cost_multiplier - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn deferred_events_resolve_after_delay() {
        let cfg = EconomicConfig::default();
        let mut state = GameState::new(&cfg);
        state.deferred_events.push(DeferredEvent {
            kind: DeferredKind::SafetyConference,
            turns_remaining: 2,
        });
        let reputation = state.reputation;
        assert!(tick_deferred(&mut state, &cfg).is_empty());
        assert_eq!(
            tick_deferred(&mut state, &cfg),
            vec![DeferredKind::SafetyConference]
        );
        assert!(state.deferred_events.is_empty());
        assert_eq!(state.reputation, reputation + 3);
    }

    #[test]
    fn investigation_fine_never_overdraws() {
        let cfg = EconomicConfig::default();
        let mut state = GameState::new(&cfg);
        state.money = 4_000;
        state.deferred_events.push(DeferredEvent {
            kind: DeferredKind::Investigation,
            turns_remaining: 1,
        });
        tick_deferred(&mut state, &cfg);
        assert_eq!(state.money, 0);
    }

    #[test]
    fn milestones_fire_once() {
        let mut state = GameState::default();
        state.staff = 6;
        assert_eq!(check_milestones(&mut state), vec![Milestone::StaffFive]);
        assert!(check_milestones(&mut state).is_empty());
        state.staff = 10;
        state.papers_published = 1;
        assert_eq!(
            check_milestones(&mut state),
            vec![Milestone::StaffTen, Milestone::FirstPaper]
        );
    }

    #[test]
    fn resolving_dialog_clears_block() {
        let mut state = GameState::default();
        assert_eq!(resolve_dialog(&mut state, 0), Err(StateError::NoPendingDialog));

        state.raise_dialog(DialogId::InvestorMeeting);
        assert_eq!(
            resolve_dialog(&mut state, 7),
            Err(StateError::InvalidDialogChoice {
                dialog: "investor_meeting",
                choice: 7
            })
        );
        assert!(state.pending_dialog.is_blocking());

        let money = state.money;
        assert_eq!(resolve_dialog(&mut state, 0), Ok(DialogId::InvestorMeeting));
        assert_eq!(state.money, money + INVESTOR_ACCEPT_FUNDS);
        assert_eq!(state.pending_dialog, DialogState::NoDialog);
    }
}
