use std::fmt;

use clap::ValueEnum;
use pdoom_core::{Action, ActionId, ActionRegistry, DialogId, GameState, SelectedAction, Upgrade};
use serde::{Deserialize, Serialize};

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub choice_index: usize,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(choice_index: usize, rationale: Option<String>) -> Self {
        Self {
            choice_index,
            rationale,
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Actions to queue for the coming turn, most wanted first.
    fn plan_turn(&mut self, state: &GameState, actions: &ActionRegistry) -> Vec<SelectedAction>;

    /// Answer a dialog that is blocking the turn.
    fn answer_dialog(&mut self, state: &GameState, dialog: DialogId) -> PolicyDecision;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameplayStrategy {
    SafetyFirst,
    Growth,
    Balanced,
}

impl GameplayStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GameplayStrategy::SafetyFirst => "Safety First",
            GameplayStrategy::Growth => "Growth",
            GameplayStrategy::Balanced => "Balanced",
        }
    }

    #[must_use]
    pub fn create_policy(self) -> Box<dyn PlayerPolicy + Send> {
        match self {
            GameplayStrategy::SafetyFirst => Box::new(SafetyFirstPolicy),
            GameplayStrategy::Growth => Box::new(GrowthPolicy),
            GameplayStrategy::Balanced => Box::new(BalancedPolicy),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct SafetyFirstPolicy;
struct GrowthPolicy;
struct BalancedPolicy;

/// Walks `wishlist` in order, keeping picks that fit the remaining money and
/// action points. Fundraising is free, so a broke lab still queues it.
fn affordable_plan(
    state: &GameState,
    actions: &ActionRegistry,
    wishlist: &[SelectedAction],
) -> Vec<SelectedAction> {
    let mut money = state.money;
    let mut ap = state.action_points;
    let mut plan = Vec::new();
    for &pick in wishlist {
        let Some(action) = actions.get(pick.id) else {
            continue;
        };
        if !action.is_available(state) {
            continue;
        }
        let Ok(ap_cost) = actions.ap_cost_of(pick) else {
            continue;
        };
        let cost = action.cost(state);
        if ap_cost > ap || cost > money {
            continue;
        }
        ap -= ap_cost;
        money -= cost;
        plan.push(pick);
    }
    plan
}

fn doom_ratio(state: &GameState) -> f64 {
    if state.max_doom <= 0 {
        return 1.0;
    }
    f64::from(state.doom) / f64::from(state.max_doom)
}

fn undiscovered_labs(state: &GameState) -> bool {
    state.opponents.iter().any(|opponent| !opponent.discovered)
}

impl PlayerPolicy for SafetyFirstPolicy {
    fn name(&self) -> &'static str {
        "Safety First"
    }

    fn plan_turn(&mut self, state: &GameState, actions: &ActionRegistry) -> Vec<SelectedAction> {
        let mut wishlist = Vec::new();
        if state.money < 15_000 {
            wishlist.push(SelectedAction::direct(ActionId::Fundraise));
        }
        wishlist.push(SelectedAction::direct(ActionId::SafetyResearch));
        if state.researchers.len() < 3 {
            wishlist.push(SelectedAction::direct(ActionId::HireResearcher));
        }
        wishlist.push(SelectedAction::direct(ActionId::SafetyResearch));
        if state.reputation < 20 {
            wishlist.push(SelectedAction::direct(ActionId::PublicOutreach));
        }
        wishlist.push(SelectedAction::direct(ActionId::Fundraise));
        affordable_plan(state, actions, &wishlist)
    }

    fn answer_dialog(&mut self, _state: &GameState, dialog: DialogId) -> PolicyDecision {
        match dialog {
            DialogId::RegulatoryReview => PolicyDecision::new(0, Some("cooperate".to_string())),
            DialogId::InvestorMeeting => {
                PolicyDecision::new(1, Some("terms add doom".to_string()))
            }
        }
    }
}

impl PlayerPolicy for GrowthPolicy {
    fn name(&self) -> &'static str {
        "Growth"
    }

    fn plan_turn(&mut self, state: &GameState, actions: &ActionRegistry) -> Vec<SelectedAction> {
        let mut wishlist = Vec::new();
        if state.staff >= 8 {
            wishlist.push(SelectedAction::delegated(ActionId::Fundraise));
        } else {
            wishlist.push(SelectedAction::direct(ActionId::Fundraise));
        }
        if !state.has_upgrade(Upgrade::ManagementSystems) {
            wishlist.push(SelectedAction::direct(ActionId::BuyManagementSystems));
        }
        wishlist.push(SelectedAction::direct(ActionId::HireStaff));
        wishlist.push(SelectedAction::direct(ActionId::BuyCompute));
        if state.staff >= 10 && !state.has_upgrade(Upgrade::RetentionProgram) {
            wishlist.push(SelectedAction::direct(ActionId::BuyRetentionProgram));
        }
        wishlist.push(SelectedAction::direct(ActionId::HireStaff));
        affordable_plan(state, actions, &wishlist)
    }

    fn answer_dialog(&mut self, _state: &GameState, dialog: DialogId) -> PolicyDecision {
        match dialog {
            DialogId::RegulatoryReview => PolicyDecision::new(1, Some("stonewall".to_string())),
            DialogId::InvestorMeeting => PolicyDecision::new(0, Some("take the money".to_string())),
        }
    }
}

impl PlayerPolicy for BalancedPolicy {
    fn name(&self) -> &'static str {
        "Balanced"
    }

    fn plan_turn(&mut self, state: &GameState, actions: &ActionRegistry) -> Vec<SelectedAction> {
        let mut wishlist = Vec::new();
        let doom = doom_ratio(state);
        if state.money < 20_000 {
            wishlist.push(SelectedAction::direct(ActionId::Fundraise));
        }
        if doom >= 0.5 {
            wishlist.push(SelectedAction::direct(ActionId::SafetyResearch));
            wishlist.push(SelectedAction::direct(ActionId::SafetyResearch));
        }
        if undiscovered_labs(state) {
            wishlist.push(SelectedAction::direct(ActionId::Scout));
        }
        if state.staff < 8 {
            wishlist.push(SelectedAction::direct(ActionId::HireStaff));
        }
        if !state.has_pet {
            wishlist.push(SelectedAction::direct(ActionId::AdoptPet));
        }
        wishlist.push(SelectedAction::direct(ActionId::HireResearcher));
        wishlist.push(SelectedAction::direct(ActionId::SafetyResearch));
        wishlist.push(SelectedAction::direct(ActionId::Fundraise));
        affordable_plan(state, actions, &wishlist)
    }

    fn answer_dialog(&mut self, state: &GameState, dialog: DialogId) -> PolicyDecision {
        match dialog {
            DialogId::RegulatoryReview if state.money >= 25_000 => {
                PolicyDecision::new(0, Some("can afford the review".to_string()))
            }
            DialogId::RegulatoryReview => PolicyDecision::new(1, Some("cash poor".to_string())),
            DialogId::InvestorMeeting if doom_ratio(state) < 0.6 => {
                PolicyDecision::new(0, Some(format!("doom at {:.0}%", doom_ratio(state) * 100.0)))
            }
            DialogId::InvestorMeeting => PolicyDecision::new(1, Some("doom too high".to_string())),
        }
    }
}
