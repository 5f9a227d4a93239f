//! Player actions as typed capabilities selected through a registry.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::config::EconomicConfig;
use crate::constants::{
    ADOPT_PET_COST, ADOPT_PET_REPUTATION, BUY_COMPUTE_COST, BUY_COMPUTE_UNITS, ESPIONAGE_AP_COST,
    ESPIONAGE_COST, FUNDRAISE_COST, HIRE_RESEARCHER_COST, HIRE_STAFF_COST, LOG_ACTION_DELEGATED,
    LOG_ACTION_SKIPPED_AP, LOG_ACTION_SKIPPED_DELEGATION, LOG_ACTION_SKIPPED_FUNDS,
    LOG_ACTION_SKIPPED_OWNED, LOG_ADOPT_PET, LOG_BUY_COMPUTE, LOG_ESPIONAGE_FAILED,
    LOG_ESPIONAGE_NO_TARGET, LOG_ESPIONAGE_SCANDAL, LOG_ESPIONAGE_SUCCESS, LOG_FUNDRAISE_FAILED,
    LOG_FUNDRAISE_SUCCESS, LOG_HIRE_RESEARCHER, LOG_HIRE_STAFF, LOG_OUTREACH, LOG_SAFETY_RESEARCH,
    LOG_SCOUT_FAILED, LOG_SCOUT_NOTHING, LOG_SCOUT_OPPONENT, LOG_SCOUT_STAT, LOG_UPGRADE,
    MANAGEMENT_SYSTEMS_COST, PUBLIC_OUTREACH_COST, PUBLIC_OUTREACH_REPUTATION,
    RESEARCHER_MAX_PRODUCTIVITY, RESEARCHER_MIN_PRODUCTIVITY, RETENTION_PROGRAM_COST,
    SAFETY_RESEARCH_COST, SCOUT_COST,
};
use crate::economy::{FundraisingOutcome, roll_fundraising};
use crate::events::{DeferredEvent, DeferredKind};
use crate::intelligence::{self, EspionageOutcome, ScoutOutcome};
use crate::numbers::{i64_to_f64, round_f64_to_i32, round_f64_to_i64};
use crate::rng::{ContextRng, RngError};
use crate::state::{GameState, Researcher, SelectedAction, Specialization, Upgrade};

/// Identifier used to select and register actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    Fundraise,
    HireStaff,
    HireResearcher,
    SafetyResearch,
    BuyCompute,
    PublicOutreach,
    Scout,
    Espionage,
    AdoptPet,
    BuyRetentionProgram,
    BuyManagementSystems,
}

impl ActionId {
    pub const ALL: [Self; 11] = [
        Self::Fundraise,
        Self::HireStaff,
        Self::HireResearcher,
        Self::SafetyResearch,
        Self::BuyCompute,
        Self::PublicOutreach,
        Self::Scout,
        Self::Espionage,
        Self::AdoptPet,
        Self::BuyRetentionProgram,
        Self::BuyManagementSystems,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Fundraise => "fundraise",
            Self::HireStaff => "hire_staff",
            Self::HireResearcher => "hire_researcher",
            Self::SafetyResearch => "safety_research",
            Self::BuyCompute => "buy_compute",
            Self::PublicOutreach => "public_outreach",
            Self::Scout => "scout",
            Self::Espionage => "espionage",
            Self::AdoptPet => "adopt_pet",
            Self::BuyRetentionProgram => "buy_retention_program",
            Self::BuyManagementSystems => "buy_management_systems",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("action `{0}` is not registered")]
    UnknownAction(ActionId),
    #[error("delegation needs at least {min_staff} staff (have {staff})")]
    DelegationNotPermitted { staff: i32, min_staff: i32 },
    #[error("at most {limit} delegated actions per turn")]
    DelegationLimit { limit: usize },
    #[error("selection needs {needed} action points but only {available} remain")]
    InsufficientActionPoints { needed: i32, available: i32 },
    #[error(transparent)]
    Rng(#[from] RngError),
}

/// Everything an action may touch while it applies.
pub struct ActionContext<'a> {
    pub state: &'a mut GameState,
    pub rng: &'a mut ContextRng,
    pub cfg: &'a EconomicConfig,
    /// 1.0 when run directly, the delegation effectiveness otherwise.
    pub effectiveness: f64,
}

impl ActionContext<'_> {
    fn scaled(&self, amount: i32) -> i32 {
        round_f64_to_i32(f64::from(amount) * self.effectiveness)
    }
}

/// Applied effect of one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "effect")]
pub enum ActionEffect {
    Fundraised(FundraisingOutcome),
    StaffHired { hired: i32 },
    ResearcherHired(Researcher),
    SafetyResearch { progress: i32, points: f64 },
    ComputeBought { units: i32 },
    Outreach { reputation: i32 },
    Scouted(ScoutOutcome),
    Espionage(EspionageOutcome),
    PetAdopted,
    UpgradePurchased { upgrade: Upgrade },
}

/// Why a selected action did not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    InsufficientFunds { needed: i64, available: i64 },
    InsufficientActionPoints { needed: i32, available: i32 },
    AlreadyOwned,
    /// Headcount fell below what the delegation needed.
    DelegationUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ActionStatus {
    Executed {
        money_spent: i64,
        ap_spent: i32,
        effect: ActionEffect,
    },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReport {
    pub id: ActionId,
    pub delegated: bool,
    pub status: ActionStatus,
}

impl ActionReport {
    #[must_use]
    pub const fn executed(&self) -> bool {
        matches!(self.status, ActionStatus::Executed { .. })
    }
}

/// A player action with a money and action-point price.
pub trait Action: fmt::Debug + Send + Sync {
    fn id(&self) -> ActionId;

    /// Money cost at the current state.
    fn cost(&self, state: &GameState) -> i64;

    fn ap_cost(&self) -> i32 {
        1
    }

    /// False when the action can no longer be taken, e.g. an owned upgrade.
    fn is_available(&self, _state: &GameState) -> bool {
        true
    }

    /// Apply the effect. Costs have already been paid.
    ///
    /// # Errors
    ///
    /// Propagates RNG errors from probabilistic effects.
    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Fundraise;

impl Action for Fundraise {
    fn id(&self) -> ActionId {
        ActionId::Fundraise
    }

    fn cost(&self, _state: &GameState) -> i64 {
        FUNDRAISE_COST
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        let outcome = roll_fundraising(
            ctx.state.turn,
            ctx.state.reputation,
            ctx.rng,
            ctx.cfg,
            ctx.effectiveness,
        )?;
        ctx.state.money = ctx.state.money.saturating_add(outcome.amount);
        ctx.state.push_message(if outcome.success {
            LOG_FUNDRAISE_SUCCESS
        } else {
            LOG_FUNDRAISE_FAILED
        });
        Ok(ActionEffect::Fundraised(outcome))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HireStaff;

impl Action for HireStaff {
    fn id(&self) -> ActionId {
        ActionId::HireStaff
    }

    fn cost(&self, _state: &GameState) -> i64 {
        HIRE_STAFF_COST
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        let hired = ctx.scaled(1).max(1);
        ctx.state.staff += hired;
        ctx.state.push_message(LOG_HIRE_STAFF);
        Ok(ActionEffect::StaffHired { hired })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HireResearcher;

impl Action for HireResearcher {
    fn id(&self) -> ActionId {
        ActionId::HireResearcher
    }

    fn cost(&self, _state: &GameState) -> i64 {
        HIRE_RESEARCHER_COST
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        let turn = ctx.state.turn;
        let specialization = *ctx.rng.choose(
            &Specialization::ALL,
            &format!("researcher_specialization_turn_{turn}"),
        )?;
        let productivity = ctx.rng.draw_int(
            RESEARCHER_MIN_PRODUCTIVITY,
            RESEARCHER_MAX_PRODUCTIVITY,
            &format!("researcher_productivity_turn_{turn}"),
        )?;
        let productivity = round_f64_to_i32(i64_to_f64(productivity) * ctx.effectiveness).max(1);
        let researcher = Researcher {
            id: ctx.state.next_researcher_id(),
            specialization,
            productivity,
        };
        ctx.state.researchers.push(researcher.clone());
        ctx.state.push_message(format!(
            "{LOG_HIRE_RESEARCHER}.{}",
            specialization.key()
        ));
        Ok(ActionEffect::ResearcherHired(researcher))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyResearch;

impl Action for SafetyResearch {
    fn id(&self) -> ActionId {
        ActionId::SafetyResearch
    }

    fn cost(&self, _state: &GameState) -> i64 {
        SAFETY_RESEARCH_COST
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        let progress = ctx.scaled(ctx.cfg.research.safety_action_progress);
        let points = ctx.cfg.research.safety_action_points * ctx.effectiveness;
        ctx.state.research_progress += progress;
        ctx.state.safety_research_this_turn += points;
        ctx.state.push_message(LOG_SAFETY_RESEARCH);
        Ok(ActionEffect::SafetyResearch { progress, points })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuyCompute;

impl Action for BuyCompute {
    fn id(&self) -> ActionId {
        ActionId::BuyCompute
    }

    fn cost(&self, state: &GameState) -> i64 {
        round_f64_to_i64(i64_to_f64(BUY_COMPUTE_COST) * state.compute_cost_multiplier)
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        let units = ctx.scaled(BUY_COMPUTE_UNITS);
        ctx.state.compute += units;
        ctx.state.push_message(LOG_BUY_COMPUTE);
        Ok(ActionEffect::ComputeBought { units })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PublicOutreach;

impl Action for PublicOutreach {
    fn id(&self) -> ActionId {
        ActionId::PublicOutreach
    }

    fn cost(&self, _state: &GameState) -> i64 {
        PUBLIC_OUTREACH_COST
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        let reputation = ctx.scaled(PUBLIC_OUTREACH_REPUTATION);
        ctx.state.reputation += reputation;
        ctx.state.push_message(LOG_OUTREACH);
        Ok(ActionEffect::Outreach { reputation })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scout;

impl Action for Scout {
    fn id(&self) -> ActionId {
        ActionId::Scout
    }

    fn cost(&self, _state: &GameState) -> i64 {
        SCOUT_COST
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        let turn = ctx.state.turn;
        let outcome = intelligence::scout(
            &mut ctx.state.opponents,
            turn,
            ctx.rng,
            &ctx.cfg.intelligence,
            ctx.effectiveness,
        )?;
        let message = match &outcome {
            ScoutOutcome::OpponentRevealed { .. } => LOG_SCOUT_OPPONENT.to_string(),
            ScoutOutcome::StatRevealed { stat, .. } => format!("{LOG_SCOUT_STAT}.{}", stat.key()),
            ScoutOutcome::Failed => LOG_SCOUT_FAILED.to_string(),
            ScoutOutcome::NothingToScout => LOG_SCOUT_NOTHING.to_string(),
        };
        ctx.state.push_message(message);
        Ok(ActionEffect::Scouted(outcome))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Espionage;

impl Action for Espionage {
    fn id(&self) -> ActionId {
        ActionId::Espionage
    }

    fn cost(&self, _state: &GameState) -> i64 {
        ESPIONAGE_COST
    }

    fn ap_cost(&self) -> i32 {
        ESPIONAGE_AP_COST
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        let turn = ctx.state.turn;
        let intel = &ctx.cfg.intelligence;
        let outcome = intelligence::espionage(
            &mut ctx.state.opponents,
            turn,
            ctx.rng,
            intel,
            ctx.effectiveness,
        )?;
        if outcome.target.is_none() {
            ctx.state.push_message(LOG_ESPIONAGE_NO_TARGET);
            return Ok(ActionEffect::Espionage(outcome));
        }
        ctx.state.push_message(if outcome.success {
            LOG_ESPIONAGE_SUCCESS
        } else {
            LOG_ESPIONAGE_FAILED
        });
        if outcome.scandal {
            ctx.state.reputation -= intel.scandal_reputation_loss;
            ctx.state.deferred_events.push(DeferredEvent {
                kind: DeferredKind::Investigation,
                turns_remaining: intel.investigation_delay_turns,
            });
            ctx.state.push_message(LOG_ESPIONAGE_SCANDAL);
        }
        Ok(ActionEffect::Espionage(outcome))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdoptPet;

impl Action for AdoptPet {
    fn id(&self) -> ActionId {
        ActionId::AdoptPet
    }

    fn cost(&self, _state: &GameState) -> i64 {
        ADOPT_PET_COST
    }

    fn is_available(&self, state: &GameState) -> bool {
        !state.has_pet
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        ctx.state.has_pet = true;
        ctx.state.reputation += ADOPT_PET_REPUTATION;
        ctx.state.push_message(LOG_ADOPT_PET);
        Ok(ActionEffect::PetAdopted)
    }
}

/// One-time purchase of an [`Upgrade`].
#[derive(Debug, Clone, Copy)]
pub struct BuyUpgrade(pub Upgrade);

impl Action for BuyUpgrade {
    fn id(&self) -> ActionId {
        match self.0 {
            Upgrade::RetentionProgram => ActionId::BuyRetentionProgram,
            Upgrade::ManagementSystems => ActionId::BuyManagementSystems,
        }
    }

    fn cost(&self, _state: &GameState) -> i64 {
        match self.0 {
            Upgrade::RetentionProgram => RETENTION_PROGRAM_COST,
            Upgrade::ManagementSystems => MANAGEMENT_SYSTEMS_COST,
        }
    }

    fn is_available(&self, state: &GameState) -> bool {
        !state.has_upgrade(self.0)
    }

    fn apply(&self, ctx: &mut ActionContext<'_>) -> Result<ActionEffect, ActionError> {
        ctx.state.upgrades.insert(self.0);
        ctx.state.push_message(format!("{LOG_UPGRADE}.{}", self.0.key()));
        Ok(ActionEffect::UpgradePurchased { upgrade: self.0 })
    }
}

/// Delegated actions cost one action point less.
#[must_use]
pub const fn delegated_ap_cost(ap_cost: i32) -> i32 {
    if ap_cost > 0 { ap_cost - 1 } else { 0 }
}

/// How many actions may be delegated at the given headcount.
#[must_use]
pub fn delegation_limit(staff: i32, cfg: &EconomicConfig) -> usize {
    let min_staff = cfg.delegation.min_staff.max(1);
    usize::try_from(staff.max(0) / min_staff).unwrap_or(0)
}

/// Actions keyed by identifier.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<ActionId, Box<dyn Action>>,
}

impl ActionRegistry {
    /// Registry with every built-in action.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::default();
        registry.register(Box::new(Fundraise));
        registry.register(Box::new(HireStaff));
        registry.register(Box::new(HireResearcher));
        registry.register(Box::new(SafetyResearch));
        registry.register(Box::new(BuyCompute));
        registry.register(Box::new(PublicOutreach));
        registry.register(Box::new(Scout));
        registry.register(Box::new(Espionage));
        registry.register(Box::new(AdoptPet));
        registry.register(Box::new(BuyUpgrade(Upgrade::RetentionProgram)));
        registry.register(Box::new(BuyUpgrade(Upgrade::ManagementSystems)));
        registry
    }

    /// Insert or replace the action registered under its id.
    pub fn register(&mut self, action: Box<dyn Action>) {
        self.actions.insert(action.id(), action);
    }

    #[must_use]
    pub fn get(&self, id: ActionId) -> Option<&dyn Action> {
        self.actions.get(&id).map(AsRef::as_ref)
    }

    pub fn ids(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.actions.keys().copied()
    }

    fn lookup(&self, id: ActionId) -> Result<&dyn Action, ActionError> {
        self.get(id).ok_or(ActionError::UnknownAction(id))
    }

    /// Action points `selected` will consume.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownAction`] for unregistered ids.
    pub fn ap_cost_of(&self, selected: SelectedAction) -> Result<i32, ActionError> {
        let base = self.lookup(selected.id)?.ap_cost();
        Ok(if selected.delegated {
            delegated_ap_cost(base)
        } else {
            base
        })
    }

    /// Check that `selected` can be added to this turn's selection.
    ///
    /// # Errors
    ///
    /// Rejects unknown actions, delegation without enough staff, delegation
    /// beyond the per-turn limit, and selections exceeding the action points.
    pub fn validate_selection(
        &self,
        state: &GameState,
        cfg: &EconomicConfig,
        selected: SelectedAction,
    ) -> Result<(), ActionError> {
        let ap = self.ap_cost_of(selected)?;
        if selected.delegated {
            let min_staff = cfg.delegation.min_staff;
            if state.staff < min_staff {
                return Err(ActionError::DelegationNotPermitted {
                    staff: state.staff,
                    min_staff,
                });
            }
            let limit = delegation_limit(state.staff, cfg);
            if state.delegated_count() >= limit {
                return Err(ActionError::DelegationLimit { limit });
            }
        }
        let mut planned = 0;
        for queued in &state.selected_actions {
            planned += self.ap_cost_of(*queued)?;
        }
        let available = state.action_points - planned;
        if ap > available {
            return Err(ActionError::InsufficientActionPoints {
                needed: ap,
                available,
            });
        }
        Ok(())
    }

    /// Execute this turn's selection in order, then clear it.
    ///
    /// Unaffordable or unavailable actions are skipped with a message.
    ///
    /// # Errors
    ///
    /// Fails on unregistered actions and propagates RNG errors.
    pub fn execute_selected(
        &self,
        state: &mut GameState,
        rng: &mut ContextRng,
        cfg: &EconomicConfig,
    ) -> Result<Vec<ActionReport>, ActionError> {
        let selection = std::mem::take(&mut state.selected_actions);
        let mut reports = Vec::with_capacity(selection.len());
        let mut delegated_so_far = 0;
        for selected in selection {
            let action = self.lookup(selected.id)?;
            let status = if selected.delegated
                && (state.staff < cfg.delegation.min_staff
                    || delegated_so_far >= delegation_limit(state.staff, cfg))
            {
                ActionStatus::Skipped(SkipReason::DelegationUnavailable)
            } else {
                if selected.delegated {
                    delegated_so_far += 1;
                }
                self.run_one(action, selected, state, rng, cfg)?
            };
            if let ActionStatus::Skipped(reason) = &status {
                let key = match reason {
                    SkipReason::InsufficientFunds { .. } => LOG_ACTION_SKIPPED_FUNDS,
                    SkipReason::InsufficientActionPoints { .. } => LOG_ACTION_SKIPPED_AP,
                    SkipReason::AlreadyOwned => LOG_ACTION_SKIPPED_OWNED,
                    SkipReason::DelegationUnavailable => LOG_ACTION_SKIPPED_DELEGATION,
                };
                state.push_message(format!("{key}.{}", selected.id));
            }
            reports.push(ActionReport {
                id: selected.id,
                delegated: selected.delegated,
                status,
            });
        }
        Ok(reports)
    }

    fn run_one(
        &self,
        action: &dyn Action,
        selected: SelectedAction,
        state: &mut GameState,
        rng: &mut ContextRng,
        cfg: &EconomicConfig,
    ) -> Result<ActionStatus, ActionError> {
        if !action.is_available(state) {
            return Ok(ActionStatus::Skipped(SkipReason::AlreadyOwned));
        }
        let ap = self.ap_cost_of(selected)?;
        if state.action_points < ap {
            return Ok(ActionStatus::Skipped(SkipReason::InsufficientActionPoints {
                needed: ap,
                available: state.action_points,
            }));
        }
        let cost = action.cost(state);
        if state.money < cost {
            return Ok(ActionStatus::Skipped(SkipReason::InsufficientFunds {
                needed: cost,
                available: state.money,
            }));
        }
        state.money -= cost;
        state.action_points -= ap;
        let effectiveness = if selected.delegated {
            state.push_message(format!("{LOG_ACTION_DELEGATED}.{}", selected.id));
            cfg.delegation.effectiveness
        } else {
            1.0
        };
        let mut ctx = ActionContext {
            state,
            rng,
            cfg,
            effectiveness,
        };
        let effect = action.apply(&mut ctx)?;
        Ok(ActionStatus::Executed {
            money_spent: cost,
            ap_spent: ap,
            effect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (GameState, ContextRng, EconomicConfig, ActionRegistry) {
        let cfg = EconomicConfig::default();
        (
            GameState::new(&cfg),
            ContextRng::new("actions"),
            cfg,
            ActionRegistry::standard(),
        )
    }

    #[test]
    fn standard_registry_covers_every_action() {
        let registry = ActionRegistry::standard();
        assert_eq!(registry.ids().collect::<Vec<_>>(), ActionId::ALL.to_vec());
        for id in ActionId::ALL {
            assert_eq!(ActionId::from_key(id.key()), Some(id));
        }
        assert_eq!(ActionId::from_key("teleport"), None);
    }

    #[test]
    fn execution_deducts_costs_in_selection_order() {
        let (mut state, mut rng, cfg, registry) = setup();
        state.select_action(SelectedAction::direct(ActionId::HireStaff));
        state.select_action(SelectedAction::direct(ActionId::SafetyResearch));
        let reports = registry.execute_selected(&mut state, &mut rng, &cfg).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(ActionReport::executed));
        assert_eq!(state.money, 100_000 - HIRE_STAFF_COST - SAFETY_RESEARCH_COST);
        assert_eq!(state.action_points, 1);
        assert_eq!(state.staff, 3);
        assert!((state.safety_research_this_turn - 2.0).abs() < f64::EPSILON);
        assert!(state.selected_actions.is_empty());
    }

    #[test]
    fn unaffordable_actions_are_skipped_not_errors() {
        let (mut state, mut rng, cfg, registry) = setup();
        state.money = 1_000;
        state.select_action(SelectedAction::direct(ActionId::HireResearcher));
        let reports = registry.execute_selected(&mut state, &mut rng, &cfg).unwrap();
        assert_eq!(
            reports[0].status,
            ActionStatus::Skipped(SkipReason::InsufficientFunds {
                needed: HIRE_RESEARCHER_COST,
                available: 1_000
            })
        );
        assert_eq!(state.money, 1_000);
        assert!(state.messages.iter().any(|m| m.starts_with(LOG_ACTION_SKIPPED_FUNDS)));
    }

    #[test]
    fn buying_an_upgrade_records_it() {
        let (mut state, mut rng, cfg, registry) = setup();
        state.select_action(SelectedAction::direct(ActionId::BuyManagementSystems));
        let reports = registry.execute_selected(&mut state, &mut rng, &cfg).unwrap();
        let ActionStatus::Executed { effect, .. } = &reports[0].status else {
            panic!("expected purchase");
        };
        assert_eq!(
            *effect,
            ActionEffect::UpgradePurchased {
                upgrade: Upgrade::ManagementSystems
            }
        );
        assert!(state.has_upgrade(Upgrade::ManagementSystems));
        let expected = format!("{LOG_UPGRADE}.{}", Upgrade::ManagementSystems.key());
        assert!(state.messages.contains(&expected));
    }

    #[test]
    fn owned_upgrades_are_skipped() {
        let (mut state, mut rng, cfg, registry) = setup();
        state.upgrades.insert(Upgrade::RetentionProgram);
        state.select_action(SelectedAction::direct(ActionId::BuyRetentionProgram));
        let reports = registry.execute_selected(&mut state, &mut rng, &cfg).unwrap();
        assert_eq!(reports[0].status, ActionStatus::Skipped(SkipReason::AlreadyOwned));
        assert_eq!(state.money, 100_000);
    }

    #[test]
    fn delegation_requires_staff_and_respects_limit() {
        let (mut state, _rng, cfg, registry) = setup();
        let delegated = SelectedAction::delegated(ActionId::PublicOutreach);
        assert_eq!(
            registry.validate_selection(&state, &cfg, delegated),
            Err(ActionError::DelegationNotPermitted {
                staff: 2,
                min_staff: 4
            })
        );
        state.staff = 5;
        state.action_points = 5;
        assert!(registry.validate_selection(&state, &cfg, delegated).is_ok());
        state.select_action(delegated);
        assert_eq!(
            registry.validate_selection(&state, &cfg, delegated),
            Err(ActionError::DelegationLimit { limit: 1 })
        );
    }

    #[test]
    fn delegated_actions_cost_less_and_do_less() {
        let (mut state, mut rng, cfg, registry) = setup();
        state.staff = 8;
        state.action_points = 1;
        let espionage = SelectedAction::delegated(ActionId::Espionage);
        assert_eq!(registry.ap_cost_of(espionage), Ok(1));
        assert_eq!(
            registry.ap_cost_of(SelectedAction::delegated(ActionId::Scout)),
            Ok(0)
        );

        state.select_action(SelectedAction::delegated(ActionId::SafetyResearch));
        let reports = registry.execute_selected(&mut state, &mut rng, &cfg).unwrap();
        let ActionStatus::Executed { ap_spent, effect, .. } = &reports[0].status else {
            panic!("expected execution");
        };
        assert_eq!(*ap_spent, 0);
        assert_eq!(
            *effect,
            ActionEffect::SafetyResearch {
                progress: 14,
                points: 2.0 * 0.7
            }
        );
        assert_eq!(state.action_points, 1);
    }

    #[test]
    fn delegation_is_rechecked_when_staff_leave() {
        let (mut state, mut rng, cfg, registry) = setup();
        state.staff = 8;
        let delegated = SelectedAction::delegated(ActionId::SafetyResearch);
        assert!(registry.validate_selection(&state, &cfg, delegated).is_ok());
        state.select_action(delegated);

        state.staff = cfg.delegation.min_staff - 1;
        let (money, ap) = (state.money, state.action_points);
        let reports = registry.execute_selected(&mut state, &mut rng, &cfg).unwrap();
        assert_eq!(
            reports[0].status,
            ActionStatus::Skipped(SkipReason::DelegationUnavailable)
        );
        assert!(reports[0].delegated);
        assert_eq!(state.money, money);
        assert_eq!(state.action_points, ap);
        let expected = format!("{LOG_ACTION_SKIPPED_DELEGATION}.{}", ActionId::SafetyResearch);
        assert!(state.messages.iter().any(|m| *m == expected));
        assert_eq!(rng.total_calls(), 0);
    }

    #[test]
    fn delegation_limit_is_rechecked_at_execution() {
        let (mut state, mut rng, cfg, registry) = setup();
        state.staff = 8;
        state.action_points = 5;
        state.select_action(SelectedAction::delegated(ActionId::SafetyResearch));
        state.select_action(SelectedAction::delegated(ActionId::PublicOutreach));

        state.staff = 5;
        let reports = registry.execute_selected(&mut state, &mut rng, &cfg).unwrap();
        assert!(reports[0].executed());
        assert_eq!(
            reports[1].status,
            ActionStatus::Skipped(SkipReason::DelegationUnavailable)
        );
    }

    #[test]
    fn selection_cannot_exceed_action_points() {
        let (mut state, _rng, cfg, registry) = setup();
        state.select_action(SelectedAction::direct(ActionId::Espionage));
        assert_eq!(
            registry.validate_selection(&state, &cfg, SelectedAction::direct(ActionId::Espionage)),
            Err(ActionError::InsufficientActionPoints {
                needed: 2,
                available: 1
            })
        );
    }

    #[test]
    fn compute_price_follows_surge_multiplier() {
        let mut state = GameState::default();
        assert_eq!(BuyCompute.cost(&state), 10_000);
        state.compute_cost_multiplier = 1.5;
        assert_eq!(BuyCompute.cost(&state), 15_000);
    }

    #[test]
    fn espionage_scandal_queues_investigation() {
        let (mut state, mut rng, mut cfg, registry) = setup();
        cfg.intelligence.espionage_scandal_chance = 1.0;
        state.opponents[0].discovered = true;
        state.select_action(SelectedAction::direct(ActionId::Espionage));
        registry.execute_selected(&mut state, &mut rng, &cfg).unwrap();
        assert_eq!(state.reputation, 45);
        assert_eq!(
            state.deferred_events,
            vec![DeferredEvent {
                kind: DeferredKind::Investigation,
                turns_remaining: 2
            }]
        );
    }
}
