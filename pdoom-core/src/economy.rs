//! Economic calculators. Each is a pure function of a state snapshot and,
//! where a roll is needed, the context RNG.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::{EconomicConfig, MaintenanceConfig};
use crate::numbers::{i64_to_f64, round_f64_to_i32, round_f64_to_i64};
use crate::rng::{ContextRng, RngError};
use crate::state::Upgrade;

/// Action points available at the start of a turn.
#[must_use]
pub fn action_points_for(staff: i32, upgrades: &BTreeSet<Upgrade>, cfg: &EconomicConfig) -> i32 {
    let ap = &cfg.action_points;
    let staff_bonus = staff.max(0) / ap.staff_per_bonus.max(1);
    let management = if upgrades.contains(&Upgrade::ManagementSystems) {
        ap.management_bonus
    } else {
        0
    };
    (ap.base + staff_bonus + management).min(ap.max)
}

/// Per-staff rate for the tier containing `staff`.
#[must_use]
pub fn maintenance_rate(staff: i32, cfg: &MaintenanceConfig) -> i64 {
    cfg.tiers
        .iter()
        .find(|tier| staff <= tier.up_to_staff)
        .map_or(cfg.overflow_cost_per_staff, |tier| tier.cost_per_staff)
}

/// Total recurring cost for one turn.
#[must_use]
pub fn maintenance_cost(staff: i32, has_pet: bool, cfg: &MaintenanceConfig) -> i64 {
    let staff_cost = i64::from(staff.max(0)) * maintenance_rate(staff, cfg);
    let pet = if has_pet { cfg.pet_upkeep } else { 0 };
    staff_cost + pet
}

/// Settlement of one turn's recurring costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceOutcome {
    pub cost: i64,
    pub paid: i64,
    pub shortfall: i64,
    pub staff_lost: i32,
    pub reputation_lost: i32,
    /// Attrition would have applied but an upgrade prevented it.
    pub attrition_suppressed: bool,
}

/// Pay what is possible and decide the attrition penalty for any shortfall.
#[must_use]
pub fn settle_maintenance(
    money: i64,
    cost: i64,
    staff: i32,
    retention: bool,
    cfg: &MaintenanceConfig,
) -> MaintenanceOutcome {
    let paid = cost.min(money.max(0));
    let shortfall = cost - paid;
    let mut outcome = MaintenanceOutcome {
        cost,
        paid,
        shortfall,
        staff_lost: 0,
        reputation_lost: 0,
        attrition_suppressed: false,
    };
    if shortfall > 0 {
        if retention {
            outcome.attrition_suppressed = true;
        } else {
            outcome.staff_lost = cfg.attrition_staff_loss.min(staff.max(0));
            outcome.reputation_lost = cfg.attrition_reputation_loss;
        }
    }
    outcome
}

/// Chance a fundraising round succeeds at the given reputation.
#[must_use]
pub fn fundraising_success_probability(reputation: i32, cfg: &EconomicConfig) -> f64 {
    let model = &cfg.fundraising;
    let raw = model.base_success + f64::from(reputation - 50) * model.reputation_weight;
    raw.clamp(model.min_success, model.max_success)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundraisingOutcome {
    pub success: bool,
    pub probability: f64,
    pub amount: i64,
}

/// Roll a fundraising round: one success check, then the amount.
///
/// # Errors
///
/// Propagates RNG range errors from a misconfigured amount window.
pub fn roll_fundraising(
    turn: u32,
    reputation: i32,
    rng: &mut ContextRng,
    cfg: &EconomicConfig,
    effectiveness: f64,
) -> Result<FundraisingOutcome, RngError> {
    let probability = fundraising_success_probability(reputation, cfg) * effectiveness;
    let success = rng.draw_float(&format!("fundraise_turn_{turn}")) < probability;
    let base = if success {
        rng.draw_int(
            cfg.fundraising.min_amount,
            cfg.fundraising.max_amount,
            &format!("fundraise_amount_turn_{turn}"),
        )?
    } else {
        cfg.fundraising.consolation_amount
    };
    Ok(FundraisingOutcome {
        success,
        probability,
        amount: round_f64_to_i64(i64_to_f64(base) * effectiveness),
    })
}

/// Additive terms folded into one doom change per turn.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DoomDelta {
    pub base: f64,
    pub opponents: f64,
    pub safety_reduction: f64,
    pub capability_increase: f64,
}

impl DoomDelta {
    #[must_use]
    pub fn raw(&self) -> f64 {
        self.base + self.opponents + self.capability_increase - self.safety_reduction
    }

    /// Sum every term in f64, then round half away from zero once.
    #[must_use]
    pub fn total_rounded(&self) -> i32 {
        round_f64_to_i32(self.raw())
    }

    /// Apply to `doom`, clamped to `[0, max_doom]`. Returns the new doom.
    #[must_use]
    pub fn apply_to(&self, doom: i32, max_doom: i32) -> i32 {
        doom.saturating_add(self.total_rounded()).clamp(0, max_doom)
    }
}
