//! Scouting and espionage calculators.
//!
//! Both read the opponent roster, flip discovery flags through RNG draws keyed
//! by operation and turn, and hand back a typed outcome. Neither keeps state of
//! its own; side effects on the player's lab are applied by the calling action.
use serde::{Deserialize, Serialize};

use crate::config::IntelligenceConfig;
use crate::opponents::{Opponent, OpponentStat};
use crate::rng::{ContextRng, RngError};

/// What a scouting attempt uncovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ScoutOutcome {
    /// A previously unknown lab is now on the board.
    OpponentRevealed { opponent: String },
    /// One stat of a known lab was uncovered.
    StatRevealed {
        opponent: String,
        stat: OpponentStat,
    },
    Failed,
    /// Every lab and every stat is already known.
    NothingToScout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EspionageOutcome {
    /// `None` when no discovered lab was available to target.
    pub target: Option<String>,
    pub success: bool,
    pub scandal: bool,
    pub progress_setback: i32,
}

/// Attempt to reveal an unknown lab, or one hidden stat of a known lab.
///
/// # Errors
///
/// Propagates RNG errors from target selection.
pub fn scout(
    opponents: &mut [Opponent],
    turn: u32,
    rng: &mut ContextRng,
    cfg: &IntelligenceConfig,
    effectiveness: f64,
) -> Result<ScoutOutcome, RngError> {
    let hidden_labs: Vec<usize> = opponents
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.discovered)
        .map(|(idx, _)| idx)
        .collect();
    let partially_known: Vec<usize> = opponents
        .iter()
        .enumerate()
        .filter(|(_, o)| o.discovered && !o.undiscovered_stats().is_empty())
        .map(|(idx, _)| idx)
        .collect();
    if hidden_labs.is_empty() && partially_known.is_empty() {
        return Ok(ScoutOutcome::NothingToScout);
    }

    let chance = cfg.scout_success_chance * effectiveness;
    if rng.draw_float(&format!("scout_success_turn_{turn}")) >= chance {
        return Ok(ScoutOutcome::Failed);
    }

    let selection = format!("scout_target_selection_turn_{turn}");
    if !hidden_labs.is_empty() {
        let idx = *rng.choose(&hidden_labs, &selection)?;
        let opponent = &mut opponents[idx];
        opponent.discovered = true;
        return Ok(ScoutOutcome::OpponentRevealed {
            opponent: opponent.name.clone(),
        });
    }

    let idx = *rng.choose(&partially_known, &selection)?;
    let opponent = &mut opponents[idx];
    let hidden = opponent.undiscovered_stats();
    let stat = *rng.choose(&hidden, &format!("scout_stat_reveal_turn_{turn}"))?;
    opponent.reveal(stat);
    Ok(ScoutOutcome::StatRevealed {
        opponent: opponent.name.clone(),
        stat,
    })
}

/// Spy on a known lab: a success roll exposes everything and sets it back,
/// and an independent scandal roll decides whether the player gets caught.
///
/// # Errors
///
/// Propagates RNG errors from target selection.
pub fn espionage(
    opponents: &mut [Opponent],
    turn: u32,
    rng: &mut ContextRng,
    cfg: &IntelligenceConfig,
    effectiveness: f64,
) -> Result<EspionageOutcome, RngError> {
    let known: Vec<usize> = opponents
        .iter()
        .enumerate()
        .filter(|(_, o)| o.discovered)
        .map(|(idx, _)| idx)
        .collect();
    if known.is_empty() {
        return Ok(EspionageOutcome {
            target: None,
            success: false,
            scandal: false,
            progress_setback: 0,
        });
    }

    let idx = *rng.choose(&known, &format!("espionage_target_turn_{turn}"))?;
    let opponent = &mut opponents[idx];
    let chance = cfg.espionage_success_chance * effectiveness;
    let success = rng.draw_float(&format!("espionage_success_turn_{turn}")) < chance;
    let mut progress_setback = 0;
    if success {
        opponent.reveal_all();
        let before = opponent.progress.value;
        opponent.progress.value = (before - cfg.espionage_progress_setback).max(0);
        progress_setback = before - opponent.progress.value;
    }
    let scandal =
        rng.draw_float(&format!("espionage_scandal_turn_{turn}")) < cfg.espionage_scandal_chance;

    Ok(EspionageOutcome {
        target: Some(opponent.name.clone()),
        success,
        scandal,
        progress_setback,
    })
}
