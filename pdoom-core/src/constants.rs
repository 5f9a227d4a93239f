//! Centralized action costs, scheduling and message keys for the simulation core.
//!
//! Values that designers tune at runtime live in `EconomicConfig`; the numbers
//! here define the fixed shape of the game and only change through code review.

// Message keys -------------------------------------------------------------
pub(crate) const LOG_EVENT_WINDFALL: &str = "log.event.windfall";
pub(crate) const LOG_EVENT_POACHED: &str = "log.event.staff-poached";
pub(crate) const LOG_EVENT_BREAKTHROUGH: &str = "log.event.breakthrough";
pub(crate) const LOG_EVENT_REGULATORY: &str = "log.event.regulatory-review";
pub(crate) const LOG_EVENT_REGULATORY_DEFERRED: &str = "log.event.regulatory-review.deferred";
pub(crate) const LOG_EVENT_CONFERENCE_SCHEDULED: &str = "log.event.conference.scheduled";
pub(crate) const LOG_EVENT_CONFERENCE: &str = "log.event.conference";
pub(crate) const LOG_EVENT_INVESTOR: &str = "log.event.investor-meeting";
pub(crate) const LOG_EVENT_COMPUTE_SURGE: &str = "log.event.compute-surge";
pub(crate) const LOG_EVENT_INVESTIGATION: &str = "log.event.investigation";
pub(crate) const LOG_ACTION_SKIPPED_FUNDS: &str = "log.action.skipped.funds";
pub(crate) const LOG_ACTION_SKIPPED_AP: &str = "log.action.skipped.ap";
pub(crate) const LOG_ACTION_SKIPPED_OWNED: &str = "log.action.skipped.owned";
pub(crate) const LOG_ACTION_SKIPPED_DELEGATION: &str = "log.action.skipped.delegation";
pub(crate) const LOG_ACTION_DELEGATED: &str = "log.action.delegated";
pub(crate) const LOG_FUNDRAISE_SUCCESS: &str = "log.fundraise.success";
pub(crate) const LOG_FUNDRAISE_FAILED: &str = "log.fundraise.failed";
pub(crate) const LOG_HIRE_STAFF: &str = "log.hire.staff";
pub(crate) const LOG_HIRE_RESEARCHER: &str = "log.hire.researcher";
pub(crate) const LOG_SAFETY_RESEARCH: &str = "log.research.safety";
pub(crate) const LOG_BUY_COMPUTE: &str = "log.compute.bought";
pub(crate) const LOG_OUTREACH: &str = "log.outreach";
pub(crate) const LOG_SCOUT_OPPONENT: &str = "log.scout.opponent";
pub(crate) const LOG_SCOUT_STAT: &str = "log.scout.stat";
pub(crate) const LOG_SCOUT_FAILED: &str = "log.scout.failed";
pub(crate) const LOG_SCOUT_NOTHING: &str = "log.scout.nothing";
pub(crate) const LOG_ESPIONAGE_SUCCESS: &str = "log.espionage.success";
pub(crate) const LOG_ESPIONAGE_FAILED: &str = "log.espionage.failed";
pub(crate) const LOG_ESPIONAGE_SCANDAL: &str = "log.espionage.scandal";
pub(crate) const LOG_ESPIONAGE_NO_TARGET: &str = "log.espionage.no-target";
pub(crate) const LOG_ADOPT_PET: &str = "log.pet.adopted";
pub(crate) const LOG_UPGRADE: &str = "log.upgrade";
pub(crate) const LOG_PAPER_PUBLISHED: &str = "log.research.paper";
pub(crate) const LOG_MAINTENANCE_SHORTFALL: &str = "log.maintenance.shortfall";
pub(crate) const LOG_ATTRITION: &str = "log.maintenance.attrition";
pub(crate) const LOG_ATTRITION_SUPPRESSED: &str = "log.maintenance.attrition-suppressed";
pub(crate) const LOG_OPPONENT_PROGRESS: &str = "log.opponent.progress";
pub(crate) const LOG_DOOM_CHANGE: &str = "log.doom.change";
pub(crate) const LOG_MILESTONE: &str = "log.milestone";
pub(crate) const LOG_DIALOG_RESOLVED: &str = "log.dialog.resolved";

// Action costs -------------------------------------------------------------
pub const FUNDRAISE_COST: i64 = 0;
pub const HIRE_STAFF_COST: i64 = 5_000;
pub const HIRE_RESEARCHER_COST: i64 = 12_000;
pub const SAFETY_RESEARCH_COST: i64 = 8_000;
pub const BUY_COMPUTE_COST: i64 = 10_000;
pub const BUY_COMPUTE_UNITS: i32 = 10;
pub const PUBLIC_OUTREACH_COST: i64 = 3_000;
pub const PUBLIC_OUTREACH_REPUTATION: i32 = 3;
pub const SCOUT_COST: i64 = 2_000;
pub const ESPIONAGE_COST: i64 = 15_000;
pub const ESPIONAGE_AP_COST: i32 = 2;
pub const ADOPT_PET_COST: i64 = 1_000;
pub const ADOPT_PET_REPUTATION: i32 = 1;
pub const RETENTION_PROGRAM_COST: i64 = 20_000;
pub const MANAGEMENT_SYSTEMS_COST: i64 = 25_000;
pub const RESEARCHER_MIN_PRODUCTIVITY: i64 = 3;
pub const RESEARCHER_MAX_PRODUCTIVITY: i64 = 8;
/// Owned compute units per extra research point each turn.
pub const COMPUTE_PER_RESEARCH_POINT: i32 = 10;
/// Share of a safety specialist's weight credited by interpretability work.
pub const INTERPRETABILITY_SAFETY_SHARE: f64 = 0.5;

// Scheduled and dialog events ----------------------------------------------
pub const INVESTOR_MEETING_TURN: u32 = 5;
pub const COMPUTE_SURGE_TURN: u32 = 12;
pub const STAFF_POACHED_LOSS: i32 = 1;
pub const INVESTOR_ACCEPT_FUNDS: i64 = 50_000;
pub const INVESTOR_ACCEPT_DOOM: i32 = 2;
pub const INVESTOR_DECLINE_REPUTATION: i32 = 2;
pub const REGULATORY_COOPERATE_COST: i64 = 5_000;
pub const REGULATORY_COOPERATE_DOOM: i32 = 1;
pub const REGULATORY_STONEWALL_REPUTATION: i32 = 4;

// Rival labs ---------------------------------------------------------------
/// Progress at which a rival ships and the game is lost.
pub const OPPONENT_COMPLETION_PROGRESS: i32 = 100;
pub const OPPONENT_COMPUTE_COST: i64 = 10_000;
pub const OPPONENT_COMPUTE_UNITS: i32 = 5;
/// Owned compute units per extra point of rival progress each turn.
pub const OPPONENT_COMPUTE_PER_BONUS_PROGRESS: i32 = 50;
pub const OPPONENT_INVEST_CHANCE: f64 = 0.3;

// Milestones ---------------------------------------------------------------
pub const MILESTONE_STAFF_FIVE: i32 = 5;
pub const MILESTONE_STAFF_TEN: i32 = 10;
pub const MILESTONE_REPUTATION_BONUS: i32 = 2;
