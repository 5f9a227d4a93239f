pub mod policy;
pub mod reports;
pub mod seeds;
pub mod simulation;

pub use policy::GameplayStrategy;
pub use seeds::{SeedInfo, resolve_seed_inputs, split_csv};
pub use simulation::{ReplayCheck, RunSummary, SimulationConfig, replay_check, run_game};
