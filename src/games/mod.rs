pub mod selector;
pub mod simulation;
pub mod types;

pub use selector::select_outcome;
pub use simulation::SimulatedBetting;
pub use types::*;
