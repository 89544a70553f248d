// =============================================================================
// Halving Cycle Model
// =============================================================================
//
// A fixed schedule of supply-halving epochs (historical dates plus projected
// future ones) and the phase model that maps elapsed time since the latest
// epoch onto a named phase and a signed phase score.

pub mod phase;
pub mod schedule;

pub use phase::{CycleContribution, CycleInfo, CyclePhase, CycleStance};
pub use schedule::HalvingSchedule;
