//! Rep state machine: turns the exercise signal into phases and rep counts.

mod machine;
mod state;
mod thresholds;

pub use machine::{MachineSettings, RepStateMachine, StepOutcome};
pub use state::{RepPhase, RepState};
pub use thresholds::{MotionKind, Thresholds};
