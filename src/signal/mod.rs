//! Signal extraction: from smoothed keypoints to one scalar per frame.

mod extractor;
pub mod geometry;
mod profile;
mod smoothing;

pub use extractor::{ExerciseSignal, SignalExtractor};
pub use profile::{AngleChain, ExerciseProfile, ProfileTable, Side, SignalFormula};
pub use smoothing::Smoothing;
