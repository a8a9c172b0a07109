pub mod exercise;
pub mod feedback;
pub mod keypoint;
pub mod session;

pub use exercise::ExerciseType;
pub use feedback::{FeedbackCategory, FeedbackEvent};
pub use keypoint::{Frame, Joint, JointObservation, Keypoint};
pub use session::{ActivityRecord, Performance, RepSnapshot, SessionSummary};
