use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::RepError,
    models::{ExerciseType, FeedbackCategory, FeedbackEvent},
    signal::ExerciseSignal,
};

use super::{MotionKind, RepPhase, RepState, Thresholds};

/// Transitions are re-evaluated against the same sample until none applies,
/// so a coarse frame rate can cross several phases at once. No sequence of
/// rules can cycle, this only bounds the loop.
const MAX_TRANSITIONS_PER_SIGNAL: usize = 4;

const ACHIEVEMENT_EVERY: u32 = 10;

const MOTIVATIONAL_LINES: [&str; 5] = [
    "Keep pushing, you're doing great!",
    "Stay strong, every rep counts!",
    "You're unstoppable, keep going!",
    "Feel the burn, embrace the progress!",
    "Every step forward is a step closer to your goal!",
];

/// Per-exercise knobs the machine is generic over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSettings {
    pub thresholds: Thresholds,
    /// Full cycles faster than this are counted but flagged.
    pub min_rep_secs: f64,
    /// Consecutive invalid signals tolerated before falling back to `Idle`.
    pub max_invalid_frames: u32,
    pub kind: MotionKind,
}

/// Result of feeding one signal to the machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub transitions: Vec<(RepPhase, RepPhase)>,
    pub rep_completed: bool,
    pub feedback: Vec<FeedbackEvent>,
}

impl StepOutcome {
    pub fn changed_phase(&self) -> bool {
        !self.transitions.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RepStateMachine {
    settings: MachineSettings,
    state: RepState,
    invalid_streak: u32,
    /// Frame time at which the current cycle left `Top`.
    cycle_started_at: Option<f64>,
    last_timestamp: Option<f64>,
    pace_warnings: u32,
}

impl RepStateMachine {
    pub fn new(exercise_type: ExerciseType, settings: MachineSettings) -> Self {
        Self {
            settings,
            state: RepState::new(exercise_type),
            invalid_streak: 0,
            cycle_started_at: None,
            last_timestamp: None,
            pace_warnings: 0,
        }
    }

    pub fn state(&self) -> &RepState {
        &self.state
    }

    pub fn phase(&self) -> RepPhase {
        self.state.phase
    }

    pub fn rep_count(&self) -> u32 {
        self.state.rep_count
    }

    pub fn pace_warnings(&self) -> u32 {
        self.pace_warnings
    }

    pub fn settings(&self) -> &MachineSettings {
        &self.settings
    }

    pub fn update(&mut self, signal: &ExerciseSignal) -> Result<StepOutcome, RepError> {
        let last = self.last_timestamp.unwrap_or(f64::NEG_INFINITY);
        if !signal.timestamp.is_finite() || signal.timestamp <= last {
            return Err(RepError::OutOfOrderFrame {
                timestamp: signal.timestamp,
                last,
            });
        }
        self.last_timestamp = Some(signal.timestamp);

        let mut outcome = StepOutcome::default();

        if !signal.valid {
            self.invalid_streak = self.invalid_streak.saturating_add(1);
            if self.invalid_streak > self.settings.max_invalid_frames
                && self.state.phase != RepPhase::Idle
            {
                let message = format!(
                    "Tracking lost for {} frames, waiting for start position",
                    self.invalid_streak
                );
                self.transition(RepPhase::Idle, signal.timestamp, &mut outcome);
                outcome.feedback.push(FeedbackEvent::new(
                    signal.timestamp,
                    FeedbackCategory::Warning,
                    message,
                ));
            }
            return Ok(outcome);
        }
        self.invalid_streak = 0;

        for _ in 0..MAX_TRANSITIONS_PER_SIGNAL {
            match self.next_phase(signal.value) {
                Some(next) => self.transition(next, signal.timestamp, &mut outcome),
                None => break,
            }
        }

        Ok(outcome)
    }

    fn next_phase(&self, value: f64) -> Option<RepPhase> {
        let t = &self.settings.thresholds;
        match self.state.phase {
            RepPhase::Idle if value >= t.upper => Some(RepPhase::Top),
            RepPhase::Top if value <= t.descend_below() => Some(RepPhase::Descending),
            RepPhase::Descending if value <= t.lower => Some(RepPhase::Bottom),
            RepPhase::Descending if value >= t.upper => Some(RepPhase::Top),
            RepPhase::Bottom if value >= t.ascend_above() => Some(RepPhase::Ascending),
            RepPhase::Ascending if value >= t.upper => Some(RepPhase::Top),
            RepPhase::Ascending if value <= t.lower => Some(RepPhase::Bottom),
            _ => None,
        }
    }

    fn transition(&mut self, next: RepPhase, timestamp: f64, outcome: &mut StepOutcome) {
        let previous = self.state.phase;
        let kind = self.settings.kind;

        match (previous, next) {
            (RepPhase::Top, RepPhase::Descending) => {
                self.cycle_started_at = Some(timestamp);
                if kind == MotionKind::Hold {
                    outcome.feedback.push(FeedbackEvent::new(
                        timestamp,
                        FeedbackCategory::Form,
                        "Hips are sagging, hold a straight line",
                    ));
                }
            }
            (RepPhase::Descending, RepPhase::Top) => {
                self.cycle_started_at = None;
                if kind == MotionKind::Reps {
                    outcome.feedback.push(FeedbackEvent::new(
                        timestamp,
                        FeedbackCategory::Form,
                        "Go deeper, partial rep not counted",
                    ));
                }
            }
            (RepPhase::Ascending, RepPhase::Top) => {
                if kind == MotionKind::Reps {
                    self.complete_rep(timestamp, outcome);
                }
                self.cycle_started_at = None;
            }
            (_, RepPhase::Idle) => {
                self.cycle_started_at = None;
            }
            _ => {}
        }

        debug!(
            "{} phase {} -> {} at {:.3}",
            self.state.exercise_type,
            previous.as_str(),
            next.as_str(),
            timestamp
        );

        self.state.phase = next;
        self.state.last_transition_time = Some(timestamp);
        outcome.transitions.push((previous, next));
    }

    fn complete_rep(&mut self, timestamp: f64, outcome: &mut StepOutcome) {
        self.state.rep_count = self.state.rep_count.saturating_add(1);
        outcome.rep_completed = true;

        if let Some(started) = self.cycle_started_at {
            let rep_secs = timestamp - started;
            if rep_secs < self.settings.min_rep_secs {
                self.pace_warnings += 1;
                outcome.feedback.push(FeedbackEvent::new(
                    timestamp,
                    FeedbackCategory::Pace,
                    format!(
                        "Rep too fast: {:.2}s (minimum {:.2}s)",
                        rep_secs, self.settings.min_rep_secs
                    ),
                ));
            }
        }

        let count = self.state.rep_count;
        if count % ACHIEVEMENT_EVERY == 0 {
            let line = MOTIVATIONAL_LINES
                [((count / ACHIEVEMENT_EVERY - 1) as usize) % MOTIVATIONAL_LINES.len()];
            outcome.feedback.push(FeedbackEvent::new(
                timestamp,
                FeedbackCategory::Achievement,
                format!("{count} reps completed! {line}"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MachineSettings {
        MachineSettings {
            thresholds: Thresholds::new(160.0, 90.0, 5.0),
            min_rep_secs: 1.0,
            max_invalid_frames: 3,
            kind: MotionKind::Reps,
        }
    }

    fn machine() -> RepStateMachine {
        RepStateMachine::new(ExerciseType::Squat, settings())
    }

    fn feed(machine: &mut RepStateMachine, values: &[f64], start: f64, step: f64) -> Vec<StepOutcome> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                machine
                    .update(&ExerciseSignal::valid(start + i as f64 * step, *value, 0.9))
                    .unwrap()
            })
            .collect()
    }

    /// Triangle wave between `upper` and `lower`, starting and ending at `upper`,
    /// sampled so both extremes land exactly on a sample.
    fn triangle_wave(cycles: usize, fps: usize, period_secs: usize, upper: f64, lower: f64) -> Vec<(f64, f64)> {
        let per_cycle = fps * period_secs;
        (0..=cycles * per_cycle)
            .map(|i| {
                let phase = i % per_cycle;
                let distance = phase.min(per_cycle - phase);
                let value = if distance * 2 == per_cycle {
                    lower
                } else {
                    upper - (upper - lower) * (2 * distance) as f64 / per_cycle as f64
                };
                (i as f64 / fps as f64, value)
            })
            .collect()
    }

    #[test]
    fn test_worked_squat_example() {
        let mut m = machine();
        let outcomes = feed(&mut m, &[170.0, 155.0, 120.0, 85.0, 95.0, 140.0, 165.0], 0.0, 0.5);

        let mut phases = Vec::new();
        let mut counts = Vec::new();
        let mut replay = machine();
        for (i, value) in [170.0, 155.0, 120.0, 85.0, 95.0, 140.0, 165.0].iter().enumerate() {
            replay
                .update(&ExerciseSignal::valid(i as f64 * 0.5, *value, 0.9))
                .unwrap();
            phases.push(replay.phase());
            counts.push(replay.rep_count());
        }

        assert_eq!(
            phases,
            vec![
                RepPhase::Top,
                RepPhase::Descending,
                RepPhase::Descending,
                RepPhase::Bottom,
                RepPhase::Ascending,
                RepPhase::Ascending,
                RepPhase::Top,
            ]
        );
        assert_eq!(counts, vec![0, 0, 0, 0, 0, 0, 1]);
        assert!(outcomes[6].rep_completed);
        assert_eq!(m.rep_count(), 1);
    }

    #[test]
    fn test_rep_count_independent_of_frame_rate() {
        for fps in [10, 30, 60] {
            let mut m = machine();
            for (t, value) in triangle_wave(7, fps, 2, 160.0, 90.0) {
                m.update(&ExerciseSignal::valid(t, value, 0.9)).unwrap();
            }
            assert_eq!(m.rep_count(), 7, "fps {fps}");
            assert_eq!(m.phase(), RepPhase::Top);
        }
    }

    #[test]
    fn test_coarse_sampling_cascades_transitions() {
        let mut m = machine();
        let outcomes = feed(&mut m, &[170.0, 80.0, 170.0], 0.0, 1.0);
        assert_eq!(
            outcomes[1].transitions,
            vec![
                (RepPhase::Top, RepPhase::Descending),
                (RepPhase::Descending, RepPhase::Bottom)
            ]
        );
        assert!(outcomes[2].rep_completed);
        assert_eq!(m.rep_count(), 1);
    }

    #[test]
    fn test_jitter_inside_hysteresis_band_does_not_count() {
        let mut m = machine();
        // Reaches bottom, then jitters between lower and lower + margin without
        // clearing the band, then sinks again.
        feed(&mut m, &[170.0, 150.0, 89.0, 92.0, 90.5, 94.0, 88.0, 93.0], 0.0, 0.5);
        assert_eq!(m.phase(), RepPhase::Bottom);
        assert_eq!(m.rep_count(), 0);

        // Jitter just under the upper threshold never leaves Top either.
        let mut m = machine();
        let outcomes = feed(&mut m, &[170.0, 158.0, 161.0, 156.0, 159.0], 0.0, 0.5);
        assert!(outcomes[1..].iter().all(|o| !o.changed_phase()));
        assert_eq!(m.phase(), RepPhase::Top);
    }

    #[test]
    fn test_shallow_descent_is_not_a_rep() {
        let mut m = machine();
        let outcomes = feed(&mut m, &[170.0, 140.0, 100.0, 130.0, 165.0], 0.0, 0.5);
        assert_eq!(m.rep_count(), 0);
        assert_eq!(m.phase(), RepPhase::Top);
        let form = &outcomes[4].feedback;
        assert_eq!(form.len(), 1);
        assert_eq!(form[0].category, FeedbackCategory::Form);
    }

    #[test]
    fn test_invalid_signal_never_changes_phase() {
        let mut m = machine();
        feed(&mut m, &[170.0, 150.0], 0.0, 0.5);
        assert_eq!(m.phase(), RepPhase::Descending);

        for i in 0..3 {
            let outcome = m
                .update(&ExerciseSignal::invalid(2.0 + i as f64))
                .unwrap();
            assert!(!outcome.changed_phase());
            assert_eq!(m.phase(), RepPhase::Descending);
        }
    }

    #[test]
    fn test_long_invalid_streak_drops_to_idle_and_keeps_count() {
        let mut m = machine();
        feed(&mut m, &[170.0, 150.0, 85.0, 100.0, 170.0, 150.0], 0.0, 1.0);
        assert_eq!(m.rep_count(), 1);

        let mut last = StepOutcome::default();
        for i in 0..4 {
            last = m.update(&ExerciseSignal::invalid(10.0 + i as f64)).unwrap();
        }
        assert_eq!(m.phase(), RepPhase::Idle);
        assert_eq!(m.rep_count(), 1);
        assert_eq!(last.feedback[0].category, FeedbackCategory::Warning);

        // Resumes from the start position only.
        m.update(&ExerciseSignal::valid(20.0, 100.0, 0.9)).unwrap();
        assert_eq!(m.phase(), RepPhase::Idle);
        m.update(&ExerciseSignal::valid(21.0, 165.0, 0.9)).unwrap();
        assert_eq!(m.phase(), RepPhase::Top);
        assert_eq!(m.rep_count(), 1);
    }

    #[test]
    fn test_out_of_order_signal_is_rejected_without_state_change() {
        let mut m = machine();
        feed(&mut m, &[170.0, 150.0], 0.0, 1.0);
        let before = m.state().clone();
        let err = m.update(&ExerciseSignal::valid(0.5, 80.0, 0.9)).unwrap_err();
        assert!(matches!(err, RepError::OutOfOrderFrame { .. }));
        assert_eq!(m.state(), &before);
    }

    #[test]
    fn test_fast_rep_is_counted_and_flagged() {
        let mut m = machine();
        let outcomes = feed(&mut m, &[170.0, 150.0, 85.0, 100.0, 165.0], 0.0, 0.1);
        assert_eq!(m.rep_count(), 1);
        assert_eq!(m.pace_warnings(), 1);
        let pace: Vec<_> = outcomes[4]
            .feedback
            .iter()
            .filter(|e| e.category == FeedbackCategory::Pace)
            .collect();
        assert_eq!(pace.len(), 1);
        assert!(pace[0].message.contains("too fast"));
    }

    #[test]
    fn test_slow_rep_has_no_pace_warning() {
        let mut m = machine();
        let outcomes = feed(&mut m, &[170.0, 150.0, 85.0, 100.0, 165.0], 0.0, 0.5);
        assert_eq!(m.rep_count(), 1);
        assert_eq!(m.pace_warnings(), 0);
        assert!(outcomes[4].feedback.is_empty());
    }

    #[test]
    fn test_achievement_every_tenth_rep() {
        let mut m = machine();
        let mut achievements = Vec::new();
        let mut t = 0.0;
        let mut previous = 0;
        for _ in 0..20 {
            for value in [170.0, 150.0, 85.0, 100.0] {
                m.update(&ExerciseSignal::valid(t, value, 0.9)).unwrap();
                t += 0.5;
            }
            let outcome = m.update(&ExerciseSignal::valid(t, 170.0, 0.9)).unwrap();
            t += 0.5;
            assert!(m.rep_count() >= previous);
            previous = m.rep_count();
            achievements.extend(
                outcome
                    .feedback
                    .into_iter()
                    .filter(|e| e.category == FeedbackCategory::Achievement),
            );
        }
        assert_eq!(m.rep_count(), 20);
        assert_eq!(achievements.len(), 2);
        assert!(achievements[0].message.starts_with("10 reps"));
        assert!(achievements[1].message.starts_with("20 reps"));
    }

    #[test]
    fn test_hold_mode_never_counts_reps() {
        let mut m = RepStateMachine::new(
            ExerciseType::Plank,
            MachineSettings {
                thresholds: Thresholds::new(160.0, 140.0, 5.0),
                min_rep_secs: 0.0,
                max_invalid_frames: 3,
                kind: MotionKind::Hold,
            },
        );
        let outcomes = feed(&mut m, &[175.0, 150.0, 135.0, 150.0, 170.0], 0.0, 1.0);
        assert_eq!(m.rep_count(), 0);
        assert_eq!(m.phase(), RepPhase::Top);
        assert_eq!(outcomes[1].feedback[0].category, FeedbackCategory::Form);
    }
}
