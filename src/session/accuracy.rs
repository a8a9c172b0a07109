use serde::{Deserialize, Serialize};

/// Weights combining detection quality and tempo into a 0-100 accuracy score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccuracyWeights {
    pub confidence_weight: f64,
    pub pace_weight: f64,
}

impl Default for AccuracyWeights {
    fn default() -> Self {
        Self {
            confidence_weight: 0.6,
            pace_weight: 0.4,
        }
    }
}

impl AccuracyWeights {
    /// `100 * (cw * mean_confidence + pw * (1 - pace_warnings / reps))`, with
    /// the weights normalized to sum to one. The pace term is 1 without reps;
    /// a session with no valid frames scores 0.
    pub fn score(
        &self,
        mean_confidence: f64,
        valid_frames: u64,
        rep_count: u32,
        pace_warnings: u32,
    ) -> f64 {
        if valid_frames == 0 {
            return 0.0;
        }

        let cw = self.confidence_weight.max(0.0);
        let pw = self.pace_weight.max(0.0);
        let total = cw + pw;
        if total <= 0.0 {
            return 0.0;
        }

        let pace_quality = if rep_count == 0 {
            1.0
        } else {
            1.0 - (pace_warnings.min(rep_count) as f64 / rep_count as f64)
        };

        let score = (cw * mean_confidence.clamp(0.0, 1.0) + pw * pace_quality) / total;
        (score * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score() {
        let weights = AccuracyWeights::default();
        assert_eq!(weights.score(0.9, 0, 0, 0), 0.0);
        assert!((weights.score(1.0, 10, 10, 0) - 100.0).abs() < 1e-9);
        // 0.6 * 0.5 + 0.4 * 0.5
        assert!((weights.score(0.5, 10, 10, 5) - 50.0).abs() < 1e-9);
        assert!((weights.score(0.8, 10, 0, 0) - 88.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_are_normalized() {
        let weights = AccuracyWeights {
            confidence_weight: 3.0,
            pace_weight: 1.0,
        };
        assert!((weights.score(0.5, 1, 4, 4) - 37.5).abs() < 1e-9);
    }
}
