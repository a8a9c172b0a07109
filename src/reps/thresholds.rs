use serde::{Deserialize, Serialize};

/// Hysteresis band for one exercise, in signal units (degrees or percent).
///
/// Leaving the start position requires dropping to `upper - margin`; leaving
/// the bottom requires climbing to `lower + margin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub upper: f64,
    pub lower: f64,
    pub margin: f64,
}

impl Thresholds {
    pub fn new(upper: f64, lower: f64, margin: f64) -> Self {
        Self {
            upper,
            lower,
            margin,
        }
    }

    pub fn descend_below(&self) -> f64 {
        self.upper - self.margin
    }

    pub fn ascend_above(&self) -> f64 {
        self.lower + self.margin
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.upper.is_finite() && self.lower.is_finite() && self.margin.is_finite()) {
            return Err("thresholds must be finite".into());
        }
        if self.margin <= 0.0 {
            return Err(format!("margin {} must be positive", self.margin));
        }
        if self.descend_below() <= self.lower {
            return Err(format!(
                "upper {} minus margin {} must stay above lower {}",
                self.upper, self.margin, self.lower
            ));
        }
        if self.ascend_above() >= self.upper {
            return Err(format!(
                "lower {} plus margin {} must stay below upper {}",
                self.lower, self.margin, self.upper
            ));
        }
        Ok(())
    }
}

/// How completed cycles are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MotionKind {
    /// Each return to the start position is one rep.
    Reps,
    /// Time spent in the start position is what counts (plank).
    Hold,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Thresholds::new(160.0, 90.0, 5.0).validate().is_ok());
        assert!(Thresholds::new(90.0, 160.0, 5.0).validate().is_err());
        assert!(Thresholds::new(100.0, 90.0, 10.0).validate().is_err());
        assert!(Thresholds::new(160.0, 90.0, -1.0).validate().is_err());
    }

    #[test]
    fn test_zero_margin_has_no_hysteresis() {
        let err = Thresholds::new(160.0, 90.0, 0.0).validate().unwrap_err();
        assert!(err.contains("margin"));
        assert!(Thresholds::new(160.0, 90.0, 0.5).validate().is_ok());
    }
}
