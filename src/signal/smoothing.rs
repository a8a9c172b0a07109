use serde::{Deserialize, Serialize};

use super::geometry::Point;
use crate::{ingest::FrameBuffer, models::Joint};

/// Jitter filter applied to joint positions across the frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Smoothing {
    /// Latest confident observation only.
    None,
    /// Mean of the confident observations in the newest `window` frames.
    MovingAverage { window: usize },
    /// Exponential smoothing over the whole buffer, oldest first.
    Exponential { alpha: f64 },
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::MovingAverage { window: 3 }
    }
}

impl Smoothing {
    /// Smoothed position of `joint`, ignoring observations below `min_confidence`.
    pub fn position(&self, buffer: &FrameBuffer, joint: Joint, min_confidence: f64) -> Option<Point> {
        let confident = |frame: &crate::models::Frame| {
            frame
                .get(joint)
                .filter(|kp| kp.is_confident(min_confidence))
                .map(|kp| Point::new(kp.x, kp.y))
        };

        match *self {
            Smoothing::None => buffer.latest().and_then(confident),
            Smoothing::MovingAverage { window } => {
                let (sum_x, sum_y, n) = buffer
                    .recent(window.max(1))
                    .filter_map(confident)
                    .fold((0.0, 0.0, 0usize), |(sx, sy, n), p| (sx + p.x, sy + p.y, n + 1));
                (n > 0).then(|| Point::new(sum_x / n as f64, sum_y / n as f64))
            }
            Smoothing::Exponential { alpha } => {
                let alpha = alpha.clamp(0.0, 1.0);
                buffer.iter().filter_map(confident).fold(None, |acc, p| {
                    Some(match acc {
                        None => p,
                        Some(prev) => Point::new(
                            alpha * p.x + (1.0 - alpha) * prev.x,
                            alpha * p.y + (1.0 - alpha) * prev.y,
                        ),
                    })
                })
            }
        }
    }
}
