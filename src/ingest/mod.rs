//! Keypoint ingest: gatekeeper between the pose provider and the extractor.
//!
//! Frames arrive at whatever rate the camera produces them. A frame is
//! accepted into the rolling buffer only if its timestamp moves the clock
//! forward and enough of its keypoints are confident; rejected frames are
//! dropped outright.

mod buffer;

pub use buffer::FrameBuffer;

use log::debug;

use crate::{error::RepError, models::Frame};

#[derive(Debug, Clone)]
pub struct KeypointIngest {
    min_confidence: f64,
    min_keypoints: usize,
    buffer: FrameBuffer,
    last_timestamp: Option<f64>,
}

impl KeypointIngest {
    pub fn new(min_confidence: f64, min_keypoints: usize, buffer_len: usize) -> Self {
        Self {
            min_confidence,
            min_keypoints,
            buffer: FrameBuffer::new(buffer_len),
            last_timestamp: None,
        }
    }

    /// Validates and buffers a frame, returning the updated window.
    pub fn accept(&mut self, frame: Frame) -> Result<&FrameBuffer, RepError> {
        let last = self.last_timestamp.unwrap_or(f64::NEG_INFINITY);
        if !frame.timestamp.is_finite() || frame.timestamp <= last {
            debug!(
                "rejecting frame at {} (last accepted {:?})",
                frame.timestamp, self.last_timestamp
            );
            return Err(RepError::OutOfOrderFrame {
                timestamp: frame.timestamp,
                last,
            });
        }

        let found = frame.confident_count(self.min_confidence);
        if found < self.min_keypoints {
            return Err(RepError::InsufficientKeypoints {
                found,
                required: self.min_keypoints,
            });
        }

        self.last_timestamp = Some(frame.timestamp);
        self.buffer.push(frame);
        Ok(&self.buffer)
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }
}
