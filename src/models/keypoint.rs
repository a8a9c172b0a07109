//! Body keypoints and timestamped frames.
//!
//! A frame is whatever the upstream pose estimator produced for one camera
//! image: a timestamp on a monotonic clock (seconds) and a set of joints in
//! normalized `[0, 1]` image coordinates.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Fixed joint vocabulary (COCO ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub const ALL: [Joint; 17] = [
        Joint::Nose,
        Joint::LeftEye,
        Joint::RightEye,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEye => "left_eye",
            Joint::RightEye => "right_eye",
            Joint::LeftEar => "left_ear",
            Joint::RightEar => "right_ear",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Joint {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Joint::ALL
            .into_iter()
            .find(|joint| joint.as_str() == value)
            .ok_or_else(|| format!("unknown joint '{value}'"))
    }
}

/// One detected joint position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: Joint,
    pub x: f64,
    pub y: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(name: Joint, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            name,
            x,
            y,
            confidence,
        }
    }

    pub fn is_confident(&self, min_confidence: f64) -> bool {
        self.confidence >= min_confidence
    }
}

/// Position and confidence of a joint without its name, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointObservation {
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrameWire {
    timestamp: f64,
    keypoints: BTreeMap<Joint, JointObservation>,
}

/// Timestamped set of keypoints, at most one per joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FrameWire", into = "FrameWire")]
pub struct Frame {
    pub timestamp: f64,
    pub keypoints: BTreeMap<Joint, Keypoint>,
}

impl Frame {
    pub fn new(timestamp: f64, keypoints: impl IntoIterator<Item = Keypoint>) -> Self {
        Self {
            timestamp,
            keypoints: keypoints
                .into_iter()
                .map(|keypoint| (keypoint.name, keypoint))
                .collect(),
        }
    }

    pub fn get(&self, joint: Joint) -> Option<&Keypoint> {
        self.keypoints.get(&joint)
    }

    /// Number of keypoints at or above `min_confidence`.
    pub fn confident_count(&self, min_confidence: f64) -> usize {
        self.keypoints
            .values()
            .filter(|keypoint| keypoint.is_confident(min_confidence))
            .count()
    }
}

impl From<FrameWire> for Frame {
    fn from(wire: FrameWire) -> Self {
        Frame {
            timestamp: wire.timestamp,
            keypoints: wire
                .keypoints
                .into_iter()
                .map(|(joint, obs)| (joint, Keypoint::new(joint, obs.x, obs.y, obs.confidence)))
                .collect(),
        }
    }
}

impl From<Frame> for FrameWire {
    fn from(frame: Frame) -> Self {
        FrameWire {
            timestamp: frame.timestamp,
            keypoints: frame
                .keypoints
                .into_iter()
                .map(|(joint, kp)| {
                    (
                        joint,
                        JointObservation {
                            x: kp.x,
                            y: kp.y,
                            confidence: kp.confidence,
                        },
                    )
                })
                .collect(),
        }
    }
}
