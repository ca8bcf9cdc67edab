//! Feature extraction for sign classification
//!
//! Encodes one keypoint frame as 134 floats matching the training layout:
//! - 0..50:    25 selected pose points (x, y interleaved)
//! - 50..92:   left hand, 21 points
//! - 92..134:  right hand, 21 points
//!
//! Hands are always written in anatomical order. Preview mirroring is a
//! display concern and never reaches this encoder.

use crate::keypoints::{
    KeypointFrame, Point2D, HAND_LANDMARKS, LEFT_ANKLE, LEFT_EAR, LEFT_ELBOW, LEFT_EYE, LEFT_HIP,
    LEFT_INDEX, LEFT_KNEE, LEFT_PINKY, LEFT_SHOULDER, LEFT_THUMB, LEFT_WRIST, MOUTH_LEFT,
    MOUTH_RIGHT, NOSE, RIGHT_ANKLE, RIGHT_EAR, RIGHT_ELBOW, RIGHT_EYE, RIGHT_HIP, RIGHT_INDEX,
    RIGHT_KNEE, RIGHT_PINKY, RIGHT_SHOULDER, RIGHT_THUMB, RIGHT_WRIST,
};

/// Number of pose points kept out of the 33
pub const POSE_SELECTED: usize = 25;

/// Floats per frame
pub const FEATURE_DIM: usize = (POSE_SELECTED + HAND_LANDMARKS * 2) * 2;

/// Start of the left-hand block
pub const LEFT_HAND_OFFSET: usize = POSE_SELECTED * 2;

/// Start of the right-hand block
pub const RIGHT_HAND_OFFSET: usize = LEFT_HAND_OFFSET + HAND_LANDMARKS * 2;

/// One encoded frame
pub type FeatureVector = [f32; FEATURE_DIM];

/// Pose subset in training order (MediaPipe indices).
///
/// Order matters: the model was trained on exactly this sequence.
pub const POSE_SELECT: [usize; POSE_SELECTED] = [
    NOSE,
    LEFT_EYE, RIGHT_EYE,
    LEFT_EAR, RIGHT_EAR,
    LEFT_SHOULDER, RIGHT_SHOULDER,
    LEFT_ELBOW, RIGHT_ELBOW,
    LEFT_WRIST, RIGHT_WRIST,
    LEFT_HIP, RIGHT_HIP,
    LEFT_KNEE, RIGHT_KNEE,
    LEFT_ANKLE, RIGHT_ANKLE,
    MOUTH_LEFT, MOUTH_RIGHT,
    LEFT_PINKY, RIGHT_PINKY,
    LEFT_INDEX, RIGHT_INDEX,
    LEFT_THUMB, RIGHT_THUMB,
];

/// Left shoulder x slot in the feature vector
pub const LEFT_SHOULDER_X: usize = pose_slot(LEFT_SHOULDER);

/// Right shoulder x slot in the feature vector
pub const RIGHT_SHOULDER_X: usize = pose_slot(RIGHT_SHOULDER);

/// x slot of a MediaPipe pose index inside the selected subset
const fn pose_slot(mp_index: usize) -> usize {
    let mut i = 0;
    while i < POSE_SELECTED {
        if POSE_SELECT[i] == mp_index {
            return i * 2;
        }
        i += 1;
    }
    panic!("pose index not in POSE_SELECT");
}

/// Frame → feature vector encoder
#[derive(Clone, Copy, Debug, Default)]
pub struct FeatureEncoder {
    /// Clamp coordinates to [0, 1]. Off by default (training did not clamp).
    clamp: bool,
}

impl FeatureEncoder {
    pub fn new(clamp: bool) -> Self {
        Self { clamp }
    }

    /// Encode one frame. Missing parts become zeros; never fails.
    pub fn encode(&self, frame: &KeypointFrame) -> FeatureVector {
        let mut out = [0.0; FEATURE_DIM];

        let pose = frame.pose();
        for (slot, &mp_index) in POSE_SELECT.iter().enumerate() {
            self.write(&mut out, slot * 2, pose.get(mp_index));
        }

        let left = frame.left_hand();
        let right = frame.right_hand();
        for i in 0..HAND_LANDMARKS {
            self.write(&mut out, LEFT_HAND_OFFSET + i * 2, left.get(i));
            self.write(&mut out, RIGHT_HAND_OFFSET + i * 2, right.get(i));
        }

        out
    }

    fn write(&self, out: &mut FeatureVector, at: usize, point: Option<&Point2D>) {
        let (x, y) = match point {
            Some(p) if self.clamp => (p.x.clamp(0.0, 1.0), p.y.clamp(0.0, 1.0)),
            Some(p) => (p.x, p.y),
            None => (0.0, 0.0),
        };
        out[at] = x;
        out[at + 1] = y;
    }
}

/// Encode with the default (unclamped) encoder
pub fn encode(frame: &KeypointFrame) -> FeatureVector {
    FeatureEncoder::default().encode(frame)
}
