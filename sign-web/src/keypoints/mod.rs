//! Keypoints module - detector output model and pose/hand join
//!
//! Re-exports only. All logic in submodules.

mod frame;
mod join;

pub use frame::{
    points_from_flat, KeypointFrame, Point2D,
    // Constants
    HAND_LANDMARKS, POSE_LANDMARKS,
    NOSE, LEFT_EYE, RIGHT_EYE, LEFT_EAR, RIGHT_EAR, MOUTH_LEFT, MOUTH_RIGHT,
    LEFT_SHOULDER, RIGHT_SHOULDER, LEFT_ELBOW, RIGHT_ELBOW, LEFT_WRIST, RIGHT_WRIST,
    LEFT_PINKY, RIGHT_PINKY, LEFT_INDEX, RIGHT_INDEX, LEFT_THUMB, RIGHT_THUMB,
    LEFT_HIP, RIGHT_HIP, LEFT_KNEE, RIGHT_KNEE, LEFT_ANKLE, RIGHT_ANKLE,
};
pub use join::FrameJoiner;
