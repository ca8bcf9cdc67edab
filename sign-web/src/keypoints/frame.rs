//! Keypoint frame - one paired sample of pose + two hands
//!
//! Coordinates are MediaPipe-normalized image space (nominally 0-1, not
//! clamped). Absent landmark sets are stored empty so consumers can index
//! with `get` and fall through to zeros.

// ============================================================================
// LANDMARK INDICES (MediaPipe Pose - 33 total)
// ============================================================================

pub const POSE_LANDMARKS: usize = 33;
pub const HAND_LANDMARKS: usize = 21;

pub const NOSE: usize = 0;
pub const LEFT_EYE: usize = 2;
pub const RIGHT_EYE: usize = 5;
pub const LEFT_EAR: usize = 7;
pub const RIGHT_EAR: usize = 8;
pub const MOUTH_LEFT: usize = 9;
pub const MOUTH_RIGHT: usize = 10;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_PINKY: usize = 17;
pub const RIGHT_PINKY: usize = 18;
pub const LEFT_INDEX: usize = 19;
pub const RIGHT_INDEX: usize = 20;
pub const LEFT_THUMB: usize = 21;
pub const RIGHT_THUMB: usize = 22;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A single 2D landmark (normalized coordinates)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2D {
    pub x: f32, // 0-1 normalized
    pub y: f32, // 0-1 normalized
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One analyzed camera frame. Immutable once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeypointFrame {
    pose: Vec<Point2D>,
    left_hand: Vec<Point2D>,
    right_hand: Vec<Point2D>,
    hands_visible: bool,
    timestamp_ms: i64,
}

impl KeypointFrame {
    pub fn new(
        pose: Option<[Point2D; POSE_LANDMARKS]>,
        left_hand: Option<[Point2D; HAND_LANDMARKS]>,
        right_hand: Option<[Point2D; HAND_LANDMARKS]>,
        hands_visible: bool,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            pose: pose.map(Vec::from).unwrap_or_default(),
            left_hand: left_hand.map(Vec::from).unwrap_or_default(),
            right_hand: right_hand.map(Vec::from).unwrap_or_default(),
            hands_visible,
            timestamp_ms,
        }
    }

    /// Frame with nothing detected
    pub fn empty(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            ..Default::default()
        }
    }

    /// Build from detector lists of arbitrary length.
    ///
    /// A list is kept only if it has exactly the expected point count;
    /// anything else is treated as absent.
    pub fn from_lists(
        pose: Vec<Point2D>,
        left_hand: Vec<Point2D>,
        right_hand: Vec<Point2D>,
        hands_visible: bool,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            pose: keep_if_len(pose, POSE_LANDMARKS),
            left_hand: keep_if_len(left_hand, HAND_LANDMARKS),
            right_hand: keep_if_len(right_hand, HAND_LANDMARKS),
            hands_visible,
            timestamp_ms,
        }
    }

    pub fn pose(&self) -> &[Point2D] {
        &self.pose
    }

    pub fn left_hand(&self) -> &[Point2D] {
        &self.left_hand
    }

    pub fn right_hand(&self) -> &[Point2D] {
        &self.right_hand
    }

    pub fn hands_visible(&self) -> bool {
        self.hands_visible
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn has_pose(&self) -> bool {
        !self.pose.is_empty()
    }
}

fn keep_if_len(points: Vec<Point2D>, expected: usize) -> Vec<Point2D> {
    if points.len() == expected {
        points
    } else {
        Vec::new()
    }
}

/// Parse a flat `[x, y, (z), x, y, (z), ...]` buffer.
///
/// Returns an empty list for an empty buffer and `None` when the length does
/// not describe exactly `count` points at the given stride.
pub fn points_from_flat(data: &[f32], stride: usize, count: usize) -> Option<Vec<Point2D>> {
    if data.is_empty() {
        return Some(Vec::new());
    }
    if stride < 2 || data.len() != stride * count {
        return None;
    }
    Some(
        data.chunks_exact(stride)
            .map(|c| Point2D::new(c[0], c[1]))
            .collect(),
    )
}
