//! Pose/hand result join
//!
//! Pose and hand detectors report independently. Each keeps a "latest value
//! + timestamp" slot here; after every update `try_emit` pairs the two slots
//! if their timestamps are close enough. A mismatched pair would silently
//! corrupt the feature vector, so out-of-tolerance results are dropped.

use log::debug;

use super::frame::{KeypointFrame, Point2D, LEFT_SHOULDER, RIGHT_SHOULDER};
use crate::config::JoinConfig;

struct PoseSlot {
    points: Vec<Point2D>,
    timestamp_ms: i64,
}

struct HandsSlot {
    left: Vec<Point2D>,
    right: Vec<Point2D>,
    timestamp_ms: i64,
}

/// Two-slot staging area that turns detector callbacks into frames
pub struct FrameJoiner {
    config: JoinConfig,
    pose: Option<PoseSlot>,
    hands: Option<HandsSlot>,
    dropped: u64,
}

impl FrameJoiner {
    pub fn new(config: JoinConfig) -> Self {
        Self {
            config,
            pose: None,
            hands: None,
            dropped: 0,
        }
    }

    /// Stage a pose result (empty list = no person found)
    pub fn on_pose(&mut self, points: Vec<Point2D>, timestamp_ms: i64) -> Option<KeypointFrame> {
        self.pose = Some(PoseSlot { points, timestamp_ms });
        self.try_emit()
    }

    /// Stage a hands result (empty list = hand not found)
    pub fn on_hands(
        &mut self,
        left: Vec<Point2D>,
        right: Vec<Point2D>,
        timestamp_ms: i64,
    ) -> Option<KeypointFrame> {
        self.hands = Some(HandsSlot { left, right, timestamp_ms });
        self.try_emit()
    }

    /// Pair the two slots if both are filled and close in time.
    ///
    /// A successful pair consumes both slots. Out of tolerance, the older
    /// slot is discarded and the newer one waits for its partner.
    pub fn try_emit(&mut self) -> Option<KeypointFrame> {
        let (pose_ts, hands_ts) = match (&self.pose, &self.hands) {
            (Some(p), Some(h)) => (p.timestamp_ms, h.timestamp_ms),
            _ => return None,
        };

        if pose_ts.abs_diff(hands_ts) >= self.config.tolerance_ms.unsigned_abs() {
            self.dropped += 1;
            debug!(
                "join: dropping stale {} result (pose={}ms hands={}ms)",
                if pose_ts < hands_ts { "pose" } else { "hands" },
                pose_ts,
                hands_ts
            );
            if pose_ts < hands_ts {
                self.pose = None;
            } else {
                self.hands = None;
            }
            return None;
        }

        let pose = self.pose.take()?;
        let hands = self.hands.take()?;
        let (left, right) = if self.config.swap_hands_by_shoulder {
            order_by_shoulder(&pose.points, hands.left, hands.right)
        } else {
            (hands.left, hands.right)
        };

        let hands_visible = !left.is_empty() || !right.is_empty();
        Some(KeypointFrame::from_lists(
            pose.points,
            left,
            right,
            hands_visible,
            pose_ts.max(hands_ts),
        ))
    }

    /// Results discarded for timestamp mismatch since the last reset
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.pose = None;
        self.hands = None;
        self.dropped = 0;
    }
}

/// Swap hands when the detector's handedness disagrees with the body.
///
/// Only applies when both hands and both shoulders are present.
fn order_by_shoulder(
    pose: &[Point2D],
    left: Vec<Point2D>,
    right: Vec<Point2D>,
) -> (Vec<Point2D>, Vec<Point2D>) {
    if left.is_empty() || right.is_empty() {
        return (left, right);
    }
    match (pose.get(LEFT_SHOULDER), pose.get(RIGHT_SHOULDER)) {
        (Some(ls), Some(rs)) if ls.x > rs.x => (right, left),
        _ => (left, right),
    }
}
