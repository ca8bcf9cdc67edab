//! Landmark input bridge
//!
//! Receives MediaPipe landmarks from JavaScript as flat Float32Arrays of
//! (x, y, z) triples and feeds them to the pipeline. z is ignored.
//! An empty array means "not detected".

use wasm_bindgen::prelude::*;

use super::classifier_integration::{with_pipeline, Access};
use crate::config::PipelineMode;
use crate::keypoints::{points_from_flat, KeypointFrame, Point2D, HAND_LANDMARKS, POSE_LANDMARKS};

/// Floats per landmark coming from JS
const STRIDE: usize = 3;

/// Parse one landmark set; malformed input degrades to "absent"
fn parse(name: &str, data: &[f32], count: usize) -> Vec<Point2D> {
    match points_from_flat(data, STRIDE, count) {
        Some(points) => points,
        None => {
            web_sys::console::warn_1(
                &format!(
                    "Invalid {} data length: {} (expected {} or 0)",
                    name,
                    data.len(),
                    count * STRIDE
                )
                .into(),
            );
            Vec::new()
        }
    }
}

fn warn_not_ready() {
    web_sys::console::warn_1(&"Sign pipeline not initialized".into());
}

// ============================================================================
// WASM-BINDGEN ENTRY POINTS
// ============================================================================

/// One already-joined frame: pose 99 floats, each hand 63 floats
#[wasm_bindgen]
pub fn push_frame(pose: &[f32], left: &[f32], right: &[f32], hands_visible: bool, timestamp_ms: f64) {
    let frame = KeypointFrame::from_lists(
        parse("pose", pose, POSE_LANDMARKS),
        parse("left hand", left, HAND_LANDMARKS),
        parse("right hand", right, HAND_LANDMARKS),
        hands_visible,
        timestamp_ms as i64,
    );
    if let Access::NotReady = with_pipeline(|p| p.on_frame(&frame)) {
        warn_not_ready();
    }
}

/// Pose detector result; paired with hands by timestamp
#[wasm_bindgen]
pub fn push_pose(pose: &[f32], timestamp_ms: f64) {
    let points = parse("pose", pose, POSE_LANDMARKS);
    if let Access::NotReady = with_pipeline(|p| p.on_pose(points, timestamp_ms as i64)) {
        warn_not_ready();
    }
}

/// Hand detector result; paired with pose by timestamp
#[wasm_bindgen]
pub fn push_hands(left: &[f32], right: &[f32], timestamp_ms: f64) {
    let left = parse("left hand", left, HAND_LANDMARKS);
    let right = parse("right hand", right, HAND_LANDMARKS);
    if let Access::NotReady = with_pipeline(|p| p.on_hands(left, right, timestamp_ms as i64)) {
        warn_not_ready();
    }
}

/// Clear all segmentation and gating state
#[wasm_bindgen]
pub fn reset_pipeline() {
    with_pipeline(|p| p.reset_all());
}

/// Toggle per-frame live classification (resets state)
#[wasm_bindgen]
pub fn set_live_mode(live: bool) {
    let mode = if live { PipelineMode::Live } else { PipelineMode::Segmented };
    with_pipeline(|p| p.set_mode(mode));
}

/// Current smoothed motion energy (0 before init), for debug overlays
#[wasm_bindgen]
pub fn get_motion_energy() -> f32 {
    with_pipeline(|p| p.energy()).done().unwrap_or(0.0)
}

/// Whether a segment is being captured
#[wasm_bindgen]
pub fn is_capturing() -> bool {
    with_pipeline(|p| p.detector().is_capturing()).done().unwrap_or(false)
}
