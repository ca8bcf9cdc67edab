//! Shared test doubles and frame scripts
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use sign_web::classifier::{FEATURE_DIM, LEFT_HAND_OFFSET, RIGHT_HAND_OFFSET};
use sign_web::keypoints::{HAND_LANDMARKS, POSE_LANDMARKS};
use sign_web::{
    Classifier, ClassifierError, KeypointFrame, LabelTable, PipelineConfig, Point2D,
    SegmentPipeline, SignSink,
};

pub const DT_MS: i64 = 33;
pub const LABELS: [&str; 3] = ["hello", "thanks", "sorry"];

/// Deterministic classifier: scores from block means of the window.
/// Every input it sees is recorded.
#[derive(Clone, Default)]
pub struct StubClassifier {
    pub seen: Rc<RefCell<Vec<Vec<f32>>>>,
}

impl StubClassifier {
    pub fn scores(input: &[f32]) -> Vec<f32> {
        let mut blocks = [0.0f32; 3];
        for frame in input.chunks_exact(FEATURE_DIM) {
            blocks[0] += frame[..LEFT_HAND_OFFSET].iter().map(|v| v.abs()).sum::<f32>();
            blocks[1] += frame[LEFT_HAND_OFFSET..RIGHT_HAND_OFFSET].iter().map(|v| v.abs()).sum::<f32>();
            blocks[2] += frame[RIGHT_HAND_OFFSET..].iter().map(|v| v.abs()).sum::<f32>() * 1.5;
        }
        let raw: Vec<f32> = blocks.iter().map(|b| b + 1e-3).collect();
        let total: f32 = raw.iter().sum();
        raw.iter().map(|r| r / total).collect()
    }

    /// Label with the highest score for one input
    pub fn top_label(input: &[f32]) -> &'static str {
        let scores = Self::scores(input);
        let mut best = 0;
        for i in 1..scores.len() {
            if scores[i] > scores[best] {
                best = i;
            }
        }
        LABELS[best]
    }
}

impl Classifier for StubClassifier {
    fn num_labels(&self) -> usize {
        LABELS.len()
    }

    fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        self.seen.borrow_mut().push(input.to_vec());
        Ok(Self::scores(input))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SinkEvent {
    Sentence(String),
    Badge(Option<String>),
    Clear,
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn sentences(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Sentence(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clears(&self) -> usize {
        self.events.iter().filter(|e| **e == SinkEvent::Clear).count()
    }
}

impl SignSink for RecordingSink {
    fn on_sentence(&mut self, label: String) {
        self.events.push(SinkEvent::Sentence(label));
    }

    fn on_label_badge(&mut self, label: Option<String>) {
        self.events.push(SinkEvent::Badge(label));
    }

    fn on_clear_result(&mut self) {
        self.events.push(SinkEvent::Clear);
    }
}

pub fn labels() -> Arc<LabelTable> {
    LabelTable::new(LABELS.iter().map(|s| s.to_string()).collect())
        .unwrap()
        .into_shared()
}

pub fn pipeline(config: PipelineConfig) -> (SegmentPipeline<StubClassifier, RecordingSink>, StubClassifier) {
    let stub = StubClassifier::default();
    let p = SegmentPipeline::new(config, stub.clone(), labels(), None, RecordingSink::default()).unwrap();
    (p, stub)
}

/// Upright body, shoulders at (0.4, 0.4) / (0.6, 0.4)
pub fn pose() -> [Point2D; POSE_LANDMARKS] {
    let mut pose = [Point2D::new(0.5, 0.6); POSE_LANDMARKS];
    pose[11] = Point2D::new(0.4, 0.4);
    pose[12] = Point2D::new(0.6, 0.4);
    pose
}

/// Hands alternate between two positions when moving, rest at the first
pub fn frame(i: usize, hands: bool, moving: bool) -> KeypointFrame {
    let ts = i as i64 * DT_MS;
    if !hands {
        return KeypointFrame::new(Some(pose()), None, None, false, ts);
    }
    let t = if moving && i % 2 == 1 { 0.8 } else { 0.2 };
    let left = [Point2D::new(t, t); HAND_LANDMARKS];
    let right = [Point2D::new(1.0 - t, t); HAND_LANDMARKS];
    KeypointFrame::new(Some(pose()), Some(left), Some(right), true, ts)
}

/// Model input for `frame(i, true, moving)` under standard normalization,
/// written out by hand: 25 pose points (shoulders in slots 5 and 6), left
/// hand, right hand; centred on (0.5, 0.4), divided by the 0.2 shoulder width.
pub fn expected_normalized(i: usize, moving: bool) -> Vec<f32> {
    let t = if moving && i % 2 == 1 { 0.8 } else { 0.2 };
    let mut points = Vec::with_capacity(FEATURE_DIM / 2);
    for slot in 0..25 {
        points.push(match slot {
            5 => (0.4, 0.4),
            6 => (0.6, 0.4),
            _ => (0.5, 0.6),
        });
    }
    points.extend(std::iter::repeat((t, t)).take(HAND_LANDMARKS));
    points.extend(std::iter::repeat((1.0 - t, t)).take(HAND_LANDMARKS));
    points
        .into_iter()
        .flat_map(|(x, y)| [(x - 0.5) / 0.2, (y - 0.4) / 0.2])
        .collect()
}
