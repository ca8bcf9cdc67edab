//! Per-frame orchestration
//!
//! One `SegmentPipeline` serves one input stream:
//! frame → encode → energy → boundary → (on close) ensemble → gate → sink.
//! Everything after construction is infallible from the caller's side;
//! degenerate segments and classifier failures just mean "no emission".

use std::sync::Arc;

use log::{debug, info};

use crate::classifier::{
    Classifier, FeatureEncoder, FeatureVector, InferenceEnsemble, LabelTable, NormStats, Segment,
};
use crate::config::{PipelineConfig, PipelineMode};
use crate::error::ConfigResult;
use crate::keypoints::{FrameJoiner, KeypointFrame, Point2D};
use crate::motion::{BoundaryEvent, MotionEnergyEstimator, ResultGate, SegmentBoundaryDetector};

/// Receiver of everything the pipeline shows to the user
pub trait SignSink {
    /// A committed label
    fn on_sentence(&mut self, label: String);

    /// Interim badge (`None` hides it)
    fn on_label_badge(&mut self, label: Option<String>);

    /// Hide the last committed result
    fn on_clear_result(&mut self);
}

pub struct SegmentPipeline<C, S> {
    config: PipelineConfig,
    encoder: FeatureEncoder,
    energy: MotionEnergyEstimator,
    detector: SegmentBoundaryDetector,
    ensemble: InferenceEnsemble<C>,
    gate: ResultGate,
    joiner: FrameJoiner,
    sink: S,
    /// Frames received, skipped ones included
    frame_cursor: u64,
    /// Live mode: captured frames since the segment started
    live_counter: u32,
}

impl<C: Classifier, S: SignSink> SegmentPipeline<C, S> {
    /// Validate the configuration and check the model tables fit together
    pub fn new(
        config: PipelineConfig,
        classifier: C,
        labels: Arc<LabelTable>,
        stats: Option<Arc<NormStats>>,
        sink: S,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let ensemble = InferenceEnsemble::new(
            classifier,
            labels,
            stats.clone(),
            &config.ensemble,
            &config.window,
        )?;

        info!(
            "pipeline ready: mode={:?} labels={} window={} normalization={:?} stats={}",
            config.mode,
            ensemble.labels().len(),
            config.window.window_len,
            config.ensemble.normalization,
            stats.is_some()
        );

        Ok(Self {
            encoder: FeatureEncoder::new(config.clamp_input),
            energy: MotionEnergyEstimator::new(config.boundary.ema_alpha),
            detector: SegmentBoundaryDetector::new(config.boundary.clone()),
            gate: ResultGate::new(config.gate.clone()),
            joiner: FrameJoiner::new(config.join.clone()),
            ensemble,
            sink,
            config,
            frame_cursor: 0,
            live_counter: 0,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn mode(&self) -> PipelineMode {
        self.config.mode
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn detector(&self) -> &SegmentBoundaryDetector {
        &self.detector
    }

    pub fn gate(&self) -> &ResultGate {
        &self.gate
    }

    /// Current smoothed motion energy
    pub fn energy(&self) -> f32 {
        self.energy.smoothed()
    }

    /// Pose-detector callback; forwards a frame once paired with hands
    pub fn on_pose(&mut self, points: Vec<Point2D>, timestamp_ms: i64) {
        if let Some(frame) = self.joiner.on_pose(points, timestamp_ms) {
            self.on_frame(&frame);
        }
    }

    /// Hand-detector callback
    pub fn on_hands(&mut self, left: Vec<Point2D>, right: Vec<Point2D>, timestamp_ms: i64) {
        if let Some(frame) = self.joiner.on_hands(left, right, timestamp_ms) {
            self.on_frame(&frame);
        }
    }

    /// Process one joined frame
    pub fn on_frame(&mut self, frame: &KeypointFrame) {
        let now = frame.timestamp_ms();
        let hands = frame.hands_visible();

        let stride = u64::from(self.config.frame_subsample);
        let cursor = self.frame_cursor;
        self.frame_cursor += 1;
        if stride > 1 && cursor % stride != 0 {
            if hands {
                self.detector.touch_hands(now);
            }
            return;
        }

        let features = self.encoder.encode(frame);

        // No hands: start the next motion from a clean baseline
        let energy = if hands {
            self.energy.push(&features)
        } else {
            self.energy.reset();
            0.0
        };

        if hands && energy >= self.config.boundary.stop_threshold && self.gate.display_expired(now) {
            debug!("clearing shown result");
            self.gate.clear_display();
            self.sink.on_clear_result();
            self.badge(None);
        }
        self.gate.observe_hands(self.detector.hands_tracked(hands, now));

        match self.detector.update(&features, energy, hands, now) {
            BoundaryEvent::Started { .. } => self.live_counter = 0,
            BoundaryEvent::Finalized { segment, .. } => {
                if self.config.mode == PipelineMode::Segmented {
                    self.finalize(&segment, now);
                }
            }
            BoundaryEvent::Abandoned { .. } | BoundaryEvent::None => {}
        }

        if self.config.mode == PipelineMode::Live && self.detector.is_capturing() {
            self.live_counter += 1;
            if self.live_counter % self.config.live_stride == 0 {
                let recent = self.detector.latest(self.ensemble.window_len());
                self.classify_live(&recent, now);
            }
        }
    }

    fn finalize(&mut self, segment: &Segment, now: i64) {
        let Some(result) = self.ensemble.infer_segment(segment) else {
            self.badge(None);
            return;
        };
        debug!(
            "segment {}: top-1 '{}' p={:.3} over {} window(s)",
            segment.id, result.label, result.probability, result.windows_used
        );

        match self.gate.accept(&result, now) {
            Some(label) => self.commit(label),
            None => self.badge(None),
        }
    }

    fn classify_live(&mut self, recent: &[FeatureVector], now: i64) {
        let id = self.detector.current_id();
        let Some(result) = self.ensemble.infer_frames(recent, id) else {
            return;
        };
        if let Some(label) = self.gate.confirm_live(&result.label, result.probability, now) {
            self.commit(label);
        }
    }

    fn commit(&mut self, label: String) {
        self.badge(Some(label.clone()));
        self.sink.on_sentence(label);
    }

    fn badge(&mut self, label: Option<String>) {
        if self.config.show_label_badge {
            self.sink.on_label_badge(label);
        }
    }

    /// Drop every piece of per-stream state. Safe to call at any time.
    pub fn reset_all(&mut self) {
        self.detector.reset();
        self.energy.reset();
        self.gate.reset();
        self.joiner.reset();
        self.frame_cursor = 0;
        self.live_counter = 0;
        self.badge(None);
        self.sink.on_clear_result();
        debug!("pipeline reset");
    }

    /// Switch mode; all state is reset
    pub fn set_mode(&mut self, mode: PipelineMode) {
        self.config.mode = mode;
        self.reset_all();
        info!("pipeline mode: {:?}", mode);
    }
}
