//! Segment boundary detection
//!
//! Two states with hysteresis:
//! - Idle: a short pre-roll of recent frames is kept; a sign starts once
//!   hands have been visible for a few frames AND smoothed energy reaches
//!   the start threshold. The pre-roll seeds the segment so the onset of
//!   the sign is not lost.
//! - Capturing: every frame is appended. Energy at or above the (lower)
//!   stop threshold refreshes the motion clock. The segment closes when
//!   hands are lost, after a sustained still period, or when a frame/time
//!   safety valve trips.
//!
//! No inference happens here; a closed segment is handed back as an event.

use log::debug;

use crate::classifier::{FeatureVector, FrameRing, Segment};
use crate::config::BoundaryConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryState {
    Idle,
    Capturing,
}

/// Why a closed segment was dropped without inference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbandonReason {
    /// Fewer frames than `min_segment_frames`
    TooShort,
    /// Pipeline has not yet observed enough frames
    WarmUp,
}

/// What triggered the close
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseCause {
    HandsLost,
    Still,
    Forced,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoundaryEvent {
    None,
    Started { id: u64, at_ms: i64 },
    Finalized { segment: Segment, cause: CloseCause },
    Abandoned { id: u64, reason: AbandonReason, len: usize },
}

pub struct SegmentBoundaryDetector {
    config: BoundaryConfig,
    state: BoundaryState,
    pre_roll: FrameRing,
    segment: FrameRing,
    /// Consecutive frames with hands visible
    hand_run: u32,
    last_hands_seen_ms: Option<i64>,
    last_motion_ms: i64,
    started_at_ms: i64,
    current_id: u64,
    next_id: u64,
    frames_observed: u32,
}

impl SegmentBoundaryDetector {
    pub fn new(config: BoundaryConfig) -> Self {
        Self {
            pre_roll: FrameRing::new(config.pre_roll_frames),
            segment: FrameRing::new(config.max_retained_frames),
            config,
            state: BoundaryState::Idle,
            hand_run: 0,
            last_hands_seen_ms: None,
            last_motion_ms: 0,
            started_at_ms: 0,
            current_id: 0,
            next_id: 0,
            frames_observed: 0,
        }
    }

    pub fn state(&self) -> BoundaryState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == BoundaryState::Capturing
    }

    pub fn segment_len(&self) -> usize {
        self.segment.len()
    }

    pub fn pre_roll_len(&self) -> usize {
        self.pre_roll.len()
    }

    /// Frames fed to `update` since construction or the last reset
    pub fn frames_observed(&self) -> u32 {
        self.frames_observed
    }

    /// Id of the open segment (meaningful while capturing)
    pub fn current_id(&self) -> u64 {
        self.current_id
    }

    /// Most recent `n` captured frames
    pub fn latest(&self, n: usize) -> Vec<FeatureVector> {
        self.segment.latest(n)
    }

    /// Refresh the hands clock for a frame that is otherwise skipped
    pub fn touch_hands(&mut self, now_ms: i64) {
        self.last_hands_seen_ms = Some(now_ms);
    }

    /// Hands count as tracked through short drop-outs inside the grace window
    pub fn hands_tracked(&self, hands_visible: bool, now_ms: i64) -> bool {
        hands_visible
            || self
                .last_hands_seen_ms
                .map_or(false, |t| now_ms.saturating_sub(t) <= self.config.hand_gap_grace_ms)
    }

    /// Feed one frame with its smoothed energy
    pub fn update(
        &mut self,
        frame: &FeatureVector,
        energy: f32,
        hands_visible: bool,
        now_ms: i64,
    ) -> BoundaryEvent {
        self.frames_observed = self.frames_observed.saturating_add(1);

        if hands_visible {
            self.hand_run = self.hand_run.saturating_add(1);
            self.last_hands_seen_ms = Some(now_ms);
        } else {
            self.hand_run = 0;
        }

        if !self.hands_tracked(hands_visible, now_ms) {
            self.pre_roll.clear();
            if self.is_capturing() {
                debug!("segment {}: hands lost", self.current_id);
                return self.close(CloseCause::HandsLost);
            }
            return BoundaryEvent::None;
        }

        match self.state {
            BoundaryState::Idle => self.idle(frame, energy, now_ms),
            BoundaryState::Capturing => self.capturing(frame, energy, now_ms),
        }
    }

    fn idle(&mut self, frame: &FeatureVector, energy: f32, now_ms: i64) -> BoundaryEvent {
        self.pre_roll.push(*frame);

        if self.hand_run < self.config.hand_run_frames || energy < self.config.start_threshold {
            return BoundaryEvent::None;
        }

        self.state = BoundaryState::Capturing;
        self.segment.clear();
        self.segment.append(&mut self.pre_roll);
        self.started_at_ms = now_ms;
        self.last_motion_ms = now_ms;
        self.current_id = self.next_id;
        self.next_id += 1;

        debug!(
            "segment {}: started (energy={:.3}, pre-roll={})",
            self.current_id,
            energy,
            self.segment.len()
        );
        BoundaryEvent::Started {
            id: self.current_id,
            at_ms: now_ms,
        }
    }

    fn capturing(&mut self, frame: &FeatureVector, energy: f32, now_ms: i64) -> BoundaryEvent {
        if energy >= self.config.stop_threshold {
            self.last_motion_ms = now_ms;
        }
        self.segment.push(*frame);

        let len = self.segment.len();
        let duration = now_ms.saturating_sub(self.started_at_ms);
        let over_limit =
            len >= self.config.force_finalize_frames || duration >= self.config.force_finalize_ms;
        if over_limit && len >= self.config.min_segment_frames {
            debug!(
                "segment {}: forced close ({} frames, {}ms)",
                self.current_id, len, duration
            );
            return self.close(CloseCause::Forced);
        }

        if energy < self.config.stop_threshold
            && now_ms.saturating_sub(self.last_motion_ms) >= self.config.still_hold_ms
        {
            return self.close(CloseCause::Still);
        }

        BoundaryEvent::None
    }

    /// Leave Capturing; hand out the segment unless it is degenerate
    fn close(&mut self, cause: CloseCause) -> BoundaryEvent {
        self.state = BoundaryState::Idle;
        self.pre_roll.clear();
        let frames = self.segment.take();
        let id = self.current_id;

        if frames.len() < self.config.min_segment_frames {
            debug!("segment {}: too short ({} frames), dropped", id, frames.len());
            return BoundaryEvent::Abandoned {
                id,
                reason: AbandonReason::TooShort,
                len: frames.len(),
            };
        }
        if self.frames_observed < self.config.warmup_floor() {
            debug!(
                "segment {}: warm-up ({} < {}), dropped",
                id,
                self.frames_observed,
                self.config.warmup_floor()
            );
            return BoundaryEvent::Abandoned {
                id,
                reason: AbandonReason::WarmUp,
                len: frames.len(),
            };
        }

        debug!("segment {}: closed ({:?}, {} frames)", id, cause, frames.len());
        BoundaryEvent::Finalized {
            segment: Segment {
                id,
                frames,
                started_at_ms: self.started_at_ms,
                frames_since_pipeline_start: self.frames_observed,
            },
            cause,
        }
    }

    /// Back to a freshly constructed detector
    pub fn reset(&mut self) {
        self.state = BoundaryState::Idle;
        self.pre_roll.clear();
        self.segment.clear();
        self.hand_run = 0;
        self.last_hands_seen_ms = None;
        self.last_motion_ms = 0;
        self.started_at_ms = 0;
        self.current_id = 0;
        self.next_id = 0;
        self.frames_observed = 0;
    }
}

impl Default for SegmentBoundaryDetector {
    fn default() -> Self {
        Self::new(BoundaryConfig::default())
    }
}
