//! Pipeline configuration
//!
//! Every threshold here was tuned against one trained model. They are plain
//! data so a different model can ship its own JSON next to its weights.

use serde::{Deserialize, Serialize};

use crate::classifier::{NormalizationStrategy, OutputKind, WindowPolicy, WINDOW_LEN};
use crate::error::{ConfigError, ConfigResult};

// ============================================================================
// SEGMENTATION
// ============================================================================

/// Idle/capturing hysteresis and the safety valves around it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Smoothed energy needed to leave Idle
    pub start_threshold: f32,
    /// Energy below this counts as "still" while capturing
    pub stop_threshold: f32,
    /// Consecutive hands-visible frames required before a start
    pub hand_run_frames: u32,
    /// Hands may vanish this long without ending the segment
    pub hand_gap_grace_ms: i64,
    /// Stillness needed to finalize (ms)
    pub still_hold_ms: i64,
    /// Idle frames kept so the onset of a sign is not lost
    pub pre_roll_frames: usize,
    /// Segments shorter than this are dropped
    pub min_segment_frames: usize,
    /// Frames observed since start before any segment may finalize
    pub warmup_frames: u32,
    /// Forced finalize at this many frames
    pub force_finalize_frames: usize,
    /// Forced finalize after this long (ms)
    pub force_finalize_ms: i64,
    /// Hard cap on retained frames; oldest are dropped
    pub max_retained_frames: usize,
    /// EMA weight of the newest instantaneous energy
    pub ema_alpha: f32,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            start_threshold: 0.22,
            stop_threshold: 0.12,
            hand_run_frames: 3,
            hand_gap_grace_ms: 400,
            still_hold_ms: 1_000,
            pre_roll_frames: 24,
            min_segment_frames: 24,
            warmup_frames: 8,
            force_finalize_frames: 140,
            force_finalize_ms: 9_000,
            max_retained_frames: 400,
            ema_alpha: 0.2,
        }
    }
}

impl BoundaryConfig {
    /// Frames that must have been observed before a segment may run inference
    pub fn warmup_floor(&self) -> u32 {
        self.warmup_frames.max(self.min_segment_frames as u32)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.start_threshold > 0.0) || !self.start_threshold.is_finite() {
            return Err(ConfigError::invalid("start_threshold must be positive"));
        }
        if !(self.stop_threshold >= 0.0) || self.stop_threshold > self.start_threshold {
            return Err(ConfigError::invalid(
                "stop_threshold must be within [0, start_threshold]",
            ));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(ConfigError::invalid("ema_alpha must be within (0, 1]"));
        }
        if self.min_segment_frames == 0 {
            return Err(ConfigError::invalid("min_segment_frames must be at least 1"));
        }
        if self.max_retained_frames < self.min_segment_frames {
            return Err(ConfigError::invalid(
                "max_retained_frames must not be below min_segment_frames",
            ));
        }
        if self.force_finalize_frames > self.max_retained_frames {
            return Err(ConfigError::invalid(
                "force_finalize_frames must not exceed max_retained_frames",
            ));
        }
        if self.still_hold_ms < 0 || self.hand_gap_grace_ms < 0 || self.force_finalize_ms <= 0 {
            return Err(ConfigError::invalid("durations must be non-negative"));
        }
        Ok(())
    }
}

// ============================================================================
// WINDOWING / INFERENCE
// ============================================================================

/// How a segment becomes fixed-length model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub window_len: usize,
    pub policy: WindowPolicy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_len: WINDOW_LEN,
            policy: WindowPolicy::MultiOffset,
        }
    }
}

/// Ensemble preprocessing and output interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub normalization: NormalizationStrategy,
    pub output: OutputKind,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            normalization: NormalizationStrategy::Standard,
            output: OutputKind::Probabilities,
        }
    }
}

// ============================================================================
// RESULT GATING
// ============================================================================

/// Confidence floor, refractory hold and live-mode streaks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Segment results below this are discarded
    pub min_probability: f32,
    /// Minimum display time of an emitted label (ms)
    pub hold_ms: i64,
    /// Hands must leave the frame before the next emission
    pub require_hands_departure: bool,
    /// Live mode: per-frame confidence floor
    pub live_min_probability: f32,
    /// Live mode: consecutive agreeing results before confirming
    pub min_stable_frames: u32,
    /// Optional allow-list of emittable labels
    pub allowed_labels: Option<Vec<String>>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_probability: 0.10,
            hold_ms: 2_500,
            require_hands_departure: true,
            live_min_probability: 0.55,
            min_stable_frames: 3,
            allowed_labels: None,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, p) in [
            ("min_probability", self.min_probability),
            ("live_min_probability", self.live_min_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::invalid(format!("{name} must be within [0, 1]")));
            }
        }
        if self.hold_ms < 0 {
            return Err(ConfigError::invalid("hold_ms must be non-negative"));
        }
        if self.min_stable_frames == 0 {
            return Err(ConfigError::invalid("min_stable_frames must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// DETECTOR JOIN
// ============================================================================

/// Pairing of asynchronous pose and hand results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Pose and hands pair only when their timestamps differ by less than this
    pub tolerance_ms: i64,
    /// Swap hands when the pose shows crossed shoulders
    pub swap_hands_by_shoulder: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: 120,
            swap_hands_by_shoulder: false,
        }
    }
}

// ============================================================================
// TOP LEVEL
// ============================================================================

/// Segment-at-a-time or continuous per-frame classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    #[default]
    Segmented,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
    pub boundary: BoundaryConfig,
    pub window: WindowConfig,
    pub ensemble: EnsembleConfig,
    pub gate: GateConfig,
    pub join: JoinConfig,
    /// Process every n-th frame
    pub frame_subsample: u32,
    /// Live mode: classify every n-th captured frame
    pub live_stride: u32,
    /// Emit interim `on_label_badge` hints
    pub show_label_badge: bool,
    /// Clamp encoded coordinates to [0, 1]
    pub clamp_input: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Segmented,
            boundary: BoundaryConfig::default(),
            window: WindowConfig::default(),
            ensemble: EnsembleConfig::default(),
            gate: GateConfig::default(),
            join: JoinConfig::default(),
            frame_subsample: 1,
            live_stride: 5,
            show_label_badge: false,
            clamp_input: false,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate. Missing fields take their defaults.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let cfg: PipelineConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.boundary.validate()?;
        self.gate.validate()?;
        self.ensemble.normalization.validate()?;
        if self.window.window_len == 0 {
            return Err(ConfigError::invalid("window_len must be at least 1"));
        }
        self.window.policy.validate(self.window.window_len)?;
        if self.frame_subsample == 0 || self.live_stride == 0 {
            return Err(ConfigError::invalid("frame_subsample and live_stride must be at least 1"));
        }
        if self.join.tolerance_ms <= 0 {
            return Err(ConfigError::invalid("join tolerance must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_warmup_floor_never_below_min_segment() {
        let cfg = BoundaryConfig::default();
        assert_eq!(cfg.warmup_floor(), 24);

        let cfg = BoundaryConfig { warmup_frames: 60, ..Default::default() };
        assert_eq!(cfg.warmup_floor(), 60);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = PipelineConfig::from_json(
            r#"{ "mode": "live", "boundary": { "start_threshold": 0.3 }, "gate": { "hold_ms": 1000 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.mode, PipelineMode::Live);
        assert!((cfg.boundary.start_threshold - 0.3).abs() < 1e-6);
        assert!((cfg.boundary.stop_threshold - 0.12).abs() < 1e-6);
        assert_eq!(cfg.gate.hold_ms, 1000);
        assert_eq!(cfg.window.window_len, 91);
    }

    #[test]
    fn test_legacy_strategy_from_json() {
        let cfg = PipelineConfig::from_json(
            r#"{ "ensemble": { "normalization": { "kind": "legacy_bug_compatible",
                 "r_x_idx": 33, "r_y_idx": 34, "l_x_idx": 36, "l_y_idx": 37 } } }"#,
        )
        .unwrap();
        assert_eq!(cfg.ensemble.normalization, NormalizationStrategy::legacy());
    }

    #[test]
    fn test_sub_window_policy_from_json() {
        let cfg = PipelineConfig::from_json(
            r#"{ "window": { "policy": { "sub_windows": { "size": 15, "step": 5 } } } }"#,
        )
        .unwrap();
        assert_eq!(cfg.window.policy, WindowPolicy::legacy_sub_windows());

        let err = PipelineConfig::from_json(
            r#"{ "window": { "policy": { "sub_windows": { "size": 120, "step": 5 } } } }"#,
        );
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let cfg = PipelineConfig {
            boundary: BoundaryConfig {
                start_threshold: 0.1,
                stop_threshold: 0.2,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_probability_rejected() {
        let err = PipelineConfig::from_json(r#"{ "gate": { "min_probability": 1.5 } }"#);
        assert!(err.is_err());
    }
}
