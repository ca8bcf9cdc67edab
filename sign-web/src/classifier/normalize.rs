//! Shoulder-based coordinate normalization
//!
//! Two strategies, picked once in configuration and never inferred:
//!
//! - `Standard`: each frame is re-centred on its own shoulder midpoint, then
//!   every frame is divided by one segment-wide scale (mean shoulder width).
//!   A shared scale keeps per-frame detector jitter out of the sign's shape.
//! - `LegacyBugCompatible`: per-frame re-centring on four fixed vector slots
//!   that are not the shoulders in this layout, with every third slot left
//!   unshifted. A frozen model was trained on exactly this preprocessing.
//!   It must stay bit-identical; "fixing" it breaks that model silently.
//!
//! Both keep the input shape and never divide by zero.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, FEATURE_DIM, LEFT_SHOULDER_X, RIGHT_SHOULDER_X};
use crate::error::{ConfigError, ConfigResult};

/// Floor for any divisor in this module
pub const EPSILON: f32 = 1e-6;

/// Floor on the legacy squared shoulder distance
const LEGACY_DIST_SQ_FLOOR: f32 = 1e-6;

// ============================================================================
// STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationStrategy {
    #[default]
    Standard,
    LegacyBugCompatible {
        r_x_idx: usize,
        r_y_idx: usize,
        l_x_idx: usize,
        l_y_idx: usize,
    },
}

impl NormalizationStrategy {
    /// Slots used by the frozen legacy model
    pub const fn legacy() -> Self {
        NormalizationStrategy::LegacyBugCompatible {
            r_x_idx: 33,
            r_y_idx: 34,
            l_x_idx: 36,
            l_y_idx: 37,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let NormalizationStrategy::LegacyBugCompatible { r_x_idx, r_y_idx, l_x_idx, l_y_idx } = *self {
            if [r_x_idx, r_y_idx, l_x_idx, l_y_idx].iter().any(|&i| i >= FEATURE_DIM) {
                return Err(ConfigError::invalid("legacy normalization index out of range"));
            }
        }
        Ok(())
    }
}

/// Shoulder slots and divisor floor for the standard strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationParams {
    /// x slot of the left shoulder (y is the next slot)
    pub left_shoulder_index: usize,
    /// x slot of the right shoulder
    pub right_shoulder_index: usize,
    pub epsilon: f32,
}

impl Default for NormalizationParams {
    fn default() -> Self {
        Self {
            left_shoulder_index: LEFT_SHOULDER_X,
            right_shoulder_index: RIGHT_SHOULDER_X,
            epsilon: EPSILON,
        }
    }
}

impl NormalizationParams {
    /// Both shoulder slots need their y slot inside the vector
    pub fn validate(&self) -> ConfigResult<()> {
        if [self.left_shoulder_index, self.right_shoulder_index]
            .iter()
            .any(|&i| i + 1 >= FEATURE_DIM)
        {
            return Err(ConfigError::invalid("shoulder index out of range"));
        }
        if !(self.epsilon > 0.0) || !self.epsilon.is_finite() {
            return Err(ConfigError::invalid("normalization epsilon must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Normalizer {
    strategy: NormalizationStrategy,
    params: NormalizationParams,
}

impl Normalizer {
    pub fn new(strategy: NormalizationStrategy) -> Self {
        Self {
            strategy,
            params: NormalizationParams::default(),
        }
    }

    pub fn with_params(
        strategy: NormalizationStrategy,
        params: NormalizationParams,
    ) -> ConfigResult<Self> {
        strategy.validate()?;
        params.validate()?;
        Ok(Self { strategy, params })
    }

    pub fn strategy(&self) -> NormalizationStrategy {
        self.strategy
    }

    /// Normalize a whole segment in place
    pub fn normalize_segment(&self, frames: &mut [FeatureVector]) {
        match self.strategy {
            NormalizationStrategy::Standard => self.standard(frames),
            NormalizationStrategy::LegacyBugCompatible { r_x_idx, r_y_idx, l_x_idx, l_y_idx } => {
                for frame in frames.iter_mut() {
                    legacy_frame(frame, r_x_idx, r_y_idx, l_x_idx, l_y_idx);
                }
            }
        }
    }

    /// Normalize one frame in place (a one-frame segment)
    pub fn normalize_frame(&self, frame: &mut FeatureVector) {
        self.normalize_segment(std::slice::from_mut(frame));
    }

    /// Mean shoulder width across the segment, floored at epsilon.
    ///
    /// Frames whose shoulders coincide (typically no pose detected) count as
    /// width 1 so they do not drag the scale towards zero.
    pub fn segment_scale(&self, frames: &[FeatureVector]) -> f32 {
        if frames.is_empty() {
            return 1.0;
        }
        let eps = self.params.epsilon;
        let sum: f32 = frames
            .iter()
            .map(|fr| {
                let (l, r) = self.shoulders(fr);
                let dist = (r - l).norm();
                if dist > eps {
                    dist
                } else {
                    1.0
                }
            })
            .sum();
        (sum / frames.len() as f32).max(eps)
    }

    fn shoulders(&self, frame: &FeatureVector) -> (Vector2<f32>, Vector2<f32>) {
        let l = self.params.left_shoulder_index;
        let r = self.params.right_shoulder_index;
        (
            Vector2::new(frame[l], frame[l + 1]),
            Vector2::new(frame[r], frame[r + 1]),
        )
    }

    fn standard(&self, frames: &mut [FeatureVector]) {
        let scale = self.segment_scale(frames);

        for frame in frames.iter_mut() {
            let (l, r) = self.shoulders(frame);
            let center = (l + r) * 0.5;
            for pair in frame.chunks_exact_mut(2) {
                pair[0] = (pair[0] - center.x) / scale;
                pair[1] = (pair[1] - center.y) / scale;
            }
        }
    }
}

/// Historical preprocessing, reproduced operation for operation.
fn legacy_frame(frame: &mut FeatureVector, r_x: usize, r_y: usize, l_x: usize, l_y: usize) {
    let rs_x = frame[r_x];
    let rs_y = frame[r_y];

    // Slots with i % 3 == 2 are left unshifted
    for (i, v) in frame.iter_mut().enumerate() {
        match i % 3 {
            0 => *v -= rs_x,
            1 => *v -= rs_y,
            _ => {}
        }
    }

    // Distance is taken after the shift
    let dist_sq = (frame[r_x] - frame[l_x]) * (frame[r_x] - frame[l_x])
        + (frame[r_y] - frame[l_y]) * (frame[r_y] - frame[l_y]);
    let dist = dist_sq.max(LEGACY_DIST_SQ_FLOOR).sqrt();

    for v in frame.iter_mut() {
        *v /= dist;
    }
}

// ============================================================================
// PER-FEATURE STANDARDIZATION
// ============================================================================

#[derive(Deserialize)]
struct NormStatsFile {
    mean: Vec<f32>,
    std: Vec<f32>,
}

/// Training-time per-feature mean/std. Loaded once, shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct NormStats {
    mean: Box<FeatureVector>,
    std: Box<FeatureVector>,
}

impl NormStats {
    pub fn new(mean: &[f32], std: &[f32]) -> ConfigResult<Self> {
        Ok(Self {
            mean: Box::new(checked_table("mean", mean, false)?),
            std: Box::new(checked_table("std", std, true)?),
        })
    }

    /// Parse `{"mean": [...134], "std": [...134]}`; extra keys are ignored
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let file: NormStatsFile = serde_json::from_str(text)?;
        Self::new(&file.mean, &file.std)
    }

    pub fn mean(&self) -> &FeatureVector {
        &self.mean
    }

    pub fn std(&self) -> &FeatureVector {
        &self.std
    }

    /// `(v - mean[i]) / max(std[i], eps)` on every frame, padding included
    pub fn standardize(&self, frames: &mut [FeatureVector]) {
        for frame in frames.iter_mut() {
            for (i, v) in frame.iter_mut().enumerate() {
                *v = (*v - self.mean[i]) / self.std[i].max(EPSILON);
            }
        }
    }
}

fn checked_table(name: &'static str, values: &[f32], non_negative: bool) -> ConfigResult<FeatureVector> {
    if values.len() != FEATURE_DIM {
        return Err(ConfigError::StatsLength {
            table: name,
            expected: FEATURE_DIM,
            actual: values.len(),
        });
    }
    if let Some(index) = values
        .iter()
        .position(|v| !v.is_finite() || (non_negative && *v < 0.0))
    {
        return Err(ConfigError::StatsValue { table: name, index });
    }
    let mut out = [0.0; FEATURE_DIM];
    out.copy_from_slice(values);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn with_shoulders(l: (f32, f32), r: (f32, f32)) -> FeatureVector {
        let mut f = [0.5; FEATURE_DIM];
        f[LEFT_SHOULDER_X] = l.0;
        f[LEFT_SHOULDER_X + 1] = l.1;
        f[RIGHT_SHOULDER_X] = r.0;
        f[RIGHT_SHOULDER_X + 1] = r.1;
        f
    }

    fn width(f: &FeatureVector) -> f32 {
        let dx = f[RIGHT_SHOULDER_X] - f[LEFT_SHOULDER_X];
        let dy = f[RIGHT_SHOULDER_X + 1] - f[LEFT_SHOULDER_X + 1];
        (dx * dx + dy * dy).sqrt()
    }

    #[test]
    fn test_standard_mean_width_is_one() {
        let mut seg = vec![
            with_shoulders((0.4, 0.5), (0.6, 0.5)),
            with_shoulders((0.3, 0.5), (0.7, 0.5)),
            with_shoulders((0.35, 0.45), (0.62, 0.52)),
        ];
        Normalizer::new(NormalizationStrategy::Standard).normalize_segment(&mut seg);

        let mean = seg.iter().map(width).sum::<f32>() / seg.len() as f32;
        assert_abs_diff_eq!(mean, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_standard_centres_each_frame() {
        let mut seg = vec![
            with_shoulders((0.4, 0.5), (0.6, 0.5)),
            with_shoulders((0.1, 0.2), (0.3, 0.2)),
        ];
        Normalizer::default().normalize_segment(&mut seg);
        for f in &seg {
            let cx = (f[LEFT_SHOULDER_X] + f[RIGHT_SHOULDER_X]) * 0.5;
            let cy = (f[LEFT_SHOULDER_X + 1] + f[RIGHT_SHOULDER_X + 1]) * 0.5;
            assert_abs_diff_eq!(cx, 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(cy, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_standard_degenerate_shoulders_stay_finite() {
        let mut seg = vec![with_shoulders((0.5, 0.5), (0.5, 0.5)); 4];
        seg.push([0.0; FEATURE_DIM]);
        Normalizer::default().normalize_segment(&mut seg);
        assert!(seg.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_standard_tiny_epsilon_floor() {
        let params = NormalizationParams { epsilon: 10.0, ..Default::default() };
        let n = Normalizer::with_params(NormalizationStrategy::Standard, params).unwrap();
        let seg = vec![with_shoulders((0.4, 0.5), (0.6, 0.5))];
        // Width 0.2 is under the floor: counted as 1, then floored to 10
        assert_eq!(n.segment_scale(&seg), 10.0);
    }

    #[test]
    fn test_params_out_of_range_rejected() {
        let std = NormalizationStrategy::Standard;
        let last = NormalizationParams { right_shoulder_index: FEATURE_DIM - 1, ..Default::default() };
        assert!(Normalizer::with_params(std, last).is_err());

        let far = NormalizationParams { left_shoulder_index: 500, ..Default::default() };
        assert!(Normalizer::with_params(std, far).is_err());

        let zero_eps = NormalizationParams { epsilon: 0.0, ..Default::default() };
        assert!(Normalizer::with_params(std, zero_eps).is_err());

        let edge = NormalizationParams { right_shoulder_index: FEATURE_DIM - 2, ..Default::default() };
        assert!(Normalizer::with_params(std, edge).is_ok());
        assert!(Normalizer::with_params(NormalizationStrategy::legacy(), NormalizationParams::default()).is_ok());
    }

    #[test]
    fn test_single_frame_matches_one_frame_segment() {
        let base = with_shoulders((0.42, 0.51), (0.61, 0.49));
        let mut a = base;
        let mut b = vec![base];
        let n = Normalizer::default();
        n.normalize_frame(&mut a);
        n.normalize_segment(&mut b);
        assert_eq!(a, b[0]);
    }

    #[test]
    fn test_legacy_vector() {
        let mut f = [0.0; FEATURE_DIM];
        f[33] = 0.5;
        f[34] = 0.25;
        f[36] = 0.75;
        f[37] = 0.25;
        f[2] = 0.125;
        f[3] = 0.625;
        f[4] = 0.375;

        Normalizer::new(NormalizationStrategy::legacy()).normalize_frame(&mut f);

        // shift (0.5, 0.25), then distance 0.25 exactly
        assert_eq!(f[0], -2.0);
        assert_eq!(f[1], -1.0);
        assert_eq!(f[2], 0.5); // i % 3 == 2: scaled, not shifted
        assert_eq!(f[3], 0.5);
        assert_eq!(f[4], 0.5);
        assert_eq!(f[5], 0.0);
        assert_eq!(f[33], 0.0);
        assert_eq!(f[34], 0.0);
        assert_eq!(f[36], 1.0);
        assert_eq!(f[37], 0.0);
        assert_eq!(f[131], 0.0);
        assert_eq!(f[132], -2.0);
        assert_eq!(f[133], -1.0);
    }

    #[test]
    fn test_legacy_zero_frame_stays_zero() {
        let mut f = [0.0; FEATURE_DIM];
        Normalizer::new(NormalizationStrategy::legacy()).normalize_frame(&mut f);
        assert!(f.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_legacy_is_per_frame() {
        let mut a = [0.3; FEATURE_DIM];
        a[36] = 0.9;
        let b = [0.7; FEATURE_DIM];

        let n = Normalizer::new(NormalizationStrategy::legacy());
        let mut seg = vec![a, b];
        n.normalize_segment(&mut seg);

        let mut alone = a;
        n.normalize_frame(&mut alone);
        assert_eq!(seg[0], alone);
    }

    #[test]
    fn test_legacy_index_validation() {
        let bad = NormalizationStrategy::LegacyBugCompatible {
            r_x_idx: 33,
            r_y_idx: 34,
            l_x_idx: 36,
            l_y_idx: 134,
        };
        assert!(bad.validate().is_err());
        assert!(NormalizationStrategy::legacy().validate().is_ok());
    }

    #[test]
    fn test_stats_length_checked() {
        let err = NormStats::new(&[0.0; 10], &[1.0; FEATURE_DIM]).unwrap_err();
        assert!(matches!(err, ConfigError::StatsLength { table: "mean", actual: 10, .. }));

        let mut std = vec![1.0; FEATURE_DIM];
        std[7] = -1.0;
        let err = NormStats::new(&[0.0; FEATURE_DIM], &std).unwrap_err();
        assert!(matches!(err, ConfigError::StatsValue { table: "std", index: 7 }));
    }

    #[test]
    fn test_standardize_with_floor() {
        let mut std = vec![2.0; FEATURE_DIM];
        std[1] = 0.0;
        let stats = NormStats::new(&[1.0; FEATURE_DIM], &std).unwrap();

        let mut frames = vec![[3.0; FEATURE_DIM]];
        stats.standardize(&mut frames);
        assert_eq!(frames[0][0], 1.0);
        assert_eq!(frames[0][1], 2.0 / EPSILON);
    }

    #[test]
    fn test_stats_from_json_ignores_extra_keys() {
        let json = format!(
            r#"{{"feat_dim":134,"seq_len":91,"mean":{:?},"std":{:?}}}"#,
            vec![0.1f32; FEATURE_DIM],
            vec![0.2f32; FEATURE_DIM]
        );
        let stats = NormStats::from_json(&json).unwrap();
        assert_abs_diff_eq!(stats.std()[133], 0.2);
    }
}
