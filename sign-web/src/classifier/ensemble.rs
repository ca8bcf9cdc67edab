//! Multi-window inference
//!
//! A segment is normalized as a whole, cut into windows, and every window is
//! classified. Probabilities are averaged over the windows that produced a
//! usable output; a failed window is skipped, never counted as zeros.

use std::sync::Arc;

use log::{debug, warn};

use super::buffer::Segment;
use super::features::FeatureVector;
use super::model::{softmax, Classifier, LabelTable, OutputKind};
use super::normalize::{NormStats, Normalizer};
use super::window::{Window, WindowSampler};
use crate::config::{EnsembleConfig, WindowConfig};
use crate::error::{ClassifierError, ConfigError, ConfigResult};

/// Top-1 of the averaged distribution
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: String,
    pub label_index: usize,
    /// Averaged probability of `label`
    pub probability: f32,
    pub segment_id: u64,
    /// Windows that contributed to the average
    pub windows_used: usize,
}

pub struct InferenceEnsemble<C> {
    classifier: C,
    labels: Arc<LabelTable>,
    stats: Option<Arc<NormStats>>,
    normalizer: Normalizer,
    sampler: WindowSampler,
    output: OutputKind,
}

impl<C: Classifier> InferenceEnsemble<C> {
    /// Fails when the label table and the classifier disagree on class count.
    pub fn new(
        classifier: C,
        labels: Arc<LabelTable>,
        stats: Option<Arc<NormStats>>,
        ensemble: &EnsembleConfig,
        window: &WindowConfig,
    ) -> ConfigResult<Self> {
        if labels.len() != classifier.num_labels() {
            return Err(ConfigError::LabelCountMismatch {
                labels: labels.len(),
                outputs: classifier.num_labels(),
            });
        }
        ensemble.normalization.validate()?;
        window.policy.validate(window.window_len)?;

        Ok(Self {
            classifier,
            labels,
            stats,
            normalizer: Normalizer::new(ensemble.normalization),
            sampler: WindowSampler::new(window),
            output: ensemble.output,
        })
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn window_len(&self) -> usize {
        self.sampler.window_len()
    }

    /// Normalize, window and standardize a run of raw frames
    pub fn prepare(&self, frames: &[FeatureVector]) -> Vec<Window> {
        let mut normalized = frames.to_vec();
        self.normalizer.normalize_segment(&mut normalized);

        let mut windows = self.sampler.sample(&normalized);
        if let Some(stats) = &self.stats {
            for window in windows.iter_mut() {
                stats.standardize(window.frames_mut());
            }
        }
        windows
    }

    pub fn infer_segment(&mut self, segment: &Segment) -> Option<PredictionResult> {
        self.infer_frames(&segment.frames, segment.id)
    }

    pub fn infer_frames(&mut self, frames: &[FeatureVector], segment_id: u64) -> Option<PredictionResult> {
        let windows = self.prepare(frames);
        self.predict(&windows, segment_id)
    }

    /// Average over successful windows. `None` when no window succeeded.
    pub fn predict(&mut self, windows: &[Window], segment_id: u64) -> Option<PredictionResult> {
        let width = self.labels.len();
        let mut sum = vec![0.0f64; width];
        let mut used = 0usize;

        for (i, window) in windows.iter().enumerate() {
            match self.run_window(window) {
                Ok(probs) if probs.iter().all(|&p| p == 0.0) => {
                    warn!("segment {}: window {} returned all zeros, skipped", segment_id, i);
                }
                Ok(probs) => {
                    for (acc, p) in sum.iter_mut().zip(&probs) {
                        *acc += f64::from(*p);
                    }
                    used += 1;
                }
                Err(e) => {
                    warn!("segment {}: window {} skipped: {}", segment_id, i, e);
                }
            }
        }

        if used == 0 {
            debug!("segment {}: no usable window out of {}", segment_id, windows.len());
            return None;
        }

        // Ties go to the lowest index
        let mut best = 0;
        for (i, &s) in sum.iter().enumerate() {
            if s > sum[best] {
                best = i;
            }
        }

        let label = self.labels.get(best)?.to_string();
        Some(PredictionResult {
            label,
            label_index: best,
            probability: (sum[best] / used as f64) as f32,
            segment_id,
            windows_used: used,
        })
    }

    fn run_window(&mut self, window: &Window) -> Result<Vec<f32>, ClassifierError> {
        let expected = self.labels.len();
        let scores = self.classifier.classify(&window.as_flat())?;

        if scores.len() != expected {
            return Err(ClassifierError::OutputWidth {
                expected,
                actual: scores.len(),
            });
        }
        if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
            return Err(ClassifierError::NonFinite(index));
        }

        Ok(match self.output {
            OutputKind::Probabilities => scores,
            OutputKind::Logits => softmax(&scores),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FEATURE_DIM, WINDOW_LEN};
    use approx::assert_abs_diff_eq;

    /// Replays canned outputs, one per call
    struct Scripted {
        outputs: Vec<Result<Vec<f32>, ClassifierError>>,
        seen: Vec<usize>,
    }

    impl Classifier for Scripted {
        fn num_labels(&self) -> usize {
            3
        }

        fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
            self.seen.push(input.len());
            if self.outputs.is_empty() {
                return Err(ClassifierError::backend("exhausted"));
            }
            self.outputs.remove(0)
        }
    }

    fn labels() -> Arc<LabelTable> {
        LabelTable::new(vec!["a".into(), "b".into(), "c".into()])
            .unwrap()
            .into_shared()
    }

    fn ensemble(outputs: Vec<Result<Vec<f32>, ClassifierError>>) -> InferenceEnsemble<Scripted> {
        InferenceEnsemble::new(
            Scripted { outputs, seen: Vec::new() },
            labels(),
            None,
            &EnsembleConfig::default(),
            &WindowConfig::default(),
        )
        .unwrap()
    }

    fn frames(len: usize) -> Vec<FeatureVector> {
        (0..len).map(|i| [i as f32 * 0.01; FEATURE_DIM]).collect()
    }

    #[test]
    fn test_label_count_mismatch_is_fatal() {
        let two = LabelTable::new(vec!["a".into(), "b".into()]).unwrap().into_shared();
        let result = InferenceEnsemble::new(
            Scripted { outputs: Vec::new(), seen: Vec::new() },
            two,
            None,
            &EnsembleConfig::default(),
            &WindowConfig::default(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::LabelCountMismatch { labels: 2, outputs: 3 })
        ));
    }

    #[test]
    fn test_identical_windows_average_exactly() {
        let p = vec![0.1, 0.7, 0.2];
        let mut ens = ensemble(vec![Ok(p.clone()), Ok(p.clone()), Ok(p.clone())]);
        let windows = ens.prepare(&frames(400));
        assert_eq!(windows.len(), 3);

        let result = ens.predict(&windows, 7).unwrap();
        assert_eq!(result.label, "b");
        assert_eq!(result.probability, 0.7);
        assert_eq!(result.segment_id, 7);
        assert_eq!(result.windows_used, 3);
        assert!(ens.classifier.seen.iter().all(|&n| n == WINDOW_LEN * FEATURE_DIM));
    }

    #[test]
    fn test_zero_window_excluded_from_denominator() {
        let mut ens = ensemble(vec![Ok(vec![0.0, 0.0, 0.0]), Ok(vec![0.2, 0.3, 0.5])]);
        let result = ens.infer_frames(&frames(150), 1).unwrap();
        assert_eq!(result.label, "c");
        assert_eq!(result.probability, 0.5);
        assert_eq!(result.windows_used, 1);
    }

    #[test]
    fn test_failed_windows_skipped() {
        let mut ens = ensemble(vec![
            Err(ClassifierError::backend("boom")),
            Ok(vec![0.6, 0.4]),
            Ok(vec![0.6, 0.3, 0.1]),
        ]);
        let result = ens.infer_frames(&frames(400), 2).unwrap();
        assert_eq!(result.label, "a");
        assert_abs_diff_eq!(result.probability, 0.6);
        assert_eq!(result.windows_used, 1);
    }

    #[test]
    fn test_all_failed_is_none() {
        let mut ens = ensemble(vec![Ok(vec![f32::NAN, 0.5, 0.5])]);
        assert!(ens.infer_frames(&frames(30), 3).is_none());
        // Zero windows
        assert!(ens.predict(&[], 4).is_none());
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let mut ens = ensemble(vec![Ok(vec![0.4, 0.4, 0.2])]);
        let result = ens.infer_frames(&frames(10), 0).unwrap();
        assert_eq!(result.label_index, 0);
    }

    #[test]
    fn test_logits_are_softmaxed() {
        let config = EnsembleConfig { output: OutputKind::Logits, ..Default::default() };
        let mut ens = InferenceEnsemble::new(
            Scripted { outputs: vec![Ok(vec![0.0, 0.0, 0.0])], seen: Vec::new() },
            labels(),
            None,
            &config,
            &WindowConfig::default(),
        )
        .unwrap();
        let result = ens.infer_frames(&frames(10), 0).unwrap();
        assert_abs_diff_eq!(result.probability, 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_standard_scale_is_shared_across_windows() {
        use crate::classifier::{LEFT_SHOULDER_X, RIGHT_SHOULDER_X};

        // First half shoulder width 0.2, second half 0.4: segment mean 0.3
        let seg: Vec<FeatureVector> = (0..200)
            .map(|i| {
                let half = if i < 100 { 0.1 } else { 0.2 };
                let mut f = [0.5; FEATURE_DIM];
                f[LEFT_SHOULDER_X] = 0.5 - half;
                f[RIGHT_SHOULDER_X] = 0.5 + half;
                f
            })
            .collect();
        let ens = ensemble(Vec::new());
        let windows = ens.prepare(&seg);
        assert_eq!(windows.len(), 3);

        let width = |f: &FeatureVector| f[RIGHT_SHOULDER_X] - f[LEFT_SHOULDER_X];
        // A per-window scale would make both of these 1
        for f in windows[0].frames() {
            assert_abs_diff_eq!(width(f), 2.0 / 3.0, epsilon = 1e-4);
        }
        for f in windows[2].frames() {
            assert_abs_diff_eq!(width(f), 4.0 / 3.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_standardization_applies_to_padding() {
        let stats = NormStats::new(&[1.0; FEATURE_DIM], &[2.0; FEATURE_DIM]).unwrap();
        let ens = InferenceEnsemble::new(
            Scripted { outputs: Vec::new(), seen: Vec::new() },
            labels(),
            Some(Arc::new(stats)),
            &EnsembleConfig::default(),
            &WindowConfig::default(),
        )
        .unwrap();
        let windows = ens.prepare(&frames(5));
        assert_eq!(windows[0].frames()[90][0], -0.5);
    }
}
