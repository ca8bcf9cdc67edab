//! Motion energy
//!
//! Instantaneous energy is the mean absolute change between consecutive
//! feature vectors. It is far too noisy to drive start/stop decisions on its
//! own, so the boundary detector consumes an exponential moving average.

use crate::classifier::{FeatureVector, FEATURE_DIM};

/// Default EMA weight of the newest sample
pub const DEFAULT_ALPHA: f32 = 0.2;

/// Mean absolute per-component difference (0 without a previous frame)
pub fn instant_energy(prev: Option<&FeatureVector>, curr: &FeatureVector) -> f32 {
    match prev {
        Some(prev) => {
            let sum: f32 = prev.iter().zip(curr.iter()).map(|(a, b)| (b - a).abs()).sum();
            sum / FEATURE_DIM as f32
        }
        None => 0.0,
    }
}

/// Smoothed motion energy tracker
pub struct MotionEnergyEstimator {
    alpha: f32,
    ema: f32,
    instant: f32,
    /// Last frame seen by `push`
    prev: Option<FeatureVector>,
}

impl MotionEnergyEstimator {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(f32::EPSILON, 1.0),
            ema: 0.0,
            instant: 0.0,
            prev: None,
        }
    }

    /// Fold one frame pair into the average, returns the smoothed energy
    pub fn update(&mut self, prev: Option<&FeatureVector>, curr: &FeatureVector) -> f32 {
        self.instant = instant_energy(prev, curr);
        self.ema = (1.0 - self.alpha) * self.ema + self.alpha * self.instant;
        self.ema
    }

    /// `update` against the previously pushed frame
    pub fn push(&mut self, curr: &FeatureVector) -> f32 {
        let prev = self.prev.take();
        let energy = self.update(prev.as_ref(), curr);
        self.prev = Some(*curr);
        energy
    }

    pub fn smoothed(&self) -> f32 {
        self.ema
    }

    pub fn instant(&self) -> f32 {
        self.instant
    }

    /// Forget history; the next frame starts from zero energy
    pub fn reset(&mut self) {
        self.ema = 0.0;
        self.instant = 0.0;
        self.prev = None;
    }
}

impl Default for MotionEnergyEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
