//! Fixed-length window construction
//!
//! The classifier takes exactly `window_len` frames. Short segments are
//! head-aligned and zero-padded; long ones are either cut at start, middle
//! and end offsets or index-resampled, depending on the policy.
//!
//! `SubWindows` feeds the frozen legacy model: the segment is first fitted
//! to `window_len` (resampled or padded), then short clips at a fixed stride
//! are each padded back to `window_len`.

use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, FEATURE_DIM};
use crate::config::WindowConfig;
use crate::error::{ConfigError, ConfigResult};

/// Model time axis
pub const WINDOW_LEN: usize = 91;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Up to three crops (start, middle, end) for long segments
    #[default]
    MultiOffset,
    /// One window, frames picked by rounded index mapping
    Resample,
    /// Fit to `window_len`, then `size`-frame clips every `step` frames
    SubWindows { size: usize, step: usize },
}

impl WindowPolicy {
    /// Clip layout the legacy model was validated with
    pub const fn legacy_sub_windows() -> Self {
        WindowPolicy::SubWindows { size: 15, step: 5 }
    }

    pub fn validate(&self, window_len: usize) -> ConfigResult<()> {
        if let WindowPolicy::SubWindows { size, step } = *self {
            if size == 0 || step == 0 {
                return Err(ConfigError::invalid("sub-window size and step must be at least 1"));
            }
            if size > window_len {
                return Err(ConfigError::invalid("sub-window size must not exceed window_len"));
            }
        }
        Ok(())
    }
}

/// Exactly `window_len` frames of model input
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    frames: Vec<FeatureVector>,
    /// Frames taken from the segment; the rest is zero padding
    filled: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn frames(&self) -> &[FeatureVector] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [FeatureVector] {
        &mut self.frames
    }

    /// Row-major `[window_len * 134]` tensor body
    pub fn as_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames.len() * FEATURE_DIM);
        for frame in &self.frames {
            out.extend_from_slice(frame);
        }
        out
    }

    /// Copy `src` to the head and zero-fill up to `window_len`
    fn head_aligned(src: &[FeatureVector], window_len: usize) -> Self {
        let filled = src.len().min(window_len);
        let mut frames = Vec::with_capacity(window_len);
        frames.extend_from_slice(&src[..filled]);
        frames.resize(window_len, [0.0; FEATURE_DIM]);
        Self { frames, filled }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSampler {
    window_len: usize,
    policy: WindowPolicy,
}

impl Default for WindowSampler {
    fn default() -> Self {
        Self::new(&WindowConfig::default())
    }
}

impl WindowSampler {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            window_len: config.window_len.max(1),
            policy: config.policy,
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Windows for one segment. An empty segment yields none.
    pub fn sample(&self, frames: &[FeatureVector]) -> Vec<Window> {
        if frames.is_empty() {
            return Vec::new();
        }

        match self.policy {
            WindowPolicy::SubWindows { size, step } => {
                let base = self.fitted(frames);
                sub_window_starts(self.window_len, size, step)
                    .into_iter()
                    .map(|start| Window::head_aligned(&base.frames[start..start + size], self.window_len))
                    .collect()
            }
            _ if frames.len() <= self.window_len => vec![Window::head_aligned(frames, self.window_len)],
            WindowPolicy::MultiOffset => start_offsets(frames.len(), self.window_len)
                .into_iter()
                .map(|start| Window::head_aligned(&frames[start..start + self.window_len], self.window_len))
                .collect(),
            WindowPolicy::Resample => vec![self.fitted(frames)],
        }
    }

    /// Resample down to `window_len`, or pad up to it
    fn fitted(&self, frames: &[FeatureVector]) -> Window {
        if frames.len() <= self.window_len {
            return Window::head_aligned(frames, self.window_len);
        }
        let picked: Vec<FeatureVector> = resample_indices(frames.len(), self.window_len)
            .into_iter()
            .map(|i| frames[i])
            .collect();
        Window::head_aligned(&picked, self.window_len)
    }
}

/// Clip starts over a fitted window; empty when `size` does not fit
pub fn sub_window_starts(window_len: usize, size: usize, step: usize) -> Vec<usize> {
    if size == 0 || size > window_len {
        return Vec::new();
    }
    (0..=window_len - size).step_by(step.max(1)).collect()
}

/// Start, middle and end crop offsets, duplicates removed.
///
/// Only meaningful for `len > window_len`; shorter input gets `[0]`.
pub fn start_offsets(len: usize, window_len: usize) -> Vec<usize> {
    if len <= window_len {
        return vec![0];
    }
    let last = len - window_len;
    let mut offsets = vec![0, last / 2, last];
    offsets.dedup();
    offsets
}

/// `round_half_up(i * (len - 1) / (window_len - 1))` for each output slot
pub fn resample_indices(len: usize, window_len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    if window_len <= 1 {
        return vec![0];
    }
    let den = window_len - 1;
    (0..window_len)
        .map(|i| ((2 * i * (len - 1) + den) / (2 * den)).min(len - 1))
        .collect()
}
