//! Bounded frame storage
//!
//! Both the idle pre-roll and the capturing segment live in fixed-capacity
//! rings: pushing past capacity drops the oldest frame, so memory per stream
//! is bounded no matter how long a gesture runs.

use std::collections::VecDeque;

use super::features::{FeatureVector, FEATURE_DIM};

/// Ring of encoded frames in chronological order
#[derive(Clone, Debug)]
pub struct FrameRing {
    frames: VecDeque<FeatureVector>,
    capacity: usize,
    /// Frames evicted since the last clear
    evicted: usize,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Append a frame, evicting the oldest when full
    pub fn push(&mut self, frame: FeatureVector) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
            self.evicted += 1;
        }
        self.frames.push_back(frame);
    }

    /// Move every frame of `other` to the back of this ring (oldest first)
    pub fn append(&mut self, other: &mut FrameRing) {
        while let Some(frame) = other.frames.pop_front() {
            self.push(frame);
        }
        other.evicted = 0;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evicted(&self) -> usize {
        self.evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureVector> {
        self.frames.iter()
    }

    /// The most recent `n` frames (fewer if the ring is shorter)
    pub fn latest(&self, n: usize) -> Vec<FeatureVector> {
        let skip = self.frames.len().saturating_sub(n);
        self.frames.iter().skip(skip).copied().collect()
    }

    /// Empty the ring into a Vec, oldest first
    pub fn take(&mut self) -> Vec<FeatureVector> {
        self.evicted = 0;
        self.frames.drain(..).collect()
    }

    /// Flat `[frame0.f0, ..., frameN.f133]` copy
    pub fn as_flat(&self) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.frames.len() * FEATURE_DIM);
        for frame in &self.frames {
            result.extend_from_slice(frame);
        }
        result
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.evicted = 0;
    }
}

/// A finished run of frames believed to contain one sign
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub id: u64,
    pub frames: Vec<FeatureVector>,
    pub started_at_ms: i64,
    /// Frames the pipeline had observed when this segment closed
    pub frames_since_pipeline_start: u32,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(v: f32) -> FeatureVector {
        [v; FEATURE_DIM]
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut ring = FrameRing::new(3);
        for i in 0..5 {
            ring.push(frame(i as f32));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.evicted(), 2);
        let firsts: Vec<f32> = ring.iter().map(|f| f[0]).collect();
        assert_eq!(firsts, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_append_respects_capacity() {
        let mut pre = FrameRing::new(4);
        for i in 0..4 {
            pre.push(frame(i as f32));
        }
        let mut seg = FrameRing::new(3);
        seg.append(&mut pre);

        assert!(pre.is_empty());
        let firsts: Vec<f32> = seg.iter().map(|f| f[0]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_latest_and_take() {
        let mut ring = FrameRing::new(10);
        for i in 0..6 {
            ring.push(frame(i as f32));
        }
        let tail = ring.latest(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0][0], 4.0);
        assert_eq!(ring.latest(50).len(), 6);

        let all = ring.take();
        assert_eq!(all.len(), 6);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_as_flat_is_chronological() {
        let mut ring = FrameRing::new(2);
        ring.push(frame(1.0));
        ring.push(frame(2.0));
        let flat = ring.as_flat();
        assert_eq!(flat.len(), 2 * FEATURE_DIM);
        assert_eq!(flat[0], 1.0);
        assert_eq!(flat[FEATURE_DIM], 2.0);
    }
}
