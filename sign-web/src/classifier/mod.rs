//! Classifier module - feature encoding, normalization and ensemble inference
//!
//! Note: the network itself runs outside Rust (onnxruntime-web in the
//! browser). Rust owns everything before and after the forward pass.

mod buffer;
mod ensemble;
mod features;
mod model;
mod normalize;
mod window;

pub use buffer::{FrameRing, Segment};
pub use ensemble::{InferenceEnsemble, PredictionResult};
pub use features::{
    encode, FeatureEncoder, FeatureVector, FEATURE_DIM, LEFT_HAND_OFFSET, LEFT_SHOULDER_X,
    POSE_SELECT, POSE_SELECTED, RIGHT_HAND_OFFSET, RIGHT_SHOULDER_X,
};
pub use model::{softmax, Classifier, LabelTable, OutputKind, SharedClassifier};
pub use normalize::{NormStats, NormalizationParams, NormalizationStrategy, Normalizer, EPSILON};
pub use window::{
    resample_indices, start_offsets, sub_window_starts, Window, WindowPolicy, WindowSampler, WINDOW_LEN,
};
