//! Sign Web - keypoint-driven sign language recognition
//!
//! Entry point for WASM module. Only contains:
//! - Module declarations and public re-exports
//! - wasm_bindgen entry points that delegate to submodules
//!
//! The core (`keypoints`, `classifier`, `motion`, `pipeline`) has no browser
//! dependency and is usable from native code and tests.

mod bridge;
pub mod classifier;
pub mod config;
pub mod error;
pub mod keypoints;
pub mod motion;
pub mod pipeline;

use wasm_bindgen::prelude::*;

// Re-export wasm_bindgen functions for JS access
pub use bridge::{
    dispose_pipeline, get_motion_energy, init_pipeline, is_capturing, is_pipeline_ready,
    push_frame, push_hands, push_pose, reset_pipeline, set_live_mode, JsClassifier,
};

pub use classifier::{Classifier, LabelTable, NormStats, PredictionResult, SharedClassifier};
pub use config::{PipelineConfig, PipelineMode};
pub use error::{ClassifierError, ConfigError, ConfigResult};
pub use keypoints::{KeypointFrame, Point2D};
pub use pipeline::{SegmentPipeline, SignSink};

// ============================================================================
// WASM ENTRY POINTS
// ============================================================================

/// Called automatically when WASM module loads
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Route `log` output to the browser console
#[wasm_bindgen]
pub fn init_logging(level: &str) {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => log::Level::Trace,
        "debug" => log::Level::Debug,
        "warn" => log::Level::Warn,
        "error" => log::Level::Error,
        _ => log::Level::Info,
    };

    wasm_logger::init(wasm_logger::Config::new(log_level));
    log::info!("sign-web logging at {}", log_level);
}
