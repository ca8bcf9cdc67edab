//! Bridge module - JS ↔ Rust communication
//!
//! All #[wasm_bindgen] entry points live here.
//! Re-exports only in mod.rs, logic in submodules.

mod classifier_integration;
mod landmarks;

pub use classifier_integration::{
    dispose_pipeline,
    init_pipeline,
    is_pipeline_ready,
    JsClassifier,
};

pub use landmarks::{
    get_motion_energy,
    is_capturing,
    push_frame,
    push_hands,
    push_pose,
    reset_pipeline,
    set_live_mode,
};
