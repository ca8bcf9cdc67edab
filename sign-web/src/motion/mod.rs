//! Motion module - energy, segmentation and result gating
//!
//! Re-exports only. All logic in submodules.

mod boundary;
mod energy;
mod gate;

pub use boundary::{AbandonReason, BoundaryEvent, BoundaryState, CloseCause, SegmentBoundaryDetector};
pub use energy::{instant_energy, MotionEnergyEstimator, DEFAULT_ALPHA};
pub use gate::{GateState, ResultGate};
