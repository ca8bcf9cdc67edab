//! Result gating
//!
//! Turns raw predictions into emissions the UI can show without flicker.
//! Segment results pass a confidence floor, an optional allow-list, a
//! refractory hold and a hands-departure re-arm. Live per-frame results
//! additionally need a streak of agreeing frames.

use log::{debug, info};

use crate::classifier::PredictionResult;
use crate::config::GateConfig;

/// Mutable part of the gate, exposed for inspection
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GateState {
    /// Label of the current live streak
    pub candidate: Option<String>,
    pub streak: u32,
    pub last_label: Option<String>,
    pub last_emit_ms: Option<i64>,
    /// Result currently on screen
    pub displaying: bool,
    /// Cleared by an emission, set again once hands leave the frame
    pub armed: bool,
}

pub struct ResultGate {
    config: GateConfig,
    state: GateState,
}

impl ResultGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            state: GateState {
                armed: true,
                ..GateState::default()
            },
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_displaying(&self) -> bool {
        self.state.displaying
    }

    fn allowed(&self, label: &str) -> bool {
        self.config
            .allowed_labels
            .as_ref()
            .map_or(true, |list| list.iter().any(|l| l == label))
    }

    fn in_hold(&self, now_ms: i64) -> bool {
        self.state
            .last_emit_ms
            .map_or(false, |t| now_ms.saturating_sub(t) < self.config.hold_ms)
    }

    /// Track hand presence for the departure re-arm. Callers pass whether
    /// hands are still tracked, so a drop-out inside the grace window does
    /// not count as leaving.
    pub fn observe_hands(&mut self, hands_tracked: bool) {
        if !hands_tracked && !self.state.armed {
            debug!("gate: hands left, re-armed");
            self.state.armed = true;
        }
    }

    /// Gate one segment result
    pub fn accept(&mut self, result: &PredictionResult, now_ms: i64) -> Option<String> {
        if result.probability < self.config.min_probability {
            debug!(
                "gate: '{}' rejected, p={:.3} < {:.3}",
                result.label, result.probability, self.config.min_probability
            );
            return None;
        }
        if !self.allowed(&result.label) {
            debug!("gate: '{}' not in allow-list", result.label);
            return None;
        }
        if self.in_hold(now_ms) {
            debug!("gate: '{}' suppressed, hold active", result.label);
            return None;
        }
        if self.config.require_hands_departure && !self.state.armed {
            debug!("gate: '{}' suppressed, hands have not left", result.label);
            return None;
        }

        Some(self.emit(&result.label, result.probability, now_ms))
    }

    /// Live mode: confirm a label after `min_stable_frames` agreeing results
    pub fn confirm_live(&mut self, label: &str, probability: f32, now_ms: i64) -> Option<String> {
        if self.in_hold(now_ms) {
            return None;
        }
        if probability < self.config.live_min_probability || !self.allowed(label) {
            self.state.streak = 0;
            self.state.candidate = None;
            return None;
        }

        if self.state.candidate.as_deref() == Some(label) {
            self.state.streak += 1;
        } else {
            self.state.candidate = Some(label.to_string());
            self.state.streak = 1;
        }

        if self.state.streak < self.config.min_stable_frames {
            return None;
        }
        Some(self.emit(label, probability, now_ms))
    }

    fn emit(&mut self, label: &str, probability: f32, now_ms: i64) -> String {
        info!("gate: emit '{}' (p={:.3})", label, probability);
        self.state.last_label = Some(label.to_string());
        self.state.last_emit_ms = Some(now_ms);
        self.state.displaying = true;
        self.state.armed = false;
        self.state.streak = 0;
        self.state.candidate = None;
        label.to_string()
    }

    /// True once a shown result has outlived its hold and should be cleared
    pub fn display_expired(&self, now_ms: i64) -> bool {
        self.state.displaying && !self.in_hold(now_ms)
    }

    pub fn clear_display(&mut self) {
        self.state.displaying = false;
    }

    pub fn reset(&mut self) {
        self.state = GateState {
            armed: true,
            ..GateState::default()
        };
    }
}

impl Default for ResultGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, p: f32) -> PredictionResult {
        PredictionResult {
            label: label.to_string(),
            label_index: 0,
            probability: p,
            segment_id: 0,
            windows_used: 1,
        }
    }

    #[test]
    fn test_probability_floor() {
        let mut gate = ResultGate::default();
        assert_eq!(gate.accept(&result("hello", 0.05), 0), None);
        assert_eq!(gate.accept(&result("hello", 0.5), 0).as_deref(), Some("hello"));
    }

    #[test]
    fn test_hold_and_departure() {
        let mut gate = ResultGate::default();
        assert!(gate.accept(&result("a", 0.9), 0).is_some());

        // Inside hold
        assert!(gate.accept(&result("b", 0.9), 1_000).is_none());
        // Hold over but hands never left
        assert!(gate.accept(&result("b", 0.9), 3_000).is_none());

        gate.observe_hands(false);
        assert_eq!(gate.accept(&result("b", 0.9), 3_100).as_deref(), Some("b"));
    }

    #[test]
    fn test_departure_can_be_disabled() {
        let config = GateConfig { require_hands_departure: false, ..Default::default() };
        let mut gate = ResultGate::new(config);
        assert!(gate.accept(&result("a", 0.9), 0).is_some());
        assert!(gate.accept(&result("a", 0.9), 2_500).is_some());
    }

    #[test]
    fn test_hold_with_extreme_timestamps() {
        let mut gate = ResultGate::new(GateConfig { require_hands_departure: false, ..Default::default() });
        assert!(gate.accept(&result("a", 0.9), i64::MIN).is_some());
        assert!(gate.accept(&result("a", 0.9), i64::MAX).is_some());
    }

    #[test]
    fn test_allow_list() {
        let config = GateConfig {
            allowed_labels: Some(vec!["yes".into()]),
            ..Default::default()
        };
        let mut gate = ResultGate::new(config);
        assert!(gate.accept(&result("no", 0.9), 0).is_none());
        assert!(gate.accept(&result("yes", 0.9), 0).is_some());
    }

    #[test]
    fn test_live_streak() {
        let mut gate = ResultGate::default();
        assert!(gate.confirm_live("a", 0.9, 0).is_none());
        assert!(gate.confirm_live("a", 0.9, 33).is_none());
        // Low confidence breaks the streak
        assert!(gate.confirm_live("a", 0.3, 66).is_none());
        assert_eq!(gate.state().streak, 0);

        assert!(gate.confirm_live("a", 0.9, 99).is_none());
        assert!(gate.confirm_live("b", 0.9, 132).is_none());
        assert!(gate.confirm_live("b", 0.9, 165).is_none());
        assert_eq!(gate.confirm_live("b", 0.9, 198).as_deref(), Some("b"));

        // Hold blocks further confirmations
        assert!(gate.confirm_live("b", 0.9, 300).is_none());
    }

    #[test]
    fn test_display_expiry_and_reset() {
        let mut gate = ResultGate::default();
        gate.accept(&result("a", 0.9), 0);
        assert!(!gate.display_expired(2_000));
        assert!(gate.display_expired(2_500));
        gate.clear_display();
        assert!(!gate.is_displaying());

        gate.reset();
        assert_eq!(gate.state(), ResultGate::default().state());
    }
}
