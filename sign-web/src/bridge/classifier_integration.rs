//! Classifier integration - owns the pipeline and its JS collaborators
//!
//! The network runs in JavaScript (onnxruntime-web). JS hands us a
//! synchronous `classify(Float32Array) -> scores` callback plus three UI
//! callbacks; Rust owns segmentation, preprocessing and gating.

use std::cell::RefCell;
use std::sync::Arc;

use js_sys::{Float32Array, Function};
use wasm_bindgen::prelude::*;

use crate::classifier::{Classifier, LabelTable, NormStats};
use crate::config::PipelineConfig;
use crate::error::{ClassifierError, ConfigError};
use crate::pipeline::{SegmentPipeline, SignSink};

impl From<ConfigError> for JsValue {
    fn from(err: ConfigError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

// ============================================================================
// JS COLLABORATORS
// ============================================================================

/// Classifier backed by a JS function returning a Float32Array or number[]
pub struct JsClassifier {
    classify: Function,
    num_outputs: usize,
}

impl Classifier for JsClassifier {
    fn num_labels(&self) -> usize {
        self.num_outputs
    }

    fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        let tensor = Float32Array::from(input);
        let out = self
            .classify
            .call1(&JsValue::NULL, &tensor)
            .map_err(|e| ClassifierError::backend(format!("{:?}", e)))?;
        // Non-numeric entries become NaN and are rejected downstream
        Ok(Float32Array::new(&out).to_vec())
    }
}

/// One UI notification, held until the pipeline borrow is released
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum UiEvent {
    Sentence(String),
    Badge(Option<String>),
    Clear,
}

/// Sink that only records; JS is called after the pipeline is released so
/// UI handlers may call back into this module.
#[derive(Default)]
pub(crate) struct QueuedSink {
    pending: Vec<UiEvent>,
}

impl QueuedSink {
    pub(crate) fn drain(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl SignSink for QueuedSink {
    fn on_sentence(&mut self, label: String) {
        self.pending.push(UiEvent::Sentence(label));
    }

    fn on_label_badge(&mut self, label: Option<String>) {
        self.pending.push(UiEvent::Badge(label));
    }

    fn on_clear_result(&mut self) {
        self.pending.push(UiEvent::Clear);
    }
}

/// UI callbacks
#[derive(Clone)]
struct JsCallbacks {
    on_sentence: Function,
    on_badge: Function,
    on_clear: Function,
}

impl JsCallbacks {
    fn dispatch(&self, event: UiEvent) {
        let (func, arg) = match event {
            UiEvent::Sentence(label) => (&self.on_sentence, JsValue::from_str(&label)),
            UiEvent::Badge(label) => (
                &self.on_badge,
                label.map_or(JsValue::NULL, |l| JsValue::from_str(&l)),
            ),
            UiEvent::Clear => (&self.on_clear, JsValue::UNDEFINED),
        };
        if let Err(e) = func.call1(&JsValue::NULL, &arg) {
            web_sys::console::warn_1(&format!("UI callback failed: {:?}", e).into());
        }
    }
}

type JsPipeline = SegmentPipeline<JsClassifier, QueuedSink>;

// Thread-local storage (WASM is single-threaded)
thread_local! {
    static PIPELINE: RefCell<Option<JsPipeline>> = RefCell::new(None);
    static CALLBACKS: RefCell<Option<JsCallbacks>> = RefCell::new(None);
}

/// Result of touching the shared pipeline
#[derive(Debug, PartialEq)]
pub(crate) enum Access<R> {
    Done(R),
    /// `init_pipeline` has not run
    NotReady,
    /// Called from inside a JS callback while the pipeline is in use
    Busy,
}

impl<R> Access<R> {
    pub(crate) fn done(self) -> Option<R> {
        match self {
            Access::Done(r) => Some(r),
            Access::NotReady | Access::Busy => None,
        }
    }
}

/// Borrow the slot without panicking on re-entry
fn access<T, R>(cell: &RefCell<Option<T>>, f: impl FnOnce(&mut T) -> R) -> Access<R> {
    match cell.try_borrow_mut() {
        Ok(mut slot) => slot.as_mut().map_or(Access::NotReady, |value| Access::Done(f(value))),
        Err(_) => Access::Busy,
    }
}

/// Run `f` against the pipeline, then deliver queued UI events
pub(crate) fn with_pipeline<R>(f: impl FnOnce(&mut JsPipeline) -> R) -> Access<R> {
    let (outcome, events) = PIPELINE.with(|cell| {
        let mut events = Vec::new();
        let outcome = access(cell, |p| {
            let r = f(p);
            events = p.sink_mut().drain();
            r
        });
        (outcome, events)
    });

    if matches!(outcome, Access::Busy) {
        web_sys::console::warn_1(&"Sign pipeline busy, re-entrant call skipped".into());
    }
    if !events.is_empty() {
        // Cloned out so a handler may re-initialize the pipeline
        let callbacks = CALLBACKS.with(|cell| cell.try_borrow().ok().and_then(|cb| cb.clone()));
        if let Some(callbacks) = callbacks {
            for event in events {
                callbacks.dispatch(event);
            }
        }
    }
    outcome
}

// ============================================================================
// WASM-BINDGEN ENTRY POINTS
// ============================================================================

/// Build the pipeline. Fails when the tables and the model do not fit.
///
/// `config_json` may be empty for defaults. `norm_json` is the optional
/// `{"mean": [...], "std": [...]}` table. `num_outputs` is the model's
/// output width and must equal the label count.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn init_pipeline(
    config_json: &str,
    labels_json: &str,
    norm_json: Option<String>,
    num_outputs: usize,
    classify: Function,
    on_sentence: Function,
    on_badge: Function,
    on_clear: Function,
) -> Result<(), JsValue> {
    let config = if config_json.trim().is_empty() {
        PipelineConfig::default()
    } else {
        PipelineConfig::from_json(config_json)?
    };
    let labels = LabelTable::from_json(labels_json)?.into_shared();
    let stats = match norm_json {
        Some(text) if !text.trim().is_empty() => Some(Arc::new(NormStats::from_json(&text)?)),
        _ => None,
    };

    let pipeline = SegmentPipeline::new(
        config,
        JsClassifier { classify, num_outputs },
        labels,
        stats,
        QueuedSink::default(),
    )?;

    PIPELINE
        .with(|cell| cell.try_borrow_mut().map(|mut slot| *slot = Some(pipeline)))
        .map_err(|_| JsValue::from_str("sign pipeline busy, cannot re-initialize from a classify callback"))?;
    CALLBACKS.with(|cell| {
        if let Ok(mut slot) = cell.try_borrow_mut() {
            *slot = Some(JsCallbacks { on_sentence, on_badge, on_clear });
        }
    });
    web_sys::console::log_1(&"✅ Sign pipeline ready".into());
    Ok(())
}

/// Check if `init_pipeline` has succeeded
#[wasm_bindgen]
pub fn is_pipeline_ready() -> bool {
    // Only a live pipeline can be mid-call
    PIPELINE.with(|cell| cell.try_borrow().map_or(true, |slot| slot.is_some()))
}

/// Drop the pipeline entirely (e.g. before loading another model)
#[wasm_bindgen]
pub fn dispose_pipeline() {
    let disposed = PIPELINE.with(|cell| cell.try_borrow_mut().map(|mut slot| *slot = None));
    if disposed.is_err() {
        web_sys::console::warn_1(&"Sign pipeline busy, dispose skipped".into());
        return;
    }
    CALLBACKS.with(|cell| {
        if let Ok(mut slot) = cell.try_borrow_mut() {
            *slot = None;
        }
    });
}
