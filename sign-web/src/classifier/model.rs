//! Model artifact contract
//!
//! The network itself is a black box behind [`Classifier`]: in the browser it
//! runs in JavaScript, in tests it is a stub. What lives here is everything
//! the pipeline needs to agree with that box: the label table, the output
//! interpretation and a shareable single-flight wrapper.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, ConfigError, ConfigResult};

/// External sequence classifier, input `[1, window_len, 134]` flattened
pub trait Classifier {
    /// Width of the output vector
    fn num_labels(&self) -> usize;

    /// One forward pass over a flattened window
    fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn num_labels(&self) -> usize {
        (**self).num_labels()
    }

    fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        (**self).classify(input)
    }
}

/// One backend shared by several pipelines; calls are serialized.
pub struct SharedClassifier<C> {
    inner: Arc<Mutex<C>>,
    num_labels: usize,
}

impl<C: Classifier> SharedClassifier<C> {
    pub fn new(classifier: C) -> Self {
        let num_labels = classifier.num_labels();
        Self {
            inner: Arc::new(Mutex::new(classifier)),
            num_labels,
        }
    }
}

impl<C> Clone for SharedClassifier<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            num_labels: self.num_labels,
        }
    }
}

impl<C: Classifier> Classifier for SharedClassifier<C> {
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn classify(&mut self, input: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        self.inner.lock().classify(input)
    }
}

// ============================================================================
// OUTPUT INTERPRETATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Backend already applied softmax
    #[default]
    Probabilities,
    /// Raw scores; softmax is applied here
    Logits,
}

/// Max-shifted softmax
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}

// ============================================================================
// LABEL TABLE
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelFile {
    List(Vec<String>),
    /// `{"0": "hello"}`
    Map(BTreeMap<String, String>),
    /// Vocabulary layout, `{"hello": 0}`
    Vocab(BTreeMap<String, usize>),
}

/// Class index → label, loaded once and shared read-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> ConfigResult<Self> {
        if labels.is_empty() {
            return Err(ConfigError::labels("no labels"));
        }
        Ok(Self { labels })
    }

    /// Accepts `["a", "b"]`, `{"0": "a", "1": "b"}` or `{"a": 0, "b": 1}`
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        match serde_json::from_str::<LabelFile>(text)? {
            LabelFile::List(labels) => Self::new(labels),
            LabelFile::Map(map) => {
                let pairs = map
                    .into_iter()
                    .map(|(key, label)| {
                        key.trim()
                            .parse::<usize>()
                            .map(|index| (index, label))
                            .map_err(|_| ConfigError::labels(format!("key `{key}` is not an index")))
                    })
                    .collect::<ConfigResult<Vec<_>>>()?;
                Self::from_indexed(pairs)
            }
            LabelFile::Vocab(vocab) => {
                Self::from_indexed(vocab.into_iter().map(|(label, index)| (index, label)).collect())
            }
        }
    }

    /// Dense table from (index, label) pairs; gaps and clashes are errors
    fn from_indexed(pairs: Vec<(usize, String)>) -> ConfigResult<Self> {
        let mut slots: Vec<Option<String>> = vec![None; pairs.len()];
        for (index, label) in pairs {
            let slot = slots
                .get_mut(index)
                .ok_or_else(|| ConfigError::labels(format!("index {index} out of range")))?;
            if let Some(previous) = slot.replace(label) {
                return Err(ConfigError::labels(format!(
                    "index {index} assigned twice (`{previous}`)"
                )));
            }
        }
        let labels = slots
            .into_iter()
            .enumerate()
            .map(|(i, l)| l.ok_or_else(|| ConfigError::labels(format!("index {i} missing"))))
            .collect::<ConfigResult<Vec<_>>>()?;
        Self::new(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
