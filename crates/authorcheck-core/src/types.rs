//! Core types for authorcheck

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ground-truth authorship of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    /// Written by a person (encoded as 0)
    Human,
    /// Produced by a language model (encoded as 1)
    Ai,
}

impl Label {
    /// Both labels, ordered by their encoding
    pub const ALL: [Label; 2] = [Label::Human, Label::Ai];

    /// Numeric encoding used in datasets (`generated` column)
    pub fn as_index(self) -> usize {
        match self {
            Self::Human => 0,
            Self::Ai => 1,
        }
    }

    /// Decode a dataset value. Accepts `0`/`1` and their float spellings.
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(Self::Human)
        } else if value == 1.0 {
            Some(Self::Ai)
        } else {
            None
        }
    }

    /// Whether this is the positive (AI-generated) class
    pub fn is_ai(self) -> bool {
        matches!(self, Self::Ai)
    }
}

impl From<bool> for Label {
    fn from(is_ai: bool) -> Self {
        if is_ai {
            Self::Ai
        } else {
            Self::Human
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Ai => write!(f, "ai"),
        }
    }
}

/// A single text with its authorship label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    /// Normalized text
    pub text: String,

    /// Authorship label
    pub label: Label,
}

impl LabeledExample {
    /// Create a new labeled example
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Metrics for one algorithm from one harness run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Registered algorithm name
    pub model: String,

    /// Fraction of held-out examples predicted correctly
    pub accuracy: f64,

    /// Support-weighted F1 over both classes
    pub f1_score: f64,

    /// Seconds spent obtaining a ready pipeline (cache check plus load or fit)
    pub latency_sec: f64,

    /// Whether the pipeline was fit during this run
    pub retrained: bool,
}
