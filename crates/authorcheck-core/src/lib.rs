//! authorcheck Core
//!
//! Core types, traits, and utilities shared across authorcheck components.
//!
//! This crate provides:
//! - Labeled examples and evaluation results
//! - Error types and result handling
//! - The text normalization applied before both training and inference

pub mod error;
pub mod text;
pub mod types;

pub use error::{Error, Result};
pub use text::normalize;
pub use types::{EvaluationResult, Label, LabeledExample};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::text::normalize;
    pub use crate::types::{EvaluationResult, Label, LabeledExample};
}
