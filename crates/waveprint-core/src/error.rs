//! Error types for the analysis pipeline

use thiserror::Error;

/// Errors surfaced by the core analysis pipeline.
///
/// A failed descriptor sub-extraction is not an error at this level: the
/// assembler leaves the field unset and logs a warning. Errors here mean the
/// whole pipeline run is invalid.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Caller-supplied input cannot be processed (empty waveform, ragged
    /// magnitude grid, bad parameters). Not retryable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An underlying DSP primitive failed on otherwise-valid input.
    #[error("{stage} failed: {reason}")]
    Primitive { stage: &'static str, reason: String },
}

impl AnalysisError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AnalysisError::InvalidInput(msg.into())
    }

    pub fn primitive(stage: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::Primitive {
            stage,
            reason: reason.into(),
        }
    }
}
