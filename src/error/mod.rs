//! Error handling module for KeyCut

use thiserror::Error;

use crate::domain::model::Micros;

/// Main error type for KeyCut operations
#[derive(Error, Debug)]
pub enum CutError {
    /// Range rejected by the selection set
    #[error("Invalid range {start_micros}us..{end_micros}us: {reason}")]
    InvalidRange {
        start_micros: Micros,
        end_micros: Micros,
        reason: String,
    },

    /// Probe output could not seed a keyframe index
    #[error("Invalid probe data: {message}")]
    InvalidProbeData { message: String },

    /// Nothing left to cut for the requested save mode
    #[error("Nothing to cut for {mode}: {reason}")]
    EmptySelection { mode: String, reason: String },

    /// Split by tags requested without any tag points
    #[error("Split by tags requires at least one tag point")]
    InvalidTagAlignment,

    /// No argument template registered for the output format
    #[error("Unsupported output format: {format}")]
    UnsupportedFormat { format: String },

    /// Pieces joined by a concatenation would not share codec parameters
    #[error("Operation {operation} cannot be concatenated losslessly: {reason}")]
    CodecIncompatible { operation: usize, reason: String },

    /// Invalid time format
    #[error("Invalid time format: {time}. Expected HH:MM:SS.fff, MM:SS.fff, or seconds")]
    InvalidTimeFormat { time: String },

    /// Configuration could not be loaded or saved
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Probing binary failed or returned unusable output
    #[error("Failed to probe media file: {message}")]
    Probe { message: String },

    /// An invocation failed while executing a plan
    #[error("Step {step} failed: {reason}")]
    Execution { step: usize, reason: String },

    /// Execution was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CutError {
    /// Whether the caller can correct its input and retry.
    ///
    /// Every planning and synthesis failure is local to one call;
    /// only execution-side failures are reported as non-recoverable here.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CutError::InvalidRange { .. }
                | CutError::InvalidProbeData { .. }
                | CutError::EmptySelection { .. }
                | CutError::InvalidTagAlignment
                | CutError::UnsupportedFormat { .. }
                | CutError::CodecIncompatible { .. }
                | CutError::InvalidTimeFormat { .. }
        )
    }

    pub(crate) fn invalid_range(start: Micros, end: Micros, reason: impl Into<String>) -> Self {
        CutError::InvalidRange {
            start_micros: start,
            end_micros: end,
            reason: reason.into(),
        }
    }
}

/// Result type alias for KeyCut operations
pub type CutResult<T> = std::result::Result<T, CutError>;
