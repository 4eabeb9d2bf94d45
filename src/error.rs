//! Error types for timeline analysis

use std::fmt;

/// Errors that can occur while loading or analyzing a timeline
///
/// These only surface at song load. The per-frame mapper never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input events (unsorted, non-finite, empty where required)
    InvalidInput(String),

    /// Invalid configuration values
    InvalidConfig(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (degenerate profile, division by zero, etc.)
    NumericalError(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}
