//! Key detection modules
//!
//! Detect musical key using:
//! - Reference key profiles (24 keys, three families)
//! - Pearson correlation against a weighted pitch-class histogram
//! - Sliding-window modulation detection with hysteresis

pub mod detector;
pub mod key_changes;
pub mod templates;

pub use detector::{detect_key, key_ambiguity, pitch_class_histogram, windowed_histogram};
pub use key_changes::{detect_modulations, window_bars_for_tempo};
pub use templates::{KeyTemplates, ProfileFamily};

use crate::analysis::result::Key;

/// Key detection result
#[derive(Debug, Clone)]
pub struct KeyDetectionResult {
    /// Detected key (best match)
    pub key: Key,

    /// Correlation of the best match (-1.0 to 1.0)
    pub correlation: f32,

    /// Ambiguity score (0.0 = clear winner, 1.0 = near tie)
    pub ambiguity: f32,

    /// All 24 key scores (ranked, highest first)
    pub all_scores: Vec<(Key, f32)>,
}
