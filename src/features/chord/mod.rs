//! Chord detection modules
//!
//! Detect one chord per bar using:
//! - A 132-entry root × quality template bank
//! - Diatonic and bass-root score bonuses
//! - Harmonic function analysis (secondary dominants, chromaticism)
//! - A four-term harmonic tension model

pub mod detector;
pub mod function;
pub mod templates;
pub mod tension;

pub use detector::{best_chord, build_chord, detect_chords, ChordCandidate};
pub use function::{is_chromatic, roman_numeral, secondary_target};
pub use templates::{ChordQuality, ChordTemplates};
pub use tension::chord_tension;
