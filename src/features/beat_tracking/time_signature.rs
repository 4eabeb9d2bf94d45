//! Time signatures and metrical strength
//!
//! Beats are counted in denominator units: 6/8 has six eighth-note beats per
//! bar, 4/4 four quarter-note beats.
//!
//! # Example
//!
//! ```
//! use stratum_viz::features::beat_tracking::TimeSignature;
//!
//! let meter = TimeSignature::new(6, 8);
//! assert_eq!(meter.name(), "6/8");
//! assert_eq!(meter.metrical_strength(0), 1.0);
//! assert_eq!(meter.metrical_strength(3), 0.5);
//! ```

use serde::{Deserialize, Serialize};

/// Strength of the first beat of a bar
pub const DOWNBEAT_STRENGTH: f32 = 1.0;

/// Strength of a secondary accent (beat 3 of 4/4, beat 4 of 6/8)
pub const SECONDARY_STRENGTH: f32 = 0.5;

/// Strength of every other beat or off-grid hit
pub const WEAK_STRENGTH: f32 = 0.25;

/// Hits closer than this to a beat (in beats) take that beat's strength
const ON_BEAT_TOLERANCE: f64 = 0.1;

const TWO_FOUR: [f32; 2] = [DOWNBEAT_STRENGTH, SECONDARY_STRENGTH];
const THREE_FOUR: [f32; 3] = [DOWNBEAT_STRENGTH, WEAK_STRENGTH, WEAK_STRENGTH];
const FOUR_FOUR: [f32; 4] = [
    DOWNBEAT_STRENGTH,
    WEAK_STRENGTH,
    SECONDARY_STRENGTH,
    WEAK_STRENGTH,
];
const SIX_EIGHT: [f32; 6] = [
    DOWNBEAT_STRENGTH,
    WEAK_STRENGTH,
    WEAK_STRENGTH,
    SECONDARY_STRENGTH,
    WEAK_STRENGTH,
    WEAK_STRENGTH,
];

/// Musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Beats per bar
    pub numerator: u32,
    /// Beat unit (4 = quarter, 8 = eighth)
    pub denominator: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::common()
    }
}

impl TimeSignature {
    /// Create a time signature; zero parts fall back to 4
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator: if numerator == 0 { 4 } else { numerator },
            denominator: if denominator == 0 { 4 } else { denominator },
        }
    }

    /// 4/4 time (common time)
    pub const fn common() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    /// Get beats per bar for this time signature
    pub fn beats_per_bar(&self) -> u32 {
        self.numerator
    }

    /// Beat unit length in quarter notes (0.5 for eighth-note meters)
    pub fn beat_unit_quarters(&self) -> f64 {
        4.0 / self.denominator as f64
    }

    /// Get name as string (e.g., "4/4", "3/4", "6/8")
    pub fn name(&self) -> String {
        format!("{}/{}", self.numerator, self.denominator)
    }

    /// Accent table for the meter, if it has a dedicated one
    fn strength_table(&self) -> Option<&'static [f32]> {
        match (self.numerator, self.denominator) {
            (2, 4) | (2, 2) => Some(&TWO_FOUR),
            (3, 4) => Some(&THREE_FOUR),
            (4, 4) => Some(&FOUR_FOUR),
            (6, 8) => Some(&SIX_EIGHT),
            _ => None,
        }
    }

    /// Strength of a beat index within the bar
    pub fn metrical_strength(&self, beat_index: u32) -> f32 {
        let index = beat_index % self.numerator.max(1);
        match self.strength_table() {
            Some(table) => table[index as usize],
            None if index == 0 => DOWNBEAT_STRENGTH,
            None => WEAK_STRENGTH,
        }
    }

    /// Strength of a hit at a fractional beat position within the bar
    ///
    /// Hits off the beat grid are weak regardless of where they fall.
    pub fn hit_strength(&self, beat_in_bar: f64) -> f32 {
        let nearest = beat_in_bar.round();
        if (beat_in_bar - nearest).abs() > ON_BEAT_TOLERANCE {
            return WEAK_STRENGTH;
        }
        let beat = (nearest.max(0.0) as u32) % self.numerator.max(1);
        self.metrical_strength(beat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_tables() {
        let four = TimeSignature::common();
        assert_eq!(
            (0..4).map(|b| four.metrical_strength(b)).collect::<Vec<_>>(),
            vec![1.0, 0.25, 0.5, 0.25]
        );
        let three = TimeSignature::new(3, 4);
        assert_eq!(three.metrical_strength(1), 0.25);
        let two = TimeSignature::new(2, 4);
        assert_eq!(two.metrical_strength(1), 0.5);
    }

    #[test]
    fn test_generic_meter() {
        let seven = TimeSignature::new(7, 8);
        assert_eq!(seven.metrical_strength(0), 1.0);
        assert_eq!(seven.metrical_strength(4), 0.25);
        assert_eq!(seven.metrical_strength(7), 1.0);
    }

    #[test]
    fn test_hit_strength_tolerance() {
        let four = TimeSignature::common();
        assert_eq!(four.hit_strength(0.02), 1.0);
        assert_eq!(four.hit_strength(1.95), 0.5);
        assert_eq!(four.hit_strength(3.97), 1.0);
        assert_eq!(four.hit_strength(1.5), 0.25);
    }

    #[test]
    fn test_zero_parts_fall_back() {
        assert_eq!(TimeSignature::new(0, 0), TimeSignature::common());
        assert_eq!(TimeSignature::new(6, 8).beat_unit_quarters(), 0.5);
    }
}
