//! Harmonic tension model
//!
//! `tension = 0.40·hierarchical + 0.25·dissonance + 0.20·motion + 0.15·tendency`
//!
//! - **hierarchical**: circle-of-fifths distance of the root from the tonic, over 6
//! - **dissonance**: fixed per chord quality
//! - **motion**: root interval class from the previous chord
//! - **tendency**: resolution pull of the scale degree
//!
//! Secondary functions add a flat bonus on top. The result is clamped to [0, 1].

use super::templates::ChordQuality;
use crate::analysis::result::Key;

/// Weight of the circle-of-fifths term
pub const HIERARCHICAL_WEIGHT: f32 = 0.40;
/// Weight of the chord-quality term
pub const DISSONANCE_WEIGHT: f32 = 0.25;
/// Weight of the root-motion term
pub const MOTION_WEIGHT: f32 = 0.20;
/// Weight of the scale-degree tendency term
pub const TENDENCY_WEIGHT: f32 = 0.15;

/// Bonus for secondary dominants / leading-tone chords
pub const SECONDARY_BONUS: f32 = 0.15;
/// Reduced bonus for V/V
pub const SECONDARY_OF_DOMINANT_BONUS: f32 = 0.10;

/// Largest circle-of-fifths distance
const MAX_FIFTHS_DISTANCE: f32 = 6.0;

/// Circle-of-fifths distance from the tonic, normalized to [0, 1]
pub fn hierarchical_tension(root: u8, key: Key) -> f32 {
    key.fifths_distance(root) as f32 / MAX_FIFTHS_DISTANCE
}

/// Root-motion term by interval class from the previous chord root
///
/// Tritone 0.40, step 0.25, third 0.15, fourth/fifth 0.05, repeat 0.
pub fn motion_tension(previous_root: Option<u8>, root: u8) -> f32 {
    let Some(prev) = previous_root else {
        return 0.0;
    };
    let d = (root % 12 + 12 - prev % 12) % 12;
    match d.min(12 - d) {
        0 => 0.0,
        1 | 2 => 0.25,
        3 | 4 => 0.15,
        5 => 0.05,
        _ => 0.40,
    }
}

/// Resolution pull by scale degree (vii 0.30, V 0.20, I 0)
pub fn tendency_tension(degree: u8) -> f32 {
    match degree {
        1 => 0.0,
        2 => 0.10,
        3 => 0.05,
        4 => 0.10,
        5 => 0.20,
        6 => 0.05,
        7 => 0.30,
        _ => 0.0,
    }
}

/// Full tension score for a chord in context
///
/// # Arguments
///
/// * `root` - Chord root pitch class
/// * `quality` - Chord quality
/// * `degree` - Scale degree of the root (1-7)
/// * `secondary_target` - Tonicized degree, if the chord is secondary
/// * `key` - Local key
/// * `previous_root` - Root of the preceding chord, if any
pub fn chord_tension(
    root: u8,
    quality: ChordQuality,
    degree: u8,
    secondary_target: Option<u8>,
    key: Key,
    previous_root: Option<u8>,
) -> f32 {
    let mut tension = HIERARCHICAL_WEIGHT * hierarchical_tension(root, key)
        + DISSONANCE_WEIGHT * quality.dissonance()
        + MOTION_WEIGHT * motion_tension(previous_root, root)
        + TENDENCY_WEIGHT * tendency_tension(degree);

    if let Some(target) = secondary_target {
        let of_dominant = target == 5
            && matches!(quality, ChordQuality::Major | ChordQuality::Dom7);
        tension += if of_dominant {
            SECONDARY_OF_DOMINANT_BONUS
        } else {
            SECONDARY_BONUS
        };
    }

    tension.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tonic_is_relaxed() {
        let t = chord_tension(0, ChordQuality::Major, 1, None, Key::Major(0), None);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn test_dominant_more_tense_than_tonic() {
        let key = Key::Major(0);
        let tonic = chord_tension(0, ChordQuality::Major, 1, None, key, Some(7));
        let dominant = chord_tension(7, ChordQuality::Dom7, 5, None, key, Some(0));
        assert!(dominant > tonic);
    }

    #[test]
    fn test_motion_classes() {
        assert_eq!(motion_tension(None, 5), 0.0);
        assert_eq!(motion_tension(Some(0), 0), 0.0);
        assert_eq!(motion_tension(Some(0), 6), 0.40);
        assert_eq!(motion_tension(Some(0), 2), 0.25);
        assert_eq!(motion_tension(Some(0), 7), 0.05);
        assert_eq!(motion_tension(Some(7), 0), 0.05);
    }

    #[test]
    fn test_secondary_of_dominant_bonus_is_smaller() {
        let key = Key::Major(0);
        let base = chord_tension(2, ChordQuality::Major, 2, None, key, Some(0));
        let v_of_v = chord_tension(2, ChordQuality::Major, 2, Some(5), key, Some(0));
        assert!((v_of_v - base - SECONDARY_OF_DOMINANT_BONUS).abs() < 1e-6);

        let base = chord_tension(4, ChordQuality::Major, 3, None, key, Some(0));
        let v_of_vi = chord_tension(4, ChordQuality::Major, 3, Some(6), key, Some(0));
        assert!((v_of_vi - base - SECONDARY_BONUS).abs() < 1e-6);
    }

    #[test]
    fn test_tension_bounds_exhaustive() {
        for tonic in 0..12u8 {
            for key in [Key::Major(tonic), Key::Minor(tonic)] {
                for root in 0..12u8 {
                    for quality in ChordQuality::ALL {
                        for prev in [None, Some(0u8), Some(6)] {
                            for target in [None, Some(2u8), Some(5), Some(7)] {
                                let degree = key.degree_of(root).degree;
                                let t = chord_tension(root, quality, degree, target, key, prev);
                                assert!((0.0..=1.0).contains(&t), "tension {} out of range", t);
                            }
                        }
                    }
                }
            }
        }
    }
}
