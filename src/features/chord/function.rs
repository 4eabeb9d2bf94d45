//! Harmonic function of a chord within a key
//!
//! Diatonic membership, secondary dominant / leading-tone detection and
//! Roman numeral spelling.

use super::templates::ChordQuality;
use crate::analysis::result::{Key, Mode};

const MAJOR_NUMERALS: [&str; 7] = ["I", "II", "III", "IV", "V", "VI", "VII"];

/// Qualities that count as diatonic on a scale degree
///
/// Minor keys accept harmonic-minor V and vii° alongside the natural forms.
pub fn diatonic_qualities(mode: Mode, degree: u8) -> &'static [ChordQuality] {
    use ChordQuality::*;
    match (mode, degree) {
        (Mode::Major, 1) | (Mode::Major, 4) => &[Major, Maj7, Sus2, Sus4],
        (Mode::Major, 2) | (Mode::Major, 6) => &[Minor, Min7, Sus2, Sus4],
        (Mode::Major, 3) => &[Minor, Min7],
        (Mode::Major, 5) => &[Major, Dom7, Sus4, Sus2],
        (Mode::Major, _) => &[Dim, Hdim7],
        (Mode::Minor, 1) | (Mode::Minor, 4) => &[Minor, Min7, Sus2, Sus4],
        (Mode::Minor, 2) => &[Dim, Hdim7],
        (Mode::Minor, 3) => &[Major, Maj7, Aug],
        (Mode::Minor, 5) => &[Minor, Min7, Major, Dom7, Sus4],
        (Mode::Minor, 6) => &[Major, Maj7, Sus2],
        (Mode::Minor, _) => &[Major, Dom7, Dim, Dim7],
    }
}

/// True if the root or quality falls outside the key
pub fn is_chromatic(root: u8, quality: ChordQuality, key: Key) -> bool {
    let sd = key.degree_of(root);
    sd.accidental != 0 || !diatonic_qualities(key.mode(), sd.degree).contains(&quality)
}

/// Degrees whose diatonic triad can be tonicized (not diminished)
fn is_tonicizable(key: Key, degree: u8) -> bool {
    match key.mode() {
        Mode::Major => (2..=6).contains(&degree),
        Mode::Minor => (3..=7).contains(&degree),
    }
}

/// True for qualities that resolve up a fourth (V, V7)
fn is_dominant_quality(quality: ChordQuality) -> bool {
    matches!(quality, ChordQuality::Major | ChordQuality::Dom7)
}

/// True for qualities that resolve up a semitone (vii°, viiø7, vii°7)
fn is_leading_tone_quality(quality: ChordQuality) -> bool {
    matches!(
        quality,
        ChordQuality::Dim | ChordQuality::Hdim7 | ChordQuality::Dim7
    )
}

/// Degree (2-7) tonicized by a secondary dominant or leading-tone chord
///
/// A chord already diatonic in the key is not secondary, except a dominant
/// seventh off the dominant degree (I7 = V7/IV).
pub fn secondary_target(root: u8, quality: ChordQuality, key: Key) -> Option<u8> {
    let dominant = is_dominant_quality(quality);
    if !dominant && !is_leading_tone_quality(quality) {
        return None;
    }

    let sd = key.degree_of(root);
    let diatonic = !is_chromatic(root, quality, key);
    let applied_seventh = quality == ChordQuality::Dom7 && sd.degree != 5;
    if diatonic && !applied_seventh {
        return None;
    }

    (2..=7u8).filter(|&t| is_tonicizable(key, t)).find(|&t| {
        let target_pc = key.degree_pitch_class(t);
        let offset = if dominant { 7 } else { 11 };
        (target_pc + offset) % 12 == root % 12
    })
}

/// Numeral of a degree's diatonic triad, with case set by the triad quality
fn target_numeral(key: Key, degree: u8) -> String {
    let base = MAJOR_NUMERALS[(degree.clamp(1, 7) - 1) as usize];
    let lowercase = match (key.mode(), degree) {
        (Mode::Major, 2) | (Mode::Major, 3) | (Mode::Major, 6) | (Mode::Major, 7) => true,
        (Mode::Minor, 1) | (Mode::Minor, 2) | (Mode::Minor, 4) => true,
        _ => false,
    };
    if lowercase {
        base.to_lowercase()
    } else {
        base.to_string()
    }
}

/// Roman numeral for display
///
/// ```
/// use stratum_viz::analysis::Key;
/// use stratum_viz::features::chord::{roman_numeral, ChordQuality};
///
/// let c = Key::Major(0);
/// assert_eq!(roman_numeral(7, ChordQuality::Dom7, c, None), "V7");
/// assert_eq!(roman_numeral(2, ChordQuality::Major, c, Some(5)), "V/V");
/// assert_eq!(roman_numeral(10, ChordQuality::Major, c, None), "bVII");
/// ```
pub fn roman_numeral(
    root: u8,
    quality: ChordQuality,
    key: Key,
    secondary: Option<u8>,
) -> String {
    if let Some(target) = secondary {
        let function = if is_dominant_quality(quality) { "V" } else { "vii" };
        return format!(
            "{}{}/{}",
            function,
            quality.suffix(),
            target_numeral(key, target)
        );
    }

    let sd = key.degree_of(root);
    let prefix = match sd.accidental {
        a if a < 0 => "b",
        a if a > 0 => "#",
        _ => "",
    };
    let base = MAJOR_NUMERALS[(sd.degree.clamp(1, 7) - 1) as usize];
    let base = if quality.is_lowercase() {
        base.to_lowercase()
    } else {
        base.to_string()
    };
    format!("{}{}{}", prefix, base, quality.suffix())
}
