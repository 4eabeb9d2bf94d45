//! Bar-level chord detection
//!
//! Scores each bar's overlap-weighted pitch-class profile against the chord
//! template bank. One chord per bar at most, so fast passing tones inside a
//! bar do not make the chord timeline thrash.

use super::function::{is_chromatic, roman_numeral, secondary_target};
use super::templates::{ChordQuality, ChordTemplates};
use super::tension::chord_tension;
use crate::analysis::result::{ChordEvent, Key};
use crate::config::AnalysisConfig;
use crate::features::key::detector::windowed_histogram;
use crate::timeline::events::NoteEvent;
use crate::timeline::search::lower_bound_time;

/// Scores closer than this are ties, resolved by quality preference
const TIE_EPSILON: f32 = 1e-4;

/// Best template match for one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordCandidate {
    /// Root pitch class
    pub root: u8,
    /// Chord quality
    pub quality: ChordQuality,
    /// Match score (cosine similarity plus bonuses)
    pub score: f32,
}

/// Pick the best chord template for a pitch-class profile
///
/// # Arguments
///
/// * `profile` - Weighted pitch-class profile (any scale)
/// * `bass_pc` - Lowest sounding pitch class, if known
/// * `key` - Local key (diatonic roots get `config.diatonic_root_bonus`)
/// * `templates` - Chord template bank
/// * `config` - Analysis configuration
///
/// # Returns
///
/// `None` if the profile carries less than `config.min_bar_weight`.
pub fn best_chord(
    profile: &[f32; 12],
    bass_pc: Option<u8>,
    key: Key,
    templates: &ChordTemplates,
    config: &AnalysisConfig,
) -> Option<ChordCandidate> {
    let total: f32 = profile.iter().sum();
    if total < config.min_bar_weight {
        return None;
    }

    let norm = profile.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return None;
    }

    let mut best: Option<ChordCandidate> = None;
    for template in templates.iter() {
        let cosine: f32 = profile
            .iter()
            .zip(template.weights.iter())
            .map(|(p, w)| p * w)
            .sum::<f32>()
            / norm;

        let mut score = cosine;
        if key.is_diatonic(template.root) {
            score += config.diatonic_root_bonus;
        }
        if bass_pc == Some(template.root) {
            score += config.bass_root_bonus;
        }

        let candidate = ChordCandidate {
            root: template.root,
            quality: template.quality,
            score,
        };

        best = match best {
            None => Some(candidate),
            Some(current) => {
                if score > current.score + TIE_EPSILON {
                    Some(candidate)
                } else if (score - current.score).abs() <= TIE_EPSILON
                    && candidate.quality.preference_rank() < current.quality.preference_rank()
                {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }

    best
}

/// Detect one chord per bar
///
/// # Arguments
///
/// * `notes` - Pitched notes sorted by onset (drums are ignored)
/// * `bar_starts` - Bar start times in seconds
/// * `song_end` - End of the last bar in seconds
/// * `key_at` - Local key lookup at a bar start
/// * `templates` - Chord template bank
/// * `config` - Analysis configuration
///
/// # Returns
///
/// Chords sorted by time. Each chord's time is the earliest note onset in
/// its bar (the bar start if every note was held over from before).
pub fn detect_chords<F>(
    notes: &[NoteEvent],
    bar_starts: &[f64],
    song_end: f64,
    key_at: F,
    templates: &ChordTemplates,
    config: &AnalysisConfig,
) -> Vec<ChordEvent>
where
    F: Fn(f64) -> Key,
{
    log::debug!(
        "Detecting chords over {} bars ({} notes)",
        bar_starts.len(),
        notes.len()
    );

    let mut chords: Vec<ChordEvent> = Vec::with_capacity(bar_starts.len());

    for (bar, &start) in bar_starts.iter().enumerate() {
        let end = bar_starts.get(bar + 1).copied().unwrap_or(song_end);
        if end <= start {
            continue;
        }

        let profile = windowed_histogram(notes, start, end);
        let key = key_at(start);
        let bass_pc = lowest_sounding(notes, start, end).map(|n| n.pitch_class);

        let Some(candidate) = best_chord(&profile, bass_pc, key, templates, config) else {
            continue;
        };

        if config.merge_repeated_chords {
            if let Some(last) = chords.last() {
                if last.root == candidate.root && last.quality == candidate.quality {
                    continue;
                }
            }
        }

        let in_bar = &notes[lower_bound_time(notes, start)..lower_bound_time(notes, end)];
        let time = in_bar
            .iter()
            .find(|n| !n.is_drum)
            .map(|n| n.time)
            .unwrap_or(start);

        let previous_root = chords.last().map(|c| c.root);
        chords.push(build_chord(
            time,
            candidate.root,
            candidate.quality,
            key,
            previous_root,
        ));
    }

    log::debug!("Detected {} chords", chords.len());
    chords
}

/// Assemble a chord event with its harmonic function and tension
pub fn build_chord(
    time: f64,
    root: u8,
    quality: ChordQuality,
    key: Key,
    previous_root: Option<u8>,
) -> ChordEvent {
    let degree = key.degree_of(root).degree;
    let target = secondary_target(root, quality, key);
    ChordEvent {
        time,
        root,
        quality,
        degree,
        tension: chord_tension(root, quality, degree, target, key, previous_root),
        is_secondary: target.is_some(),
        secondary_target: target,
        is_chromatic: is_chromatic(root, quality, key),
        numeral: roman_numeral(root, quality, key, target),
    }
}

/// Lowest pitched note overlapping `[start, end)`
fn lowest_sounding(notes: &[NoteEvent], start: f64, end: f64) -> Option<&NoteEvent> {
    notes[..lower_bound_time(notes, end)]
        .iter()
        .filter(|n| !n.is_drum && n.end() > start)
        .min_by_key(|n| n.midi)
}
