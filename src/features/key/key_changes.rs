//! Key change detection
//!
//! Detects modulations by running key detection over a window of bars that
//! slides forward one bar at a time.
//!
//! # Algorithm
//!
//! 1. Window covers N bars (N scales with tempo), hop is one bar
//! 2. Detect key for each window from overlap-weighted pitch classes
//! 3. A new key is only accepted after winning `hysteresis` consecutive windows
//! 4. The accepted region starts at the middle bar of its first winning window

use super::{detector::detect_key, detector::windowed_histogram, templates::KeyTemplates};
use crate::analysis::result::{Key, KeyRegion};
use crate::timeline::events::NoteEvent;

/// Tempo above which the window is doubled
const FAST_TEMPO_BPM: f64 = 150.0;

/// Tempo below which the window is halved
const SLOW_TEMPO_BPM: f64 = 70.0;

/// Shortest window in bars after tempo scaling
const MIN_WINDOW_BARS: usize = 2;

/// Window length in bars for a tempo
///
/// Fast songs move through bars quickly, so a fixed bar count would react
/// to passing chromaticism. Slow songs get a shorter window for the opposite reason.
pub fn window_bars_for_tempo(base_bars: usize, bpm: f64, tempo_scaled: bool) -> usize {
    let base = base_bars.max(1);
    if !tempo_scaled {
        return base;
    }
    if bpm >= FAST_TEMPO_BPM {
        base * 2
    } else if bpm < SLOW_TEMPO_BPM {
        (base / 2).max(MIN_WINDOW_BARS).min(base)
    } else {
        base
    }
}

/// Candidate key waiting to clear the hysteresis threshold
struct Candidate {
    key: Key,
    first_window: usize,
    wins: usize,
    ambiguity_sum: f32,
}

/// Detect key regions over a bar grid
///
/// # Arguments
///
/// * `notes` - Pitched notes sorted by onset (drums are ignored)
/// * `bar_starts` - Bar start times in seconds
/// * `song_end` - End of the last bar in seconds
/// * `templates` - Key templates
/// * `window_bars` - Window length in bars
/// * `hysteresis` - Consecutive winning windows required to accept a new key
///
/// # Returns
///
/// Key regions sorted by time; the first starts at 0.0. Empty if no window
/// contains any pitched notes.
pub fn detect_modulations(
    notes: &[NoteEvent],
    bar_starts: &[f64],
    song_end: f64,
    templates: &KeyTemplates,
    window_bars: usize,
    hysteresis: usize,
) -> Vec<KeyRegion> {
    let window_bars = window_bars.max(1);
    let hysteresis = hysteresis.max(1);

    log::debug!(
        "Detecting modulations: {} bars, window={} bars, hysteresis={}",
        bar_starts.len(),
        window_bars,
        hysteresis
    );

    let mut regions: Vec<KeyRegion> = Vec::new();
    if bar_starts.is_empty() {
        return regions;
    }

    let bar_end = |bar: usize| -> f64 { bar_starts.get(bar).copied().unwrap_or(song_end) };
    let n_windows = bar_starts.len().saturating_sub(window_bars) + 1;

    let mut current: Option<Key> = None;
    let mut candidate: Option<Candidate> = None;

    for w in 0..n_windows {
        let start = bar_starts[w];
        let end = bar_end(w + window_bars).max(start);
        let histogram = windowed_histogram(notes, start, end);

        // Silent windows neither confirm nor break a candidate
        let result = match detect_key(&histogram, templates) {
            Ok(r) => r,
            Err(_) => continue,
        };

        let Some(active) = current else {
            current = Some(result.key);
            regions.push(KeyRegion {
                time: 0.0,
                pitch_class: result.key.tonic(),
                mode: result.key.mode(),
                ambiguity: result.ambiguity,
            });
            continue;
        };

        if result.key == active {
            candidate = None;
            continue;
        }

        let c = match candidate.take() {
            Some(mut c) if c.key == result.key => {
                c.wins += 1;
                c.ambiguity_sum += result.ambiguity;
                c
            }
            _ => Candidate {
                key: result.key,
                first_window: w,
                wins: 1,
                ambiguity_sum: result.ambiguity,
            },
        };

        if c.wins < hysteresis {
            candidate = Some(c);
            continue;
        }

        let onset_bar = (c.first_window + window_bars / 2).min(bar_starts.len() - 1);
        let region = KeyRegion {
            time: bar_starts[onset_bar],
            pitch_class: c.key.tonic(),
            mode: c.key.mode(),
            ambiguity: (c.ambiguity_sum / c.wins as f32).clamp(0.0, 1.0),
        };

        log::debug!(
            "Modulation to {} at {:.2}s (bar {}, ambiguity {:.3})",
            c.key.name(),
            region.time,
            onset_bar,
            region.ambiguity
        );

        match regions.last_mut() {
            Some(last) if region.time <= last.time => *last = region,
            _ => regions.push(region),
        }
        current = Some(c.key);
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::Mode;

    /// One bar per second; each bar holds a tonic triad arpeggio plus scale tones
    fn scale_bars(tonic: u8, bars: usize, start_bar: usize) -> Vec<NoteEvent> {
        let degrees = [0u8, 4, 7, 0, 2, 5, 9, 11];
        let mut notes = Vec::new();
        for bar in start_bar..start_bar + bars {
            for (i, d) in degrees.iter().enumerate() {
                let time = bar as f64 + i as f64 * 0.125;
                let weight = if i < 4 { 1.0 } else { 0.5 };
                notes.push(NoteEvent::new(60 + (tonic + d) % 12, weight, time, 0.125, 0));
            }
        }
        notes
    }

    fn bars(n: usize) -> Vec<f64> {
        (0..n).map(|b| b as f64).collect()
    }

    #[test]
    fn test_window_scaling() {
        assert_eq!(window_bars_for_tempo(4, 120.0, true), 4);
        assert_eq!(window_bars_for_tempo(4, 170.0, true), 8);
        assert_eq!(window_bars_for_tempo(4, 60.0, true), 2);
        assert_eq!(window_bars_for_tempo(4, 170.0, false), 4);
        assert_eq!(window_bars_for_tempo(2, 60.0, true), 2);
    }

    #[test]
    fn test_no_notes_no_regions() {
        let regions = detect_modulations(&[], &bars(8), 8.0, &KeyTemplates::default(), 4, 2);
        assert!(regions.is_empty());
    }

    #[test]
    fn test_single_key() {
        let notes = scale_bars(0, 8, 0);
        let regions = detect_modulations(&notes, &bars(8), 8.0, &KeyTemplates::default(), 4, 2);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].time, 0.0);
        assert_eq!(regions[0].pitch_class, 0);
        assert_eq!(regions[0].mode, Mode::Major);
    }

    #[test]
    fn test_modulation_detected() {
        let mut notes = scale_bars(0, 8, 0);
        notes.extend(scale_bars(7, 8, 8));
        let regions =
            detect_modulations(&notes, &bars(16), 16.0, &KeyTemplates::default(), 4, 2);
        assert_eq!(regions.len(), 2, "regions: {:?}", regions);
        assert_eq!(regions[1].key(), Key::Major(7));
        assert!(regions[1].time > 4.0 && regions[1].time <= 12.0);
        assert!(regions.iter().all(|r| (0.0..=1.0).contains(&r.ambiguity)));
    }

    #[test]
    fn test_transient_excursion_rejected_by_hysteresis() {
        // A single bar in F# inside C: never wins two consecutive 1-bar windows
        let mut notes = scale_bars(0, 4, 0);
        notes.extend(scale_bars(6, 1, 4));
        notes.extend(scale_bars(0, 4, 5));
        let regions = detect_modulations(&notes, &bars(9), 9.0, &KeyTemplates::default(), 1, 2);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].key(), Key::Major(0));
    }
}
