//! Lookahead windows over notes and chords
//!
//! Results are written into caller-owned buffers that are sized once when a
//! song loads and only cleared and refilled afterwards. Entries stay valid
//! until the next frame.

use serde::{Deserialize, Serialize};

use crate::analysis::result::ChordEvent;
use crate::features::beat_tracking::TempoMap;
use crate::features::chord::ChordQuality;
use crate::timeline::events::NoteEvent;
use crate::timeline::search::{binary_search_time, lower_bound_time};

/// A note intersecting the lookahead window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpcomingNote {
    /// MIDI note number
    pub midi: u8,
    /// Pitch class
    pub pitch_class: u8,
    /// Velocity (0.0-1.0)
    pub velocity: f32,
    /// Onset in seconds
    pub time: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Source track
    pub track: u32,
    /// Seconds from the playhead to the onset (negative once started)
    pub time_until: f64,
}

/// A chord inside the chord lookahead bars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpcomingChord {
    /// Index into the song's chord array
    pub index: usize,
    /// Onset in seconds
    pub time: f64,
    /// Root pitch class
    pub root: u8,
    /// Chord quality
    pub quality: ChordQuality,
    /// Scale degree of the root
    pub degree: u8,
    /// Harmonic tension (0.0-1.0)
    pub tension: f32,
    /// Secondary dominant / leading-tone function
    pub is_secondary: bool,
    /// Seconds from the playhead to the onset (negative once started)
    pub time_until: f64,
}

impl UpcomingChord {
    fn from_event(index: usize, chord: &ChordEvent, time: f64) -> Self {
        Self {
            index,
            time: chord.time,
            root: chord.root,
            quality: chord.quality,
            degree: chord.degree,
            tension: chord.tension,
            is_secondary: chord.is_secondary,
            time_until: chord.time - time,
        }
    }
}

/// Notes longer than this are indexed separately so they never widen the
/// per-frame back-scan
pub const LONG_NOTE_SECONDS: f64 = 4.0;

/// Split a song's notes for the lookahead scan
///
/// # Returns
///
/// Indices of notes longer than [`LONG_NOTE_SECONDS`] (in onset order) and
/// the longest duration among the remaining notes.
pub fn index_long_notes(notes: &[NoteEvent]) -> (Vec<usize>, f64) {
    let mut long_notes = Vec::new();
    let mut short_max = 0.0f64;
    for (i, note) in notes.iter().enumerate() {
        if note.duration > LONG_NOTE_SECONDS {
            long_notes.push(i);
        } else {
            short_max = short_max.max(note.duration);
        }
    }
    (long_notes, short_max)
}

/// Window and limits for the note lookahead
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteWindow {
    /// Seconds before the playhead included in the window
    pub lead: f64,
    /// Seconds after the playhead included in the window
    pub ahead: f64,
    /// Longest duration among notes not in the long-note index
    pub max_duration: f64,
    /// Maximum notes per pitch class
    pub pitch_class_cap: usize,
    /// Maximum notes overall
    pub capacity: usize,
}

/// Fill `out` with notes whose `[time, time + duration)` intersects
/// `[now - lead, now + ahead)`
///
/// The scan starts at the first note that could still be sounding at the
/// window start (`window_start - max_duration`). Long notes starting before
/// that point are looked up in `long_notes` instead, so one drone does not
/// turn every frame into a walk back to its onset. Output is sorted by onset.
pub fn upcoming_notes(
    notes: &[NoteEvent],
    long_notes: &[usize],
    now: f64,
    window: &NoteWindow,
    out: &mut Vec<UpcomingNote>,
) {
    out.clear();
    let window_start = now - window.lead;
    let window_end = now + window.ahead;
    let mut per_class = [0usize; 12];

    let first = lower_bound_time(notes, window_start - window.max_duration);
    let held = long_notes.iter().copied().take_while(|&i| i < first);
    for i in held.chain(first..notes.len()) {
        let note = &notes[i];
        if note.time >= window_end || out.len() >= window.capacity {
            break;
        }
        if note.is_drum || note.duration <= 0.0 || note.end() <= window_start {
            continue;
        }
        let count = &mut per_class[note.pitch_class as usize % 12];
        if *count >= window.pitch_class_cap {
            continue;
        }
        *count += 1;
        out.push(UpcomingNote {
            midi: note.midi,
            pitch_class: note.pitch_class,
            velocity: note.velocity,
            time: note.time,
            duration: note.duration,
            track: note.track,
            time_until: note.time - now,
        });
    }
}

/// Chord lookahead rebuilt on bar changes
///
/// `upcoming` holds chords starting from the current bar up to
/// `bars` bars ahead that have not started yet. `bar` holds every chord
/// heard in the current bar, including one carried over from earlier.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChordLookahead {
    built_for_bar: Option<i64>,
}

impl ChordLookahead {
    /// Lookahead that rebuilds on first use
    pub fn new() -> Self {
        Self::default()
    }

    /// Bar the buffers were last built for
    pub fn built_for_bar(&self) -> Option<i64> {
        self.built_for_bar
    }

    /// Refresh both buffers for the frame at `now`
    ///
    /// # Arguments
    ///
    /// * `chords` - Song chords sorted by time
    /// * `tempo_map` - Bar grid
    /// * `bar_index` - Current bar
    /// * `bars` - Bars covered by `upcoming`, starting at the current one
    /// * `now` - Playhead in seconds
    /// * `force` - Rebuild even if the bar is unchanged (after a seek)
    /// * `capacity` - Maximum entries per buffer
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        chords: &[ChordEvent],
        tempo_map: &TempoMap,
        bar_index: i64,
        bars: u32,
        now: f64,
        force: bool,
        capacity: usize,
        upcoming: &mut Vec<UpcomingChord>,
        bar: &mut Vec<UpcomingChord>,
    ) {
        if force || self.built_for_bar != Some(bar_index) {
            self.rebuild(chords, tempo_map, bar_index, bars, now, capacity, upcoming, bar);
        }

        for chord in upcoming.iter_mut().chain(bar.iter_mut()) {
            chord.time_until = chord.time - now;
        }
        upcoming.retain(|c| c.time_until > 0.0);
    }

    #[allow(clippy::too_many_arguments)]
    fn rebuild(
        &mut self,
        chords: &[ChordEvent],
        tempo_map: &TempoMap,
        bar_index: i64,
        bars: u32,
        now: f64,
        capacity: usize,
        upcoming: &mut Vec<UpcomingChord>,
        bar: &mut Vec<UpcomingChord>,
    ) {
        upcoming.clear();
        bar.clear();
        self.built_for_bar = Some(bar_index);

        let bar_start = tempo_map.time_at_bar(bar_index as f64);
        let bar_end = tempo_map.time_at_bar((bar_index + 1) as f64);
        let ahead_end = tempo_map.time_at_bar((bar_index + bars.max(1) as i64) as f64);

        if let Some(held) = binary_search_time(chords, bar_start) {
            if chords[held].time < bar_start && capacity > 0 {
                bar.push(UpcomingChord::from_event(held, &chords[held], now));
            }
        }

        let first = lower_bound_time(chords, bar_start);
        for (offset, chord) in chords[first..].iter().enumerate() {
            if chord.time >= ahead_end {
                break;
            }
            let entry = UpcomingChord::from_event(first + offset, chord, now);
            if chord.time < bar_end && bar.len() < capacity {
                bar.push(entry);
            }
            if upcoming.len() < capacity {
                upcoming.push(entry);
            }
        }

        log::trace!(
            "Chord lookahead for bar {}: {} upcoming, {} in bar",
            bar_index,
            upcoming.len(),
            bar.len()
        );
    }

    /// Force a rebuild on the next update
    pub fn reset(&mut self) {
        self.built_for_bar = None;
    }
}
