//! Active voices, melody / bass lines and melodic tension

use serde::{Deserialize, Serialize};

use crate::timeline::events::NoteEvent;
use crate::timeline::search::binary_search_time;

/// Decay rate of the melodic tension accumulator, per second
pub const MELODIC_TENSION_DECAY: f32 = 2.0;

/// A note sounding at the current frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveVoice {
    /// MIDI note number
    pub midi: u8,
    /// Pitch class
    pub pitch_class: u8,
    /// Velocity (0.0-1.0)
    pub velocity: f32,
    /// Source track
    pub track: u32,
    /// True on the first frame the `(track, midi)` pair sounds
    pub onset: bool,
}

/// Tension contribution of a melodic interval in semitones
///
/// Steps add nothing; leaps wider than a fifth add the most.
pub fn leap_tension(interval: u8) -> f32 {
    match interval {
        0..=2 => 0.0,
        3..=4 => 0.10,
        5..=7 => 0.20,
        _ => 0.35,
    }
}

/// Frame-to-frame voice bookkeeping
#[derive(Debug, Clone, Default)]
pub struct VoiceTracker {
    previous_keys: Vec<(u32, u8)>,
    current_keys: Vec<(u32, u8)>,
    melody: Option<ActiveVoice>,
    bass: Option<ActiveVoice>,
    last_melody_midi: Option<u8>,
    melodic_tension: f32,
    onset_count: usize,
    onset_velocity: f32,
}

impl VoiceTracker {
    /// Tracker with key buffers sized for `capacity` voices
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            previous_keys: Vec::with_capacity(capacity),
            current_keys: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Grow both key buffers to hold `voices` keys, so `update` never
    /// allocates while at most that many notes sound together
    pub fn reserve(&mut self, voices: usize) {
        for keys in [&mut self.previous_keys, &mut self.current_keys] {
            keys.reserve(voices.saturating_sub(keys.len()));
        }
    }

    /// Rebuild the voice list for `time`
    ///
    /// One backward pass over notes with onsets in `[time - window, time]`.
    /// Only the first `capacity` voices (most recent onsets first) are kept
    /// in `out`; melody and bass consider every sounding note.
    ///
    /// # Arguments
    ///
    /// * `notes` - Pitched notes sorted by onset
    /// * `time` - Playhead in seconds
    /// * `window` - Backward window in seconds
    /// * `dt` - Frame delta, for the melodic tension decay
    /// * `capacity` - Maximum voices written to `out`
    /// * `out` - Reused output buffer
    pub fn update(
        &mut self,
        notes: &[NoteEvent],
        time: f64,
        window: f64,
        dt: f32,
        capacity: usize,
        out: &mut Vec<ActiveVoice>,
    ) {
        std::mem::swap(&mut self.previous_keys, &mut self.current_keys);
        self.current_keys.clear();
        out.clear();

        self.melodic_tension *= (-MELODIC_TENSION_DECAY * dt).exp();
        self.onset_count = 0;
        self.onset_velocity = 0.0;

        let mut melody: Option<ActiveVoice> = None;
        let mut bass: Option<ActiveVoice> = None;
        let window_start = time - window;

        let upper = binary_search_time(notes, time).map_or(0, |i| i + 1);

        for note in notes[..upper].iter().rev() {
            if note.time < window_start {
                break;
            }
            if note.is_drum || !note.is_sounding(time) {
                continue;
            }
            let key = (note.track, note.midi);
            if self.current_keys.contains(&key) {
                continue;
            }
            self.current_keys.push(key);

            let voice = ActiveVoice {
                midi: note.midi,
                pitch_class: note.pitch_class,
                velocity: note.velocity,
                track: note.track,
                onset: !self.previous_keys.contains(&key),
            };
            if voice.onset {
                self.onset_count += 1;
                self.onset_velocity += voice.velocity;
            }

            if melody.map_or(true, |m| voice.midi > m.midi) {
                melody = Some(voice);
            }
            if bass.map_or(true, |b| voice.midi < b.midi) {
                bass = Some(voice);
            }
            if out.len() < capacity {
                out.push(voice);
            }
        }

        if let Some(m) = melody {
            if m.onset {
                if let Some(prev) = self.last_melody_midi {
                    let interval = m.midi.abs_diff(prev);
                    self.melodic_tension =
                        (self.melodic_tension + leap_tension(interval) * m.velocity).min(1.0);
                }
                self.last_melody_midi = Some(m.midi);
            }
        }

        self.melody = melody;
        self.bass = bass;
    }

    /// Highest sounding note
    pub fn melody(&self) -> Option<&ActiveVoice> {
        self.melody.as_ref()
    }

    /// Lowest sounding note
    pub fn bass(&self) -> Option<&ActiveVoice> {
        self.bass.as_ref()
    }

    /// Decaying melodic-leap tension (0.0-1.0)
    pub fn melodic_tension(&self) -> f32 {
        self.melodic_tension
    }

    /// Voices that started this frame
    pub fn onset_count(&self) -> usize {
        self.onset_count
    }

    /// Summed velocity of this frame's onsets
    pub fn onset_velocity(&self) -> f32 {
        self.onset_velocity
    }

    /// Forget all voices, keeping buffer capacity
    pub fn reset(&mut self) {
        self.previous_keys.clear();
        self.current_keys.clear();
        self.melody = None;
        self.bass = None;
        self.last_melody_midi = None;
        self.melodic_tension = 0.0;
        self.onset_count = 0;
        self.onset_velocity = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(midi: u8, time: f64, duration: f64) -> NoteEvent {
        NoteEvent::new(midi, 1.0, time, duration, 0)
    }

    #[test]
    fn test_melody_and_bass() {
        let notes = vec![note(48, 0.0, 2.0), note(64, 0.0, 2.0), note(72, 0.5, 0.2)];
        let mut tracker = VoiceTracker::with_capacity(8);
        let mut out = Vec::new();
        tracker.update(&notes, 1.0, 2.0, 0.016, 8, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(tracker.melody().map(|v| v.midi), Some(64));
        assert_eq!(tracker.bass().map(|v| v.midi), Some(48));
    }

    #[test]
    fn test_reserved_keys_hold_dense_chord() {
        let notes: Vec<NoteEvent> = (0..24).map(|i| note(48 + i, 0.0, 1.0)).collect();
        let mut tracker = VoiceTracker::with_capacity(4);
        tracker.reserve(24);
        let capacities = |t: &VoiceTracker| {
            let mut caps = [t.previous_keys.capacity(), t.current_keys.capacity()];
            caps.sort_unstable();
            caps
        };
        let before = capacities(&tracker);
        assert!(before[0] >= 24);

        let mut out = Vec::with_capacity(4);
        for frame in 0..3 {
            tracker.update(&notes, frame as f64 * 0.016, 2.0, 0.016, 4, &mut out);
        }
        assert_eq!(out.len(), 4);
        assert_eq!(tracker.current_keys.len(), 24);
        assert_eq!(capacities(&tracker), before);
    }

    #[test]
    fn test_onset_only_on_first_frame() {
        let notes = vec![note(60, 0.0, 1.0)];
        let mut tracker = VoiceTracker::with_capacity(8);
        let mut out = Vec::new();
        tracker.update(&notes, 0.0, 2.0, 0.016, 8, &mut out);
        assert!(out[0].onset);
        tracker.update(&notes, 0.016, 2.0, 0.016, 8, &mut out);
        assert!(!out[0].onset);
        assert_eq!(tracker.onset_count(), 0);
    }

    #[test]
    fn test_repeated_note_is_new_onset() {
        let notes = vec![note(60, 0.0, 0.5), note(60, 0.6, 0.5)];
        let mut tracker = VoiceTracker::with_capacity(8);
        let mut out = Vec::new();
        tracker.update(&notes, 0.4, 2.0, 0.016, 8, &mut out);
        tracker.update(&notes, 0.55, 2.0, 0.016, 8, &mut out);
        assert!(out.is_empty());
        tracker.update(&notes, 0.6, 2.0, 0.016, 8, &mut out);
        assert!(out[0].onset);
    }

    #[test]
    fn test_leap_tension_accumulates_and_decays() {
        let notes = vec![note(60, 0.0, 0.5), note(72, 0.5, 0.5)];
        let mut tracker = VoiceTracker::with_capacity(8);
        let mut out = Vec::new();
        tracker.update(&notes, 0.0, 2.0, 0.0, 8, &mut out);
        assert_eq!(tracker.melodic_tension(), 0.0);
        tracker.update(&notes, 0.5, 2.0, 0.0, 8, &mut out);
        assert!((tracker.melodic_tension() - 0.35).abs() < 1e-6);
        tracker.update(&notes, 0.6, 2.0, 0.1, 8, &mut out);
        assert!((tracker.melodic_tension() - 0.35 * (-0.2f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_leap_table() {
        assert_eq!(leap_tension(2), 0.0);
        assert_eq!(leap_tension(4), 0.10);
        assert_eq!(leap_tension(7), 0.20);
        assert_eq!(leap_tension(8), 0.35);
    }

    #[test]
    fn test_capacity_limits_output() {
        let notes: Vec<NoteEvent> = (0..10).map(|i| note(60 + i, 0.0, 1.0)).collect();
        let mut tracker = VoiceTracker::with_capacity(4);
        let mut out = Vec::with_capacity(4);
        tracker.update(&notes, 0.5, 2.0, 0.016, 4, &mut out);
        assert_eq!(out.len(), 4);
        assert_eq!(tracker.melody().map(|v| v.midi), Some(69));
    }
}
