//! Per-frame output record

use serde::Serialize;

use super::lookahead::{UpcomingChord, UpcomingNote};
use super::voices::ActiveVoice;
use crate::analysis::result::Mode;
use crate::features::beat_tracking::BeatState;
use crate::features::chord::ChordQuality;

/// Hue of a fully relaxed harmony (blue)
pub const CALM_HUE: f32 = 0.6;

/// Melody or bass note at the current frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineNote {
    /// MIDI note number
    pub midi: u8,
    /// Pitch class
    pub pitch_class: u8,
    /// Velocity (0.0-1.0)
    pub velocity: f32,
    /// True on the frame the note started
    pub onset: bool,
}

impl From<&ActiveVoice> for LineNote {
    fn from(voice: &ActiveVoice) -> Self {
        Self {
            midi: voice.midi,
            pitch_class: voice.pitch_class,
            velocity: voice.velocity,
            onset: voice.onset,
        }
    }
}

/// Everything a renderer needs for one frame
///
/// The vectors are reused between frames and stay valid until the next
/// `update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    // Timing
    /// Playhead in seconds
    pub current_time: f64,
    /// Frame delta after capping
    pub dt: f64,
    /// Quarter-note tempo
    pub bpm: f64,
    /// Beat length in seconds
    pub beat_duration: f64,
    /// Beats per bar
    pub beats_per_bar: u32,
    /// Bar length in seconds
    pub bar_duration: f64,
    /// Cumulative beats since song start
    pub beat_position: f64,
    /// Cumulative bars since song start
    pub bar_position: f64,
    /// Phase within the beat (0.0-1.0)
    pub beat_phase: f32,
    /// Phase within the bar (0.0-1.0)
    pub bar_phase: f32,
    /// Beat within the bar (0-based)
    pub beat_index: u32,
    /// Bar count since song start
    pub bar_index: i64,
    /// Metrical strength of the current beat
    pub beat_strength: f32,
    /// A beat started this frame
    pub on_beat: bool,
    /// A bar started this frame
    pub on_bar: bool,
    /// Beat grid confidence (0.0-1.0)
    pub beat_stability: f32,
    /// Seconds until the next beat
    pub next_beat_in: f64,
    /// Seconds until the next bar
    pub next_bar_in: f64,

    // Groove curves
    /// Pre-beat buildup
    pub beat_anticipation: f32,
    /// Post-beat impact
    pub beat_arrival: f32,
    /// Smooth beat pulse
    pub beat_groove: f32,
    /// Pre-bar buildup
    pub bar_anticipation: f32,
    /// Post-bar impact
    pub bar_arrival: f32,
    /// Smooth bar pulse
    pub bar_groove: f32,

    // Harmony
    /// Index of the active chord
    pub chord_index: Option<usize>,
    /// Root pitch class of the active chord
    pub chord_root: u8,
    /// Scale degree of the active chord (1-7)
    pub chord_degree: u8,
    /// Quality of the active chord
    pub chord_quality: ChordQuality,
    /// Raw tension of the active chord
    pub tension: f32,
    /// Smoothed harmonic tension
    pub harmonic_tension_smooth: f32,
    /// Harmonic release intensity (decaying)
    pub harmonic_tension_release: f32,
    /// A harmonic release fired this frame
    pub harmonic_on_release: bool,
    /// Raw rhythmic tension
    pub rhythmic_tension: f32,
    /// Smoothed rhythmic tension
    pub rhythmic_tension_smooth: f32,
    /// Rhythmic release intensity (decaying)
    pub rhythmic_tension_release: f32,
    /// A rhythmic release fired this frame
    pub rhythmic_on_release: bool,
    /// Decaying melodic-leap tension
    pub melodic_tension: f32,
    /// Tonic of the local key
    pub key: u8,
    /// Mode of the local key
    pub key_mode: Mode,
    /// Smoothed key angle on the circle of fifths, radians
    pub key_rotation: f32,

    // Motion
    /// Anchor position
    pub anchor_x: f32,
    /// Anchor position
    pub anchor_y: f32,
    /// Base orbit radius
    pub orbit_radius: f32,
    /// Orbit skew
    pub orbit_skew: f32,
    /// Orbit rotation, radians
    pub orbit_rotation: f32,
    /// Beat slot spacing, radians
    pub beat_spread: f32,
    /// Spring radius offset
    pub spring_offset: f32,
    /// Orbit offset from the anchor
    pub orbit_x: f32,
    /// Orbit offset from the anchor
    pub orbit_y: f32,
    /// Anchor plus orbit offset
    pub position_x: f32,
    /// Anchor plus orbit offset
    pub position_y: f32,
    /// Drum-driven rotation angle, radians
    pub rotation: f32,
    /// Drum-driven rotation velocity
    pub rotation_velocity: f32,

    // Melody, bass, energy
    /// Highest sounding note
    pub melody: Option<LineNote>,
    /// Lowest sounding note
    pub bass: Option<LineNote>,
    /// Decaying drum energy (0.0-1.0)
    pub drum_energy: f32,
    /// Host loudness sample (0.0-1.0)
    pub loudness: f32,
    /// Hue from smoothed tension (0.6 calm, 0.0 tense)
    pub tension_hue: f32,
    /// Brightness, lifted by release intensity
    pub tension_brightness: f32,

    // Collections
    /// Sounding notes
    pub active_voices: Vec<ActiveVoice>,
    /// Notes in the lookahead window
    pub upcoming_notes: Vec<UpcomingNote>,
    /// Chords ahead in the chord lookahead bars
    pub upcoming_chords: Vec<UpcomingChord>,
    /// Chords heard in the current bar
    pub bar_chords: Vec<UpcomingChord>,
}

impl FrameSnapshot {
    /// Snapshot reported when nothing is loaded
    pub fn idle() -> Self {
        let beat = BeatState::idle();
        let mut snapshot = Self {
            current_time: 0.0,
            dt: 0.0,
            bpm: 0.0,
            beat_duration: 0.0,
            beats_per_bar: 0,
            bar_duration: 0.0,
            beat_position: 0.0,
            bar_position: 0.0,
            beat_phase: 0.0,
            bar_phase: 0.0,
            beat_index: 0,
            bar_index: 0,
            beat_strength: 0.0,
            on_beat: false,
            on_bar: false,
            beat_stability: 0.0,
            next_beat_in: 0.0,
            next_bar_in: 0.0,
            beat_anticipation: 0.0,
            beat_arrival: 0.0,
            beat_groove: 0.0,
            bar_anticipation: 0.0,
            bar_arrival: 0.0,
            bar_groove: 0.0,
            chord_index: None,
            chord_root: 0,
            chord_degree: 1,
            chord_quality: ChordQuality::Major,
            tension: 0.0,
            harmonic_tension_smooth: 0.0,
            harmonic_tension_release: 0.0,
            harmonic_on_release: false,
            rhythmic_tension: 0.0,
            rhythmic_tension_smooth: 0.0,
            rhythmic_tension_release: 0.0,
            rhythmic_on_release: false,
            melodic_tension: 0.0,
            key: 0,
            key_mode: Mode::Major,
            key_rotation: 0.0,
            anchor_x: 0.0,
            anchor_y: 0.0,
            orbit_radius: 0.0,
            orbit_skew: 0.0,
            orbit_rotation: 0.0,
            beat_spread: 0.0,
            spring_offset: 0.0,
            orbit_x: 0.0,
            orbit_y: 0.0,
            position_x: 0.0,
            position_y: 0.0,
            rotation: 0.0,
            rotation_velocity: 0.0,
            melody: None,
            bass: None,
            drum_energy: 0.0,
            loudness: 0.0,
            tension_hue: CALM_HUE,
            tension_brightness: 0.0,
            active_voices: Vec::new(),
            upcoming_notes: Vec::new(),
            upcoming_chords: Vec::new(),
            bar_chords: Vec::new(),
        };
        snapshot.set_beat(&beat);
        snapshot
    }

    /// Idle snapshot with pre-sized collections
    pub fn with_capacity(voices: usize, notes: usize, chords: usize) -> Self {
        Self {
            active_voices: Vec::with_capacity(voices),
            upcoming_notes: Vec::with_capacity(notes),
            upcoming_chords: Vec::with_capacity(chords),
            bar_chords: Vec::with_capacity(chords),
            ..Self::idle()
        }
    }

    /// Return every field to idle, keeping collection capacity
    pub fn reset_to_idle(&mut self) {
        let mut voices = std::mem::take(&mut self.active_voices);
        let mut notes = std::mem::take(&mut self.upcoming_notes);
        let mut chords = std::mem::take(&mut self.upcoming_chords);
        let mut bar = std::mem::take(&mut self.bar_chords);
        voices.clear();
        notes.clear();
        chords.clear();
        bar.clear();
        *self = Self {
            active_voices: voices,
            upcoming_notes: notes,
            upcoming_chords: chords,
            bar_chords: bar,
            ..Self::idle()
        };
    }

    /// Copy the timing and groove fields from a beat state
    pub fn set_beat(&mut self, beat: &BeatState) {
        self.bpm = beat.bpm;
        self.beat_duration = beat.beat_duration;
        self.beats_per_bar = beat.beats_per_bar;
        self.bar_duration = beat.bar_duration;
        self.beat_position = beat.beat_position;
        self.bar_position = beat.bar_position;
        self.beat_phase = beat.beat_phase;
        self.bar_phase = beat.bar_phase;
        self.beat_index = beat.beat_index;
        self.bar_index = beat.bar_index;
        self.beat_strength = beat.beat_strength();
        self.on_beat = beat.on_beat;
        self.on_bar = beat.on_bar;
        self.beat_stability = beat.stability;
        self.next_beat_in = beat.next_beat_in;
        self.next_bar_in = beat.next_bar_in;
        self.beat_anticipation = beat.beat_anticipation;
        self.beat_arrival = beat.beat_arrival;
        self.beat_groove = beat.beat_groove;
        self.bar_anticipation = beat.bar_anticipation;
        self.bar_arrival = beat.bar_arrival;
        self.bar_groove = beat.bar_groove;
    }

    /// JSON form for external renderers
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for FrameSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// Hue from tension: 0.6 (blue) when relaxed down to 0.0 (red)
pub fn tension_hue(tension: f32) -> f32 {
    CALM_HUE * (1.0 - tension.clamp(0.0, 1.0))
}
