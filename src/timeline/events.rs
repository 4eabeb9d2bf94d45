//! Symbolic input events produced by an external decoder

use serde::{Deserialize, Serialize};

/// A single note (pitched or percussive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI note number (0-127)
    pub midi: u8,

    /// Pitch class (midi mod 12, 0 = C)
    pub pitch_class: u8,

    /// Velocity (0.0-1.0)
    pub velocity: f32,

    /// Onset time in seconds
    pub time: f64,

    /// Duration in seconds
    pub duration: f64,

    /// Source track / channel
    pub track: u32,

    /// Percussion hit rather than a pitched note
    pub is_drum: bool,
}

impl NoteEvent {
    /// Create a pitched note
    pub fn new(midi: u8, velocity: f32, time: f64, duration: f64, track: u32) -> Self {
        Self {
            midi,
            pitch_class: midi % 12,
            velocity: velocity.clamp(0.0, 1.0),
            time,
            duration: duration.max(0.0),
            track,
            is_drum: false,
        }
    }

    /// Create a percussion hit
    pub fn drum(midi: u8, velocity: f32, time: f64, track: u32) -> Self {
        Self {
            is_drum: true,
            ..Self::new(midi, velocity, time, 0.0, track)
        }
    }

    /// End time in seconds
    #[inline]
    pub fn end(&self) -> f64 {
        self.time + self.duration
    }

    /// True while the note is sounding at `time`
    #[inline]
    pub fn is_sounding(&self, time: f64) -> bool {
        self.time <= time && time < self.end()
    }
}

/// Tempo change (quarter-note BPM)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEvent {
    /// Time in seconds
    pub time: f64,
    /// Beats per minute
    pub bpm: f64,
}

/// Time signature change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSignatureEvent {
    /// Time in seconds
    pub time: f64,
    /// Beats per bar
    pub numerator: u32,
    /// Beat unit (4 = quarter, 8 = eighth)
    pub denominator: u32,
}

impl TimeSignatureEvent {
    /// Create a time signature change
    pub fn new(time: f64, numerator: u32, denominator: u32) -> Self {
        Self {
            time,
            numerator,
            denominator,
        }
    }
}
