//! Symbolic timeline input
//!
//! In-memory notes, tempo changes and time signature changes as delivered by
//! an external decoder. Arrays are validated once and never mutated after
//! load, which is what lets every consumer binary-search them.

pub mod events;
pub mod search;

pub use events::{NoteEvent, TempoEvent, TimeSignatureEvent};
pub use search::{binary_search_time, lower_bound_time, Timed};

use crate::error::AnalysisError;
use search::is_time_sorted;

/// A decoded song: all note, tempo and meter events plus total duration
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    notes: Vec<NoteEvent>,
    tempos: Vec<TempoEvent>,
    time_signatures: Vec<TimeSignatureEvent>,
    duration: f64,
}

impl Timeline {
    /// Build a timeline from decoded events
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if any array is not sorted by time,
    /// contains non-finite times, a non-positive tempo, or a degenerate meter.
    pub fn new(
        notes: Vec<NoteEvent>,
        tempos: Vec<TempoEvent>,
        time_signatures: Vec<TimeSignatureEvent>,
        duration: f64,
    ) -> Result<Self, AnalysisError> {
        if !is_time_sorted(&notes) {
            return Err(AnalysisError::InvalidInput(
                "Note events must be sorted by time".to_string(),
            ));
        }
        if !is_time_sorted(&tempos) {
            return Err(AnalysisError::InvalidInput(
                "Tempo events must be sorted by time".to_string(),
            ));
        }
        if !is_time_sorted(&time_signatures) {
            return Err(AnalysisError::InvalidInput(
                "Time signature events must be sorted by time".to_string(),
            ));
        }

        if let Some(note) = notes
            .iter()
            .find(|n| !n.time.is_finite() || !n.duration.is_finite())
        {
            return Err(AnalysisError::InvalidInput(format!(
                "Note {} has non-finite timing ({}, {})",
                note.midi, note.time, note.duration
            )));
        }

        if let Some(tempo) = tempos
            .iter()
            .find(|t| !t.time.is_finite() || !(t.bpm.is_finite() && t.bpm > 0.0))
        {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid tempo event: {:.2} BPM at {:.3}s",
                tempo.bpm, tempo.time
            )));
        }

        if let Some(sig) = time_signatures
            .iter()
            .find(|s| !s.time.is_finite() || s.numerator == 0 || s.denominator == 0)
        {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid time signature {}/{} at {:.3}s",
                sig.numerator, sig.denominator, sig.time
            )));
        }

        // Duration given by the decoder may be missing; never shorter than the last note.
        let last_end = notes.iter().map(NoteEvent::end).fold(0.0f64, f64::max);
        let duration = if duration.is_finite() {
            duration.max(last_end)
        } else {
            last_end
        };

        log::debug!(
            "Loaded timeline: {} notes, {} tempo events, {} time signatures, {:.2}s",
            notes.len(),
            tempos.len(),
            time_signatures.len(),
            duration
        );

        Ok(Self {
            notes,
            tempos,
            time_signatures,
            duration,
        })
    }

    /// All notes (pitched and percussive), sorted by onset
    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    /// Tempo changes, sorted by time
    pub fn tempos(&self) -> &[TempoEvent] {
        &self.tempos
    }

    /// Time signature changes, sorted by time
    pub fn time_signatures(&self) -> &[TimeSignatureEvent] {
        &self.time_signatures
    }

    /// Song duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// True if the timeline has no notes at all
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Pitched notes only, preserving order
    pub fn pitched_notes(&self) -> Vec<NoteEvent> {
        self.notes.iter().filter(|n| !n.is_drum).copied().collect()
    }

    /// Percussion hits only, preserving order
    pub fn drum_hits(&self) -> Vec<NoteEvent> {
        self.notes.iter().filter(|n| n.is_drum).copied().collect()
    }
}
