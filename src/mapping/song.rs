//! Immutable per-song data read by the mapper

use std::sync::Arc;

use crate::analysis::result::{ChordEvent, Key, KeyRegion, TimelineAnalysis};
use crate::features::beat_tracking::TempoMap;
use crate::mapping::lookahead::index_long_notes;
use crate::timeline::events::NoteEvent;
use crate::timeline::Timeline;

/// Time-sorted event arrays for one song
///
/// Built once at load and shared behind an [`Arc`]; nothing here changes
/// during playback.
#[derive(Debug, Clone, Default)]
pub struct Song {
    chords: Vec<ChordEvent>,
    notes: Vec<NoteEvent>,
    drums: Vec<NoteEvent>,
    key: Key,
    key_regions: Vec<KeyRegion>,
    tempo_map: TempoMap,
    duration: f64,
    long_notes: Vec<usize>,
    short_note_duration: f64,
    peak_polyphony: usize,
}

impl Song {
    /// Song with no events (the mapper reports the idle snapshot)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bundle a validated timeline with its analysis
    pub fn new(timeline: &Timeline, analysis: &TimelineAnalysis) -> Self {
        let tempo_map = TempoMap::new(timeline.tempos(), timeline.time_signatures());
        let mut song = Self::from_parts(
            analysis.chords.clone(),
            timeline.notes().to_vec(),
            tempo_map,
            timeline.duration(),
        );
        song.key = analysis.key;
        song.key_regions = analysis.key_regions.clone();
        song
    }

    /// Assemble from raw parts; drum hits are split out of `notes`
    ///
    /// `chords` and `notes` must be sorted by time.
    pub fn from_parts(
        chords: Vec<ChordEvent>,
        notes: Vec<NoteEvent>,
        tempo_map: TempoMap,
        duration: f64,
    ) -> Self {
        let (drums, notes): (Vec<NoteEvent>, Vec<NoteEvent>) =
            notes.into_iter().partition(|n| n.is_drum);
        let (long_notes, short_note_duration) = index_long_notes(&notes);
        let peak_polyphony = sweep_polyphony(&notes);
        let last_event = notes
            .iter()
            .chain(drums.iter())
            .map(|n| n.end())
            .chain(chords.iter().map(|c| c.time))
            .fold(0.0, f64::max);

        Self {
            chords,
            notes,
            drums,
            key: Key::default(),
            key_regions: Vec::new(),
            tempo_map,
            duration: duration.max(last_event),
            long_notes,
            short_note_duration,
            peak_polyphony,
        }
    }

    /// Wrap for sharing with a mapper
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Replace the key timeline
    pub fn set_key(&mut self, key: Key, regions: Vec<KeyRegion>) {
        self.key = key;
        self.key_regions = regions;
    }

    /// Replace the tempo map
    pub fn set_tempo_map(&mut self, tempo_map: TempoMap) {
        self.tempo_map = tempo_map;
    }

    /// Override the song length
    pub fn set_duration(&mut self, duration: f64) {
        if duration.is_finite() {
            self.duration = duration.max(0.0);
        }
    }

    /// Chords sorted by time
    pub fn chords(&self) -> &[ChordEvent] {
        &self.chords
    }

    /// Pitched notes sorted by onset
    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    /// Drum hits sorted by time
    pub fn drums(&self) -> &[NoteEvent] {
        &self.drums
    }

    /// Whole-piece key
    pub fn key(&self) -> Key {
        self.key
    }

    /// Key regions sorted by time
    pub fn key_regions(&self) -> &[KeyRegion] {
        &self.key_regions
    }

    /// Tempo and meter map
    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    /// Song length in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Indices into [`Song::notes`] of notes too long for the back-scan
    pub fn long_notes(&self) -> &[usize] {
        &self.long_notes
    }

    /// Longest pitched note not in [`Song::long_notes`], bounds the
    /// lookahead back-scan
    pub fn short_note_duration(&self) -> f64 {
        self.short_note_duration
    }

    /// Most pitched notes sounding at once
    pub fn peak_polyphony(&self) -> usize {
        self.peak_polyphony
    }

    /// True when there is nothing to map
    pub fn is_empty(&self) -> bool {
        self.chords.is_empty() && self.notes.is_empty() && self.drums.is_empty()
    }
}

/// Sweep onsets against sorted end times; a note ending exactly at another
/// onset is no longer sounding there
fn sweep_polyphony(notes: &[NoteEvent]) -> usize {
    let sounding: Vec<&NoteEvent> = notes.iter().filter(|n| n.duration > 0.0).collect();
    let mut ends: Vec<f64> = sounding.iter().map(|n| n.end()).collect();
    ends.sort_by(f64::total_cmp);

    let mut ended = 0;
    let mut peak = 0;
    for (started, note) in sounding.iter().enumerate() {
        while ended < ends.len() && ends[ended] <= note.time {
            ended += 1;
        }
        peak = peak.max(started + 1 - ended);
    }
    peak
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_splits_drums() {
        let notes = vec![
            NoteEvent::new(60, 1.0, 0.0, 1.5, 0),
            NoteEvent::drum(36, 1.0, 0.5, 9),
            NoteEvent::new(64, 1.0, 1.0, 3.0, 0),
        ];
        let song = Song::from_parts(Vec::new(), notes, TempoMap::default(), 0.0);
        assert_eq!(song.notes().len(), 2);
        assert_eq!(song.drums().len(), 1);
        assert_eq!(song.short_note_duration(), 3.0);
        assert!(song.long_notes().is_empty());
        assert_eq!(song.duration(), 4.0);
        assert!(!song.is_empty());
    }

    #[test]
    fn test_long_notes_and_polyphony() {
        let notes = vec![
            NoteEvent::new(36, 1.0, 0.0, 16.0, 1),
            NoteEvent::new(60, 1.0, 0.0, 1.0, 0),
            NoteEvent::new(64, 1.0, 0.0, 1.0, 0),
            NoteEvent::new(67, 1.0, 0.5, 1.0, 0),
            NoteEvent::new(72, 1.0, 1.0, 0.5, 0),
            NoteEvent::new(74, 1.0, 2.0, 0.0, 0),
        ];
        let song = Song::from_parts(Vec::new(), notes, TempoMap::default(), 0.0);
        assert_eq!(song.long_notes(), &[0]);
        assert_eq!(song.short_note_duration(), 1.0);
        // drone + 60 + 64 + 67 at 0.5; 60 and 64 have ended by 1.0
        assert_eq!(song.peak_polyphony(), 4);
    }

    #[test]
    fn test_empty() {
        let song = Song::empty();
        assert!(song.is_empty());
        assert_eq!(song.tempo_map().initial_bpm(), 120.0);
    }
}
