//! # Stratum Viz
//!
//! Symbolic music analysis and per-frame visual parameter mapping. A decoded
//! timeline (notes, tempo and time signature changes) is analyzed once at
//! load, then sampled every rendered frame into a compact snapshot of
//! harmonic context, beat phase, melodic activity, tension and lookahead.
//!
//! ## Features
//!
//! - **Key Detection**: Krumhansl-Kessler / Temperley / Aarden-Essen profile correlation
//! - **Modulation Tracking**: Sliding bar windows with hysteresis
//! - **Chord Detection**: One chord per bar with harmonic function and tension
//! - **Beat Tracking**: Exact phase across tempo and meter changes, groove curves
//! - **Parameter Mapping**: Snap, spring, rotation and release physics per frame
//!
//! ## Quick Start
//!
//! ```
//! use stratum_viz::{analyze_timeline, AnalysisConfig, MapperConfig, ParameterMapper, Song};
//! use stratum_viz::timeline::{NoteEvent, TempoEvent, TimeSignatureEvent, Timeline};
//!
//! let notes = vec![
//!     NoteEvent::new(60, 0.8, 0.0, 1.0, 0),
//!     NoteEvent::new(64, 0.8, 0.0, 1.0, 0),
//!     NoteEvent::new(67, 0.8, 0.0, 1.0, 0),
//! ];
//! let timeline = Timeline::new(
//!     notes,
//!     vec![TempoEvent { time: 0.0, bpm: 120.0 }],
//!     vec![TimeSignatureEvent::new(0.0, 4, 4)],
//!     2.0,
//! )?;
//!
//! let analysis = analyze_timeline(&timeline, &AnalysisConfig::default())?;
//! let song = Song::new(&timeline, &analysis).into_shared();
//!
//! let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);
//! let frame = mapper.update(1.0 / 60.0, 0.5, 0.8);
//! assert_eq!(frame.chord_root, 0);
//! # Ok::<(), stratum_viz::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Timeline → Analysis (key, modulation, chords) → Song ─┐
//!          → Tempo map ──────────────────────→ Beat tracker → Mapper → FrameSnapshot
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod mapping;
pub mod timeline;

// Re-export main types
pub use analysis::result::{ChordEvent, Key, KeyRegion, Mode, TimelineAnalysis};
pub use config::{AnalysisConfig, MapperConfig};
pub use error::AnalysisError;
pub use features::beat_tracking::{BeatState, BeatTracker, BeatTracking, IdleBeatTracker, TempoMap};
pub use mapping::{FrameSnapshot, ParameterMapper, Song};
pub use timeline::Timeline;

use features::chord::{detect_chords, ChordTemplates};
use features::key::{
    detect_key, detect_modulations, pitch_class_histogram, window_bars_for_tempo, KeyTemplates,
};

/// Main analysis function
///
/// Detects the whole-piece key, key regions and the per-bar chord timeline
/// of a symbolic timeline.
///
/// # Arguments
///
/// * `timeline` - Validated timeline
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `TimelineAnalysis` with key, key regions, chords and the bar grid. A
/// timeline without pitched notes yields an analysis with no regions or
/// chords.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidConfig` if the configuration is unusable
///
/// # Example
///
/// ```
/// use stratum_viz::{analyze_timeline, AnalysisConfig, Timeline};
///
/// let empty = Timeline::default();
/// let analysis = analyze_timeline(&empty, &AnalysisConfig::default())?;
/// assert!(analysis.chords.is_empty());
/// # Ok::<(), stratum_viz::AnalysisError>(())
/// ```
pub fn analyze_timeline(
    timeline: &Timeline,
    config: &AnalysisConfig,
) -> Result<TimelineAnalysis, AnalysisError> {
    use std::time::Instant;
    let start_time = Instant::now();

    config.validate()?;

    let notes = timeline.pitched_notes();
    log::debug!(
        "Starting timeline analysis: {} pitched notes, {} tempo / {} meter events, {:.2}s",
        notes.len(),
        timeline.tempos().len(),
        timeline.time_signatures().len(),
        timeline.duration()
    );

    let grid = TempoMap::new(timeline.tempos(), timeline.time_signatures());
    let bar_starts = grid.bar_starts(timeline.duration());

    if notes.is_empty() {
        log::debug!("No pitched notes, returning empty analysis");
        return Ok(TimelineAnalysis {
            key_ambiguity: 1.0,
            bar_starts,
            ..TimelineAnalysis::default()
        });
    }

    // Whole-piece key
    let templates = KeyTemplates::new(config.profile_family);
    let (key, key_ambiguity) = match detect_key(&pitch_class_histogram(&notes), &templates) {
        Ok(result) => {
            log::debug!(
                "Global key: {} (correlation {:.3}, ambiguity {:.3})",
                result.key.name(),
                result.correlation,
                result.ambiguity
            );
            (result.key, result.ambiguity)
        }
        Err(e) => {
            log::warn!("Global key detection failed: {}", e);
            (Key::default(), 1.0)
        }
    };

    // Modulations
    let window_bars = window_bars_for_tempo(
        config.modulation_window_bars,
        grid.initial_bpm(),
        config.tempo_scaled_window,
    );
    let key_regions = detect_modulations(
        &notes,
        &bar_starts,
        timeline.duration(),
        &templates,
        window_bars,
        config.modulation_hysteresis,
    );
    log::debug!("Detected {} key regions", key_regions.len());

    let mut analysis = TimelineAnalysis {
        key,
        key_ambiguity,
        key_regions,
        chords: Vec::new(),
        bar_starts,
    };

    // Chords, each read against its local key
    let chords = detect_chords(
        &notes,
        &analysis.bar_starts,
        timeline.duration(),
        |t| analysis.key_at(t),
        &ChordTemplates::new(),
        config,
    );
    analysis.chords = chords;

    let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;
    log::debug!(
        "Timeline analysis complete: key {}, {} regions, {} chords in {:.2} ms",
        analysis.key.name(),
        analysis.key_regions.len(),
        analysis.chords.len(),
        processing_time_ms
    );

    Ok(analysis)
}
