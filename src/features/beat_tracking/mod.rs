//! Beat tracking modules
//!
//! Beat and bar phase from a symbolic tempo map:
//! - Tempo / meter segments with exact beat-count checkpoints
//! - Time signatures and metrical strength
//! - Per-frame tracker with groove curves and beat / bar edges

pub mod tempo_map;
pub mod time_signature;
pub mod tracker;

pub use tempo_map::{MetricPosition, TempoMap, TempoSegment, DEFAULT_BPM};
pub use time_signature::TimeSignature;
pub use tracker::{BeatState, BeatTracker, BeatTracking, IdleBeatTracker};
