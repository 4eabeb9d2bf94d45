//! Per-frame beat phase tracking
//!
//! A tracker answers "where in the beat and bar are we at time T" and derives
//! closed-form groove curves from the phase. The only memory carried between
//! frames is the previous beat/bar count (for `on_beat` / `on_bar` edges) and
//! the two decaying arrival envelopes.
//!
//! # Example
//!
//! ```
//! use stratum_viz::features::beat_tracking::{BeatTracker, BeatTracking, TempoMap};
//!
//! let mut tracker = BeatTracker::new(TempoMap::default());
//! let state = tracker.update(0.016, 1.5);
//! assert_eq!(state.beat_index, 3);
//! assert!(state.on_beat);
//! ```

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use super::tempo_map::{TempoMap, DEFAULT_BPM};
use super::time_signature::TimeSignature;

/// Decay rate of the beat arrival envelope, per second
pub const BEAT_ARRIVAL_DECAY: f32 = 6.0;

/// Decay rate of the bar arrival envelope, per second
pub const BAR_ARRIVAL_DECAY: f32 = 3.0;

/// Added before flooring beat counts so exact grid times land on the new beat
const EDGE_EPSILON: f64 = 1e-9;

/// First-frame phases below this count as "on the grid"
const ON_GRID_EPSILON: f32 = 1e-6;

/// Stability reported for an exact symbolic tempo map
pub const SYMBOLIC_STABILITY: f32 = 1.0;

/// Beat and bar phase at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatState {
    /// Phase within the current beat (0.0-1.0)
    pub beat_phase: f32,
    /// Phase within the current bar (0.0-1.0)
    pub bar_phase: f32,
    /// Cumulative beats since song start
    pub beat_position: f64,
    /// Cumulative bars since song start
    pub bar_position: f64,
    /// Quarter-note tempo
    pub bpm: f64,
    /// Beat length in seconds
    pub beat_duration: f64,
    /// Bar length in seconds
    pub bar_duration: f64,
    /// Meter in force
    pub meter: TimeSignature,
    /// Beats per bar
    pub beats_per_bar: u32,
    /// Beat within the bar (0-based)
    pub beat_index: u32,
    /// Bar count since song start
    pub bar_index: i64,
    /// True on the frame a new beat starts
    pub on_beat: bool,
    /// True on the frame a new bar starts
    pub on_bar: bool,
    /// Confidence in the beat grid (0.0-1.0)
    pub stability: f32,
    /// Seconds until the next beat
    pub next_beat_in: f64,
    /// Seconds until the next bar
    pub next_bar_in: f64,
    /// `(1 - beat_phase)²`
    pub beat_anticipation: f32,
    /// 1 on a beat, then `exp(-6·dt)` decay
    pub beat_arrival: f32,
    /// `(cos(2π·beat_phase) + 1) / 2`, peaks on the beat
    pub beat_groove: f32,
    /// `(1 - bar_phase)²`
    pub bar_anticipation: f32,
    /// 1 on a bar line, then `exp(-3·dt)` decay
    pub bar_arrival: f32,
    /// `(cos(2π·bar_phase) + 1) / 2`
    pub bar_groove: f32,
}

impl BeatState {
    /// Fixed state reported when no song is loaded
    pub fn idle() -> Self {
        let meter = TimeSignature::common();
        let beat_duration = 60.0 / DEFAULT_BPM;
        Self {
            beat_phase: 0.0,
            bar_phase: 0.0,
            beat_position: 0.0,
            bar_position: 0.0,
            bpm: DEFAULT_BPM,
            beat_duration,
            bar_duration: beat_duration * meter.numerator as f64,
            meter,
            beats_per_bar: meter.numerator,
            beat_index: 0,
            bar_index: 0,
            on_beat: false,
            on_bar: false,
            stability: 0.0,
            next_beat_in: beat_duration,
            next_bar_in: beat_duration * meter.numerator as f64,
            beat_anticipation: 0.0,
            beat_arrival: 0.0,
            beat_groove: 0.0,
            bar_anticipation: 0.0,
            bar_arrival: 0.0,
            bar_groove: 0.0,
        }
    }

    /// Metrical strength of the current beat
    pub fn beat_strength(&self) -> f32 {
        self.meter.metrical_strength(self.beat_index)
    }
}

impl Default for BeatState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Anything that can report beat phase once per frame
///
/// The symbolic tracker is exact; the trait leaves room for estimators that
/// report lower `stability`.
pub trait BeatTracking {
    /// Advance to `time` (seconds) after a frame of `dt` seconds
    fn update(&mut self, dt: f64, time: f64) -> BeatState;

    /// Most recent state
    fn current(&self) -> &BeatState;

    /// Forget edge-detection and envelope memory
    fn reset(&mut self);
}

/// Edge-detection memory from the previous frame
#[derive(Debug, Clone, Copy, PartialEq)]
struct PreviousFrame {
    time: f64,
    beat: i64,
    bar: i64,
}

/// Beat tracker driven by an exact tempo map
#[derive(Debug, Clone)]
pub struct BeatTracker {
    tempo_map: TempoMap,
    stability: f32,
    previous: Option<PreviousFrame>,
    state: BeatState,
}

impl BeatTracker {
    /// Create a tracker over a tempo map
    pub fn new(tempo_map: TempoMap) -> Self {
        Self::with_stability(tempo_map, SYMBOLIC_STABILITY)
    }

    /// Create a tracker reporting a fixed stability
    pub fn with_stability(tempo_map: TempoMap, stability: f32) -> Self {
        Self {
            tempo_map,
            stability: stability.clamp(0.0, 1.0),
            previous: None,
            state: BeatState::idle(),
        }
    }

    /// Underlying tempo map
    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }
}

impl BeatTracking for BeatTracker {
    fn update(&mut self, dt: f64, time: f64) -> BeatState {
        let dt = dt.max(0.0);
        let time = time.max(0.0);

        // A zero-length repeat of the last frame changes nothing
        if let Some(prev) = self.previous {
            if dt == 0.0 && prev.time == time {
                return self.state;
            }
        }

        let pos = self.tempo_map.position_at(time);
        let seg = self.tempo_map.segments()[pos.segment];
        let beats_per_bar = seg.meter.numerator.max(1);

        let beat = (pos.beats + EDGE_EPSILON).floor() as i64;
        let bar = (pos.bars + EDGE_EPSILON).floor() as i64;
        let beat_phase = ((pos.beats - beat as f64).max(0.0) as f32).min(1.0);
        let bar_phase = ((pos.bars - bar as f64).max(0.0) as f32).min(1.0);
        let beat_index = (((pos.bars - bar as f64).max(0.0) * beats_per_bar as f64 + EDGE_EPSILON)
            .floor() as u32)
            .min(beats_per_bar - 1);

        let (on_beat, on_bar) = match self.previous {
            // Only forward crossings are edges; a backward jump is a seek
            Some(prev) => (beat > prev.beat, bar > prev.bar),
            None => (beat_phase < ON_GRID_EPSILON, bar_phase < ON_GRID_EPSILON),
        };

        let dt = dt as f32;
        let beat_arrival = if on_beat {
            1.0
        } else {
            self.state.beat_arrival * (-BEAT_ARRIVAL_DECAY * dt).exp()
        };
        let bar_arrival = if on_bar {
            1.0
        } else {
            self.state.bar_arrival * (-BAR_ARRIVAL_DECAY * dt).exp()
        };

        let next_beat_in = (self.tempo_map.time_at_beat((beat + 1) as f64) - time).max(0.0);
        let next_bar_in = (self.tempo_map.time_at_bar((bar + 1) as f64) - time).max(0.0);

        self.state = BeatState {
            beat_phase,
            bar_phase,
            beat_position: pos.beats,
            bar_position: pos.bars,
            bpm: seg.bpm,
            beat_duration: seg.beat_duration(),
            bar_duration: seg.bar_duration(),
            meter: seg.meter,
            beats_per_bar,
            beat_index,
            bar_index: bar,
            on_beat,
            on_bar,
            stability: self.stability,
            next_beat_in,
            next_bar_in,
            beat_anticipation: (1.0 - beat_phase).powi(2),
            beat_arrival,
            beat_groove: ((beat_phase * TAU).cos() + 1.0) / 2.0,
            bar_anticipation: (1.0 - bar_phase).powi(2),
            bar_arrival,
            bar_groove: ((bar_phase * TAU).cos() + 1.0) / 2.0,
        };
        self.previous = Some(PreviousFrame { time, beat, bar });
        self.state
    }

    fn current(&self) -> &BeatState {
        &self.state
    }

    fn reset(&mut self) {
        self.previous = None;
        self.state = BeatState::idle();
    }
}

/// Tracker used when no song is loaded: always the idle state
#[derive(Debug, Clone, Default)]
pub struct IdleBeatTracker {
    state: BeatState,
}

impl IdleBeatTracker {
    /// Create an idle tracker
    pub fn new() -> Self {
        Self::default()
    }
}

impl BeatTracking for IdleBeatTracker {
    fn update(&mut self, _dt: f64, _time: f64) -> BeatState {
        self.state
    }

    fn current(&self) -> &BeatState {
        &self.state
    }

    fn reset(&mut self) {}
}
