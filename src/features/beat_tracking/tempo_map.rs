//! Piecewise-constant tempo and meter map
//!
//! Every tempo or time signature change opens a segment that stores the exact
//! cumulative beat and bar count at its start. Positions inside a segment are
//! computed from that checkpoint, never accumulated frame to frame, so there
//! is no drift across ritardandi, accelerandi or meter changes.
//!
//! # Example
//!
//! ```
//! use stratum_viz::features::beat_tracking::TempoMap;
//! use stratum_viz::timeline::{TempoEvent, TimeSignatureEvent};
//!
//! let tempos = [TempoEvent { time: 0.0, bpm: 120.0 }, TempoEvent { time: 2.0, bpm: 60.0 }];
//! let map = TempoMap::new(&tempos, &[TimeSignatureEvent::new(0.0, 4, 4)]);
//!
//! // 4 beats in the first 2s at 120 BPM, then 1 beat per second
//! assert!((map.position_at(3.0).beats - 5.0).abs() < 1e-9);
//! assert!((map.time_at_beat(6.0) - 4.0).abs() < 1e-9);
//! ```

use super::time_signature::TimeSignature;
use crate::timeline::events::{TempoEvent, TimeSignatureEvent};
use crate::timeline::search::{binary_search_time, Timed};

/// Tempo in force before the first tempo event (MIDI convention)
pub const DEFAULT_BPM: f64 = 120.0;

/// Phases within this distance of an integer bar count are on the bar line
const BAR_LINE_EPSILON: f64 = 1e-6;

/// Upper bound on enumerated bars, guards against absurd durations
const MAX_BARS: usize = 100_000;

/// One constant tempo / meter span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoSegment {
    /// Segment start in seconds
    pub start_time: f64,
    /// Cumulative beats at segment start
    pub start_beat: f64,
    /// Cumulative bars at segment start
    pub start_bar: f64,
    /// Quarter-note tempo
    pub bpm: f64,
    /// Meter in force
    pub meter: TimeSignature,
}

impl TempoSegment {
    /// Beats (denominator units) per second
    #[inline]
    pub fn beats_per_second(&self) -> f64 {
        self.bpm / 60.0 / self.meter.beat_unit_quarters()
    }

    /// Beat length in seconds
    #[inline]
    pub fn beat_duration(&self) -> f64 {
        1.0 / self.beats_per_second()
    }

    /// Bar length in seconds
    #[inline]
    pub fn bar_duration(&self) -> f64 {
        self.beat_duration() * self.meter.numerator as f64
    }
}

impl Timed for TempoSegment {
    #[inline]
    fn time(&self) -> f64 {
        self.start_time
    }
}

/// Continuous beat and bar position at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricPosition {
    /// Cumulative beats since time 0
    pub beats: f64,
    /// Cumulative bars since time 0
    pub bars: f64,
    /// Index of the active segment
    pub segment: usize,
}

/// Tempo / meter map with exact beat-count checkpoints
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    segments: Vec<TempoSegment>,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::constant(DEFAULT_BPM, TimeSignature::common())
    }
}

impl TempoMap {
    /// A single segment from time 0
    pub fn constant(bpm: f64, meter: TimeSignature) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 {
            bpm
        } else {
            DEFAULT_BPM
        };
        Self {
            segments: vec![TempoSegment {
                start_time: 0.0,
                start_beat: 0.0,
                start_bar: 0.0,
                bpm,
                meter,
            }],
        }
    }

    /// Build from sorted tempo and time signature events
    ///
    /// Events at or before time 0 set the initial state. Before the first
    /// event the map runs at 120 BPM in 4/4.
    pub fn new(tempos: &[TempoEvent], time_signatures: &[TimeSignatureEvent]) -> Self {
        let mut boundaries: Vec<f64> = std::iter::once(0.0)
            .chain(tempos.iter().map(|t| t.time.max(0.0)))
            .chain(time_signatures.iter().map(|s| s.time.max(0.0)))
            .filter(|t| t.is_finite())
            .collect();
        boundaries.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        boundaries.dedup();

        let bpm_at = |t: f64| -> f64 {
            binary_search_time(tempos, t)
                .map(|i| tempos[i].bpm)
                .filter(|bpm| bpm.is_finite() && *bpm > 0.0)
                .unwrap_or(DEFAULT_BPM)
        };
        let meter_at = |t: f64| -> TimeSignature {
            binary_search_time(time_signatures, t)
                .map(|i| {
                    TimeSignature::new(
                        time_signatures[i].numerator,
                        time_signatures[i].denominator,
                    )
                })
                .unwrap_or_default()
        };

        let mut segments: Vec<TempoSegment> = Vec::with_capacity(boundaries.len());
        for t in boundaries {
            let bpm = bpm_at(t);
            let meter = meter_at(t);

            let Some(prev) = segments.last() else {
                segments.push(TempoSegment {
                    start_time: 0.0,
                    start_beat: 0.0,
                    start_bar: 0.0,
                    bpm,
                    meter,
                });
                continue;
            };

            if prev.bpm == bpm && prev.meter == meter {
                continue;
            }

            let start_beat = prev.start_beat + (t - prev.start_time) * prev.beats_per_second();
            let mut start_bar =
                prev.start_bar + (start_beat - prev.start_beat) / prev.meter.numerator as f64;

            // A meter change always opens a new bar
            if prev.meter != meter {
                let nearest = start_bar.round();
                start_bar = if (start_bar - nearest).abs() < BAR_LINE_EPSILON {
                    nearest
                } else {
                    start_bar.ceil()
                };
            }

            segments.push(TempoSegment {
                start_time: t,
                start_beat,
                start_bar,
                bpm,
                meter,
            });
        }

        log::debug!(
            "Built tempo map: {} segments from {} tempo / {} meter events",
            segments.len(),
            tempos.len(),
            time_signatures.len()
        );

        Self { segments }
    }

    /// All segments, sorted by start time
    pub fn segments(&self) -> &[TempoSegment] {
        &self.segments
    }

    /// Tempo at song start
    pub fn initial_bpm(&self) -> f64 {
        self.segments[0].bpm
    }

    /// Index of the segment active at `time` (negative times map to the first)
    pub fn segment_index_at(&self, time: f64) -> usize {
        binary_search_time(&self.segments, time).unwrap_or(0)
    }

    /// Segment active at `time`
    pub fn segment_at(&self, time: f64) -> &TempoSegment {
        &self.segments[self.segment_index_at(time)]
    }

    /// Cumulative beat and bar position at `time` (clamped to time 0)
    pub fn position_at(&self, time: f64) -> MetricPosition {
        let time = time.max(0.0);
        let index = self.segment_index_at(time);
        let seg = &self.segments[index];
        let beats = seg.start_beat + (time - seg.start_time) * seg.beats_per_second();
        let bars = seg.start_bar + (beats - seg.start_beat) / seg.meter.numerator as f64;
        MetricPosition {
            beats,
            bars,
            segment: index,
        }
    }

    /// Time at which the cumulative beat count reaches `beats`
    pub fn time_at_beat(&self, beats: f64) -> f64 {
        let index = self
            .segments
            .partition_point(|s| s.start_beat <= beats)
            .saturating_sub(1);
        let seg = &self.segments[index];
        seg.start_time + (beats - seg.start_beat) / seg.beats_per_second()
    }

    /// Time at which the cumulative bar count reaches `bars`
    pub fn time_at_bar(&self, bars: f64) -> f64 {
        let index = self
            .segments
            .partition_point(|s| s.start_bar <= bars)
            .saturating_sub(1);
        let seg = &self.segments[index];
        let beats = seg.start_beat + (bars - seg.start_bar) * seg.meter.numerator as f64;
        seg.start_time + (beats - seg.start_beat) / seg.beats_per_second()
    }

    /// Start times of every bar beginning before `until`
    pub fn bar_starts(&self, until: f64) -> Vec<f64> {
        let mut starts = Vec::new();
        if until.is_nan() || until <= 0.0 {
            return starts;
        }
        for bar in 0..MAX_BARS {
            let t = self.time_at_bar(bar as f64);
            if t >= until {
                break;
            }
            starts.push(t);
        }
        starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tempo(time: f64, bpm: f64) -> TempoEvent {
        TempoEvent { time, bpm }
    }

    #[test]
    fn test_default_map() {
        let map = TempoMap::new(&[], &[]);
        assert_eq!(map.segments().len(), 1);
        assert_eq!(map.initial_bpm(), 120.0);
        assert!((map.position_at(1.5).beats - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_continuity_across_tempo_change() {
        let map = TempoMap::new(&[tempo(0.0, 120.0), tempo(1.3, 90.0)], &[]);
        let before = map.position_at(1.3 - 1e-9).beats;
        let after = map.position_at(1.3).beats;
        assert!((after - before).abs() < 1e-6);
        assert!((after - 2.6).abs() < 1e-9);
        assert_eq!(map.segment_at(1.31).bpm, 90.0);
    }

    #[test]
    fn test_inverse_mapping() {
        let map = TempoMap::new(&[tempo(0.0, 100.0), tempo(3.0, 140.0), tempo(7.5, 70.0)], &[]);
        for i in 0..40 {
            let t = i as f64 * 0.37;
            let beats = map.position_at(t).beats;
            assert!((map.time_at_beat(beats) - t).abs() < 1e-9, "t={}", t);
        }
    }

    #[test]
    fn test_meter_change_on_bar_line() {
        // Two bars of 4/4 at 120 = 4s, then 3/4
        let sigs = [
            TimeSignatureEvent::new(0.0, 4, 4),
            TimeSignatureEvent::new(4.0, 3, 4),
        ];
        let map = TempoMap::new(&[tempo(0.0, 120.0)], &sigs);
        assert_eq!(map.segments().len(), 2);
        assert_eq!(map.segments()[1].start_bar, 2.0);
        // 3/4 bar is 1.5s long
        assert!((map.time_at_bar(3.0) - 5.5).abs() < 1e-9);
        let bars = map.bar_starts(7.0);
        assert_eq!(bars.len(), 4);
        assert!((bars[3] - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_meter_change_mid_bar_opens_new_bar() {
        let sigs = [
            TimeSignatureEvent::new(0.0, 4, 4),
            TimeSignatureEvent::new(1.0, 3, 4),
        ];
        let map = TempoMap::new(&[tempo(0.0, 120.0)], &sigs);
        assert_eq!(map.segments()[1].start_bar, 1.0);
        assert!((map.position_at(1.0).bars - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compound_meter_counts_eighths() {
        let map = TempoMap::new(&[tempo(0.0, 120.0)], &[TimeSignatureEvent::new(0.0, 6, 8)]);
        let seg = map.segment_at(0.0);
        assert!((seg.beat_duration() - 0.25).abs() < 1e-12);
        assert!((seg.bar_duration() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_events_before_zero_set_initial_state() {
        let map = TempoMap::new(&[tempo(-1.0, 90.0)], &[]);
        assert_eq!(map.segments().len(), 1);
        assert_eq!(map.initial_bpm(), 90.0);
    }

    #[test]
    fn test_negative_time_clamped() {
        let map = TempoMap::default();
        assert_eq!(map.position_at(-3.0).beats, 0.0);
    }

    #[test]
    fn test_bar_starts_empty_for_zero_duration() {
        assert!(TempoMap::default().bar_starts(0.0).is_empty());
    }
}
