//! Time-ordered lookup over sorted event arrays

use super::events::{NoteEvent, TempoEvent, TimeSignatureEvent};

/// An event with a position on the song timeline (seconds)
pub trait Timed {
    /// Event time in seconds
    fn time(&self) -> f64;
}

impl Timed for NoteEvent {
    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

impl Timed for TempoEvent {
    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

impl Timed for TimeSignatureEvent {
    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

impl Timed for f64 {
    #[inline]
    fn time(&self) -> f64 {
        *self
    }
}

/// Largest index `i` with `events[i].time() <= query`, or `None` if no event qualifies
///
/// `events` must be sorted by time.
pub fn binary_search_time<T: Timed>(events: &[T], query: f64) -> Option<usize> {
    events.partition_point(|e| e.time() <= query).checked_sub(1)
}

/// First index `i` with `events[i].time() >= query` (`events.len()` if none)
pub fn lower_bound_time<T: Timed>(events: &[T], query: f64) -> usize {
    events.partition_point(|e| e.time() < query)
}

/// True if `events` is non-decreasing in time
pub fn is_time_sorted<T: Timed>(events: &[T]) -> bool {
    events.windows(2).all(|w| w[0].time() <= w[1].time())
}
