//! Monotonic cursors into time-sorted event arrays
//!
//! Forward playback advances linearly (amortized O(1) per frame). The first
//! frame and any backward jump resynchronize with a binary search.

use std::ops::Range;

use crate::timeline::search::{binary_search_time, lower_bound_time, Timed};

/// Index of the latest event at or before the playhead
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventCursor {
    index: Option<usize>,
    last_time: Option<f64>,
}

impl EventCursor {
    /// Cursor that resyncs on first use
    pub fn new() -> Self {
        Self::default()
    }

    /// Current index, `None` before the first event
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Move to `time`
    ///
    /// # Returns
    ///
    /// `true` if the index changed (including the first frame landing on an
    /// event)
    pub fn advance<T: Timed>(&mut self, events: &[T], time: f64) -> bool {
        let before = self.index;
        let resync = self.last_time.map_or(true, |last| time < last);

        if resync {
            self.index = binary_search_time(events, time);
            if self.last_time.is_some() {
                log::trace!("Cursor resync at {:.3}s -> {:?}", time, self.index);
            }
        } else {
            let mut next = self.index.map_or(0, |i| i + 1);
            while next < events.len() && events[next].time() <= time {
                self.index = Some(next);
                next += 1;
            }
        }

        self.last_time = Some(time);
        self.index != before
    }

    /// Forget position; next advance resyncs
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Consumes each event once as the playhead passes it
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScanCursor {
    next: usize,
    last_time: Option<f64>,
}

impl ScanCursor {
    /// Cursor that resyncs on first use
    pub fn new() -> Self {
        Self::default()
    }

    /// Events not yet consumed with `time - lookback <= t <= time`
    ///
    /// The first frame only returns events inside the lookback window. A
    /// backward step returns nothing: every event at or before the new time
    /// counts as consumed, so clock jitter never replays a hit.
    pub fn take<T: Timed>(&mut self, events: &[T], time: f64, lookback: f64) -> Range<usize> {
        let window_start = time - lookback.max(0.0);

        let mut start = match self.last_time {
            None => lower_bound_time(events, window_start),
            Some(last) if time < last => {
                let after = binary_search_time(events, time).map_or(0, |i| i + 1);
                log::trace!("Scan resync at {:.3}s -> {}", time, after);
                self.next = after;
                self.last_time = Some(time);
                return after..after;
            }
            Some(_) => self.next.min(events.len()),
        };
        while start < events.len() && events[start].time() < window_start {
            start += 1;
        }

        let mut end = start;
        while end < events.len() && events[end].time() <= time {
            end += 1;
        }

        self.next = end;
        self.last_time = Some(time);
        start..end
    }

    /// Forget position; next take resyncs
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
