//! Debounced tension release detection
//!
//! A release fires when the smoothed tension falls clearly below its own
//! slow rolling average. The detector then disarms and only re-arms once the
//! smoothed value has come back close to the average, so a signal wobbling
//! around the threshold produces one release instead of a burst.
//!
//! State machine per frame:
//!
//! ```text
//! armed ──(avg - smoothed > margin, avg > floor, gate)──► fire, disarmed
//! disarmed ──(|avg - smoothed| < rearm_deviation)──► armed
//! ```

use serde::{Deserialize, Serialize};

/// Tuning for one release detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseParams {
    /// Drop below the rolling average that triggers a release
    pub margin: f32,

    /// Rolling average must exceed this before anything can be released
    pub floor: f32,

    /// Deviation under which a disarmed detector re-arms
    pub rearm_deviation: f32,

    /// Smoothing rate toward the raw value, per second (tempo-scaled)
    pub smoothing_rate: f32,

    /// Rolling average rate, per second
    pub average_rate: f32,

    /// Decay rate of the release intensity, per second
    pub release_decay: f32,
}

impl ReleaseParams {
    /// Defaults for harmonic tension
    pub const fn harmonic() -> Self {
        Self {
            margin: 0.06,
            floor: 0.15,
            rearm_deviation: 0.02,
            smoothing_rate: 2.0,
            average_rate: 0.5,
            release_decay: 4.0,
        }
    }

    /// Defaults for rhythmic tension
    pub const fn rhythmic() -> Self {
        Self {
            margin: 0.08,
            floor: 0.20,
            rearm_deviation: 0.03,
            smoothing_rate: 3.0,
            average_rate: 0.8,
            release_decay: 4.0,
        }
    }
}

impl Default for ReleaseParams {
    fn default() -> Self {
        Self::harmonic()
    }
}

/// Smoothed tension with an arm / fire / re-arm cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseDetector {
    params: ReleaseParams,
    smoothed: f32,
    rolling_average: f32,
    armed: bool,
    release: f32,
    fired: bool,
}

impl ReleaseDetector {
    /// Create an armed detector at zero tension
    pub fn new(params: ReleaseParams) -> Self {
        Self {
            params,
            smoothed: 0.0,
            rolling_average: 0.0,
            armed: true,
            release: 0.0,
            fired: false,
        }
    }

    /// Advance one frame
    ///
    /// # Arguments
    ///
    /// * `raw` - Instantaneous tension (clamped to [0, 1])
    /// * `dt` - Frame delta in seconds
    /// * `rate_scale` - Multiplier on the smoothing rate (tempo scaling)
    /// * `gate` - Releases may only fire on frames where this is true
    ///
    /// # Returns
    ///
    /// `true` on the frame a release fires
    pub fn update(&mut self, raw: f32, dt: f32, rate_scale: f32, gate: bool) -> bool {
        let raw = raw.clamp(0.0, 1.0);
        let p = &self.params;

        self.smoothed += (raw - self.smoothed) * (1.0 - (-p.smoothing_rate * rate_scale * dt).exp());
        self.rolling_average +=
            (self.smoothed - self.rolling_average) * (1.0 - (-p.average_rate * dt).exp());
        self.release *= (-p.release_decay * dt).exp();

        let deviation = self.rolling_average - self.smoothed;
        if !self.armed && deviation.abs() < p.rearm_deviation {
            self.armed = true;
        }

        self.fired = false;
        if self.armed && gate && deviation > p.margin && self.rolling_average > p.floor {
            self.release = self.release.max(self.rolling_average).min(1.0);
            self.armed = false;
            self.fired = true;
            log::trace!(
                "Tension release: average {:.3}, smoothed {:.3}",
                self.rolling_average,
                self.smoothed
            );
        }

        self.fired
    }

    /// Smoothed tension (0.0-1.0)
    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    /// Slow rolling average of the smoothed tension
    pub fn rolling_average(&self) -> f32 {
        self.rolling_average
    }

    /// Release intensity, decaying after each release
    pub fn release(&self) -> f32 {
        self.release
    }

    /// True if a release fired on the last update
    pub fn fired(&self) -> bool {
        self.fired
    }

    /// True if the detector can fire
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Return to the freshly constructed state
    pub fn reset(&mut self) {
        *self = Self::new(self.params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn run(detector: &mut ReleaseDetector, raw: f32, seconds: f32) -> usize {
        let frames = (seconds / DT) as usize;
        (0..frames)
            .filter(|_| detector.update(raw, DT, 1.0, true))
            .count()
    }

    #[test]
    fn test_release_fires_once_on_drop() {
        let mut d = ReleaseDetector::new(ReleaseParams::harmonic());
        assert_eq!(run(&mut d, 0.8, 10.0), 0);
        assert!(d.rolling_average() > 0.7);
        assert_eq!(run(&mut d, 0.0, 1.0), 1);
        assert!(!d.is_armed());
        assert!(d.release() > 0.0);
    }

    #[test]
    fn test_no_release_below_floor() {
        let mut d = ReleaseDetector::new(ReleaseParams::harmonic());
        run(&mut d, 0.12, 10.0);
        assert_eq!(run(&mut d, 0.0, 2.0), 0);
    }

    #[test]
    fn test_gate_blocks_release() {
        let mut d = ReleaseDetector::new(ReleaseParams::rhythmic());
        run(&mut d, 0.9, 10.0);
        let fired = (0..60).any(|_| d.update(0.0, DT, 1.0, false));
        assert!(!fired);
        assert!(d.is_armed());
        assert!(d.update(0.0, DT, 1.0, true));
    }

    #[test]
    fn test_oscillation_does_not_chatter() {
        let mut d = ReleaseDetector::new(ReleaseParams::harmonic());
        run(&mut d, 0.8, 10.0);
        let mut releases = 0;
        for i in 0..120 {
            let raw = if (i / 10) % 2 == 0 { 0.0 } else { 0.8 };
            if d.update(raw, DT, 1.0, true) {
                releases += 1;
            }
        }
        assert_eq!(releases, 1);
    }

    #[test]
    fn test_release_intensity_decays() {
        let mut d = ReleaseDetector::new(ReleaseParams::harmonic());
        run(&mut d, 0.8, 10.0);
        run(&mut d, 0.0, 1.0);
        let before = d.release();
        d.update(0.0, 0.1, 1.0, true);
        assert!((d.release() - before * (-0.4f32).exp()).abs() < 1e-5);
    }

    #[test]
    fn test_reset() {
        let mut d = ReleaseDetector::new(ReleaseParams::harmonic());
        run(&mut d, 0.8, 3.0);
        d.reset();
        assert_eq!(d, ReleaseDetector::new(ReleaseParams::harmonic()));
    }
}
