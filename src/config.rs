//! Configuration parameters for timeline analysis and parameter mapping

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::features::key::templates::ProfileFamily;
use crate::mapping::release::ReleaseParams;

/// Analysis configuration parameters (applied once, at song load)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Key detection
    /// Reference key profile family (default: Krumhansl-Kessler)
    pub profile_family: ProfileFamily,

    /// Modulation window length in bars at moderate tempo (default: 4)
    pub modulation_window_bars: usize,

    /// Scale the modulation window with tempo (default: true)
    ///
    /// Fast songs get a doubled window, very slow songs a halved one, so the
    /// window covers a comparable stretch of musical material.
    pub tempo_scaled_window: bool,

    /// Consecutive windows a new key must win before it is accepted (default: 2)
    pub modulation_hysteresis: usize,

    // Chord detection
    /// Score bonus for chord roots diatonic to the current key (default: 0.15)
    pub diatonic_root_bonus: f32,

    /// Score bonus when the root is also the lowest sounding pitch class (default: 0.05)
    pub bass_root_bonus: f32,

    /// Minimum summed note weight for a bar to produce a chord (default: 1e-3)
    pub min_bar_weight: f32,

    /// Collapse consecutive bars with the same root and quality (default: true)
    pub merge_repeated_chords: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            profile_family: ProfileFamily::KrumhanslKessler,
            modulation_window_bars: 4,
            tempo_scaled_window: true,
            modulation_hysteresis: 2,
            diatonic_root_bonus: 0.15,
            bass_root_bonus: 0.05,
            min_bar_weight: 1e-3,
            merge_repeated_chords: true,
        }
    }
}

impl AnalysisConfig {
    /// Check that every knob is usable
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.modulation_window_bars == 0 {
            return Err(AnalysisError::InvalidConfig(
                "modulation_window_bars must be at least 1".to_string(),
            ));
        }
        if self.modulation_hysteresis == 0 {
            return Err(AnalysisError::InvalidConfig(
                "modulation_hysteresis must be at least 1".to_string(),
            ));
        }
        if !self.diatonic_root_bonus.is_finite() || !self.bass_root_bonus.is_finite() {
            return Err(AnalysisError::InvalidConfig(
                "chord score bonuses must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-frame mapper configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Exponential snap rate toward chord targets, per second (default: 8.0)
    /// 8/s gives ~90% convergence in ~0.3s
    pub snap_rate: f32,

    /// Frame delta cap in seconds before any physics integration (default: 0.1)
    pub max_dt: f64,

    /// Backward note window scanned for active voices, in seconds (default: 2.0)
    pub note_window: f64,

    /// Forward note lookahead in seconds (default: 2.0)
    pub note_lookahead: f64,

    /// Lead-in before the current time included in note lookahead (default: 0.1)
    pub lookahead_lead: f64,

    /// Maximum upcoming notes per pitch class (default: 4)
    pub pitch_class_cap: usize,

    /// Capacity of the upcoming-note buffer (default: 128)
    pub max_upcoming_notes: usize,

    /// Capacity of the upcoming-chord and bar-chord buffers (default: 32)
    pub max_upcoming_chords: usize,

    /// Capacity of the active-voice buffer (default: 32)
    pub max_voices: usize,

    /// Number of bars, starting at the current one, in the chord lookahead (default: 2)
    pub chord_lookahead_bars: u32,

    /// Radial spring stiffness (default: 8.0)
    pub spring_stiffness: f32,

    /// Radial spring damping (default: 2.5)
    pub spring_damping: f32,

    /// Drum hits older than this at scan time are skipped, in seconds (default: 0.15)
    pub drum_lookback: f64,

    /// Perturb anchor positions by chord root (default: true)
    pub root_perturbation: bool,

    /// Radius of the per-root perturbation (default: 0.04)
    pub perturbation_radius: f32,

    /// Optional JSON anchor table, re-read by `reload_anchors`
    pub anchor_path: Option<PathBuf>,

    /// Harmonic tension release detector parameters
    pub harmonic_release: ReleaseParams,

    /// Rhythmic tension release detector parameters
    pub rhythmic_release: ReleaseParams,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            snap_rate: 8.0,
            max_dt: 0.1,
            note_window: 2.0,
            note_lookahead: 2.0,
            lookahead_lead: 0.1,
            pitch_class_cap: 4,
            max_upcoming_notes: 128,
            max_upcoming_chords: 32,
            max_voices: 32,
            chord_lookahead_bars: 2,
            spring_stiffness: 8.0,
            spring_damping: 2.5,
            drum_lookback: 0.15,
            root_perturbation: true,
            perturbation_radius: 0.04,
            anchor_path: None,
            harmonic_release: ReleaseParams::harmonic(),
            rhythmic_release: ReleaseParams::rhythmic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_analysis_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = AnalysisConfig {
            modulation_window_bars: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_mapper_config_json() {
        let config: MapperConfig = serde_json::from_str(r#"{ "snap_rate": 4.0 }"#).unwrap();
        assert_eq!(config.snap_rate, 4.0);
        assert_eq!(config.pitch_class_cap, 4);
        assert_eq!(config.harmonic_release, ReleaseParams::harmonic());
    }
}
