//! Reference key profiles
//!
//! Defines tonal profiles for 24 keys (12 major + 12 minor), rotated from a
//! C-tonic reference profile of the selected family.

use serde::{Deserialize, Serialize};

/// Key profile family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFamily {
    /// Krumhansl & Kessler (1982) key-profile ratings
    KrumhanslKessler,
    /// Temperley (2001), derived from the Kostka-Payne corpus
    Temperley,
    /// Aarden (2003), derived from the Essen folksong collection
    AardenEssen,
}

impl ProfileFamily {
    /// C major and C minor reference profiles
    fn reference(&self) -> ([f32; 12], [f32; 12]) {
        match self {
            ProfileFamily::KrumhanslKessler => (
                [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88],
                [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17],
            ),
            ProfileFamily::Temperley => (
                [0.748, 0.060, 0.488, 0.082, 0.670, 0.460, 0.096, 0.715, 0.104, 0.366, 0.057, 0.400],
                [0.712, 0.084, 0.474, 0.618, 0.049, 0.460, 0.105, 0.747, 0.404, 0.067, 0.133, 0.330],
            ),
            ProfileFamily::AardenEssen => (
                [
                    17.7661, 0.145624, 14.9265, 0.160186, 19.8049, 11.3587, 0.291248, 22.062,
                    0.145624, 8.15494, 0.232998, 4.95122,
                ],
                [
                    18.2648, 0.737619, 14.0499, 16.8599, 0.702494, 14.4362, 0.702494, 18.6161,
                    4.56621, 1.93186, 7.37619, 1.75623,
                ],
            ),
        }
    }
}

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Profile family the templates were built from
    pub family: ProfileFamily,

    /// Major key templates (index = tonic pitch class)
    pub major: [[f32; 12]; 12],

    /// Minor key templates (index = tonic pitch class)
    pub minor: [[f32; 12]; 12],
}

impl KeyTemplates {
    /// Create templates for a profile family
    pub fn new(family: ProfileFamily) -> Self {
        let (major_ref, minor_ref) = family.reference();
        let mut major = [[0.0f32; 12]; 12];
        let mut minor = [[0.0f32; 12]; 12];

        for tonic in 0..12 {
            for pc in 0..12 {
                // Weight of pitch class `pc` in the key on `tonic`
                let rel = (pc + 12 - tonic) % 12;
                major[tonic][pc] = major_ref[rel];
                minor[tonic][pc] = minor_ref[rel];
            }
        }

        Self {
            family,
            major,
            minor,
        }
    }

    /// Major template for a tonic (0-11)
    pub fn get_major_template(&self, tonic: u8) -> &[f32; 12] {
        &self.major[tonic as usize % 12]
    }

    /// Minor template for a tonic (0-11)
    pub fn get_minor_template(&self, tonic: u8) -> &[f32; 12] {
        &self.minor[tonic as usize % 12]
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new(ProfileFamily::KrumhanslKessler)
    }
}
