//! Chord quality definitions and the template bank
//!
//! One binary template per root × quality (12 × 11 = 132), unit-normalized so
//! cosine similarity against a bar profile does not favour larger chords.

use serde::{Deserialize, Serialize};

/// Chord quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordQuality {
    /// Major triad
    Major,
    /// Minor triad
    Minor,
    /// Diminished triad
    Dim,
    /// Augmented triad
    Aug,
    /// Suspended fourth
    Sus4,
    /// Suspended second
    Sus2,
    /// Major seventh
    Maj7,
    /// Dominant seventh
    Dom7,
    /// Minor seventh
    Min7,
    /// Half-diminished seventh
    Hdim7,
    /// Fully diminished seventh
    Dim7,
}

impl ChordQuality {
    /// All qualities, in tie-break preference order (simplest first)
    pub const ALL: [ChordQuality; 11] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Dom7,
        ChordQuality::Min7,
        ChordQuality::Maj7,
        ChordQuality::Sus4,
        ChordQuality::Sus2,
        ChordQuality::Dim,
        ChordQuality::Hdim7,
        ChordQuality::Aug,
        ChordQuality::Dim7,
    ];

    /// Semitone intervals above the root
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Dim => &[0, 3, 6],
            ChordQuality::Aug => &[0, 4, 8],
            ChordQuality::Sus4 => &[0, 5, 7],
            ChordQuality::Sus2 => &[0, 2, 7],
            ChordQuality::Maj7 => &[0, 4, 7, 11],
            ChordQuality::Dom7 => &[0, 4, 7, 10],
            ChordQuality::Min7 => &[0, 3, 7, 10],
            ChordQuality::Hdim7 => &[0, 3, 6, 10],
            ChordQuality::Dim7 => &[0, 3, 6, 9],
        }
    }

    /// Intrinsic dissonance (0.0-1.0) used by the tension model
    pub fn dissonance(&self) -> f32 {
        match self {
            ChordQuality::Major => 0.0,
            ChordQuality::Minor => 0.05,
            ChordQuality::Sus2 => 0.10,
            ChordQuality::Sus4 => 0.15,
            ChordQuality::Min7 => 0.15,
            ChordQuality::Maj7 => 0.20,
            ChordQuality::Dom7 => 0.25,
            ChordQuality::Aug => 0.30,
            ChordQuality::Hdim7 => 0.30,
            ChordQuality::Dim => 0.35,
            ChordQuality::Dim7 => 0.45,
        }
    }

    /// Numeral suffix (e.g. "°", "7", "ø7")
    pub fn suffix(&self) -> &'static str {
        match self {
            ChordQuality::Major | ChordQuality::Minor => "",
            ChordQuality::Dim => "°",
            ChordQuality::Aug => "+",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Maj7 => "maj7",
            ChordQuality::Dom7 | ChordQuality::Min7 => "7",
            ChordQuality::Hdim7 => "ø7",
            ChordQuality::Dim7 => "°7",
        }
    }

    /// Minor-third qualities are written with lowercase numerals
    pub fn is_lowercase(&self) -> bool {
        matches!(
            self,
            ChordQuality::Minor
                | ChordQuality::Dim
                | ChordQuality::Min7
                | ChordQuality::Hdim7
                | ChordQuality::Dim7
        )
    }

    /// Position in the tie-break order (lower wins)
    pub fn preference_rank(&self) -> usize {
        Self::ALL.iter().position(|q| q == self).unwrap_or(Self::ALL.len())
    }
}

/// A single root × quality template
#[derive(Debug, Clone)]
pub struct ChordTemplate {
    /// Root pitch class
    pub root: u8,
    /// Chord quality
    pub quality: ChordQuality,
    /// Unit-length pitch-class weights
    pub weights: [f32; 12],
}

/// Template bank for chord detection
#[derive(Debug, Clone)]
pub struct ChordTemplates {
    templates: Vec<ChordTemplate>,
}

impl ChordTemplates {
    /// Build templates for every root and quality
    pub fn new() -> Self {
        let mut templates = Vec::with_capacity(12 * ChordQuality::ALL.len());
        for root in 0..12u8 {
            for quality in ChordQuality::ALL {
                let intervals = quality.intervals();
                let norm = (intervals.len() as f32).sqrt();
                let mut weights = [0.0f32; 12];
                for &i in intervals {
                    weights[((root + i) % 12) as usize] = 1.0 / norm;
                }
                templates.push(ChordTemplate {
                    root,
                    quality,
                    weights,
                });
            }
        }
        Self { templates }
    }

    /// All templates
    pub fn iter(&self) -> impl Iterator<Item = &ChordTemplate> {
        self.templates.iter()
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True if the bank is empty
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for ChordTemplates {
    fn default() -> Self {
        Self::new()
    }
}
