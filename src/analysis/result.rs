//! Analysis result types

use serde::{Deserialize, Serialize};

use crate::features::chord::templates::ChordQuality;
use crate::timeline::search::{binary_search_time, Timed};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Major keys in camelot order (1A = C, 2A = G, ...)
const CIRCLE_OF_FIFTHS_MAJOR: [u8; 12] = [0, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10, 5];

/// Minor keys in camelot order (1B = Am, 2B = Em, ...)
const CIRCLE_OF_FIFTHS_MINOR: [u8; 12] = [9, 4, 11, 6, 1, 8, 3, 10, 5, 0, 7, 2];

const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_SCALE: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Key mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Major (ionian)
    Major,
    /// Minor (aeolian, raised 7th accepted as diatonic)
    Minor,
}

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u8),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u8),
}

impl Default for Key {
    fn default() -> Self {
        Key::Major(0)
    }
}

/// Position of a pitch class relative to a key
///
/// `degree` is 1-7. Chromatic pitch classes are spelled against the nearest
/// scale degree, with `accidental` -1 (flat) or +1 (sharp).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleDegree {
    /// Scale degree (1-7)
    pub degree: u8,
    /// -1 flat, 0 diatonic, +1 sharp
    pub accidental: i8,
}

impl Key {
    /// Build a key from tonic pitch class and mode
    pub fn new(tonic: u8, mode: Mode) -> Self {
        match mode {
            Mode::Major => Key::Major(tonic % 12),
            Mode::Minor => Key::Minor(tonic % 12),
        }
    }

    /// Tonic pitch class (0-11)
    pub fn tonic(&self) -> u8 {
        match self {
            Key::Major(t) | Key::Minor(t) => *t % 12,
        }
    }

    /// Key mode
    pub fn mode(&self) -> Mode {
        match self {
            Key::Major(_) => Mode::Major,
            Key::Minor(_) => Mode::Minor,
        }
    }

    /// Get key name in musical notation (e.g., "C", "Am", "F#", "D#m")
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_viz::analysis::Key;
    ///
    /// assert_eq!(Key::Major(6).name(), "F#");
    /// assert_eq!(Key::Minor(9).name(), "Am");
    /// ```
    pub fn name(&self) -> String {
        match self {
            Key::Major(t) => NOTE_NAMES[*t as usize % 12].to_string(),
            Key::Minor(t) => format!("{}m", NOTE_NAMES[*t as usize % 12]),
        }
    }

    /// Camelot-style wheel notation (1A = C, 2A = G, 1B = Am)
    ///
    /// ```
    /// use stratum_viz::analysis::Key;
    ///
    /// assert_eq!(Key::Major(7).numerical(), "2A");
    /// assert_eq!(Key::Minor(4).numerical(), "2B");
    /// ```
    pub fn numerical(&self) -> String {
        let tonic = self.tonic();
        let (wheel, suffix) = match self {
            Key::Major(_) => (&CIRCLE_OF_FIFTHS_MAJOR, 'A'),
            Key::Minor(_) => (&CIRCLE_OF_FIFTHS_MINOR, 'B'),
        };
        let position = wheel.iter().position(|&pc| pc == tonic).unwrap_or(0);
        format!("{}{}", position + 1, suffix)
    }

    /// Parse wheel notation back into a key; `None` if malformed
    pub fn from_numerical(notation: &str) -> Option<Self> {
        if notation.len() < 2 || !notation.is_ascii() {
            return None;
        }
        let (num_str, suffix) = notation.split_at(notation.len() - 1);
        let num: usize = num_str.parse().ok()?;
        if !(1..=12).contains(&num) {
            return None;
        }
        match suffix {
            "A" => Some(Key::Major(CIRCLE_OF_FIFTHS_MAJOR[num - 1])),
            "B" => Some(Key::Minor(CIRCLE_OF_FIFTHS_MINOR[num - 1])),
            _ => None,
        }
    }

    /// The seven scale pitch classes, tonic first
    pub fn scale_pitch_classes(&self) -> [u8; 7] {
        let steps = match self.mode() {
            Mode::Major => MAJOR_SCALE,
            Mode::Minor => MINOR_SCALE,
        };
        steps.map(|s| (self.tonic() + s) % 12)
    }

    /// Pitch class of a scale degree (1-7)
    pub fn degree_pitch_class(&self, degree: u8) -> u8 {
        let idx = (degree.clamp(1, 7) - 1) as usize;
        self.scale_pitch_classes()[idx]
    }

    /// True if `pc` belongs to the key (minor keys also accept the raised 7th)
    pub fn is_diatonic(&self, pc: u8) -> bool {
        self.degree_of(pc).accidental == 0
    }

    /// Spell a pitch class as a scale degree of this key
    pub fn degree_of(&self, pc: u8) -> ScaleDegree {
        let interval = (pc % 12 + 12 - self.tonic()) % 12;
        // (degree, accidental) per semitone above the tonic
        let table: [(u8, i8); 12] = match self.mode() {
            Mode::Major => [
                (1, 0),
                (2, -1),
                (2, 0),
                (3, -1),
                (3, 0),
                (4, 0),
                (5, -1),
                (5, 0),
                (6, -1),
                (6, 0),
                (7, -1),
                (7, 0),
            ],
            Mode::Minor => [
                (1, 0),
                (2, -1),
                (2, 0),
                (3, 0),
                (3, 1),
                (4, 0),
                (5, -1),
                (5, 0),
                (6, 0),
                (6, 1),
                (7, 0),
                (7, 0),
            ],
        };
        let (degree, accidental) = table[interval as usize];
        ScaleDegree { degree, accidental }
    }

    /// Circle-of-fifths steps between the tonic and `pc` (0-6)
    pub fn fifths_distance(&self, pc: u8) -> u8 {
        let tonic_pos = fifths_position(self.tonic());
        let pc_pos = fifths_position(pc);
        let d = (tonic_pos + 12 - pc_pos) % 12;
        d.min(12 - d)
    }

    /// Position on the circle of fifths (0 = C), minor keys at their relative major
    pub fn wheel_position(&self) -> u8 {
        match self {
            Key::Major(t) => fifths_position(*t),
            Key::Minor(t) => fifths_position((*t + 3) % 12),
        }
    }
}

/// Index of a pitch class on the circle of fifths (C = 0, G = 1, ...)
pub fn fifths_position(pc: u8) -> u8 {
    // 7 is its own inverse mod 12
    (pc % 12) * 7 % 12
}

/// A span of the song in one detected key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyRegion {
    /// Region start in seconds
    pub time: f64,
    /// Tonic pitch class (0-11)
    pub pitch_class: u8,
    /// Key mode
    pub mode: Mode,
    /// 0 = clear winner, 1 = near tie with the runner-up
    pub ambiguity: f32,
}

impl KeyRegion {
    /// Key of this region
    pub fn key(&self) -> Key {
        Key::new(self.pitch_class, self.mode)
    }
}

impl Timed for KeyRegion {
    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

/// A detected chord (one per bar at most)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    /// Earliest note onset inside the bar, in seconds
    pub time: f64,
    /// Root pitch class (0-11)
    pub root: u8,
    /// Chord quality
    pub quality: ChordQuality,
    /// Scale degree of the root in the local key (1-7)
    pub degree: u8,
    /// Harmonic tension (0.0-1.0)
    pub tension: f32,
    /// Functions as a secondary dominant / leading-tone chord
    pub is_secondary: bool,
    /// Degree being tonicized (2-7) when `is_secondary`
    pub secondary_target: Option<u8>,
    /// Root or quality falls outside the local key
    pub is_chromatic: bool,
    /// Roman numeral for display (e.g. "V7/ii", "bVII")
    pub numeral: String,
}

impl Timed for ChordEvent {
    #[inline]
    fn time(&self) -> f64 {
        self.time
    }
}

/// Complete load-time analysis of a timeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineAnalysis {
    /// Whole-piece key
    pub key: Key,

    /// Whole-piece key ambiguity (0.0-1.0)
    pub key_ambiguity: f32,

    /// Key regions after modulation detection, sorted by time
    pub key_regions: Vec<KeyRegion>,

    /// Chord timeline, sorted by time
    pub chords: Vec<ChordEvent>,

    /// Bar start times in seconds
    pub bar_starts: Vec<f64>,
}

impl TimelineAnalysis {
    /// Key in effect at `time` (whole-piece key before the first region)
    pub fn key_at(&self, time: f64) -> Key {
        binary_search_time(&self.key_regions, time)
            .map(|i| self.key_regions[i].key())
            .unwrap_or(self.key)
    }

    /// Chord in effect at `time`, if any has started
    pub fn chord_at(&self, time: f64) -> Option<&ChordEvent> {
        binary_search_time(&self.chords, time).map(|i| &self.chords[i])
    }
}
