//! Per-degree visual anchors
//!
//! Eight entries keyed by scale degree. Entry 0 is used when no chord is
//! active; entries 1-7 belong to the diatonic degrees. Tables load from JSON,
//! either an array of eight objects or an object keyed `"0"`..`"7"`. Missing
//! or malformed values fall back to the built-in default for that field.
//!
//! # Example
//!
//! ```
//! use stratum_viz::mapping::anchors::AnchorTable;
//!
//! let table = AnchorTable::from_json(r#"{ "5": { "x": 0.5, "radius": "wide" } }"#);
//! assert_eq!(table.get(5).x, 0.5);
//! assert_eq!(table.get(5).radius, AnchorTable::default().get(5).radius);
//! ```

use std::f32::consts::FRAC_PI_2;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of anchor entries (no-chord slot plus seven degrees)
pub const ANCHOR_COUNT: usize = 8;

/// Per-root perturbation angles in radians, indexed by pitch class
///
/// Hand-tuned; roughly follows the circle of fifths so related roots sit
/// near each other.
pub const ROOT_ANGLES: [f32; 12] = [
    0.00, 3.61, 1.09, 4.68, 2.14, 5.80, 3.05, 0.49, 4.22, 1.60, 5.19, 2.70,
];

/// Target position and orbit shape for one scale degree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Horizontal position (-1.0 to 1.0)
    pub x: f32,
    /// Vertical position (-1.0 to 1.0)
    pub y: f32,
    /// Base orbit radius
    pub radius: f32,
    /// Backbeat skew (0.0 = circular)
    pub skew: f32,
    /// Orbit rotation in radians
    pub rotation: f32,
    /// Angle between the four beat slots, in radians
    pub beat_spread: f32,
}

impl Anchor {
    const fn new(x: f32, y: f32, radius: f32, skew: f32, rotation: f32, beat_spread: f32) -> Self {
        Self {
            x,
            y,
            radius,
            skew,
            rotation,
            beat_spread,
        }
    }

    /// Field-by-field merge of a JSON object over `fallback`
    fn from_value(value: &Value, fallback: Anchor, slot: usize) -> Anchor {
        let Some(object) = value.as_object() else {
            log::warn!("Anchor {} is not an object, using defaults", slot);
            return fallback;
        };
        let field = |name: &str, default: f32| -> f32 {
            match object.get(name) {
                None => default,
                Some(v) => match v.as_f64().filter(|f| f.is_finite()) {
                    Some(f) => f as f32,
                    None => {
                        log::warn!("Anchor {} field '{}' is not a number, using default", slot, name);
                        default
                    }
                },
            }
        };
        Anchor {
            x: field("x", fallback.x),
            y: field("y", fallback.y),
            radius: field("radius", fallback.radius).max(0.0),
            skew: field("skew", fallback.skew),
            rotation: field("rotation", fallback.rotation),
            beat_spread: field("beat_spread", fallback.beat_spread),
        }
    }
}

const DEFAULT_ANCHORS: [Anchor; ANCHOR_COUNT] = [
    Anchor::new(0.00, 0.00, 0.08, 0.00, 0.00, FRAC_PI_2),
    Anchor::new(0.00, -0.05, 0.16, 0.10, 0.00, FRAC_PI_2),
    Anchor::new(-0.35, 0.20, 0.12, 0.25, 0.60, 1.20),
    Anchor::new(0.30, 0.25, 0.13, 0.20, -0.40, 1.30),
    Anchor::new(-0.30, -0.25, 0.15, 0.15, 0.30, FRAC_PI_2),
    Anchor::new(0.35, -0.20, 0.17, 0.30, -0.50, FRAC_PI_2),
    Anchor::new(0.10, 0.38, 0.12, 0.20, 0.90, 1.10),
    Anchor::new(-0.05, -0.40, 0.10, 0.40, -0.90, 1.00),
];

/// Eight anchors, one per degree slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorTable {
    entries: [Anchor; ANCHOR_COUNT],
}

impl Default for AnchorTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ANCHORS,
        }
    }
}

impl AnchorTable {
    /// Anchor for a degree slot (out-of-range degrees use slot 0)
    pub fn get(&self, degree: u8) -> &Anchor {
        self.entries
            .get(degree as usize)
            .unwrap_or(&self.entries[0])
    }

    /// All entries
    pub fn entries(&self) -> &[Anchor; ANCHOR_COUNT] {
        &self.entries
    }

    /// Replace one slot
    pub fn set(&mut self, degree: u8, anchor: Anchor) {
        if let Some(entry) = self.entries.get_mut(degree as usize) {
            *entry = anchor;
        }
    }

    /// Parse a table, falling back to defaults wherever the JSON is unusable
    pub fn from_json(json: &str) -> Self {
        let value: Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Unreadable anchor table ({}), using defaults", e);
                return Self::default();
            }
        };

        let mut table = Self::default();
        for slot in 0..ANCHOR_COUNT {
            let entry = match &value {
                Value::Array(items) => items.get(slot),
                Value::Object(map) => map.get(&slot.to_string()),
                _ => {
                    log::warn!("Anchor table must be an array or an object, using defaults");
                    return Self::default();
                }
            };
            if let Some(entry) = entry {
                table.entries[slot] = Anchor::from_value(entry, DEFAULT_ANCHORS[slot], slot);
            }
        }
        table
    }

    /// Read a table from a JSON file with the same fallback policy
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                log::debug!("Loading anchor table from {}", path.display());
                Self::from_json(&json)
            }
            Err(e) => {
                log::warn!(
                    "Cannot read anchor table {} ({}), using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Serialize as a JSON array
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Small fixed-radius offset that gives each chord root its own position
pub fn root_perturbation(root: u8, radius: f32) -> (f32, f32) {
    let angle = ROOT_ANGLES[(root % 12) as usize];
    (radius * angle.cos(), radius * angle.sin())
}
