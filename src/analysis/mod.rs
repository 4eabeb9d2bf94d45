//! Analysis result types
//!
//! The immutable output of the Timeline Analyzer: global key, key regions
//! and the per-bar chord timeline.

pub mod result;

pub use result::{ChordEvent, Key, KeyRegion, Mode, ScaleDegree, TimelineAnalysis};
