//! Per-frame parameter mapping
//!
//! Runtime half of the crate: the analysis output for one song goes in once,
//! and every rendered frame asks for a [`FrameSnapshot`] at the current
//! playhead.
//!
//! - Anchor tables (per-degree targets, JSON loadable)
//! - Event cursors and lookahead windows
//! - Spring / rotation physics and release detectors
//! - The [`ParameterMapper`] state machine

pub mod anchors;
pub mod cursor;
pub mod lookahead;
pub mod mapper;
pub mod physics;
pub mod release;
pub mod snapshot;
pub mod song;
pub mod voices;

pub use anchors::{Anchor, AnchorTable};
pub use lookahead::{UpcomingChord, UpcomingNote};
pub use mapper::ParameterMapper;
pub use release::{ReleaseDetector, ReleaseParams};
pub use snapshot::{tension_hue, FrameSnapshot, LineNote};
pub use song::Song;
pub use voices::ActiveVoice;
