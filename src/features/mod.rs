//! Feature extraction modules
//!
//! This module contains the symbolic analysis algorithms:
//! - Key detection and modulation tracking
//! - Bar-level chord detection, harmonic function and tension
//! - Beat tracking (tempo map + per-frame phase)

pub mod beat_tracking;
pub mod chord;
pub mod key;
