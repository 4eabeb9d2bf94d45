//! Key detection algorithm
//!
//! Correlates a duration×velocity weighted pitch-class histogram against the
//! 24 rotated reference profiles and picks the best-correlated key.
//!
//! # Reference
//!
//! Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*. Oxford
//! University Press. (Key-finding by profile correlation, chapter 4.)

use super::{templates::KeyTemplates, KeyDetectionResult};
use crate::analysis::result::Key;
use crate::error::AnalysisError;
use crate::timeline::events::NoteEvent;
use crate::timeline::search::lower_bound_time;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-9;

/// Floor applied to note durations so grace notes and zero-length events still count
pub const MIN_WEIGHT_DURATION: f64 = 0.05;

/// Build a pitch-class histogram over all pitched notes
///
/// Each note contributes `duration × velocity` to its pitch class.
pub fn pitch_class_histogram(notes: &[NoteEvent]) -> [f32; 12] {
    let mut histogram = [0.0f32; 12];
    for note in notes.iter().filter(|n| !n.is_drum) {
        let weight = note.duration.max(MIN_WEIGHT_DURATION) as f32 * note.velocity;
        histogram[note.pitch_class as usize % 12] += weight;
    }
    histogram
}

/// Build a pitch-class histogram restricted to `[start, end)`
///
/// Notes contribute by the part of their duration overlapping the window.
/// `notes` must be sorted by onset.
pub fn windowed_histogram(notes: &[NoteEvent], start: f64, end: f64) -> [f32; 12] {
    let mut histogram = [0.0f32; 12];
    if end <= start {
        return histogram;
    }

    let candidates = &notes[..lower_bound_time(notes, end)];
    for note in candidates.iter().filter(|n| !n.is_drum) {
        let note_end = note.time + note.duration.max(MIN_WEIGHT_DURATION);
        let overlap = note_end.min(end) - note.time.max(start);
        if overlap > 0.0 {
            histogram[note.pitch_class as usize % 12] += overlap as f32 * note.velocity;
        }
    }
    histogram
}

/// Detect musical key from a pitch-class histogram
///
/// # Returns
///
/// Key detection result with:
/// - Best-correlated key
/// - Its correlation coefficient
/// - Ambiguity `1 - (best - second) / best`, clamped to [0, 1]
/// - All 24 key scores (ranked, highest first)
///
/// Identical histograms always produce identical results: candidates are
/// scored in a fixed order (major C..B, then minor C..B) and the ranking sort
/// is stable, so exact ties resolve to the earlier candidate.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the histogram is empty (sums to zero)
/// or contains non-finite values.
///
/// # Example
///
/// ```
/// use stratum_viz::features::key::{detect_key, KeyTemplates};
/// use stratum_viz::analysis::Key;
///
/// // C major triad plus scale tones
/// let histogram = [4.0, 0.0, 2.0, 0.0, 3.0, 1.5, 0.0, 3.5, 0.0, 1.5, 0.0, 1.0];
/// let result = detect_key(&histogram, &KeyTemplates::default())?;
/// assert_eq!(result.key, Key::Major(0));
/// # Ok::<(), stratum_viz::AnalysisError>(())
/// ```
pub fn detect_key(
    histogram: &[f32; 12],
    templates: &KeyTemplates,
) -> Result<KeyDetectionResult, AnalysisError> {
    if histogram.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidInput(
            "Pitch-class histogram contains non-finite values".to_string(),
        ));
    }

    let total: f32 = histogram.iter().sum();
    if total <= EPSILON {
        return Err(AnalysisError::InvalidInput(
            "Empty pitch-class histogram".to_string(),
        ));
    }

    let mut scores = Vec::with_capacity(24);
    for tonic in 0..12u8 {
        let r = pearson(histogram, templates.get_major_template(tonic));
        scores.push((Key::Major(tonic), r));
    }
    for tonic in 0..12u8 {
        let r = pearson(histogram, templates.get_minor_template(tonic));
        scores.push((Key::Minor(tonic), r));
    }

    // Stable: equal scores keep generation order
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let (best_key, best_score) = scores[0];
    let second_score = scores[1].1;
    let ambiguity = key_ambiguity(best_score, second_score);

    log::debug!(
        "Detected key: {} (r={:.4}, runner-up {} r={:.4}, ambiguity={:.3})",
        best_key.name(),
        best_score,
        scores[1].0.name(),
        second_score,
        ambiguity
    );

    Ok(KeyDetectionResult {
        key: best_key,
        correlation: best_score,
        ambiguity,
        all_scores: scores,
    })
}

/// Ambiguity between the best and second-best key scores
///
/// 0 means a clear winner, 1 a near-tie. A non-positive best score carries no
/// tonal evidence and is fully ambiguous.
pub fn key_ambiguity(best: f32, second: f32) -> f32 {
    if best <= EPSILON {
        return 1.0;
    }
    (1.0 - (best - second) / best).clamp(0.0, 1.0)
}

/// Pearson correlation between two 12-bin profiles
fn pearson(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;

    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for i in 0..12 {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= EPSILON {
        0.0
    } else {
        cov / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::key::templates::ProfileFamily;

    fn c_major_histogram() -> [f32; 12] {
        let mut h = [0.0f32; 12];
        h[0] = 4.0;
        h[2] = 2.0;
        h[4] = 3.0;
        h[5] = 1.5;
        h[7] = 3.5;
        h[9] = 1.5;
        h[11] = 1.0;
        h
    }

    #[test]
    fn test_detect_key_empty() {
        let templates = KeyTemplates::default();
        let result = detect_key(&[0.0; 12], &templates);
        assert!(result.is_err());
    }

    #[test]
    fn test_detect_key_c_major() {
        let templates = KeyTemplates::default();
        let result = detect_key(&c_major_histogram(), &templates).unwrap();
        assert_eq!(result.key, Key::Major(0));
        assert_eq!(result.all_scores.len(), 24);
        assert!(result.ambiguity >= 0.0 && result.ambiguity <= 1.0);
    }

    #[test]
    fn test_detect_key_transposed() {
        let templates = KeyTemplates::default();
        let c = c_major_histogram();
        // Rotate up a fifth: G major
        let mut g = [0.0f32; 12];
        for pc in 0..12 {
            g[(pc + 7) % 12] = c[pc];
        }
        let result = detect_key(&g, &templates).unwrap();
        assert_eq!(result.key, Key::Major(7));
    }

    #[test]
    fn test_detect_key_a_minor() {
        let mut h = [0.0f32; 12];
        h[9] = 4.0; // A
        h[0] = 3.0; // C
        h[4] = 3.5; // E
        h[2] = 1.5; // D
        h[11] = 1.5; // B
        h[5] = 1.0; // F
        h[8] = 1.0; // G# leading tone
        let result = detect_key(&h, &KeyTemplates::default()).unwrap();
        assert_eq!(result.key, Key::Minor(9));
    }

    #[test]
    fn test_detect_key_deterministic() {
        let templates = KeyTemplates::new(ProfileFamily::Temperley);
        let a = detect_key(&c_major_histogram(), &templates).unwrap();
        let b = detect_key(&c_major_histogram(), &templates).unwrap();
        assert_eq!(a.key, b.key);
        assert_eq!(a.ambiguity.to_bits(), b.ambiguity.to_bits());
    }

    #[test]
    fn test_flat_histogram_is_fully_ambiguous() {
        let result = detect_key(&[1.0; 12], &KeyTemplates::default()).unwrap();
        assert_eq!(result.ambiguity, 1.0);
        assert_eq!(result.key, Key::Major(0));
    }

    #[test]
    fn test_key_ambiguity_bounds() {
        assert_eq!(key_ambiguity(0.8, 0.8), 1.0);
        assert_eq!(key_ambiguity(0.8, -0.5), 0.0);
        assert!((key_ambiguity(0.8, 0.4) - 0.5).abs() < 1e-6);
        assert_eq!(key_ambiguity(-0.2, -0.3), 1.0);
    }

    #[test]
    fn test_windowed_histogram_overlap() {
        let notes = vec![
            NoteEvent::new(60, 1.0, 0.0, 2.0, 0),
            NoteEvent::new(64, 0.5, 1.5, 1.0, 0),
            NoteEvent::drum(36, 1.0, 1.0, 9),
            NoteEvent::new(67, 1.0, 3.0, 1.0, 0),
        ];
        let h = windowed_histogram(&notes, 1.0, 2.0);
        assert!((h[0] - 1.0).abs() < 1e-6);
        assert!((h[4] - 0.25).abs() < 1e-6);
        assert_eq!(h[7], 0.0);
        assert_eq!(h.iter().filter(|&&v| v > 0.0).count(), 2);
    }

    #[test]
    fn test_histogram_weights_duration_and_velocity() {
        let notes = vec![
            NoteEvent::new(62, 0.5, 0.0, 2.0, 0),
            NoteEvent::new(74, 1.0, 1.0, 1.0, 0),
        ];
        let h = pitch_class_histogram(&notes);
        assert!((h[2] - 2.0).abs() < 1e-6);
    }
}
