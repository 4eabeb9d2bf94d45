//! Integration tests for timeline analysis and frame mapping

use stratum_viz::mapping::AnchorTable;
use stratum_viz::timeline::{NoteEvent, TempoEvent, TimeSignatureEvent};
use stratum_viz::{
    analyze_timeline, AnalysisConfig, FrameSnapshot, Key, MapperConfig, Mode, ParameterMapper,
    Song, Timeline, TimelineAnalysis,
};
use std::path::PathBuf;
use std::sync::Arc;

const FPS: f64 = 60.0;
const DT: f64 = 1.0 / FPS;

/// I-V-vi-IV in a major key
fn pop_progression(tonic: u8) -> [(u8, bool); 4] {
    [
        (tonic % 12, false),
        ((tonic + 7) % 12, false),
        ((tonic + 9) % 12, true),
        ((tonic + 5) % 12, false),
    ]
}

/// One triad plus a bass root per bar, 2 s bars at 120 BPM in 4/4
fn progression_timeline(bars: &[(u8, bool)]) -> Timeline {
    let mut notes = Vec::new();
    for (bar, &(root, minor)) in bars.iter().enumerate() {
        let time = bar as f64 * 2.0;
        let third = if minor { 3 } else { 4 };
        notes.push(NoteEvent::new(48 + root, 0.8, time, 1.9, 1));
        for interval in [0, third, 7] {
            notes.push(NoteEvent::new(60 + root + interval, 0.8, time, 1.9, 0));
        }
    }
    Timeline::new(
        notes,
        vec![TempoEvent { time: 0.0, bpm: 120.0 }],
        vec![TimeSignatureEvent::new(0.0, 4, 4)],
        bars.len() as f64 * 2.0,
    )
    .expect("valid timeline")
}

fn c_major_timeline() -> Timeline {
    let mut bars = pop_progression(0).to_vec();
    bars.extend(pop_progression(0));
    progression_timeline(&bars)
}

fn analyzed(timeline: &Timeline) -> (TimelineAnalysis, Arc<Song>) {
    let analysis = analyze_timeline(timeline, &AnalysisConfig::default()).expect("analysis");
    let song = Song::new(timeline, &analysis).into_shared();
    (analysis, song)
}

/// Play frames at 60 fps from `start` (exclusive) to `end` (inclusive)
fn play(mapper: &mut ParameterMapper, start: f64, end: f64) -> FrameSnapshot {
    let frames = ((end - start) * FPS).round() as usize;
    for i in 1..=frames {
        mapper.update(DT, start + i as f64 * DT, 0.6);
    }
    mapper.snapshot().clone()
}

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("stratum_viz_{}_{}", std::process::id(), name))
}

#[test]
fn test_progression_analysis() {
    let timeline = c_major_timeline();
    let (analysis, _) = analyzed(&timeline);

    assert_eq!(analysis.key, Key::Major(0));
    assert_eq!(analysis.key_regions.len(), 1);
    assert_eq!(analysis.bar_starts.len(), 8);

    let roots: Vec<u8> = analysis.chords.iter().map(|c| c.root).collect();
    assert_eq!(roots, vec![0, 7, 9, 5, 0, 7, 9, 5]);
    let degrees: Vec<u8> = analysis.chords.iter().take(4).map(|c| c.degree).collect();
    assert_eq!(degrees, vec![1, 5, 6, 4]);
    assert_eq!(analysis.chords[2].numeral, "vi");
    assert!(analysis.chord_at(-0.5).is_none());
    assert_eq!(analysis.chord_at(2.3).map(|c| c.root), Some(7));
    assert_eq!(analysis.chord_at(15.9).map(|c| c.root), Some(5));
    assert!(analysis.chords.iter().all(|c| (0.0..=1.0).contains(&c.tension)));
    assert!(analysis.chords.iter().all(|c| !c.is_chromatic));
}

#[test]
fn test_modulation_to_dominant() {
    let mut bars: Vec<(u8, bool)> = Vec::new();
    for _ in 0..2 {
        bars.extend(pop_progression(0));
    }
    for _ in 0..2 {
        bars.extend(pop_progression(7));
    }
    let timeline = progression_timeline(&bars);
    let (analysis, _) = analyzed(&timeline);

    assert_eq!(analysis.key_regions.len(), 2, "regions: {:?}", analysis.key_regions);
    assert_eq!(analysis.key_regions[0].key(), Key::Major(0));
    assert_eq!(analysis.key_regions[0].time, 0.0);
    assert_eq!(analysis.key_regions[1].key(), Key::Major(7));
    assert!(analysis.key_regions[1].time >= 14.0 && analysis.key_regions[1].time <= 22.0);

    // Chords in the last cycle are read against the new key
    let last: Vec<u8> = analysis.chords.iter().rev().take(4).map(|c| c.degree).collect();
    assert_eq!(last, vec![4, 6, 5, 1]);
    assert_eq!(analysis.key_at(30.0), Key::Major(7));
}

#[test]
fn test_beat_position_at_1_5s() {
    let timeline = c_major_timeline();
    let (_, song) = analyzed(&timeline);
    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);

    mapper.update(DT, 0.0, 0.6);
    let snap = play(&mut mapper, 0.0, 1.5);
    assert_eq!(snap.beat_index, 3);
    assert!(snap.on_beat);
    assert!(!snap.on_bar);
    assert!(snap.beat_phase < 1e-3);
    assert!((snap.bar_phase - 0.75).abs() < 1e-3);
    assert_eq!(snap.bpm, 120.0);
    assert_eq!(snap.beats_per_bar, 4);
    assert!((snap.next_bar_in - 0.5).abs() < 1e-6);
}

#[test]
fn test_chord_held_across_bar_boundary() {
    let timeline = c_major_timeline();
    let (_, song) = analyzed(&timeline);
    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song.clone());

    mapper.update(DT, 0.0, 0.6);
    let snap = play(&mut mapper, 0.0, 2.3);
    assert_eq!(snap.chord_root, 7);
    assert_eq!(snap.chord_degree, 5);
    assert_eq!(snap.chord_index, Some(1));
    assert_eq!(snap.tension, song.chords()[1].tension);
    assert_eq!(snap.key, 0);
    assert_eq!(snap.key_mode, Mode::Major);

    // The triad and the bass are sounding; bass is the lowest voice
    assert_eq!(snap.active_voices.len(), 4);
    assert_eq!(snap.bass.map(|n| n.midi), Some(55));
    assert_eq!(snap.melody.map(|n| n.midi), Some(74));
}

#[test]
fn test_empty_song_reports_idle() {
    let timeline = Timeline::default();
    let (analysis, song) = analyzed(&timeline);
    assert!(analysis.chords.is_empty());

    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);
    let snap = mapper.update(DT, 1.0, 0.25).clone();
    assert_eq!(snap.chord_degree, 1);
    assert_eq!(snap.chord_index, None);
    assert_eq!(snap.tension, 0.0);
    assert_eq!(snap.beat_stability, 0.0);
    assert!(snap.active_voices.is_empty());
    assert!(snap.upcoming_notes.is_empty());
    assert!(snap.upcoming_chords.is_empty());
    assert_eq!(snap.loudness, 0.25);
}

#[test]
fn test_zero_dt_frame_is_idempotent() {
    let (_, song) = analyzed(&c_major_timeline());
    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);
    mapper.update(DT, 0.0, 0.6);
    play(&mut mapper, 0.0, 3.1);

    let first = mapper.update(0.0, 3.1, 0.6).clone();
    let second = mapper.update(0.0, 3.1, 0.6).clone();
    assert_eq!(first, second);
}

#[test]
fn test_reset_matches_fresh_mapper() {
    let (_, song) = analyzed(&c_major_timeline());

    let mut fresh = ParameterMapper::with_song(MapperConfig::default(), song.clone());
    fresh.update(DT, 0.0, 0.6);
    let expected = play(&mut fresh, 0.0, 1.0);

    let mut used = ParameterMapper::with_song(MapperConfig::default(), song);
    used.update(DT, 0.0, 0.6);
    play(&mut used, 0.0, 9.0);
    used.reset();
    used.update(DT, 0.0, 0.6);
    assert_eq!(play(&mut used, 0.0, 1.0), expected);
}

#[test]
fn test_upcoming_notes_match_brute_force() {
    let timeline = c_major_timeline();
    let (_, song) = analyzed(&timeline);
    let config = MapperConfig::default();
    let mut mapper = ParameterMapper::with_song(config.clone(), song);

    let pitched = timeline.pitched_notes();
    mapper.update(DT, 0.0, 0.6);
    for i in 1..=(15.0 * FPS) as usize {
        let now = i as f64 * DT;
        let snap = mapper.update(DT, now, 0.6);
        if i % 7 != 0 {
            continue;
        }

        let window_start = now - config.lookahead_lead;
        let window_end = now + config.note_lookahead;
        let mut per_class = [0usize; 12];
        let mut expected = Vec::new();
        for note in &pitched {
            if note.duration <= 0.0 || note.time >= window_end || note.end() <= window_start {
                continue;
            }
            let class = &mut per_class[note.pitch_class as usize];
            if *class < config.pitch_class_cap && expected.len() < config.max_upcoming_notes {
                *class += 1;
                expected.push((note.midi, note.time));
            }
        }

        let actual: Vec<(u8, f64)> = snap.upcoming_notes.iter().map(|n| (n.midi, n.time)).collect();
        assert_eq!(actual, expected, "lookahead mismatch at {:.3}s", now);
        assert!(snap.upcoming_notes.windows(2).all(|w| w[0].time <= w[1].time));
        assert!(snap
            .upcoming_notes
            .iter()
            .all(|n| (n.time_until - (n.time - now)).abs() < 1e-9));
    }
}

#[test]
fn test_upcoming_chords_within_lookahead_bars() {
    let (_, song) = analyzed(&c_major_timeline());
    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);
    mapper.update(DT, 0.0, 0.6);
    let snap = play(&mut mapper, 0.0, 4.5);

    // Bar 2 is Am; the lookahead covers bars 2 and 3
    assert_eq!(snap.bar_index, 2);
    let upcoming: Vec<u8> = snap.upcoming_chords.iter().map(|c| c.root).collect();
    assert_eq!(upcoming, vec![5]);
    assert!((snap.upcoming_chords[0].time_until - 1.5).abs() < 1e-6);
    let in_bar: Vec<u8> = snap.bar_chords.iter().map(|c| c.root).collect();
    assert_eq!(in_bar, vec![9]);
}

#[test]
fn test_seek_backward_resyncs() {
    let (_, song) = analyzed(&c_major_timeline());
    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);
    mapper.update(DT, 0.0, 0.6);
    play(&mut mapper, 0.0, 7.0);
    assert_eq!(mapper.snapshot().chord_root, 5);

    let snap = mapper.update(DT, 2.5, 0.6).clone();
    assert_eq!(snap.chord_root, 7);
    assert_eq!(snap.bar_index, 1);
    assert!(!snap.on_beat);
    assert!(!snap.on_bar);
    assert_eq!(snap.upcoming_chords.first().map(|c| c.root), Some(9));
}

#[test]
fn test_playhead_clamped_to_duration() {
    let (_, song) = analyzed(&c_major_timeline());
    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);
    let snap = mapper.update(DT, 1000.0, 0.6);
    assert_eq!(snap.current_time, 16.0);
}

#[test]
fn test_anchor_file_loaded() {
    let path = temp_file("anchors.json");
    std::fs::write(&path, r#"{ "1": { "x": 0.5, "y": -0.25 }, "5": { "radius": "wide" } }"#)
        .expect("write anchor file");

    let (_, song) = analyzed(&c_major_timeline());
    let config = MapperConfig {
        anchor_path: Some(path.clone()),
        root_perturbation: false,
        ..MapperConfig::default()
    };
    let mut mapper = ParameterMapper::with_song(config, song);

    let defaults = AnchorTable::default();
    assert_eq!(mapper.anchors().get(1).x, 0.5);
    assert_eq!(mapper.anchors().get(5).radius, defaults.get(5).radius);
    for (degree, (loaded, default)) in mapper
        .anchors()
        .entries()
        .iter()
        .zip(defaults.entries().iter())
        .enumerate()
    {
        if degree != 1 && degree != 5 {
            assert_eq!(loaded, default, "degree {}", degree);
        }
    }

    mapper.update(DT, 0.0, 0.6);
    let snap = play(&mut mapper, 0.0, 1.5);
    assert!((snap.anchor_x - 0.5).abs() < 1e-3);
    assert!((snap.anchor_y + 0.25).abs() < 1e-3);

    std::fs::write(&path, r#"[{}, { "x": -0.5 }]"#).expect("rewrite anchor file");
    mapper.reload_anchors();
    assert_eq!(mapper.anchors().get(1).x, -0.5);
    let snap = play(&mut mapper, 1.5, 1.9);
    assert!(snap.anchor_x < -0.4);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_missing_anchor_file_uses_defaults() {
    let config = MapperConfig {
        anchor_path: Some(temp_file("does_not_exist.json")),
        ..MapperConfig::default()
    };
    let mapper = ParameterMapper::new(config);
    assert_eq!(mapper.anchors(), &AnchorTable::default());
}

#[test]
fn test_snapshot_values_bounded() {
    let (_, song) = analyzed(&c_major_timeline());
    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);
    for i in 0..=(16.0 * FPS) as usize {
        let snap = mapper.update(DT, i as f64 * DT, 0.6);
        for value in [
            snap.beat_phase,
            snap.bar_phase,
            snap.harmonic_tension_smooth,
            snap.rhythmic_tension_smooth,
            snap.tension_hue,
            snap.drum_energy,
        ] {
            assert!(value.is_finite());
            assert!((0.0..=1.0).contains(&value), "out of range at frame {}", i);
        }
        assert!(snap.rotation >= 0.0 && snap.rotation < std::f32::consts::TAU);
        assert!(snap.position_x.is_finite() && snap.position_y.is_finite());
    }
}

#[test]
fn test_meter_change_opens_bar() {
    let timeline = Timeline::new(
        vec![NoteEvent::new(60, 0.8, 0.0, 8.0, 0)],
        vec![TempoEvent { time: 0.0, bpm: 120.0 }],
        vec![TimeSignatureEvent::new(0.0, 4, 4), TimeSignatureEvent::new(3.0, 3, 4)],
        8.0,
    )
    .expect("valid timeline");
    let (analysis, song) = analyzed(&timeline);
    assert_eq!(analysis.bar_starts[..3], [0.0, 2.0, 3.0]);

    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);
    mapper.update(DT, 0.0, 0.6);
    let snap = play(&mut mapper, 0.0, 3.5);
    assert_eq!(snap.beats_per_bar, 3);
    assert_eq!(snap.bar_index, 2);
    assert_eq!(snap.beat_index, 1);
}

#[test]
fn test_unsorted_timeline_rejected() {
    let result = Timeline::new(
        vec![NoteEvent::new(64, 0.8, 1.0, 0.5, 0), NoteEvent::new(60, 0.8, 0.5, 0.5, 0)],
        vec![TempoEvent { time: 0.0, bpm: 120.0 }],
        vec![TimeSignatureEvent::new(0.0, 4, 4)],
        2.0,
    );
    assert!(result.is_err());
}

#[test]
fn test_snapshot_json() {
    let (_, song) = analyzed(&c_major_timeline());
    let mut mapper = ParameterMapper::with_song(MapperConfig::default(), song);
    let json = mapper.update(DT, 0.5, 0.6).to_json().expect("serialize");
    let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
    assert_eq!(value["chord_root"], 0);
    assert!(value["upcoming_notes"].is_array());
}
