//! Example: Analyze a synthetic timeline and sample a few frames
//!
//! Usage:
//!   cargo run --example analyze_timeline -- [--json] [--anchors <file.json>]
//!
//! Set RUST_LOG=debug to see the analysis log.

use stratum_viz::timeline::{NoteEvent, TempoEvent, TimeSignatureEvent};
use stratum_viz::{analyze_timeline, AnalysisConfig, MapperConfig, ParameterMapper, Song, Timeline};
use std::env;
use std::path::PathBuf;

/// I-V-vi-IV in C, then the same in G, with a backbeat
fn demo_timeline() -> Result<Timeline, stratum_viz::AnalysisError> {
    let cycles: [[(u8, u8); 4]; 2] = [
        [(0, 4), (7, 4), (9, 3), (5, 4)],
        [(7, 4), (2, 4), (4, 3), (0, 4)],
    ];
    let mut notes = Vec::new();
    let mut bar = 0usize;
    for cycle in cycles.iter() {
        for _ in 0..2 {
            for &(root, third) in cycle {
                let start = bar as f64 * 2.0;
                let mut bar_notes = vec![NoteEvent::new(48 + root, 0.9, start, 1.9, 1)];
                for interval in [0, third, 7] {
                    bar_notes.push(NoteEvent::new(60 + root + interval, 0.7, start, 1.9, 0));
                }
                for beat in 0..4 {
                    let drum = if beat % 2 == 0 { 36 } else { 38 };
                    bar_notes.push(NoteEvent::drum(drum, 1.0, start + beat as f64 * 0.5, 9));
                }
                bar_notes.sort_by(|a, b| a.time.total_cmp(&b.time));
                notes.extend(bar_notes);
                bar += 1;
            }
        }
    }

    Timeline::new(
        notes,
        vec![TempoEvent { time: 0.0, bpm: 120.0 }],
        vec![TimeSignatureEvent::new(0.0, 4, 4)],
        bar as f64 * 2.0,
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut json = false;
    let mut anchor_path: Option<PathBuf> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--anchors" => anchor_path = args.next().map(PathBuf::from),
            other => return Err(format!("Unknown argument: {}", other).into()),
        }
    }

    let timeline = demo_timeline()?;
    let analysis = analyze_timeline(&timeline, &AnalysisConfig::default())?;

    println!("=== Timeline Analysis ===");
    println!(
        "Key: {} ({}), ambiguity {:.3}",
        analysis.key.name(),
        analysis.key.numerical(),
        analysis.key_ambiguity
    );
    for region in &analysis.key_regions {
        println!("  {:>6.2}s  {}", region.time, region.key().name());
    }
    println!("Chords:");
    for chord in &analysis.chords {
        println!(
            "  {:>6.2}s  {:<6} tension {:.2}{}",
            chord.time,
            chord.numeral,
            chord.tension,
            if chord.is_secondary { "  (secondary)" } else { "" }
        );
    }

    let song = Song::new(&timeline, &analysis).into_shared();
    let config = MapperConfig {
        anchor_path,
        ..MapperConfig::default()
    };
    let mut mapper = ParameterMapper::with_song(config, song);

    println!();
    println!("=== Frames ===");
    let dt = 1.0 / 60.0;
    let frames = (timeline.duration() / dt) as usize;
    for i in 0..=frames {
        let snapshot = mapper.update(dt, i as f64 * dt, 0.7);
        if i % 120 != 0 {
            continue;
        }
        if json {
            println!("{}", snapshot.to_json()?);
        } else {
            println!(
                "  {:>6.2}s  bar {:>2} beat {}  degree {}  tension {:.2}/{:.2}  pos ({:+.3}, {:+.3})  upcoming {}",
                snapshot.current_time,
                snapshot.bar_index,
                snapshot.beat_index + 1,
                snapshot.chord_degree,
                snapshot.tension,
                snapshot.harmonic_tension_smooth,
                snapshot.position_x,
                snapshot.position_y,
                snapshot.upcoming_notes.len()
            );
        }
    }

    Ok(())
}
