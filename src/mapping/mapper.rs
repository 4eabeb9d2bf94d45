//! Per-frame parameter mapper
//!
//! Turns the song's discrete events into continuous visual parameters. Each
//! call to [`ParameterMapper::update`] runs, in order:
//!
//! 1. Chord / key index advance (binary search on seek or first frame)
//! 2. Exponential snap of anchor and orbit shape toward the chord's targets
//! 3. Harmonic and rhythmic tension smoothing with release detection
//! 4. Drum energy and metrical-strength rotation impulses
//! 5. Rotation integration with tempo-scaled friction
//! 6. Radial spring-damper and orbit offset
//! 7. Melody / bass / voice extraction and melodic tension
//! 8. Note and chord lookahead
//!
//! Step 3 reads the melodic tension and off-beat activity produced by step
//! 7 on the previous frame.

use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use super::anchors::{root_perturbation, AnchorTable};
use super::cursor::{EventCursor, ScanCursor};
use super::lookahead::{upcoming_notes, ChordLookahead, NoteWindow};
use super::physics::{snap, snap_angle, snap_factor, Rotation, Spring};
use super::release::ReleaseDetector;
use super::snapshot::{tension_hue, FrameSnapshot, LineNote};
use super::song::Song;
use super::voices::VoiceTracker;
use crate::analysis::result::{ChordEvent, Key, KeyRegion};
use crate::config::MapperConfig;
use crate::features::beat_tracking::time_signature::DOWNBEAT_STRENGTH;
use crate::features::beat_tracking::{
    BeatState, BeatTracker, BeatTracking, IdleBeatTracker, TempoMap, DEFAULT_BPM,
};
use crate::features::chord::ChordQuality;
use crate::timeline::events::{NoteEvent, TempoEvent, TimeSignatureEvent};

/// Spring kick on every beat, scaled by metrical strength
const BEAT_KICK: f32 = 0.6;
/// Extra spring kick on every bar line
const BAR_KICK: f32 = 0.9;
/// Outward force from the arrival curves
const ARRIVAL_FORCE: f32 = 1.2;
/// Outward force from smoothed harmonic tension
const TENSION_FORCE: f32 = 0.8;
/// Inward pull from beat anticipation
const ANTICIPATION_PULL: f32 = 0.5;

/// Rotation friction at 120 BPM, per second
const BASE_FRICTION: f32 = 1.5;
/// Rotation impulse per drum hit at full velocity
const DRUM_IMPULSE: f32 = 0.8;
/// Rotation impulse on each beat
const BEAT_IMPULSE: f32 = 0.3;
/// Rotation impulse on each off-beat eighth
const EIGHTH_IMPULSE: f32 = 0.12;

/// Drum energy decay rate, per second
const DRUM_ENERGY_DECAY: f32 = 5.0;
/// Off-beat activity decay rate, per second
const OFFBEAT_DECAY: f32 = 4.0;
/// Off-beat activity per unit of onset velocity
const OFFBEAT_GAIN: f32 = 0.5;
/// Beat phases treated as off the beat
const OFFBEAT_PHASES: std::ops::RangeInclusive<f32> = 0.2..=0.8;

/// Key rotation snap rate, per second
const KEY_ROTATION_RATE: f32 = 2.0;

/// Brightness before any release
const BASE_BRIGHTNESS: f32 = 0.6;

/// Continuously evolving state owned by one mapper
#[derive(Debug, Clone, PartialEq)]
struct MapperState {
    last_time: Option<f64>,

    anchor_x: f32,
    anchor_y: f32,
    target_x: f32,
    target_y: f32,
    radius: f32,
    target_radius: f32,
    skew: f32,
    target_skew: f32,
    orbit_rotation: f32,
    target_orbit_rotation: f32,
    beat_spread: f32,
    target_beat_spread: f32,
    target_tension: f32,

    key: Key,
    key_rotation: f32,
    key_rotation_target: f32,

    spring: Spring,
    rotation: Rotation,
    drum_energy: f32,
    offbeat_activity: f32,
    previous_eighth: Option<i64>,
}

impl MapperState {
    fn new(config: &MapperConfig, anchors: &AnchorTable) -> Self {
        let home = anchors.get(0);
        Self {
            last_time: None,
            anchor_x: home.x,
            anchor_y: home.y,
            target_x: home.x,
            target_y: home.y,
            radius: home.radius,
            target_radius: home.radius,
            skew: home.skew,
            target_skew: home.skew,
            orbit_rotation: home.rotation,
            target_orbit_rotation: home.rotation,
            beat_spread: home.beat_spread,
            target_beat_spread: home.beat_spread,
            target_tension: 0.0,
            key: Key::default(),
            key_rotation: 0.0,
            key_rotation_target: 0.0,
            spring: Spring::new(config.spring_stiffness, config.spring_damping),
            rotation: Rotation::default(),
            drum_energy: 0.0,
            offbeat_activity: 0.0,
            previous_eighth: None,
        }
    }
}

/// Per-frame state machine mapping song position to visual parameters
///
/// One instance per playing song. `update` is not reentrant; the returned
/// snapshot is valid until the next call.
pub struct ParameterMapper {
    config: MapperConfig,
    anchors: AnchorTable,
    song: Arc<Song>,
    tracker: Box<dyn BeatTracking + Send>,
    state: MapperState,
    chord_cursor: EventCursor,
    key_cursor: EventCursor,
    drum_cursor: ScanCursor,
    voices: VoiceTracker,
    chord_lookahead: ChordLookahead,
    harmonic: ReleaseDetector,
    rhythmic: ReleaseDetector,
    snapshot: FrameSnapshot,
}

impl std::fmt::Debug for ParameterMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterMapper")
            .field("config", &self.config)
            .field("chords", &self.song.chords().len())
            .field("notes", &self.song.notes().len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ParameterMapper {
    /// Mapper with no song loaded (reports the idle snapshot)
    pub fn new(config: MapperConfig) -> Self {
        Self::with_song(config, Arc::new(Song::empty()))
    }

    /// Mapper for a song, tracking beats from its tempo map
    pub fn with_song(config: MapperConfig, song: Arc<Song>) -> Self {
        let tracker = tracker_for(&song);
        Self::with_tracker(config, song, tracker)
    }

    /// Mapper for a song with a caller-supplied beat tracker
    pub fn with_tracker(
        config: MapperConfig,
        song: Arc<Song>,
        tracker: Box<dyn BeatTracking + Send>,
    ) -> Self {
        let anchors = match &config.anchor_path {
            Some(path) => AnchorTable::load(path),
            None => AnchorTable::default(),
        };
        let state = MapperState::new(&config, &anchors);
        Self {
            voices: VoiceTracker::with_capacity(config.max_voices.max(song.peak_polyphony())),
            harmonic: ReleaseDetector::new(config.harmonic_release),
            rhythmic: ReleaseDetector::new(config.rhythmic_release),
            snapshot: FrameSnapshot::with_capacity(
                config.max_voices,
                config.max_upcoming_notes,
                config.max_upcoming_chords,
            ),
            chord_cursor: EventCursor::new(),
            key_cursor: EventCursor::new(),
            drum_cursor: ScanCursor::new(),
            chord_lookahead: ChordLookahead::new(),
            config,
            anchors,
            song,
            tracker,
            state,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Song being mapped
    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    /// Anchor table in use
    pub fn anchors(&self) -> &AnchorTable {
        &self.anchors
    }

    /// Most recent snapshot
    pub fn snapshot(&self) -> &FrameSnapshot {
        &self.snapshot
    }

    /// Switch to another song and restart
    pub fn load_song(&mut self, song: Arc<Song>) {
        log::debug!(
            "Loading song: {} chords, {} notes, {} drum hits, {:.1}s",
            song.chords().len(),
            song.notes().len(),
            song.drums().len(),
            song.duration()
        );
        self.tracker = tracker_for(&song);
        self.voices.reserve(song.peak_polyphony());
        self.song = song;
        self.reset();
    }

    /// Replace the tempo and meter map (load time)
    pub fn set_tempo(&mut self, tempos: &[TempoEvent], time_signatures: &[TimeSignatureEvent]) {
        Arc::make_mut(&mut self.song).set_tempo_map(TempoMap::new(tempos, time_signatures));
        self.tracker = tracker_for(&self.song);
        self.reset();
    }

    /// Replace the key timeline (load time)
    pub fn set_key(&mut self, key: Key, regions: Vec<KeyRegion>) {
        Arc::make_mut(&mut self.song).set_key(key, regions);
        self.key_cursor.reset();
        self.state.last_time = None;
    }

    /// Override the song length (load time)
    pub fn set_song_duration(&mut self, duration: f64) {
        Arc::make_mut(&mut self.song).set_duration(duration);
    }

    /// Install an anchor table and retarget the current chord
    pub fn set_anchors(&mut self, anchors: AnchorTable) {
        self.anchors = anchors;
        self.retarget();
    }

    /// Re-read the configured anchor file (or restore built-ins)
    pub fn reload_anchors(&mut self) {
        let anchors = match &self.config.anchor_path {
            Some(path) => AnchorTable::load(path),
            None => AnchorTable::default(),
        };
        self.set_anchors(anchors);
    }

    /// Return every mutable field to its freshly constructed value
    pub fn reset(&mut self) {
        self.state = MapperState::new(&self.config, &self.anchors);
        self.tracker.reset();
        self.chord_cursor.reset();
        self.key_cursor.reset();
        self.drum_cursor.reset();
        self.voices.reset();
        self.chord_lookahead.reset();
        self.harmonic.reset();
        self.rhythmic.reset();
        self.snapshot.reset_to_idle();
    }

    /// Advance one frame
    ///
    /// # Arguments
    ///
    /// * `dt` - Seconds since the previous frame (capped at `max_dt`)
    /// * `time` - Playhead in seconds; backward jumps are seeks
    /// * `loudness` - Host loudness sample (0.0-1.0)
    ///
    /// # Returns
    ///
    /// The frame snapshot, valid until the next call
    pub fn update(&mut self, dt: f64, time: f64, loudness: f32) -> &FrameSnapshot {
        let time = if time.is_finite() {
            time.max(0.0)
        } else {
            self.state.last_time.unwrap_or(0.0)
        };
        let time = if self.song.duration() > 0.0 {
            time.min(self.song.duration())
        } else {
            time
        };
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_dt)
        } else {
            0.0
        };

        if dt == 0.0 && self.state.last_time == Some(time) {
            return &self.snapshot;
        }

        let first_frame = self.state.last_time.is_none();
        let seek = self.state.last_time.map_or(false, |last| time < last);
        if seek {
            log::debug!("Seek to {:.3}s, resyncing", time);
        }
        self.state.last_time = Some(time);
        let loudness = if loudness.is_finite() {
            loudness.clamp(0.0, 1.0)
        } else {
            0.0
        };

        if self.song.is_empty() {
            self.snapshot.reset_to_idle();
            self.snapshot.current_time = time;
            self.snapshot.dt = dt;
            self.snapshot.loudness = loudness;
            return &self.snapshot;
        }

        let song = Arc::clone(&self.song);
        let dt32 = dt as f32;
        let beat = self.tracker.update(dt, time);

        self.advance_harmony(&song, time, first_frame, dt32);
        self.update_tension(&beat, dt32);
        self.update_drums(&song, &beat, time, dt32);
        self.update_orbit(&beat, dt32);
        self.update_voices(&song, &beat, time, dt32);
        self.update_lookahead(&song, &beat, time, seek || first_frame);
        self.fill_snapshot(&song, &beat, time, dt, loudness);

        &self.snapshot
    }

    /// Steps 1-2: index advance and snap toward targets
    fn advance_harmony(&mut self, song: &Song, time: f64, first_frame: bool, dt: f32) {
        if self.chord_cursor.advance(song.chords(), time) {
            self.retarget();
        }

        if self.key_cursor.advance(song.key_regions(), time) || first_frame {
            let key = self
                .key_cursor
                .index()
                .map(|i| song.key_regions()[i].key())
                .unwrap_or_else(|| song.key());
            self.state.key = key;
            self.state.key_rotation_target = key.wheel_position() as f32 * TAU / 12.0;
            if first_frame {
                self.state.key_rotation = self.state.key_rotation_target;
            }
        }

        let s = &mut self.state;
        let factor = snap_factor(self.config.snap_rate, dt);
        snap(&mut s.anchor_x, s.target_x, factor);
        snap(&mut s.anchor_y, s.target_y, factor);
        snap(&mut s.radius, s.target_radius, factor);
        snap(&mut s.skew, s.target_skew, factor);
        snap(&mut s.orbit_rotation, s.target_orbit_rotation, factor);
        snap(&mut s.beat_spread, s.target_beat_spread, factor);
        snap_angle(
            &mut s.key_rotation,
            s.key_rotation_target,
            snap_factor(KEY_ROTATION_RATE, dt),
        );
    }

    /// Capture targets for the chord under the cursor
    fn retarget(&mut self) {
        let chord = self.current_chord().cloned();
        let degree = chord.as_ref().map_or(0, |c| c.degree);
        let anchor = *self.anchors.get(degree);
        let (dx, dy) = match &chord {
            Some(c) if self.config.root_perturbation => {
                root_perturbation(c.root, self.config.perturbation_radius)
            }
            _ => (0.0, 0.0),
        };

        let s = &mut self.state;
        s.target_x = anchor.x + dx;
        s.target_y = anchor.y + dy;
        s.target_radius = anchor.radius;
        s.target_skew = anchor.skew;
        s.target_orbit_rotation = anchor.rotation;
        s.target_beat_spread = anchor.beat_spread;
        s.target_tension = chord.as_ref().map_or(0.0, |c| c.tension.clamp(0.0, 1.0));
    }

    fn current_chord(&self) -> Option<&ChordEvent> {
        self.chord_cursor
            .index()
            .and_then(|i| self.song.chords().get(i))
    }

    /// Step 3: smoothing and release detection
    fn update_tension(&mut self, beat: &BeatState, dt: f32) {
        let rate_scale = (beat.bpm / DEFAULT_BPM).clamp(0.5, 2.0) as f32;

        let harmonic_raw = (self.state.target_tension + self.voices.melodic_tension()).min(1.0);
        self.harmonic.update(harmonic_raw, dt, rate_scale, true);

        let rhythmic_raw = self.rhythmic_raw(beat);
        let strong_downbeat = beat.on_beat && beat.beat_strength() >= DOWNBEAT_STRENGTH;
        self.rhythmic
            .update(rhythmic_raw, dt, rate_scale, strong_downbeat);
    }

    fn rhythmic_raw(&self, beat: &BeatState) -> f32 {
        (0.5 * beat.beat_anticipation + 0.5 * self.state.offbeat_activity).clamp(0.0, 1.0)
    }

    /// Steps 4-5: drum energy, impulses, rotation
    fn update_drums(&mut self, song: &Song, beat: &BeatState, time: f64, dt: f32) {
        let s = &mut self.state;
        s.drum_energy *= (-DRUM_ENERGY_DECAY * dt).exp();

        let range = self
            .drum_cursor
            .take(song.drums(), time, self.config.drum_lookback);
        for hit in &song.drums()[range] {
            let strength = hit_strength(song.tempo_map(), hit);
            s.drum_energy += hit.velocity * strength;
            let direction = if strength >= 0.5 { 1.0 } else { -1.0 };
            s.rotation.impulse(direction * DRUM_IMPULSE * hit.velocity * strength);
        }
        s.drum_energy = s.drum_energy.min(1.0);

        let parity = if beat.beat_index % 2 == 0 { 1.0 } else { -1.0 };
        if beat.on_beat {
            s.rotation.impulse(parity * BEAT_IMPULSE);
        }
        let eighth = (beat.beat_position * 2.0 + 1e-9).floor() as i64;
        if let Some(previous) = s.previous_eighth {
            if eighth > previous && eighth.rem_euclid(2) == 1 {
                s.rotation.impulse(parity * EIGHTH_IMPULSE);
            }
        }
        s.previous_eighth = Some(eighth);

        let friction = BASE_FRICTION * (beat.bpm / DEFAULT_BPM).clamp(0.5, 4.0) as f32;
        s.rotation.step(dt, friction);
    }

    /// Step 6: spring-damper radius and orbit offset
    fn update_orbit(&mut self, beat: &BeatState, dt: f32) {
        let smoothed_tension = self.harmonic.smoothed();
        let s = &mut self.state;

        if beat.on_beat {
            s.spring.kick(BEAT_KICK * beat.beat_strength());
        }
        if beat.on_bar {
            s.spring.kick(BAR_KICK);
        }
        let force = ARRIVAL_FORCE * (0.6 * beat.beat_arrival + 0.4 * beat.bar_arrival)
            + TENSION_FORCE * smoothed_tension
            - ANTICIPATION_PULL * beat.beat_anticipation;
        s.spring.step(dt, force);
    }

    /// Orbit offset in anchor space
    fn orbit_offset(&self, beat: &BeatState) -> (f32, f32) {
        let s = &self.state;
        let pulse = (PI * beat.beat_phase).sin();
        let radius = (s.radius * (1.0 + s.spring.offset)).max(0.0) * pulse;
        let angle = s.rotation.angle + (beat.beat_index % 4) as f32 * s.beat_spread;

        let x = radius * angle.cos();
        let mut y = radius * angle.sin();
        if beat.beat_index % 2 == 1 {
            y *= 1.0 - s.skew.clamp(0.0, 1.0);
        }

        let (sin, cos) = s.orbit_rotation.sin_cos();
        (x * cos - y * sin, x * sin + y * cos)
    }

    /// Step 7: voices, melodic tension, off-beat activity
    fn update_voices(&mut self, song: &Song, beat: &BeatState, time: f64, dt: f32) {
        self.voices.update(
            song.notes(),
            time,
            self.config.note_window,
            dt,
            self.config.max_voices,
            &mut self.snapshot.active_voices,
        );

        let s = &mut self.state;
        s.offbeat_activity *= (-OFFBEAT_DECAY * dt).exp();
        if self.voices.onset_count() > 0 && OFFBEAT_PHASES.contains(&beat.beat_phase) {
            s.offbeat_activity += OFFBEAT_GAIN * self.voices.onset_velocity();
        }
        s.offbeat_activity = s.offbeat_activity.min(1.0);
    }

    /// Step 8: note and chord lookahead
    fn update_lookahead(&mut self, song: &Song, beat: &BeatState, time: f64, force: bool) {
        let window = NoteWindow {
            lead: self.config.lookahead_lead,
            ahead: self.config.note_lookahead,
            max_duration: song.short_note_duration(),
            pitch_class_cap: self.config.pitch_class_cap,
            capacity: self.config.max_upcoming_notes,
        };
        upcoming_notes(
            song.notes(),
            song.long_notes(),
            time,
            &window,
            &mut self.snapshot.upcoming_notes,
        );

        self.chord_lookahead.update(
            song.chords(),
            song.tempo_map(),
            beat.bar_index,
            self.config.chord_lookahead_bars,
            time,
            force,
            self.config.max_upcoming_chords,
            &mut self.snapshot.upcoming_chords,
            &mut self.snapshot.bar_chords,
        );
    }

    fn fill_snapshot(&mut self, song: &Song, beat: &BeatState, time: f64, dt: f64, loudness: f32) {
        let (orbit_x, orbit_y) = self.orbit_offset(beat);
        let rhythmic_raw = self.rhythmic_raw(beat);
        let chord_index = self.chord_cursor.index();
        let chord = chord_index.and_then(|i| song.chords().get(i));
        let s = &self.state;
        let out = &mut self.snapshot;

        out.current_time = time;
        out.dt = dt;
        out.set_beat(beat);

        out.chord_index = chord_index;
        out.chord_root = chord.map_or(0, |c| c.root);
        out.chord_degree = chord.map_or(1, |c| c.degree);
        out.chord_quality = chord.map_or(ChordQuality::Major, |c| c.quality);
        out.tension = s.target_tension;
        out.harmonic_tension_smooth = self.harmonic.smoothed();
        out.harmonic_tension_release = self.harmonic.release();
        out.harmonic_on_release = self.harmonic.fired();
        out.rhythmic_tension = rhythmic_raw;
        out.rhythmic_tension_smooth = self.rhythmic.smoothed();
        out.rhythmic_tension_release = self.rhythmic.release();
        out.rhythmic_on_release = self.rhythmic.fired();
        out.melodic_tension = self.voices.melodic_tension();
        out.key = s.key.tonic();
        out.key_mode = s.key.mode();
        out.key_rotation = s.key_rotation;

        out.anchor_x = s.anchor_x;
        out.anchor_y = s.anchor_y;
        out.orbit_radius = s.radius;
        out.orbit_skew = s.skew;
        out.orbit_rotation = s.orbit_rotation;
        out.beat_spread = s.beat_spread;
        out.spring_offset = s.spring.offset;
        out.orbit_x = orbit_x;
        out.orbit_y = orbit_y;
        out.position_x = s.anchor_x + orbit_x;
        out.position_y = s.anchor_y + orbit_y;
        out.rotation = s.rotation.angle;
        out.rotation_velocity = s.rotation.velocity;

        out.melody = self.voices.melody().map(LineNote::from);
        out.bass = self.voices.bass().map(LineNote::from);
        out.drum_energy = s.drum_energy;
        out.loudness = loudness;
        out.tension_hue = tension_hue(self.harmonic.smoothed());
        out.tension_brightness = (BASE_BRIGHTNESS + (1.0 - BASE_BRIGHTNESS) * self.harmonic.release())
            .min(1.0);
    }
}

/// Symbolic tracker for a song, idle tracker when there is nothing to track
fn tracker_for(song: &Song) -> Box<dyn BeatTracking + Send> {
    if song.is_empty() {
        Box::new(IdleBeatTracker::new())
    } else {
        Box::new(BeatTracker::new(song.tempo_map().clone()))
    }
}

/// Metrical strength at a hit's position in its bar
fn hit_strength(tempo_map: &TempoMap, hit: &NoteEvent) -> f32 {
    let pos = tempo_map.position_at(hit.time);
    let meter = tempo_map.segments()[pos.segment].meter;
    let beat_in_bar = (pos.bars - pos.bars.floor()) * meter.numerator as f64;
    meter.hit_strength(beat_in_bar)
}
