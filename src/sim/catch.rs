//! Catch mode: collect falling drops
//!
//! A spawner drops water every 400 ms at a random x with a random fall time.
//! Each drop resolves once, when its fall ends, against wherever the bucket
//! is at that moment. A one-second countdown ends the round.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::effects::{CatchTask, Effect};
use crate::audio::Cue;
use crate::config::CatchConfig;
use crate::{percent, secs_to_ms};

/// Drop identifier, unique within a session
pub type DropId = u32;

/// Round lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CatchPhase {
    #[default]
    Idle,
    /// Timers running
    Running,
    /// Countdown hit zero; waiting for the summary
    Ended,
}

/// A falling drop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallingDrop {
    pub id: DropId,
    /// Left edge in playfield px (fixed for the whole fall)
    pub spawn_x: f32,
    /// Seconds from spawn to resolution
    pub fall_secs: f32,
}

/// Complete catch state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchState {
    /// Bumped on every start/reset; stale timeline entries are ignored
    pub generation: u32,
    pub phase: CatchPhase,
    pub score: u32,
    pub missed: u32,
    pub time_remaining: u32,
    /// Unresolved drops (sorted by id for determinism)
    pub drops: BTreeMap<DropId, FallingDrop>,
    /// Bucket left edge in playfield px
    pub bucket_x: f32,
    /// Measured playfield width
    pub playfield_width: f32,
    /// Accuracy frozen when the countdown hit zero
    pub final_accuracy: Option<u32>,
    next_drop_id: DropId,
}

impl CatchState {
    pub fn new(config: &CatchConfig) -> Self {
        Self {
            generation: 0,
            phase: CatchPhase::Idle,
            score: 0,
            missed: 0,
            time_remaining: config.duration_secs,
            drops: BTreeMap::new(),
            bucket_x: centered_bucket(config.playfield_width, config.bucket_width),
            playfield_width: config.playfield_width,
            final_accuracy: None,
            next_drop_id: 1,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == CatchPhase::Running
    }

    /// Drops resolved so far this round
    pub fn resolved(&self) -> u32 {
        self.score + self.missed
    }

    /// Caught share of resolved drops, rounded (0 when nothing resolved)
    pub fn accuracy(&self) -> u32 {
        percent(self.score, self.resolved())
    }

    fn hud(&self) -> Effect {
        Effect::CatchHud {
            score: self.score,
            missed: self.missed,
        }
    }
}

/// Bucket x that centres it in the playfield
pub fn centered_bucket(playfield_width: f32, bucket_width: f32) -> f32 {
    ((playfield_width - bucket_width) / 2.0).max(0.0)
}

/// Clamp a bucket left edge to `[0, playfield_width - bucket_width]`
pub fn clamp_bucket(x: f32, playfield_width: f32, bucket_width: f32) -> f32 {
    x.clamp(0.0, (playfield_width - bucket_width).max(0.0))
}

/// Interval overlap between a drop and the bucket (edges touching count)
pub fn overlaps(drop_x: f32, drop_width: f32, bucket_x: f32, bucket_width: f32) -> bool {
    let (drop_left, drop_right) = (drop_x, drop_x + drop_width);
    let (bucket_left, bucket_right) = (bucket_x, bucket_x + bucket_width);
    drop_right >= bucket_left && drop_left <= bucket_right
}

/// Start a round: zeroed counters, centred bucket, both timers armed
pub fn init(state: &mut CatchState, config: &CatchConfig) -> Vec<Effect> {
    let playfield_width = state.playfield_width;
    *state = CatchState {
        generation: state.generation.wrapping_add(1),
        phase: CatchPhase::Running,
        bucket_x: centered_bucket(playfield_width, config.bucket_width),
        playfield_width,
        next_drop_id: state.next_drop_id,
        ..CatchState::new(config)
    };

    log::info!(
        "Catch round started ({}s, playfield {}px)",
        state.time_remaining,
        state.playfield_width
    );

    vec![
        Effect::Bucket { x: state.bucket_x },
        state.hud(),
        Effect::Timer {
            seconds: state.time_remaining,
        },
        Effect::schedule(config.spawn_period_ms, CatchTask::Spawn),
        Effect::schedule(config.countdown_period_ms, CatchTask::Countdown),
    ]
}

/// Stop the timers; idempotent
pub fn stop(state: &mut CatchState) {
    if state.is_running() {
        state.phase = CatchPhase::Ended;
    }
}

/// Discard the round; removes any drop still on screen
pub fn reset(state: &mut CatchState, config: &CatchConfig) -> Vec<Effect> {
    let effects = state
        .drops
        .keys()
        .map(|&id| Effect::RemoveDrop(id))
        .collect();

    *state = CatchState {
        generation: state.generation.wrapping_add(1),
        playfield_width: state.playfield_width,
        bucket_x: centered_bucket(state.playfield_width, config.bucket_width),
        next_drop_id: state.next_drop_id,
        ..CatchState::new(config)
    };

    effects
}

/// Follow the pointer; `x` is relative to the playfield's left edge
pub fn move_bucket(state: &mut CatchState, config: &CatchConfig, x: f32) -> Vec<Effect> {
    if !state.is_running() || !x.is_finite() {
        return Vec::new();
    }
    // Pointer sits at the bucket's centre
    state.bucket_x = clamp_bucket(
        x - config.bucket_width / 2.0,
        state.playfield_width,
        config.bucket_width,
    );
    vec![Effect::Bucket { x: state.bucket_x }]
}

/// Run a deferred catch task (the summary is handled by the session)
pub fn run_task(
    state: &mut CatchState,
    config: &CatchConfig,
    rng: &mut impl Rng,
    task: CatchTask,
) -> Vec<Effect> {
    match task {
        CatchTask::Spawn => spawn(state, config, rng),
        CatchTask::Countdown => countdown(state, config),
        CatchTask::ResolveDrop(id) => resolve_drop(state, config, id),
        CatchTask::ShowSummary => Vec::new(),
    }
}

fn spawn(state: &mut CatchState, config: &CatchConfig, rng: &mut impl Rng) -> Vec<Effect> {
    if !state.is_running() {
        return Vec::new();
    }

    let max_x = (state.playfield_width - config.drop_width).max(0.0);
    let drop = FallingDrop {
        id: state.next_drop_id,
        spawn_x: rng.random::<f32>() * max_x,
        fall_secs: rng.random_range(config.fall_min_secs..config.fall_max_secs),
    };
    state.next_drop_id = state.next_drop_id.wrapping_add(1);
    state.drops.insert(drop.id, drop);

    vec![
        Effect::SpawnDrop {
            id: drop.id,
            x: drop.spawn_x,
            fall_secs: drop.fall_secs,
        },
        Effect::schedule(secs_to_ms(drop.fall_secs), CatchTask::ResolveDrop(drop.id)),
        Effect::schedule(config.spawn_period_ms, CatchTask::Spawn),
    ]
}

fn countdown(state: &mut CatchState, config: &CatchConfig) -> Vec<Effect> {
    if !state.is_running() {
        return Vec::new();
    }

    state.time_remaining = state.time_remaining.saturating_sub(1);
    let mut effects = vec![Effect::Timer {
        seconds: state.time_remaining,
    }];

    if state.time_remaining == 0 {
        effects.extend(end(state, config));
    } else {
        effects.push(Effect::schedule(config.countdown_period_ms, CatchTask::Countdown));
    }
    effects
}

fn end(state: &mut CatchState, config: &CatchConfig) -> Vec<Effect> {
    stop(state);
    let accuracy = state.accuracy();
    state.final_accuracy = Some(accuracy);
    log::info!(
        "Catch round over: caught {}, missed {}, accuracy {}%",
        state.score,
        state.missed,
        accuracy
    );
    vec![
        Effect::PlayCue(Cue::GameOver),
        Effect::schedule(config.summary_ms, CatchTask::ShowSummary),
    ]
}

fn resolve_drop(state: &mut CatchState, config: &CatchConfig, id: DropId) -> Vec<Effect> {
    // Already resolved (or swept by a reset): never count twice
    let Some(drop) = state.drops.remove(&id) else {
        return Vec::new();
    };

    let mut effects = Vec::with_capacity(3);
    if overlaps(drop.spawn_x, config.drop_width, state.bucket_x, config.bucket_width) {
        state.score += 1;
        effects.push(Effect::PlayCue(Cue::Catch));
    } else {
        state.missed += 1;
    }
    effects.push(Effect::RemoveDrop(id));
    effects.push(state.hud());
    effects
}

/// Text of the round-over dialog; counts are live, accuracy is the one
/// recorded when the round ended
pub fn summary(state: &CatchState) -> String {
    format!(
        "Game Over!\n\n\
         Caught: {}\n\
         Missed: {}\n\
         Accuracy: {}%\n\n\
         Every drop of clean water matters! 💧",
        state.score,
        state.missed,
        state.final_accuracy.unwrap_or_else(|| state.accuracy()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn running() -> (CatchState, CatchConfig) {
        let config = CatchConfig::default();
        let mut state = CatchState::new(&config);
        init(&mut state, &config);
        (state, config)
    }

    fn put_drop(state: &mut CatchState, id: DropId, spawn_x: f32) {
        state.drops.insert(
            id,
            FallingDrop {
                id,
                spawn_x,
                fall_secs: 2.5,
            },
        );
    }

    #[test]
    fn test_init() {
        let (state, _) = running();
        assert!(state.is_running());
        assert_eq!(state.time_remaining, CATCH_DURATION_SECS);
        assert_eq!(state.bucket_x, 180.0);
        assert_eq!(state.generation, 1);
    }

    #[test]
    fn test_overlap_edges() {
        // Bucket [100, 160], drop 20 wide
        assert!(overlaps(80.0, 20.0, 100.0, 60.0));
        assert!(overlaps(160.0, 20.0, 100.0, 60.0));
        assert!(overlaps(120.0, 20.0, 100.0, 60.0));
        assert!(!overlaps(79.9, 20.0, 100.0, 60.0));
        assert!(!overlaps(160.1, 20.0, 100.0, 60.0));
    }

    #[test]
    fn test_bucket_clamped() {
        let (mut state, config) = running();
        move_bucket(&mut state, &config, -500.0);
        assert_eq!(state.bucket_x, 0.0);
        move_bucket(&mut state, &config, 10_000.0);
        assert_eq!(state.bucket_x, PLAYFIELD_WIDTH - BUCKET_WIDTH);
        let effects = move_bucket(&mut state, &config, 200.0);
        assert_eq!(state.bucket_x, 170.0);
        assert_eq!(effects, vec![Effect::Bucket { x: 170.0 }]);
    }

    #[test]
    fn test_bucket_ignored_when_not_running() {
        let config = CatchConfig::default();
        let mut state = CatchState::new(&config);
        let before = state.bucket_x;
        assert!(move_bucket(&mut state, &config, 10.0).is_empty());
        assert_eq!(state.bucket_x, before);

        let (mut state, config) = running();
        assert!(move_bucket(&mut state, &config, f32::NAN).is_empty());
        assert_eq!(state.bucket_x, 180.0);
    }

    #[test]
    fn test_spawn_ranges() {
        let (mut state, config) = running();
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..200 {
            let effects = run_task(&mut state, &config, &mut rng, CatchTask::Spawn);
            let Effect::SpawnDrop { x, fall_secs, .. } = effects[0] else {
                panic!("expected spawn, got {:?}", effects[0]);
            };
            assert!((0.0..=PLAYFIELD_WIDTH - DROP_WIDTH).contains(&x));
            assert!((FALL_MIN_SECS..FALL_MAX_SECS).contains(&fall_secs));
            assert_eq!(
                effects[2],
                Effect::schedule(SPAWN_PERIOD_MS, CatchTask::Spawn)
            );
        }
        assert_eq!(state.drops.len(), 200);
    }

    #[test]
    fn test_spawn_stops_when_not_running() {
        let (mut state, config) = running();
        stop(&mut state);
        let mut rng = Pcg32::seed_from_u64(1);
        assert!(run_task(&mut state, &config, &mut rng, CatchTask::Spawn).is_empty());
        assert!(state.drops.is_empty());
    }

    #[test]
    fn test_catch_and_miss() {
        let (mut state, config) = running();
        let mut rng = Pcg32::seed_from_u64(0);
        put_drop(&mut state, 1, 190.0);
        put_drop(&mut state, 2, 0.0);

        let caught = run_task(&mut state, &config, &mut rng, CatchTask::ResolveDrop(1));
        assert_eq!(caught[0], Effect::PlayCue(Cue::Catch));
        assert_eq!(state.score, 1);

        let missed = run_task(&mut state, &config, &mut rng, CatchTask::ResolveDrop(2));
        assert_eq!(
            missed,
            vec![
                Effect::RemoveDrop(2),
                Effect::CatchHud { score: 1, missed: 1 }
            ]
        );

        // Resolving again never double-counts
        assert!(run_task(&mut state, &config, &mut rng, CatchTask::ResolveDrop(2)).is_empty());
        assert_eq!(state.resolved(), 2);
    }

    #[test]
    fn test_collision_uses_bucket_at_resolution() {
        let (mut state, config) = running();
        let mut rng = Pcg32::seed_from_u64(0);
        put_drop(&mut state, 1, 10.0);
        // Bucket was centred at spawn; player moves under the drop in time
        move_bucket(&mut state, &config, 30.0);
        run_task(&mut state, &config, &mut rng, CatchTask::ResolveDrop(1));
        assert_eq!(state.score, 1);
    }

    #[test]
    fn test_countdown_ends_round() {
        let (mut state, config) = running();
        state.time_remaining = 2;

        let effects = countdown(&mut state, &config);
        assert_eq!(state.time_remaining, 1);
        assert!(state.is_running());
        assert_eq!(
            effects[1],
            Effect::schedule(COUNTDOWN_PERIOD_MS, CatchTask::Countdown)
        );

        let effects = countdown(&mut state, &config);
        assert_eq!(state.time_remaining, 0);
        assert_eq!(state.phase, CatchPhase::Ended);
        assert_eq!(
            effects,
            vec![
                Effect::Timer { seconds: 0 },
                Effect::PlayCue(Cue::GameOver),
                Effect::schedule(CATCH_SUMMARY_MS, CatchTask::ShowSummary),
            ]
        );

        // Countdown is dead once ended
        assert!(countdown(&mut state, &config).is_empty());
    }

    #[test]
    fn test_accuracy() {
        let (mut state, _) = running();
        assert_eq!(state.accuracy(), 0);
        state.score = 2;
        state.missed = 1;
        assert_eq!(state.accuracy(), 67);
        state.score = 1;
        state.missed = 7;
        assert_eq!(state.accuracy(), 13);
        assert!(summary(&state).contains("Accuracy: 13%"));
    }

    #[test]
    fn test_accuracy_frozen_at_end() {
        let (mut state, config) = running();
        let mut rng = Pcg32::seed_from_u64(0);
        put_drop(&mut state, 1, 190.0);
        put_drop(&mut state, 2, 0.0);
        run_task(&mut state, &config, &mut rng, CatchTask::ResolveDrop(1));

        state.time_remaining = 1;
        countdown(&mut state, &config);
        assert_eq!(state.final_accuracy, Some(100));

        // A drop still in flight lands after the end
        run_task(&mut state, &config, &mut rng, CatchTask::ResolveDrop(2));
        assert_eq!(state.missed, 1);
        assert_eq!(state.accuracy(), 50);

        let text = summary(&state);
        assert!(text.contains("Missed: 1"));
        assert!(text.contains("Accuracy: 100%"));

        reset(&mut state, &config);
        assert_eq!(state.final_accuracy, None);
    }

    #[test]
    fn test_reset_sweeps_drops() {
        let (mut state, config) = running();
        put_drop(&mut state, 3, 50.0);
        put_drop(&mut state, 4, 60.0);
        let effects = reset(&mut state, &config);
        assert_eq!(effects, vec![Effect::RemoveDrop(3), Effect::RemoveDrop(4)]);
        assert_eq!(state.phase, CatchPhase::Idle);
        assert!(state.drops.is_empty());
        assert_eq!(state.generation, 2);
    }
}
