//! Session shell
//!
//! Owns both engine states, the seeded RNG and the timeline. Exactly one mode
//! is live at a time; input and due tasks are routed to it and everything
//! the engines ask for comes back to the caller as [`Effect`]s.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::catch::{self, CatchState};
use super::effects::{CatchTask, Effect, Mode, PuzzleTask, Task};
use super::puzzle::{self, PuzzleState};
use super::timeline::Timeline;
use crate::config::GameConfig;

/// Which engine a batch of effects came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Engine {
    Puzzle,
    Catch,
}

/// A play session
#[derive(Debug, Clone)]
pub struct Session {
    /// Seed for reproducibility
    seed: u64,
    rng: Pcg32,
    config: GameConfig,
    mode: Option<Mode>,
    puzzle: PuzzleState,
    catch: CatchState,
    timeline: Timeline,
}

impl Session {
    /// Create a session at the menu
    pub fn new(seed: u64, config: GameConfig) -> Self {
        let catch = CatchState::new(&config.catch);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            config,
            mode: None,
            puzzle: PuzzleState::default(),
            catch,
            timeline: Timeline::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn puzzle(&self) -> &PuzzleState {
        &self.puzzle
    }

    pub fn catch(&self) -> &CatchState {
        &self.catch
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Virtual time of the last processed event
    pub fn now_ms(&self) -> u64 {
        self.timeline.now_ms()
    }

    /// Record the measured catch playfield width; spawns use it from now on
    ///
    /// Returns the bucket position when the narrower field moved it.
    pub fn set_playfield_width(&mut self, width: f32) -> Vec<Effect> {
        if !width.is_finite() || width < self.config.catch.bucket_width {
            log::debug!("Ignoring playfield width {}", width);
            return Vec::new();
        }
        if width == self.catch.playfield_width {
            return Vec::new();
        }
        log::debug!("Playfield width {} -> {}", self.catch.playfield_width, width);
        self.catch.playfield_width = width;

        let clamped =
            catch::clamp_bucket(self.catch.bucket_x, width, self.config.catch.bucket_width);
        if clamped == self.catch.bucket_x {
            return Vec::new();
        }
        self.catch.bucket_x = clamped;
        if self.mode == Some(Mode::Catch) {
            vec![Effect::Bucket { x: clamped }]
        } else {
            Vec::new()
        }
    }

    /// Enter a mode (`None` goes back to the menu)
    pub fn select_mode(&mut self, mode: Option<Mode>) -> Vec<Effect> {
        let Some(mode) = mode else {
            return self.return_to_menu();
        };

        let mut out = Vec::new();
        if self.mode.is_some() {
            self.leave_mode(&mut out);
        }

        log::info!("Entering {} mode", mode.as_str());
        self.mode = Some(mode);
        out.push(Effect::ShowMode(mode));

        match mode {
            Mode::Puzzle => {
                let effects = puzzle::init(&mut self.puzzle, &self.config.puzzle, &mut self.rng);
                self.absorb(Engine::Puzzle, effects, &mut out);
            }
            Mode::Catch => {
                let effects = catch::init(&mut self.catch, &self.config.catch);
                self.absorb(Engine::Catch, effects, &mut out);
            }
        }
        out
    }

    /// Stop whatever is running and show the mode selector
    pub fn return_to_menu(&mut self) -> Vec<Effect> {
        let mut out = Vec::new();
        self.leave_mode(&mut out);
        if self.mode.take().is_some() {
            log::info!("Back to menu");
        }
        out.push(Effect::ShowMenu);
        out
    }

    /// Cancel timers and reset both engines
    fn leave_mode(&mut self, out: &mut Vec<Effect>) {
        catch::stop(&mut self.catch);
        let cancelled = self.timeline.cancel(|t| {
            matches!(
                t,
                Task::Catch(CatchTask::Spawn | CatchTask::Countdown) | Task::Puzzle(_)
            )
        });
        if cancelled > 0 {
            log::debug!("Cancelled {} pending tasks", cancelled);
        }

        out.extend(catch::reset(&mut self.catch, &self.config.catch));
        puzzle::reset(&mut self.puzzle);
    }

    /// Tile click from the board
    pub fn click_tile(&mut self, index: usize) -> Vec<Effect> {
        if self.mode != Some(Mode::Puzzle) {
            return Vec::new();
        }
        let effects = puzzle::click_tile(&mut self.puzzle, &self.config.puzzle, index);
        let mut out = Vec::new();
        self.absorb(Engine::Puzzle, effects, &mut out);
        out
    }

    /// Pointer x relative to the catch playfield
    pub fn pointer_move(&mut self, x: f32) -> Vec<Effect> {
        if self.mode != Some(Mode::Catch) {
            return Vec::new();
        }
        catch::move_bucket(&mut self.catch, &self.config.catch, x)
    }

    /// Fire everything due at or before `now_ms`
    pub fn advance(&mut self, now_ms: u64) -> Vec<Effect> {
        let mut out = Vec::new();
        while let Some(entry) = self.timeline.pop_due(now_ms) {
            self.dispatch(entry.generation, entry.task, &mut out);
        }
        self.timeline.advance_to(now_ms);
        out
    }

    /// Advance by a relative amount of time
    pub fn advance_by(&mut self, delta_ms: u64) -> Vec<Effect> {
        self.advance(self.now_ms().saturating_add(delta_ms))
    }

    fn dispatch(&mut self, generation: u32, task: Task, out: &mut Vec<Effect>) {
        match task {
            Task::Puzzle(task) => {
                if generation != self.puzzle.generation {
                    log::debug!("Stale puzzle task {:?}", task);
                    return;
                }
                let effects =
                    puzzle::run_task(&mut self.puzzle, &self.config.puzzle, &mut self.rng, task);
                self.absorb(Engine::Puzzle, effects, out);
            }
            Task::Catch(task) => {
                if generation != self.catch.generation {
                    log::debug!("Stale catch task {:?}", task);
                    return;
                }
                if task == CatchTask::ShowSummary {
                    out.push(Effect::Notify(catch::summary(&self.catch)));
                    out.extend(self.return_to_menu());
                    return;
                }
                let effects =
                    catch::run_task(&mut self.catch, &self.config.catch, &mut self.rng, task);
                self.absorb(Engine::Catch, effects, out);
            }
        }
    }

    /// Move schedule requests onto the timeline, pass the rest through
    fn absorb(&mut self, engine: Engine, effects: Vec<Effect>, out: &mut Vec<Effect>) {
        let generation = match engine {
            Engine::Puzzle => self.puzzle.generation,
            Engine::Catch => self.catch.generation,
        };
        for effect in effects {
            match effect {
                Effect::Schedule { delay_ms, task } => {
                    self.timeline.schedule(delay_ms, generation, task)
                }
                other => out.push(other),
            }
        }
    }

    /// Pending puzzle work, mostly for tests and debugging
    pub fn has_pending(&self, task: PuzzleTask) -> bool {
        self.timeline.tasks().any(|t| *t == Task::Puzzle(task))
    }
}
