//! Effect requests and deferred tasks
//!
//! Transitions never touch the page. They return an ordered list of
//! [`Effect`]s which the shell executes (DOM updates, cues, alerts), plus
//! [`Effect::Schedule`] requests the session turns into timeline entries.

use serde::{Deserialize, Serialize};

use super::catch::DropId;
use super::puzzle::TileKind;
use crate::audio::Cue;

/// Playable modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Puzzle,
    Catch,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Puzzle => "puzzle",
            Mode::Catch => "catch",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "puzzle" => Some(Mode::Puzzle),
            "catch" => Some(Mode::Catch),
            _ => None,
        }
    }
}

/// Deferred puzzle work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuzzleTask {
    /// Vanish transition finished; the tile leaves the board for good
    HideTile(usize),
    /// Chain celebration over: start the next chain or declare the win
    SettleChain,
    /// Show the win summary, then deal a fresh board
    ShowWinSummary,
}

/// Deferred catch work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatchTask {
    /// Periodic drop spawner
    Spawn,
    /// Periodic one-second countdown
    Countdown,
    /// A drop reached the bottom of the playfield
    ResolveDrop(DropId),
    /// Show the round summary, then go back to the menu
    ShowSummary,
}

/// Anything that can sit on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    Puzzle(PuzzleTask),
    Catch(CatchTask),
}

impl From<PuzzleTask> for Task {
    fn from(t: PuzzleTask) -> Self {
        Task::Puzzle(t)
    }
}

impl From<CatchTask> for Task {
    fn from(t: CatchTask) -> Self {
        Task::Catch(t)
    }
}

/// A side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Show the mode selector, hide both mode views
    ShowMenu,
    /// Hide the selector, show one mode view
    ShowMode(Mode),

    /// Rebuild the whole puzzle grid
    RenderBoard { tiles: Vec<TileKind> },
    /// Start the vanish transition on a consumed tile
    TileVanishing(usize),
    /// Remove a consumed tile from view
    TileHidden(usize),
    /// Puzzle readouts
    PuzzleHud {
        score: u64,
        chains: u32,
        max_chains: u32,
        combo: u32,
    },

    /// Bucket left edge in playfield px
    Bucket { x: f32 },
    /// Add a falling drop that crosses the playfield in `fall_secs`
    SpawnDrop { id: DropId, x: f32, fall_secs: f32 },
    RemoveDrop(DropId),
    /// Catch readouts
    CatchHud { score: u32, missed: u32 },
    Timer { seconds: u32 },

    PlayCue(Cue),
    /// Blocking summary dialog
    Notify(String),

    /// Run `task` after `delay_ms`; consumed by the session, never presented
    Schedule { delay_ms: u64, task: Task },
}

impl Effect {
    pub fn schedule(delay_ms: u64, task: impl Into<Task>) -> Self {
        Effect::Schedule {
            delay_ms,
            task: task.into(),
        }
    }
}
