//! Drop by Drop - a clean water casual game
//!
//! Core modules:
//! - `sim`: Deterministic game logic (puzzle chains, drop catching, session lifecycle)
//! - `audio`: Synthesized cue tables and the Web Audio player
//! - `config`: Data-driven timings and geometry

pub mod audio;
pub mod config;
pub mod sim;

pub use audio::{Cue, Tone, Waveform};
pub use config::{AudioConfig, CatchConfig, GameConfig, PuzzleConfig};

/// Game configuration constants
pub mod consts {
    /// Number of tiles on the puzzle board (4x4 grid)
    pub const TILE_COUNT: usize = 16;
    /// Length of one Source -> Filter -> Tap chain
    pub const CHAIN_LENGTH: usize = 3;
    /// Chains needed to win a puzzle round
    pub const MAX_CHAINS: u32 = 3;
    /// Base points per chain (multiplied by combo + 1)
    pub const CHAIN_BASE_POINTS: u64 = 100;

    /// Puzzle delays (ms)
    pub const TILE_VANISH_MS: u64 = 300;
    pub const CHAIN_SETTLE_MS: u64 = 500;
    pub const WIN_SUMMARY_MS: u64 = 300;

    /// Catch round length in seconds
    pub const CATCH_DURATION_SECS: u32 = 30;
    /// Periodic timers (ms)
    pub const SPAWN_PERIOD_MS: u64 = 400;
    pub const COUNTDOWN_PERIOD_MS: u64 = 1000;
    pub const CATCH_SUMMARY_MS: u64 = 500;

    /// Fall duration range in seconds, [min, max)
    pub const FALL_MIN_SECS: f32 = 2.0;
    pub const FALL_MAX_SECS: f32 = 3.5;

    /// Playfield geometry (px)
    pub const PLAYFIELD_WIDTH: f32 = 420.0;
    pub const BUCKET_WIDTH: f32 = 60.0;
    pub const DROP_WIDTH: f32 = 20.0;
}

/// Round a percentage the way the scoreboard shows it (half away from zero)
#[inline]
pub fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

/// Seconds to whole milliseconds for the timeline
#[inline]
pub fn secs_to_ms(secs: f32) -> u64 {
    (secs.max(0.0) as f64 * 1000.0).round() as u64
}
