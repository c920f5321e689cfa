//! Game configuration
//!
//! Timings and geometry for both modes plus audio levels. Defaults match the
//! shipped game; a page can override any subset through an inline JSON block.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Puzzle mode tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    /// Chains needed to win
    pub max_chains: u32,
    /// Points for a chain at combo 0
    pub chain_base_points: u64,
    /// Delay before a consumed tile is fully hidden
    pub tile_vanish_ms: u64,
    /// Delay between chain completion and the next chain (or the win)
    pub chain_settle_ms: u64,
    /// Delay between the win cue and the summary
    pub win_summary_ms: u64,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            max_chains: MAX_CHAINS,
            chain_base_points: CHAIN_BASE_POINTS,
            tile_vanish_ms: TILE_VANISH_MS,
            chain_settle_ms: CHAIN_SETTLE_MS,
            win_summary_ms: WIN_SUMMARY_MS,
        }
    }
}

/// Catch mode tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatchConfig {
    pub duration_secs: u32,
    pub spawn_period_ms: u64,
    pub countdown_period_ms: u64,
    pub summary_ms: u64,
    /// Fall duration range in seconds, [min, max)
    pub fall_min_secs: f32,
    pub fall_max_secs: f32,
    pub bucket_width: f32,
    pub drop_width: f32,
    /// Playfield width used until the shell measures the real one
    pub playfield_width: f32,
}

impl Default for CatchConfig {
    fn default() -> Self {
        Self {
            duration_secs: CATCH_DURATION_SECS,
            spawn_period_ms: SPAWN_PERIOD_MS,
            countdown_period_ms: COUNTDOWN_PERIOD_MS,
            summary_ms: CATCH_SUMMARY_MS,
            fall_min_secs: FALL_MIN_SECS,
            fall_max_secs: FALL_MAX_SECS,
            bucket_width: BUCKET_WIDTH,
            drop_width: DROP_WIDTH,
            playfield_width: PLAYFIELD_WIDTH,
        }
    }
}

/// Audio levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Cue volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            sfx_volume: 1.0,
            muted: false,
        }
    }
}

/// Complete game configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub puzzle: PuzzleConfig,
    pub catch: CatchConfig,
    pub audio: AudioConfig,
}

impl GameConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::sanitized)
    }

    /// Repair values that would break the game rules
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        // The board only holds enough tiles for MAX_CHAINS chains
        if self.puzzle.max_chains == 0 {
            self.puzzle.max_chains = defaults.puzzle.max_chains;
        }
        self.puzzle.max_chains = self.puzzle.max_chains.min(MAX_CHAINS);

        let c = &mut self.catch;
        if c.duration_secs == 0 {
            c.duration_secs = defaults.catch.duration_secs;
        }
        if c.spawn_period_ms == 0 {
            c.spawn_period_ms = defaults.catch.spawn_period_ms;
        }
        if c.countdown_period_ms == 0 {
            c.countdown_period_ms = defaults.catch.countdown_period_ms;
        }
        if !(c.fall_min_secs.is_finite() && c.fall_max_secs.is_finite())
            || c.fall_min_secs <= 0.0
            || c.fall_max_secs <= c.fall_min_secs
        {
            c.fall_min_secs = defaults.catch.fall_min_secs;
            c.fall_max_secs = defaults.catch.fall_max_secs;
        }
        if !(c.bucket_width.is_finite() && c.bucket_width > 0.0) {
            c.bucket_width = defaults.catch.bucket_width;
        }
        if !(c.drop_width.is_finite() && c.drop_width > 0.0) {
            c.drop_width = defaults.catch.drop_width;
        }
        if !c.playfield_width.is_finite() || c.playfield_width < c.bucket_width.max(c.drop_width) {
            c.playfield_width = defaults.catch.playfield_width;
        }

        let a = &mut self.audio;
        a.master_volume = a.master_volume.clamp(0.0, 1.0);
        a.sfx_volume = a.sfx_volume.clamp(0.0, 1.0);

        self
    }

    /// Element id of the inline JSON config block
    #[allow(dead_code)]
    const ELEMENT_ID: &'static str = "game-config";

    /// Environment variable naming a JSON config file (native only)
    #[allow(dead_code)]
    const ENV_PATH: &'static str = "DROP_BY_DROP_CONFIG";

    /// Load config from the page's inline JSON block (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let text = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(Self::ELEMENT_ID))
            .and_then(|el| el.text_content());

        match text {
            Some(json) if !json.trim().is_empty() => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded game config from #{}", Self::ELEMENT_ID);
                    config
                }
                Err(e) => {
                    log::warn!("Invalid game config ({}), using defaults", e);
                    Self::default()
                }
            },
            _ => {
                log::info!("Using default game config");
                Self::default()
            }
        }
    }

    /// Load config from the file named by `DROP_BY_DROP_CONFIG` (native only)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var(Self::ENV_PATH) else {
            log::info!("Using default game config");
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded game config from {}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Invalid game config in {} ({}), using defaults", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Cannot read {} ({}), using defaults", path, e);
                Self::default()
            }
        }
    }
}
