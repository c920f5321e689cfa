//! Deterministic game logic
//!
//! All gameplay rules live here. This module must stay pure and deterministic:
//! - Virtual time only (the timeline), never wall clocks
//! - Seeded RNG only
//! - Stable iteration order (by tile index / drop id)
//! - No DOM, audio or platform dependencies: side effects are returned as `Effect`s

pub mod catch;
pub mod effects;
pub mod puzzle;
pub mod session;
pub mod timeline;

pub use catch::{CatchPhase, CatchState, DropId, FallingDrop};
pub use effects::{CatchTask, Effect, Mode, PuzzleTask, Task};
pub use puzzle::{EXPECTED_SEQUENCE, PuzzleState, TILE_SET, Tile, TileKind};
pub use session::Session;
pub use timeline::{Scheduled, Timeline};
