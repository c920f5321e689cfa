//! Puzzle mode: build water chains
//!
//! The board holds 16 shuffled tiles. The player clicks Source, then Filter,
//! then Tap to complete a chain. Correct clicks consume the tile for the rest
//! of the round; a wrong click only drops the partial chain and the combo.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::effects::{Effect, PuzzleTask};
use crate::audio::Cue;
use crate::config::PuzzleConfig;
use crate::consts::{CHAIN_LENGTH, TILE_COUNT};

/// Tile roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileKind {
    Source,
    Filter,
    Tap,
    Empty,
}

impl TileKind {
    pub fn label(&self) -> &'static str {
        match self {
            TileKind::Source => "Source",
            TileKind::Filter => "Filter",
            TileKind::Tap => "Tap",
            TileKind::Empty => "Empty",
        }
    }

    /// Image asset and alt text for tiles drawn with an icon
    pub fn icon(&self) -> Option<(&'static str, &'static str)> {
        match self {
            TileKind::Source => Some(("assets/jerry_can_yellow.png", "Water source")),
            TileKind::Tap => Some(("assets/jerry_can_black.png", "Clean water tap")),
            TileKind::Filter | TileKind::Empty => None,
        }
    }

    /// Text badge for tiles drawn without an icon
    pub fn badge(&self) -> Option<&'static str> {
        match self {
            TileKind::Filter => Some("FILTER"),
            _ => None,
        }
    }

    /// CSS hook (`data-special`)
    pub fn special(&self) -> &'static str {
        match self {
            TileKind::Source => "source",
            TileKind::Filter => "filter",
            TileKind::Tap => "tap",
            TileKind::Empty => "",
        }
    }
}

/// The order every chain must follow
pub const EXPECTED_SEQUENCE: [TileKind; CHAIN_LENGTH] =
    [TileKind::Source, TileKind::Filter, TileKind::Tap];

/// Tiles dealt each round, before shuffling
pub const TILE_SET: [TileKind; TILE_COUNT] = {
    use TileKind::*;
    [
        Source, Filter, Tap, Empty, //
        Source, Filter, Tap, Empty, //
        Empty, Source, Filter, Tap, //
        Empty, Empty, Empty, Empty,
    ]
};

/// A board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub index: usize,
    pub kind: TileKind,
    /// Used in a chain; never clickable again this round
    pub consumed: bool,
    /// Still on the board (false once the vanish transition ends)
    pub visible: bool,
}

/// Complete puzzle state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleState {
    /// Bumped on every deal/reset; stale timeline entries are ignored
    pub generation: u32,
    pub tiles: Vec<Tile>,
    /// Kinds clicked so far in the current chain
    pub progress: Vec<TileKind>,
    /// Board indices consumed this round
    pub used_tiles: BTreeSet<usize>,
    pub score: u64,
    pub chains_completed: u32,
    /// Chains completed since the last wrong click
    pub combo: u32,
    pub game_active: bool,
}

impl PuzzleState {
    /// Kind the next click must match, if a click would be processed
    pub fn expected_kind(&self) -> Option<TileKind> {
        EXPECTED_SEQUENCE.get(self.progress.len()).copied()
    }

    /// Indices of tiles that can still be clicked
    pub fn clickable_tiles(&self) -> impl Iterator<Item = usize> + '_ {
        self.tiles
            .iter()
            .filter(|t| t.visible && !t.consumed)
            .map(|t| t.index)
    }

    fn hud(&self, config: &PuzzleConfig) -> Effect {
        Effect::PuzzleHud {
            score: self.score,
            chains: self.chains_completed,
            max_chains: config.max_chains,
            combo: self.combo,
        }
    }
}

/// In-place Fisher-Yates: for i from last down to 1, swap with [0, i]
pub fn shuffle<T>(items: &mut [T], rng: &mut impl Rng) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Deal a freshly shuffled board
pub fn deal_tiles(rng: &mut impl Rng) -> Vec<Tile> {
    let mut kinds = TILE_SET;
    shuffle(&mut kinds, rng);
    kinds
        .into_iter()
        .enumerate()
        .map(|(index, kind)| Tile {
            index,
            kind,
            consumed: false,
            visible: true,
        })
        .collect()
}

/// Start a round: fresh shuffled board, zeroed counters
pub fn init(state: &mut PuzzleState, config: &PuzzleConfig, rng: &mut impl Rng) -> Vec<Effect> {
    *state = PuzzleState {
        generation: state.generation.wrapping_add(1),
        tiles: deal_tiles(rng),
        game_active: true,
        ..Default::default()
    };

    vec![
        Effect::RenderBoard {
            tiles: state.tiles.iter().map(|t| t.kind).collect(),
        },
        state.hud(config),
    ]
}

/// Discard the round without dealing a new board
pub fn reset(state: &mut PuzzleState) {
    *state = PuzzleState {
        generation: state.generation.wrapping_add(1),
        ..Default::default()
    };
}

/// Handle a click on board cell `index`
pub fn click_tile(state: &mut PuzzleState, config: &PuzzleConfig, index: usize) -> Vec<Effect> {
    if !state.game_active {
        return Vec::new();
    }
    let Some(tile) = state.tiles.get(index).copied() else {
        log::debug!("Click on missing tile {}", index);
        return Vec::new();
    };
    if !tile.visible || tile.consumed {
        return Vec::new();
    }
    // Chain full; waiting for the settle task
    let Some(expected) = state.expected_kind() else {
        return Vec::new();
    };

    if tile.kind != expected {
        // Wrong step: retry from the start of the chain, combo lost
        state.progress.clear();
        state.combo = 0;
        return vec![state.hud(config)];
    }

    state.progress.push(tile.kind);
    state.used_tiles.insert(index);
    state.tiles[index].consumed = true;

    let mut effects = vec![
        Effect::TileVanishing(index),
        Effect::schedule(config.tile_vanish_ms, PuzzleTask::HideTile(index)),
    ];

    if state.progress.len() == CHAIN_LENGTH {
        complete_chain(state, config, &mut effects);
    }

    effects
}

fn complete_chain(state: &mut PuzzleState, config: &PuzzleConfig, effects: &mut Vec<Effect>) {
    let points = config.chain_base_points * (state.combo as u64 + 1);
    state.score += points;
    state.combo += 1;
    state.chains_completed += 1;

    log::info!(
        "Chain {} complete: +{} (combo {}x, score {})",
        state.chains_completed,
        points,
        state.combo,
        state.score
    );

    effects.push(Effect::PlayCue(Cue::ChainSuccess));
    effects.push(state.hud(config));
    effects.push(Effect::schedule(config.chain_settle_ms, PuzzleTask::SettleChain));
}

/// Run a deferred puzzle task
pub fn run_task(
    state: &mut PuzzleState,
    config: &PuzzleConfig,
    rng: &mut impl Rng,
    task: PuzzleTask,
) -> Vec<Effect> {
    match task {
        PuzzleTask::HideTile(index) => match state.tiles.get_mut(index) {
            Some(tile) if tile.visible => {
                tile.visible = false;
                vec![Effect::TileHidden(index)]
            }
            _ => Vec::new(),
        },

        PuzzleTask::SettleChain => {
            if state.chains_completed >= config.max_chains {
                win(state, config)
            } else {
                // Next chain: combo, score and consumed tiles carry over
                state.progress.clear();
                vec![state.hud(config)]
            }
        }

        PuzzleTask::ShowWinSummary => {
            let mut effects = vec![Effect::Notify(win_summary(state, config))];
            effects.extend(init(state, config, rng));
            effects
        }
    }
}

fn win(state: &mut PuzzleState, config: &PuzzleConfig) -> Vec<Effect> {
    state.game_active = false;
    log::info!(
        "Puzzle won: score {}, best combo {}x",
        state.score,
        state.combo
    );
    vec![
        Effect::PlayCue(Cue::Win),
        Effect::schedule(config.win_summary_ms, PuzzleTask::ShowWinSummary),
    ]
}

/// Chains readout, e.g. "2/3"
pub fn chains_label(chains: u32, max_chains: u32) -> String {
    format!("{}/{}", chains, max_chains)
}

/// Combo readout, e.g. "0x", "3x"
pub fn combo_label(combo: u32) -> String {
    format!("{}x", combo)
}

/// Text of the win dialog
pub fn win_summary(state: &PuzzleState, config: &PuzzleConfig) -> String {
    format!(
        "🎉 YOU WIN! 🎉\n\n\
         Final Score: {}\n\
         Chains: {}\n\
         Best Combo: {}\n\n\
         Clean water delivered! 💧\n\
         771 million people still need access.\n\
         Learn more at charitywater.org",
        state.score,
        chains_label(state.chains_completed, config.max_chains),
        combo_label(state.combo),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn started(seed: u64) -> (PuzzleState, PuzzleConfig) {
        let config = PuzzleConfig::default();
        let mut state = PuzzleState::default();
        init(&mut state, &config, &mut Pcg32::seed_from_u64(seed));
        (state, config)
    }

    fn find(state: &PuzzleState, kind: TileKind) -> usize {
        state
            .tiles
            .iter()
            .find(|t| t.kind == kind && !t.consumed && t.visible)
            .map(|t| t.index)
            .unwrap()
    }

    fn settle(state: &mut PuzzleState, config: &PuzzleConfig) -> Vec<Effect> {
        run_task(state, config, &mut Pcg32::seed_from_u64(0), PuzzleTask::SettleChain)
    }

    #[test]
    fn test_tile_set_counts() {
        let count = |k| TILE_SET.iter().filter(|&&t| t == k).count();
        assert_eq!(count(TileKind::Source), 3);
        assert_eq!(count(TileKind::Filter), 3);
        assert_eq!(count(TileKind::Tap), 3);
        assert_eq!(count(TileKind::Empty), 7);
    }

    #[test]
    fn test_init_deals_board() {
        let (state, _) = started(12345);
        assert!(state.game_active);
        assert_eq!(state.tiles.len(), TILE_COUNT);
        assert!(state.tiles.iter().enumerate().all(|(i, t)| t.index == i));
        assert!(state.tiles.iter().all(|t| t.visible && !t.consumed));

        let mut kinds: Vec<_> = state.tiles.iter().map(|t| t.kind).collect();
        let mut expected = TILE_SET.to_vec();
        kinds.sort();
        expected.sort();
        assert_eq!(kinds, expected);
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        let (a, _) = started(7);
        let (b, _) = started(7);
        assert_eq!(a.tiles, b.tiles);
    }

    #[test]
    fn test_correct_click_consumes_tile() {
        let (mut state, config) = started(1);
        let source = find(&state, TileKind::Source);

        let effects = click_tile(&mut state, &config, source);
        assert_eq!(state.progress, vec![TileKind::Source]);
        assert!(state.tiles[source].consumed);
        assert!(state.used_tiles.contains(&source));
        assert_eq!(effects[0], Effect::TileVanishing(source));
        assert_eq!(
            effects[1],
            Effect::schedule(config.tile_vanish_ms, PuzzleTask::HideTile(source))
        );

        // Consumed tiles ignore further clicks even before they vanish
        assert!(click_tile(&mut state, &config, source).is_empty());
        assert_eq!(state.progress.len(), 1);
    }

    #[test]
    fn test_wrong_click_resets_progress_and_combo() {
        let (mut state, config) = started(2);
        state.combo = 2;
        let source = find(&state, TileKind::Source);
        let tap = find(&state, TileKind::Tap);

        click_tile(&mut state, &config, source);
        let effects = click_tile(&mut state, &config, tap);

        assert!(state.progress.is_empty());
        assert_eq!(state.combo, 0);
        assert!(!state.tiles[tap].consumed);
        assert!(state.tiles[tap].visible);
        assert!(state.tiles[source].consumed);
        assert!(matches!(effects.as_slice(), [Effect::PuzzleHud { combo: 0, .. }]));
    }

    #[test]
    fn test_empty_never_matches() {
        let (mut state, config) = started(3);
        let empty = find(&state, TileKind::Empty);
        click_tile(&mut state, &config, empty);
        assert!(state.progress.is_empty());
        assert!(!state.tiles[empty].consumed);
    }

    #[test]
    fn test_out_of_range_click_is_noop() {
        let (mut state, config) = started(4);
        assert!(click_tile(&mut state, &config, TILE_COUNT).is_empty());
        assert!(click_tile(&mut state, &config, usize::MAX).is_empty());
    }

    #[test]
    fn test_chain_completion_scores_and_blocks_clicks() {
        let (mut state, config) = started(5);
        for kind in EXPECTED_SEQUENCE {
            let idx = find(&state, kind);
            click_tile(&mut state, &config, idx);
        }
        assert_eq!(state.score, 100);
        assert_eq!(state.combo, 1);
        assert_eq!(state.chains_completed, 1);
        assert_eq!(state.progress.len(), CHAIN_LENGTH);

        // Full chain: nothing is processed until it settles
        let source = find(&state, TileKind::Source);
        assert!(click_tile(&mut state, &config, source).is_empty());

        let effects = settle(&mut state, &config);
        assert!(state.progress.is_empty());
        assert_eq!(state.combo, 1);
        assert!(matches!(effects.as_slice(), [Effect::PuzzleHud { .. }]));
    }

    #[test]
    fn test_win_after_max_chains() {
        let (mut state, config) = started(6);
        for chain in 1..=3u32 {
            for kind in EXPECTED_SEQUENCE {
                let idx = find(&state, kind);
                click_tile(&mut state, &config, idx);
            }
            let effects = settle(&mut state, &config);
            if chain < 3 {
                assert!(state.game_active, "no win at {} chains", chain);
            } else {
                assert!(!state.game_active);
                assert_eq!(effects[0], Effect::PlayCue(Cue::Win));
            }
        }
        assert_eq!(state.score, 600);
        assert_eq!(state.combo, 3);

        let generation = state.generation;
        let effects = run_task(
            &mut state,
            &config,
            &mut Pcg32::seed_from_u64(9),
            PuzzleTask::ShowWinSummary,
        );
        let Effect::Notify(text) = &effects[0] else {
            panic!("expected summary first, got {:?}", effects[0]);
        };
        assert!(text.contains("Final Score: 600"));
        assert!(text.contains("Chains: 3/3"));
        assert!(text.contains("Best Combo: 3x"));

        // Fresh board in place
        assert!(matches!(effects[1], Effect::RenderBoard { .. }));
        assert!(state.game_active);
        assert_eq!(state.score, 0);
        assert_eq!(state.generation, generation + 1);
    }

    #[test]
    fn test_clickable_tiles_skip_consumed_and_hidden() {
        let (mut state, config) = started(11);
        assert_eq!(state.clickable_tiles().count(), TILE_COUNT);

        let source = find(&state, TileKind::Source);
        click_tile(&mut state, &config, source);
        run_task(
            &mut state,
            &config,
            &mut Pcg32::seed_from_u64(0),
            PuzzleTask::HideTile(source),
        );

        let clickable: Vec<_> = state.clickable_tiles().collect();
        assert_eq!(clickable.len(), TILE_COUNT - 1);
        assert!(!clickable.contains(&source));
    }

    #[test]
    fn test_hide_tile() {
        let (mut state, config) = started(8);
        let source = find(&state, TileKind::Source);
        click_tile(&mut state, &config, source);

        let mut rng = Pcg32::seed_from_u64(0);
        let effects = run_task(&mut state, &config, &mut rng, PuzzleTask::HideTile(source));
        assert_eq!(effects, vec![Effect::TileHidden(source)]);
        assert!(!state.tiles[source].visible);
        // Second hide is a no-op
        assert!(run_task(&mut state, &config, &mut rng, PuzzleTask::HideTile(source)).is_empty());
    }

    #[test]
    fn test_reset_clears_board() {
        let (mut state, config) = started(10);
        let generation = state.generation;
        reset(&mut state);
        assert!(!state.game_active);
        assert!(state.tiles.is_empty());
        assert_eq!(state.generation, generation + 1);
        assert!(click_tile(&mut state, &config, 0).is_empty());
    }

    #[test]
    fn test_labels() {
        assert_eq!(chains_label(0, 3), "0/3");
        assert_eq!(combo_label(0), "0x");
        assert_eq!(combo_label(2), "2x");
        assert_eq!(TileKind::Source.icon().map(|i| i.0), Some("assets/jerry_can_yellow.png"));
        assert_eq!(TileKind::Filter.badge(), Some("FILTER"));
        assert_eq!(TileKind::Empty.special(), "");
    }
}
