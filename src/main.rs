//! Drop by Drop entry point
//!
//! Handles platform-specific initialization and drives the session clock.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, HtmlElement, MouseEvent, TouchEvent};

    use drop_by_drop::GameConfig;
    use drop_by_drop::audio::AudioManager;
    use drop_by_drop::sim::{Effect, Mode, Session, TileKind, puzzle};

    /// Game instance holding all state
    struct Game {
        session: Session,
        audio: AudioManager,
        document: Document,
        /// performance.now() at startup; session time is relative to it
        start_time: f64,
    }

    type SharedGame = Rc<RefCell<Game>>;

    pub fn run() -> Result<(), JsValue> {
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        console_error_panic_hook::set_once();
        log::info!("Drop by Drop starting...");

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let config = GameConfig::load();
        let seed = js_sys::Date::now() as u64;
        let start_time = window.performance().map(|p| p.now()).unwrap_or(0.0);
        let audio = AudioManager::new(&config.audio);

        let game = Rc::new(RefCell::new(Game {
            session: Session::new(seed, config),
            audio,
            document: document.clone(),
            start_time,
        }));
        log::info!("Game initialized with seed: {}", game.borrow().session.seed());

        setup_mode_buttons(&document, game.clone())?;
        setup_back_buttons(&document, game.clone())?;
        setup_pointer(&document, game.clone())?;

        let effects = game.borrow_mut().session.return_to_menu();
        apply(&game, effects);

        request_animation_frame(game);
        log::info!("Drop by Drop running!");
        Ok(())
    }

    // === Input ===

    fn setup_mode_buttons(document: &Document, game: SharedGame) -> Result<(), JsValue> {
        let buttons = document.query_selector_all("[data-mode]")?;
        for i in 0..buttons.length() {
            let Some(btn) = buttons.get(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let Some(mode) = btn.get_attribute("data-mode").and_then(|m| Mode::from_str(&m))
            else {
                log::warn!("Unknown data-mode on button {}", i);
                continue;
            };

            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let effects = game.borrow_mut().session.select_mode(Some(mode));
                apply(&game, effects);
                // The playfield has a size only once it is shown
                let effects = measure_playfield(&game);
                apply(&game, effects);
            });
            btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn setup_back_buttons(document: &Document, game: SharedGame) -> Result<(), JsValue> {
        let buttons = document.query_selector_all(".back-btn")?;
        for i in 0..buttons.length() {
            let Some(btn) = buttons.get(i) else { continue };
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let effects = game.borrow_mut().session.return_to_menu();
                apply(&game, effects);
            });
            btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    /// Mouse and touch both steer the bucket
    fn setup_pointer(document: &Document, game: SharedGame) -> Result<(), JsValue> {
        let Some(playfield) = document.get_element_by_id("catchGame") else {
            log::warn!("No #catchGame element - catch mode has no input");
            return Ok(());
        };

        // Mouse move
        {
            let game = game.clone();
            let field = playfield.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                pointer_at(&game, &field, event.client_x() as f64);
            });
            playfield
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Touch move
        {
            let field = playfield.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                if let Some(touch) = event.touches().get(0) {
                    event.prevent_default();
                    pointer_at(&game, &field, touch.client_x() as f64);
                }
            });
            playfield
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        Ok(())
    }

    fn pointer_at(game: &SharedGame, field: &Element, client_x: f64) {
        let rect = field.get_bounding_client_rect();
        let effects = {
            let mut g = game.borrow_mut();
            let mut effects = g.session.set_playfield_width(rect.width() as f32);
            effects.extend(g.session.pointer_move((client_x - rect.left()) as f32));
            effects
        };
        apply(game, effects);
    }

    /// Feed the rendered `#catchGame` width to the session while catch is up
    fn measure_playfield(game: &SharedGame) -> Vec<Effect> {
        let mut g = game.borrow_mut();
        if g.session.mode() != Some(Mode::Catch) {
            return Vec::new();
        }
        let Some(field) = g.document.get_element_by_id("catchGame") else {
            return Vec::new();
        };
        let width = field.get_bounding_client_rect().width() as f32;
        g.session.set_playfield_width(width)
    }

    // === Clock ===

    fn request_animation_frame(game: SharedGame) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: SharedGame, time: f64) {
        // Picks up resizes before any spawn this frame
        let mut effects = measure_playfield(&game);
        {
            let mut g = game.borrow_mut();
            let now = (time - g.start_time).max(0.0) as u64;
            effects.extend(g.session.advance(now));
        }
        apply(&game, effects);

        request_animation_frame(game);
    }

    // === Presenter ===

    fn apply(game: &SharedGame, effects: Vec<Effect>) {
        for effect in effects {
            if let Err(e) = apply_one(game, effect) {
                log::warn!("Render error: {:?}", e);
            }
        }
    }

    fn apply_one(game: &SharedGame, effect: Effect) -> Result<(), JsValue> {
        let document = game.borrow().document.clone();

        match effect {
            Effect::ShowMenu => {
                set_display(&document, "modeSelector", "grid")?;
                set_display(&document, "puzzleWrapper", "none")?;
                set_display(&document, "catchWrapper", "none")?;
            }
            Effect::ShowMode(mode) => {
                set_display(&document, "modeSelector", "none")?;
                let wrapper = match mode {
                    Mode::Puzzle => "puzzleWrapper",
                    Mode::Catch => "catchWrapper",
                };
                set_display(&document, wrapper, "block")?;
            }

            Effect::RenderBoard { tiles } => render_board(game, &document, &tiles)?,
            Effect::TileVanishing(index) => {
                if let Some(tile) = document.get_element_by_id(&tile_id(index)) {
                    tile.class_list().add_1("disappearing")?;
                }
            }
            Effect::TileHidden(index) => {
                set_display(&document, &tile_id(index), "none")?;
            }
            Effect::PuzzleHud {
                score,
                chains,
                max_chains,
                combo,
            } => {
                set_text(&document, "puzzleScore", &score.to_string());
                set_text(&document, "puzzleChains", &puzzle::chains_label(chains, max_chains));
                set_text(&document, "puzzleCombo", &puzzle::combo_label(combo));
            }

            Effect::Bucket { x } => {
                if let Some(bucket) = html_element(&document, "bucket")? {
                    bucket.style().set_property("left", &format!("{}px", x))?;
                }
            }
            Effect::SpawnDrop { id, x, fall_secs } => {
                let Some(field) = document.get_element_by_id("catchGame") else {
                    return Ok(());
                };
                let el = document
                    .create_element("div")?
                    .dyn_into::<HtmlElement>()
                    .map_err(JsValue::from)?;
                el.set_id(&drop_id(id));
                el.set_class_name("catch-drop");
                el.set_text_content(Some("💧"));
                let style = el.style();
                style.set_property("left", &format!("{}px", x))?;
                style.set_property("top", "0px")?;
                style.set_property("animation-duration", &format!("{}s", fall_secs))?;
                field.append_child(&el)?;
            }
            Effect::RemoveDrop(id) => {
                if let Some(el) = document.get_element_by_id(&drop_id(id)) {
                    el.remove();
                }
            }
            Effect::CatchHud { score, missed } => {
                set_text(&document, "catchScore", &score.to_string());
                set_text(&document, "catchMissed", &missed.to_string());
            }
            Effect::Timer { seconds } => {
                set_text(&document, "catchTimer", &seconds.to_string());
            }

            Effect::PlayCue(cue) => game.borrow().audio.play(cue),
            Effect::Notify(text) => {
                if let Some(window) = web_sys::window() {
                    window.alert_with_message(&text)?;
                }
            }

            // Absorbed by the session; never reaches the presenter
            Effect::Schedule { .. } => {}
        }
        Ok(())
    }

    fn render_board(game: &SharedGame, document: &Document, tiles: &[TileKind]) -> Result<(), JsValue> {
        let Some(board) = document.get_element_by_id("gameBoard") else {
            log::warn!("No #gameBoard element");
            return Ok(());
        };
        board.set_inner_html("");

        for (index, kind) in tiles.iter().enumerate() {
            let tile = document.create_element("div")?;
            tile.set_id(&tile_id(index));
            tile.set_class_name("tile");
            tile.set_attribute("data-index", &index.to_string())?;
            tile.set_attribute("data-special", kind.special())?;

            let content = document.create_element("div")?;
            content.set_class_name("tile-content");

            if let Some((src, alt)) = kind.icon() {
                let img = document.create_element("img")?;
                img.set_attribute("src", src)?;
                img.set_attribute("alt", alt)?;
                img.set_class_name("icon");
                content.append_child(&img)?;
            } else if let Some(badge) = kind.badge() {
                let span = document.create_element("span")?;
                span.set_class_name("filter-label");
                span.set_text_content(Some(badge));
                content.append_child(&span)?;
            }

            let label = document.create_element("span")?;
            label.set_class_name("tile-label");
            label.set_text_content(Some(kind.label()));
            content.append_child(&label)?;
            tile.append_child(&content)?;

            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let effects = game.borrow_mut().session.click_tile(index);
                apply(&game, effects);
            });
            tile.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();

            board.append_child(&tile)?;
        }
        Ok(())
    }

    // === DOM helpers ===

    fn tile_id(index: usize) -> String {
        format!("tile-{}", index)
    }

    fn drop_id(id: u32) -> String {
        format!("drop-{}", id)
    }

    fn html_element(document: &Document, id: &str) -> Result<Option<HtmlElement>, JsValue> {
        document
            .get_element_by_id(id)
            .map(|el| el.dyn_into::<HtmlElement>().map_err(JsValue::from))
            .transpose()
    }

    fn set_display(document: &Document, id: &str, display: &str) -> Result<(), JsValue> {
        if let Some(el) = html_element(document, id)? {
            el.style().set_property("display", display)?;
        }
        Ok(())
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    //! Headless scripted play-through of both modes

    use std::collections::BTreeMap;

    use drop_by_drop::GameConfig;
    use drop_by_drop::sim::{DropId, Effect, Mode, Session};

    /// Solve the puzzle chain by chain until the win summary appears
    pub fn play_puzzle(seed: u64, config: &GameConfig) -> Option<String> {
        let mut session = Session::new(seed, config.clone());
        session.select_mode(Some(Mode::Puzzle));

        // Generous bound: three chains plus settle/summary delays
        for _ in 0..64 {
            let puzzle = session.puzzle();
            let next = puzzle.expected_kind().and_then(|kind| {
                puzzle
                    .clickable_tiles()
                    .find(|&i| puzzle.tiles[i].kind == kind)
            });

            let effects = match next {
                Some(index) => {
                    let mut effects = session.click_tile(index);
                    effects.extend(session.advance_by(100));
                    effects
                }
                None => session.advance_by(100),
            };

            if let Some(summary) = first_notice(&effects) {
                return Some(summary);
            }
        }
        log::warn!("Puzzle demo did not finish");
        None
    }

    /// Play one catch round, chasing whichever drop lands next
    pub fn play_catch(seed: u64, config: &GameConfig) -> Option<String> {
        let mut session = Session::new(seed, config.clone());
        let mut falling: BTreeMap<DropId, (u64, f32)> = BTreeMap::new();
        let half_drop = session.config().catch.drop_width / 2.0;

        let mut effects = session.select_mode(Some(Mode::Catch));
        while session.mode() == Some(Mode::Catch) {
            for effect in &effects {
                match *effect {
                    Effect::SpawnDrop { id, x, fall_secs } => {
                        let lands = session.now_ms() + drop_by_drop::secs_to_ms(fall_secs);
                        falling.insert(id, (lands, x));
                    }
                    Effect::RemoveDrop(id) => {
                        falling.remove(&id);
                    }
                    _ => {}
                }
            }
            if let Some(summary) = first_notice(&effects) {
                return Some(summary);
            }

            if let Some(&(_, x)) = falling.values().min_by_key(|(lands, _)| *lands) {
                session.pointer_move(x + half_drop);
            }
            effects = session.advance_by(50);
        }
        first_notice(&effects)
    }

    fn first_notice(effects: &[Effect]) -> Option<String> {
        effects.iter().find_map(|e| match e {
            Effect::Notify(text) => Some(text.clone()),
            _ => None,
        })
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    if let Err(e) = wasm_game::run() {
        log::error!("Failed to start: {:?}", e);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use drop_by_drop::GameConfig;

    env_logger::init();
    log::info!("Drop by Drop (native) starting...");
    log::info!("The real game runs in the browser (`trunk serve`); playing a headless demo");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2024);
    let config = GameConfig::load();
    log::info!("Demo seed: {}", seed);

    match demo::play_puzzle(seed, &config) {
        Some(summary) => println!("--- Puzzle ---\n{}\n", summary),
        None => println!("--- Puzzle ---\n(no result)\n"),
    }
    match demo::play_catch(seed, &config) {
        Some(summary) => println!("--- Catch ---\n{}", summary),
        None => println!("--- Catch ---\n(no result)"),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
