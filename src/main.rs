/// Entry point and host loop.
///
/// One thread, one `tokio::select!`. Every branch ends in a synchronous
/// call, so the session state never changes under a half-finished step:
///   - engine initialization completing
///   - engine callbacks (score / game over)
///   - leaderboard fetches
///   - the prompt animation timer (only while the prompt is shown)
///   - the frame tick: keyboard + gamepad, then redraw

mod config;
mod engine;
mod leaderboard;
mod logging;
mod options;
mod session;
mod ui;

use std::future;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::task::LocalSet;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use config::AppConfig;
use engine::process::ProcessEngine;
use engine::{Engine, EngineError, InitFuture};
use leaderboard::{source_from_location, FetchFuture, Leaderboard, LeaderboardSource};
use options::{FileStore, KeyValueStore, MemoryStore, OptionsStore};
use session::{GameState, Intent, SessionController, SessionEvent};
use ui::gamepad::GamepadState;
use ui::input::{InputState, UiAction};
use ui::panel::SettingsPanel;
use ui::prompt::PromptText;
use ui::renderer::{RenderView, Renderer};
use ui::sound::SoundEngine;

fn main() {
    let config = AppConfig::load();

    let log_path = match logging::init(&config.data_dir, &config.log_filter) {
        Ok(path) => Some(path),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    };
    info!(data_dir = %config.data_dir.display(), "starting");

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Runtime init failed: {e}");
            return;
        }
    };

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let local = LocalSet::new();
    let result = local.block_on(&runtime, host_loop(&config, &mut renderer));

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    match result {
        Ok(last) => {
            info!(state = last.label(), "exiting");
            println!();
            println!("Thanks for playing Snake!");
            if let Some(score) = last.score() {
                println!("Final Score: {score}");
            }
        }
        Err(e) => {
            tracing::error!("host loop failed: {e:#}");
            eprintln!("Error: {e:#}");
        }
    }
    if let Some(path) = log_path {
        println!("Log: {}", path.display());
    }
}

// ── Prompt overlay ──

/// Lives exactly as long as the start / game-over prompt is on screen.
struct Overlay {
    prompt: PromptText,
    timer: Interval,
}

impl Overlay {
    fn mount(tick: Duration) -> Self {
        Overlay {
            prompt: PromptText::new(),
            timer: interval_at(Instant::now() + tick, tick),
        }
    }
}

// ── Host loop ──

async fn host_loop(config: &AppConfig, renderer: &mut Renderer) -> anyhow::Result<GameState> {
    let storage: Box<dyn KeyValueStore> = if config.persist_settings {
        Box::new(FileStore::new(&config.data_dir))
    } else {
        Box::new(MemoryStore::new())
    };
    let engine = ProcessEngine::new(config.engine.clone());
    let (mut controller, mut engine_events) =
        SessionController::new(engine, OptionsStore::new(storage));

    let source: Option<Rc<dyn LeaderboardSource>> =
        match source_from_location(&config.leaderboard.location, config.leaderboard.timeout) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!(error = %e, "leaderboard unavailable, showing built-in list");
                None
            }
        };

    let mut keyboard = InputState::new();
    let mut gamepad = GamepadState::new(&config.gamepad);
    let sound = SoundEngine::new();
    let mut panel = SettingsPanel::new();
    let mut board = Leaderboard::seeded();
    let mut overlay: Option<Overlay> = None;
    let mut fetches: FuturesUnordered<FetchFuture> = FuturesUnordered::new();
    let mut init: Option<InitFuture> = None;

    let mut frame = interval(config.ui.frame);
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

    controller.mount();

    loop {
        if init.is_none() {
            init = controller.take_pending_init();
        }

        // Mount / unmount the prompt overlay with the state.
        match (overlay.is_some(), controller.state().shows_prompt()) {
            (false, true) => {
                overlay = Some(Overlay::mount(config.ui.prompt_tick));
                if let Some(source) = &source {
                    fetches.push(leaderboard::fetch(source.clone()));
                }
                debug!("prompt overlay mounted");
            }
            (true, false) => {
                // Any fetch still in flight keeps running.
                overlay = None;
                debug!("prompt overlay unmounted");
            }
            _ => {}
        }

        tokio::select! {
            result = await_init(&mut init) => {
                init = None;
                dispatch(&mut controller, SessionEvent::Initialized(result), sound.as_ref());
            }
            Some(event) = engine_events.recv() => {
                dispatch(&mut controller, SessionEvent::Engine(event), sound.as_ref());
            }
            Some(result) = fetches.next(), if !fetches.is_empty() => {
                board.apply(result);
            }
            _ = prompt_tick(&mut overlay) => {
                if let Some(o) = overlay.as_mut() {
                    o.prompt.tick();
                }
            }
            _ = frame.tick() => {
                let panel_open = matches!(controller.state(), GameState::Settings { .. });
                let mut actions = keyboard.drain_events(panel_open).to_vec();
                actions.extend_from_slice(gamepad.update(panel_open));

                let mut quit = false;
                for action in actions {
                    quit |= route(action, &mut controller, &mut panel, sound.as_ref());
                }
                if quit {
                    info!(running = controller.state().is_running(), "quit requested");
                    break;
                }

                let idle_prompt = PromptText::new();
                let view = RenderView {
                    state: controller.state(),
                    options: controller.options(),
                    panel: &panel,
                    prompt: overlay.as_ref().map_or(&idle_prompt, |o| &o.prompt),
                    leaderboard: &board,
                    gamepad: gamepad.connected,
                };
                renderer.render(&view).context("drawing frame")?;
            }
        }
    }

    controller.unmount();
    Ok(controller.state().clone())
}

async fn await_init(init: &mut Option<InitFuture>) -> Result<(), EngineError> {
    match init {
        Some(fut) => fut.await,
        None => future::pending().await,
    }
}

async fn prompt_tick(overlay: &mut Option<Overlay>) {
    match overlay {
        Some(o) => {
            o.timer.tick().await;
        }
        None => future::pending().await,
    }
}

/// Apply one UI action. Returns true on quit.
fn route<E: Engine>(
    action: UiAction,
    controller: &mut SessionController<E>,
    panel: &mut SettingsPanel,
    sound: Option<&SoundEngine>,
) -> bool {
    let panel_open = matches!(controller.state(), GameState::Settings { .. });
    let intent = match action {
        UiAction::Quit => return true,
        UiAction::Start => Some(Intent::Start),
        UiAction::ToggleSettings => Some(Intent::ToggleSettings),
        UiAction::CloseSettings if panel_open => Some(Intent::ToggleSettings),
        UiAction::PanelUp if panel_open => {
            panel.move_up();
            None
        }
        UiAction::PanelDown if panel_open => {
            panel.move_down();
            None
        }
        UiAction::PanelLeft if panel_open => panel.adjust(controller.options(), -1).map(Intent::ChangeOptions),
        UiAction::PanelRight if panel_open => panel.adjust(controller.options(), 1).map(Intent::ChangeOptions),
        _ => None,
    };
    if let Some(intent) = intent {
        dispatch(controller, SessionEvent::Intent(intent), sound);
    }
    false
}

/// Feed one event to the controller and play the cue for the resulting edge.
fn dispatch<E: Engine>(
    controller: &mut SessionController<E>,
    event: SessionEvent,
    sound: Option<&SoundEngine>,
) {
    let before = controller.state().clone();
    controller.handle(event);
    if let Some(sfx) = sound {
        play_cue(sfx, &before, controller.state());
    }
}

fn play_cue(sfx: &SoundEngine, before: &GameState, after: &GameState) {
    match (before, after) {
        (GameState::StartPrompt | GameState::GameOver { .. }, GameState::Playing { .. }) => {
            sfx.play_start()
        }
        (GameState::Playing { score: a }, GameState::Playing { score: b }) if b > a => {
            sfx.play_score()
        }
        (GameState::Playing { .. }, GameState::GameOver { .. }) => sfx.play_game_over(),
        _ => {}
    }
}
