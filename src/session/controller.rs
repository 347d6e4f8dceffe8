/// Session controller: the state machine between user intents, engine
/// callbacks and the engine adapter.
///
/// Every input arrives as a `SessionEvent` and goes through `handle()`, which
/// replaces the state in one step and issues at most one engine call per
/// edge. The host loop owns the asynchronous parts: it awaits the future
/// parked by `mount()` (see `take_pending_init`) and feeds the result back in
/// as `SessionEvent::Initialized`.
///
///   Loading ──ready──▶ StartPrompt ──Start──▶ Playing(0)
///      │                                      │  ▲   │
///    failed                          ToggleSettings  GameOver
///      ▼                                      ▼  │   ▼
///   InitFailed ──Start (retry)──▶ Loading   Settings  GameOver ──Start──▶ Playing(0)
///
/// An engine exit after initialization moves any ready state to InitFailed.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::GameState;
use crate::engine::{Engine, EngineError, EngineEvent, EngineHooks, InitFuture};
use crate::options::{GameOptions, OptionsPatch, OptionsStore};

/// A normalized user action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Start,
    ToggleSettings,
    ChangeOptions(OptionsPatch),
}

#[derive(Debug)]
pub enum SessionEvent {
    Initialized(Result<(), EngineError>),
    Intent(Intent),
    Engine(EngineEvent),
}

pub struct SessionController<E: Engine> {
    engine: E,
    store: OptionsStore,
    options: GameOptions,
    state: GameState,
    hooks: EngineHooks,
    pending_init: Option<InitFuture>,
    mounted: bool,
}

impl<E: Engine> SessionController<E> {
    /// Build a controller around `engine`, loading options from `store`.
    /// The returned receiver carries the engine's callbacks and must be
    /// fed back through `handle`.
    pub fn new(engine: E, store: OptionsStore) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let options = store.load();
        let (hooks, events) = EngineHooks::channel();
        let controller = SessionController {
            engine,
            store,
            options,
            state: GameState::Loading,
            hooks,
            pending_init: None,
            mounted: false,
        };
        (controller, events)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    /// Enter `Loading` and start the one-time engine initialization.
    pub fn mount(&mut self) {
        if self.mounted {
            warn!("controller already mounted");
            return;
        }
        self.mounted = true;
        self.begin_initialize();
    }

    /// Initialization future requested by the last transition, if any.
    pub fn take_pending_init(&mut self) -> Option<InitFuture> {
        self.pending_init.take()
    }

    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.pending_init = None;

        // Settings already paused the run.
        let paused = matches!(self.state, GameState::Settings { .. });
        if self.state.engine_ready() && !paused {
            report("stop", self.engine.stop());
        }
        info!(state = self.state.label(), "session unmounted");
    }

    /// The transition function.
    pub fn handle(&mut self, event: SessionEvent) {
        if !self.mounted {
            debug!(?event, "controller not mounted, event ignored");
            return;
        }
        match event {
            SessionEvent::Initialized(result) => self.on_initialized(result),
            SessionEvent::Intent(Intent::Start) => self.on_start(),
            SessionEvent::Intent(Intent::ToggleSettings) => self.on_toggle_settings(),
            SessionEvent::Intent(Intent::ChangeOptions(patch)) => self.on_change_options(&patch),
            SessionEvent::Engine(EngineEvent::Score) => self.on_score(),
            SessionEvent::Engine(EngineEvent::GameOver) => self.on_game_over(),
            SessionEvent::Engine(EngineEvent::Exited) => self.on_engine_exited(),
        }
    }

    // ── Transitions ──

    fn transition(&mut self, next: GameState) {
        debug!(from = self.state.label(), to = next.label(), score = ?next.score(), "transition");
        self.state = next;
    }

    fn begin_initialize(&mut self) {
        self.transition(GameState::Loading);
        self.pending_init = Some(self.engine.initialize());
    }

    fn on_initialized(&mut self, result: Result<(), EngineError>) {
        if self.state != GameState::Loading {
            debug!(state = self.state.label(), "stale initialization result ignored");
            return;
        }
        let configured = result
            .and_then(|()| self.engine.configure(&self.options, self.hooks.clone()));
        match configured {
            Ok(()) => {
                info!(canvas = self.options.canvas_id(), "engine ready");
                self.transition(GameState::StartPrompt);
            }
            Err(e) => {
                error!(error = %e, "engine initialization failed");
                self.transition(GameState::InitFailed { reason: e.to_string() });
            }
        }
    }

    fn on_start(&mut self) {
        match self.state {
            GameState::StartPrompt | GameState::GameOver { .. } => {
                report("set_running", self.engine.set_running(true));
                self.transition(GameState::Playing { score: 0 });
            }
            GameState::InitFailed { .. } => {
                info!("retrying engine initialization");
                self.begin_initialize();
            }
            GameState::Playing { .. } => debug!("already playing"),
            GameState::Loading | GameState::Settings { .. } => {
                debug!(state = self.state.label(), "start ignored");
            }
        }
    }

    fn on_toggle_settings(&mut self) {
        match self.state {
            GameState::Playing { score } => {
                report("stop", self.engine.stop());
                self.transition(GameState::Settings { score });
            }
            GameState::Settings { score } => {
                report("set_running", self.engine.set_running(false));
                self.transition(GameState::Playing { score });
            }
            _ => debug!(state = self.state.label(), "settings toggle ignored"),
        }
    }

    fn on_change_options(&mut self, patch: &OptionsPatch) {
        let next = self.options.merged(patch);
        if next == self.options {
            debug!("options unchanged");
            return;
        }
        self.options = next;

        if let Err(e) = self.store.save(&self.options) {
            warn!(error = %e, "could not persist options");
        }
        if self.state.engine_ready() {
            report("apply_options", self.engine.apply_options(&self.options));
        } else {
            debug!("engine not ready, options go out with configure");
        }
    }

    fn on_score(&mut self) {
        match self.state {
            GameState::Playing { score } => {
                self.transition(GameState::Playing { score: score.saturating_add(1) });
            }
            _ => debug!(state = self.state.label(), "late score ignored"),
        }
    }

    fn on_game_over(&mut self) {
        match self.state {
            GameState::Playing { score } => {
                info!(score, "game over");
                self.transition(GameState::GameOver { score });
            }
            _ => debug!(state = self.state.label(), "late game over ignored"),
        }
    }

    fn on_engine_exited(&mut self) {
        if !self.state.engine_ready() {
            debug!(state = self.state.label(), "engine exit ignored");
            return;
        }
        error!(state = self.state.label(), score = ?self.state.score(), "engine exited");
        self.transition(GameState::InitFailed { reason: EngineError::Disconnected.to_string() });
    }
}

fn report(op: &'static str, result: Result<(), EngineError>) {
    if let Err(e) = result {
        error!(op, error = %e, "engine call failed");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use futures_util::FutureExt;

    use super::*;
    use crate::options::store::{StorageError, SETTINGS_KEY};
    use crate::options::model::{Difficulty, Fps};
    use crate::options::KeyValueStore;

    // ── Fakes ──

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Initialize,
        Configure(GameOptions),
        SetRunning(bool),
        Stop,
        ApplyOptions(GameOptions),
    }

    type Log = Rc<RefCell<Vec<Call>>>;

    struct FakeEngine {
        log: Log,
        init_result: Result<(), EngineError>,
    }

    impl Engine for FakeEngine {
        fn initialize(&mut self) -> InitFuture {
            self.log.borrow_mut().push(Call::Initialize);
            futures_util::future::ready(self.init_result.clone()).boxed_local()
        }

        fn configure(&mut self, options: &GameOptions, _hooks: EngineHooks) -> Result<(), EngineError> {
            self.log.borrow_mut().push(Call::Configure(options.clone()));
            Ok(())
        }

        fn set_running(&mut self, reset_score: bool) -> Result<(), EngineError> {
            self.log.borrow_mut().push(Call::SetRunning(reset_score));
            Ok(())
        }

        fn stop(&mut self) -> Result<(), EngineError> {
            self.log.borrow_mut().push(Call::Stop);
            Ok(())
        }

        fn apply_options(&mut self, options: &GameOptions) -> Result<(), EngineError> {
            self.log.borrow_mut().push(Call::ApplyOptions(options.clone()));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<HashMap<String, String>>>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.0.borrow().get(key).cloned())
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.borrow_mut().insert(key.into(), value.into());
            Ok(())
        }
    }

    struct Harness {
        controller: SessionController<FakeEngine>,
        log: Log,
        storage: SharedStore,
    }

    impl Harness {
        fn new(init_result: Result<(), EngineError>) -> Self {
            let log = Log::default();
            let storage = SharedStore::default();
            let engine = FakeEngine { log: log.clone(), init_result };
            let store = OptionsStore::new(Box::new(storage.clone()));
            let (controller, _events) = SessionController::new(engine, store);
            Harness { controller, log, storage }
        }

        /// Mounted, initialized, at StartPrompt, with the call log cleared.
        fn ready() -> Self {
            let mut h = Harness::new(Ok(()));
            h.mount_and_resolve();
            assert_eq!(h.state(), &GameState::StartPrompt);
            h.log.borrow_mut().clear();
            h
        }

        fn mount_and_resolve(&mut self) {
            self.controller.mount();
            self.resolve_init();
        }

        fn resolve_init(&mut self) {
            let init = self.controller.take_pending_init().expect("init requested");
            let result = init.now_or_never().expect("fake init resolves immediately");
            self.controller.handle(SessionEvent::Initialized(result));
        }

        fn send(&mut self, event: SessionEvent) {
            self.controller.handle(event);
        }

        fn start(&mut self) {
            self.send(SessionEvent::Intent(Intent::Start));
        }

        fn toggle(&mut self) {
            self.send(SessionEvent::Intent(Intent::ToggleSettings));
        }

        fn score(&mut self) {
            self.send(SessionEvent::Engine(EngineEvent::Score));
        }

        fn game_over(&mut self) {
            self.send(SessionEvent::Engine(EngineEvent::GameOver));
        }

        fn change(&mut self, patch: OptionsPatch) {
            self.send(SessionEvent::Intent(Intent::ChangeOptions(patch)));
        }

        fn state(&self) -> &GameState {
            self.controller.state()
        }

        fn calls(&self) -> Vec<Call> {
            self.log.borrow().clone()
        }

        fn take_calls(&self) -> Vec<Call> {
            std::mem::take(&mut *self.log.borrow_mut())
        }
    }

    fn fps(f: Fps) -> OptionsPatch {
        OptionsPatch { fps: Some(f), ..Default::default() }
    }

    // ── Mount / initialization ──

    #[test]
    fn mount_enters_loading_and_initializes_once() {
        let mut h = Harness::new(Ok(()));
        h.controller.mount();
        h.controller.mount();
        assert_eq!(h.state(), &GameState::Loading);
        assert_eq!(h.calls(), vec![Call::Initialize]);
        assert!(h.controller.take_pending_init().is_some());
        assert!(h.controller.take_pending_init().is_none());
    }

    #[test]
    fn events_before_mount_are_ignored() {
        let mut h = Harness::new(Ok(()));
        h.start();
        h.score();
        assert_eq!(h.state(), &GameState::Loading);
        assert!(h.calls().is_empty());
    }

    #[test]
    fn initialization_configures_then_prompts() {
        let mut h = Harness::new(Ok(()));
        h.mount_and_resolve();
        assert_eq!(h.state(), &GameState::StartPrompt);
        assert_eq!(h.calls(), vec![Call::Initialize, Call::Configure(GameOptions::default())]);
    }

    #[test]
    fn start_while_loading_is_ignored() {
        let mut h = Harness::new(Ok(()));
        h.controller.mount();
        h.start();
        h.toggle();
        assert_eq!(h.state(), &GameState::Loading);
        assert_eq!(h.calls(), vec![Call::Initialize]);
    }

    #[test]
    fn failed_initialization_is_visible_and_retryable() {
        let mut h = Harness::new(Err(EngineError::ExitedEarly));
        h.mount_and_resolve();
        assert!(matches!(h.state(), GameState::InitFailed { .. }));
        assert_eq!(h.take_calls(), vec![Call::Initialize]);

        // Nothing but Start does anything here.
        h.toggle();
        h.score();
        assert!(matches!(h.state(), GameState::InitFailed { .. }));
        assert!(h.calls().is_empty());

        h.controller.engine.init_result = Ok(());
        h.start();
        assert_eq!(h.state(), &GameState::Loading);
        h.resolve_init();
        assert_eq!(h.state(), &GameState::StartPrompt);
        assert_eq!(
            h.calls(),
            vec![Call::Initialize, Call::Configure(GameOptions::default())]
        );
    }

    #[test]
    fn engine_exit_mid_run_fails_and_start_reinitializes() {
        let mut h = Harness::ready();
        h.start();
        h.score();
        h.take_calls();

        h.send(SessionEvent::Engine(EngineEvent::Exited));
        match h.state() {
            GameState::InitFailed { reason } => {
                assert_eq!(reason, &EngineError::Disconnected.to_string())
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(h.calls().is_empty());

        // A dead engine gets no more run-state calls.
        h.score();
        h.toggle();
        h.controller.unmount();
        assert!(h.calls().is_empty());
    }

    #[test]
    fn engine_exit_from_settings_then_retry() {
        let mut h = Harness::ready();
        h.start();
        h.toggle();
        h.send(SessionEvent::Engine(EngineEvent::Exited));
        assert!(matches!(h.state(), GameState::InitFailed { .. }));
        h.take_calls();

        h.start();
        assert_eq!(h.state(), &GameState::Loading);
        h.resolve_init();
        assert_eq!(h.state(), &GameState::StartPrompt);
        assert_eq!(
            h.calls(),
            vec![Call::Initialize, Call::Configure(GameOptions::default())]
        );
    }

    #[test]
    fn engine_exit_while_loading_is_left_to_initialization() {
        let mut h = Harness::new(Ok(()));
        h.controller.mount();
        h.send(SessionEvent::Engine(EngineEvent::Exited));
        assert_eq!(h.state(), &GameState::Loading);
        h.resolve_init();
        assert_eq!(h.state(), &GameState::StartPrompt);
    }

    #[test]
    fn stale_initialization_result_is_ignored() {
        let mut h = Harness::ready();
        h.send(SessionEvent::Initialized(Ok(())));
        assert_eq!(h.state(), &GameState::StartPrompt);
        assert!(h.calls().is_empty());
    }

    // ── Start ──

    #[test]
    fn start_is_idempotent_while_playing() {
        let mut h = Harness::ready();
        h.start();
        h.start();
        h.start();
        assert_eq!(h.state(), &GameState::Playing { score: 0 });
        assert_eq!(h.calls(), vec![Call::SetRunning(true)]);
    }

    #[test]
    fn start_from_settings_is_ignored() {
        let mut h = Harness::ready();
        h.start();
        h.score();
        h.toggle();
        h.take_calls();
        h.start();
        assert_eq!(h.state(), &GameState::Settings { score: 1 });
        assert!(h.calls().is_empty());
    }

    // ── Engine callbacks ──

    #[test]
    fn score_increments_only_while_playing() {
        let mut h = Harness::new(Ok(()));
        h.controller.mount();
        h.score();
        assert_eq!(h.state(), &GameState::Loading);
        h.resolve_init();

        h.score();
        assert_eq!(h.state(), &GameState::StartPrompt);

        h.start();
        h.score();
        h.score();
        assert_eq!(h.state(), &GameState::Playing { score: 2 });

        h.toggle();
        h.score();
        assert_eq!(h.state(), &GameState::Settings { score: 2 });

        h.toggle();
        h.game_over();
        h.score();
        assert_eq!(h.state(), &GameState::GameOver { score: 2 });
    }

    #[test]
    fn game_over_keeps_exact_score() {
        let mut h = Harness::ready();
        h.start();
        for _ in 0..7 {
            h.score();
        }
        h.game_over();
        assert_eq!(h.state(), &GameState::GameOver { score: 7 });
    }

    #[test]
    fn game_over_outside_playing_is_ignored() {
        let mut h = Harness::ready();
        h.game_over();
        assert_eq!(h.state(), &GameState::StartPrompt);

        h.start();
        h.score();
        h.toggle();
        h.game_over();
        assert_eq!(h.state(), &GameState::Settings { score: 1 });
    }

    // ── Settings ──

    #[test]
    fn settings_toggles_alternate_engine_calls() {
        let mut h = Harness::ready();
        h.start();
        h.take_calls();

        for _ in 0..9 {
            h.toggle();
        }
        let calls = h.calls();
        assert_eq!(calls.len(), 9);
        for pair in calls.windows(2) {
            assert_ne!(pair[0], pair[1], "two identical run-state calls in a row: {calls:?}");
        }
        assert_eq!(calls[0], Call::Stop);
        assert!(calls.iter().all(|c| matches!(c, Call::Stop | Call::SetRunning(false))));
        assert_eq!(h.state(), &GameState::Settings { score: 0 });
    }

    #[test]
    fn settings_toggle_outside_a_run_is_ignored() {
        let mut h = Harness::ready();
        h.toggle();
        assert_eq!(h.state(), &GameState::StartPrompt);

        h.start();
        h.game_over();
        h.take_calls();
        h.toggle();
        assert_eq!(h.state(), &GameState::GameOver { score: 0 });
        assert!(h.calls().is_empty());
    }

    // ── Options ──

    #[test]
    fn option_change_in_settings_persists_and_applies_without_run_change() {
        let mut h = Harness::ready();
        h.start();
        h.score();
        h.toggle();
        h.take_calls();

        h.change(fps(Fps::Sixty));
        assert_eq!(h.state(), &GameState::Settings { score: 1 });
        let applied = h.controller.options().clone();
        assert_eq!(applied.fps(), Fps::Sixty);
        assert!((applied.frame_threshold_ms() - 1000.0 / 60.0).abs() < 1e-9);
        assert_eq!(h.calls(), vec![Call::ApplyOptions(applied.clone())]);

        let stored = h.storage.0.borrow().get(SETTINGS_KEY).cloned().unwrap();
        let stored: GameOptions = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored, applied);
    }

    #[test]
    fn option_change_while_playing_keeps_run_state() {
        let mut h = Harness::ready();
        h.start();
        h.take_calls();
        h.change(OptionsPatch { grid_size: Some(22), ..Default::default() });
        assert_eq!(h.state(), &GameState::Playing { score: 0 });
        assert!(matches!(h.calls().as_slice(), [Call::ApplyOptions(o)] if o.grid_size() == 22));
    }

    #[test]
    fn options_during_loading_are_stored_then_sent_with_configure() {
        let mut h = Harness::new(Ok(()));
        h.controller.mount();
        h.change(OptionsPatch { difficulty: Some(Difficulty::Hard), ..Default::default() });
        assert_eq!(h.calls(), vec![Call::Initialize]);
        assert!(h.storage.0.borrow().contains_key(SETTINGS_KEY));

        h.resolve_init();
        match h.calls().last() {
            Some(Call::Configure(o)) => assert_eq!(o.difficulty(), Difficulty::Hard),
            other => panic!("expected configure, got {other:?}"),
        }
    }

    #[test]
    fn unchanged_options_are_not_reapplied() {
        let mut h = Harness::ready();
        h.change(fps(Fps::Ten));
        assert!(h.calls().is_empty());
        assert!(h.storage.0.borrow().is_empty());
    }

    #[test]
    fn stored_options_are_loaded_at_startup() {
        let storage = SharedStore::default();
        let saved = GameOptions::default().merged(&OptionsPatch {
            food_count: Some(9),
            ..Default::default()
        });
        storage
            .0
            .borrow_mut()
            .insert(SETTINGS_KEY.into(), serde_json::to_string(&saved).unwrap());

        let engine = FakeEngine { log: Log::default(), init_result: Ok(()) };
        let (controller, _events) =
            SessionController::new(engine, OptionsStore::new(Box::new(storage)));
        assert_eq!(controller.options(), &saved);
    }

    // ── Unmount ──

    #[test]
    fn unmount_stops_engine_once() {
        let mut h = Harness::ready();
        h.start();
        h.take_calls();
        h.controller.unmount();
        h.controller.unmount();
        assert_eq!(h.calls(), vec![Call::Stop]);

        h.start();
        h.score();
        assert!(h.calls().len() == 1);
    }

    #[test]
    fn unmount_while_loading_makes_no_engine_call() {
        let mut h = Harness::new(Ok(()));
        h.controller.mount();
        h.take_calls();
        h.controller.unmount();
        assert!(h.calls().is_empty());
        assert!(h.controller.take_pending_init().is_none());
    }

    #[test]
    fn unmount_from_settings_does_not_stop_twice() {
        let mut h = Harness::ready();
        h.start();
        h.toggle();
        h.take_calls();
        h.controller.unmount();
        assert!(h.calls().is_empty());
    }

    // ── Full scenario ──

    #[test]
    fn full_session_scenario() {
        let mut h = Harness::new(Ok(()));
        h.mount_and_resolve();
        assert_eq!(h.state(), &GameState::StartPrompt);
        h.take_calls();

        h.start();
        assert_eq!(h.state(), &GameState::Playing { score: 0 });

        h.score();
        h.score();
        h.score();
        assert_eq!(h.state(), &GameState::Playing { score: 3 });
        assert_eq!(h.take_calls(), vec![Call::SetRunning(true)]);

        h.toggle();
        assert_eq!(h.state(), &GameState::Settings { score: 3 });
        assert_eq!(h.take_calls(), vec![Call::Stop]);

        h.toggle();
        assert_eq!(h.state(), &GameState::Playing { score: 3 });
        assert_eq!(h.take_calls(), vec![Call::SetRunning(false)]);

        h.game_over();
        assert_eq!(h.state(), &GameState::GameOver { score: 3 });
        assert!(h.calls().is_empty());

        h.start();
        assert_eq!(h.state(), &GameState::Playing { score: 0 });
        assert_eq!(h.take_calls(), vec![Call::SetRunning(true)]);
    }
}
