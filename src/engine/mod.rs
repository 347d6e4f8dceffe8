/// Engine adapter: the narrow surface the session controller drives.
///
/// The engine itself (simulation, rendering, collision) is external. The
/// controller only ever talks to it through `Engine`, and the engine only
/// ever talks back through `EngineHooks`, which turn the two callbacks into
/// messages on a channel read by the host loop. An engine that goes away
/// after it was ready reports that on the same channel.

pub mod process;
mod protocol;

use futures_util::future::LocalBoxFuture;
use tokio::sync::mpsc;

use crate::options::GameOptions;

/// Resolves once the engine is ready for `configure`.
/// Does not borrow the engine, so the host loop can await it while
/// still handling input.
pub type InitFuture = LocalBoxFuture<'static, Result<(), EngineError>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    Score,
    GameOver,
    /// The engine stopped after initialization; later calls fail with
    /// `EngineError::Disconnected`.
    Exited,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum EngineError {
    #[error("could not start engine: {0}")]
    Spawn(String),
    #[error("engine reported an error: {0}")]
    Reported(String),
    #[error("engine exited before it was ready")]
    ExitedEarly,
    #[error("engine is not initialized")]
    NotInitialized,
    #[error("engine connection closed")]
    Disconnected,
    #[error("engine protocol error: {0}")]
    Protocol(String),
}

/// The `onScore` / `onGameOver` callbacks handed to `configure`.
#[derive(Clone, Debug)]
pub struct EngineHooks {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineHooks {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EngineHooks { tx }, rx)
    }

    pub fn on_score(&self) {
        self.emit(EngineEvent::Score);
    }

    pub fn on_game_over(&self) {
        self.emit(EngineEvent::GameOver);
    }

    pub fn on_exited(&self) {
        self.emit(EngineEvent::Exited);
    }

    fn emit(&self, event: EngineEvent) {
        // Receiver gone means the host loop has shut down.
        let _ = self.tx.send(event);
    }
}

/// Lifecycle contract of an external engine.
///
/// `initialize` must resolve before any other call; calls made earlier
/// return `EngineError::NotInitialized`. All calls other than
/// `initialize` are non-blocking.
pub trait Engine {
    fn initialize(&mut self) -> InitFuture;

    /// Register callbacks and start the idle render. Called once per
    /// successful initialization.
    fn configure(&mut self, options: &GameOptions, hooks: EngineHooks) -> Result<(), EngineError>;

    /// Start or resume the simulation. `reset_score` also zeroes the
    /// engine's score and food state.
    fn set_running(&mut self, reset_score: bool) -> Result<(), EngineError>;

    /// Pause the simulation without releasing engine resources.
    fn stop(&mut self) -> Result<(), EngineError>;

    /// Hot-apply options to a running or paused engine.
    fn apply_options(&mut self, options: &GameOptions) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hooks_deliver_in_order() {
        let (hooks, mut rx) = EngineHooks::channel();
        hooks.on_score();
        hooks.clone().on_score();
        hooks.on_game_over();
        hooks.on_exited();
        assert_eq!(rx.try_recv().ok(), Some(EngineEvent::Score));
        assert_eq!(rx.try_recv().ok(), Some(EngineEvent::Score));
        assert_eq!(rx.try_recv().ok(), Some(EngineEvent::GameOver));
        assert_eq!(rx.try_recv().ok(), Some(EngineEvent::Exited));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn hooks_survive_closed_receiver() {
        let (hooks, rx) = EngineHooks::channel();
        drop(rx);
        hooks.on_score();
        hooks.on_game_over();
    }
}
