/// Session: the game-state machine and the controller that drives it.

pub mod controller;
pub mod state;

pub use controller::{Intent, SessionController, SessionEvent};
pub use state::GameState;
