/// Session state: one value, replaced whole on every transition.
///
/// Whether the engine is running is read off the tag alone:
///   Playing                          → running
///   StartPrompt / Settings / GameOver → idle render or paused
///   Loading / InitFailed             → engine not usable

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameState {
    Loading,
    InitFailed { reason: String },
    StartPrompt,
    Playing { score: u32 },
    Settings { score: u32 },
    GameOver { score: u32 },
}

impl GameState {
    /// Score of the current or just-ended run.
    pub fn score(&self) -> Option<u32> {
        match self {
            GameState::Playing { score }
            | GameState::Settings { score }
            | GameState::GameOver { score } => Some(*score),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, GameState::Playing { .. })
    }

    /// True once `configure` has been issued.
    pub fn engine_ready(&self) -> bool {
        !matches!(self, GameState::Loading | GameState::InitFailed { .. })
    }

    /// States that show the start prompt and leaderboard overlay.
    pub fn shows_prompt(&self) -> bool {
        matches!(self, GameState::StartPrompt | GameState::GameOver { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameState::Loading => "loading",
            GameState::InitFailed { .. } => "init-failed",
            GameState::StartPrompt => "start-prompt",
            GameState::Playing { .. } => "playing",
            GameState::Settings { .. } => "settings",
            GameState::GameOver { .. } => "game-over",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_only_in_run_states() {
        assert_eq!(GameState::Loading.score(), None);
        assert_eq!(GameState::StartPrompt.score(), None);
        assert_eq!(GameState::InitFailed { reason: "x".into() }.score(), None);
        assert_eq!(GameState::Playing { score: 4 }.score(), Some(4));
        assert_eq!(GameState::Settings { score: 2 }.score(), Some(2));
        assert_eq!(GameState::GameOver { score: 9 }.score(), Some(9));
    }

    #[test]
    fn run_state_derives_from_tag() {
        assert!(GameState::Playing { score: 0 }.is_running());
        assert!(!GameState::Settings { score: 0 }.is_running());
        assert!(!GameState::StartPrompt.is_running());
        assert!(!GameState::Loading.engine_ready());
        assert!(GameState::GameOver { score: 0 }.engine_ready());
        assert!(GameState::StartPrompt.shows_prompt());
        assert!(GameState::GameOver { score: 1 }.shows_prompt());
        assert!(!GameState::Settings { score: 1 }.shows_prompt());
    }
}
