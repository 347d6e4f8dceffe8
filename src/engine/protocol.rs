/// Line protocol between the host and an engine process.
///
/// One JSON object per line in each direction.
///
///   host → engine   {"cmd":"configure","options":{..}}
///                   {"cmd":"setRunning","resetScore":true}
///                   {"cmd":"stop"}
///                   {"cmd":"applyOptions","options":{..}}
///
///   engine → host   {"event":"ready"}
///                   {"event":"score"}
///                   {"event":"gameOver"}
///                   {"event":"error","message":".."}

use serde::{Deserialize, Serialize};

use super::EngineError;
use crate::options::GameOptions;

#[derive(Serialize, Debug)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum HostCommand<'a> {
    Configure {
        options: &'a GameOptions,
    },
    SetRunning {
        #[serde(rename = "resetScore")]
        reset_score: bool,
    },
    Stop,
    ApplyOptions {
        options: &'a GameOptions,
    },
}

#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineMessage {
    Ready,
    Score,
    GameOver,
    Error { message: String },
}

/// Encode a command as a single line, newline included.
pub fn encode(cmd: &HostCommand<'_>) -> Result<String, EngineError> {
    let mut line =
        serde_json::to_string(cmd).map_err(|e| EngineError::Protocol(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

pub fn decode(line: &str) -> Result<EngineMessage, EngineError> {
    serde_json::from_str(line.trim()).map_err(|e| EngineError::Protocol(format!("{e}: {line:?}")))
}
