/// Terminal presentation: rendering, input devices, sound cues.

pub mod gamepad;
pub mod input;
pub mod panel;
pub mod prompt;
pub mod renderer;
pub mod sound;
