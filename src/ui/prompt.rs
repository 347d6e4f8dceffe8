/// Animated start prompt.
///
/// Each tick appends a dot; the tick after three dots drops them again.
///   "Press space to start" → "…start." → "…start.." → "…start..." → "Press space to start"

pub const PROMPT_BASE: &str = "Press space to start";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptText {
    text: String,
}

impl PromptText {
    pub fn new() -> Self {
        PromptText { text: PROMPT_BASE.to_string() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn tick(&mut self) {
        if self.text.ends_with("...") {
            self.text.truncate(self.text.len() - 3);
        } else {
            self.text.push('.');
        }
    }
}

impl Default for PromptText {
    fn default() -> Self {
        PromptText::new()
    }
}
