use serde::{Deserialize, Serialize};

/// Per-session identity of a character taking part in a dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    pub speaker_id: String,
    pub display_name: String,
    pub portrait: String,
    /// Mood for the line being displayed, reset to `global_mood` on every line.
    pub mood: String,
    pub global_mood: String,
}

impl Speaker {
    pub fn new(speaker_id: impl Into<String>) -> Self {
        let speaker_id = speaker_id.into();
        Self {
            display_name: speaker_id.clone(),
            speaker_id,
            ..Default::default()
        }
    }

    pub fn reset_mood(&mut self) {
        self.mood.clone_from(&self.global_mood);
    }
}
