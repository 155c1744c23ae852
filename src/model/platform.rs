use serde::{Deserialize, Serialize};
use std::fmt;

/// ESP-ADF sub-platforms that hang off the `esp_adf` component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Button,
    Speaker,
    MediaPlayer,
}

impl Platform {
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Button => "button",
            Platform::Speaker => "speaker",
            Platform::MediaPlayer => "media_player",
        }
    }

    /// Class registered for this platform, parented to the `ESPADF` component.
    pub fn class_name(&self) -> &'static str {
        match self {
            Platform::Button => "ESPADFButton",
            Platform::Speaker => "ESPADFSpeaker",
            Platform::MediaPlayer => "ESPADFMediaPlayer",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
