//! Generation settings snapshot

use lessongen_common::config::GenerationDefaults;
use serde::{Deserialize, Serialize};

/// Parameters required before a generation request is permitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub speaking_rate: Option<f32>,
    pub voice: Option<String>,
    pub language: Option<String>,
    pub destination_folder_id: Option<String>,
}

/// Voice section of a job confirmation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub language_code: String,
    pub name: String,
    pub speaking_rate: f32,
}

impl GenerationSettings {
    /// All four fields present
    pub fn is_complete(&self) -> bool {
        self.speaking_rate.is_some()
            && self.voice.is_some()
            && self.language.is_some()
            && self.destination_folder_id.is_some()
    }

    /// Voice configuration, only when the settings are complete
    pub fn voice_config(&self) -> Option<VoiceConfig> {
        if !self.is_complete() {
            return None;
        }
        Some(VoiceConfig {
            language_code: self.language.clone()?,
            name: self.voice.clone()?,
            speaking_rate: self.speaking_rate?,
        })
    }
}

impl From<&GenerationDefaults> for GenerationSettings {
    fn from(defaults: &GenerationDefaults) -> Self {
        Self {
            speaking_rate: defaults.speaking_rate,
            voice: defaults.voice.clone(),
            language: defaults.language.clone(),
            destination_folder_id: defaults.destination_folder_id.clone(),
        }
    }
}
