//! Generation settings store
//!
//! Plain slots with no validation of their own; the orchestrator reads a
//! snapshot when deciding whether a request may run.

use crate::models::GenerationSettings;
use lessongen_common::config::GenerationDefaults;

#[derive(Debug, Default)]
pub struct GenerationSettingsStore {
    settings: GenerationSettings,
}

impl GenerationSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: &GenerationDefaults) -> Self {
        Self {
            settings: GenerationSettings::from(defaults),
        }
    }

    pub fn set_speaking_rate(&mut self, speaking_rate: Option<f32>) {
        self.settings.speaking_rate = speaking_rate;
    }

    pub fn set_voice(&mut self, voice: Option<String>) {
        self.settings.voice = voice;
    }

    pub fn set_language(&mut self, language: Option<String>) {
        self.settings.language = language;
    }

    pub fn set_destination_folder_id(&mut self, folder_id: Option<String>) {
        self.settings.destination_folder_id = folder_id;
    }

    pub fn speaking_rate(&self) -> Option<f32> {
        self.settings.speaking_rate
    }

    pub fn voice(&self) -> Option<&str> {
        self.settings.voice.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.settings.language.as_deref()
    }

    pub fn destination_folder_id(&self) -> Option<&str> {
        self.settings.destination_folder_id.as_deref()
    }

    /// Consistent copy of all four fields
    pub fn snapshot(&self) -> GenerationSettings {
        self.settings.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.settings.is_complete()
    }

    /// Clear all four fields
    pub fn reset(&mut self) {
        self.settings = GenerationSettings::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_only_when_all_set() {
        let mut store = GenerationSettingsStore::new();
        assert!(!store.is_complete());

        store.set_voice(Some("vi-VN-Standard-A".to_string()));
        store.set_language(Some("vi-VN".to_string()));
        store.set_speaking_rate(Some(1.0));
        assert!(!store.is_complete());

        store.set_destination_folder_id(Some("folder-1".to_string()));
        assert!(store.is_complete());
        assert_eq!(store.destination_folder_id(), Some("folder-1"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let defaults = GenerationDefaults {
            voice: Some("v".to_string()),
            language: Some("l".to_string()),
            speaking_rate: Some(0.75),
            destination_folder_id: Some("f".to_string()),
        };
        let mut store = GenerationSettingsStore::with_defaults(&defaults);
        assert!(store.is_complete());

        store.reset();
        assert_eq!(store.snapshot(), GenerationSettings::default());
        assert_eq!(store.voice(), None);
        assert_eq!(store.speaking_rate(), None);
    }
}
