//! Narration value types.

use serde::{Deserialize, Serialize};

/// Voice parameters passed through to the synthesis provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Provider-specific voice identifier.
    pub voice_id: String,

    /// Speaking rate multiplier (1.0 = provider default).
    #[serde(default = "default_rate")]
    pub speaking_rate: f64,

    /// Pitch offset in semitones.
    #[serde(default)]
    pub pitch: f64,
}

fn default_rate() -> f64 {
    1.0
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_id: "narrator-1".to_string(),
            speaking_rate: 1.0,
            pitch: 0.0,
        }
    }
}

/// Synthesized narration audio with its measured duration.
#[derive(Debug, Clone)]
pub struct Narration {
    /// Encoded audio bytes as returned by the provider.
    pub audio: Vec<u8>,

    /// Audio duration in seconds.
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_settings_defaults_fill_in() {
        let settings: VoiceSettings = serde_json::from_str(r#"{"voice_id": "calm-2"}"#).unwrap();
        assert_eq!(settings.voice_id, "calm-2");
        assert_eq!(settings.speaking_rate, 1.0);
        assert_eq!(settings.pitch, 0.0);
    }
}
