//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// TranscriptionConfig
// ---------------------------------------------------------------------------

/// Settings for the transcription collaborator.
///
/// The endpoint must speak the OpenAI `/v1/audio/transcriptions` wire format
/// (multipart upload → plain transcript text).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Base URL of the API endpoint (e.g. `https://api.openai.com`).
    pub base_url: String,
    /// API key — `None` means read `OPENAI_API_KEY` from the environment.
    pub api_key: Option<String>,
    /// Model identifier sent with the upload (e.g. `"whisper-1"`).
    pub model: String,
    /// Maximum seconds to wait for the transcript before timing out.
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "whisper-1".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Settings for the chat-completion collaborator used for critique/rewrite.
///
/// Two streamed calls are issued per session against the same endpoint, so a
/// single config block covers both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Base URL of an OpenAI-compatible chat-completions endpoint.
    pub base_url: String,
    /// API key — `None` means read `OPENAI_API_KEY` from the environment.
    pub api_key: Option<String>,
    /// Model identifier (e.g. `"gpt-4o-mini"`).
    pub model: String,
    /// Sampling temperature.  Kept low so feedback is consistent between runs.
    pub temperature: f32,
    /// Maximum seconds for the *initial* response; streaming continues past
    /// this once fragments start arriving.
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// SynthesisConfig
// ---------------------------------------------------------------------------

/// Settings for the text-to-speech collaborator (ElevenLabs wire format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Base URL of the API endpoint.
    pub base_url: String,
    /// API key — `None` means read `ELEVENLABS_API_KEY` from the environment.
    pub api_key: Option<String>,
    /// Model / quality selector (e.g. `"eleven_turbo_v2_5"`).
    pub model: String,
    /// Maximum seconds to wait for the synthesized audio payload.
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".into(),
            api_key: None,
            model: "eleven_turbo_v2_5".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for microphone capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio input device name — `None` means the system default.
    pub input_device: Option<String>,
    /// Maximum recording length in seconds; capture beyond this is dropped.
    pub max_recording_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            max_recording_secs: 300.0,
        }
    }
}

// ---------------------------------------------------------------------------
// CoachConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// Holds the credentials/endpoints for all three collaborators.  A config is
/// passed into the pipeline at construction — there are no process-wide
/// client singletons.
///
/// # Persistence
///
/// ```rust,no_run
/// use speech_coach::config::CoachConfig;
///
/// // Load (returns Default when file is missing)
/// let config = CoachConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Microphone capture settings.
    pub audio: AudioConfig,
    /// Transcription collaborator settings.
    pub transcription: TranscriptionConfig,
    /// Chat-completion collaborator settings (critique + rewrite).
    pub analysis: AnalysisConfig,
    /// Text-to-speech collaborator settings.
    pub synthesis: SynthesisConfig,
}

impl CoachConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(CoachConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill in missing API keys from the conventional environment variables
    /// (`OPENAI_API_KEY` for transcription and analysis,
    /// `ELEVENLABS_API_KEY` for synthesis).  Keys already present in the
    /// config file win over the environment.
    pub fn with_env_keys(mut self) -> Self {
        if self.transcription.api_key.is_none() {
            self.transcription.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.analysis.api_key.is_none() {
            self.analysis.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.synthesis.api_key.is_none() {
            self.synthesis.api_key = std::env::var("ELEVENLABS_API_KEY").ok();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `CoachConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = CoachConfig::default();
        original.save_to(&path).expect("save");

        let loaded = CoachConfig::load_from(&path).expect("load");

        // TranscriptionConfig
        assert_eq!(
            original.transcription.base_url,
            loaded.transcription.base_url
        );
        assert_eq!(original.transcription.api_key, loaded.transcription.api_key);
        assert_eq!(original.transcription.model, loaded.transcription.model);
        assert_eq!(
            original.transcription.timeout_secs,
            loaded.transcription.timeout_secs
        );

        // AnalysisConfig
        assert_eq!(original.analysis.base_url, loaded.analysis.base_url);
        assert_eq!(original.analysis.model, loaded.analysis.model);
        assert_eq!(original.analysis.temperature, loaded.analysis.temperature);
        assert_eq!(original.analysis.timeout_secs, loaded.analysis.timeout_secs);

        // SynthesisConfig
        assert_eq!(original.synthesis.base_url, loaded.synthesis.base_url);
        assert_eq!(original.synthesis.model, loaded.synthesis.model);

        // AudioConfig
        assert_eq!(original.audio.input_device, loaded.audio.input_device);
        assert_eq!(
            original.audio.max_recording_secs,
            loaded.audio.max_recording_secs
        );
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = CoachConfig::load_from(&path).expect("should not error");
        let default = CoachConfig::default();

        assert_eq!(config.transcription.model, default.transcription.model);
        assert_eq!(config.analysis.model, default.analysis.model);
        assert_eq!(config.synthesis.model, default.synthesis.model);
    }

    /// Verify default values.
    #[test]
    fn default_values() {
        let cfg = CoachConfig::default();

        assert_eq!(cfg.transcription.base_url, "https://api.openai.com");
        assert_eq!(cfg.transcription.model, "whisper-1");
        assert!(cfg.transcription.api_key.is_none());
        assert_eq!(cfg.analysis.model, "gpt-4o-mini");
        assert!((cfg.analysis.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(cfg.synthesis.base_url, "https://api.elevenlabs.io");
        assert_eq!(cfg.synthesis.model, "eleven_turbo_v2_5");
        assert!(cfg.audio.input_device.is_none());
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = CoachConfig::default();
        cfg.transcription.base_url = "https://api.groq.com/openai".into();
        cfg.transcription.api_key = Some("sk-test".into());
        cfg.analysis.model = "gpt-4o".into();
        cfg.analysis.temperature = 0.5;
        cfg.synthesis.api_key = Some("el-test".into());
        cfg.audio.max_recording_secs = 120.0;

        cfg.save_to(&path).expect("save");
        let loaded = CoachConfig::load_from(&path).expect("load");

        assert_eq!(loaded.transcription.base_url, "https://api.groq.com/openai");
        assert_eq!(loaded.transcription.api_key, Some("sk-test".into()));
        assert_eq!(loaded.analysis.model, "gpt-4o");
        assert!((loaded.analysis.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(loaded.synthesis.api_key, Some("el-test".into()));
        assert!((loaded.audio.max_recording_secs - 120.0).abs() < f32::EPSILON);
    }

    /// Explicit config keys must win over environment variables.
    #[test]
    fn explicit_keys_win_over_env() {
        let mut cfg = CoachConfig::default();
        cfg.transcription.api_key = Some("from-file".into());
        let cfg = cfg.with_env_keys();
        assert_eq!(cfg.transcription.api_key, Some("from-file".into()));
    }
}
