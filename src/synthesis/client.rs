//! Core `Synthesizer` trait and `ApiSynthesizer` implementation.
//!
//! `ApiSynthesizer` posts text plus a voice identifier to an
//! ElevenLabs-style `/v1/text-to-speech/{voice_id}` endpoint and returns the
//! synthesized audio as an [`AudioPayload`] ready for playback.  All
//! connection details come from [`SynthesisConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioPayload;
use crate::config::SynthesisConfig;

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

/// Errors that can occur during speech synthesis.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("synthesis request timed out")]
    Timeout,

    /// The collaborator returned a non-success status.
    #[error("synthesis service returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else {
            SynthesisError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesizer trait
// ---------------------------------------------------------------------------

/// Async trait for the text-to-speech collaborator.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with the given provider voice and return the
    /// playable audio payload.
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<AudioPayload, SynthesisError>;
}

// ---------------------------------------------------------------------------
// ApiSynthesizer
// ---------------------------------------------------------------------------

/// Calls an ElevenLabs-style `/v1/text-to-speech/{voice_id}` endpoint.
///
/// Authentication uses the provider's `xi-api-key` header; the response body
/// is the raw audio (MP3 by default).
pub struct ApiSynthesizer {
    client: reqwest::Client,
    config: SynthesisConfig,
}

impl ApiSynthesizer {
    /// Build an `ApiSynthesizer` from application config.
    ///
    /// A default (no-timeout) client is used as a last-resort fallback if
    /// the builder fails (should never happen in practice).
    pub fn from_config(config: &SynthesisConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Synthesizer for ApiSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<AudioPayload, SynthesisError> {
        let url = format!("{}/v1/text-to-speech/{voice_id}", self.config.base_url);

        let body = serde_json::json!({
            "text":     text,
            "model_id": self.config.model,
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.header("xi-api-key", key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();

        let bytes = response.bytes().await?;
        Ok(AudioPayload::new(bytes.to_vec(), content_type))
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a canned payload and records what it was
/// asked to speak.
#[cfg(test)]
pub struct MockSynthesizer {
    response: Result<AudioPayload, SynthesisError>,
    pub requests: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockSynthesizer {
    /// A mock that always returns `Ok(payload)`.
    pub fn ok(payload: AudioPayload) -> Self {
        Self {
            response: Ok(payload),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A mock that always returns `Err(error)`.
    pub fn err(error: SynthesisError) -> Self {
        Self {
            response: Err(error),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<AudioPayload, SynthesisError> {
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.to_string()));
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> SynthesisConfig {
        SynthesisConfig {
            base_url: "http://localhost:9999".into(),
            api_key: Some("el-test".into()),
            model: "eleven_turbo_v2_5".into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _synth = ApiSynthesizer::from_config(&make_config());
    }

    /// Verify that `ApiSynthesizer` is object-safe.
    #[test]
    fn synthesizer_is_object_safe() {
        let synth: Box<dyn Synthesizer> = Box::new(ApiSynthesizer::from_config(&make_config()));
        drop(synth);
    }

    #[tokio::test]
    async fn mock_records_text_and_voice() {
        let payload = AudioPayload::new(vec![1, 2], "audio/mpeg");
        let synth = MockSynthesizer::ok(payload.clone());

        let out = synth.synthesize("Hello, world!", "voice-1").await.unwrap();
        assert_eq!(out, payload);

        let requests = synth.requests.lock().unwrap();
        assert_eq!(
            requests.as_slice(),
            &[("Hello, world!".into(), "voice-1".into())]
        );
    }

    #[tokio::test]
    async fn mock_err_returns_configured_error() {
        let synth = MockSynthesizer::err(SynthesisError::Status {
            status: 401,
            body: "bad key".into(),
        });
        let err = synth.synthesize("text", "voice").await.unwrap_err();
        assert!(matches!(err, SynthesisError::Status { status: 401, .. }));
    }
}
