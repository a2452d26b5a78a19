//! Core `Transcriber` trait and `ApiTranscriber` implementation.
//!
//! `ApiTranscriber` posts an [`AudioPayload`] to any OpenAI-compatible
//! `/v1/audio/transcriptions` endpoint as a multipart upload and returns the
//! plain transcript text.  All connection details come from
//! [`TranscriptionConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioPayload;
use crate::config::TranscriptionConfig;

// ---------------------------------------------------------------------------
// TranscribeError
// ---------------------------------------------------------------------------

/// Errors that can occur during transcription.
#[derive(Debug, Clone, Error)]
pub enum TranscribeError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// The collaborator returned a non-success status.
    #[error("transcription service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TranscribeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscribeError::Timeout
        } else {
            TranscribeError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Async trait for the transcription collaborator.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn Transcriber>`).
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `payload` and return the transcript text.
    async fn transcribe(&self, payload: &AudioPayload) -> Result<String, TranscribeError>;
}

// ---------------------------------------------------------------------------
// ApiTranscriber
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/transcriptions` endpoint.
///
/// Works with OpenAI, Groq and any provider that accepts a multipart form
/// with `file` and `model` fields and answers `{"text": "..."}`.
pub struct ApiTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl ApiTranscriber {
    /// Build an `ApiTranscriber` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails (should never happen in
    /// practice).
    pub fn from_config(config: &TranscriptionConfig) -> Self {
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
impl Transcriber for ApiTranscriber {
    /// Upload `payload` and return the transcript.
    ///
    /// The payload is consumed by exactly this one call; an empty or
    /// near-silent clip is still sent and any rejection comes back as
    /// [`TranscribeError::Status`], never a local panic.
    async fn transcribe(&self, payload: &AudioPayload) -> Result<String, TranscribeError> {
        let url = format!("{}/v1/audio/transcriptions", self.config.base_url);

        let file_part = reqwest::multipart::Part::bytes(payload.bytes.clone())
            .file_name(payload.file_name())
            .mime_str(&payload.content_type)
            .map_err(|e| TranscribeError::Request(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("response_format", "json");

        let mut req = self.client.post(&url).multipart(form);

        // Attach Authorization header only when api_key is a non-empty string.
        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranscribeError::Parse(e.to_string()))?;

        let text = json["text"]
            .as_str()
            .ok_or_else(|| TranscribeError::Parse("missing 'text' field".into()))?
            .trim()
            .to_string();

        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// MockTranscriber  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response without any network.
#[cfg(test)]
pub struct MockTranscriber {
    response: Result<String, TranscribeError>,
}

#[cfg(test)]
impl MockTranscriber {
    /// Create a mock that always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
        }
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: TranscribeError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _payload: &AudioPayload) -> Result<String, TranscribeError> {
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriptionConfig;

    fn make_config(api_key: Option<&str>) -> TranscriptionConfig {
        TranscriptionConfig {
            base_url: "http://localhost:9999".into(),
            api_key: api_key.map(|s| s.to_string()),
            model: "whisper-1".into(),
            timeout_secs: 10,
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let config = make_config(None);
        let _transcriber = ApiTranscriber::from_config(&config);
    }

    #[test]
    fn from_config_accepts_empty_api_key() {
        let config = make_config(Some(""));
        let _transcriber = ApiTranscriber::from_config(&config);
    }

    /// Verify that `ApiTranscriber` is object-safe (usable as `dyn Transcriber`).
    #[test]
    fn transcriber_is_object_safe() {
        let config = make_config(None);
        let transcriber: Box<dyn Transcriber> = Box::new(ApiTranscriber::from_config(&config));
        drop(transcriber);
    }

    #[tokio::test]
    async fn mock_ok_returns_configured_text() {
        let t = MockTranscriber::ok("Hello world");
        let payload = AudioPayload::new(vec![0; 8], "audio/wav");
        assert_eq!(t.transcribe(&payload).await.unwrap(), "Hello world");
    }

    #[tokio::test]
    async fn mock_err_returns_configured_error() {
        let t = MockTranscriber::err(TranscribeError::Status {
            status: 400,
            body: "bad audio".into(),
        });
        let payload = AudioPayload::new(vec![], "audio/wav");
        let err = t.transcribe(&payload).await.unwrap_err();
        assert!(matches!(err, TranscribeError::Status { status: 400, .. }));
    }

    /// Non-network failure on a dead endpoint must surface as Request/Timeout,
    /// not a panic.
    #[tokio::test]
    async fn unreachable_endpoint_returns_request_error() {
        let config = TranscriptionConfig {
            base_url: "http://127.0.0.1:1".into(),
            api_key: None,
            model: "whisper-1".into(),
            timeout_secs: 2,
        };
        let t = ApiTranscriber::from_config(&config);
        let payload = crate::audio::encode_wav_mono(&[], 16_000).unwrap();
        let err = t.transcribe(&payload).await.unwrap_err();
        assert!(matches!(
            err,
            TranscribeError::Request(_) | TranscribeError::Timeout
        ));
    }
}
