//! Core `AnalysisClient` trait and `ApiAnalysisClient` implementation.
//!
//! `ApiAnalysisClient` calls any OpenAI-compatible `/v1/chat/completions`
//! endpoint with `stream: true` and exposes the response as a stream of
//! discrete text fragments.  All connection details come from
//! [`AnalysisConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use thiserror::Error;

use crate::analysis::sse::{parse_sse_line, SseLine, SseLineBuffer};
use crate::config::AnalysisConfig;

// ---------------------------------------------------------------------------
// AnalysisError
// ---------------------------------------------------------------------------

/// Errors that can occur during a streamed analysis call.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The initial response did not arrive within the configured timeout.
    #[error("analysis request timed out")]
    Timeout,

    /// The collaborator rejected the request before any streaming began.
    #[error("analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// One streamed fragment could not be parsed.  Non-fatal: the consumer
    /// logs and skips it without aborting the stream.
    #[error("malformed stream fragment: {0}")]
    MalformedFragment(String),
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            AnalysisError::Timeout
        } else {
            AnalysisError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisClient trait
// ---------------------------------------------------------------------------

/// A stream of incremental text fragments from one analysis call.
///
/// `Err` items are per-fragment parse failures (non-fatal); the stream ends
/// when the collaborator's terminal sentinel arrives.
pub type FragmentStream = BoxStream<'static, Result<String, AnalysisError>>;

/// Async trait for the chat-completion collaborator.
///
/// One session issues two calls against the same client — critique and
/// rewrite — with different system instructions.  Returning the stream
/// (rather than the collected text) lets the pipeline render partial results
/// as they arrive.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Issue one streamed completion.  `Err` here means the request failed
    /// outright before any streaming began.
    async fn stream_completion(
        &self,
        instruction: &str,
        transcript: &str,
    ) -> Result<FragmentStream, AnalysisError>;
}

// ---------------------------------------------------------------------------
// ApiAnalysisClient
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint with streaming
/// enabled.
///
/// The HTTP client carries only a *connect* timeout: a healthy stream may
/// legitimately stay open far longer than any sane total-request timeout.
pub struct ApiAnalysisClient {
    client: reqwest::Client,
    config: AnalysisConfig,
}

impl ApiAnalysisClient {
    /// Build an `ApiAnalysisClient` from application config.
    ///
    /// A default client is used as a last-resort fallback if the builder
    /// fails (should never happen in practice).
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl AnalysisClient for ApiAnalysisClient {
    async fn stream_completion(
        &self,
        instruction: &str,
        transcript: &str,
    ) -> Result<FragmentStream, AnalysisError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": instruction },
                { "role": "user",   "content": transcript  }
            ],
            "stream":      true,
            "temperature": self.config.temperature,
        });

        let mut req = self.client.post(&url).json(&body);

        // Attach Authorization header only when api_key is a non-empty string.
        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Re-chunk the byte stream into complete SSE lines, parse each line,
        // and stop at the terminal sentinel.  Malformed lines surface as
        // `Err` items so the consumer can log and continue.
        let fragments = response
            .bytes_stream()
            .scan(SseLineBuffer::new(), |lines, chunk| {
                let items: Vec<Result<SseLine, AnalysisError>> = match chunk {
                    Ok(bytes) => lines
                        .extend(&bytes)
                        .iter()
                        .map(|line| Ok(parse_sse_line(line)))
                        .collect(),
                    Err(e) => vec![Err(AnalysisError::Request(e.to_string()))],
                };
                futures::future::ready(Some(futures::stream::iter(items)))
            })
            .flatten()
            .take_while(|item| futures::future::ready(!matches!(item, Ok(SseLine::Done))))
            .filter_map(|item| {
                futures::future::ready(match item {
                    Ok(SseLine::Fragment(text)) => Some(Ok(text)),
                    Ok(SseLine::Malformed(msg)) => {
                        Some(Err(AnalysisError::MalformedFragment(msg)))
                    }
                    Ok(SseLine::Ignored) | Ok(SseLine::Done) => None,
                    Err(e) => Some(Err(e)),
                })
            })
            .boxed();

        Ok(fragments)
    }
}

// ---------------------------------------------------------------------------
// MockAnalysisClient  (test-only)
// ---------------------------------------------------------------------------

/// One scripted response for [`MockAnalysisClient`].
#[cfg(test)]
pub enum ScriptedCall {
    /// The initial request fails outright.
    Fail(AnalysisError),
    /// The request succeeds and the stream yields these items.
    Stream(Vec<Result<String, AnalysisError>>),
}

/// A test double that replays scripted responses in call order and records
/// the `(instruction, transcript)` pair of every call it receives.
#[cfg(test)]
pub struct MockAnalysisClient {
    calls: std::sync::Mutex<std::collections::VecDeque<ScriptedCall>>,
    pub seen: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockAnalysisClient {
    /// Script the responses for successive calls, first to last.
    pub fn scripted(calls: Vec<ScriptedCall>) -> Self {
        Self {
            calls: std::sync::Mutex::new(calls.into()),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Convenience: every call succeeds with the same fragment list.
    pub fn fragments(fragments: &[&str]) -> ScriptedCall {
        ScriptedCall::Stream(fragments.iter().map(|f| Ok(f.to_string())).collect())
    }
}

#[cfg(test)]
#[async_trait]
impl AnalysisClient for MockAnalysisClient {
    async fn stream_completion(
        &self,
        instruction: &str,
        transcript: &str,
    ) -> Result<FragmentStream, AnalysisError> {
        self.seen
            .lock()
            .unwrap()
            .push((instruction.to_string(), transcript.to_string()));

        match self.calls.lock().unwrap().pop_front() {
            Some(ScriptedCall::Fail(err)) => Err(err),
            Some(ScriptedCall::Stream(items)) => Ok(futures::stream::iter(items).boxed()),
            None => Ok(futures::stream::iter(Vec::new()).boxed()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn make_config() -> AnalysisConfig {
        AnalysisConfig {
            base_url: "http://localhost:9999".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            timeout_secs: 5,
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _client = ApiAnalysisClient::from_config(&make_config());
    }

    /// Verify that `ApiAnalysisClient` is object-safe.
    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn AnalysisClient> =
            Box::new(ApiAnalysisClient::from_config(&make_config()));
        drop(client);
    }

    #[tokio::test]
    async fn mock_replays_scripted_fragments() {
        let client = MockAnalysisClient::scripted(vec![MockAnalysisClient::fragments(&[
            "Hello, ", "world!",
        ])]);

        let mut stream = client.stream_completion("sys", "user").await.unwrap();
        let mut collected = String::new();
        while let Some(item) = stream.next().await {
            collected.push_str(&item.unwrap());
        }
        assert_eq!(collected, "Hello, world!");
    }

    #[tokio::test]
    async fn mock_records_instruction_and_transcript() {
        let client = MockAnalysisClient::scripted(vec![MockAnalysisClient::fragments(&[])]);
        let _ = client.stream_completion("be brief", "hello").await.unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("be brief".into(), "hello".into())]);
    }

    #[tokio::test]
    async fn mock_fail_surfaces_initial_error() {
        let client = MockAnalysisClient::scripted(vec![ScriptedCall::Fail(
            AnalysisError::Status {
                status: 429,
                body: "rate limited".into(),
            },
        )]);
        let err = client
            .stream_completion("s", "u")
            .await
            .err()
            .expect("expected error");
        assert!(matches!(err, AnalysisError::Status { status: 429, .. }));
    }

    /// A dead endpoint must produce Timeout/Request, never a panic.
    #[tokio::test]
    async fn unreachable_endpoint_returns_error() {
        let mut config = make_config();
        config.base_url = "http://127.0.0.1:1".into();
        config.timeout_secs = 2;
        let client = ApiAnalysisClient::from_config(&config);
        let err = client
            .stream_completion("s", "u")
            .await
            .err()
            .expect("expected error");
        assert!(matches!(
            err,
            AnalysisError::Request(_) | AnalysisError::Timeout
        ));
    }
}
