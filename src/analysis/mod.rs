//! Chat-completion collaborator (critique + rewrite).
//!
//! This module provides:
//! * [`AnalysisClient`] — async trait returning a [`FragmentStream`].
//! * [`ApiAnalysisClient`] — OpenAI-compatible streaming client.
//! * [`FeedbackKind`] — which of the two concurrent calls a stream is for,
//!   with its system instruction.
//! * [`SseLineBuffer`] / [`parse_sse_line`] — chunk-boundary-safe SSE
//!   parsing.
//! * [`AnalysisError`] — error variants for analysis operations.

pub mod client;
pub mod prompt;
pub mod sse;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{AnalysisClient, AnalysisError, ApiAnalysisClient, FragmentStream};
pub use prompt::FeedbackKind;
pub use sse::{parse_sse_line, SseLine, SseLineBuffer};

#[cfg(test)]
pub use client::{MockAnalysisClient, ScriptedCall};
