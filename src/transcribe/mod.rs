//! Transcription collaborator.
//!
//! This module provides:
//! * [`Transcriber`] — async trait implemented by all transcription backends.
//! * [`ApiTranscriber`] — OpenAI-compatible multipart upload client.
//! * [`TranscribeError`] — error variants for transcription operations.

pub mod client;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{ApiTranscriber, TranscribeError, Transcriber};

#[cfg(test)]
pub use client::MockTranscriber;
