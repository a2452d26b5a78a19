//! THE CORE: the recording-to-feedback pipeline.
//!
//! This module provides:
//! * [`SpeechFeedbackPipeline`] — the orchestrator that drives one session
//!   through capture/upload, transcription, the two concurrent analysis
//!   streams, and on-demand synthesis + playback.
//! * [`Phase`] / [`SessionState`] / [`SharedSession`] — the observable
//!   session state callers render progress from.
//! * [`PipelineError`] — the session error taxonomy plus call-constraint
//!   violations.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!   caller ──────▶│    SpeechFeedbackPipeline    │◀────── SharedSession
//!                 └──┬──────┬─────────┬──────┬───┘        (progress reads)
//!                    ▼      ▼         ▼      ▼
//!                Recorder Transcriber │  Synthesizer ─▶ AudioPlayer
//!                (cpal)   (multipart) │  (TTS REST)     (rodio)
//!                                     ▼
//!                              AnalysisClient
//!                           (2 × SSE streams:
//!                           critique, rewrite)
//! ```
//!
//! Every collaborator sits behind a trait, so tests drive the orchestrator
//! with in-memory doubles and no network or devices.

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::SpeechFeedbackPipeline;
pub use state::{new_shared_session, Phase, PipelineError, SessionState, SharedSession};
