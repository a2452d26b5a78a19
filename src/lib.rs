//! # speech-coach
//!
//! Recording-to-feedback engine for speech coaching.  One session flows
//! through four collaborators:
//!
//! 1. **Capture** ([`audio`]) — microphone capture via cpal, encoded to a
//!    mono WAV payload (or a pre-existing audio file submitted directly).
//! 2. **Transcription** ([`transcribe`]) — multipart upload to an
//!    OpenAI-compatible speech-to-text endpoint.
//! 3. **Analysis** ([`analysis`]) — two concurrent streamed chat-completion
//!    calls over the same transcript: a bullet-point critique and a
//!    polished rewrite, each filling its own buffer fragment by fragment.
//! 4. **Synthesis** ([`synthesis`]) — on demand, the rewrite is spoken
//!    aloud through an ElevenLabs-style TTS endpoint and rodio playback.
//!
//! [`pipeline`] orchestrates the whole cycle behind a phase machine and a
//! shared session handle; [`config`] holds the TOML-backed settings for
//! every collaborator.
//!
//! All collaborators sit behind traits ([`audio::Recorder`],
//! [`transcribe::Transcriber`], [`analysis::AnalysisClient`],
//! [`synthesis::Synthesizer`], [`audio::AudioPlayer`]), so the orchestrator
//! is fully testable without devices or network.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod pipeline;
pub mod synthesis;
pub mod transcribe;
