//! Text-to-speech collaborator and the static voice table.
//!
//! This module provides:
//! * [`Synthesizer`] — async trait implemented by all TTS backends.
//! * [`ApiSynthesizer`] — ElevenLabs-style REST client.
//! * [`VoiceSelector`] / [`Category`] / [`Gender`] — the closed
//!   (category, gender) → voice-identifier mapping.
//! * [`SynthesisError`] — error variants for synthesis operations.

pub mod client;
pub mod voice;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{ApiSynthesizer, SynthesisError, Synthesizer};
pub use voice::{Category, Gender, VoiceSelector};

#[cfg(test)]
pub use client::MockSynthesizer;
