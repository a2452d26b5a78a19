//! Audio capture, encoding and playback.
//!
//! This module owns the device edge of the pipeline:
//!
//! * [`AudioPayload`] — opaque blob + content type, the unit exchanged with
//!   the collaborators.
//! * [`Recorder`] / [`MicRecorder`] — microphone capture lifecycle (cpal),
//!   producing a mono WAV payload on `stop()`.
//! * [`AudioPlayer`] / [`RodioPlayer`] — playback of synthesized audio.
//! * [`encode_wav_mono`] / [`downmix_to_mono`] — sample-to-payload helpers.

pub mod capture;
pub mod payload;
pub mod playback;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use capture::{CaptureError, MicRecorder, Recorder};
pub use payload::{downmix_to_mono, encode_wav_mono, AudioPayload, EncodeError};
pub use playback::{AudioPlayer, PlaybackError, RodioPlayer};

#[cfg(test)]
pub use capture::MockRecorder;
#[cfg(test)]
pub use playback::MockPlayer;
