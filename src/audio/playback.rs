//! Audio playback via `rodio`, behind the [`AudioPlayer`] seam.
//!
//! [`RodioPlayer`] decodes a synthesized [`AudioPayload`] and plays it on the
//! default output device, blocking until playback finishes.  The pipeline
//! runs it on `tokio::task::spawn_blocking` so the async runtime never
//! stalls.

use std::io::Cursor;

use thiserror::Error;

use crate::audio::payload::AudioPayload;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors that can occur while playing back a synthesized payload.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No usable output device, or the platform rejected the stream.
    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),

    /// The payload bytes could not be decoded as audio.
    #[error("failed to decode audio payload: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// AudioPlayer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe playback interface.
///
/// `play` is **blocking** — it returns once the payload has finished
/// playing.  Callers on an async runtime must dispatch it to the blocking
/// thread pool.
pub trait AudioPlayer: Send + Sync {
    /// Decode and play `payload` to completion.
    fn play(&self, payload: &AudioPayload) -> Result<(), PlaybackError>;
}

// Compile-time assertion: Box<dyn AudioPlayer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioPlayer>) {}
};

// ---------------------------------------------------------------------------
// RodioPlayer
// ---------------------------------------------------------------------------

/// Production [`AudioPlayer`] on the system default output device.
///
/// The rodio `OutputStream` is created per call and dropped when playback
/// ends, so no output handle outlives the payload it played.
#[derive(Debug, Default)]
pub struct RodioPlayer;

impl RodioPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&self, payload: &AudioPayload) -> Result<(), PlaybackError> {
        let (_stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;

        let sink = rodio::Sink::try_new(&handle)
            .map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;

        let source = rodio::Decoder::new(Cursor::new(payload.bytes.clone()))
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;

        log::debug!(
            "playback: {} bytes ({})",
            payload.bytes.len(),
            payload.content_type
        );

        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockPlayer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that records every payload it is asked to play.
#[cfg(test)]
pub struct MockPlayer {
    pub played: std::sync::Mutex<Vec<AudioPayload>>,
    fail: bool,
}

#[cfg(test)]
impl MockPlayer {
    /// A mock that always succeeds.
    pub fn ok() -> Self {
        Self {
            played: std::sync::Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A mock whose `play` always fails.
    pub fn failing() -> Self {
        Self {
            played: std::sync::Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[cfg(test)]
impl AudioPlayer for MockPlayer {
    fn play(&self, payload: &AudioPayload) -> Result<(), PlaybackError> {
        if self.fail {
            return Err(PlaybackError::OutputUnavailable("mock failure".into()));
        }
        self.played.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_played_payloads() {
        let player = MockPlayer::ok();
        let payload = AudioPayload::new(vec![9, 9], "audio/mpeg");
        player.play(&payload).unwrap();
        assert_eq!(player.played.lock().unwrap().as_slice(), &[payload]);
    }

    #[test]
    fn mock_failing_returns_error() {
        let player = MockPlayer::failing();
        let payload = AudioPayload::new(vec![1], "audio/mpeg");
        assert!(matches!(
            player.play(&payload),
            Err(PlaybackError::OutputUnavailable(_))
        ));
        assert!(player.played.lock().unwrap().is_empty());
    }

    #[test]
    fn box_dyn_player_compiles() {
        let _: Box<dyn AudioPlayer> = Box::new(MockPlayer::ok());
    }
}
