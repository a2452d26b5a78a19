//! Opaque audio payloads and WAV encoding.
//!
//! [`AudioPayload`] is the unit of exchange with the collaborators: a binary
//! blob plus a content-type tag.  Capture produces one (via
//! [`encode_wav_mono`]), the transcription call consumes it, and the
//! synthesis call returns one for playback.

use std::io::Cursor;

use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioPayload
// ---------------------------------------------------------------------------

/// An opaque audio blob plus its MIME content type.
///
/// Produced by microphone capture or file selection, consumed exactly once
/// by the transcription call; also returned by the synthesis collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPayload {
    /// Raw encoded audio bytes (container included, e.g. a full WAV file).
    pub bytes: Vec<u8>,
    /// MIME type of `bytes` (e.g. `"audio/wav"`, `"audio/mpeg"`).
    pub content_type: String,
}

impl AudioPayload {
    /// Construct a payload from pre-encoded bytes.
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// A file name with an extension matching the content type, for use in
    /// multipart uploads that require one.
    pub fn file_name(&self) -> &'static str {
        match self.content_type.as_str() {
            "audio/mpeg" | "audio/mp3" => "speech.mp3",
            "audio/ogg" => "speech.ogg",
            "audio/webm" => "speech.webm",
            "audio/mp4" | "audio/m4a" => "speech.m4a",
            _ => "speech.wav",
        }
    }

    /// Returns `true` when the payload carries no audio bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EncodeError
// ---------------------------------------------------------------------------

/// Errors that can occur while encoding captured samples into a payload.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Downmix interleaved multi-channel samples to mono by averaging frames.
///
/// `channels == 1` returns the input unchanged.  A trailing partial frame
/// (malformed input) is dropped.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Encode mono `f32` PCM samples as an in-memory WAV file.
///
/// An empty sample slice still produces a well-formed (header-only) WAV
/// payload — the transcription collaborator decides what to do with it.
pub fn encode_wav_mono(samples: &[f32], sample_rate: u32) -> Result<AudioPayload, EncodeError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
    }

    Ok(AudioPayload::new(cursor.into_inner(), "audio/wav"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
