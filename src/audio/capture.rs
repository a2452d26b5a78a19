//! Microphone capture via `cpal`, behind the [`Recorder`] seam.
//!
//! The pipeline only sees the [`Recorder`] trait: `start()` acquires the
//! input device, `stop()` releases it and returns the finished
//! [`AudioPayload`].  [`MicRecorder`] is the production implementation; it
//! runs the cpal stream on a dedicated thread because `cpal::Stream` is not
//! `Send` on every platform and must never cross threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::payload::{downmix_to_mono, encode_wav_mono, AudioPayload};

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while acquiring or running the audio input device.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No usable input device, or the platform denied access to it.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// `start()` was called while a capture was already running.
    #[error("capture already in progress")]
    AlreadyCapturing,

    /// `stop()` was called with no capture running.
    #[error("no capture in progress")]
    NotCapturing,

    /// Encoding the captured samples into a payload failed.
    #[error(transparent)]
    Encode(#[from] crate::audio::payload::EncodeError),
}

// ---------------------------------------------------------------------------
// Recorder trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface over the capture lifecycle.
///
/// # Contract
///
/// - `start()` acquires exclusive access to the input device and begins
///   accumulating samples.  Fails with [`CaptureError::DeviceUnavailable`]
///   when no device exists or permission is denied.
/// - `stop()` releases the device (all underlying tracks stopped, even on
///   error paths) and returns everything captured since `start()` as a
///   single payload.  Zero captured audio still yields a well-formed
///   (header-only) payload.
pub trait Recorder: Send + Sync {
    /// Begin capturing from the input device.
    fn start(&self) -> Result<(), CaptureError>;

    /// Stop capturing, release the device and return the finished payload.
    fn stop(&self) -> Result<AudioPayload, CaptureError>;
}

// Compile-time assertion: Box<dyn Recorder> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Recorder>) {}
};

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
struct AudioChunk {
    samples: Vec<f32>,
    channels: u16,
}

// ---------------------------------------------------------------------------
// MicRecorder
// ---------------------------------------------------------------------------

/// Holds the state of one in-flight capture.
struct ActiveCapture {
    samples: Arc<Mutex<Vec<f32>>>,
    stop_flag: Arc<AtomicBool>,
    join: std::thread::JoinHandle<()>,
    sample_rate: u32,
}

/// Production [`Recorder`] backed by the system microphone.
///
/// The cpal host/device/stream lifecycle lives entirely on a dedicated
/// `mic-capture` thread; this struct only exchanges samples and control
/// flags with it, so the recorder itself is freely shareable.
///
/// # Example
///
/// ```rust,no_run
/// use speech_coach::audio::{MicRecorder, Recorder};
///
/// let recorder = MicRecorder::new(None, 300.0);
/// recorder.start().unwrap();
/// // ... speak ...
/// let payload = recorder.stop().unwrap();
/// assert_eq!(payload.content_type, "audio/wav");
/// ```
pub struct MicRecorder {
    device_name: Option<String>,
    max_recording_secs: f32,
    active: Mutex<Option<ActiveCapture>>,
}

impl MicRecorder {
    /// Create a recorder for the named input device (`None` = system
    /// default).  Capture beyond `max_recording_secs` is dropped so an
    /// abandoned recording cannot grow without bound.
    pub fn new(device_name: Option<String>, max_recording_secs: f32) -> Self {
        Self {
            device_name,
            max_recording_secs,
            active: Mutex::new(None),
        }
    }

    /// Resolve the configured input device on the capture thread.
    fn open_device(name: Option<&str>) -> Result<cpal::Device, String> {
        let host = cpal::default_host();
        match name {
            Some(wanted) => host
                .input_devices()
                .map_err(|e| e.to_string())?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| format!("input device '{wanted}' not found")),
            None => host
                .default_input_device()
                .ok_or_else(|| "no default input device".to_string()),
        }
    }
}

impl Recorder for MicRecorder {
    fn start(&self) -> Result<(), CaptureError> {
        let mut active = self.active.lock().unwrap();
        if active.is_some() {
            return Err(CaptureError::AlreadyCapturing);
        }

        let samples = Arc::new(Mutex::new(Vec::<f32>::new()));
        let stop_flag = Arc::new(AtomicBool::new(false));
        // Reports stream startup success/failure back from the capture thread.
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();

        let thread_samples = Arc::clone(&samples);
        let thread_stop = Arc::clone(&stop_flag);
        let device_name = self.device_name.clone();
        let max_secs = self.max_recording_secs;

        let join = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let device = match MicRecorder::open_device(device_name.as_deref()) {
                    Ok(d) => d,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let supported = match device.default_input_config() {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                let channels = supported.channels();
                let sample_rate = supported.sample_rate().0;
                let config: cpal::StreamConfig = supported.into();

                let (chunk_tx, chunk_rx) = mpsc::channel::<AudioChunk>();

                let stream = match device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        // Ignore send errors; the receiver may have been dropped.
                        let _ = chunk_tx.send(AudioChunk {
                            samples: data.to_vec(),
                            channels,
                        });
                    },
                    |err: cpal::StreamError| {
                        log::error!("cpal stream error: {err}");
                    },
                    None,
                ) {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }

                let _ = ready_tx.send(Ok(sample_rate));

                let max_samples = (max_secs * sample_rate as f32) as usize;

                // Accumulate mono samples until asked to stop.  The stream is
                // dropped when this loop exits, which releases the device.
                while !thread_stop.load(Ordering::SeqCst) {
                    match chunk_rx.recv_timeout(Duration::from_millis(100)) {
                        Ok(chunk) => {
                            let mono = downmix_to_mono(&chunk.samples, chunk.channels);
                            let mut buf = thread_samples.lock().unwrap();
                            let room = max_samples.saturating_sub(buf.len());
                            buf.extend_from_slice(&mono[..mono.len().min(room)]);
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => continue,
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }

                drop(stream);
            })
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        // Wait for the capture thread to confirm the device is live.
        let sample_rate = match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(rate)) => rate,
            Ok(Err(msg)) => {
                let _ = join.join();
                return Err(CaptureError::DeviceUnavailable(msg));
            }
            Err(_) => {
                stop_flag.store(true, Ordering::SeqCst);
                let _ = join.join();
                return Err(CaptureError::DeviceUnavailable(
                    "timed out waiting for the input device".into(),
                ));
            }
        };

        log::debug!("capture: device live at {sample_rate} Hz");

        *active = Some(ActiveCapture {
            samples,
            stop_flag,
            join,
            sample_rate,
        });
        Ok(())
    }

    fn stop(&self) -> Result<AudioPayload, CaptureError> {
        let capture = self
            .active
            .lock()
            .unwrap()
            .take()
            .ok_or(CaptureError::NotCapturing)?;

        capture.stop_flag.store(true, Ordering::SeqCst);
        if capture.join.join().is_err() {
            log::warn!("capture: mic-capture thread panicked during shutdown");
        }

        let samples = std::mem::take(&mut *capture.samples.lock().unwrap());
        log::debug!(
            "capture: stopped with {} samples ({:.1} s)",
            samples.len(),
            samples.len() as f32 / capture.sample_rate as f32
        );

        Ok(encode_wav_mono(&samples, capture.sample_rate)?)
    }
}

impl Drop for MicRecorder {
    fn drop(&mut self) {
        // Release the device if the recorder is dropped mid-capture.
        if let Some(capture) = self.active.lock().unwrap().take() {
            capture.stop_flag.store(true, Ordering::SeqCst);
            let _ = capture.join.join();
        }
    }
}

// ---------------------------------------------------------------------------
// MockRecorder  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured payload without touching any
/// audio hardware.
#[cfg(test)]
pub struct MockRecorder {
    start_result: Mutex<Option<CaptureError>>,
    payload: AudioPayload,
    started: AtomicBool,
}

#[cfg(test)]
impl MockRecorder {
    /// A mock whose `start()` succeeds and whose `stop()` returns `payload`.
    pub fn ok(payload: AudioPayload) -> Self {
        Self {
            start_result: Mutex::new(None),
            payload,
            started: AtomicBool::new(false),
        }
    }

    /// A mock whose `start()` fails with `error`.
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            start_result: Mutex::new(Some(CaptureError::DeviceUnavailable(error.into()))),
            payload: AudioPayload::new(Vec::new(), "audio/wav"),
            started: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
impl Recorder for MockRecorder {
    fn start(&self) -> Result<(), CaptureError> {
        if let Some(err) = self.start_result.lock().unwrap().take() {
            return Err(err);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::AlreadyCapturing);
        }
        Ok(())
    }

    fn stop(&self) -> Result<AudioPayload, CaptureError> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::NotCapturing);
        }
        Ok(self.payload.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- MockRecorder ---

    #[test]
    fn mock_start_stop_returns_payload() {
        let payload = AudioPayload::new(vec![1, 2, 3], "audio/wav");
        let rec = MockRecorder::ok(payload.clone());
        rec.start().unwrap();
        assert_eq!(rec.stop().unwrap(), payload);
    }

    #[test]
    fn mock_unavailable_fails_on_start() {
        let rec = MockRecorder::unavailable("permission denied");
        let err = rec.start().unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[test]
    fn mock_stop_without_start_errors() {
        let rec = MockRecorder::ok(AudioPayload::new(vec![], "audio/wav"));
        assert!(matches!(rec.stop(), Err(CaptureError::NotCapturing)));
    }

    #[test]
    fn mock_double_start_errors() {
        let rec = MockRecorder::ok(AudioPayload::new(vec![], "audio/wav"));
        rec.start().unwrap();
        assert!(matches!(rec.start(), Err(CaptureError::AlreadyCapturing)));
    }

    // ---- Recorder object safety ---

    #[test]
    fn box_dyn_recorder_compiles() {
        let rec: Box<dyn Recorder> =
            Box::new(MockRecorder::ok(AudioPayload::new(vec![], "audio/wav")));
        let _ = rec.start();
    }

    // ---- MicRecorder (no hardware assumptions) ---

    #[test]
    fn mic_stop_without_start_errors() {
        let rec = MicRecorder::new(None, 300.0);
        assert!(matches!(rec.stop(), Err(CaptureError::NotCapturing)));
    }

    #[test]
    fn mic_recorder_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MicRecorder>();
    }
}
