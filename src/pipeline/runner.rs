//! Pipeline orchestrator — drives the full capture → transcribe → analyze →
//! synthesize loop.
//!
//! [`SpeechFeedbackPipeline`] owns the [`SharedSession`] and the four
//! collaborator seams (recorder, transcriber, analysis client, synthesizer
//! plus a playback sink).
//!
//! # Pipeline flow
//!
//! ```text
//! begin_capture()                      submit_file(payload)
//!   └─▶ acquire device, new session      └─▶ new session [Uploading]
//!       [Capturing]                            │
//! end_capture()                                │
//!   └─▶ release device → payload ──────────────┤
//!                                              ▼
//!                                      transcribe(payload)   [Transcribing]
//!                                              │
//!                    ┌─────── two streamed chat calls ───────┐ [Analyzing]
//!                    ▼                                       ▼
//!            consume critique stream                consume rewrite stream
//!                    └───────────── both done ───────────────┘
//!                                              ▼
//!                                           [Ready]
//!                                              │
//!                          synthesize(voice) → playback (blocking pool)
//! ```
//!
//! Superseding a session (a new capture/upload while calls are in flight)
//! bumps the session generation; every continuation re-checks it under the
//! session lock before writing, so stale results never reach the current
//! session's buffers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;

use crate::analysis::{AnalysisClient, ApiAnalysisClient, FeedbackKind, FragmentStream};
use crate::audio::{
    AudioPayload, AudioPlayer, MicRecorder, Recorder, RodioPlayer,
};
use crate::config::CoachConfig;
use crate::synthesis::{ApiSynthesizer, Synthesizer, VoiceSelector};
use crate::transcribe::{ApiTranscriber, Transcriber};

use super::state::{new_shared_session, Phase, PipelineError, SharedSession};

// ---------------------------------------------------------------------------
// SpeechFeedbackPipeline
// ---------------------------------------------------------------------------

/// Drives one recording-to-feedback cycle at a time.
///
/// All fields are shared handles, so the pipeline is cheap to clone; clones
/// observe and drive the same session.  Typical use spawns the long-running
/// entry points (`end_capture`, `submit_file`) as tasks and reads
/// [`session`](Self::session) to render progress.
///
/// ```rust,no_run
/// use speech_coach::config::CoachConfig;
/// use speech_coach::pipeline::SpeechFeedbackPipeline;
///
/// # async fn example() {
/// let config = CoachConfig::default().with_env_keys();
/// let pipeline = SpeechFeedbackPipeline::from_config(&config);
///
/// pipeline.begin_capture().unwrap();
/// // ... speak ...
/// pipeline.end_capture().await.unwrap();
///
/// let session = pipeline.session();
/// let st = session.lock().unwrap();
/// println!("critique:\n{}", st.critique);
/// println!("rewrite:\n{}", st.rewrite);
/// # }
/// ```
pub struct SpeechFeedbackPipeline {
    session: SharedSession,
    recorder: Arc<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,
    analysis: Arc<dyn AnalysisClient>,
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn AudioPlayer>,
    synthesis_busy: Arc<AtomicBool>,
}

impl Clone for SpeechFeedbackPipeline {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            recorder: Arc::clone(&self.recorder),
            transcriber: Arc::clone(&self.transcriber),
            analysis: Arc::clone(&self.analysis),
            synthesizer: Arc::clone(&self.synthesizer),
            player: Arc::clone(&self.player),
            synthesis_busy: Arc::clone(&self.synthesis_busy),
        }
    }
}

impl SpeechFeedbackPipeline {
    /// Create a pipeline over explicit collaborator implementations.
    pub fn new(
        recorder: Arc<dyn Recorder>,
        transcriber: Arc<dyn Transcriber>,
        analysis: Arc<dyn AnalysisClient>,
        synthesizer: Arc<dyn Synthesizer>,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        Self {
            session: new_shared_session(),
            recorder,
            transcriber,
            analysis,
            synthesizer,
            player,
            synthesis_busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a pipeline with the production collaborators built from
    /// `config` (microphone capture, HTTP clients, rodio playback).
    pub fn from_config(config: &CoachConfig) -> Self {
        Self::new(
            Arc::new(MicRecorder::new(
                config.audio.input_device.clone(),
                config.audio.max_recording_secs,
            )),
            Arc::new(ApiTranscriber::from_config(&config.transcription)),
            Arc::new(ApiAnalysisClient::from_config(&config.analysis)),
            Arc::new(ApiSynthesizer::from_config(&config.synthesis)),
            Arc::new(RodioPlayer::new()),
        )
    }

    /// Handle to the shared session state (for progress rendering).
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    // -----------------------------------------------------------------------
    // Capture entry points
    // -----------------------------------------------------------------------

    /// Start a new recording session.
    ///
    /// Not valid while already `Capturing` or `Uploading`.  Acquires
    /// exclusive access to the input device; on success the previous
    /// session's transcript/critique/rewrite are discarded and the phase
    /// becomes `Capturing`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::DeviceUnavailable`] when permission is denied or no
    /// device exists — the current session is left untouched so the user
    /// can simply retry.
    pub fn begin_capture(&self) -> Result<(), PipelineError> {
        {
            let st = self.session.lock().unwrap();
            if matches!(st.phase, Phase::Capturing | Phase::Uploading) {
                return Err(PipelineError::InvalidPhase(st.phase.label()));
            }
        }

        self.recorder
            .start()
            .map_err(|e| PipelineError::DeviceUnavailable(e.to_string()))?;

        let generation = self.session.lock().unwrap().begin_session(Phase::Capturing);
        log::debug!("pipeline: session {generation} capturing");
        Ok(())
    }

    /// Stop recording and run the session through transcription and
    /// analysis.  Only valid while `Capturing`.
    ///
    /// The input device is released before any network call.  Collaborator
    /// failures do not propagate from this method — they are recorded in
    /// the session as an `Error` phase; the returned `Err` covers only
    /// call-constraint and capture-finalisation problems.
    pub async fn end_capture(&self) -> Result<(), PipelineError> {
        let generation = {
            let st = self.session.lock().unwrap();
            if st.phase != Phase::Capturing {
                return Err(PipelineError::InvalidPhase(st.phase.label()));
            }
            st.generation
        };

        let payload = match self.recorder.stop() {
            Ok(payload) => payload,
            Err(e) => {
                let err = PipelineError::DeviceUnavailable(e.to_string());
                let mut st = self.session.lock().unwrap();
                if st.generation == generation {
                    st.phase = Phase::Idle;
                }
                log::error!("pipeline: capture finalisation failed: {err}");
                return Err(err);
            }
        };

        {
            let mut st = self.session.lock().unwrap();
            if st.generation != generation {
                // Superseded while the device was shutting down.
                return Ok(());
            }
            st.phase = Phase::Transcribing;
        }

        self.process(payload, generation).await;
        Ok(())
    }

    /// Feed a pre-existing audio payload through the pipeline (alternate
    /// entry path, no device needed).  Not valid while `Capturing` or
    /// `Uploading`.
    pub async fn submit_file(&self, payload: AudioPayload) -> Result<(), PipelineError> {
        let generation = {
            let mut st = self.session.lock().unwrap();
            if matches!(st.phase, Phase::Capturing | Phase::Uploading) {
                return Err(PipelineError::InvalidPhase(st.phase.label()));
            }
            st.begin_session(Phase::Uploading)
        };
        log::debug!("pipeline: session {generation} uploading {} bytes", payload.bytes.len());

        {
            let mut st = self.session.lock().unwrap();
            if st.generation != generation {
                return Ok(());
            }
            st.phase = Phase::Transcribing;
        }

        self.process(payload, generation).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal stages
    // -----------------------------------------------------------------------

    /// Transcribe `payload`, then run both analysis streams to completion.
    ///
    /// The payload is consumed here, exactly once.  Every state write checks
    /// `generation` so a superseded session's results go nowhere.
    async fn process(&self, payload: AudioPayload, generation: u64) {
        // ── 1. Transcription ─────────────────────────────────────────────
        let transcript = match self.transcriber.transcribe(&payload).await {
            Ok(text) => text,
            Err(e) => {
                self.fail(generation, PipelineError::TranscriptionFailed(e.to_string()));
                return;
            }
        };
        drop(payload);

        log::debug!("pipeline: transcript = {transcript:?}");

        {
            let mut st = self.session.lock().unwrap();
            if st.generation != generation {
                log::debug!("pipeline: dropping transcript for superseded session");
                return;
            }
            st.transcript = Some(transcript.clone());
            st.phase = Phase::Analyzing;
        }

        // ── 2. Issue both analysis calls back-to-back ────────────────────
        let critique_req =
            self.analysis
                .stream_completion(FeedbackKind::Critique.instruction(), &transcript);
        let rewrite_req =
            self.analysis
                .stream_completion(FeedbackKind::Rewrite.instruction(), &transcript);
        let (critique, rewrite) = tokio::join!(critique_req, rewrite_req);

        // ── 3. Drain the streams concurrently ────────────────────────────
        match (critique, rewrite) {
            (Ok(critique_stream), Ok(rewrite_stream)) => {
                tokio::join!(
                    Self::consume_stream(
                        &self.session,
                        generation,
                        critique_stream,
                        FeedbackKind::Critique
                    ),
                    Self::consume_stream(
                        &self.session,
                        generation,
                        rewrite_stream,
                        FeedbackKind::Rewrite
                    ),
                );

                let mut st = self.session.lock().unwrap();
                if st.generation == generation {
                    st.phase = Phase::Ready;
                    log::debug!("pipeline: session {generation} ready");
                }
            }
            // One request failed outright: drain the survivor so its partial
            // content is preserved, then record the failure.
            (Ok(critique_stream), Err(e)) => {
                Self::consume_stream(
                    &self.session,
                    generation,
                    critique_stream,
                    FeedbackKind::Critique,
                )
                .await;
                self.fail(generation, PipelineError::AnalysisFailed(e.to_string()));
            }
            (Err(e), Ok(rewrite_stream)) => {
                Self::consume_stream(
                    &self.session,
                    generation,
                    rewrite_stream,
                    FeedbackKind::Rewrite,
                )
                .await;
                self.fail(generation, PipelineError::AnalysisFailed(e.to_string()));
            }
            (Err(e), Err(_)) => {
                self.fail(generation, PipelineError::AnalysisFailed(e.to_string()));
            }
        }
    }

    /// Drain one fragment stream into its buffer.
    ///
    /// Fragments append in arrival order; a malformed fragment is logged and
    /// skipped without aborting the stream.  The task owns its target buffer
    /// exclusively — the sibling stream never touches it.
    async fn consume_stream(
        session: &SharedSession,
        generation: u64,
        mut stream: FragmentStream,
        kind: FeedbackKind,
    ) {
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    let mut st = session.lock().unwrap();
                    if st.generation != generation {
                        log::debug!(
                            "pipeline: dropping {} fragment for superseded session",
                            kind.label()
                        );
                        return;
                    }
                    match kind {
                        FeedbackKind::Critique => st.critique.push_str(&fragment),
                        FeedbackKind::Rewrite => st.rewrite.push_str(&fragment),
                    }
                }
                Err(e) => {
                    log::warn!("pipeline: skipping bad {} fragment: {e}", kind.label());
                }
            }
        }
        log::debug!("pipeline: {} stream complete", kind.label());
    }

    /// Record a terminal collaborator failure, unless the session was
    /// superseded in the meantime.
    fn fail(&self, generation: u64, error: PipelineError) {
        let mut st = self.session.lock().unwrap();
        if st.generation != generation {
            log::debug!("pipeline: ignoring error from superseded session: {error}");
            return;
        }
        log::error!("pipeline: session {generation} failed: {error}");
        st.phase = Phase::Error;
        st.error = Some(error);
    }

    // -----------------------------------------------------------------------
    // Synthesis
    // -----------------------------------------------------------------------

    /// Synthesize the rewrite buffer with `voice` and play it back.
    ///
    /// Valid only when the rewrite buffer is non-empty; at most one
    /// synthesis call is in flight at a time (a concurrent call is rejected
    /// with [`PipelineError::SynthesisBusy`]).  Failures are non-fatal and
    /// leave the pipeline phase untouched.
    pub async fn synthesize(&self, voice: VoiceSelector) -> Result<(), PipelineError> {
        let text = {
            let st = self.session.lock().unwrap();
            if st.rewrite.is_empty() {
                return Err(PipelineError::NothingToSynthesize);
            }
            st.rewrite.clone()
        };

        if self
            .synthesis_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::SynthesisBusy);
        }

        let outcome = self.run_synthesis(&text, voice).await;
        self.synthesis_busy.store(false, Ordering::SeqCst);

        if let Err(ref e) = outcome {
            log::warn!("pipeline: {e}");
        }
        outcome
    }

    async fn run_synthesis(
        &self,
        text: &str,
        voice: VoiceSelector,
    ) -> Result<(), PipelineError> {
        let payload = self
            .synthesizer
            .synthesize(text, voice.voice_id())
            .await
            .map_err(|e| PipelineError::SynthesisFailed(e.to_string()))?;

        log::debug!(
            "pipeline: synthesized {} bytes for voice {}",
            payload.bytes.len(),
            voice.voice_id()
        );

        // Playback blocks until the clip finishes — keep it off the runtime.
        let player = Arc::clone(&self.player);
        match tokio::task::spawn_blocking(move || player.play(&payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PipelineError::SynthesisFailed(e.to_string())),
            Err(e) => Err(PipelineError::SynthesisFailed(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Discard the session and return to `Idle`, releasing any held capture
    /// device.  In-flight work for the old session is neutralised by the
    /// generation bump.
    pub fn reset(&self) {
        let was_capturing = {
            let st = self.session.lock().unwrap();
            st.phase == Phase::Capturing
        };
        if was_capturing {
            if let Err(e) = self.recorder.stop() {
                log::warn!("pipeline: reset could not release the device: {e}");
            }
        }

        let generation = self.session.lock().unwrap().begin_session(Phase::Idle);
        log::debug!("pipeline: reset to idle (next session {generation})");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
