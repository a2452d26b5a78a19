//! Pipeline phase machine and shared session state.
//!
//! [`Phase`] drives the pipeline's state machine.  Callers (CLI, UI) read
//! the current session via [`SharedSession`] to render progress and the two
//! accumulating feedback buffers.
//!
//! [`SessionState`] is the single source of truth for one
//! recording-to-feedback cycle: current phase, transcript, the critique and
//! rewrite stream buffers, the error (if any), and the session generation
//! used to neutralise superseded in-flight work.
//!
//! [`SharedSession`] is a type alias for `Arc<Mutex<SessionState>>` — cheap
//! to clone and safe to share across tasks.

use std::sync::{Arc, Mutex};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Phases of the speech-feedback pipeline.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──begin_capture──▶ Capturing ──end_capture──▶ Transcribing
///      ──submit_file───▶ Uploading ───────────────▶ Transcribing
/// Transcribing ──transcript──▶ Analyzing ──both streams done──▶ Ready
/// Transcribing / Analyzing ──collaborator failure──▶ Error
/// Ready / Error ──begin_capture / submit_file──▶ new session
/// any ──reset──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the user to start a recording or pick a file.
    Idle,

    /// Microphone is held exclusively; audio is being accumulated.
    Capturing,

    /// A pre-existing audio file is being taken in (alternate entry path).
    Uploading,

    /// The audio payload is with the transcription collaborator.
    Transcribing,

    /// Both analysis streams are open; fragments are being appended.
    Analyzing,

    /// Feedback is complete; synthesis of the rewrite is available.
    Ready,

    /// A terminal collaborator failure.  A fresh capture/upload starts a
    /// new session.
    Error,
}

impl Phase {
    /// Returns `true` while the pipeline is actively capturing or waiting on
    /// a collaborator.
    ///
    /// ```
    /// use speech_coach::pipeline::Phase;
    ///
    /// assert!(!Phase::Idle.is_busy());
    /// assert!(Phase::Capturing.is_busy());
    /// assert!(Phase::Transcribing.is_busy());
    /// assert!(Phase::Analyzing.is_busy());
    /// assert!(!Phase::Ready.is_busy());
    /// assert!(!Phase::Error.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Phase::Capturing | Phase::Uploading | Phase::Transcribing | Phase::Analyzing
        )
    }

    /// A short human-readable label suitable for status display.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Capturing => "Capturing",
            Phase::Uploading => "Uploading",
            Phase::Transcribing => "Transcribing",
            Phase::Analyzing => "Analyzing",
            Phase::Ready => "Ready",
            Phase::Error => "Error",
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors surfaced by the pipeline's operations.
///
/// The first four variants are the session error taxonomy stored in
/// [`SessionState::error`]; the rest are call-constraint violations returned
/// directly to the caller without touching the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Capture could not acquire the input device (permission denied or no
    /// device).  Recoverable by retrying capture.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The transcription collaborator failed.  Terminal for the session.
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    /// An analysis request failed before any streaming began.  Partial
    /// content from the sibling stream is preserved.
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// Synthesis or playback failed.  Non-fatal: the pipeline phase is
    /// unchanged.
    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// The requested operation is not valid in the current phase.
    #[error("operation not valid while {0}")]
    InvalidPhase(&'static str),

    /// A synthesis call is already in flight.
    #[error("a synthesis request is already in flight")]
    SynthesisBusy,

    /// `synthesize` was called with an empty rewrite buffer.
    #[error("rewrite text is empty — nothing to synthesize")]
    NothingToSynthesize,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Shared session state — one recording-to-feedback cycle.
///
/// Held behind [`SharedSession`].  The pipeline mutates it; callers read it
/// to render progress.  Every asynchronous continuation compares
/// `generation` under the lock before writing, so work belonging to a
/// superseded session detectably no-ops.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Monotonic session counter.  Bumped whenever a new capture/upload
    /// supersedes the current session.
    pub generation: u64,

    /// Current phase of the pipeline.
    pub phase: Phase,

    /// Transcript text — `None` until transcription completes.
    pub transcript: Option<String>,

    /// Critique stream buffer, appended in fragment-arrival order.
    pub critique: String,

    /// Rewrite stream buffer, appended in fragment-arrival order.
    pub rewrite: String,

    /// Error to display when `phase == Phase::Error`.
    pub error: Option<PipelineError>,
}

impl SessionState {
    /// Create a fresh state in `Idle` at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersede the current session: bump the generation, clear all
    /// per-session fields and enter `phase`.  Returns the new generation
    /// for tagging the continuations of this session.
    pub fn begin_session(&mut self, phase: Phase) -> u64 {
        self.generation += 1;
        self.phase = phase;
        self.transcript = None;
        self.critique.clear();
        self.rewrite.clear();
        self.error = None;
        self.generation
    }
}

// ---------------------------------------------------------------------------
// SharedSession
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`SessionState`].
///
/// Cheap to clone (`Arc` clone).  Lock with `.lock().unwrap()` for a short
/// critical section; do **not** hold the lock across `.await` points.
pub type SharedSession = Arc<Mutex<SessionState>>;

/// Construct a new [`SharedSession`] wrapping a default [`SessionState`].
pub fn new_shared_session() -> SharedSession {
    Arc::new(Mutex::new(SessionState::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Phase::is_busy ---

    #[test]
    fn idle_ready_error_are_not_busy() {
        assert!(!Phase::Idle.is_busy());
        assert!(!Phase::Ready.is_busy());
        assert!(!Phase::Error.is_busy());
    }

    #[test]
    fn in_flight_phases_are_busy() {
        assert!(Phase::Capturing.is_busy());
        assert!(Phase::Uploading.is_busy());
        assert!(Phase::Transcribing.is_busy());
        assert!(Phase::Analyzing.is_busy());
    }

    // ---- Phase::label ---

    #[test]
    fn labels_are_distinct() {
        let labels = [
            Phase::Idle,
            Phase::Capturing,
            Phase::Uploading,
            Phase::Transcribing,
            Phase::Analyzing,
            Phase::Ready,
            Phase::Error,
        ]
        .map(|p| p.label());
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }

    // ---- Default ---

    #[test]
    fn default_phase_is_idle() {
        assert_eq!(Phase::default(), Phase::Idle);
    }

    // ---- SessionState ---

    #[test]
    fn new_session_starts_idle_at_generation_zero() {
        let state = SessionState::new();
        assert_eq!(state.generation, 0);
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.transcript.is_none());
        assert!(state.critique.is_empty());
        assert!(state.rewrite.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn begin_session_bumps_generation_and_clears() {
        let mut state = SessionState::new();
        state.transcript = Some("old".into());
        state.critique.push_str("old critique");
        state.rewrite.push_str("old rewrite");
        state.error = Some(PipelineError::TranscriptionFailed("boom".into()));

        let generation = state.begin_session(Phase::Capturing);

        assert_eq!(generation, 1);
        assert_eq!(state.generation, 1);
        assert_eq!(state.phase, Phase::Capturing);
        assert!(state.transcript.is_none());
        assert!(state.critique.is_empty());
        assert!(state.rewrite.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn successive_sessions_get_increasing_generations() {
        let mut state = SessionState::new();
        let g1 = state.begin_session(Phase::Capturing);
        let g2 = state.begin_session(Phase::Uploading);
        assert!(g2 > g1);
    }

    // ---- SharedSession ---

    #[test]
    fn shared_session_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedSession>();
    }

    #[test]
    fn shared_session_can_be_cloned_and_mutated() {
        let session = new_shared_session();
        let session2 = Arc::clone(&session);

        session.lock().unwrap().phase = Phase::Capturing;
        assert_eq!(session2.lock().unwrap().phase, Phase::Capturing);
    }
}
