//! Command-line harness for the speech-coach pipeline.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`CoachConfig`] from disk (returns default on first run), then
//!    fill missing API keys from the environment.
//! 3. Build the pipeline with the production collaborators.
//! 4. Either record from the microphone until Enter is pressed, or submit
//!    the audio file given as the first argument.
//! 5. Render phases and the two feedback buffers as they stream in.
//! 6. Offer to speak the rewrite aloud.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use speech_coach::{
    audio::AudioPayload,
    config::CoachConfig,
    pipeline::{Phase, SharedSession, SpeechFeedbackPipeline},
    synthesis::{Category, Gender, VoiceSelector},
};

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

/// Read one line from stdin without blocking the async runtime.
async fn read_line() -> String {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        line.trim().to_string()
    })
    .await
    .unwrap_or_default()
}

/// Map a file extension to the content type the collaborators expect.
fn content_type_for(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Progress rendering
// ---------------------------------------------------------------------------

/// Poll the session and print phase changes plus newly arrived fragments
/// until the pipeline settles in `Ready` or `Error`.
async fn render_progress(session: SharedSession) {
    let mut last_phase = None;
    let mut critique_len = 0;
    let mut rewrite_len = 0;
    let mut critique_header = false;
    let mut seen_busy = false;

    loop {
        let (phase, critique_tail, rewrite_tail, error) = {
            let st = session.lock().unwrap();
            (
                st.phase,
                st.critique[critique_len..].to_string(),
                st.rewrite[rewrite_len..].to_string(),
                st.error.clone(),
            )
        };

        if last_phase != Some(phase) {
            println!("\n[{}]", phase.label());
            last_phase = Some(phase);
        }

        if !critique_tail.is_empty() {
            if !critique_header {
                println!("--- Critique ---");
                critique_header = true;
            }
            print!("{critique_tail}");
            let _ = std::io::stdout().flush();
            critique_len += critique_tail.len();
        }
        rewrite_len += rewrite_tail.len();

        // The task is spawned before the pipeline starts, so wait for the
        // first busy phase before treating a settled one as final.
        seen_busy |= phase.is_busy();
        if seen_busy && !phase.is_busy() {
            if let Some(e) = error {
                eprintln!("error: {e}");
            }
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Configuration
    let config = CoachConfig::load()
        .unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            CoachConfig::default()
        })
        .with_env_keys();

    // 3. Pipeline
    let pipeline = SpeechFeedbackPipeline::from_config(&config);
    let session = pipeline.session();

    // 4. Entry path: file argument or live capture
    let render = tokio::spawn(render_progress(Arc::clone(&session)));

    if let Some(path) = std::env::args().nth(1) {
        let path = std::path::PathBuf::from(path);
        let bytes = std::fs::read(&path)?;
        let payload = AudioPayload::new(bytes, content_type_for(&path));
        log::info!("Submitting {} ({} bytes)", path.display(), payload.bytes.len());
        pipeline.submit_file(payload).await?;
    } else {
        pipeline.begin_capture()?;
        println!("Recording — press Enter to stop.");
        read_line().await;
        pipeline.end_capture().await?;
    }

    // 5. Final state
    render.await?;
    {
        let st = session.lock().unwrap();
        if st.phase != Phase::Ready {
            return Ok(());
        }
        println!("\n--- Rewrite ---\n{}", st.rewrite);
    }

    // 6. Optional playback of the rewrite
    print!("\nSpeak the rewrite aloud? [y/N] ");
    let _ = std::io::stdout().flush();
    if read_line().await.eq_ignore_ascii_case("y") {
        let voice = VoiceSelector::new(Category::Presentation, Gender::Female);
        if let Err(e) = pipeline.synthesize(voice).await {
            eprintln!("playback failed: {e}");
        }
    }

    Ok(())
}
