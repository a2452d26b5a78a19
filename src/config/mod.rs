//! Configuration module for the speech coach.
//!
//! Provides `CoachConfig` (top-level settings), sub-configs for each
//! collaborator, `AppPaths` for cross-platform config directories, and TOML
//! persistence via `CoachConfig::load` / `CoachConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AnalysisConfig, AudioConfig, CoachConfig, SynthesisConfig, TranscriptionConfig,
};
