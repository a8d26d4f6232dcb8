//! # superres-core
//!
//! Shared vocabulary for the AI super-resolution gate: the canonical
//! [`FeatureState`](state::FeatureState), user settings, the file batch being
//! resized, the messages that flow between the session and its state machine,
//! and the pure projection from all of that to UI-facing view state.

pub mod batch;
pub mod manifest;
pub mod protocol;
pub mod settings;
pub mod state;
pub mod view;

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the gate knows how to recover from.
///
/// None of these cross the state machine's public boundary; they are turned
/// into a safe [`FeatureState`](state::FeatureState) plus a status message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("AI super resolution isn't supported on this device.")]
    HardwareIneligible,
    #[error("AI features are turned off in system settings.")]
    ProviderDisabled,
    #[error("AI super resolution is unavailable right now: {0}")]
    ProviderUnavailable(String),
    #[error("Model download failed: {0}")]
    DownloadFailed(String),
    #[error("AI engine failed to start, using standard resizing: {0}")]
    EngineInitFailed(String),
    #[error("Could not read image size of {path:?}: {reason}")]
    ImageProbeFailed { path: PathBuf, reason: String },
    #[error("Settings error: {0}")]
    Settings(String),
}
