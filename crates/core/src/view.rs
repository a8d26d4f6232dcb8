//! Pure projection from machine state to what the UI binds to.
//!
//! Nothing here is authoritative: every flag is recomputed from
//! [`ProjectionInput`] after each change and never written independently.

use crate::batch::{BatchContext, ProbedDimensions};
use crate::manifest::Labels;
use crate::state::{EngineStatus, FeatureState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub state: FeatureState,
    pub status_message: String,
    pub download_progress: f64,
    pub scale: u32,
    pub is_supported: bool,
    pub is_available: bool,
    pub is_downloading: bool,
    pub show_enable_control: bool,
    pub show_download_prompt: bool,
    pub show_ai_controls: bool,
    pub show_size_descriptions: bool,
    pub show_gif_warning: bool,
    pub engine_degraded: bool,
    pub current_resolution_text: String,
    pub new_resolution_text: String,
}

pub struct ProjectionInput<'a> {
    pub state: FeatureState,
    pub setting_enabled: bool,
    pub scale: u32,
    pub batch: &'a BatchContext,
    pub dimensions: ProbedDimensions,
    pub status_message: &'a str,
    pub download_progress: f64,
    pub engine: &'a EngineStatus,
    pub labels: &'a Labels,
}

pub fn project(input: &ProjectionInput<'_>) -> ViewState {
    let state = input.state;
    let enabled = input.setting_enabled;

    let is_supported = !matches!(state, FeatureState::Unknown | FeatureState::NotSupported);
    let is_available = state == FeatureState::Ready;
    let show_size_descriptions = enabled && !input.batch.has_multiple_files();

    let (current_resolution_text, new_resolution_text) = if show_size_descriptions {
        resolution_texts(input.dimensions, input.scale, input.labels)
    } else {
        (String::new(), String::new())
    };

    ViewState {
        state,
        status_message: input.status_message.to_string(),
        download_progress: input.download_progress.clamp(0.0, 1.0),
        scale: input.scale,
        is_supported,
        is_available,
        is_downloading: state == FeatureState::ModelDownloading,
        show_enable_control: is_supported,
        show_download_prompt: state == FeatureState::ModelNotReady && enabled,
        show_ai_controls: enabled && is_available,
        show_size_descriptions,
        show_gif_warning: enabled && input.batch.contains_gif(),
        engine_degraded: is_available && input.engine.is_degraded(),
        current_resolution_text,
        new_resolution_text,
    }
}

fn resolution_texts(dimensions: ProbedDimensions, scale: u32, labels: &Labels) -> (String, String) {
    match dimensions {
        ProbedDimensions::Pending => (String::new(), String::new()),
        ProbedDimensions::Known { width, height } => (
            format!("{}: {} × {}", labels.current, width, height),
            format!(
                "{}: {} × {}",
                labels.new,
                u64::from(width) * u64::from(scale),
                u64::from(height) * u64::from(scale)
            ),
        ),
        ProbedDimensions::Failed => (
            format!("{}: {}", labels.current, labels.unknown_size),
            format!("{}: {}", labels.new, labels.unknown_size),
        ),
    }
}
