use crate::view::ViewState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetEvent {
    /// Starting resolution and download process
    Started(String),
    /// Download progress in bytes (current, total)
    Progress(u64, u64),
    /// Successfully downloaded
    Complete(String),
    /// Error during asset handling
    Error(String),
}

/// Commands the UI binding sends to the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemCommand {
    ToggleFeature(bool),
    SetScale(u32),
    RequestDownload,
    SetBatch(Vec<PathBuf>),
    /// Replace the installed engine with a freshly created one.
    ReinitializeEngine,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StemOutput {
    /// Fresh projection after any state, setting or batch change
    View(ViewState),
    /// Provisioning lifecycle as reported by the provider
    Asset(AssetEvent),
}
