use anyhow::Result;
use async_trait::async_trait;
use futures::channel::mpsc;
use superres_core::protocol::AssetEvent;
use superres_core::state::{ProviderState, ProvisionOutcome};

/// The platform service that knows whether the model is installed and can
/// install it.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    async fn ready_state(&self) -> Result<ProviderState>;

    /// Download/prepare the model. May run for a long time. Progress events
    /// are optional; a provider that cannot measure progress sends none.
    async fn ensure_ready(&self, progress: mpsc::Sender<AssetEvent>) -> Result<ProvisionOutcome>;
}
