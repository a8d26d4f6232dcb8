use crate::provider::CapabilityProvider;
use futures::channel::mpsc;
use futures::FutureExt;
use log::{info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use superres_core::protocol::AssetEvent;
use superres_core::state::{EngineStatus, ProvisionOutcome};
use superres_core::GateError;
use superres_cortex::{create_engine, EngineFactory, EngineHandle};

/// Drives model provisioning and the post-ready engine setup.
///
/// State transitions around these calls belong to the state machine; this
/// type only does the work and reports how it went.
#[derive(Clone)]
pub struct ProvisionOrchestrator {
    provider: Arc<dyn CapabilityProvider>,
    factory: Arc<dyn EngineFactory>,
    engine: EngineHandle,
}

impl ProvisionOrchestrator {
    pub fn new(
        provider: Arc<dyn CapabilityProvider>,
        factory: Arc<dyn EngineFactory>,
        engine: EngineHandle,
    ) -> Self {
        Self {
            provider,
            factory,
            engine,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Ask the provider to install the model. Never fails: errors and panics
    /// come back as [`ProvisionOutcome::Failure`].
    pub async fn provision(&self, progress: mpsc::Sender<AssetEvent>) -> ProvisionOutcome {
        let outcome = match AssertUnwindSafe(self.provider.ensure_ready(progress))
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => ProvisionOutcome::Failure(e.to_string()),
            Err(_) => ProvisionOutcome::Failure("provider panicked".to_string()),
        };

        match &outcome {
            ProvisionOutcome::Success => info!("Model provisioned"),
            ProvisionOutcome::Failure(reason) => {
                warn!("{}", GateError::DownloadFailed(reason.clone()))
            }
        }
        outcome
    }

    /// Make sure an engine is installed, creating one only if the slot is
    /// empty.
    pub async fn ensure_engine(&self) -> EngineStatus {
        match self.engine.is_ai().await {
            Some(true) => EngineStatus::Full,
            Some(false) => EngineStatus::Degraded { reason: None },
            None => self.initialize_engine().await,
        }
    }

    /// Create a fresh engine and install it, replacing any existing one.
    pub async fn initialize_engine(&self) -> EngineStatus {
        let (engine, status) = create_engine(self.factory.as_ref()).await;
        if let Some(previous) = self.engine.install(engine).await {
            info!("Replaced engine '{}'", previous.name());
        }
        status
    }
}
