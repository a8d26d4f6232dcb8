use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::FutureExt;
use image::RgbaImage;
use log::{info, warn};
use std::panic::AssertUnwindSafe;
use superres_core::state::EngineStatus;
use superres_core::GateError;

pub mod backend;
pub mod handle;

pub use backend::{NoOpEngine, NoOpFactory};
pub use handle::EngineHandle;

#[async_trait]
pub trait Engine: Send + Sync {
    /// Prepare the engine for use. `Ok(false)` means the engine is present
    /// but could not start.
    async fn initialize(&mut self) -> Result<bool>;

    /// Whether this engine actually runs the AI model
    fn is_ai(&self) -> bool;

    fn name(&self) -> &str;

    /// Upscale `image` by an integer factor
    async fn upscale(&self, image: RgbaImage, scale: u32) -> Result<RgbaImage>;
}

/// Builds the AI engine. Supplied by the host.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn Engine>>;
}

/// Create and initialize an engine from `factory`, falling back to
/// [`NoOpEngine`] if creation or initialization fails or panics.
pub async fn create_engine(factory: &dyn EngineFactory) -> (Box<dyn Engine>, EngineStatus) {
    let attempt = AssertUnwindSafe(try_create(factory))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(anyhow!("engine factory panicked")));

    match attempt {
        Ok(engine) if engine.is_ai() => {
            info!("AI engine '{}' initialized", engine.name());
            (engine, EngineStatus::Full)
        }
        Ok(engine) => {
            warn!("Engine '{}' does not run the AI model", engine.name());
            (engine, EngineStatus::Degraded { reason: None })
        }
        Err(e) => {
            let reason = e.to_string();
            warn!("{}", GateError::EngineInitFailed(reason.clone()));
            (
                Box::new(NoOpEngine::new()),
                EngineStatus::Degraded {
                    reason: Some(reason),
                },
            )
        }
    }
}

async fn try_create(factory: &dyn EngineFactory) -> Result<Box<dyn Engine>> {
    let mut engine = factory.create().await?;
    if engine.initialize().await? {
        Ok(engine)
    } else {
        Err(anyhow!("{} reported initialization failure", engine.name()))
    }
}
