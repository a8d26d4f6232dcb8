use crate::{Engine, NoOpEngine};
use anyhow::Result;
use async_std::sync::RwLock;
use image::RgbaImage;
use log::debug;
use std::sync::Arc;

/// Shared slot for the application's single inference engine.
///
/// Cloning the handle shares the slot. The owner decides when an engine is
/// installed, replaced or disposed; nothing here is global.
#[derive(Clone, Default)]
pub struct EngineHandle {
    slot: Arc<RwLock<Option<Box<dyn Engine>>>>,
}

impl EngineHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `engine` in the slot and return whatever was there before.
    pub async fn install(&self, engine: Box<dyn Engine>) -> Option<Box<dyn Engine>> {
        debug!("Installing engine '{}'", engine.name());
        self.slot.write().await.replace(engine)
    }

    pub async fn dispose(&self) -> Option<Box<dyn Engine>> {
        self.slot.write().await.take()
    }

    pub async fn is_installed(&self) -> bool {
        self.slot.read().await.is_some()
    }

    /// `Some(true)` when the installed engine runs the AI model.
    pub async fn is_ai(&self) -> Option<bool> {
        self.slot.read().await.as_ref().map(|engine| engine.is_ai())
    }

    /// Upscale with the installed engine, or conventionally if none is
    /// installed yet.
    pub async fn upscale(&self, image: RgbaImage, scale: u32) -> Result<RgbaImage> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(engine) => engine.upscale(image, scale).await,
            None => NoOpEngine::new().upscale(image, scale).await,
        }
    }
}
