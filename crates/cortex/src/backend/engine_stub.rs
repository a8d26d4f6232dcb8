use crate::{Engine, EngineFactory};
use anyhow::Result;
use async_std::task;
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Stand-in used when the AI engine is missing or failed to start.
///
/// Resizes with Lanczos resampling so callers still get an image of the
/// requested size, just without AI detail reconstruction.
#[derive(Default)]
pub struct NoOpEngine;

impl NoOpEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Engine for NoOpEngine {
    async fn initialize(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn is_ai(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "no-op"
    }

    async fn upscale(&self, image: RgbaImage, scale: u32) -> Result<RgbaImage> {
        let scale = scale.max(1);
        if scale == 1 {
            return Ok(image);
        }
        let (width, height) = image.dimensions();
        let resized = task::spawn_blocking(move || {
            imageops::resize(
                &image,
                width.saturating_mul(scale),
                height.saturating_mul(scale),
                FilterType::Lanczos3,
            )
        })
        .await;
        Ok(resized)
    }
}

/// Factory for builds without an AI runtime. Every engine it makes is a
/// [`NoOpEngine`], so the feature runs degraded.
#[derive(Default)]
pub struct NoOpFactory;

#[async_trait]
impl EngineFactory for NoOpFactory {
    async fn create(&self) -> Result<Box<dyn Engine>> {
        Ok(Box::new(NoOpEngine::new()))
    }
}
