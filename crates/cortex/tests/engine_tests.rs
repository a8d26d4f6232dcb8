use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::RgbaImage;
use superres_core::state::EngineStatus;
use superres_cortex::{create_engine, Engine, EngineFactory, EngineHandle, NoOpEngine, NoOpFactory};

struct Doubler {
    init_ok: bool,
}

#[async_trait]
impl Engine for Doubler {
    async fn initialize(&mut self) -> Result<bool> {
        Ok(self.init_ok)
    }

    fn is_ai(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "doubler"
    }

    async fn upscale(&self, image: RgbaImage, scale: u32) -> Result<RgbaImage> {
        NoOpEngine::new().upscale(image, scale).await
    }
}

enum Behaviour {
    Works,
    InitReturnsFalse,
    CreateFails,
    CreatePanics,
}

struct TestFactory(Behaviour);

#[async_trait]
impl EngineFactory for TestFactory {
    async fn create(&self) -> Result<Box<dyn Engine>> {
        match self.0 {
            Behaviour::Works => Ok(Box::new(Doubler { init_ok: true })),
            Behaviour::InitReturnsFalse => Ok(Box::new(Doubler { init_ok: false })),
            Behaviour::CreateFails => Err(anyhow!("no NPU driver")),
            Behaviour::CreatePanics => panic!("driver crashed"),
        }
    }
}

#[async_std::test]
async fn test_factory_engine_is_used_when_init_succeeds() {
    let (engine, status) = create_engine(&TestFactory(Behaviour::Works)).await;
    assert_eq!(status, EngineStatus::Full);
    assert!(engine.is_ai());
}

#[async_std::test]
async fn test_failures_fall_back_to_noop() {
    for behaviour in [
        Behaviour::InitReturnsFalse,
        Behaviour::CreateFails,
        Behaviour::CreatePanics,
    ] {
        let (engine, status) = create_engine(&TestFactory(behaviour)).await;
        assert!(matches!(status, EngineStatus::Degraded { reason: Some(_) }));
        assert!(!engine.is_ai());
        assert_eq!(engine.name(), "no-op");
    }
}

#[async_std::test]
async fn test_noop_factory_runs_degraded() {
    let (engine, status) = create_engine(&NoOpFactory).await;
    assert_eq!(status, EngineStatus::Degraded { reason: None });
    assert!(!engine.is_ai());
}

#[async_std::test]
async fn test_noop_engine_scales_dimensions() -> Result<()> {
    let out = NoOpEngine::new().upscale(RgbaImage::new(3, 2), 4).await?;
    assert_eq!(out.dimensions(), (12, 8));
    Ok(())
}

#[async_std::test]
async fn test_handle_lifecycle() -> Result<()> {
    let handle = EngineHandle::new();
    assert!(!handle.is_installed().await);

    // Empty slot still resizes.
    let out = handle.upscale(RgbaImage::new(2, 2), 2).await?;
    assert_eq!(out.dimensions(), (4, 4));

    assert!(handle.install(Box::new(NoOpEngine::new())).await.is_none());
    assert_eq!(handle.is_ai().await, Some(false));

    let previous = handle.install(Box::new(Doubler { init_ok: true })).await;
    assert_eq!(previous.map(|e| e.name().to_string()), Some("no-op".to_string()));
    assert_eq!(handle.clone().is_ai().await, Some(true));

    assert!(handle.dispose().await.is_some());
    assert!(!handle.is_installed().await);
    Ok(())
}

#[async_std::test]
async fn test_failure_reason_is_reported() {
    let (_, status) = create_engine(&TestFactory(Behaviour::CreateFails)).await;
    assert_eq!(
        status,
        EngineStatus::Degraded {
            reason: Some("no NPU driver".to_string())
        }
    );
}
