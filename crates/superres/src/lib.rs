//! # superres
//!
//! Session facade over the AI super-resolution gate. A [`SuperResolution`]
//! owns the feature state machine's event loop and exposes what a UI binds
//! to: a [`ViewState`] snapshot, a stream of updates and a handful of
//! commands.
//!
//! ```no_run
//! use superres::SuperResolution;
//! use superres_cortex::NoOpFactory;
//! use superres_provision::ProvisionConfig;
//! use std::sync::Arc;
//!
//! #[async_std::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProvisionConfig::load()?;
//!     let mut session = SuperResolution::from_config(&config, Arc::new(NoOpFactory))?;
//!     session.toggle_feature(true).await?;
//!     let view = session.wait_until(|v| v.state.is_resolved()).await?;
//!     println!("{:?}: {}", view.state, view.status_message);
//!     session.shutdown().await
//! }
//! ```

use anyhow::{anyhow, Result};
use async_std::task::{self, JoinHandle};
use futures::channel::mpsc;
use futures::sink::SinkExt;
use futures::StreamExt;
use log::{debug, error};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use superres_core::protocol::{StemCommand, StemOutput};
use superres_core::settings::{FileSettingsStore, SettingsStore};
use superres_core::view::ViewState;
use superres_cortex::{EngineFactory, EngineHandle};
use superres_provision::{LocalModelProvider, ProvisionConfig, SystemProbe};
use superres_stem::FeatureStateMachine;

pub use superres_core::protocol::AssetEvent;
pub use superres_core::state::FeatureState;
pub use superres_stem::Collaborators;

type Listeners = Arc<Mutex<Vec<mpsc::UnboundedSender<StemOutput>>>>;

pub struct SuperResolution {
    commands: mpsc::Sender<StemCommand>,
    latest: Arc<Mutex<ViewState>>,
    listeners: Listeners,
    engine: EngineHandle,
    settings: Arc<dyn SettingsStore>,
    machine: JoinHandle<Result<()>>,
    forwarder: JoinHandle<()>,
}

impl SuperResolution {
    /// Wire the stock collaborators from `config`: platform probe, local
    /// model provider and the TOML settings file.
    pub fn from_config(config: &ProvisionConfig, factory: Arc<dyn EngineFactory>) -> Result<Self> {
        let settings = Arc::new(FileSettingsStore::open(config.settings_path())?);
        Ok(Self::new(Collaborators {
            probe: Arc::new(SystemProbe::new(config.platforms.clone())),
            provider: Arc::new(LocalModelProvider::new(config)),
            factory,
            engine: EngineHandle::new(),
            settings,
            labels: config.labels.clone(),
        }))
    }

    /// Start a session. The state machine begins checking immediately.
    pub fn new(parts: Collaborators) -> Self {
        let engine = parts.engine.clone();
        let settings = parts.settings.clone();
        let mut machine = FeatureStateMachine::new(parts);

        let (commands, command_rx) = mpsc::channel(32);
        let (output_tx, mut output_rx) = mpsc::channel(100);

        let machine = task::spawn(async move {
            let result = machine.run(command_rx, output_tx).await;
            if let Err(e) = &result {
                error!("State machine error: {}", e);
            }
            result
        });

        // Placeholder until the loop publishes; keeps the stored scale in range.
        let latest = Arc::new(Mutex::new(ViewState {
            scale: settings.scale(),
            ..ViewState::default()
        }));
        let listeners: Listeners = Arc::new(Mutex::new(Vec::new()));

        let forwarder = {
            let latest = latest.clone();
            let listeners = listeners.clone();
            task::spawn(async move {
                while let Some(output) = output_rx.next().await {
                    if let StemOutput::View(view) = &output {
                        *lock(&latest) = view.clone();
                    }
                    lock(&listeners).retain(|tx| tx.unbounded_send(output.clone()).is_ok());
                }
                debug!("Session output closed");
            })
        };

        Self {
            commands,
            latest,
            listeners,
            engine,
            settings,
            machine,
            forwarder,
        }
    }

    /// Most recent projection.
    pub fn view(&self) -> ViewState {
        lock(&self.latest).clone()
    }

    /// Every output from now on: view changes and provisioning events.
    pub fn updates(&self) -> mpsc::UnboundedReceiver<StemOutput> {
        let (tx, rx) = mpsc::unbounded();
        lock(&self.listeners).push(tx);
        rx
    }

    /// Resolve with the first view (current or future) matching `predicate`.
    pub async fn wait_until<F>(&self, predicate: F) -> Result<ViewState>
    where
        F: Fn(&ViewState) -> bool,
    {
        let mut updates = self.updates();
        let current = self.view();
        if predicate(&current) {
            return Ok(current);
        }
        while let Some(output) = updates.next().await {
            if let StemOutput::View(view) = output {
                if predicate(&view) {
                    return Ok(view);
                }
            }
        }
        Err(anyhow!("session closed while waiting"))
    }

    pub async fn toggle_feature(&mut self, enabled: bool) -> Result<()> {
        self.send(StemCommand::ToggleFeature(enabled)).await
    }

    pub async fn request_download(&mut self) -> Result<()> {
        self.send(StemCommand::RequestDownload).await
    }

    pub async fn set_scale(&mut self, scale: u32) -> Result<()> {
        self.send(StemCommand::SetScale(scale)).await
    }

    pub async fn set_batch(&mut self, files: Vec<PathBuf>) -> Result<()> {
        self.send(StemCommand::SetBatch(files)).await
    }

    pub async fn reinitialize_engine(&mut self) -> Result<()> {
        self.send(StemCommand::ReinitializeEngine).await
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    /// Stop the state machine, cancelling in-flight work, and release the
    /// engine.
    pub async fn shutdown(mut self) -> Result<()> {
        // Err here means the loop already stopped.
        let _ = self.commands.send(StemCommand::Shutdown).await;
        let result = self.machine.await;
        self.forwarder.await;
        self.engine.dispose().await;
        result
    }

    async fn send(&mut self, command: StemCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|e| anyhow!("session is closed: {}", e))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
