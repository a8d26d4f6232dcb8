use anyhow::{anyhow, Result};
use async_std::task::{self, JoinHandle};
use futures::channel::mpsc;
use futures::sink::SinkExt;
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use superres_core::batch::{read_dimensions, BatchContext, ProbedDimensions};
use superres_core::manifest::Labels;
use superres_core::protocol::{AssetEvent, StemCommand, StemOutput};
use superres_core::settings::{clamp_scale, SettingsChange, SettingsStore};
use superres_core::state::{EngineStatus, Eligibility, FeatureState, ProvisionOutcome, Readiness};
use superres_core::view::{project, ProjectionInput, ViewState};
use superres_core::GateError;
use superres_cortex::{EngineFactory, EngineHandle};
use superres_provision::{
    CapabilityProbe, CapabilityProvider, ProvisionOrchestrator, ReadinessOracle,
};

pub const UNCHECKED_MESSAGE: &str = "AI super resolution hasn't been checked yet.";
pub const CHECKING_MESSAGE: &str = "Checking AI super resolution availability…";
pub const MODEL_NOT_READY_MESSAGE: &str =
    "The AI model isn't installed yet. Download it to use AI super resolution.";
pub const DOWNLOADING_MESSAGE: &str = "Downloading the AI model…";
pub const DOWNLOAD_CANCELLED_MESSAGE: &str = "The AI model download was cancelled.";
pub const NO_AI_ENGINE_MESSAGE: &str =
    "No AI engine is available in this build. Images are resized without AI.";

/// Everything the state machine talks to.
pub struct Collaborators {
    pub probe: Arc<dyn CapabilityProbe>,
    pub provider: Arc<dyn CapabilityProvider>,
    pub factory: Arc<dyn EngineFactory>,
    pub engine: EngineHandle,
    pub settings: Arc<dyn SettingsStore>,
    pub labels: Labels,
}

/// Results of spawned work, tagged with the generation that started it.
enum Completion {
    Readiness { generation: u64, readiness: Readiness },
    Asset { generation: u64, event: AssetEvent },
    Provisioned { generation: u64, outcome: ProvisionOutcome },
    Engine { generation: u64, status: EngineStatus },
    Dimensions {
        generation: u64,
        result: Result<(u32, u32), GateError>,
    },
}

/// Sole owner and writer of [`FeatureState`].
///
/// All mutation happens inside [`FeatureStateMachine::run`]. Readiness
/// queries, provisioning and dimension reads run as spawned tasks that report
/// back with the generation they were started under; anything from an older
/// generation is dropped.
pub struct FeatureStateMachine {
    probe: Arc<dyn CapabilityProbe>,
    oracle: ReadinessOracle,
    orchestrator: ProvisionOrchestrator,
    settings: Arc<dyn SettingsStore>,
    labels: Labels,

    state: FeatureState,
    message: String,
    progress: f64,
    engine_status: EngineStatus,
    enabled: bool,
    scale: u32,

    batch: BatchContext,
    dimensions: ProbedDimensions,
    batch_generation: u64,
    dimension_task: Option<JoinHandle<()>>,

    generation: u64,
    active: Option<JoinHandle<()>>,
    engine_task: Option<JoinHandle<()>>,
    engine_generation: u64,

    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: Option<mpsc::UnboundedReceiver<Completion>>,
    last_view: Option<ViewState>,
}

impl FeatureStateMachine {
    pub fn new(parts: Collaborators) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded();
        let enabled = parts.settings.use_ai_super_resolution();
        let scale = parts.settings.scale();
        Self {
            probe: parts.probe,
            oracle: ReadinessOracle::new(parts.provider.clone()),
            orchestrator: ProvisionOrchestrator::new(parts.provider, parts.factory, parts.engine),
            settings: parts.settings,
            labels: parts.labels,
            state: FeatureState::Unknown,
            message: UNCHECKED_MESSAGE.to_string(),
            progress: 0.0,
            engine_status: EngineStatus::Absent,
            enabled,
            scale,
            batch: BatchContext::default(),
            dimensions: ProbedDimensions::Pending,
            batch_generation: 0,
            dimension_task: None,
            generation: 0,
            active: None,
            engine_task: None,
            engine_generation: 0,
            done_tx,
            done_rx: Some(done_rx),
            last_view: None,
        }
    }

    pub fn state(&self) -> FeatureState {
        self.state
    }

    /// Run the event loop until [`StemCommand::Shutdown`] arrives or the
    /// command channel closes. Emits a [`StemOutput::View`] whenever the
    /// projection changes.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<StemCommand>,
        mut output: mpsc::Sender<StemOutput>,
    ) -> Result<()> {
        let mut done_rx = self
            .done_rx
            .take()
            .ok_or_else(|| anyhow!("state machine loop already ran"))?;
        let subscription = self.settings.subscribe();
        let subscription_id = subscription.id;
        let mut settings_rx = subscription.events;

        self.startup();
        self.publish(&mut output).await;

        loop {
            futures::select! {
                command = commands.next() => match command {
                    Some(StemCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                completion = done_rx.next() => {
                    if let Some(completion) = completion {
                        self.handle_completion(completion, &mut output).await;
                    }
                },
                change = settings_rx.next() => {
                    if let Some(change) = change {
                        self.handle_setting(change).await;
                    }
                },
            }
            self.publish(&mut output).await;
        }

        self.teardown().await;
        self.settings.unsubscribe(subscription_id);
        info!("Feature state machine stopped in {:?}", self.state);
        Ok(())
    }

    fn startup(&mut self) {
        if self.probe.check_eligibility() == Eligibility::Unsupported {
            self.fail_safe(GateError::HardwareIneligible);
            return;
        }
        // Only users who opted in pay for a readiness query.
        if self.enabled {
            self.begin_check();
        }
    }

    async fn handle_command(&mut self, command: StemCommand) {
        debug!("Command: {:?}", command);
        match command {
            StemCommand::ToggleFeature(enabled) => {
                if let Err(e) = self.settings.set_use_ai_super_resolution(enabled) {
                    warn!("Could not persist toggle: {}", e);
                }
                self.toggle(enabled).await;
            }
            StemCommand::SetScale(scale) => {
                self.scale = match self.settings.set_scale(scale) {
                    Ok(stored) => stored,
                    Err(e) => {
                        warn!("Could not persist scale: {}", e);
                        clamp_scale(scale)
                    }
                };
            }
            StemCommand::RequestDownload => self.request_download().await,
            StemCommand::SetBatch(files) => self.set_batch(files).await,
            StemCommand::ReinitializeEngine => self.reinitialize_engine().await,
            StemCommand::Shutdown => {}
        }
    }

    /// React to a change in the store. The payload may be an echo of one of
    /// our own earlier writes, so the stored value is read back and compared
    /// with what the machine already holds.
    async fn handle_setting(&mut self, change: SettingsChange) {
        debug!("Settings changed: {:?}", change);
        let stored = self.settings.snapshot();
        if stored.use_ai_super_resolution != self.enabled {
            self.toggle(stored.use_ai_super_resolution).await;
        }
        self.scale = stored.scale();
    }

    async fn toggle(&mut self, enabled: bool) {
        let was_enabled = self.enabled;
        self.enabled = enabled;

        if enabled {
            if self.state != FeatureState::Unknown {
                return;
            }
            match self.settings.normalize_scale() {
                Ok(scale) => self.scale = scale,
                Err(e) => warn!("Could not persist scale: {}", e),
            }
            // Repeated enables while a check is in flight keep that check.
            if was_enabled && self.active.is_some() {
                return;
            }
            if self.probe.check_eligibility() == Eligibility::Unsupported {
                self.fail_safe(GateError::HardwareIneligible);
                return;
            }
            self.begin_check();
        } else {
            if self.active.is_none() {
                return;
            }
            self.supersede().await;
            match self.state {
                FeatureState::ModelDownloading => {
                    self.transition(FeatureState::ModelNotReady);
                    self.progress = 0.0;
                    self.message = DOWNLOAD_CANCELLED_MESSAGE.to_string();
                }
                FeatureState::Unknown => self.message = UNCHECKED_MESSAGE.to_string(),
                _ => {}
            }
        }
    }

    fn begin_check(&mut self) {
        let generation = self.next_generation();
        self.message = CHECKING_MESSAGE.to_string();

        let oracle = self.oracle.clone();
        let done_tx = self.done_tx.clone();
        self.active = Some(task::spawn(async move {
            let readiness = oracle.query_state().await;
            let _ = done_tx.unbounded_send(Completion::Readiness {
                generation,
                readiness,
            });
        }));
    }

    async fn request_download(&mut self) {
        if self.state != FeatureState::ModelNotReady {
            warn!("Ignoring download request in {:?}", self.state);
            return;
        }
        self.supersede().await;
        let generation = self.generation;

        self.transition(FeatureState::ModelDownloading);
        self.progress = 0.0;
        self.message = DOWNLOADING_MESSAGE.to_string();

        let orchestrator = self.orchestrator.clone();
        let done_tx = self.done_tx.clone();
        self.active = Some(task::spawn(async move {
            let (progress_tx, mut progress_rx) = mpsc::channel(32);
            let forward_tx = done_tx.clone();
            let forward = async move {
                while let Some(event) = progress_rx.next().await {
                    let _ = forward_tx.unbounded_send(Completion::Asset { generation, event });
                }
            };
            let (outcome, ()) = futures::join!(orchestrator.provision(progress_tx), forward);
            let _ = done_tx.unbounded_send(Completion::Provisioned {
                generation,
                outcome,
            });
        }));
    }

    async fn set_batch(&mut self, files: Vec<PathBuf>) {
        self.batch = BatchContext::new(files);
        self.dimensions = ProbedDimensions::Pending;
        self.batch_generation += 1;
        if let Some(task) = self.dimension_task.take() {
            task.cancel().await;
        }
    }

    /// Start reading the first file's size the first time it is needed.
    fn ensure_dimensions(&mut self) {
        let wanted = self.enabled && !self.batch.has_multiple_files();
        if !wanted || self.dimensions != ProbedDimensions::Pending || self.dimension_task.is_some() {
            return;
        }
        let Some(path) = self.batch.first().map(|p| p.to_path_buf()) else {
            return;
        };

        let generation = self.batch_generation;
        let done_tx = self.done_tx.clone();
        self.dimension_task = Some(task::spawn(async move {
            let result = task::spawn_blocking(move || read_dimensions(&path)).await;
            let _ = done_tx.unbounded_send(Completion::Dimensions { generation, result });
        }));
    }

    async fn reinitialize_engine(&mut self) {
        if self.state != FeatureState::Ready {
            warn!("Ignoring engine re-initialization in {:?}", self.state);
            return;
        }
        let orchestrator = self.orchestrator.clone();
        self.spawn_engine_task(async move { orchestrator.initialize_engine().await })
            .await;
    }

    async fn start_engine(&mut self) {
        let orchestrator = self.orchestrator.clone();
        self.spawn_engine_task(async move { orchestrator.ensure_engine().await })
            .await;
    }

    /// At most one engine task runs; starting another stops the previous one
    /// and ignores anything it already reported.
    async fn spawn_engine_task<F>(&mut self, init: F)
    where
        F: std::future::Future<Output = EngineStatus> + Send + 'static,
    {
        if let Some(task) = self.engine_task.take() {
            task.cancel().await;
        }
        self.engine_generation += 1;
        let generation = self.engine_generation;
        self.engine_status = EngineStatus::Initializing;

        let done_tx = self.done_tx.clone();
        self.engine_task = Some(task::spawn(async move {
            let status = init.await;
            let _ = done_tx.unbounded_send(Completion::Engine { generation, status });
        }));
    }

    async fn handle_completion(
        &mut self,
        completion: Completion,
        output: &mut mpsc::Sender<StemOutput>,
    ) {
        match completion {
            Completion::Readiness {
                generation,
                readiness,
            } => {
                if !self.is_current(generation) {
                    return;
                }
                self.active = None;
                self.apply_readiness(readiness).await;
            }
            Completion::Asset { generation, event } => {
                if !self.is_current(generation) {
                    return;
                }
                if let AssetEvent::Progress(current, total) = event {
                    if total > 0 {
                        self.progress = (current as f64 / total as f64).clamp(0.0, 1.0);
                    }
                }
                let _ = output.send(StemOutput::Asset(event)).await;
            }
            Completion::Provisioned {
                generation,
                outcome,
            } => {
                if !self.is_current(generation) {
                    return;
                }
                self.active = None;
                self.progress = 0.0;
                match outcome {
                    ProvisionOutcome::Success => {
                        if self.transition(FeatureState::Ready) {
                            self.message.clear();
                            self.start_engine().await;
                        }
                    }
                    ProvisionOutcome::Failure(reason) => {
                        self.transition(FeatureState::ModelNotReady);
                        self.message = GateError::DownloadFailed(reason).to_string();
                    }
                }
            }
            Completion::Engine { generation, status } => {
                // Not tied to readiness generations; the engine outlives checks.
                if generation != self.engine_generation {
                    debug!("Dropping status from a replaced engine task");
                    return;
                }
                self.engine_task = None;
                if self.state == FeatureState::Ready {
                    match &status {
                        EngineStatus::Degraded { reason: Some(reason) } => {
                            self.message = GateError::EngineInitFailed(reason.clone()).to_string();
                        }
                        EngineStatus::Degraded { reason: None } => {
                            self.message = NO_AI_ENGINE_MESSAGE.to_string();
                        }
                        EngineStatus::Full => self.message.clear(),
                        _ => {}
                    }
                }
                self.engine_status = status;
            }
            Completion::Dimensions { generation, result } => {
                if generation != self.batch_generation {
                    debug!("Dropping dimensions for an old batch");
                    return;
                }
                self.dimension_task = None;
                self.dimensions = match result {
                    Ok((width, height)) => ProbedDimensions::Known { width, height },
                    Err(e) => {
                        warn!("{}", e);
                        ProbedDimensions::Failed
                    }
                };
            }
        }
    }

    async fn apply_readiness(&mut self, readiness: Readiness) {
        match readiness {
            Readiness::Ready => {
                if self.transition(FeatureState::Ready) {
                    self.message.clear();
                    self.start_engine().await;
                }
            }
            Readiness::NotReady => {
                if self.transition(FeatureState::ModelNotReady) {
                    self.message = MODEL_NOT_READY_MESSAGE.to_string();
                }
            }
            Readiness::DisabledByUser => self.fail_safe(GateError::ProviderDisabled),
            Readiness::UnknownFailure => self.fail_safe(GateError::ProviderUnavailable(
                "the readiness check failed".to_string(),
            )),
        }
    }

    fn fail_safe(&mut self, reason: GateError) {
        if self.transition(FeatureState::NotSupported) {
            info!("AI super resolution hidden: {}", reason);
            self.message = reason.to_string();
        }
    }

    fn transition(&mut self, next: FeatureState) -> bool {
        if self.state == next {
            return true;
        }
        if !self.state.can_transition_to(next) {
            error!("Rejected transition {:?} -> {:?}", self.state, next);
            return false;
        }
        info!("Feature state {:?} -> {:?}", self.state, next);
        self.state = next;
        true
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        if generation == self.generation {
            true
        } else {
            debug!(
                "Dropping completion from generation {} (current {})",
                generation, self.generation
            );
            false
        }
    }

    /// Invalidate the active operation and stop its task.
    async fn supersede(&mut self) {
        self.next_generation();
        if let Some(task) = self.active.take() {
            task.cancel().await;
        }
    }

    async fn teardown(&mut self) {
        self.supersede().await;
        if self.state == FeatureState::ModelDownloading {
            self.transition(FeatureState::ModelNotReady);
        }
        self.progress = 0.0;
        if let Some(task) = self.dimension_task.take() {
            task.cancel().await;
        }
        if let Some(task) = self.engine_task.take() {
            task.cancel().await;
        }
    }

    fn view(&self) -> ViewState {
        project(&ProjectionInput {
            state: self.state,
            setting_enabled: self.enabled,
            scale: self.scale,
            batch: &self.batch,
            dimensions: self.dimensions,
            status_message: &self.message,
            download_progress: self.progress,
            engine: &self.engine_status,
            labels: &self.labels,
        })
    }

    async fn publish(&mut self, output: &mut mpsc::Sender<StemOutput>) {
        self.ensure_dimensions();
        let view = self.view();
        if self.last_view.as_ref() == Some(&view) {
            return;
        }
        self.last_view = Some(view.clone());
        if output.send(StemOutput::View(view)).await.is_err() {
            debug!("View receiver dropped");
        }
    }
}
