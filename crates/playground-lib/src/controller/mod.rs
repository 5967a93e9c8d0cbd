//! View-state controller
//!
//! The controller mirrors backend collections into sequence-stamped caches,
//! owns the form state of every panel and turns operator intents into
//! exactly one backend request followed by a refetch of what it touched.
//! Backend failures never escape: they become notifications.

mod chat;
mod library;
mod mutation;

#[cfg(test)]
mod tests;

pub use chat::{ChatOutcome, ChatSettings, NO_LOGS};
pub use mutation::{Mutation, Outcome};

use crate::api::PlaygroundApi;
use crate::benchmark::{self, BenchmarkConfig};
use crate::cache::{Applied, Cached, CollectionKind, CollectionState};
use crate::error::ApiResult;
use crate::filter;
use crate::models::{
    popular_models, BenchmarkRecord, ChatMessage, Container, CreateContainerRequest,
    ModelCatalog, ModelDescriptor, ModelSource, NpuDevice, RunningService, StatusSnapshot,
};
use crate::notify::Notifications;
use crate::observability::{ControllerMetrics, StructuredLogger};
use crate::selection::NpuSelection;
use crate::serving::{command_preview, ServingForm, SourceType};
use crate::settings::ControllerConfig;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};

const EVENT_BUFFER: usize = 64;

/// Change notifications for renderers bound to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// A collection cache was replaced
    Changed(CollectionKind),
    /// A refresh failed; the cache kept its data and is now stale
    Failed(CollectionKind),
    /// Running container names offered by container pickers
    ContainerChoices(Vec<String>),
    /// Regenerated serving command
    CommandPreview(String),
    /// The chat transcript changed
    Chat,
    /// A benchmark run finished and its result is available
    BenchmarkResult,
}

/// Result of a single collection refresh
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Applied,
    /// Dropped because a later-issued response was already applied
    Superseded,
    Failed(String),
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied)
    }
}

/// Asks the operator before a destructive mutation is sent
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Confirms everything, for non-interactive use
pub struct AlwaysConfirm;

#[async_trait]
impl Confirmer for AlwaysConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Create-container form state
#[derive(Debug, Clone, PartialEq)]
pub struct CreateContainerForm {
    pub name: String,
    pub image: String,
    pub shm_size: String,
    pub devices: NpuSelection,
}

impl CreateContainerForm {
    pub const DEFAULT_IMAGE: &'static str = "quay.io/ascend/vllm-ascend:v0.13.0rc1";
    pub const DEFAULT_SHM_SIZE: &'static str = "60g";

    fn fresh(devices: NpuSelection) -> Self {
        Self {
            name: String::new(),
            image: Self::DEFAULT_IMAGE.to_string(),
            shm_size: Self::DEFAULT_SHM_SIZE.to_string(),
            devices,
        }
    }

    pub fn to_request(&self) -> CreateContainerRequest {
        CreateContainerRequest {
            container_name: self.name.trim().to_string(),
            image: self.image.trim().to_string(),
            npu_devices: self.devices.to_vec(),
            shm_size: self.shm_size.trim().to_string(),
        }
    }
}

/// Session-scoped view-state controller
pub struct Controller {
    api: Arc<dyn PlaygroundApi>,
    confirmer: Arc<dyn Confirmer>,
    config: ControllerConfig,
    notifications: Notifications,
    metrics: ControllerMetrics,
    logger: StructuredLogger,
    events: broadcast::Sender<ViewEvent>,

    containers: RwLock<Cached<Vec<Container>>>,
    models: RwLock<Cached<ModelCatalog>>,
    services: RwLock<Cached<Vec<RunningService>>>,
    benchmark_history: RwLock<Cached<Vec<BenchmarkRecord>>>,
    npu_status: RwLock<Cached<Vec<NpuDevice>>>,
    status: RwLock<Cached<StatusSnapshot>>,

    selection: RwLock<NpuSelection>,
    serving_form: RwLock<ServingForm>,
    benchmark_form: RwLock<BenchmarkConfig>,
    last_benchmark: RwLock<Option<BenchmarkRecord>>,
    create_form: RwLock<CreateContainerForm>,
    chat: RwLock<chat::ChatState>,
}

impl Controller {
    pub fn new(
        api: Arc<dyn PlaygroundApi>,
        confirmer: Arc<dyn Confirmer>,
        config: ControllerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let create_form = CreateContainerForm::fresh(
            config.modal_devices.defaults(config.npu_count).into_iter().collect(),
        );

        Self {
            api,
            confirmer,
            notifications: Notifications::new(config.notification_ttl()),
            metrics: ControllerMetrics::new(),
            logger: StructuredLogger::new(config.api_url.clone()),
            events,
            containers: RwLock::new(Cached::new()),
            models: RwLock::new(Cached::new()),
            services: RwLock::new(Cached::new()),
            benchmark_history: RwLock::new(Cached::new()),
            npu_status: RwLock::new(Cached::new()),
            status: RwLock::new(Cached::new()),
            selection: RwLock::new(NpuSelection::single(0)),
            serving_form: RwLock::new(ServingForm::default()),
            benchmark_form: RwLock::new(BenchmarkConfig::default()),
            last_benchmark: RwLock::new(None),
            create_form: RwLock::new(create_form),
            chat: RwLock::new(chat::ChatState::default()),
            config,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Subscribe to view events; events sent with no subscriber are dropped
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ViewEvent) {
        let _ = self.events.send(event);
    }

    /// Refetch one collection and replace its cache if this response is the newest
    pub async fn refresh(&self, kind: CollectionKind) -> RefreshOutcome {
        let api = self.api.as_ref();
        match kind {
            CollectionKind::Containers => {
                let outcome = self
                    .refresh_cell(kind, &self.containers, Vec::len, api.containers())
                    .await;
                if outcome.is_applied() {
                    self.emit(ViewEvent::ContainerChoices(self.container_choices().await));
                }
                outcome
            }
            CollectionKind::Models => {
                self.refresh_cell(kind, &self.models, catalog_len, api.models())
                    .await
            }
            CollectionKind::Services => {
                self.refresh_cell(kind, &self.services, Vec::len, api.running_services())
                    .await
            }
            CollectionKind::BenchmarkHistory => {
                self.refresh_cell(
                    kind,
                    &self.benchmark_history,
                    Vec::len,
                    api.benchmark_history(),
                )
                .await
            }
            CollectionKind::NpuStatus => {
                self.refresh_cell(kind, &self.npu_status, Vec::len, api.npu_status())
                    .await
            }
            CollectionKind::Status => {
                self.refresh_cell(kind, &self.status, status_len, api.status())
                    .await
            }
        }
    }

    /// Refresh every collection concurrently, as on first page load
    pub async fn refresh_all(&self) -> Vec<(CollectionKind, RefreshOutcome)> {
        let (containers, models, services, history, npu, status) = tokio::join!(
            self.refresh(CollectionKind::Containers),
            self.refresh(CollectionKind::Models),
            self.refresh(CollectionKind::Services),
            self.refresh(CollectionKind::BenchmarkHistory),
            self.refresh(CollectionKind::NpuStatus),
            self.refresh(CollectionKind::Status),
        );
        vec![
            (CollectionKind::Containers, containers),
            (CollectionKind::Models, models),
            (CollectionKind::Services, services),
            (CollectionKind::BenchmarkHistory, history),
            (CollectionKind::NpuStatus, npu),
            (CollectionKind::Status, status),
        ]
    }

    async fn refresh_cell<T, F>(
        &self,
        kind: CollectionKind,
        cell: &RwLock<Cached<T>>,
        count: fn(&T) -> usize,
        fetch: F,
    ) -> RefreshOutcome
    where
        F: Future<Output = ApiResult<T>>,
    {
        let seq = cell.write().await.begin();
        let started = Instant::now();
        let result = fetch.await;
        self.metrics
            .observe_request(kind.as_str(), started.elapsed().as_secs_f64());

        match result {
            Ok(data) => {
                let items = count(&data);
                let mut guard = cell.write().await;
                match guard.complete(seq, data) {
                    Applied::Replaced => {
                        drop(guard);
                        self.metrics.inc_refresh(kind, "applied");
                        self.metrics.set_cached_items(kind, items);
                        self.logger.log_refresh_applied(kind, seq, items);
                        self.emit(ViewEvent::Changed(kind));
                        RefreshOutcome::Applied
                    }
                    Applied::Superseded => {
                        let applied = guard.applied_seq();
                        drop(guard);
                        self.metrics.inc_refresh(kind, "superseded");
                        self.logger.log_refresh_superseded(kind, seq, applied);
                        RefreshOutcome::Superseded
                    }
                }
            }
            Err(e) => {
                let detail = e.to_string();
                let mut guard = cell.write().await;
                let applied = guard.fail(seq, detail.clone());
                let applied_seq = guard.applied_seq();
                drop(guard);

                self.logger
                    .log_refresh_failed(kind, seq, e.kind(), &detail);
                match applied {
                    Applied::Replaced => {
                        self.metrics.inc_refresh(kind, "failed");
                        self.notifications
                            .error(format!("Failed to load {}: {}", kind.label(), detail));
                        self.emit(ViewEvent::Failed(kind));
                        RefreshOutcome::Failed(detail)
                    }
                    Applied::Superseded => {
                        self.metrics.inc_refresh(kind, "superseded");
                        self.logger.log_refresh_superseded(kind, seq, applied_seq);
                        RefreshOutcome::Superseded
                    }
                }
            }
        }
    }

    pub async fn state(&self, kind: CollectionKind) -> CollectionState {
        match kind {
            CollectionKind::Containers => self.containers.read().await.state(),
            CollectionKind::Models => self.models.read().await.state(),
            CollectionKind::Services => self.services.read().await.state(),
            CollectionKind::BenchmarkHistory => self.benchmark_history.read().await.state(),
            CollectionKind::NpuStatus => self.npu_status.read().await.state(),
            CollectionKind::Status => self.status.read().await.state(),
        }
    }

    pub async fn last_error(&self, kind: CollectionKind) -> Option<String> {
        match kind {
            CollectionKind::Containers => self.containers.read().await.last_error().map(String::from),
            CollectionKind::Models => self.models.read().await.last_error().map(String::from),
            CollectionKind::Services => self.services.read().await.last_error().map(String::from),
            CollectionKind::BenchmarkHistory => {
                self.benchmark_history.read().await.last_error().map(String::from)
            }
            CollectionKind::NpuStatus => self.npu_status.read().await.last_error().map(String::from),
            CollectionKind::Status => self.status.read().await.last_error().map(String::from),
        }
    }

    pub async fn containers(&self) -> Vec<Container> {
        self.containers.read().await.data().clone()
    }

    pub async fn model_catalog(&self) -> ModelCatalog {
        self.models.read().await.data().clone()
    }

    pub async fn services(&self) -> Vec<RunningService> {
        self.services.read().await.data().clone()
    }

    pub async fn benchmark_history(&self) -> Vec<BenchmarkRecord> {
        self.benchmark_history.read().await.data().clone()
    }

    pub async fn npu_devices(&self) -> Vec<NpuDevice> {
        self.npu_status.read().await.data().clone()
    }

    pub async fn status(&self) -> StatusSnapshot {
        self.status.read().await.data().clone()
    }

    pub async fn containers_view(&self, text: &str, running_only: bool) -> Vec<Container> {
        let cell = self.containers.read().await;
        filter::filter_containers(cell.data(), text, running_only)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Models of one source filtered by text; popular models are a static list
    pub async fn models_view(&self, source: ModelSource, text: &str) -> Vec<ModelDescriptor> {
        let popular;
        let cell = self.models.read().await;
        let list: &[ModelDescriptor] = match source {
            ModelSource::Local => &cell.data().local_models,
            ModelSource::Modelscope => &cell.data().modelscope_models,
            ModelSource::Popular => {
                popular = popular_models();
                &popular
            }
        };
        filter::filter_models(list, text).into_iter().cloned().collect()
    }

    /// Running container names for the launch form and log source pickers
    pub async fn container_choices(&self) -> Vec<String> {
        filter::running_container_names(self.containers.read().await.data())
    }

    pub async fn selection(&self) -> NpuSelection {
        self.selection.read().await.clone()
    }

    /// Flip one device in the serving selection; returns whether it is now selected
    pub async fn toggle_npu(&self, id: u32) -> bool {
        let selected = self.selection.write().await.toggle(id);
        self.emit(ViewEvent::CommandPreview(self.command_preview().await));
        selected
    }

    pub async fn set_selection(&self, selection: NpuSelection) {
        *self.selection.write().await = selection;
        self.emit(ViewEvent::CommandPreview(self.command_preview().await));
    }

    pub async fn serving_form(&self) -> ServingForm {
        self.serving_form.read().await.clone()
    }

    /// Edit the serving form in place and publish the regenerated preview
    pub async fn edit_serving_form<F>(&self, edit: F)
    where
        F: FnOnce(&mut ServingForm),
    {
        edit(&mut *self.serving_form.write().await);
        self.emit(ViewEvent::CommandPreview(self.command_preview().await));
    }

    /// Fill the serving form from a model card
    pub async fn use_model(&self, model: &ModelDescriptor) {
        let source_type = match model.source {
            ModelSource::Local => SourceType::Local,
            ModelSource::Modelscope | ModelSource::Popular => SourceType::Modelscope,
        };
        let reference = model.reference().to_string();
        self.edit_serving_form(|form| form.use_model(&reference, source_type))
            .await;
    }

    pub async fn command_preview(&self) -> String {
        let form = self.serving_form.read().await.clone();
        let selection = self.selection.read().await.clone();
        command_preview(&form, &selection)
    }

    /// Reset the create form, checking the configured default devices
    pub async fn open_create_form(&self) -> CreateContainerForm {
        let defaults = self
            .config
            .modal_devices
            .defaults(self.config.npu_count)
            .into_iter()
            .collect();
        let form = CreateContainerForm::fresh(defaults);
        *self.create_form.write().await = form.clone();
        form
    }

    pub async fn create_form(&self) -> CreateContainerForm {
        self.create_form.read().await.clone()
    }

    pub async fn edit_create_form<F>(&self, edit: F)
    where
        F: FnOnce(&mut CreateContainerForm),
    {
        edit(&mut *self.create_form.write().await);
    }

    pub async fn benchmark_form(&self) -> BenchmarkConfig {
        self.benchmark_form.read().await.clone()
    }

    pub async fn edit_benchmark_form<F>(&self, edit: F)
    where
        F: FnOnce(&mut BenchmarkConfig),
    {
        edit(&mut *self.benchmark_form.write().await);
    }

    /// Apply a named preset to the benchmark form
    pub async fn apply_template(&self, name: &str) -> bool {
        match benchmark::find_template(name) {
            Some(template) => {
                template.apply(&mut *self.benchmark_form.write().await);
                self.notifications
                    .info(format!("Template applied: {}", template.name));
                true
            }
            None => {
                self.notifications
                    .warning(format!("Unknown benchmark template: {}", name));
                false
            }
        }
    }

    /// Result of the most recent benchmark run in this session
    pub async fn last_benchmark(&self) -> Option<BenchmarkRecord> {
        self.last_benchmark.read().await.clone()
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.chat.read().await.transcript.clone()
    }
}

fn catalog_len(catalog: &ModelCatalog) -> usize {
    catalog.local_models.len() + catalog.modelscope_models.len()
}

fn status_len(status: &StatusSnapshot) -> usize {
    status.containers.len()
}
