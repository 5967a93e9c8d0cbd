//! In-memory backend used by unit tests

use crate::api::{LogSource, PlaygroundApi};
use crate::benchmark::BenchmarkConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Ack, BenchmarkRecord, ChatModelList, ChatRequest, ChatResponse, Container,
    CreateContainerRequest, DownloadRequest, ImageInfo, ModelCatalog, NpuDevice, Preset,
    RunningService, StartServingResponse, StatusSnapshot,
};
use crate::serving::ServingConfig;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub fn container(name: &str, image: &str, running: bool) -> Container {
    Container {
        id: format!("{}-id", name),
        name: name.to_string(),
        image: image.to_string(),
        status: if running { "Up 2 hours" } else { "Exited (0)" }.to_string(),
        running,
        created: String::new(),
    }
}

pub fn service(container: &str, pid: &str) -> RunningService {
    RunningService {
        container: container.to_string(),
        pid: pid.to_string(),
        process_name: Some("vllm".to_string()),
        npu_devices: vec![0],
        port: 8000,
        memory_mb: 1024,
    }
}

#[derive(Default)]
struct State {
    calls: HashMap<String, usize>,
    log: Vec<String>,
    failures: HashMap<String, ApiError>,
    scripted_containers: VecDeque<(Duration, Vec<Container>)>,
    containers: Vec<Container>,
    models: ModelCatalog,
    services: Vec<RunningService>,
    history: Vec<BenchmarkRecord>,
    npu: Vec<NpuDevice>,
    status: StatusSnapshot,
    ack: Ack,
    benchmark: BenchmarkRecord,
    chat: ChatResponse,
    chat_models: ChatModelList,
    logs: String,
    images: Vec<ImageInfo>,
    presets: Vec<Preset>,
    last_chat: Option<ChatRequest>,
    last_serving: Option<(String, ServingConfig)>,
}

/// Scriptable `PlaygroundApi` that counts every call
pub struct MockApi {
    state: Mutex<State>,
}

impl MockApi {
    pub fn new() -> Self {
        let state = State {
            ack: Ack {
                success: true,
                message: None,
            },
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn calls(&self, op: &str) -> usize {
        self.with(|s| s.calls.get(op).copied().unwrap_or(0))
    }

    /// Every call in the order it was received
    pub fn call_log(&self) -> Vec<String> {
        self.with(|s| s.log.clone())
    }

    pub fn mutating_calls(&self) -> usize {
        const READS: &[&str] = &[
            "status",
            "containers",
            "models",
            "running_services",
            "benchmark_history",
            "npu_status",
            "images",
            "presets",
            "chat_models",
            "logs",
        ];
        self.with(|s| {
            s.log
                .iter()
                .filter(|op| !READS.contains(&op.as_str()))
                .count()
        })
    }

    /// Make `op` fail with HTTP 500 and the given detail until cleared
    pub fn fail_reads(&self, op: &str, detail: &str) {
        self.fail(op, 500, detail);
    }

    pub fn fail(&self, op: &str, status: u16, detail: &str) {
        self.with(|s| {
            s.failures.insert(
                op.to_string(),
                ApiError::Status {
                    status,
                    detail: detail.to_string(),
                },
            )
        });
    }

    pub fn clear_failure(&self, op: &str) {
        self.with(|s| s.failures.remove(op));
    }

    pub fn set_containers(&self, containers: Vec<Container>) {
        self.with(|s| s.containers = containers);
    }

    /// Queue container responses, each returned after its delay
    pub fn script_containers(&self, script: Vec<(Duration, Vec<Container>)>) {
        self.with(|s| s.scripted_containers = script.into());
    }

    pub fn set_models(&self, models: ModelCatalog) {
        self.with(|s| s.models = models);
    }

    pub fn set_services(&self, services: Vec<RunningService>) {
        self.with(|s| s.services = services);
    }

    pub fn set_history(&self, history: Vec<BenchmarkRecord>) {
        self.with(|s| s.history = history);
    }

    pub fn set_npu(&self, npu: Vec<NpuDevice>) {
        self.with(|s| s.npu = npu);
    }

    pub fn set_ack(&self, ack: Ack) {
        self.with(|s| s.ack = ack);
    }

    pub fn set_benchmark(&self, record: BenchmarkRecord) {
        self.with(|s| s.benchmark = record);
    }

    pub fn set_chat(&self, response: ChatResponse) {
        self.with(|s| s.chat = response);
    }

    pub fn set_chat_models(&self, list: ChatModelList) {
        self.with(|s| s.chat_models = list);
    }

    pub fn set_logs(&self, logs: &str) {
        self.with(|s| s.logs = logs.to_string());
    }

    pub fn set_images(&self, images: Vec<ImageInfo>) {
        self.with(|s| s.images = images);
    }

    pub fn set_presets(&self, presets: Vec<Preset>) {
        self.with(|s| s.presets = presets);
    }

    pub fn last_chat(&self) -> Option<ChatRequest> {
        self.with(|s| s.last_chat.clone())
    }

    pub fn last_serving(&self) -> Option<(String, ServingConfig)> {
        self.with(|s| s.last_serving.clone())
    }

    /// Count the call and return the configured failure, if any
    fn record(&self, op: &str) -> ApiResult<()> {
        self.with(|s| {
            *s.calls.entry(op.to_string()).or_default() += 1;
            s.log.push(op.to_string());
            match s.failures.get(op) {
                Some(ApiError::Status { status, detail }) => Err(ApiError::Status {
                    status: *status,
                    detail: detail.clone(),
                }),
                Some(other) => Err(ApiError::Transport(other.to_string())),
                None => Ok(()),
            }
        })
    }
}

#[async_trait]
impl PlaygroundApi for MockApi {
    async fn status(&self) -> ApiResult<StatusSnapshot> {
        self.record("status")?;
        Ok(self.with(|s| s.status.clone()))
    }

    async fn containers(&self) -> ApiResult<Vec<Container>> {
        self.record("containers")?;
        let scripted = self.with(|s| s.scripted_containers.pop_front());
        match scripted {
            Some((delay, containers)) => {
                tokio::time::sleep(delay).await;
                Ok(containers)
            }
            None => Ok(self.with(|s| s.containers.clone())),
        }
    }

    async fn models(&self) -> ApiResult<ModelCatalog> {
        self.record("models")?;
        Ok(self.with(|s| s.models.clone()))
    }

    async fn running_services(&self) -> ApiResult<Vec<RunningService>> {
        self.record("running_services")?;
        Ok(self.with(|s| s.services.clone()))
    }

    async fn benchmark_history(&self) -> ApiResult<Vec<BenchmarkRecord>> {
        self.record("benchmark_history")?;
        Ok(self.with(|s| s.history.clone()))
    }

    async fn npu_status(&self) -> ApiResult<Vec<NpuDevice>> {
        self.record("npu_status")?;
        Ok(self.with(|s| s.npu.clone()))
    }

    async fn start_container(&self, _name: &str) -> ApiResult<()> {
        self.record("start_container")
    }

    async fn stop_container(&self, _name: &str) -> ApiResult<()> {
        self.record("stop_container")
    }

    async fn delete_container(&self, _name: &str) -> ApiResult<()> {
        self.record("delete_container")
    }

    async fn create_container(&self, _request: &CreateContainerRequest) -> ApiResult<()> {
        self.record("create_container")
    }

    async fn pull_image(&self, _image: &str) -> ApiResult<Ack> {
        self.record("pull_image")?;
        Ok(self.with(|s| s.ack.clone()))
    }

    async fn images(&self) -> ApiResult<Vec<ImageInfo>> {
        self.record("images")?;
        Ok(self.with(|s| s.images.clone()))
    }

    async fn download_model(&self, _request: &DownloadRequest) -> ApiResult<Ack> {
        self.record("download_model")?;
        Ok(self.with(|s| s.ack.clone()))
    }

    async fn start_serving(
        &self,
        container: &str,
        config: &ServingConfig,
    ) -> ApiResult<StartServingResponse> {
        self.record("start_serving")?;
        self.with(|s| s.last_serving = Some((container.to_string(), config.clone())));
        Ok(StartServingResponse {
            success: true,
            command: None,
            service_id: Some("svc-1".to_string()),
        })
    }

    async fn stop_all_services(&self) -> ApiResult<()> {
        self.record("stop_all_services")
    }

    async fn kill_service(&self, _container: &str, _pid: &str) -> ApiResult<Ack> {
        self.record("kill_service")?;
        Ok(self.with(|s| s.ack.clone()))
    }

    async fn presets(&self) -> ApiResult<Vec<Preset>> {
        self.record("presets")?;
        Ok(self.with(|s| s.presets.clone()))
    }

    /// Stores like the backend does: same name replaces, newest last
    async fn save_preset(&self, name: &str, config: &serde_json::Value) -> ApiResult<Ack> {
        self.record("save_preset")?;
        Ok(self.with(|s| {
            s.presets.retain(|p| p.name != name);
            s.presets.push(Preset {
                name: name.to_string(),
                config: config.clone(),
                created_at: String::new(),
            });
            s.ack.clone()
        }))
    }

    async fn run_benchmark(&self, _config: &BenchmarkConfig) -> ApiResult<BenchmarkRecord> {
        self.record("run_benchmark")?;
        Ok(self.with(|s| s.benchmark.clone()))
    }

    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatResponse> {
        self.with(|s| s.last_chat = Some(request.clone()));
        self.record("chat")?;
        Ok(self.with(|s| s.chat.clone()))
    }

    async fn chat_models(&self, _url: &str) -> ApiResult<ChatModelList> {
        self.record("chat_models")?;
        Ok(self.with(|s| s.chat_models.clone()))
    }

    async fn logs(&self, _source: &LogSource, _lines: u32) -> ApiResult<String> {
        self.record("logs")?;
        Ok(self.with(|s| s.logs.clone()))
    }
}
