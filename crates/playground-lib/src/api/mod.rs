//! Backend API seam
//!
//! `PlaygroundApi` is the only boundary the controller talks through.
//! `HttpApi` implements it over JSON/HTTP; tests substitute their own.

mod http;

pub use http::{HttpApi, HttpApiBuilder};

use crate::benchmark::BenchmarkConfig;
use crate::error::ApiResult;
use crate::models::{
    Ack, BenchmarkRecord, ChatModelList, ChatRequest, ChatResponse, Container,
    CreateContainerRequest, DownloadRequest, ImageInfo, ModelCatalog, NpuDevice, Preset,
    RunningService, StartServingResponse, StatusSnapshot,
};
use crate::serving::ServingConfig;
use async_trait::async_trait;

/// Where log text is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    Playground,
    Container(String),
    System,
}

impl LogSource {
    pub fn default_lines(&self) -> u32 {
        match self {
            LogSource::Playground | LogSource::Container(_) => 200,
            LogSource::System => 100,
        }
    }
}

#[async_trait]
pub trait PlaygroundApi: Send + Sync {
    // Reads
    async fn status(&self) -> ApiResult<StatusSnapshot>;
    async fn containers(&self) -> ApiResult<Vec<Container>>;
    async fn models(&self) -> ApiResult<ModelCatalog>;
    async fn running_services(&self) -> ApiResult<Vec<RunningService>>;
    async fn benchmark_history(&self) -> ApiResult<Vec<BenchmarkRecord>>;
    async fn npu_status(&self) -> ApiResult<Vec<NpuDevice>>;

    // Container lifecycle
    async fn start_container(&self, name: &str) -> ApiResult<()>;
    async fn stop_container(&self, name: &str) -> ApiResult<()>;
    async fn delete_container(&self, name: &str) -> ApiResult<()>;
    async fn create_container(&self, request: &CreateContainerRequest) -> ApiResult<()>;
    async fn pull_image(&self, image: &str) -> ApiResult<Ack>;
    async fn images(&self) -> ApiResult<Vec<ImageInfo>>;

    // Models
    async fn download_model(&self, request: &DownloadRequest) -> ApiResult<Ack>;

    // Serving
    async fn start_serving(
        &self,
        container: &str,
        config: &ServingConfig,
    ) -> ApiResult<StartServingResponse>;
    async fn stop_all_services(&self) -> ApiResult<()>;
    async fn kill_service(&self, container: &str, pid: &str) -> ApiResult<Ack>;
    async fn presets(&self) -> ApiResult<Vec<Preset>>;
    /// Store `config` under `name`, replacing any preset with that name
    async fn save_preset(&self, name: &str, config: &serde_json::Value) -> ApiResult<Ack>;

    // Benchmark
    async fn run_benchmark(&self, config: &BenchmarkConfig) -> ApiResult<BenchmarkRecord>;

    // Chat
    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatResponse>;
    async fn chat_models(&self, url: &str) -> ApiResult<ChatModelList>;

    // Logs
    async fn logs(&self, source: &LogSource, lines: u32) -> ApiResult<String>;
}
