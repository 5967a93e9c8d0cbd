//! Core data models mirrored from the playground backend
//!
//! Every entity is owned by the backend. The client only ever holds
//! snapshots, so optional or unknown fields default instead of failing.

use serde::{Deserialize, Deserializer, Serialize};

/// A container managed by the backend runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub created: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerList {
    #[serde(default)]
    pub containers: Vec<Container>,
}

/// Where a model descriptor comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    #[default]
    Local,
    Modelscope,
    Popular,
}

impl ModelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSource::Local => "local",
            ModelSource::Modelscope => "modelscope",
            ModelSource::Popular => "popular",
        }
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    /// Local filesystem path (local and modelscope cache entries)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Remote model id (popular catalog entries)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,
    /// Parameter count label such as "4B"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(default)]
    pub source: ModelSource,
}

impl ModelDescriptor {
    /// The value handed to the serving form when the model is used
    pub fn reference(&self) -> &str {
        match self.source {
            ModelSource::Popular => self.id.as_deref().unwrap_or(&self.name),
            _ => self.path.as_deref().unwrap_or(&self.name),
        }
    }
}

/// Response of `GET /api/models`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub local_models: Vec<ModelDescriptor>,
    #[serde(default)]
    pub modelscope_models: Vec<ModelDescriptor>,
}

/// One live inference-server process, identified by (container, pid)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningService {
    pub container: String,
    #[serde(deserialize_with = "string_or_number")]
    pub pid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    #[serde(default)]
    pub npu_devices: Vec<u32>,
    #[serde(default = "default_serving_port")]
    pub port: u16,
    #[serde(default)]
    pub memory_mb: u64,
}

impl RunningService {
    pub fn key(&self) -> (&str, &str) {
        (&self.container, &self.pid)
    }
}

fn default_serving_port() -> u16 {
    8000
}

/// Response of `GET /api/vllm/running`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceList {
    #[serde(default)]
    pub services: Vec<RunningService>,
    #[serde(default)]
    pub count: usize,
}

/// A stored benchmark run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub benchmark_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p50_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p95_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p99_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_per_second: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

/// Accelerator occupancy as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NpuDevice {
    pub id: u32,
    #[serde(default)]
    pub occupied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default)]
    pub utilization: f64,
    #[serde(default)]
    pub health: String,
    #[serde(default)]
    pub hbm_used: u64,
    #[serde(default)]
    pub hbm_total: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NpuStatusList {
    #[serde(default)]
    pub npu_status: Vec<NpuDevice>,
}

/// Aggregate status polled on a fixed interval
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub vllm_running: bool,
    #[serde(default)]
    pub current_container: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub npu_status: Vec<NpuDevice>,
}

impl StatusSnapshot {
    pub fn running_containers(&self) -> usize {
        self.containers.iter().filter(|c| c.running).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    /// Display-only entry, never sent to the model
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub url: String,
}

/// OpenAI-style completion response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Response of `GET /api/chat/models`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatModelList {
    #[serde(default)]
    pub data: Vec<ChatModelEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatModelEntry {
    pub id: String,
}

/// Body of `POST /api/containers/create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateContainerRequest {
    pub container_name: String,
    pub image: String,
    pub npu_devices: Vec<u32>,
    pub shm_size: String,
}

/// Source accepted by the model download endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadSource {
    #[default]
    Modelscope,
    Huggingface,
}

impl DownloadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadSource::Modelscope => "modelscope",
            DownloadSource::Huggingface => "huggingface",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub model_id: String,
    pub source: DownloadSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
}

/// Generic `{success, message}` acknowledgement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response of `POST /api/vllm/start`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartServingResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: String,
}

/// A container image present on the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub tag: String,
    /// Human-readable size as reported by the runtime
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub created: String,
}

impl ImageInfo {
    /// `repository:tag`, or the bare repository for untagged images
    pub fn reference(&self) -> String {
        match self.tag.as_str() {
            "" | "<none>" => self.repository.clone(),
            tag => format!("{}:{}", self.repository, tag),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageList {
    #[serde(default)]
    pub images: Vec<ImageInfo>,
}

/// A named serving form snapshot stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetList {
    #[serde(default)]
    pub presets: Vec<Preset>,
}

/// Static catalog of well-known models offered for download
pub fn popular_models() -> Vec<ModelDescriptor> {
    [
        ("Qwen/Qwen3-0.6B", "Qwen3-0.6B", "0.6B"),
        ("Qwen/Qwen3-4B", "Qwen3-4B", "4B"),
        ("Qwen/Qwen3-8B", "Qwen3-8B", "8B"),
        ("Qwen/Qwen3-32B", "Qwen3-32B", "32B"),
    ]
    .into_iter()
    .map(|(id, name, params)| ModelDescriptor {
        name: name.to_string(),
        path: None,
        id: Some(id.to_string()),
        size: None,
        size_human: None,
        parameters: Some(params.to_string()),
        source: ModelSource::Popular,
    })
    .collect()
}

/// Accepts `"123"` as well as `123`
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
