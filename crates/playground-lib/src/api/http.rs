//! JSON-over-HTTP implementation of the backend API

use super::{LogSource, PlaygroundApi};
use crate::benchmark::BenchmarkConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Ack, BenchmarkRecord, ChatModelList, ChatRequest, ChatResponse, Container, ContainerList,
    CreateContainerRequest, DownloadRequest, ImageInfo, ImageList, LogsResponse, ModelCatalog,
    NpuDevice, NpuStatusList, Preset, PresetList, RunningService, ServiceList,
    StartServingResponse, StatusSnapshot,
};
use crate::serving::ServingConfig;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP client for the playground backend
pub struct HttpApi {
    client: Client,
    base_url: Url,
}

impl HttpApi {
    /// Create a client with the default timeout
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        HttpApiBuilder::new().base_url(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from percent-encoded path segments and query pairs
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(method = %method, url = %url, "Backend request");
        self.client.request(method, url)
    }

    /// Map a non-success status to `ApiError::Status` with the backend `detail`
    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| match v.get("detail") {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(serde_json::Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            })
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = builder.send().await?;
        let response = Self::check(response).await?;
        response.json().await.map_err(ApiError::from)
    }

    /// Send and discard the acknowledgement body
    async fn send_unit(&self, builder: RequestBuilder) -> ApiResult<()> {
        let response = builder.send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, &str)]) -> ApiResult<T> {
        let url = self.endpoint(segments, query)?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> ApiResult<T> {
        let url = self.endpoint(segments, query)?;
        let mut builder = self.request(Method::POST, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await
    }

    async fn post_unit(&self, segments: &[&str], query: &[(&str, &str)]) -> ApiResult<()> {
        let url = self.endpoint(segments, query)?;
        self.send_unit(self.request(Method::POST, url)).await
    }
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl PlaygroundApi for HttpApi {
    async fn status(&self) -> ApiResult<StatusSnapshot> {
        self.get(&["api", "status"], &[]).await
    }

    async fn containers(&self) -> ApiResult<Vec<Container>> {
        let list: ContainerList = self.get(&["api", "containers"], &[]).await?;
        Ok(list.containers)
    }

    async fn models(&self) -> ApiResult<ModelCatalog> {
        self.get(&["api", "models"], &[]).await
    }

    async fn running_services(&self) -> ApiResult<Vec<RunningService>> {
        let list: ServiceList = self.get(&["api", "vllm", "running"], &[]).await?;
        Ok(list.services)
    }

    async fn benchmark_history(&self) -> ApiResult<Vec<BenchmarkRecord>> {
        self.get(&["api", "benchmark", "results"], &[]).await
    }

    async fn npu_status(&self) -> ApiResult<Vec<NpuDevice>> {
        let list: NpuStatusList = self.get(&["api", "npu", "status"], &[]).await?;
        Ok(list.npu_status)
    }

    async fn start_container(&self, name: &str) -> ApiResult<()> {
        self.post_unit(&["api", "containers", name, "start"], &[]).await
    }

    async fn stop_container(&self, name: &str) -> ApiResult<()> {
        self.post_unit(&["api", "containers", name, "stop"], &[]).await
    }

    async fn delete_container(&self, name: &str) -> ApiResult<()> {
        let url = self.endpoint(&["api", "containers", name], &[])?;
        self.send_unit(self.request(Method::DELETE, url)).await
    }

    async fn create_container(&self, request: &CreateContainerRequest) -> ApiResult<()> {
        let url = self.endpoint(&["api", "containers", "create"], &[])?;
        self.send_unit(self.request(Method::POST, url).json(request))
            .await
    }

    async fn pull_image(&self, image: &str) -> ApiResult<Ack> {
        self.post(&["api", "images", "pull"], &[("image", image)], NO_BODY)
            .await
    }

    async fn images(&self) -> ApiResult<Vec<ImageInfo>> {
        let list: ImageList = self.get(&["api", "images"], &[]).await?;
        Ok(list.images)
    }

    async fn download_model(&self, request: &DownloadRequest) -> ApiResult<Ack> {
        let mut query = vec![
            ("model_id", request.model_id.as_str()),
            ("source", request.source.as_str()),
        ];
        if let Some(dir) = request.cache_dir.as_deref().filter(|d| !d.is_empty()) {
            query.push(("cache_dir", dir));
        }
        self.post(&["api", "models", "download"], &query, NO_BODY)
            .await
    }

    async fn start_serving(
        &self,
        container: &str,
        config: &ServingConfig,
    ) -> ApiResult<StartServingResponse> {
        self.post(
            &["api", "vllm", "start"],
            &[("container_name", container)],
            Some(config),
        )
        .await
    }

    async fn stop_all_services(&self) -> ApiResult<()> {
        self.post_unit(&["api", "vllm", "stop"], &[]).await
    }

    async fn kill_service(&self, container: &str, pid: &str) -> ApiResult<Ack> {
        self.post(
            &["api", "vllm", "kill"],
            &[("container_name", container), ("pid", pid)],
            NO_BODY,
        )
        .await
    }

    async fn presets(&self) -> ApiResult<Vec<Preset>> {
        let list: PresetList = self.get(&["api", "presets"], &[]).await?;
        Ok(list.presets)
    }

    async fn save_preset(&self, name: &str, config: &serde_json::Value) -> ApiResult<Ack> {
        self.post(&["api", "presets"], &[("name", name)], Some(config))
            .await
    }

    async fn run_benchmark(&self, config: &BenchmarkConfig) -> ApiResult<BenchmarkRecord> {
        self.post(&["api", "benchmark", "run"], &[], Some(config))
            .await
    }

    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatResponse> {
        self.post(&["api", "chat"], &[], Some(request)).await
    }

    async fn chat_models(&self, url: &str) -> ApiResult<ChatModelList> {
        self.get(&["api", "chat", "models"], &[("url", url)]).await
    }

    async fn logs(&self, source: &LogSource, lines: u32) -> ApiResult<String> {
        let lines = lines.to_string();
        let query = [("lines", lines.as_str())];
        let response: LogsResponse = match source {
            LogSource::Playground => self.get(&["api", "logs", "playground"], &query).await?,
            LogSource::Container(name) => {
                self.get(&["api", "logs", "container", name.as_str()], &query).await?
            }
            LogSource::System => self.get(&["api", "logs", "system"], &query).await?,
        };
        Ok(response.logs)
    }
}

/// Builder for `HttpApi`
pub struct HttpApiBuilder {
    base_url: Option<String>,
    timeout: Duration,
}

impl HttpApiBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> anyhow::Result<HttpApi> {
        let base = self
            .base_url
            .ok_or_else(|| anyhow::anyhow!("base_url is required"))?;

        let base_url = Url::parse(&base).with_context(|| format!("Invalid API URL: {}", base))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL: {}", base);
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(HttpApi { client, base_url })
    }
}

impl Default for HttpApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments_and_query() {
        let api = HttpApi::new("http://localhost:7860").unwrap();
        let url = api
            .endpoint(&["api", "containers", "my box", "start"], &[("image", "a/b:c")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:7860/api/containers/my%20box/start?image=a%2Fb%3Ac"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let api = HttpApi::new("http://gateway/playground/").unwrap();
        let url = api.endpoint(&["api", "status"], &[]).unwrap();
        assert_eq!(url.as_str(), "http://gateway/playground/api/status");
    }

    #[test]
    fn test_builder_requires_valid_url() {
        assert!(HttpApiBuilder::new().build().is_err());
        assert!(HttpApi::new("not a url").is_err());
        assert!(HttpApi::new("mailto:ops@example.com").is_err());
    }
}
