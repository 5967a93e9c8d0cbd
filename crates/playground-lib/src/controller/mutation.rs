//! Mutating operator actions
//!
//! Every mutation follows the same path: local validation, optional
//! confirmation, one backend request, then a sequential refetch of the
//! collections the request affected. Caches are never edited directly.

use super::{Controller, RefreshOutcome, ViewEvent};
use crate::benchmark::BenchmarkConfig;
use crate::cache::CollectionKind;
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateContainerRequest, DownloadRequest};
use crate::serving::ServingConfig;
use std::time::Instant;

/// An operator action that changes backend state
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    StartContainer { name: String },
    StopContainer { name: String },
    DeleteContainer { name: String },
    CreateContainer(CreateContainerRequest),
    PullImage { image: String },
    DownloadModel(DownloadRequest),
    /// Launch from the current serving form and NPU selection
    StartServing,
    StopAllServices,
    KillService { container: String, pid: String },
    /// Run with the current benchmark form
    RunBenchmark,
}

/// How a submitted mutation ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The request succeeded and each affected collection was refetched in order
    Completed {
        refreshed: Vec<(CollectionKind, RefreshOutcome)>,
    },
    /// Nothing to act on; no request was sent
    Skipped(String),
    /// The operator declined the confirmation prompt
    Cancelled,
    /// Local validation failed; no request was sent
    Rejected(String),
    Failed(String),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }
}

/// Form state resolved at submit time
enum Payload {
    None,
    Serving(String, ServingConfig),
    Benchmark(BenchmarkConfig),
}

/// What a successful request reported back
struct Reply {
    message: String,
    /// The run finished but reported an error; affected collections still change
    run_error: Option<String>,
}

impl Reply {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            run_error: None,
        }
    }
}

fn required(value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

impl Mutation {
    /// Stable name for metrics and logs
    pub fn action(&self) -> &'static str {
        match self {
            Mutation::StartContainer { .. } => "start_container",
            Mutation::StopContainer { .. } => "stop_container",
            Mutation::DeleteContainer { .. } => "delete_container",
            Mutation::CreateContainer(_) => "create_container",
            Mutation::PullImage { .. } => "pull_image",
            Mutation::DownloadModel(_) => "download_model",
            Mutation::StartServing => "start_serving",
            Mutation::StopAllServices => "stop_all_services",
            Mutation::KillService { .. } => "kill_service",
            Mutation::RunBenchmark => "run_benchmark",
        }
    }

    /// Collections refetched, in order, after a successful request
    pub fn affected(&self) -> &'static [CollectionKind] {
        match self {
            Mutation::StartContainer { .. }
            | Mutation::StopContainer { .. }
            | Mutation::DeleteContainer { .. }
            | Mutation::CreateContainer(_) => &[CollectionKind::Containers],
            Mutation::PullImage { .. } => &[],
            Mutation::DownloadModel(_) => &[CollectionKind::Models],
            Mutation::StartServing | Mutation::StopAllServices | Mutation::KillService { .. } => {
                &[CollectionKind::Services, CollectionKind::Status]
            }
            Mutation::RunBenchmark => &[CollectionKind::BenchmarkHistory],
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.confirm_prompt().is_some()
    }

    /// Question put to the operator before a destructive request
    pub fn confirm_prompt(&self) -> Option<String> {
        match self {
            Mutation::DeleteContainer { name } => Some(format!("Delete container {}?", name)),
            Mutation::StopAllServices => Some("Stop all vLLM services?".to_string()),
            Mutation::KillService { container, .. } => {
                Some(format!("Stop the vLLM service in container {}?", container))
            }
            _ => None,
        }
    }

    /// Check fields carried by the mutation itself
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Mutation::StartContainer { name }
            | Mutation::StopContainer { name }
            | Mutation::DeleteContainer { name } => required(name, "Container name is required"),
            Mutation::CreateContainer(request) => {
                required(&request.container_name, "Container name is required")?;
                required(&request.image, "Image name is required")
            }
            Mutation::PullImage { image } => required(image, "Enter an image name"),
            Mutation::DownloadModel(request) => required(&request.model_id, "Model ID is required"),
            Mutation::KillService { container, pid } => {
                required(container, "Container name is required")?;
                required(pid, "Process id is required")
            }
            Mutation::StartServing | Mutation::StopAllServices | Mutation::RunBenchmark => Ok(()),
        }
    }

    fn failure_prefix(&self) -> String {
        match self {
            Mutation::StartContainer { name } => format!("Failed to start container {}", name),
            Mutation::StopContainer { name } => format!("Failed to stop container {}", name),
            Mutation::DeleteContainer { name } => format!("Failed to delete container {}", name),
            Mutation::CreateContainer(request) => {
                format!("Failed to create container {}", request.container_name)
            }
            Mutation::PullImage { image } => format!("Failed to pull {}", image),
            Mutation::DownloadModel(request) => format!("Failed to download {}", request.model_id),
            Mutation::StartServing => "Failed to start service".to_string(),
            Mutation::StopAllServices => "Failed to stop services".to_string(),
            Mutation::KillService { container, .. } => {
                format!("Failed to stop service in {}", container)
            }
            Mutation::RunBenchmark => "Benchmark failed".to_string(),
        }
    }
}

impl Controller {
    /// Validate, confirm, send one request and refetch what it affected
    pub async fn submit(&self, mutation: Mutation) -> Outcome {
        let action = mutation.action();

        let payload = match self.resolve(&mutation).await {
            Ok(payload) => payload,
            Err(message) => {
                self.notifications.warning(message.clone());
                self.metrics.inc_mutation(action, "rejected");
                return Outcome::Rejected(message);
            }
        };

        let no_services = self.services.read().await.data().is_empty();
        if matches!(mutation, Mutation::StopAllServices) && no_services {
            let message = "No running services".to_string();
            self.notifications.info(message.clone());
            self.metrics.inc_mutation(action, "skipped");
            return Outcome::Skipped(message);
        }

        if let Some(prompt) = mutation.confirm_prompt() {
            if !self.confirmer.confirm(&prompt).await {
                self.metrics.inc_mutation(action, "cancelled");
                return Outcome::Cancelled;
            }
        }

        self.logger.log_mutation_sent(action);
        let started = Instant::now();
        let result = self.execute(&mutation, payload).await;
        self.metrics
            .observe_request(action, started.elapsed().as_secs_f64());

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                let detail = e.to_string();
                self.notifications
                    .error(format!("{}: {}", mutation.failure_prefix(), detail));
                self.metrics.inc_mutation(action, "failed");
                self.logger.log_mutation_failed(action, e.kind(), &detail);
                return Outcome::Failed(detail);
            }
        };

        match &reply.run_error {
            None => {
                self.notifications.success(reply.message);
                self.metrics.inc_mutation(action, "ok");
            }
            Some(error) => {
                self.notifications
                    .error(format!("{}: {}", mutation.failure_prefix(), error));
                self.metrics.inc_mutation(action, "failed");
                self.logger.log_mutation_failed(action, "run", error);
            }
        }

        let mut refreshed = Vec::with_capacity(mutation.affected().len());
        for kind in mutation.affected() {
            refreshed.push((*kind, self.refresh(*kind).await));
        }

        match reply.run_error {
            None => {
                self.logger.log_mutation_completed(action, refreshed.len());
                Outcome::Completed { refreshed }
            }
            Some(error) => Outcome::Failed(error),
        }
    }

    /// Validate the mutation and snapshot any form state it depends on
    async fn resolve(&self, mutation: &Mutation) -> Result<Payload, String> {
        mutation.validate()?;
        match mutation {
            Mutation::StartServing => {
                let form = self.serving_form.read().await.clone();
                let selection = self.selection.read().await.clone();
                let (container, config) = form.to_config(&selection).map_err(|e| e.to_string())?;
                Ok(Payload::Serving(container, config))
            }
            Mutation::RunBenchmark => {
                let config = self.benchmark_form.read().await.clone();
                required(&config.url, "Benchmark URL is required")?;
                required(&config.model_name, "Model name is required")?;
                Ok(Payload::Benchmark(config))
            }
            _ => Ok(Payload::None),
        }
    }

    async fn execute(&self, mutation: &Mutation, payload: Payload) -> ApiResult<Reply> {
        let api = self.api.as_ref();
        match (mutation, payload) {
            (Mutation::StartContainer { name }, _) => {
                api.start_container(name.trim()).await?;
                Ok(Reply::ok(format!("Container started: {}", name)))
            }
            (Mutation::StopContainer { name }, _) => {
                api.stop_container(name.trim()).await?;
                Ok(Reply::ok(format!("Container stopped: {}", name)))
            }
            (Mutation::DeleteContainer { name }, _) => {
                api.delete_container(name.trim()).await?;
                Ok(Reply::ok(format!("Container deleted: {}", name)))
            }
            (Mutation::CreateContainer(request), _) => {
                api.create_container(request).await?;
                Ok(Reply::ok(format!(
                    "Container created: {}",
                    request.container_name
                )))
            }
            (Mutation::PullImage { image }, _) => {
                let ack = api.pull_image(image.trim()).await?;
                let message = ack
                    .message
                    .unwrap_or_else(|| format!("Image pulled: {}", image));
                if ack.success {
                    Ok(Reply::ok(message))
                } else {
                    Err(ApiError::Rejected(message))
                }
            }
            (Mutation::DownloadModel(request), _) => {
                let ack = api.download_model(request).await?;
                Ok(Reply::ok(ack.message.unwrap_or_else(|| {
                    format!("Download complete: {}", request.model_id)
                })))
            }
            (Mutation::StartServing, Payload::Serving(container, config)) => {
                let response = api.start_serving(&container, &config).await?;
                Ok(Reply::ok(match response.service_id {
                    Some(id) => format!("Service started, ID: {}", id),
                    None => "Service starting...".to_string(),
                }))
            }
            (Mutation::StopAllServices, _) => {
                api.stop_all_services().await?;
                Ok(Reply::ok("All services stopped"))
            }
            (Mutation::KillService { container, pid }, _) => {
                let ack = api.kill_service(container.trim(), pid.trim()).await?;
                if ack.success {
                    Ok(Reply::ok("Service stopped"))
                } else {
                    Err(ApiError::Rejected(
                        ack.message
                            .unwrap_or_else(|| "backend reported failure".to_string()),
                    ))
                }
            }
            (Mutation::RunBenchmark, Payload::Benchmark(config)) => {
                let record = api.run_benchmark(&config).await?;
                let run_error = record.error.clone().filter(|e| !e.is_empty());
                *self.last_benchmark.write().await = Some(record);
                self.emit(ViewEvent::BenchmarkResult);
                Ok(Reply {
                    message: "Benchmark complete".to_string(),
                    run_error,
                })
            }
            (Mutation::StartServing, _) | (Mutation::RunBenchmark, _) => Err(ApiError::Validation(
                format!("{} submitted without its form", mutation.action()),
            )),
        }
    }
}
