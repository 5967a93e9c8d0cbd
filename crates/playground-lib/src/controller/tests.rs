use super::*;
use crate::api::LogSource;
use crate::models::{
    Ack, ChatChoice, ChatChoiceMessage, ChatModelEntry, ChatModelList, ChatResponse, ChatRole,
    DownloadRequest, DownloadSource, ImageInfo, Preset,
};
use crate::notify::Level;
use crate::settings::ModalDevices;
use crate::test_support::{container, service, MockApi};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Confirmer that answers a fixed way and counts prompts
struct ScriptedConfirm {
    answer: bool,
    prompts: AtomicUsize,
}

impl ScriptedConfirm {
    fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: AtomicUsize::new(0),
        })
    }

    fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

fn setup() -> (Arc<MockApi>, Controller) {
    setup_with(Arc::new(AlwaysConfirm), ControllerConfig::default())
}

fn setup_with(confirmer: Arc<dyn Confirmer>, config: ControllerConfig) -> (Arc<MockApi>, Controller) {
    let api = Arc::new(MockApi::new());
    let controller = Controller::new(api.clone(), confirmer, config);
    (api, controller)
}

fn messages(controller: &Controller, level: Level) -> Vec<String> {
    controller
        .notifications()
        .active()
        .into_iter()
        .filter(|n| n.level == level)
        .map(|n| n.message)
        .collect()
}

#[tokio::test]
async fn test_refresh_replaces_cache_on_success() {
    let (api, controller) = setup();
    assert_eq!(controller.state(CollectionKind::Containers).await, CollectionState::Empty);

    api.set_containers(vec![container("a", "img", true)]);
    assert_eq!(controller.refresh(CollectionKind::Containers).await, RefreshOutcome::Applied);
    assert_eq!(controller.containers().await.len(), 1);
    assert_eq!(controller.state(CollectionKind::Containers).await, CollectionState::Ready);

    api.set_containers(vec![container("b", "img", false), container("c", "img", true)]);
    controller.refresh(CollectionKind::Containers).await;
    let names: Vec<_> = controller.containers().await.into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["b", "c"]);
}

#[tokio::test]
async fn test_refresh_failure_retains_cache() {
    let (api, controller) = setup();
    api.set_services(vec![service("box", "42")]);
    controller.refresh(CollectionKind::Services).await;

    api.fail_reads("running_services", "docker unavailable");
    let outcome = controller.refresh(CollectionKind::Services).await;

    assert_eq!(outcome, RefreshOutcome::Failed("docker unavailable".to_string()));
    assert_eq!(controller.services().await, vec![service("box", "42")]);
    assert_eq!(controller.state(CollectionKind::Services).await, CollectionState::Stale);
    assert_eq!(
        controller.last_error(CollectionKind::Services).await.as_deref(),
        Some("docker unavailable")
    );

    let errors = messages(&controller, Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("docker unavailable"));
    assert_eq!(api.calls("running_services"), 2, "a failed refresh is never retried");
}

#[tokio::test]
async fn test_failed_refresh_publishes_event() {
    let (api, controller) = setup();
    let mut events = controller.subscribe();
    api.fail_reads("status", "boom");

    controller.refresh(CollectionKind::Status).await;

    assert_eq!(
        events.recv().await.unwrap(),
        ViewEvent::Failed(CollectionKind::Status)
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_late_response_is_dropped() {
    let (api, controller) = setup();
    api.script_containers(vec![
        (Duration::from_millis(80), vec![container("old", "img", false)]),
        (Duration::ZERO, vec![container("new", "img", true)]),
    ]);

    let (slow, fast) = tokio::join!(
        controller.refresh(CollectionKind::Containers),
        controller.refresh(CollectionKind::Containers),
    );

    assert_eq!(fast, RefreshOutcome::Applied);
    assert_eq!(slow, RefreshOutcome::Superseded);
    let names: Vec<_> = controller.containers().await.into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["new"]);
    assert_eq!(controller.state(CollectionKind::Containers).await, CollectionState::Ready);
}

#[tokio::test]
async fn test_container_refresh_publishes_choices() {
    let (api, controller) = setup();
    let mut events = controller.subscribe();
    api.set_containers(vec![container("a", "img", false), container("b", "img", true)]);

    controller.refresh(CollectionKind::Containers).await;

    assert_eq!(
        events.recv().await.unwrap(),
        ViewEvent::Changed(CollectionKind::Containers)
    );
    assert_eq!(
        events.recv().await.unwrap(),
        ViewEvent::ContainerChoices(vec!["b".to_string()])
    );
}

#[tokio::test]
async fn test_refresh_all_loads_every_collection() {
    let (api, controller) = setup();
    let outcomes = controller.refresh_all().await;

    assert_eq!(outcomes.len(), CollectionKind::ALL.len());
    assert!(outcomes.iter().all(|(_, o)| o.is_applied()));
    for kind in CollectionKind::ALL {
        assert_eq!(controller.state(kind).await, CollectionState::Ready);
    }
    assert_eq!(api.calls("npu_status"), 1);
}

#[tokio::test]
async fn test_containers_view_filters() {
    let (api, controller) = setup();
    api.set_containers(vec![container("a", "img", false), container("b", "img", true)]);
    controller.refresh(CollectionKind::Containers).await;

    let by_text = controller.containers_view("a", false).await;
    assert_eq!(by_text, vec![container("a", "img", false)]);

    let running = controller.containers_view("", true).await;
    assert_eq!(running, vec![container("b", "img", true)]);

    assert_eq!(controller.containers().await.len(), 2);
}

#[tokio::test]
async fn test_models_view_by_source() {
    let (_api, controller) = setup();
    let popular = controller.models_view(ModelSource::Popular, "8b").await;
    assert_eq!(popular.len(), 1);
    assert_eq!(popular[0].reference(), "Qwen/Qwen3-8B");

    assert!(controller.models_view(ModelSource::Local, "").await.is_empty());
}

#[tokio::test]
async fn test_failed_mutation_sends_one_request_and_no_refresh() {
    let (api, controller) = setup();
    api.set_containers(vec![container("x", "img", false)]);
    controller.refresh(CollectionKind::Containers).await;
    let before = controller.containers().await;

    api.fail("start_container", 500, "boom");
    let outcome = controller
        .submit(Mutation::StartContainer { name: "x".to_string() })
        .await;

    assert_eq!(outcome, Outcome::Failed("boom".to_string()));
    assert_eq!(controller.containers().await, before);
    assert_eq!(api.calls("start_container"), 1);
    assert_eq!(api.calls("containers"), 1, "no follow-up refresh");

    let all = controller.notifications().active();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].level, Level::Error);
    assert!(all[0].message.contains("boom"));
}

#[tokio::test]
async fn test_successful_mutation_refreshes_once_after_request() {
    let (api, controller) = setup();
    let outcome = controller
        .submit(Mutation::StopContainer { name: "x".to_string() })
        .await;

    assert!(outcome.is_completed());
    assert_eq!(api.call_log(), vec!["stop_container", "containers"]);
    assert_eq!(messages(&controller, Level::Success), vec!["Container stopped: x"]);
}

#[tokio::test]
async fn test_serving_mutations_refresh_services_then_status() {
    let (api, controller) = setup();
    api.set_services(vec![service("box", "42")]);
    controller.refresh(CollectionKind::Services).await;

    let outcome = controller
        .submit(Mutation::KillService {
            container: "box".to_string(),
            pid: "42".to_string(),
        })
        .await;

    match outcome {
        Outcome::Completed { refreshed } => {
            let kinds: Vec<_> = refreshed.iter().map(|(k, _)| *k).collect();
            assert_eq!(kinds, vec![CollectionKind::Services, CollectionKind::Status]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(
        api.call_log(),
        vec!["running_services", "kill_service", "running_services", "status"]
    );
}

#[tokio::test]
async fn test_kill_reported_failure_is_an_error() {
    let (api, controller) = setup();
    api.set_ack(Ack {
        success: false,
        message: None,
    });

    let outcome = controller
        .submit(Mutation::KillService {
            container: "box".to_string(),
            pid: "7".to_string(),
        })
        .await;

    assert!(matches!(outcome, Outcome::Failed(_)));
    assert_eq!(api.calls("running_services"), 0);
}

#[tokio::test]
async fn test_validation_short_circuits() {
    let (api, controller) = setup();
    let outcome = controller
        .submit(Mutation::StartContainer { name: "  ".to_string() })
        .await;

    assert_eq!(outcome, Outcome::Rejected("Container name is required".to_string()));
    assert!(api.call_log().is_empty());
    assert_eq!(messages(&controller, Level::Warning).len(), 1);
}

#[tokio::test]
async fn test_start_serving_requires_container_and_model() {
    let (api, controller) = setup();
    let outcome = controller.submit(Mutation::StartServing).await;
    assert_eq!(outcome, Outcome::Rejected("Select a container first".to_string()));

    controller
        .edit_serving_form(|form| form.container = Some("box".to_string()))
        .await;
    let outcome = controller.submit(Mutation::StartServing).await;
    assert_eq!(outcome, Outcome::Rejected("Select or enter a model".to_string()));
    assert_eq!(api.mutating_calls(), 0);
}

#[tokio::test]
async fn test_start_serving_sends_form_and_selection() {
    let (api, controller) = setup();
    controller
        .edit_serving_form(|form| {
            form.container = Some("box".to_string());
            form.local_path = "/models/qwen".to_string();
        })
        .await;
    controller.toggle_npu(3).await;

    let outcome = controller.submit(Mutation::StartServing).await;
    assert!(outcome.is_completed());

    let (container, config) = api.last_serving().unwrap();
    assert_eq!(container, "box");
    assert_eq!(config.npu_devices, vec![0, 3]);
    assert_eq!(config.model_source.local_path.as_deref(), Some("/models/qwen"));
    assert_eq!(
        messages(&controller, Level::Success),
        vec!["Service started, ID: svc-1"]
    );
}

#[tokio::test]
async fn test_confirmation_refusal_sends_nothing() {
    let confirm = ScriptedConfirm::new(false);
    let (api, controller) = setup_with(confirm.clone(), ControllerConfig::default());

    let outcome = controller
        .submit(Mutation::DeleteContainer { name: "x".to_string() })
        .await;

    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(confirm.prompts(), 1);
    assert!(api.call_log().is_empty());
}

#[tokio::test]
async fn test_non_destructive_mutation_is_not_confirmed() {
    let confirm = ScriptedConfirm::new(false);
    let (api, controller) = setup_with(confirm.clone(), ControllerConfig::default());

    controller
        .submit(Mutation::StartContainer { name: "x".to_string() })
        .await;
    assert_eq!(confirm.prompts(), 0);
    assert_eq!(api.calls("start_container"), 1);
}

#[tokio::test]
async fn test_stop_all_without_services_is_skipped() {
    let confirm = ScriptedConfirm::new(true);
    let (api, controller) = setup_with(confirm.clone(), ControllerConfig::default());

    let outcome = controller.submit(Mutation::StopAllServices).await;

    assert_eq!(outcome, Outcome::Skipped("No running services".to_string()));
    assert_eq!(confirm.prompts(), 0);
    assert!(api.call_log().is_empty());
    assert_eq!(messages(&controller, Level::Info), vec!["No running services"]);
}

#[tokio::test]
async fn test_pull_image_reported_failure() {
    let (api, controller) = setup();
    api.set_ack(Ack {
        success: false,
        message: Some("manifest unknown".to_string()),
    });

    let outcome = controller
        .submit(Mutation::PullImage {
            image: "quay.io/ascend/vllm-ascend:nope".to_string(),
        })
        .await;

    assert_eq!(outcome, Outcome::Failed("manifest unknown".to_string()));
    let errors = messages(&controller, Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("manifest unknown"));
    assert_eq!(api.call_log(), vec!["pull_image"]);
}

#[tokio::test]
async fn test_download_refreshes_models() {
    let (api, controller) = setup();
    api.set_ack(Ack {
        success: true,
        message: Some("Downloaded Qwen/Qwen3-0.6B".to_string()),
    });

    let outcome = controller
        .submit(Mutation::DownloadModel(DownloadRequest {
            model_id: "Qwen/Qwen3-0.6B".to_string(),
            source: DownloadSource::Modelscope,
            cache_dir: None,
        }))
        .await;

    assert!(outcome.is_completed());
    assert_eq!(api.call_log(), vec!["download_model", "models"]);
    assert_eq!(
        messages(&controller, Level::Success),
        vec!["Downloaded Qwen/Qwen3-0.6B"]
    );
}

#[tokio::test]
async fn test_benchmark_error_still_refreshes_history() {
    let (api, controller) = setup();
    api.set_benchmark(BenchmarkRecord {
        error: Some("connection refused".to_string()),
        ..Default::default()
    });

    let outcome = controller.submit(Mutation::RunBenchmark).await;

    assert_eq!(outcome, Outcome::Failed("connection refused".to_string()));
    assert_eq!(api.call_log(), vec!["run_benchmark", "benchmark_history"]);
    let last = controller.last_benchmark().await.unwrap();
    assert_eq!(last.error.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn test_apply_template_rewrites_benchmark_form() {
    let (_api, controller) = setup();
    assert!(controller.apply_template("stress test").await);

    let form = controller.benchmark_form().await;
    assert_eq!(form.parallel, 16);
    assert_eq!(form.number, 100);
    assert_eq!(
        messages(&controller, Level::Info),
        vec!["Template applied: Stress Test"]
    );

    assert!(!controller.apply_template("nope").await);
}

#[tokio::test]
async fn test_toggle_npu_regenerates_preview() {
    let (_api, controller) = setup();
    let mut events = controller.subscribe();

    assert!(controller.toggle_npu(2).await);
    assert_eq!(controller.selection().await.to_vec(), vec![0, 2]);
    match events.recv().await.unwrap() {
        ViewEvent::CommandPreview(preview) => {
            assert!(preview.starts_with("export ASCEND_RT_VISIBLE_DEVICES=0,2"))
        }
        other => panic!("unexpected event: {:?}", other),
    }

    assert!(!controller.toggle_npu(0).await);
    assert!(!controller.toggle_npu(2).await);
    assert!(controller.selection().await.is_empty());
}

#[tokio::test]
async fn test_use_model_fills_serving_form() {
    let (_api, controller) = setup();
    let popular = controller.models_view(ModelSource::Popular, "0.6b").await;
    controller.use_model(&popular[0]).await;

    let form = controller.serving_form().await;
    assert_eq!(form.source_type, SourceType::Modelscope);
    assert_eq!(form.model_id, "Qwen/Qwen3-0.6B");
    assert!(controller
        .command_preview()
        .await
        .contains("vllm serve Qwen/Qwen3-0.6B"));
}

#[tokio::test]
async fn test_list_images_reports_failure() {
    let (api, controller) = setup();
    api.set_images(vec![ImageInfo {
        id: "abc".to_string(),
        repository: "quay.io/ascend/vllm-ascend".to_string(),
        tag: "v0.13.0rc1".to_string(),
        ..ImageInfo::default()
    }]);

    let images = controller.list_images().await.unwrap();
    assert_eq!(images[0].reference(), "quay.io/ascend/vllm-ascend:v0.13.0rc1");

    api.fail_reads("images", "docker not found");
    assert!(controller.list_images().await.is_none());
    assert_eq!(
        messages(&controller, Level::Error),
        vec!["Failed to load images: docker not found".to_string()]
    );
    assert_eq!(api.mutating_calls(), 0);
}

#[tokio::test]
async fn test_save_preset_requires_name() {
    let (api, controller) = setup();

    assert!(!controller.save_preset("  ").await);
    assert_eq!(api.calls("save_preset"), 0);
    assert_eq!(
        messages(&controller, Level::Warning),
        vec!["Preset name is required".to_string()]
    );
}

#[tokio::test]
async fn test_preset_round_trip_keeps_container() {
    let (api, controller) = setup();
    controller
        .edit_serving_form(|form| {
            form.container = Some("vllm-a".to_string());
            form.use_model("Qwen/Qwen3-8B", SourceType::Modelscope);
            form.tensor_parallel_size = 4;
            form.port = 8100;
        })
        .await;

    assert!(controller.save_preset("qwen8b-tp4").await);
    assert_eq!(api.calls("save_preset"), 1);
    let stored = api.presets().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].config.get("container").is_none());
    assert_eq!(stored[0].config["tensor_parallel_size"], 4);

    controller
        .edit_serving_form(|form| {
            *form = ServingForm {
                container: Some("vllm-b".to_string()),
                ..ServingForm::default()
            }
        })
        .await;
    let mut events = controller.subscribe();

    assert!(controller.apply_preset("qwen8b-tp4").await);
    let form = controller.serving_form().await;
    assert_eq!(form.container.as_deref(), Some("vllm-b"));
    assert_eq!(form.model_id, "Qwen/Qwen3-8B");
    assert_eq!(form.tensor_parallel_size, 4);
    assert_eq!(form.port, 8100);
    match events.recv().await.unwrap() {
        ViewEvent::CommandPreview(preview) => assert!(preview.contains("--port 8100")),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_apply_unknown_or_invalid_preset() {
    let (api, controller) = setup();
    api.set_presets(vec![Preset {
        name: "broken".to_string(),
        config: serde_json::json!({"port": "not a number"}),
        created_at: String::new(),
    }]);

    assert!(!controller.apply_preset("missing").await);
    assert!(!controller.apply_preset("broken").await);
    assert_eq!(controller.serving_form().await, ServingForm::default());
    assert_eq!(messages(&controller, Level::Warning).len(), 1);
    assert_eq!(messages(&controller, Level::Error).len(), 1);
}

#[tokio::test]
async fn test_open_create_form_checks_default_devices() {
    let config = ControllerConfig {
        npu_count: 16,
        modal_devices: ModalDevices::FirstN(8),
        ..ControllerConfig::default()
    };
    let (_api, controller) = setup_with(Arc::new(AlwaysConfirm), config);

    controller
        .edit_create_form(|form| {
            form.name = "scratch".to_string();
            form.devices.toggle(12);
        })
        .await;

    let form = controller.open_create_form().await;
    assert!(form.name.is_empty());
    assert_eq!(form.devices.to_vec(), (0..8).collect::<Vec<_>>());
    assert_eq!(form.image, CreateContainerForm::DEFAULT_IMAGE);
    assert_eq!(controller.create_form().await, form);
}

fn reply(content: &str) -> ChatResponse {
    ChatResponse {
        choices: vec![ChatChoice {
            message: Some(ChatChoiceMessage {
                content: Some(content.to_string()),
            }),
        }],
    }
}

#[tokio::test]
async fn test_chat_round_trip_and_error_entries() {
    let (api, controller) = setup();

    assert_eq!(controller.send_chat("   ").await, ChatOutcome::Ignored);
    assert!(api.call_log().is_empty());

    // No choices
    let outcome = controller.send_chat("hello").await;
    assert_eq!(outcome, ChatOutcome::Errored("No reply received".to_string()));

    api.set_chat(reply("hi there"));
    let outcome = controller.send_chat("again").await;
    assert_eq!(outcome, ChatOutcome::Replied("hi there".to_string()));

    let sent = api.last_chat().unwrap();
    let roles: Vec<_> = sent.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![ChatRole::User, ChatRole::User]);

    let transcript = controller.transcript().await;
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[1].role, ChatRole::Error);
    assert_eq!(transcript[3].content, "hi there");

    controller.clear_chat().await;
    assert!(controller.transcript().await.is_empty());
}

#[tokio::test]
async fn test_chat_request_uses_default_sampling() {
    let (api, controller) = setup();
    api.set_chat(reply("ok"));

    controller.send_chat("hello").await;

    let sent = api.last_chat().unwrap();
    assert_eq!(sent.max_tokens, 2048);
    assert_eq!(sent.temperature, 0.7);
    assert_eq!(sent.model, "default-model");
}

#[tokio::test]
async fn test_fetch_chat_models_adopts_first() {
    let (api, controller) = setup();
    api.set_chat_models(ChatModelList {
        data: vec![
            ChatModelEntry { id: "qwen3".to_string() },
            ChatModelEntry { id: "other".to_string() },
        ],
        error: None,
    });

    assert_eq!(controller.fetch_chat_models().await.as_deref(), Some("qwen3"));
    assert_eq!(controller.chat_settings().await.model, "qwen3");

    api.set_chat_models(ChatModelList {
        data: vec![],
        error: Some("connection refused".to_string()),
    });
    assert!(controller.fetch_chat_models().await.is_none());
    assert_eq!(controller.chat_settings().await.model, "qwen3");
    assert_eq!(messages(&controller, Level::Error).len(), 1);
}

#[tokio::test]
async fn test_fetch_logs() {
    let (api, controller) = setup();

    let text = controller.fetch_logs(&LogSource::System, None).await;
    assert_eq!(text.as_deref(), Some(NO_LOGS));

    api.set_logs("line one\nline two");
    let text = controller.fetch_logs(&LogSource::Playground, Some(10)).await;
    assert_eq!(text.as_deref(), Some("line one\nline two"));

    let text = controller
        .fetch_logs(&LogSource::Container(String::new()), None)
        .await;
    assert!(text.is_none());
    assert_eq!(api.calls("logs"), 2);
    assert_eq!(messages(&controller, Level::Warning), vec!["Select a container first"]);
}

#[test]
fn test_mutation_metadata() {
    let delete = Mutation::DeleteContainer { name: "x".to_string() };
    assert!(delete.is_destructive());
    assert_eq!(delete.affected(), &[CollectionKind::Containers]);

    let pull = Mutation::PullImage { image: "img".to_string() };
    assert!(!pull.is_destructive());
    assert!(pull.affected().is_empty());

    assert_eq!(
        Mutation::StartServing.affected(),
        &[CollectionKind::Services, CollectionKind::Status]
    );
    assert_eq!(
        Mutation::CreateContainer(CreateContainerRequest {
            container_name: "n".to_string(),
            image: " ".to_string(),
            npu_devices: vec![],
            shm_size: "60g".to_string(),
        })
        .validate(),
        Err("Image name is required".to_string())
    );
}
