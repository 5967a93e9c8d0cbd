//! vLLM service commands

use anyhow::Result;
use colored::Colorize;
use playground_lib::serving::SourceType;
use playground_lib::view::ServiceListView;
use playground_lib::{CollectionKind, Mutation};
use tabled::Tabled;

use super::Session;
use crate::output::{print_json, print_table, OutputFormat};
use crate::ServeArgs;

#[derive(Tabled)]
struct PresetTableRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "TP")]
    tensor_parallel: String,
    #[tabled(rename = "Saved")]
    created_at: String,
}

#[derive(Tabled)]
struct ServiceTableRow {
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Process")]
    process: String,
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "NPUs")]
    npus: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

/// Copy the flags into the serving form and NPU selection
async fn fill_form(session: &Session, args: ServeArgs) {
    let controller = &session.controller;

    let mut container = args.container;
    if container.is_none() {
        // Fall back to the only running container, if there is exactly one.
        if session.load(CollectionKind::Containers).await {
            let choices = controller.container_choices().await;
            if let [only] = choices.as_slice() {
                container = Some(only.clone());
            }
        }
    }

    if !args.devices.is_empty() {
        controller
            .set_selection(args.devices.into_iter().collect())
            .await;
    }

    controller
        .edit_serving_form(|form| {
            form.container = container;
            match (args.model_id, args.local_path) {
                (Some(id), _) => form.use_model(&id, SourceType::Modelscope),
                (None, Some(path)) => form.use_model(&path, SourceType::Local),
                (None, None) => {}
            }
            form.served_model_name = args.served_model_name;
            form.port = args.port;
            form.tensor_parallel_size = args.tensor_parallel_size;
            form.max_model_len = args.max_model_len;
            form.dtype = args.dtype;
            form.trust_remote_code = !args.no_trust_remote_code;
            form.additional_args = args.extra_args.unwrap_or_default();
        })
        .await;
}

/// `vap serve start`
pub async fn start(session: &Session, args: ServeArgs) -> Result<bool> {
    fill_form(session, args).await;
    if session.format == OutputFormat::Table {
        println!("{}", session.controller.command_preview().await.dimmed());
        println!();
    }
    Ok(session.submit(Mutation::StartServing).await)
}

/// `vap serve preview`
pub async fn preview(session: &Session, args: ServeArgs) -> Result<bool> {
    fill_form(session, args).await;
    let command = session.controller.command_preview().await;
    match session.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "command": command }))?,
        OutputFormat::Table => println!("{}", command),
    }
    Ok(true)
}

/// `vap serve list`
pub async fn list(session: &Session) -> Result<bool> {
    if !session.load(CollectionKind::Services).await {
        return Ok(false);
    }

    let view = ServiceListView::project(&session.controller.services().await);
    match session.format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            let placeholder = view.placeholder.unwrap_or_default();
            let rows = view
                .rows
                .into_iter()
                .map(|row| ServiceTableRow {
                    container: row.container,
                    process: row.process,
                    pid: row.pid,
                    port: row.port,
                    npus: row.npus,
                    memory: row.memory,
                })
                .collect();
            print_table(rows, placeholder);
        }
    }

    Ok(true)
}

/// `vap serve stop-all`: loads the service list so empty lists are skipped locally
pub async fn stop_all(session: &Session) -> Result<bool> {
    if !session.load(CollectionKind::Services).await {
        return Ok(false);
    }
    Ok(session.submit(Mutation::StopAllServices).await)
}

pub async fn kill(session: &Session, container: String, pid: String) -> Result<bool> {
    Ok(session
        .submit(Mutation::KillService { container, pid })
        .await)
}

/// `vap serve presets`
pub async fn presets(session: &Session) -> Result<bool> {
    let presets = session.controller.presets().await;
    session.flush();
    let Some(presets) = presets else {
        return Ok(false);
    };

    match session.format {
        OutputFormat::Json => print_json(&presets)?,
        OutputFormat::Table => {
            let field = |config: &serde_json::Value, key: &str| match config.get(key) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            let rows = presets
                .iter()
                .map(|preset| {
                    let model = match field(&preset.config, "source_type").as_str() {
                        "modelscope" => field(&preset.config, "model_id"),
                        _ => field(&preset.config, "local_path"),
                    };
                    PresetTableRow {
                        name: preset.name.clone(),
                        model,
                        tensor_parallel: field(&preset.config, "tensor_parallel_size"),
                        created_at: preset.created_at.clone(),
                    }
                })
                .collect();
            print_table(rows, "No presets saved");
        }
    }

    Ok(true)
}

/// `vap serve save-preset`
pub async fn save_preset(session: &Session, name: String, args: ServeArgs) -> Result<bool> {
    fill_form(session, args).await;
    let saved = session.controller.save_preset(&name).await;
    session.flush();
    Ok(saved)
}

/// `vap serve apply-preset`: flags only pick the target, the preset fills the rest
pub async fn apply_preset(
    session: &Session,
    name: String,
    container: Option<String>,
    devices: Vec<u32>,
    preview: bool,
) -> Result<bool> {
    let controller = &session.controller;
    let applied = controller.apply_preset(&name).await;
    session.flush();
    if !applied {
        return Ok(false);
    }

    let container = match container {
        Some(container) => Some(container),
        None if session.load(CollectionKind::Containers).await => {
            match controller.container_choices().await.as_slice() {
                [only] => Some(only.clone()),
                _ => None,
            }
        }
        None => None,
    };
    if !devices.is_empty() {
        controller.set_selection(devices.into_iter().collect()).await;
    }
    controller
        .edit_serving_form(|form| form.container = container)
        .await;

    let command = controller.command_preview().await;
    if preview {
        match session.format {
            OutputFormat::Json => print_json(&serde_json::json!({ "command": command }))?,
            OutputFormat::Table => println!("{}", command),
        }
        return Ok(true);
    }

    if session.format == OutputFormat::Table {
        println!("{}", command.dimmed());
        println!();
    }
    Ok(session.submit(Mutation::StartServing).await)
}
