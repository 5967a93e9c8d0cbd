//! Status header, NPU grid and the polling watch

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use playground_lib::observability::gather_text;
use playground_lib::view::{NpuGridView, StatusView};
use playground_lib::{CollectionKind, PollerBuilder, ViewEvent};
use serde::Serialize;
use std::time::Duration;
use tabled::Tabled;
use tokio::sync::broadcast::error::RecvError;

use super::Session;
use crate::output::{color_flag, color_status, color_utilization, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct NpuRow {
    #[tabled(rename = "NPU")]
    id: u32,
    #[tabled(rename = "Occupied")]
    occupied: String,
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Util")]
    utilization: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "HBM")]
    hbm: String,
}

#[derive(Serialize)]
struct StatusReport {
    status: StatusView,
    npus: NpuGridView,
}

/// `vap status`
pub async fn show(session: &Session) -> Result<bool> {
    let controller = &session.controller;
    let (status_ok, npu_ok) = tokio::join!(
        controller.refresh(CollectionKind::Status),
        controller.refresh(CollectionKind::NpuStatus)
    );
    session.flush();
    if !status_ok.is_applied() && !npu_ok.is_applied() {
        return Ok(false);
    }

    let report = StatusReport {
        status: StatusView::project(&controller.status().await),
        npus: NpuGridView::project(
            &controller.npu_devices().await,
            &controller.selection().await,
            controller.config().npu_count,
        ),
    };

    match session.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_header(&report.status);
            println!();
            let rows = report
                .npus
                .cells
                .iter()
                .map(|cell| NpuRow {
                    id: cell.id,
                    occupied: color_flag(cell.occupied),
                    container: cell.container.clone().unwrap_or_else(|| "-".to_string()),
                    utilization: color_utilization(cell.utilization),
                    health: color_status(&cell.health),
                    hbm: cell.hbm.clone(),
                })
                .collect();
            print_table(rows, "No NPUs reported");
        }
    }

    Ok(true)
}

fn print_header(status: &StatusView) {
    println!("{}", "Playground Status".bold());
    println!("{}", "=".repeat(50));
    let vllm = if status.vllm_running {
        "running".green()
    } else {
        "stopped".dimmed()
    };
    println!("vLLM:                   {}", vllm);
    if let Some(container) = &status.current_container {
        println!("Serving container:      {}", container.cyan());
    }
    println!(
        "Containers:             {}/{} running",
        status.running_containers, status.total_containers
    );
    println!(
        "NPUs:                   {}/{} occupied",
        status.occupied_npus, status.total_npus
    );
}

fn summary_line(status: &StatusView) -> String {
    format!(
        "[{}] vLLM {} | containers {}/{} running | NPUs {}/{} occupied",
        Local::now().format("%H:%M:%S"),
        if status.vllm_running { "running" } else { "stopped" },
        status.running_containers,
        status.total_containers,
        status.occupied_npus,
        status.total_npus
    )
}

/// `vap watch`: poll until Ctrl-C
pub async fn watch(session: &Session, interval: Option<u64>, metrics: bool) -> Result<bool> {
    let controller = session.controller.clone();
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| controller.config().poll_interval());

    let mut events = controller.subscribe();
    let handle = PollerBuilder::new()
        .controller(controller.clone())
        .interval(interval)
        .kinds([CollectionKind::Status, CollectionKind::NpuStatus])
        .build()?
        .spawn();

    if session.format == OutputFormat::Table {
        println!(
            "{}",
            format!("Polling every {}s, Ctrl-C to stop", interval.as_secs_f64()).dimmed()
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ViewEvent::Changed(CollectionKind::Status)) => {
                    session.flush();
                    let view = StatusView::project(&controller.status().await);
                    match session.format {
                        OutputFormat::Json => println!("{}", serde_json::to_string(&view)?),
                        OutputFormat::Table => println!("{}", summary_line(&view)),
                    }
                }
                Ok(ViewEvent::Failed(CollectionKind::Status)) => {
                    session.flush();
                    if session.format == OutputFormat::Table {
                        println!("{}", "Status is stale, showing last known values".dimmed());
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => session.flush(),
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    let polls = handle.stop().await;
    session.flush();
    if session.format == OutputFormat::Table {
        println!("{}", format!("Stopped after {} polls", polls).dimmed());
    }
    if metrics {
        print!("{}", gather_text());
    }

    Ok(true)
}
