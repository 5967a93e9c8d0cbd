//! Cache to view-model projections
//!
//! Everything here is a pure function of its inputs. Renderers (the CLI
//! tables, or any other front end) bind to these structs and never read
//! controller caches directly.

use crate::filter;
use crate::models::{
    BenchmarkRecord, Container, ModelDescriptor, NpuDevice, RunningService, StatusSnapshot,
};
use crate::selection::NpuSelection;
use serde::Serialize;

pub const NO_RECORDS: &str = "No records";
pub const NO_SERVICES: &str = "No running vLLM services";
pub const NO_MODELS: &str = "No models found";
pub const NO_CONTAINERS: &str = "No containers";

/// Two-decimal rendering used by every benchmark metric
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => "N/A".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerRow {
    pub name: String,
    pub image: String,
    pub status: String,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerListView {
    pub rows: Vec<ContainerRow>,
    pub shown: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

impl ContainerListView {
    pub fn project(containers: &[Container], text: &str, running_only: bool) -> Self {
        let rows: Vec<ContainerRow> = filter::filter_containers(containers, text, running_only)
            .into_iter()
            .map(|c| ContainerRow {
                name: c.name.clone(),
                image: c.image.clone(),
                status: c.status.clone(),
                running: c.running,
            })
            .collect();

        Self {
            shown: rows.len(),
            total: containers.len(),
            placeholder: rows.is_empty().then_some(NO_CONTAINERS),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRow {
    pub name: String,
    /// Path or id handed to the serving form
    pub reference: String,
    pub size: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelListView {
    pub rows: Vec<ModelRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

impl ModelListView {
    pub fn project(models: &[ModelDescriptor]) -> Self {
        let rows: Vec<ModelRow> = models
            .iter()
            .map(|m| ModelRow {
                name: m.name.clone(),
                reference: m.reference().to_string(),
                size: m
                    .size_human
                    .clone()
                    .or_else(|| m.parameters.clone())
                    .unwrap_or_default(),
                source: m.source.to_string(),
            })
            .collect();

        Self {
            placeholder: rows.is_empty().then_some(NO_MODELS),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRow {
    pub container: String,
    pub process: String,
    pub pid: String,
    pub port: u16,
    pub npus: String,
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceListView {
    pub rows: Vec<ServiceRow>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

impl ServiceListView {
    pub fn project(services: &[RunningService]) -> Self {
        let rows: Vec<ServiceRow> = services
            .iter()
            .map(|s| ServiceRow {
                container: s.container.clone(),
                process: s.process_name.clone().unwrap_or_else(|| "vLLM".to_string()),
                pid: s.pid.clone(),
                port: s.port,
                npus: s
                    .npu_devices
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                memory: if s.memory_mb > 0 {
                    format!("{:.1} GB", s.memory_mb as f64 / 1024.0)
                } else {
                    "N/A".to_string()
                },
            })
            .collect();

        Self {
            count: rows.len(),
            placeholder: rows.is_empty().then_some(NO_SERVICES),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRow {
    pub timestamp: String,
    pub benchmark_type: String,
    pub throughput: String,
    pub avg_latency: String,
    pub p99_latency: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkHistoryView {
    /// Most recent run first
    pub rows: Vec<BenchmarkRow>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

impl BenchmarkHistoryView {
    /// The backend returns runs in append order
    pub fn project(history: &[BenchmarkRecord]) -> Self {
        let rows: Vec<BenchmarkRow> = history
            .iter()
            .rev()
            .map(|r| BenchmarkRow {
                timestamp: display_timestamp(&r.timestamp),
                benchmark_type: r.benchmark_type.clone(),
                throughput: format_metric(r.throughput),
                avg_latency: format_metric(r.avg_latency),
                p99_latency: format_metric(r.p99_latency),
                status: if r.error.is_some() || r.success == Some(false) {
                    "failed".to_string()
                } else {
                    "ok".to_string()
                },
            })
            .collect();

        Self {
            count: rows.len(),
            placeholder: rows.is_empty().then_some(NO_RECORDS),
            rows,
        }
    }
}

/// RFC 3339 timestamps in local time; anything else is shown as received
fn display_timestamp(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        })
        .unwrap_or_else(|_| raw.to_string())
}

/// Display of a single benchmark run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum BenchmarkResultView {
    Failed {
        message: String,
    },
    Metrics {
        throughput: String,
        avg_latency: String,
        p95_latency: String,
        p99_latency: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_output: Option<String>,
    },
}

impl BenchmarkResultView {
    pub fn project(record: &BenchmarkRecord) -> Self {
        if let Some(error) = record.error.as_deref() {
            return BenchmarkResultView::Failed {
                message: format!("Failed: {}", error),
            };
        }
        BenchmarkResultView::Metrics {
            throughput: format_metric(record.throughput),
            avg_latency: format_metric(record.avg_latency),
            p95_latency: format_metric(record.p95_latency),
            p99_latency: format_metric(record.p99_latency),
            raw_output: record.raw_output.clone().filter(|o| !o.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpuCell {
    pub id: u32,
    pub occupied: bool,
    pub selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    pub utilization: f64,
    pub health: String,
    pub hbm: String,
}

/// NPU grid: one cell per device, marked with the current selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpuGridView {
    pub cells: Vec<NpuCell>,
    pub occupied: usize,
}

impl NpuGridView {
    /// Devices missing from the backend report are shown as free up to `npu_count`
    pub fn project(devices: &[NpuDevice], selection: &NpuSelection, npu_count: u32) -> Self {
        let mut cells: Vec<NpuCell> = devices
            .iter()
            .map(|d| NpuCell {
                id: d.id,
                occupied: d.occupied,
                selected: selection.contains(d.id),
                container: d.container.clone(),
                utilization: d.utilization,
                health: d.health.clone(),
                hbm: if d.hbm_total > 0 {
                    format!("{}/{} MB", d.hbm_used, d.hbm_total)
                } else {
                    "N/A".to_string()
                },
            })
            .collect();

        for id in 0..npu_count {
            if !cells.iter().any(|c| c.id == id) {
                cells.push(NpuCell {
                    id,
                    occupied: false,
                    selected: selection.contains(id),
                    container: None,
                    utilization: 0.0,
                    health: "unknown".to_string(),
                    hbm: "N/A".to_string(),
                });
            }
        }
        cells.sort_by_key(|c| c.id);

        Self {
            occupied: cells.iter().filter(|c| c.occupied).count(),
            cells,
        }
    }
}

/// Header summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub vllm_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_container: Option<String>,
    pub running_containers: usize,
    pub total_containers: usize,
    pub occupied_npus: usize,
    pub total_npus: usize,
}

impl StatusView {
    pub fn project(status: &StatusSnapshot) -> Self {
        Self {
            vllm_running: status.vllm_running,
            current_container: status.current_container.clone(),
            running_containers: status.running_containers(),
            total_containers: status.containers.len(),
            occupied_npus: status.npu_status.iter().filter(|d| d.occupied).count(),
            total_npus: status.npu_status.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: &str, throughput: Option<f64>) -> BenchmarkRecord {
        BenchmarkRecord {
            timestamp: timestamp.to_string(),
            benchmark_type: "evalscope".to_string(),
            throughput,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_history_reports_no_records() {
        let view = BenchmarkHistoryView::project(&[]);
        assert_eq!(view.count, 0);
        assert!(view.rows.is_empty());
        assert_eq!(view.placeholder, Some(NO_RECORDS));
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let history = vec![record("first", Some(1.0)), record("second", None)];
        let view = BenchmarkHistoryView::project(&history);

        assert_eq!(view.count, 2);
        assert!(view.placeholder.is_none());
        assert_eq!(view.rows[0].timestamp, "second");
        assert_eq!(view.rows[0].throughput, "N/A");
        assert_eq!(view.rows[1].throughput, "1.00");
    }

    #[test]
    fn test_benchmark_result_formatting() {
        let failed = BenchmarkRecord {
            error: Some("timeout".to_string()),
            ..Default::default()
        };
        assert_eq!(
            BenchmarkResultView::project(&failed),
            BenchmarkResultView::Failed {
                message: "Failed: timeout".to_string()
            }
        );

        let ok = BenchmarkRecord {
            throughput: Some(12.345),
            p99_latency: Some(250.0),
            ..Default::default()
        };
        match BenchmarkResultView::project(&ok) {
            BenchmarkResultView::Metrics {
                throughput,
                avg_latency,
                p99_latency,
                ..
            } => {
                assert_eq!(throughput, "12.35");
                assert_eq!(avg_latency, "N/A");
                assert_eq!(p99_latency, "250.00");
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_npu_grid_fills_missing_devices() {
        let devices = vec![NpuDevice {
            id: 1,
            occupied: true,
            container: Some("box".to_string()),
            ..Default::default()
        }];
        let view = NpuGridView::project(&devices, &NpuSelection::single(0), 4);

        assert_eq!(view.cells.len(), 4);
        assert_eq!(view.occupied, 1);
        assert!(view.cells[0].selected);
        assert_eq!(view.cells[1].container.as_deref(), Some("box"));
    }

    #[test]
    fn test_service_list_placeholder() {
        let view = ServiceListView::project(&[]);
        assert_eq!(view.count, 0);
        assert_eq!(view.placeholder, Some(NO_SERVICES));
    }

    #[test]
    fn test_container_list_counts() {
        let containers = vec![
            Container {
                id: "1".to_string(),
                name: "a".to_string(),
                image: "img".to_string(),
                status: "Up".to_string(),
                running: true,
                created: String::new(),
            },
            Container {
                id: "2".to_string(),
                name: "b".to_string(),
                image: "img".to_string(),
                status: "Exited".to_string(),
                running: false,
                created: String::new(),
            },
        ];
        let view = ContainerListView::project(&containers, "", true);
        assert_eq!(view.shown, 1);
        assert_eq!(view.total, 2);
        assert_eq!(view.rows[0].name, "a");
    }
}
