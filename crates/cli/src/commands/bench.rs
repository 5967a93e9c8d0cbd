//! Benchmark commands

use anyhow::Result;
use colored::Colorize;
use playground_lib::benchmark::templates as benchmark_templates;
use playground_lib::view::{BenchmarkHistoryView, BenchmarkResultView};
use playground_lib::{CollectionKind, Mutation};
use serde::Serialize;
use tabled::Tabled;

use super::Session;
use crate::output::{color_status, print_json, print_table, OutputFormat};
use crate::BenchArgs;

#[derive(Tabled)]
struct HistoryTableRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Type")]
    benchmark_type: String,
    #[tabled(rename = "Throughput")]
    throughput: String,
    #[tabled(rename = "Avg Latency")]
    avg_latency: String,
    #[tabled(rename = "P99 Latency")]
    p99_latency: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled, Serialize)]
struct TemplateRow {
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Description")]
    description: &'static str,
}

/// `vap bench run`: template first, then explicit flags
pub async fn run(session: &Session, args: BenchArgs) -> Result<bool> {
    let controller = &session.controller;

    if let Some(name) = &args.template {
        if !controller.apply_template(name).await {
            session.flush();
            return Ok(false);
        }
    }

    controller
        .edit_benchmark_form(|form| {
            if let Some(kind) = args.kind {
                form.benchmark_type = kind.into();
            }
            if let Some(url) = args.url {
                form.url = url;
            }
            if let Some(model_name) = args.model_name {
                form.model_name = model_name;
            }
            if let Some(v) = args.parallel {
                form.parallel = v;
            }
            if let Some(v) = args.number {
                form.number = v;
            }
            if let Some(v) = args.dataset {
                form.dataset = v;
            }
            if let Some(v) = args.temperature {
                form.temperature = v;
            }
            if let Some(v) = args.request_rate {
                form.request_rate = v;
            }
            if let Some(v) = args.max_concurrency {
                form.max_concurrency = v;
            }
            if let Some(v) = args.num_prompts {
                form.num_prompts = v;
            }
            if let Some(v) = args.input_len {
                form.random_input_len = v;
            }
            if let Some(v) = args.output_len {
                form.random_output_len = v;
            }
        })
        .await;

    let form = controller.benchmark_form().await;
    if session.format == OutputFormat::Table {
        println!(
            "{}",
            format!(
                "Running {} against {} ({})",
                form.benchmark_type.as_str(),
                form.url,
                form.model_name
            )
            .dimmed()
        );
    }

    let ok = session.submit(Mutation::RunBenchmark).await;

    if let Some(record) = controller.last_benchmark().await {
        let view = BenchmarkResultView::project(&record);
        match session.format {
            OutputFormat::Json => print_json(&view)?,
            OutputFormat::Table => print_result(&view),
        }
    }

    Ok(ok)
}

fn print_result(view: &BenchmarkResultView) {
    match view {
        BenchmarkResultView::Failed { message } => println!("{}", message.red()),
        BenchmarkResultView::Metrics {
            throughput,
            avg_latency,
            p95_latency,
            p99_latency,
            raw_output,
        } => {
            println!("{}", "Benchmark Result".bold());
            println!("{}", "=".repeat(50));
            println!("Throughput:             {}", throughput.green());
            println!("Avg latency:            {}", avg_latency);
            println!("P95 latency:            {}", p95_latency);
            println!("P99 latency:            {}", p99_latency);
            if let Some(output) = raw_output {
                println!();
                println!("{}", output.dimmed());
            }
        }
    }
}

/// `vap bench history`
pub async fn history(session: &Session) -> Result<bool> {
    if !session.load(CollectionKind::BenchmarkHistory).await {
        return Ok(false);
    }

    let view = BenchmarkHistoryView::project(&session.controller.benchmark_history().await);
    match session.format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            let placeholder = view.placeholder.unwrap_or_default();
            let rows = view
                .rows
                .into_iter()
                .map(|row| HistoryTableRow {
                    timestamp: row.timestamp,
                    benchmark_type: row.benchmark_type,
                    throughput: row.throughput,
                    avg_latency: row.avg_latency,
                    p99_latency: row.p99_latency,
                    status: color_status(&row.status),
                })
                .collect();
            print_table(rows, placeholder);
        }
    }

    Ok(true)
}

/// `vap bench templates`
pub fn templates(session: &Session) -> Result<bool> {
    let rows: Vec<TemplateRow> = benchmark_templates()
        .into_iter()
        .map(|t| TemplateRow {
            name: t.name,
            kind: t.kind.as_str(),
            description: t.description,
        })
        .collect();

    match session.format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => print_table(rows, "No templates"),
    }
    Ok(true)
}
