//! Log viewer

use anyhow::Result;
use playground_lib::LogSource;

use super::Session;
use crate::output::{print_json, OutputFormat};

/// `vap logs <source>`
pub async fn show(session: &Session, source: LogSource, lines: Option<u32>) -> Result<bool> {
    let logs = session.controller.fetch_logs(&source, lines).await;
    session.flush();

    let Some(text) = logs else {
        return Ok(false);
    };
    match session.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "logs": text }))?,
        OutputFormat::Table => println!("{}", text),
    }
    Ok(true)
}
