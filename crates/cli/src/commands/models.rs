//! Model catalog commands

use anyhow::Result;
use playground_lib::view::ModelListView;
use playground_lib::{CollectionKind, DownloadRequest, DownloadSource, ModelSource, Mutation};
use tabled::Tabled;

use super::Session;
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct ModelTableRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path / ID")]
    reference: String,
    #[tabled(rename = "Size")]
    size: String,
}

/// `vap models list`
pub async fn list(session: &Session, source: ModelSource, filter: &str) -> Result<bool> {
    // The popular catalog is static and needs no backend call.
    if source != ModelSource::Popular && !session.load(CollectionKind::Models).await {
        return Ok(false);
    }

    let models = session.controller.models_view(source, filter).await;
    let view = ModelListView::project(&models);

    match session.format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            let placeholder = view.placeholder.unwrap_or_default();
            let rows = view
                .rows
                .into_iter()
                .map(|row| ModelTableRow {
                    name: row.name,
                    reference: row.reference,
                    size: row.size,
                })
                .collect();
            print_table(rows, placeholder);
        }
    }

    Ok(true)
}

/// `vap models download`
pub async fn download(
    session: &Session,
    model_id: String,
    source: DownloadSource,
    cache_dir: Option<String>,
) -> Result<bool> {
    let request = DownloadRequest {
        model_id,
        source,
        cache_dir: cache_dir.filter(|d| !d.trim().is_empty()),
    };
    Ok(session.submit(Mutation::DownloadModel(request)).await)
}
