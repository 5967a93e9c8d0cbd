//! Container and image commands

use anyhow::Result;
use colored::Colorize;
use playground_lib::view::ContainerListView;
use playground_lib::{CollectionKind, Mutation};
use tabled::Tabled;

use super::Session;
use crate::output::{color_flag, color_status, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct ImageTableRow {
    #[tabled(rename = "Image")]
    reference: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Created")]
    created: String,
}

#[derive(Tabled)]
struct ContainerTableRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Running")]
    running: String,
}

/// `vap containers list`
pub async fn list(session: &Session, filter: &str, running_only: bool) -> Result<bool> {
    if !session.load(CollectionKind::Containers).await {
        return Ok(false);
    }

    let containers = session.controller.containers().await;
    let view = ContainerListView::project(&containers, filter, running_only);

    match session.format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            let placeholder = view.placeholder.unwrap_or_default();
            let rows = view
                .rows
                .into_iter()
                .map(|row| ContainerTableRow {
                    name: row.name,
                    image: row.image,
                    status: color_status(&row.status),
                    running: color_flag(row.running),
                })
                .collect();
            print_table(rows, placeholder);
            if view.shown != view.total {
                println!(
                    "{}",
                    format!("Showing {} of {} containers", view.shown, view.total).dimmed()
                );
            }
        }
    }

    Ok(true)
}

pub async fn start(session: &Session, name: String) -> Result<bool> {
    Ok(session.submit(Mutation::StartContainer { name }).await)
}

pub async fn stop(session: &Session, name: String) -> Result<bool> {
    Ok(session.submit(Mutation::StopContainer { name }).await)
}

pub async fn delete(session: &Session, name: String) -> Result<bool> {
    Ok(session.submit(Mutation::DeleteContainer { name }).await)
}

/// `vap containers create`: flags fill the create form, unset ones keep its defaults
pub async fn create(
    session: &Session,
    name: String,
    image: Option<String>,
    shm_size: Option<String>,
    devices: Vec<u32>,
) -> Result<bool> {
    let controller = &session.controller;
    controller.open_create_form().await;
    controller
        .edit_create_form(|form| {
            form.name = name;
            if let Some(image) = image {
                form.image = image;
            }
            if let Some(shm_size) = shm_size {
                form.shm_size = shm_size;
            }
            if !devices.is_empty() {
                form.devices = devices.into_iter().collect();
            }
        })
        .await;

    let request = controller.create_form().await.to_request();
    if session.format == OutputFormat::Table {
        println!(
            "Creating {} from {} with NPUs [{}]",
            request.container_name.cyan(),
            request.image,
            request
                .npu_devices
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(session.submit(Mutation::CreateContainer(request)).await)
}

/// `vap images pull`
pub async fn pull(session: &Session, image: String) -> Result<bool> {
    if session.format == OutputFormat::Table && !image.trim().is_empty() {
        println!("{}", format!("Pulling {}, this can take a while", image).dimmed());
    }
    Ok(session.submit(Mutation::PullImage { image }).await)
}

/// `vap images list`
pub async fn images(session: &Session) -> Result<bool> {
    let images = session.controller.list_images().await;
    session.flush();
    let Some(images) = images else {
        return Ok(false);
    };

    match session.format {
        OutputFormat::Json => print_json(&images)?,
        OutputFormat::Table => {
            let rows = images
                .iter()
                .map(|image| ImageTableRow {
                    reference: image.reference(),
                    id: image.id.chars().take(12).collect(),
                    size: image.size.clone(),
                    created: image.created.clone(),
                })
                .collect();
            print_table(rows, "No images found");
        }
    }

    Ok(true)
}
