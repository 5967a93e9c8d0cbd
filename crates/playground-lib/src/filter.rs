//! Pure projections of cached collections through user filters
//!
//! Every function borrows the cache and returns a freshly derived list;
//! nothing here keeps incremental state.

use crate::models::{Container, ModelDescriptor};

fn matches(field: &str, needle: &str) -> bool {
    field.to_lowercase().contains(needle)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Case-insensitive substring match on name, image or id, then the running flag
pub fn filter_containers<'a>(
    containers: &'a [Container],
    text: &str,
    running_only: bool,
) -> Vec<&'a Container> {
    let needle = normalize(text);
    containers
        .iter()
        .filter(|c| {
            needle.is_empty()
                || matches(&c.name, &needle)
                || matches(&c.image, &needle)
                || matches(&c.id, &needle)
        })
        .filter(|c| !running_only || c.running)
        .collect()
}

/// Case-insensitive substring match on name, path or id
pub fn filter_models<'a>(models: &'a [ModelDescriptor], text: &str) -> Vec<&'a ModelDescriptor> {
    let needle = normalize(text);
    models
        .iter()
        .filter(|m| {
            needle.is_empty()
                || matches(&m.name, &needle)
                || m.path.as_deref().map(|p| matches(p, &needle)).unwrap_or(false)
                || m.id.as_deref().map(|i| matches(i, &needle)).unwrap_or(false)
        })
        .collect()
}

/// Names offered by container pickers (launch form, log source)
pub fn running_container_names(containers: &[Container]) -> Vec<String> {
    containers
        .iter()
        .filter(|c| c.running)
        .map(|c| c.name.clone())
        .collect()
}
