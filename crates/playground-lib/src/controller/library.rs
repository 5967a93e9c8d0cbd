//! Host image listing and serving presets

use super::{Controller, ViewEvent};
use crate::models::{ImageInfo, Preset};
use crate::serving::ServingForm;

impl Controller {
    /// Images present on the host; `None` after an error notification
    pub async fn list_images(&self) -> Option<Vec<ImageInfo>> {
        match self.api.images().await {
            Ok(images) => Some(images),
            Err(e) => {
                self.notifications
                    .error(format!("Failed to load images: {}", e));
                None
            }
        }
    }

    pub async fn presets(&self) -> Option<Vec<Preset>> {
        match self.api.presets().await {
            Ok(presets) => Some(presets),
            Err(e) => {
                self.notifications
                    .error(format!("Failed to load presets: {}", e));
                None
            }
        }
    }

    /// Store the current serving form under `name`
    ///
    /// The target container is not part of a preset.
    pub async fn save_preset(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            self.notifications.warning("Preset name is required");
            return false;
        }

        let form = self.serving_form.read().await.clone();
        let config = match serde_json::to_value(&form) {
            Ok(config) => config,
            Err(e) => {
                self.notifications
                    .error(format!("Failed to save preset: {}", e));
                return false;
            }
        };

        match self.api.save_preset(name, &config).await {
            Ok(ack) if ack.success => {
                self.notifications.success(format!("Preset saved: {}", name));
                true
            }
            Ok(ack) => {
                let reason = ack.message.unwrap_or_else(|| "rejected".to_string());
                self.notifications
                    .error(format!("Failed to save preset: {}", reason));
                false
            }
            Err(e) => {
                self.notifications
                    .error(format!("Failed to save preset: {}", e));
                false
            }
        }
    }

    /// Load a stored preset into the serving form, keeping the chosen container
    pub async fn apply_preset(&self, name: &str) -> bool {
        let Some(presets) = self.presets().await else {
            return false;
        };
        let Some(preset) = presets.into_iter().find(|p| p.name == name) else {
            self.notifications
                .warning(format!("Preset not found: {}", name));
            return false;
        };

        let form: ServingForm = match serde_json::from_value(preset.config) {
            Ok(form) => form,
            Err(e) => {
                self.notifications
                    .error(format!("Invalid preset {}: {}", name, e));
                return false;
            }
        };

        {
            let mut current = self.serving_form.write().await;
            let container = current.container.take();
            *current = ServingForm { container, ..form };
        }
        self.emit(ViewEvent::CommandPreview(self.command_preview().await));
        self.notifications.info(format!("Preset applied: {}", name));
        true
    }
}
