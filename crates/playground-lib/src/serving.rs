//! Serving launch form and command preview
//!
//! The preview mirrors the command the backend builds from the same
//! config, so the operator sees what will run before submitting it.

use crate::error::ApiError;
use crate::selection::NpuSelection;
use serde::{Deserialize, Serialize};

/// Model source for a serving launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Local,
    Modelscope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSourceSpec {
    pub source_type: SourceType,
    pub model_id: Option<String>,
    pub local_path: Option<String>,
}

/// Body of `POST /api/vllm/start`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingConfig {
    pub model_source: ModelSourceSpec,
    pub served_model_name: String,
    pub host: String,
    pub port: u16,
    pub tensor_parallel_size: u32,
    pub max_model_len: Option<u32>,
    pub dtype: String,
    pub trust_remote_code: bool,
    pub npu_devices: Vec<u32>,
    pub additional_args: Option<String>,
}

/// Editable launch form state
///
/// Serializes without the target container, which is how presets store it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingForm {
    #[serde(skip)]
    pub container: Option<String>,
    pub source_type: SourceType,
    pub local_path: String,
    pub model_id: String,
    pub served_model_name: String,
    pub port: u16,
    pub tensor_parallel_size: u32,
    pub max_model_len: Option<u32>,
    pub dtype: String,
    pub trust_remote_code: bool,
    pub additional_args: String,
}

impl Default for ServingForm {
    fn default() -> Self {
        Self {
            container: None,
            source_type: SourceType::Local,
            local_path: String::new(),
            model_id: String::new(),
            served_model_name: "default-model".to_string(),
            port: 8000,
            tensor_parallel_size: 1,
            max_model_len: None,
            dtype: "auto".to_string(),
            trust_remote_code: true,
            additional_args: String::new(),
        }
    }
}

impl ServingForm {
    /// Path or id for the active source type
    pub fn model_path(&self) -> &str {
        match self.source_type {
            SourceType::Local => self.local_path.trim(),
            SourceType::Modelscope => self.model_id.trim(),
        }
    }

    /// Fill the form from a model card
    pub fn use_model(&mut self, reference: &str, source_type: SourceType) {
        self.source_type = source_type;
        match source_type {
            SourceType::Local => self.local_path = reference.to_string(),
            SourceType::Modelscope => self.model_id = reference.to_string(),
        }
    }

    fn served_name(&self) -> &str {
        let name = self.served_model_name.trim();
        if name.is_empty() {
            "default-model"
        } else {
            name
        }
    }

    fn extra_args(&self) -> Option<&str> {
        let args = self.additional_args.trim();
        (!args.is_empty()).then_some(args)
    }

    /// Validate and build the request body; returns the target container too
    pub fn to_config(&self, selection: &NpuSelection) -> Result<(String, ServingConfig), ApiError> {
        let container = self
            .container
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::Validation("Select a container first".to_string()))?;

        let model_path = self.model_path();
        if model_path.is_empty() {
            return Err(ApiError::Validation("Select or enter a model".to_string()));
        }

        let (model_id, local_path) = match self.source_type {
            SourceType::Modelscope => (Some(model_path.to_string()), None),
            SourceType::Local => (None, Some(model_path.to_string())),
        };

        let config = ServingConfig {
            model_source: ModelSourceSpec {
                source_type: self.source_type,
                model_id,
                local_path,
            },
            served_model_name: self.served_name().to_string(),
            host: "0.0.0.0".to_string(),
            port: self.port,
            tensor_parallel_size: self.tensor_parallel_size,
            max_model_len: self.max_model_len,
            dtype: self.dtype.clone(),
            trust_remote_code: self.trust_remote_code,
            npu_devices: selection.to_vec(),
            additional_args: self.extra_args().map(str::to_string),
        };

        Ok((container.to_string(), config))
    }
}

/// Render the shell command the launch would run
pub fn command_preview(form: &ServingForm, selection: &NpuSelection) -> String {
    let mut segments = Vec::new();

    if !selection.is_empty() {
        segments.push(format!(
            "export ASCEND_RT_VISIBLE_DEVICES={}",
            selection.join(",")
        ));
    }
    if form.source_type == SourceType::Modelscope {
        segments.push("export VLLM_USE_MODELSCOPE=\"True\"".to_string());
    }

    let model = match form.model_path() {
        "" => "<model_path>",
        path => path,
    };

    let mut flags = vec![
        format!("--served-model-name {}", form.served_name()),
        "--host 0.0.0.0".to_string(),
        format!("--port {}", form.port),
        format!("--tensor-parallel-size {}", form.tensor_parallel_size),
    ];
    if let Some(len) = form.max_model_len {
        flags.push(format!("--max-model-len {}", len));
    }
    if form.trust_remote_code {
        flags.push("--trust-remote-code".to_string());
    }
    let dtype = form.dtype.trim();
    if !dtype.is_empty() && dtype != "auto" {
        flags.push(format!("--dtype {}", dtype));
    }
    if let Some(args) = form.extra_args() {
        flags.push(args.to_string());
    }

    let mut serve = format!("vllm serve {}", model);
    for flag in flags {
        serve.push_str(" \\\n  ");
        serve.push_str(&flag);
    }
    segments.push(serve);

    segments.join("\n\n")
}
