//! Benchmark run configuration and presets

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkKind {
    #[default]
    Evalscope,
    VllmBench,
}

impl BenchmarkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkKind::Evalscope => "evalscope",
            BenchmarkKind::VllmBench => "vllm_bench",
        }
    }
}

/// Body of `POST /api/benchmark/run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub benchmark_type: BenchmarkKind,
    pub url: String,
    pub model_name: String,
    // evalscope
    pub parallel: u32,
    pub number: u32,
    pub dataset: String,
    pub temperature: f32,
    // vllm bench
    pub request_rate: f32,
    pub max_concurrency: u32,
    pub num_prompts: u32,
    pub random_input_len: u32,
    pub random_output_len: u32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            benchmark_type: BenchmarkKind::Evalscope,
            url: "http://localhost:8000/v1/chat/completions".to_string(),
            model_name: "default-model".to_string(),
            parallel: 1,
            number: 10,
            dataset: "openqa".to_string(),
            temperature: 0.0,
            request_rate: 1.0,
            max_concurrency: 1,
            num_prompts: 5,
            random_input_len: 1024,
            random_output_len: 1024,
        }
    }
}

/// A named preset that rewrites part of the benchmark form
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: BenchmarkKind,
    pub parallel: Option<u32>,
    pub number: Option<u32>,
    pub request_rate: Option<f32>,
    pub max_concurrency: Option<u32>,
    pub input_len: Option<u32>,
    pub output_len: Option<u32>,
}

impl BenchmarkTemplate {
    const fn evalscope(name: &'static str, description: &'static str, parallel: u32, number: u32) -> Self {
        Self {
            name,
            description,
            kind: BenchmarkKind::Evalscope,
            parallel: Some(parallel),
            number: Some(number),
            request_rate: None,
            max_concurrency: None,
            input_len: None,
            output_len: None,
        }
    }

    const fn vllm_bench(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: BenchmarkKind::VllmBench,
            parallel: None,
            number: None,
            request_rate: None,
            max_concurrency: None,
            input_len: None,
            output_len: None,
        }
    }

    /// Overwrite only the fields this template defines
    pub fn apply(&self, config: &mut BenchmarkConfig) {
        config.benchmark_type = self.kind;
        match self.kind {
            BenchmarkKind::Evalscope => {
                if let Some(parallel) = self.parallel {
                    config.parallel = parallel;
                }
                if let Some(number) = self.number {
                    config.number = number;
                }
            }
            BenchmarkKind::VllmBench => {
                if let Some(rate) = self.request_rate {
                    config.request_rate = rate;
                }
                if let Some(concurrency) = self.max_concurrency {
                    config.max_concurrency = concurrency;
                }
                if let Some(len) = self.input_len {
                    config.random_input_len = len;
                }
                if let Some(len) = self.output_len {
                    config.random_output_len = len;
                }
            }
        }
    }
}

/// Built-in presets
pub fn templates() -> Vec<BenchmarkTemplate> {
    vec![
        BenchmarkTemplate::evalscope("Quick Test", "Fast validation", 1, 5),
        BenchmarkTemplate::evalscope("Standard Test", "Standard benchmark", 4, 50),
        BenchmarkTemplate::evalscope("Stress Test", "High concurrency", 16, 100),
        BenchmarkTemplate {
            input_len: Some(4096),
            output_len: Some(2048),
            ..BenchmarkTemplate::vllm_bench("Long Text", "Long context test")
        },
        BenchmarkTemplate {
            request_rate: Some(100.0),
            max_concurrency: Some(64),
            ..BenchmarkTemplate::vllm_bench("Throughput", "Max throughput")
        },
    ]
}

/// Case-insensitive lookup by template name
pub fn find_template(name: &str) -> Option<BenchmarkTemplate> {
    templates()
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
}
