//! vLLM Ascend Playground CLI
//!
//! A command-line front end for the playground backend: manage containers
//! and models, launch and stop vLLM services, run benchmarks, chat with a
//! served model and read logs.

mod commands;
mod config;
mod output;
mod prompt;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{bench, chat, containers, logs, models, prefs, serve, status, Session};
use output::OutputFormat;
use playground_lib::benchmark::BenchmarkKind;
use playground_lib::{
    AlwaysConfirm, Confirmer, Controller, ControllerConfig, DownloadSource, HttpApiBuilder,
    ModelSource,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// vLLM Ascend Playground CLI
#[derive(Parser)]
#[command(name = "vap")]
#[command(author, version, about = "CLI for the vLLM Ascend Playground", long_about = None)]
pub struct Cli {
    /// Playground backend URL (can also be set via VAP_API_URL env var)
    #[arg(long, env = "VAP_API_URL")]
    pub api_url: Option<String>,

    /// Controller settings file (TOML, YAML or JSON)
    #[arg(long, env = "VAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Answer yes to every confirmation prompt
    #[arg(long, short)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show backend status and NPU occupancy
    Status,

    /// Poll status until interrupted
    Watch {
        /// Poll interval in seconds (defaults to the configured interval)
        #[arg(long, short)]
        interval: Option<u64>,

        /// Print Prometheus metrics on exit
        #[arg(long)]
        metrics: bool,
    },

    /// Manage containers
    #[command(subcommand)]
    Containers(ContainersCommands),

    /// Manage container images
    #[command(subcommand)]
    Images(ImagesCommands),

    /// Browse and download models
    #[command(subcommand)]
    Models(ModelsCommands),

    /// Launch and stop vLLM services
    #[command(subcommand)]
    Serve(ServeCommands),

    /// Run benchmarks and view history
    #[command(subcommand)]
    Bench(BenchCommands),

    /// Interactive chat with a served model
    Chat(ChatArgs),

    /// Read playground, system or container logs
    #[command(subcommand)]
    Logs(LogsCommands),

    /// Show or edit CLI preferences
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ContainersCommands {
    /// List containers
    List {
        /// Case-insensitive filter on name, image or id
        #[arg(long)]
        filter: Option<String>,

        /// Show only running containers
        #[arg(long)]
        running_only: bool,
    },

    /// Start a container
    Start {
        /// Container name
        name: String,
    },

    /// Stop a container
    Stop {
        /// Container name
        name: String,
    },

    /// Delete a container
    Delete {
        /// Container name
        name: String,
    },

    /// Create a container with NPU devices attached
    Create {
        /// Container name
        #[arg(long)]
        name: String,

        /// Image to run
        #[arg(long)]
        image: Option<String>,

        /// Shared memory size
        #[arg(long)]
        shm_size: Option<String>,

        /// Comma-separated NPU devices (defaults to the configured checklist)
        #[arg(long, value_delimiter = ',')]
        devices: Vec<u32>,
    },
}

#[derive(Subcommand)]
pub enum ImagesCommands {
    /// List images present on the host
    List,

    /// Pull an image
    Pull {
        /// Image reference, e.g. quay.io/ascend/vllm-ascend:v0.13.0rc1
        image: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModelSourceArg {
    Local,
    Modelscope,
    Popular,
}

impl From<ModelSourceArg> for ModelSource {
    fn from(value: ModelSourceArg) -> Self {
        match value {
            ModelSourceArg::Local => ModelSource::Local,
            ModelSourceArg::Modelscope => ModelSource::Modelscope,
            ModelSourceArg::Popular => ModelSource::Popular,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DownloadSourceArg {
    Modelscope,
    Huggingface,
}

impl From<DownloadSourceArg> for DownloadSource {
    fn from(value: DownloadSourceArg) -> Self {
        match value {
            DownloadSourceArg::Modelscope => DownloadSource::Modelscope,
            DownloadSourceArg::Huggingface => DownloadSource::Huggingface,
        }
    }
}

#[derive(Subcommand)]
pub enum ModelsCommands {
    /// List models from one source
    List {
        #[arg(long, value_enum, default_value = "local")]
        source: ModelSourceArg,

        /// Case-insensitive filter on name, path or id
        #[arg(long)]
        filter: Option<String>,
    },

    /// Download a model into the model cache
    Download {
        /// Model id, e.g. Qwen/Qwen3-0.6B
        id: String,

        #[arg(long, value_enum, default_value = "modelscope")]
        source: DownloadSourceArg,

        /// Target cache directory on the host
        #[arg(long)]
        cache_dir: Option<String>,
    },
}

/// Serving launch parameters
#[derive(Args)]
pub struct ServeArgs {
    /// Target container (defaults to the only running one)
    #[arg(long, short)]
    pub container: Option<String>,

    /// Model directory inside the container
    #[arg(long, conflicts_with = "model_id")]
    pub local_path: Option<String>,

    /// ModelScope model id
    #[arg(long)]
    pub model_id: Option<String>,

    /// Comma-separated NPU devices
    #[arg(long, value_delimiter = ',')]
    pub devices: Vec<u32>,

    #[arg(long, default_value = "default-model")]
    pub served_model_name: String,

    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    #[arg(long, default_value_t = 1)]
    pub tensor_parallel_size: u32,

    #[arg(long)]
    pub max_model_len: Option<u32>,

    #[arg(long, default_value = "auto")]
    pub dtype: String,

    /// Do not pass --trust-remote-code
    #[arg(long)]
    pub no_trust_remote_code: bool,

    /// Extra arguments appended to vllm serve
    #[arg(long, allow_hyphen_values = true)]
    pub extra_args: Option<String>,
}

#[derive(Subcommand)]
pub enum ServeCommands {
    /// Start a vLLM service
    Start(ServeArgs),

    /// Print the command a launch would run
    Preview(ServeArgs),

    /// List running services
    List,

    /// Stop every running service
    StopAll,

    /// Stop one service by container and pid
    Kill {
        container: String,
        pid: String,
    },

    /// List stored launch presets
    Presets,

    /// Store the launch parameters under a name
    SavePreset {
        name: String,

        #[command(flatten)]
        args: ServeArgs,
    },

    /// Load a preset and start it
    ApplyPreset {
        name: String,

        /// Target container (defaults to the only running one)
        #[arg(long, short)]
        container: Option<String>,

        /// Comma-separated NPU devices
        #[arg(long, value_delimiter = ',')]
        devices: Vec<u32>,

        /// Print the resulting command without starting it
        #[arg(long)]
        preview: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum BenchTypeArg {
    Evalscope,
    #[value(name = "vllm_bench")]
    VllmBench,
}

impl From<BenchTypeArg> for BenchmarkKind {
    fn from(value: BenchTypeArg) -> Self {
        match value {
            BenchTypeArg::Evalscope => BenchmarkKind::Evalscope,
            BenchTypeArg::VllmBench => BenchmarkKind::VllmBench,
        }
    }
}

/// Benchmark parameters; flags override the chosen template
#[derive(Args)]
pub struct BenchArgs {
    /// Preset to start from (see `vap bench templates`)
    #[arg(long)]
    pub template: Option<String>,

    #[arg(long = "type", value_enum)]
    pub kind: Option<BenchTypeArg>,

    /// Chat completions endpoint under test
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub model_name: Option<String>,

    #[arg(long)]
    pub parallel: Option<u32>,

    #[arg(long)]
    pub number: Option<u32>,

    #[arg(long)]
    pub dataset: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub request_rate: Option<f32>,

    #[arg(long)]
    pub max_concurrency: Option<u32>,

    #[arg(long)]
    pub num_prompts: Option<u32>,

    #[arg(long)]
    pub input_len: Option<u32>,

    #[arg(long)]
    pub output_len: Option<u32>,
}

#[derive(Subcommand)]
pub enum BenchCommands {
    /// Run a benchmark
    Run(BenchArgs),

    /// Show past runs, most recent first
    History,

    /// List benchmark presets
    Templates,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Base URL of the OpenAI-compatible server
    #[arg(long)]
    pub url: Option<String>,

    /// Model name (use /models in the prompt to discover it)
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,
}

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Playground backend log
    Playground {
        #[arg(long, short = 'n')]
        lines: Option<u32>,
    },

    /// Host system log
    System {
        #[arg(long, short = 'n')]
        lines: Option<u32>,
    },

    /// Log of one container
    Container {
        name: String,

        #[arg(long, short = 'n')]
        lines: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the stored preferences and effective controller settings
    Show,

    /// Set one preference (empty value clears it)
    Set { key: String, value: String },
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Execute the parsed command; `Ok(false)` means the operation ran but failed
async fn run(cli: Cli) -> Result<bool> {
    let preferences = config::Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable preferences file");
        config::Config::default()
    });
    let format = cli
        .format
        .unwrap_or_else(|| OutputFormat::from_preference(preferences.default_format.as_deref()));

    let mut settings = ControllerConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url.clone().or_else(|| preferences.api_url.clone()) {
        settings.api_url = url;
    }

    if let Commands::Config(cmd) = &cli.command {
        return match cmd {
            ConfigCommands::Show => prefs::show(&preferences, &settings, format),
            ConfigCommands::Set { key, value } => prefs::set(preferences, key, value),
        };
    }

    let api = HttpApiBuilder::new()
        .base_url(settings.api_url.clone())
        .timeout(settings.request_timeout())
        .build()?;
    let confirmer: Arc<dyn Confirmer> = if cli.yes {
        Arc::new(AlwaysConfirm)
    } else {
        Arc::new(prompt::TerminalConfirm)
    };
    let controller = Arc::new(Controller::new(Arc::new(api), confirmer, settings));
    controller
        .logger()
        .log_session_start(env!("CARGO_PKG_VERSION"));

    let session = Session::new(controller, format);

    match cli.command {
        Commands::Status => status::show(&session).await,
        Commands::Watch { interval, metrics } => status::watch(&session, interval, metrics).await,
        Commands::Containers(cmd) => match cmd {
            ContainersCommands::List {
                filter,
                running_only,
            } => containers::list(&session, filter.as_deref().unwrap_or(""), running_only).await,
            ContainersCommands::Start { name } => containers::start(&session, name).await,
            ContainersCommands::Stop { name } => containers::stop(&session, name).await,
            ContainersCommands::Delete { name } => containers::delete(&session, name).await,
            ContainersCommands::Create {
                name,
                image,
                shm_size,
                devices,
            } => containers::create(&session, name, image, shm_size, devices).await,
        },
        Commands::Images(cmd) => match cmd {
            ImagesCommands::List => containers::images(&session).await,
            ImagesCommands::Pull { image } => containers::pull(&session, image).await,
        },
        Commands::Models(cmd) => match cmd {
            ModelsCommands::List { source, filter } => {
                models::list(&session, source.into(), filter.as_deref().unwrap_or("")).await
            }
            ModelsCommands::Download {
                id,
                source,
                cache_dir,
            } => models::download(&session, id, source.into(), cache_dir).await,
        },
        Commands::Serve(cmd) => match cmd {
            ServeCommands::Start(args) => serve::start(&session, args).await,
            ServeCommands::Preview(args) => serve::preview(&session, args).await,
            ServeCommands::List => serve::list(&session).await,
            ServeCommands::StopAll => serve::stop_all(&session).await,
            ServeCommands::Kill { container, pid } => serve::kill(&session, container, pid).await,
            ServeCommands::Presets => serve::presets(&session).await,
            ServeCommands::SavePreset { name, args } => {
                serve::save_preset(&session, name, args).await
            }
            ServeCommands::ApplyPreset {
                name,
                container,
                devices,
                preview,
            } => serve::apply_preset(&session, name, container, devices, preview).await,
        },
        Commands::Bench(cmd) => match cmd {
            BenchCommands::Run(args) => bench::run(&session, args).await,
            BenchCommands::History => bench::history(&session).await,
            BenchCommands::Templates => bench::templates(&session),
        },
        Commands::Chat(args) => chat::repl(&session, args, &preferences).await,
        Commands::Logs(cmd) => match cmd {
            LogsCommands::Playground { lines } => {
                logs::show(&session, playground_lib::LogSource::Playground, lines).await
            }
            LogsCommands::System { lines } => {
                logs::show(&session, playground_lib::LogSource::System, lines).await
            }
            LogsCommands::Container { name, lines } => {
                logs::show(&session, playground_lib::LogSource::Container(name), lines).await
            }
        },
        Commands::Config(_) => Ok(true),
    }
}
