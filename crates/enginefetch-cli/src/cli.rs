//! Argument parsing, dependency wiring, and the acquisition run.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use enginefetch_core::config::{
    DEFAULT_ANCESTORS, DEFAULT_HARNESS_DIR, DEFAULT_LATEST_PATH, DEFAULT_LOCAL_DIR,
    DEFAULT_PUBLIC_DIR, DEFAULT_STORE_URL, DEFAULT_TIMEOUT_SECS,
};
use enginefetch_core::{
    AcquireConfig, AcquireOutcome, Acquirer, ArtifactLayout, DEFAULT_HARNESS_SCRIPT_NAME,
    DEFAULT_MEMORY_IMAGE_NAME, DEFAULT_SCRIPT_NAME, DEFAULT_WASM_NAME, DestinationSet, HttpStore,
    SystemShell,
};
use enginefetch_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging, run_span};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::client::{CliError, CliResult, EXIT_LOGGING, parse_url, store_client};
use crate::output::render_outcome;

/// Parses CLI arguments, runs the acquisition, and prints the final report.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli.logging_config()) {
        eprintln!("error: {err:#}");
        return EXIT_LOGGING;
    }

    let run_id = Uuid::new_v4().to_string();
    let result = execute(&cli, &run_id).instrument(run_span(&run_id)).await;
    let result = result.and_then(|outcome| render_outcome(&outcome, &run_id, cli.output));

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    }
}

/// Build the acquirer from parsed arguments and run it once.
pub(crate) async fn execute(cli: &Cli, run_id: &str) -> CliResult<AcquireOutcome> {
    let config = cli.acquire_config()?;
    let client = store_client(cli.timeout, run_id)?;
    let shell = SystemShell::new(&config.repo_dir);
    let acquirer = Acquirer::new(config, shell, HttpStore::new(client));
    let already_cached = acquirer.destinations_hold_pair();
    tracing::debug!(already_cached, "checked destinations for a previous copy");
    acquirer
        .acquire(already_cached)
        .await
        .map_err(CliError::from_acquisition)
}

#[derive(Parser, Debug)]
#[command(
    name = "enginefetch",
    about = "Copy or download the prebuilt engine bundle into the public and test directories"
)]
pub(crate) struct Cli {
    #[arg(long, env = "ENGINEFETCH_LOCAL_DIR", default_value = DEFAULT_LOCAL_DIR)]
    local_dir: PathBuf,
    #[arg(long, env = "ENGINEFETCH_PUBLIC_DIR", default_value = DEFAULT_PUBLIC_DIR)]
    public_dir: PathBuf,
    #[arg(long, env = "ENGINEFETCH_HARNESS_DIR", default_value = DEFAULT_HARNESS_DIR)]
    harness_dir: PathBuf,
    #[arg(
        long,
        env = "ENGINEFETCH_REPO_DIR",
        default_value = ".",
        help = "Git working tree used to resolve commit candidates"
    )]
    repo_dir: PathBuf,
    #[arg(
        long,
        env = "ENGINEFETCH_STORE_URL",
        value_parser = parse_url,
        default_value = DEFAULT_STORE_URL
    )]
    store_url: Url,
    #[arg(long, env = "ENGINEFETCH_LATEST_PATH", default_value = DEFAULT_LATEST_PATH)]
    latest_path: String,
    #[arg(
        long,
        env = "ENGINEFETCH_ANCESTORS",
        default_value_t = DEFAULT_ANCESTORS,
        help = "Number of ancestor commits tried after HEAD"
    )]
    ancestors: u8,
    #[arg(
        long,
        env = "ENGINEFETCH_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,
    #[arg(long, default_value = DEFAULT_SCRIPT_NAME)]
    script_name: String,
    #[arg(long, default_value = DEFAULT_WASM_NAME)]
    wasm_name: String,
    #[arg(long, default_value = DEFAULT_MEMORY_IMAGE_NAME)]
    memory_image_name: String,
    #[arg(long, default_value = DEFAULT_HARNESS_SCRIPT_NAME)]
    harness_script_name: String,
    #[arg(
        long = "output",
        alias = "format",
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select the format of the final report"
    )]
    output: OutputFormat,
    #[arg(long, env = "ENGINEFETCH_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,
}

impl Cli {
    fn acquire_config(&self) -> CliResult<AcquireConfig> {
        let config = AcquireConfig {
            local_dir: self.local_dir.clone(),
            destinations: DestinationSet {
                public: self.public_dir.clone(),
                harness: self.harness_dir.clone(),
            },
            repo_dir: self.repo_dir.clone(),
            store_url: self.store_url.clone(),
            latest_path: self.latest_path.clone(),
            ancestors: self.ancestors,
            layout: ArtifactLayout {
                script: self.script_name.clone(),
                wasm: self.wasm_name.clone(),
                memory_image: self.memory_image_name.clone(),
                harness_script: self.harness_script_name.clone(),
            },
        };
        config
            .validate()
            .map_err(|err| CliError::from_config(&err))?;
        Ok(config)
    }

    fn logging_config(&self) -> LoggingConfig<'_> {
        LoggingConfig {
            level: &self.log_level,
            format: self.log_format.map_or_else(LogFormat::infer, LogFormat::from),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}
