// crates/mobile-core-cli/src/main.rs
// ============================================================================
// Module: Mobile Core CLI Entry Point
// Description: Command dispatcher for the mobile app control plane.
// Purpose: Start the server, check configuration, and repair key drift.
// Dependencies: clap, mobile-core-api, mobile-core-config, thiserror, tokio
// ============================================================================

//! ## Overview
//! `mobile-core serve` loads configuration and runs the HTTP server.
//! `mobile-core config check` validates a configuration file and
//! `mobile-core config example` prints a canonical one.
//! `mobile-core reconcile` runs one registry reconciliation pass against the
//! configured store and prints the report as JSON.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use mobile_core::ReconcileReport;
use mobile_core_api::MobileCoreServer;
use mobile_core_api::build_lifecycle;
use mobile_core_config::MobileCoreConfig;
use mobile_core_config::StoreType;
use mobile_core_config::config_toml_example;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "mobile-core", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Register missing API keys and prune orphaned registry entries.
    Reconcile(ConfigArgs),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Check(ConfigArgs),
    /// Print an example configuration file.
    Example,
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to `mobile-core.toml` (defaults to `MOBILE_CORE_CONFIG`, then
    /// `./mobile-core.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Check(args) => command_config_check(&args),
            ConfigCommand::Example => command_config_example(),
        },
        Commands::Reconcile(args) => command_reconcile(args).await,
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(&args)?;
    let server = tokio::task::spawn_blocking(move || MobileCoreServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config check` command.
fn command_config_check(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let store = match config.store.store_type {
        StoreType::Memory => "memory",
        StoreType::Sqlite => "sqlite",
    };
    write_stdout_line(&format!(
        "config ok: bind {}, store {store}, namespace {}",
        config.server.bind, config.cluster.namespace
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config example` command.
fn command_config_example() -> CliResult<ExitCode> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(config_toml_example().as_bytes())
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `reconcile` command.
async fn command_reconcile(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(&args)?;
    let report: ReconcileReport = tokio::task::spawn_blocking(move || {
        let lifecycle =
            build_lifecycle(&config).map_err(|err| CliError::new(err.to_string()))?;
        lifecycle.reconcile().map_err(|err| CliError::new(format!("reconcile failed: {err}")))
    })
    .await
    .map_err(|err| CliError::new(format!("reconcile join failed: {err}")))??;
    let payload = serde_json::to_string(&report)
        .map_err(|err| CliError::new(format!("failed to encode report: {err}")))?;
    write_stdout_line(&payload)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration from `--config` or the default locations.
fn load_config(args: &ConfigArgs) -> CliResult<MobileCoreConfig> {
    MobileCoreConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "mobile-core: {message}");
    ExitCode::FAILURE
}
