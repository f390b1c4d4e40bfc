use std::{fs::File, io::stderr, iter, path::PathBuf};

use clap::{ArgAction, Parser};
use color_eyre::eyre::WrapErr;
use commands::{cache::CacheCommands, Commands};
use modfs_telemetry::TelemetryConfig;
use tracing::{debug, info, warn};

mod commands;
mod config;
pub mod output;

pub use self::config::Options;
use crate::config::{Config, KnownDirs};

#[derive(Parser)]
#[command(
    name = "modfs",
    version,
    about = "Overlay mod files onto a virtual filesystem",
    propagate_version = true,
    flatten_help = true
)]
struct Cli {
    #[clap(flatten)]
    config: Options,

    /// Only log errors.
    #[clap(short, long, action = ArgAction::SetTrue)]
    quiet: bool,

    /// Read options from this file after the standard search paths.
    #[clap(long)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    modfs_telemetry::install_error_handler();

    let cli = Cli::parse();

    let known_dirs = KnownDirs::default();
    let config_sources = known_dirs
        .config_dirs()
        .map(|dir| dir.join("modfs.toml"))
        .chain(cli.config_file.clone())
        .inspect(|path| debug!(?path, "searching for modfs.toml in"));

    let options = iter::once(Options::from_files(config_sources))
        .chain(iter::once(cli.config))
        .fold(Options::default(), |a, b| a.merge(b));

    let config = Config {
        known_dirs,
        options,
    };

    let mut telemetry_config = TelemetryConfig::default()
        .with_console_writer(stderr)
        .with_default_filter(if cli.quiet { "error" } else { "info" });

    let log_file = config.log_file().map(|path| {
        File::create(&path).wrap_err_with(|| format!("could not create log file {path:?}"))
    });

    let mut log_file_error = None;
    match log_file {
        Some(Ok(file)) => telemetry_config = telemetry_config.with_file_writer(file),
        Some(Err(e)) => log_file_error = Some(e),
        None => {}
    }

    let _telemetry_guard = modfs_telemetry::install(telemetry_config);

    if let Some(error) = log_file_error {
        warn!("{error:?}");
    }

    info!(version = env!("CARGO_PKG_VERSION"));

    let result = modfs_telemetry::with_root_span("modfs", "run command", || match cli.command {
        Commands::Info => commands::info::info(config),
        Commands::Resolve(args) => commands::resolve::resolve(config, args),
        Commands::Cache(CacheCommands::Path(args)) => commands::cache::path(config, args),
        Commands::Cache(CacheCommands::Clear(args)) => commands::cache::clear(config, args),
    });

    if result.is_err() {
        std::process::exit(1);
    }
}
