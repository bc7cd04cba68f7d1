mod backup;
mod cli;
mod colorize;
mod commands;
mod config;
mod error;
mod fs_utils;
mod installer;
mod link;
mod probe;
#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::{Args, Cli};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    colored::control::set_override(true);
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tracing::debug!(?cli, "parsed arguments");
    let config_path = commands::resolve_config_path(cli.config.as_deref())?;

    match cli.command {
        Args::Symlink { apps, keep_going } => {
            commands::symlink_apps(&config_path, &apps, keep_going).map(|_| ())
        }
        Args::Unlink { apps } => {
            commands::unlink_apps(&config_path, &apps).map(|_| ())
        }
        Args::Status { apps } => {
            commands::status_apps(&config_path, &apps)
        }
        Args::Backups { file } => {
            commands::list_backups(file.as_deref())
        }
        Args::Reset { force } => {
            commands::clear_backups(force)
        }
        Args::Init { root, dest } => {
            commands::init_config(&config_path, &root, dest.as_deref())
        }
    }
}
