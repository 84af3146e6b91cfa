//! Configuration CLI commands.

use clap::{Args, Subcommand};
use peerprep_core::config::AppConfig;
use peerprep_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => match format {
            OutputFormat::Json => output::print_item(config),
            OutputFormat::Table => {
                let transports: Vec<&str> =
                    config.realtime.transports.iter().map(|t| t.as_str()).collect();
                output::print_kv("API base URL", &config.api.base_url);
                output::print_kv("Socket suffix", &config.api.socket_path_suffix);
                output::print_kv("Realtime path", &config.api.realtime_path);
                output::print_kv("Namespace", &config.api.namespace);
                output::print_kv("Transports", &transports.join(", "));
                output::print_kv("Reconnect", &config.realtime.reconnect.to_string());
                output::print_kv(
                    "Reconnect delay",
                    &format!("{} ms", config.realtime.reconnect_delay_ms),
                );
                output::print_kv(
                    "Reconnect attempts",
                    &config.realtime.reconnect_attempts.to_string(),
                );
                output::print_kv("Session store", &config.session.store_path);
                output::print_kv("Log level", &config.logging.level);
                output::print_kv("Log format", &config.logging.format);
            }
        },
    }

    Ok(())
}
