//! CLI command definitions and dispatch.

pub mod config;
pub mod routes;
pub mod session;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use peerprep_auth::SessionStore;
use peerprep_core::config::AppConfig;
use peerprep_core::error::AppError;

/// PeerPrep: inspect and manage the local client session
#[derive(Debug, Parser)]
#[command(name = "peerprep-cli", version, about, long_about = None)]
pub struct Cli {
    /// Explicit configuration file (skips the layered config/ lookup)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Environment overlay loaded from config/<env>.toml
    #[arg(short, long, env = "PEERPREP_ENV", default_value = "development")]
    pub env: String,

    /// Session flag file (overrides `session.store_path`)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a login in the local session flags
    Login(session::LoginArgs),
    /// Clear every session flag
    Logout(session::LogoutArgs),
    /// Show the current session profile
    Whoami,
    /// List client routes
    Routes(routes::RoutesArgs),
    /// Evaluate the role guard for a path against the stored flags
    Check(routes::CheckArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = self.load_config()?;
        tracing::debug!(command = ?self.command, "Executing command");

        match &self.command {
            Commands::Login(args) => session::login(
                args,
                &self.open_store(&config)?,
                &config.session.cookie_name,
            ),
            Commands::Logout(args) => session::logout(args, &self.open_store(&config)?),
            Commands::Whoami => session::whoami(&self.open_store(&config)?, self.format),
            Commands::Routes(args) => routes::list(args, &config, self.format),
            Commands::Check(args) => {
                routes::check(args, &config, self.open_store(&config)?, self.format)
            }
            Commands::Config(args) => config::execute(args, &config, self.format),
        }
    }

    /// Loads configuration from the explicit file or the layered sources.
    fn load_config(&self) -> Result<AppConfig, AppError> {
        match &self.config {
            Some(path) => AppConfig::from_file(path),
            None => AppConfig::load(&self.env),
        }
    }

    fn open_store(&self, config: &AppConfig) -> Result<SessionStore, AppError> {
        match &self.session {
            Some(path) => SessionStore::open(path),
            None => SessionStore::from_config(&config.session),
        }
    }
}
