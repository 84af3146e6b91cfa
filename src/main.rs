//! PeerPrep client shell.
//!
//! Mounts the realtime connection once at start, then reads navigation
//! commands from stdin and prints what the router decides. Realtime events
//! are logged as they arrive. EOF or Ctrl+C unmounts the connection.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, fmt};

use peerprep_auth::routes::menu_for;
use peerprep_auth::{NavigationOutcome, RouteTable, Router, SessionStore};
use peerprep_core::config::AppConfig;
use peerprep_core::error::AppError;
use peerprep_realtime::transport::Credentials;
use peerprep_realtime::{ConnectionHandle, ConnectionProvider, RealtimeEvent};

const HELP: &str = "\
commands:
  /<path>              navigate to a route
  back                 go back one history entry
  refresh              re-evaluate the current route
  menu                 show navigation links for the current session
  whoami               show the session profile
  status               show the realtime connection state
  emit <event> [json]  send an event over the realtime connection
  logout               clear the session flags and re-evaluate
  help                 show this text";

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from an explicit file, or the layered config/ sources
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("PEERPREP_ENV").unwrap_or_else(|_| "development".to_string());

    match std::env::var("PEERPREP_CONFIG") {
        Ok(path) => AppConfig::from_file(&path),
        Err(_) => AppConfig::load(&env),
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting PeerPrep client v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(SessionStore::from_config(&config.session)?);
    let credentials = Credentials {
        cookie: store.session_cookie(),
    };

    let provider = ConnectionProvider::mount_default(&config, credentials);
    let connection = provider.handle();
    let event_log = tokio::spawn(log_events(connection.subscribe()));

    let table = Arc::new(RouteTable::default_routes(&config.navigation));
    let mut router = Router::new(Arc::clone(&table), store.clone());
    print_outcome(&router.refresh());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    dispatch(line.trim(), &mut router, &table, &store, &connection);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    break;
                }
            },
        }
    }

    provider.unmount().await;
    event_log.abort();
    tracing::info!("PeerPrep client stopped");
    Ok(())
}

/// Run one shell command
fn dispatch(
    line: &str,
    router: &mut Router,
    table: &RouteTable,
    store: &SessionStore,
    connection: &ConnectionHandle,
) {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

    match command {
        "" => {}
        path if path.starts_with('/') => print_outcome(&router.navigate(path)),
        "back" => match router.back() {
            Some(outcome) => print_outcome(&outcome),
            None => println!("already at the first entry"),
        },
        "refresh" => print_outcome(&router.refresh()),
        "menu" => {
            for item in menu_for(table, store.profile().role) {
                println!("  {:<24} {}", item.title, item.path);
            }
        }
        "whoami" => {
            let profile = store.profile();
            let role = profile.role.map(|r| r.label()).unwrap_or("-");
            println!("{} ({})", profile.display_name(), role);
        }
        "status" => {
            let state = connection.state();
            println!(
                "{} id={} transport={}",
                state.status,
                state.id.as_deref().unwrap_or("-"),
                state
                    .transport
                    .map(|t| t.as_str())
                    .unwrap_or("-"),
            );
        }
        "emit" => emit(rest, connection),
        "logout" => match store.logout() {
            Ok(()) => print_outcome(&router.refresh()),
            Err(e) => println!("logout failed: {e}"),
        },
        "help" => println!("{HELP}"),
        other => println!("unknown command '{other}', try 'help'"),
    }
}

fn emit(args: &str, connection: &ConnectionHandle) {
    let (event, payload) = args.trim().split_once(' ').unwrap_or((args.trim(), ""));
    if event.is_empty() {
        println!("usage: emit <event> [json]");
        return;
    }

    let data = if payload.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(payload) {
            Ok(data) => data,
            Err(e) => {
                println!("invalid JSON payload: {e}");
                return;
            }
        }
    };

    match connection.emit(event, data) {
        Ok(()) => println!("queued '{event}'"),
        Err(e) => println!("emit failed: {e}"),
    }
}

fn print_outcome(outcome: &NavigationOutcome) {
    match outcome {
        NavigationOutcome::Rendered { path } => println!("render {path}"),
        NavigationOutcome::Redirected { from, to } => println!("redirect {from} -> {to}"),
        NavigationOutcome::NotFound { path } => println!("not found {path}"),
    }
}

/// Log realtime events until the connection's event channel closes
async fn log_events(mut events: broadcast::Receiver<RealtimeEvent>) {
    loop {
        match events.recv().await {
            Ok(RealtimeEvent::Message { event, args }) => {
                tracing::info!(event = %event, args = ?args, "Realtime message");
            }
            Ok(RealtimeEvent::ReconnectFailed { attempts }) => {
                tracing::warn!(attempts, "Realtime connection gave up");
            }
            Ok(event) => tracing::debug!(event = ?event, "Realtime lifecycle event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Realtime event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
