//! ABAP remote CLI
//!
//! Single binary for managing connections to ABAP systems through the
//! local language server:
//! - Connection catalog (list, add, remove, test)
//! - Session lifecycle (connect, disconnect, restore)
//! - Repository browsing over `adt://` URIs (ls, cat, stat)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adt_cli::commands::{self, HttpArgs, RfcArgs};
use adt_cli::host::Host;
use adt_core::config::{self, ClientConfig};

#[derive(Parser)]
#[command(name = "adt")]
#[command(author, version, about = "Connect to ABAP systems and browse their repositories")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage declared connections
    #[command(alias = "conn")]
    Connections {
        #[command(subcommand)]
        action: ConnectionsAction,
    },

    /// Log on to a system and keep the session for later commands
    Connect {
        /// Connection name
        name: String,
    },

    /// End the session with a system
    Disconnect {
        /// Connection name
        name: String,
    },

    /// List a directory, e.g. adt://A4H/Local%20Objects
    Ls { uri: String },

    /// Print the source of an object
    Cat { uri: String },

    /// Show what a URI points at
    Stat { uri: String },

    /// Reattach to parked sessions and show the active systems
    Restore,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConnectionsAction {
    /// List declared connections
    List {
        /// Show protocol, client and description
        #[arg(short, long)]
        long: bool,
    },
    /// Declare a new connection
    Add {
        #[command(subcommand)]
        protocol: AddProtocol,
    },
    /// Forget a connection
    Remove { name: String },
    /// Try a logon without keeping the session
    Test { name: String },
}

#[derive(Subcommand)]
enum AddProtocol {
    /// Through the ADT HTTP(S) service
    Http(HttpArgs),
    /// Through RFC
    Rfc(RfcArgs),
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
}

/// Commands that talk to the language server inside a restore/park bracket
enum SessionCommand {
    Connect(String),
    Disconnect(String),
    Ls(String),
    Cat(String),
    Stat(String),
    Restore,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let client_config = load_client_config(&config_path, cli.config.is_some())?;

    let session = match cli.command {
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => commands::config_show(&config_path, &client_config)?,
                ConfigAction::Path => commands::config_path(&config_path),
            }
            return Ok(());
        }

        Commands::Connections { action } => {
            let host = Host::open(&client_config)?;
            match action {
                ConnectionsAction::List { long } => commands::list_command(&host, long).await?,
                ConnectionsAction::Add { protocol } => {
                    let data = match protocol {
                        AddProtocol::Http(args) => args.into_data()?,
                        AddProtocol::Rfc(args) => args.into_data()?,
                    };
                    commands::add_command(&host, data).await?;
                }
                ConnectionsAction::Remove { name } => commands::remove_command(&host, &name).await?,
                ConnectionsAction::Test { name } => commands::test_command(&host, &name).await?,
            }
            return Ok(());
        }

        Commands::Connect { name } => SessionCommand::Connect(name),
        Commands::Disconnect { name } => SessionCommand::Disconnect(name),
        Commands::Ls { uri } => SessionCommand::Ls(uri),
        Commands::Cat { uri } => SessionCommand::Cat(uri),
        Commands::Stat { uri } => SessionCommand::Stat(uri),
        Commands::Restore => SessionCommand::Restore,
    };

    let host = Host::open(&client_config)?;
    run_session(&host, session, cli.quiet).await
}

/// Load the config file; only an explicitly given file has to exist
fn load_client_config(path: &Path, explicit: bool) -> Result<ClientConfig> {
    if explicit {
        return config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }
    Ok(config::load_or_default(path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from {:?}: {}", path, e);
        ClientConfig::default()
    }))
}

async fn run_session(host: &Host, command: SessionCommand, quiet: bool) -> Result<()> {
    let report = host.restore(quiet).await?;

    let result = match command {
        SessionCommand::Connect(name) => commands::connect_command(host, &name).await,
        SessionCommand::Disconnect(name) => commands::disconnect_command(host, &name).await,
        SessionCommand::Ls(uri) => commands::ls_command(host, &uri).await,
        SessionCommand::Cat(uri) => commands::cat_command(host, &uri).await,
        SessionCommand::Stat(uri) => commands::stat_command(host, &uri).await,
        SessionCommand::Restore => commands::restore_command(host, &report),
    };

    // Park even when the command failed, so restored sessions survive
    let parked = host.park().await;
    result?;
    parked?;
    Ok(())
}
