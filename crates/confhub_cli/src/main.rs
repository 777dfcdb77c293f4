//! ConfHub CLI
//!
//! Command-line front end for configuration snapshots.
//!
//! # Commands
//!
//! - `create` - Capture the current settings into a new snapshot
//! - `list` - List snapshots, most recent first
//! - `show` - Display one snapshot and its settings
//! - `rename` - Change a snapshot's name and description
//! - `remove` - Delete a snapshot (and its hub record)
//! - `apply` - Write a snapshot's settings back to the settings file
//! - `sync` - Reconcile the local store with a hub

mod commands;
mod settings;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Capture, share and restore configuration snapshots.
#[derive(Parser)]
#[command(name = "confhub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local snapshot store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Settings file (JSON object, one key per section) [default: <path>/settings.json]
    #[arg(global = true, short, long)]
    settings: Option<PathBuf>,

    /// Hub directory shared between installations
    #[arg(global = true, long)]
    hub: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the current settings into a new snapshot
    Create {
        /// Snapshot name
        #[arg(short, long)]
        name: String,

        /// Snapshot description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List snapshots, most recent first
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display one snapshot and its settings
    Show {
        /// Local id, unique local id prefix, or hub id
        id: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Change a snapshot's name and description
    Rename {
        /// Local id, unique local id prefix, or hub id
        id: String,

        /// New name
        #[arg(short, long)]
        name: String,

        /// New description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Delete a snapshot (and its hub record, if published)
    Remove {
        /// Local id, unique local id prefix, or hub id
        id: String,
    },

    /// Write a snapshot's settings back to the settings file
    Apply {
        /// Local id, unique local id prefix, or hub id
        id: String,
    },

    /// Publish local snapshots and pull the hub catalog
    Sync,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("ConfHub CLI v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "ConfHub protocol v{}",
            confhub_sync_protocol::PROTOCOL_VERSION
        );
        return Ok(());
    }

    let path = cli.path.ok_or("Store path required (--path)")?;
    let settings_path = cli
        .settings
        .unwrap_or_else(|| path.join(settings::DEFAULT_FILE));
    let mut session = commands::open_session(&path, cli.hub.as_deref())?;

    match cli.command {
        Commands::Create { name, description } => {
            commands::create::run(&mut session, &settings_path, &name, &description)?;
        }
        Commands::List { format } => {
            commands::list::run(&session, &format)?;
        }
        Commands::Show { id, format } => {
            commands::show::run(&session, &id, &format)?;
        }
        Commands::Rename {
            id,
            name,
            description,
        } => {
            commands::rename::run(&mut session, &id, &name, &description)?;
        }
        Commands::Remove { id } => {
            commands::remove::run(&mut session, &id)?;
        }
        Commands::Apply { id } => {
            commands::apply::run(&session, &id, &settings_path)?;
        }
        Commands::Sync => {
            if cli.hub.is_none() {
                return Err("Hub directory required for sync (--hub)".into());
            }
            commands::sync::run(&mut session)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
