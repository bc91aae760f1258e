//! Keychain CLI
//!
//! Command-line interface for inspecting and editing the OS keychain through
//! the retrying keychain store.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use keychain_lib::{DesktopCredentialStore, SecureStringStore};

mod commands;
mod ui;

#[derive(Parser)]
#[command(name = "keychain")]
#[command(about = "Keychain CLI - Read, write and wipe secure keychain entries", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to <config dir>/keychain/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keychain service namespace (overrides config and KEYCHAIN_SERVICE)
    #[arg(long, global = true)]
    service: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a string value
    Set {
        /// Entry key
        key: String,

        /// Value to store
        value: String,

        /// Require biometrics or passcode when the device supports it
        #[arg(long)]
        private: bool,
    },

    /// Print a string value
    Get {
        /// Entry key
        key: String,

        /// Fail instead of printing nothing when the keychain errors
        #[arg(long)]
        strict: bool,
    },

    /// Store a JSON document
    SetObject {
        /// Entry key
        key: String,

        /// JSON document
        json: String,

        /// Require biometrics or passcode when the device supports it
        #[arg(long)]
        private: bool,
    },

    /// Print a JSON document
    GetObject {
        /// Entry key
        key: String,
    },

    /// Remove an entry
    Rm {
        /// Entry key
        key: String,
    },

    /// Check whether an entry exists
    Has {
        /// Entry key
        key: String,
    },

    /// List all keys
    Keys,

    /// List all entries with masked values
    List,

    /// Print an anonymized report of all entries
    Anonymized,

    /// Delete every entry
    Wipe {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the access control private entries would use
    Access,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("keychain_cli=debug,keychain_lib=debug,keychain::diagnostics=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("keychain_cli=info,keychain_lib=warn,keychain::diagnostics=error")
            .with_writer(std::io::stderr)
            .init();
    }

    let config = commands::load_config(cli.config.as_deref(), cli.service.as_deref())?;
    tracing::debug!("Using keychain service '{}'", config.service);

    let backend = DesktopCredentialStore::new(config.service.clone());
    let store = SecureStringStore::with_config(backend, config);

    // Dispatch commands
    let outcome = match cli.command {
        Commands::Set {
            key,
            value,
            private,
        } => commands::entry::set(&store, &key, &value, private).await,
        Commands::Get { key, strict } => commands::entry::get(&store, &key, strict).await,
        Commands::SetObject { key, json, private } => {
            commands::entry::set_object(&store, &key, &json, private).await
        }
        Commands::GetObject { key } => commands::entry::get_object(&store, &key).await,
        Commands::Rm { key } => commands::entry::remove(&store, &key).await,
        Commands::Has { key } => {
            let exists = commands::entry::has(&store, &key).await?;
            if !exists {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Keys => commands::inventory::keys(&store).await,
        Commands::List => commands::inventory::list(&store).await,
        Commands::Anonymized => commands::inventory::anonymized(&store).await,
        Commands::Wipe { yes } => commands::wipe::run(&store, yes).await,
        Commands::Access => commands::access::run(&store).await,
    };

    if let Err(err) = outcome {
        ui::notice(ui::Notice::Failed, &format!("{:#}", err));
        std::process::exit(1);
    }
    Ok(())
}
