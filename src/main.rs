//! # RFP Intake CLI (`rfpd`)
//!
//! The `rfpd` binary initializes the database, runs the HTTP server, and
//! offers a few inspection commands.
//!
//! ## Usage
//!
//! ```bash
//! rfpd --config ./config/rfp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rfpd init` | Create the supplier and proposal tables |
//! | `rfpd serve` | Start the HTTP server |
//! | `rfpd extract <file>` | Run extraction on an email body without storing it |
//! | `rfpd suppliers` | Print the current supplier view |
//! | `rfpd proposals <rfp_name>` | Print proposals recorded for an RFP |

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};

use rfp_intake::config::{self, Config};
use rfp_intake::{db, langmodel, logging, migrate, server, IngestError};

/// RFP Intake: extract supplier proposals from email and store them by RFP.
#[derive(Parser)]
#[command(
    name = "rfpd",
    about = "RFP Intake: extract supplier proposals from email and store them by RFP",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rfp.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the `suppliers` and `proposals` tables and their indexes if
    /// they do not exist. Running it multiple times is safe.
    Init,

    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves until Ctrl-C.
    Serve,

    /// Extract a proposal from an email body without storing it.
    ///
    /// Sends the text to the configured reasoning engine and prints the
    /// validated proposal as JSON. Use `-` to read from stdin.
    Extract {
        /// File containing the raw email body, or `-` for stdin.
        path: PathBuf,
    },

    /// Print the current supplier view (latest row per email).
    Suppliers,

    /// Print all proposals recorded for an RFP.
    Proposals {
        /// RFP name.
        rfp_name: String,
    },
}

fn read_email(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read email file: {}", path.display()))
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg: Config = config::load_config(&cli.config)?;
    logging::init_tracing(cfg.logging.format);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("database init done.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Extract { path } => {
            let text = read_email(&path)?;
            let extractor = langmodel::create_extractor(&cfg.langmodel)?;
            let proposal = extractor
                .extract(&text)
                .await
                .map_err(|e| {
                    let err = IngestError::from(e);
                    anyhow::anyhow!("{} ({})", err, err.kind())
                })?;
            print_json(&json!({ "result": proposal }))?;
        }
        Commands::Suppliers => {
            let store = db::open_store(&cfg).await?;
            let listed = store.list_suppliers().await;
            store.close().await;
            print_json(&json!({ "results": listed? }))?;
        }
        Commands::Proposals { rfp_name } => {
            let store = db::open_store(&cfg).await?;
            let listed = store.list_proposals_for_rfp(&rfp_name).await;
            store.close().await;
            print_json(&json!({ "results": listed? }))?;
        }
    }

    Ok(())
}
