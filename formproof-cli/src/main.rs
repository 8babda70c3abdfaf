//! FormProof CLI
//!
//! Command-line interface for fingerprinting form responses, managing
//! prepaid notarization credits and verifying notarized fingerprints.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod ui;

use commands::Context;

#[derive(Parser)]
#[command(name = "formproof")]
#[command(about = "FormProof CLI - fingerprint form responses and notarize them with prepaid credits", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "FORMPROOF_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding credentials and notarization records
    #[arg(long, global = true, env = "FORMPROOF_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the fingerprint of a file (JSON is canonicalized, anything else hashed as text)
    Fingerprint {
        /// Input file, or '-' for stdin
        input: String,

        /// Hash the input as plain text even if it parses as JSON
        #[arg(long)]
        text: bool,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize a tabular export or structured capture into the standard batch
    Normalize {
        /// JSON file: an array of rows (first row = headers) or an array of captured responses
        input: PathBuf,

        /// Exclude exactly these headers instead of the configured policy (repeatable)
        #[arg(short, long = "exclude")]
        exclude: Vec<String>,

        /// Write the normalized batch to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a payment transaction against the configured receiving address
    VerifyPayment {
        /// Payment transaction id
        tx_id: String,
    },

    /// Verify a payment and issue an access token for it
    Issue {
        /// Payment transaction id
        tx_id: String,

        /// Address to notify once the token is issued
        #[arg(long)]
        notify: Option<String>,
    },

    /// Show the balance of an access token
    Status {
        /// Access token (ak_...)
        token: String,
    },

    /// Debit credits from an access token
    Consume {
        /// Access token (ak_...)
        token: String,

        /// Number of credits to debit
        #[arg(short = 'n', long, default_value = "1")]
        credits: u64,
    },

    /// Disable an access token (administrative)
    Disable {
        /// Access token (ak_...)
        token: String,
    },

    /// Notarize a fingerprint, spending one credit
    Store {
        /// Access token (ak_...)
        token: String,

        /// Fingerprint to notarize (64 hex characters)
        fingerprint: String,

        /// Transaction that anchors the fingerprint on the ledger
        #[arg(long)]
        anchor_tx: Option<String>,

        /// JSON metadata stored with the record
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Check whether a fingerprint has been notarized (free)
    Verify {
        /// Fingerprint to look up
        #[arg(required_unless_present = "file")]
        fingerprint: Option<String>,

        /// Compute the fingerprint from this file instead
        #[arg(long, conflicts_with = "fingerprint")]
        file: Option<PathBuf>,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Destination (defaults to the platform config directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("formproof_cli=debug,formproof_lib=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("formproof_cli=info,formproof_lib=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let ctx = Context::load(cli.config.as_deref(), cli.data_dir, cli.verbose)?;

    // Dispatch commands
    let outcome = match cli.command {
        Commands::Fingerprint { input, text, json } => {
            commands::fingerprint::run(&input, text, json, cli.verbose).await
        }
        Commands::Normalize {
            input,
            exclude,
            output,
            json,
        } => commands::normalize::run(&ctx, &input, exclude, output.as_deref(), json).await,
        Commands::VerifyPayment { tx_id } => commands::payment::verify(&ctx, &tx_id).await,
        Commands::Issue { tx_id, notify } => {
            commands::credits::issue(&ctx, &tx_id, notify).await
        }
        Commands::Status { token } => commands::credits::status(&ctx, &token).await,
        Commands::Consume { token, credits } => {
            commands::credits::consume(&ctx, &token, credits).await
        }
        Commands::Disable { token } => commands::credits::disable(&ctx, &token).await,
        Commands::Store {
            token,
            fingerprint,
            anchor_tx,
            metadata,
        } => {
            commands::records::store(&ctx, &token, &fingerprint, anchor_tx, metadata.as_deref())
                .await
        }
        Commands::Verify { fingerprint, file } => {
            commands::records::verify(&ctx, fingerprint.as_deref(), file.as_deref()).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&ctx),
            ConfigAction::Init { path, force } => commands::config::init(path, force),
        },
    };

    formproof_lib::persistence::shutdown()?;
    outcome
}
