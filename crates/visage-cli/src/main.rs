use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use visage_core::{EncodingId, IdentityId};
use visage_enroll::config::LoggingConfig;
use visage_enroll::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "visage", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/visage/visage.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Register face encodings under a name
    ///
    /// Each file is a JSON sidecar produced by a face encoder: a list of
    /// detections ({"region": [top, right, bottom, left], "encoding": [...]}),
    /// a list of bare vectors, or a single vector. Directories are searched
    /// recursively for *.json files.
    ///
    /// The first face of each file becomes a candidate. A new name creates an
    /// identity; an existing name gets the new encodings appended, up to 10
    /// per identity.
    Register {
        /// Identity name (3 to 50 characters, case-sensitive)
        name: String,

        /// Encoding files or directories
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Recognize the faces in one or more encoding files
    Recognize {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Override the configured match tolerance
        #[arg(long)]
        tolerance: Option<f64>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List registered identities
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Show one identity and its encodings
    Show { id: IdentityId },
    /// Delete an identity and all of its encodings
    Delete { id: IdentityId },
    /// Delete a single encoding
    DeleteEncoding { id: EncodingId },
    /// Show database statistics
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print one value, or the whole config file
    Get { key: Option<String> },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

fn setup_logging(logging: &LoggingConfig) -> Result<()> {
    let level = match logging.level.to_lowercase().as_str() {
        "trace" => twyg::LogLevel::Trace,
        "debug" => twyg::LogLevel::Debug,
        "info" => twyg::LogLevel::Info,
        "warn" => twyg::LogLevel::Warn,
        "error" => twyg::LogLevel::Error,
        other => anyhow::bail!("Unknown log level: {}", other),
    };

    let opts = twyg::OptsBuilder::new()
        .coloured(logging.coloured)
        .level(level)
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid logging options: {e}"))?;
    twyg::setup(opts).map_err(|e| anyhow::anyhow!("Could not set up logging: {e}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.db {
        Some(db) => Config::load_with_db_path(db)?,
        None => Config::load()?,
    };

    setup_logging(&config.logging)?;

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let db_path = config.database_path.clone();
    match cli.command {
        Commands::Register { name, files } => {
            commands::run_register(&name, &files, &config)?;
        }
        Commands::Recognize {
            files,
            tolerance,
            json,
        } => {
            if let Some(tolerance) = tolerance {
                config.tolerance = tolerance;
            }
            commands::run_recognize(files, &config, json).await?;
        }
        Commands::List { offset, limit } => {
            commands::users::list_identities(&db_path, offset, limit)?;
        }
        Commands::Show { id } => {
            commands::users::show_identity(&db_path, id)?;
        }
        Commands::Delete { id } => {
            commands::users::delete_identity(&db_path, id)?;
        }
        Commands::DeleteEncoding { id } => {
            commands::users::delete_encoding(&db_path, id)?;
        }
        Commands::Status => {
            commands::show_status(&config)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config)?,
            ConfigAction::Get { key } => commands::config::get_config(&config, key)?,
            ConfigAction::Path => commands::config::show_path()?,
            ConfigAction::Example => commands::config::show_example()?,
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}
