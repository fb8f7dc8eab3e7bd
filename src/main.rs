//! # Content Intake CLI (`intake`)
//!
//! ## Usage
//!
//! ```bash
//! intake --config ./config/intake.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `intake init` | Create the SQLite database and schema |
//! | `intake add` | Submit one file, URL, YouTube video, or text snippet |
//! | `intake get <id>` | Print a stored entry |
//! | `intake set-category <id> <category>` | Reassign an entry's category |
//! | `intake list` | Newest entries, optionally by category |
//! | `intake stats` | Entry counts per category |
//! | `intake import <dir>` | Submit every matching file under a directory |
//! | `intake serve` | Start the JSON HTTP API |
//!
//! Log output goes to stderr and is controlled with `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use content_intake::config::{self, Config};
use content_intake::ingest::{IngestOutcome, Ingestor};
use content_intake::sqlite_store::SqliteStore;
use content_intake::{get, import, migrate, server, stats};
use content_intake_core::models::{Category, Submission};

/// Content Intake: extract, normalize, and deduplicate manually submitted
/// content into a local corpus.
#[derive(Parser)]
#[command(name = "intake", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/intake.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Submit one item through the intake pipeline.
    ///
    /// Exits successfully for both newly stored and duplicate content.
    Add(AddArgs),

    /// Print a stored entry by id.
    Get {
        /// Entry UUID.
        id: String,
    },

    /// Reassign an entry's category.
    SetCategory {
        /// Entry UUID.
        id: String,
        /// One of replace, augment, new_tasks, human_only, unclassified.
        category: Category,
    },

    /// List the newest entries.
    List {
        /// Only show entries in this category.
        #[arg(long)]
        category: Option<Category>,

        /// Maximum number of entries to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show entry counts per category.
    Stats,

    /// Submit every matching file under a directory.
    Import {
        /// Directory to walk.
        dir: PathBuf,

        /// Category applied to every imported entry.
        #[arg(long)]
        category: Option<Category>,

        /// List matching files without submitting them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the JSON HTTP API on `[server].bind`.
    Serve,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Local file (.txt, .md, .html, .pdf, .docx).
    #[arg(long)]
    file: Option<PathBuf>,

    /// Web page or document URL.
    #[arg(long)]
    url: Option<String>,

    /// YouTube video URL or id.
    #[arg(long)]
    youtube: Option<String>,

    /// Text snippet.
    #[arg(long)]
    text: Option<String>,
}

#[derive(Args)]
struct AddArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Title override.
    #[arg(long)]
    title: Option<String>,

    /// Initial category (defaults to unclassified).
    #[arg(long)]
    category: Option<Category>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add(args) => run_add(&cfg, args).await?,
        Commands::Get { id } => get::run_get(&cfg, &id).await?,
        Commands::SetCategory { id, category } => {
            get::run_set_category(&cfg, &id, category).await?
        }
        Commands::List { category, limit } => stats::run_list(&cfg, category, limit).await?,
        Commands::Stats => stats::run_stats(&cfg).await?,
        Commands::Import {
            dir,
            category,
            dry_run,
        } => import::run_import(&cfg, &dir, category, dry_run).await?,
        Commands::Serve => server::run_server(&cfg).await?,
    }

    Ok(())
}

async fn run_add(cfg: &Config, args: AddArgs) -> Result<()> {
    let SourceArgs {
        file,
        url,
        youtube,
        text,
    } = args.source;

    let mut submission = if let Some(path) = file {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Submission::file(bytes, filename)
    } else if let Some(url) = url {
        Submission::url(url)
    } else if let Some(url) = youtube {
        Submission::youtube(url)
    } else if let Some(text) = text {
        Submission::text(text)
    } else {
        bail!("one of --file, --url, --youtube, or --text is required");
    };
    if let Some(category) = args.category {
        submission = submission.with_category(category);
    }
    if let Some(title) = args.title {
        submission = submission.with_title(title);
    }

    let store = Arc::new(SqliteStore::open(cfg).await?);
    let ingestor = Ingestor::from_config(cfg, store.clone())?;
    let report = ingestor.submit(submission).await;
    store.pool().close().await;

    let trail = report
        .states
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" -> ");

    match report.outcome {
        IngestOutcome::Stored { id, category } => {
            println!("stored {} (category: {})", id, category);
            println!("  {}", trail);
            Ok(())
        }
        IngestOutcome::Duplicate { existing_id } => {
            println!("duplicate of {}", existing_id);
            println!("  {}", trail);
            Ok(())
        }
        IngestOutcome::Failed(err) => {
            println!("  {}", trail);
            bail!("[{}] {}", err.kind(), err)
        }
    }
}
