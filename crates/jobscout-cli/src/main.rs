use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use jobscout_core::{
    Config, MAX_JOBS_PER_SITE, Platform, QueueConfig, ScrapeOrchestrator, ScrapeQueue,
    ScrapeRequest, TaskContext, TaskStatus, config_file, default_keywords, extract_keywords,
    maintenance,
};
use jobscout_ingest::ResumeExtractor;
use jobscout_store::{JobFilter, SqliteStore};

mod output;

use output::ColorMode;

/// Jobscout - find job listings that match a resume
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract keywords from a resume and search every job board for them
    Scrape {
        /// Path to the PDF or DOCX resume
        file_path: PathBuf,

        /// Location passed to the job boards
        #[arg(long)]
        location: Option<String>,

        /// Maximum listings per platform (1 to 50)
        #[arg(long)]
        limit: Option<usize>,

        /// SQLite database to store the resume and listings in
        #[arg(long)]
        db: Option<PathBuf>,

        /// Do not add placeholder listings for boards that return nothing
        #[arg(long)]
        no_fallback: bool,

        /// Comma-separated list of platforms to skip
        #[arg(long, value_delimiter = ',')]
        disable_sites: Vec<String>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print the keywords a resume yields, without touching the network
    Keywords {
        /// Path to the PDF or DOCX resume
        file_path: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// List stored job listings, newest first
    Jobs {
        #[arg(long)]
        db: Option<PathBuf>,

        /// Only listings found for this resume id
        #[arg(long)]
        resume: Option<i64>,

        /// Only listings from this platform
        #[arg(long)]
        platform: Option<String>,

        /// Substring of the listing location
        #[arg(long)]
        location: Option<String>,

        /// Substring of the title or company
        #[arg(long)]
        search: Option<String>,

        /// Include deactivated listings
        #[arg(long)]
        all: bool,

        #[arg(long)]
        limit: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Deactivate listings older than the given age
    Sweep {
        #[arg(long)]
        db: Option<PathBuf>,

        #[arg(long)]
        max_age_days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,jobscout=debug".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = config_file::load_config().to_config();

    match cli.command {
        Command::Scrape {
            file_path,
            location,
            limit,
            db,
            no_fallback,
            disable_sites,
            no_color,
        } => {
            let mut config = config;
            if no_fallback {
                config.fallback_records = false;
            }
            if !disable_sites.is_empty() {
                config.disabled_sites = disable_sites;
            }
            let location = location
                .or_else(|| env_var("JOBSCOUT_LOCATION"))
                .unwrap_or_else(|| config.location.clone());
            let limit = limit.unwrap_or(config.jobs_per_site);
            if !(1..=MAX_JOBS_PER_SITE).contains(&limit) {
                anyhow::bail!("--limit must be between 1 and {MAX_JOBS_PER_SITE}");
            }
            let db = resolve_db(db, &config);
            scrape(&file_path, location, limit, db, config, ColorMode(!no_color)).await
        }
        Command::Keywords {
            file_path,
            no_color,
        } => keywords(&file_path, ColorMode(!no_color)),
        Command::Jobs {
            db,
            resume,
            platform,
            location,
            search,
            all,
            limit,
            no_color,
        } => {
            let platform = platform
                .map(|p| p.parse::<Platform>())
                .transpose()?;
            let filter = JobFilter {
                resume_id: resume,
                platform,
                location,
                search,
                active_only: !all,
                limit,
            };
            let store = open_existing(resolve_db(db, &config))?;
            let jobs = store.list_jobs(&filter)?;
            output::print_jobs(&mut std::io::stdout(), &jobs, ColorMode(!no_color))?;
            Ok(())
        }
        Command::Sweep { db, max_age_days } => {
            let mut config = config;
            if let Some(days) = max_age_days {
                config.stale_after_days = days;
            }
            let store = open_existing(resolve_db(db, &config))?;
            let count = maintenance::sweep_stale(&store, config.stale_after())?;
            println!(
                "Deactivated {count} listing(s) older than {} days",
                config.stale_after_days
            );
            Ok(())
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Database path: flag, then `JOBSCOUT_DB`, then the config file.
fn resolve_db(flag: Option<PathBuf>, config: &Config) -> Option<PathBuf> {
    flag.or_else(|| env_var("JOBSCOUT_DB").map(PathBuf::from))
        .or_else(|| config.db_path.clone())
}

fn open_existing(db: Option<PathBuf>) -> anyhow::Result<SqliteStore> {
    let Some(path) = db else {
        anyhow::bail!("No database configured. Pass --db or set JOBSCOUT_DB.");
    };
    if !path.exists() {
        anyhow::bail!("Database not found at {}", path.display());
    }
    SqliteStore::open(&path).with_context(|| format!("failed to open {}", path.display()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn keywords(file_path: &Path, color: ColorMode) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }
    if !jobscout_ingest::is_supported(file_path) {
        eprintln!("Warning: only PDF and DOCX resumes yield text");
    }

    let text = jobscout_ingest::extract_text(file_path);
    let found = extract_keywords(&text);
    let used_defaults = found.is_empty();
    let keywords = if used_defaults { default_keywords() } else { found };

    let mut out = std::io::stdout();
    writeln!(
        out,
        "{}: {} characters, {} words",
        display_name(file_path),
        text.chars().count(),
        text.split_whitespace().count()
    )?;
    output::print_keywords(&mut out, &keywords.to_query_terms(), used_defaults, color)?;
    Ok(())
}

async fn scrape(
    file_path: &Path,
    location: String,
    limit: usize,
    db: Option<PathBuf>,
    config: Config,
    color: ColorMode,
) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let store = Arc::new(match &db {
        Some(path) => SqliteStore::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?,
        None => SqliteStore::in_memory()?,
    });
    let orchestrator = ScrapeOrchestrator::new(&config, Arc::new(ResumeExtractor))?;
    let platforms = orchestrator.platforms();
    let ctx = TaskContext {
        orchestrator: Arc::new(orchestrator),
        store: store.clone(),
    };

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let (report_tx, report_rx) = async_channel::bounded(1);
    let queue = ScrapeQueue::new(
        ctx,
        QueueConfig {
            num_workers: 1,
            ..QueueConfig::from_config(&config)
        },
        cancel.clone(),
        Some(report_tx),
    );

    let doc = store.create_resume(file_path)?;
    let mut out = std::io::stdout();
    output::print_scrape_header(
        &mut out,
        &display_name(file_path),
        doc.id,
        &location,
        limit,
        &platforms,
        color,
    )?;

    let run_id = queue
        .submit(ScrapeRequest {
            resume_id: doc.id,
            location,
            jobs_per_site: limit,
        })
        .await?;
    tracing::debug!(resume_id = doc.id, run_id = %run_id, "waiting for scrape");

    // Ctrl+C cancels the queue token, which also stops the run in flight.
    let report = tokio::select! {
        report = report_rx.recv() => Some(report.context("scrape queue stopped without reporting")?),
        _ = cancel.cancelled() => None,
    };
    queue.shutdown().await;
    let Some(report) = report else {
        anyhow::bail!("Interrupted");
    };

    match report.status {
        TaskStatus::Success {
            jobs_created,
            keywords,
            outcomes,
        } => {
            output::print_keywords(&mut out, &keywords, false, color)?;
            writeln!(out)?;
            output::print_platform_outcomes(&mut out, &outcomes, color)?;

            let jobs = store.list_jobs(&JobFilter {
                resume_id: Some(doc.id),
                ..JobFilter::default()
            })?;
            output::print_jobs(&mut out, &jobs, color)?;
            output::print_summary(&mut out, jobs_created, jobs.len(), color)?;
            if db.is_none() {
                eprintln!("(no --db given, listings were not saved)");
            }
            Ok(())
        }
        TaskStatus::Failed { message, attempts } => {
            anyhow::bail!("Scrape failed after {attempts} attempt(s): {message}")
        }
        TaskStatus::NotFound => anyhow::bail!("Resume #{} disappeared from the database", doc.id),
        TaskStatus::Superseded => {
            anyhow::bail!("Resume #{} was claimed by another scrape", doc.id)
        }
    }
}
