mod app;
mod config;
mod logging;
mod render;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use nr_core::KeyValueStore;
use nr_ingest::{HttpArchiveSource, IngestReport, IngestionService};
use nr_reader::session::{self, CategoryFilter, DateFilter, SessionFilter};
use nr_storage::{create_storage, MarkSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (defaults to ./nr.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Archive API base URL, overriding [archive] base_url
    #[arg(long)]
    base_url: Option<String>,
    /// Data directory, overriding [storage] dir
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Storage backend: file or memory
    #[arg(long)]
    storage: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Interactive reader (default)
    Read,
    /// Download and merge the latest archive, or the one for --date
    Fetch {
        /// Archive date, e.g. 2025-01-03
        #[arg(long)]
        date: Option<String>,
    },
    /// List the archive dates the server offers
    Dates,
    /// Print the articles a reading session would show
    List {
        #[arg(long)]
        category: Option<String>,
        /// Calendar date (YYYY-MM-DD) or "all"
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        hide_read: bool,
    },
    /// Forget which articles have been read
    ResetRead,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            config.archive.base_url = base_url.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.storage.dir = Some(dir.clone());
        }
        if let Some(storage) = &self.storage {
            config.storage.backend = storage.clone();
        }
        config.validate()
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let dir = config.data_dir();
    let store = create_storage(&config.storage.backend, Some(&dir), config.storage.quota_bytes)
        .with_context(|| format!("Failed to open {} storage", config.storage.backend))?;
    info!(
        "🏦 Storage backend initialized successfully (using {} at {})",
        config.storage.backend,
        dir.display()
    );
    Ok(store)
}

fn open_service(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<IngestionService> {
    let source = HttpArchiveSource::new(
        &config.archive.base_url,
        Duration::from_secs(config.archive.timeout_secs),
    )?;
    Ok(IngestionService::new(
        Arc::new(source),
        store,
        nr_core::local_offset(),
    ))
}

fn print_report(report: &IngestReport) {
    if report.up_to_date {
        println!(
            "Archive {} already merged; {} articles stored.",
            report.archive_date,
            report.articles.len()
        );
        return;
    }
    println!(
        "Archive {}: {} parsed, {} skipped; {} articles stored.",
        report.archive_date,
        report.parsed,
        report.skipped,
        report.articles.len()
    );
    if report.storage_exhausted() {
        println!("Storage is full; the merged collection could not be saved.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config)?;

    let command = cli.command.unwrap_or(Commands::Read);
    match &command {
        Commands::Read => logging::init(&config.logging, Some(&config.log_file()))?,
        _ => logging::init(&config.logging, None)?,
    }

    let store = open_store(&config)?;
    let offset = nr_core::local_offset();

    match command {
        Commands::Read => {
            let service = Arc::new(open_service(&config, store.clone())?);
            app::run(&config, store, service, offset).await?;
        }
        Commands::Fetch { date } => {
            let service = open_service(&config, store)?;
            let report = match date {
                Some(date) => {
                    let day = date
                        .parse::<DateFilter>()
                        .ok()
                        .and_then(|d| d.date())
                        .with_context(|| format!("Invalid date: {}", date))?;
                    service
                        .fetch_for_date(&day.format("%Y-%m-%d").to_string())
                        .await?
                }
                None => service.fetch_latest().await?,
            };
            print_report(&report);
        }
        Commands::Dates => {
            let service = open_service(&config, store)?;
            let local = session::local_dates(&service.load_local()?, &offset);
            for date in service.available_dates().await? {
                let stored = date
                    .parse::<DateFilter>()
                    .ok()
                    .and_then(|d| d.date())
                    .is_some_and(|d| local.contains(&d));
                println!("{}{}", date, if stored { "  (stored)" } else { "" });
            }
        }
        Commands::List {
            category,
            date,
            hide_read,
        } => {
            let articles = nr_storage::CollectionStore::new(store.clone()).load()?;
            let date = match date {
                Some(date) => date
                    .parse::<DateFilter>()
                    .with_context(|| format!("Invalid date: {}", date))?,
                None => DateFilter::All,
            };
            let filter = SessionFilter {
                category: category
                    .as_deref()
                    .map_or(CategoryFilter::All, |c| c.parse().unwrap_or_default()),
                date,
                hide_read,
            };
            let read = MarkSet::read(store.clone())?;
            let saved = MarkSet::saved(store)?;
            for index in session::filter(&articles, &filter, &read, &saved, &offset) {
                let article = &articles[index];
                let published = article
                    .published_in(&offset)
                    .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| article.published_at.clone());
                let flags = match (saved.contains(&article.id), read.contains(&article.id)) {
                    (true, _) => "★",
                    (false, true) => "✓",
                    (false, false) => " ",
                };
                println!("{} {} [{}] {}", flags, published, article.category, article.title);
            }
        }
        Commands::ResetRead => {
            let mut read = MarkSet::read(store)?;
            let count = read.len();
            read.clear()?;
            println!("Cleared {} read marks.", count);
        }
    }

    Ok(())
}
