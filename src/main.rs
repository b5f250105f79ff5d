use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use sodscraper::{
    config::{Config, SourceKind},
    fetch::{ArchiveFetcher, ArchiveSource, HttpArchiveSource, MirrorArchiveSource},
    history::ParquetStore,
    progress::{ProgressTracker, SystemClock},
    Pipeline,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "sodscraper")]
#[command(about = "Load every missing year of the FDIC Summary of Deposits into the local store")]
struct Args {
    /// YAML config file; every key is optional
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store directory (overrides `store_dir`)
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// First year to load into an empty store (overrides `default_start_year`)
    #[arg(long)]
    start_year: Option<i32>,

    /// Read archives from this local mirror instead of downloading them
    #[arg(long)]
    mirror: Option<PathBuf>,

    /// Print the pending years and exit
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn into_config(self) -> Result<(Config, bool)> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(dir) = self.store_dir {
            config.store_dir = dir;
        }
        if let Some(year) = self.start_year {
            config.default_start_year = year;
        }
        if let Some(dir) = self.mirror {
            config.source = SourceKind::Mirror;
            config.mirror_dir = Some(dir);
        }
        config.validate()?;
        Ok((config, self.dry_run))
    }
}

async fn run_with<S: ArchiveSource>(source: S, config: &Config, dry_run: bool) -> Result<()> {
    let store = ParquetStore::open(&config.store_dir)
        .with_context(|| format!("opening store {:?}", config.store_dir))?;
    let mut pipeline = Pipeline::new(
        ArchiveFetcher::new(source, config.encoding),
        store,
        ProgressTracker::new(config.default_start_year),
        SystemClock,
    )
    .with_retry(config.fetch.clone());

    if dry_run {
        let range = pipeline.planned_range()?;
        match (range.first(), range.last()) {
            (Some(first), Some(last)) => println!("{} year(s) pending: {}..={}", range.len(), first, last),
            _ => println!("store is up to date"),
        }
        return Ok(());
    }

    match pipeline.run().await {
        Ok(committed) => {
            info!(committed, "run complete");
            Ok(())
        }
        Err(failure) => {
            error!(committed = failure.committed, year = ?failure.year, "run failed");
            Err(failure.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sodscraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    let (config, dry_run) = Args::parse().into_config()?;
    info!(store = %config.store_dir.display(), source = ?config.source, start = config.default_start_year, "startup");

    // ─── 3) run against the configured source ────────────────────────
    match config.source {
        SourceKind::Http => {
            let client = Client::builder()
                .timeout(config.fetch.timeout())
                .build()
                .context("building HTTP client")?;
            let source = HttpArchiveSource::new(client, config.url_template.clone())?;
            run_with(source, &config, dry_run).await
        }
        SourceKind::Mirror => {
            let dir = config
                .mirror_dir
                .clone()
                .context("mirror source needs a mirror directory")?;
            let source = MirrorArchiveSource::new(dir, config.mirror_file_template.clone())?;
            run_with(source, &config, dry_run).await
        }
    }
}
