//! # regionmetrics
//!
//! Binary entry point: DI wiring, CLI commands and lifecycle.

mod lifecycle;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use regionmetrics_coordinator::registry::EntryRegistry;
use regionmetrics_coordinator::sensor::RegionSensors;
use regionmetrics_coordinator::setup::{SetupFlow, SetupInput};
use regionmetrics_core::config::AppConfig;
use regionmetrics_core::config_manager::ConfigManager;
use regionmetrics_core::models::catalog;
use regionmetrics_core::models::statistic::statistic_id;
use regionmetrics_core::ports::fetcher::MetricsFetcher;
use regionmetrics_core::ports::statistics::StatisticsStore;
use regionmetrics_network::http_fetcher::HttpMetricsFetcher;
use regionmetrics_storage::sqlite::SqliteStatisticsStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;

const WORKSPACE_CRATES: [&str; 5] = [
    "regionmetrics",
    "regionmetrics_core",
    "regionmetrics_network",
    "regionmetrics_storage",
    "regionmetrics_coordinator",
];

/// Starlink regional network metrics: readings and long-term statistics
#[derive(Parser, Debug)]
#[command(name = "regionmetrics")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: platform config dir)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Statistics DB directory (overrides `storage.db_path`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh every configured region until interrupted
    Run,
    /// Validate a region against the live document and add it
    Add {
        #[arg(long)]
        region_id: String,
        #[arg(long)]
        region_name: Option<String>,
    },
    /// Remove a configured region
    Remove {
        #[arg(long)]
        region_id: String,
    },
    /// List configured regions
    List,
    /// Fetch once and print the readings of a region
    Show {
        #[arg(long)]
        region_id: String,
    },
    /// Print recorded points of one metric
    History {
        #[arg(long)]
        region_id: String,
        #[arg(long)]
        metric: String,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

fn init_tracing(log_level: &str) {
    let log_filter = WORKSPACE_CRATES
        .iter()
        .map(|c| format!("{c}={log_level}"))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<ConfigManager> {
    let manager = match path {
        Some(p) => ConfigManager::with_path(p),
        None => ConfigManager::new(),
    }
    .context("failed to load config")?;
    info!("config: {}", manager.config_path().display());
    Ok(manager)
}

fn resolve_db_path(manager: &ConfigManager, data_dir: Option<&Path>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir.join("statistics.db")),
        None => manager.db_path().context("failed to resolve statistics DB path"),
    }
}

fn open_store(path: &Path) -> Result<Arc<SqliteStatisticsStore>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(Arc::new(SqliteStatisticsStore::open(path)?))
}

fn build_fetcher(config: &AppConfig) -> Result<Arc<HttpMetricsFetcher>> {
    Ok(Arc::new(HttpMetricsFetcher::new(
        &config.upstream.url,
        config.request_timeout(),
    )?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let manager = load_config(args.config)?;

    match args.command {
        Command::Run => run(&manager, args.data_dir.as_deref()).await,
        Command::Add {
            region_id,
            region_name,
        } => add(&manager, region_id, region_name).await,
        Command::Remove { region_id } => remove(&manager, &region_id),
        Command::List => {
            list(&manager.get());
            Ok(())
        }
        Command::Show { region_id } => show(&manager.get(), &region_id).await,
        Command::History {
            region_id,
            metric,
            limit,
        } => history(&manager, args.data_dir.as_deref(), &region_id, &metric, limit).await,
    }
}

async fn run(manager: &ConfigManager, data_dir: Option<&Path>) -> Result<()> {
    let config = manager.get();
    if config.entries.is_empty() {
        bail!("no regions configured; add one with `regionmetrics add --region-id <ID>`");
    }

    let store = open_store(&resolve_db_path(manager, data_dir)?)?;
    let fetcher = build_fetcher(&config)?;
    let lifecycle = LifecycleManager::new();
    let mut registry = EntryRegistry::new(
        fetcher,
        store,
        config.refresh_interval(),
        lifecycle.subscribe(),
    );

    for entry in config.entries.iter().cloned() {
        let title = entry.title.clone();
        if let Err(e) = registry.setup_entry(entry).await {
            error!("entry {title} not loaded: {e}");
        }
    }

    if registry.is_empty() {
        bail!("no entry could be loaded");
    }
    info!(
        "{} of {} entries running, refresh every {}s",
        registry.len(),
        config.entries.len(),
        config.refresh.interval_secs
    );

    lifecycle.wait_for_signal().await;

    // loops already saw the shutdown flag; this waits for them to finish
    registry.unload_all().await;
    info!("stopped");
    Ok(())
}

async fn add(
    manager: &ConfigManager,
    region_id: String,
    region_name: Option<String>,
) -> Result<()> {
    let config = manager.get();
    let flow = SetupFlow::new(build_fetcher(&config)?);

    let entry = flow
        .submit(
            &config.entries,
            SetupInput {
                region_id,
                region_name,
            },
        )
        .await
        .map_err(|e| anyhow!("setup rejected [{}]: {e}", e.code()))?;

    let title = entry.title.clone();
    manager.update_with(|c| c.entries.push(entry))?;
    println!("added: {title}");
    Ok(())
}

fn remove(manager: &ConfigManager, region_id: &str) -> Result<()> {
    if manager.get().entry_for_region(region_id).is_none() {
        bail!("region {region_id} is not configured");
    }
    manager.update_with(|c| c.entries.retain(|e| e.region_id != region_id))?;
    println!("removed: {region_id}");
    Ok(())
}

fn list(config: &AppConfig) {
    if config.entries.is_empty() {
        println!("no regions configured");
        return;
    }
    for entry in &config.entries {
        println!("{:<12} {:<36} {}", entry.region_id, entry.entry_id, entry.title);
    }
}

async fn show(config: &AppConfig, region_id: &str) -> Result<()> {
    let fetcher = build_fetcher(config)?;
    let record = fetcher.fetch(region_id).await?;

    let sensors = preview_sensors(config, region_id);
    sensors.apply(&record);

    println!("{} (fetched {})", sensors.device().name, record.fetched_at.to_rfc3339());
    for reading in sensors.readings() {
        let value = reading
            .value
            .map(|v| format!("{v} {}", reading.unit))
            .unwrap_or_else(|| "unavailable".to_string());
        println!("  {:<22} {value}", reading.name);
    }
    Ok(())
}

/// Reading entities for `region_id`, named after its configured entry if any.
fn preview_sensors(config: &AppConfig, region_id: &str) -> RegionSensors {
    match config.entry_for_region(region_id) {
        Some(entry) => RegionSensors::new(&entry.entry_id, region_id, entry.region_name.as_deref()),
        None => RegionSensors::new(region_id, region_id, None),
    }
}

async fn history(
    manager: &ConfigManager,
    data_dir: Option<&Path>,
    region_id: &str,
    metric: &str,
    limit: usize,
) -> Result<()> {
    let Some(entry) = catalog::find(metric) else {
        let keys: Vec<&str> = catalog::CATALOG.iter().map(|e| e.key).collect();
        bail!("unknown metric {metric}; expected one of {}", keys.join(", "));
    };

    let path = resolve_db_path(manager, data_dir)?;
    if !path.exists() {
        warn!("statistics DB not found: {}", path.display());
        println!("no statistics recorded yet");
        return Ok(());
    }

    let store = open_store(&path)?;
    let id = statistic_id(region_id, entry.key);
    let points = store.get_points(&id, limit).await?;

    if points.is_empty() {
        println!("no points for {id}");
        return Ok(());
    }

    let rows: Vec<serde_json::Value> = points
        .iter()
        .map(|p| serde_json::json!({ "start": p.start.to_rfc3339(), "mean": p.mean }))
        .collect();
    println!("{id} ({})", entry.unit);
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
