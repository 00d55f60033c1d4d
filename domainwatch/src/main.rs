use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use probe::Prober;
use samples_sqlite::{export_samples_to_parquet, Db, StoredSample};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use targets::TargetRegistry;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use watch_engine::{backfill, Orchestrator, Scheduler};

mod config;

use config::Settings;

const DEFAULT_HISTORY_LIMIT: u32 = 3000;

fn rfc3339(t: OffsetDateTime) -> String {
    t.format(&Rfc3339).unwrap_or_default()
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Parser)]
#[command(name = "domainwatch", version, about = "Quarter-hourly reachability and TLS certificate monitor")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./domainwatch.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path
    #[arg(long, global = true, env = "DOMAINWATCH_DB")]
    db: Option<PathBuf>,
    /// Target list file
    #[arg(long, global = true, env = "DOMAINWATCH_TARGETS")]
    targets: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Backfill gaps, run one round now, then run a round every quarter hour
    Run,
    /// Probe once and print results as JSON lines; nothing is stored
    Check {
        /// Identifier to probe instead of the target list (repeatable)
        #[arg(long = "target", value_name = "ID")]
        target: Vec<String>,
    },
    /// Insert gap rows for missed quarter hours
    Backfill,
    /// Print the parsed target list as JSON lines
    Targets,
    /// Latest stored sample for every configured target
    Status,
    /// Stored samples for one target, newest first
    History {
        #[arg(long, value_name = "ID")]
        target: String,
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u32,
        /// Write CSV to this file instead of JSON lines to stdout
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Write every stored sample to a Parquet file
    Export {
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_db(settings: &Settings) -> Result<Db> {
    Db::open_or_create(&settings.database).with_context(|| format!("opening database {}", settings.database.display()))
}

fn main() -> Result<()> {
    let Cli { config: config_path, db, targets, log_json, command } = Cli::parse();
    init_logging(log_json);
    let settings = || -> Result<Settings> {
        let loaded = config::load_config(config_path.as_deref())?;
        Settings::resolve(loaded, db.clone(), targets.clone())
    };

    match command {
        Commands::Version => {
            println!("domainwatch {} (core {})", env!("CARGO_PKG_VERSION"), domainwatch_core::version());
        }
        Commands::Run => {
            let settings = settings()?;
            let store = Arc::new(open_db(&settings)?);
            tracing::info!(
                database = %settings.database.display(),
                targets_file = %settings.targets_file.display(),
                concurrency = settings.engine.concurrency,
                "starting monitor"
            );
            let orchestrator = Orchestrator::new(TargetRegistry::new(&settings.targets_file), store, settings.engine)?;
            let scheduler = Scheduler::new(orchestrator);
            let mut state = scheduler.subscribe();
            let rt = tokio::runtime::Runtime::new()?;
            rt.spawn(async move {
                while state.changed().await.is_ok() {
                    tracing::debug!(state = ?*state.borrow_and_update(), "scheduler state");
                }
            });
            rt.block_on(scheduler.start());
        }
        Commands::Check { target } => {
            let settings = settings()?;
            let ids = if target.is_empty() { TargetRegistry::new(&settings.targets_file).identifiers() } else { target };
            let prober = Prober::new(settings.engine.probe_timeout)?;
            let rt = tokio::runtime::Runtime::new()?;
            let results = rt.block_on(prober.probe_all(ids, settings.engine.concurrency));
            for r in results {
                println!("{}", serde_json::to_string(&r)?);
            }
        }
        Commands::Backfill => {
            let settings = settings()?;
            let db = open_db(&settings)?;
            let report = backfill(&db, OffsetDateTime::now_utc())?;
            let obj = serde_json::json!({
                "targets": report.targets,
                "inserted": report.inserted,
                "failed": report.failed,
            });
            println!("{}", serde_json::to_string(&obj)?);
        }
        Commands::Targets => {
            let settings = settings()?;
            for entry in TargetRegistry::new(&settings.targets_file).list() {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
        Commands::Status => {
            let settings = settings()?;
            let db = open_db(&settings)?;
            let mut latest: HashMap<String, StoredSample> =
                db.latest_per_target()?.into_iter().map(|r| (r.sample.target.clone(), r)).collect();
            for entry in TargetRegistry::new(&settings.targets_file).list() {
                let Some(row) = latest.remove(&entry.identifier) else { continue };
                let mut obj = serde_json::to_value(&row)?;
                obj["category"] = serde_json::json!(entry.category);
                println!("{}", serde_json::to_string(&obj)?);
            }
        }
        Commands::History { target, limit, csv: csv_out } => {
            let settings = settings()?;
            let db = open_db(&settings)?;
            let rows = db.history(&target, limit)?;
            match csv_out {
                Some(path) => {
                    let file = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
                    let mut wtr = csv::Writer::from_writer(file);
                    wtr.write_record([
                        "sample_id",
                        "target",
                        "reachable",
                        "tls_valid",
                        "tls_days_remaining",
                        "tls_expires_at",
                        "observed_at",
                    ])?;
                    for r in &rows {
                        wtr.write_record([
                            r.sample_id.to_string(),
                            r.sample.target.clone(),
                            opt(r.sample.reachable),
                            opt(r.sample.tls_valid),
                            opt(r.sample.tls_days_remaining),
                            r.sample.tls_expires_at.map(rfc3339).unwrap_or_default(),
                            rfc3339(r.sample.observed_at),
                        ])?;
                    }
                    wtr.flush()?;
                    tracing::info!(rows = rows.len(), out = %path.display(), "history written");
                }
                None => {
                    for r in &rows {
                        println!("{}", serde_json::to_string(r)?);
                    }
                }
            }
        }
        Commands::Export { out } => {
            let settings = settings()?;
            let db = open_db(&settings)?;
            let rows = export_samples_to_parquet(&db, &out)?;
            let obj = serde_json::json!({ "rows": rows, "out": out.display().to_string() });
            println!("{}", serde_json::to_string(&obj)?);
        }
    }
    Ok(())
}
