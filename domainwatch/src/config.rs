use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use watch_engine::EngineSettings;

pub const DEFAULT_CONFIG: &str = "domainwatch.yaml";
pub const DEFAULT_DATABASE: &str = "domainwatch.db";
pub const DEFAULT_TARGETS: &str = "domains";

#[derive(Debug, Default, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub database: Option<PathBuf>,
    pub targets_file: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub retention_hours: Option<u32>,
    pub concurrency: Option<usize>,
}

/// An explicit `--config` path must be readable. Without one, `./domainwatch.yaml` is
/// loaded if it exists.
pub fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(DEFAULT_CONFIG);
            if p.exists() { p.to_path_buf() } else { return Ok(None); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
    let cfg = serde_yaml::from_str(&s).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(Some(cfg))
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database: PathBuf,
    pub targets_file: PathBuf,
    pub engine: EngineSettings,
}

impl Settings {
    /// Flags win over the file, the file wins over defaults.
    pub fn resolve(cfg: Option<Config>, database: Option<PathBuf>, targets_file: Option<PathBuf>) -> Result<Self> {
        let cfg = cfg.unwrap_or_default();
        let mut engine = EngineSettings::default();
        if let Some(ms) = cfg.timeout_ms {
            ensure!(ms > 0, "timeout_ms must be positive");
            engine.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(h) = cfg.retention_hours {
            ensure!(h > 0, "retention_hours must be positive");
            engine.retention = time::Duration::hours(i64::from(h));
        }
        if let Some(c) = cfg.concurrency {
            ensure!(c > 0, "concurrency must be positive");
            engine.concurrency = c;
        }
        Ok(Settings {
            database: database.or(cfg.database).unwrap_or_else(|| DEFAULT_DATABASE.into()),
            targets_file: targets_file.or(cfg.targets_file).unwrap_or_else(|| DEFAULT_TARGETS.into()),
            engine,
        })
    }
}
