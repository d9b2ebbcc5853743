use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Transfer engine limits (optional `[transfer]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Maximum redirect hops followed for one fetch.
    pub max_redirects: u32,
    /// Connect timeout per hop, in seconds.
    pub connect_timeout_secs: u64,
    /// Deadline for a whole fetch (all hops plus body), in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` sent with every request; some mirrors refuse requests without one.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Extra request headers sent with every fetch (e.g. `Cookie`, `Referer`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            connect_timeout_secs: 30,
            timeout_secs: 3600,
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
        }
    }
}

impl TransferConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Global configuration loaded from `~/.config/dlqueue/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Port for the HTTP submission/listing API.
    pub listen_port: u16,
    /// Maximum number of concurrent transfers.
    pub pool_size: usize,
    /// Scheduler trigger as a seconds-resolution cron expression.
    pub tick_cron: String,
    /// IANA timezone the cron trigger is evaluated in.
    pub timezone: String,
    /// Directory for downloaded artifacts (default: `./downloads`).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// SQLite database file (default: XDG state dir).
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub transfer: Option<TransferConfig>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            listen_port: 3000,
            pool_size: 5,
            tick_cron: "0 * * * * *".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            download_dir: None,
            database_path: None,
            transfer: None,
        }
    }
}

impl QueueConfig {
    /// Transfer limits, falling back to built-in defaults.
    pub fn transfer(&self) -> TransferConfig {
        self.transfer.clone().unwrap_or_default()
    }

    /// Effective download directory.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("downloads"))
    }

    /// Parsed scheduler trigger.
    pub fn schedule(&self) -> Result<cron::Schedule> {
        cron::Schedule::from_str(&self.tick_cron)
            .with_context(|| format!("invalid tick_cron expression: {:?}", self.tick_cron))
    }

    /// Parsed trigger timezone.
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| anyhow::anyhow!("'{}' is not a valid IANA timezone", self.timezone))
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            anyhow::bail!("pool_size must be at least 1");
        }
        self.schedule()?;
        self.tz()?;
        Ok(())
    }

    /// Apply `DLQUEUE_*` environment overrides (and `PORT`) on top of file values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = get("DLQUEUE_PORT").or_else(|| get("PORT")) {
            self.listen_port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid port: {port:?}"))?;
        }
        if let Some(n) = get("DLQUEUE_POOL_SIZE") {
            self.pool_size = n
                .trim()
                .parse()
                .with_context(|| format!("invalid pool size: {n:?}"))?;
        }
        if let Some(dir) = get("DLQUEUE_DOWNLOAD_DIR") {
            self.download_dir = Some(PathBuf::from(dir));
        }
        if let Some(tz) = get("DLQUEUE_TIMEZONE") {
            self.timezone = tz;
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlqueue")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
/// Environment overrides are applied and the result is validated.
pub fn load_or_init() -> Result<QueueConfig> {
    let path = config_path()?;
    let mut cfg = if !path.exists() {
        let default_cfg = QueueConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        default_cfg
    } else {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?
    };
    cfg.apply_env_overrides()?;
    cfg.validate()?;
    Ok(cfg)
}
