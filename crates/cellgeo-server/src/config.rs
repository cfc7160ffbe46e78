use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use cellgeo_db_sqlite::SqliteConfig;
use cellgeo_providers::ProvidersConfig;
use cellgeo_resolver::{DefaultLocation, MAX_JUMP_KM, PipelineOptions, RefreshOptions};
use cellgeo_storage::TierId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Location returned when a cell cannot be resolved at all
    #[serde(default)]
    pub default_location: DefaultLocation,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        // Storage validations
        if self.storage.backend == StorageBackend::Sqlite {
            if self.storage.data_dir.as_os_str().is_empty() {
                return Err("storage.data_dir must not be empty".into());
            }
            if self.storage.pool_size == 0 {
                return Err("storage.pool_size must be > 0".into());
            }
        }
        // Provider validations
        if self.providers.timeout_ms == 0 {
            return Err("providers.timeout_ms must be > 0".into());
        }
        // Default location validation
        let DefaultLocation { lat, lon } = self.default_location;
        if !(-90.0..=90.0).contains(&lat) {
            return Err("default_location.lat must be within -90..=90".into());
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err("default_location.lon must be within -180..=180".into());
        }
        // Refresh validation
        if !(self.refresh.max_jump_km.is_finite() && self.refresh.max_jump_km > 0.0) {
            return Err("refresh.max_jump_km must be a positive number".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            continue_after_not_found: self.pipeline.continue_after_not_found,
            default_location: self.default_location,
        }
    }

    /// Interval between scheduled reconciliation sweeps, if enabled.
    pub fn reconcile_interval(&self) -> Option<Duration> {
        match self.reconcile.interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Interval between scheduled provider refreshes, if enabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh.interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Age after which a cached provider answer is due for a refresh.
    pub fn refresh_max_age(&self) -> Duration {
        Duration::from_secs(self.refresh.max_age_secs)
    }

    pub fn refresh_options(&self) -> RefreshOptions {
        RefreshOptions {
            max_jump_km: self.refresh.max_jump_km,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5265
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One SQLite file per tier
    #[default]
    Sqlite,
    /// Process memory only; read-only tiers start empty
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory holding the tier database files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default)]
    pub files: TierFiles,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_pool_size() -> u32 {
    4
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            pool_size: default_pool_size(),
            files: TierFiles::default(),
        }
    }
}

impl StorageConfig {
    /// SQLite settings for the file backing `tier`.
    pub fn sqlite_for(&self, tier: TierId) -> SqliteConfig {
        SqliteConfig::new(self.data_dir.join(self.files.file_for(tier)))
            .with_pool_size(self.pool_size)
    }
}

/// Database file name of each tier, relative to `storage.data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierFiles {
    pub opencellid: String,
    pub mozilla: String,
    pub glm: String,
    pub unwiredlabs: String,
    pub own: String,
}

impl Default for TierFiles {
    fn default() -> Self {
        Self {
            opencellid: "oci_cells.sqlite".into(),
            mozilla: "mls_cells.sqlite".into(),
            glm: "glm_cells.sqlite".into(),
            unwiredlabs: "uwl_cells.sqlite".into(),
            own: "own_cells.sqlite".into(),
        }
    }
}

impl TierFiles {
    pub fn file_for(&self, tier: TierId) -> &str {
        match tier {
            TierId::OpenCellId => &self.opencellid,
            TierId::Mozilla => &self.mozilla,
            TierId::Glm => &self.glm,
            TierId::UnwiredLabs => &self.unwiredlabs,
            TierId::Own => &self.own,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineSettings {
    /// Ask the next provider after one reports a cell as unknown
    #[serde(default)]
    pub continue_after_not_found: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Seconds between sweeps of all writable tiers; 0 disables the schedule
    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,
}

fn default_reconcile_interval() -> u64 {
    24 * 60 * 60
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between refreshes of the provider caches; 0 disables the schedule
    #[serde(default)]
    pub interval_secs: u64,
    /// Entries not rewritten for this many seconds are asked for again
    #[serde(default = "default_refresh_max_age")]
    pub max_age_secs: u64,
    /// Answers further than this from the cached position are rejected
    #[serde(default = "default_max_jump_km")]
    pub max_jump_km: f64,
}

fn default_refresh_max_age() -> u64 {
    30 * 24 * 60 * 60
}
fn default_max_jump_km() -> f64 {
    MAX_JUMP_KM
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            max_age_secs: default_refresh_max_age(),
            max_jump_km: default_max_jump_km(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "cellgeo.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CELLGEO__SERVER__PORT=8080
        builder = builder.add_source(
            Environment::with_prefix("CELLGEO")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.server.port, 5265);
        assert_eq!(cfg.storage.backend, StorageBackend::Sqlite);
        assert_eq!(cfg.providers.timeout_ms, 3000);
        assert_eq!(cfg.default_location, DefaultLocation::default());
        assert!(!cfg.pipeline.continue_after_not_found);
        assert!(cfg.refresh_interval().is_none());
        assert_eq!(cfg.refresh.max_age_secs, 2_592_000);
        assert_eq!(cfg.refresh_options(), RefreshOptions::default());
    }

    #[test]
    fn validation_errors() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.validate().unwrap_err().contains("server.port"));

        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));

        let mut cfg = AppConfig::default();
        cfg.default_location.lat = 91.0;
        assert!(cfg.validate().unwrap_err().contains("default_location.lat"));

        let mut cfg = AppConfig::default();
        cfg.default_location.lon = -180.5;
        assert!(cfg.validate().unwrap_err().contains("default_location.lon"));

        let mut cfg = AppConfig::default();
        cfg.providers.timeout_ms = 0;
        assert!(cfg.validate().unwrap_err().contains("timeout_ms"));

        let mut cfg = AppConfig::default();
        cfg.refresh.max_jump_km = 0.0;
        assert!(cfg.validate().unwrap_err().contains("refresh.max_jump_km"));
    }

    #[test]
    fn memory_backend_skips_file_checks() {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = StorageBackend::Memory;
        cfg.storage.data_dir = PathBuf::new();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn tier_file_paths() {
        let mut cfg = AppConfig::default();
        cfg.storage.data_dir = PathBuf::from("/var/lib/cellgeo");
        assert_eq!(
            cfg.storage.sqlite_for(TierId::OpenCellId).path,
            PathBuf::from("/var/lib/cellgeo/oci_cells.sqlite")
        );
        assert_eq!(
            cfg.storage.sqlite_for(TierId::Own).path,
            PathBuf::from("/var/lib/cellgeo/own_cells.sqlite")
        );
    }

    #[test]
    fn pipeline_options_combine_sections() {
        let mut cfg = AppConfig::default();
        cfg.pipeline.continue_after_not_found = true;
        cfg.default_location = DefaultLocation { lat: 1.5, lon: 2.5 };
        let opts = cfg.pipeline_options();
        assert!(opts.continue_after_not_found);
        assert_eq!(opts.default_location.lat, 1.5);
    }

    #[test]
    fn reconcile_interval_zero_disables() {
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.reconcile_interval(), Some(Duration::from_secs(86_400)));
        cfg.reconcile.interval_secs = 0;
        assert_eq!(cfg.reconcile_interval(), None);
    }
}
