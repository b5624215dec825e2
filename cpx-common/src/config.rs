// cpx-common/src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::error::{CpxError, Result};

pub const DEFAULT_MANIFEST_FILENAME: &str = "cpanfile";
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_REGISTRY_URL: &str = "https://fastapi.metacpan.org/v1";
pub const DEFAULT_INSTALL_COMMAND: &str = "cpanm --notest --quiet";
const DEFAULT_CACHE_DIRNAME: &str = "cpx-cache";
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub manifest_path: PathBuf,
    pub worker_count: usize,
    pub use_cache: bool,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub registry_url: String,
    pub extra_ignores: Vec<String>,
    pub install_command: String,
}

impl Config {
    /// Builds a configuration from defaults and `CPX_*` environment variables.
    pub fn load() -> Result<Self> {
        debug!("Loading cpx configuration");
        let mut config = Self::default();

        if let Some(path) = env_non_empty("CPX_MANIFEST") {
            config.manifest_path = PathBuf::from(path);
        }
        if let Some(raw) = env_non_empty("CPX_WORKERS") {
            config.worker_count = raw.parse::<usize>().map_err(|e| {
                CpxError::Config(format!("CPX_WORKERS must be a positive integer, got '{raw}': {e}"))
            })?;
        }
        if let Some(raw) = env_non_empty("CPX_USE_CACHE") {
            config.use_cache = matches!(raw.as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(dir) = env_non_empty("CPX_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(raw) = env_non_empty("CPX_CACHE_TTL") {
            config.cache_ttl = humantime::parse_duration(&raw).map_err(|e| {
                CpxError::Config(format!("CPX_CACHE_TTL is not a valid duration '{raw}': {e}"))
            })?;
        }
        if let Some(url) = env_non_empty("CPX_REGISTRY_URL") {
            config.registry_url = url.trim_end_matches('/').to_string();
        }
        if let Some(list) = env_non_empty("CPX_IGNORE") {
            config.extra_ignores = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(cmd) = env_non_empty("CPX_INSTALL_CMD") {
            config.install_command = cmd;
        }

        debug!(
            "Configuration loaded: manifest={}, workers={}, cache={} ({}), registry={}",
            config.manifest_path.display(),
            config.worker_count,
            config.use_cache,
            config.cache_dir.display(),
            config.registry_url
        );
        Ok(config)
    }

    /// Rejects settings that would make resolution or scheduling meaningless.
    /// Runs before any registry traffic.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(CpxError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        if !self.manifest_path.is_file() {
            return Err(CpxError::Config(format!(
                "manifest not found: {}",
                self.manifest_path.display()
            )));
        }
        if self.use_cache {
            fs::create_dir_all(&self.cache_dir).map_err(|e| {
                CpxError::Config(format!(
                    "cache directory {} cannot be created: {e}",
                    self.cache_dir.display()
                ))
            })?;
            fs::read_dir(&self.cache_dir).map_err(|e| {
                CpxError::Config(format!(
                    "cache directory {} is not readable: {e}",
                    self.cache_dir.display()
                ))
            })?;
        }
        if self.install_command.split_whitespace().next().is_none() {
            return Err(CpxError::Config("install command is empty".to_string()));
        }
        Ok(())
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_FILENAME),
            worker_count: DEFAULT_WORKER_COUNT,
            use_cache: false,
            cache_dir: env::temp_dir().join(DEFAULT_CACHE_DIRNAME),
            cache_ttl: DEFAULT_CACHE_TTL,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            extra_ignores: Vec::new(),
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}
