// cpx-common/src/cache.rs
// Response cache for registry lookups.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::error::{CpxError, Result};
use crate::Config;

/// Stores raw registry response bodies on disk, one file per request path.
pub struct Cache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Create a new Cache using the config's cache_dir and TTL
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_ttl(config.cache_dir(), config.cache_ttl)
    }

    pub fn with_ttl(cache_dir: &Path, ttl: Duration) -> Result<Self> {
        if !cache_dir.exists() {
            fs::create_dir_all(cache_dir)?;
        }
        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            ttl,
        })
    }

    pub fn get_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Maps a request path such as `module/Moose::Role` to a flat file name.
    ///
    /// The escaping is reversible, so distinct paths never share a file:
    /// `_` becomes `__`, `/` becomes `_s`, `:` becomes `_c` and any other byte
    /// outside `[A-Za-z0-9.-]` becomes `_x` followed by two hex digits.
    pub fn key_for(request_path: &str) -> String {
        let mut key = String::with_capacity(request_path.len() + 5);
        for c in request_path.trim_matches('/').chars() {
            match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' => key.push(c),
                '_' => key.push_str("__"),
                '/' => key.push_str("_s"),
                ':' => key.push_str("_c"),
                other => {
                    let mut buf = [0u8; 4];
                    for byte in other.encode_utf8(&mut buf).bytes() {
                        key.push_str(&format!("_x{byte:02x}"));
                    }
                }
            }
        }
        key.push_str(".json");
        key
    }

    pub fn store_raw(&self, filename: &str, data: &str) -> Result<()> {
        let path = self.cache_dir.join(filename);
        tracing::debug!("Saving raw data to cache file: {:?}", path);
        fs::write(&path, data)?;
        Ok(())
    }

    pub fn load_raw(&self, filename: &str) -> Result<String> {
        let path = self.cache_dir.join(filename);
        tracing::debug!("Loading raw data from cache file: {:?}", path);

        if !path.exists() {
            return Err(CpxError::Cache(format!(
                "Cache file {filename} does not exist"
            )));
        }

        fs::read_to_string(&path).map_err(|e| CpxError::Cache(format!("IO error: {e}")))
    }

    /// Checks if a cache file exists and is within TTL
    pub fn is_cache_valid(&self, filename: &str) -> Result<bool> {
        let path = self.cache_dir.join(filename);
        if !path.exists() {
            return Ok(false);
        }

        let modified_time = fs::metadata(&path)?.modified()?;
        let age = SystemTime::now()
            .duration_since(modified_time)
            .map_err(|e| CpxError::Cache(format!("System time error: {e}")))?;

        Ok(age <= self.ttl)
    }

    pub fn clear_file(&self, filename: &str) -> Result<()> {
        let path = self.cache_dir.join(filename);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    pub fn clear_all(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}
