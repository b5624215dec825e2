// cpx-net/src/http.rs
use std::sync::Arc;
use std::time::Duration;

use cpx_common::cache::Cache;
use cpx_common::config::Config;
use cpx_common::error::{CpxError, Result};
use cpx_common::registry::{DistributionRef, ModuleInfo, Registry, ReleaseInfo};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::validation::{is_loopback, validate_registry_url};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "cpx parallel installer (Rust; +https://github.com/cpx-rs/cpx)";

/// Blocking client for the MetaCPAN API, optionally backed by a response cache.
pub struct MetaCpanClient {
    client: Client,
    base_url: Url,
    cache: Option<Arc<Cache>>,
}

impl MetaCpanClient {
    /// Builds a client for `config.registry_url`, attaching the response cache
    /// when `config.use_cache` is set.
    pub fn new(config: &Config) -> Result<Self> {
        let cache = if config.use_cache {
            Some(Arc::new(Cache::new(config).map_err(|e| {
                CpxError::Config(format!(
                    "Could not initialize cache at {}: {e}",
                    config.cache_dir().display()
                ))
            })?))
        } else {
            None
        };
        Self::with_cache(&config.registry_url, cache)
    }

    pub fn with_cache(registry_url: &str, cache: Option<Arc<Cache>>) -> Result<Self> {
        let base_url = validate_registry_url(registry_url.trim_end_matches('/'))?;
        let client = build_http_client(is_loopback(&base_url))?;
        debug!(
            "Registry client for {} (cache: {})",
            base_url,
            cache.as_ref().map_or("off".to_string(), |c| c.get_dir().display().to_string())
        );
        Ok(Self {
            client,
            base_url,
            cache,
        })
    }

    fn endpoint(&self, request_path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            request_path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| CpxError::ValidationError(format!("Bad request URL '{joined}': {e}")))
    }

    fn fetch_json<T: DeserializeOwned>(&self, request_path: &str) -> Result<T> {
        let body = self.fetch_raw(request_path)?;
        serde_json::from_str(&body).map_err(|e| {
            CpxError::Registry(format!("Malformed response for {request_path}: {e}"))
        })
    }

    fn fetch_raw(&self, request_path: &str) -> Result<String> {
        let cache_key = Cache::key_for(request_path);
        if let Some(cache) = &self.cache {
            if cache.is_cache_valid(&cache_key).unwrap_or(false) {
                match cache.load_raw(&cache_key) {
                    Ok(body) => {
                        debug!("Cache hit for {}", request_path);
                        return Ok(body);
                    }
                    Err(e) => debug!("Cache read failed for {}: {}", request_path, e),
                }
            }
        }

        let url = self.endpoint(request_path)?;
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().map_err(|e| {
            debug!("HTTP request failed for {url}: {e}");
            CpxError::from(e)
        })?;
        let status = response.status();
        debug!("Received HTTP status: {} for {}", status, url);

        match status {
            StatusCode::NOT_FOUND => {
                return Err(CpxError::NotFound(format!("{request_path} (404)")));
            }
            s if !s.is_success() => {
                return Err(CpxError::Registry(format!("HTTP error {s} for URL {url}")));
            }
            _ => {}
        }

        let body = response.text()?;
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store_raw(&cache_key, &body) {
                warn!("Could not cache response for {}: {}", request_path, e);
            }
        }
        Ok(body)
    }
}

impl Registry for MetaCpanClient {
    #[instrument(skip(self))]
    fn lookup_module(&self, name: &str) -> Result<ModuleInfo> {
        self.fetch_json(&format!("module/{name}"))
    }

    #[instrument(skip(self, dist), fields(dist = %dist))]
    fn lookup_release(&self, dist: &DistributionRef) -> Result<ReleaseInfo> {
        self.fetch_json(&dist.request_path())
    }
}

fn build_http_client(loopback: bool) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10));
    if loopback {
        builder = builder.no_proxy();
    }
    builder
        .build()
        .map_err(|e| CpxError::Generic(format!("Failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_onto_base_path() {
        let client = MetaCpanClient::with_cache("https://fastapi.metacpan.org/v1/", None).unwrap();
        assert_eq!(
            client.endpoint("module/Moose::Role").unwrap().as_str(),
            "https://fastapi.metacpan.org/v1/module/Moose::Role"
        );
        assert_eq!(
            client.endpoint("/release/ETHER/Moose-2.2206").unwrap().as_str(),
            "https://fastapi.metacpan.org/v1/release/ETHER/Moose-2.2206"
        );
    }

    #[test]
    fn plain_http_to_remote_host_is_refused() {
        assert!(MetaCpanClient::with_cache("http://cpan.example.org/v1", None).is_err());
    }

    #[test]
    fn cached_responses_skip_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(Cache::with_ttl(dir.path(), Duration::from_secs(600)).unwrap());
        cache
            .store_raw(
                &Cache::key_for("module/Moo"),
                r#"{"distribution":"Moo","author":"HAARG","version":"2.005005","release":"Moo-2.005005"}"#,
            )
            .unwrap();

        // Unroutable host: any network attempt would fail the lookup.
        let client = MetaCpanClient::with_cache("https://registry.invalid/v1", Some(cache)).unwrap();
        let module = client.lookup_module("Moo").unwrap();
        assert_eq!(module.distribution, "Moo");
        assert_eq!(module.author, "HAARG");
    }
}
