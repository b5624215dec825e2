// cpx-net/src/validation.rs
use cpx_common::error::{CpxError, Result};
use url::{Host, Url};

/// Validates a registry base URL: https anywhere, plain http only for loopback
/// mirrors.
pub fn validate_registry_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str)
        .map_err(|e| CpxError::ValidationError(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback(&url) => Ok(url),
        scheme => Err(CpxError::ValidationError(format!(
            "Invalid URL scheme for '{url_str}': must be https (or http to a loopback host), got '{scheme}'"
        ))),
    }
}

pub fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
