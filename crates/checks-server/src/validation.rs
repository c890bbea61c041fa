//! Validation of checks submitted through the API.

use crate::types::CheckInput;
use checks::{Check, CheckId, CheckMethod};
use common::{Error, Result};
use tracing::debug;

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Turn a raw request body into a check, or explain why it is not one.
///
/// With `resolve_hosts` the target host must resolve, which rejects typos
/// before they turn into a stream of `ENOTFOUND` outcomes.
pub async fn validate_check(body: &str, resolve_hosts: bool) -> Result<Check> {
    let input: CheckInput = serde_json::from_str(body).map_err(|e| {
        Error::validation(format!("The payload is not valid JSON: {}", e))
    })?;

    let raw_url = input
        .url
        .ok_or_else(|| Error::validation("The url is missing"))?;
    let url = reqwest::Url::parse(&raw_url)
        .map_err(|e| Error::validation(format!("The url '{}' is not a valid url: {}", raw_url, e)))?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(Error::validation(format!(
            "The protocol '{}' is not supported",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| Error::validation(format!("The url '{}' has no host", raw_url)))?;

    if resolve_hosts {
        let port = url.port_or_known_default().unwrap_or(80);
        let resolved = tokio::net::lookup_host((host, port)).await.map_err(|e| {
            Error::validation(format!("The host of '{}' could not be resolved: {}", raw_url, e))
        })?;
        debug!(host, addrs = resolved.count(), "Check host resolved");
    }

    let method: CheckMethod = input
        .method
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(Error::validation)?;

    Ok(Check::new(raw_url, method, input.payload))
}

/// Parse an id taken from a query string.
pub fn validate_id(id: Option<&str>) -> Result<CheckId> {
    let id = id.unwrap_or_default();
    CheckId::parse(id).map_err(Error::validation)
}
