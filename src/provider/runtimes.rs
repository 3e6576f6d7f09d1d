use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AuditError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct RuntimeCatalogue {
    deprecated_runtimes: Vec<String>,
}

pub fn parse_runtime_catalogue(body: &str) -> Result<Vec<String>, AuditError> {
    let catalogue: RuntimeCatalogue = serde_json::from_str(body)?;
    Ok(catalogue.deprecated_runtimes)
}

async fn fetch_catalogue(url: &str) -> Result<Vec<String>, AuditError> {
    let client = Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| AuditError::Network(format!("Failed to build HTTP client: {}", e)))?;

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| AuditError::Network(format!("Runtime catalogue request failed: {}", e)))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(AuditError::Network(format!(
            "Runtime catalogue returned status {}",
            status
        )));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| AuditError::Network(format!("Failed to read runtime catalogue: {}", e)))?;
    parse_runtime_catalogue(&body)
}

/// Deprecated runtimes from `url`, or `fallback` when no URL is configured
/// or the fetch fails. Fetched once per run.
pub async fn fetch_deprecated_runtimes(url: Option<&str>, fallback: &[String]) -> Vec<String> {
    let Some(url) = url else {
        return fallback.to_vec();
    };
    match fetch_catalogue(url).await {
        Ok(runtimes) => {
            info!(url, count = runtimes.len(), "Fetched deprecated runtime catalogue");
            runtimes
        }
        Err(e) => {
            warn!(url, error = %e, "Using configured deprecated runtimes");
            fallback.to_vec()
        }
    }
}
