use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::config::ScrapeConfig;

/// Blocking client with the fixed User-Agent and per-request timeout.
/// One client serves the whole run.
pub fn build_client(cfg: &ScrapeConfig) -> Result<Client> {
    Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(Duration::from_secs(cfg.request_timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

/// GET a page and return its body. Non-2xx statuses are errors.
pub fn get_text(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> reqwest::Result<String> {
    client
        .get(url)
        .query(query)
        .send()?
        .error_for_status()?
        .text()
}
