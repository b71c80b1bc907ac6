// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::Config;

/// Create the shared asynchronous HTTP client.
///
/// The timeout applies to each request on its own, so one slow attempt costs
/// one retry rather than the whole scheme.
pub fn create_async_client(config: &Config) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.api.user_agent)
        .timeout(config.fetch.timeout())
        .connect_timeout(config.fetch.timeout().min(Duration::from_secs(10)))
        .build()?;
    Ok(client)
}
