//! Shared plumbing for the provider HTTP clients.

use std::time::Duration;

use nimbus_core::NetworkError;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::WeatherError;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, WeatherError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Decode a provider response, mapping non-success statuses to network errors.
pub(crate) async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, WeatherError> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| WeatherError::Parse(format!("JSON parse error: {}", e)))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(NetworkError::from_status(status.as_u16(), &text).into())
    }
}
