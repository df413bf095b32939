//! Liveness probe client.
//!
//! Lets a caller find out whether a relay already answers on a port before
//! trying to start its own.

use std::time::Duration;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Check whether a relay answers on `localhost:<port>`.
pub async fn is_relay_running(port: u16) -> bool {
    is_relay_running_at(&format!("http://localhost:{}/", port)).await
}

/// Check whether a plain GET on `url` succeeds.
pub async fn is_relay_running_at(url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            debug!(error = %e, "Failed to build probe client");
            return false;
        }
    };

    match client.get(url).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            debug!(url = %url, error = %e, "Relay probe failed");
            false
        }
    }
}
