use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

use crate::ProbeError;

const MAX_REDIRECTS: usize = 5;

pub(crate) fn client(timeout: Duration) -> Result<Client, ProbeError> {
    Ok(Client::builder()
        .redirect(Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .user_agent(format!("domainwatch/{}", env!("CARGO_PKG_VERSION")))
        .brotli(true)
        .gzip(true)
        .deflate(true)
        .build()?)
}

/// GET `url`; reachable iff the final status is 2xx.
pub(crate) async fn is_reachable(client: &Client, url: &Url) -> bool {
    match client.get(url.clone()).send().await {
        Ok(resp) => {
            let status = resp.status();
            if !status.is_success() {
                tracing::debug!(url = %url, status = status.as_u16(), "non-2xx response");
            }
            status.is_success()
        }
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "request failed");
            false
        }
    }
}
