use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Checks whether a media link still answers.
#[async_trait]
pub trait LinkProbe: Send + Sync {
    /// `true` only for a 2xx answer. Errors and timeouts count as dead.
    async fn is_live(&self, url: &str, identity: Option<&str>) -> bool;
}

/// Bodyless `HEAD` probe with a hard timeout.
pub struct HeadProbe {
    client: Client,
    timeout: Duration,
}

impl HeadProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            timeout,
        }
    }
}

#[async_trait]
impl LinkProbe for HeadProbe {
    async fn is_live(&self, url: &str, identity: Option<&str>) -> bool {
        let mut request = self.client.head(url).timeout(self.timeout);
        if let Some(ua) = identity {
            request = request.header(USER_AGENT, ua);
        }

        match request.send().await {
            Ok(resp) => {
                let live = resp.status().is_success();
                if !live {
                    debug!("[validate] {} answered {}", url, resp.status());
                }
                live
            }
            Err(e) => {
                debug!("[validate] {} unreachable: {}", url, e);
                false
            }
        }
    }
}
