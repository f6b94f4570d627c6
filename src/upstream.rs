use crate::config::ScraperConfig;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

const CREDIT_COST_HEADER: &str = "sa-credit-cost";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Missing SCRAPERAPI_KEY env var")]
    MissingCredential,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Scraper returned HTTP {0}")]
    Status(u16),
}

impl UpstreamError {
    /// Fatal errors abort the whole pipeline instead of falling through to the next tier.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UpstreamError::MissingCredential)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub target_url: String,
    pub render: bool,
    pub max_cost: u32,
    pub identity: Option<String>,
}

impl UpstreamRequest {
    pub fn basic(target_url: &str, max_cost: u32) -> Self {
        Self {
            target_url: target_url.to_string(),
            render: false,
            max_cost,
            identity: None,
        }
    }

    pub fn rendered(target_url: &str, max_cost: u32) -> Self {
        Self {
            render: true,
            ..Self::basic(target_url, max_cost)
        }
    }

    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identity = Some(identity.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub body: String,
    pub credit_used: u32,
}

/// A scraping provider that fetches a page on our behalf.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

pub struct ScraperApiClient {
    client: Client,
    config: ScraperConfig,
}

impl ScraperApiClient {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            client: Client::builder().gzip(true).build().unwrap_or_default(),
            config,
        }
    }

    fn build_url(&self, api_key: &str, request: &UpstreamRequest) -> String {
        let mut url = format!(
            "{}?api_key={}&url={}&render={}&max_cost={}",
            self.config.endpoint,
            urlencoding::encode(api_key),
            urlencoding::encode(&request.target_url),
            request.render,
            request.max_cost
        );
        // The identity travels as our own User-Agent; ask the provider to forward it.
        if request.identity.is_some() {
            url.push_str("&keep_headers=true");
        }
        url
    }
}

#[async_trait]
impl Upstream for ScraperApiClient {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(UpstreamError::MissingCredential)?;

        debug!(
            "[scrape] GET {} render={} max_cost={}",
            request.target_url, request.render, request.max_cost
        );

        let mut req = self
            .client
            .get(self.build_url(api_key, request))
            .timeout(self.config.timeout(request.render));
        if let Some(ua) = &request.identity {
            req = req.header(USER_AGENT, ua);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(UpstreamError::Status(resp.status().as_u16()));
        }

        let credit_used = resp
            .headers()
            .get(CREDIT_COST_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_credit_cost)
            .unwrap_or(request.max_cost);

        let body = resp.text().await?;
        Ok(UpstreamResponse { body, credit_used })
    }
}

fn parse_credit_cost(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    raw.parse::<u32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|c| *c >= 0.0).map(|c| c.ceil() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;

    async fn spawn_provider() -> String {
        let app = Router::new()
            .route(
                "/",
                get(
                    |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                        let ua = headers
                            .get("user-agent")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string();
                        let body = serde_json::json!({ "params": params, "ua": ua }).to_string();
                        ([(CREDIT_COST_HEADER, "5")], body).into_response()
                    },
                ),
            )
            .route("/nocost", get(|| async { "<html></html>" }))
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(endpoint: String, api_key: Option<&str>) -> ScraperApiClient {
        ScraperApiClient::new(ScraperConfig {
            api_key: api_key.map(String::from),
            endpoint,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let upstream = client("http://127.0.0.1:9".into(), None);
        let err = upstream
            .fetch(&UpstreamRequest::basic("https://www.tiktok.com/@a/video/1", 10))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::MissingCredential));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_forwards_parameters_and_reads_cost_header() {
        let base = spawn_provider().await;
        let upstream = client(format!("{}/", base), Some("key-1"));

        let request =
            UpstreamRequest::rendered("https://www.tiktok.com/@a/video/1?lang=en", 20).with_identity("agent-x");
        let resp = upstream.fetch(&request).await.unwrap();
        assert_eq!(resp.credit_used, 5);

        let echoed: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(echoed["params"]["api_key"], "key-1");
        assert_eq!(echoed["params"]["url"], "https://www.tiktok.com/@a/video/1?lang=en");
        assert_eq!(echoed["params"]["render"], "true");
        assert_eq!(echoed["params"]["max_cost"], "20");
        assert_eq!(echoed["params"]["keep_headers"], "true");
        assert_eq!(echoed["ua"], "agent-x");
    }

    #[tokio::test]
    async fn test_missing_cost_header_assumes_ceiling() {
        let base = spawn_provider().await;
        let upstream = client(format!("{}/nocost", base), Some("key-1"));

        let resp = upstream
            .fetch(&UpstreamRequest::basic("https://www.tiktok.com/@a/video/1", 10))
            .await
            .unwrap();
        assert_eq!(resp.credit_used, 10);
        assert_eq!(resp.body, "<html></html>");
    }

    #[tokio::test]
    async fn test_provider_error_status_is_transient() {
        let base = spawn_provider().await;
        let upstream = client(format!("{}/broken", base), Some("key-1"));

        let err = upstream
            .fetch(&UpstreamRequest::basic("https://www.tiktok.com/@a/video/1", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status(500)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_parse_credit_cost() {
        assert_eq!(parse_credit_cost("10"), Some(10));
        assert_eq!(parse_credit_cost(" 1.5 "), Some(2));
        assert_eq!(parse_credit_cost("lots"), None);
        assert_eq!(parse_credit_cost("-3"), None);
    }
}
