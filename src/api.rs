use crate::cache::MediaCache;
use crate::config::Config;
use crate::extractor::{MediaRecord, Strictness};
use crate::resolver::{IdentityPool, ResolveError, TierPlan, TieredResolver, VideoRecovery};
use crate::upstream::{ScraperApiClient, Upstream};
use crate::validator::{HeadProbe, LinkProbe};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info_span, Instrument};
use uuid::Uuid;

const MEDIA_FAILURE: &str =
    "Failed to fetch TikTok media. Please try a different video or wait a few minutes.";
const RETRY_FAILURE: &str = "Video retry failed. Please try again later.";

#[derive(Clone)]
pub struct AppState {
    resolver: Arc<TieredResolver>,
    recovery: Arc<VideoRecovery>,
}

impl AppState {
    pub fn new(resolver: TieredResolver, recovery: VideoRecovery) -> Self {
        Self {
            resolver: Arc::new(resolver),
            recovery: Arc::new(recovery),
        }
    }

    /// Wire the real provider, probe and cache together from configuration.
    pub fn from_config(config: &Config) -> Self {
        let cache = MediaCache::new(config.cache_ttl());
        let upstream: Arc<dyn Upstream> = Arc::new(ScraperApiClient::new(config.scraper.clone()));
        let probe: Arc<dyn LinkProbe> = Arc::new(HeadProbe::new(config.validator_timeout()));

        let resolver = TieredResolver::new(
            upstream.clone(),
            probe.clone(),
            cache.clone(),
            TierPlan::from_config(&config.scraper),
        );
        let recovery = VideoRecovery::new(
            upstream,
            probe,
            cache,
            IdentityPool::new(config.recovery.user_agents.clone()),
            config.recovery.branches,
            config.scraper.render_max_cost,
        );

        Self::new(resolver, recovery)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/tiktok",
            post(resolve_media).fallback(method_not_allowed),
        )
        .route(
            "/api/tiktok/strict",
            post(resolve_media_strict).fallback(method_not_allowed),
        )
        .route(
            "/api/retry-video",
            post(retry_video).fallback(method_not_allowed),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    #[serde(flatten)]
    pub record: MediaRecord,
    #[serde(skip_serializing_if = "is_false")]
    pub cached: bool,
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub video: String,
    #[serde(skip_serializing_if = "is_false")]
    pub cached: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn resolve_media(
    State(state): State<AppState>,
    payload: Result<Json<MediaRequest>, JsonRejection>,
) -> Result<Json<MediaResponse>, ApiError> {
    resolve_with(state, requested_url(payload), Strictness::Lenient).await
}

async fn resolve_media_strict(
    State(state): State<AppState>,
    payload: Result<Json<MediaRequest>, JsonRejection>,
) -> Result<Json<MediaResponse>, ApiError> {
    resolve_with(state, requested_url(payload), Strictness::VideoRequired).await
}

async fn resolve_with(
    state: AppState,
    url: String,
    strictness: Strictness,
) -> Result<Json<MediaResponse>, ApiError> {
    let span = info_span!("resolve", request_id = %Uuid::new_v4(), ?strictness);
    let resolution = state
        .resolver
        .resolve(&url, strictness)
        .instrument(span)
        .await
        .map_err(ApiError::Media)?;

    Ok(Json(MediaResponse {
        record: resolution.record,
        cached: resolution.cached,
    }))
}

async fn retry_video(
    State(state): State<AppState>,
    payload: Result<Json<MediaRequest>, JsonRejection>,
) -> Result<Json<RetryResponse>, ApiError> {
    let url = requested_url(payload);
    let span = info_span!("retry", request_id = %Uuid::new_v4());
    let recovered = state
        .recovery
        .recover(&url)
        .instrument(span)
        .await
        .map_err(ApiError::Retry)?;

    Ok(Json(RetryResponse {
        video: recovered.video,
        cached: recovered.cached,
    }))
}

/// An unreadable body is treated the same as one without a URL.
fn requested_url(payload: Result<Json<MediaRequest>, JsonRejection>) -> String {
    payload
        .ok()
        .and_then(|Json(request)| request.url)
        .unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error(transparent)]
    Media(ResolveError),
    #[error(transparent)]
    Retry(ResolveError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "error": "Method not allowed" }),
            ),
            ApiError::Media(ResolveError::UpstreamExhausted { details }) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": MEDIA_FAILURE, "details": details }),
            ),
            ApiError::Retry(ResolveError::UpstreamExhausted { .. }) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": RETRY_FAILURE }),
            ),
            ApiError::Media(err) | ApiError::Retry(err) => {
                let status = match err {
                    ResolveError::MissingUrl | ResolveError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, json!({ "error": err.to_string() }))
            }
        };
        (status, Json(body)).into_response()
    }
}
