use super::{check_target, validate_record, Attempt, AttemptFailure, ResolveError};
use crate::cache::{CacheKey, MediaCache, Namespace};
use crate::config::ScraperConfig;
use crate::extractor::{extract_media, MediaRecord, Strictness};
use crate::upstream::{Upstream, UpstreamRequest};
use crate::validator::LinkProbe;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Credit ceilings and retry count for the cheap-then-rendered ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPlan {
    pub basic_max_cost: u32,
    pub render_max_cost: u32,
    pub render_retries: u32,
}

impl TierPlan {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            basic_max_cost: config.basic_max_cost,
            render_max_cost: config.render_max_cost,
            render_retries: config.render_retries,
        }
    }

    pub fn tiers(&self) -> Vec<Tier> {
        std::iter::once(Tier::Basic)
            .chain((1..=self.render_retries).map(|attempt| Tier::Rendered { attempt }))
            .collect()
    }

    fn request(&self, tier: Tier, target_url: &str) -> UpstreamRequest {
        match tier {
            Tier::Basic => UpstreamRequest::basic(target_url, self.basic_max_cost),
            Tier::Rendered { .. } => UpstreamRequest::rendered(target_url, self.render_max_cost),
        }
    }
}

impl Default for TierPlan {
    fn default() -> Self {
        Self::from_config(&ScraperConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Basic,
    Rendered { attempt: u32 },
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Basic => write!(f, "basic request"),
            Tier::Rendered { attempt } => write!(f, "render attempt {}", attempt),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: MediaRecord,
    pub cached: bool,
}

/// Full-record pipeline: cache, then a cheap scrape, then rendered retries.
pub struct TieredResolver {
    upstream: Arc<dyn Upstream>,
    probe: Arc<dyn LinkProbe>,
    cache: MediaCache,
    plan: TierPlan,
}

impl TieredResolver {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        probe: Arc<dyn LinkProbe>,
        cache: MediaCache,
        plan: TierPlan,
    ) -> Self {
        Self {
            upstream,
            probe,
            cache,
            plan,
        }
    }

    pub async fn resolve(
        &self,
        target_url: &str,
        strictness: Strictness,
    ) -> Result<Resolution, ResolveError> {
        let target = check_target(target_url)?;
        let key = CacheKey::new(namespace_for(strictness), target);

        if let Some(record) = self.cache.get(&key).await {
            info!("[scrape] cache hit for {}", target);
            return Ok(Resolution {
                record,
                cached: true,
            });
        }

        let mut last_failure = None;
        for tier in self.plan.tiers() {
            match self.attempt(target, tier, strictness).await {
                Attempt::Resolved(record) => {
                    info!("[scrape] {} success, credits: {}", tier, record.credit_used);
                    self.cache.set(key, record.clone()).await;
                    return Ok(Resolution {
                        record,
                        cached: false,
                    });
                }
                Attempt::Transient(failure) => {
                    warn!("[scrape] {} failed: {}", tier, failure);
                    last_failure = Some(failure);
                }
                Attempt::Fatal(err) => return Err(err),
            }
        }

        Err(ResolveError::UpstreamExhausted {
            details: last_failure
                .map(|f| f.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
        })
    }

    async fn attempt(&self, target: &str, tier: Tier, strictness: Strictness) -> Attempt<MediaRecord> {
        let request = self.plan.request(tier, target);
        let response = match self.upstream.fetch(&request).await {
            Ok(response) => response,
            Err(e) => return Attempt::from_upstream(e),
        };

        let Some(mut record) = extract_media(&response.body, strictness) else {
            return Attempt::Transient(AttemptFailure::ExtractionMiss);
        };
        record.credit_used = response.credit_used;

        validate_record(self.probe.as_ref(), &mut record, None).await;
        if strictness.accepts(&record) {
            Attempt::Resolved(record)
        } else {
            Attempt::Transient(AttemptFailure::ValidationFailed)
        }
    }
}

fn namespace_for(strictness: Strictness) -> Namespace {
    match strictness {
        Strictness::Lenient => Namespace::Media,
        Strictness::VideoRequired => Namespace::StrictMedia,
    }
}
