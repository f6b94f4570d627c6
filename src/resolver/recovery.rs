use super::{check_target, Attempt, AttemptFailure, IdentityPool, ResolveError};
use crate::cache::{CacheKey, MediaCache, Namespace};
use crate::extractor::{extract_video, MediaRecord};
use crate::upstream::{Upstream, UpstreamRequest};
use crate::validator::LinkProbe;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub video: String,
    pub cached: bool,
}

/// Repairs a dead video link by asking for the page again under several identities at once.
pub struct VideoRecovery {
    upstream: Arc<dyn Upstream>,
    probe: Arc<dyn LinkProbe>,
    cache: MediaCache,
    identities: IdentityPool,
    branches: usize,
    max_cost: u32,
}

impl VideoRecovery {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        probe: Arc<dyn LinkProbe>,
        cache: MediaCache,
        identities: IdentityPool,
        branches: usize,
        max_cost: u32,
    ) -> Self {
        Self {
            upstream,
            probe,
            cache,
            identities,
            branches,
            max_cost,
        }
    }

    pub async fn recover(&self, target_url: &str) -> Result<Recovered, ResolveError> {
        let target = check_target(target_url)?;
        let key = CacheKey::new(Namespace::Video, target);

        if let Some(video) = self.cache.get(&key).await.and_then(|r| r.video) {
            info!("[retry] cache hit for {}", target);
            return Ok(Recovered {
                video,
                cached: true,
            });
        }

        let identities = self.identities.draw(self.branches);
        // Every branch runs to completion; credits are spent once a request is out.
        let outcomes = join_all(
            identities
                .iter()
                .map(|identity| self.branch(target, identity)),
        )
        .await;

        let mut winner = None;
        let mut last_failure = None;
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Attempt::Resolved(video) => {
                    if winner.is_none() {
                        winner = Some((index + 1, video));
                    }
                }
                Attempt::Transient(failure) => {
                    warn!("[retry] branch {} failed: {}", index + 1, failure);
                    last_failure = Some(failure);
                }
                Attempt::Fatal(err) => return Err(err),
            }
        }

        match winner {
            Some((branch, video)) => {
                info!("[retry] branch {} recovered video", branch);
                let record = MediaRecord {
                    video: Some(video.clone()),
                    ..Default::default()
                };
                self.cache.set(key, record).await;
                Ok(Recovered {
                    video,
                    cached: false,
                })
            }
            None => Err(ResolveError::UpstreamExhausted {
                details: last_failure
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            }),
        }
    }

    /// Recover the video and write it into a record the caller already holds.
    pub async fn repair(
        &self,
        target_url: &str,
        record: &mut MediaRecord,
    ) -> Result<Recovered, ResolveError> {
        let recovered = self.recover(target_url).await?;
        record.merge_video(recovered.video.clone());
        Ok(recovered)
    }

    async fn branch(&self, target: &str, identity: &str) -> Attempt<String> {
        let request = UpstreamRequest::rendered(target, self.max_cost).with_identity(identity);
        let response = match self.upstream.fetch(&request).await {
            Ok(response) => response,
            Err(e) => return Attempt::from_upstream(e),
        };

        let Some(video) = extract_video(&response.body) else {
            return Attempt::Transient(AttemptFailure::ExtractionMiss);
        };

        if self.probe.is_live(&video, Some(identity)).await {
            Attempt::Resolved(video)
        } else {
            Attempt::Transient(AttemptFailure::ValidationFailed)
        }
    }
}
