mod identity;
mod recovery;
mod tiered;

#[cfg(test)]
pub(crate) mod testing;

pub use identity::IdentityPool;
pub use recovery::{Recovered, VideoRecovery};
pub use tiered::{Resolution, Tier, TierPlan, TieredResolver};

use crate::extractor::{is_supported_target, MediaRecord};
use crate::upstream::UpstreamError;
use crate::validator::LinkProbe;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Missing URL")]
    MissingUrl,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Configuration(String),
    #[error("All upstream attempts failed: {details}")]
    UpstreamExhausted { details: String },
}

/// Why a single tier or branch came back empty-handed.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error(transparent)]
    Upstream(UpstreamError),
    #[error("No media URLs found in page")]
    ExtractionMiss,
    #[error("No valid media URLs after validation")]
    ValidationFailed,
}

/// Outcome of one upstream round trip.
#[derive(Debug)]
pub enum Attempt<T> {
    Resolved(T),
    /// Worth moving on to the next tier or branch.
    Transient(AttemptFailure),
    /// Stop everything.
    Fatal(ResolveError),
}

impl<T> Attempt<T> {
    fn from_upstream(err: UpstreamError) -> Self {
        if err.is_fatal() {
            Attempt::Fatal(ResolveError::Configuration(err.to_string()))
        } else {
            Attempt::Transient(AttemptFailure::Upstream(err))
        }
    }
}

fn check_target(target_url: &str) -> Result<&str, ResolveError> {
    let target = target_url.trim();
    if target.is_empty() {
        return Err(ResolveError::MissingUrl);
    }
    if !is_supported_target(target) {
        return Err(ResolveError::InvalidUrl(target.to_string()));
    }
    Ok(target)
}

/// Probe every link the record carries and drop the dead ones.
async fn validate_record(probe: &dyn LinkProbe, record: &mut MediaRecord, identity: Option<&str>) {
    let fields = [
        ("video", &mut record.video),
        ("audio", &mut record.audio),
        ("thumbnail", &mut record.thumbnail),
    ];

    for (name, field) in fields {
        let live = match field.as_deref() {
            Some(url) => probe.is_live(url, identity).await,
            None => continue,
        };
        if !live {
            warn!("[validate] dropping dead {} link", name);
            *field = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticProbe;
    use super::*;

    #[test]
    fn test_check_target() {
        assert!(matches!(check_target("   "), Err(ResolveError::MissingUrl)));
        assert!(matches!(check_target("tiktok"), Err(ResolveError::InvalidUrl(_))));
        assert_eq!(
            check_target(" https://www.tiktok.com/@a/video/1 ").unwrap(),
            "https://www.tiktok.com/@a/video/1"
        );
    }

    #[tokio::test]
    async fn test_validate_record_nulls_dead_fields_only() {
        let probe = StaticProbe::new(&["https://cdn.example/v.mp4"]);
        let mut record = MediaRecord {
            video: Some("https://cdn.example/v.mp4".into()),
            audio: Some("https://cdn.example/expired.mp3".into()),
            thumbnail: None,
            title: Some("kept".into()),
            credit_used: 10,
        };

        validate_record(&probe, &mut record, None).await;

        assert_eq!(record.video.as_deref(), Some("https://cdn.example/v.mp4"));
        assert!(record.audio.is_none());
        assert_eq!(record.title.as_deref(), Some("kept"));
        assert_eq!(probe.probed().len(), 2);
    }

    #[test]
    fn test_missing_credential_is_fatal_attempt() {
        let attempt: Attempt<()> = Attempt::from_upstream(UpstreamError::MissingCredential);
        assert!(matches!(attempt, Attempt::Fatal(ResolveError::Configuration(_))));

        let attempt: Attempt<()> = Attempt::from_upstream(UpstreamError::Status(503));
        assert!(matches!(
            attempt,
            Attempt::Transient(AttemptFailure::Upstream(UpstreamError::Status(503)))
        ));
    }
}
