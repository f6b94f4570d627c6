use crate::extractor::MediaRecord;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Keeps the full-record and video-repair pipelines from reading each other's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Full record, video or audio is enough.
    Media,
    /// Full record, video required.
    StrictMedia,
    /// Repaired video link only.
    Video,
}

impl Namespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Media => "tiktok",
            Namespace::StrictMedia => "tiktok-strict",
            Namespace::Video => "tiktok-video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(namespace: Namespace, target_url: &str) -> Self {
        Self(format!("{}:{}", namespace.prefix(), normalize_target(target_url)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize_target(target_url: &str) -> String {
    let trimmed = target_url.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: MediaRecord,
    inserted_at: DateTime<Utc>,
}

/// Longest TTL moka accepts (1000 years); its builder panics above this.
pub const MAX_TTL_SECS: u64 = 1000 * 365 * 24 * 60 * 60;

/// TTL-bounded store of resolved records. Expiry is the only eviction.
///
/// A zero TTL means entries never expire.
#[derive(Clone)]
pub struct MediaCache {
    entries: Cache<CacheKey, CacheEntry>,
    ttl: Option<Duration>,
}

impl MediaCache {
    pub fn new(ttl: Duration) -> Self {
        let ttl = (!ttl.is_zero()).then(|| ttl.min(Duration::from_secs(MAX_TTL_SECS)));
        let entries = match ttl {
            Some(ttl) => Cache::builder().time_to_live(ttl).build(),
            None => Cache::builder().build(),
        };
        Self { entries, ttl }
    }

    /// `None` when entries never expire.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub async fn get(&self, key: &CacheKey) -> Option<MediaRecord> {
        let entry = self.entries.get(key).await?;

        let age = Utc::now() - entry.inserted_at;
        if let Some(ttl) = self.ttl {
            if age.to_std().unwrap_or_default() >= ttl {
                return None;
            }
        }

        debug!("[cache] hit {} (age {}s)", key, age.num_seconds());
        Some(entry.record)
    }

    pub async fn set(&self, key: CacheKey, record: MediaRecord) {
        debug!("[cache] store {}", key);
        self.entries
            .insert(
                key,
                CacheEntry {
                    record,
                    inserted_at: Utc::now(),
                },
            )
            .await;
    }
}
