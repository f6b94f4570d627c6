mod tiktok;
mod types;

pub use tiktok::{
    match_meta_field, match_url_field, normalize_payload, Escaping, MetaField, Quoting,
    TikTokExtractor, UrlField,
};
pub use types::*;

use url::Url;

/// Parse a raw page or API payload into a media record.
pub fn extract_media(payload: &str, strictness: Strictness) -> Option<MediaRecord> {
    TikTokExtractor::parse(payload, strictness)
}

/// Parse only the video link out of a payload.
pub fn extract_video(payload: &str) -> Option<String> {
    TikTokExtractor::parse_video(payload)
}

/// Check a caller-supplied target before any credits are spent on it.
pub fn is_supported_target(target: &str) -> bool {
    Url::parse(target.trim())
        .map(|url| TikTokExtractor::matches(&url))
        .unwrap_or(false)
}
