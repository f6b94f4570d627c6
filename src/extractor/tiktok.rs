use super::types::*;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use url::Url;

static UNICODE_ESCAPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\u([0-9A-Fa-f]{4})(?:\\u([dD][c-fC-F][0-9A-Fa-f]{2}))?").unwrap()
});

static VIDEO_PATTERNS: LazyLock<UrlPatterns> =
    LazyLock::new(|| UrlPatterns::new(r#""downloadAddr":"#));

static AUDIO_PATTERNS: LazyLock<UrlPatterns> =
    LazyLock::new(|| UrlPatterns::new(r#""music":\{[^}]*"playUrl":"#));

static THUMBNAIL_PATTERNS: LazyLock<MetaPatterns> =
    LazyLock::new(|| MetaPatterns::new("og:image"));

static TITLE_PATTERNS: LazyLock<MetaPatterns> = LazyLock::new(|| MetaPatterns::new("og:title"));

/// How path separators appear inside an embedded JSON string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escaping {
    /// `https:\/\/host\/path`, as emitted inside inline JSON blobs.
    Slashed,
    /// `https://host/path`
    Plain,
}

impl Escaping {
    pub const ALL: [Escaping; 2] = [Escaping::Slashed, Escaping::Plain];
}

/// Attribute quoting used by a `<meta>` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Double,
    Single,
}

impl Quoting {
    pub const ALL: [Quoting; 2] = [Quoting::Double, Quoting::Single];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlField {
    /// `"downloadAddr"`
    Video,
    /// `"playUrl"` nested in the `"music"` object
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    Thumbnail,
    Title,
}

struct UrlPatterns {
    slashed: Regex,
    plain: Regex,
}

impl UrlPatterns {
    fn new(prefix: &str) -> Self {
        Self {
            slashed: Regex::new(&format!(r#"{}"(https?:\\/\\/[^"]+)""#, prefix)).unwrap(),
            plain: Regex::new(&format!(r#"{}"(https?://[^"]+)""#, prefix)).unwrap(),
        }
    }

    fn get(&self, escaping: Escaping) -> &Regex {
        match escaping {
            Escaping::Slashed => &self.slashed,
            Escaping::Plain => &self.plain,
        }
    }
}

struct MetaPatterns {
    double: Regex,
    single: Regex,
}

impl MetaPatterns {
    fn new(property: &str) -> Self {
        let property = regex::escape(property);
        Self {
            double: Regex::new(&format!(r#"property="{}" content="([^"]+)""#, property)).unwrap(),
            single: Regex::new(&format!(r#"property='{}' content='([^']+)'"#, property)).unwrap(),
        }
    }

    fn get(&self, quoting: Quoting) -> &Regex {
        match quoting {
            Quoting::Double => &self.double,
            Quoting::Single => &self.single,
        }
    }
}

pub struct TikTokExtractor;

impl TikTokExtractor {
    /// Check that a target looks like something worth sending to the scraper
    pub fn matches(url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
    }

    /// Parse a scraped page into a record, honouring the caller's strictness.
    ///
    /// Never fails: garbage in, `None` out.
    pub fn parse(payload: &str, strictness: Strictness) -> Option<MediaRecord> {
        if payload.is_empty() {
            return None;
        }

        let cleaned = normalize_payload(payload);
        let record = MediaRecord {
            video: find_url(&cleaned, UrlField::Video),
            audio: find_url(&cleaned, UrlField::Audio),
            thumbnail: find_meta(&cleaned, MetaField::Thumbnail),
            title: find_meta(&cleaned, MetaField::Title),
            credit_used: 0,
        };

        strictness.accepts(&record).then_some(record)
    }

    /// Only the video link; the retry path does not care about the rest.
    pub fn parse_video(payload: &str) -> Option<String> {
        if payload.is_empty() {
            return None;
        }
        find_url(&normalize_payload(payload), UrlField::Video)
    }
}

// ============ Normalization ============

/// `\u0026` first, then every other `\uXXXX` escape. Undecodable escapes stay verbatim.
pub fn normalize_payload(payload: &str) -> String {
    let cleaned = payload.replace(r"\u0026", "&");
    decode_unicode_escapes(&cleaned)
}

fn decode_unicode_escapes(s: &str) -> String {
    UNICODE_ESCAPE_REGEX
        .replace_all(s, |caps: &Captures| {
            let high = u32::from_str_radix(&caps[1], 16).unwrap_or(0);

            if let Some(low) = caps.get(2) {
                let low = u32::from_str_radix(low.as_str(), 16).unwrap_or(0);
                if (0xD800..0xDC00).contains(&high) {
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    if let Some(c) = char::from_u32(combined) {
                        return c.to_string();
                    }
                }
                // Not a pair after all; decode the first and leave the lone low half
                return match char::from_u32(high) {
                    Some(c) => format!("{}{}", c, &caps[0][6..]),
                    None => caps[0].to_string(),
                };
            }

            char::from_u32(high)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn unescape_slashes(raw: &str) -> String {
    raw.replace(r"\/", "/")
}

fn decode_html_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

// ============ Field lookup ============

/// Look a URL field up under one escaping convention only.
pub fn match_url_field(text: &str, field: UrlField, escaping: Escaping) -> Option<String> {
    let patterns = match field {
        UrlField::Video => &*VIDEO_PATTERNS,
        UrlField::Audio => &*AUDIO_PATTERNS,
    };
    patterns
        .get(escaping)
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape_slashes(m.as_str()))
}

/// Look an open-graph tag up under one quoting convention only.
pub fn match_meta_field(text: &str, field: MetaField, quoting: Quoting) -> Option<String> {
    let patterns = match field {
        MetaField::Thumbnail => &*THUMBNAIL_PATTERNS,
        MetaField::Title => &*TITLE_PATTERNS,
    };
    patterns
        .get(quoting)
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_html_entities(m.as_str()))
}

fn find_url(text: &str, field: UrlField) -> Option<String> {
    Escaping::ALL
        .iter()
        .find_map(|&escaping| match_url_field(text, field, escaping))
}

fn find_meta(text: &str, field: MetaField) -> Option<String> {
    Quoting::ALL
        .iter()
        .find_map(|&quoting| match_meta_field(text, field, quoting))
}
