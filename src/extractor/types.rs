use serde::{Deserialize, Serialize};

/// How much of a page must be recovered before a record counts as usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Either a video or an audio link is enough.
    Lenient,
    /// Nothing short of a video link will do.
    VideoRequired,
}

impl Strictness {
    pub fn accepts(self, record: &MediaRecord) -> bool {
        match self {
            Strictness::Lenient => record.video.is_some() || record.audio.is_some(),
            Strictness::VideoRequired => record.video.is_some(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub credit_used: u32,
}

impl MediaRecord {
    /// Replace the video link, keeping everything else the caller already had.
    pub fn merge_video(&mut self, video: String) {
        self.video = Some(video);
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_none()
            && self.audio.is_none()
            && self.thumbnail.is_none()
            && self.title.is_none()
    }
}
