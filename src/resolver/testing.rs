//! In-process stand-ins for the scraping provider and the link probe.

use crate::upstream::{Upstream, UpstreamError, UpstreamRequest, UpstreamResponse};
use crate::validator::LinkProbe;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    /// Page body; cost reported as the full ceiling.
    Page(String),
    Status(u16),
    MissingKey,
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn delayed(ms: u64, reply: Reply) -> Self {
        Reply::Delayed(Duration::from_millis(ms), Box::new(reply))
    }
}

/// Build a page the way the provider hands it back: inline JSON with escaped slashes.
pub fn page(video: Option<&str>, audio: Option<&str>) -> String {
    let escape = |url: &str| url.replace('/', r"\/");
    let mut body = String::from(
        r#"<html><head><meta property="og:title" content="clip"></head><script>{"#,
    );
    if let Some(video) = video {
        body.push_str(&format!(r#""video":{{"downloadAddr":"{}"}},"#, escape(video)));
    }
    if let Some(audio) = audio {
        body.push_str(&format!(r#""music":{{"playUrl":"{}"}},"#, escape(audio)));
    }
    body.push_str(r#""ok":true}</script></html>"#);
    body
}

#[derive(Default)]
pub struct ScriptedUpstream {
    sequence: Mutex<VecDeque<Reply>>,
    by_identity: HashMap<String, Reply>,
    calls: Mutex<Vec<UpstreamRequest>>,
}

impl ScriptedUpstream {
    /// Replies handed out in call order; 503 once they run out.
    pub fn sequence(replies: Vec<Reply>) -> Self {
        Self {
            sequence: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Replies chosen by the request's identity.
    pub fn by_identity(replies: Vec<(&str, Reply)>) -> Self {
        Self {
            by_identity: replies
                .into_iter()
                .map(|(id, reply)| (id.to_string(), reply))
                .collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<UpstreamRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        self.calls.lock().unwrap().push(request.clone());

        let mut reply = match request
            .identity
            .as_ref()
            .and_then(|id| self.by_identity.get(id))
        {
            Some(reply) => reply.clone(),
            None => self
                .sequence
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::Status(503)),
        };

        loop {
            match reply {
                Reply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                Reply::Page(body) => {
                    return Ok(UpstreamResponse {
                        body,
                        credit_used: request.max_cost,
                    })
                }
                Reply::Status(code) => return Err(UpstreamError::Status(code)),
                Reply::MissingKey => return Err(UpstreamError::MissingCredential),
            }
        }
    }
}

#[derive(Default)]
pub struct StaticProbe {
    live: HashSet<String>,
    delays: HashMap<String, Duration>,
    probed: Mutex<Vec<(String, Option<String>)>>,
}

impl StaticProbe {
    pub fn new(live: &[&str]) -> Self {
        Self {
            live: live.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, url: &str, ms: u64) -> Self {
        self.delays.insert(url.to_string(), Duration::from_millis(ms));
        self
    }

    pub fn probed(&self) -> Vec<(String, Option<String>)> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinkProbe for StaticProbe {
    async fn is_live(&self, url: &str, identity: Option<&str>) -> bool {
        self.probed
            .lock()
            .unwrap()
            .push((url.to_string(), identity.map(String::from)));

        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.live.contains(url)
    }
}
