use crate::config::DEFAULT_USER_AGENTS;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Rotating pool of client fingerprints (User-Agent strings).
///
/// Every draw starts one slot further along, so repeated retries for the
/// same page do not always lead with the same browser.
pub struct IdentityPool {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl IdentityPool {
    pub fn new(agents: Vec<String>) -> Self {
        let agents = if agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            agents
        };
        Self {
            agents,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Up to `count` distinct identities, capped at the pool size.
    pub fn draw(&self, count: usize) -> Vec<String> {
        let len = self.agents.len();
        let count = count.clamp(1, len);
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;

        (0..count)
            .map(|i| self.agents[(start + i) % len].clone())
            .collect()
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
