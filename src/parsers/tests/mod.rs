
use crate::error::{Result, ScrapeError};
use crate::parsers::images::ImageFetcher;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Serves canned bytes per URL; unknown URLs fail like a 404
#[derive(Default)]
pub(crate) struct CannedFetcher {
    images: HashMap<String, Vec<u8>>,
    /// Artificial latency per URL
    delays: HashMap<String, Duration>,
    requested: Mutex<Vec<String>>,
}

impl CannedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_image(mut self, url: &str, bytes: &[u8]) -> Self {
        self.images.insert(url.to_string(), bytes.to_vec());
        self
    }

    pub(crate) fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for CannedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requested.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.images.get(url).cloned().ok_or_else(|| ScrapeError::Fetch {
            url: url.to_string(),
            reason: "HTTP 404 Not Found".to_string(),
        })
    }
}
