//! Async font prefetch ahead of a flatten pass

use std::collections::HashMap;
use std::sync::Arc;

use pdfsuite_core::PrefetchedFonts;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Downloads font files and keeps them for the life of the server
#[derive(Clone, Default)]
pub struct FontFetcher {
    http: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>,
}

impl FontFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch each URL once. Failed URLs are left out so the pass falls back.
    pub async fn prefetch(&self, urls: &[String]) -> PrefetchedFonts {
        let mut fonts = PrefetchedFonts::new();
        for url in urls {
            if fonts.contains(url) {
                continue;
            }
            if let Some(data) = self.get(url).await {
                fonts.insert(url.clone(), data.as_ref().clone());
            }
        }
        fonts
    }

    pub async fn cached(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Seed the cache without touching the network
    pub async fn preload(&self, url: impl Into<String>, data: Vec<u8>) {
        self.cache.write().await.insert(url.into(), Arc::new(data));
    }

    async fn get(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        if let Some(hit) = self.cache.read().await.get(url) {
            return Some(hit.clone());
        }

        debug!(url, "Fetching font");
        let data = match self.download(url).await {
            Ok(data) => Arc::new(data),
            Err(e) => {
                warn!(url, "Font fetch failed: {}", e);
                return None;
            }
        };
        self.cache
            .write()
            .await
            .insert(url.to_string(), data.clone());
        Some(data)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
