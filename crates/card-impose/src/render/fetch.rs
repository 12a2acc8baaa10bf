//! Image sources for photos, custom masks and background images.
//!
//! The renderer asks an [`ImageFetcher`] for raw bytes by URL. The default
//! [`SourceFetcher`] understands `http(s)://` URLs, `data:` URLs, photos held
//! in an uploaded archive (`archive:` URLs), and local files.

use crate::constants::USER_AGENT;
use crate::types::{ImposeError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use card_records::{ARCHIVE_SCHEME, PhotoArchive};
use futures::future::join_all;
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Something that turns a URL into image bytes
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

// =============================================================================
// Source fetcher
// =============================================================================

/// Default fetcher: archive photos, `data:` URLs, HTTP and local files
pub struct SourceFetcher {
    client: reqwest::Client,
    archive: HashMap<String, Vec<u8>>,
}

impl SourceFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ImposeError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            archive: HashMap::new(),
        })
    }

    /// Serve `archive:` URLs from an uploaded photo archive
    pub fn with_archive(mut self, archive: PhotoArchive) -> Self {
        self.archive = archive.into_blobs();
        self
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImposeError::Image(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ImposeError::Image(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImposeError::Image(format!("Failed to read {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageFetcher for SourceFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with(ARCHIVE_SCHEME) {
            return self
                .archive
                .get(url)
                .cloned()
                .ok_or_else(|| ImposeError::Image(format!("{} is not in the archive", url)));
        }
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.fetch_http(url).await;
        }
        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(tokio::fs::read(path).await?)
    }
}

/// Decode a base64 `data:` URL
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| ImposeError::Image("Malformed data URL".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(ImposeError::Image(
            "Only base64 data URLs carry images".to_string(),
        ));
    }
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ImposeError::Image(format!("Invalid base64 image: {}", e)))
}

// =============================================================================
// Memory fetcher
// =============================================================================

/// Fixed URL to bytes table, for previews of local assets and for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(url.into(), bytes);
    }

    pub fn with(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }
}

#[async_trait]
impl ImageFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| ImposeError::Image(format!("No image at {}", url)))
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Outcome of loading one URL
pub type LoadResult = std::result::Result<Arc<RgbaImage>, String>;

/// Fetch and decode every URL concurrently, each bounded by `timeout`.
///
/// A stalled or failing URL yields an error string for that URL only.
pub async fn load_images(
    fetcher: &dyn ImageFetcher,
    urls: &[String],
    timeout: Duration,
) -> HashMap<String, LoadResult> {
    let loads = urls.iter().map(|url| async move {
        let outcome = match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
            Err(_) => Err(format!("timed out after {}ms", timeout.as_millis())),
            Ok(Err(e)) => Err(e.to_string()),
            Ok(Ok(bytes)) => decode_image(bytes).await.map_err(|e| e.to_string()),
        };
        (url.clone(), outcome)
    });
    join_all(loads).await.into_iter().collect()
}

/// Decode image bytes to RGBA off the async threads
pub async fn decode_image(bytes: Vec<u8>) -> Result<Arc<RgbaImage>> {
    let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;
    Ok(Arc::new(image.to_rgba8()))
}
