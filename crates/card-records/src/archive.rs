//! ZIP photo archives.
//!
//! Entries are held in memory and exposed to the renderer through
//! `archive:<entry name>` URLs; the [`PhotoIndex`] maps record identifiers to
//! those URLs.

use crate::types::Result;
use card_template::PhotoIndex;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

/// URL scheme used for photos served from an uploaded archive
pub const ARCHIVE_SCHEME: &str = "archive:";

/// Largest photo accepted from an archive
pub const MAX_PHOTO_BYTES: u64 = 25 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Photos extracted from an uploaded ZIP
#[derive(Debug, Clone, Default)]
pub struct PhotoArchive {
    blobs: HashMap<String, Vec<u8>>,
    index: PhotoIndex,
}

impl PhotoArchive {
    /// Read every image entry, skipping directories, `__MACOSX` metadata,
    /// hidden files and photos over [`MAX_PHOTO_BYTES`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_limit(bytes, MAX_PHOTO_BYTES)
    }

    /// Like [`PhotoArchive::from_bytes`] with a custom per-photo size limit.
    ///
    /// The limit is enforced on the bytes actually inflated, not on the size
    /// the entry header claims.
    pub fn from_bytes_with_limit(bytes: &[u8], max_photo_bytes: u64) -> Result<Self> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut archive = PhotoArchive::default();

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if !is_photo_entry(&name) {
                log::debug!("Skipping archive entry {}", name);
                continue;
            }

            if entry.size() > max_photo_bytes {
                log::warn!(
                    "Skipping {}: {} bytes is over the {} byte photo limit",
                    name,
                    entry.size(),
                    max_photo_bytes
                );
                continue;
            }

            let mut data = Vec::new();
            entry
                .by_ref()
                .take(max_photo_bytes + 1)
                .read_to_end(&mut data)?;
            if data.len() as u64 > max_photo_bytes {
                log::warn!("Skipping {}: inflates past the photo limit", name);
                continue;
            }
            archive.insert(&name, data);
        }

        log::info!("Indexed {} photos from archive", archive.len());
        Ok(archive)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        tokio::task::spawn_blocking(move || Self::from_bytes(&bytes)).await?
    }

    fn insert(&mut self, name: &str, data: Vec<u8>) {
        let url = format!("{}{}", ARCHIVE_SCHEME, name);
        self.index.insert(name, url.clone());
        self.blobs.insert(url, data);
    }

    /// Lookup table for photo resolution
    pub fn index(&self) -> &PhotoIndex {
        &self.index
    }

    /// Bytes behind an `archive:` URL
    pub fn get(&self, url: &str) -> Option<&[u8]> {
        self.blobs.get(url).map(Vec::as_slice)
    }

    /// Number of photos
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Hand the raw photos over, keyed by `archive:` URL
    pub fn into_blobs(self) -> HashMap<String, Vec<u8>> {
        self.blobs
    }
}

fn is_photo_entry(name: &str) -> bool {
    if name.starts_with("__MACOSX") {
        return false;
    }
    if name.split('/').any(|part| part.starts_with('.')) {
        return false;
    }
    let base = name.rsplit('/').next().unwrap_or(name);
    if base.is_empty() {
        return false;
    }
    base.rsplit_once('.').is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_filter() {
        assert!(is_photo_entry("S001.jpg"));
        assert!(is_photo_entry("class/S002.PNG"));
        assert!(is_photo_entry("x.webp"));
        assert!(!is_photo_entry("__MACOSX/._S001.jpg"));
        assert!(!is_photo_entry(".DS_Store"));
        assert!(!is_photo_entry("class/.hidden.jpg"));
        assert!(!is_photo_entry(".thumbs/S001.jpg"));
        assert!(!is_photo_entry("class/.cache/small/S001.jpg"));
        assert!(!is_photo_entry("notes.txt"));
        assert!(!is_photo_entry("noext"));
    }
}
