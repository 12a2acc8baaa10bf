//! Document output for generated batches

use crate::types::*;
use lopdf::Document;
use std::path::{Path, PathBuf};

/// Serialize a document to bytes
pub async fn document_bytes(mut doc: Document) -> Result<Vec<u8>> {
    let bytes = tokio::task::spawn_blocking(move || {
        let mut writer = Vec::new();
        doc.save_to(&mut writer)?;
        Ok::<_, ImposeError>(writer)
    })
    .await??;
    Ok(bytes)
}

/// Save the generated document
pub async fn save_pdf(doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = document_bytes(doc).await?;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}

/// Save to a fresh file in the system temp directory and return its path
pub async fn save_temp_pdf(doc: Document, stem: &str) -> Result<PathBuf> {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let path = std::env::temp_dir().join(format!("{}_{}_{}.pdf", stem, std::process::id(), stamp));
    save_pdf(doc, &path).await?;
    Ok(path)
}

/// Load a previously generated document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    Ok(doc)
}
