use crate::impose::{BatchControl, BatchOutput, generate_batch, save_temp_pdf};
use crate::layout::{PackRequest, plan};
use crate::options::BatchOptions;
use crate::render::CardRenderer;
use crate::types::*;
use card_template::{Record, Template};
use std::path::PathBuf;

/// Generate a preview of the batch
/// Renders only the records that fit on the first page of each pass
pub async fn generate_preview(
    template: &Template,
    records: &[Record],
    options: &BatchOptions,
    renderer: &mut CardRenderer,
) -> Result<BatchOutput> {
    if records.is_empty() {
        return Err(ImposeError::NoRecords);
    }
    let layout = plan(&PackRequest::new(template.size(), options, records.len()));
    let first_page = &records[..layout.cards_per_page.min(records.len())];
    generate_batch(template, first_page, options, renderer, &BatchControl::new()).await
}

/// Generate a preview and write it to a temporary file, returning its path
pub async fn preview_to_temp_file(
    template: &Template,
    records: &[Record],
    options: &BatchOptions,
    renderer: &mut CardRenderer,
) -> Result<PathBuf> {
    let output = generate_preview(template, records, options, renderer).await?;
    log::info!("Preview: {}", output.summary);
    save_temp_pdf(output.document, "card_preview").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryFetcher;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_preview_renders_one_page() {
        let template = Template::new(85.6, 54.0);
        let mut options = BatchOptions::default();
        options.render.export_dpi = 24.0;
        let records: Vec<Record> = (0..20)
            .map(|i| [("id", i.to_string())].into_iter().collect())
            .collect();
        let mut renderer = CardRenderer::new(options.render.clone(), Arc::new(MemoryFetcher::new()));

        let output = generate_preview(&template, &records, &options, &mut renderer)
            .await
            .unwrap();
        assert_eq!(output.summary.total, 8);
        assert_eq!(output.document.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_preview_file_is_written() {
        let template = Template::new(85.6, 54.0);
        let mut options = BatchOptions::default();
        options.render.export_dpi = 24.0;
        let records = vec![Record::new()];
        let mut renderer = CardRenderer::new(options.render.clone(), Arc::new(MemoryFetcher::new()));

        let path = preview_to_temp_file(&template, &records, &options, &mut renderer)
            .await
            .unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(path);
    }
}
