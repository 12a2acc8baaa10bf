use super::draw::{DrawContext, ImageMap, TextRun, draw_side};
use super::fetch::{ImageFetcher, load_images};
use super::resolve::{
    ResolveContext, apply_record, rebase_template_images, substitute_photo, template_image_urls,
};
use super::surface::Surface;
use super::text::{ApproxShaper, TextShaper};
use crate::constants::mm_to_px_at;
use crate::options::RenderConfig;
use crate::stats::RecordIssue;
use crate::types::*;
use card_template::{PhotoIndex, PhotoResolver, Record, Side};
use image::RgbImage;
use std::sync::Arc;

/// One record rendered onto one side, bleed included
#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub pixels: RgbImage,
    /// Size of the bleed box (mm)
    pub width_mm: f32,
    pub height_mm: f32,
    pub text_runs: Vec<TextRun>,
    pub issues: Vec<RecordIssue>,
}

/// Turns (template side, record) pairs into card images.
///
/// Holds one drawing surface for the whole batch and caches the template's
/// own images, so only record photos are fetched per card.
pub struct CardRenderer {
    config: RenderConfig,
    resolver: PhotoResolver,
    index: PhotoIndex,
    fetcher: Arc<dyn ImageFetcher>,
    shaper: Arc<dyn TextShaper>,
    surface: Option<Surface>,
    shared_images: Arc<ImageMap>,
}

impl CardRenderer {
    pub fn new(config: RenderConfig, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let resolver = config.photo_resolver();
        Self {
            config,
            resolver,
            index: PhotoIndex::new(),
            fetcher,
            shaper: Arc::new(ApproxShaper),
            surface: Some(Surface::new()),
            shared_images: Arc::new(ImageMap::new()),
        }
    }

    /// Photos uploaded alongside the records, keyed by file name
    pub fn with_photo_index(mut self, index: PhotoIndex) -> Self {
        self.index = index;
        self
    }

    pub fn with_shaper(mut self, shaper: Arc<dyn TextShaper>) -> Self {
        self.shaper = shaper;
        self
    }

    /// Load the configured font, if any, as the text shaper
    pub async fn with_configured_font(self) -> Result<Self> {
        match self.config.font_path.clone() {
            Some(path) => {
                let shaper = super::text::FontShaper::load(&path).await?;
                log::info!("Rasterizing text with {}", path.display());
                Ok(self.with_shaper(Arc::new(shaper)))
            }
            None => Ok(self),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Rebase the template's image references and fetch them once.
    ///
    /// Returns the side to pass to [`render`](Self::render). Images that fail
    /// to load are logged and left out of the card.
    pub async fn prepare(&mut self, side: &Side) -> Side {
        let mut prepared = side.clone();
        rebase_template_images(&mut prepared, &self.resolver);

        let urls: Vec<String> = template_image_urls(&prepared)
            .into_iter()
            .filter(|url| !self.shared_images.contains_key(url))
            .collect();
        if urls.is_empty() {
            return prepared;
        }

        log::debug!("Prefetching {} template image(s)", urls.len());
        let loaded = load_images(self.fetcher.as_ref(), &urls, self.config.fetch_timeout()).await;
        let mut images = (*self.shared_images).clone();
        for (url, outcome) in loaded {
            match outcome {
                Ok(image) => {
                    images.insert(url, image);
                }
                Err(reason) => log::warn!("Template image {} unavailable: {}", url, reason),
            }
        }
        self.shared_images = Arc::new(images);
        prepared
    }

    /// Render one record onto a prepared side
    pub async fn render(
        &mut self,
        template: &Side,
        record: &Record,
        bleed_mm: f32,
    ) -> Result<RenderedCard> {
        let ctx = ResolveContext {
            resolver: &self.resolver,
            index: &self.index,
            shaper: self.shaper.as_ref(),
            min_font_size: self.config.min_font_size,
        };
        let applied = apply_record(template, record, &ctx);
        let mut side = applied.side;
        let mut issues = applied.issues;

        let urls: Vec<String> = applied.photos.iter().map(|p| p.url.clone()).collect();
        let mut loaded = load_images(self.fetcher.as_ref(), &urls, self.config.fetch_timeout()).await;

        let mut record_images = ImageMap::new();
        for request in &applied.photos {
            match loaded.remove(&request.url) {
                Some(Ok(image)) => {
                    substitute_photo(&mut side, request);
                    record_images.insert(request.url.clone(), image);
                }
                Some(Err(reason)) => {
                    log::warn!("Photo {} for {} failed: {}", request.url, request.object, reason);
                    issues.push(RecordIssue::PhotoLoadFailed {
                        object: request.object.clone(),
                        url: request.url.clone(),
                        reason,
                    });
                }
                None => {
                    // Same URL used by two slots; the first already took it
                    if record_images.contains_key(&request.url) {
                        substitute_photo(&mut side, request);
                    }
                }
            }
        }

        let dpi = self.config.export_dpi;
        let bleed_mm = bleed_mm.max(0.0);
        let width_mm = side.size.width_mm + bleed_mm * 2.0;
        let height_mm = side.size.height_mm + bleed_mm * 2.0;
        let width_px = mm_to_px_at(width_mm, dpi).round().max(1.0) as u32;
        let height_px = mm_to_px_at(height_mm, dpi).round().max(1.0) as u32;

        let scale = self.config.export_scale();
        let offset = mm_to_px_at(bleed_mm, dpi);
        let px_per_mm = mm_to_px_at(1.0, dpi);
        let shared_images = Arc::clone(&self.shared_images);
        let shaper = Arc::clone(&self.shaper);
        let mut surface = self.surface.take().unwrap_or_default();

        let (surface, pixels, text_runs, draw_issues) = tokio::task::spawn_blocking(move || {
            surface.reset(width_px, height_px);
            let ctx = DrawContext {
                scale,
                offset,
                px_per_mm,
                shared_images: &shared_images,
                record_images: &record_images,
                shaper: shaper.as_ref(),
            };
            let mut runs = Vec::new();
            let mut issues = Vec::new();
            draw_side(&mut surface, &side, &ctx, &mut runs, &mut issues);
            let pixels = surface.to_rgb();
            (surface, pixels, runs, issues)
        })
        .await?;

        self.surface = Some(surface);
        issues.extend(draw_issues);

        Ok(RenderedCard {
            pixels,
            width_mm,
            height_mm,
            text_runs,
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fetch::MemoryFetcher;
    use card_template::{
        Background, DesignObject, MaskShape, ObjectData, ObjectKind, PlaceholderProps, Rect,
        SideSize, Transform,
    };
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(color: Rgba<u8>) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(8, 8, color)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn config() -> RenderConfig {
        RenderConfig {
            export_dpi: 96.0,
            fetch_timeout_ms: 500,
            ..Default::default()
        }
    }

    fn placeholder_side() -> Side {
        let mut side = Side::new(SideSize::new(50.8, 50.8));
        side.background = Background::Solid {
            color: "#ffffff".to_string(),
        };
        side.objects.push(
            DesignObject::new(
                "photo",
                ObjectKind::PhotoPlaceholder(PlaceholderProps::default()),
                Transform::from_rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
            )
            .with_data(ObjectData {
                field: Some("photo".to_string()),
                mask: Some(MaskShape::Circle),
                ..Default::default()
            }),
        );
        side
    }

    #[tokio::test]
    async fn test_photo_fills_masked_slot() {
        let fetcher = MemoryFetcher::new().with("http://photos/a.png", png(Rgba([255, 0, 0, 255])));
        let mut renderer = CardRenderer::new(config(), Arc::new(fetcher));
        let side = renderer.prepare(&placeholder_side()).await;

        let record: Record = [("photo", "http://photos/a.png")].into_iter().collect();
        let card = renderer.render(&side, &record, 0.0).await.unwrap();

        assert!(card.issues.is_empty(), "{:?}", card.issues);
        assert_eq!((card.pixels.width(), card.pixels.height()), (192, 192));
        assert_eq!(card.pixels.get_pixel(50, 50).0, [255, 0, 0]);
        // Outside the circle but inside the box
        assert_eq!(card.pixels.get_pixel(2, 2).0, [255, 255, 255]);
    }

    #[tokio::test]
    async fn test_unreachable_photo_keeps_placeholder() {
        let mut renderer = CardRenderer::new(config(), Arc::new(MemoryFetcher::new()));
        let side = renderer.prepare(&placeholder_side()).await;
        let record: Record = [("photo", "http://photos/gone.png")].into_iter().collect();
        let card = renderer.render(&side, &record, 0.0).await.unwrap();

        assert!(matches!(
            card.issues.as_slice(),
            [RecordIssue::PhotoLoadFailed { .. }]
        ));
        assert_ne!(card.pixels.get_pixel(50, 50).0, [255, 255, 255]);
    }

    #[tokio::test]
    async fn test_bleed_grows_the_image() {
        let mut renderer = CardRenderer::new(config(), Arc::new(MemoryFetcher::new()));
        let side = renderer.prepare(&Side::new(SideSize::new(50.8, 25.4))).await;
        let card = renderer.render(&side, &Record::new(), 3.175).await.unwrap();
        // 0.125in of bleed on each side at 96dpi
        assert_eq!((card.pixels.width(), card.pixels.height()), (216, 120));
        assert!((card.width_mm - 57.15).abs() < 1e-3);
    }
}
