use crate::constants::{DEFAULT_BLEED_MM, DEFAULT_CARD_SPACING_MM, DEFAULT_FETCH_TIMEOUT_MS};
use crate::types::*;
use card_template::PhotoResolver;
use card_template::constants::{EDIT_DPI, EXPORT_DPI, MIN_READABLE_FONT_SIZE};
use card_template::variables::DEFAULT_BACKEND_ORIGIN;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Settings of the per-record renderer
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderConfig {
    /// Origin relative photo paths are rebased onto
    pub backend_origin: String,
    /// Resolution template coordinates are authored at
    pub edit_dpi: f32,
    /// Resolution cards are rasterized at
    pub export_dpi: f32,
    /// Smallest size auto-fit may shrink text to
    pub min_font_size: f32,
    /// Bound on each photo fetch
    pub fetch_timeout_ms: u64,
    /// TrueType font used to rasterize text; without one text is set in
    /// Helvetica on top of the card image
    pub font_path: Option<PathBuf>,
    /// Project whose photo folder bare photo file names resolve into
    pub project_id: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend_origin: DEFAULT_BACKEND_ORIGIN.to_string(),
            edit_dpi: EDIT_DPI,
            export_dpi: EXPORT_DPI,
            min_font_size: MIN_READABLE_FONT_SIZE,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            font_path: None,
            project_id: None,
        }
    }
}

impl RenderConfig {
    /// Export pixels per editor pixel
    pub fn export_scale(&self) -> f32 {
        self.export_dpi / self.edit_dpi
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn photo_resolver(&self) -> PhotoResolver {
        let resolver = PhotoResolver::new(self.backend_origin.clone());
        match &self.project_id {
            Some(project) => resolver.with_project(project.clone()),
            None => resolver,
        }
    }
}

/// Complete batch configuration: page layout, marks and rendering
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatchOptions {
    // Page layout
    pub page_mode: PageMode,
    pub orientation: Orientation,
    pub margins: SheetMargins,
    pub card_spacing_mm: f32,
    /// Bleed around each card; 0 disables bleed
    pub bleed_mm: f32,

    // Grid overrides
    pub cards_per_row: Option<usize>,
    pub cards_per_column: Option<usize>,

    // Faces
    pub sides: SideSelection,
    /// Mirror back-side columns so a flipped sheet lines up
    pub mirror_back: bool,

    // Printer's marks
    pub marks: PrinterMarks,

    pub render: RenderConfig,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            page_mode: PageMode::default(),
            orientation: Orientation::Portrait,
            margins: SheetMargins::default(),
            card_spacing_mm: DEFAULT_CARD_SPACING_MM,
            bleed_mm: DEFAULT_BLEED_MM,
            cards_per_row: None,
            cards_per_column: None,
            sides: SideSelection::Both,
            mirror_back: true,
            marks: PrinterMarks::default(),
            render: RenderConfig::default(),
        }
    }
}

impl BatchOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| ImposeError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ImposeError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("bleed", self.bleed_mm),
            ("card spacing", self.card_spacing_mm),
            ("top margin", self.margins.top_mm),
            ("bottom margin", self.margins.bottom_mm),
            ("left margin", self.margins.left_mm),
            ("right margin", self.margins.right_mm),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ImposeError::Config(format!(
                    "{} must be zero or more, got {}",
                    name, value
                )));
            }
        }

        if let PageMode::Sheet(PaperSize::Custom {
            width_mm,
            height_mm,
        }) = self.page_mode
        {
            if width_mm <= 0.0 || height_mm <= 0.0 {
                return Err(ImposeError::Config(format!(
                    "Custom paper size must be positive, got {}x{}mm",
                    width_mm, height_mm
                )));
            }
        }

        if self.cards_per_row == Some(0) || self.cards_per_column == Some(0) {
            return Err(ImposeError::Config(
                "Grid overrides must be at least 1".to_string(),
            ));
        }

        if self.render.edit_dpi <= 0.0 || self.render.export_dpi <= 0.0 {
            return Err(ImposeError::Config(format!(
                "Resolutions must be positive, got edit {} / export {}",
                self.render.edit_dpi, self.render.export_dpi
            )));
        }

        if self.render.min_font_size <= 0.0 {
            return Err(ImposeError::Config(
                "Minimum font size must be positive".to_string(),
            ));
        }

        if self.render.fetch_timeout_ms == 0 {
            return Err(ImposeError::Config(
                "Fetch timeout must be at least 1ms".to_string(),
            ));
        }

        Ok(())
    }
}
