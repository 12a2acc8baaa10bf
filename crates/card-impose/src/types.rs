use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImposeError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Template error: {0}")]
    Template(#[from] card_template::TemplateError),
    #[error("Records error: {0}")]
    Records(#[from] card_records::RecordsError),
    #[error("Image error: {0}")]
    Image(String),
    #[error("No records to render")]
    NoRecords,
}

impl From<image::ImageError> for ImposeError {
    fn from(e: image::ImageError) -> Self {
        ImposeError::Image(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImposeError>;

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Orientation {
    /// Portrait: height > width
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

/// Output page presets
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    #[default]
    A4,
    Letter,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Base dimensions, portrait
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Dimensions with orientation applied
    pub fn dimensions_with_orientation(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PaperSize::A3 => "A3",
            PaperSize::A4 => "A4",
            PaperSize::Letter => "Letter",
            PaperSize::Custom { .. } => "Custom",
        }
    }
}

/// How cards are laid onto output pages
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageMode {
    /// Pack as many cards as fit onto a paper sheet
    Sheet(PaperSize),
    /// One page per card, sized to the card plus bleed
    SingleCard,
}

impl Default for PageMode {
    fn default() -> Self {
        PageMode::Sheet(PaperSize::A4)
    }
}

/// Page margins in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetMargins {
    pub top_mm: f32,
    pub bottom_mm: f32,
    pub left_mm: f32,
    pub right_mm: f32,
}

impl Default for SheetMargins {
    fn default() -> Self {
        Self::uniform(10.0)
    }
}

impl SheetMargins {
    pub fn uniform(mm: f32) -> Self {
        Self {
            top_mm: mm,
            bottom_mm: mm,
            left_mm: mm,
            right_mm: mm,
        }
    }

    pub fn none() -> Self {
        Self::uniform(0.0)
    }
}

/// Which card faces a batch produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SideSelection {
    Front,
    Back,
    #[default]
    Both,
}

impl SideSelection {
    pub fn includes_front(self) -> bool {
        matches!(self, SideSelection::Front | SideSelection::Both)
    }

    pub fn includes_back(self) -> bool {
        matches!(self, SideSelection::Back | SideSelection::Both)
    }
}

/// Printer's marks and annotations drawn on output pages
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PrinterMarks {
    pub crop_marks: bool,
    pub page_numbers: bool,
    pub serial_numbers: bool,
    pub serial_prefix: String,
    pub serial_start: usize,
    /// Zero-pad the running counter to this many digits
    pub serial_pad_width: usize,
}

impl Default for PrinterMarks {
    fn default() -> Self {
        Self {
            crop_marks: true,
            page_numbers: true,
            serial_numbers: true,
            serial_prefix: String::new(),
            serial_start: 1,
            serial_pad_width: 0,
        }
    }
}

impl PrinterMarks {
    pub fn any_enabled(&self) -> bool {
        self.crop_marks || self.page_numbers || self.serial_numbers
    }

    /// Serial text for the card at `index` within the batch
    pub fn serial(&self, index: usize) -> String {
        format!(
            "{}{:0width$}",
            self.serial_prefix,
            self.serial_start + index,
            width = self.serial_pad_width
        )
    }
}
