//! Design object model.
//!
//! Every object carries an id, a transform, lock flags, a visual style and a
//! `data` bag; the kind-specific payload lives in [`ObjectKind`].

use super::lock::LockFlags;
use crate::constants::{DEFAULT_BOX_PADDING, DEFAULT_LINE_HEIGHT};
use crate::geometry::{MaskShape, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a design object within a template
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

fn default_one() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Position, size, rotation and scale in editor pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    /// Left edge of the unrotated box
    pub left: f32,
    /// Top edge of the unrotated box
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Clockwise rotation in degrees around the box center
    #[serde(default)]
    pub angle: f32,
    #[serde(default = "default_one")]
    pub scale_x: f32,
    #[serde(default = "default_one")]
    pub scale_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 100.0,
            height: 100.0,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Transform {
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            left: rect.x,
            top: rect.y,
            width: rect.width,
            height: rect.height,
            ..Default::default()
        }
    }

    pub fn scaled_width(&self) -> f32 {
        self.width * self.scale_x
    }

    pub fn scaled_height(&self) -> f32 {
        self.height * self.scale_y
    }

    /// The unrotated box with scale applied
    pub fn bounds(&self) -> Rect {
        Rect::new(self.left, self.top, self.scaled_width(), self.scaled_height())
    }

    /// Fold scale into width/height and reset scale to 1
    pub fn bake_scale(&mut self) {
        self.width *= self.scale_x;
        self.height *= self.scale_y;
        self.scale_x = 1.0;
        self.scale_y = 1.0;
    }
}

/// Stroke and fill shared by every kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default)]
    pub stroke_width: f32,
    #[serde(default = "default_one")]
    pub opacity: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_size() -> f32 {
    18.0
}

fn default_text_fill() -> String {
    "#000000".to_string()
}

fn default_line_height() -> f32 {
    DEFAULT_LINE_HEIGHT
}

/// Payload of text and variable-text objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    /// Displayed text (resolved text after a record is applied)
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default = "default_text_fill")]
    pub fill: String,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    /// Wrap on word boundaries to the object width
    #[serde(default = "default_true")]
    pub wrap: bool,
}

impl TextProps {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            bold: false,
            italic: false,
            fill: default_text_fill(),
            text_align: TextAlign::Left,
            line_height: DEFAULT_LINE_HEIGHT,
            wrap: true,
        }
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }
}

/// Payload of plain shapes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeProps {
    #[serde(default)]
    pub shape: MaskShape,
}

fn default_padding() -> f32 {
    DEFAULT_BOX_PADDING
}

/// Payload of a variable box (the container half of a box + text pair)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxProps {
    #[serde(default = "default_padding")]
    pub padding: f32,
    #[serde(default)]
    pub corner_radius: f32,
}

impl Default for BoxProps {
    fn default() -> Self {
        Self {
            padding: DEFAULT_BOX_PADDING,
            corner_radius: 4.0,
        }
    }
}

/// Payload of a photo placeholder
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderProps {
    /// Caption drawn on the blank box while editing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_photo_scale() -> f32 {
    100.0
}

fn default_photo_position() -> Point {
    Point::new(50.0, 50.0)
}

/// Stored configuration of a masked photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskConfig {
    #[serde(default)]
    pub shape: MaskShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_mask_src: Option<String>,
    /// Zoom in percent on top of cover scaling
    #[serde(default = "default_photo_scale")]
    pub photo_scale: f32,
    /// Alignment of the photo inside the mask, in percent (50/50 = centered)
    #[serde(default = "default_photo_position")]
    pub photo_position: Point,
    #[serde(default)]
    pub border_width: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    /// Field whose photo fills the mask
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_binding: Option<String>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            shape: MaskShape::Circle,
            photo_src: None,
            custom_mask_src: None,
            photo_scale: default_photo_scale(),
            photo_position: default_photo_position(),
            border_width: 0.0,
            border_color: None,
            variable_binding: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BarcodeFormat {
    #[default]
    Code128,
    Code39,
    Ean13,
}

/// Payload of a linear barcode
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeProps {
    #[serde(default)]
    pub format: BarcodeFormat,
    /// `{{field}}` template, bare field name, or literal value
    #[serde(default)]
    pub data_field: String,
    /// Encoded value for the current record; set by resolution, never persisted
    #[serde(skip)]
    pub value: Option<String>,
    #[serde(default)]
    pub show_value: bool,
}

fn default_qr_margin() -> u32 {
    2
}

/// Payload of a QR code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrProps {
    #[serde(default)]
    pub data_field: String,
    #[serde(skip)]
    pub value: Option<String>,
    /// Quiet zone in modules
    #[serde(default = "default_qr_margin")]
    pub margin: u32,
}

impl Default for QrProps {
    fn default() -> Self {
        Self {
            data_field: String::new(),
            value: None,
            margin: default_qr_margin(),
        }
    }
}

/// How an image fills its box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    /// Fill the box, cropping the excess
    #[default]
    Cover,
    /// Fit inside the box, letterboxing
    Contain,
    /// Ignore aspect ratio
    Stretch,
}

/// Payload of a plain image, including photos substituted for placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProps {
    pub src: String,
    #[serde(default)]
    pub fit: ImageFit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<MaskShape>,
    #[serde(default = "default_photo_position")]
    pub position: Point,
}

impl ImageProps {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            fit: ImageFit::Cover,
            clip: None,
            position: default_photo_position(),
        }
    }
}

/// Fill of a background: solid, two-stop gradient, or image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Background {
    Solid {
        color: String,
    },
    LinearGradient {
        from: String,
        to: String,
        /// Degrees; 0 runs left to right, 90 top to bottom
        #[serde(default)]
        angle: f32,
    },
    Image {
        src: String,
    },
}

impl Default for Background {
    fn default() -> Self {
        Background::Solid {
            color: "#ffffff".to_string(),
        }
    }
}

/// Payload of a full-bleed background object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBackgroundProps {
    #[serde(default)]
    pub paint: Background,
}

/// Kind-specific payload of a design object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ObjectKind {
    Shape(ShapeProps),
    Text(TextProps),
    VariableText(TextProps),
    VariableBox(BoxProps),
    PhotoPlaceholder(PlaceholderProps),
    MaskedPhoto(MaskConfig),
    Barcode(BarcodeProps),
    Qrcode(QrProps),
    GroupBackground(GroupBackgroundProps),
    Image(ImageProps),
}

impl ObjectKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Shape(_) => "shape",
            ObjectKind::Text(_) => "text",
            ObjectKind::VariableText(_) => "variable-text",
            ObjectKind::VariableBox(_) => "variable-box",
            ObjectKind::PhotoPlaceholder(_) => "photo-placeholder",
            ObjectKind::MaskedPhoto(_) => "masked-photo",
            ObjectKind::Barcode(_) => "barcode",
            ObjectKind::Qrcode(_) => "qrcode",
            ObjectKind::GroupBackground(_) => "group-background",
            ObjectKind::Image(_) => "image",
        }
    }

    /// Text payload of text-like kinds
    pub fn text(&self) -> Option<&TextProps> {
        match self {
            ObjectKind::Text(props) | ObjectKind::VariableText(props) => Some(props),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut TextProps> {
        match self {
            ObjectKind::Text(props) | ObjectKind::VariableText(props) => Some(props),
            _ => None,
        }
    }
}

/// Free-form metadata attached to every object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    /// Bound record field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Unresolved text as authored; resolution always starts from here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    /// Clip shape of a photo placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_mask_src: Option<String>,
    /// Owning variable box of an inner text node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_box: Option<ObjectId>,
    /// Inner text node of a variable box
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_object: Option<ObjectId>,
    #[serde(default)]
    pub auto_font_size: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_font_size: Option<f32>,
    /// Vertical focal hint for cover-scaled photos, percent from the top
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headroom_pct: Option<f32>,
    #[serde(default)]
    pub is_background: bool,
}

/// A node of the scene graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignObject {
    pub id: ObjectId,
    #[serde(flatten)]
    pub kind: ObjectKind,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub locks: LockFlags,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Derived from the lock state on load; never trusted from storage
    #[serde(default = "default_true")]
    pub selectable: bool,
    /// Derived from the lock state on load; never trusted from storage
    #[serde(default = "default_true")]
    pub evented: bool,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub data: ObjectData,
}

impl DesignObject {
    pub fn new(id: impl Into<ObjectId>, kind: ObjectKind, transform: Transform) -> Self {
        let mut object = Self {
            id: id.into(),
            kind,
            transform,
            locks: LockFlags::default(),
            visible: true,
            selectable: true,
            evented: true,
            style: Style::default(),
            data: ObjectData::default(),
        };
        object.derive_interaction();
        object
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_data(mut self, data: ObjectData) -> Self {
        self.data = data;
        self.derive_interaction();
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn is_text(&self) -> bool {
        self.kind.text().is_some()
    }

    /// Placeholders whose pixels come from a record photo
    pub fn is_photo_slot(&self) -> bool {
        matches!(
            self.kind,
            ObjectKind::PhotoPlaceholder(_) | ObjectKind::MaskedPhoto(_)
        )
    }

    /// Field bound to this object, if any
    pub fn bound_field(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::MaskedPhoto(config) => config
                .variable_binding
                .as_deref()
                .or(self.data.field.as_deref()),
            _ => self.data.field.as_deref(),
        }
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&ObjectId> for ObjectId {
    fn from(id: &ObjectId) -> Self {
        id.clone()
    }
}
