//! Template persistence boundary.
//!
//! A stored template looks like
//! `{designJson, backDesignJson?, width, height, hasBackSide, isPublic}`
//! where the two design documents may be inline objects or JSON strings.

use super::serde_helpers::{json_or_string, optional_json_or_string};
use super::side::{Side, SideSize};
use crate::types::{Result, SideKind, TemplateError};
use serde::{Deserialize, Serialize};

/// A named logical page of a multi-page template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedPage {
    pub name: String,
    pub design: Side,
}

/// Front design document; the front side plus optional extra pages
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDocument {
    #[serde(flatten)]
    pub side: Side,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<NamedPage>,
}

/// A complete card template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(rename = "designJson", deserialize_with = "json_or_string")]
    pub front: DesignDocument,
    #[serde(
        rename = "backDesignJson",
        default,
        deserialize_with = "optional_json_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub back: Option<Side>,
    /// Card width in millimeters
    pub width: f32,
    /// Card height in millimeters
    pub height: f32,
    #[serde(default)]
    pub has_back_side: bool,
    #[serde(default)]
    pub is_public: bool,
}

impl Template {
    pub fn new(width_mm: f32, height_mm: f32) -> Self {
        let size = SideSize::new(width_mm, height_mm);
        Self {
            front: DesignDocument {
                side: Side::new(size),
                pages: Vec::new(),
            },
            back: None,
            width: width_mm,
            height: height_mm,
            has_back_side: false,
            is_public: false,
        }
    }

    /// Parse a stored template and make it safe to edit or render
    pub fn from_json(json: &str) -> Result<Self> {
        let mut template: Template = serde_json::from_str(json)?;
        template.normalize()?;
        Ok(template)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn size(&self) -> SideSize {
        SideSize::new(self.width, self.height)
    }

    /// Enable the back side, creating an empty one if needed
    pub fn enable_back(&mut self) -> &mut Side {
        self.has_back_side = true;
        let size = self.size();
        self.back.get_or_insert_with(|| Side::new(size))
    }

    pub fn side(&self, kind: SideKind) -> Option<&Side> {
        match kind {
            SideKind::Front => Some(&self.front.side),
            SideKind::Back if self.has_back_side => self.back.as_ref(),
            SideKind::Back => None,
        }
    }

    pub fn side_mut(&mut self, kind: SideKind) -> Option<&mut Side> {
        match kind {
            SideKind::Front => Some(&mut self.front.side),
            SideKind::Back if self.has_back_side => self.back.as_mut(),
            SideKind::Back => None,
        }
    }

    /// Apply load-time normalization to every side and page.
    ///
    /// The template dimensions are authoritative for every side.
    pub fn normalize(&mut self) -> Result<()> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(TemplateError::InvalidGeometry(format!(
                "template size {}x{} mm",
                self.width, self.height
            )));
        }
        let size = self.size();

        let sides = std::iter::once(&mut self.front.side)
            .chain(self.back.iter_mut())
            .chain(self.front.pages.iter_mut().map(|page| &mut page.design));
        for side in sides {
            side.size = size;
            side.normalize();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ObjectId;
    use pretty_assertions::assert_eq;

    const STORED: &str = r##"{
        "designJson": "{\"objects\":[{\"id\":\"t1\",\"type\":\"text\",\"text\":\"Hello {{name}}\",\"locks\":{\"movementX\":\"true\",\"movementY\":1},\"selectable\":true}],\"background\":{\"type\":\"solid\",\"color\":\"#ffeeee\"}}",
        "backDesignJson": "",
        "width": 85.6,
        "height": 54,
        "hasBackSide": false,
        "isPublic": true
    }"##;

    #[test]
    fn test_load_stored_template() {
        let template = Template::from_json(STORED).unwrap();
        assert!(template.back.is_none());
        assert!(template.is_public);

        let side = template.side(SideKind::Front).unwrap();
        assert_eq!(side.size, SideSize::new(85.6, 54.0));
        let text = side.get(&ObjectId::from("t1")).unwrap();
        assert!(text.is_locked());
        assert!(!text.selectable);
        assert!(template.side(SideKind::Back).is_none());
    }

    #[test]
    fn test_locks_persist_as_booleans() {
        let template = Template::from_json(STORED).unwrap();
        let json = template.to_json().unwrap();
        assert!(json.contains(r#""movementX":true"#));
        assert!(json.contains(r#""scalingY":true"#));

        let reloaded = Template::from_json(&json).unwrap();
        assert_eq!(reloaded, template);
    }

    #[test]
    fn test_inline_back_and_pages() {
        let json = r##"{
            "designJson": {"objects": [], "pages": [{"name": "Inner", "design": {"objects": []}}]},
            "backDesignJson": {"objects": [], "background": {"type": "linear-gradient", "from": "#000", "to": "#fff", "angle": 90}},
            "width": 100, "height": 70, "hasBackSide": true
        }"##;
        let template = Template::from_json(json).unwrap();
        assert_eq!(template.front.pages.len(), 1);
        assert_eq!(template.front.pages[0].design.size, SideSize::new(100.0, 70.0));
        assert!(template.side(SideKind::Back).is_some());
    }

    #[test]
    fn test_zero_size_rejected() {
        let json = r#"{"designJson": {"objects": []}, "width": 0, "height": 54}"#;
        assert!(matches!(
            Template::from_json(json),
            Err(TemplateError::InvalidGeometry(_))
        ));
    }
}
