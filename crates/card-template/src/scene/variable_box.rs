//! Variable boxes: a styled container plus a locked inner text node.
//!
//! The text always occupies the box rectangle inset by the padding. Moving or
//! resizing the box drags the text along; the text itself cannot be selected.

use super::lock::LockFlags;
use super::object::{
    BoxProps, DesignObject, ObjectData, ObjectId, ObjectKind, Style, TextProps, Transform,
};
use super::side::Side;
use crate::geometry::Rect;
use crate::types::{Result, TemplateError};

/// Everything needed to place a new variable box
#[derive(Debug, Clone)]
pub struct VariableBoxSpec {
    /// Record field whose value the box displays
    pub field: String,
    /// Outer box in editor pixels
    pub rect: Rect,
    pub props: BoxProps,
    pub style: Style,
    pub text: TextProps,
    /// Shrink the font to fit the box when the value is long
    pub auto_font_size: bool,
}

impl VariableBoxSpec {
    pub fn new(field: impl Into<String>, rect: Rect) -> Self {
        let field = field.into();
        let text = TextProps::new(format!("{{{{{}}}}}", field));
        Self {
            field,
            rect,
            props: BoxProps::default(),
            style: Style {
                fill: Some("#f3f4f6".to_string()),
                stroke: Some("#9ca3af".to_string()),
                stroke_width: 1.0,
                opacity: 1.0,
            },
            text,
            auto_font_size: true,
        }
    }
}

/// Ids of a freshly created box/text pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBoxIds {
    pub container: ObjectId,
    pub text: ObjectId,
}

impl Side {
    /// Insert a linked box and text pair on top of the stack
    pub fn add_variable_box(
        &mut self,
        container: ObjectId,
        text: ObjectId,
        spec: VariableBoxSpec,
    ) -> Result<VariableBoxIds> {
        if container == text || self.contains(&container) {
            return Err(TemplateError::DuplicateId(container.to_string()));
        }
        if self.contains(&text) {
            return Err(TemplateError::DuplicateId(text.to_string()));
        }

        let mut outer = DesignObject::new(
            container.clone(),
            ObjectKind::VariableBox(spec.props.clone()),
            Transform::from_rect(spec.rect),
        )
        .with_style(spec.style);
        outer.data = ObjectData {
            field: Some(spec.field.clone()),
            text_object: Some(text.clone()),
            ..Default::default()
        };
        outer.derive_interaction();

        let original = spec.text.text.clone();
        let mut inner = DesignObject::new(
            text.clone(),
            ObjectKind::VariableText(spec.text),
            Transform::from_rect(spec.rect.inset(spec.props.padding)),
        );
        inner.data = ObjectData {
            field: Some(spec.field),
            original_text: Some(original),
            parent_box: Some(container.clone()),
            auto_font_size: spec.auto_font_size,
            ..Default::default()
        };
        inner.locks = LockFlags::LOCKED;
        inner.derive_interaction();

        self.objects.push(outer);
        self.objects.push(inner);
        Ok(VariableBoxIds { container, text })
    }

    /// Re-fit the inner text of a variable box to its current rectangle
    pub fn sync_variable_box(&mut self, container: &ObjectId) -> Result<()> {
        let outer = self.require(container)?;
        let ObjectKind::VariableBox(props) = &outer.kind else {
            return Ok(());
        };
        let Some(text_id) = outer.data.text_object.clone() else {
            return Ok(());
        };
        let inner_rect = outer.transform.bounds().inset(props.padding);
        let angle = outer.transform.angle;

        let inner = self
            .get_mut(&text_id)
            .ok_or_else(|| TemplateError::UnresolvedReference(text_id.to_string()))?;
        inner.transform.left = inner_rect.x;
        inner.transform.top = inner_rect.y;
        inner.transform.width = inner_rect.width;
        inner.transform.height = inner_rect.height;
        inner.transform.scale_x = 1.0;
        inner.transform.scale_y = 1.0;
        inner.transform.angle = angle;
        Ok(())
    }
}
