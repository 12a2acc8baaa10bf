//! Binding one record to a private copy of a template side.
//!
//! The template is never modified: every record starts from a fresh clone,
//! so text resolution always works from the authored text and symbols are
//! re-encoded from the record's own values.

use super::text::{TextShaper, fit_font_size};
use crate::stats::RecordIssue;
use card_template::{
    Background, DesignObject, ImageFit, ImageProps, ObjectId, ObjectKind, PhotoIndex,
    PhotoResolver, Point, Record, Side, resolve_code_data, resolve_object_text,
};

/// Everything record resolution needs besides the record itself
pub struct ResolveContext<'a> {
    pub resolver: &'a PhotoResolver,
    pub index: &'a PhotoIndex,
    pub shaper: &'a dyn TextShaper,
    pub min_font_size: f32,
}

/// A photo slot waiting for its image
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRequest {
    pub object: ObjectId,
    pub url: String,
}

/// A template side with one record applied, before photos are loaded
#[derive(Debug, Clone)]
pub struct AppliedCard {
    pub side: Side,
    pub photos: Vec<PhotoRequest>,
    pub issues: Vec<RecordIssue>,
}

/// Clone `template` and apply `record` to the clone: resolve text (shrinking
/// auto-fit text to its box), resolve barcode/QR values and work out which
/// photo each photo slot needs.
pub fn apply_record(template: &Side, record: &Record, ctx: &ResolveContext<'_>) -> AppliedCard {
    let mut side = template.clone();
    let mut photos = Vec::new();
    let mut issues = Vec::new();

    for object in side.objects.iter_mut() {
        if !object.visible {
            continue;
        }
        if object.is_text() {
            apply_text(object, record, ctx);
        } else if object.is_photo_slot() {
            if let Some(request) = photo_request(object, record, ctx, &mut issues) {
                photos.push(request);
            }
        } else {
            apply_code(object, record);
        }
    }

    AppliedCard {
        side,
        photos,
        issues,
    }
}

fn apply_text(object: &mut DesignObject, record: &Record, ctx: &ResolveContext<'_>) {
    let Some(resolved) = resolve_object_text(object, record) else {
        return;
    };
    if object.data.original_text.is_none() {
        if let Some(props) = object.kind.text() {
            object.data.original_text = Some(props.text.clone());
        }
    }

    let auto_fit = object.data.auto_font_size;
    let min_size = object.data.min_font_size.unwrap_or(ctx.min_font_size);
    let (box_w, box_h) = (
        object.transform.scaled_width(),
        object.transform.scaled_height(),
    );

    let Some(props) = object.kind.text_mut() else {
        return;
    };
    if auto_fit && !resolved.is_empty() {
        props.font_size = fit_font_size(
            ctx.shaper,
            &resolved,
            props.font_size,
            min_size,
            props.line_height,
            box_w,
            box_h,
            props.wrap,
        );
    }
    props.text = resolved;
}

fn apply_code(object: &mut DesignObject, record: &Record) {
    match &mut object.kind {
        ObjectKind::Barcode(props) => {
            props.value = resolve_code_data(&props.data_field, record);
        }
        ObjectKind::Qrcode(props) => {
            props.value = resolve_code_data(&props.data_field, record);
        }
        _ => {}
    }
}

fn photo_request(
    object: &DesignObject,
    record: &Record,
    ctx: &ResolveContext<'_>,
    issues: &mut Vec<RecordIssue>,
) -> Option<PhotoRequest> {
    // A masked photo with a fixed image and no binding is template artwork
    if let ObjectKind::MaskedPhoto(config) = &object.kind {
        if config.variable_binding.is_none()
            && object.data.field.is_none()
            && config.photo_src.is_some()
        {
            return None;
        }
    }

    match ctx
        .resolver
        .resolve(object.bound_field(), record, ctx.index)
    {
        Some(url) => Some(PhotoRequest {
            object: object.id.clone(),
            url,
        }),
        None => {
            issues.push(RecordIssue::PhotoMissing {
                object: object.id.clone(),
            });
            None
        }
    }
}

/// Put a loaded photo into its slot.
///
/// A placeholder is replaced in place (same z-order position) by a
/// cover-fitted image clipped to the placeholder's mask; a masked photo keeps
/// its stored configuration and takes the photo as its source.
pub fn substitute_photo(side: &mut Side, request: &PhotoRequest) {
    let Some(object) = side.get_mut(&request.object) else {
        return;
    };
    match &mut object.kind {
        ObjectKind::PhotoPlaceholder(_) => {
            let vertical = object.data.headroom_pct.unwrap_or(50.0);
            let clip = object.data.mask.filter(|shape| shape.is_clipping());
            object.kind = ObjectKind::Image(ImageProps {
                src: request.url.clone(),
                fit: ImageFit::Cover,
                clip,
                position: Point::new(50.0, vertical),
            });
        }
        ObjectKind::MaskedPhoto(config) => {
            config.photo_src = Some(request.url.clone());
        }
        _ => {}
    }
}

/// Every image the template itself references, in draw order
pub fn template_image_urls(side: &Side) -> Vec<String> {
    let mut urls = Vec::new();
    let mut push = |url: &str| {
        if !url.is_empty() && !urls.iter().any(|u: &String| u == url) {
            urls.push(url.to_string());
        }
    };

    if let Background::Image { src } = &side.background {
        push(src);
    }
    for object in &side.objects {
        if let Some(src) = &object.data.custom_mask_src {
            push(src);
        }
        match &object.kind {
            ObjectKind::GroupBackground(props) => {
                if let Background::Image { src } = &props.paint {
                    push(src);
                }
            }
            ObjectKind::Image(props) => push(&props.src),
            ObjectKind::MaskedPhoto(config) => {
                if let Some(src) = &config.custom_mask_src {
                    push(src);
                }
                if config.variable_binding.is_none() && object.data.field.is_none() {
                    if let Some(src) = &config.photo_src {
                        push(src);
                    }
                }
            }
            _ => {}
        }
    }
    urls
}

/// Make every template image reference fetchable
pub fn rebase_template_images(side: &mut Side, resolver: &PhotoResolver) {
    if let Background::Image { src } = &mut side.background {
        *src = resolver.rebase(src);
    }
    for object in side.objects.iter_mut() {
        if let Some(src) = &mut object.data.custom_mask_src {
            *src = resolver.rebase(src);
        }
        match &mut object.kind {
            ObjectKind::GroupBackground(props) => {
                if let Background::Image { src } = &mut props.paint {
                    *src = resolver.rebase(src);
                }
            }
            ObjectKind::Image(props) => props.src = resolver.rebase(&props.src),
            ObjectKind::MaskedPhoto(config) => {
                if let Some(src) = &mut config.custom_mask_src {
                    *src = resolver.rebase(src);
                }
                if let Some(src) = &mut config.photo_src {
                    *src = resolver.rebase(src);
                }
            }
            _ => {}
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::text::ApproxShaper;
    use card_template::{
        BarcodeProps, MaskConfig, MaskShape, ObjectData, PlaceholderProps, SideSize, TextProps,
        Transform,
    };

    fn ctx<'a>(resolver: &'a PhotoResolver, index: &'a PhotoIndex) -> ResolveContext<'a> {
        ResolveContext {
            resolver,
            index,
            shaper: &ApproxShaper,
            min_font_size: 10.0,
        }
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    fn side_with(objects: Vec<DesignObject>) -> Side {
        let mut side = Side::new(SideSize::default());
        side.objects = objects;
        side
    }

    #[test]
    fn test_template_is_untouched() {
        let template = side_with(vec![DesignObject::new(
            "t",
            ObjectKind::Text(TextProps::new("Hello {{name}}")),
            Transform::default(),
        )]);
        let resolver = PhotoResolver::default();
        let index = PhotoIndex::new();
        let applied = apply_record(&template, &record(&[("name", "Ada")]), &ctx(&resolver, &index));

        let text = applied.side.objects[0].kind.text().unwrap();
        assert_eq!(text.text, "Hello Ada");
        assert_eq!(
            template.objects[0].kind.text().unwrap().text,
            "Hello {{name}}"
        );

        // Reapplying starts from the authored text again
        let again = apply_record(
            &applied.side,
            &record(&[("name", "Grace")]),
            &ctx(&resolver, &index),
        );
        assert_eq!(again.side.objects[0].kind.text().unwrap().text, "Hello Grace");
    }

    #[test]
    fn test_auto_fit_shrinks() {
        let mut object = DesignObject::new(
            "t",
            ObjectKind::VariableText(TextProps::new("{{name}}").with_font_size(40.0)),
            Transform::from_rect(card_template::Rect::new(0.0, 0.0, 100.0, 60.0)),
        );
        object.data.auto_font_size = true;
        let template = side_with(vec![object]);
        let resolver = PhotoResolver::default();
        let index = PhotoIndex::new();
        let applied = apply_record(
            &template,
            &record(&[("name", "Maximilian")]),
            &ctx(&resolver, &index),
        );
        let props = applied.side.objects[0].kind.text().unwrap();
        assert!(props.font_size < 40.0);
        assert!(props.font_size >= 10.0);
    }

    #[test]
    fn test_codes_take_record_values() {
        let template = side_with(vec![DesignObject::new(
            "b",
            ObjectKind::Barcode(BarcodeProps {
                data_field: "roll_no".to_string(),
                ..Default::default()
            }),
            Transform::default(),
        )]);
        let resolver = PhotoResolver::default();
        let index = PhotoIndex::new();
        let applied = apply_record(&template, &record(&[("roll_no", "R-9")]), &ctx(&resolver, &index));
        match &applied.side.objects[0].kind {
            ObjectKind::Barcode(props) => assert_eq!(props.value.as_deref(), Some("R-9")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_photo_is_an_issue_not_an_error() {
        let template = side_with(vec![DesignObject::new(
            "p",
            ObjectKind::PhotoPlaceholder(PlaceholderProps::default()),
            Transform::default(),
        )]);
        let resolver = PhotoResolver::default();
        let index = PhotoIndex::new();
        let applied = apply_record(&template, &record(&[("name", "x")]), &ctx(&resolver, &index));
        assert!(applied.photos.is_empty());
        assert_eq!(
            applied.issues,
            vec![RecordIssue::PhotoMissing {
                object: ObjectId::new("p")
            }]
        );
    }

    #[test]
    fn test_substitute_keeps_slot_and_mask() {
        let placeholder = DesignObject::new(
            "p",
            ObjectKind::PhotoPlaceholder(PlaceholderProps::default()),
            Transform::default(),
        )
        .with_data(ObjectData {
            mask: Some(MaskShape::Star),
            headroom_pct: Some(30.0),
            ..Default::default()
        });
        let top = DesignObject::new("t", ObjectKind::Text(TextProps::new("x")), Transform::default());
        let mut side = side_with(vec![placeholder, top]);

        substitute_photo(
            &mut side,
            &PhotoRequest {
                object: ObjectId::new("p"),
                url: "http://x/p.png".to_string(),
            },
        );
        assert_eq!(side.index_of(&ObjectId::new("p")), Some(0));
        match &side.objects[0].kind {
            ObjectKind::Image(props) => {
                assert_eq!(props.clip, Some(MaskShape::Star));
                assert_eq!(props.fit, ImageFit::Cover);
                assert_eq!(props.position, Point::new(50.0, 30.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_static_masked_photo_is_not_a_slot() {
        let config = MaskConfig {
            photo_src: Some("/static/logo.png".to_string()),
            ..Default::default()
        };
        let mut template = side_with(vec![DesignObject::new(
            "m",
            ObjectKind::MaskedPhoto(config),
            Transform::default(),
        )]);
        let resolver = PhotoResolver::new("http://api");
        let index = PhotoIndex::new();
        let applied = apply_record(&template, &record(&[("photo", "a.png")]), &ctx(&resolver, &index));
        assert!(applied.photos.is_empty());

        rebase_template_images(&mut template, &resolver);
        assert_eq!(
            template_image_urls(&template),
            vec!["http://api/static/logo.png".to_string()]
        );
    }
}
