//! `{{field}}` token scanning and substitution.

use crate::record::Record;
use crate::scene::{DesignObject, ObjectKind, Side};
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// `{{name}}` where name is anything up to the first `}`
static VARIABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("variable pattern is valid"));

/// Field names referenced by tokens in `text`, trimmed, in order of appearance
pub fn variable_names(text: &str) -> impl Iterator<Item = &str> {
    VARIABLE_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str().trim())
        .filter(|name| !name.is_empty())
}

pub fn has_variables(text: &str) -> bool {
    VARIABLE_PATTERN.is_match(text)
}

/// Replace every `{{name}}` with the record's value.
///
/// Tokens whose field is absent stay in the output unchanged so gaps are
/// visible on proofs.
pub fn resolve_text(template: &str, record: &Record) -> String {
    VARIABLE_PATTERN
        .replace_all(template, |caps: &Captures| {
            let name = caps[1].trim();
            match record.get(name) {
                Some(value) => value.to_string(),
                None => {
                    log::debug!("No value for {{{{{}}}}}, leaving it in place", name);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// The authored text of a text-like object, before any substitution
pub fn original_text(object: &DesignObject) -> Option<&str> {
    object
        .data
        .original_text
        .as_deref()
        .or_else(|| object.kind.text().map(|props| props.text.as_str()))
}

/// Display string of a text-like object for one record.
///
/// Authored text carrying tokens is resolved token by token. A variable-text
/// object without tokens shows its bound field's value, or nothing when the
/// record lacks it. Plain text is returned as authored.
pub fn resolve_object_text(object: &DesignObject, record: &Record) -> Option<String> {
    let source = original_text(object)?;
    if has_variables(source) {
        return Some(resolve_text(source, record));
    }
    match (&object.kind, object.data.field.as_deref()) {
        (ObjectKind::VariableText(_), Some(field)) => {
            Some(record.get(field).unwrap_or_default().to_string())
        }
        _ => Some(source.to_string()),
    }
}

/// Encoded value of a barcode or QR code for one record.
///
/// `data_field` may be a `{{}}` template, the name of a record field, or a
/// literal value. Returns `None` when the result is blank.
pub fn resolve_code_data(data_field: &str, record: &Record) -> Option<String> {
    let trimmed = data_field.trim();
    let value = if has_variables(trimmed) {
        resolve_text(trimmed, record)
    } else if let Some(value) = record.get(trimmed) {
        value.to_string()
    } else {
        trimmed.to_string()
    };
    (!value.trim().is_empty()).then_some(value)
}

/// Every field the side depends on: tokens in original text and code data,
/// plus explicit bindings
pub fn extract_variables(side: &Side) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    for object in &side.objects {
        if let Some(text) = original_text(object) {
            names.extend(variable_names(text).map(str::to_string));
        }

        match &object.kind {
            ObjectKind::Barcode(props) => collect_code_fields(&props.data_field, &mut names),
            ObjectKind::Qrcode(props) => collect_code_fields(&props.data_field, &mut names),
            _ => {}
        }

        if let Some(field) = object.bound_field() {
            let field = field.trim();
            if !field.is_empty() {
                names.insert(field.to_string());
            }
        }
    }

    names
}

fn collect_code_fields(data_field: &str, names: &mut BTreeSet<String>) {
    if has_variables(data_field) {
        names.extend(variable_names(data_field).map(str::to_string));
    } else if is_field_name(data_field) {
        names.insert(data_field.trim().to_string());
    }
}

/// Bare identifiers like `roll_no` are field references; anything else is a literal
fn is_field_name(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        && value.chars().next().is_some_and(|c| !c.is_ascii_digit())
}

/// Fields feeding photo slots; a slot without a binding reads `photo`
pub fn extract_photo_fields(side: &Side) -> BTreeSet<String> {
    side.objects
        .iter()
        .filter(|object| object.is_photo_slot())
        .map(|object| {
            object
                .bound_field()
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .unwrap_or("photo")
                .to_string()
        })
        .collect()
}
