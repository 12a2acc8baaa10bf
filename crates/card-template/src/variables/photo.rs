//! Photo source resolution for placeholders and masked photos.

use crate::record::Record;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Record fields holding an already processed (cropped, background removed) photo
pub const PROCESSED_PHOTO_FIELDS: &[&str] = &["cropped_photo_url", "processed_photo_url"];

/// Record fields holding a direct photo URL, first present wins
pub const DIRECT_PHOTO_FIELDS: &[&str] = &["photo", "photo_url", "image", "profilePic"];

/// Record fields tried against the uploaded-photo index
pub const IDENTIFIER_FIELDS: &[&str] = &[
    "roll_no",
    "rollno",
    "roll_number",
    "id",
    "student_id",
    "filename",
    "name",
];

pub const DEFAULT_BACKEND_ORIGIN: &str = "http://localhost:3001";

/// Where a project's uploaded photos are served from, under the origin
pub const PROJECT_PHOTOS_PATH: &str = "uploads/project-photos";

static SCHEME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").expect("scheme pattern is valid"));

/// Uploaded photo lookup: file name -> URL
///
/// Every photo is reachable by its full name and by its name without
/// extension, each as uploaded and lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoIndex {
    entries: HashMap<String, String>,
}

impl PhotoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `url` under every key derived from `file_name`
    pub fn insert(&mut self, file_name: &str, url: impl Into<String>) {
        let url = url.into();
        let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
        let stem = strip_extension(base);

        for key in [base, stem] {
            if key.is_empty() {
                continue;
            }
            self.entries.insert(key.to_string(), url.clone());
            self.entries.insert(key.to_lowercase(), url.clone());
        }
    }

    /// Find a photo for an identifier or file name, ignoring case and extension
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let lower = key.to_lowercase();
        [key, lower.as_str(), strip_extension(&lower)]
            .into_iter()
            .find_map(|candidate| self.entries.get(candidate))
            .map(String::as_str)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, String)> for PhotoIndex {
    fn from_iter<I: IntoIterator<Item = (&'a str, String)>>(iter: I) -> Self {
        let mut index = PhotoIndex::new();
        for (name, url) in iter {
            index.insert(name, url);
        }
        index
    }
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Resolves the photo URL a record supplies for a photo slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoResolver {
    origin: String,
    project: Option<String>,
}

impl Default for PhotoResolver {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_ORIGIN)
    }
}

impl PhotoResolver {
    pub fn new(origin: impl Into<String>) -> Self {
        let origin: String = origin.into();
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            project: None,
        }
    }

    /// Bare file names resolve into this project's photo folder
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        let project: String = project.into();
        let project = project.trim();
        self.project = (!project.is_empty()).then(|| project.to_string());
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Resolve a photo for one slot.
    ///
    /// Precedence: processed photo, the slot's bound field (looked up in the
    /// index first, otherwise taken as a URL), direct photo fields, then the
    /// index keyed by identifier fields. `None` leaves the placeholder as is.
    pub fn resolve(&self, field: Option<&str>, record: &Record, index: &PhotoIndex) -> Option<String> {
        if let Some(url) = first_present(record, PROCESSED_PHOTO_FIELDS) {
            return Some(self.rebase(url));
        }

        if let Some(value) = field.and_then(|f| record.non_empty(f.trim())) {
            return Some(match index.lookup(value) {
                Some(url) => self.rebase(url),
                None => self.rebase(value),
            });
        }

        if let Some(url) = first_present(record, DIRECT_PHOTO_FIELDS) {
            return Some(self.rebase(url));
        }

        if !index.is_empty() {
            for id_field in IDENTIFIER_FIELDS {
                if let Some(url) = record.non_empty(id_field).and_then(|v| index.lookup(v)) {
                    return Some(self.rebase(url));
                }
            }
        }

        log::debug!("No photo for field {:?}", field.unwrap_or("photo"));
        None
    }

    /// Make a photo reference fetchable.
    ///
    /// Anything with a scheme (`http:`, `data:`, `archive:`) is left alone.
    /// Absolute paths and paths into `uploads/` are joined onto the backend
    /// origin. With a project set, a bare file name is a photo uploaded to
    /// that project and lives under its photo folder.
    pub fn rebase(&self, url: &str) -> String {
        let url = url.trim();
        if SCHEME_PATTERN.is_match(url) {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.origin, url)
        } else if url.starts_with("uploads/") {
            format!("{}/{}", self.origin, url)
        } else if let Some(project) = &self.project {
            format!(
                "{}/{}/{}/{}",
                self.origin,
                PROJECT_PHOTOS_PATH,
                urlencoding::encode(project),
                urlencoding::encode(url)
            )
        } else {
            format!("{}/{}", self.origin, url)
        }
    }
}

fn first_present<'a>(record: &'a Record, fields: &[&str]) -> Option<&'a str> {
    fields.iter().find_map(|field| record.non_empty(field))
}
