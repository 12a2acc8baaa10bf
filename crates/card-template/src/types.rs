use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
    #[error("Duplicate object id: {0}")]
    DuplicateId(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TemplateError>;

/// Which face of a card a scene graph describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideKind {
    #[default]
    Front,
    Back,
}
