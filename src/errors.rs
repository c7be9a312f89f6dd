use std::path::PathBuf;

use sea_orm::DbErr;

/// Domain errors raised by layer, upload and permission operations.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("Saving of this file type is not supported: {0}")]
    InvalidFileType(String),

    #[error(
        "Expected helper file {missing} does not exist; a Shapefile requires helper files with the following extensions: {required}"
    )]
    MissingHelperFile { missing: String, required: String },

    #[error(
        "Multiple helper files for {0} exist; they need to be distinct by spelling and not just case."
    )]
    DuplicateHelperFiles(PathBuf),

    #[error("Invalid user: {0}")]
    InvalidUser(String),

    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    #[error("Invalid layer name: {0}")]
    InvalidLayerName(String),

    #[error("Unknown permission: {0}")]
    InvalidPermission(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid rating: {0}")]
    InvalidRating(i32),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LayerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LayerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LayerError::NotFound { .. })
    }
}

pub type LayerResult<T> = Result<T, LayerError>;

/// A form validation failure, optionally tied to one field.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ValidationError {
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}: {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}
