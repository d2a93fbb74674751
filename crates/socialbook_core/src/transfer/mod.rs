//! JSON export and import of the dataset.
//!
//! # Responsibility
//! - Render the flat export document and per-entity exports.
//! - Parse and fully validate import documents before anything is applied.
//!
//! # Invariants
//! - A failed import never yields a partial dataset.
//! - Export ids round-trip through import unchanged.

use crate::model::validate::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod export;
pub mod import;

pub use export::{export_dataset, export_group, export_person, ExportDocument};
pub use import::{merge_dataset, parse_import, ImportMode, ImportSummary};

pub type ImportResult<T> = Result<T, ImportError>;

/// Import rejection; the dataset is untouched when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Not JSON, or not one of the accepted shapes.
    Parse(String),
    /// Well-formed, but breaks a dataset invariant.
    Invalid(ValidationError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "import parse failed: {message}"),
            Self::Invalid(err) => write!(f, "import rejected: {err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(_) => None,
            Self::Invalid(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ImportError {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value)
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}
