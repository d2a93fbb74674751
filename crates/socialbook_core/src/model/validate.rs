//! Boundary validation for user-submitted names and notes.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected user input. Raised before any state mutation or storage call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Group name is blank after trimming.
    BlankGroupName,
    /// Person name is blank after trimming.
    BlankPersonName,
    /// An id appears more than once across the dataset.
    DuplicateId(String),
    /// A record references a group that does not exist.
    UnknownGroup(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankGroupName => write!(f, "group name must not be blank"),
            Self::BlankPersonName => write!(f, "person name must not be blank"),
            Self::DuplicateId(id) => write!(f, "duplicate id in dataset: {id}"),
            Self::UnknownGroup(id) => write!(f, "record references unknown group: {id}"),
        }
    }
}

impl Error for ValidationError {}

/// Trims a group name, rejecting blank input.
pub fn normalize_group_name(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankGroupName);
    }
    Ok(trimmed.to_string())
}

/// Trims a person name, rejecting blank input.
pub fn normalize_person_name(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankPersonName);
    }
    Ok(trimmed.to_string())
}

/// Trims notes; blank notes collapse to `None`.
pub fn normalize_notes(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}
