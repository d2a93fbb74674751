//! Person record and partial-update patch.

use crate::model::validate::{normalize_notes, normalize_person_name, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a person, unique across the whole dataset.
pub type PersonId = Uuid;

/// One named contact entry owned by exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    /// Trimmed, never blank.
    pub name: String,
    /// Trimmed; blank notes are stored as `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Unix epoch milliseconds. Bumped on every edit.
    #[serde(default)]
    pub updated_at: i64,
}

impl Person {
    /// Creates a person with a caller-provided id after normalizing input.
    ///
    /// # Errors
    /// - `ValidationError::BlankPersonName` when `name` trims to empty.
    pub fn with_id(
        id: PersonId,
        name: &str,
        notes: Option<&str>,
        now_ms: i64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            name: normalize_person_name(name)?,
            notes: normalize_notes(notes),
            created_at: now_ms,
            updated_at: now_ms,
        })
    }

    /// Applies an already-normalized patch and stamps `updated_at`.
    pub(crate) fn apply(&mut self, patch: NormalizedPatch, updated_at: i64) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        self.updated_at = updated_at;
    }
}

/// Partial update for a person.
///
/// `notes: Some(None)` clears the notes; `notes: None` leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub notes: Option<Option<String>>,
}

impl PersonPatch {
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            name: Some(value.into()),
            notes: None,
        }
    }

    pub fn notes(value: impl Into<String>) -> Self {
        Self {
            name: None,
            notes: Some(Some(value.into())),
        }
    }

    pub fn clear_notes() -> Self {
        Self {
            name: None,
            notes: Some(None),
        }
    }

    pub fn with_name(mut self, value: impl Into<String>) -> Self {
        self.name = Some(value.into());
        self
    }

    pub fn with_notes(mut self, value: Option<String>) -> Self {
        self.notes = Some(value);
        self
    }

    /// Validates and trims the patch fields.
    ///
    /// # Errors
    /// - `ValidationError::BlankPersonName` when a provided name is blank.
    pub fn normalize(&self) -> Result<NormalizedPatch, ValidationError> {
        let name = match self.name.as_deref() {
            Some(value) => Some(normalize_person_name(value)?),
            None => None,
        };
        let notes = self
            .notes
            .as_ref()
            .map(|value| normalize_notes(value.as_deref()));
        Ok(NormalizedPatch { name, notes })
    }
}

/// Patch whose fields have passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPatch {
    pub(crate) name: Option<String>,
    pub(crate) notes: Option<Option<String>>,
}

impl NormalizedPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.notes.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{Person, PersonPatch};
    use crate::model::validate::ValidationError;
    use uuid::Uuid;

    #[test]
    fn with_id_trims_and_drops_blank_notes() {
        let person = Person::with_id(Uuid::new_v4(), "  Alice ", Some("   "), 10)
            .expect("person should be valid");
        assert_eq!(person.name, "Alice");
        assert_eq!(person.notes, None);
        assert_eq!(person.created_at, 10);
        assert_eq!(person.updated_at, 10);
    }

    #[test]
    fn patch_rejects_blank_name_before_apply() {
        let err = PersonPatch::name("  ")
            .normalize()
            .expect_err("blank name must fail");
        assert_eq!(err, ValidationError::BlankPersonName);
    }

    #[test]
    fn patch_updates_only_provided_fields() {
        let mut person = Person::with_id(Uuid::new_v4(), "Alice", Some("old"), 1)
            .expect("person should be valid");

        let patch = PersonPatch::name("Alicia").normalize().expect("valid patch");
        person.apply(patch, 2);
        assert_eq!(person.name, "Alicia");
        assert_eq!(person.notes.as_deref(), Some("old"));

        let patch = PersonPatch::clear_notes().normalize().expect("valid patch");
        person.apply(patch, 3);
        assert_eq!(person.name, "Alicia");
        assert_eq!(person.notes, None);
        assert_eq!(person.updated_at, 3);
    }

    #[test]
    fn serialization_omits_absent_notes() {
        let person = Person::with_id(Uuid::nil(), "Bob", None, 7).expect("valid person");
        let json = serde_json::to_value(&person).expect("person should serialize");
        assert!(json.get("notes").is_none());
        assert_eq!(json["createdAt"], 7);
        assert_eq!(json["updatedAt"], 7);
    }
}
