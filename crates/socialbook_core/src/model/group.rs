//! Group record: a named collection of people.

use crate::model::clock::{next_timestamp, Clock};
use crate::model::person::{Person, PersonId};
use crate::model::validate::{normalize_group_name, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a group, unique across the whole dataset.
pub type GroupId = Uuid;

/// Named collection of people.
///
/// `people` keeps insertion order, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Group {
    /// Creates an empty group with a caller-provided id.
    ///
    /// # Errors
    /// - `ValidationError::BlankGroupName` when `name` trims to empty.
    pub fn with_id(id: GroupId, name: &str, now_ms: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            name: normalize_group_name(name)?,
            people: Vec::new(),
            created_at: now_ms,
            updated_at: now_ms,
        })
    }

    pub fn person(&self, person_id: PersonId) -> Option<&Person> {
        self.people.iter().find(|person| person.id == person_id)
    }

    pub(crate) fn person_mut(&mut self, person_id: PersonId) -> Option<&mut Person> {
        self.people.iter_mut().find(|person| person.id == person_id)
    }

    /// Latest `updated_at` among this group's people.
    pub fn latest_person_update(&self) -> Option<i64> {
        self.people.iter().map(|person| person.updated_at).max()
    }

    /// Bumps `updated_at`, never below `floor` (the stamp of a child edit).
    pub(crate) fn touch(&mut self, clock: &dyn Clock, floor: i64) -> i64 {
        self.updated_at = next_timestamp(clock, self.updated_at).max(floor);
        self.updated_at
    }

    /// Raises `updated_at` to cover every person stamp. Used for imported data.
    pub(crate) fn reconcile_updated_at(&mut self) {
        if let Some(latest) = self.latest_person_update() {
            self.updated_at = self.updated_at.max(latest);
        }
    }
}
