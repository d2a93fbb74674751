//! Whole-dataset container persisted by storage adapters.

use crate::model::group::{Group, GroupId};
use crate::model::person::{Person, PersonId};
use crate::model::validate::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Full group/person dataset for one user.
///
/// Serialized as `{ "groups": [...] }`; a missing `groups` key reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, group_id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub(crate) fn group_mut(&mut self, group_id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|group| group.id == group_id)
    }

    pub(crate) fn group_index(&self, group_id: GroupId) -> Option<usize> {
        self.groups.iter().position(|group| group.id == group_id)
    }

    /// Finds a person anywhere in the dataset together with its owning group id.
    pub fn find_person(&self, person_id: PersonId) -> Option<(GroupId, &Person)> {
        self.groups.iter().find_map(|group| {
            group
                .person(person_id)
                .map(|person| (group.id, person))
        })
    }

    pub fn person_count(&self) -> usize {
        self.groups.iter().map(|group| group.people.len()).sum()
    }

    /// Returns whether `id` is already used by any group or person.
    pub fn contains_id(&self, id: Uuid) -> bool {
        self.groups
            .iter()
            .any(|group| group.id == id || group.person(id).is_some())
    }

    /// Generates an id not yet used anywhere in the dataset.
    pub(crate) fn fresh_id(&self) -> Uuid {
        loop {
            let candidate = Uuid::new_v4();
            if !self.contains_id(candidate) {
                return candidate;
            }
        }
    }

    /// Checks dataset-wide invariants.
    ///
    /// # Errors
    /// - `BlankGroupName` / `BlankPersonName` for untrimmed-blank names.
    /// - `DuplicateId` when a group or person id is reused anywhere.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(ValidationError::BlankGroupName);
            }
            if !seen.insert(group.id) {
                return Err(ValidationError::DuplicateId(group.id.to_string()));
            }
            for person in &group.people {
                if person.name.trim().is_empty() {
                    return Err(ValidationError::BlankPersonName);
                }
                if !seen.insert(person.id) {
                    return Err(ValidationError::DuplicateId(person.id.to_string()));
                }
            }
        }
        Ok(())
    }
}
