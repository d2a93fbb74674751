//! Export documents.
//!
//! Flat shape: `{ "groups": [...], "people": [...] }` with each person
//! pointing at its group through `groupId`.

use crate::model::dataset::Dataset;
use crate::model::group::{Group, GroupId};
use crate::model::person::{Person, PersonId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedGroup {
    pub id: GroupId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedPerson {
    pub id: PersonId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub group_id: GroupId,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub groups: Vec<ExportedGroup>,
    pub people: Vec<ExportedPerson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupExport {
    pub group: ExportedGroup,
    pub people: Vec<ExportedPerson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonExport {
    pub person: ExportedPerson,
}

impl From<&Group> for ExportedGroup {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

impl ExportedPerson {
    fn from_person(person: &Person, group_id: GroupId) -> Self {
        Self {
            id: person.id,
            name: person.name.clone(),
            notes: person.notes.clone(),
            group_id,
            created_at: person.created_at,
            updated_at: person.updated_at,
        }
    }
}

fn people_of(group: &Group) -> impl Iterator<Item = ExportedPerson> + '_ {
    group
        .people
        .iter()
        .map(move |person| ExportedPerson::from_person(person, group.id))
}

/// Flat export of the whole dataset in stored order.
pub fn export_dataset(dataset: &Dataset) -> ExportDocument {
    ExportDocument {
        groups: dataset.groups.iter().map(ExportedGroup::from).collect(),
        people: dataset.groups.iter().flat_map(people_of).collect(),
    }
}

pub fn export_group(group: &Group) -> GroupExport {
    GroupExport {
        group: ExportedGroup::from(group),
        people: people_of(group).collect(),
    }
}

pub fn export_person(person: &Person, group_id: GroupId) -> PersonExport {
    PersonExport {
        person: ExportedPerson::from_person(person, group_id),
    }
}
