//! Import parsing and merge.
//!
//! Accepted shapes:
//! - flat export: `groups` plus `people` (or `names`), person name as `name`
//!   (or `firstName`), optional `createdAt`/`updatedAt`;
//! - the persisted nested layout: `groups[].people[]`.

use crate::model::clock::Clock;
use crate::model::dataset::Dataset;
use crate::model::group::{Group, GroupId};
use crate::model::person::{Person, PersonId};
use crate::model::validate::{normalize_notes, ValidationError};
use crate::transfer::{ImportError, ImportResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

/// How an import combines with the current dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// The dataset becomes exactly the imported one.
    #[default]
    Replace,
    /// Groups and people are upserted by id; everything else is kept.
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub mode: ImportMode,
    pub groups: usize,
    pub people: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatGroup {
    id: GroupId,
    name: String,
    created_at: Option<i64>,
    updated_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatPerson {
    id: PersonId,
    #[serde(alias = "firstName")]
    name: String,
    #[serde(default)]
    notes: Option<String>,
    group_id: GroupId,
    created_at: Option<i64>,
    updated_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FlatDocument {
    #[serde(default)]
    groups: Vec<FlatGroup>,
    #[serde(default, alias = "names")]
    people: Vec<FlatPerson>,
}

/// Parses and validates an import document into a standalone dataset.
///
/// Missing timestamps are filled with `now_ms`.
///
/// # Errors
/// - `Parse` when the text is not JSON or matches neither shape.
/// - `Invalid` for blank names, duplicate ids or dangling `groupId`s.
pub fn parse_import(raw: &str, now_ms: i64) -> ImportResult<Dataset> {
    let value: Value = serde_json::from_str(raw)?;
    let Some(object) = value.as_object() else {
        return Err(ImportError::Parse("top level must be an object".to_string()));
    };

    let dataset = if object.contains_key("people") || object.contains_key("names") {
        let flat: FlatDocument = serde_json::from_value(value)?;
        from_flat(flat, now_ms)?
    } else {
        let nested: Dataset = serde_json::from_value(value)?;
        from_nested(nested, now_ms)?
    };
    dataset.validate()?;
    Ok(dataset)
}

fn from_flat(flat: FlatDocument, now_ms: i64) -> ImportResult<Dataset> {
    let mut groups = flat
        .groups
        .into_iter()
        .map(|entry| {
            let created_at = entry.created_at.or(entry.updated_at).unwrap_or(now_ms);
            let mut group = Group::with_id(entry.id, &entry.name, created_at)?;
            group.updated_at = entry.updated_at.unwrap_or(created_at);
            Ok(group)
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    for entry in flat.people {
        let created_at = entry.created_at.unwrap_or(now_ms);
        let mut person = Person::with_id(entry.id, &entry.name, entry.notes.as_deref(), created_at)?;
        person.updated_at = entry.updated_at.unwrap_or(created_at);
        let Some(group) = groups.iter_mut().find(|group| group.id == entry.group_id) else {
            return Err(ValidationError::UnknownGroup(entry.group_id.to_string()).into());
        };
        group.people.push(person);
    }

    for group in &mut groups {
        group.reconcile_updated_at();
    }
    Ok(Dataset { groups })
}

fn from_nested(mut nested: Dataset, now_ms: i64) -> ImportResult<Dataset> {
    for group in &mut nested.groups {
        let normalized = Group::with_id(group.id, &group.name, now_ms)?;
        group.name = normalized.name;
        if group.created_at == 0 {
            group.created_at = now_ms;
        }
        for person in &mut group.people {
            let normalized = Person::with_id(person.id, &person.name, None, now_ms)?;
            person.name = normalized.name;
            person.notes = normalize_notes(person.notes.as_deref());
            if person.created_at == 0 {
                person.created_at = now_ms;
            }
            person.updated_at = person.updated_at.max(person.created_at);
        }
        group.updated_at = group.updated_at.max(group.created_at);
        group.reconcile_updated_at();
    }
    Ok(nested)
}

/// Upserts `incoming` into `existing` by id.
///
/// Incoming groups overwrite the name and timestamps of a same-id group and put
/// their people first; a person moves to the group the import places it in.
/// Unknown groups are prepended in import order. Existing groups that lose or
/// gain people are touched with `clock`.
///
/// # Errors
/// - `Invalid` when the merged result would reuse an id across kinds.
pub fn merge_dataset(
    existing: &Dataset,
    incoming: Dataset,
    clock: &dyn Clock,
) -> ImportResult<Dataset> {
    let incoming_people: HashSet<PersonId> = incoming
        .groups
        .iter()
        .flat_map(|group| group.people.iter().map(|person| person.id))
        .collect();

    let mut merged = existing.clone();
    for group in &mut merged.groups {
        let before = group.people.len();
        group
            .people
            .retain(|person| !incoming_people.contains(&person.id));
        if group.people.len() != before {
            group.touch(clock, 0);
        }
    }

    let mut prepended = Vec::new();
    for incoming_group in incoming.groups {
        match merged.group_mut(incoming_group.id) {
            Some(current) => {
                let kept = std::mem::take(&mut current.people);
                current.name = incoming_group.name;
                current.created_at = incoming_group.created_at;
                current.updated_at = current.updated_at.max(incoming_group.updated_at);
                current.people = incoming_group.people;
                current.people.extend(kept);
                current.reconcile_updated_at();
                current.touch(clock, 0);
            }
            None => prepended.push(incoming_group),
        }
    }
    prepended.append(&mut merged.groups);
    merged.groups = prepended;

    merged.validate()?;
    Ok(merged)
}
