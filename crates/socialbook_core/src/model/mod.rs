//! Contacts domain model.
//!
//! # Responsibility
//! - Define the group/person records shared by storage, store and transfer.
//! - Own name/notes normalization and dataset-wide invariant checks.
//!
//! # Invariants
//! - Every person is owned by exactly one group.
//! - Group and person ids are unique across the whole dataset.
//! - Names are trimmed and never blank once inside a `Dataset`.

pub mod clock;
pub mod dataset;
pub mod group;
pub mod person;
pub mod prefs;
pub mod validate;
