//! Sort laws: `az` is total and stable, `za` is its exact reverse, `recent`
//! orders by `updated_at` descending with id as the tie breaker.

use crate::model::group::Group;
use crate::model::person::Person;
use crate::model::prefs::SortMode;
use std::cmp::Ordering;
use uuid::Uuid;

/// Fields the sort modes read.
pub trait Sortable {
    fn sort_name(&self) -> &str;
    fn sort_id(&self) -> Uuid;
    fn sort_updated_at(&self) -> i64;
}

impl Sortable for Group {
    fn sort_name(&self) -> &str {
        &self.name
    }

    fn sort_id(&self) -> Uuid {
        self.id
    }

    fn sort_updated_at(&self) -> i64 {
        self.updated_at
    }
}

impl Sortable for Person {
    fn sort_name(&self) -> &str {
        &self.name
    }

    fn sort_id(&self) -> Uuid {
        self.id
    }

    fn sort_updated_at(&self) -> i64 {
        self.updated_at
    }
}

fn compare_az<T: Sortable>(left: &T, right: &T) -> Ordering {
    left.sort_name()
        .to_lowercase()
        .cmp(&right.sort_name().to_lowercase())
        .then_with(|| left.sort_name().cmp(right.sort_name()))
        .then_with(|| left.sort_id().cmp(&right.sort_id()))
}

fn compare_recent<T: Sortable>(left: &T, right: &T) -> Ordering {
    right
        .sort_updated_at()
        .cmp(&left.sort_updated_at())
        .then_with(|| left.sort_id().cmp(&right.sort_id()))
}

pub fn sort_by_mode<T: Sortable>(items: &mut [T], mode: SortMode) {
    match mode {
        SortMode::Az => items.sort_by(compare_az),
        SortMode::Za => items.sort_by(|left, right| compare_az(right, left)),
        SortMode::Recent => items.sort_by(compare_recent),
    }
}

/// Copy of `groups` with groups and each group's people ordered by `mode`.
pub fn sorted_view(groups: &[Group], mode: SortMode) -> Vec<Group> {
    let mut view = groups.to_vec();
    sort_by_mode(&mut view, mode);
    for group in &mut view {
        sort_by_mode(&mut group.people, mode);
    }
    view
}
