//! Substring search across group names, person names and notes.

use crate::model::group::Group;
use crate::model::person::Person;

/// One group that survived the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// The group with `people` narrowed to the visible entries.
    pub group: Group,
    /// The group should be shown expanded.
    pub auto_expand: bool,
}

fn contains(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn person_matches(person: &Person, needle_lower: &str) -> bool {
    contains(&person.name, needle_lower)
        || person
            .notes
            .as_deref()
            .is_some_and(|notes| contains(notes, needle_lower))
}

/// Filters `groups` by `query`, keeping input order.
///
/// A blank query returns every group untouched and expands none. A group whose
/// own name matches keeps all of its people; otherwise only matching people
/// are kept.
pub fn search_groups(groups: &[Group], query: &str) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return groups
            .iter()
            .map(|group| SearchHit {
                group: group.clone(),
                auto_expand: false,
            })
            .collect();
    }

    groups
        .iter()
        .filter_map(|group| {
            let name_hit = contains(&group.name, &needle);
            let people: Vec<Person> = group
                .people
                .iter()
                .filter(|person| name_hit || person_matches(person, &needle))
                .cloned()
                .collect();
            if !name_hit && people.is_empty() {
                return None;
            }
            Some(SearchHit {
                group: Group {
                    people,
                    ..group.clone()
                },
                auto_expand: true,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::search_groups;
    use crate::model::group::Group;
    use crate::model::person::Person;
    use uuid::Uuid;

    fn fixture() -> Vec<Group> {
        let mut work = Group::with_id(Uuid::new_v4(), "Work", 1).expect("valid group");
        work.people.push(
            Person::with_id(Uuid::new_v4(), "Alice", Some("Met at the Conference"), 1)
                .expect("valid person"),
        );
        work.people
            .push(Person::with_id(Uuid::new_v4(), "Bob", None, 1).expect("valid person"));
        let family = Group::with_id(Uuid::new_v4(), "Family", 1).expect("valid group");
        vec![work, family]
    }

    #[test]
    fn blank_query_returns_everything_collapsed() {
        let hits = search_groups(&fixture(), "   ");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| !hit.auto_expand));
        assert_eq!(hits[0].group.people.len(), 2);
    }

    #[test]
    fn notes_match_case_insensitively() {
        let hits = search_groups(&fixture(), "conference");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].auto_expand);
        assert_eq!(hits[0].group.people.len(), 1);
        assert_eq!(hits[0].group.people[0].name, "Alice");
    }

    #[test]
    fn group_name_match_keeps_all_people() {
        let hits = search_groups(&fixture(), "WOR");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].group.people.len(), 2);
    }

    #[test]
    fn no_match_returns_nothing() {
        assert!(search_groups(&fixture(), "zzz").is_empty());
    }
}
