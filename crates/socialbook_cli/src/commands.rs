use crate::cli::{Command, GroupCommand, PersonCommand};
use socialbook_core::{
    AppConfig, Group, ImportMode, PersonPatch, SocialStore, StorageAdapter, StoreSnapshot,
    SyncStatus,
};
use std::path::Path;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub async fn run<A: StorageAdapter + 'static>(
    store: &SocialStore<A>,
    config: &AppConfig,
    config_path: &Path,
    command: Command,
) -> CmdResult {
    match command {
        Command::Group { group_cmd } => run_group(store, group_cmd).await,
        Command::Person { person_cmd } => run_person(store, person_cmd).await,
        Command::Search { query } => {
            let hits = store.search(&query);
            if hits.is_empty() {
                println!("No matches.");
            }
            for hit in hits {
                print_group(&hit.group);
            }
            Ok(())
        }
        Command::Export { group, person, out } => {
            let json = match (group, person) {
                (Some(group_id), Some(person_id)) => {
                    let export = store
                        .export_person(group_id, person_id)
                        .ok_or("person not found")?;
                    serde_json::to_string_pretty(&export)?
                }
                (Some(group_id), None) => {
                    let export = store.export_group(group_id).ok_or("group not found")?;
                    serde_json::to_string_pretty(&export)?
                }
                _ => serde_json::to_string_pretty(&store.export_all())?,
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("✓ Exported to {}", path.display());
                }
                None => println!("{json}"),
            }
            Ok(())
        }
        Command::Import { path, merge } => {
            let raw = std::fs::read_to_string(&path)?;
            let mode = if merge {
                ImportMode::Merge
            } else {
                ImportMode::Replace
            };
            let summary = store.import_json(&raw, mode).await?;
            println!(
                "✓ Imported {} groups and {} people ({:?})",
                summary.groups, summary.people, summary.mode
            );
            Ok(())
        }
        Command::Theme { key } => {
            if let Some(key) = key {
                store.set_theme(key).await?;
            }
            println!("{}", store.preferences().theme);
            Ok(())
        }
        Command::Sort { mode } => {
            if let Some(mode) = mode {
                store.set_sort(mode).await?;
            }
            println!("{}", store.preferences().sort);
            Ok(())
        }
        Command::InitConfig => {
            config.save_to(config_path)?;
            println!("✓ Wrote {}", config_path.display());
            Ok(())
        }
    }
}

async fn run_group<A: StorageAdapter + 'static>(
    store: &SocialStore<A>,
    cmd: GroupCommand,
) -> CmdResult {
    match cmd {
        GroupCommand::List => {
            let groups = store.sorted_groups();
            if groups.is_empty() {
                println!("No groups yet.");
            }
            for group in &groups {
                print_group(group);
            }
            print_sync(&store.snapshot());
        }
        GroupCommand::Add { name } => {
            let group = store.create_group(&name).await?;
            println!("✓ Group created: {} ({})", group.name, group.id);
        }
        GroupCommand::Rename { id, name } => match store.rename_group(id, &name).await? {
            Some(group) => println!("✓ Group renamed: {}", group.name),
            None => println!("No group with id {id}"),
        },
        GroupCommand::Rm { id } => {
            if store.delete_group(id).await? {
                println!("✓ Group deleted");
            } else {
                println!("No group with id {id}");
            }
        }
    }
    Ok(())
}

async fn run_person<A: StorageAdapter + 'static>(
    store: &SocialStore<A>,
    cmd: PersonCommand,
) -> CmdResult {
    match cmd {
        PersonCommand::Add { group, name, notes } => {
            let person = store.create_person(group, &name, notes.as_deref()).await?;
            println!("✓ Person added: {} ({})", person.name, person.id);
        }
        PersonCommand::Edit {
            group,
            id,
            name,
            notes,
            clear_notes,
        } => {
            let mut patch = PersonPatch::default();
            if let Some(name) = name {
                patch = patch.with_name(name);
            }
            if clear_notes {
                patch = patch.with_notes(None);
            } else if let Some(notes) = notes {
                patch = patch.with_notes(Some(notes));
            }
            match store.update_person(group, id, patch).await? {
                Some(person) => println!("✓ Person updated: {}", person.name),
                None => println!("No person {id} in group {group}"),
            }
        }
        PersonCommand::Rm { group, id } => {
            if store.delete_person(group, id).await? {
                println!("✓ Person removed");
            } else {
                println!("No person {id} in group {group}");
            }
        }
        PersonCommand::Mv { id, from, to } => match store.move_person(from, id, to).await? {
            Some(person) => println!("✓ Moved {} to {to}", person.name),
            None => println!("No person {id} in group {from}"),
        },
    }
    Ok(())
}

fn print_group(group: &Group) {
    println!("{}  {}  ({} people)", group.id, group.name, group.people.len());
    for person in &group.people {
        match person.notes.as_deref() {
            Some(notes) => println!("    {}  {}  - {}", person.id, person.name, notes),
            None => println!("    {}  {}", person.id, person.name),
        }
    }
}

fn print_sync(snapshot: &StoreSnapshot) {
    if let SyncStatus::Failed(err) = &snapshot.sync {
        eprintln!("warning: unsynced changes ({err})");
    }
}
