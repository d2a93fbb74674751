//! `SocialStore`: CRUD over groups and people with write-through persistence.

use crate::config::AppConfig;
use crate::model::clock::{next_timestamp, Clock, SystemClock};
use crate::model::dataset::Dataset;
use crate::model::group::{Group, GroupId};
use crate::model::person::{Person, PersonId, PersonPatch};
use crate::model::prefs::{Preferences, SortMode, ThemeKey};
use crate::model::validate::{normalize_group_name, normalize_notes, normalize_person_name};
use crate::search::{search_groups, sorted_view, SearchHit};
use crate::storage::prefs::PreferenceStore;
use crate::storage::{StorageAdapter, StorageError, StorageResult};
use crate::store::writer::{closed, timeout_error, WriteQueue};
use crate::store::{StoreError, StoreResult, StoreSnapshot, SyncStatus};
use crate::transfer::export::{GroupExport, PersonExport};
use crate::transfer::{
    export_dataset, export_group, export_person, merge_dataset, parse_import, ExportDocument,
    ImportMode, ImportSummary,
};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime knobs for a store instance.
#[derive(Clone)]
pub struct StoreOptions {
    /// Bound on every adapter and preference call.
    pub timeout: Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            clock: Arc::new(SystemClock),
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: config.timeout(),
            ..Self::default()
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

enum Outcome<T> {
    Changed(T),
    Unchanged(T),
}

struct StoreState {
    dataset: Dataset,
    prefs: Preferences,
    loading: bool,
    /// Set by a successful `hydrate`, cleared by a failed one.
    loaded: bool,
    revision: u64,
    persisted_revision: u64,
    sync: SyncStatus,
}

impl StoreState {
    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            groups: self.dataset.groups.clone(),
            theme: self.prefs.theme,
            sort: self.prefs.sort,
            loading: self.loading,
            revision: self.revision,
            sync: self.sync.clone(),
        }
    }
}

struct Shared {
    state: Mutex<StoreState>,
    snapshots: watch::Sender<StoreSnapshot>,
}

impl Shared {
    fn lock(&self) -> StoreResult<MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|_| {
            StoreError::Storage(StorageError::Unavailable(
                "store state lock poisoned".to_string(),
            ))
        })
    }

    fn publish(&self, state: &StoreState) {
        self.snapshots.send_replace(state.snapshot());
    }

    fn record_save(&self, revision: u64, result: &StorageResult<()>) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match result {
            Ok(()) => {
                state.persisted_revision = state.persisted_revision.max(revision);
                state.sync = if state.persisted_revision >= state.revision {
                    SyncStatus::Synced
                } else {
                    SyncStatus::Pending
                };
            }
            Err(err) => state.sync = SyncStatus::Failed(err.clone()),
        }
        self.publish(&state);
    }
}

/// Owns the group/person dataset and keeps it persisted through `A`.
///
/// Must be created inside a Tokio runtime; the writer task is spawned there.
pub struct SocialStore<A: StorageAdapter + 'static> {
    adapter: Arc<A>,
    prefs_store: PreferenceStore,
    prefs_writes: tokio::sync::Mutex<()>,
    shared: Arc<Shared>,
    writer: WriteQueue,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl<A: StorageAdapter + 'static> SocialStore<A> {
    pub fn new(adapter: A, prefs_store: PreferenceStore) -> Self {
        Self::with_options(adapter, prefs_store, StoreOptions::default())
    }

    pub fn with_options(adapter: A, prefs_store: PreferenceStore, options: StoreOptions) -> Self {
        let state = StoreState {
            dataset: Dataset::empty(),
            prefs: Preferences::default(),
            loading: true,
            loaded: false,
            revision: 0,
            persisted_revision: 0,
            sync: SyncStatus::Synced,
        };
        let (snapshots, _) = watch::channel(state.snapshot());
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            snapshots,
        });

        let adapter = Arc::new(adapter);
        let observer_shared = Arc::clone(&shared);
        let writer = WriteQueue::spawn(
            Arc::clone(&adapter),
            options.timeout,
            Box::new(move |revision: u64, result: &StorageResult<()>| {
                observer_shared.record_save(revision, result)
            }),
        );

        Self {
            adapter,
            prefs_store,
            prefs_writes: tokio::sync::Mutex::new(()),
            shared,
            writer,
            clock: options.clock,
            timeout: options.timeout,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error(operation, self.timeout)),
        }
    }

    /// Applies `apply` under the state lock and waits for the resulting save.
    ///
    /// `apply` must validate before it touches the dataset.
    async fn mutate<T, F>(&self, event: &'static str, apply: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Dataset, &dyn Clock) -> StoreResult<Outcome<T>>,
    {
        self.adapter.authorize()?;
        let (value, reply, revision) = {
            let mut state = self.shared.lock()?;
            if !self.writer.is_open() {
                return Err(closed().into());
            }
            if !state.loaded {
                warn!("event={event} module=store status=rejected error_code=not_loaded");
                return Err(StoreError::NotLoaded);
            }
            let value = match apply(&mut state.dataset, self.clock.as_ref())? {
                Outcome::Changed(value) => value,
                Outcome::Unchanged(value) => {
                    debug!("event={event} module=store status=ok changed=false");
                    return Ok(value);
                }
            };
            state.revision += 1;
            state.sync = SyncStatus::Pending;
            let reply = self.writer.enqueue(state.revision, state.dataset.clone());
            self.shared.publish(&state);
            (value, reply, state.revision)
        };

        let outcome = match reply?.await {
            Ok(result) => result,
            Err(_) => Err(closed()),
        };
        match outcome {
            Ok(()) => {
                debug!("event={event} module=store status=ok changed=true revision={revision}");
                Ok(value)
            }
            Err(err) => {
                warn!(
                    "event={event} module=store status=error revision={revision} error_code={}",
                    err.code()
                );
                Err(err.into())
            }
        }
    }

    /// Loads dataset and preferences.
    ///
    /// Any load failure leaves an empty dataset; `loading` is cleared either way
    /// and the load error is returned. Dataset writes stay refused with
    /// `NotLoaded` until a later `hydrate` succeeds.
    pub async fn hydrate(&self) -> StoreResult<()> {
        let started_at = Instant::now();
        let load_result = self.bounded("load", self.adapter.load()).await;
        let prefs = self.bounded("prefs_load", self.prefs_store.load()).await;

        let mut state = self.shared.lock()?;
        let outcome = match load_result {
            Ok(dataset) => {
                state.dataset = dataset;
                state.loaded = true;
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=store_hydrate module=store status=error backend={} error_code={}",
                    self.adapter.backend().as_str(),
                    err.code()
                );
                state.dataset = Dataset::empty();
                state.loaded = false;
                Err(StoreError::Storage(err))
            }
        };
        state.prefs = prefs.unwrap_or_else(|err| {
            warn!(
                "event=prefs_load module=store status=degraded error_code={}",
                err.code()
            );
            Preferences::default()
        });
        state.loading = false;
        state.persisted_revision = state.revision;
        state.sync = SyncStatus::Synced;
        self.shared.publish(&state);

        if outcome.is_ok() {
            info!(
                "event=store_hydrate module=store status=ok backend={} groups={} people={} duration_ms={}",
                self.adapter.backend().as_str(),
                state.dataset.groups.len(),
                state.dataset.person_count(),
                started_at.elapsed().as_millis()
            );
        }
        outcome
    }

    /// Creates a group at the front of the list.
    pub async fn create_group(&self, name: &str) -> StoreResult<Group> {
        let name = normalize_group_name(name)?;
        self.mutate("group_create", move |dataset, clock| {
            let group = Group::with_id(dataset.fresh_id(), &name, clock.now_ms())?;
            dataset.groups.insert(0, group.clone());
            Ok(Outcome::Changed(group))
        })
        .await
    }

    /// Renames a group; `Ok(None)` when it does not exist.
    pub async fn rename_group(&self, group_id: GroupId, name: &str) -> StoreResult<Option<Group>> {
        let name = normalize_group_name(name)?;
        self.mutate("group_rename", move |dataset, clock| {
            let Some(group) = dataset.group_mut(group_id) else {
                return Ok(Outcome::Unchanged(None));
            };
            if group.name == name {
                return Ok(Outcome::Unchanged(Some(group.clone())));
            }
            group.name = name;
            group.touch(clock, 0);
            Ok(Outcome::Changed(Some(group.clone())))
        })
        .await
    }

    /// Deletes a group and its people; `Ok(false)` when already gone.
    pub async fn delete_group(&self, group_id: GroupId) -> StoreResult<bool> {
        self.mutate("group_delete", move |dataset, _| {
            let Some(index) = dataset.group_index(group_id) else {
                return Ok(Outcome::Unchanged(false));
            };
            dataset.groups.remove(index);
            Ok(Outcome::Changed(true))
        })
        .await
    }

    /// Adds a person at the front of a group.
    ///
    /// # Errors
    /// - `NotFound` when the group does not exist.
    pub async fn create_person(
        &self,
        group_id: GroupId,
        name: &str,
        notes: Option<&str>,
    ) -> StoreResult<Person> {
        let name = normalize_person_name(name)?;
        let notes = normalize_notes(notes);
        self.mutate("person_create", move |dataset, clock| {
            let id = dataset.fresh_id();
            let Some(group) = dataset.group_mut(group_id) else {
                return Err(StoreError::NotFound {
                    kind: "group",
                    id: group_id,
                });
            };
            let person = Person::with_id(id, &name, notes.as_deref(), clock.now_ms())?;
            group.people.insert(0, person.clone());
            group.touch(clock, person.updated_at);
            Ok(Outcome::Changed(person))
        })
        .await
    }

    /// Applies a partial update; `Ok(None)` when group or person is missing.
    pub async fn update_person(
        &self,
        group_id: GroupId,
        person_id: PersonId,
        patch: PersonPatch,
    ) -> StoreResult<Option<Person>> {
        let patch = patch.normalize()?;
        self.mutate("person_update", move |dataset, clock| {
            let Some(group) = dataset.group_mut(group_id) else {
                return Ok(Outcome::Unchanged(None));
            };
            let Some(person) = group.person_mut(person_id) else {
                return Ok(Outcome::Unchanged(None));
            };
            if patch.is_empty() {
                return Ok(Outcome::Unchanged(Some(person.clone())));
            }
            let stamp = next_timestamp(clock, person.updated_at);
            person.apply(patch, stamp);
            let updated = person.clone();
            group.touch(clock, stamp);
            Ok(Outcome::Changed(Some(updated)))
        })
        .await
    }

    /// Removes a person; `Ok(false)` when group or person is missing.
    pub async fn delete_person(&self, group_id: GroupId, person_id: PersonId) -> StoreResult<bool> {
        self.mutate("person_delete", move |dataset, clock| {
            let Some(group) = dataset.group_mut(group_id) else {
                return Ok(Outcome::Unchanged(false));
            };
            let before = group.people.len();
            group.people.retain(|person| person.id != person_id);
            if group.people.len() == before {
                return Ok(Outcome::Unchanged(false));
            }
            group.touch(clock, 0);
            Ok(Outcome::Changed(true))
        })
        .await
    }

    /// Moves a person between groups keeping its id and `created_at`.
    ///
    /// # Errors
    /// - `NotFound` when the destination group does not exist.
    pub async fn move_person(
        &self,
        from: GroupId,
        person_id: PersonId,
        to: GroupId,
    ) -> StoreResult<Option<Person>> {
        self.mutate("person_move", move |dataset, clock| {
            if dataset.group(to).is_none() {
                return Err(StoreError::NotFound {
                    kind: "group",
                    id: to,
                });
            }
            let Some(source) = dataset.group_mut(from) else {
                return Ok(Outcome::Unchanged(None));
            };
            let Some(index) = source.people.iter().position(|p| p.id == person_id) else {
                return Ok(Outcome::Unchanged(None));
            };
            if from == to {
                return Ok(Outcome::Unchanged(Some(source.people[index].clone())));
            }
            let mut person = source.people.remove(index);
            person.updated_at = next_timestamp(clock, person.updated_at);
            source.touch(clock, person.updated_at);

            let Some(target) = dataset.group_mut(to) else {
                return Err(StoreError::NotFound {
                    kind: "group",
                    id: to,
                });
            };
            target.people.insert(0, person.clone());
            target.touch(clock, person.updated_at);
            Ok(Outcome::Changed(Some(person)))
        })
        .await
    }

    pub async fn set_theme(&self, theme: ThemeKey) -> StoreResult<()> {
        self.update_prefs("theme_set", |prefs| prefs.theme = theme).await
    }

    pub async fn set_sort(&self, sort: SortMode) -> StoreResult<()> {
        self.update_prefs("sort_set", |prefs| prefs.sort = sort).await
    }

    async fn update_prefs(
        &self,
        event: &'static str,
        change: impl FnOnce(&mut Preferences),
    ) -> StoreResult<()> {
        let _write_turn = self.prefs_writes.lock().await;
        let prefs = {
            let mut state = self.shared.lock()?;
            if state.loading {
                return Err(StoreError::NotLoaded);
            }
            change(&mut state.prefs);
            self.shared.publish(&state);
            state.prefs
        };
        let result = self.bounded("prefs_save", self.prefs_store.save(prefs)).await;
        match &result {
            Ok(()) => debug!(
                "event={event} module=store status=ok theme={} sort={}",
                prefs.theme, prefs.sort
            ),
            Err(err) => warn!(
                "event={event} module=store status=error error_code={}",
                err.code()
            ),
        }
        result.map_err(StoreError::from)
    }

    /// Re-queues the current dataset when memory is ahead of storage.
    pub async fn flush(&self) -> StoreResult<()> {
        self.adapter.authorize()?;
        let reply = {
            let mut state = self.shared.lock()?;
            if !state.loaded {
                return Err(StoreError::NotLoaded);
            }
            if state.persisted_revision >= state.revision && state.sync == SyncStatus::Synced {
                return Ok(());
            }
            state.sync = SyncStatus::Pending;
            let reply = self.writer.enqueue(state.revision, state.dataset.clone());
            self.shared.publish(&state);
            reply
        };
        match reply?.await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(closed().into()),
        }
    }

    /// Stops accepting writes and waits for queued ones.
    pub async fn shutdown(&self) {
        self.writer.shutdown().await;
        info!(
            "event=store_shutdown module=store status=ok backend={}",
            self.adapter.backend().as_str()
        );
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Receiver holding the current snapshot and every later one.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.shared.snapshots.subscribe()
    }

    fn read<T>(&self, view: impl FnOnce(&StoreState) -> T) -> Option<T> {
        self.shared.state.lock().ok().map(|state| view(&*state))
    }

    pub fn group(&self, group_id: GroupId) -> Option<Group> {
        self.read(|state| state.dataset.group(group_id).cloned())
            .flatten()
    }

    pub fn preferences(&self) -> Preferences {
        self.read(|state| state.prefs).unwrap_or_default()
    }

    /// Groups and their people ordered by the current sort mode.
    pub fn sorted_groups(&self) -> Vec<Group> {
        self.read(|state| sorted_view(&state.dataset.groups, state.prefs.sort))
            .unwrap_or_default()
    }

    /// Sorted groups narrowed by `query`.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        search_groups(&self.sorted_groups(), query)
    }

    pub fn export_all(&self) -> ExportDocument {
        self.read(|state| export_dataset(&state.dataset))
            .unwrap_or_else(|| export_dataset(&Dataset::empty()))
    }

    pub fn export_group(&self, group_id: GroupId) -> Option<GroupExport> {
        self.read(|state| state.dataset.group(group_id).map(export_group))
            .flatten()
    }

    pub fn export_person(&self, group_id: GroupId, person_id: PersonId) -> Option<PersonExport> {
        self.read(|state| {
            state
                .dataset
                .group(group_id)
                .and_then(|group| group.person(person_id))
                .map(|person| export_person(person, group_id))
        })
        .flatten()
    }

    /// Parses, validates and applies an import document.
    ///
    /// Nothing changes unless the whole document is valid.
    pub async fn import_json(&self, raw: &str, mode: ImportMode) -> StoreResult<ImportSummary> {
        let incoming = parse_import(raw, self.clock.now_ms())?;
        let summary = ImportSummary {
            mode,
            groups: incoming.groups.len(),
            people: incoming.person_count(),
        };
        self.mutate("dataset_import", move |dataset, clock| {
            let next = match mode {
                ImportMode::Replace => incoming,
                ImportMode::Merge => merge_dataset(dataset, incoming, clock)?,
            };
            *dataset = next;
            Ok(Outcome::Changed(summary))
        })
        .await
    }
}
