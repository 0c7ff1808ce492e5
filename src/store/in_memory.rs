//! InMemoryPersistentStore - Embedded store for tests, caches and development.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::config::StoreConfig;
use super::translate;
use super::writer::{self, Shared, WriteJob, WriterStats, WriterThread};
use super::PersistentStore;
use crate::entity::{Entity, RecordId, Versioned};
use crate::error::StoreError;
use crate::request::{FetchRequest, UpdateRequest, UpdateTask};

enum WriterSlot {
    Idle,
    Running(WriterThread),
    Closed,
}

struct StoreInner {
    shared: Arc<Shared>,
    writer: Mutex<WriterSlot>,
}

/// In-memory persistent store.
///
/// Entities are kept as JSON, one ordered map per collection. Reads work
/// on a snapshot and run on the caller's thread; all updates go through a
/// single writer thread, started on first use. Clone-friendly via Arc.
///
/// ## Example
///
/// ```ignore
/// use persisted_rust::{InMemoryPersistentStore, Predicate, RequestsExt, StoreConfig};
///
/// let store = InMemoryPersistentStore::with_config(StoreConfig::new("cache"));
/// store.insert(&Person::new("Ann", 30))?;
///
/// let people = store.fetch::<Person>().such_that(Predicate::field("age").ge(21)).perform()?;
/// ```
#[derive(Clone)]
pub struct InMemoryPersistentStore {
    inner: Arc<StoreInner>,
}

impl Default for InMemoryPersistentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPersistentStore {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        info!(store = %config.name, "opened in-memory persistent store");
        Self {
            inner: Arc::new(StoreInner {
                shared: Arc::new(Shared::new(config)),
                writer: Mutex::new(WriterSlot::Idle),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.shared.config
    }

    pub fn is_open(&self) -> bool {
        self.inner.shared.is_open()
    }

    /// Close the store. Updates still queued resolve as unavailable, and
    /// every later request fails the same way.
    ///
    /// Returns the writer statistics the first time it is called.
    pub fn close(&self) -> Option<WriterStats> {
        self.inner.shared.mark_closed();
        let previous = match self.inner.writer.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, WriterSlot::Closed),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), WriterSlot::Closed),
        };
        info!(store = %self.config().name, "closed in-memory persistent store");
        match previous {
            WriterSlot::Running(writer) => Some(writer.stop()),
            WriterSlot::Idle => Some(WriterStats::default()),
            WriterSlot::Closed => None,
        }
    }

    /// Queue a job for the writer, starting it if needed.
    fn submit(&self, job: WriteJob) -> Result<(), StoreError> {
        let sender = {
            let mut slot = self
                .inner
                .writer
                .lock()
                .map_err(|_| StoreError::LockPoisoned("submit"))?;
            if let WriterSlot::Idle = *slot {
                let writer = WriterThread::spawn(Arc::clone(&self.inner.shared))?;
                *slot = WriterSlot::Running(writer);
            }
            match &*slot {
                WriterSlot::Running(writer) => writer.sender(),
                _ => None,
            }
        };

        let sender = sender.ok_or_else(|| self.inner.shared.unavailable())?;
        sender
            .send(job)
            .map_err(|_| StoreError::Unavailable("writer thread stopped".into()))
    }

    /// Store `entity` as a new record through the write path.
    pub fn insert<T: Entity>(&self, entity: &T) -> Result<RecordId, StoreError> {
        let (reply, result) = mpsc::channel();
        let entity = entity.clone();
        self.submit(Box::new(move |shared: &Shared| {
            let outcome = writer::run_insert(shared, &entity);
            let status = if outcome.is_ok() {
                writer::JobStatus::Committed
            } else {
                writer::JobStatus::Failed
            };
            let _ = reply.send(outcome);
            status
        }))?;
        result
            .recv()
            .map_err(|_| StoreError::Unavailable("writer dropped the insert".into()))?
    }

    /// Fetch with record ids and versions attached.
    pub fn fetch_versioned<T: Entity>(
        &self,
        request: &FetchRequest<T>,
    ) -> Result<Vec<Versioned<T>>, StoreError> {
        let shared = &self.inner.shared;
        if !shared.is_open() {
            return Err(shared.unavailable());
        }
        let tables = shared.snapshot("fetch")?;
        let collection = tables.collection(T::COLLECTION);
        let rows = translate::execute(collection, request, shared.config.default_batch_size)?;
        debug!(collection = T::COLLECTION, returned = rows.len(), "fetch executed");

        Ok(rows
            .into_iter()
            .map(|(id, data)| Versioned {
                id,
                version: collection
                    .and_then(|c| c.get(&id))
                    .map(|record| record.version)
                    .unwrap_or(0),
                data,
            })
            .collect())
    }

    /// Get one record by id.
    pub fn record<T: Entity>(&self, id: RecordId) -> Result<Option<Versioned<T>>, StoreError> {
        let shared = &self.inner.shared;
        if !shared.is_open() {
            return Err(shared.unavailable());
        }
        let tables = shared.snapshot("record")?;
        match tables.collection(T::COLLECTION).and_then(|c| c.get(&id)) {
            Some(record) => {
                let data: T = serde_json::from_slice(&record.bytes)?;
                Ok(Some(Versioned {
                    id,
                    data,
                    version: record.version,
                }))
            }
            None => Ok(None),
        }
    }

    /// Number of committed records of type `T`.
    pub fn len<T: Entity>(&self) -> Result<usize, StoreError> {
        let shared = &self.inner.shared;
        if !shared.is_open() {
            return Err(shared.unavailable());
        }
        Ok(shared.snapshot("len")?.len(T::COLLECTION))
    }
}

impl PersistentStore for InMemoryPersistentStore {
    fn fetch_entities<T: Entity>(&self, request: &FetchRequest<T>) -> Result<Vec<T>, StoreError> {
        Ok(self
            .fetch_versioned(request)?
            .into_iter()
            .map(|v| v.data)
            .collect())
    }

    fn submit_update<T: Entity>(&self, request: UpdateRequest<T>) -> UpdateTask {
        if !self.is_open() {
            return UpdateTask::ready(Err(self.inner.shared.unavailable()));
        }
        debug!(
            collection = T::COLLECTION,
            should_update = request.should_update(),
            should_create = request.should_create(),
            "submitting update"
        );
        let (task, responder) = UpdateTask::pending();
        match self.submit(Box::new(move |shared: &Shared| {
            writer::run_update(shared, request, responder)
        })) {
            Ok(()) => task,
            Err(e) => UpdateTask::ready(Err(e)),
        }
    }
}
