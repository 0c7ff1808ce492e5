//! Single writer thread that serializes every update against one store.
//!
//! Each update runs fetch, modifiers and commit without any other write
//! in between. Modifiers work on a staged copy of the tables; the copy
//! replaces the live tables only if the update was not cancelled first.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::RwLock;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info_span, warn};

use super::config::StoreConfig;
use super::tables::Tables;
use super::translate;
use crate::context::{StagedWrite, StorageContext};
use crate::entity::{Entity, RecordId};
use crate::error::StoreError;
use crate::request::{PersistentStoreUpdate, UpdateRequest, UpdateResponder};

/// State shared by readers and the writer thread.
pub(crate) struct Shared {
    pub config: StoreConfig,
    pub tables: RwLock<Tables>,
    open: AtomicBool,
}

impl Shared {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            tables: RwLock::new(Tables::default()),
            open: AtomicBool::new(true),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn unavailable(&self) -> StoreError {
        StoreError::Unavailable(format!("store `{}` is closed", self.config.name))
    }

    /// Consistent copy of the committed tables.
    pub fn snapshot(&self, operation: &'static str) -> Result<Tables, StoreError> {
        self.tables
            .read()
            .map(|tables| tables.clone())
            .map_err(|_| StoreError::LockPoisoned(operation))
    }
}

/// How one write job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobStatus {
    Committed,
    Unchanged,
    Cancelled,
    Failed,
}

pub(crate) type WriteJob = Box<dyn FnOnce(&Shared) -> JobStatus + Send>;

/// Statistics from the writer thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriterStats {
    /// Writes that changed the store.
    pub committed: usize,
    /// Writes that found nothing to do.
    pub unchanged: usize,
    /// Writes cancelled before commit.
    pub cancelled: usize,
    /// Writes that failed; nothing from them was committed.
    pub failed: usize,
}

/// The background thread that owns the write path.
pub(crate) struct WriterThread {
    sender: Option<SyncSender<WriteJob>>,
    handle: Option<JoinHandle<WriterStats>>,
}

impl WriterThread {
    pub fn spawn(shared: Arc<Shared>) -> Result<Self, StoreError> {
        let (sender, receiver) = sync_channel::<WriteJob>(shared.config.queue_capacity);
        let name = format!("persisted-writer-{}", shared.config.name);

        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                let mut stats = WriterStats::default();
                while let Ok(job) = receiver.recv() {
                    let status = panic::catch_unwind(AssertUnwindSafe(|| job(&shared)))
                        .unwrap_or_else(|payload| {
                            error!(panic = %panic_message(payload.as_ref()), "write job panicked");
                            JobStatus::Failed
                        });
                    match status {
                        JobStatus::Committed => stats.committed += 1,
                        JobStatus::Unchanged => stats.unchanged += 1,
                        JobStatus::Cancelled => stats.cancelled += 1,
                        JobStatus::Failed => stats.failed += 1,
                    }
                }
                stats
            })
            .map_err(|e| StoreError::Unavailable(format!("failed to start writer: {}", e)))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    pub fn sender(&self) -> Option<SyncSender<WriteJob>> {
        self.sender.clone()
    }

    /// Stop accepting jobs, drain the queue and wait for the thread.
    pub fn stop(mut self) -> WriterStats {
        self.shutdown().unwrap_or_default()
    }

    fn shutdown(&mut self) -> Option<WriterStats> {
        self.sender.take();
        let handle = self.handle.take()?;
        // The last store handle can be dropped by a modifier running on the
        // writer itself; joining there would never return.
        if handle.thread().id() == thread::current().id() {
            return None;
        }
        handle.join().ok()
    }
}

impl Drop for WriterThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run one update end to end on the writer thread.
pub(crate) fn run_update<T: Entity>(
    shared: &Shared,
    request: UpdateRequest<T>,
    responder: UpdateResponder,
) -> JobStatus {
    let span = info_span!("update", store = %shared.config.name, collection = T::COLLECTION);
    let _entered = span.enter();

    if !shared.is_open() {
        responder.respond(Err(shared.unavailable()));
        return JobStatus::Failed;
    }
    if responder.is_cancelled() {
        debug!("update cancelled before it started");
        responder.respond(Err(StoreError::Cancelled));
        return JobStatus::Cancelled;
    }

    let mut staged = match shared.snapshot("update") {
        Ok(tables) => tables,
        Err(e) => {
            responder.respond(Err(e));
            return JobStatus::Failed;
        }
    };

    // a panicking modifier only ever touched the staged copy
    let staged_outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        stage(&mut staged, &request, shared.config.default_batch_size)
    }))
    .unwrap_or_else(|payload| {
        Err(StoreError::ModifierPanicked(panic_message(payload.as_ref())))
    });

    let outcome = match staged_outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "update failed, nothing committed");
            responder.respond(Err(e));
            return JobStatus::Failed;
        }
    };

    if let PersistentStoreUpdate::Unchanged { matched } = outcome {
        debug!(matched, "update left store unchanged");
        responder.respond(Ok(outcome));
        return JobStatus::Unchanged;
    }

    let mut tables = match shared.tables.write() {
        Ok(tables) => tables,
        Err(_) => {
            responder.respond(Err(StoreError::LockPoisoned("commit")));
            return JobStatus::Failed;
        }
    };
    if responder.is_cancelled() {
        drop(tables);
        warn!("update cancelled before commit, staged writes discarded");
        responder.respond(Err(StoreError::Cancelled));
        return JobStatus::Cancelled;
    }
    *tables = staged;
    drop(tables);

    debug!(?outcome, "update committed");
    responder.respond(Ok(outcome));
    JobStatus::Committed
}

/// Apply the update decision table to `tables`.
fn stage<T: Entity>(
    tables: &mut Tables,
    request: &UpdateRequest<T>,
    default_batch_size: usize,
) -> Result<PersistentStoreUpdate, StoreError> {
    let matches = translate::execute(
        tables.collection(T::COLLECTION),
        request.fetch_request(),
        default_batch_size,
    )?;

    if let Some(first) = matches.first().map(|(id, _)| *id) {
        if !request.should_update() {
            return Ok(PersistentStoreUpdate::Unchanged {
                matched: matches.len(),
            });
        }

        let Some(modifier) = request.modifier() else {
            // matches are reported but left as they are
            return Ok(PersistentStoreUpdate::Updated {
                ids: matches.into_iter().map(|(id, _)| id).collect(),
            });
        };

        let mut ctx = StorageContext::new(T::COLLECTION, first, tables.next_id());
        let mut ids = Vec::with_capacity(matches.len());
        for (id, mut entity) in matches {
            // an earlier modifier in this update deleted it
            if !tables.contains(T::COLLECTION, id) {
                continue;
            }
            ctx.set_current(id);
            modifier(&mut entity, &mut ctx);
            write_back(tables, &mut ctx, id, &entity)?;
            ids.push(id);
        }
        return Ok(PersistentStoreUpdate::Updated { ids });
    }

    if request.should_create() {
        let id = tables.allocate_id();
        let mut entity = T::default();
        let mut ctx = StorageContext::new(T::COLLECTION, id, tables.next_id());
        if let Some(modifier) = request.modifier() {
            modifier(&mut entity, &mut ctx);
        }
        write_back(tables, &mut ctx, id, &entity)?;
        return Ok(PersistentStoreUpdate::Created { id });
    }

    Ok(PersistentStoreUpdate::Unchanged { matched: 0 })
}

/// Apply what the modifier staged, then store the entity unless it was
/// deleted.
fn write_back<T: Entity>(
    tables: &mut Tables,
    ctx: &mut StorageContext,
    id: RecordId,
    entity: &T,
) -> Result<(), StoreError> {
    let writes = ctx.take_writes()?;
    let deleted = writes.iter().any(|write| {
        matches!(
            write,
            StagedWrite::Delete { collection, id: target }
                if *collection == ctx.collection() && *target == id
        )
    });
    tables.set_next_id(ctx.next_id());
    tables.apply(writes)?;
    if !deleted {
        tables.put_entity(id, entity)?;
    }
    Ok(())
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Seed one entity through the write path.
pub(crate) fn run_insert<T: Entity>(shared: &Shared, entity: &T) -> Result<RecordId, StoreError> {
    if !shared.is_open() {
        return Err(shared.unavailable());
    }
    let mut tables = shared
        .tables
        .write()
        .map_err(|_| StoreError::LockPoisoned("insert"))?;
    let mut staged = tables.clone();
    let id = staged.allocate_id();
    staged.put_entity(id, entity)?;
    *tables = staged;
    Ok(id)
}
