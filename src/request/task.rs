//! UpdateTask - Single-shot, cancellable handle on an update's outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::entity::RecordId;
use crate::error::StoreError;

/// What an update did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistentStoreUpdate {
    /// Nothing matched and a new entity was created.
    Created { id: RecordId },
    /// Every matched entity went through the modifier.
    Updated { ids: Vec<RecordId> },
    /// Nothing was written. `matched` is how many entities the fetch found.
    Unchanged { matched: usize },
}

pub type UpdateResult = Result<PersistentStoreUpdate, StoreError>;

/// Awaitable outcome of one submitted update.
///
/// Resolves exactly once. Cancelling before the store commits prevents the
/// write; dropping a task that has not resolved cancels it, unless it was
/// [`detach`](Self::detach)ed.
#[derive(Debug)]
pub struct UpdateTask {
    receiver: Option<oneshot::Receiver<UpdateResult>>,
    cancelled: Arc<AtomicBool>,
    finished: bool,
    detached: bool,
}

/// Store-side half of an [`UpdateTask`].
#[derive(Debug)]
pub struct UpdateResponder {
    sender: oneshot::Sender<UpdateResult>,
    cancelled: Arc<AtomicBool>,
}

impl UpdateTask {
    /// A pending task and the responder that resolves it.
    pub fn pending() -> (UpdateTask, UpdateResponder) {
        let (sender, receiver) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = UpdateTask {
            receiver: Some(receiver),
            cancelled: Arc::clone(&cancelled),
            finished: false,
            detached: false,
        };
        (task, UpdateResponder { sender, cancelled })
    }

    /// A task that is already resolved.
    pub fn ready(result: UpdateResult) -> UpdateTask {
        let (task, responder) = Self::pending();
        responder.respond(result);
        task
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Let the update run to completion without anyone observing it.
    pub fn detach(mut self) {
        self.detached = true;
    }

    /// Block the current thread until the outcome arrives.
    ///
    /// On a thread driving a tokio runtime this returns
    /// [`StoreError::BlockingInRuntime`] without blocking, and the task is
    /// dropped (and so cancelled). Await the task there instead.
    pub fn wait(mut self) -> UpdateResult {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(StoreError::BlockingInRuntime);
        }
        self.finished = true;
        match self.receiver.take() {
            Some(receiver) => receiver.blocking_recv().unwrap_or_else(|_| Err(dropped())),
            None => Err(dropped()),
        }
    }
}

fn dropped() -> StoreError {
    StoreError::Unavailable("store dropped the update before responding".into())
}

impl Future for UpdateTask {
    type Output = UpdateResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(Err(dropped()));
        };
        match Pin::new(receiver).poll(cx) {
            Poll::Ready(result) => {
                self.finished = true;
                self.receiver = None;
                Poll::Ready(result.unwrap_or_else(|_| Err(dropped())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for UpdateTask {
    fn drop(&mut self) {
        if !self.finished && !self.detached {
            self.cancel();
        }
    }
}

impl UpdateResponder {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Deliver the outcome. A receiver that went away is ignored.
    pub fn respond(self, result: UpdateResult) {
        let _ = self.sender.send(result);
    }
}
