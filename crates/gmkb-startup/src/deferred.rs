//! Work postponed while rendering is blocked.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{CollaboratorError, CollaboratorResult, DeferredError};

/// Future produced by a deferred operation.
pub type DeferredFuture = BoxFuture<'static, CollaboratorResult<()>>;

/// A unit of work whose execution may be postponed until rendering is
/// unblocked.
pub struct DeferredOperation {
    kind: String,
    critical: bool,
    execute: Box<dyn FnOnce() -> DeferredFuture + Send>,
}

impl DeferredOperation {
    /// Wrap `execute`. Nothing runs until the coordinator decides to.
    pub fn new<F, Fut>(kind: impl Into<String>, execute: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CollaboratorResult<()>> + Send + 'static,
    {
        Self {
            kind: kind.into(),
            critical: false,
            execute: Box::new(move || execute().boxed()),
        }
    }

    /// Mark the operation critical: it still runs on the emergency path.
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Operation kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether the operation survives the emergency fallback.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub(crate) fn start(self) -> DeferredFuture {
        (self.execute)()
    }
}

impl fmt::Debug for DeferredOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredOperation")
            .field("kind", &self.kind)
            .field("critical", &self.critical)
            .finish_non_exhaustive()
    }
}

/// An operation waiting in the coordinator's queue with its settlement channel.
pub(crate) struct QueuedOperation {
    pub(crate) operation: DeferredOperation,
    pub(crate) settle: oneshot::Sender<CollaboratorResult<()>>,
}

impl QueuedOperation {
    pub(crate) fn new(operation: DeferredOperation) -> (Self, DeferredHandle) {
        let (settle, rx) = oneshot::channel();
        (Self { operation, settle }, DeferredHandle::Queued(rx))
    }
}

impl fmt::Debug for QueuedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedOperation")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

/// Settlement handle returned by `defer_operation`.
///
/// Await it to learn how the operation ended. Dropping the handle never
/// cancels the operation. Queued operations that are dropped without running
/// settle with [`DeferredError::Discarded`].
#[must_use = "await the handle to observe how the deferred operation settled"]
pub enum DeferredHandle {
    /// Rendering was not blocked; the operation was spawned onto the runtime.
    Immediate(JoinHandle<CollaboratorResult<()>>),
    /// The operation is queued until the deferred phase or the emergency path.
    Queued(oneshot::Receiver<CollaboratorResult<()>>),
}

impl DeferredHandle {
    /// Spawn `operation` on the current tokio runtime.
    pub(crate) fn spawn(operation: DeferredOperation) -> Self {
        Self::Immediate(tokio::spawn(operation.start()))
    }

    /// Whether the operation was queued rather than started.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }
}

impl Future for DeferredHandle {
    type Output = Result<(), DeferredError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut() {
            Self::Immediate(task) => Pin::new(task).poll(cx).map(|joined| match joined {
                Ok(result) => result.map_err(DeferredError::from),
                Err(err) => Err(DeferredError::Failed(CollaboratorError::new(format!(
                    "Deferred task did not complete: {err}"
                )))),
            }),
            Self::Queued(rx) => Pin::new(rx).poll(cx).map(|settled| match settled {
                Ok(result) => result.map_err(DeferredError::from),
                Err(_) => Err(DeferredError::Discarded),
            }),
        }
    }
}

impl fmt::Debug for DeferredHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(_) => f.write_str("DeferredHandle::Immediate"),
            Self::Queued(_) => f.write_str("DeferredHandle::Queued"),
        }
    }
}

/// Convenience for operations that cannot fail.
pub fn infallible<F, Fut>(kind: impl Into<String>, execute: F) -> DeferredOperation
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    DeferredOperation::new(kind, move || async move {
        execute().await;
        Ok::<(), CollaboratorError>(())
    })
}
