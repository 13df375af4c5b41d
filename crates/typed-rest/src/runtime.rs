//! Worker runtime that executes the send pipeline
//!
//! Every send runs as a single task on a multi-thread runtime owned by the
//! library (or supplied by the caller). The caller's future only waits for
//! that task to finish, so none of the pipeline's internal awaits ever has
//! to resume on the caller's thread. A caller may therefore block its only
//! thread on a send without starving the work that would unblock it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::error::{RestError, RestResult};

static WORKER_RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Handle to the process-wide worker runtime, started on first use
pub fn shared_handle() -> RestResult<Handle> {
    WORKER_RUNTIME
        .get_or_try_init(|| {
            tracing::debug!("starting typed-rest worker runtime");
            Builder::new_multi_thread()
                .thread_name("typed-rest-worker")
                .enable_all()
                .build()
        })
        .map(|runtime| runtime.handle().clone())
        .map_err(|e| RestError::Runtime(format!("Failed to start worker runtime: {}", e)))
}

/// Run `future` to completion on `handle` and wait for its output.
///
/// Dropping the returned future aborts the task.
pub async fn offload<F, T>(handle: &Handle, future: F) -> RestResult<T>
where
    F: Future<Output = RestResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let task = AbortOnDrop(handle.spawn(future));
    match task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(RestError::Runtime(format!("Send task panicked: {}", e))),
        Err(e) => Err(RestError::Runtime(format!("Send task was cancelled: {}", e))),
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, tokio::task::JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
