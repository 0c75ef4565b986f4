use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tokio::sync::Semaphore;

/// Run a batch of fallible tasks with at most `max_concurrent` in flight.
///
/// Every task is started (failures never skip later tasks) and each slot in
/// the returned vector holds that task's own result, in submission order.
pub async fn run_bounded<T, E, Fut>(tasks: Vec<Fut>, max_concurrent: usize) -> Vec<Result<T, E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    assert!(max_concurrent > 0, "max_concurrent must be at least 1");
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let gated = tasks.into_iter().map(|task| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            // The semaphore lives for the whole gather and is never closed.
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            task.await
        }
    });
    join_all(gated).await
}

/// Variant that propagates the first failure and drops unfinished work.
/// The pipeline itself always captures; this exists for callers that want
/// all-or-nothing semantics.
pub async fn try_run_bounded<T, E, Fut>(tasks: Vec<Fut>, max_concurrent: usize) -> Result<Vec<T>, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    assert!(max_concurrent > 0, "max_concurrent must be at least 1");
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let gated = tasks.into_iter().map(|task| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            task.await
        }
    });
    try_join_all(gated).await
}
