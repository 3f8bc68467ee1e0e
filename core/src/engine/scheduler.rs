use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::error::EngineError;

/// Run one batch of node tasks concurrently, bounded by `max_concurrency`.
///
/// Every task is spawned up front; a semaphore gates how many run at
/// once. When a task fails the shared `abort` flag is raised so tasks
/// still waiting on a permit skip instead of starting. Tasks already
/// in flight run to completion; their results are drained but only the
/// first observed error is returned (later ones are logged).
///
/// A task resolving to `Ok(None)` means it skipped itself (abort seen
/// after acquiring a permit) and contributes nothing to the results.
pub async fn execute_batch<T, F, Fut>(
    node_ids: &[String],
    max_concurrency: usize,
    abort: Arc<AtomicBool>,
    task_fn: F,
) -> Result<Vec<T>, EngineError>
where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Option<T>, EngineError>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = FuturesUnordered::new();

    for node_id in node_ids {
        let fut = task_fn(node_id.clone());
        let semaphore = Arc::clone(&semaphore);
        let abort = Arc::clone(&abort);
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| EngineError::Scheduler(format!("semaphore closed: {e}")))?;
            if abort.load(Ordering::SeqCst) {
                return Ok(None);
            }
            fut.await
        }));
    }

    let mut completed = Vec::with_capacity(node_ids.len());
    let mut first_err: Option<EngineError> = None;

    while let Some(joined) = tasks.next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(EngineError::Scheduler(format!("task join failed: {e}"))),
        };
        match outcome {
            Ok(Some(value)) => completed.push(value),
            Ok(None) => {}
            Err(e) => {
                abort.store(true, Ordering::SeqCst);
                if first_err.is_none() {
                    first_err = Some(e);
                } else {
                    warn!(error = %e, "additional batch failure after first error");
                }
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(completed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_all_tasks_complete() {
        let abort = Arc::new(AtomicBool::new(false));
        let result = execute_batch(&ids(&["a", "b", "c"]), 4, abort, |node_id| async move {
            Ok(Some(node_id))
        })
        .await
        .unwrap();
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_respected() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let abort = Arc::new(AtomicBool::new(false));

        let result = execute_batch(&ids(&["a", "b", "c", "d"]), 2, abort, |node_id| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(Some(node_id))
            }
        })
        .await
        .unwrap();

        assert_eq!(result.len(), 4);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_makes_progress() {
        let abort = Arc::new(AtomicBool::new(false));
        let result = execute_batch(&ids(&["a"]), 0, abort, |node_id| async move {
            Ok(Some(node_id))
        })
        .await
        .unwrap();
        assert_eq!(result, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_skips_queued_tasks() {
        let executed = Arc::new(AtomicUsize::new(0));
        let abort = Arc::new(AtomicBool::new(false));

        let err = execute_batch(&ids(&["a", "b", "c"]), 1, Arc::clone(&abort), |node_id| {
            let executed = Arc::clone(&executed);
            async move {
                executed.fetch_add(1, Ordering::SeqCst);
                if node_id == "a" {
                    Err(EngineError::Scheduler("forced failure".to_string()))
                } else {
                    Ok(Some(node_id))
                }
            }
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("forced failure"));
        assert!(abort.load(Ordering::SeqCst));
        // With a single permit the failure lands before the others start,
        // so at most one of the remaining tasks slips through the flag.
        assert!(executed.load(Ordering::SeqCst) < 3);
    }

    #[tokio::test]
    async fn test_skipped_tasks_are_excluded_from_results() {
        let abort = Arc::new(AtomicBool::new(false));
        let result = execute_batch(&ids(&["a", "b", "c"]), 3, abort, |node_id| async move {
            if node_id == "b" {
                Ok(None)
            } else {
                Ok(Some(node_id))
            }
        })
        .await
        .unwrap();
        assert_eq!(result.len(), 2);
        assert!(!result.contains(&"b".to_string()));
    }
}
