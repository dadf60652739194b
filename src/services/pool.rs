//! Bounded fan-out over an index set.
//!
//! Every item becomes its own task, but a task only starts work once it
//! holds a permit from a shared semaphore sized to the concurrency limit.
//! Results are collected through a handle array addressed by the item's
//! original index, so the output order is the input order no matter which
//! task finishes first.

use std::{future::Future, sync::Arc};
use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinHandle},
};

/// Run `work` over `items` with at most `limit` futures in flight.
///
/// A `limit` of zero is treated as one and a limit above
/// `Semaphore::MAX_PERMITS` is capped there. A panicking unit yields `Err` in its
/// own slot and does not disturb its siblings. The permit is dropped when the
/// unit finishes, whether it succeeded, failed or panicked.
pub async fn run_bounded<T, R, F, Fut>(
    items: Vec<T>,
    limit: usize,
    work: F,
) -> Vec<Result<R, JoinError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let gate = Arc::new(Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS)));

    // handles[idx] belongs to items[idx]
    let handles: Vec<JoinHandle<R>> = items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let gate = Arc::clone(&gate);
            let unit = work(idx, item);
            tokio::spawn(async move {
                // The semaphore is never closed, so acquisition only waits.
                let _permit = gate.acquire_owned().await.ok();
                unit.await
            })
        })
        .collect();

    let mut slots = Vec::with_capacity(handles.len());
    for handle in handles {
        slots.push(handle.await);
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_input_order() {
        let items: Vec<u64> = (0..8).collect();
        let results = run_bounded(items, 3, |idx, item| async move {
            // later items finish first
            tokio::time::sleep(Duration::from_millis(40 - item * 5)).await;
            (idx, item * 10)
        })
        .await;

        let values: Vec<(usize, u64)> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            values,
            (0..8).map(|i| (i as usize, i * 10)).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = run_bounded((0..20).collect::<Vec<u32>>(), 4, |_, _| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(results.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn panic_is_isolated_to_its_slot() {
        let results = run_bounded(vec![1, 2, 3], 2, |_, item: i32| async move {
            if item == 2 {
                panic!("boom");
            }
            item
        })
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert!(results[1].as_ref().unwrap_err().is_panic());
        assert_eq!(*results[2].as_ref().unwrap(), 3);
    }

    #[tokio::test]
    async fn zero_limit_still_makes_progress() {
        let results = run_bounded(vec!["a", "b"], 0, |_, s| async move { s.len() }).await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn oversized_limit_does_not_panic() {
        let results = run_bounded(vec![1u8, 2], usize::MAX, |_, b| async move { b * 2 }).await;
        let values: Vec<u8> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, vec![2, 4]);
    }

    #[tokio::test]
    async fn empty_input() {
        let results = run_bounded(Vec::<u8>::new(), 5, |_, b| async move { b }).await;
        assert!(results.is_empty());
    }
}
