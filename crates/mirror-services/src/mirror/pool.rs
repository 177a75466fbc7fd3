use std::future::Future;

use futures::future::join_all;
use tokio::sync::Mutex;

/// Run `handler` over `items` with at most `limit` calls in flight.
///
/// `min(limit, items.len())` workers pull jobs from a shared queue; each result is
/// stored at its item's original index, so the output order matches the input
/// order whatever order the jobs finish in.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, handler: F) -> Vec<R>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let queue = Mutex::new(items.into_iter().enumerate());
    let queue = &queue;
    let handler = &handler;
    let workers = limit.clamp(1, total);

    let finished = join_all((0..workers).map(|_| async move {
        let mut done = Vec::new();
        loop {
            let next = queue.lock().await.next();
            let Some((index, item)) = next else {
                break;
            };
            done.push((index, handler(index, item).await));
        }
        done
    }))
    .await;

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    for (index, result) in finished.into_iter().flatten() {
        slots[index] = Some(result);
    }
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_limit() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let results = run_bounded((0..7).collect(), 2, |_, n: u64| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                n * 10
            }
        })
        .await;

        assert_eq!(results, vec![0, 10, 20, 30, 40, 50, 60]);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn output_follows_input_order() {
        // Earlier items sleep longer so they finish last.
        let results = run_bounded(vec![30u64, 20, 10, 0], 4, |index, delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            index
        })
        .await;

        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn every_item_is_handled_exactly_once() {
        let calls = AtomicUsize::new(0);
        let items: Vec<usize> = (0..250).collect();

        let results = run_bounded(items.clone(), 3, |index, n| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                assert_eq!(index, n);
                n
            }
        })
        .await;

        assert_eq!(results, items);
        assert_eq!(calls.load(Ordering::SeqCst), 250);
    }

    #[tokio::test]
    async fn zero_limit_still_makes_progress() {
        let results = run_bounded(vec!["a", "b"], 0, |_, s| async move { s.len() }).await;
        assert_eq!(results, vec![1, 1]);
    }

    #[tokio::test]
    async fn empty_input() {
        let results: Vec<u8> = run_bounded(Vec::<u8>::new(), 2, |_, x| async move { x }).await;
        assert!(results.is_empty());
    }
}
