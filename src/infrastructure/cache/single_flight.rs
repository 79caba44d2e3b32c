//! Coalescing of concurrent computations per key

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::domain::cache::CacheKey;
use crate::domain::CacheError;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, CacheError>>>;
type InFlight<T> = Arc<Mutex<HashMap<CacheKey, (u64, SharedResult<T>)>>>;

/// How a caller took part in a computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    /// Started the computation
    Leader,
    /// Attached to a computation already in flight
    Follower,
}

/// Ensures at most one computation per key is in flight
///
/// The computation runs on its own tokio task, so it completes even if every
/// caller waiting on it is cancelled. It unregisters itself before its
/// result is released, so a finished result is never handed to a later caller.
pub struct SingleFlight<T> {
    calls: InFlight<T>,
    next_id: AtomicU64,
}

impl<T> fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a computation in flight
    pub fn in_flight(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Run `compute` for `key` unless a computation for it is already in
    /// flight, in which case wait for that one
    ///
    /// Every caller attached to the same computation receives the same
    /// result, failures included. `compute` is only called by the leader.
    pub async fn execute_once<F, Fut>(&self, key: &CacheKey, compute: F) -> (Result<T, CacheError>, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CacheError>> + Send + 'static,
    {
        let (shared, role) = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);

            match calls.get(key) {
                Some((_, shared)) => (shared.clone(), FlightRole::Follower),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let shared = self.spawn(key.clone(), id, compute());
                    calls.insert(key.clone(), (id, shared.clone()));

                    (shared, FlightRole::Leader)
                }
            }
        };

        (shared.await, role)
    }

    fn spawn<Fut>(&self, key: CacheKey, id: u64, computation: Fut) -> SharedResult<T>
    where
        Fut: Future<Output = Result<T, CacheError>> + Send + 'static,
    {
        let calls = Arc::clone(&self.calls);

        let task = tokio::spawn(async move {
            // Dropped on completion, panic or abort alike.
            let _registration = Registration { calls, key, id };

            computation.await
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(CacheError::internal(format!(
                    "In-flight computation did not complete: {}",
                    e
                ))),
            }
        }
        .boxed()
        .shared()
    }
}

/// Unregisters a computation from the in-flight map when dropped
struct Registration<T> {
    calls: InFlight<T>,
    key: CacheKey,
    id: u64,
}

impl<T> Drop for Registration<T> {
    fn drop(&mut self) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);

        if calls.get(&self.key).is_some_and(|(current, _)| *current == self.id) {
            calls.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheKeyNormalizer;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn key(text: &str) -> CacheKey {
        CacheKeyNormalizer::new().normalize(text)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_caller_is_leader() {
        let flight = SingleFlight::<String>::new();

        let (result, role) = flight
            .execute_once(&key("a"), || async { Ok("done".to_string()) })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(role, FlightRole::Leader);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_computation() {
        let flight = Arc::new(SingleFlight::<String>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flight = Arc::clone(&flight);
                let runs = Arc::clone(&runs);

                tokio::spawn(async move {
                    flight
                        .execute_once(&key("same"), move || async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok("shared".to_string())
                        })
                        .await
                })
            })
            .collect();

        let mut leaders = 0;
        for handle in handles {
            let (result, role) = handle.await.unwrap();
            assert_eq!(result.unwrap(), "shared");
            if role == FlightRole::Leader {
                leaders += 1;
            }
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(leaders, 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_keys_run_independently() {
        let flight = Arc::new(SingleFlight::<String>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|text| {
                let flight = Arc::clone(&flight);
                let runs = Arc::clone(&runs);

                tokio::spawn(async move {
                    flight
                        .execute_once(&key(text), move || async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(text.to_string())
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            let (_, role) = handle.await.unwrap();
            assert_eq!(role, FlightRole::Leader);
        }

        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reaches_every_waiter_and_is_not_kept() {
        let flight = Arc::new(SingleFlight::<String>::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let flight = Arc::clone(&flight);

                tokio::spawn(async move {
                    flight
                        .execute_once(&key("boom"), || async {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Err::<String, _>(CacheError::backend("upstream exploded"))
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            let (result, _) = handle.await.unwrap();
            assert_eq!(result, Err(CacheError::backend("upstream exploded")));
        }

        let (result, role) = flight
            .execute_once(&key("boom"), || async { Ok("recovered".to_string()) })
            .await;

        assert_eq!(role, FlightRole::Leader);
        assert_eq!(result.unwrap(), "recovered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_computation_survives_cancelled_leader() {
        let flight = Arc::new(SingleFlight::<String>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let leader = {
            let flight = Arc::clone(&flight);
            let runs = Arc::clone(&runs);

            tokio::spawn(async move {
                flight
                    .execute_once(&key("slow"), move || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok("finished".to_string())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        leader.abort();

        let (result, role) = flight
            .execute_once(&key("slow"), || async { Ok("duplicate".to_string()) })
            .await;

        assert_eq!(role, FlightRole::Follower);
        assert_eq!(result.unwrap(), "finished");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_computation_surfaces_internal_error() {
        let flight = SingleFlight::<String>::new();

        let should_panic = true;
        let (result, _) = flight
            .execute_once(&key("panic"), move || async move {
                if should_panic {
                    panic!("computation panicked");
                }
                Ok("unreachable".to_string())
            })
            .await;

        assert!(matches!(result, Err(CacheError::Internal { .. })));
        assert_eq!(flight.in_flight(), 0);

        let (result, role) = flight
            .execute_once(&key("panic"), || async { Ok("retried".to_string()) })
            .await;

        assert_eq!(role, FlightRole::Leader);
        assert_eq!(result.unwrap(), "retried");
    }
}
