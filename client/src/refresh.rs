//! Single-flight coordination of access-token refreshes.
//!
//! The first caller to ask for a refresh becomes the leader and performs it.
//! Everyone who asks while the leader is busy is queued and receives the
//! leader's outcome. The coordinator belongs to one client instance; two
//! clients never share a queue.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

/// New access token, or why the refresh failed.
pub type RefreshOutcome = Result<String, String>;

const ABANDONED: &str = "refresh abandoned before completing";

#[derive(Debug, Default)]
struct State {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<State>,
}

/// What `enqueue_or_trigger` hands back.
#[derive(Debug)]
pub enum RefreshTicket<'a> {
    /// No refresh was running: the caller must perform it and settle.
    Leader(RefreshLeader<'a>),
    /// A refresh is running: await its outcome.
    Waiter(RefreshWaiter),
}

/// Obligation to settle the in-flight refresh. Dropping it unsettled
/// rejects every waiter.
#[derive(Debug)]
pub struct RefreshLeader<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLeader<'_> {
    /// Release every waiter with `token`. Returns how many were waiting.
    pub fn resolve(mut self, token: &str) -> usize {
        self.settled = true;
        self.coordinator.resolve(token)
    }

    /// Release every waiter with `message`. Returns how many were waiting.
    pub fn reject(mut self, message: impl Into<String>) -> usize {
        self.settled = true;
        self.coordinator.reject(message)
    }
}

impl Drop for RefreshLeader<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let released = self.coordinator.reject(ABANDONED);
            warn!(released, "refresh leader dropped without settling");
        }
    }
}

#[derive(Debug)]
pub struct RefreshWaiter {
    receiver: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshWaiter {
    pub async fn wait(self) -> RefreshOutcome {
        self.receiver.await.unwrap_or_else(|_| Err(ABANDONED.to_string()))
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Become the leader if nothing is in flight, otherwise join the queue.
    pub fn enqueue_or_trigger(&self) -> RefreshTicket<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            debug!(waiting = state.waiters.len(), "refresh in flight, queued");
            RefreshTicket::Waiter(RefreshWaiter { receiver })
        } else {
            state.in_flight = true;
            RefreshTicket::Leader(RefreshLeader {
                coordinator: self,
                settled: false,
            })
        }
    }

    /// Release all queued waiters with `token` and clear the in-flight flag.
    pub fn resolve(&self, token: &str) -> usize {
        self.settle(Ok(token.to_string()))
    }

    /// Release all queued waiters with `message` and clear the in-flight flag.
    pub fn reject(&self, message: impl Into<String>) -> usize {
        self.settle(Err(message.into()))
    }

    fn settle(&self, outcome: RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        let released = waiters.len();
        for waiter in waiters {
            // A waiter that gave up has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
        released
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of callers queued behind the current refresh.
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Run `refresh` as leader, or wait for the leader already running one.
    pub async fn run<F, Fut>(&self, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        match self.enqueue_or_trigger() {
            RefreshTicket::Leader(leader) => {
                let outcome = refresh().await;
                let released = match &outcome {
                    Ok(token) => leader.resolve(token),
                    Err(message) => leader.reject(message.clone()),
                };
                debug!(released, ok = outcome.is_ok(), "refresh settled");
                outcome
            }
            RefreshTicket::Waiter(waiter) => waiter.wait().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn first_caller_leads_the_rest_wait() {
        let coordinator = RefreshCoordinator::new();
        let leader = coordinator.enqueue_or_trigger();
        assert!(matches!(leader, RefreshTicket::Leader(_)));
        assert!(coordinator.is_refreshing());

        let second = coordinator.enqueue_or_trigger();
        let third = coordinator.enqueue_or_trigger();
        assert!(matches!(second, RefreshTicket::Waiter(_)));
        assert!(matches!(third, RefreshTicket::Waiter(_)));
        assert_eq!(coordinator.waiting(), 2);
        drop((second, third));
        drop(leader);
    }

    #[tokio::test]
    async fn resolve_releases_every_waiter_with_the_token() {
        let coordinator = RefreshCoordinator::new();
        let RefreshTicket::Leader(leader) = coordinator.enqueue_or_trigger() else {
            panic!("expected leader");
        };
        let waiters: Vec<_> = (0..3)
            .map(|_| match coordinator.enqueue_or_trigger() {
                RefreshTicket::Waiter(w) => w,
                RefreshTicket::Leader(_) => panic!("expected waiter"),
            })
            .collect();

        assert_eq!(leader.resolve("fresh"), 3);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.waiting(), 0);
        for waiter in waiters {
            assert_eq!(waiter.wait().await, Ok("fresh".to_string()));
        }
    }

    #[tokio::test]
    async fn reject_releases_every_waiter_with_the_error() {
        let coordinator = RefreshCoordinator::new();
        let RefreshTicket::Leader(leader) = coordinator.enqueue_or_trigger() else {
            panic!("expected leader");
        };
        let RefreshTicket::Waiter(waiter) = coordinator.enqueue_or_trigger() else {
            panic!("expected waiter");
        };
        assert_eq!(leader.reject("refresh token revoked"), 1);
        assert_eq!(waiter.wait().await, Err("refresh token revoked".to_string()));
    }

    #[tokio::test]
    async fn dropped_leader_rejects_waiters() {
        let coordinator = RefreshCoordinator::new();
        let leader = coordinator.enqueue_or_trigger();
        let RefreshTicket::Waiter(waiter) = coordinator.enqueue_or_trigger() else {
            panic!("expected waiter");
        };
        drop(leader);
        assert!(!coordinator.is_refreshing());
        assert_eq!(waiter.wait().await, Err(ABANDONED.to_string()));
    }

    #[tokio::test]
    async fn next_refresh_after_settling_gets_a_new_leader() {
        let coordinator = RefreshCoordinator::new();
        let RefreshTicket::Leader(leader) = coordinator.enqueue_or_trigger() else {
            panic!("expected leader");
        };
        leader.resolve("one");
        assert!(matches!(coordinator.enqueue_or_trigger(), RefreshTicket::Leader(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn run_executes_refresh_once_for_concurrent_callers() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    coordinator
                        .run(|| async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok("fresh".to_string())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok("fresh".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
