use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Process-wide FIFO queue that hands out one run turn at a time.
///
/// Waiters are served in the order they called [`TestRunQueue::acquire`].
pub struct TestRunQueue {
    turn: Arc<Mutex<()>>,
    pending: Arc<AtomicUsize>,
    issued: AtomicU64,
}

impl TestRunQueue {
    pub fn new() -> Self {
        Self {
            turn: Arc::new(Mutex::new(())),
            pending: Arc::new(AtomicUsize::new(0)),
            issued: AtomicU64::new(0),
        }
    }

    /// Wait until every earlier caller has released its ticket
    pub async fn acquire(&self) -> TestRunTicket {
        let number = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending.fetch_add(1, Ordering::SeqCst);
        let waiting = PendingGuard(self.pending.clone());

        let guard = self.turn.clone().lock_owned().await;
        TestRunTicket {
            number,
            _guard: guard,
            _pending: waiting,
        }
    }

    /// Calls currently queued or running
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Default for TestRunQueue {
    fn default() -> Self {
        Self::new()
    }
}

// Decrements the pending count when a waiter is abandoned or a ticket is released
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holding a ticket means holding the only run turn; dropping it releases
/// the turn to the next waiter.
pub struct TestRunTicket {
    number: u64,
    _guard: OwnedMutexGuard<()>,
    _pending: PendingGuard,
}

impl TestRunTicket {
    pub fn number(&self) -> u64 {
        self.number
    }
}

impl Drop for TestRunTicket {
    fn drop(&mut self) {
        tracing::debug!(ticket = self.number, "Released test run turn");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_turns_are_fifo() {
        let queue = Arc::new(TestRunQueue::new());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let first = queue.acquire().await;
        let mut handles = Vec::new();
        for i in 0..3 {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _ticket = queue.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Let the task enqueue before spawning the next one
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(queue.pending(), 4);
        drop(first);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_waiter_does_not_block_queue() {
        let queue = Arc::new(TestRunQueue::new());
        let held = queue.acquire().await;

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let _ticket = queue.acquire().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        waiter.abort();
        let _ = waiter.await;

        drop(held);
        let ticket = tokio::time::timeout(Duration::from_secs(1), queue.acquire()).await;
        assert!(ticket.is_ok());
    }
}
