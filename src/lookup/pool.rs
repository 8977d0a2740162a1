use std::{future::Future, sync::Arc};

use tokio::{sync::Semaphore, task::JoinHandle};

use crate::Error;

/// Fixed number of workers shared by every lookup. Tasks beyond the ceiling
/// wait for a free worker in submission order.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: u32,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = u32::try_from(size.max(1)).unwrap_or(u32::MAX);
        Self {
            permits: Arc::new(Semaphore::new(size as usize)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Runs `task` once a worker is free. Fails with [`Error::PoolClosed`] after
    /// [`WorkerPool::drain`].
    pub fn spawn<F, T>(&self, task: F) -> JoinHandle<Result<T, Error>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| Error::PoolClosed)?;
            Ok(task.await)
        })
    }

    /// Waits for queued and running tasks to finish, then refuses new ones.
    pub async fn drain(&self) {
        match self.permits.acquire_many(self.size).await {
            Ok(all) => {
                self.permits.close();
                drop(all);
                debug!("worker pool of {} drained", self.size());
            }
            Err(_) => debug!("worker pool already closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[tokio::test]
    async fn never_runs_more_than_size_tasks() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn drain_waits_then_refuses() {
        let pool = WorkerPool::new(2);
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let running = pool.spawn(async move {
            let _ = started_tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
        started_rx.await.unwrap();

        pool.drain().await;
        assert!(running.await.unwrap().is_ok());
        assert_eq!(done.load(Ordering::SeqCst), 1);

        let refused = pool.spawn(async {}).await.unwrap();
        assert!(matches!(refused, Err(Error::PoolClosed)));
    }

    #[test]
    fn zero_size_is_clamped() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
