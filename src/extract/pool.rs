//! Ordered worker pool
//!
//! A fixed number of worker threads consume fixed-size task chunks from a
//! bounded queue and report results on a channel; the driver reorders
//! completed chunks so consumption always follows submission order,
//! regardless of completion order. Workers share no mutable state with the
//! driver or each other; the only cross-thread traffic is the task and
//! result messages.
//!
//! A worker failure cancels the pool and surfaces at the failed chunk's
//! position in the stream. An optional timeout bounds the wait for the next
//! completed chunk; dropping the result iterator cancels outstanding work.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::utils::PoolError;

/// Worker closure: pure function from task to result, errors as strings
pub type WorkerFn<T, R> = Arc<dyn Fn(T) -> Result<R, String> + Send + Sync>;

/// Pool sizing and failure-handling knobs
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub num_workers: usize,
    /// Tasks per submitted chunk (amortizes channel traffic)
    pub chunk_size: usize,
    /// Maximum wait for the next completed chunk
    pub timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            chunk_size: 64,
            timeout: None,
        }
    }
}

/// Map tasks through a worker pool, yielding chunks in submission order.
///
/// The returned iterator yields one `Result<Vec<R>, PoolError>` per chunk.
/// After an error is yielded the stream ends; already-yielded chunks are
/// unaffected.
pub fn ordered_map<T, R>(
    tasks: Vec<T>,
    worker: WorkerFn<T, R>,
    config: &PoolConfig,
) -> OrderedResults<R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    let chunk_size = config.chunk_size.max(1);
    let num_workers = config.num_workers.max(1);
    let total_chunks = tasks.len().div_ceil(chunk_size) as u64;
    let cancel = Arc::new(AtomicBool::new(false));

    let (task_tx, task_rx) = mpsc::sync_channel::<(u64, Vec<T>)>(num_workers * 2);
    let (result_tx, result_rx) = mpsc::channel::<(u64, Result<Vec<R>, PoolError>)>();
    let task_rx = Arc::new(Mutex::new(task_rx));

    // submission order is fixed here; the reorder buffer restores it on the
    // consumption side
    let feeder_cancel = Arc::clone(&cancel);
    let feeder = thread::Builder::new()
        .name("pool-feeder".to_string())
        .spawn(move || {
            let mut seq = 0u64;
            let mut chunk = Vec::with_capacity(chunk_size);
            for task in tasks {
                if feeder_cancel.load(Ordering::Relaxed) {
                    return;
                }
                chunk.push(task);
                if chunk.len() == chunk_size {
                    let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
                    if task_tx.send((seq, full)).is_err() {
                        return;
                    }
                    seq += 1;
                }
            }
            if !chunk.is_empty() {
                let _ = task_tx.send((seq, chunk));
            }
        })
        .expect("failed to spawn pool feeder");

    let mut workers = Vec::with_capacity(num_workers);
    for id in 0..num_workers {
        let task_rx = Arc::clone(&task_rx);
        let result_tx = result_tx.clone();
        let worker = Arc::clone(&worker);
        let cancel = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name(format!("pool-worker-{id}"))
            .spawn(move || loop {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                // hold the lock only while receiving, not while working
                let message = { task_rx.lock().expect("pool task lock poisoned").recv() };
                let Ok((seq, chunk)) = message else {
                    break;
                };

                let mut out = Vec::with_capacity(chunk.len());
                let mut failure = None;
                for task in chunk {
                    match worker(task) {
                        Ok(result) => out.push(result),
                        Err(message) => {
                            failure = Some(PoolError::Worker(message));
                            break;
                        }
                    }
                }

                let payload = match failure {
                    Some(e) => {
                        cancel.store(true, Ordering::Relaxed);
                        Err(e)
                    }
                    None => Ok(out),
                };
                if result_tx.send((seq, payload)).is_err() {
                    break;
                }
            })
            .expect("failed to spawn pool worker");
        workers.push(handle);
    }
    drop(result_tx);

    OrderedResults {
        rx: result_rx,
        pending: BTreeMap::new(),
        next_seq: 0,
        total_chunks,
        failed: false,
        timeout: config.timeout,
        cancel,
        feeder: Some(feeder),
        workers,
    }
}

/// Iterator over completed chunks, restored to submission order
pub struct OrderedResults<R> {
    rx: Receiver<(u64, Result<Vec<R>, PoolError>)>,
    /// Chunks completed ahead of the next expected sequence number
    pending: BTreeMap<u64, Result<Vec<R>, PoolError>>,
    next_seq: u64,
    total_chunks: u64,
    failed: bool,
    timeout: Option<Duration>,
    cancel: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl<R> OrderedResults<R> {
    /// Cancel outstanding work; in-flight chunks finish, queued ones don't
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    fn recv_next(&mut self) -> Result<(u64, Result<Vec<R>, PoolError>), PoolError> {
        match self.timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => PoolError::Timeout(timeout.as_millis() as u64),
                RecvTimeoutError::Disconnected => PoolError::Disconnected,
            }),
            None => self.rx.recv().map_err(|_| PoolError::Disconnected),
        }
    }
}

impl<R> Iterator for OrderedResults<R> {
    type Item = Result<Vec<R>, PoolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next_seq >= self.total_chunks {
            return None;
        }
        loop {
            if let Some(result) = self.pending.remove(&self.next_seq) {
                self.next_seq += 1;
                if result.is_err() {
                    self.failed = true;
                    self.cancel();
                }
                return Some(result);
            }
            match self.recv_next() {
                Ok((seq, result)) => {
                    self.pending.insert(seq, result);
                }
                Err(e) => {
                    self.failed = true;
                    self.cancel();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R> Drop for OrderedResults<R> {
    fn drop(&mut self) {
        self.cancel();
        while self.rx.try_recv().is_ok() {}
        if let Some(feeder) = self.feeder.take() {
            let _ = feeder.join();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(num_workers: usize, chunk_size: usize) -> PoolConfig {
        PoolConfig {
            num_workers,
            chunk_size,
            timeout: None,
        }
    }

    #[test]
    fn test_submission_order_preserved() {
        // later tasks finish first; consumption order must not change
        let tasks: Vec<u64> = (0..20).collect();
        let worker: WorkerFn<u64, u64> = Arc::new(|n| {
            std::thread::sleep(Duration::from_millis(20u64.saturating_sub(n)));
            Ok(n * 10)
        });

        let results: Vec<u64> = ordered_map(tasks, worker, &config(4, 3))
            .map(|chunk| chunk.unwrap())
            .flatten()
            .collect();
        let expected: Vec<u64> = (0..20).map(|n| n * 10).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn test_single_worker_matches_many() {
        let tasks: Vec<u64> = (0..100).collect();
        let worker: WorkerFn<u64, u64> = Arc::new(|n| Ok(n + 1));

        let one: Vec<u64> = ordered_map(tasks.clone(), Arc::clone(&worker), &config(1, 8))
            .flat_map(|chunk| chunk.unwrap())
            .collect();
        let four: Vec<u64> = ordered_map(tasks, worker, &config(4, 8))
            .flat_map(|chunk| chunk.unwrap())
            .collect();
        assert_eq!(one, four);
    }

    #[test]
    fn test_empty_input() {
        let worker: WorkerFn<u64, u64> = Arc::new(|n| Ok(n));
        let mut results = ordered_map(Vec::new(), worker, &config(2, 4));
        assert!(results.next().is_none());
    }

    #[test]
    fn test_worker_failure_propagates() {
        let tasks: Vec<u64> = (0..10).collect();
        let worker: WorkerFn<u64, u64> = Arc::new(|n| {
            if n == 5 {
                Err("bad task".to_string())
            } else {
                Ok(n)
            }
        });

        let mut saw_error = false;
        for chunk in ordered_map(tasks, worker, &config(2, 2)) {
            match chunk {
                Ok(_) => assert!(!saw_error, "stream continued past failure"),
                Err(PoolError::Worker(message)) => {
                    assert_eq!(message, "bad task");
                    saw_error = true;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(saw_error);
    }

    #[test]
    fn test_timeout_fires_on_hung_worker() {
        let tasks: Vec<u64> = vec![0];
        let worker: WorkerFn<u64, u64> = Arc::new(|n| {
            std::thread::sleep(Duration::from_millis(400));
            Ok(n)
        });
        let cfg = PoolConfig {
            num_workers: 1,
            chunk_size: 1,
            timeout: Some(Duration::from_millis(25)),
        };

        let mut results = ordered_map(tasks, worker, &cfg);
        assert!(matches!(results.next(), Some(Err(PoolError::Timeout(_)))));
        assert!(results.next().is_none());
    }
}
