//! Turns the task subscription into handler invocations.
//!
//! Tasks go through a bounded queue to a fixed pool of workers, so a slow
//! submission never stops the subscription from being read and at most
//! `workers` responses are in flight. Each task index is handled once; an
//! index whose handling failed is released again when the failure policy
//! keeps the operator running. Only the [`DEDUP_WINDOW`] indices below the
//! highest one seen are remembered, and anything older is dropped as a
//! duplicate, so memory stays flat on a long-running operator.
//!
//! A subscription that closes is an error; only `shutdown` ends a run cleanly.

use crate::avs::subscriber::TaskStream;
use crate::avs::Task;
use crate::config::TaskFailurePolicy;
use crate::operator::OperatorError;
use async_trait::async_trait;
use eigen_utils::types::AvsError;
use futures::StreamExt;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// How far below the highest task index a redelivered task is still told apart.
pub const DEDUP_WINDOW: u32 = 4096;

#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle_task(&self, task: &Task) -> Result<(), OperatorError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub received: usize,
    pub duplicates: usize,
    pub undecodable: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskDispatcher {
    workers: usize,
    queue_capacity: usize,
    failure_policy: TaskFailurePolicy,
}

/// Task indices already dispatched, within [`DEDUP_WINDOW`] of the highest.
#[derive(Debug)]
struct RecentTasks {
    indices: HashSet<u32>,
    highest: Option<u32>,
    window: u32,
}

impl RecentTasks {
    fn new(window: u32) -> Self {
        Self {
            indices: HashSet::new(),
            highest: None,
            window,
        }
    }

    fn floor(&self) -> u32 {
        self.highest
            .map_or(0, |highest| highest.saturating_sub(self.window))
    }

    /// False when `index` was dispatched before or is too old to tell.
    fn insert(&mut self, index: u32) -> bool {
        if index < self.floor() || !self.indices.insert(index) {
            return false;
        }
        if self.highest.map_or(true, |highest| index > highest) {
            self.highest = Some(index);
        }
        if self.indices.len() > 2 * self.window as usize {
            let floor = self.floor();
            self.indices.retain(|&i| i >= floor);
        }
        true
    }

    fn release(&mut self, index: u32) {
        self.indices.remove(&index);
    }
}

#[derive(Debug, Default)]
struct Counters {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl TaskDispatcher {
    pub fn new(workers: usize, queue_capacity: usize, failure_policy: TaskFailurePolicy) -> Self {
        Self {
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
            failure_policy,
        }
    }

    /// Dispatches tasks until `shutdown` resolves, then waits for the queued
    /// tasks to finish. A closed or failed subscription is an error. Under
    /// [`TaskFailurePolicy::Halt`] the first failed task stops everything and
    /// its error is returned.
    pub async fn run<H, F>(
        &self,
        mut tasks: TaskStream,
        handler: Arc<H>,
        shutdown: F,
    ) -> Result<DispatchSummary, OperatorError>
    where
        H: TaskHandler,
        F: Future<Output = ()> + Send,
    {
        let (queue_tx, queue_rx) = mpsc::channel::<Task>(self.queue_capacity);
        let (fail_tx, mut fail_rx) = mpsc::unbounded_channel::<OperatorError>();
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let seen = Arc::new(Mutex::new(RecentTasks::new(DEDUP_WINDOW)));
        let counters = Arc::new(Counters::default());

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            workers.spawn(worker_loop(
                worker_id,
                queue_rx.clone(),
                handler.clone(),
                seen.clone(),
                counters.clone(),
                fail_tx.clone(),
                self.failure_policy,
            ));
        }
        // Only the workers keep these alive from here on.
        drop(queue_rx);
        drop(fail_tx);

        let mut summary = DispatchSummary::default();
        let mut fatal = None;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                Some(err) = fail_rx.recv() => {
                    fatal = Some(err);
                    break;
                }
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, draining queued tasks");
                    break;
                }
                item = tasks.next() => match item {
                    Some(Ok(task)) => {
                        summary.received += 1;
                        if !seen.lock().await.insert(task.index) {
                            summary.duplicates += 1;
                            log::info!("Skipping duplicate task {}", task.index);
                            continue;
                        }
                        log::info!(
                            "Received new task: taskIndex={}, taskCreatedBlock={}",
                            task.index,
                            task.created_block
                        );
                        let index = task.index;
                        // A full queue must not hold up shutdown.
                        let sent = tokio::select! {
                            biased;
                            _ = &mut shutdown => None,
                            sent = queue_tx.send(task) => Some(sent.is_ok()),
                        };
                        match sent {
                            Some(true) => {}
                            Some(false) => {
                                log::warn!("All task workers have stopped");
                                break;
                            }
                            None => {
                                log::info!(
                                    "Shutdown requested, dropping task {} and draining queued tasks",
                                    index
                                );
                                break;
                            }
                        }
                    }
                    Some(Err(AvsError::EventDecodeError(e))) => {
                        summary.undecodable += 1;
                        log::warn!("Skipping undecodable NewTaskCreated log: {}", e);
                    }
                    Some(Err(e)) => {
                        fatal = Some(OperatorError::from(e));
                        break;
                    }
                    None => {
                        fatal = Some(OperatorError::from(AvsError::SubscriptionError(
                            "task subscription closed".to_string(),
                        )));
                        break;
                    }
                },
            }
        }

        drop(queue_tx);
        if fatal.is_some() {
            workers.abort_all();
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() && fatal.is_none() {
                    fatal = Some(OperatorError::TaskError(e.to_string()));
                }
            }
        }
        if fatal.is_none() {
            fatal = fail_rx.try_recv().ok();
        }

        summary.succeeded = counters.succeeded.load(Ordering::SeqCst);
        summary.failed = counters.failed.load(Ordering::SeqCst);
        log::info!("Task dispatch finished: {:?}", summary);

        match fatal {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }
}

async fn worker_loop<H: TaskHandler>(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Task>>>,
    handler: Arc<H>,
    seen: Arc<Mutex<RecentTasks>>,
    counters: Arc<Counters>,
    fail_tx: mpsc::UnboundedSender<OperatorError>,
    failure_policy: TaskFailurePolicy,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };
        match handler.handle_task(&task).await {
            Ok(()) => {
                counters.succeeded.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                log::error!("Worker {} failed task {}: {}", worker_id, task.index, e);
                match failure_policy {
                    TaskFailurePolicy::Halt => {
                        let _ = fail_tx.send(e);
                        break;
                    }
                    TaskFailurePolicy::LogAndContinue => {
                        seen.lock().await.release(task.index);
                    }
                }
            }
        }
    }
}
