//! Job queue
//!
//! Fire-and-forget submission of job requests to a fixed pool of worker tasks. Each worker
//! hosts one workflow run at a time; a semaphore bounds how many runs execute concurrently
//! across workers. Requests already queued or running are deduplicated by job key.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::PipelineError;
use crate::job::JobRequest;
use crate::types::JobKey;

/// Runs one job to completion. Pipeline failures are expected to be recorded on the job;
/// an `Err` here means the job could not even be accounted for.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, request: JobRequest) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Worker tasks pulling from the queue
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Runs executing at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Pending requests beyond this are rejected
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

fn default_workers() -> usize {
    2
}

fn default_max_concurrent() -> usize {
    2
}

fn default_max_queue_size() -> usize {
    1000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_concurrent: default_max_concurrent(),
            max_queue_size: default_max_queue_size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

struct Shared {
    pending: Mutex<VecDeque<JobRequest>>,
    in_flight: Mutex<HashSet<JobKey>>,
    stats: RwLock<QueueStats>,
    running: RwLock<bool>,
    notify: Notify,
    permits: Semaphore,
    handler: Arc<dyn JobHandler>,
}

pub struct JobQueue {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(handler: Arc<dyn JobHandler>, config: QueueConfig) -> Self {
        let shared = Shared {
            pending: Mutex::new(VecDeque::new()),
            in_flight: Mutex::new(HashSet::new()),
            stats: RwLock::new(QueueStats::default()),
            running: RwLock::new(false),
            notify: Notify::new(),
            permits: Semaphore::new(config.max_concurrent.max(1)),
            handler,
        };
        Self {
            shared: Arc::new(shared),
            workers: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Queue a request. Returns `false` when a request with the same key is already queued
    /// or running.
    pub fn enqueue(&self, request: JobRequest) -> Result<bool, PipelineError> {
        let mut in_flight = self.shared.in_flight.lock();
        if in_flight.contains(&request.key) {
            debug!(job_key = %request.key, "Request already queued");
            return Ok(false);
        }
        let mut pending = self.shared.pending.lock();
        if pending.len() >= self.config.max_queue_size {
            return Err(PipelineError::QueueError(format!(
                "queue is full ({} pending)",
                pending.len()
            )));
        }
        in_flight.insert(request.key.clone());
        debug!(job_key = %request.key, kind = %request.kind, "Enqueued job");
        pending.push_back(request);
        drop(pending);
        drop(in_flight);

        self.shared.stats.write().pending += 1;
        self.shared.notify.notify_one();
        Ok(true)
    }

    /// Start the worker tasks. Must be called within a tokio runtime.
    pub fn start(&self) {
        {
            let mut running = self.shared.running.write();
            if *running {
                return;
            }
            *running = true;
        }

        let mut workers = self.workers.lock();
        for worker_id in 0..self.config.workers.max(1) {
            let shared = Arc::clone(&self.shared);
            workers.push(tokio::spawn(worker_loop(worker_id, shared)));
        }
        info!(worker_count = workers.len(), "Started job queue workers");
    }

    /// Stop accepting work from the queue and wait for in-progress runs to finish.
    /// Requests still pending stay queued.
    pub async fn shutdown(&self) {
        {
            let mut running = self.shared.running.write();
            if !*running {
                return;
            }
            *running = false;
        }
        self.shared.notify.notify_waiters();

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            let _ = handle.await;
        }
        info!("Stopped job queue workers");
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.stats.read().clone()
    }

    pub fn is_running(&self) -> bool {
        *self.shared.running.read()
    }

    /// Wait until nothing is pending or processing.
    pub async fn wait_for_idle(&self, timeout: Option<Duration>) -> Result<(), PipelineError> {
        let start = Instant::now();
        loop {
            let idle = {
                let stats = self.shared.stats.read();
                stats.pending == 0 && stats.processing == 0
            };
            if idle {
                return Ok(());
            }
            if let Some(timeout) = timeout {
                if start.elapsed() >= timeout {
                    return Err(PipelineError::QueueError(
                        "timed out waiting for the queue to drain".to_string(),
                    ));
                }
            }
            sleep(Duration::from_millis(20)).await;
        }
    }
}

async fn worker_loop(worker_id: usize, shared: Arc<Shared>) {
    debug!(worker_id, "Worker started");

    while *shared.running.read() {
        let next = shared.pending.lock().pop_front();
        let Some(request) = next else {
            tokio::select! {
                _ = shared.notify.notified() => {}
                _ = sleep(Duration::from_millis(100)) => {}
            }
            continue;
        };

        {
            let mut stats = shared.stats.write();
            stats.pending = stats.pending.saturating_sub(1);
            stats.processing += 1;
        }

        let key = request.key.clone();
        let outcome = match shared.permits.acquire().await {
            Ok(_permit) => shared.handler.handle(request).await,
            Err(_) => Err(PipelineError::QueueError("queue permits closed".to_string())),
        };

        shared.in_flight.lock().remove(&key);
        {
            let mut stats = shared.stats.write();
            stats.processing = stats.processing.saturating_sub(1);
            match &outcome {
                Ok(()) => stats.completed += 1,
                Err(_) => stats.failed += 1,
            }
        }
        if let Err(e) = outcome {
            error!(worker_id, job_key = %key, error = %e, "Job handler failed");
        }
    }

    debug!(worker_id, "Worker stopped");
}
