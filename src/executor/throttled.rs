//! Bounded worker pool for chunk tasks.

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ChunkResult;
use crate::config::ExecutorConfig;
use crate::error::{BatchError, BatchResult, ChunkFailure};
use crate::log_chunk;
use crate::models::{Chunk, Record};
use crate::step::ChunkProcessor;
use crate::writer::ChunkWriter;

tokio::task_local! {
    static WORKER_NAME: String;
}

/// Name of the executor worker running the current task, if any
pub fn current_worker() -> Option<String> {
    WORKER_NAME.try_with(|name| name.clone()).ok()
}

/// Executor lifecycle; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolLifecycle {
    Initialized,
    Accepting,
    Draining,
    Terminated,
}

impl PoolLifecycle {
    pub fn accepts_tasks(&self) -> bool {
        matches!(self, PoolLifecycle::Accepting)
    }

    pub fn is_shutdown(&self) -> bool {
        *self >= PoolLifecycle::Draining
    }
}

impl fmt::Display for PoolLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PoolLifecycle::Initialized => "INITIALIZED",
            PoolLifecycle::Accepting => "ACCEPTING",
            PoolLifecycle::Draining => "DRAINING",
            PoolLifecycle::Terminated => "TERMINATED",
        };
        f.write_str(label)
    }
}

/// Point-in-time view of the pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerPoolState {
    pub core_size: usize,
    pub max_size: usize,
    pub keep_alive: Duration,
    pub allow_core_thread_timeout: bool,
    /// Chunks currently inside the processor or writer
    pub active_tasks: usize,
    /// Workers waiting for or running tasks
    pub live_workers: usize,
    pub lifecycle: PoolLifecycle,
}

impl WorkerPoolState {
    pub fn is_shutdown(&self) -> bool {
        self.lifecycle.is_shutdown()
    }
}

struct ChunkTask<R> {
    chunk: Chunk<R>,
    permit: OwnedSemaphorePermit,
    reply: oneshot::Sender<ChunkResult>,
}

struct PoolShared<R: Record> {
    config: ExecutorConfig,
    processor: Arc<dyn ChunkProcessor<R>>,
    writer: Arc<dyn ChunkWriter<R>>,
    permits: Arc<Semaphore>,
    sender: Mutex<Option<mpsc::UnboundedSender<ChunkTask<R>>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<ChunkTask<R>>>,
    lifecycle: Mutex<PoolLifecycle>,
    live_workers: AtomicUsize,
    active_tasks: AtomicUsize,
    workers_started: AtomicUsize,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<R: Record> PoolShared<R> {
    /// Start a worker unless `throttle_limit` workers are already live.
    /// Callers hold the sender lock so no worker starts after the queue closes.
    fn ensure_worker(self: &Arc<Self>) {
        let limit = self.config.throttle_limit;
        let reserved = self
            .live_workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                (live < limit).then_some(live + 1)
            })
            .is_ok();
        if reserved {
            self.spawn_worker();
        }
    }

    fn spawn_worker(self: &Arc<Self>) {
        let number = self.workers_started.fetch_add(1, Ordering::SeqCst) + 1;
        let name = format!("{}{}", self.config.worker_name_prefix, number);
        let shared = Arc::clone(self);
        let handle = tokio::spawn(WORKER_NAME.scope(name.clone(), shared.worker_loop(name)));

        let mut workers = self.workers.lock();
        workers.retain(|worker| !worker.is_finished());
        workers.push(handle);
    }

    async fn worker_loop(self: Arc<Self>, name: String) {
        debug!(worker = %name, "Worker started");

        loop {
            let next = if self.config.allow_core_thread_timeout {
                match tokio::time::timeout(self.config.keep_alive(), self.next_task()).await {
                    Ok(next) => next,
                    Err(_) => {
                        self.retire(&name).await;
                        return;
                    }
                }
            } else {
                self.next_task().await
            };

            match next {
                Some(task) => self.run_task(&name, task).await,
                None => break,
            }
        }

        self.live_workers.fetch_sub(1, Ordering::SeqCst);
        debug!(worker = %name, "Worker exiting, task queue closed");
    }

    /// Finish queued tasks, then leave the pool
    ///
    /// The worker stays counted in `live_workers` while it drains. A task
    /// queued while it still counted started no replacement worker, so the
    /// queue is checked once more after the decrement.
    async fn retire(&self, name: &str) {
        loop {
            while let Some(task) = self.try_next_task().await {
                self.run_task(name, task).await;
            }
            self.live_workers.fetch_sub(1, Ordering::SeqCst);

            match self.try_next_task().await {
                Some(task) => {
                    self.live_workers.fetch_add(1, Ordering::SeqCst);
                    self.run_task(name, task).await;
                }
                None => break,
            }
        }
        debug!(worker = %name, "Idle worker reclaimed after keep-alive");
    }

    async fn next_task(&self) -> Option<ChunkTask<R>> {
        self.receiver.lock().await.recv().await
    }

    async fn try_next_task(&self) -> Option<ChunkTask<R>> {
        self.receiver.lock().await.try_recv().ok()
    }

    async fn run_task(&self, worker: &str, task: ChunkTask<R>) {
        let ChunkTask {
            chunk,
            permit,
            reply,
        } = task;
        let chunk_index = chunk.index();
        let submitted_items = chunk.len();

        self.active_tasks.fetch_add(1, Ordering::SeqCst);
        log_chunk!(
            debug,
            "STARTED",
            chunk_index: chunk_index,
            worker: worker,
            items: submitted_items
        );

        let processor = Arc::clone(&self.processor);
        let writer = Arc::clone(&self.writer);
        let started = Instant::now();
        let outcome = AssertUnwindSafe(async move {
            let processed = processor.process(chunk).await?;
            writer.write(&processed).await?;
            Ok::<usize, ChunkFailure>(processed.len())
        })
        .catch_unwind()
        .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(written)) => {
                log_chunk!(
                    debug,
                    "COMPLETED",
                    chunk_index: chunk_index,
                    worker: worker,
                    items: written,
                    duration_ms: duration_ms
                );
                ChunkResult::succeeded(chunk_index, written, worker, duration_ms)
            }
            Ok(Err(failure)) => {
                log_chunk!(
                    warn,
                    "FAILED",
                    chunk_index: chunk_index,
                    worker: worker,
                    error: failure.to_string()
                );
                ChunkResult::failed(chunk_index, submitted_items, worker, failure, duration_ms)
            }
            Err(panic) => {
                let message = if let Some(message) = panic.downcast_ref::<&str>() {
                    message.to_string()
                } else if let Some(message) = panic.downcast_ref::<String>() {
                    message.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!(worker = %worker, chunk_index, panic_msg = %message, "Chunk task panicked");
                ChunkResult::failed(
                    chunk_index,
                    submitted_items,
                    worker,
                    ChunkFailure::Panicked(message),
                    duration_ms,
                )
            }
        };

        self.active_tasks.fetch_sub(1, Ordering::SeqCst);
        drop(permit);

        if reply.send(result).is_err() {
            debug!(worker = %worker, chunk_index, "Chunk handle dropped before result delivery");
        }
    }

    fn mark_terminated(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle != PoolLifecycle::Terminated {
            *lifecycle = PoolLifecycle::Terminated;
            info!(
                workers_started = self.workers_started.load(Ordering::SeqCst),
                "Executor terminated"
            );
        }
    }
}

async fn join_workers(workers: Vec<JoinHandle<()>>) {
    for worker in workers {
        if let Err(join_error) = worker.await {
            if join_error.is_panic() {
                error!(error = %join_error, "Executor worker panicked");
            } else {
                warn!(error = %join_error, "Executor worker was cancelled");
            }
        }
    }
}

/// Runs chunk tasks (process then write) on at most `throttle_limit`
/// concurrent workers
///
/// `submit` suspends the caller while `throttle_limit` chunks are in
/// flight. Task failures, including panics, come back as failed
/// [`ChunkResult`]s; they never take down the pool.
pub struct ThrottledExecutor<R: Record> {
    shared: Arc<PoolShared<R>>,
}

impl<R: Record> ThrottledExecutor<R> {
    pub fn new(
        config: ExecutorConfig,
        processor: Arc<dyn ChunkProcessor<R>>,
        writer: Arc<dyn ChunkWriter<R>>,
    ) -> BatchResult<Self> {
        config.validate()?;
        let (sender, receiver) = mpsc::unbounded_channel();

        Ok(Self {
            shared: Arc::new(PoolShared {
                permits: Arc::new(Semaphore::new(config.throttle_limit)),
                config,
                processor,
                writer,
                sender: Mutex::new(Some(sender)),
                receiver: tokio::sync::Mutex::new(receiver),
                lifecycle: Mutex::new(PoolLifecycle::Initialized),
                live_workers: AtomicUsize::new(0),
                active_tasks: AtomicUsize::new(0),
                workers_started: AtomicUsize::new(0),
                workers: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Start accepting submissions
    pub fn initialize(&self) -> BatchResult<()> {
        let mut lifecycle = self.shared.lifecycle.lock();
        match *lifecycle {
            PoolLifecycle::Initialized => {
                *lifecycle = PoolLifecycle::Accepting;
                info!(
                    throttle_limit = self.shared.config.throttle_limit,
                    keep_alive_seconds = self.shared.config.keep_alive_seconds,
                    allow_core_thread_timeout = self.shared.config.allow_core_thread_timeout,
                    "Executor accepting chunk tasks"
                );
                Ok(())
            }
            PoolLifecycle::Accepting => Ok(()),
            PoolLifecycle::Draining | PoolLifecycle::Terminated => {
                Err(BatchError::ExecutorShutdown)
            }
        }
    }

    /// Queue a chunk, waiting for a free slot when the pool is saturated
    pub async fn submit(&self, chunk: Chunk<R>) -> BatchResult<ChunkHandle> {
        self.ensure_accepting()?;

        let permit = Arc::clone(&self.shared.permits)
            .acquire_owned()
            .await
            .map_err(|_| BatchError::ExecutorShutdown)?;

        let chunk_index = chunk.index();
        let item_count = chunk.len();
        let (reply, receiver) = oneshot::channel();

        {
            let sender = self.shared.sender.lock();
            let Some(sender) = sender.as_ref() else {
                return Err(BatchError::ExecutorShutdown);
            };
            if sender
                .send(ChunkTask {
                    chunk,
                    permit,
                    reply,
                })
                .is_err()
            {
                return Err(BatchError::ExecutorShutdown);
            }
            self.shared.ensure_worker();
        }

        log_chunk!(debug, "SUBMITTED", chunk_index: chunk_index);
        Ok(ChunkHandle {
            chunk_index,
            item_count,
            receiver,
        })
    }

    /// Stop accepting submissions and let queued tasks drain
    ///
    /// With `wait_for_completion` this returns once every accepted task has
    /// finished and the executor is terminated; otherwise termination
    /// completes in the background.
    pub async fn shutdown(&self, wait_for_completion: bool) {
        let previous = {
            let mut lifecycle = self.shared.lifecycle.lock();
            let previous = *lifecycle;
            if previous < PoolLifecycle::Draining {
                *lifecycle = PoolLifecycle::Draining;
            }
            previous
        };
        if previous < PoolLifecycle::Draining {
            info!(
                wait_for_completion,
                active_tasks = self.shared.active_tasks.load(Ordering::SeqCst),
                "Executor draining"
            );
        }

        // Closing the queue lets workers exit once it is empty
        drop(self.shared.sender.lock().take());

        let workers = std::mem::take(&mut *self.shared.workers.lock());
        if wait_for_completion {
            join_workers(workers).await;
            self.shared.mark_terminated();
        } else {
            let shared = Arc::clone(&self.shared);
            let finalizer = tokio::spawn(async move {
                join_workers(workers).await;
                shared.mark_terminated();
            });
            self.shared.workers.lock().push(finalizer);
        }
    }

    pub fn lifecycle(&self) -> PoolLifecycle {
        *self.shared.lifecycle.lock()
    }

    pub fn state(&self) -> WorkerPoolState {
        let config = &self.shared.config;
        WorkerPoolState {
            core_size: config.throttle_limit,
            max_size: config.throttle_limit,
            keep_alive: config.keep_alive(),
            allow_core_thread_timeout: config.allow_core_thread_timeout,
            active_tasks: self.shared.active_tasks.load(Ordering::SeqCst),
            live_workers: self.shared.live_workers.load(Ordering::SeqCst),
            lifecycle: self.lifecycle(),
        }
    }

    pub fn throttle_limit(&self) -> usize {
        self.shared.config.throttle_limit
    }

    /// Free slots before `submit` starts waiting
    pub fn available_permits(&self) -> usize {
        self.shared.permits.available_permits()
    }

    fn ensure_accepting(&self) -> BatchResult<()> {
        match self.lifecycle() {
            PoolLifecycle::Accepting => Ok(()),
            PoolLifecycle::Initialized => Err(BatchError::InvalidState(
                "executor has not been initialized".to_string(),
            )),
            PoolLifecycle::Draining | PoolLifecycle::Terminated => {
                Err(BatchError::ExecutorShutdown)
            }
        }
    }
}

impl<R: Record> Drop for ThrottledExecutor<R> {
    fn drop(&mut self) {
        // Workers still hold the shared state; closing the queue lets them exit
        self.shared.sender.lock().take();
    }
}

impl<R: Record> fmt::Debug for ThrottledExecutor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottledExecutor")
            .field("state", &self.state())
            .finish()
    }
}

/// Resolves to the [`ChunkResult`] of one submitted chunk
#[derive(Debug)]
pub struct ChunkHandle {
    chunk_index: u64,
    item_count: usize,
    receiver: oneshot::Receiver<ChunkResult>,
}

impl ChunkHandle {
    pub fn chunk_index(&self) -> u64 {
        self.chunk_index
    }
}

impl Future for ChunkHandle {
    type Output = ChunkResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let chunk_index = self.chunk_index;
        let item_count = self.item_count;
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                warn!(chunk_index, "Worker dropped chunk task without reporting a result");
                ChunkResult::lost(chunk_index, item_count)
            })
        })
    }
}
