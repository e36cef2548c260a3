//! Cancellable preload queue.
//!
//! - Tasks are thunks, so nothing is fetched until the queue runs them
//! - Tasks start in submission order, at most `concurrency` at a time
//! - `cancel` drops tasks that have not started and aborts running ones;
//!   fetches they already handed to a provider cache still complete there

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use flume::{Receiver, Sender};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, trace};

/// A deferred warm-up: produces the future to run once the queue gets to it.
pub type PreloadTask = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

pub struct PreloadQueue {
    name: &'static str,
    concurrency: usize,
    task_tx: Sender<PreloadTask>,
    task_rx: Receiver<PreloadTask>,
    cancelled: Arc<AtomicBool>,
    started: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
    runner: Option<JoinHandle<()>>,
}

impl PreloadQueue {
    pub fn new(name: &'static str, concurrency: usize) -> Self {
        let (task_tx, task_rx) = flume::unbounded();
        Self {
            name,
            concurrency: concurrency.max(1),
            task_tx,
            task_rx,
            cancelled: Arc::new(AtomicBool::new(false)),
            started: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
            runner: None,
        }
    }

    /// Append a task. Ignored once the queue is cancelled.
    pub fn push(&self, task: PreloadTask) {
        if self.is_cancelled() {
            trace!(queue = self.name, "Dropping task pushed after cancel");
            return;
        }
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.task_tx.send(task);
    }

    /// Wrap a future-producing closure as a task and append it.
    pub fn push_fn<F, Fut>(&self, make: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.push(Box::new(move || Box::pin(make())));
    }

    /// Start consuming tasks head to tail on a spawned runner.
    ///
    /// Must be called from within a tokio runtime. Calling it while a runner
    /// is active, or after `cancel`, does nothing.
    pub fn execute(&mut self) {
        if self.is_cancelled() {
            return;
        }
        if self.runner.as_ref().is_some_and(|r| !r.is_finished()) {
            return;
        }

        debug!(queue = self.name, tasks = self.task_rx.len(), "Starting preload");
        self.runner = Some(tokio::spawn(run_tasks(
            self.name,
            self.concurrency,
            self.task_rx.clone(),
            Arc::clone(&self.cancelled),
            Arc::clone(&self.started),
            Arc::clone(&self.finished),
        )));
    }

    /// Drop every task that has not started and abort those that have.
    pub fn cancel(&mut self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        let dropped = self.task_rx.drain().count();
        if let Some(runner) = self.runner.take() {
            runner.abort();
        }
        debug!(queue = self.name, dropped, "Cancelled preload");
    }

    /// Wait until the runner has consumed every task.
    pub async fn wait_idle(&mut self) {
        if let Some(runner) = self.runner.take() {
            let _ = runner.await;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Tasks not yet started.
    pub fn pending_count(&self) -> usize {
        self.task_rx.len()
    }

    pub fn started_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Drop for PreloadQueue {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_tasks(
    name: &'static str,
    concurrency: usize,
    tasks: Receiver<PreloadTask>,
    cancelled: Arc<AtomicBool>,
    started: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
) {
    let mut running = JoinSet::new();

    loop {
        while running.len() < concurrency && !cancelled.load(Ordering::SeqCst) {
            let Ok(task) = tasks.try_recv() else {
                break;
            };
            started.fetch_add(1, Ordering::SeqCst);
            running.spawn(task());
        }

        if running.join_next().await.is_none() {
            break;
        }
        finished.fetch_add(1, Ordering::SeqCst);
    }

    trace!(queue = name, "Preload runner idle");
}
