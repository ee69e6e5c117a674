//! The Created → Running → Stopping → Stopped state machine that owns the
//! receiver and decode worker tasks and their shared cancellation token.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::CollectorSettings;
use crate::decode::DecodeWorker;
use crate::error::CollectorError;
use crate::event::Dispatcher;
use crate::memory::BufferPool;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::receiver::{Receiver, DEFAULT_CONCURRENCY};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    Stopping,
    Stopped,
}

struct RunningTasks {
    receiver: JoinHandle<Result<(), CollectorError>>,
    worker: JoinHandle<()>,
}

struct Inner {
    state: LifecycleState,
    tasks: Option<RunningTasks>,
}

/// Orchestrates one run of the ingestion pipeline. Not restartable once
/// stopped — a fresh `Lifecycle` models a fresh run, matching the
/// bind-once-per-process shape of the raw socket it owns.
pub struct Lifecycle {
    settings: CollectorSettings,
    dispatcher: Dispatcher,
    metrics: Arc<Metrics>,
    token: CancellationToken,
    channel_capacity: usize,
    concurrency: usize,
    inner: Mutex<Inner>,
}

impl Lifecycle {
    pub fn new(settings: CollectorSettings, dispatcher: Dispatcher) -> Self {
        Lifecycle {
            settings,
            dispatcher,
            metrics: Arc::new(Metrics::new()),
            token: CancellationToken::new(),
            channel_capacity: 256,
            concurrency: DEFAULT_CONCURRENCY,
            inner: Mutex::new(Inner {
                state: LifecycleState::Created,
                tasks: None,
            }),
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.lock().await.state
    }

    /// Binds the socket, allocates the buffer pool, and spawns the receiver
    /// and decode worker tasks. A second `start()` while already `Running` is
    /// a no-op (logged as a warning); per §4.9, starting is not idempotent
    /// state re-entry, it is a guard against duplicate task sets.
    pub async fn start(&self) -> Result<(), CollectorError> {
        let mut guard = self.inner.lock().await;
        match guard.state {
            LifecycleState::Running => {
                warn!("start() called while already Running; ignoring");
                return Ok(());
            }
            LifecycleState::Stopping | LifecycleState::Stopped => {
                warn!("start() called on a {:?} lifecycle; ignoring", guard.state);
                return Ok(());
            }
            LifecycleState::Created => {}
        }

        let pool = BufferPool::with_defaults(self.channel_capacity + self.concurrency);
        let (sender, receiver) = mpsc::channel(self.channel_capacity);

        let recv_task = Receiver::new(self.settings.clone(), pool, self.metrics.clone())
            .with_concurrency(self.concurrency);
        let recv_token = self.token.clone();
        let receiver_handle = tokio::spawn(recv_task.run(sender, recv_token));

        let worker = DecodeWorker::new(
            self.settings.clone(),
            self.metrics.clone(),
            self.dispatcher.clone(),
        );
        let worker_token = self.token.clone();
        let worker_handle = tokio::spawn(worker.run(receiver, worker_token));

        self.metrics.mark_started();
        guard.state = LifecycleState::Running;
        guard.tasks = Some(RunningTasks {
            receiver: receiver_handle,
            worker: worker_handle,
        });
        info!("lifecycle transitioned Created -> Running");
        Ok(())
    }

    /// Signals cancellation and waits for both tasks to exit. A `stop()` from
    /// `Created` is a no-op; a `stop()` while already `Stopping`/`Stopped` is
    /// idempotent.
    pub async fn stop(&self) -> MetricsSnapshot {
        let tasks = {
            let mut guard = self.inner.lock().await;
            match guard.state {
                LifecycleState::Created => {
                    return self.metrics.snapshot();
                }
                LifecycleState::Stopping | LifecycleState::Stopped => {
                    return self.metrics.snapshot();
                }
                LifecycleState::Running => {}
            }
            guard.state = LifecycleState::Stopping;
            guard.tasks.take()
        };

        self.token.cancel();
        info!("lifecycle transitioned Running -> Stopping");

        if let Some(tasks) = tasks {
            if let Err(err) = tasks.receiver.await {
                warn!("receiver task panicked: {err}");
            }
            if let Err(err) = tasks.worker.await {
                warn!("decode worker task panicked: {err}");
            }
        }

        let mut guard = self.inner.lock().await;
        guard.state = LifecycleState::Stopped;
        drop(guard);
        info!("lifecycle transitioned Stopping -> Stopped");

        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_from_created_is_a_no_op() {
        let lifecycle = Lifecycle::new(CollectorSettings::default(), Dispatcher::new());
        assert_eq!(lifecycle.state().await, LifecycleState::Created);
        lifecycle.stop().await;
        assert_eq!(lifecycle.state().await, LifecycleState::Created);
    }
}
