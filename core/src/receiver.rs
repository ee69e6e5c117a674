//! Owns the raw IP socket and drives the fixed set of concurrent receive
//! operations that feed the decode worker's channel.
//!
//! The teacher pipeline this is adapted from drives reception with a
//! DPDK poll-mode `rx_loop`/`rx_burst` busy loop pinned to a dedicated core
//! (see its `lcore::rx_core::RxCore`). A raw IP socket has no poll-mode
//! equivalent and no hugepage-backed ring to poll — reception here is
//! readiness-driven instead: each receive task blocks on `AsyncFd::readable`
//! until the kernel has a datagram, exactly the suspension point the
//! concurrency model in this pipeline requires.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::CollectorSettings;
use crate::error::CollectorError;
use crate::memory::{BufferPool, LeasedBuffer};
use crate::metrics::Metrics;

/// A single received datagram: the leased buffer it was read into (returned
/// to the pool once dropped) and the instant it was received.
pub struct ReceivedFrame {
    pub buffer: LeasedBuffer,
    pub received_at: DateTime<Utc>,
}

/// Default number of concurrent in-flight receive operations.
pub const DEFAULT_CONCURRENCY: usize = 10;

pub struct Receiver {
    settings: CollectorSettings,
    pool: BufferPool,
    metrics: Arc<Metrics>,
    concurrency: usize,
}

impl Receiver {
    pub fn new(settings: CollectorSettings, pool: BufferPool, metrics: Arc<Metrics>) -> Self {
        Receiver {
            settings,
            pool,
            metrics,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Bind the raw socket and run `concurrency` receive tasks until
    /// `token` is cancelled, forwarding every datagram through `sender`.
    pub async fn run(
        self,
        sender: mpsc::Sender<ReceivedFrame>,
        token: CancellationToken,
    ) -> Result<(), CollectorError> {
        let socket = bind_raw_socket(&self.settings).map_err(CollectorError::BindFailure)?;
        let async_fd = Arc::new(AsyncFd::new(socket).map_err(CollectorError::BindFailure)?);

        info!(
            "raw receiver bound to {} with {} concurrent receive tasks",
            self.settings.bind_address(),
            self.concurrency
        );

        let mut tasks = JoinSet::new();
        for id in 0..self.concurrency {
            let async_fd = async_fd.clone();
            let pool = self.pool.clone();
            let sender = sender.clone();
            let token = token.clone();
            let metrics = self.metrics.clone();
            tasks.spawn(async move {
                receive_loop(id, async_fd, pool, sender, token, metrics).await;
            });
        }
        drop(sender);

        while tasks.join_next().await.is_some() {}
        Ok(())
    }
}

fn bind_raw_socket(settings: &CollectorSettings) -> Result<Socket, std::io::Error> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::UDP))?;
    socket.set_nonblocking(true)?;
    let addr: SocketAddr = (settings.bind_address(), 0).into();
    socket.bind(&SockAddr::from(addr))?;
    Ok(socket)
}

async fn receive_loop(
    id: usize,
    async_fd: Arc<AsyncFd<Socket>>,
    pool: BufferPool,
    sender: mpsc::Sender<ReceivedFrame>,
    token: CancellationToken,
    metrics: Arc<Metrics>,
) {
    loop {
        let mut buffer = pool.lease().await;

        let received = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            result = recv_into(&async_fd, buffer.as_mut_slice()) => result,
        };

        let len = match received {
            Ok(len) => len,
            Err(err) => {
                warn!("receive task {id} failed, retrying: {err}");
                continue;
            }
        };

        buffer.set_len(len);
        let received_at = Utc::now();
        metrics.record_datagram(len);

        let frame = ReceivedFrame { buffer, received_at };
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            result = sender.send(frame) => {
                if result.is_err() {
                    debug!("receive task {id} exiting: decode channel closed");
                    return;
                }
            }
        }
    }
}

async fn recv_into(async_fd: &AsyncFd<Socket>, buf: &mut [u8]) -> std::io::Result<usize> {
    // `Socket::recv` wants `&mut [MaybeUninit<u8>]`; the pool's buffers are
    // always fully allocated (zero-initialized on first allocation), so
    // reinterpreting them this way never exposes uninitialized memory.
    let uninit: &mut [std::mem::MaybeUninit<u8>] =
        unsafe { &mut *(buf as *mut [u8] as *mut [std::mem::MaybeUninit<u8>]) };
    loop {
        let mut guard = async_fd.readable().await?;
        match guard.try_io(|inner| inner.get_ref().recv(uninit)) {
            Ok(result) => return result,
            Err(_would_block) => continue,
        }
    }
}
