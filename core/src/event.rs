//! Decoded events and the pluggable sink interface they are dispatched to.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;

use crate::syslog::SyslogEvent;

/// A fully decoded syslog message, ready for delivery to a sink.
///
/// `payload` is an owned copy of the UDP payload bytes: the leased receive
/// buffer they were parsed from is released back to the pool as soon as the
/// decode worker finishes with it, so nothing downstream may borrow from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedMessage {
    pub occurred_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub payload: Vec<u8>,
    pub event: SyslogEvent,
}

/// A destination for decoded events. Implementations are expected to be
/// non-blocking or to yield promptly; a slow or failing sink must not be able
/// to stall delivery to other sinks (see [`Dispatcher`]).
pub trait Sink: Send + Sync {
    fn emit<'a>(
        &'a self,
        message: &'a DecodedMessage,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}

/// Invokes every registered sink in registration order, suppressing and
/// logging faults so one sink's failure can never destabilize delivery to the
/// others or back-pressure the decode worker.
#[derive(Clone, Default)]
pub struct Dispatcher {
    sinks: Vec<Arc<dyn Sink>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher { sinks: Vec::new() }
    }

    pub fn register(&mut self, sink: Arc<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub async fn dispatch(&self, message: &DecodedMessage) -> usize {
        let mut delivered = 0;
        for sink in &self.sinks {
            match sink.emit(message).await {
                Ok(()) => delivered += 1,
                Err(err) => warn!("sink emit failed, continuing to remaining sinks: {err:#}"),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_message() -> DecodedMessage {
        let now = Utc::now();
        DecodedMessage {
            occurred_at: now,
            received_at: now,
            payload: b"<13>hi".to_vec(),
            event: SyslogEvent {
                received_at: now,
                source_ip: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
                severity: 5,
                facility: 1,
                message: "hi".to_string(),
                captures: Default::default(),
            },
        }
    }

    struct FaultySink;
    impl Sink for FaultySink {
        fn emit<'a>(
            &'a self,
            _message: &'a DecodedMessage,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
            Box::pin(async { Err(anyhow::anyhow!("boom")) })
        }
    }

    struct CountingSink(Arc<AtomicUsize>);
    impl Sink for CountingSink {
        fn emit<'a>(
            &'a self,
            _message: &'a DecodedMessage,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
            let counter = self.0.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn faulty_sink_does_not_block_remaining_sinks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(FaultySink));
        dispatcher.register(Arc::new(CountingSink(counter.clone())));

        let delivered = dispatcher.dispatch(&sample_message()).await;
        assert_eq!(delivered, 1);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }
}
