//! Consumes received frames in FIFO order, chains the IP → UDP → syslog
//! parsers, filters by configured bind address/port, and dispatches decoded
//! events to registered sinks.
//!
//! A single worker task (not one per core, unlike the teacher's per-lcore
//! dispatch) preserves the ordering guarantee this pipeline makes to sinks:
//! concurrent receive tasks may complete in any order, but once a frame
//! reaches this worker's channel, delivery to sinks happens in the order the
//! channel yielded it.

use std::net::IpAddr;

use log::debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::{DecodedMessage, Dispatcher};
use crate::metrics::Metrics;
use crate::protocols::packet::ip::{self, IpPacketKind};
use crate::protocols::packet::udp::{self, UDP_PROTOCOL};
use crate::receiver::ReceivedFrame;
use crate::syslog;
use crate::CollectorSettings;

pub struct DecodeWorker {
    settings: CollectorSettings,
    metrics: std::sync::Arc<Metrics>,
    dispatcher: Dispatcher,
}

impl DecodeWorker {
    pub fn new(
        settings: CollectorSettings,
        metrics: std::sync::Arc<Metrics>,
        dispatcher: Dispatcher,
    ) -> Self {
        DecodeWorker {
            settings,
            metrics,
            dispatcher,
        }
    }

    /// Drain `receiver` until cancelled, then drain whatever is already
    /// buffered in the channel before returning — cancellation stops new
    /// work from arriving, it does not discard work already accepted.
    pub async fn run(self, mut receiver: mpsc::Receiver<ReceivedFrame>, token: CancellationToken) {
        loop {
            let frame = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                frame = receiver.recv() => match frame {
                    Some(frame) => frame,
                    None => return,
                },
            };
            self.process(frame).await;
        }

        receiver.close();
        while let Some(frame) = receiver.recv().await {
            self.process(frame).await;
        }
    }

    async fn process(&self, frame: ReceivedFrame) {
        let data = frame.buffer.filled();

        let packet = match ip::parse(data, frame.received_at) {
            Ok(packet) => packet,
            Err(err) => {
                debug!("dropping datagram: IP parse failed: {err}");
                self.metrics.record_ip_parse_error();
                return;
            }
        };

        if requires_opaque_handling(&packet.kind) {
            debug!("dropping datagram: fragmented or has IPv6 extension headers, not reassembled");
            self.metrics.record_udp_parse_error();
            return;
        }

        if packet.protocol() != UDP_PROTOCOL {
            return;
        }

        let (udp_header, udp_payload) = match udp::parse(packet.payload()) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!("dropping datagram: UDP parse failed: {err}");
                self.metrics.record_udp_parse_error();
                return;
            }
        };

        if udp_header.dst_port != self.settings.udp_port {
            return;
        }
        if !self.settings.ip_address.is_empty()
            && packet.dst_addr() != IpAddr::V4(self.settings.bind_address())
        {
            return;
        }

        let event = match syslog::parse(udp_payload, frame.received_at, packet.src_addr()) {
            Ok(event) => event,
            Err(err) => {
                debug!("dropping datagram: syslog parse failed: {err}");
                self.metrics.record_syslog_parse_error();
                return;
            }
        };

        let message = DecodedMessage {
            occurred_at: frame.received_at,
            received_at: frame.received_at,
            payload: udp_payload.to_vec(),
            event,
        };

        self.dispatcher.dispatch(&message).await;
        self.metrics.record_dispatched();
    }
}

/// Per §4.2/§4.6: a non-initial IPv4 fragment, or any non-empty IPv6
/// extension header chain, is surfaced as opaque rather than parsed further.
/// This pipeline does not reassemble fragments.
fn requires_opaque_handling(kind: &IpPacketKind<'_>) -> bool {
    match kind {
        IpPacketKind::V4 { header, .. } => header.more_fragments || header.fragment_offset > 0,
        IpPacketKind::V6 { extensions, .. } => !extensions.is_empty(),
    }
}
