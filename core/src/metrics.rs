//! Pipeline counters, updated with atomic increments from concurrent tasks.
//!
//! Shaped after `SubscriptionStats`: a handful of `AtomicU64` counters plus a
//! snapshot taken at shutdown, rather than a histogram or time-series store —
//! this pipeline counts, it does not profile.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Default)]
pub struct Metrics {
    datagrams_received: AtomicU64,
    bytes_received: AtomicU64,
    parse_errors_ip: AtomicU64,
    parse_errors_udp: AtomicU64,
    parse_errors_syslog: AtomicU64,
    dispatched: AtomicU64,
    started_at: once_cell_instant::OnceInstant,
}

/// A minimal lazily-set `Instant`, avoiding a dependency on `once_cell` for a
/// single field. Set once, at pipeline start; read many times thereafter.
mod once_cell_instant {
    use std::sync::OnceLock;
    use std::time::Instant;

    #[derive(Default)]
    pub struct OnceInstant(OnceLock<Instant>);

    impl OnceInstant {
        pub fn set_now(&self) {
            let _ = self.0.set(Instant::now());
        }

        pub fn elapsed(&self) -> std::time::Duration {
            self.0.get().map(Instant::elapsed).unwrap_or_default()
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn mark_started(&self) {
        self.started_at.set_now();
    }

    pub fn record_datagram(&self, bytes: usize) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_ip_parse_error(&self) {
        self.parse_errors_ip.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_udp_parse_error(&self) {
        self.parse_errors_udp.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_syslog_parse_error(&self) {
        self.parse_errors_syslog.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            parse_errors_ip: self.parse_errors_ip.load(Ordering::Relaxed),
            parse_errors_udp: self.parse_errors_udp.load(Ordering::Relaxed),
            parse_errors_syslog: self.parse_errors_syslog.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            elapsed: self.started_at.elapsed(),
        }
    }
}

/// An immutable point-in-time copy of [`Metrics`], suitable for logging or
/// returning to a caller at shutdown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub parse_errors_ip: u64,
    pub parse_errors_udp: u64,
    pub parse_errors_syslog: u64,
    pub dispatched: u64,
    pub elapsed: std::time::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counters() {
        let metrics = Metrics::new();
        metrics.mark_started();
        metrics.record_datagram(128);
        metrics.record_datagram(64);
        metrics.record_ip_parse_error();
        metrics.record_dispatched();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.datagrams_received, 2);
        assert_eq!(snapshot.bytes_received, 192);
        assert_eq!(snapshot.parse_errors_ip, 1);
        assert_eq!(snapshot.dispatched, 1);
    }
}
