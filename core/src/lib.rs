//! Packet ingestion and decoding pipeline for network-delivered syslog messages.
//!
//! A raw-socket receiver hands leased buffers to a decode worker over a bounded
//! channel; the worker walks IPv4/IPv6 headers (including the IPv6 extension
//! header chain), extracts the UDP payload, parses the syslog PRI and message
//! body, and dispatches the result to registered sinks.

pub mod config;
pub mod decode;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod memory;
pub mod metrics;
pub mod protocols;
pub mod receiver;
pub mod syslog;

pub use config::CollectorSettings;
pub use error::CollectorError;
pub use event::{DecodedMessage, Sink};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use metrics::{Metrics, MetricsSnapshot};
