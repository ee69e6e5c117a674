//! Error taxonomy for the ingestion pipeline.
//!
//! Mirrors the per-crate `thiserror` enums used throughout this codebase (see
//! `protocols::packet::PacketParseError`, `memory::PoolError`): one flat enum per
//! concern, propagated with `?` and matched explicitly where recovery differs by
//! kind.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("failed to bind raw socket: {0}")]
    BindFailure(#[source] std::io::Error),

    #[error("unsupported IP version: {0}")]
    UnsupportedVersion(u8),

    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),

    #[error("truncated payload: expected at least {expected} bytes, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    #[error("syslog message has no <PRI> prefix")]
    InvalidFormat,

    #[error("syslog priority is not a valid integer")]
    InvalidPriority,

    #[error("empty syslog payload")]
    EmptyInput,

    #[error("sink emit failed: {0}")]
    SinkFault(#[source] anyhow::Error),

    #[error("operation cancelled")]
    Cancelled,
}
