//! Pooled buffers leased to receive operations and returned after decode.
//!
//! Structurally this plays the role `memory::mempool`/`memory::mbuf` play in a
//! DPDK-backed pipeline (a pool hands out fixed-size buffers; a leased buffer is
//! returned exactly once), but the backing store here is plain heap memory rather
//! than pinned hugepage-backed mbufs, so leasing and release are expressed with
//! safe `Mutex`/`Notify` synchronization instead of FFI ownership transfer.

mod pool;

pub use pool::{BufferPool, LeasedBuffer};

/// Maximum IPv4 datagram size; the default buffer size leased by the pool.
pub const DEFAULT_BUFFER_SIZE: usize = 65_535;
