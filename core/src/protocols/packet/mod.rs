//! Header parsers operating on plain byte slices.
//!
//! The teacher pipeline this is adapted from parses headers by casting a
//! pinned DPDK mbuf pointer to a `#[repr(C, packed)]` struct (see its
//! `Packet`/`PacketHeader` traits). Buffers here are leased `Box<[u8]>`
//! storage, not FFI-owned memory, so there is no pointer to cast safely —
//! headers are read field-by-field with `from_be_bytes` over slices instead,
//! matching how a plain-Rust network parser reads frames it doesn't own the
//! allocation strategy for.

pub mod ip;
pub mod ipv4;
pub mod ipv6;
pub mod udp;
