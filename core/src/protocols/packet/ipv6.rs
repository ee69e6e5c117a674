use std::net::Ipv6Addr;

use crate::error::CollectorError;

pub const IPV6_HEADER_LEN: usize = 40;

pub const EXT_HOP_BY_HOP: u8 = 0;
pub const EXT_ROUTING: u8 = 43;
pub const EXT_FRAGMENT: u8 = 44;
pub const EXT_ESP: u8 = 50;
pub const EXT_AUTHENTICATION: u8 = 51;
pub const EXT_DESTINATION_OPTIONS: u8 = 60;
pub const EXT_MOBILITY: u8 = 135;
pub const EXT_NO_NEXT_HEADER: u8 = 59;

fn is_extension_type(next_header: u8) -> bool {
    matches!(
        next_header,
        EXT_HOP_BY_HOP
            | EXT_ROUTING
            | EXT_FRAGMENT
            | EXT_ESP
            | EXT_AUTHENTICATION
            | EXT_DESTINATION_OPTIONS
            | EXT_MOBILITY
    )
}

/// The fixed, non-extensible part of an IPv6 header (RFC 8200 §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ipv6Header {
    pub traffic_class: u8,
    pub flow_label: u32,
    pub payload_length: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
}

impl Ipv6Header {
    pub fn version(&self) -> u8 {
        6
    }
}

/// One entry in a walked extension header chain: its type, and its length in
/// bytes including the 2-byte type/length prefix every extension header
/// variant carries (even Fragment, whose "length" field in the wire format is
/// reserved rather than meaningful).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionHeaderEntry {
    pub header_type: u8,
    pub len: usize,
}

/// The ordered chain of extension headers between the fixed IPv6 header and
/// the transport payload, plus the protocol the chain terminates in.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ExtensionHeaderChain {
    pub entries: Vec<ExtensionHeaderEntry>,
    pub terminal_protocol: u8,
    /// `true` if the chain was cut short because the next extension header
    /// would run past the input (the remainder is surfaced as opaque, never
    /// reassembled, per this pipeline's non-goals).
    pub truncated: bool,
}

impl ExtensionHeaderChain {
    pub fn total_len(&self) -> usize {
        self.entries.iter().map(|e| e.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, header_type: u8) -> bool {
        self.entries.iter().any(|e| e.header_type == header_type)
    }

    pub fn has_fragment(&self) -> bool {
        self.contains(EXT_FRAGMENT)
    }
}

fn extension_header_len(header_type: u8, hdr_ext_len: u8) -> usize {
    match header_type {
        EXT_FRAGMENT => 8,
        EXT_AUTHENTICATION => (hdr_ext_len as usize + 2) * 4,
        _ => (hdr_ext_len as usize + 1) * 8,
    }
}

/// Parse the fixed IPv6 header and walk its extension header chain, returning
/// the header, the chain, and the payload slice that follows it.
pub fn parse(data: &[u8]) -> Result<(Ipv6Header, ExtensionHeaderChain, &[u8]), CollectorError> {
    if data.len() < IPV6_HEADER_LEN {
        return Err(CollectorError::TruncatedPayload {
            expected: IPV6_HEADER_LEN,
            actual: data.len(),
        });
    }
    let version = data[0] >> 4;
    if version != 6 {
        return Err(CollectorError::UnsupportedVersion(version));
    }

    let traffic_class = ((data[0] & 0x0F) << 4) | (data[1] >> 4);
    let flow_label = (((data[1] & 0x0F) as u32) << 16) | ((data[2] as u32) << 8) | data[3] as u32;
    let payload_length = u16::from_be_bytes([data[4], data[5]]);
    let next_header = data[6];
    let hop_limit = data[7];
    let src_addr = Ipv6Addr::from(<[u8; 16]>::try_from(&data[8..24]).unwrap());
    let dst_addr = Ipv6Addr::from(<[u8; 16]>::try_from(&data[24..40]).unwrap());

    let header = Ipv6Header {
        traffic_class,
        flow_label,
        payload_length,
        next_header,
        hop_limit,
        src_addr,
        dst_addr,
    };

    let mut chain = ExtensionHeaderChain::default();
    let mut cursor = IPV6_HEADER_LEN;
    let mut current_type = next_header;

    loop {
        if current_type == EXT_NO_NEXT_HEADER {
            chain.terminal_protocol = EXT_NO_NEXT_HEADER;
            break;
        }
        if !is_extension_type(current_type) {
            chain.terminal_protocol = current_type;
            break;
        }
        if cursor + 2 > data.len() {
            chain.truncated = true;
            chain.terminal_protocol = current_type;
            break;
        }
        let next_type = data[cursor];
        let hdr_ext_len = data[cursor + 1];
        let ext_len = extension_header_len(current_type, hdr_ext_len);
        if cursor + ext_len > data.len() {
            chain.truncated = true;
            chain.terminal_protocol = current_type;
            break;
        }
        chain.entries.push(ExtensionHeaderEntry {
            header_type: current_type,
            len: ext_len,
        });
        cursor += ext_len;
        current_type = next_type;
    }

    let payload_start = cursor;
    let declared_end = (IPV6_HEADER_LEN + payload_length as usize).clamp(payload_start, data.len());
    let payload = &data[payload_start..declared_end];
    Ok((header, chain, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(next_header: u8, payload_len: u16) -> Vec<u8> {
        let mut buf = vec![0x60, 0x00, 0x00, 0x00];
        buf.extend_from_slice(&payload_len.to_be_bytes());
        buf.push(next_header);
        buf.push(64); // hop limit
        buf.extend_from_slice(&[0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        buf.extend_from_slice(&[0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);
        buf
    }

    #[test]
    fn parses_header_with_no_extensions() {
        let mut datagram = sample_header(17, 4);
        datagram.extend_from_slice(b"UDP!");
        let (header, chain, payload) = parse(&datagram).unwrap();
        assert_eq!(header.next_header, 17);
        assert!(chain.is_empty());
        assert_eq!(chain.terminal_protocol, 17);
        assert_eq!(payload, b"UDP!");
    }

    #[test]
    fn walks_hop_by_hop_then_udp() {
        let mut datagram = sample_header(EXT_HOP_BY_HOP, 8);
        // hop-by-hop: next=UDP(17), hdr_ext_len=0 -> 8 bytes total
        datagram.extend_from_slice(&[17, 0, 0, 0, 0, 0, 0, 0]);
        datagram.extend_from_slice(b"payload!");
        let (_, chain, payload) = parse(&datagram).unwrap();
        assert_eq!(chain.entries.len(), 1);
        assert_eq!(chain.entries[0].header_type, EXT_HOP_BY_HOP);
        assert_eq!(chain.entries[0].len, 8);
        assert_eq!(chain.terminal_protocol, 17);
        assert_eq!(payload, b"payload!");
    }

    #[test]
    fn fragment_header_is_fixed_eight_bytes() {
        let mut datagram = sample_header(EXT_FRAGMENT, 8);
        datagram.extend_from_slice(&[17, 0, 0, 0, 0, 0, 0, 1]);
        datagram.extend_from_slice(b"<0>frag!");
        let (_, chain, _) = parse(&datagram).unwrap();
        assert!(chain.has_fragment());
        assert_eq!(chain.entries[0].len, 8);
    }

    #[test]
    fn authentication_header_uses_four_byte_words() {
        // hdr_ext_len = 1 -> (1 + 2) * 4 = 12 bytes
        let mut datagram = sample_header(EXT_AUTHENTICATION, 12);
        datagram.extend_from_slice(&[17, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        datagram.extend_from_slice(b"hi");
        let (_, chain, payload) = parse(&datagram).unwrap();
        assert_eq!(chain.entries[0].len, 12);
        assert_eq!(payload, b"hi");
    }

    #[test]
    fn truncated_extension_chain_is_reported() {
        let mut datagram = sample_header(EXT_HOP_BY_HOP, 1);
        datagram.push(17); // only one byte of what should be an 8-byte extension header
        let (_, chain, _) = parse(&datagram).unwrap();
        assert!(chain.truncated);
    }
}
