use crate::error::CollectorError;

pub const UDP_PROTOCOL: u8 = 17;
pub const UDP_HEADER_LEN: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

/// Parse a UDP header (RFC 768), returning the header and the payload slice.
pub fn parse(data: &[u8]) -> Result<(UdpHeader, &[u8]), CollectorError> {
    if data.len() < UDP_HEADER_LEN {
        return Err(CollectorError::TruncatedPayload {
            expected: UDP_HEADER_LEN,
            actual: data.len(),
        });
    }
    let header = UdpHeader {
        src_port: u16::from_be_bytes([data[0], data[1]]),
        dst_port: u16::from_be_bytes([data[2], data[3]]),
        length: u16::from_be_bytes([data[4], data[5]]),
        checksum: u16::from_be_bytes([data[6], data[7]]),
    };
    Ok((header, &data[UDP_HEADER_LEN..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_payload() {
        let mut datagram = vec![0x04, 0xd2, 0x02, 0x02, 0x00, 0x0c, 0x00, 0x00];
        datagram.extend_from_slice(b"<13>hi");
        let (header, payload) = parse(&datagram).unwrap();
        assert_eq!(header.src_port, 1234);
        assert_eq!(header.dst_port, 514);
        assert_eq!(payload, b"<13>hi");
    }

    #[test]
    fn rejects_short_input() {
        assert!(matches!(parse(&[0u8; 4]), Err(CollectorError::TruncatedPayload { .. })));
    }
}
