use chrono::{DateTime, Utc};

use crate::error::CollectorError;

use super::ipv4::{self, Ipv4Header};
use super::ipv6::{self, ExtensionHeaderChain, Ipv6Header};

/// The version-specific parts of a parsed IP datagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IpPacketKind<'a> {
    V4 {
        header: Ipv4Header,
        payload: &'a [u8],
    },
    V6 {
        header: Ipv6Header,
        extensions: ExtensionHeaderChain,
        payload: &'a [u8],
    },
}

/// A parsed IP datagram tagged by version, with its reception timestamp.
///
/// Modeled as a tagged variant rather than a trait object: the two shapes
/// share only `received_at` and a derived `protocol`, and callers almost
/// always need to branch on version anyway to reach extension-chain or
/// options data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IpPacket<'a> {
    pub received_at: DateTime<Utc>,
    pub kind: IpPacketKind<'a>,
}

impl<'a> IpPacket<'a> {
    /// The transport protocol this datagram ultimately carries: the IPv4
    /// header's protocol field, or the IPv6 extension chain's terminal
    /// protocol.
    pub fn protocol(&self) -> u8 {
        match &self.kind {
            IpPacketKind::V4 { header, .. } => header.protocol,
            IpPacketKind::V6 { extensions, .. } => extensions.terminal_protocol,
        }
    }

    pub fn payload(&self) -> &'a [u8] {
        match &self.kind {
            IpPacketKind::V4 { payload, .. } => payload,
            IpPacketKind::V6 { payload, .. } => payload,
        }
    }

    pub fn src_addr(&self) -> std::net::IpAddr {
        match &self.kind {
            IpPacketKind::V4 { header, .. } => std::net::IpAddr::V4(header.src_addr),
            IpPacketKind::V6 { header, .. } => std::net::IpAddr::V6(header.src_addr),
        }
    }

    pub fn dst_addr(&self) -> std::net::IpAddr {
        match &self.kind {
            IpPacketKind::V4 { header, .. } => std::net::IpAddr::V4(header.dst_addr),
            IpPacketKind::V6 { header, .. } => std::net::IpAddr::V6(header.dst_addr),
        }
    }
}

/// Dispatch on the version nibble in `data[0]` and parse the matching header.
pub fn parse(data: &[u8], received_at: DateTime<Utc>) -> Result<IpPacket<'_>, CollectorError> {
    if data.is_empty() {
        return Err(CollectorError::MalformedHeader("empty datagram"));
    }
    match data[0] >> 4 {
        4 => {
            let (header, payload) = ipv4::parse(data)?;
            Ok(IpPacket {
                received_at,
                kind: IpPacketKind::V4 { header, payload },
            })
        }
        6 => {
            let (header, extensions, payload) = ipv6::parse(data)?;
            Ok(IpPacket {
                received_at,
                kind: IpPacketKind::V6 {
                    header,
                    extensions,
                    payload,
                },
            })
        }
        other => Err(CollectorError::UnsupportedVersion(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_version() {
        let data = [0x55u8; 20];
        assert!(matches!(
            parse(&data, Utc::now()),
            Err(CollectorError::UnsupportedVersion(5))
        ));
    }
}
