use std::fmt;

use super::capture::LinkLayer;

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const SLL_HEADER_LEN: usize = 16;
const NULL_HEADER_LEN: usize = 4;
const IPV4_MIN_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88a8;
const AF_INET: u32 = 2;
const IPPROTO_UDP: u8 = 17;

/// Why a frame produced no UDP payload. Normal traffic mixture, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedLink,
    NotIpv4,
    WrongIpVersion(u8),
    NotUdp,
    /// Non-first fragment, no UDP header present
    Fragment,
    /// A layer header runs past the captured bytes
    Truncated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedLink => write!(f, "unsupported link layer"),
            SkipReason::NotIpv4 => write!(f, "not IPv4"),
            SkipReason::WrongIpVersion(v) => write!(f, "IP version {v} in IPv4 frame"),
            SkipReason::NotUdp => write!(f, "not UDP"),
            SkipReason::Fragment => write!(f, "non-first fragment"),
            SkipReason::Truncated => write!(f, "truncated headers"),
        }
    }
}

/// UDP payload carried by an IPv4 (version 4) packet.
///
/// Only [`udp_payload`] builds one, so holding a `UdpPayload` means the
/// enclosing network layer was checked.
#[derive(Debug, Clone, Copy)]
pub struct UdpPayload<'a> {
    bytes: &'a [u8],
}

impl<'a> UdpPayload<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Project a captured frame down to its UDP payload, if it is IPv4/UDP
pub fn udp_payload(link: LinkLayer, frame: &[u8]) -> Result<UdpPayload<'_>, SkipReason> {
    let ip = network_layer(link, frame)?;
    let datagram = ipv4_udp_datagram(ip)?;
    udp_data(datagram).map(|bytes| UdpPayload { bytes })
}

fn be16(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

/// Strip link framing, returning the IPv4 packet bytes
fn network_layer(link: LinkLayer, frame: &[u8]) -> Result<&[u8], SkipReason> {
    match link {
        LinkLayer::Ethernet => {
            let mut type_at = ETHERNET_HEADER_LEN - 2;
            loop {
                let ethertype = be16(frame, type_at).ok_or(SkipReason::Truncated)?;
                match ethertype {
                    ETHERTYPE_VLAN | ETHERTYPE_QINQ => type_at += VLAN_TAG_LEN,
                    ETHERTYPE_IPV4 => return Ok(&frame[type_at + 2..]),
                    _ => return Err(SkipReason::NotIpv4),
                }
            }
        }
        LinkLayer::LinuxSll => {
            let protocol = be16(frame, SLL_HEADER_LEN - 2).ok_or(SkipReason::Truncated)?;
            if protocol != ETHERTYPE_IPV4 {
                return Err(SkipReason::NotIpv4);
            }
            Ok(&frame[SLL_HEADER_LEN..])
        }
        LinkLayer::Null => {
            let family = frame.get(..NULL_HEADER_LEN).ok_or(SkipReason::Truncated)?;
            let family = [family[0], family[1], family[2], family[3]];
            // Written in the capturing host's byte order
            if u32::from_le_bytes(family) != AF_INET && u32::from_be_bytes(family) != AF_INET {
                return Err(SkipReason::NotIpv4);
            }
            Ok(&frame[NULL_HEADER_LEN..])
        }
        LinkLayer::RawIp => match frame.first() {
            Some(&b) if b >> 4 == 4 => Ok(frame),
            Some(_) => Err(SkipReason::NotIpv4),
            None => Err(SkipReason::Truncated),
        },
        LinkLayer::Unsupported(_) => Err(SkipReason::UnsupportedLink),
    }
}

/// Validate the IPv4 header and return the UDP datagram it carries
fn ipv4_udp_datagram(ip: &[u8]) -> Result<&[u8], SkipReason> {
    if ip.len() < IPV4_MIN_HEADER_LEN {
        return Err(SkipReason::Truncated);
    }
    let version = ip[0] >> 4;
    if version != 4 {
        return Err(SkipReason::WrongIpVersion(version));
    }
    let header_len = (ip[0] & 0x0f) as usize * 4;
    if header_len < IPV4_MIN_HEADER_LEN || header_len > ip.len() {
        return Err(SkipReason::Truncated);
    }
    if ip[9] != IPPROTO_UDP {
        return Err(SkipReason::NotUdp);
    }
    let fragment_offset = u16::from_be_bytes([ip[6] & 0x1f, ip[7]]);
    if fragment_offset != 0 {
        return Err(SkipReason::Fragment);
    }

    // Ethernet pads short frames; total length marks the real end
    let total_len = u16::from_be_bytes([ip[2], ip[3]]) as usize;
    let end = if total_len >= header_len && total_len <= ip.len() {
        total_len
    } else {
        ip.len()
    };
    Ok(&ip[header_len..end])
}

fn udp_data(datagram: &[u8]) -> Result<&[u8], SkipReason> {
    if datagram.len() < UDP_HEADER_LEN {
        return Err(SkipReason::Truncated);
    }
    let udp_len = u16::from_be_bytes([datagram[4], datagram[5]]) as usize;
    // Zero means jumbogram: the datagram runs to the end of the IP payload
    if udp_len != 0 && udp_len < UDP_HEADER_LEN {
        return Err(SkipReason::Truncated);
    }
    let end = if udp_len >= UDP_HEADER_LEN && udp_len <= datagram.len() {
        udp_len
    } else {
        datagram.len()
    };
    Ok(&datagram[UDP_HEADER_LEN..end])
}
