use std::fmt::Write as _;

use crate::error::DecodeError;
use crate::input::UdpPayload;

/// Frame layout, fixed by the sender. Byte offsets are relative to the UDP payload start.
pub mod layout {
    pub const PACKET_HEADER_LEN: usize = 8;
    /// Precedes every block of units
    pub const SUB_HEADER_LEN: usize = 8;
    pub const UNIT_LEN: usize = 8;
    /// The IQ pair sits in the last four bytes of each unit
    pub const SAMPLE_OFFSET: usize = 4;
    pub const UNITS_PER_BLOCK: usize = 63;
    pub const BLOCK_COUNT: usize = 2;
    pub const BLOCK_LEN: usize = SUB_HEADER_LEN + UNITS_PER_BLOCK * UNIT_LEN;
    pub const SAMPLES_PER_FRAME: usize = UNITS_PER_BLOCK * BLOCK_COUNT;
    /// Shortest payload accepted as a frame. One sub-header slot past the last block.
    pub const MIN_PAYLOAD_LEN: usize = PACKET_HEADER_LEN + BLOCK_COUNT * BLOCK_LEN + SUB_HEADER_LEN;

    /// Offset of the sample bytes of every unit, in decode order
    pub fn sample_offsets() -> impl Iterator<Item = usize> {
        (0..BLOCK_COUNT).flat_map(|block| {
            let units_start = PACKET_HEADER_LEN + block * BLOCK_LEN + SUB_HEADER_LEN;
            (0..UNITS_PER_BLOCK).map(move |unit| units_start + unit * UNIT_LEN + SAMPLE_OFFSET)
        })
    }
}

/// IQ sample pair (In-phase, Quadrature)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IqSample {
    pub i: i32,
    pub q: i32,
}

impl IqSample {
    pub fn new(i: i32, q: i32) -> Self {
        Self { i, q }
    }
}

/// Everything one payload produced: the samples and their log lines
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFrame {
    pub samples: Vec<IqSample>,
    pub log: String,
}

/// Offset-binary byte (bias 128) to signed
fn unbias(b: u8) -> i8 {
    b.wrapping_sub(128) as i8
}

/// Rebuild one 16-bit component from its offset-binary high and low bytes
pub fn decode_value(high: u8, low: u8) -> i32 {
    unbias(low) as i32 + 256 * unbias(high) as i32
}

/// Decode the sample bytes at `at` as (I, Q).
/// I comes from bytes 0-1, Q from bytes 2-3, high byte first.
fn decode_pair(payload: &[u8], at: usize) -> Result<IqSample, DecodeError> {
    let bytes = payload
        .get(at..at + 4)
        .ok_or(DecodeError::OutOfBounds {
            needed: at + 4,
            len: payload.len(),
        })?;
    Ok(IqSample::new(
        decode_value(bytes[0], bytes[1]),
        decode_value(bytes[2], bytes[3]),
    ))
}

/// Decode a whole frame. Either every sample decodes or none is returned.
pub fn decode_frame(payload: &UdpPayload<'_>) -> Result<DecodedFrame, DecodeError> {
    let bytes = payload.bytes();
    if bytes.len() < layout::MIN_PAYLOAD_LEN {
        return Err(DecodeError::OutOfBounds {
            needed: layout::MIN_PAYLOAD_LEN,
            len: bytes.len(),
        });
    }

    let samples = layout::sample_offsets()
        .map(|at| decode_pair(bytes, at))
        .collect::<Result<Vec<_>, _>>()?;

    let mut log = String::with_capacity(layout::SAMPLES_PER_FRAME * 20);
    for s in &samples {
        // Writing to a String cannot fail
        let _ = writeln!(log, "{:.6},{:.6}", s.i as f64, s.q as f64);
    }

    Ok(DecodedFrame { samples, log })
}

#[cfg(test)]
mod tests {
    use super::layout::*;
    use super::*;
    use crate::input::layers::tests::ipv4_udp_packet;
    use crate::input::{udp_payload, LinkLayer};

    /// Wrap `payload` in IPv4/UDP and run it through the decoder
    fn decode_bytes(payload: &[u8]) -> Result<DecodedFrame, DecodeError> {
        let packet = ipv4_udp_packet(payload);
        let udp = udp_payload(LinkLayer::RawIp, &packet).unwrap();
        decode_frame(&udp)
    }

    /// Payload whose every sample byte decodes to zero
    fn zero_frame() -> Vec<u8> {
        let mut payload = vec![0u8; MIN_PAYLOAD_LEN];
        for at in sample_offsets() {
            payload[at..at + 4].fill(128);
        }
        payload
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(BLOCK_LEN, 512);
        assert_eq!(SAMPLES_PER_FRAME, 126);
        assert_eq!(MIN_PAYLOAD_LEN, 1040);
    }

    #[test]
    fn test_sample_offsets() {
        let offsets: Vec<usize> = sample_offsets().collect();
        assert_eq!(offsets.len(), SAMPLES_PER_FRAME);
        assert_eq!(offsets[0], 20);
        assert_eq!(offsets[1], 28);
        assert_eq!(offsets[62], 516);
        // second block skips one more sub-header
        assert_eq!(offsets[63], 532);
        assert_eq!(offsets[125], 1028);
        assert!(offsets.iter().all(|&at| at + 4 <= MIN_PAYLOAD_LEN));
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_decode_value_fixtures() {
        assert_eq!(decode_value(128, 128), 0);
        assert_eq!(decode_value(129, 128), 256);
        assert_eq!(decode_value(128, 129), 1);
        assert_eq!(decode_value(128, 127), -1);
        assert_eq!(decode_value(127, 128), -256);
        assert_eq!(decode_value(255, 255), 127 + 256 * 127);
        assert_eq!(decode_value(0, 0), -128 - 256 * 128);
        assert_eq!(decode_value(0x80, 0xff), 127);
    }

    #[test]
    fn test_short_payload_is_out_of_bounds() {
        for len in [0, 16, 20, 1031, 1032, MIN_PAYLOAD_LEN - 1] {
            let err = decode_bytes(&vec![128u8; len]).unwrap_err();
            assert_eq!(
                err,
                DecodeError::OutOfBounds {
                    needed: MIN_PAYLOAD_LEN,
                    len
                }
            );
        }
    }

    #[test]
    fn test_decode_pair_bounds() {
        let err = decode_pair(&[128u8; 10], 8).unwrap_err();
        assert_eq!(err, DecodeError::OutOfBounds { needed: 12, len: 10 });
        assert_eq!(decode_pair(&[128u8; 12], 8).unwrap(), IqSample::new(0, 0));
    }

    #[test]
    fn test_full_frame_yields_126_pairs() {
        for fill in [0u8, 128, 255] {
            for extra in [0, 1, 400] {
                let frame = decode_bytes(&vec![fill; MIN_PAYLOAD_LEN + extra]).unwrap();
                assert_eq!(frame.samples.len(), SAMPLES_PER_FRAME);
                assert_eq!(frame.log.lines().count(), SAMPLES_PER_FRAME);
            }
        }
    }

    #[test]
    fn test_zero_frame_log() {
        let frame = decode_bytes(&zero_frame()).unwrap();
        assert!(frame.samples.iter().all(|s| *s == IqSample::new(0, 0)));
        assert!(frame.log.lines().all(|l| l == "0.000000,0.000000"));
        assert!(frame.log.ends_with('\n'));
    }

    #[test]
    fn test_channel_mapping_and_order() {
        let mut payload = zero_frame();
        // first unit of block 1: I = 0x81,0x80  Q = 0x80,0x81
        payload[20..24].copy_from_slice(&[0x81, 0x80, 0x80, 0x81]);
        // first unit of block 2
        payload[532..536].copy_from_slice(&[0x80, 0x7f, 0x7f, 0x80]);
        // header and sub-header bytes are never read
        payload[..20].fill(0xaa);
        payload[524..532].fill(0x55);

        let frame = decode_bytes(&payload).unwrap();
        assert_eq!(frame.samples[0], IqSample::new(256, 1));
        assert_eq!(frame.samples[1], IqSample::new(0, 0));
        assert_eq!(frame.samples[63], IqSample::new(-1, -256));

        let lines: Vec<&str> = frame.log.lines().collect();
        assert_eq!(lines[0], "256.000000,1.000000");
        assert_eq!(lines[63], "-1.000000,-256.000000");
    }

    #[test]
    fn test_decode_is_deterministic() {
        let payload: Vec<u8> = (0..MIN_PAYLOAD_LEN).map(|i| (i * 31 % 251) as u8).collect();
        assert_eq!(decode_bytes(&payload), decode_bytes(&payload));
    }
}
