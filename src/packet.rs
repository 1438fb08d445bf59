//! Counter packet wire format
//!
//! Every datagram carries a single `u64` counter in little-endian byte order,
//! matching a receiver-side `struct { uint64_t data; }`.

use byteorder::{ByteOrder, LittleEndian};

/// Size of one counter payload in bytes
pub const PAYLOAD_LEN: usize = 8;

/// Size of one counter payload in bits
pub const PAYLOAD_BITS: u64 = (PAYLOAD_LEN as u64) * 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("counter payload must be 8 bytes, got {0}")]
    WrongLength(usize),
}

/// A single counter datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterPacket {
    pub sequence: u64,
}

impl CounterPacket {
    pub fn new(sequence: u64) -> Self {
        Self { sequence }
    }

    pub fn encode(&self) -> [u8; PAYLOAD_LEN] {
        let mut buf = [0u8; PAYLOAD_LEN];
        LittleEndian::write_u64(&mut buf, self.sequence);
        buf
    }

    /// Decode a received payload. Anything other than exactly eight bytes is rejected.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() != PAYLOAD_LEN {
            return Err(PacketError::WrongLength(buf.len()));
        }
        Ok(Self::new(LittleEndian::read_u64(buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_little_endian() {
        assert_eq!(CounterPacket::new(0).encode(), [0; 8]);
        assert_eq!(CounterPacket::new(1).encode(), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            CounterPacket::new(0x0102_0304_0506_0708).encode(),
            [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(CounterPacket::new(u64::MAX).encode(), [0xFF; 8]);
    }

    #[test]
    fn test_decode_known_bytes() {
        let packet = CounterPacket::decode(&[99, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(packet.sequence, 99);

        let packet = CounterPacket::decode(&[0, 1, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(packet.sequence, 256);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(CounterPacket::decode(&[]), Err(PacketError::WrongLength(0)));
        assert_eq!(
            CounterPacket::decode(&[0; 7]),
            Err(PacketError::WrongLength(7))
        );
        assert_eq!(
            CounterPacket::decode(&[0; 9]),
            Err(PacketError::WrongLength(9))
        );
    }

    #[test]
    fn test_payload_bits() {
        assert_eq!(PAYLOAD_BITS, 64);
    }
}
