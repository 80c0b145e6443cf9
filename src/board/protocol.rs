// GoPiGo3 SPI frame codec
//
// Outgoing frame: [address, message_type, payload..., 0 padding] (fixed length)
// Reply:          [x, x, x, 0xA5, data...]
//
// Byte 3 of every reply is the validity sentinel. Scalar and string data start at
// byte 4. Grove reads carry an in-band status byte at 4 and data from byte 5.

use super::error::ProtocolError;
use super::registers::{GroveState, GroveType, LONGEST_SPI_TRANSFER, MessageType, VALID_RESPONSE};

pub type Result<T> = std::result::Result<T, ProtocolError>;

const SENTINEL_INDEX: usize = 3;
const DATA_INDEX: usize = 4;
const GROVE_STATUS_INDEX: usize = 4;
const GROVE_DATA_INDEX: usize = 5;

/// A fixed-length outgoing frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; LONGEST_SPI_TRANSFER],
}

impl Frame {
    /// Payload bytes available after the address and message type
    pub const CAPACITY: usize = LONGEST_SPI_TRANSFER - 2;

    /// Build a frame, zero padding the unused tail
    pub fn encode(address: u8, message_type: MessageType, payload: &[u8]) -> Result<Self> {
        if payload.len() > Self::CAPACITY {
            return Err(ProtocolError::PayloadTooLarge {
                len: payload.len(),
                capacity: Self::CAPACITY,
            });
        }

        let mut bytes = [0u8; LONGEST_SPI_TRANSFER];
        bytes[0] = address;
        bytes[1] = message_type as u8;
        bytes[2..2 + payload.len()].copy_from_slice(payload);

        Ok(Self { bytes })
    }

    /// Build a read request (no payload)
    pub fn request(address: u8, message_type: MessageType) -> Self {
        let mut bytes = [0u8; LONGEST_SPI_TRANSFER];
        bytes[0] = address;
        bytes[1] = message_type as u8;
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn address(&self) -> u8 {
        self.bytes[0]
    }

    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u8(self.bytes[1])
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[2..]
    }
}

/// Width of a scalar register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Bits8,
    Bits16,
    Bits32,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Width::Bits8 => 1,
            Width::Bits16 => 2,
            Width::Bits32 => 4,
        }
    }

    /// Reinterpret a raw value of this width as two's complement
    pub fn sign_extend(self, raw: u32) -> i32 {
        match self {
            Width::Bits8 => raw as u8 as i8 as i32,
            Width::Bits16 => raw as u16 as i16 as i32,
            Width::Bits32 => raw as i32,
        }
    }
}

fn require_len(response: &[u8], expected: usize) -> Result<()> {
    if response.len() < expected {
        return Err(ProtocolError::Truncated {
            expected,
            got: response.len(),
        });
    }
    Ok(())
}

/// Check the validity sentinel of a reply
pub fn check_sentinel(response: &[u8]) -> Result<()> {
    require_len(response, SENTINEL_INDEX + 1)?;
    if response[SENTINEL_INDEX] != VALID_RESPONSE {
        return Err(ProtocolError::NoResponse);
    }
    Ok(())
}

/// Decode an unsigned big-endian scalar starting at byte 4
pub fn decode_scalar(response: &[u8], width: Width) -> Result<u32> {
    check_sentinel(response)?;
    let data = decode_bytes(response, width.bytes())?;
    Ok(data.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
}

/// Decode a signed big-endian scalar starting at byte 4
pub fn decode_signed(response: &[u8], width: Width) -> Result<i32> {
    decode_scalar(response, width).map(|raw| width.sign_extend(raw))
}

/// Return `len` data bytes starting at byte 4
pub fn decode_bytes(response: &[u8], len: usize) -> Result<&[u8]> {
    check_sentinel(response)?;
    require_len(response, DATA_INDEX + len)?;
    Ok(&response[DATA_INDEX..DATA_INDEX + len])
}

/// Check the nested grove status byte and return the data that follows it
pub fn decode_grove(response: &[u8]) -> Result<(GroveState, &[u8])> {
    check_sentinel(response)?;
    require_len(response, GROVE_DATA_INDEX)?;

    let state = GroveState::from_u8(response[GROVE_STATUS_INDEX]);
    if state != GroveState::ValidData {
        return Err(ProtocolError::GroveNotReady(state));
    }
    Ok((state, &response[GROVE_DATA_INDEX..]))
}

/// Decode a grove read carrying a big-endian value of the given width
pub fn decode_grove_scalar(response: &[u8], width: Width) -> Result<u32> {
    let (_, data) = decode_grove(response)?;
    require_len(data, width.bytes()).map_err(|_| ProtocolError::Truncated {
        expected: GROVE_DATA_INDEX + width.bytes(),
        got: response.len(),
    })?;
    Ok(data[..width.bytes()]
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | b as u32))
}

/// Decode a typed grove port read (ultrasonic, IR receivers).
///
/// Byte 4 echoes the device type the firmware is running on the port; a mismatch
/// means the port was reconfigured underneath us.
pub fn decode_grove_value(response: &[u8], grove_type: GroveType, len: usize) -> Result<&[u8]> {
    check_sentinel(response)?;
    require_len(response, GROVE_DATA_INDEX + len)?;
    let got = response[GROVE_STATUS_INDEX];
    if got != grove_type as u8 {
        return Err(ProtocolError::GroveTypeMismatch {
            expected: grove_type,
            got,
        });
    }
    Ok(&response[GROVE_DATA_INDEX..GROVE_DATA_INDEX + len])
}

/// Collect the reply bytes from index 4 up to the end of the transfer as characters.
///
/// Embedded zero bytes are kept, callers trim if they need to.
pub fn decode_string(response: &[u8]) -> Result<String> {
    check_sentinel(response)?;
    let end = LONGEST_SPI_TRANSFER - 1;
    require_len(response, end)?;
    Ok(response[DATA_INDEX..end].iter().map(|&b| b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(data: &[u8]) -> Vec<u8> {
        let mut r = vec![0u8; LONGEST_SPI_TRANSFER];
        r[SENTINEL_INDEX] = VALID_RESPONSE;
        r[DATA_INDEX..DATA_INDEX + data.len()].copy_from_slice(data);
        r
    }

    #[test]
    fn test_encode_layout() {
        let frame = Frame::encode(8, MessageType::SetLed, &[0x02, 255, 10, 0]).unwrap();
        assert_eq!(frame.as_bytes().len(), 38);
        assert_eq!(&frame.as_bytes()[..6], &[8, 6, 0x02, 255, 10, 0]);
        assert!(frame.as_bytes()[6..].iter().all(|&b| b == 0));
        assert_eq!(frame.address(), 8);
        assert_eq!(frame.message_type(), Some(MessageType::SetLed));
    }

    #[test]
    fn test_encode_capacity() {
        let full = [0xAAu8; Frame::CAPACITY];
        let frame = Frame::encode(8, MessageType::StartGroveI2c1, &full).unwrap();
        assert_eq!(frame.payload(), &full[..]);

        let too_big = [0u8; Frame::CAPACITY + 1];
        assert_eq!(
            Frame::encode(8, MessageType::StartGroveI2c1, &too_big),
            Err(ProtocolError::PayloadTooLarge {
                len: 37,
                capacity: 36
            })
        );
    }

    #[test]
    fn test_decode_widths() {
        assert_eq!(decode_scalar(&reply(&[0x7F]), Width::Bits8), Ok(0x7F));
        assert_eq!(decode_signed(&reply(&[0xFF]), Width::Bits8), Ok(-1));

        assert_eq!(decode_scalar(&reply(&[0x2E, 0xE0]), Width::Bits16), Ok(12000));
        assert_eq!(decode_signed(&reply(&[0xFF, 0x38]), Width::Bits16), Ok(-200));

        let value: i32 = -123_456;
        assert_eq!(
            decode_signed(&reply(&value.to_be_bytes()), Width::Bits32),
            Ok(value)
        );
    }

    #[test]
    fn test_decode_32_bit_uses_four_distinct_bytes() {
        // Byte 5 must land in bits 16..24 rather than repeating byte 4
        let r = reply(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(decode_scalar(&r, Width::Bits32), Ok(0x0102_0304));
    }

    #[test]
    fn test_sentinel_mismatch_is_no_response() {
        let payloads: [&[u8]; 3] = [&[0, 0, 0, 0], &[0xFF, 0xFF, 0xFF, 0xFF], &[1, 2, 3, 4]];
        for sentinel in [0x00u8, 0xA4, 0xA6, 0xFF] {
            for payload in payloads {
                let mut r = reply(payload);
                r[SENTINEL_INDEX] = sentinel;
                for width in [Width::Bits8, Width::Bits16, Width::Bits32] {
                    assert_eq!(decode_scalar(&r, width), Err(ProtocolError::NoResponse));
                }
                assert_eq!(decode_string(&r), Err(ProtocolError::NoResponse));
                assert_eq!(decode_grove(&r), Err(ProtocolError::NoResponse));
            }
        }
    }

    #[test]
    fn test_truncated_response() {
        assert_eq!(
            decode_scalar(&[0, 0, 0], Width::Bits8),
            Err(ProtocolError::Truncated { expected: 4, got: 3 })
        );
        assert_eq!(
            decode_scalar(&[0, 0, 0, VALID_RESPONSE, 1], Width::Bits16),
            Err(ProtocolError::Truncated { expected: 6, got: 5 })
        );
    }

    #[test]
    fn test_decode_grove() {
        let r = reply(&[1, 0x0F, 0xFF]);
        let (state, data) = decode_grove(&r).unwrap();
        assert_eq!(state, GroveState::ValidData);
        assert_eq!(&data[..2], &[0x0F, 0xFF]);
        assert_eq!(decode_grove_scalar(&r, Width::Bits16), Ok(4095));

        let r = reply(&[2, 0x0F, 0xFF]);
        assert_eq!(
            decode_grove(&r),
            Err(ProtocolError::GroveNotReady(GroveState::NotConfigured))
        );
        let r = reply(&[5]);
        assert_eq!(
            decode_grove_scalar(&r, Width::Bits8),
            Err(ProtocolError::GroveNotReady(GroveState::I2cError))
        );
    }

    #[test]
    fn test_decode_string_keeps_nul() {
        let r = reply(b"Dexter Industries\0\0x");
        let s = decode_string(&r).unwrap();
        assert_eq!(s.len(), LONGEST_SPI_TRANSFER - 5);
        assert!(s.starts_with("Dexter Industries\0\0x"));
        assert_eq!(s.trim_end_matches('\0'), "Dexter Industries\0\0x");
    }

    #[test]
    fn test_grove_value_checks_device_type() {
        let r = reply(&[GroveType::Ultrasonic as u8, 0x01, 0x40]);
        assert_eq!(
            decode_grove_value(&r, GroveType::Ultrasonic, 2),
            Ok(&[0x01, 0x40][..])
        );
        assert_eq!(
            decode_grove_value(&r, GroveType::IrDiRemote, 1),
            Err(ProtocolError::GroveTypeMismatch {
                expected: GroveType::IrDiRemote,
                got: GroveType::Ultrasonic as u8,
            })
        );
        assert_eq!(
            decode_grove_value(&r[..6], GroveType::Ultrasonic, 2),
            Err(ProtocolError::Truncated {
                expected: 7,
                got: 6,
            })
        );
    }
}
