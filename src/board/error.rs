// Error types for GoPiGo3 communication

use super::registers::{ErrorCode, GroveMask, GroveState, GroveType, Motor};

/// Failure of the byte channel itself
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SPI error: {0}")]
    Spi(String),

    #[error("Transport lock poisoned")]
    Poisoned,
}

/// A reply arrived but cannot be used, or a request cannot be framed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("No SPI response")]
    NoResponse,

    #[error("Grove read not ready: {0}")]
    GroveNotReady(GroveState),

    #[error("Motor selector {0:?} unsupported, must be one motor at a time")]
    InvalidMotorSelector(Motor),

    #[error("Grove pin mask {0} unsupported, must be one pin at a time")]
    InvalidPinSelector(GroveMask),

    #[error("Grove port mask {0} unsupported, must be one port at a time")]
    InvalidPortSelector(GroveMask),

    #[error("Grove value reported device type {got}, port is configured as {expected:?}")]
    GroveTypeMismatch { expected: GroveType, got: u8 },

    #[error("Ultrasonic sensor not responding")]
    SensorNotResponding,

    #[error("No object detected within range")]
    NothingInRange,

    #[error("Payload of {len} bytes exceeds frame capacity of {capacity}")]
    PayloadTooLarge { len: usize, capacity: usize },

    #[error("Response truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
}

/// Error type for every board operation
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Wrong manufacturer: {0:?}")]
    WrongManufacturer(String),

    #[error("Wrong board: {0:?}")]
    WrongBoard(String),

    #[error("Firmware needs to be version {required} but is currently version {found}")]
    FirmwareMismatch { required: String, found: String },

    #[error("Invalid robot geometry: diameter={diameter}mm, width={width}mm")]
    InvalidGeometry { diameter: f64, width: f64 },
}

impl BoardError {
    /// Legacy numeric code for this error, if the board's client libraries define one
    pub fn code(&self) -> Option<ErrorCode> {
        let code = match self {
            BoardError::Transport(_) => ErrorCode::SpiFile,
            BoardError::Protocol(
                ProtocolError::GroveNotReady(_)
                | ProtocolError::SensorNotResponding
                | ProtocolError::NothingInRange,
            ) => ErrorCode::GroveDataError,
            BoardError::Protocol(
                ProtocolError::InvalidPinSelector(_)
                | ProtocolError::InvalidPortSelector(_)
                | ProtocolError::GroveTypeMismatch { .. },
            ) => ErrorCode::GroveTypeMismatch,
            BoardError::Protocol(_) => ErrorCode::SpiResponse,
            BoardError::WrongManufacturer(_) => ErrorCode::WrongManufacturer,
            BoardError::WrongBoard(_) => ErrorCode::WrongDevice,
            BoardError::FirmwareMismatch { .. } => ErrorCode::FirmwareMismatch,
            BoardError::InvalidGeometry { .. } => return None,
        };
        Some(code)
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BoardError::from(ProtocolError::NoResponse).code(),
            Some(ErrorCode::SpiResponse)
        );
        assert_eq!(
            BoardError::from(ProtocolError::GroveNotReady(GroveState::NoData)).code(),
            Some(ErrorCode::GroveDataError)
        );
        assert_eq!(
            BoardError::from(TransportError::Poisoned).code(),
            Some(ErrorCode::SpiFile)
        );
        assert_eq!(
            BoardError::from(ProtocolError::GroveTypeMismatch {
                expected: GroveType::Ultrasonic,
                got: 2,
            })
            .code(),
            Some(ErrorCode::GroveTypeMismatch)
        );
        assert_eq!(ErrorCode::FirmwareMismatch as i8, -5);
    }

    #[test]
    fn test_geometry_error_has_no_legacy_code() {
        let err = BoardError::InvalidGeometry {
            diameter: 0.0,
            width: 117.0,
        };
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_protocol_error_display() {
        let e = ProtocolError::InvalidPinSelector(GroveMask::PORT_1);
        assert_eq!(
            e.to_string(),
            "Grove pin mask 0x03 unsupported, must be one pin at a time"
        );
    }
}
