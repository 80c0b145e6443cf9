// GoPiGo3 register map
//
// Opcodes, device address and bit masks understood by the board firmware.
// Nothing outside this module should spell these as raw numbers.

use std::fmt;
use std::ops::BitOr;

/// Default SPI address of the board
pub const ADDRESS: u8 = 8;

/// Value of response byte 3 when the firmware produced a reply
pub const VALID_RESPONSE: u8 = 0xA5;

/// Longest possible grove I2C read/write
pub const LONGEST_I2C_TRANSFER: usize = 32;
/// Fixed length of every frame exchanged with the board
pub const LONGEST_SPI_TRANSFER: usize = LONGEST_I2C_TRANSFER + 6;

/// Message types (register opcodes)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    None = 0,

    GetManufacturer = 1,
    GetName = 2,
    GetHardwareVersion = 3,
    GetFirmwareVersion = 4,
    GetId = 5,

    SetLed = 6,

    GetVoltage5v = 7,
    GetVoltageVcc = 8,

    SetServo = 9,

    SetMotorPwm = 10,

    SetMotorPosition = 11,
    SetMotorPositionKp = 12,
    SetMotorPositionKd = 13,

    SetMotorDps = 14,

    SetMotorLimits = 15,

    OffsetMotorEncoder = 16,

    GetMotorEncoderLeft = 17,
    GetMotorEncoderRight = 18,

    GetMotorStatusLeft = 19,
    GetMotorStatusRight = 20,

    SetGroveType = 21,
    SetGroveMode = 22,
    SetGroveState = 23,
    SetGrovePwmDuty = 24,
    SetGrovePwmFrequency = 25,

    GetGroveValue1 = 26,
    GetGroveValue2 = 27,
    GetGroveState1_1 = 28,
    GetGroveState1_2 = 29,
    GetGroveState2_1 = 30,
    GetGroveState2_2 = 31,
    GetGroveVoltage1_1 = 32,
    GetGroveVoltage1_2 = 33,
    GetGroveVoltage2_1 = 34,
    GetGroveVoltage2_2 = 35,
    GetGroveAnalog1_1 = 36,
    GetGroveAnalog1_2 = 37,
    GetGroveAnalog2_1 = 38,
    GetGroveAnalog2_2 = 39,

    StartGroveI2c1 = 40,
    StartGroveI2c2 = 41,
}

impl MessageType {
    /// Look up a message type from its opcode
    pub fn from_u8(opcode: u8) -> Option<Self> {
        use MessageType::*;
        const ALL: [MessageType; 42] = [
            None,
            GetManufacturer,
            GetName,
            GetHardwareVersion,
            GetFirmwareVersion,
            GetId,
            SetLed,
            GetVoltage5v,
            GetVoltageVcc,
            SetServo,
            SetMotorPwm,
            SetMotorPosition,
            SetMotorPositionKp,
            SetMotorPositionKd,
            SetMotorDps,
            SetMotorLimits,
            OffsetMotorEncoder,
            GetMotorEncoderLeft,
            GetMotorEncoderRight,
            GetMotorStatusLeft,
            GetMotorStatusRight,
            SetGroveType,
            SetGroveMode,
            SetGroveState,
            SetGrovePwmDuty,
            SetGrovePwmFrequency,
            GetGroveValue1,
            GetGroveValue2,
            GetGroveState1_1,
            GetGroveState1_2,
            GetGroveState2_1,
            GetGroveState2_2,
            GetGroveVoltage1_1,
            GetGroveVoltage1_2,
            GetGroveVoltage2_1,
            GetGroveVoltage2_2,
            GetGroveAnalog1_1,
            GetGroveAnalog1_2,
            GetGroveAnalog2_1,
            GetGroveAnalog2_2,
            StartGroveI2c1,
            StartGroveI2c2,
        ];
        ALL.get(opcode as usize).copied()
    }
}

/// LED bit masks
pub mod led {
    pub const EYE_RIGHT: u8 = 0x01;
    pub const EYE_LEFT: u8 = 0x02;
    pub const BLINKER_LEFT: u8 = 0x04;
    pub const BLINKER_RIGHT: u8 = 0x08;
    /// Reserved for the WiFi status LED, not meant for user control
    pub const WIFI: u8 = 0x80;

    pub const ALL_USER: u8 = EYE_LEFT | EYE_RIGHT | BLINKER_LEFT | BLINKER_RIGHT;
}

/// Servo bit masks
pub mod servo {
    pub const SERVO_1: u8 = 0x01;
    pub const SERVO_2: u8 = 0x02;
    pub const BOTH: u8 = SERVO_1 | SERVO_2;
}

/// Motor selector
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motor {
    Left = 0x01,
    Right = 0x02,
    Both = 0x03,
}

/// Motor power value that lets the motor spin freely
pub const MOTOR_FLOAT: i8 = -128;

/// Grove pin/port bit mask.
///
/// Each port takes two bits, one per pin, so a port mask is the union of
/// its two pin masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroveMask(pub u8);

impl GroveMask {
    pub const PIN_1_1: GroveMask = GroveMask(0x01);
    pub const PIN_1_2: GroveMask = GroveMask(0x02);
    pub const PIN_2_1: GroveMask = GroveMask(0x04);
    pub const PIN_2_2: GroveMask = GroveMask(0x08);

    pub const PORT_1: GroveMask = GroveMask(0x01 | 0x02);
    pub const PORT_2: GroveMask = GroveMask(0x04 | 0x08);
    pub const ALL: GroveMask = GroveMask(0x0F);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when the mask names exactly one of the four pins
    pub fn is_single_pin(self) -> bool {
        matches!(self.0, 0x01 | 0x02 | 0x04 | 0x08)
    }

    /// Port indexes (0 or 1) fully covered by this mask
    pub fn ports(self) -> impl Iterator<Item = usize> {
        (0..2).filter(move |p| (self.0 >> (p * 2)) & 0x03 == 0x03)
    }
}

impl BitOr for GroveMask {
    type Output = GroveMask;

    fn bitor(self, rhs: GroveMask) -> GroveMask {
        GroveMask(self.0 | rhs.0)
    }
}

impl fmt::Display for GroveMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Grove pin modes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroveMode {
    InputDigital = 0,
    OutputDigital = 1,
    InputDigitalPullup = 2,
    InputDigitalPulldown = 3,
    InputAnalog = 4,
    OutputPwm = 5,
    InputAnalogPullup = 6,
    InputAnalogPulldown = 7,
}

/// Grove device types
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroveType {
    Custom = 1,
    IrDiRemote = 2,
    IrEv3Remote = 3,
    Ultrasonic = 4,
    I2c = 5,
}

/// Grove output level
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroveLevel {
    Low = 0,
    High = 1,
}

/// In-band status byte of a grove read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroveState {
    ValidData,
    NotConfigured,
    Configuring,
    NoData,
    I2cError,
    Unknown(u8),
}

impl GroveState {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => GroveState::ValidData,
            2 => GroveState::NotConfigured,
            3 => GroveState::Configuring,
            4 => GroveState::NoData,
            5 => GroveState::I2cError,
            other => GroveState::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            GroveState::ValidData => 1,
            GroveState::NotConfigured => 2,
            GroveState::Configuring => 3,
            GroveState::NoData => 4,
            GroveState::I2cError => 5,
            GroveState::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for GroveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroveState::ValidData => write!(f, "valid data"),
            GroveState::NotConfigured => write!(f, "not configured"),
            GroveState::Configuring => write!(f, "configuring"),
            GroveState::NoData => write!(f, "no data"),
            GroveState::I2cError => write!(f, "I2C error"),
            GroveState::Unknown(raw) => write!(f, "unknown status {}", raw),
        }
    }
}

/// Legacy numeric error codes used by the board's other client libraries
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    None = 0,
    SpiFile = -1,
    SpiResponse = -2,
    WrongManufacturer = -3,
    WrongDevice = -4,
    FirmwareMismatch = -5,
    GroveTypeMismatch = -6,
    GroveDataError = -7,
}
