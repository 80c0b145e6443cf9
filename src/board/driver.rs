// Command dispatcher for the GoPiGo3 board
//
// One typed operation per register. Writes are fire-and-forget (the reply is
// discarded), reads decode the reply at the register's width and convert raw
// register units back to physical units.

use std::fmt;

use tracing::{debug, info, warn};

use super::error::{BoardError, ProtocolError, Result};
use super::protocol::{self, Frame, Width};
use super::registers::{
    ADDRESS, GroveLevel, GroveMask, GroveMode, GroveType, MOTOR_FLOAT, MessageType, Motor, led,
    servo,
};
use super::transport::Transport;
use super::units::{self, RobotGeometry};

/// Firmware major.minor this driver speaks
pub const FIRMWARE_VERSION_REQUIRED: &str = "0.3.x";

pub const EXPECTED_MANUFACTURER: &str = "Dexter Industries";
pub const EXPECTED_BOARD: &str = "GoPiGo3";

/// Board firmware or hardware version, packed as major*1_000_000 + minor*1000 + patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn from_packed(packed: u32) -> Self {
        Self {
            major: packed / 1_000_000,
            minor: (packed / 1000) % 1000,
            patch: packed % 1000,
        }
    }

    /// True when major and minor match a pattern such as "0.3.x"
    pub fn matches(&self, required: &str) -> bool {
        let mut parts = required.split('.');
        let major = parts.next().and_then(|p| p.parse::<u32>().ok());
        let minor = parts.next().and_then(|p| p.parse::<u32>().ok());
        major == Some(self.major) && minor == Some(self.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Snapshot of one motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorStatus {
    /// bit 0: low voltage float, bit 1: overloaded
    pub flags: u8,
    /// Raw PWM power in percent
    pub power: i8,
    /// Encoder position in degrees
    pub encoder: i32,
    /// Current speed in degrees per second
    pub dps: i32,
}

impl MotorStatus {
    pub fn low_voltage(&self) -> bool {
        self.flags & 0x01 != 0
    }

    pub fn overloaded(&self) -> bool {
        self.flags & 0x02 != 0
    }
}

/// Reading of a grove port, shaped by the device type configured on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroveValue {
    /// Port not set up for a typed device
    Raw(u8),
    /// Button code from an IR remote
    IrRemote(u8),
    /// Four channel bytes from an EV3 IR remote
    Ev3Remote([u8; 4]),
    /// Ultrasonic distance in millimetres
    DistanceMm(u16),
}

/// GoPiGo3 command dispatcher bound to one transport
pub struct GoPiGo3<T> {
    transport: T,
    address: u8,
    geometry: RobotGeometry,
    grove_types: [Option<GroveType>; 2],
}

impl<T: Transport> GoPiGo3<T> {
    /// Create a dispatcher at the default board address
    pub fn new(transport: T) -> Self {
        Self::with_address(transport, ADDRESS)
    }

    /// Create with a custom board address
    pub fn with_address(transport: T, address: u8) -> Self {
        Self {
            transport,
            address,
            geometry: RobotGeometry::default(),
            grove_types: [None; 2],
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    // === Frame plumbing ===

    fn exchange(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        debug!(
            "SPI {:?}: {:02X?}",
            frame.message_type(),
            &frame.as_bytes()[..8]
        );
        Ok(self.transport.transfer(frame)?)
    }

    fn write(&mut self, message_type: MessageType, payload: &[u8]) -> Result<()> {
        let frame = Frame::encode(self.address, message_type, payload)?;
        self.exchange(&frame)?;
        Ok(())
    }

    fn request(&mut self, message_type: MessageType) -> Result<Vec<u8>> {
        let frame = Frame::request(self.address, message_type);
        self.exchange(&frame)
    }

    fn read_scalar(&mut self, message_type: MessageType, width: Width) -> Result<u32> {
        let reply = self.request(message_type)?;
        Ok(protocol::decode_scalar(&reply, width)?)
    }

    fn read_signed(&mut self, message_type: MessageType, width: Width) -> Result<i32> {
        let reply = self.request(message_type)?;
        Ok(protocol::decode_signed(&reply, width)?)
    }

    fn read_string(&mut self, message_type: MessageType) -> Result<String> {
        let reply = self.request(message_type)?;
        let raw = protocol::decode_string(&reply)?;
        Ok(raw.trim_end_matches('\0').to_string())
    }

    fn read_grove(&mut self, message_type: MessageType, width: Width) -> Result<u32> {
        let reply = self.request(message_type)?;
        Ok(protocol::decode_grove_scalar(&reply, width)?)
    }

    // === Identity ===

    /// Manufacturer name (trailing NULs removed)
    pub fn get_manufacturer(&mut self) -> Result<String> {
        self.read_string(MessageType::GetManufacturer)
    }

    /// Board name (trailing NULs removed)
    pub fn get_board(&mut self) -> Result<String> {
        self.read_string(MessageType::GetName)
    }

    pub fn get_version_hardware(&mut self) -> Result<Version> {
        let packed = self.read_scalar(MessageType::GetHardwareVersion, Width::Bits32)?;
        Ok(Version::from_packed(packed))
    }

    pub fn get_version_firmware(&mut self) -> Result<Version> {
        let packed = self.read_scalar(MessageType::GetFirmwareVersion, Width::Bits32)?;
        Ok(Version::from_packed(packed))
    }

    /// 128-bit hardware serial number as 32 hex characters
    pub fn get_id(&mut self) -> Result<String> {
        let reply = self.request(MessageType::GetId)?;
        let bytes = protocol::decode_bytes(&reply, 16)?;
        Ok(bytes.iter().map(|b| format!("{:02X}", b)).collect())
    }

    /// Check that the device at this address is a GoPiGo3 running compatible firmware
    pub fn verify_identity(&mut self) -> Result<Version> {
        let manufacturer = self.get_manufacturer()?;
        if manufacturer != EXPECTED_MANUFACTURER {
            return Err(BoardError::WrongManufacturer(manufacturer));
        }

        let board = self.get_board()?;
        if board != EXPECTED_BOARD {
            return Err(BoardError::WrongBoard(board));
        }

        let firmware = self.get_version_firmware()?;
        if !firmware.matches(FIRMWARE_VERSION_REQUIRED) {
            return Err(BoardError::FirmwareMismatch {
                required: FIRMWARE_VERSION_REQUIRED.to_string(),
                found: firmware.to_string(),
            });
        }

        info!("GoPiGo3 at address {} running firmware {}", self.address, firmware);
        Ok(firmware)
    }

    // === Power ===

    /// Battery voltage in volts
    pub fn get_voltage_battery(&mut self) -> Result<f64> {
        let mv = self.read_scalar(MessageType::GetVoltageVcc, Width::Bits16)?;
        Ok(mv as f64 / 1000.0)
    }

    /// 5V rail voltage in volts
    pub fn get_voltage_5v(&mut self) -> Result<f64> {
        let mv = self.read_scalar(MessageType::GetVoltage5v, Width::Bits16)?;
        Ok(mv as f64 / 1000.0)
    }

    // === LEDs and servos ===

    /// Set an LED colour.
    ///
    /// Each channel is clamped to 0..=255. An LED id outside 0..=255 is ignored
    /// and no frame is sent.
    pub fn set_led(&mut self, led: i32, red: i32, green: i32, blue: i32) -> Result<()> {
        let Ok(led) = u8::try_from(led) else {
            warn!("Ignoring set_led for out-of-range LED id {}", led);
            return Ok(());
        };

        let payload = [
            led,
            units::clamp_color(red),
            units::clamp_color(green),
            units::clamp_color(blue),
        ];
        self.write(MessageType::SetLed, &payload)
    }

    /// Set servo pulse width in microseconds (0 disables the output)
    pub fn set_servo(&mut self, servo: u8, pulse_us: u16) -> Result<()> {
        let [hi, lo] = pulse_us.to_be_bytes();
        self.write(MessageType::SetServo, &[servo, hi, lo])
    }

    // === Motors ===

    /// Set motor power in percent (-100..=100), or `MOTOR_FLOAT` to let it spin freely
    pub fn set_motor_power(&mut self, motor: Motor, power: i32) -> Result<()> {
        let power = units::clamp_power(power);
        debug!("Set motor power {:?}: {}", motor, power);
        self.write(MessageType::SetMotorPwm, &[motor as u8, power as u8])
    }

    /// Set motor target position in degrees
    pub fn set_motor_position(&mut self, motor: Motor, degrees: f64) -> Result<()> {
        let ticks = self.geometry.degrees_to_ticks(degrees);
        debug!("Set motor position {:?}: {}° ({} ticks)", motor, degrees, ticks);
        let mut payload = [motor as u8, 0, 0, 0, 0];
        payload[1..].copy_from_slice(&ticks.to_be_bytes());
        self.write(MessageType::SetMotorPosition, &payload)
    }

    /// Set motor target speed in degrees per second
    pub fn set_motor_dps(&mut self, motor: Motor, dps: f64) -> Result<()> {
        let ticks = self.geometry.dps_to_ticks(dps);
        let [hi, lo] = ticks.to_be_bytes();
        self.write(MessageType::SetMotorDps, &[motor as u8, hi, lo])
    }

    /// Set motor power limit (percent, 0 = no limit) and speed limit (dps, 0 = no limit)
    pub fn set_motor_limits(&mut self, motor: Motor, power: u8, dps: f64) -> Result<()> {
        let ticks = self.geometry.dps_to_ticks(dps);
        let [hi, lo] = ticks.to_be_bytes();
        debug!("Set motor limits {:?}: power={}%, dps={}", motor, power, dps);
        self.write(MessageType::SetMotorLimits, &[motor as u8, power, hi, lo])
    }

    fn single_motor(motor: Motor, left: MessageType, right: MessageType) -> Result<MessageType> {
        match motor {
            Motor::Left => Ok(left),
            Motor::Right => Ok(right),
            Motor::Both => Err(ProtocolError::InvalidMotorSelector(motor).into()),
        }
    }

    /// Read a motor encoder in degrees (one motor at a time)
    pub fn get_motor_encoder(&mut self, motor: Motor) -> Result<i32> {
        let message_type = Self::single_motor(
            motor,
            MessageType::GetMotorEncoderLeft,
            MessageType::GetMotorEncoderRight,
        )?;
        let ticks = self.read_signed(message_type, Width::Bits32)?;
        Ok(self.geometry.ticks_to_degrees(ticks))
    }

    /// Read flags, power, encoder and speed of one motor
    pub fn get_motor_status(&mut self, motor: Motor) -> Result<MotorStatus> {
        let message_type = Self::single_motor(
            motor,
            MessageType::GetMotorStatusLeft,
            MessageType::GetMotorStatusRight,
        )?;
        let reply = self.request(message_type)?;
        let data = protocol::decode_bytes(&reply, 8)?;

        let encoder = i32::from_be_bytes([data[2], data[3], data[4], data[5]]);
        let dps = i16::from_be_bytes([data[6], data[7]]);
        Ok(MotorStatus {
            flags: data[0],
            power: data[1] as i8,
            encoder: self.geometry.ticks_to_degrees(encoder),
            dps: self.geometry.ticks_to_degrees(dps as i32),
        })
    }

    /// Offset a motor encoder by `degrees`
    pub fn offset_motor_encoder(&mut self, motor: Motor, degrees: f64) -> Result<()> {
        let ticks = self.geometry.degrees_to_ticks(degrees);
        let mut payload = [motor as u8, 0, 0, 0, 0];
        payload[1..].copy_from_slice(&ticks.to_be_bytes());
        self.write(MessageType::OffsetMotorEncoder, &payload)
    }

    /// Zero the selected encoders by offsetting them by their current position
    pub fn reset_motor_encoder(&mut self, motor: Motor) -> Result<()> {
        for single in [Motor::Left, Motor::Right] {
            if motor as u8 & single as u8 != 0 {
                let position = self.get_motor_encoder(single)?;
                self.offset_motor_encoder(single, position as f64)?;
            }
        }
        Ok(())
    }

    // === Grove ===

    /// Set the device type on one or both grove ports
    pub fn set_grove_type(&mut self, port: GroveMask, grove_type: GroveType) -> Result<()> {
        for p in port.ports() {
            self.grove_types[p] = Some(grove_type);
        }
        self.write(MessageType::SetGroveType, &[port.bits(), grove_type as u8])
    }

    /// Last type configured on a grove port (0 or 1)
    pub fn grove_type(&self, port_index: usize) -> Option<GroveType> {
        self.grove_types.get(port_index).copied().flatten()
    }

    pub fn set_grove_mode(&mut self, pins: GroveMask, mode: GroveMode) -> Result<()> {
        self.write(MessageType::SetGroveMode, &[pins.bits(), mode as u8])
    }

    /// Drive grove output pins low or high
    pub fn set_grove_state(&mut self, pins: GroveMask, level: GroveLevel) -> Result<()> {
        self.write(MessageType::SetGroveState, &[pins.bits(), level as u8])
    }

    /// Set grove output PWM duty cycle in percent
    pub fn set_grove_pwm_duty(&mut self, pins: GroveMask, duty: f64) -> Result<()> {
        let [hi, lo] = units::duty_to_register(duty).to_be_bytes();
        self.write(MessageType::SetGrovePwmDuty, &[pins.bits(), hi, lo])
    }

    /// Set grove PWM frequency (3..=48000 Hz)
    pub fn set_grove_pwm_frequency(&mut self, port: GroveMask, hz: i32) -> Result<()> {
        let [hi, lo] = units::freq_clamp(hz).to_be_bytes();
        self.write(MessageType::SetGrovePwmFrequency, &[port.bits(), hi, lo])
    }

    fn grove_pin_message(pin: GroveMask, table: [MessageType; 4]) -> Result<MessageType> {
        match pin {
            GroveMask::PIN_1_1 => Ok(table[0]),
            GroveMask::PIN_1_2 => Ok(table[1]),
            GroveMask::PIN_2_1 => Ok(table[2]),
            GroveMask::PIN_2_2 => Ok(table[3]),
            other => Err(ProtocolError::InvalidPinSelector(other).into()),
        }
    }

    /// Digital state of one grove input pin
    pub fn get_grove_state(&mut self, pin: GroveMask) -> Result<u8> {
        let message_type = Self::grove_pin_message(
            pin,
            [
                MessageType::GetGroveState1_1,
                MessageType::GetGroveState1_2,
                MessageType::GetGroveState2_1,
                MessageType::GetGroveState2_2,
            ],
        )?;
        Ok(self.read_grove(message_type, Width::Bits8)? as u8)
    }

    /// 12-bit raw ADC reading of one grove input pin
    pub fn get_grove_analog(&mut self, pin: GroveMask) -> Result<u16> {
        let message_type = Self::grove_pin_message(
            pin,
            [
                MessageType::GetGroveAnalog1_1,
                MessageType::GetGroveAnalog1_2,
                MessageType::GetGroveAnalog2_1,
                MessageType::GetGroveAnalog2_2,
            ],
        )?;
        Ok(self.read_grove(message_type, Width::Bits16)? as u16)
    }

    /// Analog voltage of one grove input pin in volts
    pub fn get_grove_voltage(&mut self, pin: GroveMask) -> Result<f64> {
        let message_type = Self::grove_pin_message(
            pin,
            [
                MessageType::GetGroveVoltage1_1,
                MessageType::GetGroveVoltage1_2,
                MessageType::GetGroveVoltage2_1,
                MessageType::GetGroveVoltage2_2,
            ],
        )?;
        let mv = self.read_grove(message_type, Width::Bits16)?;
        Ok(mv as f64 / 1000.0)
    }

    /// Value of a grove port configured as ultrasonic or IR receiver.
    ///
    /// The reply layout follows the type last set with `set_grove_type`; ports of
    /// any other type return the raw byte.
    pub fn get_grove_value(&mut self, port: GroveMask) -> Result<GroveValue> {
        let (message_type, index) = match port {
            GroveMask::PORT_1 => (MessageType::GetGroveValue1, 0),
            GroveMask::PORT_2 => (MessageType::GetGroveValue2, 1),
            other => return Err(ProtocolError::InvalidPortSelector(other).into()),
        };

        let grove_type = match self.grove_types[index] {
            Some(t @ (GroveType::IrDiRemote | GroveType::IrEv3Remote | GroveType::Ultrasonic)) => t,
            _ => {
                let raw = self.read_scalar(message_type, Width::Bits8)?;
                return Ok(GroveValue::Raw(raw as u8));
            }
        };

        let reply = self.request(message_type)?;
        match grove_type {
            GroveType::IrEv3Remote => {
                let data = protocol::decode_grove_value(&reply, grove_type, 4)?;
                Ok(GroveValue::Ev3Remote([data[0], data[1], data[2], data[3]]))
            }
            GroveType::Ultrasonic => {
                let data = protocol::decode_grove_value(&reply, grove_type, 2)?;
                match u16::from_be_bytes([data[0], data[1]]) {
                    0 => Err(ProtocolError::SensorNotResponding.into()),
                    1 => Err(ProtocolError::NothingInRange.into()),
                    mm => Ok(GroveValue::DistanceMm(mm)),
                }
            }
            _ => {
                let data = protocol::decode_grove_value(&reply, grove_type, 1)?;
                Ok(GroveValue::IrRemote(data[0]))
            }
        }
    }

    // === Whole board ===

    /// Return grove ports, motors, servos and LEDs to their power-on state
    pub fn reset_all(&mut self) -> Result<()> {
        info!("Resetting GoPiGo3 outputs");
        self.set_grove_type(GroveMask::ALL, GroveType::Custom)?;
        self.set_grove_mode(GroveMask::ALL, GroveMode::InputDigital)?;
        self.set_motor_power(Motor::Both, MOTOR_FLOAT as i32)?;
        self.set_motor_limits(Motor::Both, 0, 0.0)?;
        self.set_servo(servo::BOTH, 0)?;
        self.set_led(led::ALL_USER as i32, 0, 0, 0)
    }

    // === Geometry ===

    /// Replace wheel diameter and wheel base width (mm)
    pub fn set_robot_constants(&mut self, wheel_diameter: f64, wheel_base_width: f64) -> Result<()> {
        self.geometry.set_constants(wheel_diameter, wheel_base_width)?;
        info!(
            "Robot constants: wheel diameter {}mm, wheel base {}mm",
            wheel_diameter, wheel_base_width
        );
        Ok(())
    }

    /// (wheel diameter, wheel base width) in mm
    pub fn get_robot_constants(&self) -> (f64, f64) {
        self.geometry.constants()
    }

    pub fn geometry(&self) -> &RobotGeometry {
        &self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::sim::SimulatedBoard;

    fn board() -> (GoPiGo3<SimulatedBoard>, SimulatedBoard) {
        let sim = SimulatedBoard::new();
        (GoPiGo3::new(sim.clone()), sim)
    }

    #[test]
    fn test_version_unpacking() {
        let v = Version::from_packed(3_004_005);
        assert_eq!(v.to_string(), "3.4.5");
        assert!(Version::from_packed(3_012).matches("0.3.x"));
        assert!(!Version::from_packed(1_003_012).matches("0.3.x"));
    }

    #[test]
    fn test_identity() {
        let (mut gpg, _sim) = board();
        assert_eq!(gpg.get_manufacturer().unwrap(), "Dexter Industries");
        assert_eq!(gpg.get_board().unwrap(), "GoPiGo3");
        assert_eq!(gpg.verify_identity().unwrap().minor, 3);
        assert_eq!(gpg.get_id().unwrap().len(), 32);
    }

    #[test]
    fn test_wrong_board_rejected() {
        let (mut gpg, sim) = board();
        sim.set_board_name("BrickPi3");
        let err = gpg.verify_identity().unwrap_err();
        assert!(matches!(err, BoardError::WrongBoard(ref name) if name == "BrickPi3"));
    }

    #[test]
    fn test_set_motor_position_frame() {
        let (mut gpg, sim) = board();
        gpg.set_motor_position(Motor::Left, -90.0).unwrap();

        let frame = sim.last_frame().unwrap();
        let ticks = (-180i32).to_be_bytes();
        assert_eq!(
            &frame.as_bytes()[..7],
            &[8, 11, 0x01, ticks[0], ticks[1], ticks[2], ticks[3]]
        );
    }

    #[test]
    fn test_motor_limits_and_dps_frames() {
        let (mut gpg, sim) = board();
        gpg.set_motor_limits(Motor::Both, 50, 300.0).unwrap();
        assert_eq!(&sim.last_frame().unwrap().as_bytes()[..6], &[8, 15, 3, 50, 0x02, 0x58]);

        gpg.set_motor_dps(Motor::Right, -1.0).unwrap();
        assert_eq!(&sim.last_frame().unwrap().as_bytes()[..5], &[8, 14, 2, 0xFF, 0xFE]);
    }

    #[test]
    fn test_encoder_rejects_both() {
        let (mut gpg, sim) = board();
        let err = gpg.get_motor_encoder(Motor::Both).unwrap_err();
        assert!(matches!(
            err,
            BoardError::Protocol(ProtocolError::InvalidMotorSelector(Motor::Both))
        ));
        assert!(sim.frames().is_empty());
    }

    #[test]
    fn test_encoder_read_converts_ticks() {
        let (mut gpg, sim) = board();
        sim.set_encoder_ticks(Motor::Right, -721);
        assert_eq!(gpg.get_motor_encoder(Motor::Right).unwrap(), -360);
    }

    #[test]
    fn test_no_response_surfaces() {
        let (mut gpg, sim) = board();
        sim.set_responding(false);
        let err = gpg.get_voltage_battery().unwrap_err();
        assert!(matches!(err, BoardError::Protocol(ProtocolError::NoResponse)));
    }

    #[test]
    fn test_set_led_clamps_and_ignores() {
        let (mut gpg, sim) = board();
        gpg.set_led(led::EYE_LEFT as i32, 300, -4, 128).unwrap();
        assert_eq!(&sim.last_frame().unwrap().as_bytes()[..6], &[8, 6, 0x02, 255, 0, 128]);

        let sent = sim.frames().len();
        gpg.set_led(256, 10, 10, 10).unwrap();
        gpg.set_led(-1, 10, 10, 10).unwrap();
        assert_eq!(sim.frames().len(), sent);
    }

    #[test]
    fn test_grove_reads() {
        let (mut gpg, sim) = board();
        sim.set_grove_input(GroveMask::PIN_2_1, 1, 3071);
        assert_eq!(gpg.get_grove_state(GroveMask::PIN_2_1).unwrap(), 1);
        assert_eq!(gpg.get_grove_analog(GroveMask::PIN_2_1).unwrap(), 3071);
    }

    #[test]
    fn test_grove_combined_mask_rejected_without_io() {
        let (mut gpg, sim) = board();
        let err = gpg.get_grove_state(GroveMask::PORT_1).unwrap_err();
        assert!(matches!(
            err,
            BoardError::Protocol(ProtocolError::InvalidPinSelector(GroveMask::PORT_1))
        ));
        assert!(gpg.get_grove_analog(GroveMask::PIN_1_1 | GroveMask::PIN_2_2).is_err());
        assert!(sim.frames().is_empty());
    }

    #[test]
    fn test_grove_not_ready() {
        let (mut gpg, sim) = board();
        sim.set_grove_status(GroveMask::PIN_1_2, 2);
        let err = gpg.get_grove_analog(GroveMask::PIN_1_2).unwrap_err();
        assert_eq!(err.code(), Some(crate::board::registers::ErrorCode::GroveDataError));
    }

    #[test]
    fn test_grove_value_follows_port_type() {
        let (mut gpg, sim) = board();
        sim.set_grove_value(GroveMask::PORT_1, &[0x2A]);
        assert_eq!(
            gpg.get_grove_value(GroveMask::PORT_1).unwrap(),
            GroveValue::Raw(0x2A)
        );

        gpg.set_grove_type(GroveMask::PORT_1, GroveType::Ultrasonic).unwrap();
        sim.set_grove_value(GroveMask::PORT_1, &321u16.to_be_bytes());
        assert_eq!(
            gpg.get_grove_value(GroveMask::PORT_1).unwrap(),
            GroveValue::DistanceMm(321)
        );
        assert_eq!(
            sim.last_frame().unwrap().message_type(),
            Some(MessageType::GetGroveValue1)
        );

        gpg.set_grove_type(GroveMask::PORT_2, GroveType::IrEv3Remote).unwrap();
        sim.set_grove_value(GroveMask::PORT_2, &[1, 2, 3, 4]);
        assert_eq!(
            gpg.get_grove_value(GroveMask::PORT_2).unwrap(),
            GroveValue::Ev3Remote([1, 2, 3, 4])
        );
    }

    #[test]
    fn test_ultrasonic_special_readings() {
        let (mut gpg, sim) = board();
        gpg.set_grove_type(GroveMask::PORT_2, GroveType::Ultrasonic).unwrap();

        sim.set_grove_value(GroveMask::PORT_2, &[0, 0]);
        assert!(matches!(
            gpg.get_grove_value(GroveMask::PORT_2),
            Err(BoardError::Protocol(ProtocolError::SensorNotResponding))
        ));
        sim.set_grove_value(GroveMask::PORT_2, &[0, 1]);
        assert!(matches!(
            gpg.get_grove_value(GroveMask::PORT_2),
            Err(BoardError::Protocol(ProtocolError::NothingInRange))
        ));
    }

    #[test]
    fn test_grove_value_detects_reconfigured_port() {
        let (mut gpg, sim) = board();
        gpg.set_grove_type(GroveMask::PORT_1, GroveType::IrDiRemote).unwrap();
        // Another client switched the board's port type
        sim.set_grove_port_type(GroveMask::PORT_1, GroveType::Ultrasonic);

        let err = gpg.get_grove_value(GroveMask::PORT_1).unwrap_err();
        assert!(matches!(
            err,
            BoardError::Protocol(ProtocolError::GroveTypeMismatch {
                expected: GroveType::IrDiRemote,
                ..
            })
        ));
        assert!(gpg.get_grove_value(GroveMask::PIN_1_1).is_err());
    }

    #[test]
    fn test_grove_type_cache() {
        let (mut gpg, _sim) = board();
        gpg.set_grove_type(GroveMask::PORT_2, GroveType::Ultrasonic).unwrap();
        assert_eq!(gpg.grove_type(0), None);
        assert_eq!(gpg.grove_type(1), Some(GroveType::Ultrasonic));
    }

    #[test]
    fn test_pwm_frames() {
        let (mut gpg, sim) = board();
        gpg.set_grove_pwm_duty(GroveMask::PIN_1_1, 50.0).unwrap();
        assert_eq!(&sim.last_frame().unwrap().as_bytes()[..5], &[8, 24, 0x01, 0x01, 0xF4]);
        gpg.set_grove_pwm_frequency(GroveMask::PORT_1, 100_000).unwrap();
        assert_eq!(&sim.last_frame().unwrap().as_bytes()[..5], &[8, 25, 0x03, 0xBB, 0x80]);
    }

    #[test]
    fn test_reset_motor_encoder() {
        let (mut gpg, sim) = board();
        sim.set_encoder_ticks(Motor::Left, 400);
        gpg.reset_motor_encoder(Motor::Left).unwrap();
        assert_eq!(gpg.get_motor_encoder(Motor::Left).unwrap(), 0);
    }

    #[test]
    fn test_motor_status() {
        let (mut gpg, sim) = board();
        sim.set_encoder_ticks(Motor::Left, 200);
        let status = gpg.get_motor_status(Motor::Left).unwrap();
        assert_eq!(status.encoder, 100);
        assert!(!status.low_voltage());
    }

    #[test]
    fn test_robot_constants() {
        let (mut gpg, _sim) = board();
        assert_eq!(gpg.get_robot_constants(), (66.5, 117.0));
        gpg.set_robot_constants(70.0, 120.0).unwrap();
        assert_eq!(gpg.get_robot_constants(), (70.0, 120.0));
        assert!(gpg.set_robot_constants(-1.0, 120.0).is_err());
        assert_eq!(gpg.get_robot_constants(), (70.0, 120.0));
    }
}
