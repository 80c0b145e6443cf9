// Simulated GoPiGo3 board
//
// Answers frames the way the firmware does, with simple motor dynamics: each
// encoder read moves a motor a fixed number of ticks toward its position target
// (or by a fraction of its speed target in velocity mode). Used when no hardware
// is attached and as the scripted transport in tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::TransportError;
use super::protocol::Frame;
use super::registers::{
    GroveLevel, GroveMask, GroveType, LONGEST_SPI_TRANSFER, MOTOR_FLOAT, MessageType, Motor,
    VALID_RESPONSE,
};
use super::transport::Transport;

use super::registers::MessageType as M;

/// Default encoder movement per encoder read (ticks)
pub const DEFAULT_STEP_TICKS: i32 = 20;

/// Frames kept for inspection; older ones are dropped
pub const FRAME_HISTORY: usize = 4096;

#[derive(Debug, Clone, Copy, Default)]
struct SimMotor {
    encoder: i32,
    target: Option<i32>,
    velocity: i16,
    power: i8,
}

impl SimMotor {
    fn advance(&mut self, step: i32) {
        if let Some(target) = self.target {
            let remaining = target - self.encoder;
            self.encoder += remaining.clamp(-step, step);
        } else {
            self.encoder += self.velocity as i32 / 10;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SimPin {
    status: u8,
    level: u8,
    analog: u16,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimPort {
    grove_type: u8,
    value: [u8; 4],
}

#[derive(Debug)]
struct SimState {
    frames: VecDeque<Frame>,
    motors: [SimMotor; 2],
    step_ticks: i32,
    stalled: bool,
    responding: bool,
    encoder_reads_left: Option<usize>,
    manufacturer: String,
    board: String,
    firmware: u32,
    hardware: u32,
    id: [u8; 16],
    battery_mv: u16,
    rail_5v_mv: u16,
    pins: [SimPin; 4],
    ports: [SimPort; 2],
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            frames: VecDeque::with_capacity(FRAME_HISTORY),
            motors: [SimMotor::default(); 2],
            step_ticks: DEFAULT_STEP_TICKS,
            stalled: false,
            responding: true,
            encoder_reads_left: None,
            manufacturer: "Dexter Industries".to_string(),
            board: "GoPiGo3".to_string(),
            firmware: 3_004,
            hardware: 3_001_000,
            id: [
                0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
                0x09, 0x0A, 0x0B,
            ],
            battery_mv: 11_800,
            rail_5v_mv: 5_020,
            pins: [SimPin {
                status: 1,
                level: 0,
                analog: 0,
            }; 4],
            ports: [SimPort::default(); 2],
        }
    }
}

fn motor_indexes(mask: u8) -> impl Iterator<Item = usize> {
    (0..2).filter(move |i| mask & (1 << i) != 0)
}

fn pin_indexes(mask: u8) -> impl Iterator<Item = usize> {
    (0..4).filter(move |i| mask & (1 << i) != 0)
}

fn pin_index(pin: GroveMask) -> usize {
    pin.bits().trailing_zeros() as usize & 0x03
}

impl SimState {
    fn record(&mut self, frame: &Frame) {
        if self.frames.len() == FRAME_HISTORY {
            self.frames.pop_front();
        }
        self.frames.push_back(frame.clone());
    }

    fn reply(&mut self, frame: &Frame) -> Vec<u8> {
        let mut reply = vec![0u8; LONGEST_SPI_TRANSFER];
        if !self.responding {
            return reply;
        }
        reply[3] = VALID_RESPONSE;

        let payload = frame.payload();
        let Some(message_type) = frame.message_type() else {
            return reply;
        };

        match message_type {
            M::GetManufacturer => copy_str(&mut reply, &self.manufacturer),
            M::GetName => copy_str(&mut reply, &self.board),
            M::GetFirmwareVersion => reply[4..8].copy_from_slice(&self.firmware.to_be_bytes()),
            M::GetHardwareVersion => reply[4..8].copy_from_slice(&self.hardware.to_be_bytes()),
            M::GetId => reply[4..20].copy_from_slice(&self.id),
            M::GetVoltageVcc => reply[4..6].copy_from_slice(&self.battery_mv.to_be_bytes()),
            M::GetVoltage5v => reply[4..6].copy_from_slice(&self.rail_5v_mv.to_be_bytes()),

            M::SetMotorPwm => {
                let power = payload[1] as i8;
                for i in motor_indexes(payload[0]) {
                    let motor = &mut self.motors[i];
                    motor.power = power;
                    if power == 0 || power == MOTOR_FLOAT {
                        motor.target = None;
                        motor.velocity = 0;
                    }
                }
            }
            M::SetMotorPosition => {
                let target = i32::from_be_bytes([payload[1], payload[2], payload[3], payload[4]]);
                for i in motor_indexes(payload[0]) {
                    self.motors[i].target = Some(target);
                }
            }
            M::SetMotorDps => {
                let velocity = i16::from_be_bytes([payload[1], payload[2]]);
                for i in motor_indexes(payload[0]) {
                    self.motors[i].target = None;
                    self.motors[i].velocity = velocity;
                }
            }
            M::OffsetMotorEncoder => {
                let offset = i32::from_be_bytes([payload[1], payload[2], payload[3], payload[4]]);
                for i in motor_indexes(payload[0]) {
                    let motor = &mut self.motors[i];
                    motor.encoder -= offset;
                    motor.target = motor.target.map(|t| t - offset);
                }
            }
            M::GetMotorEncoderLeft | M::GetMotorEncoderRight => {
                let i = if message_type == M::GetMotorEncoderLeft { 0 } else { 1 };
                if let Some(left) = self.encoder_reads_left.as_mut() {
                    if *left == 0 {
                        reply[3] = 0;
                        return reply;
                    }
                    *left -= 1;
                }
                if !self.stalled {
                    self.motors[i].advance(self.step_ticks);
                }
                reply[4..8].copy_from_slice(&self.motors[i].encoder.to_be_bytes());
            }
            M::GetMotorStatusLeft | M::GetMotorStatusRight => {
                let motor = if message_type == M::GetMotorStatusLeft {
                    self.motors[0]
                } else {
                    self.motors[1]
                };
                reply[4] = 0;
                reply[5] = motor.power as u8;
                reply[6..10].copy_from_slice(&motor.encoder.to_be_bytes());
                reply[10..12].copy_from_slice(&motor.velocity.to_be_bytes());
            }

            M::SetGroveType => {
                for i in GroveMask(payload[0]).ports() {
                    self.ports[i].grove_type = payload[1];
                }
            }
            M::GetGroveValue1 | M::GetGroveValue2 => {
                let port = self.ports[(message_type as u8 - M::GetGroveValue1 as u8) as usize];
                let typed = [GroveType::IrDiRemote, GroveType::IrEv3Remote, GroveType::Ultrasonic]
                    .iter()
                    .any(|t| *t as u8 == port.grove_type);
                if typed {
                    reply[4] = port.grove_type;
                    reply[5..9].copy_from_slice(&port.value);
                } else {
                    reply[4] = port.value[0];
                }
            }
            M::SetGroveState => {
                for i in pin_indexes(payload[0]) {
                    self.pins[i].level = payload[1];
                }
            }
            M::GetGroveState1_1 | M::GetGroveState1_2 | M::GetGroveState2_1 | M::GetGroveState2_2 => {
                let pin = self.pins[(message_type as u8 - M::GetGroveState1_1 as u8) as usize];
                reply[4] = pin.status;
                reply[5] = pin.level;
            }
            M::GetGroveAnalog1_1 | M::GetGroveAnalog1_2 | M::GetGroveAnalog2_1 | M::GetGroveAnalog2_2 => {
                let pin = self.pins[(message_type as u8 - M::GetGroveAnalog1_1 as u8) as usize];
                reply[4] = pin.status;
                reply[5..7].copy_from_slice(&pin.analog.to_be_bytes());
            }
            M::GetGroveVoltage1_1 | M::GetGroveVoltage1_2 | M::GetGroveVoltage2_1 | M::GetGroveVoltage2_2 => {
                let pin = self.pins[(message_type as u8 - M::GetGroveVoltage1_1 as u8) as usize];
                // 12-bit ADC over a 5V reference
                let mv = (pin.analog as u32 * 5000 / 4095) as u16;
                reply[4] = pin.status;
                reply[5..7].copy_from_slice(&mv.to_be_bytes());
            }

            _ => {}
        }

        reply
    }
}

fn copy_str(reply: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(20);
    reply[4..4 + len].copy_from_slice(&bytes[..len]);
}

/// In-memory GoPiGo3. Clones share the same board.
#[derive(Clone, Default)]
pub struct SimulatedBoard {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Frames received so far, oldest first (at most `FRAME_HISTORY`)
    pub fn frames(&self) -> Vec<Frame> {
        self.state().frames.iter().cloned().collect()
    }

    /// Frames of one message type, in order
    pub fn frames_of(&self, message_type: MessageType) -> Vec<Frame> {
        self.state()
            .frames
            .iter()
            .filter(|f| f.message_type() == Some(message_type))
            .cloned()
            .collect()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.state().frames.back().cloned()
    }

    pub fn clear_frames(&self) {
        self.state().frames.clear();
    }

    fn motor_index(motor: Motor) -> usize {
        if motor == Motor::Right { 1 } else { 0 }
    }

    pub fn set_encoder_ticks(&self, motor: Motor, ticks: i32) {
        self.state().motors[Self::motor_index(motor)].encoder = ticks;
    }

    pub fn encoder_ticks(&self, motor: Motor) -> i32 {
        self.state().motors[Self::motor_index(motor)].encoder
    }

    /// Position target last commanded for a motor (ticks)
    pub fn target_ticks(&self, motor: Motor) -> Option<i32> {
        self.state().motors[Self::motor_index(motor)].target
    }

    /// Ticks a motor moves per encoder read
    pub fn set_step_ticks(&self, step: i32) {
        self.state().step_ticks = step;
    }

    /// Stop the motors from moving no matter what they are commanded
    pub fn set_stalled(&self, stalled: bool) {
        self.state().stalled = stalled;
    }

    /// When false, replies carry no sentinel
    pub fn set_responding(&self, responding: bool) {
        self.state().responding = responding;
    }

    /// Answer `reads` more encoder reads, then reply without a sentinel
    pub fn fail_encoder_reads_after(&self, reads: usize) {
        self.state().encoder_reads_left = Some(reads);
    }

    pub fn set_board_name(&self, name: &str) {
        self.state().board = name.to_string();
    }

    pub fn set_battery_mv(&self, mv: u16) {
        self.state().battery_mv = mv;
    }

    /// Set what a grove input pin reads: digital level and 12-bit analog value
    pub fn set_grove_input(&self, pin: GroveMask, level: u8, analog: u16) {
        let mut state = self.state();
        let p = &mut state.pins[pin_index(pin)];
        p.level = level;
        p.analog = analog;
    }

    /// Set the in-band status byte returned for a grove pin
    pub fn set_grove_status(&self, pin: GroveMask, status: u8) {
        self.state().pins[pin_index(pin)].status = status;
    }

    /// Set the bytes a grove port value read returns (up to 4, big-endian)
    pub fn set_grove_value(&self, port: GroveMask, data: &[u8]) {
        let mut state = self.state();
        let len = data.len().min(4);
        for i in port.ports() {
            let value = &mut state.ports[i].value;
            *value = [0; 4];
            value[..len].copy_from_slice(&data[..len]);
        }
    }

    /// Change the device type the board reports for a port
    pub fn set_grove_port_type(&self, port: GroveMask, grove_type: GroveType) {
        let mut state = self.state();
        for i in port.ports() {
            state.ports[i].grove_type = grove_type as u8;
        }
    }

    pub fn grove_output(&self, pin: GroveMask) -> GroveLevel {
        if self.state().pins[pin_index(pin)].level == 0 {
            GroveLevel::Low
        } else {
            GroveLevel::High
        }
    }
}

impl Transport for SimulatedBoard {
    fn transfer(&mut self, frame: &Frame) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock().map_err(|_| TransportError::Poisoned)?;
        state.record(frame);
        Ok(state.reply(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::GoPiGo3;

    #[test]
    fn test_frame_history_is_bounded() {
        let sim = SimulatedBoard::new();
        let mut gpg = GoPiGo3::new(sim.clone());
        for _ in 0..FRAME_HISTORY + 500 {
            gpg.get_voltage_battery().unwrap();
        }
        gpg.set_led(0x01, 1, 2, 3).unwrap();

        let frames = sim.frames();
        assert_eq!(frames.len(), FRAME_HISTORY);
        assert_eq!(frames[0].message_type(), Some(MessageType::GetVoltageVcc));
        assert_eq!(
            sim.last_frame().unwrap().message_type(),
            Some(MessageType::SetLed)
        );
    }
}
