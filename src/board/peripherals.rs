// Devices plugged into the GoPiGo3: grove sensors and actuators, servos, and the
// on-board eyes and blinkers.
//
// Each wrapper owns a `RegisterChannel`. Pass `&mut GoPiGo3<_>` to borrow the
// dispatcher, or a `GoPiGo3<SharedTransport<_>>` to give the device its own handle.

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::driver::{GoPiGo3, GroveValue};
use super::error::{BoardError, ProtocolError, Result};
use super::registers::{GroveLevel, GroveMask, GroveMode, GroveType, led, servo};
use super::transport::Transport;
use super::units;

/// Register operations the peripheral wrappers need from the board
pub trait RegisterChannel {
    fn set_grove_type(&mut self, port: GroveMask, grove_type: GroveType) -> Result<()>;
    fn set_grove_mode(&mut self, pins: GroveMask, mode: GroveMode) -> Result<()>;
    fn set_grove_state(&mut self, pins: GroveMask, level: GroveLevel) -> Result<()>;
    fn set_grove_pwm_duty(&mut self, pins: GroveMask, duty: f64) -> Result<()>;
    fn set_grove_pwm_frequency(&mut self, port: GroveMask, hz: i32) -> Result<()>;
    fn get_grove_state(&mut self, pin: GroveMask) -> Result<u8>;
    fn get_grove_analog(&mut self, pin: GroveMask) -> Result<u16>;
    fn get_grove_value(&mut self, port: GroveMask) -> Result<GroveValue>;
    fn set_servo(&mut self, servo: u8, pulse_us: u16) -> Result<()>;
    fn set_led(&mut self, led: i32, red: i32, green: i32, blue: i32) -> Result<()>;
}

impl<T: Transport> RegisterChannel for GoPiGo3<T> {
    fn set_grove_type(&mut self, port: GroveMask, grove_type: GroveType) -> Result<()> {
        GoPiGo3::set_grove_type(self, port, grove_type)
    }

    fn set_grove_mode(&mut self, pins: GroveMask, mode: GroveMode) -> Result<()> {
        GoPiGo3::set_grove_mode(self, pins, mode)
    }

    fn set_grove_state(&mut self, pins: GroveMask, level: GroveLevel) -> Result<()> {
        GoPiGo3::set_grove_state(self, pins, level)
    }

    fn set_grove_pwm_duty(&mut self, pins: GroveMask, duty: f64) -> Result<()> {
        GoPiGo3::set_grove_pwm_duty(self, pins, duty)
    }

    fn set_grove_pwm_frequency(&mut self, port: GroveMask, hz: i32) -> Result<()> {
        GoPiGo3::set_grove_pwm_frequency(self, port, hz)
    }

    fn get_grove_state(&mut self, pin: GroveMask) -> Result<u8> {
        GoPiGo3::get_grove_state(self, pin)
    }

    fn get_grove_analog(&mut self, pin: GroveMask) -> Result<u16> {
        GoPiGo3::get_grove_analog(self, pin)
    }

    fn get_grove_value(&mut self, port: GroveMask) -> Result<GroveValue> {
        GoPiGo3::get_grove_value(self, port)
    }

    fn set_servo(&mut self, servo: u8, pulse_us: u16) -> Result<()> {
        GoPiGo3::set_servo(self, servo, pulse_us)
    }

    fn set_led(&mut self, led: i32, red: i32, green: i32, blue: i32) -> Result<()> {
        GoPiGo3::set_led(self, led, red, green, blue)
    }
}

impl<C: RegisterChannel + ?Sized> RegisterChannel for &mut C {
    fn set_grove_type(&mut self, port: GroveMask, grove_type: GroveType) -> Result<()> {
        (**self).set_grove_type(port, grove_type)
    }

    fn set_grove_mode(&mut self, pins: GroveMask, mode: GroveMode) -> Result<()> {
        (**self).set_grove_mode(pins, mode)
    }

    fn set_grove_state(&mut self, pins: GroveMask, level: GroveLevel) -> Result<()> {
        (**self).set_grove_state(pins, level)
    }

    fn set_grove_pwm_duty(&mut self, pins: GroveMask, duty: f64) -> Result<()> {
        (**self).set_grove_pwm_duty(pins, duty)
    }

    fn set_grove_pwm_frequency(&mut self, port: GroveMask, hz: i32) -> Result<()> {
        (**self).set_grove_pwm_frequency(port, hz)
    }

    fn get_grove_state(&mut self, pin: GroveMask) -> Result<u8> {
        (**self).get_grove_state(pin)
    }

    fn get_grove_analog(&mut self, pin: GroveMask) -> Result<u16> {
        (**self).get_grove_analog(pin)
    }

    fn get_grove_value(&mut self, port: GroveMask) -> Result<GroveValue> {
        (**self).get_grove_value(port)
    }

    fn set_servo(&mut self, servo: u8, pulse_us: u16) -> Result<()> {
        (**self).set_servo(servo, pulse_us)
    }

    fn set_led(&mut self, led: i32, red: i32, green: i32, blue: i32) -> Result<()> {
        (**self).set_led(led, red, green, blue)
    }
}

// ============================================================================
// Grove ports
// ============================================================================

/// The two grove connectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrovePort {
    Ad1,
    Ad2,
}

impl GrovePort {
    /// Both pins of the port
    pub fn mask(self) -> GroveMask {
        match self {
            GrovePort::Ad1 => GroveMask::PORT_1,
            GrovePort::Ad2 => GroveMask::PORT_2,
        }
    }

    /// Outer (SIG) pin
    pub fn signal_pin(self) -> GroveMask {
        match self {
            GrovePort::Ad1 => GroveMask::PIN_1_1,
            GrovePort::Ad2 => GroveMask::PIN_2_1,
        }
    }

    /// Inner (NC) pin
    pub fn inner_pin(self) -> GroveMask {
        match self {
            GrovePort::Ad1 => GroveMask::PIN_1_2,
            GrovePort::Ad2 => GroveMask::PIN_2_2,
        }
    }
}

impl fmt::Display for GrovePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrovePort::Ad1 => write!(f, "AD1"),
            GrovePort::Ad2 => write!(f, "AD2"),
        }
    }
}

impl FromStr for GrovePort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AD1" => Ok(GrovePort::Ad1),
            "AD2" => Ok(GrovePort::Ad2),
            other => Err(format!("Unknown grove port: {}", other)),
        }
    }
}

/// How a grove port is configured for the device plugged into it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// 12-bit analog input
    Input,
    DigitalInput,
    /// PWM output
    Output,
    DigitalOutput,
    Ultrasonic,
    Infrared,
}

/// Configure `port` on the board for `mode`
pub fn configure_port<C: RegisterChannel>(channel: &mut C, port: GrovePort, mode: PinMode) -> Result<()> {
    let mask = port.mask();
    debug!("Configuring grove port {} as {:?}", port, mode);
    match mode {
        PinMode::Input => {
            channel.set_grove_type(mask, GroveType::Custom)?;
            channel.set_grove_mode(mask, GroveMode::InputAnalog)
        }
        PinMode::DigitalInput => {
            channel.set_grove_type(mask, GroveType::Custom)?;
            channel.set_grove_mode(mask, GroveMode::InputDigital)
        }
        PinMode::Output => {
            channel.set_grove_type(mask, GroveType::Custom)?;
            channel.set_grove_mode(mask, GroveMode::OutputPwm)
        }
        PinMode::DigitalOutput => {
            channel.set_grove_type(mask, GroveType::Custom)?;
            channel.set_grove_mode(mask, GroveMode::OutputDigital)
        }
        PinMode::Ultrasonic => channel.set_grove_type(mask, GroveType::Ultrasonic),
        PinMode::Infrared => channel.set_grove_type(mask, GroveType::IrDiRemote),
    }
}

/// A device on one pin of a grove port
pub struct GroveDevice<C> {
    channel: C,
    port: GrovePort,
    pin: GroveMask,
    mode: PinMode,
}

impl<C: RegisterChannel> GroveDevice<C> {
    /// Attach to the signal pin of `port` and configure the port
    pub fn new(mut channel: C, port: GrovePort, mode: PinMode) -> Result<Self> {
        configure_port(&mut channel, port, mode)?;
        Ok(Self {
            channel,
            port,
            pin: port.signal_pin(),
            mode,
        })
    }

    /// Re-send the port configuration, e.g. after another process reset the board
    pub fn reconfig_bus(&mut self) -> Result<()> {
        configure_port(&mut self.channel, self.port, self.mode)
    }

    /// Switch between the signal pin (true) and the inner pin (false)
    pub fn use_signal_pin(&mut self, signal: bool) {
        self.pin = if signal {
            self.port.signal_pin()
        } else {
            self.port.inner_pin()
        };
    }

    pub fn port(&self) -> GrovePort {
        self.port
    }

    pub fn pin(&self) -> GroveMask {
        self.pin
    }

    pub fn mode(&self) -> PinMode {
        self.mode
    }

    pub fn into_inner(self) -> C {
        self.channel
    }
}

// ============================================================================
// Sensors
// ============================================================================

/// Full scale of the 12-bit grove ADC
pub const ANALOG_MAX: u16 = 4096;
/// Full scale used for a loudness sensor
pub const LOUDNESS_MAX: u16 = 1024;

/// Analog input, or PWM output when configured as `PinMode::Output`
pub struct AnalogSensor<C> {
    device: GroveDevice<C>,
    max_value: u16,
    value: u16,
}

impl<C: RegisterChannel> AnalogSensor<C> {
    pub fn new(channel: C, port: GrovePort) -> Result<Self> {
        Self::with_mode(channel, port, PinMode::Input)
    }

    pub fn with_mode(channel: C, port: GrovePort, mode: PinMode) -> Result<Self> {
        Ok(Self {
            device: GroveDevice::new(channel, port, mode)?,
            max_value: ANALOG_MAX,
            value: 0,
        })
    }

    /// Raw 12-bit reading
    pub fn read(&mut self) -> Result<u16> {
        let pin = self.device.pin;
        self.value = self.device.channel.get_grove_analog(pin)?;
        Ok(self.value)
    }

    /// Reading, or -1 when the read failed
    pub fn read_or_sentinel(&mut self) -> i32 {
        match self.read() {
            Ok(value) => value as i32,
            Err(e) => {
                warn!("Analog read on {} failed: {}", self.device.port, e);
                -1
            }
        }
    }

    /// Reading as a percentage of full scale, capped at 100
    pub fn percent_read(&mut self) -> Result<u8> {
        let reading = self.read()? as u32;
        let percent = reading * 100 / self.max_value as u32;
        Ok(percent.min(100) as u8)
    }

    /// Set PWM duty cycle in percent
    pub fn write(&mut self, power: f64) -> Result<()> {
        let pin = self.device.pin;
        self.value = units::duty_to_register(power) / 10;
        self.device.channel.set_grove_pwm_duty(pin, power)
    }

    /// Set PWM frequency for the whole port
    pub fn write_freq(&mut self, hz: i32) -> Result<()> {
        let mask = self.device.port.mask();
        self.device.channel.set_grove_pwm_frequency(mask, hz)
    }

    /// Last value read or written
    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn device(&mut self) -> &mut GroveDevice<C> {
        &mut self.device
    }
}

/// Digital input
pub struct DigitalSensor<C> {
    device: GroveDevice<C>,
}

impl<C: RegisterChannel> DigitalSensor<C> {
    pub fn new(channel: C, port: GrovePort) -> Result<Self> {
        Ok(Self {
            device: GroveDevice::new(channel, port, PinMode::DigitalInput)?,
        })
    }

    /// 0 or 1
    pub fn read(&mut self) -> Result<u8> {
        let pin = self.device.pin;
        self.device.channel.get_grove_state(pin)
    }

    /// Reading, or -1 when the read failed
    pub fn read_or_sentinel(&mut self) -> i32 {
        match self.read() {
            Ok(value) => value as i32,
            Err(e) => {
                warn!("Digital read on {} failed: {}", self.device.port, e);
                -1
            }
        }
    }

    pub fn device(&mut self) -> &mut GroveDevice<C> {
        &mut self.device
    }
}

/// Grove button
pub struct ButtonSensor<C> {
    sensor: DigitalSensor<C>,
}

impl<C: RegisterChannel> ButtonSensor<C> {
    pub fn new(channel: C, port: GrovePort) -> Result<Self> {
        Ok(Self {
            sensor: DigitalSensor::new(channel, port)?,
        })
    }

    pub fn is_button_pressed(&mut self) -> Result<bool> {
        Ok(self.sensor.read()? == 1)
    }
}

/// Grove loudness sensor, scaled to its usable range
pub struct LoudnessSensor<C> {
    sensor: AnalogSensor<C>,
}

impl<C: RegisterChannel> LoudnessSensor<C> {
    pub fn new(channel: C, port: GrovePort) -> Result<Self> {
        let mut sensor = AnalogSensor::new(channel, port)?;
        sensor.max_value = LOUDNESS_MAX;
        Ok(Self { sensor })
    }

    pub fn read(&mut self) -> Result<u16> {
        self.sensor.read()
    }

    pub fn percent_read(&mut self) -> Result<u8> {
        self.sensor.percent_read()
    }
}

/// Closest distance the ultrasonic sensor measures reliably (mm)
pub const ULTRASONIC_MIN_MM: u16 = 15;
/// Farthest distance the ultrasonic sensor measures reliably (mm)
pub const ULTRASONIC_MAX_MM: u16 = 4300;
/// Reported when nothing is in range
pub const NOTHING_IN_RANGE_MM: u16 = 5010;

const ULTRASONIC_SAMPLES: usize = 3;
const ULTRASONIC_MAX_SKIPS: usize = 5;
const ULTRASONIC_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Grove ultrasonic ranger
pub struct UltraSonicSensor<C> {
    device: GroveDevice<C>,
    safe_distance_mm: u16,
}

impl<C: RegisterChannel> UltraSonicSensor<C> {
    pub fn new(channel: C, port: GrovePort) -> Result<Self> {
        Ok(Self {
            device: GroveDevice::new(channel, port, PinMode::Ultrasonic)?,
            safe_distance_mm: 500,
        })
    }

    fn sample(&mut self) -> Result<u16> {
        let mask = self.device.port.mask();
        match self.device.channel.get_grove_value(mask)? {
            GroveValue::DistanceMm(mm) => Ok(mm),
            other => {
                warn!("Unexpected ultrasonic reading {:?}", other);
                Ok(0)
            }
        }
    }

    /// Average of three in-range readings (mm).
    ///
    /// Returns `NOTHING_IN_RANGE_MM` after five out-of-range or failed samples,
    /// or 0 when the sensor never answered. Transport failures are returned as errors.
    pub fn read_mm(&mut self) -> Result<u16> {
        let mut readings: Vec<u16> = Vec::with_capacity(ULTRASONIC_SAMPLES);
        let mut skips = 0;
        let mut last = 0;

        while readings.len() < ULTRASONIC_SAMPLES && skips < ULTRASONIC_MAX_SKIPS {
            match self.sample() {
                Ok(mm) => last = mm,
                Err(BoardError::Transport(e)) => return Err(e.into()),
                Err(BoardError::Protocol(ProtocolError::NothingInRange)) => {
                    last = NOTHING_IN_RANGE_MM;
                    thread::sleep(ULTRASONIC_RETRY_DELAY);
                }
                Err(e) => {
                    debug!("Ultrasonic sample on {} failed: {}", self.device.port, e);
                    skips += 1;
                    thread::sleep(ULTRASONIC_RETRY_DELAY);
                    continue;
                }
            }

            if (ULTRASONIC_MIN_MM..=ULTRASONIC_MAX_MM).contains(&last) {
                readings.push(last);
            } else {
                skips += 1;
            }
        }

        if readings.len() < ULTRASONIC_SAMPLES {
            return Ok(if last == 0 { 0 } else { NOTHING_IN_RANGE_MM });
        }
        let sum: u32 = readings.iter().map(|&mm| mm as u32).sum();
        Ok((sum / readings.len() as u32) as u16)
    }

    /// Distance in centimetres, rounded
    pub fn read(&mut self) -> Result<u16> {
        let mm = self.read_mm()?;
        if (ULTRASONIC_MIN_MM..=NOTHING_IN_RANGE_MM).contains(&mm) {
            return Ok((mm as f64 / 10.0).round() as u16);
        }
        Ok(mm)
    }

    /// Distance in inches, one decimal
    pub fn read_inches(&mut self) -> Result<f64> {
        let cm = self.read()? as f64;
        Ok((cm / 2.54 * 10.0).round() / 10.0)
    }

    pub fn set_safe_distance(&mut self, mm: u16) {
        self.safe_distance_mm = mm;
    }

    pub fn safe_distance(&self) -> u16 {
        self.safe_distance_mm
    }

    /// True when a single reading is closer than the safe distance
    pub fn is_too_close(&mut self) -> Result<bool> {
        match self.sample() {
            Ok(mm) => Ok(mm < self.safe_distance_mm),
            Err(BoardError::Transport(e)) => Err(e.into()),
            Err(e) => {
                warn!("Invalid ultrasonic reading: {}", e);
                Ok(false)
            }
        }
    }

    pub fn device(&mut self) -> &mut GroveDevice<C> {
        &mut self.device
    }
}

/// Keys of the IR remote, indexed by code - 1
pub const REMOTE_KEYCODES: [&str; 17] = [
    "up", "left", "ok", "right", "down", "1", "2", "3", "4", "5", "6", "7", "8", "9", "*", "0", "#",
];

/// Infrared receiver for the GoPiGo remote
pub struct Remote<C> {
    device: GroveDevice<C>,
}

impl<C: RegisterChannel> Remote<C> {
    pub fn new(channel: C, port: GrovePort) -> Result<Self> {
        Ok(Self {
            device: GroveDevice::new(channel, port, PinMode::Infrared)?,
        })
    }

    /// Code of the key being pressed, 0 when none
    pub fn read(&mut self) -> Result<u8> {
        let mask = self.device.port.mask();
        match self.device.channel.get_grove_value(mask)? {
            GroveValue::IrRemote(code) | GroveValue::Raw(code) => Ok(code),
            other => {
                warn!("Unexpected remote reading {:?}", other);
                Ok(0)
            }
        }
    }

    /// Reading, or -1 when the read failed
    pub fn read_or_sentinel(&mut self) -> i32 {
        match self.read() {
            Ok(code) => code as i32,
            Err(e) => {
                warn!("Remote read on {} failed: {}", self.device.port, e);
                -1
            }
        }
    }

    /// Symbol of the pressed key, empty when nothing valid was read
    pub fn get_remote_code(&mut self) -> String {
        match self.read_or_sentinel() {
            code @ 1..=17 => REMOTE_KEYCODES[code as usize - 1].to_string(),
            _ => String::new(),
        }
    }

    pub fn device(&mut self) -> &mut GroveDevice<C> {
        &mut self.device
    }
}

// ============================================================================
// Actuators
// ============================================================================

/// Grove LED on a PWM output
pub struct Led<C> {
    output: AnalogSensor<C>,
}

impl<C: RegisterChannel> Led<C> {
    pub fn new(channel: C, port: GrovePort) -> Result<Self> {
        Ok(Self {
            output: AnalogSensor::with_mode(channel, port, PinMode::Output)?,
        })
    }

    /// Brightness in percent
    pub fn light_on(&mut self, power: f64) -> Result<()> {
        self.output.write(power)
    }

    pub fn light_max(&mut self) -> Result<()> {
        self.light_on(100.0)
    }

    pub fn light_off(&mut self) -> Result<()> {
        self.light_on(0.0)
    }

    pub fn is_on(&self) -> bool {
        self.output.value() > 0
    }

    pub fn is_off(&self) -> bool {
        self.output.value() == 0
    }
}

/// Duty cycle of a sounding buzzer (percent)
pub const BUZZER_POWER: f64 = 50.0;
/// E4
pub const BUZZER_DEFAULT_FREQ: i32 = 329;

/// Grove buzzer on a PWM output
pub struct Buzzer<C> {
    output: AnalogSensor<C>,
    freq: i32,
}

impl<C: RegisterChannel> Buzzer<C> {
    /// Configure the port and start silent
    pub fn new(channel: C, port: GrovePort) -> Result<Self> {
        let mut buzzer = Self {
            output: AnalogSensor::with_mode(channel, port, PinMode::Output)?,
            freq: BUZZER_DEFAULT_FREQ,
        };
        buzzer.sound_off()?;
        Ok(buzzer)
    }

    /// Sound at `freq` Hz. Zero or negative silences the buzzer.
    pub fn sound(&mut self, freq: i32) -> Result<()> {
        if freq <= 0 {
            return self.output.write(0.0);
        }
        self.freq = freq;
        self.output.write_freq(freq)?;
        self.output.write(BUZZER_POWER)
    }

    /// Sound at the last frequency used
    pub fn sound_on(&mut self) -> Result<()> {
        self.sound(self.freq)
    }

    pub fn sound_off(&mut self) -> Result<()> {
        self.sound(0)
    }

    /// Sound `freq` for `duration`, then go silent
    pub fn tone(&mut self, freq: i32, duration: Duration) -> Result<()> {
        self.sound(freq)?;
        thread::sleep(duration);
        self.sound_off()
    }

    pub fn frequency(&self) -> i32 {
        self.freq
    }

    pub fn is_sounding(&self) -> bool {
        self.output.value() > 0
    }
}

/// The two servo connectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoPort {
    Servo1,
    Servo2,
}

impl ServoPort {
    pub fn mask(self) -> u8 {
        match self {
            ServoPort::Servo1 => servo::SERVO_1,
            ServoPort::Servo2 => servo::SERVO_2,
        }
    }
}

pub struct Servo<C> {
    channel: C,
    port: ServoPort,
}

impl<C: RegisterChannel> Servo<C> {
    pub fn new(channel: C, port: ServoPort) -> Self {
        Self { channel, port }
    }

    /// Rotate to `degrees` (clamped to 0..=180)
    pub fn rotate(&mut self, degrees: f64) -> Result<()> {
        let pulse = units::servo_degrees_to_pulse(degrees);
        self.channel.set_servo(self.port.mask(), pulse)
    }

    /// Centre position
    pub fn reset(&mut self) -> Result<()> {
        self.rotate(90.0)
    }

    /// Stop driving the servo so it can be turned by hand
    pub fn disable(&mut self) -> Result<()> {
        self.channel.set_servo(self.port.mask(), 0)
    }
}

// ============================================================================
// Eyes and blinkers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

pub type Rgb = (u8, u8, u8);

/// Turquoise
pub const DEFAULT_EYE_COLOR: Rgb = (0, 255, 255);

/// On-board RGB eyes and red blinkers. Eye colours are remembered so eyes can be
/// closed and reopened.
pub struct StatusLeds<C> {
    channel: C,
    left_eye: Rgb,
    right_eye: Rgb,
}

impl<C: RegisterChannel> StatusLeds<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            left_eye: DEFAULT_EYE_COLOR,
            right_eye: DEFAULT_EYE_COLOR,
        }
    }

    fn blinker_mask(side: Side) -> u8 {
        match side {
            Side::Left => led::BLINKER_LEFT,
            Side::Right => led::BLINKER_RIGHT,
        }
    }

    fn eye_mask(side: Side) -> u8 {
        match side {
            Side::Left => led::EYE_LEFT,
            Side::Right => led::EYE_RIGHT,
        }
    }

    pub fn blinker_on(&mut self, side: Side) -> Result<()> {
        self.channel.set_led(Self::blinker_mask(side) as i32, 255, 0, 0)
    }

    pub fn blinker_off(&mut self, side: Side) -> Result<()> {
        self.channel.set_led(Self::blinker_mask(side) as i32, 0, 0, 0)
    }

    /// Colour used by the next `open_eye`
    pub fn set_eye_color(&mut self, side: Side, color: Rgb) {
        match side {
            Side::Left => self.left_eye = color,
            Side::Right => self.right_eye = color,
        }
    }

    pub fn set_eyes_color(&mut self, color: Rgb) {
        self.left_eye = color;
        self.right_eye = color;
    }

    pub fn eye_color(&self, side: Side) -> Rgb {
        match side {
            Side::Left => self.left_eye,
            Side::Right => self.right_eye,
        }
    }

    pub fn open_eye(&mut self, side: Side) -> Result<()> {
        let (r, g, b) = self.eye_color(side);
        self.channel
            .set_led(Self::eye_mask(side) as i32, r as i32, g as i32, b as i32)
    }

    pub fn close_eye(&mut self, side: Side) -> Result<()> {
        self.channel.set_led(Self::eye_mask(side) as i32, 0, 0, 0)
    }

    pub fn open_eyes(&mut self) -> Result<()> {
        self.open_eye(Side::Left)?;
        self.open_eye(Side::Right)
    }

    pub fn close_eyes(&mut self) -> Result<()> {
        self.close_eye(Side::Left)?;
        self.close_eye(Side::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::registers::MessageType;
    use crate::board::sim::SimulatedBoard;

    fn board() -> (GoPiGo3<SimulatedBoard>, SimulatedBoard) {
        let sim = SimulatedBoard::new();
        (GoPiGo3::new(sim.clone()), sim)
    }

    #[test]
    fn test_port_configuration_frames() {
        let (mut gpg, sim) = board();
        configure_port(&mut gpg, GrovePort::Ad2, PinMode::Input).unwrap();

        let frames = sim.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].message_type(), Some(MessageType::SetGroveType));
        assert_eq!(&frames[0].payload()[..2], &[0x0C, GroveType::Custom as u8]);
        assert_eq!(frames[1].message_type(), Some(MessageType::SetGroveMode));
        assert_eq!(&frames[1].payload()[..2], &[0x0C, GroveMode::InputAnalog as u8]);
        assert_eq!(gpg.grove_type(1), Some(GroveType::Custom));
    }

    #[test]
    fn test_ultrasonic_sets_type_only() {
        let (mut gpg, sim) = board();
        configure_port(&mut gpg, GrovePort::Ad1, PinMode::Ultrasonic).unwrap();
        assert_eq!(sim.frames().len(), 1);
        assert_eq!(gpg.grove_type(0), Some(GroveType::Ultrasonic));
    }

    #[test]
    fn test_ultrasonic_averages_readings() {
        let (mut gpg, sim) = board();
        let mut sensor = UltraSonicSensor::new(&mut gpg, GrovePort::Ad1).unwrap();

        sim.set_grove_value(GroveMask::PORT_1, &427u16.to_be_bytes());
        assert_eq!(sensor.read_mm().unwrap(), 427);
        assert_eq!(sim.frames_of(MessageType::GetGroveValue1).len(), 3);
        assert_eq!(sensor.read().unwrap(), 43);
        assert_eq!(sensor.read_inches().unwrap(), 16.9);

        assert!(sensor.is_too_close().unwrap());
        sensor.set_safe_distance(300);
        assert!(!sensor.is_too_close().unwrap());
    }

    #[test]
    fn test_ultrasonic_out_of_range() {
        let (mut gpg, sim) = board();
        let mut sensor = UltraSonicSensor::new(&mut gpg, GrovePort::Ad2).unwrap();

        sim.set_grove_value(GroveMask::PORT_2, &[0, 1]);
        assert_eq!(sensor.read_mm().unwrap(), NOTHING_IN_RANGE_MM);
        assert_eq!(sensor.read().unwrap(), 501);

        sim.set_grove_value(GroveMask::PORT_2, &[0, 0]);
        assert_eq!(sensor.read_mm().unwrap(), 0);
        assert!(!sensor.is_too_close().unwrap());
    }

    #[test]
    fn test_remote_keys() {
        let (mut gpg, sim) = board();
        let mut remote = Remote::new(&mut gpg, GrovePort::Ad1).unwrap();

        assert_eq!(remote.get_remote_code(), "");
        sim.set_grove_value(GroveMask::PORT_1, &[3]);
        assert_eq!(remote.read().unwrap(), 3);
        assert_eq!(remote.get_remote_code(), "ok");
        sim.set_grove_value(GroveMask::PORT_1, &[17]);
        assert_eq!(remote.get_remote_code(), "#");

        sim.set_grove_port_type(GroveMask::PORT_1, GroveType::Ultrasonic);
        assert_eq!(remote.read_or_sentinel(), -1);
    }

    #[test]
    fn test_button_pressed() {
        let (mut gpg, sim) = board();
        let mut button = ButtonSensor::new(&mut gpg, GrovePort::Ad1).unwrap();

        assert!(!button.is_button_pressed().unwrap());
        sim.set_grove_input(GroveMask::PIN_1_1, 1, 0);
        assert!(button.is_button_pressed().unwrap());
    }

    #[test]
    fn test_analog_sentinel_on_failed_read() {
        let (mut gpg, sim) = board();
        let mut sensor = AnalogSensor::new(&mut gpg, GrovePort::Ad1).unwrap();

        sim.set_grove_input(GroveMask::PIN_1_1, 0, 2048);
        assert_eq!(sensor.read_or_sentinel(), 2048);
        assert_eq!(sensor.percent_read().unwrap(), 50);

        sim.set_grove_status(GroveMask::PIN_1_1, 4);
        assert_eq!(sensor.read_or_sentinel(), -1);
        assert!(sensor.read().is_err());
    }

    #[test]
    fn test_loudness_percent_capped() {
        let (mut gpg, sim) = board();
        let mut sensor = LoudnessSensor::new(&mut gpg, GrovePort::Ad2).unwrap();
        sim.set_grove_input(GroveMask::PIN_2_1, 0, 3000);
        assert_eq!(sensor.percent_read().unwrap(), 100);
        sim.set_grove_input(GroveMask::PIN_2_1, 0, 512);
        assert_eq!(sensor.percent_read().unwrap(), 50);
    }

    #[test]
    fn test_led_on_off() {
        let (mut gpg, sim) = board();
        let mut led = Led::new(&mut gpg, GrovePort::Ad1).unwrap();
        assert!(led.is_off());

        led.light_max().unwrap();
        assert!(led.is_on());
        let duty = sim.frames_of(MessageType::SetGrovePwmDuty);
        assert_eq!(&duty[0].payload()[..3], &[0x01, 0x03, 0xE8]);

        led.light_off().unwrap();
        assert!(led.is_off());
    }

    #[test]
    fn test_buzzer_starts_silent_and_sounds() {
        let (mut gpg, sim) = board();
        let mut buzzer = Buzzer::new(&mut gpg, GrovePort::Ad1).unwrap();
        assert!(!buzzer.is_sounding());
        assert!(sim.frames_of(MessageType::SetGrovePwmFrequency).is_empty());

        buzzer.sound(440).unwrap();
        assert!(buzzer.is_sounding());
        let freq = sim.frames_of(MessageType::SetGrovePwmFrequency);
        assert_eq!(&freq[0].payload()[..3], &[0x03, 0x01, 0xB8]);

        buzzer.sound_off().unwrap();
        assert!(!buzzer.is_sounding());
        assert_eq!(buzzer.frequency(), 440);
    }

    #[test]
    fn test_servo_rotate_and_disable() {
        let (mut gpg, sim) = board();
        let mut servo = Servo::new(&mut gpg, ServoPort::Servo2);
        servo.reset().unwrap();
        assert_eq!(
            &sim.last_frame().unwrap().payload()[..3],
            &[servo::SERVO_2, 0x05, 0xC3]
        );
        servo.disable().unwrap();
        assert_eq!(&sim.last_frame().unwrap().payload()[..3], &[servo::SERVO_2, 0, 0]);
    }

    #[test]
    fn test_eyes_remember_color() {
        let (mut gpg, sim) = board();
        let mut leds = StatusLeds::new(&mut gpg);

        leds.set_eye_color(Side::Left, (10, 20, 30));
        leds.open_eyes().unwrap();
        let frames = sim.frames_of(MessageType::SetLed);
        assert_eq!(&frames[0].payload()[..4], &[led::EYE_LEFT, 10, 20, 30]);
        assert_eq!(&frames[1].payload()[..4], &[led::EYE_RIGHT, 0, 255, 255]);

        leds.close_eye(Side::Left).unwrap();
        assert_eq!(leds.eye_color(Side::Left), (10, 20, 30));

        leds.blinker_on(Side::Right).unwrap();
        assert_eq!(
            &sim.last_frame().unwrap().payload()[..4],
            &[led::BLINKER_RIGHT, 255, 0, 0]
        );
    }

    #[test]
    fn test_grove_port_parse() {
        assert_eq!("ad1".parse::<GrovePort>().unwrap(), GrovePort::Ad1);
        assert!("I2C".parse::<GrovePort>().is_err());
    }
}
