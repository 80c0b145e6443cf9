// Unit conversion between physical units and GoPiGo3 register units
//
// Wheel geometry is runtime state: every conversion reads the current values so
// that a geometry update takes effect on the next call.

use std::f64::consts::PI;

use super::error::BoardError;

/// Wheel diameter of a stock GoPiGo3 (mm)
pub const DEFAULT_WHEEL_DIAMETER: f64 = 66.5;
/// Distance from left wheel to right wheel (mm)
pub const DEFAULT_WHEEL_BASE_WIDTH: f64 = 117.0;

/// Motor gear ratio
pub const MOTOR_GEAR_RATIO: f64 = 120.0;
/// Encoder ticks per motor rotation (number of magnet positions)
pub const ENCODER_TICKS_PER_ROTATION: f64 = 6.0;

/// PWM duty register range (0.1% resolution)
pub const PWM_DUTY_MAX: u16 = 1000;
/// Grove PWM frequency range (Hz)
pub const PWM_FREQ_MIN: i32 = 3;
pub const PWM_FREQ_MAX: i32 = 48_000;

/// Servo pulse width span covering 0..180 degrees (us)
const SERVO_PULSE_WIDTH_RANGE: i32 = 1850;
const SERVO_PULSE_CENTER: i32 = 1500;

/// Wheel geometry and drivetrain constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotGeometry {
    wheel_diameter: f64,
    wheel_base_width: f64,
    wheel_circumference: f64,
    wheel_base_circumference: f64,
    gear_ratio: f64,
    ticks_per_rotation: f64,
}

impl Default for RobotGeometry {
    fn default() -> Self {
        Self::with_drivetrain(
            DEFAULT_WHEEL_DIAMETER,
            DEFAULT_WHEEL_BASE_WIDTH,
            MOTOR_GEAR_RATIO,
            ENCODER_TICKS_PER_ROTATION,
        )
    }
}

impl RobotGeometry {
    /// Create geometry with the stock drivetrain
    pub fn new(wheel_diameter: f64, wheel_base_width: f64) -> Result<Self, BoardError> {
        let mut geometry = Self::default();
        geometry.set_constants(wheel_diameter, wheel_base_width)?;
        Ok(geometry)
    }

    fn with_drivetrain(
        wheel_diameter: f64,
        wheel_base_width: f64,
        gear_ratio: f64,
        ticks_per_rotation: f64,
    ) -> Self {
        Self {
            wheel_diameter,
            wheel_base_width,
            wheel_circumference: wheel_diameter * PI,
            wheel_base_circumference: wheel_base_width * PI,
            gear_ratio,
            ticks_per_rotation,
        }
    }

    /// Replace wheel diameter and base width, recomputing both circumferences.
    ///
    /// Both values must be positive and finite, otherwise the geometry is left
    /// unchanged.
    pub fn set_constants(
        &mut self,
        wheel_diameter: f64,
        wheel_base_width: f64,
    ) -> Result<(), BoardError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(wheel_diameter) || !valid(wheel_base_width) {
            return Err(BoardError::InvalidGeometry {
                diameter: wheel_diameter,
                width: wheel_base_width,
            });
        }

        *self = Self::with_drivetrain(
            wheel_diameter,
            wheel_base_width,
            self.gear_ratio,
            self.ticks_per_rotation,
        );
        Ok(())
    }

    /// (wheel diameter, wheel base width) in mm
    pub fn constants(&self) -> (f64, f64) {
        (self.wheel_diameter, self.wheel_base_width)
    }

    pub fn wheel_circumference(&self) -> f64 {
        self.wheel_circumference
    }

    pub fn wheel_base_circumference(&self) -> f64 {
        self.wheel_base_circumference
    }

    /// Encoder ticks per output shaft degree
    pub fn ticks_per_degree(&self) -> f64 {
        self.gear_ratio * self.ticks_per_rotation / 360.0
    }

    /// Wheel degrees to encoder ticks (truncating)
    pub fn degrees_to_ticks(&self, degrees: f64) -> i32 {
        (degrees * self.ticks_per_degree()) as i32
    }

    /// Encoder ticks to wheel degrees (truncating toward zero)
    pub fn ticks_to_degrees(&self, ticks: i32) -> i32 {
        (ticks as f64 / self.ticks_per_degree()) as i32
    }

    /// Degrees per second to the 16-bit tick rate register, saturating
    pub fn dps_to_ticks(&self, dps: f64) -> i16 {
        let ticks = (dps * self.ticks_per_degree()) as i32;
        ticks.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    /// Distance travelled by a wheel (mm) to wheel rotation (degrees)
    pub fn mm_to_wheel_degrees(&self, distance_mm: f64) -> f64 {
        distance_mm * 360.0 / self.wheel_circumference
    }

    pub fn cm_to_wheel_degrees(&self, distance_cm: f64) -> f64 {
        self.mm_to_wheel_degrees(distance_cm * 10.0)
    }

    /// Wheel rotation (degrees) to distance travelled (mm)
    pub fn wheel_degrees_to_mm(&self, degrees: f64) -> f64 {
        degrees / 360.0 * self.wheel_circumference
    }

    /// Distance each wheel travels (mm) to spin the robot in place by `turn_degrees`
    pub fn turn_degrees_to_wheel_travel(&self, turn_degrees: f64) -> f64 {
        self.wheel_base_circumference * turn_degrees / 360.0
    }

    /// Wheel rotation (degrees) needed to spin the robot in place by `turn_degrees`
    pub fn turn_degrees_to_wheel_degrees(&self, turn_degrees: f64) -> f64 {
        self.mm_to_wheel_degrees(self.turn_degrees_to_wheel_travel(turn_degrees))
    }
}

/// PWM duty in percent to the 0..1000 register value
pub fn duty_to_register(percent: f64) -> u16 {
    if percent.is_nan() {
        return 0;
    }
    (percent.clamp(0.0, 100.0) * 10.0).round() as u16
}

/// Clamp a PWM frequency to what the board supports
pub fn freq_clamp(hz: i32) -> u16 {
    hz.clamp(PWM_FREQ_MIN, PWM_FREQ_MAX) as u16
}

/// Clamp a motor power percentage to the signed 8-bit register
pub fn clamp_power(power: i32) -> i8 {
    power.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// Clamp an LED colour channel
pub fn clamp_color(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Servo angle (0..180 degrees) to pulse width in microseconds
pub fn servo_degrees_to_pulse(degrees: f64) -> u16 {
    let degrees = if degrees.is_nan() {
        0.0
    } else {
        degrees.clamp(0.0, 180.0)
    };
    let step = (SERVO_PULSE_WIDTH_RANGE / 180) as f64;
    let pulse = (SERVO_PULSE_CENTER - SERVO_PULSE_WIDTH_RANGE / 2) as f64 + step * degrees;
    pulse as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_round_trip() {
        let geometry = RobotGeometry::default();
        assert_eq!(geometry.ticks_per_degree(), 2.0);
        assert_eq!(geometry.degrees_to_ticks(360.0), 720);
        assert_eq!(geometry.ticks_to_degrees(720), 360);

        // Truncation toward zero
        assert_eq!(geometry.ticks_to_degrees(721), 360);
        assert_eq!(geometry.ticks_to_degrees(-3), -1);
        assert_eq!(geometry.degrees_to_ticks(-10.7), -21);
    }

    #[test]
    fn test_dps_saturates() {
        let geometry = RobotGeometry::default();
        assert_eq!(geometry.dps_to_ticks(300.0), 600);
        assert_eq!(geometry.dps_to_ticks(100_000.0), i16::MAX);
        assert_eq!(geometry.dps_to_ticks(-100_000.0), i16::MIN);
    }

    #[test]
    fn test_duty_to_register() {
        assert_eq!(duty_to_register(-10.0), 0);
        assert_eq!(duty_to_register(150.0), PWM_DUTY_MAX);
        assert_eq!(duty_to_register(50.0), 500);
        assert_eq!(duty_to_register(12.34), 123);

        let mut last = 0;
        for pct in -20..=120 {
            let reg = duty_to_register(pct as f64);
            assert!(reg >= last);
            last = reg;
        }
    }

    #[test]
    fn test_freq_clamp() {
        assert_eq!(freq_clamp(1), 3);
        assert_eq!(freq_clamp(100_000), 48_000);
        assert_eq!(freq_clamp(1000), 1000);
    }

    #[test]
    fn test_distance_conversion_uses_current_geometry() {
        let mut geometry = RobotGeometry::default();
        let expected = 600.0 * 360.0 / (66.5 * PI);
        assert!((geometry.cm_to_wheel_degrees(60.0) - expected).abs() < 1e-9);

        geometry.set_constants(100.0, 200.0).unwrap();
        assert!((geometry.cm_to_wheel_degrees(60.0) - 600.0 * 360.0 / (100.0 * PI)).abs() < 1e-9);
        // A 360 degree spin moves each wheel one wheel base circumference
        assert!((geometry.turn_degrees_to_wheel_travel(360.0) - 200.0 * PI).abs() < 1e-9);
        assert!((geometry.turn_degrees_to_wheel_degrees(90.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let mut geometry = RobotGeometry::default();
        assert!(geometry.set_constants(0.0, 117.0).is_err());
        assert!(geometry.set_constants(66.5, -1.0).is_err());
        assert!(geometry.set_constants(f64::NAN, 117.0).is_err());
        assert_eq!(geometry.constants(), (66.5, 117.0));
        assert!(RobotGeometry::new(70.0, 120.0).is_ok());
    }

    #[test]
    fn test_servo_pulse() {
        assert_eq!(servo_degrees_to_pulse(0.0), 575);
        assert_eq!(servo_degrees_to_pulse(90.0), 1475);
        assert_eq!(servo_degrees_to_pulse(500.0), 2375);
        assert_eq!(servo_degrees_to_pulse(-5.0), 575);
    }
}
