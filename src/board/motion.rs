// Motion controller: distance, turn and orbit moves on top of the dispatcher
//
// A move computes absolute encoder targets, commands both motors to them, and in
// blocking mode polls the encoders until both are inside the tolerance window:
//
//   Issued -> Polling -> Reached        (blocking)
//   Issued -> returned target           (non-blocking, caller polls)

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::driver::GoPiGo3;
use super::error::BoardError;
use super::registers::Motor;
use super::transport::Transport;
use super::units::RobotGeometry;

/// Speed limit applied at start-up (degrees per second)
pub const DEFAULT_SPEED: i32 = 300;
/// Speed used by the continuous drive commands (degrees per second)
pub const NO_LIMIT_SPEED: i32 = 1000;

/// Encoder window around a target that counts as reached (degrees)
pub const TARGET_TOLERANCE_DEGREES: f64 = 5.0;
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

const CM_PER_INCH: f64 = 2.54;

/// Polling behaviour of blocking moves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    pub tolerance_degrees: f64,
    pub poll_interval: Duration,
    /// Give up on a blocking move after this long. `None` polls until the target
    /// is reached, which never happens on a stalled motor.
    pub timeout: Option<Duration>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tolerance_degrees: TARGET_TOLERANCE_DEGREES,
            poll_interval: POLL_INTERVAL,
            timeout: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("Motion target not reached after {elapsed:?} ({polls} polls)")]
    Timeout { elapsed: Duration, polls: u64 },
}

/// Absolute encoder targets of a move, in wheel degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionTarget {
    pub left: f64,
    pub right: f64,
}

/// Units for `read_encoders_average`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Cm,
    Inch,
    Degrees,
}

/// Per-wheel plan of an orbit move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPlan {
    pub fast: Motor,
    pub slow: Motor,
    pub fast_speed: i32,
    pub slow_speed: i32,
    /// Relative wheel travel, direction already applied (degrees)
    pub left_degrees: f64,
    pub right_degrees: f64,
}

/// Split an orbit of `degrees` around a circle of `radius_cm` into per-wheel
/// travel and speed limits.
///
/// Positive degrees turn right, so the left wheel is on the outside and runs
/// fast. The inner wheel's speed is scaled so both wheels finish together.
pub fn plan_orbit(geometry: &RobotGeometry, degrees: f64, radius_cm: f64, speed: i32) -> OrbitPlan {
    let radius_mm = radius_cm * 10.0;

    // Arc length driven by the robot centre
    let drive_distance = std::f64::consts::PI * radius_mm.abs() * degrees.abs() / 180.0;
    // Extra travel added to the outer wheel and taken from the inner one
    let drive_difference = geometry.turn_degrees_to_wheel_travel(degrees);

    let distance_degrees = geometry.mm_to_wheel_degrees(drive_distance);
    let difference_degrees = geometry.mm_to_wheel_degrees(drive_difference);

    let left_target = distance_degrees + difference_degrees;
    let right_target = distance_degrees - difference_degrees;

    let (fast, slow, fast_target, slow_target) = if degrees < 0.0 {
        (Motor::Right, Motor::Left, right_target, left_target)
    } else {
        (Motor::Left, Motor::Right, left_target, right_target)
    };

    let direction = if speed < 0 { -1.0 } else { 1.0 };
    let fast_speed = speed.abs();
    let slow_speed = if fast_target == 0.0 {
        0
    } else {
        (fast_speed as f64 * slow_target / fast_target).abs().floor() as i32
    };

    OrbitPlan {
        fast,
        slow,
        fast_speed,
        slow_speed,
        left_degrees: left_target * direction,
        right_degrees: right_target * direction,
    }
}

/// High-level motion API for the GoPiGo3
pub struct MotionController<T: Transport> {
    gpg: GoPiGo3<T>,
    speed: i32,
    config: MotionConfig,
}

impl<T: Transport> MotionController<T> {
    /// Wrap a dispatcher and apply the default speed limit
    pub fn new(gpg: GoPiGo3<T>) -> Result<Self, BoardError> {
        Self::with_config(gpg, MotionConfig::default())
    }

    pub fn with_config(gpg: GoPiGo3<T>, config: MotionConfig) -> Result<Self, BoardError> {
        let mut controller = Self {
            gpg,
            speed: DEFAULT_SPEED,
            config,
        };
        controller.set_speed(DEFAULT_SPEED)?;
        Ok(controller)
    }

    pub fn driver(&self) -> &GoPiGo3<T> {
        &self.gpg
    }

    pub fn driver_mut(&mut self) -> &mut GoPiGo3<T> {
        &mut self.gpg
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MotionConfig) {
        self.config = config;
    }

    // === Speed ===

    /// Limit both motors to `dps` degrees per second and remember it
    pub fn set_speed(&mut self, dps: i32) -> Result<(), BoardError> {
        self.speed = dps;
        self.gpg.set_motor_limits(Motor::Both, 0, dps as f64)
    }

    /// Last speed set through `set_speed`
    pub fn get_speed(&self) -> i32 {
        self.speed
    }

    pub fn reset_speed(&mut self) -> Result<(), BoardError> {
        self.set_speed(DEFAULT_SPEED)
    }

    // === Continuous drive ===

    pub fn stop(&mut self) -> Result<(), BoardError> {
        self.gpg.set_motor_dps(Motor::Both, 0.0)
    }

    pub fn forward(&mut self) -> Result<(), BoardError> {
        self.gpg.set_motor_dps(Motor::Both, NO_LIMIT_SPEED as f64)
    }

    pub fn backward(&mut self) -> Result<(), BoardError> {
        self.gpg.set_motor_dps(Motor::Both, -NO_LIMIT_SPEED as f64)
    }

    /// Turn left around the stopped left wheel
    pub fn left(&mut self) -> Result<(), BoardError> {
        self.gpg.set_motor_dps(Motor::Right, NO_LIMIT_SPEED as f64)?;
        self.gpg.set_motor_dps(Motor::Left, 0.0)
    }

    /// Turn right around the stopped right wheel
    pub fn right(&mut self) -> Result<(), BoardError> {
        self.gpg.set_motor_dps(Motor::Left, NO_LIMIT_SPEED as f64)?;
        self.gpg.set_motor_dps(Motor::Right, 0.0)
    }

    pub fn spin_left(&mut self) -> Result<(), BoardError> {
        self.gpg.set_motor_dps(Motor::Right, NO_LIMIT_SPEED as f64)?;
        self.gpg.set_motor_dps(Motor::Left, -NO_LIMIT_SPEED as f64)
    }

    pub fn spin_right(&mut self) -> Result<(), BoardError> {
        self.gpg.set_motor_dps(Motor::Left, NO_LIMIT_SPEED as f64)?;
        self.gpg.set_motor_dps(Motor::Right, -NO_LIMIT_SPEED as f64)
    }

    /// Run each motor at a percentage (-100..=100) of full speed
    pub fn steer(&mut self, left_percent: i32, right_percent: i32) -> Result<(), BoardError> {
        let left = NO_LIMIT_SPEED * left_percent / 100;
        let right = NO_LIMIT_SPEED * right_percent / 100;
        self.gpg.set_motor_dps(Motor::Left, left as f64)?;
        self.gpg.set_motor_dps(Motor::Right, right as f64)
    }

    /// Run each motor at its own speed in degrees per second
    pub fn set_wheel_speeds(&mut self, left_dps: f64, right_dps: f64) -> Result<(), BoardError> {
        self.gpg.set_motor_dps(Motor::Left, left_dps)?;
        self.gpg.set_motor_dps(Motor::Right, right_dps)
    }

    // === Encoders ===

    /// (left, right) encoder positions in degrees
    pub fn read_encoders(&mut self) -> Result<(i32, i32), BoardError> {
        let left = self.gpg.get_motor_encoder(Motor::Left)?;
        let right = self.gpg.get_motor_encoder(Motor::Right)?;
        Ok((left, right))
    }

    /// Average of both encoders, as distance travelled or raw degrees
    pub fn read_encoders_average(&mut self, unit: DistanceUnit) -> Result<f64, BoardError> {
        let (left, right) = self.read_encoders()?;
        let average = (left + right) as f64 / 2.0;
        let mm = self.gpg.geometry().wheel_degrees_to_mm(average);
        Ok(match unit {
            DistanceUnit::Cm => mm / 10.0,
            DistanceUnit::Inch => mm / (10.0 * CM_PER_INCH),
            DistanceUnit::Degrees => average,
        })
    }

    /// Stop both motors and zero both encoders
    pub fn reset_encoders(&mut self, blocking: bool) -> Result<(), BoardError> {
        self.gpg.set_motor_power(Motor::Both, 0)?;
        let (left, right) = self.read_encoders()?;
        self.gpg.offset_motor_encoder(Motor::Left, left as f64)?;
        self.gpg.offset_motor_encoder(Motor::Right, right as f64)?;

        if blocking {
            thread::sleep(Duration::from_millis(250));
        }
        Ok(())
    }

    // === Target tracking ===

    /// True when both encoders are strictly inside the tolerance window of their targets
    pub fn target_reached(&mut self, left_target: f64, right_target: f64) -> Result<bool, BoardError> {
        let tolerance = self.config.tolerance_degrees;
        let (left, right) = self.read_encoders()?;
        let (left, right) = (left as f64, right as f64);

        Ok(left > left_target - tolerance
            && left < left_target + tolerance
            && right > right_target - tolerance
            && right < right_target + tolerance)
    }

    /// Poll until `target` is reached, the configured timeout expires, or a read fails
    pub fn wait_for(&mut self, target: MotionTarget) -> Result<(), MotionError> {
        let started = Instant::now();
        let mut polls: u64 = 0;

        loop {
            polls += 1;
            if self.target_reached(target.left, target.right)? {
                debug!("Target {:?} reached after {} polls", target, polls);
                return Ok(());
            }

            if let Some(timeout) = self.config.timeout {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    warn!("Target {:?} not reached within {:?}", target, timeout);
                    return Err(MotionError::Timeout { elapsed, polls });
                }
            }

            thread::sleep(self.config.poll_interval);
        }
    }

    fn move_to(&mut self, target: MotionTarget, blocking: bool) -> Result<MotionTarget, MotionError> {
        self.gpg.set_motor_position(Motor::Left, target.left)?;
        self.gpg.set_motor_position(Motor::Right, target.right)?;

        if blocking {
            self.wait_for(target)?;
        }
        Ok(target)
    }

    fn move_by(
        &mut self,
        left_delta: f64,
        right_delta: f64,
        blocking: bool,
    ) -> Result<MotionTarget, MotionError> {
        let (left, right) = self.read_encoders()?;
        let target = MotionTarget {
            left: left as f64 + left_delta,
            right: right as f64 + right_delta,
        };
        self.move_to(target, blocking)
    }

    // === Moves ===

    /// Drive forward (positive) or backward (negative) by `distance_cm`
    pub fn drive_cm(&mut self, distance_cm: f64, blocking: bool) -> Result<MotionTarget, MotionError> {
        let degrees = self.gpg.geometry().cm_to_wheel_degrees(distance_cm);
        info!("Drive {}cm ({:.1} wheel degrees)", distance_cm, degrees);
        self.move_by(degrees, degrees, blocking)
    }

    pub fn drive_inches(&mut self, distance_in: f64, blocking: bool) -> Result<MotionTarget, MotionError> {
        self.drive_cm(distance_in * CM_PER_INCH, blocking)
    }

    /// Turn both wheels by `degrees` of wheel rotation
    pub fn drive_degrees(&mut self, degrees: f64, blocking: bool) -> Result<MotionTarget, MotionError> {
        self.move_by(degrees, degrees, blocking)
    }

    /// Spin in place by `degrees` (positive turns right)
    pub fn turn_degrees(&mut self, degrees: f64, blocking: bool) -> Result<MotionTarget, MotionError> {
        let wheel_degrees = self.gpg.geometry().turn_degrees_to_wheel_degrees(degrees);
        info!("Turn {}° ({:.1} wheel degrees)", degrees, wheel_degrees);
        self.move_by(wheel_degrees, -wheel_degrees, blocking)
    }

    /// Drive `degrees` around a circle of `radius_cm` (negative degrees turn left).
    ///
    /// Per-motor speed limits are changed for the move. A blocking orbit restores
    /// the cached speed when done; after a non-blocking orbit the caller must call
    /// `set_speed` before the next move.
    pub fn orbit(
        &mut self,
        degrees: f64,
        radius_cm: f64,
        blocking: bool,
    ) -> Result<MotionTarget, MotionError> {
        let speed = self.speed;
        let plan = plan_orbit(self.gpg.geometry(), degrees, radius_cm, speed);
        info!(
            "Orbit {}° at radius {}cm: fast={:?}@{} slow={:?}@{}",
            degrees, radius_cm, plan.fast, plan.fast_speed, plan.slow, plan.slow_speed
        );

        self.gpg
            .set_motor_limits(plan.fast, 0, plan.fast_speed as f64)?;
        self.gpg
            .set_motor_limits(plan.slow, 0, plan.slow_speed as f64)?;

        let target = self.move_by(plan.left_degrees, plan.right_degrees, blocking)?;

        if blocking {
            self.set_speed(speed)?;
        }
        Ok(target)
    }
}

impl<T: Transport> Drop for MotionController<T> {
    fn drop(&mut self) {
        // Leave the robot stationary
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}
