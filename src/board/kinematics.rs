// Differential-drive inverse kinematics for the GoPiGo3
// Converts body-frame velocities (forward, turn rate) to wheel speeds.

use std::f64::consts::PI;

use super::units::RobotGeometry;

/// Maximum wheel speed command (degrees per second)
pub const MAX_WHEEL_DPS: f64 = 1000.0;

/// Wheel speeds in degrees per second
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelSpeeds {
    pub left: f64,
    pub right: f64,
}

impl WheelSpeeds {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// Convert body-frame velocities to wheel speeds
///
/// # Arguments
/// * `x` - Forward velocity in m/s (positive = forward)
/// * `theta` - Rotational velocity in deg/s (positive = counter-clockwise)
pub fn body_to_wheel_dps(geometry: &RobotGeometry, x: f64, theta: f64) -> WheelSpeeds {
    body_to_wheel_dps_with_limit(geometry, x, theta, MAX_WHEEL_DPS)
}

/// Convert body-frame velocities to wheel speeds, scaling both wheels down
/// together when either would exceed `max_dps`
pub fn body_to_wheel_dps_with_limit(
    geometry: &RobotGeometry,
    x: f64,
    theta: f64,
    max_dps: f64,
) -> WheelSpeeds {
    let (wheel_diameter, wheel_base_width) = geometry.constants();
    let theta_rad = theta * (PI / 180.0);
    let half_base = wheel_base_width / 2000.0; // m

    // Wheel rim speeds (m/s)
    let left_linear = x - half_base * theta_rad;
    let right_linear = x + half_base * theta_rad;

    // Rim speed to wheel rotation
    let wheel_radius = wheel_diameter / 2000.0; // m
    let to_dps = |linear: f64| linear / wheel_radius * (180.0 / PI);
    let mut left = to_dps(left_linear);
    let mut right = to_dps(right_linear);

    let fastest = left.abs().max(right.abs());
    if fastest > max_dps {
        let scale = max_dps / fastest;
        left *= scale;
        right *= scale;
    }

    WheelSpeeds { left, right }
}
