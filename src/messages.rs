// Define message types for the runtime

use serde::{Deserialize, Serialize};

// Command from teleop/scripts -> runtime
// Tagged by "type", e.g. {"type":"drive_cm","distance":20.0}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RobotCommand {
    /// Continuous drive; must be refreshed before the watchdog expires
    Velocity {
        /// Forward velocity in m/s
        x_vel: f64,
        /// Rotational velocity in deg/s (positive = counter-clockwise)
        theta_vel: f64,
    },
    /// Drive a distance (cm), negative backwards
    DriveCm { distance: f64 },
    /// Spin in place (degrees), positive turns right
    Turn { degrees: f64 },
    /// Drive `degrees` around a circle of `radius_cm`
    Orbit { degrees: f64, radius_cm: f64 },
    /// Speed limit for position moves (deg/s)
    SetSpeed { dps: i32 },
    SetLed {
        led: i32,
        red: i32,
        green: i32,
        blue: i32,
    },
    Stop,
}

impl RobotCommand {
    /// True for commands that run until their encoder target is reached
    pub fn is_position_move(&self) -> bool {
        matches!(
            self,
            RobotCommand::DriveCm { .. } | RobotCommand::Turn { .. } | RobotCommand::Orbit { .. }
        )
    }
}

// State output from runtime -> observers
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Telemetry {
    /// Encoder positions (degrees)
    pub left_encoder: i32,
    pub right_encoder: i32,
    /// Battery voltage (V)
    pub battery: f64,
    /// A position move is in progress
    pub moving: bool,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    BoardError,
}
