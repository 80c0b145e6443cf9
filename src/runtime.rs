// 50 Hz loop with watchdog
// Velocity commands must keep arriving or the robot is stopped. Position moves
// (drive, turn, orbit) run non-blocking and are tracked by polling the encoders
// once per tick, so a new command can always interrupt them.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::board::kinematics::body_to_wheel_dps;
use crate::board::motion::{MotionController, MotionError, MotionTarget};
use crate::board::transport::Transport;
use crate::board::BoardError;
use crate::config::{CMD_TIMEOUT, LOOP_HZ, TELEMETRY_DIVIDER, TOPIC_CMD, TOPIC_HEALTH, TOPIC_TELEMETRY};
use crate::messages::{RobotCommand, RuntimeHealth, Telemetry};

/// Position move being tracked
#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveMove {
    target: MotionTarget,
    /// Speed to restore once an orbit finishes
    restore_speed: Option<i32>,
}

pub struct Runtime<T: Transport> {
    motion: MotionController<T>,
    velocity: Option<(f64, f64)>,
    active_move: Option<ActiveMove>,
    cmd_received_at: Option<Instant>,
    cmd_timeout: Duration,
    health: RuntimeHealth,
}

impl<T: Transport> Runtime<T> {
    pub fn new(motion: MotionController<T>) -> Self {
        Self {
            motion,
            velocity: None,
            active_move: None,
            cmd_received_at: None,
            cmd_timeout: CMD_TIMEOUT,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn with_cmd_timeout(mut self, timeout: Duration) -> Self {
        self.cmd_timeout = timeout;
        self
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn is_moving(&self) -> bool {
        self.active_move.is_some()
    }

    pub fn motion(&mut self) -> &mut MotionController<T> {
        &mut self.motion
    }

    /// Drop the tracked move, restoring the speed an orbit changed
    fn cancel_move(&mut self) -> Result<(), BoardError> {
        if let Some(active) = self.active_move.take() {
            debug!("Cancelling move to {:?}", active.target);
            if let Some(speed) = active.restore_speed {
                self.motion.set_speed(speed)?;
            }
        }
        Ok(())
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: RobotCommand) -> Result<(), MotionError> {
        info!("Received command: {:?}", &cmd);
        self.cmd_received_at = Some(Instant::now());

        if !matches!(cmd, RobotCommand::Velocity { .. }) {
            self.velocity = None;
        }
        if cmd.is_position_move() || matches!(cmd, RobotCommand::Velocity { .. } | RobotCommand::Stop) {
            self.cancel_move()?;
        }

        match cmd {
            RobotCommand::Velocity { x_vel, theta_vel } => {
                self.velocity = Some((x_vel, theta_vel));
            }
            RobotCommand::DriveCm { distance } => {
                let target = self.motion.drive_cm(distance, false)?;
                self.active_move = Some(ActiveMove {
                    target,
                    restore_speed: None,
                });
            }
            RobotCommand::Turn { degrees } => {
                let target = self.motion.turn_degrees(degrees, false)?;
                self.active_move = Some(ActiveMove {
                    target,
                    restore_speed: None,
                });
            }
            RobotCommand::Orbit { degrees, radius_cm } => {
                let speed = self.motion.get_speed();
                let target = self.motion.orbit(degrees, radius_cm, false)?;
                self.active_move = Some(ActiveMove {
                    target,
                    restore_speed: Some(speed),
                });
            }
            RobotCommand::SetSpeed { dps } => {
                self.motion.set_speed(dps)?;
                // An orbit in progress finishes at the newly requested speed
                if let Some(restore) = self
                    .active_move
                    .as_mut()
                    .and_then(|active| active.restore_speed.as_mut())
                {
                    *restore = dps;
                }
            }
            RobotCommand::SetLed {
                led,
                red,
                green,
                blue,
            } => self.motion.driver_mut().set_led(led, red, green, blue)?,
            RobotCommand::Stop => self.motion.stop()?,
        }
        Ok(())
    }

    /// One loop tick: apply velocity (with watchdog) or poll the active move
    pub fn step(&mut self) -> Result<(), BoardError> {
        let cmd_age = self.cmd_received_at.map(|t| t.elapsed());

        if let Some((x_vel, theta_vel)) = self.velocity {
            match cmd_age {
                Some(age) if age <= self.cmd_timeout => {
                    let wheels = body_to_wheel_dps(self.motion.driver().geometry(), x_vel, theta_vel);
                    self.motion.set_wheel_speeds(wheels.left, wheels.right)?;
                    self.health = RuntimeHealth::Ok;
                }
                _ => {
                    // Watchdog triggered - stop the robot
                    warn!("Command stale ({:?} old), stopping robot", cmd_age);
                    self.velocity = None;
                    self.motion.stop()?;
                    self.health = RuntimeHealth::CmdStale;
                }
            }
            return Ok(());
        }

        if let Some(active) = self.active_move {
            let target = active.target;
            if self.motion.target_reached(target.left, target.right)? {
                info!("Move complete at {:?}", target);
                self.active_move = None;
                if let Some(speed) = active.restore_speed {
                    self.motion.set_speed(speed)?;
                }
            }
            self.health = RuntimeHealth::Ok;
            return Ok(());
        }

        self.health = match cmd_age {
            Some(age) if age <= self.cmd_timeout => RuntimeHealth::Ok,
            _ => RuntimeHealth::CmdStale,
        };
        Ok(())
    }

    /// Sample encoders and battery
    pub fn telemetry(&mut self) -> Result<Telemetry, BoardError> {
        let (left_encoder, right_encoder) = self.motion.read_encoders()?;
        let battery = self.motion.driver_mut().get_voltage_battery()?;
        Ok(Telemetry {
            left_encoder,
            right_encoder,
            battery,
            moving: self.active_move.is_some(),
        })
    }

    fn mark_board_error(&mut self, e: &dyn std::error::Error) {
        warn!("Board error: {}", e);
        self.health = RuntimeHealth::BoardError;
    }
}

pub async fn run<T: Transport>(
    mut runtime: Runtime<T>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD).await?;
    let pub_telemetry = session.declare_publisher(TOPIC_TELEMETRY).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    let mut tick_count: u64 = 0;

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", TOPIC_CMD);
    info!("Publishing to: {}, {}", TOPIC_TELEMETRY, TOPIC_HEALTH);

    loop {
        tick.tick().await;
        tick_count += 1;

        // 1. Drain all pending commands (non-blocking), in order
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<RobotCommand>(&payload) {
                Ok(cmd) => {
                    if let Err(e) = runtime.on_command(cmd) {
                        runtime.mark_board_error(&e);
                    }
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Drive the robot (includes watchdog logic)
        if let Err(e) = runtime.step() {
            runtime.mark_board_error(&e);
        }

        // 3. Publish telemetry
        if tick_count % TELEMETRY_DIVIDER == 0 {
            match runtime.telemetry() {
                Ok(telemetry) => {
                    let telemetry_json = serde_json::to_string(&telemetry)?;
                    pub_telemetry.put(telemetry_json).await?;
                }
                Err(e) => runtime.mark_board_error(&e),
            }
        }

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health)?;
        pub_health.put(health_json).await?;
    }
}
