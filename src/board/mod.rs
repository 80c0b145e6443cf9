// GoPiGo3 board driver
//
// Provides:
// - Frame codec and register map of the GoPiGo3 SPI protocol
// - Serial, SPI and shared transports
// - Unit conversion between physical units and register units
// - Differential-drive kinematics
// - Command dispatcher, motion controller and peripheral wrappers
// - An in-memory board for running without hardware

mod driver;
pub mod error;
pub mod kinematics;
pub mod motion;
pub mod peripherals;
pub mod protocol;
pub mod registers;
pub mod sim;
pub mod transport;
pub mod units;

pub use driver::{GoPiGo3, GroveValue, MotorStatus, Version, FIRMWARE_VERSION_REQUIRED};
pub use error::{BoardError, ProtocolError, TransportError};
pub use kinematics::{body_to_wheel_dps, WheelSpeeds};
pub use motion::{DistanceUnit, MotionConfig, MotionController, MotionError, MotionTarget};
pub use protocol::Frame;
pub use registers::{GroveMask, MessageType, Motor};
pub use sim::SimulatedBoard;
pub use transport::{SerialTransport, SharedTransport, SpiTransport, Transport};
pub use units::RobotGeometry;
