// End-to-end moves against the simulated board

use std::f64::consts::PI;
use std::time::Duration;

use gopigo3_runtime::board::registers::{ADDRESS, GroveMask};
use gopigo3_runtime::board::{
    GoPiGo3, MessageType, MotionConfig, MotionController, MotionError, Motor, SharedTransport,
    SimulatedBoard,
};

fn position_ticks(payload: &[u8]) -> i32 {
    i32::from_be_bytes([payload[1], payload[2], payload[3], payload[4]])
}

#[test]
fn drive_60cm_blocking() {
    let sim = SimulatedBoard::new();
    let mut motion = MotionController::new(GoPiGo3::new(sim.clone())).unwrap();
    sim.clear_frames();

    let target = motion.drive_cm(60.0, true).unwrap();

    let expected_degrees = 600.0 * 360.0 / (66.5 * PI);
    assert!((target.left - expected_degrees).abs() < 1e-9);
    assert!((target.right - expected_degrees).abs() < 1e-9);

    // One position frame per wheel, left first. Ticks are truncated, not rounded:
    // 2067.82 goes out as 2067
    let expected_ticks = (expected_degrees * 2.0) as i32;
    assert_eq!(expected_ticks, 2067);
    let positions = sim.frames_of(MessageType::SetMotorPosition);
    assert_eq!(positions.len(), 2);
    for (frame, motor) in positions.iter().zip([Motor::Left, Motor::Right]) {
        assert_eq!(frame.address(), ADDRESS);
        assert_eq!(frame.payload()[0], motor as u8);
        assert_eq!(position_ticks(frame.payload()), expected_ticks);
    }

    // The sim moves 20 ticks per read: 2060 ticks (1030°) is the first reading
    // inside the window, reached on the 103rd poll after the starting read
    assert_eq!(sim.encoder_ticks(Motor::Left), 2060);
    assert_eq!(sim.encoder_ticks(Motor::Right), 2060);
    assert_eq!(sim.frames_of(MessageType::GetMotorEncoderLeft).len(), 104);
    assert_eq!(sim.frames_of(MessageType::GetMotorEncoderRight).len(), 104);
}

#[test]
fn drive_starts_from_current_encoders() {
    let sim = SimulatedBoard::new();
    sim.set_encoder_ticks(Motor::Left, 200);
    sim.set_encoder_ticks(Motor::Right, -400);
    let mut motion = MotionController::new(GoPiGo3::new(sim.clone())).unwrap();

    let target = motion.drive_degrees(90.0, false).unwrap();
    assert_eq!(target.left, 190.0);
    assert_eq!(target.right, -110.0);
    assert_eq!(sim.target_ticks(Motor::Left), Some(380));
    assert_eq!(sim.target_ticks(Motor::Right), Some(-220));
}

#[test]
fn geometry_change_applies_to_next_move() {
    let sim = SimulatedBoard::new();
    let mut gpg = GoPiGo3::new(sim.clone());
    gpg.set_robot_constants(100.0, 150.0).unwrap();
    let mut motion = MotionController::new(gpg).unwrap();

    let turn = motion.turn_degrees(-90.0, false).unwrap();
    assert!((turn.left + 90.0 * 150.0 / 100.0).abs() < 1e-9);
    assert_eq!(turn.left, -turn.right);

    // Hold the encoders at zero so the next move starts from the same place
    sim.set_stalled(true);
    let target = motion.drive_cm(10.0, false).unwrap();
    assert!((target.left - 100.0 * 360.0 / (100.0 * PI)).abs() < 1e-9);
}

#[test]
fn stalled_wheel_times_out() {
    let sim = SimulatedBoard::new();
    sim.set_stalled(true);
    let config = MotionConfig {
        timeout: Some(Duration::from_millis(30)),
        ..MotionConfig::default()
    };
    let mut motion = MotionController::with_config(GoPiGo3::new(sim.clone()), config).unwrap();

    match motion.orbit(180.0, 25.0, true) {
        Err(MotionError::Timeout { elapsed, .. }) => assert!(elapsed >= Duration::from_millis(30)),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[test]
fn shared_transport_interleaves_frames() {
    let sim = SimulatedBoard::new();
    let shared = SharedTransport::new(sim.clone());

    let mut motion = MotionController::new(GoPiGo3::new(shared.clone())).unwrap();
    let mut monitor = GoPiGo3::new(shared);

    sim.set_grove_input(GroveMask::PIN_2_1, 0, 4095);
    motion.drive_cm(5.0, false).unwrap();
    assert_eq!(monitor.get_grove_analog(GroveMask::PIN_2_1).unwrap(), 4095);
    assert!((monitor.get_voltage_battery().unwrap() - 11.8).abs() < 1e-9);

    let frames = sim.frames();
    let last_position = frames
        .iter()
        .rposition(|f| f.message_type() == Some(MessageType::SetMotorPosition))
        .unwrap();
    assert_eq!(
        frames[last_position + 1].message_type(),
        Some(MessageType::GetGroveAnalog2_1)
    );
}
