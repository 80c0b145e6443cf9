// Drive square: careful, step-by-step test of position moves
//
// IMPORTANT: Run board_diagnostic FIRST to verify read-only communication.
//
// Usage: cargo run --example drive_square -- [port] [--simulate]
// Example: cargo run --example drive_square -- /dev/ttyUSB0
//
// Safety features:
// - Explicit confirmation before any motion
// - Reduced speed limit
// - Every move times out instead of waiting forever on a stalled wheel
// - Motors stop when the controller is dropped

use gopigo3_runtime::board::{
    DistanceUnit, GoPiGo3, MotionConfig, MotionController, SerialTransport, SimulatedBoard,
    Transport,
};
use gopigo3_runtime::config::BOARD_PORT;
use std::io::{self, Write};
use std::time::Duration;

const SIDE_CM: f64 = 30.0;
const TEST_SPEED: i32 = 150; // deg/s
const MOVE_TIMEOUT: Duration = Duration::from_secs(10);

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let simulate = args.iter().any(|a| a == "--simulate");
    let port = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| BOARD_PORT.to_string());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              GoPiGo3 Drive Square (WITH MOTION)              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  ⚠  This tool WILL drive the robot!                          ║");
    println!("║  ⚠  Make sure there is 50cm of free floor around it!         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let transport: Box<dyn Transport> = if simulate {
        println!("Simulated board");
        Box::new(SimulatedBoard::new())
    } else {
        println!("Serial port: {}", port);
        println!();
        if !confirm("Have you run board_diagnostic first and verified the board responds?")? {
            println!("Please run: cargo run --example board_diagnostic -- {}", port);
            return Ok(());
        }
        if !confirm("Is there free space around the robot?")? {
            println!("Please move the robot somewhere it can drive a 30cm square.");
            return Ok(());
        }
        Box::new(SerialTransport::open(&port)?)
    };
    println!();

    // ========== STEP 1: Verify communication (read-only) ==========
    println!("Step 1: Verifying board...");
    let mut gpg = GoPiGo3::new(transport);
    let firmware = gpg.verify_identity()?;
    println!("  ✓ GoPiGo3 firmware {}", firmware);
    println!();

    // ========== STEP 2: Configure motion ==========
    println!("Step 2: Limiting speed to {}°/s and zeroing encoders...", TEST_SPEED);
    let config = MotionConfig {
        timeout: Some(MOVE_TIMEOUT),
        ..MotionConfig::default()
    };
    let mut motion = MotionController::with_config(gpg, config)?;
    motion.set_speed(TEST_SPEED)?;
    motion.reset_encoders(true)?;
    println!("  ✓ Ready");
    println!();

    // ========== STEP 3: Drive the square ==========
    println!("Step 3: Driving a {}cm square", SIDE_CM);
    println!("  ⚠  Press Ctrl+C at any time to abort!");
    println!();

    for side in 1..=4 {
        println!("  Side {}: forward {}cm...", side, SIDE_CM);
        motion.drive_cm(SIDE_CM, true)?;
        println!(
            "    Travelled {:.1}cm so far",
            motion.read_encoders_average(DistanceUnit::Cm)?
        );

        println!("  Side {}: turning 90°...", side);
        motion.turn_degrees(90.0, true)?;
    }

    // ========== FINAL: Stop and cleanup ==========
    println!();
    println!("Step 4: Stopping motors...");
    motion.stop()?;
    motion.reset_speed()?;
    println!("  ✓ Motors stopped");

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Test Complete!                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("If the robot ended where it started, the wheel constants are right.");
    println!("You can now try the full runtime with: cargo run");

    Ok(())
}
