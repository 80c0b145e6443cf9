// Board diagnostic: READ-ONLY check of the GoPiGo3 connection
//
// This tool does NOT command the motors, LEDs or grove ports.
// Use this first before running drive_square.
//
// Usage: cargo run --example board_diagnostic -- [port]
// Example: cargo run --example board_diagnostic -- /dev/ttyUSB0

use gopigo3_runtime::board::{GoPiGo3, Motor, SerialTransport};
use gopigo3_runtime::config::BOARD_PORT;

const MOTORS: [(Motor, &str); 2] = [(Motor::Left, "Left"), (Motor::Right, "Right")];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::DEBUG.into()),
        )
        .init();

    // Get port from args or use default
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| BOARD_PORT.to_string());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            GoPiGo3 Board Diagnostic (READ-ONLY)              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  This tool only READS from the board - no writes, no motion  ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Serial port: {}", port);
    println!();

    // Try to open serial port
    println!("Step 1: Opening serial port...");
    let transport = match SerialTransport::open(&port) {
        Ok(transport) => {
            println!("  ✓ Serial port opened successfully");
            transport
        }
        Err(e) => {
            println!("  ✗ Failed to open serial port: {}", e);
            println!();
            println!("Troubleshooting:");
            println!("  - Check the port path is correct");
            println!("  - Verify the USB cable is connected");
            println!("  - Check the user is in the dialout group");
            return Err(e.into());
        }
    };
    let mut gpg = GoPiGo3::new(transport);
    println!();

    // Identity
    println!("Step 2: Reading board identity...");
    match gpg.verify_identity() {
        Ok(firmware) => println!("  ✓ GoPiGo3 found, firmware {}", firmware),
        Err(e) => {
            println!("  ✗ {} (error code {:?})", e, e.code());
            println!();
            println!("  - Check the board is powered (battery pack switched on)");
            println!("  - Check the firmware is 0.3.x");
            return Err(e.into());
        }
    }
    match gpg.get_version_hardware() {
        Ok(version) => println!("    Hardware:  {}", version),
        Err(e) => println!("    Hardware:  ERROR - {}", e),
    }
    match gpg.get_id() {
        Ok(id) => println!("    Serial ID: {}", id),
        Err(e) => println!("    Serial ID: ERROR - {}", e),
    }
    println!();

    // Power
    println!("Step 3: Reading voltages...");
    match gpg.get_voltage_battery() {
        Ok(v) => println!("    Battery: {:.2}V", v),
        Err(e) => println!("    Battery: ERROR - {}", e),
    }
    match gpg.get_voltage_5v() {
        Ok(v) => println!("    5V rail: {:.2}V", v),
        Err(e) => println!("    5V rail: ERROR - {}", e),
    }
    println!();

    // Motors
    println!("Step 4: Reading motors...");
    println!();
    for (motor, name) in MOTORS {
        println!("  === Motor {} ===", name);

        match gpg.get_motor_encoder(motor) {
            Ok(degrees) => println!("    Encoder:   {}°", degrees),
            Err(e) => println!("    Encoder:   ERROR - {}", e),
        }

        match gpg.get_motor_status(motor) {
            Ok(status) => {
                println!("    Power:     {}%", status.power);
                println!("    Speed:     {}°/s", status.dps);
                if status.low_voltage() {
                    println!("    ⚠ Low voltage flag set");
                }
                if status.overloaded() {
                    println!("    ⚠ Overload flag set");
                }
            }
            Err(e) => println!("    Status:    ERROR - {}", e),
        }

        println!();
    }

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Diagnostic Complete                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("If the board responded and the battery reads above 9V:");
    println!("  1. Encoders should not change while the wheels are stationary");
    println!("  2. Power and speed should read 0 when nothing is driving the motors");
    println!();
    println!("Next step: Run 'cargo run --example drive_square' with room to move");

    Ok(())
}
