use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gopigo3_runtime::board::{
    GoPiGo3, MotionController, SerialTransport, SimulatedBoard, Transport,
    transport::DEFAULT_BAUDRATE,
};
use gopigo3_runtime::config::{BOARD_PORT, DEFAULT_CONFIG_PATH, RobotConstants};
use gopigo3_runtime::runtime::{self, Runtime};

#[derive(Parser, Debug)]
#[command(name = "gopigo3-runtime")]
#[command(about = "Zenoh runtime for the GoPiGo3 robot")]
struct Args {
    /// Serial port of the board
    #[arg(short, long, default_value = BOARD_PORT)]
    port: String,

    #[arg(short, long, default_value_t = DEFAULT_BAUDRATE)]
    baudrate: u32,

    /// Robot constants file (wheel diameter, wheel base width)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Run against an in-memory board instead of hardware
    #[arg(long)]
    simulate: bool,
}

async fn start(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let transport: Box<dyn Transport> = if args.simulate {
        info!("Simulation mode, no hardware attached");
        Box::new(SimulatedBoard::new())
    } else {
        Box::new(SerialTransport::open_with_baudrate(&args.port, args.baudrate)?)
    };

    let mut gpg = GoPiGo3::new(transport);
    let firmware = gpg.verify_identity()?;
    info!("Battery: {:.2}V, firmware {}", gpg.get_voltage_battery()?, firmware);

    let constants = RobotConstants::load_or_default(&args.config)?;
    gpg.set_robot_constants(constants.wheel_diameter, constants.wheel_base_width)?;

    let motion = MotionController::new(gpg)?;
    runtime::run(Runtime::new(motion)).await
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    if let Err(e) = start(args).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
