use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use motor_link::config::DEFAULT_BAUD_RATE;
use motor_link::motor::MotorMode;
use motor_link::runtime::{self, RunConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Run for a number of rotations
    Rotation,
    /// Run for a duration in seconds
    Time,
}

impl From<ModeArg> for MotorMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rotation => MotorMode::Rotation,
            ModeArg::Time => MotorMode::Time,
        }
    }
}

/// Drive a stepper motor attached to an ESP32 over a serial port
#[derive(Parser)]
struct Args {
    /// Serial port of the motor controller (e.g. /dev/ttyUSB0)
    #[arg(short, long)]
    port: String,

    /// Baud rate of the serial link
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Operating mode
    #[arg(short, long, value_enum, default_value_t = ModeArg::Rotation)]
    mode: ModeArg,

    /// Motor speed in RPM
    #[arg(short, long)]
    speed: i32,

    /// Target value: rotations (rotation mode) or seconds (time mode)
    #[arg(short, long)]
    value: i32,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let cfg = RunConfig {
        port: args.port,
        baud_rate: args.baud,
        mode: args.mode.into(),
        speed: args.speed,
        value: args.value,
    };

    if let Err(e) = runtime::run(cfg).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
