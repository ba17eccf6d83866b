//! Operator CLI: deliver one command to one parking-spot device.

use clap::{Parser, ValueEnum};
use tracing::error;

use yard_monitor::commands::CommandDispatcher;
use yard_monitor::config::AppConfig;
use yard_monitor::errors::YardMonitorError;
use yard_monitor::models::DeviceCode;

#[derive(Debug, Parser)]
#[command(name = "send-command", about = "Send a command to a yard device")]
struct Args {
    /// Code of the target device, e.g. S1
    device_code: String,
    /// Command to deliver
    #[arg(value_enum)]
    command: Command,
}

/// Fixed operator command set. The wire tokens are the device
/// firmware's vocabulary.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Command {
    /// Sound the buzzer alert
    Buzzer,
    /// Turn the indicator LED green
    LedGreen,
    /// Turn the indicator LED red
    LedRed,
    /// Switch the indicator LED off
    LedOff,
}

impl Command {
    fn token(self) -> &'static str {
        match self {
            Command::Buzzer => "1",
            Command::LedGreen => "led_verde",
            Command::LedRed => "led_vermelho",
            Command::LedOff => "led_off",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), YardMonitorError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = AppConfig::load()?;

    let device = DeviceCode::try_from(args.device_code.as_str())?;
    let dispatcher = CommandDispatcher::new(&config.mqtt);

    match dispatcher.dispatch(&device, args.command.token()).await {
        Ok(()) => {
            println!("Command delivered to {}", device);
            Ok(())
        }
        Err(e) => {
            error!("Command delivery failed: {}", e);
            std::process::exit(1);
        }
    }
}
