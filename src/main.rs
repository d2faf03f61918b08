use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use animatronic_runtime::actuator::{ActuatorPort, SerialBridge, SimulatedActuator};
use animatronic_runtime::board::{Board, BoardSpec, PCA9685_DEFAULT_ADDRESS};
use animatronic_runtime::config::{BRIDGE_PORT, DriveConfig};
use animatronic_runtime::playback::Player;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(version, about = "Drive animatronic servos from keyframes and live input")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Accept live drive commands over zenoh
    Drive {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Play the keyframe animation in a board file
    Play {
        /// Board JSON file
        board: PathBuf,
        /// Number of times to play the animation
        #[arg(long, default_value_t = 1)]
        loops: u32,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Serial port of the PWM bridge
    #[arg(long, default_value = BRIDGE_PORT)]
    port: String,
    /// Log signals instead of writing to hardware
    #[arg(long)]
    simulate: bool,
    /// Log every emitted signal
    #[arg(short, long)]
    verbose: bool,
}

impl OutputArgs {
    fn open(&self, address: u8) -> Result<Box<dyn ActuatorPort>, BoxError> {
        if self.simulate {
            info!("Simulation mode, no hardware writes");
            return Ok(Box::new(SimulatedActuator::new()));
        }
        Ok(Box::new(SerialBridge::open(&self.port, address)?))
    }
}

fn load_board(path: &Path) -> Result<Board, BoxError> {
    let text = std::fs::read_to_string(path)?;
    let spec: BoardSpec = serde_json::from_str(&text)?;
    Ok(Board::try_from(spec)?)
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    match cli.command {
        Command::Drive { output } => {
            let port = output.open(PCA9685_DEFAULT_ADDRESS)?;
            let config = DriveConfig {
                verbose: output.verbose,
                ..DriveConfig::default()
            };
            animatronic_runtime::runtime::run(port, config).await
        }
        Command::Play {
            board,
            loops,
            output,
        } => {
            let board = load_board(&board)?;
            let mut port = output.open(board.address())?;
            Player::new(output.verbose).play(&board, &mut port, loops).await;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Drive { output } | Command::Play { output, .. } => output.verbose,
    };

    // Setup logging (set RUST_LOG to override)
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse().unwrap()))
        .init(); // installs the subscriber globally

    if let Err(e) = run(cli).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
