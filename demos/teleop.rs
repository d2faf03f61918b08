// Keyboard teleop: W/S drive, A/D turn, I/K head lift, J/L head turn, T talk, M mouth, Q quit
use animatronic_runtime::config::TOPIC_CMD_DRIVE;
use animatronic_runtime::messages::{DriveCommand, TalkCommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

const INPUT_TIMEOUT_MS: u64 = 100; // Release axes after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: W/S=drive, A/D=turn, I/K=head lift, J/L=head turn, T=talk, M=mouth, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut cmd = DriveCommand::default();
    let mut last_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                if !pressed {
                    continue;
                }

                match code {
                    KeyCode::Char('w') => cmd.drive = 100,
                    KeyCode::Char('s') => cmd.drive = -100,
                    KeyCode::Char('a') => cmd.turn = -100,
                    KeyCode::Char('d') => cmd.turn = 100,
                    KeyCode::Char('i') => cmd.head_lift = 100,
                    KeyCode::Char('k') => cmd.head_lift = -100,
                    KeyCode::Char('j') => cmd.head_turn = -100,
                    KeyCode::Char('l') => cmd.head_turn = 100,
                    KeyCode::Char('t') => {
                        cmd.talk = TalkCommand {
                            is_talking: true,
                            level: 100,
                            open_mouth: false,
                        }
                    }
                    KeyCode::Char('m') => cmd.talk.open_mouth = true,
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    _ => continue,
                }
                last_input = Instant::now();
            }
        }

        // Release everything if no input for INPUT_TIMEOUT_MS; the runtime
        // ramps drive down on its own
        if last_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            cmd = DriveCommand::default();
        }

        // Always publish at ~50Hz
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}
