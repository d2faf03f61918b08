// 50 Hz command intake loop feeding the drive smoother
// Note: the smoother's own watchdog brakes the platform when commands stop;
// this loop only drains commands and reports health.

use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::actuator::ActuatorPort;
use crate::config::{DriveConfig, LOOP_HZ, TOPIC_CMD_DRIVE, TOPIC_HEALTH};
use crate::drive::DriveSmoother;
use crate::messages::{DriveCommand, RuntimeHealth};

/// Feed one command into the smoother, all axes
pub async fn apply_command<A: ActuatorPort + 'static>(smoother: &DriveSmoother<A>, cmd: &DriveCommand) {
    smoother.set_drive_input(cmd.drive).await;
    smoother.set_turn_input(cmd.turn).await;
    smoother.set_head_lift_input(cmd.head_lift).await;
    smoother.set_head_turn_input(cmd.head_turn).await;
    smoother
        .set_talk_input(cmd.talk.is_talking, cmd.talk.level, cmd.talk.open_mouth)
        .await;
}

pub async fn health<A: ActuatorPort + 'static>(smoother: &DriveSmoother<A>) -> RuntimeHealth {
    if smoother.is_stale().await {
        RuntimeHealth::CmdStale
    } else {
        RuntimeHealth::Ok
    }
}

/// Run until Ctrl-C, then bring the platform to a stop
pub async fn run<A: ActuatorPort + 'static>(
    port: A,
    config: DriveConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut smoother = DriveSmoother::new(port, config);
    smoother.start().await;

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    let mut last_health = None;

    info!("Runtime started: {}Hz loop", LOOP_HZ);
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!("Publishing to: {}", TOPIC_HEALTH);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let result: Result<(), Box<dyn std::error::Error + Send + Sync>> = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break Ok(());
            }
            _ = tick.tick() => {}
        }

        // 1. Drain all pending commands (non-blocking), apply each in order
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => apply_command(&smoother, &cmd).await,
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 2. Publish health
        let status = health(&smoother).await;
        if last_health != Some(status) {
            info!("Health: {:?}", status);
            last_health = Some(status);
        }
        let health_json = match serde_json::to_string(&status) {
            Ok(json) => json,
            Err(e) => break Err(e.into()),
        };
        if let Err(e) = pub_health.put(health_json).await {
            break Err(e.into());
        }
    };

    smoother.stop().await;
    result
}
