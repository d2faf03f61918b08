// Keyframe playback
//
// Samples every motor's timeline at the current animation time and writes the
// resulting tick to the motor's board output, once per refresh period.

use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::actuator::ActuatorPort;
use crate::board::Board;
use crate::motor::Motor;

pub struct Player {
    verbose: bool,
}

impl Player {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Set the board's refresh frequency on the actuator
    pub fn configure<A: ActuatorPort>(&self, board: &Board, port: &mut A) {
        if let Err(e) = port.set_refresh_frequency(board.frequency_hz()) {
            warn!(
                "Failed to set {} Hz on board 0x{:02X}: {}",
                board.frequency_hz(),
                board.address(),
                e
            );
        }
    }

    /// Write every motor's position at `time` ms. Returns the number of outputs written.
    pub fn apply_frame<A: ActuatorPort>(&self, board: &Board, port: &mut A, time: u64) -> usize {
        let mut written = 0;
        for motor in board.motors() {
            let Some(tick) = motor.timeline().tick_at_time(time) else {
                continue;
            };
            let output = Board::output_for(motor.channel());

            if self.verbose {
                info!(
                    "t={}ms {} (output {}) -> {} ({:.2}ms pulse)",
                    time,
                    motor.motor_id(),
                    output,
                    tick,
                    Self::pulse_width_ms(motor, tick)
                );
            }
            match port.set_channel_signal(output, 0, tick) {
                Ok(()) => written += 1,
                Err(e) => warn!("Failed to write {} on output {}: {}", motor.motor_id(), output, e),
            }
        }
        written
    }

    /// Pulse length a tick produces on this motor's calibrated refresh rate
    pub fn pulse_width_ms(motor: &Motor, tick: u16) -> f64 {
        tick as f64 / motor.ticks_per_millisecond() as f64
    }

    /// Length of the longest timeline on the board (ms)
    pub fn duration(board: &Board) -> u64 {
        board.motors().map(|m| m.timeline().duration()).max().unwrap_or(0)
    }

    /// Play the board's animation `loops` times at its refresh rate
    pub async fn play<A: ActuatorPort>(&self, board: &Board, port: &mut A, loops: u32) {
        self.configure(board, port);

        let duration = Self::duration(board);
        let period = Duration::from_millis(1000 / board.frequency_hz().max(1) as u64);
        info!(
            "Playing {} motors, {}ms animation, {} loop(s), {}ms frames",
            board.motors().count(),
            duration,
            loops,
            period.as_millis()
        );

        for pass in 0..loops {
            debug!("Playback pass {}", pass + 1);
            let start = Instant::now();
            let mut frame = interval(period);
            frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                frame.tick().await;
                let time = (start.elapsed().as_millis() as u64).min(duration);
                self.apply_frame(board, port, time);
                if time >= duration {
                    break;
                }
            }
        }

        info!("Playback finished");
    }
}
