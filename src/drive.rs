// Drive smoother with dead-man's-switch watchdog
//
// Live directional input is ramped one step per command toward its target.
// A background watchdog feeds zero input whenever commands go stale, so a
// lost input source brakes the platform instead of leaving it driving.
//
// Command intake and the watchdog share one mutex around the drive state and
// the actuator port.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::actuator::ActuatorPort;
use crate::config::{ChannelConfig, DriveConfig};

/// Inputs and the ramp are bounded to +/- this value
pub const INPUT_LIMIT: i32 = 100;

/// Drive magnitudes below this are sent as the drive channel minimum
pub const DEADBAND: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveStatus {
    Stopped,
    Running,
}

#[derive(Debug)]
struct DriveState {
    current_ramp: i32,
    last_input: Instant,
    running: bool,
}

struct Core<A> {
    state: DriveState,
    port: A,
}

struct Inner<A> {
    config: DriveConfig,
    core: Mutex<Core<A>>,
}

/// One ramp step from `current` toward `input`
pub fn next_ramp(current: i32, input: i32) -> i32 {
    let next = if input == 0 {
        current / 2
    } else if input > current {
        current + 1
    } else if input < current {
        current - 1
    } else {
        current
    };
    next.clamp(-INPUT_LIMIT, INPUT_LIMIT)
}

/// Drive channel value for a ramp, with the deadband applied
pub fn drive_magnitude(ramp: i32, direction: ChannelConfig, drive: ChannelConfig) -> u16 {
    let percent = ramp as f32 / INPUT_LIMIT as f32;
    let pwm = ((percent * direction.max as f32) as i32).abs();
    if pwm < DEADBAND {
        drive.min
    } else {
        pwm as u16
    }
}

/// Linear map of an input in [-100, 100] onto a channel's [min, max]
pub fn servo_value(input: i32, channel: ChannelConfig) -> u16 {
    let input = input.clamp(-INPUT_LIMIT, INPUT_LIMIT);
    let slope = (channel.max as f32 - channel.min as f32) / (2 * INPUT_LIMIT) as f32;
    let result = (input + INPUT_LIMIT) as f32 * slope + channel.min as f32;
    result as u16
}

/// Mouth position for the talk channel
pub fn talk_value(is_talking: bool, level: i32, open_mouth: bool, talk: ChannelConfig) -> u16 {
    if open_mouth || (is_talking && level == INPUT_LIMIT) {
        talk.max
    } else {
        // Talking below full level holds the same default as silence
        talk.min
    }
}

impl<A: ActuatorPort> Core<A> {
    /// Write one output. Failures are logged and dropped.
    fn emit(&mut self, verbose: bool, output: u8, off: u16) {
        if verbose {
            info!("Output {} -> {}", output, off);
        } else {
            debug!("Output {} -> {}", output, off);
        }

        if let Err(e) = self.port.set_channel_signal(output, 0, off) {
            warn!("Failed to write output {}: {}", output, e);
        }
    }

    fn drive(&mut self, config: &DriveConfig, raw: i32) {
        let input = raw.clamp(-INPUT_LIMIT, INPUT_LIMIT);
        self.state.last_input = Instant::now();
        self.state.current_ramp = next_ramp(self.state.current_ramp, input);

        let ramp = self.state.current_ramp;
        let direction = if ramp < 0 {
            config.direction.min // reverse
        } else {
            config.direction.max // forward
        };
        self.emit(config.verbose, config.direction.output, direction);

        let magnitude = drive_magnitude(ramp, config.direction, config.drive);
        self.emit(config.verbose, config.drive.output, magnitude);
    }
}

/// Ramped drive control for a moving platform
pub struct DriveSmoother<A: ActuatorPort + 'static> {
    inner: Arc<Inner<A>>,
    watchdog: Option<JoinHandle<()>>,
}

impl<A: ActuatorPort + 'static> DriveSmoother<A> {
    pub fn new(port: A, config: DriveConfig) -> Self {
        let core = Core {
            state: DriveState {
                current_ramp: 0,
                last_input: Instant::now(),
                running: false,
            },
            port,
        };

        Self {
            inner: Arc::new(Inner {
                config,
                core: Mutex::new(core),
            }),
            watchdog: None,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.inner.config
    }

    /// Begin accepting drive input and start the watchdog.
    ///
    /// Calling this while already running does nothing.
    pub async fn start(&mut self) {
        {
            let mut core = self.inner.core.lock().await;
            if core.state.running {
                debug!("Drive smoother already running");
                return;
            }
            core.state.running = true;
            core.state.last_input = Instant::now();

            if let Err(e) = core.port.set_refresh_frequency(self.inner.config.refresh_hz) {
                warn!("Failed to set refresh frequency: {}", e);
            }
        }

        self.watchdog = Some(tokio::spawn(watchdog(Arc::clone(&self.inner))));
        info!(
            "Drive smoother started: {}ms watchdog, {}ms input timeout",
            self.inner.config.watchdog_period.as_millis(),
            self.inner.config.input_timeout.as_millis()
        );
    }

    /// Stop the watchdog and bring every output to zero.
    ///
    /// The final stop writes are attempted once each; failures are only logged.
    pub async fn stop(&mut self) {
        self.inner.core.lock().await.state.running = false;

        if let Some(handle) = self.watchdog.take() {
            handle.abort();
            if timeout(self.inner.config.stop_settle, handle).await.is_err() {
                warn!(
                    "Watchdog did not settle within {:?}",
                    self.inner.config.stop_settle
                );
            }
        }

        let config = &self.inner.config;
        let mut core = self.inner.core.lock().await;
        info!("Stopping drive (ramp was {})", core.state.current_ramp);
        for channel in [
            config.drive,
            config.turn,
            config.head_lift,
            config.head_turn,
            config.talk,
        ] {
            core.emit(config.verbose, channel.output, 0);
        }
        core.state.current_ramp = 0;
    }

    /// Ramp drive toward `raw` (clamped to [-100, 100]). Ignored while stopped.
    pub async fn set_drive_input(&self, raw: i32) {
        let mut core = self.inner.core.lock().await;
        if !core.state.running {
            return;
        }
        core.drive(&self.inner.config, raw);
    }

    pub async fn set_turn_input(&self, input: i32) {
        self.set_servo(self.inner.config.turn, input).await;
    }

    pub async fn set_head_lift_input(&self, input: i32) {
        self.set_servo(self.inner.config.head_lift, input).await;
    }

    pub async fn set_head_turn_input(&self, input: i32) {
        self.set_servo(self.inner.config.head_turn, input).await;
    }

    pub async fn set_talk_input(&self, is_talking: bool, level: i32, open_mouth: bool) {
        let talk = self.inner.config.talk;
        let value = talk_value(is_talking, level, open_mouth, talk);
        let mut core = self.inner.core.lock().await;
        core.emit(self.inner.config.verbose, talk.output, value);
    }

    async fn set_servo(&self, channel: ChannelConfig, input: i32) {
        let value = servo_value(input, channel);
        let mut core = self.inner.core.lock().await;
        core.emit(self.inner.config.verbose, channel.output, value);
    }

    pub async fn current_ramp(&self) -> i32 {
        self.inner.core.lock().await.state.current_ramp
    }

    pub async fn status(&self) -> DriveStatus {
        if self.inner.core.lock().await.state.running {
            DriveStatus::Running
        } else {
            DriveStatus::Stopped
        }
    }

    /// True when the last drive input is older than the input timeout
    pub async fn is_stale(&self) -> bool {
        let core = self.inner.core.lock().await;
        core.state.last_input.elapsed() > self.inner.config.input_timeout
    }

    /// Run `f` against the actuator while holding the drive lock
    pub async fn with_port<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        let mut core = self.inner.core.lock().await;
        f(&mut core.port)
    }
}

impl<A: ActuatorPort + 'static> Drop for DriveSmoother<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.watchdog.take() {
            warn!("Drive smoother dropped while running; call stop() to zero outputs");
            handle.abort();
        }
    }
}

async fn watchdog<A: ActuatorPort>(inner: Arc<Inner<A>>) {
    let mut tick = interval(inner.config.watchdog_period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tick.tick().await;

        let mut core = inner.core.lock().await;
        if !core.state.running {
            break;
        }

        let input_age = core.state.last_input.elapsed();
        if input_age > inner.config.input_timeout {
            if core.state.current_ramp != 0 {
                warn!(
                    "Drive input stale ({:?} old), ramping down from {}",
                    input_age, core.state.current_ramp
                );
            }
            core.drive(&inner.config, 0);
        }
    }

    debug!("Watchdog exiting");
}
