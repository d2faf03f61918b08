// Timeouts, topics, channel configuration
use std::time::Duration;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Watchdog wake period
pub const WATCHDOG_PERIOD: Duration = Duration::from_millis(100);

// Drive input older than this is stale and the watchdog starts braking
pub const INPUT_TIMEOUT: Duration = Duration::from_millis(500);

// Upper bound on waiting for the watchdog to wind down in stop()
pub const STOP_SETTLE: Duration = Duration::from_secs(1);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "animatronic/cmd/drive"; // commands
pub const TOPIC_HEALTH: &str = "animatronic/state/health"; // health status

// Serial port for the PWM bridge
pub const BRIDGE_PORT: &str = "/dev/ttyACM0";

// Refresh rate for analog servos
pub const REFRESH_HZ: u16 = 50;

/// PWM range of one output. `min` may be numerically above `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub output: u8,
    pub min: u16,
    pub max: u16,
}

impl ChannelConfig {
    pub const fn new(output: u8, min: u16, max: u16) -> Self {
        Self { output, min, max }
    }
}

/// Everything the drive smoother needs, passed in at construction
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub drive: ChannelConfig,
    pub direction: ChannelConfig,
    pub turn: ChannelConfig,
    pub head_lift: ChannelConfig,
    pub head_turn: ChannelConfig,
    // Mouth open at `max` (250), closed at `min` (340)
    pub talk: ChannelConfig,
    pub refresh_hz: u16,
    pub watchdog_period: Duration,
    pub input_timeout: Duration,
    pub stop_settle: Duration,
    /// Log every emitted signal at info level
    pub verbose: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            drive: ChannelConfig::new(15, 0, 4095),
            direction: ChannelConfig::new(14, 0, 4095),
            turn: ChannelConfig::new(13, 250, 400),
            head_lift: ChannelConfig::new(12, 200, 350),
            head_turn: ChannelConfig::new(11, 250, 400),
            talk: ChannelConfig::new(10, 340, 250),
            refresh_hz: REFRESH_HZ,
            watchdog_period: WATCHDOG_PERIOD,
            input_timeout: INPUT_TIMEOUT,
            stop_settle: STOP_SETTLE,
            verbose: false,
        }
    }
}
