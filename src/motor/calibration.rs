// Per-servo calibration: tick range, angle range and refresh rate
//
// Tick and angle ranges define a linear map between the two spaces.

use serde::{Deserialize, Serialize};

/// Full scale of the 12-bit PWM counter
pub const TICKS_PER_PERIOD: i32 = 4096;

/// Highest tick the PWM counter accepts
pub const MAX_TICK: u16 = 4095;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid calibration for {motor_id}: {reason}")]
pub struct CalibrationError {
    pub motor_id: String,
    pub reason: &'static str,
}

/// Fixed properties of a servo, set once at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCalibration")]
pub struct Calibration {
    min_tick: u16,
    max_tick: u16,
    min_angle: f64,
    max_angle: f64,
    refresh_frequency_hz: u16,
    motor_id: String,
}

// Unchecked form used while deserializing
#[derive(Deserialize)]
struct RawCalibration {
    min_tick: u16,
    max_tick: u16,
    min_angle: f64,
    max_angle: f64,
    refresh_frequency_hz: u16,
    motor_id: String,
}

impl TryFrom<RawCalibration> for Calibration {
    type Error = CalibrationError;

    fn try_from(raw: RawCalibration) -> Result<Self, Self::Error> {
        Calibration::new(
            raw.motor_id,
            raw.min_tick,
            raw.max_tick,
            raw.min_angle,
            raw.max_angle,
            raw.refresh_frequency_hz,
        )
    }
}

impl Calibration {
    pub fn new(
        motor_id: impl Into<String>,
        min_tick: u16,
        max_tick: u16,
        min_angle: f64,
        max_angle: f64,
        refresh_frequency_hz: u16,
    ) -> Result<Self, CalibrationError> {
        let motor_id = motor_id.into();
        let invalid = |reason| CalibrationError {
            motor_id: motor_id.clone(),
            reason,
        };

        if min_tick >= max_tick {
            return Err(invalid("min_tick must be below max_tick"));
        }
        if max_tick > MAX_TICK {
            return Err(invalid("max_tick exceeds the 12-bit counter"));
        }
        if min_angle.is_nan() || max_angle.is_nan() || min_angle >= max_angle {
            return Err(invalid("min_angle must be below max_angle"));
        }
        // 1000 / hz must stay non-zero for ticks_per_millisecond
        if refresh_frequency_hz == 0 || refresh_frequency_hz > 1000 {
            return Err(invalid("refresh frequency must be 1..=1000 Hz"));
        }

        Ok(Self {
            min_tick,
            max_tick,
            min_angle,
            max_angle,
            refresh_frequency_hz,
            motor_id,
        })
    }

    /// TowerPro MG995R on a 50 Hz board
    pub fn tower_pro_mg995r() -> Self {
        Self {
            min_tick: 205,
            max_tick: 410,
            min_angle: -90.0,
            max_angle: 90.0,
            refresh_frequency_hz: 50,
            motor_id: "TowerPro MG995R".to_string(),
        }
    }

    pub fn min_tick(&self) -> u16 {
        self.min_tick
    }

    pub fn max_tick(&self) -> u16 {
        self.max_tick
    }

    pub fn min_angle(&self) -> f64 {
        self.min_angle
    }

    pub fn max_angle(&self) -> f64 {
        self.max_angle
    }

    pub fn refresh_frequency_hz(&self) -> u16 {
        self.refresh_frequency_hz
    }

    pub fn motor_id(&self) -> &str {
        &self.motor_id
    }

    pub fn clamp_tick(&self, tick: i32) -> u16 {
        tick.clamp(self.min_tick as i32, self.max_tick as i32) as u16
    }

    pub fn clamp_angle(&self, angle: f64) -> f64 {
        angle.clamp(self.min_angle, self.max_angle)
    }

    /// Linear angle -> tick map, truncated toward zero. Not clamped.
    pub fn angle_to_ticks(&self, angle: f64) -> i32 {
        let angle_delta = self.max_angle - self.min_angle;
        let tick_delta = (self.max_tick - self.min_tick) as f64;
        let from_min = angle - self.min_angle;
        (tick_delta * from_min / angle_delta + self.min_tick as f64) as i32
    }

    /// Inverse of `angle_to_ticks`
    pub fn ticks_to_angle(&self, ticks: i32) -> f64 {
        let from_min = (ticks - self.min_tick as i32) as f64;
        let tick_delta = (self.max_tick - self.min_tick) as f64;
        let angle_delta = self.max_angle - self.min_angle;
        from_min * angle_delta / tick_delta + self.min_angle
    }

    /// Counter ticks per millisecond of pulse at this refresh rate.
    /// Playback uses it to report pulse widths.
    pub fn ticks_per_millisecond(&self) -> i32 {
        let millisecond_refresh = 1000 / self.refresh_frequency_hz as i32;
        TICKS_PER_PERIOD / millisecond_refresh
    }
}
