// A calibrated servo with its keyframe timeline
//
// Ticks written through the motor are clamped into the calibrated range;
// angles are clamped first and then mapped to ticks.

use serde::{Deserialize, Serialize};

use super::calibration::Calibration;
use super::keyframes::{Keyframe, Result, Timeline, TimelineError};

/// A servo attached to a board channel
#[derive(Debug, Clone, PartialEq)]
pub struct Motor {
    calibration: Calibration,
    channel: u8, // 1-based board channel
    timeline: Timeline,
}

impl Motor {
    pub fn new(calibration: Calibration, channel: u8) -> Self {
        Self {
            calibration,
            channel,
            timeline: Timeline::new(),
        }
    }

    /// Adopt an existing timeline, clamping its ticks into the calibrated range
    pub fn with_timeline(calibration: Calibration, channel: u8, mut timeline: Timeline) -> Self {
        timeline.map_ticks(|tick| calibration.clamp_tick(tick as i32));
        Self {
            calibration,
            channel,
            timeline,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn motor_id(&self) -> &str {
        self.calibration.motor_id()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn number_of_keys(&self) -> usize {
        self.timeline.len()
    }

    pub fn first_index(&self) -> Option<usize> {
        self.timeline.first_index()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.timeline.last_index()
    }

    pub fn tick_at(&self, index: usize) -> Result<u16> {
        self.timeline.tick_at(index)
    }

    pub fn time_at(&self, index: usize) -> Result<u64> {
        self.timeline.time_at(index)
    }

    /// Set the tick at `index`, clamped to the calibrated range
    pub fn set_tick(&mut self, index: usize, tick: i32) -> Result<()> {
        let tick = self.calibration.clamp_tick(tick);
        self.timeline.set_tick_raw(index, tick)
    }

    pub fn set_time(&mut self, index: usize, time: u64) -> Result<()> {
        self.timeline.set_time(index, time)
    }

    /// Set the position at `index` as an angle, clamped to the calibrated range
    pub fn set_angle(&mut self, index: usize, angle: f64) -> Result<()> {
        let angle = self.calibration.clamp_angle(angle);
        let ticks = self.calibration.angle_to_ticks(angle);
        self.set_tick(index, ticks)
    }

    pub fn angle_at(&self, index: usize) -> Result<f64> {
        let ticks = self.timeline.tick_at(index)?;
        Ok(self.calibration.ticks_to_angle(ticks as i32))
    }

    pub fn append_key(&mut self) -> Result<usize> {
        self.timeline.append_key()
    }

    /// See [`Timeline::insert_key_at`]
    pub fn insert_key_at(&mut self, index: isize) -> Result<usize> {
        self.timeline.insert_key_at(index)
    }

    pub fn remove_key_at(&mut self, index: usize) -> Result<Keyframe> {
        self.timeline.remove_key_at(index)
    }

    pub fn ticks_per_millisecond(&self) -> i32 {
        self.calibration.ticks_per_millisecond()
    }
}

/// On-disk form of a motor, validated on load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorSpec {
    pub channel: u8,
    pub calibration: Calibration,
    #[serde(default)]
    pub keys: Vec<Keyframe>,
}

impl TryFrom<MotorSpec> for Motor {
    type Error = TimelineError;

    fn try_from(spec: MotorSpec) -> Result<Self> {
        let timeline = Timeline::from_keys(spec.keys)?;
        Ok(Motor::with_timeline(spec.calibration, spec.channel, timeline))
    }
}

impl From<&Motor> for MotorSpec {
    fn from(motor: &Motor) -> Self {
        Self {
            channel: motor.channel,
            calibration: motor.calibration.clone(),
            keys: motor.timeline.keys().to_vec(),
        }
    }
}
