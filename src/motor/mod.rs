// Servo model for keyframed animation
//
// Provides:
// - Per-servo calibration (tick/angle ranges, refresh rate)
// - Keyframe timelines with time-ordered editing
// - The Motor type tying both to a board channel

pub mod calibration;
pub mod keyframes;
mod servo;

pub use calibration::{Calibration, CalibrationError, MAX_TICK};
pub use keyframes::{Keyframe, Timeline, TimelineError};
pub use servo::{Motor, MotorSpec};
