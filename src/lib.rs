// Animatronic servo runtime
//
// - motor: calibrated servos and their keyframe timelines
// - board: channel allocation on a PWM driver board
// - drive: ramped drive control with a stale-input watchdog
// - playback: timeline playback onto board outputs
// - actuator: the hardware boundary (serial bridge, simulation)

pub mod actuator;
pub mod board;
pub mod config;
pub mod drive;
pub mod messages;
pub mod motor;
pub mod playback;
pub mod runtime;
