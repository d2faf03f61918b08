// PWM driver board: a fixed set of channels, each holding at most one motor

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::motor::{Motor, MotorSpec, TimelineError};

/// PCA9685 layout
pub const PCA9685_CHANNELS: u8 = 16;
pub const PCA9685_FREQUENCY_HZ: u16 = 50;
pub const PCA9685_DEFAULT_ADDRESS: u8 = 0x40;

/// Error types for channel allocation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoardError {
    #[error("Channel {channel} outside 1..={channel_count}")]
    ChannelOutOfRange { channel: u8, channel_count: u8 },

    #[error("Channel {channel} already in use by {existing}")]
    ChannelCollision { channel: u8, existing: String },

    #[error("Invalid timeline on channel {channel}: {source}")]
    Timeline {
        channel: u8,
        #[source]
        source: TimelineError,
    },
}

#[derive(Debug, Clone)]
pub struct Board {
    address: u8,
    channel_count: u8,
    frequency_hz: u16,
    motors: BTreeMap<u8, Motor>,
}

impl Board {
    pub fn new(address: u8, channel_count: u8, frequency_hz: u16) -> Self {
        Self {
            address,
            channel_count,
            frequency_hz,
            motors: BTreeMap::new(),
        }
    }

    /// 16-channel PCA9685 at 50 Hz
    pub fn pca9685(address: u8) -> Self {
        Self::new(address, PCA9685_CHANNELS, PCA9685_FREQUENCY_HZ)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn channel_count(&self) -> u8 {
        self.channel_count
    }

    pub fn frequency_hz(&self) -> u16 {
        self.frequency_hz
    }

    /// Attach a motor to its declared channel. The board is untouched on failure.
    pub fn add_motor(&mut self, motor: Motor) -> Result<(), BoardError> {
        let channel = motor.channel();
        if !(1..=self.channel_count).contains(&channel) {
            return Err(BoardError::ChannelOutOfRange {
                channel,
                channel_count: self.channel_count,
            });
        }
        if let Some(existing) = self.motors.get(&channel) {
            return Err(BoardError::ChannelCollision {
                channel,
                existing: existing.motor_id().to_string(),
            });
        }

        self.motors.insert(channel, motor);
        Ok(())
    }

    /// Detach the motor on `channel`, if any
    pub fn remove_motor(&mut self, channel: u8) -> Option<Motor> {
        self.motors.remove(&channel)
    }

    /// Independent copy of the attached motors, in channel order
    pub fn attached_motors(&self) -> Vec<Motor> {
        self.motors.values().cloned().collect()
    }

    /// Borrowing iterator for playback
    pub fn motors(&self) -> impl Iterator<Item = &Motor> {
        self.motors.values()
    }

    pub fn motor(&self, channel: u8) -> Option<&Motor> {
        self.motors.get(&channel)
    }

    pub fn motor_mut(&mut self, channel: u8) -> Option<&mut Motor> {
        self.motors.get_mut(&channel)
    }

    /// Hardware output index (0-based) for a 1-based board channel
    pub fn output_for(channel: u8) -> u8 {
        channel.saturating_sub(1)
    }
}

/// On-disk form of a board and its motors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSpec {
    #[serde(default = "default_address")]
    pub address: u8,
    #[serde(default = "default_channel_count")]
    pub channel_count: u8,
    #[serde(default = "default_frequency")]
    pub frequency_hz: u16,
    #[serde(default)]
    pub motors: Vec<MotorSpec>,
}

fn default_address() -> u8 {
    PCA9685_DEFAULT_ADDRESS
}

fn default_channel_count() -> u8 {
    PCA9685_CHANNELS
}

fn default_frequency() -> u16 {
    PCA9685_FREQUENCY_HZ
}

impl TryFrom<BoardSpec> for Board {
    type Error = BoardError;

    fn try_from(spec: BoardSpec) -> Result<Self, Self::Error> {
        let mut board = Board::new(spec.address, spec.channel_count, spec.frequency_hz);
        for motor_spec in spec.motors {
            let channel = motor_spec.channel;
            let motor = Motor::try_from(motor_spec)
                .map_err(|source| BoardError::Timeline { channel, source })?;
            board.add_motor(motor)?;
        }
        Ok(board)
    }
}

impl From<&Board> for BoardSpec {
    fn from(board: &Board) -> Self {
        Self {
            address: board.address,
            channel_count: board.channel_count,
            frequency_hz: board.frequency_hz,
            motors: board.motors().map(MotorSpec::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SimulatedActuator;
    use crate::motor::Calibration;
    use crate::playback::Player;

    fn test_motor(channel: u8) -> Motor {
        let cal = Calibration::new("Test Motor MG995R", 204, 410, -90.0, 90.0, 50).unwrap();
        Motor::new(cal, channel)
    }

    fn two_channel_board() -> Board {
        Board::new(0x40, 2, 50)
    }

    #[test]
    fn test_add_motor() {
        let mut board = two_channel_board();
        board.add_motor(test_motor(1)).unwrap();
        assert_eq!(board.attached_motors(), vec![test_motor(1)]);
    }

    #[test]
    fn test_channel_collision() {
        let mut board = two_channel_board();
        board.add_motor(test_motor(1)).unwrap();

        let err = board.add_motor(test_motor(1)).unwrap_err();
        assert!(matches!(err, BoardError::ChannelCollision { channel: 1, .. }));
        assert_eq!(board.attached_motors().len(), 1);
    }

    #[test]
    fn test_channel_out_of_range() {
        let mut board = two_channel_board();
        assert_eq!(
            board.add_motor(test_motor(3)),
            Err(BoardError::ChannelOutOfRange {
                channel: 3,
                channel_count: 2
            })
        );
        assert!(matches!(
            board.add_motor(test_motor(0)),
            Err(BoardError::ChannelOutOfRange { channel: 0, .. })
        ));
        assert!(board.attached_motors().is_empty());
    }

    #[test]
    fn test_more_motors_than_channels() {
        let mut board = two_channel_board();
        board.add_motor(test_motor(1)).unwrap();
        board.add_motor(test_motor(2)).unwrap();
        assert!(board.add_motor(test_motor(3)).is_err());
        assert_eq!(board.attached_motors().len(), 2);
    }

    #[test]
    fn test_remove_motor() {
        let mut board = two_channel_board();
        board.add_motor(test_motor(2)).unwrap();

        assert!(board.remove_motor(1).is_none());
        assert_eq!(board.remove_motor(2), Some(test_motor(2)));
        assert!(board.attached_motors().is_empty());

        // Channel is free again
        board.add_motor(test_motor(2)).unwrap();
    }

    #[test]
    fn test_attached_motors_is_a_snapshot() {
        let mut board = two_channel_board();
        board.add_motor(test_motor(1)).unwrap();

        let mut snapshot = board.attached_motors();
        snapshot[0].append_key().unwrap();
        snapshot.clear();

        let motors = board.attached_motors();
        assert_eq!(motors.len(), 1);
        assert_eq!(motors[0].number_of_keys(), 0);
    }

    #[test]
    fn test_edit_attached_motor() {
        let mut board = two_channel_board();
        board.add_motor(test_motor(2)).unwrap();

        let motor = board.motor_mut(2).unwrap();
        let index = motor.append_key().unwrap();
        motor.set_angle(index, 0.0).unwrap();

        assert_eq!(board.motor(2).unwrap().tick_at(0).unwrap(), 307);
        assert!(board.motor_mut(1).is_none());
    }

    #[test]
    fn test_load_board_spec() {
        let json = r#"{
            "address": 64,
            "channel_count": 16,
            "frequency_hz": 50,
            "motors": [{
                "channel": 3,
                "calibration": {"min_tick":205,"max_tick":410,"min_angle":-90.0,
                    "max_angle":90.0,"refresh_frequency_hz":50,"motor_id":"jaw"},
                "keys": [{"tick":300,"time":0},{"tick":350,"time":1000}]
            }]
        }"#;
        let spec: BoardSpec = serde_json::from_str(json).unwrap();
        let board = Board::try_from(spec).unwrap();

        let motor = board.motor(3).unwrap();
        assert_eq!(motor.motor_id(), "jaw");
        assert_eq!(motor.number_of_keys(), 2);
        assert_eq!(Board::output_for(motor.channel()), 2);
    }

    #[test]
    fn test_load_board_spec_clamps_ticks() {
        let json = r#"{
            "motors": [{
                "channel": 1,
                "calibration": {"min_tick":205,"max_tick":410,"min_angle":-90.0,
                    "max_angle":90.0,"refresh_frequency_hz":50,"motor_id":"jaw"},
                "keys": [{"tick":9000,"time":0},{"tick":10,"time":500}]
            }]
        }"#;
        let spec: BoardSpec = serde_json::from_str(json).unwrap();
        let board = Board::try_from(spec).unwrap();

        let motor = board.motor(1).unwrap();
        assert_eq!(motor.tick_at(0).unwrap(), 410);
        assert_eq!(motor.tick_at(1).unwrap(), 205);

        let mut port = SimulatedActuator::new();
        assert_eq!(Player::new(false).apply_frame(&board, &mut port, 0), 1);
        assert_eq!(port.last_signal(0).map(|s| s.off), Some(410));
    }

    #[test]
    fn test_load_board_spec_collision() {
        let mut board = Board::pca9685(PCA9685_DEFAULT_ADDRESS);
        board.add_motor(test_motor(5)).unwrap();
        let mut spec = BoardSpec::from(&board);
        spec.motors.push(spec.motors[0].clone());

        assert!(matches!(
            Board::try_from(spec),
            Err(BoardError::ChannelCollision { channel: 5, .. })
        ));
    }
}
