// Define message types for the runtime

use serde::{Deserialize, Serialize};

// Command from teleop/scripts -> runtime
// All axes are nominally -100..=100 and clamped on intake
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriveCommand {
    #[serde(default)]
    pub drive: i32,
    #[serde(default)]
    pub turn: i32,
    #[serde(default)]
    pub head_lift: i32,
    #[serde(default)]
    pub head_turn: i32,
    #[serde(default)]
    pub talk: TalkCommand,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TalkCommand {
    pub is_talking: bool,
    pub level: i32,
    pub open_mouth: bool,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_command_defaults() {
        let cmd: DriveCommand = serde_json::from_str(r#"{"drive": 40}"#).unwrap();
        assert_eq!(cmd.drive, 40);
        assert_eq!(cmd.turn, 0);
        assert!(!cmd.talk.open_mouth);
    }

    #[test]
    fn test_health_wire_format() {
        assert_eq!(serde_json::to_string(&RuntimeHealth::CmdStale).unwrap(), r#""cmd_stale""#);
    }
}
