// Hardware boundary for PWM output
//
// The rest of the crate only ever talks to hardware through `ActuatorPort`:
// a tick pair per output and a refresh-frequency directive.

pub mod serial;
mod sim;

pub use serial::SerialBridge;
pub use sim::{Signal, SimulatedActuator};

use crate::motor::MAX_TICK;

/// Error types for actuator writes
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tick {tick} on output {output} exceeds {max}", max = MAX_TICK)]
    TickOutOfRange { output: u8, tick: u16 },

    #[error("Actuator unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, ActuatorError>;

/// Anything that can drive PWM outputs
///
/// `output` is the 0-based hardware output index. `on`/`off` are 12-bit
/// counter positions within one refresh period.
pub trait ActuatorPort: Send {
    fn set_channel_signal(&mut self, output: u8, on: u16, off: u16) -> Result<()>;

    fn set_refresh_frequency(&mut self, hz: u16) -> Result<()>;
}

impl<T: ActuatorPort + ?Sized> ActuatorPort for Box<T> {
    fn set_channel_signal(&mut self, output: u8, on: u16, off: u16) -> Result<()> {
        (**self).set_channel_signal(output, on, off)
    }

    fn set_refresh_frequency(&mut self, hz: u16) -> Result<()> {
        (**self).set_refresh_frequency(hz)
    }
}

/// Reject tick pairs the 12-bit counter cannot hold
pub(crate) fn check_ticks(output: u8, on: u16, off: u16) -> Result<()> {
    for tick in [on, off] {
        if tick > MAX_TICK {
            return Err(ActuatorError::TickOutOfRange { output, tick });
        }
    }
    Ok(())
}
