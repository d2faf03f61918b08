// Serial PWM bridge
//
// Targets custom bridge firmware: a USB microcontroller that relays frames to
// the PWM driver chip. No off-the-shelf board speaks this protocol.
// Frame format: [0xFF, 0xFF, Address, Length, Instruction, Params..., Checksum]

use serialport::{self, SerialPort};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

use super::{check_ticks, ActuatorPort, Result};

/// Default serial configuration for the bridge
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Frame header bytes
const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Instruction set
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Instruction {
    SetChannel = 0x10,
    SetFrequency = 0x11,
}

/// PWM bridge on a serial line, addressing one driver board
pub struct SerialBridge {
    port: Box<dyn SerialPort>,
    address: u8,
}

impl SerialBridge {
    /// Open a bridge for the board at `address`
    pub fn open(port_name: &str, address: u8) -> Result<Self> {
        Self::open_with_baudrate(port_name, address, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, address: u8, baudrate: u32) -> Result<Self> {
        info!("Opening PWM bridge on {} (board 0x{:02X})", port_name, address);
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port, address })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Checksum over everything after the header
    fn checksum(data: &[u8]) -> u8 {
        let sum: u16 = data.iter().map(|&b| b as u16).sum();
        (!sum & 0xFF) as u8
    }

    fn build_frame(address: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
        let length = (params.len() + 2) as u8; // params + instruction + checksum
        let mut frame = Vec::with_capacity(6 + params.len());

        frame.extend_from_slice(&HEADER);
        frame.push(address);
        frame.push(length);
        frame.push(instruction as u8);
        frame.extend_from_slice(params);

        let checksum = Self::checksum(&frame[2..]);
        frame.push(checksum);

        frame
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()?;
        Ok(())
    }
}

impl ActuatorPort for SerialBridge {
    fn set_channel_signal(&mut self, output: u8, on: u16, off: u16) -> Result<()> {
        check_ticks(output, on, off)?;

        let [on_lo, on_hi] = on.to_le_bytes();
        let [off_lo, off_hi] = off.to_le_bytes();
        let params = [output, on_lo, on_hi, off_lo, off_hi];

        let frame = Self::build_frame(self.address, Instruction::SetChannel, &params);
        debug!("Bridge output {}: on={}, off={}", output, on, off);
        self.send_frame(&frame)
    }

    fn set_refresh_frequency(&mut self, hz: u16) -> Result<()> {
        let frame = Self::build_frame(self.address, Instruction::SetFrequency, &hz.to_le_bytes());
        info!("Setting PWM refresh frequency to {} Hz", hz);
        self.send_frame(&frame)
    }
}
