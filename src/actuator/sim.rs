// In-memory actuator for dry runs and tests
//
// Records writes instead of touching hardware. The write log keeps only the
// most recent entries; the latest signal per output is always retained.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, warn};

use super::{check_ticks, ActuatorError, ActuatorPort, Result};

/// One recorded tick pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub output: u8,
    pub on: u16,
    pub off: u16,
}

/// Write log length kept by `SimulatedActuator::new`
pub const DEFAULT_LOG_CAPACITY: usize = 4096;

#[derive(Debug)]
pub struct SimulatedActuator {
    signals: VecDeque<Signal>,
    capacity: usize,
    latest: BTreeMap<u8, Signal>,
    frequency_hz: Option<u16>,
    failing: bool,
}

impl Default for SimulatedActuator {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` writes in the log, dropping the oldest
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            signals: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
            latest: BTreeMap::new(),
            frequency_hz: None,
            failing: false,
        }
    }

    /// Make every following write fail (or succeed again)
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Logged writes, oldest first
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.iter().copied().collect()
    }

    /// Most recent signal written to `output`
    pub fn last_signal(&self, output: u8) -> Option<Signal> {
        self.latest.get(&output).copied()
    }

    pub fn frequency_hz(&self) -> Option<u16> {
        self.frequency_hz
    }

    /// Empty the write log. Latest signals per output are kept.
    pub fn clear(&mut self) {
        self.signals.clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.failing {
            warn!("Simulated actuator rejecting write");
            return Err(ActuatorError::Unavailable("simulated failure".to_string()));
        }
        Ok(())
    }
}

impl ActuatorPort for SimulatedActuator {
    fn set_channel_signal(&mut self, output: u8, on: u16, off: u16) -> Result<()> {
        self.check_available()?;
        check_ticks(output, on, off)?;

        debug!("Sim output {}: on={}, off={}", output, on, off);
        let signal = Signal { output, on, off };
        if self.capacity > 0 {
            if self.signals.len() == self.capacity {
                self.signals.pop_front();
            }
            self.signals.push_back(signal);
        }
        self.latest.insert(output, signal);
        Ok(())
    }

    fn set_refresh_frequency(&mut self, hz: u16) -> Result<()> {
        self.check_available()?;

        debug!("Sim refresh frequency {} Hz", hz);
        self.frequency_hz = Some(hz);
        Ok(())
    }
}
