//! Collaborators the control core consumes from the board.
//!
//! The firmware implements these on top of its HAL; the emulator implements
//! them with simulated state.

use core::fmt;

/// Free-running tick counter at [`crate::config::TICK_HZ`].
pub trait TickSource {
    /// Wraps around at `u32::MAX`.
    fn ticks(&self) -> u32;
}

/// Non-volatile storage for the click counter.
pub trait CounterStore {
    fn load(&mut self) -> Result<u8, StoreError>;

    fn save(&mut self, value: u8) -> Result<(), StoreError>;
}

/// Line-oriented text output.
pub trait StatusSink {
    fn write_line(&mut self, line: &str);
}

/// A plain digital enable output.
pub trait EnableLine {
    fn set_enabled(&mut self, enabled: bool);
}

/// Failure reported by a [`CounterStore`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The backing medium could not be read.
    Read,
    /// The backing medium rejected the write or erase.
    Write,
    /// Nothing has been stored yet.
    Blank,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Read => f.write_str("counter store read failed"),
            StoreError::Write => f.write_str("counter store write failed"),
            StoreError::Blank => f.write_str("counter store is blank"),
        }
    }
}
