#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The control task owns the power sequencer, so contexts that cannot reach
//! it (the panic handler in particular) read the last battery voltage and
//! lockout state from these atomics instead.

use flashlight_core::platform::StatusSink;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

const UNKNOWN_BATTERY: u32 = 0;

/// Millivolt reading of the battery divider (0 == unknown).
static BATTERY_MV: AtomicU32 = AtomicU32::new(UNKNOWN_BATTERY);
/// Mirrors the sequencer's under-voltage lockout flag.
static UVLO_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Stores the latest battery voltage.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn record_battery_volts(volts: f32) {
    // Keep 0 reserved for "unknown" even when the divider reads flat.
    let millivolts = ((volts * 1000.0) as u32).max(1);
    BATTERY_MV.store(millivolts, Ordering::Relaxed);
}

/// Returns the most recent battery reading in millivolts, if any.
pub fn battery_millivolts() -> Option<u32> {
    match BATTERY_MV.load(Ordering::Relaxed) {
        UNKNOWN_BATTERY => None,
        value => Some(value),
    }
}

pub fn record_uvlo(active: bool) {
    UVLO_ACTIVE.store(active, Ordering::Relaxed);
}

pub fn uvlo_active() -> bool {
    UVLO_ACTIVE.load(Ordering::Relaxed)
}

/// Status sink that forwards each line to the log transport.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn write_line(&mut self, line: &str) {
        emit_line(line);
    }
}

#[cfg(target_os = "none")]
fn emit_line(line: &str) {
    defmt::info!("status: {}", line);
}

#[cfg(not(target_os = "none"))]
fn emit_line(line: &str) {
    println!("status: {line}");
}
