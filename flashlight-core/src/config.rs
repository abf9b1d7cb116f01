//! Compile-time tuning shared by the firmware and the emulator.

use core::time::Duration;

/// Frequency of the periodic tick counter supplied by the platform.
pub const TICK_HZ: u32 = 8;

/// How often the battery and temperature acquisitions are re-issued.
pub const SENSOR_UPDATE_HZ: u32 = 8;

/// Rate of the control loop that re-applies the mode brightness.
pub const CONTROL_HZ: u32 = 256;

/// Indicator toggle frequency in normal operation. Halved during UVLO.
pub const BLINK_HZ: u32 = 2;

/// Battery voltage below which the under-voltage lockout engages.
pub const UVLO_VOLTS: f32 = 3.0;

/// Power cycles with an off time at or below this count as a click.
pub const CLICK_GRACE_PERIOD_SECONDS: f32 = 1.0;

/// Delay between asserting the inverting-path override and enabling the boost supply.
pub const BOOST_PRE_ENABLE_DELAY: Duration = Duration::from_millis(1);

/// Delay between enabling the boost supply and releasing the override.
pub const BOOST_POST_ENABLE_DELAY: Duration = Duration::from_millis(10);

/// Number of hardware samples summed per conversion.
pub const ACCUMULATION_FACTOR: u16 = 4;

/// Right shift that undoes [`ACCUMULATION_FACTOR`].
pub const ACCUMULATION_SHIFT: u32 = ACCUMULATION_FACTOR.trailing_zeros();

/// Ticks between two sensor rounds.
pub const fn sensor_period_ticks() -> u32 {
    let period = TICK_HZ / SENSOR_UPDATE_HZ;
    if period == 0 { 1 } else { period }
}

/// Control iterations that run per tick.
pub const fn control_iterations_per_tick() -> u32 {
    let iterations = CONTROL_HZ / TICK_HZ;
    if iterations == 0 { 1 } else { iterations }
}

/// Ticks between two indicator toggles.
pub const fn blink_period_ticks(uvlo_active: bool) -> u32 {
    let period = TICK_HZ / BLINK_HZ;
    if uvlo_active { period * 2 } else { period }
}
