#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Embassy time base adapted to the core's tick and telemetry clocks.

use core::time::Duration;

use embassy_time::Instant;
use flashlight_core::config::TICK_HZ;
use flashlight_core::platform::TickSource;
use flashlight_core::telemetry::TelemetryInstant;

/// Monotonic instant stored in telemetry records.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub const fn into_embassy(self) -> Instant {
        self.0
    }

    pub fn as_micros(self) -> u64 {
        self.0.as_micros()
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(value: Instant) -> Self {
        Self(value)
    }
}

impl TelemetryInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        let micros = self.0.as_micros().saturating_sub(earlier.0.as_micros());
        Duration::from_micros(micros)
    }
}

/// Tick counter at [`TICK_HZ`] derived from the embassy time driver.
#[derive(Copy, Clone, Debug, Default)]
pub struct TickClock;

impl TickSource for TickClock {
    #[allow(clippy::cast_possible_truncation)]
    fn ticks(&self) -> u32 {
        // Truncation keeps the counter wrapping, which every consumer tolerates.
        (Instant::now().as_ticks() * u64::from(TICK_HZ) / embassy_time::TICK_HZ) as u32
    }
}
