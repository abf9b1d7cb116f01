#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Hand-off of derived sensor values from the completion interrupt to the
//! control task.
//!
//! Each sensor owns one [`Signal`]; the interrupt overwrites it and the
//! control task drains it on its next iteration. At most one acquisition per
//! sensor is in flight, so a newer value never hides an unread one.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use flashlight_core::sensors::{ReadingCallback, SensorKind};

/// Written from interrupt context, so the mutex must mask interrupts.
pub type ReadingSignal = Signal<CriticalSectionRawMutex, f32>;

static INTERNAL_TEMPERATURE: ReadingSignal = Signal::new();
static EXTERNAL_TEMPERATURE: ReadingSignal = Signal::new();
static OFF_TIME: ReadingSignal = Signal::new();
static BATTERY_LEVEL: ReadingSignal = Signal::new();

/// Sensors in the order the control task drains them.
pub const DRAIN_ORDER: [SensorKind; 4] = [
    SensorKind::BatteryLevel,
    SensorKind::ExternalTemperature,
    SensorKind::InternalTemperature,
    SensorKind::OffTime,
];

pub fn signal_for(kind: SensorKind) -> &'static ReadingSignal {
    match kind {
        SensorKind::InternalTemperature => &INTERNAL_TEMPERATURE,
        SensorKind::ExternalTemperature => &EXTERNAL_TEMPERATURE,
        SensorKind::OffTime => &OFF_TIME,
        SensorKind::BatteryLevel => &BATTERY_LEVEL,
    }
}

/// Takes the pending value for `kind`, if one arrived.
pub fn take(kind: SensorKind) -> Option<f32> {
    signal_for(kind).try_take()
}

/// Completion callback that posts the value to its sensor's signal.
#[derive(Copy, Clone, Debug)]
pub struct Deliver {
    kind: SensorKind,
}

impl Deliver {
    pub const fn new(kind: SensorKind) -> Self {
        Self { kind }
    }
}

impl ReadingCallback for Deliver {
    fn deliver(self, value: f32) {
        signal_for(self.kind).signal(value);
    }
}
