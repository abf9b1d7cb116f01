//! Telemetry recorder bound to the firmware clock.
//!
//! Wraps the core ring buffer and mirrors every new record to defmt (or
//! stdout on the host) so stage edges and lockout changes show up live
//! during bring-up.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use flashlight_core::monitor::UvloTransition;
use flashlight_core::power::ApplyReport;
use flashlight_core::sensors::SensorKind;
use flashlight_core::telemetry::{
    TelemetryPayload, TelemetryRecord, TelemetryRecorder as CoreRecorder,
};

use crate::clock::FirmwareInstant;

const UVLO_RECORD_SPAN: u32 = 3;

/// Records telemetry events with firmware timestamps.
pub struct TelemetryRecorder {
    inner: CoreRecorder<FirmwareInstant>,
}

impl TelemetryRecorder {
    pub const fn new() -> Self {
        Self {
            inner: CoreRecorder::new(),
        }
    }

    /// Records the stage edges of an apply and logs each of them.
    pub fn record_apply(&mut self, report: &ApplyReport) {
        let written = self.inner.record_apply(report, FirmwareInstant::now());
        self.log_latest(written);
    }

    /// Records a lockout change together with its forced apply.
    pub fn record_uvlo(&mut self, transition: &UvloTransition) {
        let first = self.inner.record_uvlo(transition, FirmwareInstant::now());
        // The lockout event is followed by at most two stage edges.
        for record in self.inner.oldest_first() {
            if record.id.wrapping_sub(first) < UVLO_RECORD_SPAN {
                emit_log(record);
            }
        }
    }

    /// Records a delivered reading. Readings are not logged; they arrive at
    /// the sensor rate and would drown the stage events.
    pub fn record_reading(&mut self, kind: SensorKind, value: f32) {
        self.inner.record_reading(kind, value, FirmwareInstant::now());
    }

    fn log_latest(&self, count: usize) {
        let total = self.inner.len();
        for record in self.inner.oldest_first().skip(total.saturating_sub(count)) {
            emit_log(record);
        }
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_micros(record: &TelemetryRecord<FirmwareInstant>) -> Option<u64> {
    match record.details {
        TelemetryPayload::Stage(stage) => stage
            .elapsed_since_previous
            .map(|elapsed| u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)),
        _ => None,
    }
}

#[cfg(target_os = "none")]
fn emit_log(record: &TelemetryRecord<FirmwareInstant>) {
    let timestamp_us = record.timestamp.as_micros();
    if let Some(delta) = elapsed_micros(record) {
        defmt::info!(
            "telemetry #{} {} t={}us delta={}us",
            record.id,
            record.event,
            timestamp_us,
            delta
        );
    } else {
        defmt::info!("telemetry #{} {} t={}us", record.id, record.event, timestamp_us);
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(record: &TelemetryRecord<FirmwareInstant>) {
    let timestamp_us = record.timestamp.as_micros();
    if let Some(delta) = elapsed_micros(record) {
        println!(
            "telemetry #{} {} t={}us delta={}us",
            record.id, record.event, timestamp_us, delta
        );
    } else {
        println!("telemetry #{} {} t={}us", record.id, record.event, timestamp_us);
    }
}
