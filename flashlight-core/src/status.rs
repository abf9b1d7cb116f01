//! Shared status surface for the firmware and emulator front-ends.
//!
//! Both targets assemble a [`StatusSnapshot`] from the live control state and
//! render it through [`StatusFormatter`], so the text lines match across
//! front-ends.

use core::fmt;

use heapless::String;

use crate::brightness::{Brightness, DriveReference};
use crate::modes::Mode;
use crate::platform::StatusSink;
use crate::power::{DriveOutput, OutputState, PowerSequencer, PowerStage};
use crate::sensors::{SensorKind, kelvin_to_celsius};

/// Longest line the formatter produces.
pub const STATUS_LINE_CAPACITY: usize = 96;

/// Most recent derived value of each sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorReadings {
    pub battery_volts: Option<f32>,
    pub internal_kelvin: Option<f32>,
    pub external_kelvin: Option<f32>,
    pub off_time_seconds: Option<f32>,
}

impl SensorReadings {
    pub const fn new() -> Self {
        Self {
            battery_volts: None,
            internal_kelvin: None,
            external_kelvin: None,
            off_time_seconds: None,
        }
    }

    /// Stores a delivered value under its sensor.
    pub fn update(&mut self, kind: SensorKind, value: f32) {
        let slot = match kind {
            SensorKind::BatteryLevel => &mut self.battery_volts,
            SensorKind::InternalTemperature => &mut self.internal_kelvin,
            SensorKind::ExternalTemperature => &mut self.external_kelvin,
            SensorKind::OffTime => &mut self.off_time_seconds,
        };
        *slot = Some(value);
    }
}

/// Point-in-time view of the control state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusSnapshot {
    pub mode: Mode,
    pub brightness: Brightness,
    pub drive_reference: DriveReference,
    pub drive_level: u8,
    pub boost: OutputState,
    pub gain_range: OutputState,
    pub uvlo_active: bool,
    pub readings: SensorReadings,
}

impl StatusSnapshot {
    /// Captures the power state of `sequencer` alongside the given readings.
    pub fn capture<P, D>(
        mode: Mode,
        sequencer: &PowerSequencer<P, D>,
        readings: SensorReadings,
    ) -> Self
    where
        P: PowerStage,
        D: DriveOutput,
    {
        let (drive_reference, drive_level) = sequencer.drive_setting();
        Self {
            mode,
            brightness: sequencer.last_applied(),
            drive_reference,
            drive_level,
            boost: sequencer.boost_state(),
            gain_range: sequencer.gain_range_state(),
            uvlo_active: sequencer.uvlo_active(),
            readings,
        }
    }
}

/// Renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the power line (e.g. `power mode=ramp boost=on gain=off uvlo=false`).
    pub fn write_power_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "power mode={} boost={} gain={} uvlo={}",
            self.snapshot.mode.label(),
            self.snapshot.boost.label(),
            self.snapshot.gain_range.label(),
            self.snapshot.uvlo_active
        )
    }

    /// Writes the drive line (e.g. `drive brightness=400000 ref=0V55 level=11`).
    pub fn write_drive_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "drive brightness={} ref={} level={}",
            self.snapshot.brightness,
            self.snapshot.drive_reference.label(),
            self.snapshot.drive_level
        )
    }

    /// Writes the sensors line (e.g. `sensors battery=3.70V ntc=24.8C die=n/a off-time=0.31s`).
    pub fn write_sensors_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let readings = &self.snapshot.readings;
        writer.write_str("sensors battery=")?;
        write_reading(writer, readings.battery_volts, "V")?;
        writer.write_str(" ntc=")?;
        write_reading(writer, readings.external_kelvin.map(kelvin_to_celsius), "C")?;
        writer.write_str(" die=")?;
        write_reading(writer, readings.internal_kelvin.map(kelvin_to_celsius), "C")?;
        writer.write_str(" off-time=")?;
        write_reading(writer, readings.off_time_seconds, "s")
    }

    /// Renders every line into `sink`.
    pub fn emit<S: StatusSink>(&self, sink: &mut S) -> fmt::Result {
        let mut line: String<STATUS_LINE_CAPACITY> = String::new();
        let writers: [fn(&Self, &mut String<STATUS_LINE_CAPACITY>) -> fmt::Result; 3] = [
            Self::write_power_line,
            Self::write_drive_line,
            Self::write_sensors_line,
        ];
        for write_line in writers {
            line.clear();
            write_line(self, &mut line)?;
            sink.write_line(&line);
        }
        Ok(())
    }
}

fn write_reading<W: fmt::Write>(writer: &mut W, value: Option<f32>, unit: &str) -> fmt::Result {
    match value {
        Some(value) => write!(writer, "{value:.2}{unit}"),
        None => writer.write_str("n/a"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            mode: Mode::RampLoop,
            brightness: 400_000,
            drive_reference: DriveReference::V0_55,
            drive_level: 11,
            boost: OutputState::Enabled,
            gain_range: OutputState::Disabled,
            uvlo_active: false,
            readings: SensorReadings::new(),
        }
    }

    struct Lines(heapless::Vec<String<STATUS_LINE_CAPACITY>, 4>);

    impl StatusSink for Lines {
        fn write_line(&mut self, line: &str) {
            let mut owned = String::new();
            owned.push_str(line).ok();
            self.0.push(owned).ok();
        }
    }

    #[test]
    fn power_and_drive_lines() {
        let snapshot = snapshot();
        let formatter = StatusFormatter::new(&snapshot);
        let mut line: String<STATUS_LINE_CAPACITY> = String::new();

        formatter.write_power_line(&mut line).expect("fits");
        assert_eq!(line.as_str(), "power mode=ramp boost=on gain=off uvlo=false");

        line.clear();
        formatter.write_drive_line(&mut line).expect("fits");
        assert_eq!(line.as_str(), "drive brightness=400000 ref=0V55 level=11");
    }

    #[test]
    fn sensors_line_reports_missing_readings() {
        let mut snapshot = snapshot();
        snapshot.readings.update(SensorKind::BatteryLevel, 3.7);
        snapshot.readings.update(SensorKind::ExternalTemperature, 298.15);

        let mut line: String<STATUS_LINE_CAPACITY> = String::new();
        StatusFormatter::new(&snapshot)
            .write_sensors_line(&mut line)
            .expect("fits");
        assert_eq!(
            line.as_str(),
            "sensors battery=3.70V ntc=25.00C die=n/a off-time=n/a"
        );
    }

    #[test]
    fn emit_writes_three_lines() {
        let snapshot = snapshot();
        let mut sink = Lines(heapless::Vec::new());
        StatusFormatter::new(&snapshot).emit(&mut sink).expect("fits");
        assert_eq!(sink.0.len(), 3);
        assert!(sink.0[2].starts_with("sensors"));
    }
}
