use defmt::{info, warn};
use embassy_time::{Duration, Ticker};
use flashlight_core::config::{CONTROL_HZ, TICK_HZ};
use flashlight_core::modes::{IndicatorBlinker, Mode, OutputProgram};
use flashlight_core::monitor::{BatteryMonitor, SensorSchedule, UvloTransition};
use flashlight_core::platform::TickSource;
use flashlight_core::sensors::SensorKind;
use flashlight_core::status::{SensorReadings, StatusFormatter, StatusSnapshot};

use super::{FirmwareSequencer, SENSORS};
use crate::clock::TickClock;
use crate::hw::lines::OutputLine;
use crate::readings::{self, Deliver};
use crate::status::{self, LogSink};
use crate::telemetry::TelemetryRecorder;

/// Status lines go out every four seconds.
const STATUS_PERIOD_TICKS: u32 = TICK_HZ * 4;

/// Everything the control loop owns between iterations.
pub struct ControlLoop {
    sequencer: FirmwareSequencer,
    program: OutputProgram,
    schedule: SensorSchedule,
    monitor: BatteryMonitor,
    blinker: IndicatorBlinker,
    battery_enable: OutputLine,
    indicator: OutputLine,
    readings: SensorReadings,
    telemetry: &'static mut TelemetryRecorder,
    clock: TickClock,
    last_status: u32,
}

impl ControlLoop {
    pub fn new(
        sequencer: FirmwareSequencer,
        mode: Mode,
        battery_enable: OutputLine,
        indicator: OutputLine,
        telemetry: &'static mut TelemetryRecorder,
    ) -> Self {
        let clock = TickClock;
        let now = clock.ticks();
        Self {
            sequencer,
            program: OutputProgram::new(mode),
            schedule: SensorSchedule::new(now),
            monitor: BatteryMonitor::new(),
            blinker: IndicatorBlinker::new(now),
            battery_enable,
            indicator,
            readings: SensorReadings::new(),
            telemetry,
            clock,
            last_status: now,
        }
    }

    fn step(&mut self) {
        let now = self.clock.ticks();
        self.drain_readings();
        self.poll_sensors(now);

        let report = self.sequencer.apply_brightness(self.program.next_brightness());
        self.telemetry.record_apply(&report);

        self.blinker
            .poll(now, self.sequencer.uvlo_active(), &mut self.indicator);

        if now.wrapping_sub(self.last_status) >= STATUS_PERIOD_TICKS {
            self.last_status = now;
            self.emit_status();
        }
    }

    fn poll_sensors(&mut self, now: u32) {
        let due = self.schedule.is_due(now);
        let round = SENSORS.lock(|slot| {
            slot.as_mut().map(|hub| {
                self.schedule
                    .poll(now, hub, &mut self.battery_enable, Deliver::new)
            })
        });
        if due && round.is_none_or(|round| round.is_empty()) {
            warn!("sensor round skipped: converters busy");
        }
    }

    fn drain_readings(&mut self) {
        for kind in readings::DRAIN_ORDER {
            let Some(value) = readings::take(kind) else {
                continue;
            };
            self.readings.update(kind, value);
            self.telemetry.record_reading(kind, value);
            if kind == SensorKind::BatteryLevel {
                self.on_battery(value);
            }
        }
    }

    fn on_battery(&mut self, volts: f32) {
        self.monitor.release(&mut self.battery_enable);
        status::record_battery_volts(volts);

        let Some(transition) = self.monitor.on_reading(volts, &mut self.sequencer) else {
            return;
        };
        match transition {
            UvloTransition::Entered(_) => warn!("under-voltage lockout engaged at {} V", volts),
            UvloTransition::Cleared => info!("under-voltage lockout cleared at {} V", volts),
        }
        self.telemetry.record_uvlo(&transition);
        status::record_uvlo(self.sequencer.uvlo_active());
    }

    fn emit_status(&self) {
        let snapshot = StatusSnapshot::capture(self.program.mode(), &self.sequencer, self.readings);
        if StatusFormatter::new(&snapshot).emit(&mut LogSink).is_err() {
            warn!("status line truncated");
        }
    }
}

#[embassy_executor::task]
pub async fn run(mut control: ControlLoop) -> ! {
    let mut ticker = Ticker::every(Duration::from_hz(u64::from(CONTROL_HZ)));
    loop {
        control.step();
        ticker.next().await;
    }
}
