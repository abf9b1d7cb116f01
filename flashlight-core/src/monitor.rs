//! Periodic supervision built on top of the sensor hub.
//!
//! [`SensorSchedule`] re-issues acquisitions at a fixed tick interval,
//! [`BatteryMonitor`] turns battery readings into lockout transitions on the
//! power sequencer, and [`ClickCounter`] converts the off-time measured at
//! power-up into the persisted click count that selects the output mode.

use crate::config::{CLICK_GRACE_PERIOD_SECONDS, UVLO_VOLTS, sensor_period_ticks};
use crate::converter::{ConverterHardware, UnitId};
use crate::platform::{CounterStore, EnableLine, StoreError};
use crate::power::{ApplyReport, DriveOutput, PowerSequencer, PowerStage};
use crate::sensors::{Adc0Channel, Adc1Channel, ReadingCallback, SensorHub, SensorKind};

/// Lockout change caused by one battery reading.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UvloTransition {
    /// Lockout engaged; carries the forced zero-brightness apply.
    Entered(ApplyReport),
    Cleared,
}

/// Drives the under-voltage lockout from battery readings.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BatteryMonitor {
    threshold_volts: f32,
    last_volts: Option<f32>,
}

impl BatteryMonitor {
    pub const fn new() -> Self {
        Self::with_threshold(UVLO_VOLTS)
    }

    pub const fn with_threshold(threshold_volts: f32) -> Self {
        Self {
            threshold_volts,
            last_volts: None,
        }
    }

    pub const fn threshold_volts(&self) -> f32 {
        self.threshold_volts
    }

    pub const fn last_volts(&self) -> Option<f32> {
        self.last_volts
    }

    /// Removes the divider load once the reading has arrived.
    pub fn release<L: EnableLine>(&self, enable: &mut L) {
        enable.set_enabled(false);
    }

    /// Applies one battery reading to the lockout state.
    ///
    /// Every reading below the threshold forces the output off again, so a
    /// brightness request that slipped in between readings cannot stick.
    pub fn on_reading<P, D>(
        &mut self,
        volts: f32,
        sequencer: &mut PowerSequencer<P, D>,
    ) -> Option<UvloTransition>
    where
        P: PowerStage,
        D: DriveOutput,
    {
        self.last_volts = Some(volts);
        let was_active = sequencer.uvlo_active();
        if volts < self.threshold_volts {
            let report = sequencer.signal_under_voltage();
            (!was_active).then_some(UvloTransition::Entered(report))
        } else if was_active {
            sequencer.clear_under_voltage();
            Some(UvloTransition::Cleared)
        } else {
            None
        }
    }
}

impl Default for BatteryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// What [`ClickCounter::record_off_time`] did to the persisted count.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClickOutcome {
    /// Short power cycle; the new count was stored.
    Counted(u8),
    /// Long power cycle; the count was cleared.
    Reset,
    /// Long power cycle with the count already at zero.
    Unchanged,
}

/// Counts quick power cycles through a persisted counter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClickCounter {
    grace_seconds: f32,
}

impl ClickCounter {
    pub const fn new() -> Self {
        Self {
            grace_seconds: CLICK_GRACE_PERIOD_SECONDS,
        }
    }

    /// Stops charging the off-time capacitor so it can be measured.
    pub fn begin_probe<L: EnableLine>(&self, charge: &mut L) {
        charge.set_enabled(false);
    }

    /// Recharges the off-time capacitor for the next power cycle.
    pub fn end_probe<L: EnableLine>(&self, charge: &mut L) {
        charge.set_enabled(true);
    }

    /// Reads the stored count, treating a blank store as zero.
    pub fn load<S: CounterStore>(store: &mut S) -> Result<u8, StoreError> {
        match store.load() {
            Err(StoreError::Blank) => Ok(0),
            other => other,
        }
    }

    /// Updates the stored count from the measured off time.
    ///
    /// An off time within the grace period counts as a click and increments
    /// the count, wrapping at 255. A longer off time resets it, touching the
    /// store only when the count is not already zero. A light left on does
    /// not reset the count; only the next power-up does.
    pub fn record_off_time<S: CounterStore>(
        &self,
        seconds: f32,
        store: &mut S,
    ) -> Result<ClickOutcome, StoreError> {
        let count = Self::load(store)?;
        if seconds <= self.grace_seconds {
            let next = count.wrapping_add(1);
            store.save(next)?;
            Ok(ClickOutcome::Counted(next))
        } else if count != 0 {
            store.save(0)?;
            Ok(ClickOutcome::Reset)
        } else {
            Ok(ClickOutcome::Unchanged)
        }
    }
}

impl Default for ClickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Which temperature derivation a round issues.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TemperatureSource {
    External,
    Internal,
}

impl TemperatureSource {
    const fn other(self) -> Self {
        match self {
            TemperatureSource::External => TemperatureSource::Internal,
            TemperatureSource::Internal => TemperatureSource::External,
        }
    }

    pub const fn kind(self) -> SensorKind {
        match self {
            TemperatureSource::External => SensorKind::ExternalTemperature,
            TemperatureSource::Internal => SensorKind::InternalTemperature,
        }
    }
}

/// Requests issued by one scheduler round.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorRound {
    pub temperature: Option<TemperatureSource>,
    pub battery: bool,
}

impl SensorRound {
    pub const fn is_empty(&self) -> bool {
        self.temperature.is_none() && !self.battery
    }
}

/// Tick-driven re-issue of the periodic acquisitions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SensorSchedule {
    period_ticks: u32,
    last_round: u32,
    next_temperature: TemperatureSource,
}

impl SensorSchedule {
    /// Starts the schedule at `now`; the first round is due one period later.
    pub const fn new(now: u32) -> Self {
        Self {
            period_ticks: sensor_period_ticks(),
            last_round: now,
            next_temperature: TemperatureSource::External,
        }
    }

    pub const fn next_temperature(&self) -> TemperatureSource {
        self.next_temperature
    }

    /// Returns `true` when a round is due at `now`. Tolerates counter wrap.
    pub const fn is_due(&self, now: u32) -> bool {
        now.wrapping_sub(self.last_round) >= self.period_ticks
    }

    /// Issues the due round, if any.
    ///
    /// Each request goes out only when its unit is idle. The temperature
    /// source flips after every accepted temperature request. The battery
    /// divider is armed just before its request and released again if the
    /// request is refused.
    pub fn poll<H0, H1, F, L>(
        &mut self,
        now: u32,
        hub: &mut SensorHub<H0, H1, F>,
        battery_enable: &mut L,
        mut callback: impl FnMut(SensorKind) -> F,
    ) -> SensorRound
    where
        H0: ConverterHardware<Channel = Adc0Channel>,
        H1: ConverterHardware<Channel = Adc1Channel>,
        F: ReadingCallback,
        L: EnableLine,
    {
        let mut round = SensorRound::default();
        if !self.is_due(now) {
            return round;
        }
        self.last_round = now;

        if hub.is_idle(UnitId::Adc0) {
            let source = self.next_temperature;
            let deliver = callback(source.kind());
            let issued = match source {
                TemperatureSource::External => hub.request_external_temperature(deliver),
                TemperatureSource::Internal => hub.request_internal_temperature(deliver),
            };
            if issued.is_ok() {
                self.next_temperature = source.other();
                round.temperature = Some(source);
            }
        }

        if hub.is_idle(UnitId::Adc1) {
            battery_enable.set_enabled(true);
            if hub
                .request_battery_level(callback(SensorKind::BatteryLevel))
                .is_ok()
            {
                round.battery = true;
            } else {
                battery_enable.set_enabled(false);
            }
        }

        round
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brightness::{BRIGHTNESS_MAX, DriveReference, EFFICIENCY_TABLE};
    use crate::converter::Reference;
    use crate::power::OutputState;
    use crate::sensors::{SensorConfig, TemperatureCalibration};
    use core::time::Duration;

    struct Adc<C> {
        converting: bool,
        supported: bool,
        channel: Option<C>,
    }

    impl<C> Adc<C> {
        const fn new() -> Self {
            Self {
                converting: false,
                supported: true,
                channel: None,
            }
        }
    }

    impl<C: Copy> ConverterHardware for Adc<C> {
        type Channel = C;

        fn supports(&self, _reference: Reference) -> bool {
            self.supported
        }

        fn configure(&mut self, _reference: Reference, channel: C, _accumulation: u16) {
            self.channel = Some(channel);
        }

        fn start(&mut self) {
            self.converting = true;
        }

        fn is_converting(&self) -> bool {
            self.converting
        }

        fn take_result(&mut self) -> u16 {
            self.converting = false;
            2_000
        }
    }

    struct Ignore;

    impl ReadingCallback for Ignore {
        fn deliver(self, _value: f32) {}
    }

    type Hub = SensorHub<Adc<Adc0Channel>, Adc<Adc1Channel>, Ignore>;

    fn hub() -> Hub {
        SensorHub::new(
            Adc::new(),
            Adc::new(),
            TemperatureCalibration::default(),
            SensorConfig::default(),
        )
    }

    #[derive(Default)]
    struct Line {
        enabled: bool,
        writes: u32,
    }

    impl EnableLine for Line {
        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
            self.writes += 1;
        }
    }

    #[derive(Default)]
    struct Stage;

    impl PowerStage for Stage {
        fn set_inverting_override(&mut self, _asserted: bool) {}
        fn set_boost_supply(&mut self, _enabled: bool) {}
        fn set_gain_range(&mut self, _enabled: bool) {}
        fn delay(&mut self, _duration: Duration) {}
    }

    struct Output(DriveReference, u8);

    impl DriveOutput for Output {
        fn reference(&self) -> DriveReference {
            self.0
        }
        fn set_reference(&mut self, reference: DriveReference) {
            self.0 = reference;
        }
        fn level(&self) -> u8 {
            self.1
        }
        fn set_level(&mut self, level: u8) {
            self.1 = level;
        }
    }

    struct Store {
        value: Result<u8, StoreError>,
        saves: u32,
    }

    impl CounterStore for Store {
        fn load(&mut self) -> Result<u8, StoreError> {
            self.value
        }

        fn save(&mut self, value: u8) -> Result<(), StoreError> {
            self.value = Ok(value);
            self.saves += 1;
            Ok(())
        }
    }

    #[test]
    fn low_battery_enters_and_clears_lockout() {
        let mut sequencer =
            PowerSequencer::new(Stage, Output(DriveReference::V0_55, 0), EFFICIENCY_TABLE);
        sequencer.initialize();
        sequencer.apply_brightness(BRIGHTNESS_MAX);
        let mut monitor = BatteryMonitor::new();

        assert_eq!(monitor.on_reading(3.7, &mut sequencer), None);
        match monitor.on_reading(2.9, &mut sequencer) {
            Some(UvloTransition::Entered(report)) => assert_eq!(report.effective, 0),
            other => panic!("unexpected transition {other:?}"),
        }
        assert!(sequencer.uvlo_active());
        assert_eq!(sequencer.boost_state(), OutputState::Disabled);
        assert_eq!(monitor.on_reading(2.8, &mut sequencer), None);
        assert_eq!(monitor.last_volts(), Some(2.8));

        assert_eq!(
            monitor.on_reading(3.0, &mut sequencer),
            Some(UvloTransition::Cleared)
        );
        assert!(!sequencer.uvlo_active());
    }

    #[test]
    fn quick_power_cycle_increments_click_count() {
        let counter = ClickCounter::new();
        let mut store = Store {
            value: Ok(255),
            saves: 0,
        };
        assert_eq!(
            counter.record_off_time(0.4, &mut store),
            Ok(ClickOutcome::Counted(0))
        );
        assert_eq!(
            counter.record_off_time(1.0, &mut store),
            Ok(ClickOutcome::Counted(1))
        );
    }

    #[test]
    fn long_power_cycle_resets_only_when_needed() {
        let counter = ClickCounter::new();
        let mut store = Store {
            value: Ok(3),
            saves: 0,
        };
        assert_eq!(counter.record_off_time(5.0, &mut store), Ok(ClickOutcome::Reset));
        assert_eq!(store.saves, 1);
        assert_eq!(
            counter.record_off_time(5.0, &mut store),
            Ok(ClickOutcome::Unchanged)
        );
        assert_eq!(store.saves, 1);
    }

    #[test]
    fn blank_store_counts_from_zero() {
        let counter = ClickCounter::new();
        let mut store = Store {
            value: Err(StoreError::Blank),
            saves: 0,
        };
        assert_eq!(
            counter.record_off_time(0.1, &mut store),
            Ok(ClickOutcome::Counted(1))
        );
    }

    #[test]
    fn schedule_alternates_temperature_sources() {
        let mut hub = hub();
        let mut line = Line::default();
        let mut schedule = SensorSchedule::new(0);

        assert!(schedule.poll(0, &mut hub, &mut line, |_| Ignore).is_empty());

        let round = schedule.poll(1, &mut hub, &mut line, |_| Ignore);
        assert_eq!(round.temperature, Some(TemperatureSource::External));
        assert!(round.battery);
        assert!(line.enabled);
        assert_eq!(hub.adc0_hardware_mut().channel, Some(Adc0Channel::Thermistor));

        assert!(hub.on_completion(UnitId::Adc0));
        assert!(hub.on_completion(UnitId::Adc1));

        let round = schedule.poll(2, &mut hub, &mut line, |_| Ignore);
        assert_eq!(round.temperature, Some(TemperatureSource::Internal));
        assert_eq!(
            hub.adc0_hardware_mut().channel,
            Some(Adc0Channel::TemperatureSensor)
        );
    }

    #[test]
    fn schedule_skips_busy_units() {
        let mut hub = hub();
        let mut line = Line::default();
        let mut schedule = SensorSchedule::new(0);

        schedule.poll(1, &mut hub, &mut line, |_| Ignore);
        let writes = line.writes;
        let round = schedule.poll(2, &mut hub, &mut line, |_| Ignore);
        assert!(round.is_empty());
        assert_eq!(line.writes, writes);
        assert_eq!(schedule.next_temperature(), TemperatureSource::Internal);
    }

    #[test]
    fn refused_battery_request_releases_divider() {
        let mut adc1 = Adc::new();
        adc1.supported = false;
        let mut hub: Hub = SensorHub::new(
            Adc::new(),
            adc1,
            TemperatureCalibration::default(),
            SensorConfig::default(),
        );
        let mut line = Line::default();
        let mut schedule = SensorSchedule::new(0);

        let round = schedule.poll(1, &mut hub, &mut line, |_| Ignore);
        assert!(!round.battery);
        assert_eq!(round.temperature, Some(TemperatureSource::External));
        assert!(!line.enabled);
        assert_eq!(line.writes, 2);
        assert!(hub.is_idle(UnitId::Adc1));
    }

    #[test]
    fn battery_reading_releases_divider() {
        let mut line = Line::default();
        line.set_enabled(true);
        BatteryMonitor::new().release(&mut line);
        assert!(!line.enabled);
    }

    #[test]
    fn schedule_tolerates_tick_wrap() {
        let schedule = SensorSchedule::new(u32::MAX);
        assert!(schedule.is_due(0));
    }
}
