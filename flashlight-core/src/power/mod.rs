//! Power-stage sequencing and under-voltage lockout.
//!
//! [`PowerSequencer`] owns the boost converter enable, the gain-range select
//! stage and the drive-level output. It tracks each stage as a tri-state so
//! that the first transition after reset always reaches the hardware, and
//! skips every write that would not change the configured value.
//!
//! Brightness requests flow through [`PowerSequencer::apply_brightness`]:
//! UVLO override, boost enable, table lookup, drive writes, gain-range
//! select, and boost disable at zero.

use core::time::Duration;

use crate::brightness::{Brightness, BrightnessTable, DriveReference, DriveSetting};
use crate::config::{BOOST_POST_ENABLE_DELAY, BOOST_PRE_ENABLE_DELAY};

/// Known state of a switched output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputState {
    /// Not driven since reset.
    Unknown,
    Enabled,
    Disabled,
}

impl OutputState {
    pub const fn is_enabled(self) -> bool {
        matches!(self, OutputState::Enabled)
    }

    pub const fn label(self) -> &'static str {
        match self {
            OutputState::Unknown => "unknown",
            OutputState::Enabled => "on",
            OutputState::Disabled => "off",
        }
    }
}

/// Direction of a stage transition that reached the hardware.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StageEdge {
    Enabled,
    Disabled,
}

/// Switched outputs of the analog front end.
pub trait PowerStage {
    /// Drives the inverting-path override that suppresses the start-up flash.
    fn set_inverting_override(&mut self, asserted: bool);

    /// Switches the boost converter and op-amp supply.
    fn set_boost_supply(&mut self, enabled: bool);

    /// Switches the high-range gain stage.
    fn set_gain_range(&mut self, enabled: bool);

    /// Busy-waits for a short, fixed interval.
    fn delay(&mut self, duration: Duration);
}

/// Drive-level DAC with readable configuration.
pub trait DriveOutput {
    fn reference(&self) -> DriveReference;

    fn set_reference(&mut self, reference: DriveReference);

    fn level(&self) -> u8;

    fn set_level(&mut self, level: u8);
}

/// What [`PowerSequencer::apply_brightness`] did.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApplyOutcome {
    /// Same non-zero brightness as last time; nothing past the boost check ran.
    Unchanged,
    /// The table was consulted and the drive setting applied.
    Applied(DriveSetting),
}

/// Summary of one brightness apply, used for telemetry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ApplyReport {
    /// Brightness that was actually applied after the UVLO override.
    pub effective: Brightness,
    pub outcome: ApplyOutcome,
    pub boost: Option<StageEdge>,
    pub gain_range: Option<StageEdge>,
    /// `true` when UVLO forced the request to zero.
    pub forced_off: bool,
}

/// Sequencer for the boost, gain-range and drive outputs.
pub struct PowerSequencer<P, D> {
    stage: P,
    output: D,
    table: BrightnessTable,
    boost: OutputState,
    gain_range: OutputState,
    uvlo_active: bool,
    last_applied: Brightness,
}

impl<P, D> PowerSequencer<P, D>
where
    P: PowerStage,
    D: DriveOutput,
{
    /// Creates a sequencer with both stages in the unknown state.
    ///
    /// Call [`PowerSequencer::initialize`] before the first apply.
    pub const fn new(stage: P, output: D, table: BrightnessTable) -> Self {
        Self {
            stage,
            output,
            table,
            boost: OutputState::Unknown,
            gain_range: OutputState::Unknown,
            uvlo_active: false,
            last_applied: 0,
        }
    }

    /// Drives both stages to a known disabled state.
    pub fn initialize(&mut self) {
        self.disable_boost();
        self.disable_gain_range();
    }

    pub const fn boost_state(&self) -> OutputState {
        self.boost
    }

    pub const fn gain_range_state(&self) -> OutputState {
        self.gain_range
    }

    pub const fn uvlo_active(&self) -> bool {
        self.uvlo_active
    }

    pub const fn last_applied(&self) -> Brightness {
        self.last_applied
    }

    pub const fn table(&self) -> &BrightnessTable {
        &self.table
    }

    /// Drive setting currently programmed into the output.
    pub fn drive_setting(&self) -> (DriveReference, u8) {
        (self.output.reference(), self.output.level())
    }

    pub fn stage(&self) -> &P {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut P {
        &mut self.stage
    }

    pub fn output(&self) -> &D {
        &self.output
    }

    /// Enables the boost stage with the start-up flash suppression sequence.
    ///
    /// Refused while UVLO is active. Returns `true` when the hardware was
    /// switched.
    pub fn enable_boost(&mut self) -> bool {
        if self.uvlo_active || self.boost == OutputState::Enabled {
            return false;
        }
        self.stage.set_inverting_override(true);
        self.stage.delay(BOOST_PRE_ENABLE_DELAY);
        self.stage.set_boost_supply(true);
        self.stage.delay(BOOST_POST_ENABLE_DELAY);
        self.stage.set_inverting_override(false);
        self.boost = OutputState::Enabled;
        true
    }

    /// Returns `true` when the hardware was switched.
    pub fn disable_boost(&mut self) -> bool {
        if self.boost == OutputState::Disabled {
            return false;
        }
        self.stage.set_boost_supply(false);
        self.boost = OutputState::Disabled;
        true
    }

    /// Returns `true` when the hardware was switched.
    pub fn enable_gain_range(&mut self) -> bool {
        if self.gain_range == OutputState::Enabled {
            return false;
        }
        self.stage.set_gain_range(true);
        self.gain_range = OutputState::Enabled;
        true
    }

    /// Returns `true` when the hardware was switched.
    pub fn disable_gain_range(&mut self) -> bool {
        if self.gain_range == OutputState::Disabled {
            return false;
        }
        self.stage.set_gain_range(false);
        self.gain_range = OutputState::Disabled;
        true
    }

    /// Applies a brightness request. Safe to call on every control tick.
    pub fn apply_brightness(&mut self, requested: Brightness) -> ApplyReport {
        let forced_off = self.uvlo_active && requested != 0;
        let requested = if self.uvlo_active { 0 } else { requested };
        let mut boost = None;
        let mut gain_range = None;

        if requested != 0 {
            if self.boost != OutputState::Enabled && self.enable_boost() {
                boost = Some(StageEdge::Enabled);
            }
            if requested == self.last_applied {
                return ApplyReport {
                    effective: requested,
                    outcome: ApplyOutcome::Unchanged,
                    boost,
                    gain_range,
                    forced_off,
                };
            }
        }

        let setting = self.table.map(requested);
        if self.output.reference() != setting.range.reference {
            self.output.set_reference(setting.range.reference);
        }
        if self.output.level() != setting.level {
            self.output.set_level(setting.level);
        }

        if setting.range.high_range {
            if self.enable_gain_range() {
                gain_range = Some(StageEdge::Enabled);
            }
        } else if self.disable_gain_range() {
            gain_range = Some(StageEdge::Disabled);
        }

        if requested == 0 && self.disable_boost() {
            boost = Some(StageEdge::Disabled);
        }

        self.last_applied = requested;
        ApplyReport {
            effective: requested,
            outcome: ApplyOutcome::Applied(setting),
            boost,
            gain_range,
            forced_off,
        }
    }

    /// Enters under-voltage lockout and forces the output off.
    pub fn signal_under_voltage(&mut self) -> ApplyReport {
        self.uvlo_active = true;
        self.apply_brightness(0)
    }

    /// Leaves under-voltage lockout. The next non-zero apply re-enables boost.
    pub fn clear_under_voltage(&mut self) {
        self.uvlo_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brightness::{BRIGHTNESS_MAX, EFFICIENCY_TABLE};
    use heapless::Vec;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    enum Write {
        Override(bool),
        Boost(bool),
        Gain(bool),
        Delay(Duration),
    }

    #[derive(Default)]
    struct SpyStage {
        writes: Vec<Write, 64>,
    }

    impl PowerStage for SpyStage {
        fn set_inverting_override(&mut self, asserted: bool) {
            self.writes.push(Write::Override(asserted)).ok();
        }

        fn set_boost_supply(&mut self, enabled: bool) {
            self.writes.push(Write::Boost(enabled)).ok();
        }

        fn set_gain_range(&mut self, enabled: bool) {
            self.writes.push(Write::Gain(enabled)).ok();
        }

        fn delay(&mut self, duration: Duration) {
            self.writes.push(Write::Delay(duration)).ok();
        }
    }

    struct SpyOutput {
        reference: DriveReference,
        level: u8,
        writes: u32,
    }

    impl DriveOutput for SpyOutput {
        fn reference(&self) -> DriveReference {
            self.reference
        }

        fn set_reference(&mut self, reference: DriveReference) {
            self.reference = reference;
            self.writes += 1;
        }

        fn level(&self) -> u8 {
            self.level
        }

        fn set_level(&mut self, level: u8) {
            self.level = level;
            self.writes += 1;
        }
    }

    fn sequencer() -> PowerSequencer<SpyStage, SpyOutput> {
        let output = SpyOutput {
            reference: DriveReference::V0_55,
            level: 0,
            writes: 0,
        };
        let mut sequencer = PowerSequencer::new(SpyStage::default(), output, EFFICIENCY_TABLE);
        sequencer.initialize();
        sequencer.stage_mut().writes.clear();
        sequencer
    }

    #[test]
    fn initialize_reaches_known_disabled_state() {
        let output = SpyOutput {
            reference: DriveReference::V0_55,
            level: 0,
            writes: 0,
        };
        let mut sequencer = PowerSequencer::new(SpyStage::default(), output, EFFICIENCY_TABLE);
        assert_eq!(sequencer.boost_state(), OutputState::Unknown);
        assert_eq!(sequencer.gain_range_state(), OutputState::Unknown);

        sequencer.initialize();
        assert_eq!(sequencer.boost_state(), OutputState::Disabled);
        assert_eq!(sequencer.gain_range_state(), OutputState::Disabled);
        assert_eq!(
            sequencer.stage().writes.as_slice(),
            &[Write::Boost(false), Write::Gain(false)]
        );
    }

    #[test]
    fn boost_enable_follows_flash_suppression_order() {
        let mut sequencer = sequencer();
        assert!(sequencer.enable_boost());
        assert_eq!(
            sequencer.stage().writes.as_slice(),
            &[
                Write::Override(true),
                Write::Delay(BOOST_PRE_ENABLE_DELAY),
                Write::Boost(true),
                Write::Delay(BOOST_POST_ENABLE_DELAY),
                Write::Override(false),
            ]
        );
        assert!(!sequencer.enable_boost());
    }

    #[test]
    fn max_brightness_enables_boost_and_high_range() {
        let mut sequencer = sequencer();
        let report = sequencer.apply_brightness(BRIGHTNESS_MAX);

        assert_eq!(report.boost, Some(StageEdge::Enabled));
        assert_eq!(report.gain_range, Some(StageEdge::Enabled));
        assert_eq!(sequencer.boost_state(), OutputState::Enabled);
        assert_eq!(sequencer.gain_range_state(), OutputState::Enabled);
        assert_eq!(sequencer.drive_setting(), (DriveReference::V2_5, 255));
    }

    #[test]
    fn zero_brightness_leaves_boost_disabled() {
        let mut sequencer = sequencer();
        sequencer.apply_brightness(1_000_000);
        let report = sequencer.apply_brightness(0);

        assert_eq!(report.boost, Some(StageEdge::Disabled));
        assert_eq!(sequencer.boost_state(), OutputState::Disabled);
        assert_eq!(sequencer.drive_setting(), (DriveReference::V0_55, 0));
    }

    #[test]
    fn repeated_brightness_is_a_no_op() {
        let mut sequencer = sequencer();
        sequencer.apply_brightness(500_000_000);
        let stage_writes = sequencer.stage().writes.len();
        let output_writes = sequencer.output().writes;

        let report = sequencer.apply_brightness(500_000_000);
        assert_eq!(report.outcome, ApplyOutcome::Unchanged);
        assert_eq!(sequencer.stage().writes.len(), stage_writes);
        assert_eq!(sequencer.output().writes, output_writes);
    }

    #[test]
    fn under_voltage_forces_output_off_until_cleared() {
        let mut sequencer = sequencer();
        sequencer.apply_brightness(BRIGHTNESS_MAX);

        let report = sequencer.signal_under_voltage();
        assert_eq!(report.boost, Some(StageEdge::Disabled));
        assert_eq!(sequencer.boost_state(), OutputState::Disabled);

        let report = sequencer.apply_brightness(BRIGHTNESS_MAX);
        assert!(report.forced_off);
        assert_eq!(report.effective, 0);
        assert_eq!(sequencer.boost_state(), OutputState::Disabled);
        assert_eq!(sequencer.drive_setting(), (DriveReference::V0_55, 0));
        assert!(!sequencer.enable_boost());

        sequencer.clear_under_voltage();
        let report = sequencer.apply_brightness(BRIGHTNESS_MAX);
        assert_eq!(report.boost, Some(StageEdge::Enabled));
        assert_eq!(sequencer.drive_setting(), (DriveReference::V2_5, 255));
    }

    #[test]
    fn low_range_brightness_disables_gain_stage() {
        let mut sequencer = sequencer();
        sequencer.apply_brightness(BRIGHTNESS_MAX);
        let report = sequencer.apply_brightness(1_000);

        assert_eq!(report.gain_range, Some(StageEdge::Disabled));
        assert_eq!(sequencer.gain_range_state(), OutputState::Disabled);
        assert_eq!(sequencer.boost_state(), OutputState::Enabled);
    }
}
