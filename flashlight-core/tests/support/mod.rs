#![allow(dead_code)]

use core::time::Duration;

use flashlight_core::brightness::DriveReference;
use flashlight_core::converter::{ConverterHardware, InternalReference, Reference};
use flashlight_core::platform::EnableLine;
use flashlight_core::power::{DriveOutput, PowerStage};
use heapless::Vec;

/// Converter stand-in whose conversions finish when the test says so.
pub struct MockAdc<C> {
    pub converting: bool,
    pub accumulated: u16,
    pub configured: Option<(Reference, C, u16)>,
    pub starts: u32,
    pub supply_only: bool,
}

impl<C> MockAdc<C> {
    pub const fn new() -> Self {
        Self {
            converting: false,
            accumulated: 0,
            configured: None,
            starts: 0,
            supply_only: false,
        }
    }

    /// Ends the running conversion with a summed result.
    pub fn finish(&mut self, accumulated: u16) {
        self.converting = false;
        self.accumulated = accumulated;
    }
}

impl<C: Copy> ConverterHardware for MockAdc<C> {
    type Channel = C;

    fn supports(&self, reference: Reference) -> bool {
        match reference {
            Reference::Supply => true,
            Reference::Internal(InternalReference::V4_34) => false,
            Reference::Internal(_) => !self.supply_only,
        }
    }

    fn configure(&mut self, reference: Reference, channel: C, accumulation: u16) {
        self.configured = Some((reference, channel, accumulation));
    }

    fn start(&mut self) {
        self.converting = true;
        self.starts += 1;
    }

    fn is_converting(&self) -> bool {
        self.converting
    }

    fn take_result(&mut self) -> u16 {
        self.accumulated
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StageWrite {
    Override(bool),
    Boost(bool),
    Gain(bool),
    Delay(Duration),
}

#[derive(Default)]
pub struct SpyStage {
    pub writes: Vec<StageWrite, 128>,
}

impl SpyStage {
    pub fn count(&self, write: StageWrite) -> usize {
        self.writes.iter().filter(|entry| **entry == write).count()
    }
}

impl PowerStage for SpyStage {
    fn set_inverting_override(&mut self, asserted: bool) {
        self.writes.push(StageWrite::Override(asserted)).ok();
    }

    fn set_boost_supply(&mut self, enabled: bool) {
        self.writes.push(StageWrite::Boost(enabled)).ok();
    }

    fn set_gain_range(&mut self, enabled: bool) {
        self.writes.push(StageWrite::Gain(enabled)).ok();
    }

    fn delay(&mut self, duration: Duration) {
        self.writes.push(StageWrite::Delay(duration)).ok();
    }
}

pub struct SpyDac {
    pub reference: DriveReference,
    pub level: u8,
    pub writes: u32,
}

impl SpyDac {
    pub const fn new() -> Self {
        Self {
            reference: DriveReference::V0_55,
            level: 0,
            writes: 0,
        }
    }
}

impl DriveOutput for SpyDac {
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

#[derive(Default)]
pub struct SpyLine {
    pub enabled: bool,
    pub writes: u32,
}

impl EnableLine for SpyLine {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.writes += 1;
    }
}

pub fn close(actual: f32, expected: f32, tolerance: f32) -> bool {
    (actual - expected).abs() <= tolerance
}
