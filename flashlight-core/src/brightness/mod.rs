//! Calibrated mapping from normalized brightness to a drive setting.
//!
//! The calibration table is an ordered list of [`BrightnessGroup`]s. Each
//! group covers an inclusive brightness interval and linearly interpolates a
//! drive-level code inside it, at a fixed drive reference and gain range.
//! Tables are validated when they are constructed; the built-in tables are
//! checked during constant evaluation, so a malformed table fails the build.

use core::fmt;

mod tables;

pub use tables::{ACTIVE_TABLE, EFFICIENCY_TABLE, RESOLUTION_TABLE};

/// Normalized brightness spanning the full `u32` range.
pub type Brightness = u32;

/// Largest representable brightness.
pub const BRIGHTNESS_MAX: Brightness = Brightness::MAX;

/// Reference voltage selector for the drive-level DAC.
///
/// Variants are ordered by increasing voltage.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveReference {
    V0_55,
    V1_1,
    V1_5,
    V2_5,
}

impl DriveReference {
    /// Nominal voltage of the reference.
    pub const fn volts(self) -> f32 {
        match self {
            DriveReference::V0_55 => 0.55,
            DriveReference::V1_1 => 1.1,
            DriveReference::V1_5 => 1.5,
            DriveReference::V2_5 => 2.5,
        }
    }

    /// Short label used in logs and status lines.
    pub const fn label(self) -> &'static str {
        match self {
            DriveReference::V0_55 => "0V55",
            DriveReference::V1_1 => "1V1",
            DriveReference::V1_5 => "1V5",
            DriveReference::V2_5 => "2V5",
        }
    }
}

/// Combined gain range: the gain-select stage plus the drive reference.
///
/// Ordered low range before high range, then by reference voltage, which
/// is the order the calibration tables walk through.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GainRange {
    /// `true` when the high-range gain stage must be enabled.
    pub high_range: bool,
    pub reference: DriveReference,
}

impl GainRange {
    pub const fn low(reference: DriveReference) -> Self {
        Self {
            high_range: false,
            reference,
        }
    }

    pub const fn high(reference: DriveReference) -> Self {
        Self {
            high_range: true,
            reference,
        }
    }
}

/// Output of the mapping: where to set the analog stages.
///
/// The derived order is gain range first, drive level second.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveSetting {
    pub range: GainRange,
    pub level: u8,
}

/// One row of the calibration table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BrightnessGroup {
    pub range: GainRange,
    pub dac_value_min: u8,
    /// Zero marks a single-point group pinned at `dac_value_min`.
    pub dac_value_step_count: u8,
    pub brightness_min: Brightness,
    pub brightness_max: Brightness,
}

impl BrightnessGroup {
    pub const fn new(
        range: GainRange,
        dac_value_min: u8,
        dac_value_step_count: u8,
        brightness_min: Brightness,
        brightness_max: Brightness,
    ) -> Self {
        Self {
            range,
            dac_value_min,
            dac_value_step_count,
            brightness_min,
            brightness_max,
        }
    }

    /// Returns `true` when `brightness` lies in the inclusive interval.
    pub const fn contains(&self, brightness: Brightness) -> bool {
        brightness >= self.brightness_min && brightness <= self.brightness_max
    }

    /// Highest drive level the group produces.
    pub const fn dac_value_max(&self) -> u8 {
        self.dac_value_min.saturating_add(self.dac_value_step_count)
    }

    /// Clamps into the interval and interpolates the nearest drive level.
    #[allow(clippy::cast_possible_truncation)]
    pub fn drive_level(&self, brightness: Brightness) -> u8 {
        let brightness = brightness.clamp(self.brightness_min, self.brightness_max);
        if self.dac_value_step_count == 0 {
            return self.dac_value_min;
        }

        let span = u64::from(self.brightness_max - self.brightness_min);
        let offset = u64::from(brightness - self.brightness_min);
        let steps = u64::from(self.dac_value_step_count);
        // Round half up; the quotient never exceeds the step count.
        let step = (steps * offset + span / 2) / span;
        self.dac_value_min + step as u8
    }
}

/// Reason a calibration table is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TableError {
    Empty,
    /// The first group does not start at brightness zero.
    MissingLowerBound,
    /// The last group does not end at [`BRIGHTNESS_MAX`].
    MissingUpperBound,
    /// A group's minimum exceeds its maximum.
    InvertedBounds { index: usize },
    /// A group starts below the end of the previous group.
    Overlap { index: usize },
    /// A group interpolates over an empty interval.
    EmptySpan { index: usize },
    /// `dac_value_min + dac_value_step_count` exceeds the DAC code range.
    DriveOverflow { index: usize },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Empty => f.write_str("table has no groups"),
            TableError::MissingLowerBound => f.write_str("first group does not start at 0"),
            TableError::MissingUpperBound => f.write_str("last group does not end at max"),
            TableError::InvertedBounds { index } => write!(f, "group {index} has min > max"),
            TableError::Overlap { index } => write!(f, "group {index} overlaps its predecessor"),
            TableError::EmptySpan { index } => {
                write!(f, "group {index} has steps but an empty interval")
            }
            TableError::DriveOverflow { index } => {
                write!(f, "group {index} exceeds the drive code range")
            }
        }
    }
}

/// Validated, sorted calibration table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BrightnessTable {
    groups: &'static [BrightnessGroup],
}

impl BrightnessTable {
    /// Builds a table, panicking when the groups are malformed.
    ///
    /// Use in `const` items so that a bad table fails the build.
    pub const fn new(groups: &'static [BrightnessGroup]) -> Self {
        match Self::validate(groups) {
            Ok(()) => Self { groups },
            Err(_) => panic!("malformed brightness table"),
        }
    }

    /// Builds a table, reporting why the groups are malformed.
    pub const fn try_new(groups: &'static [BrightnessGroup]) -> Result<Self, TableError> {
        match Self::validate(groups) {
            Ok(()) => Ok(Self { groups }),
            Err(error) => Err(error),
        }
    }

    /// Checks ordering and full coverage of the brightness range.
    ///
    /// Adjacent groups may touch or leave small gaps, but never overlap.
    pub const fn validate(groups: &[BrightnessGroup]) -> Result<(), TableError> {
        if groups.is_empty() {
            return Err(TableError::Empty);
        }
        if groups[0].brightness_min != 0 {
            return Err(TableError::MissingLowerBound);
        }
        if groups[groups.len() - 1].brightness_max != BRIGHTNESS_MAX {
            return Err(TableError::MissingUpperBound);
        }

        let mut index = 0;
        while index < groups.len() {
            let group = &groups[index];
            if group.brightness_min > group.brightness_max {
                return Err(TableError::InvertedBounds { index });
            }
            if group.dac_value_step_count != 0 && group.brightness_min == group.brightness_max {
                return Err(TableError::EmptySpan { index });
            }
            if group.dac_value_min as u16 + group.dac_value_step_count as u16 > u8::MAX as u16 {
                return Err(TableError::DriveOverflow { index });
            }
            if index > 0 && group.brightness_min < groups[index - 1].brightness_max {
                return Err(TableError::Overlap { index });
            }
            index += 1;
        }
        Ok(())
    }

    pub const fn groups(&self) -> &'static [BrightnessGroup] {
        self.groups
    }

    pub const fn len(&self) -> usize {
        self.groups.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Binary search for the group covering `brightness`.
    ///
    /// A value that falls into a gap between two groups resolves to the
    /// lower group. Returns `None` only for an empty table.
    pub fn find_group(&self, brightness: Brightness) -> Option<usize> {
        let groups = self.groups;
        if groups.is_empty() {
            return None;
        }

        let mut left = 0;
        let mut right = groups.len() - 1;
        while left < right {
            let mid = left + (right - left) / 2;
            if brightness < groups[mid].brightness_min {
                if mid == 0 {
                    return Some(0);
                }
                right = mid - 1;
            } else if brightness > groups[mid].brightness_max {
                left = mid + 1;
            } else {
                return Some(mid);
            }
        }

        // The window collapsed (or crossed) without a containing interval.
        let index = left.min(right);
        if index > 0 && brightness < groups[index].brightness_min {
            Some(index - 1)
        } else {
            Some(index)
        }
    }

    /// Maps a brightness to the gain range and drive level to apply.
    ///
    /// Degrades to the first group at zero brightness if the lookup fails.
    pub fn map(&self, brightness: Brightness) -> DriveSetting {
        let (index, brightness) = match self.find_group(brightness) {
            Some(index) => (index, brightness),
            None => (0, 0),
        };
        let group = &self.groups[index];
        DriveSetting {
            range: group.range,
            level: group.drive_level(brightness),
        }
    }
}
