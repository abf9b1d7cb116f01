//! Hand-calibrated tables for the current hardware revision.
//!
//! The efficiency table switches to the high gain range as early as possible
//! (652 distinct settings). The resolution table stays in the low range
//! longer (1095 distinct settings). The `prioritise-resolution` feature
//! selects which one the firmware uses.

use super::DriveReference::{V0_55, V1_1, V1_5, V2_5};
use super::{BRIGHTNESS_MAX, BrightnessGroup, BrightnessTable, GainRange};

const EFFICIENCY_GROUPS: [BrightnessGroup; 6] = [
    BrightnessGroup::new(GainRange::low(V0_55), 0, 100, 0, 3_705_461),
    // Hand-over point between the two low-range references.
    BrightnessGroup::new(GainRange::low(V1_1), 50, 0, 3_705_461, 3_705_461),
    BrightnessGroup::new(GainRange::high(V0_55), 1, 254, 3_705_461, 944_892_804),
    BrightnessGroup::new(GainRange::high(V1_1), 128, 127, 948_598_266, 1_889_785_609),
    BrightnessGroup::new(GainRange::high(V1_5), 187, 68, 1_889_785_609, 2_576_980_377),
    BrightnessGroup::new(GainRange::high(V2_5), 153, 102, 2_576_980_377, BRIGHTNESS_MAX),
];

const RESOLUTION_GROUPS: [BrightnessGroup; 8] = [
    BrightnessGroup::new(GainRange::low(V0_55), 0, 255, 0, 9_448_928),
    BrightnessGroup::new(GainRange::low(V1_1), 128, 127, 9_485_982, 18_897_856),
    BrightnessGroup::new(GainRange::low(V1_5), 187, 68, 18_897_856, 25_769_803),
    BrightnessGroup::new(GainRange::low(V2_5), 153, 102, 25_769_803, 42_949_672),
    BrightnessGroup::new(GainRange::high(V0_55), 12, 243, 44_465_543, 944_892_804),
    BrightnessGroup::new(GainRange::high(V1_1), 128, 127, 948_598_266, 1_889_785_609),
    BrightnessGroup::new(GainRange::high(V1_5), 187, 68, 1_889_785_609, 2_576_980_377),
    BrightnessGroup::new(GainRange::high(V2_5), 153, 102, 2_576_980_377, BRIGHTNESS_MAX),
];

/// Efficiency-first calibration.
pub const EFFICIENCY_TABLE: BrightnessTable = BrightnessTable::new(&EFFICIENCY_GROUPS);

/// Resolution-first calibration.
pub const RESOLUTION_TABLE: BrightnessTable = BrightnessTable::new(&RESOLUTION_GROUPS);

/// Table selected at build time.
#[cfg(not(feature = "prioritise-resolution"))]
pub const ACTIVE_TABLE: BrightnessTable = EFFICIENCY_TABLE;

/// Table selected at build time.
#[cfg(feature = "prioritise-resolution")]
pub const ACTIVE_TABLE: BrightnessTable = RESOLUTION_TABLE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_tables_cover_full_range() {
        for table in [EFFICIENCY_TABLE, RESOLUTION_TABLE] {
            let groups = table.groups();
            assert_eq!(groups[0].brightness_min, 0);
            assert_eq!(groups[groups.len() - 1].brightness_max, BRIGHTNESS_MAX);
            assert_eq!(BrightnessTable::validate(groups), Ok(()));
        }
    }

    #[test]
    fn hand_over_point_matches_on_both_references() {
        // 0.55 V · 100 and 1.1 V · 50 produce the same drive voltage.
        let groups = EFFICIENCY_TABLE.groups();
        let low = groups[0].range.reference.volts() * f32::from(groups[0].dac_value_max());
        let high = groups[1].range.reference.volts() * f32::from(groups[1].dac_value_min);
        assert!((low - high).abs() < 1e-3);
    }
}
