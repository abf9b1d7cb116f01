use flashlight_core::brightness::{
    BRIGHTNESS_MAX, Brightness, BrightnessTable, DriveSetting, EFFICIENCY_TABLE, RESOLUTION_TABLE,
};

const SAMPLES: u32 = 20_000;

fn samples() -> impl Iterator<Item = Brightness> {
    let stride = BRIGHTNESS_MAX / SAMPLES;
    (0..=SAMPLES)
        .map(move |index| index * stride)
        .chain([1, 2, 3, BRIGHTNESS_MAX - 1, BRIGHTNESS_MAX])
}

fn boundaries(table: &BrightnessTable) -> impl Iterator<Item = Brightness> + '_ {
    table.groups().iter().flat_map(|group| {
        [
            group.brightness_min.saturating_sub(1),
            group.brightness_min,
            group.brightness_max,
            group.brightness_max.saturating_add(1),
        ]
    })
}

#[test]
fn every_brightness_resolves_to_its_group_or_the_gap_below() {
    for table in [EFFICIENCY_TABLE, RESOLUTION_TABLE] {
        let groups = table.groups();
        for brightness in samples().chain(boundaries(&table)) {
            let index = table.find_group(brightness).expect("non-empty table");
            let group = &groups[index];
            if group.contains(brightness) {
                continue;
            }
            // Only a gap between two groups may miss, and it resolves downwards.
            let next = &groups[index + 1];
            assert!(
                brightness > group.brightness_max && brightness < next.brightness_min,
                "brightness {brightness} mapped to group {index}"
            );
        }
    }
}

#[test]
fn drive_level_stays_within_group_bounds() {
    for table in [EFFICIENCY_TABLE, RESOLUTION_TABLE] {
        for brightness in samples().chain(boundaries(&table)) {
            let index = table.find_group(brightness).expect("non-empty table");
            let group = &table.groups()[index];
            let setting = table.map(brightness);
            assert_eq!(setting.range, group.range);
            assert!(setting.level >= group.dac_value_min);
            assert!(setting.level <= group.dac_value_max());
        }
    }
}

#[test]
fn mapping_is_monotonic() {
    for table in [EFFICIENCY_TABLE, RESOLUTION_TABLE] {
        let mut points: Vec<Brightness> = samples().chain(boundaries(&table)).collect();
        points.sort_unstable();

        let mut previous: Option<DriveSetting> = None;
        for brightness in points {
            let setting = table.map(brightness);
            if let Some(previous) = previous {
                assert!(
                    setting >= previous,
                    "setting at {brightness} went backwards: {previous:?} -> {setting:?}"
                );
            }
            previous = Some(setting);
        }
    }
}

#[test]
fn extremes_map_to_first_and_last_groups() {
    for table in [EFFICIENCY_TABLE, RESOLUTION_TABLE] {
        let groups = table.groups();
        let first = &groups[0];
        let last = &groups[groups.len() - 1];

        let off = table.map(0);
        assert_eq!(off.range, first.range);
        assert_eq!(off.level, first.dac_value_min);

        let full = table.map(BRIGHTNESS_MAX);
        assert_eq!(full.range, last.range);
        assert_eq!(full.level, last.dac_value_max());
    }
}
