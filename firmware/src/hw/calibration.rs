//! Factory calibration of the on-die temperature sensor.

use core::ptr;

use flashlight_core::sensors::{KELVIN_OFFSET, TemperatureCalibration};

use super::adc::VREF_PLUS;

/// Raw 12-bit reading at 30 °C, taken with VREF+ = 3.0 V.
const TS_CAL1_ADDR: *const u16 = 0x1FFF_75A8 as *const u16;
/// Raw 12-bit reading at 130 °C, taken with VREF+ = 3.0 V.
const TS_CAL2_ADDR: *const u16 = 0x1FFF_75CA as *const u16;

const TS_CAL1_CELSIUS: f32 = 30.0;
const TS_CAL2_CELSIUS: f32 = 130.0;
const TS_CAL_VREF: f32 = 3.0;
/// Factory readings are 12-bit; conversions here run at 10 bits.
const TS_CAL_RESOLUTION_SCALE: f32 = 4.0;

/// Reads both factory points once.
pub fn read_ts_cal() -> (u16, u16) {
    unsafe { (ptr::read_volatile(TS_CAL1_ADDR), ptr::read_volatile(TS_CAL2_ADDR)) }
}

/// Converts the factory points to the offset/gain form used at runtime.
///
/// Falls back to the identity calibration when the factory area is blank or
/// inconsistent; the die reading is then only coarse.
pub fn temperature_calibration() -> TemperatureCalibration {
    let (cal1, cal2) = read_ts_cal();
    let scale = TS_CAL_VREF / VREF_PLUS.volts() / TS_CAL_RESOLUTION_SCALE;
    let point = |raw: u16, celsius: f32| (f32::from(raw) * scale, celsius + KELVIN_OFFSET);
    TemperatureCalibration::from_two_point(
        point(cal1, TS_CAL1_CELSIUS),
        point(cal2, TS_CAL2_CELSIUS),
    )
    .unwrap_or_default()
}
