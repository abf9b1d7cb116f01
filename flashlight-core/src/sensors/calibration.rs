use num_traits::Float;

use crate::converter::RawSample;

/// Factory calibration of the on-die temperature sensor.
///
/// `T = ((raw - offset) · gain + 0x80) >> 8` Kelvin. The offset is signed and
/// the gain unsigned, both read once from the factory-programmed area.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureCalibration {
    pub offset: i16,
    pub gain: u16,
}

impl TemperatureCalibration {
    pub const fn new(offset: i16, gain: u16) -> Self {
        Self { offset, gain }
    }

    /// Builds the offset/gain form from a two-point factory calibration.
    ///
    /// `low` and `high` are `(raw sample, Kelvin)` pairs already scaled to
    /// the resolution and reference used for the measurement. Returns `None`
    /// when the points do not describe a rising line that fits the
    /// offset/gain fields.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_two_point(low: (f32, f32), high: (f32, f32)) -> Option<Self> {
        let (raw_low, kelvin_low) = low;
        let (raw_high, kelvin_high) = high;
        if raw_high <= raw_low || kelvin_high <= kelvin_low {
            return None;
        }

        let kelvin_per_code = (kelvin_high - kelvin_low) / (raw_high - raw_low);
        let gain = (kelvin_per_code * 256.0).round();
        let offset = (raw_low - kelvin_low / kelvin_per_code).round();
        if !(1.0..=f32::from(u16::MAX)).contains(&gain)
            || !(f32::from(i16::MIN)..=f32::from(i16::MAX)).contains(&offset)
        {
            return None;
        }

        Some(Self {
            offset: offset as i16,
            gain: gain as u16,
        })
    }

    /// Applies the calibration to one raw sample.
    #[allow(clippy::cast_precision_loss)]
    pub fn kelvin(self, raw: RawSample) -> f32 {
        let scaled = (i64::from(raw) - i64::from(self.offset)) * i64::from(self.gain) + 0x80;
        (scaled >> 8) as f32
    }
}

impl Default for TemperatureCalibration {
    /// Unit gain with no offset: one Kelvin per code.
    fn default() -> Self {
        Self::new(0, 256)
    }
}
