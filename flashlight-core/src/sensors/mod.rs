//! Sensor derivations layered on the converter units.
//!
//! Each derivation turns one raw sample into a physical quantity with a
//! closed-form formula and hands it to an application callback. A raw
//! sample of zero is outside the contract: the thermistor and off-time
//! formulas divide by it or take its logarithm, and the result is not
//! meaningful.

use num_traits::Float;

use crate::converter::{
    Completion, ConverterHardware, ConverterUnit, FULL_SCALE, InternalReference, RawSample, Ready,
    Reference, RequestError, UnitId,
};

mod calibration;

pub use calibration::TemperatureCalibration;

/// Divider ratio between the battery and the converter input.
pub const BATTERY_DIVIDER_GAIN: f32 = 3.0;

/// Thermistor resistance at [`NTC_T0_KELVIN`].
pub const NTC_R0_OHMS: f32 = 10e3;
/// Fixed resistor of the thermistor divider.
pub const NTC_R1_OHMS: f32 = 10e3;
/// Thermistor nominal temperature.
pub const NTC_T0_KELVIN: f32 = 298.15;
/// Thermistor B constant (25-80 °C fit).
pub const NTC_B_KELVIN: f32 = 3428.0;

/// Off-time capacitor discharge resistor.
pub const OFF_TIME_R_OHMS: f32 = 750e3;
/// Off-time capacitor.
pub const OFF_TIME_C_FARADS: f32 = 4.7e-6;
/// Level the protection diode clamps the capacitor to once the supply is gone.
pub const OFF_TIME_CLAMP_VOLTS: f32 = 0.35;

/// Offset between Kelvin and degrees Celsius.
pub const KELVIN_OFFSET: f32 = 273.15;

/// Converts a temperature in Kelvin to degrees Celsius.
pub fn kelvin_to_celsius(kelvin: f32) -> f32 {
    kelvin - KELVIN_OFFSET
}

/// The four quantities the light measures.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    InternalTemperature,
    ExternalTemperature,
    BatteryLevel,
    OffTime,
}

impl SensorKind {
    /// Converter unit that serves this sensor.
    pub const fn unit(self) -> UnitId {
        match self {
            SensorKind::InternalTemperature
            | SensorKind::ExternalTemperature
            | SensorKind::OffTime => UnitId::Adc0,
            SensorKind::BatteryLevel => UnitId::Adc1,
        }
    }

    /// Short label used in logs and status lines.
    pub const fn label(self) -> &'static str {
        match self {
            SensorKind::InternalTemperature => "internal-temp",
            SensorKind::ExternalTemperature => "ntc-temp",
            SensorKind::BatteryLevel => "battery",
            SensorKind::OffTime => "off-time",
        }
    }
}

/// Input channels wired to the first converter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Adc0Channel {
    /// On-die temperature sensor.
    TemperatureSensor,
    /// NTC thermistor divider.
    Thermistor,
    /// Off-time timing capacitor.
    OffTimeCapacitor,
}

/// Input channels wired to the second converter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Adc1Channel {
    /// Battery voltage divider.
    Battery,
}

/// Die temperature in Kelvin from the factory calibration.
pub fn internal_temperature_kelvin(raw: RawSample, calibration: TemperatureCalibration) -> f32 {
    calibration.kelvin(raw)
}

/// Thermistor temperature in Kelvin from a supply-referenced sample.
pub fn ntc_temperature_kelvin(raw: RawSample) -> f32 {
    let c = NTC_R0_OHMS.ln() / NTC_B_KELVIN - 1.0 / NTC_T0_KELVIN;
    // raw / 1023 = R1 / (R + R1)
    let resistance = f32::from(FULL_SCALE) * NTC_R1_OHMS / f32::from(raw) - NTC_R1_OHMS;
    1.0 / (resistance.ln() / NTC_B_KELVIN - c)
}

/// Battery voltage seen through the divider.
pub fn battery_volts(raw: RawSample, reference: InternalReference) -> f32 {
    BATTERY_DIVIDER_GAIN * reference.volts() * f32::from(raw) / f32::from(FULL_SCALE)
}

/// Seconds the light was powered off, from the residual capacitor voltage.
///
/// `Vc = Vclamp · e^(-t/RC)`, so `t = -RC · ln(Vc / Vclamp)`. A capacitor
/// still above the clamp level yields a negative time.
pub fn off_time_seconds(raw: RawSample, reference: InternalReference) -> f32 {
    let rc = OFF_TIME_R_OHMS * OFF_TIME_C_FARADS;
    let capacitor_volts = reference.volts() * f32::from(raw) / f32::from(FULL_SCALE);
    -rc * (capacitor_volts / OFF_TIME_CLAMP_VOLTS).ln()
}

/// One configured transform from raw sample to physical value.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Derivation {
    InternalTemperature(TemperatureCalibration),
    ExternalTemperature,
    BatteryLevel(InternalReference),
    OffTime(InternalReference),
}

impl Derivation {
    /// Sensor this derivation serves.
    pub const fn kind(&self) -> SensorKind {
        match self {
            Derivation::InternalTemperature(_) => SensorKind::InternalTemperature,
            Derivation::ExternalTemperature => SensorKind::ExternalTemperature,
            Derivation::BatteryLevel(_) => SensorKind::BatteryLevel,
            Derivation::OffTime(_) => SensorKind::OffTime,
        }
    }

    /// Evaluates the formula for one raw sample.
    pub fn evaluate(&self, raw: RawSample) -> f32 {
        match *self {
            Derivation::InternalTemperature(calibration) => {
                internal_temperature_kelvin(raw, calibration)
            }
            Derivation::ExternalTemperature => ntc_temperature_kelvin(raw),
            Derivation::BatteryLevel(reference) => battery_volts(raw, reference),
            Derivation::OffTime(reference) => off_time_seconds(raw, reference),
        }
    }
}

/// Receives exactly one derived value.
pub trait ReadingCallback {
    fn deliver(self, value: f32);
}

impl<F> ReadingCallback for F
where
    F: FnOnce(f32),
{
    fn deliver(self, value: f32) {
        self(value);
    }
}

/// Continuation pairing a derivation with its application callback.
///
/// The derivation carries the reference it was issued with, so the result
/// is always scaled by the reference that was actually programmed.
#[derive(Debug)]
pub struct Acquisition<F> {
    derivation: Derivation,
    callback: F,
}

impl<F> Acquisition<F> {
    pub const fn new(derivation: Derivation, callback: F) -> Self {
        Self {
            derivation,
            callback,
        }
    }

    pub const fn derivation(&self) -> &Derivation {
        &self.derivation
    }
}

impl<F: ReadingCallback> Completion for Acquisition<F> {
    fn complete(self, raw: RawSample) {
        let value = self.derivation.evaluate(raw);
        self.callback.deliver(value);
    }
}

/// Board-level choices for the selectable references.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SensorConfig {
    pub internal_temperature_reference: InternalReference,
    pub battery_reference: InternalReference,
    pub off_time_reference: InternalReference,
}

impl SensorConfig {
    pub const fn new() -> Self {
        Self {
            internal_temperature_reference: InternalReference::V1_1,
            battery_reference: InternalReference::V1_5,
            off_time_reference: InternalReference::V2_5,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Error returned by the sensor request helpers.
pub type SensorRequestError<F> = RequestError<Acquisition<F>>;

/// Both converter units plus the constants the derivations need.
pub struct SensorHub<H0, H1, F>
where
    H0: ConverterHardware<Channel = Adc0Channel>,
    H1: ConverterHardware<Channel = Adc1Channel>,
{
    adc0: ConverterUnit<H0, Acquisition<F>>,
    adc1: ConverterUnit<H1, Acquisition<F>>,
    calibration: TemperatureCalibration,
    config: SensorConfig,
}

impl<H0, H1, F> SensorHub<H0, H1, F>
where
    H0: ConverterHardware<Channel = Adc0Channel>,
    H1: ConverterHardware<Channel = Adc1Channel>,
    F: ReadingCallback,
{
    /// `calibration` is read once from the factory area by the caller.
    pub const fn new(
        adc0: H0,
        adc1: H1,
        calibration: TemperatureCalibration,
        config: SensorConfig,
    ) -> Self {
        Self {
            adc0: ConverterUnit::new(adc0),
            adc1: ConverterUnit::new(adc1),
            calibration,
            config,
        }
    }

    /// Returns `true` while a conversion is in flight on `unit`.
    pub fn is_converter_busy(&self, unit: UnitId) -> bool {
        match unit {
            UnitId::Adc0 => self.adc0.is_busy(),
            UnitId::Adc1 => self.adc1.is_busy(),
        }
    }

    /// Returns `true` when `unit` can accept a new request.
    pub fn is_idle(&self, unit: UnitId) -> bool {
        match unit {
            UnitId::Adc0 => !self.adc0.is_busy() && !self.adc0.has_pending(),
            UnitId::Adc1 => !self.adc1.is_busy() && !self.adc1.has_pending(),
        }
    }

    pub fn request_internal_temperature(
        &mut self,
        callback: F,
    ) -> Result<(), SensorRequestError<F>> {
        let reference = Reference::Internal(self.config.internal_temperature_reference);
        let derivation = Derivation::InternalTemperature(self.calibration);
        self.adc0.request(
            reference,
            Adc0Channel::TemperatureSensor,
            Acquisition::new(derivation, callback),
        )
    }

    pub fn request_external_temperature(
        &mut self,
        callback: F,
    ) -> Result<(), SensorRequestError<F>> {
        self.adc0.request(
            Reference::Supply,
            Adc0Channel::Thermistor,
            Acquisition::new(Derivation::ExternalTemperature, callback),
        )
    }

    pub fn request_off_time(&mut self, callback: F) -> Result<(), SensorRequestError<F>> {
        let reference = self.config.off_time_reference;
        self.adc0.request(
            Reference::Internal(reference),
            Adc0Channel::OffTimeCapacitor,
            Acquisition::new(Derivation::OffTime(reference), callback),
        )
    }

    pub fn request_battery_level(&mut self, callback: F) -> Result<(), SensorRequestError<F>> {
        let reference = self.config.battery_reference;
        self.adc1.request(
            Reference::Internal(reference),
            Adc1Channel::Battery,
            Acquisition::new(Derivation::BatteryLevel(reference), callback),
        )
    }

    /// Completion-interrupt entry point; see [`ConverterUnit::take_completion`].
    pub fn take_completion(&mut self, unit: UnitId) -> Option<Ready<Acquisition<F>>> {
        match unit {
            UnitId::Adc0 => self.adc0.take_completion(),
            UnitId::Adc1 => self.adc1.take_completion(),
        }
    }

    /// Completion-interrupt entry point that fires the callback in place.
    pub fn on_completion(&mut self, unit: UnitId) -> bool {
        match unit {
            UnitId::Adc0 => self.adc0.on_completion(),
            UnitId::Adc1 => self.adc1.on_completion(),
        }
    }

    pub fn adc0_hardware_mut(&mut self) -> &mut H0 {
        self.adc0.hardware_mut()
    }

    pub fn adc1_hardware_mut(&mut self) -> &mut H1 {
        self.adc1.hardware_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f32, expected: f32, tolerance: f32) -> bool {
        (actual - expected).abs() <= tolerance
    }

    #[test]
    fn battery_level_at_half_scale() {
        let volts = battery_volts(512, InternalReference::V1_5);
        assert!(close(volts, 3.0 * 1.5 * 512.0 / 1023.0, 1e-5));
        assert!(close(volts, 2.2522, 1e-3));
    }

    #[test]
    fn thermistor_reads_nominal_temperature_at_mid_scale() {
        // Equal divider resistors put the input at half scale at T0.
        let kelvin = ntc_temperature_kelvin(511);
        assert!(close(kelvin, NTC_T0_KELVIN, 0.5), "got {kelvin}");
    }

    #[test]
    fn thermistor_reads_warmer_as_input_rises() {
        // The thermistor sits on the supply side, so a hotter (lower
        // resistance) thermistor raises the input.
        let cool = ntc_temperature_kelvin(400);
        let warm = ntc_temperature_kelvin(700);
        assert!(warm > cool);
    }

    #[test]
    fn off_time_is_zero_at_clamp_voltage() {
        // 0.35 V against a 2.5 V reference.
        let raw = (0.35 / 2.5 * 1023.0_f32).round() as u16;
        let seconds = off_time_seconds(raw, InternalReference::V2_5);
        assert!(close(seconds, 0.0, 0.02), "got {seconds}");
    }

    #[test]
    fn off_time_grows_as_capacitor_discharges() {
        let rc = OFF_TIME_R_OHMS * OFF_TIME_C_FARADS;
        let short = off_time_seconds(100, InternalReference::V2_5);
        let long = off_time_seconds(20, InternalReference::V2_5);
        assert!(long > short);
        let expected = -rc * ((2.5 * 20.0 / 1023.0) / OFF_TIME_CLAMP_VOLTS).ln();
        assert!(close(long, expected, 1e-3));
    }

    #[test]
    fn derivation_reports_kind_and_unit() {
        let derivation = Derivation::BatteryLevel(InternalReference::V1_5);
        assert_eq!(derivation.kind(), SensorKind::BatteryLevel);
        assert_eq!(derivation.kind().unit(), UnitId::Adc1);
        assert_eq!(SensorKind::OffTime.unit(), UnitId::Adc0);
    }

    #[test]
    fn kelvin_conversion() {
        assert!(close(kelvin_to_celsius(298.15), 25.0, 1e-4));
    }
}
