//! GPIO power stage and DAC drive output.

use core::time::Duration;

use embassy_stm32::dac::{DacCh1, Value};
use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Blocking;
use embassy_stm32::pac;
use embassy_stm32::peripherals::DAC1;
use flashlight_core::brightness::DriveReference;
use flashlight_core::power::{DriveOutput, PowerStage};

/// PB4 and PB5, released directly through the port in the panic path.
const BOOST_SUPPLY_PIN: usize = 4;
const GAIN_RANGE_PIN: usize = 5;

/// Cuts the boost supply and gain stage without going through the drivers.
pub fn force_output_off() {
    pac::GPIOB.bsrr().write(|w| {
        w.set_br(BOOST_SUPPLY_PIN, true);
        w.set_br(GAIN_RANGE_PIN, true);
    });
}

/// Boost converter, op-amp supply and gain-range select lines.
pub struct GpioPowerStage {
    inverting_override: Output<'static>,
    boost_supply: Output<'static>,
    gain_range: Output<'static>,
}

impl GpioPowerStage {
    pub const fn new(
        inverting_override: Output<'static>,
        boost_supply: Output<'static>,
        gain_range: Output<'static>,
    ) -> Self {
        Self {
            inverting_override,
            boost_supply,
            gain_range,
        }
    }
}

fn drive(pin: &mut Output<'static>, high: bool) {
    if high {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

impl PowerStage for GpioPowerStage {
    fn set_inverting_override(&mut self, asserted: bool) {
        drive(&mut self.inverting_override, asserted);
    }

    fn set_boost_supply(&mut self, enabled: bool) {
        drive(&mut self.boost_supply, enabled);
    }

    fn set_gain_range(&mut self, enabled: bool) {
        drive(&mut self.gain_range, enabled);
    }

    fn delay(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        embassy_time::block_for(embassy_time::Duration::from_micros(micros));
    }
}

/// DAC1 channel 1 followed by a two-bit full-scale range multiplexer.
pub struct DacDrive {
    dac: DacCh1<'static, DAC1, Blocking>,
    range_select: [Output<'static>; 2],
    reference: DriveReference,
    level: u8,
}

impl DacDrive {
    pub fn new(dac: DacCh1<'static, DAC1, Blocking>, range_select: [Output<'static>; 2]) -> Self {
        let mut drive = Self {
            dac,
            range_select,
            reference: DriveReference::V0_55,
            level: 0,
        };
        drive.dac.set(Value::Bit8(0));
        drive.write_range();
        drive
    }

    fn write_range(&mut self) {
        let code = match self.reference {
            DriveReference::V0_55 => 0b00,
            DriveReference::V1_1 => 0b01,
            DriveReference::V1_5 => 0b10,
            DriveReference::V2_5 => 0b11,
        };
        for (bit, pin) in self.range_select.iter_mut().enumerate() {
            drive(pin, code & (1 << bit) != 0);
        }
    }
}

impl DriveOutput for DacDrive {
    fn reference(&self) -> DriveReference {
        self.reference
    }

    fn set_reference(&mut self, reference: DriveReference) {
        self.reference = reference;
        self.write_range();
    }

    fn level(&self) -> u8 {
        self.level
    }

    fn set_level(&mut self, level: u8) {
        self.level = level;
        self.dac.set(Value::Bit8(level));
    }
}
