//! Register-level ADC1/ADC2 drivers with end-of-conversion interrupts.
//!
//! The embassy ADC driver blocks or awaits on DMA. The sensor hub needs
//! single conversions that finish in interrupt context, so the converters
//! are driven straight through the PAC and `ADC1_2` completes them.

use embassy_stm32::pac;
use embassy_stm32::pac::adc::vals::{Res, SampleTime};
use embassy_stm32::pac::interrupt;
use embassy_time::{Duration, block_for};
use flashlight_core::converter::{ConverterHardware, InternalReference, Reference, UnitId};
use flashlight_core::sensors::{Adc0Channel, Adc1Channel};

use crate::runtime::SENSORS;

/// VRS encoding for the 2.5 V VREFBUF output.
const VREFBUF_2V5: u8 = 0b01;
/// Voltage the converters and DAC reference through VREF+.
pub const VREF_PLUS: InternalReference = InternalReference::V2_5;

const TEMPERATURE_SENSOR_INPUT: u8 = 16;
const THERMISTOR_INPUT: u8 = 1;
const OFF_TIME_INPUT: u8 = 2;
const BATTERY_INPUT: u8 = 13;

const REGULATOR_STARTUP: Duration = Duration::from_micros(20);

/// Brings up the shared reference buffer and the ADC12 clock domain.
pub fn init_analog_front_end() {
    pac::RCC.apb2enr().modify(|w| w.set_syscfgen(true));
    pac::VREFBUF.csr().modify(|w| {
        w.set_vrs(pac::vrefbuf::vals::Vrs::from_bits(VREFBUF_2V5));
        w.set_hiz(false);
        w.set_envr(true);
    });
    while !pac::VREFBUF.csr().read().vrr() {}

    pac::RCC
        .ccipr()
        .modify(|w| w.set_adc12sel(pac::rcc::vals::Adcsel::SYS));
    pac::RCC.ahb2enr().modify(|w| w.set_adc12en(true));
    pac::ADC12_COMMON.ccr().modify(|w| w.set_vsenseen(true));
}

/// Thin wrapper over one ADC register block.
#[derive(Copy, Clone)]
struct Registers(pac::adc::Adc);

impl Registers {
    fn power_up(self) {
        let regs = self.0;
        regs.cr().modify(|w| {
            w.set_deeppwd(false);
            w.set_advregen(true);
        });
        block_for(REGULATOR_STARTUP);

        regs.cr().modify(|w| {
            w.set_adcaldif(false);
            w.set_adcal(true);
        });
        while regs.cr().read().adcal() {}

        regs.cfgr().modify(|w| {
            w.set_res(Res::BITS10);
            w.set_cont(false);
        });
        regs.isr().write(|w| w.set_adrdy(true));
        regs.cr().modify(|w| w.set_aden(true));
        while !regs.isr().read().adrdy() {}
    }

    fn select(self, input: u8, accumulation: u16) {
        let regs = self.0;
        regs.sqr1().modify(|w| {
            w.set_l(0);
            w.set_sq(0, input);
        });
        let sample_time = SampleTime::CYCLES640_5;
        if input <= 9 {
            regs.smpr().modify(|w| w.set_smp(usize::from(input), sample_time));
        } else {
            regs.smpr2()
                .modify(|w| w.set_smp(usize::from(input - 10), sample_time));
        }
        // OVSR n selects 2^(n + 1) samples; no shift, so DR holds the sum.
        let ratio = accumulation.trailing_zeros();
        regs.cfgr2().modify(|w| {
            w.set_rovse(ratio > 0);
            w.set_ovsr(u8::try_from(ratio.saturating_sub(1)).unwrap_or(0));
            w.set_ovss(0);
        });
    }

    fn start(self) {
        let regs = self.0;
        regs.isr().write(|w| w.set_eoc(true));
        regs.ier().modify(|w| w.set_eocie(true));
        regs.cr().modify(|w| w.set_adstart(true));
    }

    fn is_converting(self) -> bool {
        self.0.cr().read().adstart()
    }

    fn completion_pending(self) -> bool {
        self.0.ier().read().eocie() && self.0.isr().read().eoc()
    }

    fn take_result(self) -> u16 {
        let regs = self.0;
        regs.ier().modify(|w| w.set_eocie(false));
        // Reading DR clears EOC.
        regs.dr().read().rdata()
    }
}

fn supports_reference(reference: Reference) -> bool {
    match reference {
        Reference::Internal(reference) => reference == VREF_PLUS,
        // The NTC divider is fed from VREF+, so it reads ratiometrically.
        Reference::Supply => true,
    }
}

/// ADC1: die temperature, thermistor and off-time capacitor.
pub struct Adc0 {
    regs: Registers,
}

impl Adc0 {
    pub fn enable() -> Self {
        let regs = Registers(pac::ADC1);
        regs.power_up();
        Self { regs }
    }
}

impl ConverterHardware for Adc0 {
    type Channel = Adc0Channel;

    fn supports(&self, reference: Reference) -> bool {
        supports_reference(reference)
    }

    fn configure(&mut self, _reference: Reference, channel: Adc0Channel, accumulation: u16) {
        let input = match channel {
            Adc0Channel::TemperatureSensor => TEMPERATURE_SENSOR_INPUT,
            Adc0Channel::Thermistor => THERMISTOR_INPUT,
            Adc0Channel::OffTimeCapacitor => OFF_TIME_INPUT,
        };
        self.regs.select(input, accumulation);
    }

    fn start(&mut self) {
        self.regs.start();
    }

    fn is_converting(&self) -> bool {
        self.regs.is_converting()
    }

    fn take_result(&mut self) -> u16 {
        self.regs.take_result()
    }
}

/// ADC2: battery divider.
pub struct Adc1 {
    regs: Registers,
}

impl Adc1 {
    pub fn enable() -> Self {
        let regs = Registers(pac::ADC2);
        regs.power_up();
        Self { regs }
    }
}

impl ConverterHardware for Adc1 {
    type Channel = Adc1Channel;

    fn supports(&self, reference: Reference) -> bool {
        supports_reference(reference)
    }

    fn configure(&mut self, _reference: Reference, channel: Adc1Channel, accumulation: u16) {
        let input = match channel {
            Adc1Channel::Battery => BATTERY_INPUT,
        };
        self.regs.select(input, accumulation);
    }

    fn start(&mut self) {
        self.regs.start();
    }

    fn is_converting(&self) -> bool {
        self.regs.is_converting()
    }

    fn take_result(&mut self) -> u16 {
        self.regs.take_result()
    }
}

/// Unmasks the shared ADC1/ADC2 interrupt.
pub fn enable_completion_interrupt() {
    unsafe {
        cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::ADC1_2);
    }
}

#[interrupt]
fn ADC1_2() {
    let units = [
        (UnitId::Adc0, Registers(pac::ADC1)),
        (UnitId::Adc1, Registers(pac::ADC2)),
    ];
    for (unit, regs) in units {
        if !regs.completion_pending() {
            continue;
        }
        // Fire outside the lock so the callback may re-arm the same unit.
        let ready = SENSORS.lock(|hub| hub.as_mut().and_then(|hub| hub.take_completion(unit)));
        match ready {
            Some(ready) => ready.fire(),
            None => {
                // Spurious end-of-conversion: drop the result and mask it.
                let _ = regs.take_result();
            }
        }
    }
}
