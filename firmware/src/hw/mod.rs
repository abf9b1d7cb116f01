//! Board support for the STM32G474 light driver.
//!
//! | Signal                     | Pin   | Peripheral        |
//! |----------------------------|-------|-------------------|
//! | NTC divider                | PA0   | ADC1_IN1          |
//! | Off-time capacitor         | PA1   | ADC1_IN2 / GPIO   |
//! | Drive DAC                  | PA4   | DAC1_OUT1         |
//! | Battery divider            | PA5   | ADC2_IN13         |
//! | Indicator LED              | PA8   | GPIO              |
//! | Battery divider enable     | PB0   | GPIO              |
//! | Inverting-path override    | PB3   | GPIO              |
//! | Boost / op-amp supply      | PB4   | GPIO              |
//! | Gain-range select          | PB5   | GPIO              |
//! | Drive range multiplexer    | PB6-7 | GPIO              |
//!
//! Both converters and the DAC reference VREF+, which VREFBUF drives at 2.5 V.

pub mod adc;
pub mod calibration;
pub mod lines;
pub mod power;
