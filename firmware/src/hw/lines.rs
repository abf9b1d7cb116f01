use embassy_stm32::gpio::{Flex, Output, Speed};
use flashlight_core::platform::EnableLine;

/// Push-pull enable output (battery divider, indicator LED).
pub struct OutputLine {
    pin: Output<'static>,
}

impl OutputLine {
    pub const fn new(pin: Output<'static>) -> Self {
        Self { pin }
    }
}

impl EnableLine for OutputLine {
    fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

/// Off-time capacitor pin: driven high to charge, analog while measured.
pub struct ChargeLine {
    pin: Flex<'static>,
}

impl ChargeLine {
    pub fn new(mut pin: Flex<'static>) -> Self {
        // Only latches the output level; the pin stays analog until enabled.
        pin.set_high();
        Self { pin }
    }
}

impl EnableLine for ChargeLine {
    fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.pin.set_high();
            self.pin.set_as_output(Speed::Low);
        } else {
            self.pin.set_as_analog();
        }
    }
}
