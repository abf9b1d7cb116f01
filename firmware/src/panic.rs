use core::panic::PanicInfo;

use defmt::error;

use crate::hw::power;
use crate::status;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    // Drop the boost supply first so a fault never leaves the emitter driven.
    power::force_output_off();
    error!(
        "PANIC: {} (battery={}mV uvlo={})",
        defmt::Display2Format(info),
        status::battery_millivolts(),
        status::uvlo_active()
    );
    cortex_m::asm::udf();
}
