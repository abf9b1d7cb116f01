use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt::{info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::dac::DacCh1;
use embassy_stm32::flash::Flash;
use embassy_stm32::gpio::{Flex, Level, Output, Speed};
use embassy_time::{Duration, Timer, with_timeout};
use flashlight_core::brightness::ACTIVE_TABLE;
use flashlight_core::converter::UnitId;
use flashlight_core::modes::Mode;
use flashlight_core::monitor::{ClickCounter, ClickOutcome};
use flashlight_core::platform::CounterStore;
use flashlight_core::power::PowerSequencer;
use flashlight_core::sensors::{SensorConfig, SensorHub, SensorKind};
use flashlight_core::shared::Shared;
use static_cell::StaticCell;

use crate::hw::adc::{self, Adc0, Adc1, VREF_PLUS};
use crate::hw::calibration;
use crate::hw::lines::{ChargeLine, OutputLine};
use crate::hw::power::{DacDrive, GpioPowerStage};
use crate::readings::{self, Deliver};
use crate::storage::FlashCounterStore;
use crate::telemetry::TelemetryRecorder;

mod control_task;

use control_task::ControlLoop;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub type FirmwareHub = SensorHub<Adc0, Adc1, Deliver>;
pub type FirmwareSequencer = PowerSequencer<GpioPowerStage, DacDrive>;

/// Sensor hub shared between the control task and the `ADC1_2` handler.
pub static SENSORS: Shared<Option<FirmwareHub>> = Shared::new(None);

/// Keeps the telemetry ring out of the control task's future.
static TELEMETRY: StaticCell<TelemetryRecorder> = StaticCell::new();

const OFF_TIME_POLL: Duration = Duration::from_micros(100);
const OFF_TIME_TIMEOUT: Duration = Duration::from_millis(10);

/// Every derivation uses VREF+, the only reference the converters see.
const SENSOR_CONFIG: SensorConfig = SensorConfig {
    internal_temperature_reference: VREF_PLUS,
    battery_reference: VREF_PLUS,
    off_time_reference: VREF_PLUS,
};

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA1,
        PA4,
        PA8,
        PB0,
        PB3,
        PB4,
        PB5,
        PB6,
        PB7,
        DAC1,
        FLASH,
        ..
    } = hal::init(config);

    // Output stage first so the emitter is known-dark before anything else runs.
    let stage = GpioPowerStage::new(
        Output::new(PB3, Level::Low, Speed::Low),
        Output::new(PB4, Level::Low, Speed::Low),
        Output::new(PB5, Level::Low, Speed::Low),
    );
    let drive = DacDrive::new(
        DacCh1::new_blocking(DAC1, PA4),
        [
            Output::new(PB6, Level::Low, Speed::Low),
            Output::new(PB7, Level::Low, Speed::Low),
        ],
    );
    let mut sequencer = PowerSequencer::new(stage, drive, ACTIVE_TABLE);
    sequencer.initialize();

    adc::init_analog_front_end();
    let hub = SensorHub::new(
        Adc0::enable(),
        Adc1::enable(),
        calibration::temperature_calibration(),
        SENSOR_CONFIG,
    );
    SENSORS.lock(|slot| *slot = Some(hub));
    adc::enable_completion_interrupt();

    let mut store = FlashCounterStore::new(Flash::new_blocking(FLASH));
    let mut charge = ChargeLine::new(Flex::new(PA1));
    let count = click_count(&mut charge, &mut store).await;
    let mode = Mode::from_click_count(count);
    info!("click count {} selects mode {}", count, mode);

    let control = ControlLoop::new(
        sequencer,
        mode,
        OutputLine::new(Output::new(PB0, Level::Low, Speed::Low)),
        OutputLine::new(Output::new(PA8, Level::Low, Speed::Low)),
        TELEMETRY.init(TelemetryRecorder::new()),
    );

    spawner
        .spawn(control_task::run(control))
        .expect("failed to spawn control task");

    core::future::pending::<()>().await;
}

/// Measures how long the light was off and updates the stored click count.
async fn click_count<S: CounterStore>(charge: &mut ChargeLine, store: &mut S) -> u8 {
    let clicks = ClickCounter::new();
    clicks.begin_probe(charge);
    let seconds = measure_off_time().await;
    clicks.end_probe(charge);

    let Some(seconds) = seconds else {
        warn!("off-time measurement failed; keeping stored count");
        return ClickCounter::load(store).unwrap_or_else(|error| {
            warn!("click counter unreadable: {}", error);
            0
        });
    };

    match clicks.record_off_time(seconds, store) {
        Ok(ClickOutcome::Counted(count)) => count,
        Ok(ClickOutcome::Reset | ClickOutcome::Unchanged) => 0,
        Err(error) => {
            warn!("click counter update failed: {}", error);
            0
        }
    }
}

async fn measure_off_time() -> Option<f32> {
    let issued = SENSORS.lock(|slot| {
        slot.as_mut()
            .map(|hub| hub.request_off_time(Deliver::new(SensorKind::OffTime)))
    });
    match issued {
        Some(Ok(())) => {}
        Some(Err(error)) => {
            warn!("off-time request rejected: {}", defmt::Display2Format(&error));
            return None;
        }
        None => return None,
    }

    while SENSORS.lock(|slot| {
        slot.as_ref()
            .is_some_and(|hub| hub.is_converter_busy(UnitId::Adc0))
    }) {
        Timer::after(OFF_TIME_POLL).await;
    }
    with_timeout(OFF_TIME_TIMEOUT, readings::signal_for(SensorKind::OffTime).wait())
        .await
        .ok()
}
