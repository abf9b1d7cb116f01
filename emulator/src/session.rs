use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use flashlight_core::brightness::{ACTIVE_TABLE, DriveReference};
use flashlight_core::config::{ACCUMULATION_FACTOR, TICK_HZ, control_iterations_per_tick};
use flashlight_core::converter::{ConverterHardware, FULL_SCALE, RawSample, Reference, UnitId};
use flashlight_core::modes::{IndicatorBlinker, Mode, OutputProgram};
use flashlight_core::monitor::{
    BatteryMonitor, ClickCounter, ClickOutcome, SensorSchedule, UvloTransition,
};
use flashlight_core::platform::{CounterStore, EnableLine, StatusSink, StoreError, TickSource};
use flashlight_core::power::{ApplyReport, DriveOutput, PowerSequencer, PowerStage, StageEdge};
use flashlight_core::sensors::{
    Adc0Channel, Adc1Channel, BATTERY_DIVIDER_GAIN, KELVIN_OFFSET, NTC_B_KELVIN, NTC_R0_OHMS,
    NTC_R1_OHMS, NTC_T0_KELVIN, OFF_TIME_C_FARADS, OFF_TIME_CLAMP_VOLTS, OFF_TIME_R_OHMS,
    ReadingCallback, SensorConfig, SensorHub, SensorKind, TemperatureCalibration,
};
use flashlight_core::shared::Shared;
use flashlight_core::status::{SensorReadings, StatusFormatter, StatusSnapshot};
use flashlight_core::telemetry::{TelemetryInstant, TelemetryRecorder};

/// Factory calibration programmed into the simulated die sensor.
const DIE_CALIBRATION: TemperatureCalibration = TemperatureCalibration::new(-3, 180);

/// Off time assumed for the very first power-up.
const FIRST_BOOT_OFF_TIME_SECONDS: f32 = 3_600.0;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("tick", "tick [count]               - advance the 8 Hz tick counter"),
    ("battery", "battery <volts>            - set the simulated battery voltage"),
    ("ntc", "ntc <celsius>              - set the thermistor temperature"),
    ("die", "die <celsius>              - set the die temperature"),
    (
        "power-cycle",
        "power-cycle <seconds>      - switch off for the given time and boot again",
    ),
    ("status", "status                     - display mode, drive and sensor state"),
    ("telemetry", "telemetry                  - dump the telemetry ring"),
    ("help", "help [topic]               - show help for a command"),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Ramp,
    Uvlo,
    Clicks,
    Sensors,
}

impl TranscriptProfile {
    pub const ALL: [TranscriptProfile; 4] = [
        TranscriptProfile::Ramp,
        TranscriptProfile::Uvlo,
        TranscriptProfile::Clicks,
        TranscriptProfile::Sensors,
    ];

    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Ramp => "transcripts/emulator-ramp.log",
            TranscriptProfile::Uvlo => "transcripts/emulator-uvlo.log",
            TranscriptProfile::Clicks => "transcripts/emulator-clicks.log",
            TranscriptProfile::Sensors => "transcripts/emulator-sensors.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Ramp => "Flashlight Emulator ramp transcript",
            TranscriptProfile::Uvlo => "Flashlight Emulator under-voltage transcript",
            TranscriptProfile::Clicks => "Flashlight Emulator click counter transcript",
            TranscriptProfile::Sensors => "Flashlight Emulator sensor transcript",
        }
    }

    /// Commands replayed for this profile.
    pub fn script(self) -> &'static [&'static str] {
        match self {
            TranscriptProfile::Ramp => &[
                "power-cycle 0.2",
                "power-cycle 0.2",
                "power-cycle 0.2",
                "power-cycle 0.2",
                "tick 64",
                "status",
                "tick 96",
                "status",
                "telemetry",
            ],
            TranscriptProfile::Uvlo => &[
                "power-cycle 0.3",
                "power-cycle 0.3",
                "power-cycle 0.3",
                "tick 4",
                "status",
                "battery 2.9",
                "tick 8",
                "status",
                "battery 3.5",
                "tick 8",
                "status",
                "telemetry",
            ],
            TranscriptProfile::Clicks => &[
                "status",
                "power-cycle 0.4",
                "status",
                "power-cycle 0.9",
                "status",
                "power-cycle 5",
                "status",
            ],
            TranscriptProfile::Sensors => &[
                "ntc 40",
                "die 45",
                "tick 2",
                "status",
                "ntc 60",
                "battery 3.3",
                "tick 2",
                "status",
            ],
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        Self::ALL
            .into_iter()
            .find(|profile| tag.eq_ignore_ascii_case(profile.tag()))
            .ok_or_else(|| format!("Unknown transcript profile `{tag}`"))
    }

    pub fn tag(self) -> &'static str {
        match self {
            TranscriptProfile::Ramp => "ramp",
            TranscriptProfile::Uvlo => "uvlo",
            TranscriptProfile::Clicks => "clicks",
            TranscriptProfile::Sensors => "sensors",
        }
    }
}

/// Analog quantities the simulated converters sample.
#[derive(Clone, Copy, Debug)]
struct Environment {
    battery_volts: f32,
    ntc_kelvin: f32,
    die_kelvin: f32,
    supply_volts: f32,
    off_time_seconds: f32,
}

impl Environment {
    fn new() -> Self {
        Self {
            battery_volts: 3.7,
            ntc_kelvin: NTC_T0_KELVIN,
            die_kelvin: NTC_T0_KELVIN + 5.0,
            supply_volts: 3.3,
            off_time_seconds: FIRST_BOOT_OFF_TIME_SECONDS,
        }
    }

    fn adc0_sample(&self, reference: Reference, channel: Adc0Channel) -> RawSample {
        match channel {
            Adc0Channel::TemperatureSensor => {
                let raw = self.die_kelvin * 256.0 / f32::from(DIE_CALIBRATION.gain)
                    + f32::from(DIE_CALIBRATION.offset);
                clamp_sample(raw)
            }
            Adc0Channel::Thermistor => {
                let resistance = NTC_R0_OHMS
                    * (NTC_B_KELVIN * (1.0 / self.ntc_kelvin - 1.0 / NTC_T0_KELVIN)).exp();
                let divider = NTC_R1_OHMS / (resistance + NTC_R1_OHMS);
                self.volts_to_sample(divider * self.supply_volts, reference)
            }
            Adc0Channel::OffTimeCapacitor => {
                let rc = OFF_TIME_R_OHMS * OFF_TIME_C_FARADS;
                let volts = OFF_TIME_CLAMP_VOLTS * (-self.off_time_seconds / rc).exp();
                self.volts_to_sample(volts, reference)
            }
        }
    }

    fn adc1_sample(&self, reference: Reference, channel: Adc1Channel) -> RawSample {
        match channel {
            Adc1Channel::Battery => {
                self.volts_to_sample(self.battery_volts / BATTERY_DIVIDER_GAIN, reference)
            }
        }
    }

    fn volts_to_sample(&self, volts: f32, reference: Reference) -> RawSample {
        let full_scale = reference.volts().unwrap_or(self.supply_volts);
        clamp_sample(volts / full_scale * f32::from(FULL_SCALE))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_sample(raw: f32) -> RawSample {
    // Zero is outside the derivation contract; the lowest code stands in for it.
    raw.round().clamp(1.0, f32::from(FULL_SCALE)) as RawSample
}

/// Converter whose conversion finishes when the session services it.
struct SimAdc<C> {
    configured: Option<(Reference, C)>,
    converting: bool,
    accumulated: u16,
    conversions: u32,
}

impl<C> SimAdc<C> {
    fn new() -> Self {
        Self {
            configured: None,
            converting: false,
            accumulated: 0,
            conversions: 0,
        }
    }

    fn finish(&mut self, raw: RawSample) {
        self.accumulated = raw * ACCUMULATION_FACTOR;
        self.converting = false;
    }
}

impl<C: Copy> ConverterHardware for SimAdc<C> {
    type Channel = C;

    fn supports(&self, _reference: Reference) -> bool {
        true
    }

    fn configure(&mut self, reference: Reference, channel: C, _accumulation: u16) {
        self.configured = Some((reference, channel));
    }

    fn start(&mut self) {
        self.converting = true;
        self.conversions += 1;
    }

    fn is_converting(&self) -> bool {
        self.converting
    }

    fn take_result(&mut self) -> u16 {
        self.accumulated
    }
}

/// Completion callback that posts the value back to the session loop.
struct Deliver {
    kind: SensorKind,
    outbox: Sender<(SensorKind, f32)>,
}

impl ReadingCallback for Deliver {
    fn deliver(self, value: f32) {
        // The receiver lives as long as the session.
        self.outbox.send((self.kind, value)).ok();
    }
}

type Hub = SensorHub<SimAdc<Adc0Channel>, SimAdc<Adc1Channel>, Deliver>;

fn new_hub() -> Hub {
    SensorHub::new(
        SimAdc::new(),
        SimAdc::new(),
        DIE_CALIBRATION,
        SensorConfig::default(),
    )
}

#[derive(Default)]
struct SimStage {
    settle: Duration,
    events: Vec<String>,
}

impl PowerStage for SimStage {
    fn set_inverting_override(&mut self, asserted: bool) {
        self.events
            .push(format!("stage override={}", on_off(asserted)));
    }

    fn set_boost_supply(&mut self, enabled: bool) {
        self.events.push(format!("stage boost={}", on_off(enabled)));
    }

    fn set_gain_range(&mut self, enabled: bool) {
        self.events.push(format!("stage gain={}", on_off(enabled)));
    }

    fn delay(&mut self, duration: Duration) {
        self.settle += duration;
        self.events
            .push(format!("stage wait {}ms", duration.as_millis()));
    }
}

struct SimDac {
    reference: DriveReference,
    level: u8,
}

impl DriveOutput for SimDac {
    fn reference(&self) -> DriveReference {
        self.reference
    }

    fn set_reference(&mut self, reference: DriveReference) {
        self.reference = reference;
    }

    fn level(&self) -> u8 {
        self.level
    }

    fn set_level(&mut self, level: u8) {
        self.level = level;
    }
}

fn new_sequencer() -> PowerSequencer<SimStage, SimDac> {
    let dac = SimDac {
        reference: DriveReference::V0_55,
        level: 0,
    };
    PowerSequencer::new(SimStage::default(), dac, ACTIVE_TABLE)
}

/// Non-volatile click counter cell; survives power cycles.
#[derive(Default)]
struct MemoryStore {
    value: Option<u8>,
    writes: u32,
}

impl CounterStore for MemoryStore {
    fn load(&mut self) -> Result<u8, StoreError> {
        self.value.ok_or(StoreError::Blank)
    }

    fn save(&mut self, value: u8) -> Result<(), StoreError> {
        self.value = Some(value);
        self.writes += 1;
        Ok(())
    }
}

#[derive(Default)]
struct SimLine {
    enabled: bool,
}

impl EnableLine for SimLine {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[derive(Default)]
struct SimClock {
    ticks: u32,
}

impl TickSource for SimClock {
    fn ticks(&self) -> u32 {
        self.ticks
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Tick(u32);

impl TelemetryInstant for Tick {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        let ticks = self.0.saturating_sub(earlier.0);
        Duration::from_millis(u64::from(ticks) * 1_000 / u64::from(TICK_HZ))
    }
}

/// Collects status lines for the transcript.
#[derive(Default)]
struct LineBuffer(Vec<String>);

impl StatusSink for LineBuffer {
    fn write_line(&mut self, line: &str) {
        self.0.push(line.to_string());
    }
}

pub struct Session {
    environment: Environment,
    hub: Shared<Hub>,
    sequencer: PowerSequencer<SimStage, SimDac>,
    monitor: BatteryMonitor,
    clicks: ClickCounter,
    schedule: SensorSchedule,
    blinker: IndicatorBlinker,
    program: OutputProgram,
    readings: SensorReadings,
    telemetry: TelemetryRecorder<Tick>,
    store: MemoryStore,
    clock: SimClock,
    battery_enable: SimLine,
    capacitor_charge: SimLine,
    indicator: SimLine,
    outbox: Sender<(SensorKind, f32)>,
    inbox: Receiver<(SensorKind, f32)>,
    transcript: TranscriptLogger,
}

impl Session {
    pub fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let transcript = TranscriptLogger::new(profile)?;
        let (outbox, inbox) = mpsc::channel();

        let mut session = Self {
            environment: Environment::new(),
            hub: Shared::new(new_hub()),
            sequencer: new_sequencer(),
            monitor: BatteryMonitor::new(),
            clicks: ClickCounter::new(),
            schedule: SensorSchedule::new(0),
            blinker: IndicatorBlinker::new(0),
            program: OutputProgram::new(Mode::UltraLow),
            readings: SensorReadings::new(),
            telemetry: TelemetryRecorder::new(),
            store: MemoryStore::default(),
            clock: SimClock::default(),
            battery_enable: SimLine::default(),
            capacitor_charge: SimLine::default(),
            indicator: SimLine::default(),
            outbox,
            inbox,
            transcript,
        };

        let lines = session.boot();
        session.record_output(&lines)?;
        Ok(session)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.transcript
            .append_line(self.elapsed(), TranscriptRole::Host, trimmed)?;

        let words: Vec<&str> = trimmed.split_whitespace().collect();
        let lines = match words.as_slice() {
            ["help"] => vec![help_topic_list()],
            ["help", topic] => vec![help_for(topic)],
            ["tick"] => self.tick(1),
            ["tick", count] => match count.parse::<u32>() {
                Ok(count) => self.tick(count),
                Err(_) => vec![format!("ERR syntax expected a tick count, got `{count}`")],
            },
            ["battery", volts] => self.set_quantity(volts, |env, value| env.battery_volts = value),
            ["ntc", celsius] => {
                self.set_quantity(celsius, |env, value| env.ntc_kelvin = value + KELVIN_OFFSET)
            }
            ["die", celsius] => {
                self.set_quantity(celsius, |env, value| env.die_kelvin = value + KELVIN_OFFSET)
            }
            ["power-cycle", seconds] => match seconds.parse::<f32>() {
                Ok(seconds) if seconds >= 0.0 => self.power_cycle(seconds),
                _ => vec![format!("ERR syntax expected an off time, got `{seconds}`")],
            },
            ["status"] => self.status_lines(),
            ["telemetry"] => self.telemetry_lines(),
            _ => vec![format!("ERR unknown command `{trimmed}`")],
        };

        self.record_output(&lines)?;
        Ok(lines)
    }

    fn elapsed(&self) -> Duration {
        Tick(self.clock.ticks()).saturating_duration_since(Tick(0))
    }

    fn set_quantity(
        &mut self,
        argument: &str,
        apply: impl FnOnce(&mut Environment, f32),
    ) -> Vec<String> {
        match argument.parse::<f32>() {
            Ok(value) => {
                apply(&mut self.environment, value);
                vec!["OK".to_string()]
            }
            Err(_) => vec![format!("ERR syntax expected a number, got `{argument}`")],
        }
    }

    /// Power-up path: measure the off time, update the click count and pick the mode.
    fn boot(&mut self) -> Vec<String> {
        let mut lines = Vec::new();

        self.clicks.begin_probe(&mut self.capacitor_charge);
        let deliver = Deliver {
            kind: SensorKind::OffTime,
            outbox: self.outbox.clone(),
        };
        if let Err(err) = self.hub.lock(|hub| hub.request_off_time(deliver)) {
            lines.push(format!("off-time request refused: {err}"));
        }
        while self.hub.lock(|hub| hub.is_converter_busy(UnitId::Adc0)) {
            self.service_conversions();
        }
        self.drain_readings(&mut lines);

        self.sequencer.initialize();
        self.drain_stage_events(&mut lines);

        let count = match ClickCounter::load(&mut self.store) {
            Ok(count) => count,
            Err(err) => {
                lines.push(format!("click counter unavailable: {err}"));
                0
            }
        };
        let mode = Mode::from_click_count(count);
        self.program = OutputProgram::new(mode);
        lines.push(format!("boot clicks={count} mode={}", mode.label()));
        lines
    }

    fn power_cycle(&mut self, seconds: f32) -> Vec<String> {
        self.environment.off_time_seconds = seconds;

        // Everything but the counter store and the analog environment is volatile.
        self.hub = Shared::new(new_hub());
        self.sequencer = new_sequencer();
        self.monitor = BatteryMonitor::new();
        self.readings = SensorReadings::new();
        self.telemetry = TelemetryRecorder::new();
        self.clock = SimClock::default();
        self.schedule = SensorSchedule::new(self.clock.ticks());
        self.blinker = IndicatorBlinker::new(self.clock.ticks());
        self.battery_enable = SimLine::default();
        self.indicator = SimLine::default();
        while self.inbox.try_recv().is_ok() {}

        let mut lines = vec![format!("power off for {seconds:.2}s")];
        lines.extend(self.boot());
        lines
    }

    fn tick(&mut self, count: u32) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..count {
            self.clock.ticks = self.clock.ticks.wrapping_add(1);
            let now = self.clock.ticks();

            let outbox = &self.outbox;
            let schedule = &mut self.schedule;
            let battery_enable = &mut self.battery_enable;
            self.hub.lock(|hub| {
                schedule.poll(now, hub, battery_enable, |kind| Deliver {
                    kind,
                    outbox: outbox.clone(),
                })
            });
            self.service_conversions();
            self.drain_readings(&mut lines);

            for _ in 0..control_iterations_per_tick() {
                let report = self.sequencer.apply_brightness(self.program.next_brightness());
                self.note_apply(&report, &mut lines);
            }

            self.blinker
                .poll(now, self.sequencer.uvlo_active(), &mut self.indicator);
        }

        lines.push(format!(
            "ticks={} brightness={} indicator={}",
            self.clock.ticks(),
            self.sequencer.last_applied(),
            on_off(self.indicator.enabled)
        ));
        lines
    }

    /// Completes every running conversion, like the completion interrupts would.
    fn service_conversions(&mut self) {
        let environment = self.environment;
        let ready = self.hub.lock(|hub| {
            let adc0 = hub.adc0_hardware_mut();
            if let Some((reference, channel)) = adc0.configured.filter(|_| adc0.converting) {
                adc0.finish(environment.adc0_sample(reference, channel));
            }
            let adc1 = hub.adc1_hardware_mut();
            if let Some((reference, channel)) = adc1.configured.filter(|_| adc1.converting) {
                adc1.finish(environment.adc1_sample(reference, channel));
            }
            [
                hub.take_completion(UnitId::Adc0),
                hub.take_completion(UnitId::Adc1),
            ]
        });
        // Continuations run outside the lock so they may issue new requests.
        for completion in ready.into_iter().flatten() {
            completion.fire();
        }
    }

    fn drain_readings(&mut self, lines: &mut Vec<String>) {
        while let Ok((kind, value)) = self.inbox.try_recv() {
            let now = Tick(self.clock.ticks());
            self.readings.update(kind, value);
            self.telemetry.record_reading(kind, value, now);

            match kind {
                SensorKind::BatteryLevel => {
                    self.monitor.release(&mut self.battery_enable);
                    if let Some(transition) = self.monitor.on_reading(value, &mut self.sequencer) {
                        self.telemetry.record_uvlo(&transition, now);
                        lines.push(match transition {
                            UvloTransition::Entered(_) => {
                                format!("uvlo entered battery={value:.2}V")
                            }
                            UvloTransition::Cleared => format!("uvlo cleared battery={value:.2}V"),
                        });
                        self.drain_stage_events(lines);
                    }
                }
                SensorKind::OffTime => {
                    self.clicks.end_probe(&mut self.capacitor_charge);
                    let outcome = self.clicks.record_off_time(value, &mut self.store);
                    lines.push(match outcome {
                        Ok(ClickOutcome::Counted(count)) => {
                            format!("off-time {value:.2}s click count={count}")
                        }
                        Ok(ClickOutcome::Reset) => {
                            format!("off-time {value:.2}s click count reset")
                        }
                        Ok(ClickOutcome::Unchanged) => format!("off-time {value:.2}s"),
                        Err(err) => format!("off-time {value:.2}s store failed: {err}"),
                    });
                }
                SensorKind::InternalTemperature | SensorKind::ExternalTemperature => {}
            }
        }
    }

    fn note_apply(&mut self, report: &ApplyReport, lines: &mut Vec<String>) {
        let now = Tick(self.clock.ticks());
        if self.telemetry.record_apply(report, now) == 0 {
            return;
        }
        for (stage, edge) in [("boost", report.boost), ("gain-range", report.gain_range)] {
            if let Some(edge) = edge {
                let state = match edge {
                    StageEdge::Enabled => "enabled",
                    StageEdge::Disabled => "disabled",
                };
                lines.push(format!("{stage} {state} at brightness={}", report.effective));
            }
        }
        self.drain_stage_events(lines);
    }

    fn drain_stage_events(&mut self, lines: &mut Vec<String>) {
        lines.append(&mut self.sequencer.stage_mut().events);
    }

    fn status_lines(&self) -> Vec<String> {
        let snapshot = StatusSnapshot::capture(self.program.mode(), &self.sequencer, self.readings);
        let mut sink = LineBuffer::default();
        if StatusFormatter::new(&snapshot).emit(&mut sink).is_err() {
            sink.write_line("ERR status line overflow");
        }
        let (adc0, adc1) = self.hub.lock(|hub| {
            (
                hub.adc0_hardware_mut().conversions,
                hub.adc1_hardware_mut().conversions,
            )
        });
        sink.0.push(format!(
            "counters conversions={adc0}/{adc1} store-writes={} boost-settle={}ms",
            self.store.writes,
            self.sequencer.stage().settle.as_millis()
        ));
        sink.0
    }

    fn telemetry_lines(&self) -> Vec<String> {
        if self.telemetry.is_empty() {
            return vec!["telemetry empty".to_string()];
        }
        self.telemetry
            .oldest_first()
            .map(|record| {
                format!(
                    "#{} t={} code=0x{:04x} {}",
                    record.id,
                    record.timestamp.0,
                    record.event.to_raw(),
                    record.event
                )
            })
            .collect()
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        let elapsed = self.elapsed();
        for line in lines {
            self.transcript
                .append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn help_topic_list() -> String {
    let names: Vec<&str> = HELP_TOPICS.iter().map(|(name, _)| *name).collect();
    format!("Commands: {}", names.join(", "))
}

fn help_for(topic: &str) -> String {
    HELP_TOPICS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(topic))
        .map_or_else(
            || format!("ERR unknown help topic `{topic}`"),
            |(_, text)| (*text).to_string(),
        )
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header(profile)?;
        Ok(logger)
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(
            self.writer,
            "# Timestamps are simulated milliseconds since the last power-up"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => ">",
            TranscriptRole::Emulator => "<",
        }
    }
}
