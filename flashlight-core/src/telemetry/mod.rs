//! Telemetry event catalog and ring-buffer recorder shared by firmware and host targets.
//!
//! Stage transitions, lockout changes and sensor deliveries are captured as
//! strongly typed events that encode to compact numeric codes for transport
//! over diagnostics channels. Records live in a fixed-capacity ring so the
//! recorder stays `no_std` and allocation-free.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};
use num_traits::Float;

use crate::brightness::{Brightness, DriveSetting};
use crate::monitor::UvloTransition;
use crate::power::{ApplyOutcome, ApplyReport, StageEdge};
use crate::sensors::SensorKind;

/// Monotonic identifier assigned to each record.
pub type EventId = u32;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryEventKind {
    BoostEnabled,
    BoostDisabled,
    GainRangeEnabled,
    GainRangeDisabled,
    UnderVoltageEntered,
    UnderVoltageCleared,
    ReadingDelivered(SensorKind),
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::BoostEnabled => f.write_str("boost-enabled"),
            TelemetryEventKind::BoostDisabled => f.write_str("boost-disabled"),
            TelemetryEventKind::GainRangeEnabled => f.write_str("gain-range-enabled"),
            TelemetryEventKind::GainRangeDisabled => f.write_str("gain-range-disabled"),
            TelemetryEventKind::UnderVoltageEntered => f.write_str("uvlo-entered"),
            TelemetryEventKind::UnderVoltageCleared => f.write_str("uvlo-cleared"),
            TelemetryEventKind::ReadingDelivered(kind) => write!(f, "reading {}", kind.label()),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const BOOST_ENABLED_CODE: u16 = 0x0000;
    const BOOST_DISABLED_CODE: u16 = 0x0001;
    const GAIN_RANGE_ENABLED_CODE: u16 = 0x0002;
    const GAIN_RANGE_DISABLED_CODE: u16 = 0x0003;
    const UVLO_ENTERED_CODE: u16 = 0x0004;
    const UVLO_CLEARED_CODE: u16 = 0x0005;
    const READING_BASE: u16 = 0x0010;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::BoostEnabled => Self::BOOST_ENABLED_CODE,
            TelemetryEventKind::BoostDisabled => Self::BOOST_DISABLED_CODE,
            TelemetryEventKind::GainRangeEnabled => Self::GAIN_RANGE_ENABLED_CODE,
            TelemetryEventKind::GainRangeDisabled => Self::GAIN_RANGE_DISABLED_CODE,
            TelemetryEventKind::UnderVoltageEntered => Self::UVLO_ENTERED_CODE,
            TelemetryEventKind::UnderVoltageCleared => Self::UVLO_CLEARED_CODE,
            TelemetryEventKind::ReadingDelivered(kind) => Self::READING_BASE + sensor_index(kind),
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TelemetryEventKind::Custom`].
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::BOOST_ENABLED_CODE => TelemetryEventKind::BoostEnabled,
            Self::BOOST_DISABLED_CODE => TelemetryEventKind::BoostDisabled,
            Self::GAIN_RANGE_ENABLED_CODE => TelemetryEventKind::GainRangeEnabled,
            Self::GAIN_RANGE_DISABLED_CODE => TelemetryEventKind::GainRangeDisabled,
            Self::UVLO_ENTERED_CODE => TelemetryEventKind::UnderVoltageEntered,
            Self::UVLO_CLEARED_CODE => TelemetryEventKind::UnderVoltageCleared,
            value if value >= Self::READING_BASE => sensor_from_index(value - Self::READING_BASE)
                .map_or(TelemetryEventKind::Custom(value), TelemetryEventKind::ReadingDelivered),
            other => TelemetryEventKind::Custom(other),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryPayload {
    None,
    Stage(StageTelemetry),
    Reading(ReadingTelemetry),
}

/// Context of a boost or gain-range transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StageTelemetry {
    pub brightness: Brightness,
    /// `None` when the apply short-circuited before the table lookup.
    pub setting: Option<DriveSetting>,
    pub elapsed_since_previous: Option<Duration>,
}

/// Derived value in thousandths of its unit (mK, mV or ms).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadingTelemetry {
    pub milli: i32,
}

impl ReadingTelemetry {
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_value(value: f32) -> Self {
        Self {
            milli: (value * 1_000.0).round() as i32,
        }
    }
}

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Monotonic instant wrapper used for elapsed-time tracking.
pub trait TelemetryInstant: Copy {
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    last_stage_edge_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_stage_edge_at: None,
            next_event_id: 0,
        }
    }

    /// Recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records the stage edges of one brightness apply. Returns how many
    /// events were written.
    pub fn record_apply(&mut self, report: &ApplyReport, timestamp: TInstant) -> usize {
        let setting = match report.outcome {
            ApplyOutcome::Applied(setting) => Some(setting),
            ApplyOutcome::Unchanged => None,
        };
        let mut written = 0;

        let edges = [
            report.boost.map(|edge| match edge {
                StageEdge::Enabled => TelemetryEventKind::BoostEnabled,
                StageEdge::Disabled => TelemetryEventKind::BoostDisabled,
            }),
            report.gain_range.map(|edge| match edge {
                StageEdge::Enabled => TelemetryEventKind::GainRangeEnabled,
                StageEdge::Disabled => TelemetryEventKind::GainRangeDisabled,
            }),
        ];
        for event in edges.into_iter().flatten() {
            let elapsed = self
                .last_stage_edge_at
                .map(|previous| timestamp.saturating_duration_since(previous));
            self.last_stage_edge_at = Some(timestamp);
            let payload = TelemetryPayload::Stage(StageTelemetry {
                brightness: report.effective,
                setting,
                elapsed_since_previous: elapsed,
            });
            self.record(event, payload, timestamp);
            written += 1;
        }

        written
    }

    /// Records a lockout change, including the edges of a forced apply.
    pub fn record_uvlo(&mut self, transition: &UvloTransition, timestamp: TInstant) -> EventId {
        match transition {
            UvloTransition::Entered(report) => {
                let id = self.record(
                    TelemetryEventKind::UnderVoltageEntered,
                    TelemetryPayload::None,
                    timestamp,
                );
                self.record_apply(report, timestamp);
                id
            }
            UvloTransition::Cleared => self.record(
                TelemetryEventKind::UnderVoltageCleared,
                TelemetryPayload::None,
                timestamp,
            ),
        }
    }

    /// Records one delivered sensor value.
    pub fn record_reading(&mut self, kind: SensorKind, value: f32, timestamp: TInstant) -> EventId {
        self.record(
            TelemetryEventKind::ReadingDelivered(kind),
            TelemetryPayload::Reading(ReadingTelemetry::from_value(value)),
            timestamp,
        )
    }

    /// Records an arbitrary event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

const fn sensor_index(kind: SensorKind) -> u16 {
    match kind {
        SensorKind::InternalTemperature => 0,
        SensorKind::ExternalTemperature => 1,
        SensorKind::BatteryLevel => 2,
        SensorKind::OffTime => 3,
    }
}

fn sensor_from_index(index: u16) -> Option<SensorKind> {
    match index {
        0 => Some(SensorKind::InternalTemperature),
        1 => Some(SensorKind::ExternalTemperature),
        2 => Some(SensorKind::BatteryLevel),
        3 => Some(SensorKind::OffTime),
        _ => None,
    }
}
