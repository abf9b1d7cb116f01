//! Single-shot, interrupt-driven analog converter units.
//!
//! A [`ConverterUnit`] owns one physical converter through the
//! [`ConverterHardware`] trait and holds at most one pending continuation.
//! The main flow issues a request; the completion interrupt reads the
//! accumulated result, undoes the hardware accumulation and hands the raw
//! sample to the continuation exactly once.
//!
//! The two physical converters on the board are fully independent, so each
//! gets its own unit instance with its own channel set.

use core::fmt;

use crate::config::{ACCUMULATION_FACTOR, ACCUMULATION_SHIFT};

/// Right-justified conversion result after accumulation has been divided out.
pub type RawSample = u16;

/// Largest code a 10-bit conversion produces.
pub const FULL_SCALE: u16 = 1023;

/// Identifies one of the two converter units.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnitId {
    Adc0,
    Adc1,
}

impl UnitId {
    /// Short label used in logs and status lines.
    pub const fn label(self) -> &'static str {
        match self {
            UnitId::Adc0 => "adc0",
            UnitId::Adc1 => "adc1",
        }
    }
}

/// Internal band-gap derived reference voltages.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InternalReference {
    V0_55,
    V1_1,
    V1_5,
    V2_5,
    V4_34,
}

impl InternalReference {
    /// Nominal voltage of the reference.
    pub const fn volts(self) -> f32 {
        match self {
            InternalReference::V0_55 => 0.55,
            InternalReference::V1_1 => 1.1,
            InternalReference::V1_5 => 1.5,
            InternalReference::V2_5 => 2.5,
            InternalReference::V4_34 => 4.34,
        }
    }
}

/// Reference selector for a conversion.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    Internal(InternalReference),
    /// Supply rail; results are ratiometric to VDD.
    Supply,
}

impl Reference {
    /// Absolute reference voltage, or `None` for the ratiometric supply reference.
    pub const fn volts(self) -> Option<f32> {
        match self {
            Reference::Internal(reference) => Some(reference.volts()),
            Reference::Supply => None,
        }
    }
}

/// Register-level access to one physical converter.
///
/// Implementations must not block. `start` enables the result-ready
/// interrupt and triggers one conversion; the platform's interrupt handler
/// then calls [`ConverterUnit::take_completion`] or
/// [`ConverterUnit::on_completion`].
pub trait ConverterHardware {
    /// Input multiplexer selection for this unit.
    type Channel: Copy;

    /// Returns `true` when the unit can generate the requested reference.
    fn supports(&self, reference: Reference) -> bool;

    /// Programs reference, input channel and sample accumulation.
    fn configure(&mut self, reference: Reference, channel: Self::Channel, accumulation: u16);

    /// Enables the completion notification and starts a conversion.
    fn start(&mut self);

    /// Returns `true` while the start bit is still set.
    fn is_converting(&self) -> bool;

    /// Clears the completion flag and returns the accumulated result register.
    fn take_result(&mut self) -> u16;
}

/// Single-fire continuation registered with a converter unit.
///
/// `complete` consumes the continuation, so it can run at most once.
pub trait Completion {
    fn complete(self, raw: RawSample);
}

/// Reason a request was not accepted. The continuation is handed back.
#[derive(Debug, Eq, PartialEq)]
pub enum RequestError<C> {
    /// A conversion is in flight or a continuation is still registered.
    Busy(C),
    /// The unit cannot generate the requested reference.
    UnsupportedReference(C),
}

impl<C> RequestError<C> {
    /// Recovers the rejected continuation.
    pub fn into_inner(self) -> C {
        match self {
            RequestError::Busy(continuation) | RequestError::UnsupportedReference(continuation) => {
                continuation
            }
        }
    }
}

impl<C> fmt::Display for RequestError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Busy(_) => f.write_str("converter busy"),
            RequestError::UnsupportedReference(_) => f.write_str("reference not supported"),
        }
    }
}

/// A finished conversion whose continuation has already been unregistered.
#[derive(Debug, Eq, PartialEq)]
pub struct Ready<C> {
    continuation: C,
    raw: RawSample,
}

impl<C: Completion> Ready<C> {
    /// Raw sample delivered by the hardware.
    pub const fn raw(&self) -> RawSample {
        self.raw
    }

    /// Invokes the continuation with the raw sample.
    pub fn fire(self) {
        self.continuation.complete(self.raw);
    }
}

/// One converter with its single pending-continuation slot.
pub struct ConverterUnit<H, C> {
    hardware: H,
    pending: Option<C>,
}

impl<H, C> ConverterUnit<H, C>
where
    H: ConverterHardware,
    C: Completion,
{
    /// Wraps the converter hardware with an empty continuation slot.
    pub const fn new(hardware: H) -> Self {
        Self {
            hardware,
            pending: None,
        }
    }

    /// Returns `true` while a conversion is in flight.
    pub fn is_busy(&self) -> bool {
        self.hardware.is_converting()
    }

    /// Returns `true` while a continuation is registered.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Configures the unit and triggers one accumulated conversion.
    ///
    /// The reference and channel are programmed on every request; nothing is
    /// assumed to persist from the previous conversion.
    pub fn request(
        &mut self,
        reference: Reference,
        channel: H::Channel,
        continuation: C,
    ) -> Result<(), RequestError<C>> {
        if self.pending.is_some() || self.hardware.is_converting() {
            return Err(RequestError::Busy(continuation));
        }
        if !self.hardware.supports(reference) {
            return Err(RequestError::UnsupportedReference(continuation));
        }

        self.hardware.configure(reference, channel, ACCUMULATION_FACTOR);
        self.pending = Some(continuation);
        self.hardware.start();
        Ok(())
    }

    /// Completion-interrupt entry point that defers the callback.
    ///
    /// Reads and clears the result, unregisters the continuation and returns
    /// it so the caller can fire it after releasing any lock around the unit.
    /// A continuation fired this way may issue the next request on the same
    /// unit.
    pub fn take_completion(&mut self) -> Option<Ready<C>> {
        let raw = self.hardware.take_result() >> ACCUMULATION_SHIFT;
        self.pending.take().map(|continuation| Ready { continuation, raw })
    }

    /// Completion-interrupt entry point that fires the callback in place.
    ///
    /// Returns `true` when a continuation was invoked.
    pub fn on_completion(&mut self) -> bool {
        match self.take_completion() {
            Some(ready) => {
                ready.fire();
                true
            }
            None => false,
        }
    }

    /// Shared access to the wrapped hardware.
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Exclusive access to the wrapped hardware.
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    enum TestChannel {
        A,
        B,
    }

    struct MockHardware {
        converting: bool,
        result: u16,
        configured: Option<(Reference, TestChannel, u16)>,
        starts: u32,
        flag_clears: u32,
    }

    impl MockHardware {
        fn new() -> Self {
            Self {
                converting: false,
                result: 0,
                configured: None,
                starts: 0,
                flag_clears: 0,
            }
        }

        fn finish(&mut self, accumulated: u16) {
            self.converting = false;
            self.result = accumulated;
        }
    }

    impl ConverterHardware for MockHardware {
        type Channel = TestChannel;

        fn supports(&self, reference: Reference) -> bool {
            reference != Reference::Internal(InternalReference::V4_34)
        }

        fn configure(&mut self, reference: Reference, channel: TestChannel, accumulation: u16) {
            self.configured = Some((reference, channel, accumulation));
        }

        fn start(&mut self) {
            self.converting = true;
            self.starts += 1;
        }

        fn is_converting(&self) -> bool {
            self.converting
        }

        fn take_result(&mut self) -> u16 {
            self.flag_clears += 1;
            self.result
        }
    }

    #[derive(Debug)]
    struct Record<'a> {
        slot: &'a Cell<Option<RawSample>>,
        calls: &'a Cell<u32>,
    }

    impl Completion for Record<'_> {
        fn complete(self, raw: RawSample) {
            self.slot.set(Some(raw));
            self.calls.set(self.calls.get() + 1);
        }
    }

    #[test]
    fn request_configures_and_starts_with_accumulation() {
        let slot = Cell::new(None);
        let calls = Cell::new(0);
        let mut unit = ConverterUnit::new(MockHardware::new());

        unit.request(
            Reference::Internal(InternalReference::V1_5),
            TestChannel::B,
            Record {
                slot: &slot,
                calls: &calls,
            },
        )
        .expect("idle unit accepts request");

        assert!(unit.is_busy());
        assert!(unit.has_pending());
        assert_eq!(
            unit.hardware().configured,
            Some((
                Reference::Internal(InternalReference::V1_5),
                TestChannel::B,
                4
            ))
        );
        assert_eq!(unit.hardware().starts, 1);
    }

    #[test]
    fn completion_divides_out_accumulation_and_fires_once() {
        let slot = Cell::new(None);
        let calls = Cell::new(0);
        let mut unit = ConverterUnit::new(MockHardware::new());

        unit.request(
            Reference::Supply,
            TestChannel::A,
            Record {
                slot: &slot,
                calls: &calls,
            },
        )
        .expect("idle unit accepts request");

        unit.hardware_mut().finish(4 * 700 + 3);
        assert!(unit.on_completion());
        assert_eq!(slot.get(), Some(700));
        assert_eq!(calls.get(), 1);
        assert!(!unit.has_pending());

        // A spurious second interrupt clears the flag but fires nothing.
        assert!(!unit.on_completion());
        assert_eq!(calls.get(), 1);
        assert_eq!(unit.hardware().flag_clears, 2);
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let slot = Cell::new(None);
        let calls = Cell::new(0);
        let mut unit = ConverterUnit::new(MockHardware::new());

        unit.request(
            Reference::Supply,
            TestChannel::A,
            Record {
                slot: &slot,
                calls: &calls,
            },
        )
        .expect("idle unit accepts request");

        let rejected = unit.request(
            Reference::Supply,
            TestChannel::B,
            Record {
                slot: &slot,
                calls: &calls,
            },
        );
        assert!(matches!(rejected, Err(RequestError::Busy(_))));
        assert_eq!(unit.hardware().starts, 1);
        assert_eq!(
            unit.hardware().configured.map(|(_, channel, _)| channel),
            Some(TestChannel::A)
        );
    }

    #[test]
    fn unsupported_reference_hands_continuation_back() {
        let slot = Cell::new(None);
        let calls = Cell::new(0);
        let mut unit = ConverterUnit::new(MockHardware::new());

        let error = unit
            .request(
                Reference::Internal(InternalReference::V4_34),
                TestChannel::A,
                Record {
                    slot: &slot,
                    calls: &calls,
                },
            )
            .expect_err("4.34 V is not available on the mock");

        assert!(!unit.has_pending());
        error.into_inner().complete(9);
        assert_eq!(slot.get(), Some(9));
    }

    #[test]
    fn deferred_completion_frees_the_slot_before_firing() {
        let slot = Cell::new(None);
        let calls = Cell::new(0);
        let mut unit = ConverterUnit::new(MockHardware::new());

        unit.request(
            Reference::Supply,
            TestChannel::A,
            Record {
                slot: &slot,
                calls: &calls,
            },
        )
        .expect("idle unit accepts request");
        unit.hardware_mut().finish(40);

        let ready = unit.take_completion().expect("continuation registered");
        assert_eq!(ready.raw(), 10);

        // The slot is already free, so a follow-up request can be issued
        // before the previous continuation runs.
        unit.request(
            Reference::Supply,
            TestChannel::B,
            Record {
                slot: &slot,
                calls: &calls,
            },
        )
        .expect("slot cleared before continuation fires");

        ready.fire();
        assert_eq!(slot.get(), Some(10));
        assert!(unit.has_pending());
    }
}
