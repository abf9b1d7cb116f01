//! Output modes selected by the click counter.

use num_traits::Float;

use crate::brightness::{BRIGHTNESS_MAX, Brightness};
use crate::config::blink_period_ticks;
use crate::platform::EnableLine;

/// User-visible output mode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    UltraLow,
    Low,
    High,
    UltraHigh,
    RampLoop,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::UltraLow,
        Mode::Low,
        Mode::High,
        Mode::UltraHigh,
        Mode::RampLoop,
    ];

    /// Mode for a persisted click count, cycling through [`Mode::ALL`].
    pub const fn from_click_count(count: u8) -> Self {
        Self::ALL[count as usize % Self::ALL.len()]
    }

    /// Constant brightness, or `None` for the ramp.
    pub const fn fixed_brightness(self) -> Option<Brightness> {
        match self {
            Mode::UltraLow => Some(1),
            Mode::Low => Some(400_000),
            Mode::High => Some(15_000_000),
            Mode::UltraHigh => Some(BRIGHTNESS_MAX),
            Mode::RampLoop => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Mode::UltraLow => "ultra-low",
            Mode::Low => "low",
            Mode::High => "high",
            Mode::UltraHigh => "ultra-high",
            Mode::RampLoop => "ramp",
        }
    }
}

/// Exponential brightness sweep used by [`Mode::RampLoop`].
///
/// Brightness follows `MAX · e^(t - 22)`. `t` rises in 4096 steps per 22
/// units, overshoots to `1.1 · 22` so the top holds briefly at full output,
/// then falls back to zero and turns around again.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ramp {
    t: f32,
    rising: bool,
}

impl Ramp {
    pub const MAX_TIME: f32 = 22.0;
    pub const STEP_COUNT: u16 = 4096;
    const TIME_STEP: f32 = Self::MAX_TIME / Self::STEP_COUNT as f32;
    const TURN_AROUND: f32 = 1.1 * Self::MAX_TIME;

    pub const fn new() -> Self {
        Self { t: 0.0, rising: true }
    }

    pub const fn is_rising(&self) -> bool {
        self.rising
    }

    /// Brightness at the current position without advancing.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn brightness(&self) -> Brightness {
        let value = BRIGHTNESS_MAX as f32 * (self.t - Self::MAX_TIME).exp();
        if value <= 0.0 {
            0
        } else if value >= BRIGHTNESS_MAX as f32 {
            BRIGHTNESS_MAX
        } else {
            value as Brightness
        }
    }

    /// Returns the current brightness and advances one step.
    pub fn next_brightness(&mut self) -> Brightness {
        let brightness = self.brightness();
        if self.rising {
            self.t += Self::TIME_STEP;
        } else {
            self.t -= Self::TIME_STEP;
        }
        if self.t >= Self::TURN_AROUND {
            self.rising = false;
        } else if self.t <= 0.0 {
            self.t = 0.0;
            self.rising = true;
        }
        brightness
    }
}

impl Default for Ramp {
    fn default() -> Self {
        Self::new()
    }
}

/// Brightness source for the active mode.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OutputProgram {
    mode: Mode,
    ramp: Ramp,
}

impl OutputProgram {
    pub const fn new(mode: Mode) -> Self {
        Self {
            mode,
            ramp: Ramp::new(),
        }
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Brightness to request on this control iteration.
    pub fn next_brightness(&mut self) -> Brightness {
        match self.mode.fixed_brightness() {
            Some(brightness) => brightness,
            None => self.ramp.next_brightness(),
        }
    }
}

/// Heartbeat indicator; blinks at half rate while the lockout is active.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IndicatorBlinker {
    last_toggle: u32,
    lit: bool,
}

impl IndicatorBlinker {
    pub const fn new(now: u32) -> Self {
        Self {
            last_toggle: now,
            lit: false,
        }
    }

    pub const fn is_lit(&self) -> bool {
        self.lit
    }

    /// Toggles `line` when a blink period has elapsed. Returns `true` on toggle.
    pub fn poll<L: EnableLine>(&mut self, now: u32, uvlo_active: bool, line: &mut L) -> bool {
        if now.wrapping_sub(self.last_toggle) < blink_period_ticks(uvlo_active) {
            return false;
        }
        self.last_toggle = now;
        self.lit = !self.lit;
        line.set_enabled(self.lit);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Led(heapless::Vec<bool, 16>);

    impl EnableLine for Led {
        fn set_enabled(&mut self, enabled: bool) {
            self.0.push(enabled).ok();
        }
    }

    #[test]
    fn click_count_cycles_through_modes() {
        assert_eq!(Mode::from_click_count(0), Mode::UltraLow);
        assert_eq!(Mode::from_click_count(4), Mode::RampLoop);
        assert_eq!(Mode::from_click_count(5), Mode::UltraLow);
        assert_eq!(Mode::from_click_count(255), Mode::UltraLow);
        assert_eq!(Mode::High.fixed_brightness(), Some(15_000_000));
    }

    #[test]
    fn ramp_climbs_to_full_output_and_turns_around() {
        let mut ramp = Ramp::new();
        let mut previous = ramp.next_brightness();
        let mut reached_max = false;
        for _ in 0..5_000 {
            let current = ramp.next_brightness();
            if ramp.is_rising() {
                assert!(current >= previous);
            }
            reached_max |= current == BRIGHTNESS_MAX;
            previous = current;
            if !ramp.is_rising() {
                break;
            }
        }
        assert!(reached_max);
        assert!(!ramp.is_rising());
    }

    #[test]
    fn ramp_starts_near_zero() {
        // e^-22 of the full range is just above one code.
        assert_eq!(Ramp::new().brightness(), 1);
    }

    #[test]
    fn fixed_mode_program_is_constant() {
        let mut program = OutputProgram::new(Mode::UltraHigh);
        assert_eq!(program.next_brightness(), BRIGHTNESS_MAX);
        assert_eq!(program.next_brightness(), BRIGHTNESS_MAX);
    }

    #[test]
    fn blinker_slows_down_under_lockout() {
        let mut led = Led(heapless::Vec::new());
        let mut blinker = IndicatorBlinker::new(0);

        assert!(!blinker.poll(3, false, &mut led));
        assert!(blinker.poll(4, false, &mut led));
        assert!(blinker.is_lit());
        assert!(!blinker.poll(11, true, &mut led));
        assert!(blinker.poll(12, true, &mut led));
        assert_eq!(led.0.as_slice(), &[true, false]);
    }
}
