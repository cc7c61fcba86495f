//! # ATmega328P Timers
//!
//! Three timers clocked from `F_CPU = 16 MHz` in CTC mode:
//!
//! | Timer  | Counter | Prescalers                          |
//! |--------|---------|-------------------------------------|
//! | Timer0 | 8-bit   | 1, 8, 64, 256, 1024                 |
//! | Timer1 | 16-bit  | 1, 8, 64, 256, 1024                 |
//! | Timer2 | 8-bit   | 1, 8, 32, 64, 128, 256, 1024        |
//!
//! `frequency = F_CPU / (prescaler * (compare + 1))`
//!
//! Timer0 drives the Arduino core's `millis()`, so by default it is left
//! alone and logical timers 0 and 1 are Timer1 and Timer2. The
//! `override-arduino-timer` feature hands Timer0 over as logical timer 0.
//!
//! The compare-match ISRs have no per-slot registration; they call
//! `DispatchTable::fire` with the logical timer directly.

use static_assertions::const_assert;
use uhwt_core::{ClaimHint, Frequency, PlatformAdapter, TimerId, MAX_TIMERS};

use crate::hardware::{Program, TimerHardware};

// =============================================================================
// Constants
// =============================================================================

/// CPU clock feeding the prescalers
pub const F_CPU: u32 = 16_000_000;

/// Highest frequency accepted
pub const FREQ_MAX: Frequency = 120_000;

// =============================================================================
// Physical Timers
// =============================================================================

/// ATmega328P timer peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalTimer {
    /// 8-bit, shared with the Arduino core
    Timer0,
    /// 16-bit
    Timer1,
    /// 8-bit with the extra /32 and /128 prescalers
    Timer2,
}

impl PhysicalTimer {
    /// Peripheral number, used as the hardware slot
    #[inline]
    pub const fn number(self) -> usize {
        match self {
            PhysicalTimer::Timer0 => 0,
            PhysicalTimer::Timer1 => 1,
            PhysicalTimer::Timer2 => 2,
        }
    }

    /// Largest value the compare register holds
    #[inline]
    pub const fn max_ticks(self) -> u16 {
        match self {
            PhysicalTimer::Timer0 | PhysicalTimer::Timer2 => u8::MAX as u16,
            PhysicalTimer::Timer1 => u16::MAX,
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "override-arduino-timer")] {
        const MAPPING: &[PhysicalTimer] = &[
            PhysicalTimer::Timer0,
            PhysicalTimer::Timer1,
            PhysicalTimer::Timer2,
        ];
    } else {
        const MAPPING: &[PhysicalTimer] = &[PhysicalTimer::Timer1, PhysicalTimer::Timer2];
    }
}

/// Logical timers exposed
pub const TIMER_COUNT: usize = MAPPING.len();

const_assert!(TIMER_COUNT <= MAX_TIMERS);

/// Physical timer behind a logical one
pub fn physical(timer: TimerId) -> Option<PhysicalTimer> {
    MAPPING.get(timer.index()).copied()
}

/// Logical timer for a physical one, if it is exposed
pub fn logical(physical: PhysicalTimer) -> Option<TimerId> {
    MAPPING
        .iter()
        .position(|candidate| *candidate == physical)
        .map(TimerId::new)
}

// =============================================================================
// Prescaler
// =============================================================================

/// Clock prescaler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvrPrescaler {
    /// clk/1
    Div1,
    /// clk/8
    Div8,
    /// clk/32, Timer2 only
    Div32,
    /// clk/64
    Div64,
    /// clk/128, Timer2 only
    Div128,
    /// clk/256
    Div256,
    /// clk/1024
    Div1024,
}

impl AvrPrescaler {
    /// Division factor
    #[inline]
    pub const fn divisor(self) -> u32 {
        match self {
            AvrPrescaler::Div1 => 1,
            AvrPrescaler::Div8 => 8,
            AvrPrescaler::Div32 => 32,
            AvrPrescaler::Div64 => 64,
            AvrPrescaler::Div128 => 128,
            AvrPrescaler::Div256 => 256,
            AvrPrescaler::Div1024 => 1024,
        }
    }

    /// Prescaler with exactly this division factor
    pub const fn from_divisor(divisor: u32) -> Option<Self> {
        match divisor {
            1 => Some(AvrPrescaler::Div1),
            8 => Some(AvrPrescaler::Div8),
            32 => Some(AvrPrescaler::Div32),
            64 => Some(AvrPrescaler::Div64),
            128 => Some(AvrPrescaler::Div128),
            256 => Some(AvrPrescaler::Div256),
            1024 => Some(AvrPrescaler::Div1024),
            _ => None,
        }
    }

    /// Next smaller prescaler
    const fn smaller(self) -> Option<Self> {
        match self {
            AvrPrescaler::Div1024 => Some(AvrPrescaler::Div256),
            AvrPrescaler::Div256 => Some(AvrPrescaler::Div128),
            AvrPrescaler::Div128 => Some(AvrPrescaler::Div64),
            AvrPrescaler::Div64 => Some(AvrPrescaler::Div32),
            AvrPrescaler::Div32 => Some(AvrPrescaler::Div8),
            AvrPrescaler::Div8 => Some(AvrPrescaler::Div1),
            AvrPrescaler::Div1 => None,
        }
    }

    /// Whether a physical timer has this prescaler
    #[inline]
    pub const fn available_on(self, timer: PhysicalTimer) -> bool {
        match self {
            AvrPrescaler::Div32 | AvrPrescaler::Div128 => matches!(timer, PhysicalTimer::Timer2),
            _ => true,
        }
    }

    /// `CSn2:0` bits selecting this prescaler on a physical timer
    ///
    /// Timer2's encoding differs from Timer0/1 because of its extra steps.
    pub const fn clock_select(self, timer: PhysicalTimer) -> Option<u8> {
        match timer {
            PhysicalTimer::Timer2 => Some(match self {
                AvrPrescaler::Div1 => 0b001,
                AvrPrescaler::Div8 => 0b010,
                AvrPrescaler::Div32 => 0b011,
                AvrPrescaler::Div64 => 0b100,
                AvrPrescaler::Div128 => 0b101,
                AvrPrescaler::Div256 => 0b110,
                AvrPrescaler::Div1024 => 0b111,
            }),
            PhysicalTimer::Timer0 | PhysicalTimer::Timer1 => match self {
                AvrPrescaler::Div1 => Some(0b001),
                AvrPrescaler::Div8 => Some(0b010),
                AvrPrescaler::Div64 => Some(0b011),
                AvrPrescaler::Div256 => Some(0b100),
                AvrPrescaler::Div1024 => Some(0b101),
                AvrPrescaler::Div32 | AvrPrescaler::Div128 => None,
            },
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// ATmega328P platform adapter
#[derive(Debug)]
pub struct Atmega328p<H> {
    hardware: H,
}

impl<H: TimerHardware> Atmega328p<H> {
    /// Create an adapter over the timer registers
    pub const fn new(hardware: H) -> Self {
        Self { hardware }
    }

    /// Register access
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Mutable register access
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    fn slot(timer: TimerId) -> Option<usize> {
        physical(timer).map(PhysicalTimer::number)
    }
}

impl<H: TimerHardware> PlatformAdapter for Atmega328p<H> {
    type Prescaler = AvrPrescaler;
    type Ticks = u16;

    const TIMER_COUNT: usize = TIMER_COUNT;
    const FREQ_MAX: Frequency = FREQ_MAX;
    const CALLBACK_SUPPORT: bool = false;
    const UNIFORM_TIMERS: bool = false;

    fn calc_freq(&self, prescaler: AvrPrescaler, ticks: u16) -> Frequency {
        F_CPU / (prescaler.divisor() * (ticks as u32 + 1))
    }

    fn calc_ticks(&self, freq: Frequency, prescaler: AvrPrescaler) -> Option<u16> {
        let divisor = prescaler.divisor().checked_mul(freq)?;
        let ticks = F_CPU.checked_div(divisor)?.checked_sub(1)?;
        u16::try_from(ticks).ok()
    }

    fn calc_scalar(&self, freq: Frequency, ticks: u16) -> Option<AvrPrescaler> {
        let divisor = freq.checked_mul(ticks as u32 + 1)?;
        AvrPrescaler::from_divisor(F_CPU.checked_div(divisor)?)
    }

    fn next_prescaler(&self, prev: Option<AvrPrescaler>) -> Option<AvrPrescaler> {
        match prev {
            None => Some(AvrPrescaler::Div1024),
            Some(prescaler) => prescaler.smaller(),
        }
    }

    fn valid_prescaler(&self, timer: TimerId, prescaler: AvrPrescaler) -> bool {
        physical(timer).is_some_and(|physical| prescaler.available_on(physical))
    }

    fn valid_ticks(&self, timer: TimerId, ticks: u16) -> bool {
        physical(timer).is_some_and(|physical| ticks != 0 && ticks < physical.max_ticks())
    }

    fn equal_freq(&self, _target: Frequency, prescaler: AvrPrescaler, ticks: u16) -> bool {
        F_CPU % (prescaler.divisor() * (ticks as u32 + 1)) == 0
    }

    fn unit_ticks(&self) -> Option<u16> {
        Some(1)
    }

    fn select_for_hint(&self, role: ClaimHint) -> Option<TimerId> {
        if role.contains(ClaimHint::SLOWEST) {
            logical(PhysicalTimer::Timer1)
        } else if role.contains(ClaimHint::MOST_ACCURATE) {
            logical(PhysicalTimer::Timer2)
        } else {
            None
        }
    }

    fn init(&mut self, timer: TimerId) -> bool {
        Self::slot(timer).is_some_and(|slot| self.hardware.init(slot))
    }

    fn set_stats(&mut self, timer: TimerId, prescaler: AvrPrescaler, ticks: u16) -> bool {
        let Some(physical) = physical(timer) else {
            return false;
        };
        let Some(clock_select) = prescaler.clock_select(physical) else {
            log::warn!("uhwt: {:?} has no {:?}", physical, prescaler);
            return false;
        };

        let program = Program::Compare {
            clock_select,
            compare: ticks,
        };
        self.hardware.program(physical.number(), program)
    }

    fn start(&mut self, timer: TimerId) -> bool {
        Self::slot(timer).is_some_and(|slot| self.hardware.start(slot))
    }

    fn stop(&mut self, timer: TimerId) -> bool {
        Self::slot(timer).is_some_and(|slot| self.hardware.stop(slot))
    }

    fn deconstruct(&mut self, timer: TimerId) -> bool {
        Self::slot(timer).is_some_and(|slot| self.hardware.deconstruct(slot))
    }
}
