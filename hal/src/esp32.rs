//! # ESP32 General-Purpose Timers
//!
//! Four 64-bit up-counters (two groups of two) clocked from the 80 MHz APB
//! clock through a 16-bit divider:
//!
//! `frequency = APB_CLK / (divider * alarm)`
//!
//! Every timer is identical, so best-fit selection only searches the first
//! free one. Two SDK generations are supported:
//!
//! - **Legacy driver** (IDF v4): the divider and alarm are programmed as-is.
//! - **gptimer** (IDF v5): the driver takes a counter resolution instead of
//!   a divider and refuses resolutions below [`GPTIMER_FREQ_MIN`], so the
//!   resolution is doubled (together with the alarm count) until it clears
//!   that floor.

use static_assertions::const_assert;
use uhwt_core::{Frequency, PlatformAdapter, Priority, TimerId, MAX_TIMERS};

use crate::hardware::{Program, TimerHardware};

/// APB clock feeding the dividers
pub const APB_CLK: u32 = 80_000_000;

/// Highest frequency accepted
pub const FREQ_MAX: Frequency = 200_000;

/// Number of timers
pub const TIMER_COUNT: usize = 4;

/// Lowest counter resolution the gptimer driver accepts
pub const GPTIMER_FREQ_MIN: Frequency = 1221;

/// Smallest divider the hardware accepts
pub const DIVIDER_MIN: u16 = 2;

/// First divider tried by the search
const DIVIDER_START: u16 = 1 << 15;

/// Highest interrupt level reachable from C callbacks
const LEVEL_MAX: u8 = 3;

const_assert!(TIMER_COUNT <= MAX_TIMERS);

/// SDK generation driving the timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdfApi {
    /// `driver/timer.h`
    Legacy,
    /// `driver/gptimer.h`
    Gptimer,
}

impl IdfApi {
    /// Generation selected by the `esp-idf-v5` feature
    pub const DEFAULT: IdfApi = if cfg!(feature = "esp-idf-v5") {
        IdfApi::Gptimer
    } else {
        IdfApi::Legacy
    };
}

/// Interrupt level for a 0-255 priority
#[inline]
pub const fn interrupt_level(priority: Priority) -> u8 {
    priority / (u8::MAX / LEVEL_MAX)
}

/// gptimer resolution and alarm count producing `freq`
///
/// `None` for a zero frequency.
pub fn gptimer_alarm(freq: Frequency) -> Option<(u32, u64)> {
    if freq == 0 {
        return None;
    }

    let mut resolution = freq;
    let mut count: u64 = 1;
    while resolution < GPTIMER_FREQ_MIN {
        resolution *= 2;
        count *= 2;
    }
    Some((resolution, count))
}

/// ESP32 platform adapter
#[derive(Debug)]
pub struct Esp32<H> {
    hardware: H,
    api: IdfApi,
}

impl<H: TimerHardware> Esp32<H> {
    /// Create an adapter for the SDK generation chosen at build time
    pub const fn new(hardware: H) -> Self {
        Self::with_api(hardware, IdfApi::DEFAULT)
    }

    /// Create an adapter for a specific SDK generation
    pub const fn with_api(hardware: H, api: IdfApi) -> Self {
        Self { hardware, api }
    }

    /// SDK generation in use
    pub fn api(&self) -> IdfApi {
        self.api
    }

    /// Driver access
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Mutable driver access
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    fn slot(timer: TimerId) -> Option<usize> {
        timer.is_within(TIMER_COUNT).then(|| timer.index())
    }

    fn program_for(&self, divider: u16, alarm: u64) -> Option<Program> {
        match self.api {
            IdfApi::Legacy => Some(Program::Divider { divider, alarm }),
            IdfApi::Gptimer => {
                let (resolution_hz, alarm_count) = gptimer_alarm(self.calc_freq(divider, alarm))?;
                Some(Program::Resolution {
                    resolution_hz,
                    alarm_count,
                })
            },
        }
    }
}

impl<H: TimerHardware> PlatformAdapter for Esp32<H> {
    type Prescaler = u16;
    type Ticks = u64;

    const TIMER_COUNT: usize = TIMER_COUNT;
    const FREQ_MAX: Frequency = FREQ_MAX;
    const CALLBACK_SUPPORT: bool = true;
    const PRIORITY_SUPPORT: bool = true;
    const UNIFORM_TIMERS: bool = true;

    fn calc_freq(&self, prescaler: u16, ticks: u64) -> Frequency {
        match (prescaler as u64).checked_mul(ticks) {
            Some(0) | None => 0,
            Some(divisor) => (APB_CLK as u64 / divisor) as Frequency,
        }
    }

    fn calc_ticks(&self, freq: Frequency, prescaler: u16) -> Option<u64> {
        let divisor = freq as u64 * prescaler as u64;
        (APB_CLK as u64).checked_div(divisor)
    }

    fn calc_scalar(&self, freq: Frequency, ticks: u64) -> Option<u16> {
        let divisor = (freq as u64).checked_mul(ticks)?;
        u16::try_from((APB_CLK as u64).checked_div(divisor)?).ok()
    }

    fn next_prescaler(&self, prev: Option<u16>) -> Option<u16> {
        match prev {
            None => Some(DIVIDER_START),
            Some(prescaler) if prescaler > DIVIDER_MIN => Some(prescaler / 2),
            Some(_) => None,
        }
    }

    fn valid_prescaler(&self, timer: TimerId, prescaler: u16) -> bool {
        timer.is_within(TIMER_COUNT) && prescaler >= DIVIDER_MIN
    }

    fn valid_ticks(&self, timer: TimerId, ticks: u64) -> bool {
        timer.is_within(TIMER_COUNT) && ticks != 0
    }

    fn equal_freq(&self, _target: Frequency, prescaler: u16, ticks: u64) -> bool {
        (prescaler as u64)
            .checked_mul(ticks)
            .is_some_and(|divisor| divisor != 0 && APB_CLK as u64 % divisor == 0)
    }

    fn unit_ticks(&self) -> Option<u64> {
        Some(1)
    }

    fn set_priority(&mut self, timer: TimerId, priority: Priority) -> bool {
        let Some(slot) = Self::slot(timer) else {
            return false;
        };

        let level = interrupt_level(priority);
        let flags = match self.api {
            IdfApi::Legacy => 1 << level,
            IdfApi::Gptimer => level,
        };
        log::trace!("uhwt: {} priority {} -> level {}", timer, priority, level);
        self.hardware.set_priority(slot, flags)
    }

    fn init(&mut self, timer: TimerId) -> bool {
        Self::slot(timer).is_some_and(|slot| self.hardware.init(slot))
    }

    fn set_stats(&mut self, timer: TimerId, prescaler: u16, ticks: u64) -> bool {
        let Some(slot) = Self::slot(timer) else {
            return false;
        };
        match self.program_for(prescaler, ticks) {
            Some(program) => self.hardware.program(slot, program),
            None => false,
        }
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
