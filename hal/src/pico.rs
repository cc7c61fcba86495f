//! # RP2040 Repeating Alarms
//!
//! The Pico SDK's repeating timers run from the 1 MHz microsecond timer and
//! are configured as a period, not as a divider/compare pair. The
//! "prescaler" here is the unit the period is counted in, and "ticks" is
//! the number of those units:
//!
//! `frequency = units_per_second / ticks`
//!
//! Microsecond periods are tried first. A millisecond period truncates the
//! same integer frequency just as well, but programs a coarser period, so it
//! is only kept when it is strictly closer.

use static_assertions::const_assert;
use uhwt_core::{Frequency, PlatformAdapter, TimerId, MAX_TIMERS};

use crate::hardware::{Program, TimerHardware};

/// Highest frequency accepted
pub const FREQ_MAX: Frequency = 250_000;

/// Repeating timers available from the default alarm pool
pub const TIMER_COUNT: usize = 14;

const_assert!(TIMER_COUNT <= MAX_TIMERS);

/// Unit a repeating-timer period is counted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmUnit {
    /// 1 ms per tick
    Millis,
    /// 1 µs per tick
    Micros,
}

impl AlarmUnit {
    /// Ticks of this unit in one second
    #[inline]
    pub const fn per_second(self) -> u32 {
        match self {
            AlarmUnit::Millis => 1_000,
            AlarmUnit::Micros => 1_000_000,
        }
    }

    /// Microseconds in one tick of this unit
    #[inline]
    pub const fn micros(self) -> u64 {
        match self {
            AlarmUnit::Millis => 1_000,
            AlarmUnit::Micros => 1,
        }
    }
}

/// RP2040 platform adapter
#[derive(Debug)]
pub struct Rp2040<H> {
    hardware: H,
}

impl<H: TimerHardware> Rp2040<H> {
    /// Create an adapter over the alarm pool
    pub const fn new(hardware: H) -> Self {
        Self { hardware }
    }

    /// Alarm pool access
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Mutable alarm pool access
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    fn slot(timer: TimerId) -> Option<usize> {
        timer.is_within(TIMER_COUNT).then(|| timer.index())
    }
}

impl<H: TimerHardware> PlatformAdapter for Rp2040<H> {
    type Prescaler = AlarmUnit;
    type Ticks = u64;

    const TIMER_COUNT: usize = TIMER_COUNT;
    const FREQ_MAX: Frequency = FREQ_MAX;
    const CALLBACK_SUPPORT: bool = true;
    const UNIFORM_TIMERS: bool = true;

    fn calc_freq(&self, unit: AlarmUnit, ticks: u64) -> Frequency {
        match (unit.per_second() as u64).checked_div(ticks) {
            Some(freq) => freq as Frequency,
            None => 0,
        }
    }

    fn calc_ticks(&self, freq: Frequency, unit: AlarmUnit) -> Option<u64> {
        unit.per_second().checked_div(freq).map(u64::from)
    }

    fn calc_scalar(&self, freq: Frequency, ticks: u64) -> Option<AlarmUnit> {
        let per_second = (freq as u64).checked_mul(ticks)?;
        [AlarmUnit::Millis, AlarmUnit::Micros]
            .into_iter()
            .find(|unit| unit.per_second() as u64 == per_second)
    }

    fn next_prescaler(&self, prev: Option<AlarmUnit>) -> Option<AlarmUnit> {
        match prev {
            None => Some(AlarmUnit::Micros),
            Some(AlarmUnit::Micros) => Some(AlarmUnit::Millis),
            Some(AlarmUnit::Millis) => None,
        }
    }

    fn valid_prescaler(&self, timer: TimerId, _unit: AlarmUnit) -> bool {
        timer.is_within(TIMER_COUNT)
    }

    fn valid_ticks(&self, timer: TimerId, ticks: u64) -> bool {
        // The SDK takes the period as a signed 64-bit delay
        timer.is_within(TIMER_COUNT) && ticks != 0 && ticks <= i64::MAX as u64
    }

    fn equal_freq(&self, _target: Frequency, unit: AlarmUnit, ticks: u64) -> bool {
        ticks != 0 && unit.per_second() as u64 % ticks == 0
    }

    fn unit_ticks(&self) -> Option<u64> {
        Some(1)
    }

    fn init(&mut self, timer: TimerId) -> bool {
        Self::slot(timer).is_some_and(|slot| self.hardware.init(slot))
    }

    fn set_stats(&mut self, timer: TimerId, unit: AlarmUnit, ticks: u64) -> bool {
        let Some(slot) = Self::slot(timer) else {
            return false;
        };
        let Some(period_us) = ticks.checked_mul(unit.micros()) else {
            return false;
        };
        self.hardware.program(slot, Program::Period { period_us })
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
