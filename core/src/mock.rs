//! Scripted platform used by the core's unit tests.
//!
//! Four timers clocked at 1 MHz with power-of-two prescalers 8, 4, 2 and 1.
//! Timer 3 has an 8-bit counter, the others 16-bit. Every side effect is
//! appended to a call log and any of them can be told to fail.

use crate::dispatch::Binding;
use crate::platform::PlatformAdapter;
use crate::timer::{ClaimHint, Frequency, Priority, TimerId};

pub const CLOCK: Frequency = 1_000_000;

/// The 8-bit timer
pub const NARROW_TIMER: TimerId = TimerId::new(3);

/// Alias returned for [`ClaimHint::SLOWEST`]
pub const SLOWEST_TIMER: TimerId = TimerId::new(2);

/// Alias returned for [`ClaimHint::MOST_ACCURATE`]
pub const ACCURATE_TIMER: TimerId = TimerId::new(3);

bitflags::bitflags! {
    /// Side effects scripted to fail
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Failures: u8 {
        const INIT = 1 << 0;
        const PRIORITY = 1 << 1;
        const CALLBACK = 1 << 2;
        const STATS = 1 << 3;
        const START = 1 << 4;
        const STOP = 1 << 5;
        const DECONSTRUCT = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Init(TimerId),
    Priority(TimerId, Priority),
    Callback(TimerId),
    Stats(TimerId, u32, u32),
    Start(TimerId),
    Stop(TimerId),
    Deconstruct(TimerId),
}

#[derive(Debug)]
pub struct MockPlatform {
    pub calls: Vec<Call>,
    pub fail: Failures,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            fail: Failures::empty(),
        }
    }

    fn record(&mut self, call: Call, failure: Failures) -> bool {
        self.calls.push(call);
        !self.fail.contains(failure)
    }

    fn max_ticks(timer: TimerId) -> u32 {
        if timer == NARROW_TIMER {
            u8::MAX as u32
        } else {
            u16::MAX as u32
        }
    }
}

impl PlatformAdapter for MockPlatform {
    type Prescaler = u32;
    type Ticks = u32;

    const TIMER_COUNT: usize = 4;
    const FREQ_MAX: Frequency = 250_000;
    const CALLBACK_SUPPORT: bool = true;
    const PRIORITY_SUPPORT: bool = true;
    const UNIFORM_TIMERS: bool = false;

    fn calc_freq(&self, prescaler: u32, ticks: u32) -> Frequency {
        match prescaler.checked_mul(ticks) {
            Some(0) | None => 0,
            Some(divisor) => CLOCK / divisor,
        }
    }

    fn calc_ticks(&self, freq: Frequency, prescaler: u32) -> Option<u32> {
        let divisor = freq.checked_mul(prescaler)?;
        match CLOCK.checked_div(divisor)? {
            0 => None,
            ticks => Some(ticks),
        }
    }

    fn calc_scalar(&self, freq: Frequency, ticks: u32) -> Option<u32> {
        let divisor = freq.checked_mul(ticks)?;
        match CLOCK.checked_div(divisor)? {
            0 => None,
            prescaler => Some(prescaler),
        }
    }

    fn next_prescaler(&self, prev: Option<u32>) -> Option<u32> {
        match prev {
            None => Some(8),
            Some(1) => None,
            Some(prescaler) => Some(prescaler / 2),
        }
    }

    fn valid_prescaler(&self, _timer: TimerId, prescaler: u32) -> bool {
        matches!(prescaler, 1 | 2 | 4 | 8)
    }

    fn valid_ticks(&self, timer: TimerId, ticks: u32) -> bool {
        ticks != 0 && ticks <= Self::max_ticks(timer)
    }

    fn equal_freq(&self, _target: Frequency, prescaler: u32, ticks: u32) -> bool {
        prescaler
            .checked_mul(ticks)
            .is_some_and(|divisor| divisor != 0 && CLOCK % divisor == 0)
    }

    fn unit_ticks(&self) -> Option<u32> {
        Some(1)
    }

    fn select_for_hint(&self, role: ClaimHint) -> Option<TimerId> {
        if role == ClaimHint::SLOWEST {
            Some(SLOWEST_TIMER)
        } else if role == ClaimHint::MOST_ACCURATE {
            Some(ACCURATE_TIMER)
        } else {
            None
        }
    }

    fn set_priority(&mut self, timer: TimerId, priority: Priority) -> bool {
        self.record(Call::Priority(timer, priority), Failures::PRIORITY)
    }

    fn set_callback(&mut self, timer: TimerId, _binding: Binding) -> bool {
        self.record(Call::Callback(timer), Failures::CALLBACK)
    }

    fn init(&mut self, timer: TimerId) -> bool {
        self.record(Call::Init(timer), Failures::INIT)
    }

    fn set_stats(&mut self, timer: TimerId, prescaler: u32, ticks: u32) -> bool {
        self.record(Call::Stats(timer, prescaler, ticks), Failures::STATS)
    }

    fn start(&mut self, timer: TimerId) -> bool {
        self.record(Call::Start(timer), Failures::START)
    }

    fn stop(&mut self, timer: TimerId) -> bool {
        self.record(Call::Stop(timer), Failures::STOP)
    }

    fn deconstruct(&mut self, timer: TimerId) -> bool {
        self.record(Call::Deconstruct(timer), Failures::DECONSTRUCT)
    }
}
