//! # Platform Adapter
//!
//! The narrow contract between the hardware-agnostic core and one target's
//! timer peripherals.
//!
//! An adapter supplies two kinds of operations:
//!
//! - **Numeric primitives**: frequency/tick/prescaler conversions and the
//!   legality predicates the fitting engine searches with. These are pure.
//! - **Side effects**: init, program, start, stop and deconstruct one
//!   physical timer. Register writes that can race with a live interrupt
//!   must be done inside a critical section by the adapter itself.
//!
//! Optional capabilities (hint aliases, execution priority, callback
//! registration) have default bodies that a platform overrides.
//!
//! ## Frequency law
//!
//! `frequency = clock / (prescaler * ticks')` where `ticks'` is the tick
//! count with the platform's offset applied. [`calc_freq`] and
//! [`calc_ticks`] must round consistently so that a legal pair survives
//! `calc_ticks(calc_freq(p, t), p) == t` within the platform's rounding.
//!
//! [`calc_freq`]: PlatformAdapter::calc_freq
//! [`calc_ticks`]: PlatformAdapter::calc_ticks

use core::fmt::Debug;

use crate::dispatch::Binding;
use crate::timer::{ClaimHint, Frequency, Priority, TimerId};

/// Hardware-specific timer primitives
pub trait PlatformAdapter {
    /// Clock divider type
    type Prescaler: Copy + PartialEq + Debug;
    /// Counter reload / period type
    type Ticks: Copy + PartialEq + Debug;

    /// Number of timers exposed (at most [`MAX_TIMERS`](crate::MAX_TIMERS))
    const TIMER_COUNT: usize;
    /// Highest frequency a caller may request; 0 means no timer support
    const FREQ_MAX: Frequency;
    /// Whether interrupts invoke bound callbacks natively
    ///
    /// Without it the bound function must be driven by polling.
    const CALLBACK_SUPPORT: bool;
    /// Whether execution priority is honoured
    const PRIORITY_SUPPORT: bool = false;
    /// Whether every timer shares the same prescaler/tick legality
    ///
    /// When `false`, best-fit selection searches each timer separately.
    const UNIFORM_TIMERS: bool;

    // -------------------------------------------------------------------------
    // Numeric primitives
    // -------------------------------------------------------------------------

    /// Frequency produced by a prescaler/tick pair, 0 if degenerate
    fn calc_freq(&self, prescaler: Self::Prescaler, ticks: Self::Ticks) -> Frequency;

    /// Tick count reaching `freq` with `prescaler`, `None` if unrepresentable
    fn calc_ticks(&self, freq: Frequency, prescaler: Self::Prescaler) -> Option<Self::Ticks>;

    /// Prescaler reaching `freq` with `ticks`, `None` if outside the domain
    fn calc_scalar(&self, freq: Frequency, ticks: Self::Ticks) -> Option<Self::Prescaler>;

    /// Successor in the prescaler enumeration
    ///
    /// `None` starts the enumeration; returning `None` ends it. The order is
    /// the only tie-break of the fitting search and must be fixed.
    fn next_prescaler(&self, prev: Option<Self::Prescaler>) -> Option<Self::Prescaler>;

    /// Whether `timer` supports `prescaler`
    fn valid_prescaler(&self, timer: TimerId, prescaler: Self::Prescaler) -> bool;

    /// Whether `timer` can count `ticks`
    fn valid_ticks(&self, timer: TimerId, ticks: Self::Ticks) -> bool;

    /// Whether a pair reproduces `target` with no rounding slop
    ///
    /// Only consulted once `calc_freq` already equals `target`.
    fn equal_freq(&self, _target: Frequency, _prescaler: Self::Prescaler, _ticks: Self::Ticks) -> bool {
        true
    }

    /// The single ticks value used by the `ticks = 1` fast path
    fn unit_ticks(&self) -> Option<Self::Ticks> {
        None
    }

    // -------------------------------------------------------------------------
    // Optional capabilities
    // -------------------------------------------------------------------------

    /// Timer dedicated to a hint role
    ///
    /// Called with exactly one role flag set. The core checks that the
    /// returned timer is free before using it.
    fn select_for_hint(&self, _role: ClaimHint) -> Option<TimerId> {
        None
    }

    /// Apply an execution priority
    fn set_priority(&mut self, _timer: TimerId, _priority: Priority) -> bool {
        true
    }

    /// Register a callback with the platform's interrupt glue
    fn set_callback(&mut self, _timer: TimerId, _binding: Binding) -> bool {
        true
    }

    // -------------------------------------------------------------------------
    // Side effects
    // -------------------------------------------------------------------------

    /// Bring a timer's hardware into a known idle state
    fn init(&mut self, timer: TimerId) -> bool;

    /// Program a prescaler/tick pair into an idle timer
    fn set_stats(&mut self, timer: TimerId, prescaler: Self::Prescaler, ticks: Self::Ticks) -> bool;

    /// Enable the timer's interrupt
    fn start(&mut self, timer: TimerId) -> bool;

    /// Disable the timer's interrupt
    ///
    /// Once this returns no further callback may fire for `timer`.
    fn stop(&mut self, timer: TimerId) -> bool;

    /// Release a timer's hardware
    fn deconstruct(&mut self, _timer: TimerId) -> bool {
        true
    }
}

/// Iterator over a platform's prescaler enumeration
#[derive(Debug)]
pub struct Prescalers<'a, P: PlatformAdapter> {
    /// Platform providing the order
    platform: &'a P,
    /// Last value produced
    current: Option<P::Prescaler>,
    /// Enumeration finished
    done: bool,
}

impl<'a, P: PlatformAdapter> Prescalers<'a, P> {
    /// Start enumerating from the sentinel
    pub fn new(platform: &'a P) -> Self {
        Self {
            platform,
            current: None,
            done: false,
        }
    }
}

impl<P: PlatformAdapter> Iterator for Prescalers<'_, P> {
    type Item = P::Prescaler;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.current = self.platform.next_prescaler(self.current);
        if self.current.is_none() {
            self.done = true;
        }
        self.current
    }
}
