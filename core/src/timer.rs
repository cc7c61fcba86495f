//! # Timer Identity
//!
//! Basic vocabulary shared by every component: timer indices, frequencies,
//! execution priorities and claim hints.
//!
//! A timer is identified by a small index in `[0, N)` where `N` is the
//! timer count of the selected platform. [`TimerId::INVALID`] is a sentinel
//! outside every platform's range; operations treat it exactly like any
//! other out-of-range index.

use core::fmt;

use static_assertions::const_assert;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of hardware timers any platform may expose
pub const MAX_TIMERS: usize = 16;

/// Default execution priority passed to platforms that support priorities
pub const PRIORITY_DEFAULT: Priority = 0;

const_assert!(MAX_TIMERS < u8::MAX as usize);

/// Timer frequency in Hertz
pub type Frequency = u32;

/// Interrupt execution priority (0 lowest, 255 highest)
pub type Priority = u8;

// =============================================================================
// Timer Identity
// =============================================================================

/// Index of a hardware timer
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TimerId(u8);

impl TimerId {
    /// Sentinel that never names a timer
    pub const INVALID: TimerId = TimerId(u8::MAX);

    /// Create a timer id from an index
    ///
    /// Indices at or above [`MAX_TIMERS`] collapse to [`TimerId::INVALID`].
    #[inline]
    pub const fn new(index: usize) -> Self {
        if index < MAX_TIMERS {
            TimerId(index as u8)
        } else {
            Self::INVALID
        }
    }

    /// Get the raw index
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check whether this is the invalid sentinel
    #[inline]
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID.0
    }

    /// Check whether this id names one of `count` timers
    #[inline]
    pub const fn is_within(self, count: usize) -> bool {
        !self.is_invalid() && self.index() < count
    }
}

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "TimerId(INVALID)")
        } else {
            write!(f, "TimerId({})", self.0)
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "TIMER_INVALID")
        } else {
            write!(f, "TIMER{}", self.0)
        }
    }
}

impl From<usize> for TimerId {
    fn from(index: usize) -> Self {
        TimerId::new(index)
    }
}

// =============================================================================
// Claim Hints
// =============================================================================

bitflags::bitflags! {
    /// Preferences used to pick a timer when the caller does not name one
    ///
    /// Hints only bias *which* timer is selected. A hint the platform has no
    /// dedicated timer for is ignored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClaimHint: u8 {
        /// Prefer the timer with the widest counter (longest periods)
        const SLOWEST = 1 << 0;
        /// Prefer the timer with the finest prescaler choice
        const MOST_ACCURATE = 1 << 1;
    }
}

impl ClaimHint {
    /// No preference: plain ascending scan
    pub const NONE: ClaimHint = ClaimHint::empty();

    /// Roles in the order they are consulted
    pub(crate) const ROLES: [ClaimHint; 2] = [ClaimHint::SLOWEST, ClaimHint::MOST_ACCURATE];
}
