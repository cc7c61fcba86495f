//! # Timer State Store
//!
//! Fixed-width bitsets recording which timers are claimed, initialized and
//! started. This is pure data: nothing here touches hardware, and no code
//! outside this module manipulates the bits directly.
//!
//! Every predicate answers `false` for an invalid timer and every mutator is
//! a no-op on one.

use core::fmt;

use static_assertions::const_assert;

use crate::timer::{TimerId, MAX_TIMERS};

const_assert!(MAX_TIMERS <= u16::BITS as usize);

// =============================================================================
// Timer Set
// =============================================================================

/// A set of timers, one bit per slot
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerSet(u16);

impl TimerSet {
    /// Empty set
    pub const EMPTY: TimerSet = TimerSet(0);

    #[inline]
    const fn mask(timer: TimerId) -> u16 {
        if timer.index() < MAX_TIMERS {
            1 << timer.index()
        } else {
            0
        }
    }

    /// Check membership
    #[inline]
    pub const fn contains(self, timer: TimerId) -> bool {
        self.0 & Self::mask(timer) != 0
    }

    /// Add a timer; returns `true` if the set changed
    #[inline]
    pub fn insert(&mut self, timer: TimerId) -> bool {
        let before = self.0;
        self.0 |= Self::mask(timer);
        before != self.0
    }

    /// Remove a timer; returns `true` if the set changed
    #[inline]
    pub fn remove(&mut self, timer: TimerId) -> bool {
        let before = self.0;
        self.0 &= !Self::mask(timer);
        before != self.0
    }

    /// Raw bits
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Number of members
    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Check if empty
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TimerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerSet({:#06x})", self.0)
    }
}

// =============================================================================
// Timer States
// =============================================================================

/// Per-timer `claimed`, `initialized` and `started` flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerStates {
    /// Number of timers on this platform
    count: usize,
    /// Logically reserved timers
    claimed: TimerSet,
    /// Timers whose hardware has been initialized
    initialized: TimerSet,
    /// Timers currently running
    started: TimerSet,
}

impl TimerStates {
    /// Create a store for `count` timers, all flags cleared
    ///
    /// Counts above [`MAX_TIMERS`] are clamped.
    pub const fn new(count: usize) -> Self {
        Self {
            count: if count > MAX_TIMERS { MAX_TIMERS } else { count },
            claimed: TimerSet::EMPTY,
            initialized: TimerSet::EMPTY,
            started: TimerSet::EMPTY,
        }
    }

    /// Number of timers tracked
    #[inline]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Check whether `timer` names a tracked timer
    #[inline]
    pub const fn is_valid(&self, timer: TimerId) -> bool {
        timer.is_within(self.count)
    }

    /// Iterate over every valid timer in ascending order
    pub fn timers(&self) -> impl Iterator<Item = TimerId> {
        (0..self.count).map(TimerId::new)
    }

    /// Check if a timer is claimed
    #[inline]
    pub const fn claimed(&self, timer: TimerId) -> bool {
        self.is_valid(timer) && self.claimed.contains(timer)
    }

    /// Check if a timer is initialized
    #[inline]
    pub const fn initialized(&self, timer: TimerId) -> bool {
        self.is_valid(timer) && self.initialized.contains(timer)
    }

    /// Check if a timer is started
    #[inline]
    pub const fn started(&self, timer: TimerId) -> bool {
        self.is_valid(timer) && self.started.contains(timer)
    }

    /// Check if a timer is neither claimed nor started
    #[inline]
    pub const fn is_free(&self, timer: TimerId) -> bool {
        self.is_valid(timer) && !self.claimed.contains(timer) && !self.started.contains(timer)
    }

    /// Claimed set
    #[inline]
    pub const fn claimed_set(&self) -> TimerSet {
        self.claimed
    }

    /// Started set
    #[inline]
    pub const fn started_set(&self) -> TimerSet {
        self.started
    }

    /// Mark a timer claimed
    pub fn set_claimed(&mut self, timer: TimerId) -> bool {
        self.is_valid(timer) && self.claimed.insert(timer)
    }

    /// Mark a timer unclaimed
    pub fn set_unclaimed(&mut self, timer: TimerId) -> bool {
        self.is_valid(timer) && self.claimed.remove(timer)
    }

    /// Mark a timer initialized
    pub fn set_initialized(&mut self, timer: TimerId) -> bool {
        self.is_valid(timer) && self.initialized.insert(timer)
    }

    /// Mark a timer deconstructed
    pub fn set_deconstructed(&mut self, timer: TimerId) -> bool {
        self.is_valid(timer) && self.initialized.remove(timer)
    }

    /// Mark a timer started
    pub fn set_started(&mut self, timer: TimerId) -> bool {
        self.is_valid(timer) && self.started.insert(timer)
    }

    /// Mark a timer stopped
    pub fn set_stopped(&mut self, timer: TimerId) -> bool {
        self.is_valid(timer) && self.started.remove(timer)
    }
}
