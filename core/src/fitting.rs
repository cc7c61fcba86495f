//! # Frequency Fitting Engine
//!
//! Maps a requested frequency onto a `(prescaler, ticks)` pair a timer can
//! actually count, and reports whether the result is exact.
//!
//! ## Algorithm
//!
//! 1. Fast path: if the platform has a unit tick value, try
//!    `prescaler = calc_scalar(target, 1)`. A legal, exact pair is returned
//!    immediately.
//! 2. Walk the platform's prescaler enumeration. Skip prescalers the timer
//!    does not support and tick counts it cannot hold.
//! 3. The first exact pair wins outright.
//! 4. Otherwise keep the pair with the smallest `|target - achieved|`. Only
//!    a strictly smaller delta replaces the current best, so the
//!    enumeration order settles ties.
//! 5. No legal candidate at all means no fit.

use crate::error::{TimerError, TimerResult};
use crate::platform::{PlatformAdapter, Prescalers};
use crate::state::TimerStates;
use crate::timer::{Frequency, TimerId};

/// Result of a frequency search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit<S, T> {
    /// Selected prescaler
    pub prescaler: S,
    /// Selected tick count
    pub ticks: T,
    /// Frequency the pair produces
    pub frequency: Frequency,
    /// Whether `frequency` is the requested one with no rounding slop
    pub exact: bool,
}

/// Fit type for a given platform
pub type PlatformFit<P> = Fit<<P as PlatformAdapter>::Prescaler, <P as PlatformAdapter>::Ticks>;

/// Unsigned distance between two frequencies
#[inline]
pub fn freq_delta(a: Frequency, b: Frequency) -> Frequency {
    a.abs_diff(b)
}

/// Check that a frequency is non-zero and within the platform ceiling
#[inline]
pub fn valid_frequency<P: PlatformAdapter>(freq: Frequency) -> bool {
    freq != 0 && freq <= P::FREQ_MAX
}

/// Whether a pair reproduces `target` exactly
pub fn is_exact<P: PlatformAdapter>(
    platform: &P,
    target: Frequency,
    prescaler: P::Prescaler,
    ticks: P::Ticks,
) -> bool {
    let achieved = platform.calc_freq(prescaler, ticks);
    if !valid_frequency::<P>(target) || !valid_frequency::<P>(achieved) {
        return false;
    }
    achieved == target && platform.equal_freq(target, prescaler, ticks)
}

/// Whether a pair is legal on a timer
#[inline]
pub fn is_legal<P: PlatformAdapter>(
    platform: &P,
    timer: TimerId,
    prescaler: P::Prescaler,
    ticks: P::Ticks,
) -> bool {
    platform.valid_prescaler(timer, prescaler) && platform.valid_ticks(timer, ticks)
}

fn unit_tick_fit<P: PlatformAdapter>(
    platform: &P,
    timer: TimerId,
    target: Frequency,
) -> Option<PlatformFit<P>> {
    let ticks = platform.unit_ticks()?;
    let prescaler = platform.calc_scalar(target, ticks)?;

    if is_legal(platform, timer, prescaler, ticks) && is_exact(platform, target, prescaler, ticks) {
        return Some(Fit {
            prescaler,
            ticks,
            frequency: target,
            exact: true,
        });
    }
    None
}

/// Find the closest pair for one timer
///
/// Returns `None` when no prescaler yields a legal tick count.
pub fn fit<P: PlatformAdapter>(
    platform: &P,
    timer: TimerId,
    target: Frequency,
) -> Option<PlatformFit<P>> {
    if target == 0 {
        return None;
    }

    if let Some(found) = unit_tick_fit(platform, timer, target) {
        log::trace!("uhwt: {} fits {} Hz on unit ticks", timer, target);
        return Some(found);
    }

    let mut best: Option<PlatformFit<P>> = None;

    for prescaler in Prescalers::new(platform) {
        if !platform.valid_prescaler(timer, prescaler) {
            continue;
        }

        let ticks = match platform.calc_ticks(target, prescaler) {
            Some(ticks) if platform.valid_ticks(timer, ticks) => ticks,
            _ => continue,
        };

        let achieved = platform.calc_freq(prescaler, ticks);
        if achieved == 0 {
            continue;
        }

        if is_exact(platform, target, prescaler, ticks) {
            return Some(Fit {
                prescaler,
                ticks,
                frequency: achieved,
                exact: true,
            });
        }

        let closer = match &best {
            Some(current) => freq_delta(target, achieved) < freq_delta(target, current.frequency),
            None => true,
        };
        if closer {
            best = Some(Fit {
                prescaler,
                ticks,
                frequency: achieved,
                exact: false,
            });
        }
    }

    if let Some(found) = &best {
        log::trace!(
            "uhwt: {} approximates {} Hz with {} Hz ({:?}, {:?})",
            timer,
            target,
            found.frequency,
            found.prescaler,
            found.ticks
        );
    }

    best
}

/// Find the closest pair across every free timer
///
/// Free means neither claimed nor started. When the platform's timers are
/// uniform only the lowest free timer is searched. An exact fit ends the
/// search; ties go to the lowest index.
pub fn fit_best<P: PlatformAdapter>(
    platform: &P,
    states: &TimerStates,
    target: Frequency,
) -> TimerResult<(TimerId, PlatformFit<P>)> {
    let mut any_free = false;
    let mut best: Option<(TimerId, PlatformFit<P>)> = None;

    for timer in states.timers().filter(|timer| states.is_free(*timer)) {
        any_free = true;

        if let Some(found) = fit(platform, timer, target) {
            if found.exact {
                return Ok((timer, found));
            }

            let closer = match &best {
                Some((_, current)) => {
                    freq_delta(target, found.frequency) < freq_delta(target, current.frequency)
                },
                None => true,
            };
            if closer {
                best = Some((timer, found));
            }
        }

        if P::UNIFORM_TIMERS {
            break;
        }
    }

    match best {
        Some(found) => Ok(found),
        None if any_free => Err(TimerError::NoFeasibleFit),
        None => Err(TimerError::NoTimerAvailable),
    }
}
