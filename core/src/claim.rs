//! # Resource Claim Manager
//!
//! Treats each hardware timer as an exclusively ownable resource. A claim is
//! a logical reservation only; it neither requires nor implies that the
//! timer is running.
//!
//! Selection is a pure function of the state snapshot and the hints, so the
//! same snapshot always resolves to the same timer.

use crate::error::{TimerError, TimerResult};
use crate::platform::PlatformAdapter;
use crate::state::TimerStates;
use crate::timer::{ClaimHint, TimerId};

/// Lowest-indexed timer that is neither claimed nor started
pub fn next_free(states: &TimerStates) -> Option<TimerId> {
    states.timers().find(|timer| states.is_free(*timer))
}

/// Resolve the timer an automatic claim would take
///
/// Hint roles are consulted in a fixed order; a role's alias is only used
/// when it is free. Without a usable alias the lowest free timer is chosen.
pub fn select<P: PlatformAdapter>(
    platform: &P,
    states: &TimerStates,
    hint: ClaimHint,
) -> Option<TimerId> {
    for role in ClaimHint::ROLES {
        if !hint.contains(role) {
            continue;
        }
        if let Some(alias) = platform.select_for_hint(role) {
            if states.is_free(alias) {
                return Some(alias);
            }
        }
    }

    next_free(states)
}

/// Claim a specific timer, or pick one when `timer` is out of range
pub fn claim<P: PlatformAdapter>(
    platform: &P,
    states: &mut TimerStates,
    timer: TimerId,
    hint: ClaimHint,
) -> TimerResult<TimerId> {
    let timer = if states.is_valid(timer) {
        if states.claimed(timer) {
            return Err(TimerError::AlreadyClaimed);
        }
        if states.started(timer) {
            return Err(TimerError::AlreadyStarted);
        }
        timer
    } else {
        select(platform, states, hint).ok_or(TimerError::NoTimerAvailable)?
    };

    states.set_claimed(timer);
    log::debug!("uhwt: claimed {}", timer);
    Ok(timer)
}

/// Release a claim
pub fn unclaim(states: &mut TimerStates, timer: TimerId) -> TimerResult<()> {
    if !states.is_valid(timer) {
        return Err(TimerError::InvalidTimer);
    }
    if !states.set_unclaimed(timer) {
        return Err(TimerError::NotClaimed);
    }

    log::debug!("uhwt: released {}", timer);
    Ok(())
}
