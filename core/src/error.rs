//! # Timer Errors
//!
//! Every fallible operation returns one of these values. Nothing in this
//! crate panics on a bad request; a failed operation simply did not happen.

use core::fmt;

/// Result type for timer operations
pub type TimerResult<T> = Result<T, TimerError>;

/// Timer error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Timer index out of range or the invalid sentinel
    InvalidTimer,
    /// Frequency is zero or above the platform ceiling
    InvalidFrequency,
    /// No timer satisfies the selection request
    NoTimerAvailable,
    /// No legal prescaler/tick combination exists for the timer(s) considered
    NoFeasibleFit,
    /// Timer is already running
    AlreadyStarted,
    /// Timer is already claimed
    AlreadyClaimed,
    /// Timer is already initialized
    AlreadyInitialized,
    /// Timer is not running
    NotStarted,
    /// Timer is not claimed
    NotClaimed,
    /// Timer (or timer service) is not initialized
    NotInitialized,
    /// The platform rejected a hardware operation
    PlatformFailure,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::InvalidTimer => write!(f, "Invalid timer"),
            TimerError::InvalidFrequency => write!(f, "Invalid timer frequency"),
            TimerError::NoTimerAvailable => write!(f, "No timer available"),
            TimerError::NoFeasibleFit => write!(f, "No prescaler/tick pair fits the frequency"),
            TimerError::AlreadyStarted => write!(f, "Timer already started"),
            TimerError::AlreadyClaimed => write!(f, "Timer already claimed"),
            TimerError::AlreadyInitialized => write!(f, "Timer already initialized"),
            TimerError::NotStarted => write!(f, "Timer not started"),
            TimerError::NotClaimed => write!(f, "Timer not claimed"),
            TimerError::NotInitialized => write!(f, "Timer not initialized"),
            TimerError::PlatformFailure => write!(f, "Platform rejected timer operation"),
        }
    }
}
