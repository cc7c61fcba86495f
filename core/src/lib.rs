//! # uhwt Core
//!
//! Hardware-agnostic timer resource manager and frequency fitting engine.
//! It presents one contract over very different timer peripherals: claim a
//! timer, ask for a frequency, receive periodic callbacks, release the timer.
//!
//! ## Components
//!
//! - **Timer State Store**: claimed/initialized/started bitsets
//! - **Platform Adapter**: the trait each target implements
//! - **Frequency Fitting Engine**: prescaler/tick search with exactness
//! - **Resource Claim Manager**: claim, unclaim, hinted selection
//! - **Callback Dispatch Table**: lock-free per-slot callbacks for ISRs
//! - **Timer Lifecycle Controller**: init/start/stop/deconstruct and the
//!   composite `configure`/`cancel`
//! - **Timer Service**: spin-locked global home for a controller
//!
//! No heap, no panics on bad input: every failure is a [`TimerError`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod claim;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod fitting;
pub mod platform;
pub mod service;
pub mod state;
pub mod timer;

#[cfg(test)]
mod mock;

pub use controller::{Configured, TimerController};
pub use dispatch::{Binding, CallbackParam, DispatchTable, TimerFunction, Trampoline};
pub use error::{TimerError, TimerResult};
pub use fitting::{Fit, PlatformFit};
pub use platform::{PlatformAdapter, Prescalers};
pub use service::TimerService;
pub use state::{TimerSet, TimerStates};
pub use timer::{ClaimHint, Frequency, Priority, TimerId, MAX_TIMERS, PRIORITY_DEFAULT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
