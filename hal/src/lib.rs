//! # uhwt Platform Adapters
//!
//! Concrete [`PlatformAdapter`](uhwt_core::PlatformAdapter) implementations
//! for each supported timer family, plus the [`TimerHardware`] boundary they
//! program through.
//!
//! ## Targets
//!
//! | Feature       | Adapter                 | Timers | Max freq |
//! |---------------|-------------------------|--------|----------|
//! | `atmega328p`  | [`avr::Atmega328p`]     | 2 (3)  | 120 kHz  |
//! | `esp32`       | [`esp32::Esp32`]        | 4      | 200 kHz  |
//! | `rp2040`      | [`pico::Rp2040`]        | 14     | 250 kHz  |
//! | none          | [`generic::Generic`]    | 0      | 0        |
//!
//! Every adapter is always compiled so host tests can drive all of them
//! through [`RecordingHardware`]. The feature only decides what [`Board`]
//! names.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod avr;
pub mod esp32;
pub mod generic;
pub mod hardware;
pub mod pico;

pub use hardware::{Fault, Program, RecordingHardware, SlotRecord, TimerHardware};

cfg_if::cfg_if! {
    if #[cfg(feature = "atmega328p")] {
        /// Adapter for the selected target
        pub type Board<H> = avr::Atmega328p<H>;
    } else if #[cfg(feature = "esp32")] {
        /// Adapter for the selected target
        pub type Board<H> = esp32::Esp32<H>;
    } else if #[cfg(feature = "rp2040")] {
        /// Adapter for the selected target
        pub type Board<H> = pico::Rp2040<H>;
    } else {
        /// Adapter for the selected target
        pub type Board<H> = generic::Generic<H>;
    }
}
