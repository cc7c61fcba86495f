//! Fallback for targets without supported timers.
//!
//! Exposes zero timers and a zero frequency ceiling, so every request is
//! rejected up front and no hardware is ever touched.

use uhwt_core::{Frequency, PlatformAdapter, TimerId};

use crate::hardware::TimerHardware;

/// Adapter for a target with no usable timers
#[derive(Debug)]
pub struct Generic<H> {
    hardware: H,
}

impl<H: TimerHardware> Generic<H> {
    /// Wrap (and never use) a hardware handle
    pub const fn new(hardware: H) -> Self {
        Self { hardware }
    }

    /// Hardware handle
    pub fn hardware(&self) -> &H {
        &self.hardware
    }
}

impl<H: TimerHardware> PlatformAdapter for Generic<H> {
    type Prescaler = u8;
    type Ticks = u8;

    const TIMER_COUNT: usize = 0;
    const FREQ_MAX: Frequency = 0;
    const CALLBACK_SUPPORT: bool = false;
    const UNIFORM_TIMERS: bool = true;

    fn calc_freq(&self, _prescaler: u8, _ticks: u8) -> Frequency {
        0
    }

    fn calc_ticks(&self, _freq: Frequency, _prescaler: u8) -> Option<u8> {
        None
    }

    fn calc_scalar(&self, _freq: Frequency, _ticks: u8) -> Option<u8> {
        None
    }

    fn next_prescaler(&self, _prev: Option<u8>) -> Option<u8> {
        None
    }

    fn valid_prescaler(&self, _timer: TimerId, _prescaler: u8) -> bool {
        false
    }

    fn valid_ticks(&self, _timer: TimerId, _ticks: u8) -> bool {
        false
    }

    fn init(&mut self, _timer: TimerId) -> bool {
        false
    }

    fn set_stats(&mut self, _timer: TimerId, _prescaler: u8, _ticks: u8) -> bool {
        false
    }

    fn start(&mut self, _timer: TimerId) -> bool {
        false
    }

    fn stop(&mut self, _timer: TimerId) -> bool {
        false
    }
}
