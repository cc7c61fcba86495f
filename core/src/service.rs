//! # Timer Service
//!
//! Process-wide home for one [`TimerController`].
//!
//! Configuration calls are serialized by a spin lock, which gives the
//! single-writer discipline the controller expects. The dispatch table is
//! borrowed for `'static` and never sits behind the lock, so interrupt
//! handlers can fire callbacks while a configuring thread holds it.
//!
//! ```ignore
//! static DISPATCH: DispatchTable = DispatchTable::new();
//! static TIMERS: TimerService<Board<Registers>> = TimerService::new();
//!
//! TIMERS.install(TimerController::new(Board::new(Registers), &DISPATCH))?;
//! TIMERS.with(|ctl| ctl.configure(None, 100, blink, CallbackParam::NULL, 0))??;
//! ```

use spin::Mutex;

use crate::controller::TimerController;
use crate::error::{TimerError, TimerResult};
use crate::platform::PlatformAdapter;

/// Lock-guarded global controller
pub struct TimerService<P: PlatformAdapter + 'static> {
    controller: Mutex<Option<TimerController<'static, P>>>,
}

impl<P: PlatformAdapter + 'static> TimerService<P> {
    /// Create an empty service
    pub const fn new() -> Self {
        Self {
            controller: Mutex::new(None),
        }
    }

    /// Install the controller
    ///
    /// Fails with [`TimerError::AlreadyInitialized`] if one is installed.
    pub fn install(&self, controller: TimerController<'static, P>) -> TimerResult<()> {
        let mut slot = self.controller.lock();
        if slot.is_some() {
            return Err(TimerError::AlreadyInitialized);
        }

        *slot = Some(controller);
        log::debug!("uhwt: timer service installed ({} timers)", P::TIMER_COUNT);
        Ok(())
    }

    /// Check if a controller is installed
    pub fn is_installed(&self) -> bool {
        self.controller.lock().is_some()
    }

    /// Run `f` with exclusive access to the controller
    pub fn with<R>(&self, f: impl FnOnce(&mut TimerController<'static, P>) -> R) -> TimerResult<R> {
        let mut slot = self.controller.lock();
        let controller = slot.as_mut().ok_or(TimerError::NotInitialized)?;
        Ok(f(controller))
    }

    /// Remove the controller, returning it
    pub fn take(&self) -> Option<TimerController<'static, P>> {
        self.controller.lock().take()
    }
}

impl<P: PlatformAdapter + 'static> core::fmt::Debug for TimerService<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // try_lock: never spin inside a formatter
        let installed = self.controller.try_lock().map(|slot| slot.is_some());
        f.debug_struct("TimerService")
            .field("installed", &installed)
            .finish()
    }
}

impl<P: PlatformAdapter + 'static> Default for TimerService<P> {
    fn default() -> Self {
        Self::new()
    }
}
