//! # Callback Dispatch Table
//!
//! One `(function, parameter)` pair per timer slot, written by the
//! configuring thread and read by the interrupt path.
//!
//! ## Ordering
//!
//! Slots are stored in atomics so an interrupt never takes a lock. `bind`
//! publishes the parameter first and the function last with `Release`;
//! `fire` loads the function with `Acquire` before the parameter. The
//! controller always binds before it enables the interrupt, so a firing
//! interrupt observes a complete pair.
//!
//! A slot whose interrupt is live is never rebound: the controller refuses
//! `bind_callback` on a started timer, and `configure` only targets stopped
//! ones.

use core::fmt;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::error::{TimerError, TimerResult};
use crate::timer::{TimerId, MAX_TIMERS};

// =============================================================================
// Callback Types
// =============================================================================

/// Function invoked on every timer period
pub type TimerFunction = fn(CallbackParam);

/// Opaque parameter handed back to a [`TimerFunction`]
///
/// The library never dereferences it; only the callback that created it
/// knows what it points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct CallbackParam(*mut ());

// SAFETY: the pointer is an opaque token carried between the configuring
// thread and the interrupt context; this crate never dereferences it.
unsafe impl Send for CallbackParam {}
// SAFETY: see above.
unsafe impl Sync for CallbackParam {}

impl CallbackParam {
    /// Null parameter
    pub const NULL: CallbackParam = CallbackParam(ptr::null_mut());

    /// Wrap a raw pointer
    #[inline]
    pub const fn new<T>(ptr: *mut T) -> Self {
        CallbackParam(ptr.cast())
    }

    /// Wrap a shared reference to a value that outlives the timer
    #[inline]
    pub fn from_ref<T>(value: &'static T) -> Self {
        CallbackParam((value as *const T).cast_mut().cast())
    }

    /// Get the raw pointer back
    #[inline]
    pub const fn as_ptr<T>(self) -> *mut T {
        self.0.cast()
    }

    /// Check for the null parameter
    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// A callback bound to a timer slot
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Function to call
    pub function: TimerFunction,
    /// Parameter to pass
    pub param: CallbackParam,
}

impl Binding {
    /// Create a binding
    #[inline]
    pub const fn new(function: TimerFunction, param: CallbackParam) -> Self {
        Self { function, param }
    }

    /// Invoke the callback once
    #[inline]
    pub fn invoke(&self) {
        (self.function)(self.param);
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("function", &(self.function as *const ()))
            .field("param", &self.param)
            .finish()
    }
}

// =============================================================================
// Dispatch Table
// =============================================================================

/// Lock-free per-slot callback storage
pub struct DispatchTable {
    /// Function pointers, null when unbound
    functions: [AtomicPtr<()>; MAX_TIMERS],
    /// Opaque parameters
    params: [AtomicPtr<()>; MAX_TIMERS],
}

#[allow(clippy::declare_interior_mutable_const)]
const UNBOUND: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

impl DispatchTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            functions: [UNBOUND; MAX_TIMERS],
            params: [UNBOUND; MAX_TIMERS],
        }
    }

    #[inline]
    fn slot(timer: TimerId) -> TimerResult<usize> {
        if timer.index() < MAX_TIMERS {
            Ok(timer.index())
        } else {
            Err(TimerError::InvalidTimer)
        }
    }

    /// Overwrite the binding of a slot
    ///
    /// Returns the binding that was replaced.
    pub fn bind(&self, timer: TimerId, binding: Binding) -> TimerResult<Option<Binding>> {
        let slot = Self::slot(timer)?;
        let previous = self.binding(timer);

        self.params[slot].store(binding.param.0, Ordering::Relaxed);
        self.functions[slot].store(binding.function as *mut (), Ordering::Release);

        Ok(previous)
    }

    /// Put back a binding captured before a failed operation
    pub fn restore(&self, timer: TimerId, binding: Option<Binding>) {
        match binding {
            Some(binding) => {
                let _ = self.bind(timer, binding);
            },
            None => self.clear(timer),
        }
    }

    /// Remove the binding of a slot
    pub fn clear(&self, timer: TimerId) {
        if let Ok(slot) = Self::slot(timer) {
            self.functions[slot].store(ptr::null_mut(), Ordering::Release);
            self.params[slot].store(ptr::null_mut(), Ordering::Relaxed);
        }
    }

    /// Read the binding of a slot
    pub fn binding(&self, timer: TimerId) -> Option<Binding> {
        let slot = Self::slot(timer).ok()?;
        let raw = self.functions[slot].load(Ordering::Acquire);
        if raw.is_null() {
            return None;
        }

        // SAFETY: non-null values in `functions` are only ever written by
        // `bind`, which stores a `TimerFunction` cast to `*mut ()`.
        let function = unsafe { core::mem::transmute::<*mut (), TimerFunction>(raw) };
        let param = CallbackParam(self.params[slot].load(Ordering::Relaxed));

        Some(Binding { function, param })
    }

    /// Run the callback bound to a slot
    ///
    /// Called from interrupt context. Returns `false` if the slot is unbound.
    #[inline]
    pub fn fire(&self, timer: TimerId) -> bool {
        match self.binding(timer) {
            Some(binding) => {
                binding.invoke();
                true
            },
            None => false,
        }
    }

    /// Get the trampoline for a slot
    pub fn trampoline(&self, timer: TimerId) -> Option<Trampoline<'_>> {
        Self::slot(timer).ok()?;
        Some(Trampoline { table: self, timer })
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = self
            .functions
            .iter()
            .filter(|function| !function.load(Ordering::Relaxed).is_null())
            .count();
        f.debug_struct("DispatchTable").field("bound", &bound).finish()
    }
}

// =============================================================================
// Trampoline
// =============================================================================

/// Entry point tied to one physical timer slot
///
/// This is what a platform's interrupt glue calls; it forwards to whatever
/// is currently bound to the slot.
#[derive(Clone, Copy)]
pub struct Trampoline<'d> {
    /// Table holding the binding
    table: &'d DispatchTable,
    /// Slot this trampoline serves
    timer: TimerId,
}

impl<'d> Trampoline<'d> {
    /// Slot served by this trampoline
    #[inline]
    pub fn timer(&self) -> TimerId {
        self.timer
    }

    /// Run the bound callback
    #[inline]
    pub fn fire(&self) -> bool {
        self.table.fire(self.timer)
    }
}

impl fmt::Debug for Trampoline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trampoline").field("timer", &self.timer).finish()
    }
}
