//! # Timer Lifecycle Controller
//!
//! Owns the platform adapter and the state store, borrows the dispatch
//! table, and drives every timer through
//! `Uninitialized -> Initialized -> Started <-> Stopped -> Deconstructed`.
//!
//! ## Guarantees
//!
//! - A flag only changes after the adapter reported success for the
//!   matching side effect, so `started => initialized` always holds.
//! - `configure` either leaves the timer started with the new callback
//!   bound, or leaves flags and binding exactly as they were.
//! - `configure` never claims. Claims are only taken and released through
//!   `claim`/`claim_timer`/`unclaim`.

use crate::claim;
use crate::dispatch::{Binding, CallbackParam, DispatchTable, TimerFunction, Trampoline};
use crate::error::{TimerError, TimerResult};
use crate::fitting::{self, PlatformFit};
use crate::platform::PlatformAdapter;
use crate::state::TimerStates;
use crate::timer::{ClaimHint, Frequency, Priority, TimerId, MAX_TIMERS};

/// Outcome of a successful `configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configured {
    /// Timer now running
    pub timer: TimerId,
    /// Frequency actually programmed
    pub frequency: Frequency,
    /// Whether `frequency` equals the requested one
    pub exact: bool,
}

/// Timer lifecycle controller
pub struct TimerController<'d, P: PlatformAdapter> {
    /// Hardware adapter
    platform: P,
    /// Per-timer flags
    states: TimerStates,
    /// Callback storage shared with the interrupt path
    dispatch: &'d DispatchTable,
    /// Last programmed pair per timer
    settings: [Option<PlatformFit<P>>; MAX_TIMERS],
}

impl<'d, P: PlatformAdapter> TimerController<'d, P> {
    /// Create a controller with every timer unclaimed and uninitialized
    pub fn new(platform: P, dispatch: &'d DispatchTable) -> Self {
        Self {
            platform,
            states: TimerStates::new(P::TIMER_COUNT),
            dispatch,
            settings: core::array::from_fn(|_| None),
        }
    }

    /// Platform adapter
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutable platform adapter
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Dispatch table the controller binds into
    pub fn dispatch(&self) -> &'d DispatchTable {
        self.dispatch
    }

    /// Snapshot of every timer's flags
    pub fn states(&self) -> &TimerStates {
        &self.states
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check that `timer` exists on this platform
    #[inline]
    pub fn valid_timer(&self, timer: TimerId) -> bool {
        self.states.is_valid(timer)
    }

    /// Check that `freq` is non-zero and within the platform ceiling
    #[inline]
    pub fn valid_frequency(&self, freq: Frequency) -> bool {
        fitting::valid_frequency::<P>(freq)
    }

    /// Check if a timer is claimed
    #[inline]
    pub fn is_claimed(&self, timer: TimerId) -> bool {
        self.states.claimed(timer)
    }

    /// Check if a timer is running
    #[inline]
    pub fn is_started(&self, timer: TimerId) -> bool {
        self.states.started(timer)
    }

    /// Check if a timer's hardware is initialized
    #[inline]
    pub fn is_initialized(&self, timer: TimerId) -> bool {
        self.states.initialized(timer)
    }

    /// Prescaler last programmed by `configure` or `set_stats`
    pub fn prescaler(&self, timer: TimerId) -> Option<P::Prescaler> {
        self.setting(timer).map(|found| found.prescaler)
    }

    /// Tick count last programmed by `configure` or `set_stats`
    pub fn ticks(&self, timer: TimerId) -> Option<P::Ticks> {
        self.setting(timer).map(|found| found.ticks)
    }

    fn setting(&self, timer: TimerId) -> Option<&PlatformFit<P>> {
        if !self.valid_timer(timer) {
            return None;
        }
        self.settings[timer.index()].as_ref()
    }

    fn check(&self, timer: TimerId) -> TimerResult<()> {
        if self.valid_timer(timer) {
            Ok(())
        } else {
            Err(TimerError::InvalidTimer)
        }
    }

    // =========================================================================
    // Claims
    // =========================================================================

    /// Claim any free timer, honouring hints
    pub fn claim(&mut self, hint: ClaimHint) -> Option<TimerId> {
        self.claim_timer(TimerId::INVALID, hint).ok()
    }

    /// Claim a specific timer
    ///
    /// An invalid or out-of-range `timer` selects one automatically.
    pub fn claim_timer(&mut self, timer: TimerId, hint: ClaimHint) -> TimerResult<TimerId> {
        claim::claim(&self.platform, &mut self.states, timer, hint)
    }

    /// Release a claim
    pub fn unclaim(&mut self, timer: TimerId) -> TimerResult<()> {
        claim::unclaim(&mut self.states, timer)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Initialize a timer's hardware
    pub fn init(&mut self, timer: TimerId) -> TimerResult<()> {
        self.check(timer)?;
        if self.states.initialized(timer) {
            return Err(TimerError::AlreadyInitialized);
        }
        if !self.platform.init(timer) {
            log::warn!("uhwt: platform failed to initialize {}", timer);
            return Err(TimerError::PlatformFailure);
        }

        self.states.set_initialized(timer);
        log::debug!("uhwt: {} initialized", timer);
        Ok(())
    }

    /// Start an initialized timer
    pub fn start(&mut self, timer: TimerId) -> TimerResult<()> {
        self.check(timer)?;
        if !self.states.initialized(timer) {
            return Err(TimerError::NotInitialized);
        }
        if self.states.started(timer) {
            return Err(TimerError::AlreadyStarted);
        }
        if !self.platform.start(timer) {
            log::warn!("uhwt: platform failed to start {}", timer);
            return Err(TimerError::PlatformFailure);
        }

        self.states.set_started(timer);
        log::debug!("uhwt: {} started", timer);
        Ok(())
    }

    /// Stop a running timer
    pub fn stop(&mut self, timer: TimerId) -> TimerResult<()> {
        self.check(timer)?;
        if !self.states.started(timer) {
            return Err(TimerError::NotStarted);
        }
        if !self.platform.stop(timer) {
            log::warn!("uhwt: platform failed to stop {}", timer);
            return Err(TimerError::PlatformFailure);
        }

        self.states.set_stopped(timer);
        log::debug!("uhwt: {} stopped", timer);
        Ok(())
    }

    /// Release a stopped timer's hardware
    pub fn deconstruct(&mut self, timer: TimerId) -> TimerResult<()> {
        self.check(timer)?;
        if !self.states.initialized(timer) {
            return Err(TimerError::NotInitialized);
        }
        if self.states.started(timer) {
            return Err(TimerError::AlreadyStarted);
        }
        if !self.platform.deconstruct(timer) {
            log::warn!("uhwt: platform failed to deconstruct {}", timer);
            return Err(TimerError::PlatformFailure);
        }

        self.states.set_deconstructed(timer);
        self.settings[timer.index()] = None;
        log::debug!("uhwt: {} deconstructed", timer);
        Ok(())
    }

    /// Program a prescaler/tick pair into a timer that is not running
    pub fn set_stats(
        &mut self,
        timer: TimerId,
        prescaler: P::Prescaler,
        ticks: P::Ticks,
    ) -> TimerResult<()> {
        self.check(timer)?;
        if self.states.started(timer) {
            return Err(TimerError::AlreadyStarted);
        }
        if !self.platform.set_stats(timer, prescaler, ticks) {
            log::warn!("uhwt: platform rejected settings for {}", timer);
            return Err(TimerError::PlatformFailure);
        }

        let frequency = self.platform.calc_freq(prescaler, ticks);
        self.settings[timer.index()] = Some(fitting::Fit {
            prescaler,
            ticks,
            frequency,
            exact: fitting::is_exact(&self.platform, frequency, prescaler, ticks),
        });
        Ok(())
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Bind a callback to a timer slot
    ///
    /// On platforms with native callback wiring the adapter is told about the
    /// binding as well. A running timer keeps its binding until cancelled.
    pub fn bind_callback(
        &mut self,
        timer: TimerId,
        function: TimerFunction,
        param: CallbackParam,
    ) -> TimerResult<()> {
        self.check(timer)?;
        if self.states.started(timer) {
            return Err(TimerError::AlreadyStarted);
        }
        let binding = Binding::new(function, param);

        if P::CALLBACK_SUPPORT && !self.platform.set_callback(timer, binding) {
            return Err(TimerError::PlatformFailure);
        }
        self.dispatch.bind(timer, binding)?;
        Ok(())
    }

    /// Interrupt entry point for a timer slot
    ///
    /// `None` on platforms without callback support; their consumers poll
    /// the dispatch table instead.
    pub fn raw_callback(&self, timer: TimerId) -> Option<Trampoline<'d>> {
        if !P::CALLBACK_SUPPORT || !self.valid_timer(timer) {
            return None;
        }
        self.dispatch.trampoline(timer)
    }

    // =========================================================================
    // Fitting
    // =========================================================================

    /// Closest prescaler/tick pair for one timer
    pub fn fit(&self, timer: TimerId, freq: Frequency) -> TimerResult<PlatformFit<P>> {
        self.check(timer)?;
        if !self.valid_frequency(freq) {
            return Err(TimerError::InvalidFrequency);
        }
        fitting::fit(&self.platform, timer, freq).ok_or(TimerError::NoFeasibleFit)
    }

    /// Closest prescaler/tick pair across every free timer
    pub fn fit_best(&self, freq: Frequency) -> TimerResult<(TimerId, PlatformFit<P>)> {
        if !self.valid_frequency(freq) {
            return Err(TimerError::InvalidFrequency);
        }
        fitting::fit_best(&self.platform, &self.states, freq)
    }

    // =========================================================================
    // Composite operations
    // =========================================================================

    /// Run `function(param)` periodically at (about) `freq` Hz
    ///
    /// With `timer = None` the free timer giving the closest match is used.
    /// A named timer is configured whether or not it is claimed, but never
    /// while it is running.
    pub fn configure(
        &mut self,
        timer: Option<TimerId>,
        freq: Frequency,
        function: TimerFunction,
        param: CallbackParam,
        priority: Priority,
    ) -> TimerResult<Configured> {
        if !self.valid_frequency(freq) {
            log::warn!("uhwt: rejected frequency {} Hz", freq);
            return Err(TimerError::InvalidFrequency);
        }

        let (timer, found) = match timer {
            Some(timer) => {
                self.check(timer)?;
                if self.states.started(timer) {
                    return Err(TimerError::AlreadyStarted);
                }
                let found = fitting::fit(&self.platform, timer, freq).ok_or_else(|| {
                    log::warn!("uhwt: no settings reach {} Hz on {}", freq, timer);
                    TimerError::NoFeasibleFit
                })?;
                (timer, found)
            },
            None => fitting::fit_best(&self.platform, &self.states, freq).map_err(|err| {
                log::warn!("uhwt: no free timer for {} Hz: {}", freq, err);
                err
            })?,
        };

        self.program(timer, found, Binding::new(function, param), priority)?;

        log::debug!(
            "uhwt: {} running at {} Hz (requested {} Hz)",
            timer,
            found.frequency,
            freq
        );

        Ok(Configured {
            timer,
            frequency: found.frequency,
            exact: found.exact,
        })
    }

    /// Stop a running timer and release its hardware
    ///
    /// The claim, if any, is kept. A failed deconstruct after a successful
    /// stop leaves the timer initialized and still counts as success.
    pub fn cancel(&mut self, timer: TimerId) -> TimerResult<()> {
        self.check(timer)?;
        if !self.states.started(timer) {
            return Err(TimerError::NotStarted);
        }

        self.stop(timer)?;
        if let Err(err) = self.deconstruct(timer) {
            log::warn!("uhwt: {} stopped but not released: {}", timer, err);
        }
        Ok(())
    }

    fn program(
        &mut self,
        timer: TimerId,
        found: PlatformFit<P>,
        binding: Binding,
        priority: Priority,
    ) -> TimerResult<()> {
        let fresh = !self.states.initialized(timer);
        if fresh {
            self.init(timer)?;
        }

        let previous = self.dispatch.binding(timer);

        if let Err(err) = self.apply(timer, found, binding, priority) {
            self.dispatch.restore(timer, previous);
            if let Some(previous) = previous.filter(|_| P::CALLBACK_SUPPORT) {
                if !self.platform.set_callback(timer, previous) {
                    log::warn!("uhwt: platform kept the rejected callback on {}", timer);
                }
            }
            if fresh {
                self.rollback_init(timer);
            }
            log::warn!("uhwt: failed to configure {}: {}", timer, err);
            return Err(err);
        }

        self.settings[timer.index()] = Some(found);
        Ok(())
    }

    fn apply(
        &mut self,
        timer: TimerId,
        found: PlatformFit<P>,
        binding: Binding,
        priority: Priority,
    ) -> TimerResult<()> {
        if P::PRIORITY_SUPPORT && !self.platform.set_priority(timer, priority) {
            return Err(TimerError::PlatformFailure);
        }
        if P::CALLBACK_SUPPORT && !self.platform.set_callback(timer, binding) {
            return Err(TimerError::PlatformFailure);
        }
        self.dispatch.bind(timer, binding)?;

        if !self.platform.set_stats(timer, found.prescaler, found.ticks) {
            return Err(TimerError::PlatformFailure);
        }
        self.start(timer)
    }

    fn rollback_init(&mut self, timer: TimerId) {
        if !self.platform.deconstruct(timer) {
            log::warn!("uhwt: platform failed to release {} after a failed configure", timer);
        }
        self.states.set_deconstructed(timer);
        self.settings[timer.index()] = None;
    }
}

impl<P: PlatformAdapter + core::fmt::Debug> core::fmt::Debug for TimerController<'_, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimerController")
            .field("platform", &self.platform)
            .field("states", &self.states)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, Failures, MockPlatform, NARROW_TIMER};
    use crate::platform::Prescalers;
    use core::sync::atomic::{AtomicU32, Ordering};

    static TICKS: AtomicU32 = AtomicU32::new(0);

    fn tick(_: CallbackParam) {
        TICKS.fetch_add(1, Ordering::SeqCst);
    }

    fn noop(_: CallbackParam) {}

    fn controller(dispatch: &DispatchTable) -> TimerController<'_, MockPlatform> {
        TimerController::new(MockPlatform::new(), dispatch)
    }

    fn assert_started_implies_initialized(ctl: &TimerController<'_, MockPlatform>) {
        for timer in ctl.states().timers() {
            assert!(!ctl.is_started(timer) || ctl.is_initialized(timer));
        }
    }

    #[test]
    fn test_configure_best_fit() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);

        let done = ctl.configure(None, 1000, noop, CallbackParam::NULL, 7).unwrap();
        let timer = TimerId::new(0);
        assert_eq!(
            done,
            Configured {
                timer,
                frequency: 1000,
                exact: true
            }
        );
        assert!(ctl.is_started(timer));
        assert!(ctl.is_initialized(timer));
        assert!(!ctl.is_claimed(timer));
        assert_eq!(
            ctl.platform().calls,
            [
                Call::Init(timer),
                Call::Priority(timer, 7),
                Call::Callback(timer),
                Call::Stats(timer, 8, 125),
                Call::Start(timer),
            ]
        );
        assert_eq!(ctl.prescaler(timer), Some(8));
        assert_eq!(ctl.ticks(timer), Some(125));
    }

    #[test]
    fn test_configure_rejects_frequency() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(1);

        for freq in [0, MockPlatform::FREQ_MAX + 1] {
            assert_eq!(
                ctl.configure(Some(timer), freq, noop, CallbackParam::NULL, 0),
                Err(TimerError::InvalidFrequency)
            );
        }
        assert!(!ctl.is_started(timer));
        assert!(ctl.platform().calls.is_empty());
    }

    #[test]
    fn test_configure_invalid_timer() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);

        for timer in [TimerId::INVALID, TimerId::new(4)] {
            assert_eq!(
                ctl.configure(Some(timer), 1000, noop, CallbackParam::NULL, 0),
                Err(TimerError::InvalidTimer)
            );
        }
    }

    #[test]
    fn test_configure_started_timer_fails() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(2);

        ctl.configure(Some(timer), 1000, noop, CallbackParam::NULL, 0).unwrap();
        assert_eq!(
            ctl.configure(Some(timer), 500, noop, CallbackParam::NULL, 0),
            Err(TimerError::AlreadyStarted)
        );

        ctl.claim_timer(TimerId::new(3), ClaimHint::NONE).unwrap();
        ctl.configure(Some(TimerId::new(3)), 1000, noop, CallbackParam::NULL, 0).unwrap();
        assert_eq!(
            ctl.configure(Some(TimerId::new(3)), 1000, noop, CallbackParam::NULL, 0),
            Err(TimerError::AlreadyStarted)
        );
    }

    #[test]
    fn test_configure_named_timer_ignores_claim() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let claimed = TimerId::new(1);
        ctl.claim_timer(claimed, ClaimHint::NONE).unwrap();

        assert_eq!(
            ctl.configure(Some(claimed), 1000, noop, CallbackParam::NULL, 0).map(|c| c.timer),
            Ok(claimed)
        );
        assert!(ctl.is_claimed(claimed));

        let unclaimed = TimerId::new(2);
        assert_eq!(
            ctl.configure(Some(unclaimed), 1000, noop, CallbackParam::NULL, 0).map(|c| c.timer),
            Ok(unclaimed)
        );
        assert!(!ctl.is_claimed(unclaimed));
    }

    #[test]
    fn test_configure_none_skips_claimed_and_started() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);

        ctl.claim_timer(TimerId::new(0), ClaimHint::NONE).unwrap();
        ctl.configure(Some(TimerId::new(1)), 1000, noop, CallbackParam::NULL, 0).unwrap();

        let done = ctl.configure(None, 1000, noop, CallbackParam::NULL, 0).unwrap();
        assert_eq!(done.timer, TimerId::new(2));

        let done = ctl.configure(None, 1000, noop, CallbackParam::NULL, 0).unwrap();
        assert_eq!(done.timer, NARROW_TIMER);

        assert_eq!(
            ctl.configure(None, 1000, noop, CallbackParam::NULL, 0),
            Err(TimerError::NoTimerAvailable)
        );
        assert_started_implies_initialized(&ctl);
    }

    #[test]
    fn test_configure_no_feasible_fit() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);

        assert_eq!(
            ctl.configure(Some(NARROW_TIMER), 10, noop, CallbackParam::NULL, 0),
            Err(TimerError::NoFeasibleFit)
        );
        assert!(!ctl.is_initialized(NARROW_TIMER));
        assert!(ctl.platform().calls.is_empty());
    }

    #[test]
    fn test_configure_rolls_back_on_failure() {
        for failure in [Failures::PRIORITY, Failures::CALLBACK, Failures::STATS, Failures::START] {
            let dispatch = DispatchTable::new();
            let mut ctl = controller(&dispatch);
            let timer = TimerId::new(0);
            ctl.platform_mut().fail = failure;

            assert_eq!(
                ctl.configure(Some(timer), 1000, noop, CallbackParam::NULL, 0),
                Err(TimerError::PlatformFailure)
            );
            assert!(!ctl.is_started(timer));
            assert!(!ctl.is_initialized(timer));
            assert!(dispatch.binding(timer).is_none());
            assert_eq!(ctl.prescaler(timer), None);
            assert_eq!(ctl.platform().calls.last(), Some(&Call::Deconstruct(timer)));
        }
    }

    #[test]
    fn test_configure_init_failure() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        ctl.platform_mut().fail = Failures::INIT;

        assert_eq!(
            ctl.configure(None, 1000, noop, CallbackParam::NULL, 0),
            Err(TimerError::PlatformFailure)
        );
        assert_eq!(ctl.platform().calls, [Call::Init(TimerId::new(0))]);
        assert!(!ctl.is_initialized(TimerId::new(0)));
    }

    #[test]
    fn test_rollback_clears_flag_when_release_fails() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        ctl.platform_mut().fail = Failures::START | Failures::DECONSTRUCT;

        assert!(ctl.configure(None, 1000, noop, CallbackParam::NULL, 0).is_err());
        assert!(!ctl.is_initialized(TimerId::new(0)));
    }

    #[test]
    fn test_rollback_keeps_previous_binding() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(1);

        ctl.configure(Some(timer), 1000, tick, CallbackParam::NULL, 0).unwrap();
        ctl.stop(timer).unwrap();
        let before = dispatch.binding(timer);

        ctl.platform_mut().fail = Failures::STATS;
        assert!(ctl.configure(Some(timer), 500, noop, CallbackParam::NULL, 0).is_err());

        assert_eq!(dispatch.binding(timer), before);
        // Was already initialized before the attempt: stays that way
        assert!(ctl.is_initialized(timer));
        assert_eq!(ctl.ticks(timer), Some(125));
    }

    #[test]
    fn test_rollback_reregisters_previous_callback() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(2);

        ctl.bind_callback(timer, tick, CallbackParam::NULL).unwrap();
        ctl.platform_mut().calls.clear();
        ctl.platform_mut().fail = Failures::STATS;

        assert!(ctl.configure(Some(timer), 1000, noop, CallbackParam::NULL, 0).is_err());
        assert_eq!(
            ctl.platform().calls,
            [
                Call::Init(timer),
                Call::Priority(timer, 0),
                Call::Callback(timer),
                Call::Stats(timer, 8, 125),
                Call::Callback(timer),
                Call::Deconstruct(timer),
            ]
        );
        assert_eq!(dispatch.binding(timer), Some(Binding::new(tick, CallbackParam::NULL)));
    }

    #[test]
    fn test_cancel_keeps_claim() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = ctl.claim(ClaimHint::NONE).unwrap();

        ctl.configure(Some(timer), 1000, noop, CallbackParam::NULL, 0).unwrap();
        assert_eq!(ctl.cancel(timer), Ok(()));

        assert!(!ctl.is_started(timer));
        assert!(!ctl.is_initialized(timer));
        assert!(ctl.is_claimed(timer));
        assert_eq!(ctl.prescaler(timer), None);
    }

    #[test]
    fn test_cancel_twice() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(0);

        ctl.configure(Some(timer), 1000, noop, CallbackParam::NULL, 0).unwrap();
        ctl.cancel(timer).unwrap();
        let after_first = *ctl.states();
        let calls = ctl.platform().calls.len();

        assert_eq!(ctl.cancel(timer), Err(TimerError::NotStarted));
        assert_eq!(*ctl.states(), after_first);
        assert_eq!(ctl.platform().calls.len(), calls);
    }

    #[test]
    fn test_cancel_invalid_timer() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        assert_eq!(ctl.cancel(TimerId::INVALID), Err(TimerError::InvalidTimer));
    }

    #[test]
    fn test_cancel_stop_failure() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(0);

        ctl.configure(Some(timer), 1000, noop, CallbackParam::NULL, 0).unwrap();
        ctl.platform_mut().fail = Failures::STOP;

        assert_eq!(ctl.cancel(timer), Err(TimerError::PlatformFailure));
        assert!(ctl.is_started(timer));
    }

    #[test]
    fn test_cancel_release_failure() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(0);

        ctl.configure(Some(timer), 1000, noop, CallbackParam::NULL, 0).unwrap();
        ctl.platform_mut().fail = Failures::DECONSTRUCT;

        assert_eq!(ctl.cancel(timer), Ok(()));
        assert!(!ctl.is_started(timer));
        assert!(ctl.is_initialized(timer));

        // Reconfiguring skips init for a still-initialized timer
        ctl.platform_mut().fail = Failures::empty();
        ctl.platform_mut().calls.clear();
        ctl.configure(Some(timer), 1000, noop, CallbackParam::NULL, 0).unwrap();
        assert!(!ctl.platform().calls.contains(&Call::Init(timer)));
    }

    #[test]
    fn test_lifecycle_guards() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(1);

        assert_eq!(ctl.start(timer), Err(TimerError::NotInitialized));
        assert_eq!(ctl.stop(timer), Err(TimerError::NotStarted));
        assert_eq!(ctl.deconstruct(timer), Err(TimerError::NotInitialized));

        ctl.init(timer).unwrap();
        assert_eq!(ctl.init(timer), Err(TimerError::AlreadyInitialized));

        ctl.start(timer).unwrap();
        assert_eq!(ctl.start(timer), Err(TimerError::AlreadyStarted));
        assert_eq!(ctl.deconstruct(timer), Err(TimerError::AlreadyStarted));
        assert_eq!(ctl.set_stats(timer, 8, 125), Err(TimerError::AlreadyStarted));
        assert_started_implies_initialized(&ctl);

        ctl.stop(timer).unwrap();
        ctl.deconstruct(timer).unwrap();
        assert!(!ctl.is_initialized(timer));
        assert_eq!(ctl.init(TimerId::INVALID), Err(TimerError::InvalidTimer));
    }

    #[test]
    fn test_lifecycle_platform_failures_keep_flags() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(0);

        ctl.platform_mut().fail = Failures::INIT;
        assert_eq!(ctl.init(timer), Err(TimerError::PlatformFailure));
        assert!(!ctl.is_initialized(timer));

        ctl.platform_mut().fail = Failures::START;
        ctl.init(timer).unwrap();
        assert_eq!(ctl.start(timer), Err(TimerError::PlatformFailure));
        assert!(!ctl.is_started(timer));
    }

    #[test]
    fn test_set_stats_readback() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(0);

        ctl.init(timer).unwrap();
        ctl.set_stats(timer, 4, 250).unwrap();
        assert_eq!(ctl.prescaler(timer), Some(4));
        assert_eq!(ctl.ticks(timer), Some(250));
        assert_eq!(ctl.prescaler(TimerId::INVALID), None);
    }

    #[test]
    fn test_bind_and_raw_callback() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(2);

        assert_eq!(
            ctl.bind_callback(TimerId::INVALID, tick, CallbackParam::NULL),
            Err(TimerError::InvalidTimer)
        );
        ctl.bind_callback(timer, tick, CallbackParam::NULL).unwrap();
        assert_eq!(ctl.platform().calls, [Call::Callback(timer)]);

        let trampoline = ctl.raw_callback(timer).unwrap();
        let before = TICKS.load(Ordering::SeqCst);
        assert!(trampoline.fire());
        assert!(TICKS.load(Ordering::SeqCst) > before);

        assert!(ctl.raw_callback(TimerId::new(4)).is_none());
    }

    #[test]
    fn test_bind_callback_refused_while_running() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);
        let timer = TimerId::new(1);

        ctl.configure(Some(timer), 1000, tick, CallbackParam::NULL, 0).unwrap();
        let running = dispatch.binding(timer);
        ctl.platform_mut().calls.clear();

        let mut marker = 0u8;
        assert_eq!(
            ctl.bind_callback(timer, noop, CallbackParam::new(&mut marker as *mut u8)),
            Err(TimerError::AlreadyStarted)
        );
        assert_eq!(dispatch.binding(timer), running);
        assert!(ctl.platform().calls.is_empty());

        // Rebinding is fine again once the timer is cancelled
        ctl.cancel(timer).unwrap();
        ctl.bind_callback(timer, noop, CallbackParam::NULL).unwrap();
        assert_eq!(dispatch.binding(timer), Some(Binding::new(noop, CallbackParam::NULL)));
    }

    #[test]
    fn test_claim_round_trip() {
        let dispatch = DispatchTable::new();
        let mut ctl = controller(&dispatch);

        let timer = ctl.claim(ClaimHint::NONE).unwrap();
        assert_eq!(
            ctl.claim_timer(timer, ClaimHint::NONE),
            Err(TimerError::AlreadyClaimed)
        );
        ctl.unclaim(timer).unwrap();
        assert_eq!(ctl.claim_timer(timer, ClaimHint::NONE), Ok(timer));
    }

    #[test]
    fn test_best_fit_is_closest_candidate() {
        for freq in [1, 3, 7, 13, 60, 333, 1000, 4321, 77_777, 250_000] {
            let dispatch = DispatchTable::new();
            let mut ctl = controller(&dispatch);

            let done = match ctl.configure(None, freq, noop, CallbackParam::NULL, 0) {
                Ok(done) => done,
                Err(err) => {
                    assert_eq!(err, TimerError::NoFeasibleFit);
                    continue;
                },
            };
            let achieved = fitting::freq_delta(freq, done.frequency);

            let platform = MockPlatform::new();
            for timer in (0..MockPlatform::TIMER_COUNT).map(TimerId::new) {
                for prescaler in Prescalers::new(&platform) {
                    let ticks = match platform.calc_ticks(freq, prescaler) {
                        Some(ticks) if fitting::is_legal(&platform, timer, prescaler, ticks) => {
                            ticks
                        },
                        _ => continue,
                    };
                    let candidate = platform.calc_freq(prescaler, ticks);
                    assert!(fitting::freq_delta(freq, candidate) >= achieved);
                }
            }
        }
    }
}
