//! # Timer Hardware Boundary
//!
//! The register/SDK side of every adapter. An adapter translates the core's
//! prescaler/tick pair into a [`Program`] for one hardware slot and hands
//! it to a [`TimerHardware`] implementation, which is the only code that
//! writes peripheral registers or calls vendor SDKs.
//!
//! Implementations must perform any write that can race with a live
//! interrupt inside a critical section.
//!
//! [`RecordingHardware`] simulates the boundary in memory for host builds.

use uhwt_core::MAX_TIMERS;

/// Settings for one hardware slot, in the form the peripheral wants them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    /// AVR CTC mode: clock-select bits and output-compare value
    Compare {
        /// `CSn2:0` value selecting the prescaler
        clock_select: u8,
        /// `OCRnA` value
        compare: u16,
    },
    /// ESP32 legacy timer driver: divider and auto-reload alarm
    Divider {
        /// APB clock divider
        divider: u16,
        /// Alarm value in divided ticks
        alarm: u64,
    },
    /// ESP32 gptimer: counter resolution and auto-reload alarm
    Resolution {
        /// Counter resolution in Hz
        resolution_hz: u32,
        /// Alarm value in counter ticks
        alarm_count: u64,
    },
    /// Pico SDK repeating timer
    Period {
        /// Delay between callback starts in microseconds
        period_us: u64,
    },
}

/// Register/SDK access for one family of timer peripherals
///
/// Every method reports success with `true`.
pub trait TimerHardware {
    /// Reset a slot to an idle state with its interrupt masked
    fn init(&mut self, slot: usize) -> bool;

    /// Load settings into an idle slot
    fn program(&mut self, slot: usize, program: Program) -> bool;

    /// Set a slot's interrupt level (already translated by the adapter)
    fn set_priority(&mut self, _slot: usize, _level: u8) -> bool {
        true
    }

    /// Unmask the slot's interrupt
    fn start(&mut self, slot: usize) -> bool;

    /// Mask the slot's interrupt
    fn stop(&mut self, slot: usize) -> bool;

    /// Release the slot
    fn deconstruct(&mut self, slot: usize) -> bool;
}

impl<H: TimerHardware + ?Sized> TimerHardware for &mut H {
    fn init(&mut self, slot: usize) -> bool {
        (**self).init(slot)
    }

    fn program(&mut self, slot: usize, program: Program) -> bool {
        (**self).program(slot, program)
    }

    fn set_priority(&mut self, slot: usize, level: u8) -> bool {
        (**self).set_priority(slot, level)
    }

    fn start(&mut self, slot: usize) -> bool {
        (**self).start(slot)
    }

    fn stop(&mut self, slot: usize) -> bool {
        (**self).stop(slot)
    }

    fn deconstruct(&mut self, slot: usize) -> bool {
        (**self).deconstruct(slot)
    }
}

// =============================================================================
// Recording Hardware
// =============================================================================

bitflags::bitflags! {
    /// Operations a [`RecordingHardware`] refuses
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fault: u8 {
        /// Refuse `init`
        const INIT        = 1 << 0;
        /// Refuse `program`
        const PROGRAM     = 1 << 1;
        /// Refuse `set_priority`
        const PRIORITY    = 1 << 2;
        /// Refuse `start`
        const START       = 1 << 3;
        /// Refuse `stop`
        const STOP        = 1 << 4;
        /// Refuse `deconstruct`
        const DECONSTRUCT = 1 << 5;
    }
}

/// Observable state of one simulated slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotRecord {
    /// `init` ran and no `deconstruct` followed
    pub initialized: bool,
    /// Interrupt unmasked
    pub running: bool,
    /// Last settings loaded
    pub program: Option<Program>,
    /// Last interrupt level set
    pub level: Option<u8>,
}

/// In-memory stand-in for timer peripherals
#[derive(Debug, Clone)]
pub struct RecordingHardware {
    slots: [SlotRecord; MAX_TIMERS],
    fault: Fault,
}

impl RecordingHardware {
    /// Create hardware with every slot idle
    pub const fn new() -> Self {
        const IDLE: SlotRecord = SlotRecord {
            initialized: false,
            running: false,
            program: None,
            level: None,
        };

        Self {
            slots: [IDLE; MAX_TIMERS],
            fault: Fault::empty(),
        }
    }

    /// State of a slot
    pub fn slot(&self, slot: usize) -> Option<&SlotRecord> {
        self.slots.get(slot)
    }

    /// Make the given operations fail from now on
    pub fn inject(&mut self, fault: Fault) {
        self.fault = fault;
    }

    /// Currently injected faults
    pub fn fault(&self) -> Fault {
        self.fault
    }

    fn touch(&mut self, slot: usize, fault: Fault) -> Option<&mut SlotRecord> {
        if self.fault.contains(fault) {
            log::trace!("uhwt: simulated {:?} fault on slot {}", fault, slot);
            return None;
        }
        self.slots.get_mut(slot)
    }
}

impl Default for RecordingHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerHardware for RecordingHardware {
    fn init(&mut self, slot: usize) -> bool {
        match self.touch(slot, Fault::INIT) {
            Some(record) => {
                *record = SlotRecord {
                    initialized: true,
                    ..SlotRecord::default()
                };
                true
            },
            None => false,
        }
    }

    fn program(&mut self, slot: usize, program: Program) -> bool {
        match self.touch(slot, Fault::PROGRAM) {
            Some(record) => {
                record.program = Some(program);
                true
            },
            None => false,
        }
    }

    fn set_priority(&mut self, slot: usize, level: u8) -> bool {
        match self.touch(slot, Fault::PRIORITY) {
            Some(record) => {
                record.level = Some(level);
                true
            },
            None => false,
        }
    }

    fn start(&mut self, slot: usize) -> bool {
        match self.touch(slot, Fault::START) {
            Some(record) => {
                record.running = true;
                true
            },
            None => false,
        }
    }

    fn stop(&mut self, slot: usize) -> bool {
        match self.touch(slot, Fault::STOP) {
            Some(record) => {
                record.running = false;
                true
            },
            None => false,
        }
    }

    fn deconstruct(&mut self, slot: usize) -> bool {
        match self.touch(slot, Fault::DECONSTRUCT) {
            Some(record) => {
                *record = SlotRecord::default();
                true
            },
            None => false,
        }
    }
}
