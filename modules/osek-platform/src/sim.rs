//! Simulated hardware timer and platform
//!
//! On a hosted build there is no timer peripheral; time advances when the
//! simulation says so. The timer keeps one compare register like the
//! hardware timers it stands in for: when an advance reaches the compare
//! value, the timer's interrupt becomes pending until it is acknowledged.

use osek_atomics::{OsAtomic, OsAtomicU32, OsAtomicU64};
use osek_cfg::{OS_COREID, OsPanic};

use crate::Platform;

const COMPARE_DISABLED: u64 = u64::MAX;

/// A free-running 64-bit counter with one compare register.
#[derive(Debug)]
pub struct SimTimer {
    counter: OsAtomicU64,
    compare: OsAtomicU64,
    pending: OsAtomicU32,
}

impl SimTimer {
    pub const fn new() -> Self {
        Self {
            counter: OsAtomicU64::new(0),
            compare: OsAtomicU64::new(COMPARE_DISABLED),
            pending: OsAtomicU32::new(0),
        }
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.counter.load()
    }

    /// Let `ticks` ticks pass. Returns true if the compare value was reached
    /// during this advance.
    pub fn advance(&self, ticks: u64) -> bool {
        let before = self.counter.fetch_add(ticks);
        let after = before + ticks;
        let compare = self.compare.load();
        if compare != COMPARE_DISABLED && before < compare && after >= compare {
            self.pending.test_and_set_flag();
            timer_log_fired(compare);
            return true;
        }
        false
    }

    /// Arm the compare register `delta` ticks from now.
    pub fn start(&self, delta: u64) {
        self.pending.clear_flag();
        self.compare.store(self.now() + delta);
    }

    pub fn stop(&self) {
        self.compare.store(COMPARE_DISABLED);
        self.pending.clear_flag();
    }

    /// Acknowledge the timer interrupt; returns whether it was pending.
    pub fn acknowledge(&self) -> bool {
        self.pending.exchange(0) != 0
    }
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn timer_log_fired(_compare: u64) {
    os_log!(trace, "sim timer reached compare value {}", _compare);
}

/// A simulated core: its id, a timer for timestamps, and a record of the
/// last panic instead of a reset.
#[derive(Debug)]
pub struct SimPlatform<'a> {
    core: OS_COREID,
    timer: &'a SimTimer,
    last_panic: OsAtomicU32,
    idle_waits: OsAtomicU32,
}

impl<'a> SimPlatform<'a> {
    pub const fn new(core: OS_COREID, timer: &'a SimTimer) -> Self {
        Self {
            core,
            timer,
            last_panic: OsAtomicU32::new(0),
            idle_waits: OsAtomicU32::new(0),
        }
    }

    pub fn timer(&self) -> &'a SimTimer {
        self.timer
    }

    /// Code of the last panic raised on this platform, 0 if none
    pub fn last_panic(&self) -> u8 {
        self.last_panic.load() as u8
    }

    /// How often the core went to wait for an interrupt
    pub fn idle_waits(&self) -> u32 {
        self.idle_waits.load()
    }
}

impl Platform for SimPlatform<'_> {
    fn core_id(&self) -> OS_COREID {
        self.core
    }

    fn timestamp(&self) -> u64 {
        self.timer.now()
    }

    fn panic(&self, code: OsPanic) {
        os_log!(error, "panic {} on simulated core {}", code.code(), self.core);
        self.last_panic.store(code.code() as u32);
    }

    fn enter_idle_state(&self) {
        self.idle_waits.fetch_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_fires_once_when_crossed() {
        let timer = SimTimer::new();
        timer.start(100);
        assert!(!timer.advance(99));
        assert!(timer.advance(1));
        assert!(!timer.advance(50));
        assert!(timer.acknowledge());
        assert!(!timer.acknowledge());
    }

    #[test]
    fn stopped_timer_never_fires() {
        let timer = SimTimer::new();
        timer.start(10);
        timer.stop();
        assert!(!timer.advance(1000));
        assert_eq!(timer.now(), 1000);
    }

    #[test]
    fn platform_records_the_panic_code() {
        let timer = SimTimer::new();
        let platform = SimPlatform::new(1, &timer);
        timer.advance(42);
        assert_eq!(platform.timestamp(), 42);
        platform.panic(OsPanic::SCHK_GapInQueues);
        assert_eq!(platform.last_panic(), OsPanic::SCHK_GapInQueues.code());
    }
}
