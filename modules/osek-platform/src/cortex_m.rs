//! Single-core Cortex-M platform
//!
//! Interrupt locking is PRIMASK. Timestamps come from the DWT cycle counter,
//! extended to 64 bits in software; the cycle counter must be enabled by the
//! startup code before the kernel starts.

use critical_section::{Impl, RawRestoreState, set_impl};
use osek_atomics::{OsAtomic, OsAtomicU64};
use osek_cfg::{OS_COREID, OsPanic};

use crate::Platform;

struct PrimaskCriticalSection;
set_impl!(PrimaskCriticalSection);

unsafe impl Impl for PrimaskCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let was_active = cortex_m::register::primask::read().is_active();
        cortex_m::interrupt::disable();
        was_active
    }

    unsafe fn release(was_active: RawRestoreState) {
        // only re-enable interrupts if they were enabled before the critical section
        if was_active {
            unsafe { cortex_m::interrupt::enable() }
        }
    }
}

/// The one core of a Cortex-M microcontroller
pub struct CortexMPlatform {
    last_timestamp: OsAtomicU64,
}

impl CortexMPlatform {
    pub const fn new() -> Self {
        Self {
            last_timestamp: OsAtomicU64::new(0),
        }
    }
}

impl Default for CortexMPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for CortexMPlatform {
    fn core_id(&self) -> OS_COREID {
        0
    }

    fn timestamp(&self) -> u64 {
        critical_section::with(|_| {
            let last = self.last_timestamp.load();
            let low = cortex_m::peripheral::DWT::cycle_count();
            let mut now = (last & !0xffff_ffff) | low as u64;
            if now < last {
                now += 1 << 32;
            }
            self.last_timestamp.store(now);
            now
        })
    }

    fn panic(&self, code: OsPanic) {
        os_log!(error, "kernel panic {}, resetting", code.code());
        cortex_m::peripheral::SCB::sys_reset();
    }

    fn enter_idle_state(&self) {
        cortex_m::asm::wfi();
    }
}
