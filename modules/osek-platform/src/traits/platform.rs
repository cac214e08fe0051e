//! Core platform functionality trait definition

use osek_cfg::{OS_COREID, OsPanic};

/// What the kernel needs from the hardware it runs on.
pub trait Platform: Sync {
    /// Id of the core executing the call
    fn core_id(&self) -> OS_COREID;

    /// Free-running timestamp in platform ticks. Must not wrap during the
    /// lifetime of the system.
    fn timestamp(&self) -> u64;

    /// `OS_PANIC`: the kernel found its own data inconsistent.
    ///
    /// A target implementation halts or resets the core and does not return.
    /// Hosted implementations may record the code and return, the kernel then
    /// refuses to continue the operation that panicked.
    fn panic(&self, code: OsPanic);

    /// Wait for the next interrupt
    fn enter_idle_state(&self) {}
}
