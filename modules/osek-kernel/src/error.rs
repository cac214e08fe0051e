/*
*********************************************************************************************************
*                                          ERROR HANDLING
*
* A service that fails reports its error here before returning it. The error hook sees every
* error; the protection hook decides what happens to the caller. Panics are different: the kernel
* found its own data inconsistent and hands control to the platform.
*********************************************************************************************************
*/

use osek_cfg::{OS_NULLTASK, OsError, OsPanic, OsTaskState, ProtectionAction};

use crate::{IntLock, OsContext, OsCore};

/// The service an error is reported for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OsService {
    ActivateTask,
    TerminateTask,
    GetResource,
    ReleaseResource,
    WaitEvent,
    SetEvent,
    GetEvent,
    ClearEvent,
    GetCpuLoad,
}

impl OsCore<'_, '_> {
    /// `OS_ERROR`: run the hooks for `error` and hand it back to the service.
    pub(crate) fn report_error(&self, _service: OsService, error: OsError) -> OsError {
        os_log!(warn, "{} failed on core {}: {}", _service, self.id(), error);
        self.kd.last_error.set(Some(error));
        let hooks = &self.kernel.cfg.hooks;

        let caller = self.kd.in_function.get();
        if let Some(hook) = hooks.error {
            // errors raised by the error hook itself do not call it again
            if caller != OsContext::ErrorHook {
                self.kd.in_function.set(OsContext::ErrorHook);
                hook(error);
                self.kd.in_function.set(caller);
            }
        }

        let Some(protection) = hooks.protection else {
            return error;
        };
        if matches!(caller, OsContext::ErrorHook | OsContext::ProtectionHook) {
            return error;
        }
        self.kd.in_function.set(OsContext::ProtectionHook);
        let action = protection(error);
        self.kd.in_function.set(caller);

        match action {
            ProtectionAction::Continue => {}
            ProtectionAction::QuarantineCaller => {
                let current = self.kd.task_current.get();
                if caller == OsContext::Task && current != OS_NULLTASK {
                    os_log!(warn, "quarantining task {}", current);
                    if let Some((task, dynamic)) = self.kernel.task_entry(current) {
                        let lock = IntLock::acquire();
                        self.kill_locked(lock.token(), task, dynamic, OsTaskState::Quarantined);
                    }
                }
            }
            ProtectionAction::Shutdown => self.shutdown(),
        }
        error
    }

    /// `OS_PANIC`: record the code and give it to the platform.
    pub(crate) fn os_panic(&self, code: OsPanic) -> OsPanic {
        os_log!(error, "core {} panic {}", self.id(), code);
        self.kd.panic_code.set(Some(code));
        self.kernel.platform.panic(code);
        code
    }

    /// Panic, then fail the running service with `E_OS_LIMIT`. Used where a
    /// queue the tables sized too small overflows.
    pub(crate) fn panic_error(&self, code: OsPanic) -> OsError {
        self.os_panic(code);
        OsError::E_OS_LIMIT
    }

    /// Stop scheduling on this core. Nothing runs after this, every service
    /// called from here on fails with `E_OS_CALLEVEL`.
    fn shutdown(&self) {
        os_log!(error, "core {} shut down", self.id());
        critical_section::with(|_| {
            self.kd.task_current.set(OS_NULLTASK);
            self.kd.task_queue_head.set(OS_NULLTASK);
            self.kd.in_function.set(OsContext::Shutdown);
        });
    }
}
